//! CSV rendering of inspection lists.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{FieldOpsError, FieldOpsResult};
use crate::inspection::MAX_SAFETY_QUESTIONS;
use crate::models::inspection::Inspection;

const FIXED_COLUMNS: &[&str] = &[
    "InspectionID",
    "Date",
    "Distributor",
    "DeliveryMan",
    "ConsumerName",
    "ConsumerNumber",
    "Mobile",
    "Address",
    "SurakshaHoseDueDate",
    "HotplateExchange",
    "OtherDiscount",
    "SubtotalAmount",
    "TotalDiscount",
    "TotalAmount",
    "PassedQuestions",
    "FailedQuestions",
    "ImagesCount",
    "Products",
    "Latitude",
    "Longitude",
];

/// Display names resolved for the owners referenced by an export.
#[derive(Debug, Clone, Default)]
pub struct OwnerNames {
    pub tenants: HashMap<Uuid, String>,
    pub agents: HashMap<Uuid, String>,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn products_summary(inspection: &Inspection) -> String {
    inspection
        .content
        .products
        .iter()
        .map(|p| format!("{} x {} @ {}", p.name, p.quantity, p.price))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Number of `Qn` columns: the highest question ordinal present, plus
/// one, never more than [`MAX_SAFETY_QUESTIONS`].
fn question_columns(rows: &[Inspection]) -> usize {
    rows.iter()
        .flat_map(|i| i.content.safety_questions.iter())
        .map(|q| q.question_id as usize + 1)
        .max()
        .unwrap_or(0)
        .min(MAX_SAFETY_QUESTIONS)
}

fn row(inspection: &Inspection, names: &OwnerNames, questions: usize) -> Vec<String> {
    let c = &inspection.content;
    let name_of = |map: &HashMap<Uuid, String>, id: &Uuid| map.get(id).cloned().unwrap_or_default();

    let mut fields = vec![
        inspection.inspection_id.clone(),
        timestamp(c.inspection_date),
        name_of(&names.tenants, &inspection.tenant_id),
        name_of(&names.agents, &inspection.agent_id),
        c.consumer.name.clone(),
        c.consumer.consumer_number.clone(),
        c.consumer.mobile_number.clone(),
        c.consumer.address.clone(),
        c.suraksha_hose_due_date.clone().unwrap_or_default(),
        if c.hotplate_exchange { "Yes" } else { "No" }.to_string(),
        c.other_discount.to_string(),
        c.subtotal_amount.to_string(),
        c.total_discount.to_string(),
        c.total_amount.to_string(),
        c.passed_questions.to_string(),
        c.failed_questions.to_string(),
        c.images.len().to_string(),
        products_summary(inspection),
        c.location
            .as_ref()
            .map(|l| l.latitude.to_string())
            .unwrap_or_default(),
        c.location
            .as_ref()
            .map(|l| l.longitude.to_string())
            .unwrap_or_default(),
    ];

    let mut answers = vec![String::new(); questions];
    for q in &c.safety_questions {
        if let Some(slot) = answers.get_mut(q.question_id as usize) {
            *slot = q.answer.as_str().to_string();
        }
    }
    fields.extend(answers);
    fields
}

/// Render `rows` as CSV text preceded by a `# ` preamble and a blank line.
pub fn render(
    rows: &[Inspection],
    names: &OwnerNames,
    generated_at: DateTime<Utc>,
) -> FieldOpsResult<String> {
    let questions = question_columns(rows);

    let mut out = String::new();
    out.push_str("# LPG Inspection Export\n");
    out.push_str(&format!("# Generated: {}\n", timestamp(generated_at)));
    out.push_str(&format!("# Total Records: {}\n", rows.len()));
    out.push('\n');

    let mut writer = csv::Writer::from_writer(Vec::new());
    let header = FIXED_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain((1..=questions).map(|n| format!("Q{n}")));
    writer
        .write_record(header)
        .map_err(|e| FieldOpsError::Internal(format!("csv: {e}")))?;
    for inspection in rows {
        writer
            .write_record(row(inspection, names, questions))
            .map_err(|e| FieldOpsError::Internal(format!("csv: {e}")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| FieldOpsError::Internal(format!("csv: {e}")))?;
    let body = String::from_utf8(bytes).map_err(|e| FieldOpsError::Internal(e.to_string()))?;

    out.push_str(&body);
    Ok(out)
}

/// `inspections_<timestamp>.csv`
pub fn file_name(generated_at: DateTime<Utc>) -> String {
    format!("inspections_{}.csv", generated_at.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inspection::{
        Consumer, InspectionContent, InspectionStatus, LineItem, SafetyAnswer, SafetyQuestion,
    };
    use chrono::TimeZone;

    fn sample(question_ids: &[u32]) -> Inspection {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 8, 30, 0).unwrap();
        Inspection {
            id: Uuid::new_v4(),
            inspection_id: "INS-2024-0007".into(),
            tenant_id: Uuid::nil(),
            agent_id: Uuid::nil(),
            content: InspectionContent {
                consumer: Consumer {
                    name: "Asha, Rao".into(),
                    consumer_number: "C-1".into(),
                    mobile_number: "9876543210".into(),
                    address: "Line \"A\"".into(),
                },
                safety_questions: question_ids
                    .iter()
                    .map(|id| SafetyQuestion {
                        question_id: *id,
                        question: "q".into(),
                        answer: SafetyAnswer::Yes,
                    })
                    .collect(),
                suraksha_hose_due_date: None,
                images: vec![],
                products: vec![LineItem {
                    product_id: None,
                    name: "Hose".into(),
                    price: 150.0,
                    quantity: 2,
                    subtotal: 300.0,
                }],
                hotplate_exchange: true,
                other_discount: 0.0,
                subtotal_amount: 300.0,
                total_discount: 450.0,
                total_amount: 0.0,
                location: None,
                status: InspectionStatus::Completed,
                passed_questions: question_ids.len() as u32,
                failed_questions: 0,
                inspection_date: at,
            },
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn preamble_then_header_then_rows() {
        let mut names = OwnerNames::default();
        names.tenants.insert(Uuid::nil(), "Acme Gas".into());
        let at = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();

        let text = render(&[sample(&[0, 2])], &names, at).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "# LPG Inspection Export");
        assert_eq!(lines[1], "# Generated: 2024-03-10 00:00:00");
        assert_eq!(lines[2], "# Total Records: 1");
        assert_eq!(lines[3], "");
        assert!(lines[4].starts_with("InspectionID,Date,Distributor,DeliveryMan,"));
        assert!(lines[4].ends_with("Latitude,Longitude,Q1,Q2,Q3"));
        assert!(lines[5].starts_with("INS-2024-0007,2024-03-09 08:30:00,Acme Gas,,"));
        assert!(lines[5].contains("\"Asha, Rao\""));
        assert!(lines[5].contains("\"Line \"\"A\"\"\""));
        assert!(lines[5].ends_with("yes,,yes"));
    }

    #[test]
    fn stored_out_of_range_ids_do_not_widen_the_sheet() {
        let rows = [sample(&[0, 4_000_000_000])];
        assert_eq!(question_columns(&rows), MAX_SAFETY_QUESTIONS);

        let text = render(&rows, &OwnerNames::default(), Utc::now()).unwrap();
        let header = text.lines().nth(4).unwrap();
        assert!(header.ends_with(&format!("Q{MAX_SAFETY_QUESTIONS}")));
    }

    #[test]
    fn empty_export_still_has_header() {
        let text = render(&[], &OwnerNames::default(), Utc::now()).unwrap();
        assert!(text.contains("# Total Records: 0"));
        assert!(text.trim_end().ends_with("Latitude,Longitude"));
    }
}
