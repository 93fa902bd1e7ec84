//! Inspection normalization.
//!
//! Turns a raw field submission into an [`InspectionContent`] with every
//! derived financial and safety field filled in. Normalization is a pure
//! function of the submission, the resolved owner and the owning tenant's
//! current [`AppSettings`].

use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::error::FieldOpsError;
use crate::models::claims::{Claims, Role};
use crate::models::inspection::{
    Consumer, CreateInspection, InspectionContent, InspectionImage, InspectionStatus, LineItem,
    Location, SafetyAnswer, SafetyQuestion,
};
use crate::models::tenant::AppSettings;

/// Upper bound on safety questions per inspection; also bounds the
/// `Qn` columns of an export.
pub const MAX_SAFETY_QUESTIONS: usize = 100;

#[derive(Debug, Error)]
pub enum InspectionError {
    #[error("Missing required fields: {0}")]
    MissingRequiredFields(String),

    #[error("invalid answer value {value:?} for question {index}; expected \"yes\" or \"no\"")]
    InvalidAnswerValue { index: usize, value: String },

    #[error("invalid safety question {index}: {reason}")]
    InvalidQuestion { index: usize, reason: String },

    #[error("invalid line item {index}: {reason}")]
    InvalidLineItem { index: usize, reason: String },

    #[error("agent not found: {0}")]
    AgentNotFound(Uuid),

    #[error("agent {agent_id} does not belong to tenant {tenant_id}")]
    TenantMismatch { tenant_id: Uuid, agent_id: Uuid },
}

impl From<InspectionError> for FieldOpsError {
    fn from(err: InspectionError) -> Self {
        match err {
            InspectionError::MissingRequiredFields(_)
            | InspectionError::InvalidAnswerValue { .. }
            | InspectionError::InvalidQuestion { .. }
            | InspectionError::InvalidLineItem { .. } => FieldOpsError::Validation {
                message: err.to_string(),
            },
            InspectionError::AgentNotFound(id) => FieldOpsError::NotFound {
                entity: "agent".into(),
                id: id.to_string(),
            },
            InspectionError::TenantMismatch { .. } => FieldOpsError::AuthorizationDenied {
                reason: err.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawConsumer {
    pub name: Option<String>,
    pub consumer_number: Option<String>,
    pub mobile_number: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSafetyQuestion {
    pub question_id: Option<u32>,
    #[serde(default)]
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLineItem {
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

/// A field submission exactly as received, before any derivation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawInspection {
    /// Honoured only for super-admin callers.
    pub tenant_id: Option<Uuid>,
    /// Ignored for agent callers.
    pub agent_id: Option<Uuid>,
    pub consumer: RawConsumer,
    pub safety_questions: Vec<RawSafetyQuestion>,
    pub suraksha_hose_due_date: Option<String>,
    pub images: Vec<InspectionImage>,
    pub products: Vec<RawLineItem>,
    pub hotplate_exchange: bool,
    pub other_discount: f64,
    /// Lump-sum total used only when no line items are supplied.
    pub total_amount: Option<f64>,
    pub location: Option<Location>,
    pub inspection_date: Option<DateTime<Utc>>,
}

/// How the owning agent of a new inspection was identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRef {
    /// The caller is the agent.
    Caller(Uuid),
    /// Supplied in the body; must be checked against the tenant.
    Supplied(Uuid),
}

impl AgentRef {
    pub fn id(self) -> Uuid {
        match self {
            AgentRef::Caller(id) | AgentRef::Supplied(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerRequest {
    pub tenant_id: Uuid,
    pub agent: AgentRef,
}

/// Steps 1 and 2: decide which tenant and agent will own the inspection.
///
/// Client-supplied tenant ids are ignored unless the caller is the super
/// admin, who must supply one.
pub fn resolve_owner(claims: &Claims, raw: &RawInspection) -> Result<OwnerRequest, InspectionError> {
    let tenant_id = match claims.role {
        Role::SuperAdmin => raw
            .tenant_id
            .ok_or_else(|| InspectionError::MissingRequiredFields("tenantId".into()))?,
        Role::TenantAdmin | Role::Agent => claims
            .tenant_id
            .ok_or_else(|| InspectionError::MissingRequiredFields("tenantId".into()))?,
    };

    let agent = match (claims.role, claims.agent_id) {
        (Role::Agent, Some(me)) => AgentRef::Caller(me),
        (Role::Agent, None) => {
            return Err(InspectionError::MissingRequiredFields("agentId".into()));
        }
        _ => AgentRef::Supplied(
            raw.agent_id
                .ok_or_else(|| InspectionError::MissingRequiredFields("agentId".into()))?,
        ),
    };

    Ok(OwnerRequest { tenant_id, agent })
}

fn required(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Steps 3 to 7: validate and derive every computed field.
pub fn normalize(
    raw: RawInspection,
    settings: &AppSettings,
    now: DateTime<Utc>,
) -> Result<InspectionContent, InspectionError> {
    let mut missing = Vec::new();
    let name = required(&raw.consumer.name);
    let mobile = required(&raw.consumer.mobile_number);
    let address = required(&raw.consumer.address);
    if name.is_none() {
        missing.push("consumer.name");
    }
    if mobile.is_none() {
        missing.push("consumer.mobileNumber");
    }
    if address.is_none() {
        missing.push("consumer.address");
    }
    let lump_sum = raw.total_amount.filter(|t| *t > 0.0);
    if raw.products.is_empty() && lump_sum.is_none() {
        missing.push("products");
    }
    if !missing.is_empty() {
        return Err(InspectionError::MissingRequiredFields(missing.join(", ")));
    }

    let products = raw
        .products
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            if item.quantity <= 0 {
                return Err(InspectionError::InvalidLineItem {
                    index,
                    reason: "quantity must be at least 1".into(),
                });
            }
            if !item.price.is_finite() || item.price < 0.0 {
                return Err(InspectionError::InvalidLineItem {
                    index,
                    reason: "price must be a non-negative number".into(),
                });
            }
            Ok(LineItem {
                product_id: item.product_id,
                name: item.name.trim().to_string(),
                price: item.price,
                quantity: item.quantity,
                subtotal: item.price * item.quantity as f64,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let subtotal_amount = if products.is_empty() {
        lump_sum.unwrap_or(0.0)
    } else {
        products.iter().map(|p| p.subtotal).sum()
    };

    let other_discount = raw.other_discount.max(0.0);
    let exchange = if raw.hotplate_exchange {
        settings.hotplate_exchange_rate
    } else {
        0.0
    };
    let total_discount = exchange + other_discount;
    let total_amount = (subtotal_amount - total_discount).max(0.0);

    let question_count = raw.safety_questions.len();
    if question_count > MAX_SAFETY_QUESTIONS {
        return Err(InspectionError::InvalidQuestion {
            index: MAX_SAFETY_QUESTIONS,
            reason: format!("at most {MAX_SAFETY_QUESTIONS} questions are allowed"),
        });
    }
    // Ids are zero-based ordinals, each used once.
    let mut seen = vec![false; question_count];
    let safety_questions = raw
        .safety_questions
        .into_iter()
        .enumerate()
        .map(|(index, q)| {
            let question_id = q.question_id.map_or(index, |id| id as usize);
            match seen.get_mut(question_id) {
                None => {
                    return Err(InspectionError::InvalidQuestion {
                        index,
                        reason: format!("questionId {question_id} is outside 0..{question_count}"),
                    });
                }
                Some(true) => {
                    return Err(InspectionError::InvalidQuestion {
                        index,
                        reason: format!("questionId {question_id} is repeated"),
                    });
                }
                Some(slot) => *slot = true,
            }
            let answer = match q.answer.as_str() {
                "yes" => SafetyAnswer::Yes,
                "no" => SafetyAnswer::No,
                _ => {
                    return Err(InspectionError::InvalidAnswerValue {
                        index,
                        value: q.answer,
                    });
                }
            };
            Ok(SafetyQuestion {
                question_id: question_id as u32,
                question: q.question,
                answer,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let failed_questions = safety_questions
        .iter()
        .filter(|q| q.answer == SafetyAnswer::No)
        .count() as u32;
    let passed_questions = safety_questions.len() as u32 - failed_questions;
    let status = if failed_questions > 0 {
        InspectionStatus::IssuesFound
    } else {
        InspectionStatus::Completed
    };

    Ok(InspectionContent {
        consumer: Consumer {
            name: name.unwrap_or_default(),
            consumer_number: required(&raw.consumer.consumer_number).unwrap_or_default(),
            mobile_number: mobile.unwrap_or_default(),
            address: address.unwrap_or_default(),
        },
        safety_questions,
        suraksha_hose_due_date: required(&raw.suraksha_hose_due_date),
        images: raw.images,
        products,
        hotplate_exchange: raw.hotplate_exchange,
        other_discount,
        subtotal_amount,
        total_discount,
        total_amount,
        location: raw.location,
        status,
        passed_questions,
        failed_questions,
        inspection_date: raw.inspection_date.unwrap_or(now),
    })
}

/// Normalize a submission for an already-resolved owner.
pub fn prepare(
    raw: RawInspection,
    tenant_id: Uuid,
    agent_id: Uuid,
    settings: &AppSettings,
    now: DateTime<Utc>,
) -> Result<CreateInspection, InspectionError> {
    Ok(CreateInspection {
        tenant_id,
        agent_id,
        content: normalize(raw, settings, now)?,
    })
}

/// Format the human-readable inspection id, e.g. `INS-2024-0011`.
pub fn display_id(at: DateTime<Utc>, ordinal: u64) -> String {
    format!("INS-{}-{:04}", at.year(), ordinal)
}

/// Rebuild a raw submission from stored content so edits can be
/// re-normalized against current settings.
pub fn to_raw(content: &InspectionContent) -> RawInspection {
    RawInspection {
        tenant_id: None,
        agent_id: None,
        consumer: RawConsumer {
            name: Some(content.consumer.name.clone()),
            consumer_number: Some(content.consumer.consumer_number.clone()),
            mobile_number: Some(content.consumer.mobile_number.clone()),
            address: Some(content.consumer.address.clone()),
        },
        safety_questions: content
            .safety_questions
            .iter()
            .map(|q| RawSafetyQuestion {
                question_id: Some(q.question_id),
                question: q.question.clone(),
                answer: q.answer.as_str().to_string(),
            })
            .collect(),
        suraksha_hose_due_date: content.suraksha_hose_due_date.clone(),
        images: content.images.clone(),
        products: content
            .products
            .iter()
            .map(|p| RawLineItem {
                product_id: p.product_id,
                name: p.name.clone(),
                price: p.price,
                quantity: p.quantity,
            })
            .collect(),
        hotplate_exchange: content.hotplate_exchange,
        other_discount: content.other_discount,
        total_amount: content.products.is_empty().then_some(content.subtotal_amount),
        location: content.location.clone(),
        inspection_date: Some(content.inspection_date),
    }
}

/// Partial edit of an inspection. Owner fields are absent: tenant and
/// agent are immutable after creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InspectionPatch {
    pub consumer: Option<RawConsumer>,
    pub safety_questions: Option<Vec<RawSafetyQuestion>>,
    pub suraksha_hose_due_date: Option<String>,
    pub images: Option<Vec<InspectionImage>>,
    pub products: Option<Vec<RawLineItem>>,
    pub hotplate_exchange: Option<bool>,
    pub other_discount: Option<f64>,
    pub total_amount: Option<f64>,
    pub location: Option<Location>,
    pub inspection_date: Option<DateTime<Utc>>,
}

impl InspectionPatch {
    /// Overlay the patch onto the stored content as a raw submission.
    pub fn merge_into(self, content: &InspectionContent) -> RawInspection {
        let mut raw = to_raw(content);
        if let Some(c) = self.consumer {
            raw.consumer = RawConsumer {
                name: c.name.or(raw.consumer.name),
                consumer_number: c.consumer_number.or(raw.consumer.consumer_number),
                mobile_number: c.mobile_number.or(raw.consumer.mobile_number),
                address: c.address.or(raw.consumer.address),
            };
        }
        if let Some(q) = self.safety_questions {
            raw.safety_questions = q;
        }
        if let Some(d) = self.suraksha_hose_due_date {
            raw.suraksha_hose_due_date = Some(d);
        }
        if let Some(images) = self.images {
            raw.images = images;
        }
        if let Some(products) = self.products {
            raw.products = products;
        }
        if let Some(flag) = self.hotplate_exchange {
            raw.hotplate_exchange = flag;
        }
        if let Some(discount) = self.other_discount {
            raw.other_discount = discount;
        }
        if self.total_amount.is_some() {
            raw.total_amount = self.total_amount;
        }
        if self.location.is_some() {
            raw.location = self.location;
        }
        if self.inspection_date.is_some() {
            raw.inspection_date = self.inspection_date;
        }
        raw
    }
}
