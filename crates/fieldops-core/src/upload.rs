//! Upload policy and the object storage seam.
//!
//! Uploaded files are checked against an extension and content-type
//! allowlist plus a size cap before anything is written. Keys are built
//! here so every store lays objects out the same way.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::error::FieldOpsError;
use crate::models::claims::{Claims, Role};

pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_FILES: usize = 10;

const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "pdf"];
const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "application/pdf",
];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file provided")]
    Empty,

    #[error("Too many files; at most {MAX_FILES} per request")]
    TooManyFiles,

    #[error("File too large; limit is 10MB")]
    TooLarge,

    #[error("Only image and PDF files are allowed")]
    Rejected,

    #[error("Invalid object key")]
    InvalidKey,

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<UploadError> for FieldOpsError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Backend(msg) => FieldOpsError::Storage(msg),
            other => FieldOpsError::Validation {
                message: other.to_string(),
            },
        }
    }
}

/// Metadata returned to the client for each stored file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub url: String,
    pub key: String,
    pub size: u64,
    pub mimetype: String,
    pub original_name: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Lowercased extension of `file_name`, if it is on the allowlist.
fn allowed_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Check one file against the allowlists and size cap. Returns the
/// normalized extension.
pub fn check_file(file_name: &str, content_type: &str, size: usize) -> Result<String, UploadError> {
    if size == 0 {
        return Err(UploadError::Empty);
    }
    if size > MAX_FILE_BYTES {
        return Err(UploadError::TooLarge);
    }
    let content_type = content_type.to_ascii_lowercase();
    if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
        return Err(UploadError::Rejected);
    }
    allowed_extension(file_name).ok_or(UploadError::Rejected)
}

pub fn check_count(count: usize) -> Result<(), UploadError> {
    match count {
        0 => Err(UploadError::Empty),
        n if n > MAX_FILES => Err(UploadError::TooManyFiles),
        _ => Ok(()),
    }
}

/// Where an uploaded object belongs.
#[derive(Debug, Clone)]
pub enum KeyKind<'a> {
    /// Image attached to an inspection.
    Inspection(&'a str),
    /// Loose file from a named multipart field.
    Field(&'a str),
}

/// Top segment for objects that belong to no tenant.
const PLATFORM_PREFIX: &str = "platform";

/// `<tenantId>/<role>` for tenant callers, `platform/super_admin` otherwise.
pub fn owner_prefix(claims: &Claims) -> Result<String, UploadError> {
    match (claims.role, claims.tenant_id) {
        (Role::SuperAdmin, _) => Ok(format!("{PLATFORM_PREFIX}/{}", Role::SuperAdmin.as_str())),
        (role, Some(tenant_id)) => Ok(format!("{tenant_id}/{}", role.as_str())),
        (_, None) => Err(UploadError::InvalidKey),
    }
}

/// `<owner>/inspections/<inspectionId>/<ts>-<uuid>.<ext>` or
/// `<owner>/<field>-<ts>-<uuid>.<ext>`, where `<owner>` is
/// [`owner_prefix`].
pub fn object_key(
    claims: &Claims,
    kind: KeyKind<'_>,
    ext: &str,
    now: DateTime<Utc>,
) -> Result<String, UploadError> {
    let owner = owner_prefix(claims)?;
    let stamp = now.timestamp_millis();
    let id = Uuid::new_v4();
    let key = match kind {
        KeyKind::Inspection(inspection_id) => {
            format!("{owner}/inspections/{inspection_id}/{stamp}-{id}.{ext}")
        }
        KeyKind::Field(field) => format!("{owner}/{field}-{stamp}-{id}.{ext}"),
    };
    check_key(&key)?;
    Ok(key)
}

/// The super admin may remove anything. A tenant admin may remove any
/// object of their tenant; an agent only objects under their own
/// tenant and role.
pub fn may_delete(claims: &Claims, key: &str) -> bool {
    match claims.role {
        Role::SuperAdmin => true,
        Role::TenantAdmin => claims
            .tenant_id
            .is_some_and(|tenant_id| key.starts_with(&format!("{tenant_id}/"))),
        Role::Agent => owner_prefix(claims).is_ok_and(|owner| key.starts_with(&format!("{owner}/"))),
    }
}

/// Reject traversal and absolute keys.
pub fn check_key(key: &str) -> Result<(), UploadError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg == ".." || seg.is_empty());
    if bad || key.contains("..") {
        return Err(UploadError::InvalidKey);
    }
    Ok(())
}

/// Object storage backend.
pub trait ObjectStore: Send + Sync {
    fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = Result<String, UploadError>> + Send;
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), UploadError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlists_apply() {
        assert_eq!(check_file("photo.JPG", "image/jpeg", 1024).unwrap(), "jpg");
        assert_eq!(
            check_file("report.pdf", "application/pdf", 10).unwrap(),
            "pdf"
        );
        assert!(matches!(
            check_file("run.exe", "application/octet-stream", 10),
            Err(UploadError::Rejected)
        ));
        assert!(matches!(
            check_file("photo.png", "text/plain", 10),
            Err(UploadError::Rejected)
        ));
        assert!(matches!(
            check_file("big.png", "image/png", MAX_FILE_BYTES + 1),
            Err(UploadError::TooLarge)
        ));
    }

    #[test]
    fn file_count_limits() {
        assert!(check_count(0).is_err());
        assert!(check_count(MAX_FILES).is_ok());
        assert!(matches!(
            check_count(MAX_FILES + 1),
            Err(UploadError::TooManyFiles)
        ));
    }

    #[test]
    fn keys_are_prefixed_by_tenant_and_role() {
        let now = Utc::now();
        let tenant = Uuid::new_v4();
        let agent = Claims::agent(tenant, Uuid::new_v4(), "AG001");
        let key = object_key(&agent, KeyKind::Inspection("temp"), "png", now).unwrap();
        assert!(key.starts_with(&format!("{tenant}/agent/inspections/temp/")));
        assert!(key.ends_with(".png"));

        let admin = Claims::tenant_admin(tenant, "AG001");
        let key = object_key(&admin, KeyKind::Field("file"), "pdf", now).unwrap();
        assert!(key.starts_with(&format!("{tenant}/tenant_admin/file-")));

        let root = Claims::super_admin("super_admin", "ROOT01");
        let key = object_key(&root, KeyKind::Field("files"), "jpg", now).unwrap();
        assert!(key.starts_with("platform/super_admin/files-"));
    }

    #[test]
    fn deletion_stays_inside_the_tenant() {
        let now = Utc::now();
        let (tenant_a, tenant_b) = (Uuid::new_v4(), Uuid::new_v4());
        let agent_a = Claims::agent(tenant_a, Uuid::new_v4(), "AG001");
        let admin_a = Claims::tenant_admin(tenant_a, "AG001");
        let agent_b = Claims::agent(tenant_b, Uuid::new_v4(), "AG002");
        let admin_b = Claims::tenant_admin(tenant_b, "AG002");
        let root = Claims::super_admin("super_admin", "ROOT01");

        let photo = object_key(&agent_a, KeyKind::Inspection("temp"), "png", now).unwrap();
        let invoice = object_key(&admin_a, KeyKind::Field("file"), "pdf", now).unwrap();

        assert!(may_delete(&agent_a, &photo));
        assert!(may_delete(&admin_a, &photo));
        assert!(may_delete(&root, &photo));
        assert!(!may_delete(&agent_b, &photo));
        assert!(!may_delete(&admin_b, &photo));
        assert!(!may_delete(&agent_a, &invoice));

        // Keys from before tenant prefixes existed belong to no caller.
        assert!(!may_delete(&agent_a, "agent/inspections/temp/1-x.png"));
    }

    #[test]
    fn traversal_is_rejected() {
        assert!(check_key("../etc/passwd").is_err());
        assert!(check_key("/abs/key.png").is_err());
        assert!(check_key("agent/a..b.png").is_err());
        assert!(check_key("agent/file-1-x.png").is_ok());
        let agent = Claims::agent(Uuid::new_v4(), Uuid::new_v4(), "AG001");
        assert!(object_key(&agent, KeyKind::Inspection(".."), "png", Utc::now()).is_err());
    }
}
