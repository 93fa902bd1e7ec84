//! Multipart file uploads into the object store.
//!
//! Every file in a request is checked before any is stored. If storing
//! fails part way, the objects already written are removed again.

use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::routing::{delete, post};
use axum::{Extension, Router};
use chrono::Utc;
use fieldops_core::error::FieldOpsError;
use fieldops_core::models::claims::Claims;
use fieldops_core::upload::{self, KeyKind, MAX_FILE_BYTES, MAX_FILES, ObjectStore, StoredObject};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::extract::Reply;
use crate::state::AppState;

/// Images uploaded before their inspection exists.
const UNASSIGNED_INSPECTION: &str = "temp";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/upload/single", post(single))
        .route("/upload/multiple", post(multiple))
        .route("/upload/inspection-images", post(inspection_images))
        .route("/upload/{*key}", delete(remove))
        // Room for a full batch plus multipart framing.
        .layer(DefaultBodyLimit::max(MAX_FILES * MAX_FILE_BYTES + 1024 * 1024))
}

struct Incoming {
    name: String,
    content_type: String,
    bytes: Vec<u8>,
}

struct Form {
    files: Vec<Incoming>,
    inspection_id: Option<String>,
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::bad_request(err.body_text())
}

/// Drain the form, keeping files from `file_field` and the optional
/// `inspectionId` text field.
async fn read_form(
    multipart: Result<Multipart, MultipartRejection>,
    file_field: &str,
) -> ApiResult<Form> {
    let mut multipart = multipart.map_err(|r| ApiError::bad_request(r.body_text()))?;
    let mut form = Form {
        files: Vec::new(),
        inspection_id: None,
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or_default().to_string();
        if field_name == "inspectionId" {
            let value = field.text().await.map_err(multipart_error)?;
            form.inspection_id = Some(value.trim().to_string()).filter(|v| !v.is_empty());
            continue;
        }
        if field_name != file_field {
            continue;
        }
        if form.files.len() == MAX_FILES {
            return Err(FieldOpsError::from(upload::UploadError::TooManyFiles).into());
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?.to_vec();
        form.files.push(Incoming {
            name,
            content_type,
            bytes,
        });
    }
    Ok(form)
}

async fn store_all(
    state: &AppState,
    claims: &Claims,
    kind: KeyKind<'_>,
    files: Vec<Incoming>,
) -> ApiResult<Vec<StoredObject>> {
    upload::check_count(files.len()).map_err(FieldOpsError::from)?;

    let mut checked = Vec::with_capacity(files.len());
    for file in files {
        let ext = upload::check_file(&file.name, &file.content_type, file.bytes.len())
            .map_err(FieldOpsError::from)?;
        checked.push((file, ext));
    }

    let now = Utc::now();
    let mut stored: Vec<StoredObject> = Vec::with_capacity(checked.len());
    for (file, ext) in checked {
        let key = upload::object_key(claims, kind.clone(), &ext, now).map_err(FieldOpsError::from)?;
        let size = file.bytes.len() as u64;
        match state.storage.put(&key, file.bytes, &file.content_type).await {
            Ok(url) => stored.push(StoredObject {
                url,
                key,
                size,
                mimetype: file.content_type,
                original_name: file.name,
                uploaded_at: now,
            }),
            Err(err) => {
                for object in &stored {
                    if let Err(cleanup) = state.storage.delete(&object.key).await {
                        warn!(key = %object.key, error = %cleanup, "orphaned upload not removed");
                    }
                }
                return Err(FieldOpsError::from(err).into());
            }
        }
    }
    Ok(stored)
}

async fn single(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Reply<StoredObject>> {
    let form = read_form(multipart, "file").await?;
    if form.files.len() > 1 {
        return Err(ApiError::bad_request("Only one file may be sent to this endpoint"));
    }
    let mut stored = store_all(&state, &claims, KeyKind::Field("file"), form.files).await?;
    let object = stored
        .pop()
        .ok_or_else(|| ApiError::bad_request("No file provided"))?;
    Ok(Reply::created("File uploaded", object))
}

async fn multiple(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Reply<Vec<StoredObject>>> {
    let form = read_form(multipart, "files").await?;
    let stored = store_all(&state, &claims, KeyKind::Field("files"), form.files).await?;
    Ok(Reply::created(format!("{} files uploaded", stored.len()), stored))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectionImages {
    inspection_id: String,
    images: Vec<StoredObject>,
}

async fn inspection_images(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Reply<InspectionImages>> {
    let form = read_form(multipart, "images").await?;
    let inspection_id = match form.inspection_id {
        None => UNASSIGNED_INSPECTION.to_string(),
        Some(raw) => {
            let id = Uuid::parse_str(&raw)
                .map_err(|_| ApiError::bad_request(format!("Invalid inspectionId: {raw}")))?;
            // Only inspections the caller can see may receive images.
            state.inspections.get(&claims, id).await?;
            id.to_string()
        }
    };
    let images = store_all(
        &state,
        &claims,
        KeyKind::Inspection(&inspection_id),
        form.files,
    )
    .await?;
    Ok(Reply::created(
        format!("{} images uploaded", images.len()),
        InspectionImages {
            inspection_id,
            images,
        },
    ))
}

/// Objects may be removed only from inside the caller's own tenant; see
/// [`upload::may_delete`].
async fn remove(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(key): Path<String>,
) -> ApiResult<Reply<()>> {
    upload::check_key(&key).map_err(FieldOpsError::from)?;
    if !upload::may_delete(&claims, &key) {
        return Err(FieldOpsError::denied("object belongs to another tenant or role").into());
    }
    state
        .storage
        .delete(&key)
        .await
        .map_err(FieldOpsError::from)?;
    Ok(Reply::ok("File deleted", ()))
}
