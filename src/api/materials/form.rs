use async_trait::async_trait;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{header, StatusCode};

use crate::api::errors::ApiError;
use crate::api::extract::ApiJson;
use crate::core::state::AppState;
use crate::schemas::material::MaterialPayload;

pub(super) struct Upload {
    pub(super) file_name: String,
    pub(super) bytes: Vec<u8>,
}

/// A material write sent either as JSON or as `multipart/form-data` whose
/// optional `file` part is the upload.
pub(super) struct MaterialForm {
    pub(super) payload: MaterialPayload,
    pub(super) upload: Option<Upload>,
}

#[async_trait]
impl FromRequest<AppState> for MaterialForm {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if !is_multipart {
            let ApiJson(payload) = ApiJson::<MaterialPayload>::from_request(req, state).await?;
            return Ok(MaterialForm { payload, upload: None });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?;
        let max_bytes = state.settings().storage().max_upload_bytes();

        let mut payload = MaterialPayload::default();
        let mut upload = None;

        while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or("").to_string();
            if name == "file" {
                let file_name = field.file_name().unwrap_or("").to_string();
                let mut bytes = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
                        return Err(ApiError::validation(
                            "file",
                            format!(
                                "File size exceeds {}MB limit",
                                state.settings().storage().max_upload_size_mb
                            ),
                        ));
                    }
                    bytes.extend_from_slice(&chunk);
                }
                // Browsers send an empty part when no file was picked.
                if !(file_name.is_empty() && bytes.is_empty()) {
                    upload = Some(Upload { file_name, bytes });
                }
                continue;
            }

            let slot = match name.as_str() {
                "title" => &mut payload.title,
                "content" => &mut payload.content,
                "type" => &mut payload.material_type,
                _ => continue,
            };
            let text = field.text().await.map_err(multipart_error)?;
            *slot = Some(text);
        }

        Ok(MaterialForm { payload, upload })
    }
}

fn multipart_error(error: axum::extract::multipart::MultipartError) -> ApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("Request body is too large".to_string())
    } else {
        ApiError::BadRequest("Invalid multipart data".to_string())
    }
}
