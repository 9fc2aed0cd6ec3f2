//! Multipart file upload endpoint

use std::convert::Infallible;
use std::sync::Arc;

use futures_util::TryStreamExt;
use log::{error, warn};
use serde_json::json;
use warp::http::StatusCode;
use warp::hyper::body::Buf;
use warp::multipart::{FormData, Part};
use warp::reply::{Json, WithStatus};

use crate::error::HubError;
use crate::storage::uploads::UploadStore;

const FILE_FIELD: &str = "file";

fn error_reply(message: &str, status: StatusCode) -> WithStatus<Json> {
    warp::reply::with_status(warp::reply::json(&json!({ "error": message })), status)
}

async fn read_part(part: Part) -> Result<Vec<u8>, warp::Error> {
    part.stream()
        .try_fold(Vec::new(), |mut data, mut chunk| async move {
            while chunk.has_remaining() {
                let len = {
                    let bytes = chunk.chunk();
                    data.extend_from_slice(bytes);
                    bytes.len()
                };
                chunk.advance(len);
            }
            Ok(data)
        })
        .await
}

/// Store the `file` part of a multipart form and answer with its public URL
pub async fn handle_upload(
    form: FormData,
    store: Arc<UploadStore>,
) -> Result<WithStatus<Json>, Infallible> {
    // Parts stream in order and must be consumed one at a time
    let mut form = Box::pin(form);
    let mut upload: Option<(Option<String>, Vec<u8>)> = None;

    loop {
        match form.try_next().await {
            Ok(Some(part)) => {
                if part.name() != FILE_FIELD {
                    continue;
                }
                let file_name = part.filename().map(str::to_string);
                match read_part(part).await {
                    Ok(data) => upload = Some((file_name, data)),
                    Err(e) => {
                        warn!("Failed to read upload body: {}", e);
                        return Ok(error_reply("Invalid multipart body", StatusCode::BAD_REQUEST));
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed multipart form: {}", e);
                return Ok(error_reply("Invalid multipart body", StatusCode::BAD_REQUEST));
            }
        }
    }

    let (file_name, data) = match upload {
        Some(upload) => upload,
        None => return Ok(error_reply("No file uploaded", StatusCode::BAD_REQUEST)),
    };

    match store.save(file_name.as_deref(), &data).await {
        Ok(stored) => Ok(warp::reply::with_status(
            warp::reply::json(&json!({ "fileUrl": stored.url })),
            StatusCode::OK,
        )),
        Err(HubError::UploadError(msg)) => Ok(error_reply(&msg, StatusCode::BAD_REQUEST)),
        Err(e) => {
            error!("Failed to save upload: {}", e);
            Ok(error_reply(
                "Failed to save files",
                StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}
