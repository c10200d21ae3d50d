//! Image upload and the hand-off to the review page.

use axum::{Json, extract::State, http::StatusCode, routing::post};
use tower_sessions::Session;
use tracing::{info, warn};

use lightbox_types::api::{ReviewOutcome, ReviewResponse, UploadOutcome, UploadRequest, UploadResponse, UploadedFile};

use crate::files::upload::{decode_data_url, sniff_image, validate_extension};
use crate::files::FileStore;
use crate::layout::MAIN_PATH;
use crate::pages::{Page, PageLocation};
use crate::registry::{Registry, RegistryError};
use crate::state::{AppState, current_identity, require_user, run_blocking};

const NO_IMAGES: &str = "No images found for the current user.";
const REVIEW_PATH: &str = "/review-images";

const BODY: &str = r#"<h2>Select Images</h2>
<input id="image-files" type="file" multiple accept=".tif,.tiff,.png,.jpg,.jpeg">
<div id="upload-status" role="status"></div>
<ul id="upload-errors"></ul>
<button id="review-button">Review Images</button>
<div id="review-status" role="status"></div>
<script>
const readAsDataUrl = (file) => new Promise((resolve, reject) => {
  const reader = new FileReader();
  reader.onload = () => resolve({ filename: file.name, content: reader.result });
  reader.onerror = () => reject(reader.error);
  reader.readAsDataURL(file);
});
const showErrors = (errors) => {
  const list = document.getElementById("upload-errors");
  list.replaceChildren(...errors.map((text) => {
    const item = document.createElement("li");
    item.textContent = text;
    return item;
  }));
};
document.getElementById("image-files").addEventListener("change", async (event) => {
  const files = await Promise.all([...event.target.files].map(readAsDataUrl));
  const result = await callback("/select-images/upload", { files });
  document.getElementById("upload-status").textContent =
    result.message + (result.valid_files.length ? ": " + result.valid_files.join(", ") : "");
  showErrors(result.errors);
});
document.getElementById("review-button").addEventListener("click", async () => {
  const result = await callback("/select-images/review", {});
  document.getElementById("review-status").textContent = result.message;
  showErrors(result.errors);
  follow(result.redirect);
});
</script>"#;

pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.page(Page {
        path: MAIN_PATH,
        name: "Select Images",
        location: PageLocation::App,
        body: BODY,
    })?;
    registry.callback("/_callbacks/select-images/upload", post(upload))?;
    registry.callback("/_callbacks/select-images/review", post(review))
}

fn upload_response(outcome: UploadOutcome, message: &str, valid_files: Vec<String>, errors: Vec<String>) -> UploadResponse {
    UploadResponse {
        outcome,
        message: message.to_string(),
        valid_files,
        errors,
    }
}

async fn upload(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, StatusCode> {
    let identity = current_identity(&state, &session).await?;
    let username = match require_user(&identity) {
        Ok(username) => username,
        Err(e) => {
            return Ok(Json(upload_response(UploadOutcome::Error, &e.user_message(), Vec::new(), Vec::new())));
        }
    };

    if req.files.is_empty() {
        return Ok(Json(upload_response(UploadOutcome::Empty, "No files uploaded", Vec::new(), Vec::new())));
    }

    let worker = state.clone();
    let (valid_files, errors) = run_blocking(move || {
        let mut valid_files = Vec::new();
        let mut errors = Vec::new();
        for file in &req.files {
            match store_upload(worker.files.as_ref(), &username, file) {
                Ok(name) => valid_files.push(name),
                Err(reason) => {
                    warn!("Rejected upload {} for {}: {}", file.filename, username, reason);
                    errors.push(format!("{}: {}", file.filename, reason));
                }
            }
        }
        info!("Stored {} of {} uploads for {}", valid_files.len(), req.files.len(), username);
        (valid_files, errors)
    })
    .await?;

    let response = if valid_files.is_empty() {
        let errors = if errors.is_empty() {
            vec!["Unknown error occurred".to_string()]
        } else {
            errors
        };
        upload_response(UploadOutcome::Error, "Upload failed", valid_files, errors)
    } else if errors.is_empty() {
        upload_response(UploadOutcome::Success, "Upload completed", valid_files, errors)
    } else {
        upload_response(UploadOutcome::PartialSuccess, "Upload completed", valid_files, errors)
    };
    Ok(Json(response))
}

/// Check one file and write it to the user's folder, returning the stored name.
fn store_upload(files: &dyn FileStore, username: &str, file: &UploadedFile) -> Result<String, String> {
    validate_extension(&file.filename).map_err(|e| e.to_string())?;
    let bytes = decode_data_url(&file.content).map_err(|e| e.to_string())?;
    sniff_image(&bytes).map_err(|e| e.to_string())?;
    files
        .save_file(username, &file.filename, &bytes)
        .map_err(|e| e.surface("upload"))
}

fn review_response(outcome: ReviewOutcome, message: &str, errors: Vec<String>, redirect: Option<String>) -> ReviewResponse {
    ReviewResponse {
        outcome,
        message: message.to_string(),
        errors,
        redirect,
    }
}

async fn review(State(state): State<AppState>, session: Session) -> Result<Json<ReviewResponse>, StatusCode> {
    let identity = current_identity(&state, &session).await?;
    let username = match require_user(&identity) {
        Ok(username) => username,
        Err(e) => {
            return Ok(Json(review_response(ReviewOutcome::Error, NO_IMAGES, vec![e.user_message()], None)));
        }
    };

    let worker = state.clone();
    let listed = run_blocking(move || worker.files.list_user_files(&username)).await?;

    let response = match listed {
        Ok(names) if !names.is_empty() => review_response(
            ReviewOutcome::Success,
            "Images ready for review.",
            Vec::new(),
            Some(REVIEW_PATH.to_string()),
        ),
        Ok(_) => review_response(ReviewOutcome::Error, NO_IMAGES, Vec::new(), None),
        Err(e) => review_response(
            ReviewOutcome::Error,
            NO_IMAGES,
            vec![e.surface("review")],
            None,
        ),
    };
    Ok(Json(response))
}
