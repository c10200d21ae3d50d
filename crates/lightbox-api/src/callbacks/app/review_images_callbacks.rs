use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tower_sessions::Session;

use lightbox_types::api::ImageListResponse;

use crate::files::StorageError;
use crate::files::upload::{ImageKind, sniff_image};
use crate::pages::{Page, PageLocation};
use crate::registry::{Registry, RegistryError};
use crate::state::{AppState, current_identity, require_user, run_blocking};

const NO_IMAGES: &str = "No images found for the current user.";

const BODY: &str = r#"<h2>Review Images</h2>
<div id="review-warning" role="alert"></div>
<div id="image-gallery"></div>
<script>
(async () => {
  const listing = await callback("/review-images/files");
  document.getElementById("review-warning").textContent = listing.warning;
  const gallery = document.getElementById("image-gallery");
  for (const name of listing.filenames) {
    const src = "/_callbacks/review-images/files/" + encodeURIComponent(name);
    const figure = document.createElement("figure");
    const link = document.createElement("a");
    link.href = src;
    const image = document.createElement("img");
    image.src = src;
    image.alt = name;
    image.style.maxWidth = "240px";
    link.append(image);
    const caption = document.createElement("figcaption");
    caption.textContent = name;
    figure.append(link, caption);
    gallery.append(figure);
  }
})();
</script>"#;

pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.page(Page {
        path: "/review-images",
        name: "Review Images",
        location: PageLocation::App,
        body: BODY,
    })?;
    registry.callback("/_callbacks/review-images/files", get(list_images))?;
    registry.callback("/_callbacks/review-images/files/{filename}", get(image))
}

async fn list_images(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ImageListResponse>, StatusCode> {
    let identity = current_identity(&state, &session).await?;
    let Ok(username) = require_user(&identity) else {
        return Ok(Json(ImageListResponse {
            filenames: Vec::new(),
            warning: NO_IMAGES.to_string(),
        }));
    };

    let worker = state.clone();
    let listed = run_blocking(move || worker.files.list_user_files(&username)).await?;

    let response = match listed {
        Ok(filenames) if filenames.is_empty() => ImageListResponse {
            filenames,
            warning: NO_IMAGES.to_string(),
        },
        Ok(filenames) => ImageListResponse {
            filenames,
            warning: String::new(),
        },
        Err(e) => ImageListResponse {
            filenames: Vec::new(),
            warning: e.surface("image listing"),
        },
    };
    Ok(Json(response))
}

async fn image(
    State(state): State<AppState>,
    session: Session,
    Path(filename): Path<String>,
) -> Result<Response, StatusCode> {
    let identity = current_identity(&state, &session).await?;
    let username = require_user(&identity).map_err(|_| StatusCode::UNAUTHORIZED)?;

    let worker = state.clone();
    let bytes = run_blocking(move || worker.files.read_file(&username, &filename))
        .await?
        .map_err(|e| match e {
            StorageError::NotFound(_) => StatusCode::NOT_FOUND,
            StorageError::InvalidFilename(_) => StatusCode::BAD_REQUEST,
            StorageError::StorageUnavailable { .. } => {
                e.surface("image read");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        })?;

    let content_type = sniff_image(&bytes)
        .map(ImageKind::content_type)
        .unwrap_or("application/octet-stream");
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

#[cfg(test)]
mod tests {
    use axum::http::{StatusCode, header};

    use crate::auth::Authenticator;
    use crate::files::FileStore;
    use crate::testing::{FakeAuthenticator, TestApp};

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[tokio::test]
    async fn listing_for_empty_and_anonymous() {
        let app = TestApp::with_auth(FakeAuthenticator::with_user("testuser", "pw"));

        let body = app.get("/_callbacks/review-images/files", None).await.json();
        assert_eq!(body["filenames"], serde_json::json!([]));
        assert_eq!(body["warning"], "No images found for the current user.");

        let cookie = app.login("testuser", "pw").await;
        let body = app.get("/_callbacks/review-images/files", Some(&cookie)).await.json();
        assert_eq!(body["warning"], "No images found for the current user.");
    }

    #[tokio::test]
    async fn listing_is_sorted_and_per_user() {
        let app = TestApp::with_auth(FakeAuthenticator::with_user("ada", "pw"));
        app.auth.register("bob", "pw").unwrap();
        app.files.save_file("ada", "b.png", PNG).unwrap();
        app.files.save_file("ada", "a.png", PNG).unwrap();
        app.files.save_file("bob", "c.png", PNG).unwrap();

        let cookie = app.login("ada", "pw").await;
        let body = app.get("/_callbacks/review-images/files", Some(&cookie)).await.json();
        assert_eq!(body["filenames"], serde_json::json!(["a.png", "b.png"]));
        assert_eq!(body["warning"], "");
    }

    #[tokio::test]
    async fn serves_own_images_with_content_type() {
        let app = TestApp::with_auth(FakeAuthenticator::with_user("ada", "pw"));
        app.files.save_file("ada", "scan.png", PNG).unwrap();
        let cookie = app.login("ada", "pw").await;

        let response = app.get("/_callbacks/review-images/files/scan.png", Some(&cookie)).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.headers[header::CONTENT_TYPE], "image/png");
        assert_eq!(response.body, PNG);
    }

    #[tokio::test]
    async fn image_access_is_guarded() {
        let app = TestApp::with_auth(FakeAuthenticator::with_user("ada", "pw"));
        app.auth.register("bob", "pw").unwrap();
        app.files.save_file("bob", "secret.png", PNG).unwrap();

        let anonymous = app.get("/_callbacks/review-images/files/secret.png", None).await;
        assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

        let cookie = app.login("ada", "pw").await;
        let other_user = app.get("/_callbacks/review-images/files/secret.png", Some(&cookie)).await;
        assert_eq!(other_user.status, StatusCode::NOT_FOUND);

        let traversal = app.get("/_callbacks/review-images/files/%2E%2E", Some(&cookie)).await;
        assert_eq!(traversal.status, StatusCode::BAD_REQUEST);
    }
}
