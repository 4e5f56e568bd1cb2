//! The per-upload processing pipeline and its response contract.
//!
//! Each stage awaits the previous one; there is nothing to run concurrently.
//! The only branch is the no-face case, in which we delete the upload and
//! stop. Everything that goes wrong anywhere else is funneled through
//! [`Response::from_result`], which logs the details and hands the caller an
//! opaque 500.

use anyhow::{Context, Result};
use lambda_runtime::tracing;
use serde::Serialize;
use serde_json::{json, Value};

use crate::{event, event::UploadLocation, faces, narrative, publish, Services};

pub const NO_FACE_MESSAGE: &str = "No faces detected in the uploaded image";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// How a successful pass through the pipeline ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// No face was found, so the upload was deleted.
    NoFace { location: UploadLocation },

    /// An article was generated and stored.
    Published {
        location: UploadLocation,
        article_key: String,
        article_url: String,
    },
}

/// The invocation result, in the API Gateway proxy style: a status code and
/// a body holding JSON text.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status_code: u16,
    pub body: String,
}

impl Response {
    fn with_json(status_code: u16, body: Value) -> Self {
        Response {
            status_code,
            body: body.to_string(),
        }
    }

    pub fn internal_error() -> Self {
        Self::with_json(500, json!({ "error": INTERNAL_ERROR_MESSAGE }))
    }

    /// Convert the pipeline result into the caller-facing response. Failures
    /// are logged here, in full, and never leak into the response body.
    pub fn from_result(result: Result<Outcome>) -> Self {
        match result {
            Ok(Outcome::NoFace { .. }) => Self::with_json(400, json!({ "error": NO_FACE_MESSAGE })),

            Ok(Outcome::Published { article_url, .. }) => {
                Self::with_json(200, json!({ "articleUrl": article_url }))
            }

            Err(e) => {
                tracing::error!("processing failed: {e:#}");
                Self::internal_error()
            }
        }
    }

    /// Parse the body back into JSON.
    pub fn body_json(&self) -> Result<Value> {
        serde_json::from_str(&self.body).context("response body is not JSON")
    }
}

/// Run the whole pipeline for one notification payload.
pub async fn process(svcs: &Services, payload: Value) -> Result<Outcome> {
    let location = event::decode_payload(payload)?;
    tracing::info!(
        "processing upload s3://{}/{} (raw key `{}`)",
        location.bucket,
        location.key,
        location.raw_key
    );

    let faces = svcs
        .classifier
        .detect_faces(&location.bucket, &location.key)
        .await?;
    tracing::info!("detected {} face(s)", faces.len());

    let Some(face) = faces::first_face(faces) else {
        return remove_faceless_upload(svcs, location).await;
    };

    let descriptor = face.descriptor();
    tracing::info!("face descriptor: {descriptor}");

    let doc = narrative::synthesize(
        svcs.generator.as_ref(),
        &descriptor,
        svcs.settings.story_max_tokens,
        svcs.settings.title_max_tokens,
    )
    .await?;

    let article_key = publish::publish(svcs.store.as_ref(), &location, &doc).await?;
    let article_url = publish::article_url(&svcs.settings, &location);
    tracing::info!("wrote s3://{}/{}", location.bucket, article_key);

    Ok(Outcome::Published {
        location,
        article_key,
        article_url,
    })
}

async fn remove_faceless_upload(svcs: &Services, location: UploadLocation) -> Result<Outcome> {
    tracing::info!(
        "no faces in s3://{}/{}; deleting it",
        location.bucket,
        location.key
    );

    svcs.store
        .delete(&location.bucket, &location.key)
        .await
        .context("failed to delete faceless upload")?;

    Ok(Outcome::NoFace { location })
}
