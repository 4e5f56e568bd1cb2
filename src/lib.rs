//! The AWS/Lambda-powered "face story" service
//!
//! This Lambda is triggered by S3 object-created notifications for uploaded
//! photos. For each upload we ask Rekognition to describe the first face in
//! the picture, have a text-completion model write a short story (and then a
//! title for it) about that person, and store the result as a JSON document
//! next to the photo. Photos without any faces are deleted.
//!
//! The library is compiled into two executables: the default one, which
//! runs inside the Lambda runtime, and `facestory-oneshot`, which processes a
//! single notification given on the command line and is handy for local
//! testing.
//!
//! The external services are accessed through the [`ObjectStore`],
//! [`FaceClassifier`] and [`TextGenerator`] traits so that the pipeline can
//! be exercised without AWS or network access.

use lambda_runtime::{tracing, Error};
use serde_json::Value;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod event;
pub mod faces;
pub mod narrative;
pub mod pipeline;
pub mod publish;
pub mod storage;
pub mod textgen;

pub use config::Settings;
pub use faces::FaceClassifier;
pub use pipeline::{Outcome, Response};
pub use storage::ObjectStore;
pub use textgen::TextGenerator;

pub struct Services {
    store: Arc<dyn ObjectStore>,
    classifier: Arc<dyn FaceClassifier>,
    generator: Arc<dyn TextGenerator>,
    settings: Settings,
}

impl Services {
    /// Create the state object for the Lambda, wired up to the real AWS
    /// services and the configured completions endpoint.
    pub async fn init() -> Result<Self, Error> {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_target(false) // don't print the module name
            .without_time() // don't print time (CloudWatch has it)
            .init();

        let settings = Settings::from_env()?;
        tracing::info!("settings: {settings:?}");

        let config = aws_config::load_from_env().await;
        let store = storage::S3Store::new(aws_sdk_s3::Client::new(&config));
        let classifier = faces::RekognitionClassifier::new(aws_sdk_rekognition::Client::new(&config));
        let generator = textgen::CompletionsClient::new(&settings);

        Ok(Self::new(
            Arc::new(store),
            Arc::new(classifier),
            Arc::new(generator),
            settings,
        ))
    }

    /// Create a state object from explicitly provided collaborators.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        classifier: Arc<dyn FaceClassifier>,
        generator: Arc<dyn TextGenerator>,
        settings: Settings,
    ) -> Self {
        Services {
            store,
            classifier,
            generator,
            settings,
        }
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the pipeline for one notification, without converting the
    /// result into a response.
    pub async fn process(&self, payload: Value) -> anyhow::Result<Outcome> {
        pipeline::process(self, payload).await
    }

    /// Handle one invocation. This never fails: problems are logged and
    /// reported to the caller as a generic server error.
    pub async fn handle(&self, payload: Value) -> Response {
        Response::from_result(self.process(payload).await)
    }
}
