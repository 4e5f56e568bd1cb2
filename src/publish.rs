//! Publication of the generated article.
//!
//! Both the document key and the returned URL are computed from the object
//! key *as it appeared in the notification*, i.e. still URL-encoded. For a
//! given upload the output location is thus fixed, and reprocessing the same
//! upload overwrites the same document.

use anyhow::{Context, Result};

use crate::config::{Settings, UrlTarget};
use crate::event::UploadLocation;
use crate::narrative::GeneratedArticle;
use crate::storage::ObjectStore;

pub const ARTICLE_CONTENT_TYPE: &str = "application/json";

/// The key of the article document for an upload.
pub fn article_key(raw_key: &str) -> String {
    format!("articles/{raw_key}-article.json")
}

/// The URL reported back to the caller after publication.
pub fn article_url(settings: &Settings, loc: &UploadLocation) -> String {
    let key = match settings.url_target {
        UrlTarget::Source => loc.raw_key.clone(),
        UrlTarget::SourceDecoded => loc.key.clone(),
        UrlTarget::Article => article_key(&loc.raw_key),
    };

    format!("{}/{}/{}", settings.url_base, loc.bucket, key)
}

/// Write the article document next to the source image and return the key
/// that it was written to.
pub async fn publish(
    store: &dyn ObjectStore,
    loc: &UploadLocation,
    doc: &GeneratedArticle,
) -> Result<String> {
    let key = article_key(&loc.raw_key);
    let data = serde_json::to_vec(doc).context("failed to serialize article document")?;

    store
        .put(&loc.bucket, &key, data, ARTICLE_CONTENT_TYPE)
        .await
        .context("failed to store article document")?;

    Ok(key)
}
