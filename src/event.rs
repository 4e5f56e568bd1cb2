//! Decoding of the S3 "object created" notification that triggers us.
//!
//! S3 delivers object keys URL-encoded in the form style: spaces come through
//! as `+` and everything else is percent-escaped. We need the decoded key to
//! address the object through other AWS APIs, but we also hang on to the raw
//! text, because the derived output paths are computed from it.

use anyhow::{anyhow, Context, Result};
use aws_lambda_events::event::s3::S3Event;
use percent_encoding::percent_decode_str;
use serde_json::Value;

/// The location of the newly uploaded object.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UploadLocation {
    pub bucket: String,

    /// The object key exactly as it appeared in the notification.
    pub raw_key: String,

    /// The object key with form-style URL encoding removed.
    pub key: String,
}

/// Undo S3's form-style encoding of an object key: every `+` becomes a
/// space, then percent escapes are decoded.
pub fn decode_key(raw: &str) -> Result<String> {
    let spaced = raw.replace('+', " ");
    let decoded = percent_decode_str(&spaced)
        .decode_utf8()
        .with_context(|| format!("object key `{raw}` does not decode to UTF-8"))?;
    Ok(decoded.into_owned())
}

/// Pull the upload location out of a parsed notification. Only the first
/// record is consulted; we are configured to be invoked once per upload.
pub fn upload_location(event: &S3Event) -> Result<UploadLocation> {
    let record = event
        .records
        .first()
        .ok_or_else(|| anyhow!("notification contains no records"))?;

    let bucket = record
        .s3
        .bucket
        .name
        .clone()
        .ok_or_else(|| anyhow!("notification record has no bucket name"))?;

    let raw_key = record
        .s3
        .object
        .key
        .clone()
        .ok_or_else(|| anyhow!("notification record has no object key"))?;

    let key = decode_key(&raw_key)?;

    Ok(UploadLocation {
        bucket,
        raw_key,
        key,
    })
}

/// Parse a raw invocation payload as an S3 notification and extract the
/// upload location.
pub fn decode_payload(payload: Value) -> Result<UploadLocation> {
    let event: S3Event =
        serde_json::from_value(payload).context("invocation payload is not an S3 notification")?;
    upload_location(&event)
}
