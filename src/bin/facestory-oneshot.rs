//! "Oneshot" version of the face story Lambda.
//!
//! This executable processes one S3 notification, given as JSON text on the
//! command line, against the real AWS services. The invocation response is
//! printed on standard output. If an article was published, it is read back
//! from S3 and printed on standard error.

use lambda_runtime::Error;
use serde_json::Value;
use std::env;

use facestory_lambda::{Outcome, Response, Services};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let mut args = env::args();
    args.next(); // skip argv[0]

    let json_text = args
        .next()
        .ok_or_else(|| -> Error { "first argument should be S3 notification JSON text".into() })?;
    let payload: Value = serde_json::from_str(&json_text)?;

    let svcs = Services::init().await?;
    let result = svcs.process(payload).await;

    let published = match &result {
        Ok(Outcome::Published {
            location,
            article_key,
            ..
        }) => Some((location.bucket.clone(), article_key.clone())),
        _ => None,
    };

    let response = Response::from_result(result);
    serde_json::to_writer(std::io::stdout().lock(), &response)?;
    println!();

    if let Some((bucket, key)) = published {
        let doc = svcs.store().get(&bucket, &key).await?;
        eprintln!("{}", String::from_utf8_lossy(&doc));
    }

    Ok(())
}
