//! Lambda entry point for the face story service.
//!
//! We take the payload as untyped JSON rather than as an `S3Event` so that a
//! payload that fails to parse still gets the standard error response,
//! instead of a runtime-level invocation error.

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;

use facestory_lambda::{Response, Services};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let svcs = Services::init().await?;
    let ref_svcs = &svcs;

    run(service_fn(|event: LambdaEvent<Value>| async move {
        let (payload, _context) = event.into_parts();
        Ok::<Response, Error>(ref_svcs.handle(payload).await)
    }))
    .await?;
    Ok(())
}
