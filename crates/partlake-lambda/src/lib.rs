// AWS Lambda runtime adapter
//
// One bootstrap binary serves every function; the deployment selects which
// one through configuration. Scheduled functions accept an EventBridge
// payload, the mover accepts an S3 notification.
//
// Philosophy: Use lambda_runtime's provided tokio

use std::sync::Arc;

use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use partlake_config::{LakeConfig, Platform};
use serde_json::Value;
use tracing::info;

mod handlers;
mod init;

pub use handlers::{handle_event, LambdaState, ScheduledEvent, ScheduledFunction};

/// Lambda handler for one invocation
async fn handle_request(event: LambdaEvent<Value>, state: Arc<LambdaState>) -> Result<Value, Error> {
    let (payload, context) = event.into_parts();
    info!(
        request_id = %context.request_id,
        function = %state.function(),
        "Invocation started"
    );

    handle_event(&state, payload, Utc::now())
        .await
        .map_err(Error::from)
}

/// Lambda runtime entry point
pub async fn run() -> Result<(), Error> {
    let config = LakeConfig::load_for_platform(Platform::Lambda)
        .map_err(|e| Error::from(format!("Failed to load configuration: {:#}", e)))?;
    init::init_tracing(&config.log_config());

    let state = LambdaState::from_config(&config)
        .await
        .map_err(|e| Error::from(format!("Failed to initialize function: {:#}", e)))?;
    info!(function = %state.function(), "Lambda function ready");

    let state = Arc::new(state);
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let state = state.clone();
        async move { handle_request(event, state).await }
    }))
    .await
}
