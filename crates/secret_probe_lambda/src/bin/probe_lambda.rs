use lambda_runtime::{service_fn, Error, LambdaEvent};
use secret_probe_core::config::ProbeConfig;
use secret_probe_lambda::context::ProbeContext;
use secret_probe_lambda::handlers::invocation::{handle_invocation, FATAL_EXIT_CODE};
use secret_probe_lambda::telemetry;
use serde_json::Value;
use tracing::error;

#[tokio::main]
async fn main() -> Result<(), Error> {
    telemetry::init();

    let config = match ProbeConfig::from_env() {
        Ok(value) => value,
        Err(error) => {
            error!(
                component = "probe_lambda",
                event = "config_invalid",
                error = %error,
                exit_code = FATAL_EXIT_CODE,
            );
            std::process::exit(FATAL_EXIT_CODE);
        }
    };

    let context = ProbeContext::load(config).await;
    let context = &context;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_invocation(context, event).await
    }))
    .await
}
