use lambda_runtime::{Error, LambdaEvent};
use secret_probe_core::contract::QueryRows;
use secret_probe_core::error::{FailureDisposition, ProbeError};
use serde_json::Value;
use tracing::{error, info, info_span};

use crate::context::ProbeContext;

/// Process exit status for fatal startup and connectivity failures.
pub const FATAL_EXIT_CODE: i32 = 1;

/// Lambda entry point for one event. The payload is not inspected.
///
/// Database failures end the process with [`FATAL_EXIT_CODE`] instead of
/// returning.
pub async fn handle_invocation(
    context: &ProbeContext,
    event: LambdaEvent<Value>,
) -> Result<Value, Error> {
    let span = info_span!("invocation", request_id = %event.context.request_id);
    let _entered = span.enter();
    info!(
        component = "probe_lambda",
        event = "invocation_received",
        payload_keys = event.payload.as_object().map_or(0, |object| object.len()),
    );

    match respond(context.probe()) {
        InvocationOutcome::Rows(rows) => Ok(rows),
        InvocationOutcome::Failed(error) => Err(Error::from(error)),
        InvocationOutcome::Fatal(error) => {
            error!(
                component = "probe_lambda",
                event = "terminating",
                error = %error,
                exit_code = FATAL_EXIT_CODE,
            );
            std::process::exit(FATAL_EXIT_CODE);
        }
    }
}

#[derive(Debug, PartialEq)]
enum InvocationOutcome {
    Rows(Value),
    Failed(ProbeError),
    Fatal(ProbeError),
}

fn respond(result: Result<QueryRows, ProbeError>) -> InvocationOutcome {
    match result {
        Ok(rows) => InvocationOutcome::Rows(Value::from(rows)),
        Err(error) => match error.disposition() {
            FailureDisposition::Propagate => InvocationOutcome::Failed(error),
            FailureDisposition::Terminate => InvocationOutcome::Fatal(error),
        },
    }
}
