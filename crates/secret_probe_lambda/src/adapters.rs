use std::future::Future;

pub mod database;
pub mod postgres;
pub mod secrets;
pub mod secrets_manager;

/// Drives an async SDK or driver call to completion from a synchronous
/// adapter method. Requires the multi-threaded tokio runtime.
pub(crate) fn run_blocking<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
