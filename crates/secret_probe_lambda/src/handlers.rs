pub mod invocation;
pub mod probe;
