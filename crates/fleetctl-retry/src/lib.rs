pub mod retry;

pub use retry::{do_with_retry, RetryError, RetryPolicy};
