//! Invoker: resilient execution of reasoning-service calls.
//!
//! Wraps one external call with bounded exponential-backoff retry, separates
//! retryable from terminal failures, and rewrites a final rate-limit failure
//! into a single user-facing message.
//!
//! # Modules
//!
//! - [`policy`]    - `InvocationPolicy`, `Classify`
//! - [`execution`] - `ResilientInvoker`, `invoke_with_policy()`
//! - [`error`]     - `InvokeError` / `InvokeResult`

pub mod error;
pub mod execution;
pub mod policy;

pub use error::{InvokeError, InvokeResult, RATE_LIMIT_MESSAGE};
pub use execution::{invoke_with_policy, ResilientInvoker};
pub use policy::{Classify, InvocationPolicy, RESOURCE_EXHAUSTED_MARKER};
