//! Error types for the EpiQuoi client
//!
//! Every failure of an exchange surfaces as a single [`ChatError`]. Nothing in
//! the core retries or swallows an error; callers inspect the variant (or the
//! [`ChatError::is_retryable`] helper) and decide what to show the user.

mod constructors;
mod conversions;
mod types;

pub use types::{ChatError, ChatResultOf};
