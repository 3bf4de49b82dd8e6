//! Business logic services

pub mod csrf;
pub mod messages;
pub mod rate_limit;
pub mod sanitize;

pub use csrf::{CsrfError, CsrfService};
pub use messages::{MessageError, MessageService, MAX_PAGE_LIMIT};
pub use rate_limit::{RateLimitConfig, RateLimitDecision, RateLimiter};
