//! Request middleware, applied outermost first: rate limit, session, CSRF

pub mod csrf;
pub mod rate_limit;
pub mod session;

pub use session::{SessionId, SESSION_COOKIE};
