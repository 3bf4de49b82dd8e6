//! HTTP handlers

pub mod csrf;
pub mod messages;
pub mod users;
