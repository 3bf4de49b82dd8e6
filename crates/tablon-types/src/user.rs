//! User types

use serde::{Deserialize, Serialize};

/// A message author. Also used as the embedded `sender` of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
}
