//! Owner Context

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::UserUuid;

/// Identity a cart is persisted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OwnerContext {
    /// A browser session without a signed-in user.
    Anonymous,

    /// A signed-in user.
    User {
        /// User identifier
        user: UserUuid,
    },
}

impl OwnerContext {
    /// Storage key for this owner's cart.
    #[must_use]
    pub fn storage_key(&self) -> String {
        match self {
            OwnerContext::Anonymous => "cart:anonymous".to_string(),
            OwnerContext::User { user } => format!("cart:user:{user}"),
        }
    }

    /// Whether this is the anonymous owner.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        matches!(self, OwnerContext::Anonymous)
    }
}

impl fmt::Display for OwnerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerContext::Anonymous => f.write_str("anonymous"),
            OwnerContext::User { user } => write!(f, "user {user}"),
        }
    }
}
