//! Account identities and credential checks
//!
//! Tokens are provisioned through configuration; this module only resolves them.

mod accounts;

pub use accounts::{Account, AccountDirectory};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of the account that owns jobs and schedules
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
