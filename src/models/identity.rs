//! The caller identity supplied by the upstream authentication layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An authenticated caller. Anonymous callers are represented as `None`
/// wherever an `Option<&Identity>` is accepted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Identity {
    pub id: String,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
