//! Recipient Registry
//!
//! Append-only, insertion-ordered list of delivery targets.

use std::sync::{PoisonError, RwLock};

use super::types::Recipient;

/// Registered recipients. Duplicates are kept; nothing is validated.
#[derive(Debug, Default)]
pub struct RecipientRegistry {
    recipients: RwLock<Vec<Recipient>>,
}

impl RecipientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a recipient. Only dispatches started after this call see it.
    pub fn add(&self, recipient: impl Into<Recipient>) {
        self.recipients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(recipient.into());
    }

    /// Copy of the current list, in insertion order, for one dispatch.
    pub fn snapshot(&self) -> Vec<Recipient> {
        self.recipients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.recipients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
