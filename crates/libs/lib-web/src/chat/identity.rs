//! # Identity Assignment
//!
//! Each connection is named `user<N>` where `N` comes from the durable
//! `userCount` counter. The counter lives in the store, so numbers keep
//! increasing across restarts and concurrent connections never share one.

use lib_core::dto::{Identity, USER_COUNTER_KEY};
use lib_core::{AppError, ChatStore, Result};
use std::sync::Arc;
use tracing::debug;

/// Hands out connection identities from the durable counter.
#[derive(Clone)]
pub struct IdentityAssigner {
    store: Arc<dyn ChatStore>,
}

impl IdentityAssigner {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    /// Consume the next ordinal and return the identity derived from it.
    ///
    /// # Errors
    ///
    /// [`AppError::StorageUnavailable`] when the counter cannot be incremented.
    /// No identity is produced in that case.
    pub async fn assign(&self) -> Result<Identity> {
        let ordinal = self.store.increment_counter(USER_COUNTER_KEY).await?;
        if ordinal < 1 {
            return Err(AppError::StorageUnavailable(format!(
                "counter {} returned non-positive value {}",
                USER_COUNTER_KEY, ordinal
            )));
        }

        let identity = Identity::from_ordinal(ordinal);
        debug!(ordinal, name = %identity.display_name, "Identity assigned");
        Ok(identity)
    }
}
