//! Per-instance record of collections this process has provisioned.
//!
//! Only a fast path: a miss always goes back to the store, whose own
//! `IF NOT EXISTS` checks decide what still needs creating. Nothing is
//! shared between storage instances.

use std::collections::HashSet;
use std::sync::Arc;

use portal_sessions_core::SessionType;
use tokio::sync::RwLock;

#[derive(Clone, Debug, Default)]
pub(crate) struct CollectionRegistry {
    provisioned: Arc<RwLock<HashSet<SessionType>>>,
}

impl CollectionRegistry {
    pub(crate) async fn is_provisioned(&self, session_type: &SessionType) -> bool {
        self.provisioned.read().await.contains(session_type)
    }

    /// Returns `true` if the type was not recorded before.
    pub(crate) async fn mark_provisioned(&self, session_type: &SessionType) -> bool {
        self.provisioned.write().await.insert(session_type.clone())
    }
}
