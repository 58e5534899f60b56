//! The concurrent trigger cache.
//!
//! Reads (`resolve`) run on every request; writes arrive only from the
//! control-plane update listener and the periodic resync. Records are
//! stored as `Arc<Trigger>` and replaced wholesale, so a reader can
//! never observe a half-updated trigger, and no I/O ever happens while
//! the lock is held.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::control::TriggerSource;
use crate::error::{ControlPlaneError, RegistryError};
use crate::types::{Trigger, TriggerKey};

/// Proof that the registry finished its initial full listing.
///
/// Only [`TriggerRegistry::prewarm`] can mint one, and the ingress
/// server requires it to start serving, which makes the
/// prewarm-before-serve ordering structural rather than incidental.
pub struct Prewarmed(pub(crate) ());

/// Locally cached, eventually-consistent view of all triggers.
#[derive(Debug, Default)]
pub struct TriggerRegistry {
    triggers: RwLock<HashMap<TriggerKey, Arc<Trigger>>>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the trigger addressed by an inbound request.
    ///
    /// The read guard is held only long enough to clone the `Arc`;
    /// resolution never waits on control-plane traffic.
    pub fn resolve(&self, key: &TriggerKey) -> Result<Arc<Trigger>, RegistryError> {
        let triggers = self.triggers.read().expect("trigger cache lock");
        triggers
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(key.clone()))
    }

    /// Insert or replace a trigger record in one atomic step.
    pub fn upsert(&self, trigger: Trigger) {
        let key = trigger.key.clone();
        let mut triggers = self.triggers.write().expect("trigger cache lock");
        triggers.insert(key.clone(), Arc::new(trigger));
        debug!(trigger = %key, "trigger upserted");
    }

    /// Drop a trigger record. Returns whether it existed.
    pub fn remove(&self, key: &TriggerKey) -> bool {
        let mut triggers = self.triggers.write().expect("trigger cache lock");
        let existed = triggers.remove(key).is_some();
        if existed {
            debug!(trigger = %key, "trigger removed");
        }
        existed
    }

    /// Number of cached triggers.
    pub fn len(&self) -> usize {
        self.triggers.read().expect("trigger cache lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Walk the control plane's full paginated listing and reconcile the
    /// cache against it: every listed trigger is upserted, and cached
    /// triggers absent from the listing are removed.
    ///
    /// Returns the number of triggers now cached.
    pub async fn resync<S: TriggerSource>(&self, source: &S) -> Result<usize, ControlPlaneError> {
        let mut seen = HashSet::new();
        let mut page_token = None;

        loop {
            let page = source.list(page_token.take()).await?;
            for descriptor in page.triggers {
                let trigger = Trigger::from(descriptor);
                seen.insert(trigger.key.clone());
                self.upsert(trigger);
            }
            match page.continue_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        let stale: Vec<TriggerKey> = {
            let triggers = self.triggers.read().expect("trigger cache lock");
            triggers
                .keys()
                .filter(|key| !seen.contains(*key))
                .cloned()
                .collect()
        };
        for key in &stale {
            self.remove(key);
        }

        debug!(
            triggers = seen.len(),
            removed = stale.len(),
            "registry resync complete"
        );
        Ok(seen.len())
    }

    /// Blocking initial warm-up: a full listing must succeed before the
    /// ingress may serve, so the very first request cannot spuriously
    /// miss. Failure here is fatal to startup.
    pub async fn prewarm<S: TriggerSource>(
        &self,
        source: &S,
    ) -> Result<Prewarmed, ControlPlaneError> {
        let count = self.resync(source).await?;
        info!(triggers = count, "trigger registry prewarmed");
        Ok(Prewarmed(()))
    }
}
