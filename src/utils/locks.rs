use log::{debug, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::Id;

// Advisory lock registry for the keyframes-JSON read-modify-write. One async
// mutex per project; entries nobody holds or waits on are pruned on acquire.
#[derive(Clone, Default)]
pub struct ProjectLocks {
    locks: Arc<Mutex<HashMap<Id, Arc<AsyncMutex<()>>>>>,
}

/// Held for the duration of one merge; releases on drop.
pub struct ProjectLockGuard {
    project_id: Id,
    acquired_at: Instant,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for ProjectLockGuard {
    fn drop(&mut self) {
        debug!(
            "🔓 Released keyframes lock for project {} after {:?}",
            self.project_id,
            self.acquired_at.elapsed()
        );
    }
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, project_id: Id) -> ProjectLockGuard {
        let slot = self.slot(project_id);
        let guard = slot.lock_owned().await;
        debug!("🔒 Acquired keyframes lock for project {}", project_id);
        ProjectLockGuard {
            project_id,
            acquired_at: Instant::now(),
            _guard: guard,
        }
    }

    fn slot(&self, project_id: Id) -> Arc<AsyncMutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => {
                warn!("⚠️ Lock registry was poisoned, recovering");
                poisoned.into_inner()
            }
        };

        // Only the registry itself references an idle slot
        locks.retain(|id, slot| *id == project_id || Arc::strong_count(slot) > 1);

        Arc::clone(
            locks
                .entry(project_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}
