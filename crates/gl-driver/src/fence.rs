//! Owned GPU fence objects.

use std::sync::Arc;

use crate::driver::{FenceId, GlDriver};

/// A fence inserted into the command stream, deleted when dropped.
///
/// Waits are queue-side: [`GlFence::server_wait`] makes later GPU commands
/// on the calling context wait for the fenced work, without blocking the
/// issuing thread. [`GlFence::is_signaled`] is a non-blocking poll used to
/// reap fences that have already completed.
pub struct GlFence {
    driver: Arc<dyn GlDriver>,
    id: FenceId,
}

impl GlFence {
    /// Insert a fence after all commands issued so far on this context.
    pub fn insert(driver: &Arc<dyn GlDriver>) -> Self {
        let id = driver.insert_fence();
        Self {
            driver: Arc::clone(driver),
            id,
        }
    }

    pub fn id(&self) -> FenceId {
        self.id
    }

    /// Enqueue a GPU-side wait for this fence on the current context.
    pub fn server_wait(&self) {
        self.driver.server_wait_fence(self.id);
    }

    /// Whether the fenced work has completed. Never blocks.
    pub fn is_signaled(&self) -> bool {
        self.driver.poll_fence(self.id)
    }
}

impl Drop for GlFence {
    fn drop(&mut self) {
        self.driver.delete_fence(self.id);
    }
}

impl std::fmt::Debug for GlFence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("GlFence").field(&self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingDriver;

    #[test]
    fn fence_signals_only_after_completion() {
        let driver: Arc<dyn GlDriver> = Arc::new(RecordingDriver::new());
        let fence = GlFence::insert(&driver);
        assert!(!fence.is_signaled());

        let recording = RecordingDriver::downcast(&driver);
        recording.complete_all_fences();
        assert!(fence.is_signaled());
    }

    #[test]
    fn dropping_a_fence_deletes_the_driver_object() {
        let driver: Arc<dyn GlDriver> = Arc::new(RecordingDriver::new());
        let fence = GlFence::insert(&driver);
        let id = fence.id();
        drop(fence);

        let recording = RecordingDriver::downcast(&driver);
        assert!(!recording.fence_alive(id));
    }

    #[test]
    fn server_wait_is_recorded_against_the_fence() {
        let driver: Arc<dyn GlDriver> = Arc::new(RecordingDriver::new());
        let fence = GlFence::insert(&driver);
        fence.server_wait();
        fence.server_wait();

        let recording = RecordingDriver::downcast(&driver);
        assert_eq!(recording.server_wait_count(fence.id()), 2);
    }
}
