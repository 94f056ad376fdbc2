/*!
 * Thread Registry
 * Register, remove, pause and resume operations
 */

use super::thread::CognitiveThread;
use super::ThreadScheduler;
use crate::core::errors::{SchedulerError, SchedulerResult};
use tracing::{debug, info};

impl ThreadScheduler {
    /// Add a thread; an existing thread with the same id is replaced
    pub fn register(&mut self, thread: CognitiveThread) -> Option<CognitiveThread> {
        let id = thread.id().to_string();
        debug!(
            thread_id = %id,
            priority = thread.priority(),
            attention = thread.attention_weight(),
            "Thread registered"
        );
        self.hotspot_streaks.remove(&id);
        self.threads.insert(id, thread)
    }

    /// Drop a thread from the registry
    pub fn remove(&mut self, id: &str) -> SchedulerResult<CognitiveThread> {
        self.hotspot_streaks.remove(id);
        let thread = self
            .threads
            .remove(id)
            .ok_or_else(|| SchedulerError::ThreadNotFound(id.to_string()))?;
        debug!(thread_id = id, "Thread removed");
        Ok(thread)
    }

    pub fn get(&self, id: &str) -> Option<&CognitiveThread> {
        self.threads.get(id)
    }

    /// Registered threads in id order
    pub fn threads(&self) -> impl Iterator<Item = &CognitiveThread> {
        self.threads.values()
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Mark a thread inactive; a paused thread stays paused
    pub fn pause(&mut self, id: &str) -> SchedulerResult<()> {
        if self.thread_mut(id)?.set_active(false) {
            info!(thread_id = id, "Thread paused");
        }
        Ok(())
    }

    /// Mark a thread active; an active thread stays active
    pub fn resume(&mut self, id: &str) -> SchedulerResult<()> {
        if self.thread_mut(id)?.set_active(true) {
            info!(thread_id = id, "Thread resumed");
        }
        Ok(())
    }

    /// Change a thread's caller-assigned priority
    pub fn set_priority(&mut self, id: &str, priority: f64) -> SchedulerResult<()> {
        self.thread_mut(id)?.set_priority(priority);
        debug!(thread_id = id, priority, "Thread priority changed");
        Ok(())
    }

    fn thread_mut(&mut self, id: &str) -> SchedulerResult<&mut CognitiveThread> {
        self.threads
            .get_mut(id)
            .ok_or_else(|| SchedulerError::ThreadNotFound(id.to_string()))
    }
}
