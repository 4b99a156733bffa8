//! Tag-addressed registry of spawned Tokio tasks.
//!
//! Both reminder delivery paths keep at most one task per tag. Registering a
//! tag again aborts the previous task; a task that finishes only removes its
//! own entry, never a newer registration made under the same tag.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use uuid::Uuid;

struct RegisteredTask {
    task_id: Uuid,
    handle: JoinHandle<()>,
}

#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<Mutex<HashMap<String, RegisteredTask>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RegisteredTask>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `task` under `tag`, replacing whatever was registered there
    pub fn spawn<F>(&self, tag: &str, task: F) -> Uuid
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task_id = Uuid::new_v4();
        let registry = self.clone();
        let owned_tag = tag.to_string();

        // Held across spawn + insert so a task that completes immediately
        // cannot try to deregister before it is registered.
        let mut tasks = self.lock();
        let handle = tokio::spawn(async move {
            task.await;
            registry.finish(&owned_tag, task_id);
        });

        if let Some(previous) = tasks.insert(tag.to_string(), RegisteredTask { task_id, handle }) {
            previous.handle.abort();
        }

        task_id
    }

    fn finish(&self, tag: &str, task_id: Uuid) {
        let mut tasks = self.lock();
        if tasks.get(tag).map(|task| task.task_id) == Some(task_id) {
            tasks.remove(tag);
        }
    }

    /// Abort and forget the task under `tag`; returns whether one existed
    pub fn cancel(&self, tag: &str) -> bool {
        match self.lock().remove(tag) {
            Some(task) => {
                task.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, tag: &str) -> bool {
        self.lock()
            .get(tag)
            .map(|task| !task.handle.is_finished())
            .unwrap_or(false)
    }

    /// Number of tasks that have not completed yet
    pub fn pending_count(&self) -> usize {
        self.lock()
            .values()
            .filter(|task| !task.handle.is_finished())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_spawn_and_complete() {
        let registry = TaskRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let task_counter = counter.clone();
        registry.spawn("tag", async move {
            task_counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!registry.is_pending("tag"));
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_respawn_replaces_previous_task() {
        let registry = TaskRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let first = counter.clone();
        registry.spawn("tag", async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            first.fetch_add(1, Ordering::SeqCst);
        });
        let second = counter.clone();
        registry.spawn("tag", async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            second.fetch_add(10, Ordering::SeqCst);
        });

        assert_eq!(registry.pending_count(), 1);
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_cancel() {
        let registry = TaskRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let task_counter = counter.clone();
        registry.spawn("tag", async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            task_counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(registry.is_pending("tag"));
        assert!(registry.cancel("tag"));
        assert!(!registry.is_pending("tag"));
        // Cancelling again is a no-op
        assert!(!registry.cancel("tag"));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
