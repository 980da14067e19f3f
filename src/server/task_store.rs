//! Task Storage
//!
//! Information Hiding:
//! - Storage backend hidden behind the `TaskStore` trait
//! - In-memory map guarded by RwLock behind an async interface
//! - Task ids are write-once: an id is reserved before its handler runs,
//!   and a second reservation under the same id is rejected

use crate::protocol::Task;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskStoreError {
    #[error("task '{0}' already exists")]
    AlreadyExists(String),
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Claim `id` and record it as working. Fails if the id was ever claimed.
    async fn reserve(&self, id: &str) -> Result<(), TaskStoreError>;

    /// Record the final state of a reserved task.
    async fn complete(&self, task: Task);

    /// Look a task up by id. `None` if it was never reserved.
    async fn get(&self, id: &str) -> Option<Task>;
}

/// Tasks are lost when the process terminates.
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<HashMap<String, Task>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn reserve(&self, id: &str) -> Result<(), TaskStoreError> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(id) {
            return Err(TaskStoreError::AlreadyExists(id.to_string()));
        }
        tracing::debug!("[InMemoryTaskStore] Reserved task '{}'", id);
        tasks.insert(id.to_string(), Task::working(id));
        Ok(())
    }

    async fn complete(&self, task: Task) {
        tracing::debug!(
            "[InMemoryTaskStore] Task '{}' is {:?}",
            task.id,
            task.status.state
        );
        self.tasks.write().await.insert(task.id.clone(), task);
    }

    async fn get(&self, id: &str) -> Option<Task> {
        let tasks = self.tasks.read().await;
        tasks.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Artifact, TaskState};

    #[tokio::test]
    async fn test_reserve_then_complete() {
        let store = InMemoryTaskStore::new();

        store.reserve("t-1").await.unwrap();
        assert_eq!(store.get("t-1").await.unwrap().status.state, TaskState::Working);

        let task = Task::completed("t-1", vec![Artifact::text("reply", "hello")]);
        store.complete(task.clone()).await;

        assert_eq!(store.get("t-1").await, Some(task));
    }

    #[tokio::test]
    async fn test_get_unknown_task() {
        let store = InMemoryTaskStore::new();
        assert!(store.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_task_id_is_write_once() {
        let store = InMemoryTaskStore::new();
        store.reserve("t-1").await.unwrap();
        store.complete(Task::completed("t-1", vec![])).await;

        let second = store.reserve("t-1").await;

        assert_eq!(second, Err(TaskStoreError::AlreadyExists("t-1".to_string())));
        let kept = store.get("t-1").await.unwrap();
        assert_eq!(kept.status.state, TaskState::Completed);
    }

    #[tokio::test]
    async fn test_concurrent_reservations_admit_one() {
        let store = Arc::new(InMemoryTaskStore::new());

        let attempts = (0..8).map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.reserve("shared").await })
        });
        let results = futures::future::join_all(attempts).await;

        let admitted = results
            .into_iter()
            .filter(|result| matches!(result, Ok(Ok(()))))
            .count();
        assert_eq!(admitted, 1);
    }
}
