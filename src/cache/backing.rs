//! Backing-Store Bridge
//!
//! Callback types for the slower store behind the cache, and the background
//! jobs built from them.

use std::fmt;
use std::sync::Arc;

/// Loads a value on a cache miss. Runs on the caller's task.
pub type ReadFn<K, V> = Arc<dyn Fn(&K) -> anyhow::Result<V> + Send + Sync>;

/// Persists a value. Runs on a background task.
pub type WriteFn<K, V> = Arc<dyn Fn(K, V) + Send + Sync>;

/// Removes a key from the backing store. Runs on a background task.
pub type DeleteFn<K> = Arc<dyn Fn(K) + Send + Sync>;

// == Callbacks ==
/// The currently configured callbacks; any of them may be absent.
pub struct Callbacks<K, V> {
    pub read: Option<ReadFn<K, V>>,
    pub write: Option<WriteFn<K, V>>,
    pub delete: Option<DeleteFn<K>>,
}

impl<K, V> Default for Callbacks<K, V> {
    fn default() -> Self {
        Self {
            read: None,
            write: None,
            delete: None,
        }
    }
}

impl<K, V> fmt::Debug for Callbacks<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("read", &self.read.is_some())
            .field("write", &self.write.is_some())
            .field("delete", &self.delete.is_some())
            .finish()
    }
}

// == Job ==
/// A callback invocation captured at scheduling time.
///
/// The callback is cloned out of [`Callbacks`] when the job is built, so
/// replacing a callback later does not affect jobs already scheduled.
pub enum Job<K, V> {
    Write {
        write: WriteFn<K, V>,
        key: K,
        value: V,
    },
    Delete {
        delete: DeleteFn<K>,
        key: K,
    },
}

impl<K, V> Job<K, V> {
    pub fn key(&self) -> &K {
        match self {
            Job::Write { key, .. } | Job::Delete { key, .. } => key,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Job::Write { .. } => "write",
            Job::Delete { .. } => "delete",
        }
    }

    /// Invokes the callback, consuming the job.
    pub fn run(self) {
        match self {
            Job::Write { write, key, value } => write(key, value),
            Job::Delete { delete, key } => delete(key),
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Job<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("kind", &self.kind())
            .field("key", self.key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_write_job_runs_callback_with_captured_args() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let write: WriteFn<String, u32> = Arc::new(move |k, v| sink.lock().unwrap().push((k, v)));

        let job = Job::Write {
            write,
            key: "a".to_string(),
            value: 7,
        };
        assert_eq!(job.kind(), "write");
        assert_eq!(job.key(), "a");
        job.run();

        assert_eq!(*seen.lock().unwrap(), vec![("a".to_string(), 7)]);
    }

    #[test]
    fn test_delete_job_runs_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let delete: DeleteFn<&'static str> = Arc::new(move |k| sink.lock().unwrap().push(k));

        let job: Job<&'static str, ()> = Job::Delete { delete, key: "gone" };
        assert_eq!(format!("{:?}", job), "Job { kind: \"delete\", key: \"gone\" }");
        job.run();

        assert_eq!(*seen.lock().unwrap(), vec!["gone"]);
    }

    #[test]
    fn test_callbacks_default_is_empty() {
        let callbacks: Callbacks<String, u32> = Callbacks::default();
        assert!(callbacks.read.is_none());
        assert!(callbacks.write.is_none());
        assert!(callbacks.delete.is_none());
    }
}
