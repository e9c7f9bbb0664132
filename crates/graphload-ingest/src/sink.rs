//! Error sink
//!
//! Collects one human-readable message per failed record (or failed entity
//! type) from all upload tasks and writes them out once at the end of a run.

use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct ErrorSink {
    messages: Mutex<Vec<String>>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, message: impl Into<String>) {
        self.lock().push(message.into());
    }

    /// Record a failure in the `"{entity} ({reason}) : {values}"` layout
    pub fn record_failure(&self, entity: &str, reason: &dyn std::fmt::Display, values: &[String]) {
        let values = serde_json::to_string(values).unwrap_or_else(|_| format!("{:?}", values));
        self.push(format!("{} ({}) : {}", entity, reason, values));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Write every message, one per line, replacing any existing file
    pub fn flush_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let messages = self.snapshot();
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        for message in &messages {
            // Keep one message per line even if a reason spans several
            writeln!(file, "{}", message.replace(['\r', '\n'], " "))?;
        }
        file.flush()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_record_failure_format() {
        let sink = ErrorSink::new();
        sink.record_failure(
            "Person",
            &"could not insert node",
            &["1".to_string(), "Al\"ice".to_string()],
        );

        assert_eq!(
            sink.snapshot(),
            vec![r#"Person (could not insert node) : ["1","Al\"ice"]"#.to_string()]
        );
    }

    #[test]
    fn test_concurrent_pushes() {
        let sink = Arc::new(ErrorSink::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        sink.push(format!("{}-{}", t, i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sink.len(), 800);
    }

    #[test]
    fn test_flush_one_message_per_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("errors.log");

        let sink = ErrorSink::new();
        sink.push("first");
        sink.push("second\nwith break");
        sink.flush_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond with break\n");
    }

    #[test]
    fn test_flush_empty_sink_creates_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("errors.log");
        ErrorSink::new().flush_to(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().is_empty());
        assert!(ErrorSink::new().is_empty());
    }
}
