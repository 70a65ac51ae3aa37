//! User-facing notifications
//!
//! The migration reports through a sink instead of printing directly, so
//! batch code stays testable and the CLI decides the presentation.

use std::sync::Mutex;

use colored::Colorize;

pub trait NotificationSink: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Terminal sink used by the CLI.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn info(&self, message: &str) {
        println!("{}", message.green());
    }

    fn error(&self, message: &str) {
        eprintln!("{}", format!("Error: {}", message).red());
    }
}

/// Test sink that records everything it is handed.
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<(bool, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn infos(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(is_error, _)| !is_error)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(is_error, _)| *is_error)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl NotificationSink for RecordingSink {
    fn info(&self, message: &str) {
        let mut messages = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        messages.push((false, message.to_string()));
    }

    fn error(&self, message: &str) {
        let mut messages = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        messages.push((true, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_splits_levels() {
        let sink = RecordingSink::new();
        sink.info("migrated 3 files");
        sink.error("module without manifest");
        assert_eq!(sink.infos(), vec!["migrated 3 files".to_string()]);
        assert_eq!(sink.errors(), vec!["module without manifest".to_string()]);
    }
}
