//! Timestamped log of driver actions

use crate::Result;
use std::io::Write;
use std::path::Path;
use tracing::info;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Ordered history of actions performed against an engine
#[derive(Debug, Clone, Default)]
pub struct ActionHistory {
    entries: Vec<String>,
}

impl ActionHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an action, prefixed with the local time
    pub fn record(&mut self, action: impl AsRef<str>) {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT);
        self.entries.push(format!("[{}] {}", timestamp, action.as_ref()));
    }

    /// Recorded entries, oldest first
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write every entry to `path`, one per line, replacing the file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = std::fs::File::create(path)?;
        for entry in &self.entries {
            writeln!(file, "{}", entry)?;
        }
        info!("Action history saved to {}", path.display());
        Ok(())
    }
}
