//! Line-oriented progress log handed in by the job that runs the request.

use std::sync::Mutex;

use tracing::info;

/// Sink for the human-readable notices written while a request runs.
pub trait ConsoleLog: Send + Sync {
    fn line(&self, line: &str);
}

/// Forwards every line to `tracing` at INFO.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConsole;

impl ConsoleLog for TracingConsole {
    fn line(&self, line: &str) {
        info!(target: "http_request::console", "{line}");
    }
}

/// Collects lines in memory.
#[derive(Debug, Default)]
pub struct MemoryConsole {
    lines: Mutex<Vec<String>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl ConsoleLog for MemoryConsole {
    fn line(&self, line: &str) {
        match self.lines.lock() {
            Ok(mut lines) => lines.push(line.to_string()),
            Err(poisoned) => poisoned.into_inner().push(line.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_console_keeps_lines_in_order() {
        let console = MemoryConsole::new();
        console.line("HttpMode: GET");
        console.line("URL: http://localhost/");
        assert_eq!(console.lines(), vec!["HttpMode: GET", "URL: http://localhost/"]);
        assert!(console.contains("localhost"));
        assert!(!console.contains("POST"));
    }
}
