//! GUI state: what the window shows between engine events.

use crate::engine::RunConfig;

/// Log lines kept in the scrollback panel.
const MAX_LOG_LINES: usize = 200;

/// Coarse run status for display.
#[derive(Clone, Debug, PartialEq)]
pub enum RunStatus {
    /// No worker running, ready to start.
    Idle,
    /// Worker running.
    Running,
    /// Worker running but paused at the monitoring loop.
    Paused,
    /// Worker ended; the last status line says how.
    Finished,
    /// Start failed before the worker launched.
    Error(String),
}

impl RunStatus {
    pub fn status_text(&self) -> String {
        match self {
            Self::Idle => "Idle".to_string(),
            Self::Running => "Running".to_string(),
            Self::Paused => "Paused".to_string(),
            Self::Finished => "Finished".to_string(),
            Self::Error(msg) => format!("Error: {}", msg),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

/// GUI application state.
#[derive(Debug)]
pub struct GuiState {
    /// Current run status.
    pub status: RunStatus,
    /// Last status line reported by the engine.
    pub status_line: String,
    /// Last accepted countdown reading, minutes and seconds.
    pub timer: Option<(u32, u32)>,
    /// Engine status scrollback.
    pub log_lines: Vec<String>,
    /// Config edits staged in the GUI; pushed to the engine on start and
    /// picked up at cycle boundaries while running.
    pub config_draft: RunConfig,
}

impl Default for GuiState {
    fn default() -> Self {
        Self {
            status: RunStatus::Idle,
            status_line: String::new(),
            timer: None,
            log_lines: Vec::new(),
            config_draft: RunConfig::default(),
        }
    }
}

impl GuiState {
    /// Appends a log line, trimming the oldest past the scrollback cap.
    pub fn push_log(&mut self, line: String) {
        self.log_lines.push(line);
        if self.log_lines.len() > MAX_LOG_LINES {
            let excess = self.log_lines.len() - MAX_LOG_LINES;
            self.log_lines.drain(..excess);
        }
    }
}
