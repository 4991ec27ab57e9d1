//! Run configuration, persisted as JSON next to the executable.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

fn default_buy_click_delay() -> f32 {
    0.50
}

fn default_buy_interval() -> f32 {
    0.05
}

fn default_buy_to_verify_delay() -> f32 {
    0.0
}

fn default_verify_interval() -> f32 {
    0.05
}

fn default_ocr_poll_interval() -> f32 {
    0.95
}

fn default_settle_delay() -> f32 {
    1.5
}

fn default_continue_after_complete() -> bool {
    true
}

fn default_click_refresh_near_end() -> bool {
    true
}

fn default_verify_color() -> [u8; 3] {
    // Sampled from the post-purchase confirmation button.
    [175, 109, 65]
}

fn default_verify_threshold() -> f32 {
    50.0
}

fn default_jitter_px() -> i32 {
    2
}

fn default_window_title() -> String {
    "三角洲行动".to_string()
}

/// Tunable timings and targets for a run. All delays are in seconds.
///
/// Unknown fields in the config file are ignored and missing ones take
/// defaults, so old config files keep working across releases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    /// Pause between the 0:01 trigger and the buy click.
    #[serde(default = "default_buy_click_delay")]
    pub buy_click_delay: f32,

    /// Pause between buy verification polls.
    #[serde(default = "default_buy_interval")]
    pub buy_interval: f32,

    /// Pause between the end of the buy wait and the first confirm click.
    #[serde(default = "default_buy_to_verify_delay")]
    pub buy_to_verify_delay: f32,

    /// Pause between confirmation-dismissal polls.
    #[serde(default = "default_verify_interval")]
    pub verify_interval: f32,

    /// Pause between countdown reads when time remains.
    #[serde(default = "default_ocr_poll_interval")]
    pub ocr_poll_interval: f32,

    /// Wait before the cleanup Escape and re-arm refresh.
    #[serde(default = "default_settle_delay")]
    pub settle_delay: f32,

    /// Keep looping while the currency reading is unchanged after a cycle.
    #[serde(default = "default_continue_after_complete")]
    pub continue_after_complete: bool,

    /// Click refresh at 0:03 so the listing is fresh when the buy fires.
    #[serde(default = "default_click_refresh_near_end")]
    pub click_refresh_near_end: bool,

    /// RGB of the confirmation marker sampled for purchase verification.
    #[serde(default = "default_verify_color")]
    pub verify_color: [u8; 3],

    /// Maximum color distance still counted as a verification match.
    #[serde(default = "default_verify_threshold")]
    pub verify_threshold: f32,

    /// Random click offset in pixels, per axis.
    #[serde(default = "default_jitter_px")]
    pub jitter_px: i32,

    /// Title of the game window, matched after trimming.
    #[serde(default = "default_window_title")]
    pub window_title: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            buy_click_delay: default_buy_click_delay(),
            buy_interval: default_buy_interval(),
            buy_to_verify_delay: default_buy_to_verify_delay(),
            verify_interval: default_verify_interval(),
            ocr_poll_interval: default_ocr_poll_interval(),
            settle_delay: default_settle_delay(),
            continue_after_complete: default_continue_after_complete(),
            click_refresh_near_end: default_click_refresh_near_end(),
            verify_color: default_verify_color(),
            verify_threshold: default_verify_threshold(),
            jitter_px: default_jitter_px(),
            window_title: default_window_title(),
        }
    }
}

impl RunConfig {
    /// Clamps out-of-range values in place. Negative delays become zero.
    pub fn sanitize(&mut self) {
        self.buy_click_delay = self.buy_click_delay.max(0.0);
        self.buy_interval = self.buy_interval.max(0.0);
        self.buy_to_verify_delay = self.buy_to_verify_delay.max(0.0);
        self.verify_interval = self.verify_interval.max(0.0);
        self.ocr_poll_interval = self.ocr_poll_interval.max(0.0);
        self.settle_delay = self.settle_delay.max(0.0);
        self.verify_threshold = self.verify_threshold.max(0.0);
        self.jitter_px = self.jitter_px.max(0);
    }

    pub fn buy_click_delay(&self) -> Duration {
        Duration::from_secs_f32(self.buy_click_delay)
    }

    pub fn buy_interval(&self) -> Duration {
        Duration::from_secs_f32(self.buy_interval)
    }

    pub fn buy_to_verify_delay(&self) -> Duration {
        Duration::from_secs_f32(self.buy_to_verify_delay)
    }

    pub fn verify_interval(&self) -> Duration {
        Duration::from_secs_f32(self.verify_interval)
    }

    pub fn ocr_poll_interval(&self) -> Duration {
        Duration::from_secs_f32(self.ocr_poll_interval)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs_f32(self.settle_delay)
    }
}

/// Loads the config from disk, falling back to defaults when the file is
/// missing or unreadable.
pub fn load_config() -> RunConfig {
    let path = crate::paths::get_config_path();
    let mut config = match fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<RunConfig>(&contents) {
            Ok(config) => config,
            Err(e) => {
                crate::log(&format!("Bad config file, using defaults: {}", e));
                RunConfig::default()
            }
        },
        Err(_) => RunConfig::default(),
    };
    config.sanitize();
    config
}

/// Writes the config to disk as pretty-printed JSON.
pub fn save_config(config: &RunConfig) -> Result<()> {
    let path = crate::paths::get_config_path();
    let contents = serde_json::to_string_pretty(config)?;
    fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
