//! Purchase execution: the buy click, verification polling, confirmation
//! dismissal, and post-purchase cleanup.
//!
//! Everything here runs inside the commit window after the countdown hit
//! zero. Stop requests are deliberately not checked: once the buy fires,
//! the sequence runs to the end so the shop is never left mid-dialog.

use anyhow::{anyhow, Result};
use std::thread;
use std::time::Duration;

use crate::capture::{crop_frame, Frame};
use crate::input::Key;
use crate::ocr::preprocess::prepare_timer_crop;
use crate::regions::VERIFY_CHECK_REGION;

use super::currency::{continue_next, CurrencySnapshot};
use super::runner::Engine;
use super::state::EngineState;
use super::verify::region_matches_color;

/// How many times the verify signal is polled after the buy click before
/// giving up and moving on.
const MAX_VERIFY_POLLS: u32 = 5;

/// How many of those polls may re-click the buy button. Later polls only
/// watch, so a slow-to-render dialog doesn't eat double purchases.
const MAX_RECLICKS: u32 = 2;

/// Signal detections tolerated before assuming the overlay is stuck and
/// clicking a neutral corner to unwedge it.
const CONFIRM_DISMISS_AFTER: u32 = 2;

const CAPTURE_RETRIES: u32 = 10;
const CAPTURE_RETRY_DELAY: Duration = Duration::from_millis(50);

impl Engine {
    /// Clicks the center of a named region.
    pub(crate) fn click_region(&mut self, name: &str) -> Result<()> {
        let (x, y) = self.regions.require(name)?.center();
        self.input.click(x, y)
    }

    /// Grabs a frame, retrying briefly while the capture source warms up.
    fn capture_frame(&mut self) -> Result<Frame> {
        for _ in 0..CAPTURE_RETRIES {
            if let Some(frame) = self.frames.capture() {
                return Ok(frame);
            }
            thread::sleep(CAPTURE_RETRY_DELAY);
        }
        Err(anyhow!("Capture source produced no frame"))
    }

    /// Reads the text in a named region from a fresh frame.
    ///
    /// The countdown crop goes through binarization and upscaling; the
    /// balance readout recognizes better raw.
    pub(crate) fn ocr_region(&mut self, name: &str) -> Result<String> {
        let frame = self.capture_frame()?;
        let region = *self.regions.require(name)?;
        let crop = crop_frame(&frame, &region)
            .ok_or_else(|| anyhow!("Region '{}' lies outside the captured frame", name))?;
        let prepared = if name == "money" {
            crop
        } else {
            prepare_timer_crop(&crop)
        };
        Ok(self.ocr.recognize(&prepared))
    }

    /// Samples the verification probe pixel on a fresh frame.
    ///
    /// Uses the dedicated probe region when configured, otherwise the
    /// verify button's own center. Capture trouble reads as "no signal".
    pub(crate) fn verify_signal(&mut self) -> bool {
        let Some(frame) = self.frames.capture() else {
            return false;
        };
        let Some(region) = self
            .regions
            .get(VERIFY_CHECK_REGION)
            .or_else(|| self.regions.get("verify"))
        else {
            return false;
        };
        region_matches_color(
            &frame,
            region,
            self.config.verify_color,
            self.config.verify_threshold,
        )
    }

    /// Clicks buy and polls for the purchase signal, re-clicking a bounded
    /// number of times.
    pub(crate) fn execute_buy(&mut self) -> Result<()> {
        self.click_region("buy")?;

        let mut polls = 0;
        loop {
            if polls >= MAX_VERIFY_POLLS {
                self.observer.status("No purchase signal, moving on");
                break;
            }
            if self.verify_signal() {
                self.observer.status("Purchase signal detected");
                break;
            }
            polls += 1;
            thread::sleep(self.config.buy_interval());
            if polls <= MAX_RECLICKS {
                self.click_region("buy")?;
            }
        }

        self.state = EngineState::VerifyConfirm;
        Ok(())
    }

    /// Clicks the verify button, then keeps clicking until the confirmation
    /// signal clears.
    pub(crate) fn confirm_dialog(&mut self) -> Result<()> {
        thread::sleep(self.config.buy_to_verify_delay());
        self.click_region("verify")?;

        let mut detections = 0;
        while self.verify_signal() {
            detections += 1;
            if detections > CONFIRM_DISMISS_AFTER {
                // The overlay is not reacting to the verify button; a click
                // on the screen corner clears a modal without hitting UI.
                self.input.click(1, 1)?;
            }
            thread::sleep(self.config.verify_interval());
            self.click_region("verify")?;
        }

        self.state = EngineState::PostRefresh;
        Ok(())
    }

    /// Lets the UI settle, clears any lingering overlay, re-arms the
    /// listing, and decides loop-vs-finish from the balance.
    pub(crate) fn settle_and_refresh(&mut self) -> Result<()> {
        thread::sleep(self.config.settle_delay());

        if self.verify_signal() {
            self.input.key_press(Key::Escape)?;
        }

        self.click_region("refresh")?;
        self.filter.reset_epoch();
        self.filter.mark_refreshed();
        self.pre_refreshed = false;
        self.last_published = None;

        let after = CurrencySnapshot::from_reading(&self.ocr_region("money")?);
        self.observer
            .status(&format!("Balance after cycle: {}", after.0));

        if continue_next(
            self.config.continue_after_complete,
            &self.balance_before,
            &after,
        ) {
            self.observer.status("Balance unchanged, arming next cycle");
            self.refresh_config();
            self.balance_before = after;
            self.state = EngineState::Monitoring;
        } else {
            self.observer.status("Balance changed, run complete");
            self.state = EngineState::Completed;
        }
        Ok(())
    }
}
