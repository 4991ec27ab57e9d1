//! SendInput-based click and key injection.
//!
//! The target rejects message-level clicks (PostMessage), so events go
//! through SendInput with normalized absolute coordinates, which the OS
//! treats like real hardware input. The target window is re-focused before
//! every click because SendInput delivers to whichever window has focus.

use anyhow::{anyhow, Result};
use std::thread;
use std::time::Duration;

use windows::Win32::Foundation::HWND;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYEVENTF_KEYUP,
    MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MOVE,
    MOUSEINPUT, VK_ESCAPE,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetForegroundWindow, GetSystemMetrics, SetForegroundWindow, SM_CXSCREEN, SM_CYSCREEN,
};

use super::{apply_jitter, ClickInjector, Key};
use crate::capture::window::{find_window_by_title, is_window_valid};

/// Delay between button-down and button-up. Shorter presses get dropped by
/// the target's input handling.
const PRESS_HOLD: Duration = Duration::from_millis(10);

/// Delay after focusing the window before injecting, letting the focus
/// change settle.
const FOCUS_SETTLE: Duration = Duration::from_millis(50);

pub struct SendInputClicker {
    hwnd: HWND,
    window_title: String,
    jitter_px: i32,
}

// HWND is a plain handle value; the injector is only ever used from the
// worker thread after construction.
unsafe impl Send for SendInputClicker {}

impl SendInputClicker {
    /// Finds the target window by title and binds the injector to it.
    pub fn for_window(title: &str, jitter_px: i32) -> Result<Self> {
        let hwnd = find_window_by_title(title)?;
        crate::log(&format!("Bound input to window '{}'", title.trim()));
        Ok(Self {
            hwnd,
            window_title: title.to_string(),
            jitter_px,
        })
    }

    /// Brings the target window to the foreground, re-resolving the handle
    /// if the window was recreated.
    fn ensure_focus(&mut self) -> Result<()> {
        if !is_window_valid(self.hwnd) {
            self.hwnd = find_window_by_title(&self.window_title)?;
        }
        unsafe {
            if GetForegroundWindow() != self.hwnd {
                let _ = SetForegroundWindow(self.hwnd);
                thread::sleep(FOCUS_SETTLE);
            }
        }
        Ok(())
    }
}

/// Scales screen pixels to the 0..=65535 range SendInput uses for absolute
/// mouse coordinates.
fn normalize(x: i32, y: i32) -> Result<(i32, i32)> {
    let (screen_w, screen_h) =
        unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
    if screen_w <= 0 || screen_h <= 0 {
        return Err(anyhow!("Could not read screen dimensions"));
    }
    Ok((x * 65535 / screen_w, y * 65535 / screen_h))
}

fn mouse_input(dx: i32, dy: i32, flags: windows::Win32::UI::Input::KeyboardAndMouse::MOUSE_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                dwFlags: flags,
                ..Default::default()
            },
        },
    }
}

impl ClickInjector for SendInputClicker {
    fn click(&mut self, x: i32, y: i32) -> Result<()> {
        self.ensure_focus()?;

        let (x, y) = apply_jitter(x, y, self.jitter_px);
        let (nx, ny) = normalize(x, y)?;

        // Move, press, short hold, release. Sending them in one batch makes
        // the press land before the cursor settles.
        unsafe {
            let move_input = [mouse_input(nx, ny, MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE)];
            SendInput(&move_input, std::mem::size_of::<INPUT>() as i32);

            let down = [mouse_input(nx, ny, MOUSEEVENTF_LEFTDOWN | MOUSEEVENTF_ABSOLUTE)];
            SendInput(&down, std::mem::size_of::<INPUT>() as i32);

            thread::sleep(PRESS_HOLD);

            let up = [mouse_input(nx, ny, MOUSEEVENTF_LEFTUP | MOUSEEVENTF_ABSOLUTE)];
            SendInput(&up, std::mem::size_of::<INPUT>() as i32);
        }
        Ok(())
    }

    fn key_press(&mut self, key: Key) -> Result<()> {
        self.ensure_focus()?;

        let vk = match key {
            Key::Escape => VK_ESCAPE,
        };

        let key_input = |flags| INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: vk,
                    dwFlags: flags,
                    ..Default::default()
                },
            },
        };

        unsafe {
            let down = [key_input(Default::default())];
            SendInput(&down, std::mem::size_of::<INPUT>() as i32);
            thread::sleep(PRESS_HOLD);
            let up = [key_input(KEYEVENTF_KEYUP)];
            SendInput(&up, std::mem::size_of::<INPUT>() as i32);
        }
        Ok(())
    }
}
