//! Target-window lookup by title.
//!
//! The game receives input at absolute screen coordinates, but it must hold
//! foreground focus for hardware-level clicks to register. This module finds
//! the window handle so the input layer can re-focus it before clicking.

use anyhow::{anyhow, Result};
use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;

use windows::Win32::Foundation::{BOOL, HWND, LPARAM, TRUE};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetWindowTextLengthW, GetWindowTextW, IsWindow, IsWindowVisible,
};

/// Finds a visible top-level window whose title matches `title` after
/// trimming, by enumerating all windows.
///
/// The original target pads its title with trailing spaces, so an exact
/// comparison would miss it.
pub fn find_window_by_title(title: &str) -> Result<HWND> {
    struct EnumData {
        wanted: String,
        hwnd: Option<HWND>,
    }

    unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
        unsafe {
            let data = &mut *(lparam.0 as *mut EnumData);

            if !IsWindowVisible(hwnd).as_bool() {
                return TRUE;
            }

            let title_len = GetWindowTextLengthW(hwnd);
            if title_len == 0 {
                return TRUE;
            }
            let mut buf: Vec<u16> = vec![0; (title_len + 1) as usize];
            GetWindowTextW(hwnd, &mut buf);
            let title = OsString::from_wide(&buf[..title_len as usize])
                .to_string_lossy()
                .to_string();

            if title.trim() == data.wanted {
                data.hwnd = Some(hwnd);
                return BOOL(0); // Stop enumeration
            }

            TRUE
        }
    }

    let mut data = EnumData {
        wanted: title.trim().to_string(),
        hwnd: None,
    };
    unsafe {
        // EnumWindows returns FALSE when the callback stops it early, which
        // is the found case, not an error.
        let _ = EnumWindows(Some(enum_callback), LPARAM(&mut data as *mut _ as isize));
    }

    data.hwnd
        .ok_or_else(|| anyhow!("Could not find window titled '{}'. Is the game running?", title))
}

/// Checks if a window handle is still valid.
pub fn is_window_valid(hwnd: HWND) -> bool {
    unsafe { IsWindow(hwnd).as_bool() }
}
