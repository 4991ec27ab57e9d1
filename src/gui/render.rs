//! GUI rendering functions.
//!
//! Contains UI layout and component rendering logic.

use eframe::egui::{self, Color32, RichText};

use crate::engine::runner::IMMINENT_SECS;

use super::state::{GuiState, RunStatus};

/// Buttons clicked this frame.
#[derive(Default)]
pub struct ControlClicks {
    pub start: bool,
    pub pause: bool,
    pub resume: bool,
    pub stop: bool,
}

/// Render the status line and the large countdown readout.
pub fn render_status(ui: &mut egui::Ui, state: &GuiState) {
    ui.horizontal(|ui| {
        ui.label("Status:");

        let status_color = match &state.status {
            RunStatus::Idle => Color32::GRAY,
            RunStatus::Running => Color32::from_rgb(0, 120, 200),
            RunStatus::Paused => Color32::from_rgb(200, 150, 0),
            RunStatus::Finished => Color32::from_rgb(0, 150, 0),
            RunStatus::Error(_) => Color32::from_rgb(200, 0, 0),
        };
        ui.label(RichText::new(state.status.status_text()).color(status_color));
    });

    if !state.status_line.is_empty() {
        ui.label(&state.status_line);
    }

    ui.add_space(8.0);
    let (text, color) = match state.timer {
        Some((minutes, seconds)) => {
            // Red once the buy window is imminent.
            let color = if minutes == 0 && seconds <= IMMINENT_SECS {
                Color32::from_rgb(220, 40, 40)
            } else {
                Color32::WHITE
            };
            (format!("{}:{:02}", minutes, seconds), color)
        }
        None => ("--:--".to_string(), Color32::GRAY),
    };
    ui.vertical_centered(|ui| {
        ui.label(RichText::new(text).size(48.0).color(color).monospace());
    });
}

/// Render the control buttons. Returns which were clicked.
pub fn render_controls(ui: &mut egui::Ui, state: &GuiState, paused: bool) -> ControlClicks {
    let mut clicks = ControlClicks::default();

    ui.add_space(8.0);
    ui.separator();
    ui.add_space(8.0);

    ui.horizontal(|ui| {
        let is_running = state.status.is_running();

        ui.add_enabled_ui(!is_running, |ui| {
            if ui.button(RichText::new("▶ Start").size(16.0)).clicked() {
                clicks.start = true;
            }
        });

        ui.add_space(20.0);

        ui.add_enabled_ui(is_running, |ui| {
            if paused {
                if ui.button(RichText::new("⏵ Resume").size(16.0)).clicked() {
                    clicks.resume = true;
                }
            } else if ui.button(RichText::new("⏸ Pause").size(16.0)).clicked() {
                clicks.pause = true;
            }
        });

        ui.add_space(20.0);

        ui.add_enabled_ui(is_running, |ui| {
            if ui.button(RichText::new("◼ Stop").size(16.0)).clicked() {
                clicks.stop = true;
            }
        });
    });

    clicks
}

/// Render the editable run settings.
pub fn render_config(ui: &mut egui::Ui, state: &mut GuiState) {
    ui.add_space(8.0);
    ui.separator();
    ui.add_space(8.0);

    ui.collapsing("Settings", |ui| {
        let config = &mut state.config_draft;

        egui::Grid::new("config_grid")
            .num_columns(2)
            .spacing([12.0, 6.0])
            .show(ui, |ui| {
                ui.label("Window title:");
                ui.text_edit_singleline(&mut config.window_title);
                ui.end_row();

                ui.label("Buy click delay (s):");
                ui.add(
                    egui::DragValue::new(&mut config.buy_click_delay)
                        .range(0.0..=5.0)
                        .speed(0.01),
                );
                ui.end_row();

                ui.label("Poll interval (s):");
                ui.add(
                    egui::DragValue::new(&mut config.ocr_poll_interval)
                        .range(0.0..=5.0)
                        .speed(0.01),
                );
                ui.end_row();

                ui.label("Settle delay (s):");
                ui.add(
                    egui::DragValue::new(&mut config.settle_delay)
                        .range(0.0..=10.0)
                        .speed(0.1),
                );
                ui.end_row();

                ui.label("Click jitter (px):");
                ui.add(egui::DragValue::new(&mut config.jitter_px).range(0..=10));
                ui.end_row();
            });

        ui.add_space(4.0);
        ui.checkbox(
            &mut config.continue_after_complete,
            "Keep looping while the balance is unchanged",
        );
        ui.checkbox(
            &mut config.click_refresh_near_end,
            "Refresh the listing at 0:03",
        );
    });
}

/// Render the engine log scrollback.
pub fn render_log(ui: &mut egui::Ui, state: &GuiState) {
    ui.add_space(8.0);
    ui.separator();
    ui.add_space(8.0);

    ui.label("Log:");
    egui::ScrollArea::vertical()
        .max_height(160.0)
        .stick_to_bottom(true)
        .show(ui, |ui| {
            for line in &state.log_lines {
                ui.label(RichText::new(line).monospace().size(12.0));
            }
        });
}
