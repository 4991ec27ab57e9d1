//! GUI module for the application.
//!
//! Provides a graphical interface using egui/eframe for starting, pausing,
//! and stopping runs and watching the countdown the engine sees.

pub mod render;
pub mod state;

use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};

use eframe::egui::{self, Vec2};

use crate::engine::{self, ObserverEvent, RunConfig, RunControl};

use state::{GuiState, RunStatus};

/// Main GUI application struct.
pub struct GuiApp {
    /// Application state.
    state: GuiState,
    /// Stop/pause flags shared with the worker.
    control: Arc<RunControl>,
    /// Config the worker re-reads at cycle boundaries.
    shared_config: Arc<Mutex<RunConfig>>,
    /// Event channel from the worker, present while a run is live.
    events: Option<Receiver<ObserverEvent>>,
}

impl GuiApp {
    /// Create a new GUI application instance.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        // Configure fonts to support Chinese
        Self::setup_fonts(&cc.egui_ctx);

        let config = engine::config::load_config();
        Self {
            state: GuiState {
                config_draft: config.clone(),
                ..GuiState::default()
            },
            control: Arc::new(RunControl::new()),
            shared_config: Arc::new(Mutex::new(config)),
            events: None,
        }
    }

    /// Setup fonts with Chinese support.
    fn setup_fonts(ctx: &egui::Context) {
        let mut fonts = egui::FontDefinitions::default();

        // Common Chinese fonts on Windows: Microsoft YaHei, SimHei, SimSun
        let font_paths = [
            "C:\\Windows\\Fonts\\msyh.ttc",
            "C:\\Windows\\Fonts\\simhei.ttf",
            "C:\\Windows\\Fonts\\simsun.ttc",
        ];

        let mut font_loaded = false;
        for font_path in &font_paths {
            if let Ok(font_data) = std::fs::read(font_path) {
                fonts.font_data.insert(
                    "chinese_font".to_owned(),
                    egui::FontData::from_owned(font_data).into(),
                );

                fonts
                    .families
                    .entry(egui::FontFamily::Proportional)
                    .or_default()
                    .insert(0, "chinese_font".to_owned());
                fonts
                    .families
                    .entry(egui::FontFamily::Monospace)
                    .or_default()
                    .insert(0, "chinese_font".to_owned());

                crate::log(&format!("Loaded Chinese font from: {}", font_path));
                font_loaded = true;
                break;
            }
        }

        if !font_loaded {
            crate::log("Warning: Could not load Chinese font. Text may not display correctly.");
        }

        ctx.set_fonts(fonts);
    }

    /// Pushes the staged config edits to the worker and saves them.
    fn publish_config(&mut self) {
        self.state.config_draft.sanitize();
        if let Ok(mut shared) = self.shared_config.lock() {
            *shared = self.state.config_draft.clone();
        }
        if let Err(e) = engine::config::save_config(&self.state.config_draft) {
            crate::log(&format!("GUI: Failed to save config: {}", e));
        }
    }

    /// Handle start button click.
    fn handle_start(&mut self) {
        self.publish_config();

        match self.spawn_worker() {
            Ok(rx) => {
                self.events = Some(rx);
                self.state.status = RunStatus::Running;
                self.state.timer = None;
                crate::log("GUI: Run started");
            }
            Err(e) => {
                self.state.status = RunStatus::Error(e.to_string());
                crate::log(&format!("GUI: Failed to start run: {}", e));
            }
        }
    }

    #[cfg(windows)]
    fn spawn_worker(&mut self) -> anyhow::Result<Receiver<ObserverEvent>> {
        use crate::capture::screen::ScreenCapture;
        use crate::input::SendInputClicker;
        use crate::ocr::TesseractRecognizer;
        use crate::regions::RegionStore;

        let regions = RegionStore::load_from_file(&crate::paths::get_regions_path())?;
        let frames = ScreenCapture::primary_monitor()?;
        let ocr = TesseractRecognizer::locate()?;
        let (window_title, jitter_px) = {
            let config = self.state.config_draft.clone();
            (config.window_title, config.jitter_px)
        };
        let input = SendInputClicker::for_window(&window_title, jitter_px)?;

        let (tx, rx) = mpsc::channel();
        engine::runner::start_run(
            Box::new(frames),
            Box::new(ocr),
            Box::new(input),
            regions,
            self.shared_config.clone(),
            self.control.clone(),
            Box::new(engine::ChannelSink::new(tx)),
        );
        Ok(rx)
    }

    #[cfg(not(windows))]
    fn spawn_worker(&mut self) -> anyhow::Result<Receiver<ObserverEvent>> {
        anyhow::bail!("Screen capture and input injection require Windows")
    }

    /// Drain worker events into the display state.
    fn drain_events(&mut self) {
        let Some(rx) = &self.events else {
            return;
        };
        let mut finished = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                ObserverEvent::Status(line) => {
                    self.state.status_line = line.clone();
                    self.state.push_log(line);
                }
                ObserverEvent::Timer(minutes, seconds) => {
                    self.state.timer = Some((minutes, seconds));
                }
                ObserverEvent::Completed => finished = true,
            }
        }
        if finished {
            self.events = None;
            self.state.status = RunStatus::Finished;
            crate::log("GUI: Run finished");
        }
    }
}

impl eframe::App for GuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();

        // Repaint while a run is live so events surface promptly.
        if self.state.status.is_running() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Shop Sniper");
            ui.add_space(12.0);

            egui::ScrollArea::vertical().show(ui, |ui| {
                render::render_status(ui, &self.state);

                let clicks = render::render_controls(ui, &self.state, self.control.is_paused());
                if clicks.start {
                    self.handle_start();
                }
                if clicks.pause {
                    self.control.pause();
                    self.state.status = RunStatus::Paused;
                    crate::log("GUI: Paused");
                }
                if clicks.resume {
                    self.control.resume();
                    self.state.status = RunStatus::Running;
                    crate::log("GUI: Resumed");
                }
                if clicks.stop {
                    self.control.request_stop();
                    crate::log("GUI: Stop requested");
                }

                render::render_config(ui, &mut self.state);

                // Push live edits so the worker sees them at the next cycle
                // boundary.
                if self.state.status.is_running() {
                    let changed = self
                        .shared_config
                        .lock()
                        .map(|shared| *shared != self.state.config_draft)
                        .unwrap_or(false);
                    if changed {
                        self.publish_config();
                    }
                }

                render::render_log(ui, &self.state);
            });
        });
    }
}

/// Run the GUI application.
/// This function blocks until the window is closed.
pub fn run_gui() -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(Vec2::new(520.0, 560.0))
            .with_min_inner_size(Vec2::new(400.0, 420.0))
            .with_title("Shop Sniper")
            // Disable drag-and-drop to avoid COM conflict with RoInitialize (multithreaded)
            .with_drag_and_drop(false),
        ..Default::default()
    };

    eframe::run_native(
        "Shop Sniper",
        options,
        Box::new(|cc| Ok(Box::new(GuiApp::new(cc)))),
    )
}
