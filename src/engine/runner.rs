//! The engine itself: a state machine advanced one step at a time by a
//! worker thread.
//!
//! All platform access goes through the capability traits (frames, OCR,
//! input, observer) so the whole machine runs under test with fakes. The
//! worker owns the engine; the GUI talks to it only through [`RunControl`]
//! flags, the shared config, and the observer channel.

use anyhow::Result;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::capture::FrameSource;
use crate::input::ClickInjector;
use crate::ocr::TextRecognizer;
use crate::regions::RegionStore;

use super::config::RunConfig;
use super::control::RunControl;
use super::currency::CurrencySnapshot;
use super::filter::{FilterOutcome, TimerFilter};
use super::observer::ObserverSink;
use super::state::EngineState;

/// Sleep slice while paused, so resume and stop stay responsive.
const PAUSE_QUANTUM: Duration = Duration::from_millis(150);

/// At or below this many seconds (with zero minutes) the engine polls
/// flat-out instead of sleeping between reads.
pub(crate) const IMMINENT_SECS: u32 = 5;

/// Countdown value that fires the buy sequence.
const TRIGGER_SECS: u32 = 1;

/// Countdown value for the optional pre-trigger refresh.
const PRE_REFRESH_SECS: u32 = 3;

pub struct Engine {
    pub(crate) frames: Box<dyn FrameSource>,
    pub(crate) ocr: Box<dyn TextRecognizer>,
    pub(crate) input: Box<dyn ClickInjector>,
    pub(crate) regions: RegionStore,
    pub(crate) config: RunConfig,
    pub(crate) shared_config: Arc<Mutex<RunConfig>>,
    pub(crate) control: Arc<RunControl>,
    pub(crate) observer: Box<dyn ObserverSink>,
    pub state: EngineState,
    pub(crate) filter: TimerFilter,
    /// Whether the pre-trigger refresh was already issued this epoch. Kept
    /// apart from the filter's refresh allowance, which each accepted
    /// reading consumes.
    pub(crate) pre_refreshed: bool,
    pub(crate) last_published: Option<(u32, u32)>,
    pub(crate) balance_before: CurrencySnapshot,
}

impl Engine {
    pub fn new(
        frames: Box<dyn FrameSource>,
        ocr: Box<dyn TextRecognizer>,
        input: Box<dyn ClickInjector>,
        regions: RegionStore,
        shared_config: Arc<Mutex<RunConfig>>,
        control: Arc<RunControl>,
        observer: Box<dyn ObserverSink>,
    ) -> Self {
        Self {
            frames,
            ocr,
            input,
            regions,
            config: RunConfig::default(),
            shared_config,
            control,
            observer,
            state: EngineState::Init,
            filter: TimerFilter::new(),
            pre_refreshed: false,
            last_published: None,
            balance_before: CurrencySnapshot::default(),
        }
    }

    /// Copies the shared config into the engine's working copy. Edits made
    /// in the GUI take effect at the next cycle boundary, never mid-cycle.
    pub(crate) fn refresh_config(&mut self) {
        if let Ok(shared) = self.shared_config.lock() {
            self.config = shared.clone();
        }
        self.config.sanitize();
    }

    /// Advances the state machine by one step. Returns false once a
    /// terminal state is reached.
    pub fn step(&mut self) -> Result<bool> {
        if self.state.is_terminal() {
            return Ok(false);
        }
        match self.state {
            EngineState::Init => self.step_init()?,
            EngineState::Monitoring => self.step_monitoring()?,
            EngineState::TriggerWindow => self.step_trigger()?,
            EngineState::Buying => self.execute_buy()?,
            EngineState::VerifyConfirm => self.confirm_dialog()?,
            EngineState::PostRefresh => self.settle_and_refresh()?,
            _ => {}
        }
        Ok(true)
    }

    fn step_init(&mut self) -> Result<()> {
        self.refresh_config();

        let missing = self.regions.missing_required();
        if !missing.is_empty() {
            let reason = format!("Missing regions: {}", missing.join(", "));
            self.observer.status(&reason);
            self.state = EngineState::Failed(reason);
            return Ok(());
        }

        let balance = self.ocr_region("money")?;
        self.balance_before = CurrencySnapshot::from_reading(&balance);
        self.observer
            .status(&format!("Opening balance: {}", self.balance_before.0));

        // Arm the listing so the countdown restarts from a known point.
        self.click_region("refresh")?;
        self.filter.mark_refreshed();
        self.pre_refreshed = false;
        self.observer.status("Armed, watching countdown");
        self.state = EngineState::Monitoring;
        Ok(())
    }

    fn step_monitoring(&mut self) -> Result<()> {
        while self.control.is_paused() && self.control.is_running() {
            thread::sleep(PAUSE_QUANTUM);
        }
        // The only stop point: a purchase in flight always runs to the end
        // of its click sequence.
        if !self.control.is_running() {
            self.observer.status("Stopped by request");
            self.state = EngineState::Stopped;
            return Ok(());
        }

        let raw = self.ocr_region("time")?;
        match self.filter.feed(&raw) {
            FilterOutcome::RolledOver => {
                self.observer.status("Restock rolled over, re-arming");
                self.click_region("refresh")?;
                self.pre_refreshed = false;
                thread::sleep(self.config.ocr_poll_interval());
            }
            FilterOutcome::Rejected => {
                thread::sleep(self.config.ocr_poll_interval());
            }
            FilterOutcome::Accepted(reading) => {
                let pair = (reading.minutes, reading.seconds);
                if self.last_published != Some(pair) {
                    self.observer.timer(reading.minutes, reading.seconds);
                    self.last_published = Some(pair);
                }

                if reading.minutes == 0 && reading.seconds == TRIGGER_SECS {
                    self.observer.status("Countdown at zero, buying");
                    self.state = EngineState::TriggerWindow;
                    return Ok(());
                }

                if reading.minutes == 0
                    && reading.seconds == PRE_REFRESH_SECS
                    && self.config.click_refresh_near_end
                    && !self.pre_refreshed
                {
                    self.observer.status("Refreshing listing before buy");
                    self.click_region("refresh")?;
                    self.filter.mark_refreshed();
                    self.pre_refreshed = true;
                }

                // Near the trigger, every millisecond of poll latency eats
                // into the buy window.
                if reading.minutes > 0 || reading.seconds > IMMINENT_SECS {
                    thread::sleep(self.config.ocr_poll_interval());
                }
            }
        }
        Ok(())
    }

    fn step_trigger(&mut self) -> Result<()> {
        thread::sleep(self.config.buy_click_delay());
        self.state = EngineState::Buying;
        Ok(())
    }
}

/// Spawns the worker thread and returns its handle. The engine reports
/// progress through `observer` until a terminal state, then signals
/// completion.
pub fn start_run(
    frames: Box<dyn FrameSource>,
    ocr: Box<dyn TextRecognizer>,
    input: Box<dyn ClickInjector>,
    regions: RegionStore,
    shared_config: Arc<Mutex<RunConfig>>,
    control: Arc<RunControl>,
    observer: Box<dyn ObserverSink>,
) -> thread::JoinHandle<()> {
    control.arm();
    thread::spawn(move || {
        let mut engine = Engine::new(
            frames,
            ocr,
            input,
            regions,
            shared_config,
            control,
            observer,
        );
        loop {
            match engine.step() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    let reason = format!("Run aborted: {:#}", e);
                    engine.observer.status(&reason);
                    engine.state = EngineState::Failed(reason);
                    break;
                }
            }
        }
        engine
            .observer
            .status(&format!("Run ended: {}", engine.state));
        engine.observer.completed();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Frame;
    use crate::engine::observer::ObserverEvent;
    use crate::input::Key;
    use crate::regions::{Region, RegionStore, REQUIRED_REGIONS};
    use image::{ImageBuffer, Rgba};
    use std::collections::{HashMap, VecDeque};

    const VERIFY_COLOR: [u8; 3] = [175, 109, 65];

    fn solid_frame(color: [u8; 3]) -> Frame {
        ImageBuffer::from_pixel(100, 100, Rgba([color[0], color[1], color[2], 255]))
    }

    fn dark() -> Frame {
        solid_frame([10, 10, 10])
    }

    fn signal() -> Frame {
        solid_frame(VERIFY_COLOR)
    }

    /// Pops scripted frames, then repeats the last one forever.
    struct ScriptedFrames {
        script: VecDeque<Frame>,
        last: Frame,
    }

    impl ScriptedFrames {
        fn new(frames: Vec<Frame>) -> Self {
            Self {
                script: frames.into(),
                last: dark(),
            }
        }
    }

    impl FrameSource for ScriptedFrames {
        fn capture(&mut self) -> Option<Frame> {
            if let Some(frame) = self.script.pop_front() {
                self.last = frame;
            }
            Some(self.last.clone())
        }
    }

    /// Returns scripted readings in order, then empty strings.
    struct ScriptedOcr {
        script: VecDeque<String>,
    }

    impl ScriptedOcr {
        fn new(readings: &[&str]) -> Self {
            Self {
                script: readings.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    impl TextRecognizer for ScriptedOcr {
        fn recognize(&mut self, _image: &Frame) -> String {
            self.script.pop_front().unwrap_or_default()
        }
    }

    #[derive(Default)]
    struct RecordingClicker {
        clicks: Vec<(i32, i32)>,
        keys: Vec<Key>,
    }

    impl ClickInjector for RecordingClicker {
        fn click(&mut self, x: i32, y: i32) -> Result<()> {
            self.clicks.push((x, y));
            Ok(())
        }

        fn key_press(&mut self, key: Key) -> Result<()> {
            self.keys.push(key);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<ObserverEvent>,
    }

    impl ObserverSink for RecordingSink {
        fn status(&mut self, message: &str) {
            self.events.push(ObserverEvent::Status(message.to_string()));
        }

        fn timer(&mut self, minutes: u32, seconds: u32) {
            self.events.push(ObserverEvent::Timer(minutes, seconds));
        }

        fn completed(&mut self) {
            self.events.push(ObserverEvent::Completed);
        }
    }

    fn test_regions() -> RegionStore {
        let mut map = HashMap::new();
        map.insert("time".to_string(), Region::new(0, 0, 20, 10));
        map.insert("buy".to_string(), Region::new(30, 0, 50, 10));
        map.insert("verify".to_string(), Region::new(60, 0, 80, 10));
        map.insert("refresh".to_string(), Region::new(0, 20, 20, 30));
        map.insert("money".to_string(), Region::new(30, 20, 50, 30));
        RegionStore::from_map(map).unwrap()
    }

    fn test_config() -> RunConfig {
        RunConfig {
            buy_click_delay: 0.0,
            buy_interval: 0.0,
            verify_interval: 0.0,
            ocr_poll_interval: 0.0,
            settle_delay: 0.0,
            verify_color: VERIFY_COLOR,
            jitter_px: 0,
            ..RunConfig::default()
        }
    }

    fn build_engine(
        frames: Vec<Frame>,
        readings: &[&str],
        regions: RegionStore,
    ) -> Engine {
        let control = Arc::new(RunControl::new());
        control.arm();
        Engine::new(
            Box::new(ScriptedFrames::new(frames)),
            Box::new(ScriptedOcr::new(readings)),
            Box::new(RecordingClicker::default()),
            regions,
            Arc::new(Mutex::new(test_config())),
            control,
            Box::new(RecordingSink::default()),
        )
    }

    fn run_to_terminal(engine: &mut Engine, max_steps: usize) {
        for _ in 0..max_steps {
            if !engine.step().expect("step failed") {
                return;
            }
        }
        panic!("engine did not terminate, state: {:?}", engine.state);
    }

    struct SharedSink(std::sync::Arc<Mutex<Vec<ObserverEvent>>>);

    impl ObserverSink for SharedSink {
        fn status(&mut self, message: &str) {
            self.0
                .lock()
                .unwrap()
                .push(ObserverEvent::Status(message.to_string()));
        }

        fn timer(&mut self, minutes: u32, seconds: u32) {
            self.0.lock().unwrap().push(ObserverEvent::Timer(minutes, seconds));
        }

        fn completed(&mut self) {
            self.0.lock().unwrap().push(ObserverEvent::Completed);
        }
    }

    #[derive(Default)]
    struct SharedClicker {
        clicks: std::sync::Arc<Mutex<Vec<(i32, i32)>>>,
        keys: std::sync::Arc<Mutex<Vec<Key>>>,
    }

    impl ClickInjector for SharedClicker {
        fn click(&mut self, x: i32, y: i32) -> Result<()> {
            self.clicks.lock().unwrap().push((x, y));
            Ok(())
        }

        fn key_press(&mut self, key: Key) -> Result<()> {
            self.keys.lock().unwrap().push(key);
            Ok(())
        }
    }

    #[test]
    fn test_full_cycle_completes_when_balance_changes() {
        // Balance 1000 -> 800 after the buy, so the purchase spent money
        // and the run finishes.
        let frames = vec![dark(), dark(), signal(), dark()];
        let mut engine = build_engine(frames, &["1000", "0分01秒", "800"], test_regions());

        run_to_terminal(&mut engine, 20);
        assert_eq!(engine.state, EngineState::Completed);
    }

    #[test]
    fn test_unchanged_balance_loops_back_to_monitoring() {
        let frames = vec![dark(), dark(), signal(), dark()];
        let mut engine = build_engine(frames, &["1000", "0分01秒", "1000"], test_regions());

        // Init, Monitoring (trigger), TriggerWindow, Buying, VerifyConfirm,
        // PostRefresh.
        for _ in 0..6 {
            assert!(engine.step().unwrap());
        }
        assert_eq!(engine.state, EngineState::Monitoring);
        assert_eq!(engine.balance_before.0, "1000");
    }

    #[test]
    fn test_identical_readings_publish_once() {
        let mut engine = build_engine(
            vec![dark()],
            &["1000", "5分00秒", "5分00秒", "4分59秒"],
            test_regions(),
        );
        let events = std::sync::Arc::new(Mutex::new(Vec::new()));
        engine.observer = Box::new(SharedSink(events.clone()));
        for _ in 0..4 {
            assert!(engine.step().unwrap());
        }

        let timers: Vec<_> = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, ObserverEvent::Timer(_, _)))
            .cloned()
            .collect();
        assert_eq!(
            timers,
            vec![ObserverEvent::Timer(5, 0), ObserverEvent::Timer(4, 59)]
        );
    }

    #[test]
    fn test_buy_retry_is_bounded() {
        // The verify signal never appears: the buy is clicked once, then
        // re-clicked at most twice across at most five polls.
        let mut engine = build_engine(vec![dark()], &[], test_regions());
        let clicks = std::sync::Arc::new(Mutex::new(Vec::new()));
        engine.input = Box::new(SharedClicker {
            clicks: clicks.clone(),
            keys: Default::default(),
        });
        engine.refresh_config();
        engine.state = EngineState::Buying;

        assert!(engine.step().unwrap());
        assert_eq!(engine.state, EngineState::VerifyConfirm);

        let buy_center = (40, 5);
        let buy_clicks = clicks
            .lock()
            .unwrap()
            .iter()
            .filter(|&&c| c == buy_center)
            .count();
        assert_eq!(buy_clicks, 3); // initial click + two re-clicks
    }

    #[test]
    fn test_stop_during_buy_finishes_the_sequence() {
        let mut engine = build_engine(vec![signal(), dark()], &[], test_regions());
        let clicks = std::sync::Arc::new(Mutex::new(Vec::new()));
        engine.input = Box::new(SharedClicker {
            clicks: clicks.clone(),
            keys: Default::default(),
        });
        engine.refresh_config();
        engine.state = EngineState::Buying;
        engine.control.request_stop();

        // The stop request does not interrupt the purchase.
        assert!(engine.step().unwrap());
        assert_eq!(engine.state, EngineState::VerifyConfirm);
        assert!(!clicks.lock().unwrap().is_empty());

        // It is honored once monitoring resumes.
        run_to_terminal(&mut engine, 10);
        assert_eq!(engine.state, EngineState::Stopped);
    }

    #[test]
    fn test_pause_does_not_block_stop() {
        let mut engine = build_engine(vec![dark()], &["1000"], test_regions());
        assert!(engine.step().unwrap()); // Init -> Monitoring
        engine.control.pause();
        engine.control.request_stop();

        assert!(engine.step().unwrap());
        assert_eq!(engine.state, EngineState::Stopped);
    }

    #[test]
    fn test_missing_region_fails_fast() {
        let mut map = HashMap::new();
        for name in REQUIRED_REGIONS.iter().filter(|&&n| n != "buy") {
            map.insert(name.to_string(), Region::new(0, 0, 10, 10));
        }
        let regions = RegionStore::from_map(map).unwrap();

        let mut engine = build_engine(vec![dark()], &["1000"], regions);
        assert!(engine.step().unwrap());
        assert!(matches!(engine.state, EngineState::Failed(_)));
        assert!(!engine.step().unwrap());
    }

    #[test]
    fn test_rollover_clicks_refresh() {
        let mut engine = build_engine(vec![dark()], &["1000", "1天2小时"], test_regions());
        let clicks = std::sync::Arc::new(Mutex::new(Vec::new()));
        engine.input = Box::new(SharedClicker {
            clicks: clicks.clone(),
            keys: Default::default(),
        });

        assert!(engine.step().unwrap()); // Init (refresh click)
        assert!(engine.step().unwrap()); // Monitoring (rollover refresh)

        let refresh_center = (10, 25);
        let refresh_clicks = clicks
            .lock()
            .unwrap()
            .iter()
            .filter(|&&c| c == refresh_center)
            .count();
        assert_eq!(refresh_clicks, 2);
        assert_eq!(engine.state, EngineState::Monitoring);
    }

    #[test]
    fn test_garbled_reading_keeps_monitoring() {
        let mut engine = build_engine(vec![dark()], &["1000", "刷新中"], test_regions());
        assert!(engine.step().unwrap());
        assert!(engine.step().unwrap());
        assert_eq!(engine.state, EngineState::Monitoring);
    }

    #[test]
    fn test_pre_refresh_fires_once_at_three_seconds() {
        // The countdown can be read at 0:03 more than once under fast
        // polling; only the first read may click refresh.
        let mut engine = build_engine(
            vec![dark()],
            &["1000", "0分03秒", "0分03秒", "0分02秒"],
            test_regions(),
        );
        let clicks = std::sync::Arc::new(Mutex::new(Vec::new()));
        engine.input = Box::new(SharedClicker {
            clicks: clicks.clone(),
            keys: Default::default(),
        });

        assert!(engine.step().unwrap()); // Init (arming refresh click)
        assert!(engine.step().unwrap()); // 0:03 -> pre-refresh click
        assert!(engine.step().unwrap()); // 0:03 again -> no further refresh
        assert!(engine.step().unwrap()); // 0:02 -> no further refresh
        assert_eq!(engine.state, EngineState::Monitoring);

        let refresh_center = (10, 25);
        let refresh_clicks = clicks
            .lock()
            .unwrap()
            .iter()
            .filter(|&&c| c == refresh_center)
            .count();
        assert_eq!(refresh_clicks, 2);
    }

    #[test]
    fn test_pre_refresh_allows_countdown_jump() {
        // The pre-trigger refresh resets the shop countdown, so the jump
        // back up right after it must not be discarded as noise.
        let mut engine = build_engine(
            vec![dark()],
            &["1000", "0分03秒", "2分00秒"],
            test_regions(),
        );
        let events = std::sync::Arc::new(Mutex::new(Vec::new()));
        engine.observer = Box::new(SharedSink(events.clone()));

        assert!(engine.step().unwrap()); // Init
        assert!(engine.step().unwrap()); // 0:03 -> pre-refresh
        assert!(engine.step().unwrap()); // 2:00 accepted post-refresh
        assert_eq!(engine.state, EngineState::Monitoring);

        let timers: Vec<_> = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, ObserverEvent::Timer(_, _)))
            .cloned()
            .collect();
        assert_eq!(
            timers,
            vec![ObserverEvent::Timer(0, 3), ObserverEvent::Timer(2, 0)]
        );
    }

    #[test]
    fn test_zero_reading_does_not_trigger_buy() {
        // The buy fires at exactly 0:01. A 0:00 read means the window was
        // missed; the engine keeps polling until the rollover re-arms it.
        let mut engine = build_engine(vec![dark()], &["1000", "0分00秒"], test_regions());

        assert!(engine.step().unwrap()); // Init
        assert!(engine.step().unwrap()); // 0:00 read
        assert_eq!(engine.state, EngineState::Monitoring);
    }

    #[test]
    fn test_stuck_confirm_overlay_gets_corner_click() {
        // The signal survives two dismiss attempts, so the third round also
        // clicks the screen corner.
        let frames = vec![signal(), signal(), signal(), dark()];
        let mut engine = build_engine(frames, &[], test_regions());
        let clicks = std::sync::Arc::new(Mutex::new(Vec::new()));
        engine.input = Box::new(SharedClicker {
            clicks: clicks.clone(),
            keys: Default::default(),
        });
        engine.refresh_config();
        engine.state = EngineState::VerifyConfirm;

        assert!(engine.step().unwrap());
        assert_eq!(engine.state, EngineState::PostRefresh);

        let recorded = clicks.lock().unwrap();
        let verify_center = (70, 5);
        // One opening click plus one per signal detection.
        assert_eq!(recorded.iter().filter(|&&c| c == verify_center).count(), 4);
        assert_eq!(recorded.iter().filter(|&&c| c == (1, 1)).count(), 1);
    }

    #[test]
    fn test_lingering_overlay_cleared_with_escape() {
        // The overlay is still up when cleanup starts: Escape is pressed
        // before re-arming.
        let frames = vec![signal(), dark()];
        let mut engine = build_engine(frames, &[""], test_regions());
        let keys = std::sync::Arc::new(Mutex::new(Vec::new()));
        engine.input = Box::new(SharedClicker {
            clicks: Default::default(),
            keys: keys.clone(),
        });
        engine.refresh_config();
        engine.state = EngineState::PostRefresh;

        assert!(engine.step().unwrap());
        assert_eq!(*keys.lock().unwrap(), vec![Key::Escape]);
        // Empty balance readings compare equal, so the engine re-arms.
        assert_eq!(engine.state, EngineState::Monitoring);
    }
}
