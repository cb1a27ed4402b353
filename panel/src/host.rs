//! Host-side simulator: the full control core running against simulated
//! peripherals, with the LCD mirrored to the terminal and the three panel
//! buttons driven from stdin.

use std::{
    cell::RefCell,
    collections::VecDeque,
    rc::Rc,
    time::{Duration, Instant},
};

use anyhow::Context;
use chrono::{Datelike, Duration as ChronoDuration, Local, NaiveDate, Timelike};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use thermostat_core::{
    Button, ButtonPad, DateTime, EnvironmentSensor, PanelConfig, Relay, Rtc, SensorError,
    SensorSample, TargetDial, TextDisplay, Thermostat, DISPLAY_COLS, DISPLAY_ROWS,
};

const TICK_INTERVAL_MS: u64 = 100;
const DEFAULT_DIAL_TARGET: f32 = 30.0;

struct DisplayState {
    grid: [[char; DISPLAY_COLS as usize]; DISPLAY_ROWS as usize],
    cursor: (u8, u8),
    backlight: bool,
    shown: Option<String>,
}

/// In-memory 2x16 surface; `flush` mirrors it to the log whenever the
/// visible frame changed.
#[derive(Clone)]
struct TerminalDisplay(Rc<RefCell<DisplayState>>);

impl TerminalDisplay {
    fn new() -> Self {
        Self(Rc::new(RefCell::new(DisplayState {
            grid: [[' '; DISPLAY_COLS as usize]; DISPLAY_ROWS as usize],
            cursor: (0, 0),
            backlight: false,
            shown: None,
        })))
    }

    fn flush(&self) {
        let mut state = self.0.borrow_mut();
        let top: String = state.grid[0].iter().collect();
        let bottom: String = state.grid[1].iter().collect();
        let light = if state.backlight { "*" } else { " " };
        let frame = format!("[{top}]{light}\n[{bottom}]");
        if state.shown.as_deref() != Some(&frame) {
            info!("lcd:\n{frame}");
            state.shown = Some(frame);
        }
    }
}

impl TextDisplay for TerminalDisplay {
    fn clear(&mut self) {
        let mut state = self.0.borrow_mut();
        state.grid = [[' '; DISPLAY_COLS as usize]; DISPLAY_ROWS as usize];
        state.cursor = (0, 0);
    }

    fn home(&mut self) {
        self.0.borrow_mut().cursor = (0, 0);
    }

    fn set_cursor(&mut self, col: u8, row: u8) {
        self.0.borrow_mut().cursor = (col, row);
    }

    fn print(&mut self, text: &str) {
        let mut state = self.0.borrow_mut();
        for ch in text.chars() {
            let (col, row) = state.cursor;
            if col < DISPLAY_COLS && row < DISPLAY_ROWS {
                state.grid[row as usize][col as usize] = ch;
            }
            state.cursor.0 += 1;
        }
    }

    fn set_blink(&mut self, _on: bool) {}

    fn set_backlight(&mut self, on: bool) {
        self.0.borrow_mut().backlight = on;
    }
}

/// Slowly drifting readings around room temperature, with a periodic
/// injected timeout to exercise the last-known-good path.
struct SimSensor {
    reads: u64,
}

impl EnvironmentSensor for SimSensor {
    fn read(&mut self) -> Result<SensorSample, SensorError> {
        self.reads = self.reads.wrapping_add(1);
        if self.reads % 50 == 0 {
            debug!("simulated sensor timeout");
            return Err(SensorError::Timeout);
        }
        Ok(SensorSample {
            temperature: 20.0 + ((self.reads % 8) as f32 * 0.2),
            humidity: 42.0 + ((self.reads % 6) as f32 * 0.5),
        })
    }
}

struct ClockState {
    /// Applied correction relative to the system clock, updated by `adjust`.
    offset: ChronoDuration,
    nvram: [u8; 24],
}

#[derive(Clone)]
struct SystemClock(Rc<RefCell<ClockState>>);

impl SystemClock {
    fn new() -> Self {
        Self(Rc::new(RefCell::new(ClockState {
            offset: ChronoDuration::zero(),
            // Factory-fresh NVRAM reads back high; startup normalization
            // turns these into 0-degree setpoints.
            nvram: [0xFF; 24],
        })))
    }
}

impl Rtc for SystemClock {
    fn now(&mut self) -> DateTime {
        let now = Local::now().naive_local() + self.0.borrow().offset;
        DateTime {
            year: now.year().clamp(2000, 2049) as u16,
            month: now.month() as u8,
            day: now.day() as u8,
            hour: now.hour() as u8,
            minute: now.minute() as u8,
            second: now.second() as u8,
        }
    }

    fn adjust(&mut self, datetime: &DateTime) {
        let requested = NaiveDate::from_ymd_opt(
            i32::from(datetime.year),
            u32::from(datetime.month),
            u32::from(datetime.day),
        )
        .and_then(|date| {
            date.and_hms_opt(
                u32::from(datetime.hour),
                u32::from(datetime.minute),
                u32::from(datetime.second),
            )
        });

        // The editor's day field is not month-aware, so an impossible
        // calendar date can be confirmed; a real DS1307 would roll it over,
        // the simulator just refuses it.
        let Some(requested) = requested else {
            warn!("ignoring impossible clock adjustment: {datetime:?}");
            return;
        };

        let mut state = self.0.borrow_mut();
        state.offset = requested - Local::now().naive_local();
        info!("clock adjusted to {requested}");
    }

    fn read_byte(&mut self, index: u8) -> u8 {
        self.0.borrow().nvram[index as usize]
    }

    fn write_byte(&mut self, index: u8, value: u8) {
        self.0.borrow_mut().nvram[index as usize] = value;
        info!("nvram[{index}] <- {value}");
    }
}

#[derive(Default)]
struct PadState {
    queued: VecDeque<Button>,
    armed: [bool; 3],
    held: [bool; 3],
}

/// Edge-press pad fed from stdin. Each queued key becomes exactly one
/// toggled-and-pressed pair on the next poll.
#[derive(Clone)]
struct StdinPad(Rc<RefCell<PadState>>);

impl StdinPad {
    fn new() -> Self {
        Self(Rc::new(RefCell::new(PadState::default())))
    }

    fn queue(&self, button: Button) {
        self.0.borrow_mut().queued.push_back(button);
    }

    fn arm_next(&self) {
        let mut state = self.0.borrow_mut();
        if !state.armed.iter().any(|armed| *armed) {
            if let Some(button) = state.queued.pop_front() {
                state.armed[button_index(button)] = true;
            }
        }
    }
}

fn button_index(button: Button) -> usize {
    match button {
        Button::Next => 0,
        Button::Previous => 1,
        Button::Select => 2,
    }
}

impl ButtonPad for StdinPad {
    fn was_toggled(&mut self, button: Button) -> bool {
        let mut state = self.0.borrow_mut();
        let index = button_index(button);
        let toggled = state.armed[index];
        if toggled {
            state.armed[index] = false;
            state.held[index] = true;
        }
        toggled
    }

    fn is_pressed(&mut self, button: Button) -> bool {
        self.0.borrow().held[button_index(button)]
    }
}

struct FixedDial {
    target: f32,
}

impl TargetDial for FixedDial {
    fn read(&mut self) -> f32 {
        self.target
    }
}

struct LogRelay {
    level: Option<bool>,
}

impl Relay for LogRelay {
    fn set(&mut self, on: bool) {
        if self.level != Some(on) {
            info!("relay {}", if on { "ON" } else { "OFF" });
            self.level = Some(on);
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let dial_target = std::env::var("PANEL_DIAL")
        .ok()
        .and_then(|value| value.parse::<f32>().ok())
        .unwrap_or(DEFAULT_DIAL_TARGET);

    let display = TerminalDisplay::new();
    let pad = StdinPad::new();

    let mut thermostat = Thermostat::new(
        display.clone(),
        SimSensor { reads: 0 },
        SystemClock::new(),
        pad.clone(),
        FixedDial {
            target: dial_target,
        },
        LogRelay { level: None },
        PanelConfig::default(),
    );

    let started = Instant::now();
    thermostat.begin(0);
    display.flush();

    info!("panel simulator started; keys: n=next p=previous s=select (one or more per line)");

    let mut interval = tokio::time::interval(Duration::from_millis(TICK_INTERVAL_MS));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                pad.arm_next();
                thermostat.tick(started.elapsed().as_millis() as u64);
                display.flush();
            }
            line = lines.next_line(), if stdin_open => {
                match line.context("failed to read stdin")? {
                    Some(line) => {
                        for key in line.trim().chars() {
                            match key {
                                'n' => pad.queue(Button::Next),
                                'p' => pad.queue(Button::Previous),
                                's' => pad.queue(Button::Select),
                                other => warn!("unknown key {other:?}"),
                            }
                        }
                    }
                    None => {
                        info!("stdin closed; continuing headless");
                        stdin_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                return Ok(());
            }
        }
    }
}
