use crate::config::PanelConfig;
use crate::editor::{Commit, EditInput, EditSession, EditStep};
use crate::environment::Environment;
use crate::hal::{Button, ButtonPad, EnvironmentSensor, Relay, Rtc, TargetDial, TextDisplay, DEGREE};
use crate::relay::{self, Mode};
use crate::schedule::Schedule;
use crate::view::View;

/// The device control state machine. Owns every peripheral through its
/// capability trait plus all mutable state: the current view, the operating
/// mode, the schedule mirror, the environment cache, the activity timers and
/// an optional modal edit session.
///
/// Everything is driven by `tick(now_ms)` from a single cooperative loop;
/// there is no interior concurrency.
pub struct Thermostat<D, S, C, B, A, R> {
    display: D,
    sensor: S,
    rtc: C,
    buttons: B,
    dial: A,
    relay: R,

    config: PanelConfig,
    view: View,
    mode: Mode,
    schedule: Schedule,
    environment: Environment,
    session: Option<EditSession>,

    backlight_timer: u64,
    refresh_timer: u64,
    relay_applied: Option<bool>,
}

impl<D, S, C, B, A, R> Thermostat<D, S, C, B, A, R>
where
    D: TextDisplay,
    S: EnvironmentSensor,
    C: Rtc,
    B: ButtonPad,
    A: TargetDial,
    R: Relay,
{
    pub fn new(
        display: D,
        sensor: S,
        rtc: C,
        buttons: B,
        dial: A,
        relay: R,
        config: PanelConfig,
    ) -> Self {
        Self {
            display,
            sensor,
            rtc,
            buttons,
            dial,
            relay,
            config,
            view: View::default(),
            mode: Mode::default(),
            schedule: Schedule::default(),
            environment: Environment::default(),
            session: None,
            backlight_timer: 0,
            refresh_timer: 0,
            relay_applied: None,
        }
    }

    /// Startup: load the schedule from NVRAM (normalizing stale bytes),
    /// light the backlight and draw the initial view.
    pub fn begin(&mut self, now_ms: u64) {
        self.schedule = Schedule::load(&mut self.rtc);
        self.backlight_timer = now_ms;
        self.display.set_backlight(true);
        self.display.clear();
        self.refresh(now_ms);
    }

    /// One pass of the cooperative scheduler. While an edit session is
    /// active it owns the whole tick: no sensor read, no relay recompute,
    /// no backlight or refresh bookkeeping.
    pub fn tick(&mut self, now_ms: u64) {
        if self.session.is_some() {
            self.tick_editor(now_ms);
            return;
        }

        if let Ok(sample) = self.sensor.read() {
            self.environment.update(sample);
        }
        self.drive_relay(now_ms);

        if self.buttons.edge_pressed(Button::Next) {
            self.menu_next(now_ms);
        }
        if self.buttons.edge_pressed(Button::Previous) {
            self.menu_previous(now_ms);
        }
        if self.buttons.edge_pressed(Button::Select) {
            self.menu_select(now_ms);
            // A fresh session owns the display from this point on; a
            // refresh here would repaint over the field cursor.
            if self.session.is_some() {
                return;
            }
        }

        let lit = self.backlight_lit(now_ms);
        self.display.set_backlight(lit);

        if now_ms.saturating_sub(self.refresh_timer) >= self.config.refresh_interval_ms {
            self.refresh(now_ms);
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn is_editing(&self) -> bool {
        self.session.is_some()
    }

    /// A dark display swallows the first press: it only wakes the panel.
    fn backlight_lit(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.backlight_timer) < self.config.backlight_timeout_ms
    }

    fn menu_next(&mut self, now_ms: u64) {
        if self.backlight_lit(now_ms) {
            self.display.clear();
            self.view = self.view.next();
            self.refresh(now_ms);
        }
        self.backlight_timer = now_ms;
    }

    fn menu_previous(&mut self, now_ms: u64) {
        if self.backlight_lit(now_ms) {
            self.display.clear();
            self.view = self.view.previous();
            self.refresh(now_ms);
        }
        self.backlight_timer = now_ms;
    }

    fn menu_select(&mut self, now_ms: u64) {
        if self.backlight_lit(now_ms) {
            match self.view {
                View::Manual => self.toggle_mode(),
                View::Clock => {
                    let now = self.rtc.now();
                    self.open_session(EditSession::clock(now));
                }
                view => {
                    if let Some((from, to)) = view.hour_window() {
                        self.open_session(EditSession::timetable(from, to, &self.schedule));
                    }
                }
            }
        }
        self.backlight_timer = now_ms;
    }

    /// Manual view select: flip the mode and repaint its field in place.
    fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            Mode::Manual => Mode::Automatic,
            Mode::Automatic => Mode::Manual,
        };
        self.display.set_cursor(10, 0);
        self.display.print(&format!("{:>6}", self.mode.as_str()));
    }

    fn open_session(&mut self, session: EditSession) {
        let (col, row) = session.cursor();
        self.display.set_cursor(col, row);
        self.display.set_blink(true);
        self.session = Some(session);
    }

    fn tick_editor(&mut self, now_ms: u64) {
        let input = EditInput {
            up: self.buttons.edge_pressed(Button::Next),
            down: self.buttons.edge_pressed(Button::Previous),
            confirm: self.buttons.edge_pressed(Button::Select),
        };

        let Some(mut session) = self.session.take() else {
            return;
        };

        match session.step(input) {
            EditStep::Idle => {
                self.session = Some(session);
            }
            EditStep::Updated => {
                let (col, row) = session.field_origin();
                let text = session.field_text();
                self.display.set_cursor(col, row);
                self.display.print(&text);
                let (col, row) = session.cursor();
                self.display.set_cursor(col, row);
                self.session = Some(session);
            }
            EditStep::Advanced(commit) => {
                self.apply_commit(commit);
                let (col, row) = session.cursor();
                self.display.set_cursor(col, row);
                self.session = Some(session);
            }
            EditStep::Finished(commit) => {
                self.apply_commit(commit);
                self.display.set_blink(false);
                self.backlight_timer = now_ms;
                self.refresh(now_ms);
            }
        }
    }

    fn apply_commit(&mut self, commit: Option<Commit>) {
        match commit {
            Some(Commit::Setpoint { hour, value }) => {
                self.schedule.commit(&mut self.rtc, hour, value);
            }
            Some(Commit::Clock(datetime)) => {
                self.rtc.adjust(&datetime);
            }
            None => {}
        }
    }

    fn drive_relay(&mut self, now_ms: u64) {
        let target = self.dial.read();
        let hour = self.rtc.now().hour;
        let on = relay::demand(self.mode, &self.schedule, hour, &self.environment, target);

        // A relay transition is user-relevant activity: keep the display
        // lit through state changes.
        if self.relay_applied != Some(on) {
            self.backlight_timer = now_ms;
            self.relay_applied = Some(on);
        }
        self.relay.set(on);
    }

    fn refresh(&mut self, now_ms: u64) {
        self.display.home();
        match self.view {
            View::Environment => self.render_environment(),
            View::Manual => self.render_manual(),
            View::Clock => self.render_clock(),
            view => {
                if let Some((from, to)) = view.hour_window() {
                    self.render_timetable(from, to);
                }
            }
        }
        self.refresh_timer = now_ms;
    }

    fn render_environment(&mut self) {
        self.display.print("Temper. : ");
        self.display.set_cursor(10, 0);
        self.display
            .print(&format!("{:.1}{}C", self.environment.temperature(), DEGREE));
        self.display.set_cursor(0, 1);
        self.display.print("Humidity: ");
        self.display.set_cursor(10, 1);
        self.display
            .print(&format!("{:.1} %", self.environment.humidity()));
    }

    fn render_manual(&mut self) {
        let target = self.dial.read();

        self.display.print("Mode:");
        self.display.set_cursor(10, 0);
        self.display.print(&format!("{:>6}", self.mode.as_str()));
        self.display.set_cursor(0, 1);
        self.display.print("Temp:");
        self.display.set_cursor(10, 1);
        self.display.print(&format!("{target:>4.1}{DEGREE}C"));
    }

    fn render_clock(&mut self) {
        let now = self.rtc.now();

        self.display.set_cursor(3, 0);
        self.display
            .print(&format!("{:02}/{:02}/{:04}", now.day, now.month, now.year));
        self.display.set_cursor(4, 1);
        self.display
            .print(&format!("{:02}:{:02}:{:02}", now.hour, now.minute, now.second));
    }

    fn render_timetable(&mut self, from: u8, to: u8) {
        self.display.set_cursor(0, 0);
        self.display.print("H ");
        self.display.set_cursor(0, 1);
        self.display.print("T ");

        let mut col = 2;
        for hour in from..=to {
            self.display.set_cursor(col, 0);
            self.display.print(&format!("{hour:02}"));
            self.display.set_cursor(col, 1);
            self.display
                .print(&format!("{:>2}", self.schedule.setpoint(hour)));
            col += 3;
        }
    }
}
