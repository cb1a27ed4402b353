use thiserror::Error;

/// Character LCD geometry assumed by the view layouts.
pub const DISPLAY_COLS: u8 = 16;
pub const DISPLAY_ROWS: u8 = 2;

/// Degree glyph used in rendered text. Hardware adapters that talk to an
/// HD44780 character ROM translate this to code 0xDF.
pub const DEGREE: char = '\u{00B0}';

/// Calendar date and wall-clock time as held by the RTC chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// One sensor conversion. A field the sensor could not produce is NaN and
/// must be ignored by the caller; the other field may still be valid.
#[derive(Debug, Clone, Copy)]
pub struct SensorSample {
    pub temperature: f32,
    pub humidity: f32,
}

/// Sensor read failures, matching the single-wire protocol's failure modes.
/// All of them mean "no update" to the control core.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("sensor did not answer the start pulse in time")]
    Timeout,
    #[error("sensor frame failed checksum validation")]
    Checksum,
    #[error("no sensor present on the bus")]
    NotPresent,
}

/// The three front-panel buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Next,
    Previous,
    Select,
}

/// Addressable two-row text surface with a controllable blink cursor and
/// backlight. Writes never fail.
pub trait TextDisplay {
    fn clear(&mut self);
    fn home(&mut self);
    fn set_cursor(&mut self, col: u8, row: u8);
    fn print(&mut self, text: &str);
    fn set_blink(&mut self, on: bool);
    fn set_backlight(&mut self, on: bool);
}

/// Ambient temperature/humidity sensor.
pub trait EnvironmentSensor {
    fn read(&mut self) -> Result<SensorSample, SensorError>;
}

/// Number of NVRAM bytes the core uses, one per hour of the day.
pub const SCHEDULE_BYTES: u8 = 24;

/// Battery-backed clock plus a small byte-addressable store (the DS1307
/// keeps both on one chip). Indices 0..24 hold the hourly setpoints.
pub trait Rtc {
    fn now(&mut self) -> DateTime;
    fn adjust(&mut self, datetime: &DateTime);
    fn read_byte(&mut self, index: u8) -> u8;
    fn write_byte(&mut self, index: u8, value: u8);
}

/// Debounced button inputs. `was_toggled` reports a level change since the
/// last poll; a press is the toggle whose new level is pressed.
pub trait ButtonPad {
    fn was_toggled(&mut self, button: Button) -> bool;
    fn is_pressed(&mut self, button: Button) -> bool;

    /// Rising edge: toggled and now held. Level alone must not count, or a
    /// held button would register once per tick.
    fn edge_pressed(&mut self, button: Button) -> bool {
        self.was_toggled(button) && self.is_pressed(button)
    }
}

/// Analog setpoint dial used in manual mode, in degrees.
pub trait TargetDial {
    fn read(&mut self) -> f32;
}

/// Heating relay output, written every control tick.
pub trait Relay {
    fn set(&mut self, on: bool);
}
