pub mod config;
pub mod controller;
pub mod editor;
pub mod environment;
pub mod hal;
pub mod relay;
pub mod schedule;
pub mod view;

pub use config::PanelConfig;
pub use controller::Thermostat;
pub use editor::{Commit, EditInput, EditSession, EditStep};
pub use environment::Environment;
pub use hal::{
    Button, ButtonPad, DateTime, EnvironmentSensor, Relay, Rtc, SensorError, SensorSample,
    TargetDial, TextDisplay, DEGREE, DISPLAY_COLS, DISPLAY_ROWS,
};
pub use relay::Mode;
pub use schedule::{Schedule, MAX_SETPOINT};
pub use view::View;
