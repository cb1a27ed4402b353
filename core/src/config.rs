/// Control-loop timing. Fixed at build time; there is no runtime
/// configuration channel on this device.
#[derive(Debug, Clone, Copy)]
pub struct PanelConfig {
    /// Backlight (and navigation) stays live this long after the last
    /// button press or relay transition.
    pub backlight_timeout_ms: u64,
    /// How often the current view is redrawn outside of an edit session.
    pub refresh_interval_ms: u64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            backlight_timeout_ms: 10_000,
            refresh_interval_ms: 1_000,
        }
    }
}
