use crate::hal::{Rtc, SCHEDULE_BYTES};

/// Highest programmable setpoint, in whole degrees.
pub const MAX_SETPOINT: u8 = 30;

/// The 24 hourly setpoints, mirrored to RTC NVRAM bytes 0..24.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    setpoints: [u8; SCHEDULE_BYTES as usize],
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            setpoints: [0; SCHEDULE_BYTES as usize],
        }
    }
}

impl Schedule {
    /// Load the full table from NVRAM. Bytes above [`MAX_SETPOINT`] (fresh
    /// or corrupted cells) are normalized to 0.
    pub fn load(rtc: &mut impl Rtc) -> Self {
        let mut schedule = Self::default();
        for hour in 0..SCHEDULE_BYTES {
            let value = rtc.read_byte(hour);
            schedule.setpoints[hour as usize] = if value > MAX_SETPOINT { 0 } else { value };
        }
        schedule
    }

    pub fn setpoint(&self, hour: u8) -> u8 {
        self.setpoints[hour as usize % self.setpoints.len()]
    }

    /// Store one hour's setpoint, clamped to the valid range, and persist it.
    pub fn commit(&mut self, rtc: &mut impl Rtc, hour: u8, value: u8) {
        let value = value.min(MAX_SETPOINT);
        self.setpoints[hour as usize % self.setpoints.len()] = value;
        rtc.write_byte(hour, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::DateTime;
    use pretty_assertions::assert_eq;

    struct NvramOnly {
        bytes: [u8; 24],
        writes: Vec<(u8, u8)>,
    }

    impl Rtc for NvramOnly {
        fn now(&mut self) -> DateTime {
            unimplemented!("schedule tests never read the clock")
        }

        fn adjust(&mut self, _datetime: &DateTime) {}

        fn read_byte(&mut self, index: u8) -> u8 {
            self.bytes[index as usize]
        }

        fn write_byte(&mut self, index: u8, value: u8) {
            self.bytes[index as usize] = value;
            self.writes.push((index, value));
        }
    }

    #[test]
    fn load_normalizes_out_of_range_bytes() {
        let mut bytes = [21u8; 24];
        bytes[3] = 31; // just past the limit
        bytes[7] = 0xFF; // factory-fresh NVRAM
        bytes[12] = 30; // still valid
        let mut rtc = NvramOnly {
            bytes,
            writes: Vec::new(),
        };

        let schedule = Schedule::load(&mut rtc);

        assert_eq!(schedule.setpoint(3), 0);
        assert_eq!(schedule.setpoint(7), 0);
        assert_eq!(schedule.setpoint(12), 30);
        assert_eq!(schedule.setpoint(0), 21);
    }

    #[test]
    fn commit_clamps_and_persists() {
        let mut rtc = NvramOnly {
            bytes: [0; 24],
            writes: Vec::new(),
        };
        let mut schedule = Schedule::default();

        schedule.commit(&mut rtc, 14, 22);
        schedule.commit(&mut rtc, 15, 99);

        assert_eq!(schedule.setpoint(14), 22);
        assert_eq!(schedule.setpoint(15), MAX_SETPOINT);
        assert_eq!(rtc.writes, vec![(14, 22), (15, 30)]);
    }
}
