use crate::environment::Environment;
use crate::schedule::Schedule;

/// Operating mode. Automatic follows the hourly schedule; manual follows
/// the front-panel dial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Automatic,
    Manual,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Automatic => "AUTO",
            Self::Manual => "MANUAL",
        }
    }
}

/// Decide the relay level for the current tick.
///
/// Manual mode heats while the dial target is strictly above the cached
/// temperature. Automatic mode compares the current hour's integer setpoint
/// against the temperature truncated toward negative infinity, so a reading
/// of 21.7 heats under a setpoint of 22 and a reading of 22.3 does not.
pub fn demand(
    mode: Mode,
    schedule: &Schedule,
    hour: u8,
    env: &Environment,
    dial_target: f32,
) -> bool {
    match mode {
        Mode::Manual => dial_target > env.temperature(),
        Mode::Automatic => i16::from(schedule.setpoint(hour)) > env.temperature().floor() as i16,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::SensorSample;

    fn env_at(temperature: f32) -> Environment {
        let mut env = Environment::default();
        env.update(SensorSample {
            temperature,
            humidity: 50.0,
        });
        env
    }

    fn schedule_with(hour: u8, setpoint: u8) -> Schedule {
        struct Mem([u8; 24]);
        impl crate::hal::Rtc for Mem {
            fn now(&mut self) -> crate::hal::DateTime {
                unreachable!()
            }
            fn adjust(&mut self, _: &crate::hal::DateTime) {}
            fn read_byte(&mut self, index: u8) -> u8 {
                self.0[index as usize]
            }
            fn write_byte(&mut self, index: u8, value: u8) {
                self.0[index as usize] = value;
            }
        }
        let mut mem = Mem([0; 24]);
        let mut schedule = Schedule::default();
        schedule.commit(&mut mem, hour, setpoint);
        schedule
    }

    #[test]
    fn automatic_heats_while_setpoint_above_truncated_temperature() {
        let schedule = schedule_with(14, 22);

        assert!(demand(
            Mode::Automatic,
            &schedule,
            14,
            &env_at(21.7),
            30.0
        ));
        assert!(!demand(
            Mode::Automatic,
            &schedule,
            14,
            &env_at(22.3),
            30.0
        ));
    }

    #[test]
    fn automatic_floor_is_well_defined_below_zero() {
        let schedule = schedule_with(6, 0);

        // floor(-0.4) = -1, and a setpoint of 0 still demands heat.
        assert!(demand(Mode::Automatic, &schedule, 6, &env_at(-0.4), 30.0));
        assert!(!demand(Mode::Automatic, &schedule, 6, &env_at(0.2), 30.0));
    }

    #[test]
    fn manual_compares_dial_strictly_against_temperature() {
        let schedule = Schedule::default();

        assert!(demand(Mode::Manual, &schedule, 0, &env_at(24.9), 25.0));
        assert!(!demand(Mode::Manual, &schedule, 0, &env_at(25.0), 25.0));
    }

    #[test]
    fn demand_is_idempotent_for_fixed_inputs() {
        let schedule = schedule_with(8, 18);
        let env = env_at(17.2);

        let first = demand(Mode::Automatic, &schedule, 8, &env, 30.0);
        for _ in 0..10 {
            assert_eq!(demand(Mode::Automatic, &schedule, 8, &env, 30.0), first);
        }
    }
}
