use crate::hal::SensorSample;

/// Last-known-good ambient readings. Each field holds its previous value
/// across failed or partial sensor reads, independently of the other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Environment {
    temperature: f32,
    humidity: f32,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            humidity: 0.0,
        }
    }
}

impl Environment {
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn humidity(&self) -> f32 {
        self.humidity
    }

    /// Fold a successful conversion into the cache. NaN marks a field the
    /// sensor could not produce this time; that field keeps its old value.
    pub fn update(&mut self, sample: SensorSample) {
        if !sample.temperature.is_nan() {
            self.temperature = sample.temperature;
        }
        if !sample.humidity.is_nan() {
            self.humidity = sample.humidity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn valid_sample_updates_both_fields() {
        let mut env = Environment::default();
        env.update(SensorSample {
            temperature: 21.5,
            humidity: 48.0,
        });

        assert_eq!(env.temperature(), 21.5);
        assert_eq!(env.humidity(), 48.0);
    }

    #[test]
    fn nan_fields_keep_last_known_good_independently() {
        let mut env = Environment::default();
        env.update(SensorSample {
            temperature: 19.0,
            humidity: 55.0,
        });

        env.update(SensorSample {
            temperature: f32::NAN,
            humidity: 52.0,
        });
        assert_eq!(env.temperature(), 19.0);
        assert_eq!(env.humidity(), 52.0);

        env.update(SensorSample {
            temperature: 19.4,
            humidity: f32::NAN,
        });
        assert_eq!(env.temperature(), 19.4);
        assert_eq!(env.humidity(), 52.0);
    }
}
