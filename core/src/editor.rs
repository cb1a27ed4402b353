use crate::hal::DateTime;
use crate::schedule::{Schedule, MAX_SETPOINT};

/// Button edges observed during one editor tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditInput {
    pub up: bool,
    pub down: bool,
    pub confirm: bool,
}

/// A value the controller must write out when a field is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// One hour's setpoint, persisted immediately on confirmation.
    Setpoint { hour: u8, value: u8 },
    /// The full date/time, committed atomically after the last field.
    Clock(DateTime),
}

/// Result of feeding one tick of input into a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStep {
    /// Nothing happened.
    Idle,
    /// The working value changed; repaint the field.
    Updated,
    /// The field was confirmed and the session moved to the next one.
    Advanced(Option<Commit>),
    /// The last field was confirmed; the session is over.
    Finished(Option<Commit>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClockField {
    Day,
    Month,
    Year,
    Hour,
    Minute,
    Second,
}

const CLOCK_FIELDS: [ClockField; 6] = [
    ClockField::Day,
    ClockField::Month,
    ClockField::Year,
    ClockField::Hour,
    ClockField::Minute,
    ClockField::Second,
];

impl ClockField {
    /// Closed domain. Day deliberately ignores month length; see the
    /// known-limitation note in DESIGN.md.
    fn bounds(self) -> (u16, u16) {
        match self {
            Self::Day => (1, 31),
            Self::Month => (1, 12),
            Self::Year => (2000, 2049),
            Self::Hour => (0, 23),
            Self::Minute | Self::Second => (0, 59),
        }
    }

    /// Column/row where the field's digits start.
    fn origin(self) -> (u8, u8) {
        match self {
            Self::Day => (3, 0),
            Self::Month => (6, 0),
            Self::Year => (9, 0),
            Self::Hour => (4, 1),
            Self::Minute => (7, 1),
            Self::Second => (10, 1),
        }
    }

    /// Blink cursor position while the field is active, one cell past the
    /// last digit.
    fn cursor(self) -> (u8, u8) {
        match self {
            Self::Day => (4, 0),
            Self::Month => (7, 0),
            Self::Year => (12, 0),
            Self::Hour => (5, 1),
            Self::Minute => (8, 1),
            Self::Second => (11, 1),
        }
    }
}

/// Modal editor sub-state: which field is active and its working value.
/// The controller advances it one tick at a time and performs the display
/// and storage side effects; normal sensor/relay/timer ticks stay suspended
/// for as long as a session exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditSession {
    Clock {
        values: [u16; 6],
        index: usize,
    },
    Timetable {
        from: u8,
        to: u8,
        index: u8,
        values: [u8; 5],
    },
}

impl EditSession {
    /// Start editing the clock, seeded from the current RTC reading.
    pub fn clock(now: DateTime) -> Self {
        Self::Clock {
            values: [
                u16::from(now.day),
                u16::from(now.month),
                now.year,
                u16::from(now.hour),
                u16::from(now.minute),
                u16::from(now.second),
            ],
            index: 0,
        }
    }

    /// Start editing the setpoints of one timetable page.
    pub fn timetable(from: u8, to: u8, schedule: &Schedule) -> Self {
        let mut values = [0u8; 5];
        for (slot, hour) in (from..=to).enumerate() {
            values[slot] = schedule.setpoint(hour);
        }
        Self::Timetable {
            from,
            to,
            index: 0,
            values,
        }
    }

    /// Where the blink cursor sits for the active field.
    pub fn cursor(&self) -> (u8, u8) {
        match self {
            Self::Clock { index, .. } => CLOCK_FIELDS[*index].cursor(),
            Self::Timetable { index, .. } => (timetable_column(*index), 1),
        }
    }

    /// Where the active field's text is repainted.
    pub fn field_origin(&self) -> (u8, u8) {
        match self {
            Self::Clock { index, .. } => CLOCK_FIELDS[*index].origin(),
            Self::Timetable { index, .. } => (timetable_column(*index), 1),
        }
    }

    /// The active field's working value, formatted for its display slot.
    pub fn field_text(&self) -> String {
        match self {
            Self::Clock { values, index } => match CLOCK_FIELDS[*index] {
                ClockField::Year => format!("{:04}", values[*index]),
                _ => format!("{:02}", values[*index]),
            },
            Self::Timetable { values, index, .. } => format!("{:>2}", values[*index as usize]),
        }
    }

    /// Apply one tick of button edges. Confirmation takes precedence over
    /// up/down in the same tick; up is applied before down.
    pub fn step(&mut self, input: EditInput) -> EditStep {
        if input.confirm {
            return self.confirm();
        }

        let mut changed = false;
        if input.up {
            self.adjust(true);
            changed = true;
        }
        if input.down {
            self.adjust(false);
            changed = true;
        }

        if changed {
            EditStep::Updated
        } else {
            EditStep::Idle
        }
    }

    fn adjust(&mut self, up: bool) {
        match self {
            Self::Clock { values, index } => {
                let (min, max) = CLOCK_FIELDS[*index].bounds();
                values[*index] = step_wrapped(values[*index], min, max, up);
            }
            Self::Timetable { values, index, .. } => {
                let slot = &mut values[*index as usize];
                *slot = step_wrapped(u16::from(*slot), 0, u16::from(MAX_SETPOINT), up) as u8;
            }
        }
    }

    fn confirm(&mut self) -> EditStep {
        match self {
            Self::Clock { values, index } => {
                if *index + 1 < CLOCK_FIELDS.len() {
                    *index += 1;
                    EditStep::Advanced(None)
                } else {
                    EditStep::Finished(Some(Commit::Clock(DateTime {
                        day: values[0] as u8,
                        month: values[1] as u8,
                        year: values[2],
                        hour: values[3] as u8,
                        minute: values[4] as u8,
                        second: values[5] as u8,
                    })))
                }
            }
            Self::Timetable {
                from,
                to,
                index,
                values,
            } => {
                let hour = *from + *index;
                let commit = Some(Commit::Setpoint {
                    hour,
                    value: values[*index as usize],
                });
                if hour < *to {
                    *index += 1;
                    EditStep::Advanced(commit)
                } else {
                    EditStep::Finished(commit)
                }
            }
        }
    }
}

fn timetable_column(index: u8) -> u8 {
    2 + 3 * index
}

/// Single step over a closed range with circular wraparound. Explicit
/// bounds checks instead of the unsigned-underflow trick: decrementing at
/// the minimum yields the maximum and incrementing at the maximum yields
/// the minimum.
fn step_wrapped(value: u16, min: u16, max: u16, up: bool) -> u16 {
    if up {
        if value >= max {
            min
        } else {
            value + 1
        }
    } else if value <= min {
        max
    } else {
        value - 1
    }
}
