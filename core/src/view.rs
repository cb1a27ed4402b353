/// The eight display modes, in their navigation order. `next`/`previous`
/// wrap at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Environment,
    Manual,
    Clock,
    Timetable1,
    Timetable2,
    Timetable3,
    Timetable4,
    Timetable5,
}

impl Default for View {
    /// The panel boots showing the clock.
    fn default() -> Self {
        View::Clock
    }
}

const ORDER: [View; 8] = [
    View::Environment,
    View::Manual,
    View::Clock,
    View::Timetable1,
    View::Timetable2,
    View::Timetable3,
    View::Timetable4,
    View::Timetable5,
];

impl View {
    fn position(self) -> usize {
        ORDER.iter().position(|view| *view == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        ORDER[(self.position() + 1) % ORDER.len()]
    }

    pub fn previous(self) -> Self {
        ORDER[(self.position() + ORDER.len() - 1) % ORDER.len()]
    }

    /// The 5-hour window a timetable page covers (the last page has 4).
    pub fn hour_window(self) -> Option<(u8, u8)> {
        match self {
            View::Timetable1 => Some((0, 4)),
            View::Timetable2 => Some((5, 9)),
            View::Timetable3 => Some((10, 14)),
            View::Timetable4 => Some((15, 19)),
            View::Timetable5 => Some((20, 23)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn next_cycles_through_all_eight_views() {
        for start in ORDER {
            let mut view = start;
            for _ in 0..8 {
                view = view.next();
            }
            assert_eq!(view, start);
        }
    }

    #[test]
    fn previous_cycles_through_all_eight_views() {
        for start in ORDER {
            let mut view = start;
            for _ in 0..8 {
                view = view.previous();
            }
            assert_eq!(view, start);
        }
    }

    #[test]
    fn next_and_previous_are_inverses_at_the_wrap_points() {
        assert_eq!(View::Timetable5.next(), View::Environment);
        assert_eq!(View::Environment.previous(), View::Timetable5);
    }

    #[test]
    fn timetable_windows_cover_every_hour_once() {
        let pages = [
            View::Timetable1,
            View::Timetable2,
            View::Timetable3,
            View::Timetable4,
            View::Timetable5,
        ];
        let mut covered = [false; 24];
        for page in pages {
            let (from, to) = page.hour_window().unwrap();
            for hour in from..=to {
                assert!(!covered[hour as usize]);
                covered[hour as usize] = true;
            }
        }
        assert!(covered.iter().all(|hour| *hour));
    }
}
