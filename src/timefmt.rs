use serde::Serialize;

pub const DEFAULT_SCALE_FACTOR: f64 = 3.0;
pub const DEFAULT_HOURS_PER_DAY: f64 = 24.0;
pub const WORKING_HOURS_PER_DAY: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisplayTime {
    pub days: i64,
    pub remainder_hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    pub scale_factor: f64,
    pub hours_per_day: f64,
}

impl Default for TimeScale {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            hours_per_day: DEFAULT_HOURS_PER_DAY,
        }
    }
}

impl TimeScale {
    pub fn display(&self, hours: f64) -> DisplayTime {
        to_display_time(hours, self.scale_factor, self.hours_per_day)
    }
}

/// Scales `hours` and splits the result into whole days and leftover hours.
///
/// Negative input is not clamped: days are floored while the remainder keeps
/// the sign of the dividend, so callers decide what a negative total means.
pub fn to_display_time(hours: f64, scale_factor: f64, hours_per_day: f64) -> DisplayTime {
    let adjusted = hours * scale_factor;
    DisplayTime {
        days: (adjusted / hours_per_day).floor() as i64,
        remainder_hours: adjusted % hours_per_day,
    }
}

/// Hours expressed in 8-hour working days.
pub fn working_days(hours: f64) -> f64 {
    hours / WORKING_HOURS_PER_DAY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_hours_is_one_scaled_day() {
        assert_eq!(
            to_display_time(8.0, 3.0, 24.0),
            DisplayTime {
                days: 1,
                remainder_hours: 0.0
            }
        );
    }

    #[test]
    fn partial_day_stays_in_remainder() {
        assert_eq!(
            to_display_time(5.0, 3.0, 24.0),
            DisplayTime {
                days: 0,
                remainder_hours: 15.0
            }
        );
        assert_eq!(TimeScale::default().display(10.5).remainder_hours, 7.5);
        assert_eq!(TimeScale::default().display(10.5).days, 1);
    }

    #[test]
    fn negative_hours_propagate_sign() {
        let shown = to_display_time(-5.0, 3.0, 24.0);
        assert_eq!(shown.days, -1);
        assert_eq!(shown.remainder_hours, -15.0);
    }

    #[test]
    fn working_days_use_eight_hours() {
        assert_eq!(working_days(20.0), 2.5);
    }
}
