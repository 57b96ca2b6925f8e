use crate::error::Error;
use std::str::FromStr;

const DEFAULT_HOLD_TIME: &str = "10";
const DEFAULT_SAFETY_MARGIN: &str = "10";
const DEFAULT_SMOOTHING_WINDOW: &str = "7";
const DEFAULT_MIN_REP_DURATION: &str = "0.5";
const DEFAULT_COUNTDOWN: &str = "5";
const DEFAULT_MIN_VISIBILITY: &str = "0.5";

fn parse_checked<T>(
    value: &str,
    requirement: &'static str,
    valid: impl FnOnce(&T) -> bool,
) -> Result<T, Error>
where
    T: FromStr,
{
    let parsed = value
        .parse()
        .map_err(|_| Error::ParseSetting(value.to_owned()))?;
    if valid(&parsed) {
        Ok(parsed)
    } else {
        Err(Error::InvalidSetting(value.to_owned(), requirement))
    }
}

fn positive_seconds(value: &str) -> Result<f64, Error> {
    parse_checked(value, "a positive number of seconds", |&v: &f64| {
        v.is_finite() && v > 0.0
    })
}

fn non_negative_seconds(value: &str) -> Result<f64, Error> {
    parse_checked(value, "a non-negative number of seconds", |&v: &f64| {
        v.is_finite() && v >= 0.0
    })
}

fn non_negative_degrees(value: &str) -> Result<i32, Error> {
    parse_checked(value, "a non-negative number of degrees", |&v: &i32| v >= 0)
}

fn window_len(value: &str) -> Result<usize, Error> {
    parse_checked(value, "at least 1", |&v: &usize| v >= 1)
}

fn unit_score(value: &str) -> Result<f32, Error> {
    parse_checked(value, "between 0 and 1", |v: &f32| (0.0..=1.0).contains(v))
}

#[derive(Debug, Clone, Copy, structopt::StructOpt)]
pub(crate) struct Settings {
    /// Seconds to hold each calibration position.
    #[structopt(long, default_value = DEFAULT_HOLD_TIME, parse(try_from_str = positive_seconds))]
    pub(crate) hold_time: f64,

    /// Degrees of slack around the calibrated thresholds before form warnings.
    #[structopt(long, default_value = DEFAULT_SAFETY_MARGIN, parse(try_from_str = non_negative_degrees))]
    pub(crate) safety_margin: i32,

    /// Number of frames in the per-arm median filter.
    #[structopt(long, default_value = DEFAULT_SMOOTHING_WINDOW, parse(try_from_str = window_len))]
    pub(crate) smoothing_window: usize,

    /// Minimum seconds between counted reps.
    #[structopt(long, default_value = DEFAULT_MIN_REP_DURATION, parse(try_from_str = non_negative_seconds))]
    pub(crate) min_rep_duration: f64,

    /// Seconds between the end of calibration and the start of the workout.
    #[structopt(long, default_value = DEFAULT_COUNTDOWN, parse(try_from_str = non_negative_seconds))]
    pub(crate) countdown: f64,

    /// Joints scoring below this are treated as not visible.
    #[structopt(long, default_value = DEFAULT_MIN_VISIBILITY, parse(try_from_str = unit_score))]
    pub(crate) min_visibility: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hold_time: DEFAULT_HOLD_TIME.parse().unwrap(),
            safety_margin: DEFAULT_SAFETY_MARGIN.parse().unwrap(),
            smoothing_window: DEFAULT_SMOOTHING_WINDOW.parse().unwrap(),
            min_rep_duration: DEFAULT_MIN_REP_DURATION.parse().unwrap(),
            countdown: DEFAULT_COUNTDOWN.parse().unwrap(),
            min_visibility: DEFAULT_MIN_VISIBILITY.parse().unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;
    use structopt::StructOpt;

    #[test]
    fn defaults_match_cli() {
        let parsed = Settings::from_iter(&["curl-tracker"]);
        let default = Settings::default();
        assert_eq!(parsed.hold_time, default.hold_time);
        assert_eq!(parsed.safety_margin, default.safety_margin);
        assert_eq!(parsed.smoothing_window, default.smoothing_window);
        assert_eq!(parsed.min_rep_duration, default.min_rep_duration);
        assert_eq!(parsed.countdown, default.countdown);
        assert_eq!(parsed.min_visibility, default.min_visibility);
    }

    #[test]
    fn overrides() {
        let parsed = Settings::from_iter(&["curl-tracker", "--hold-time", "3", "--smoothing-window", "5"]);
        assert_eq!(parsed.hold_time, 3.0);
        assert_eq!(parsed.smoothing_window, 5);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for arg in &[
            "--hold-time=0",
            "--hold-time=NaN",
            "--hold-time=ten",
            "--safety-margin=-5",
            "--smoothing-window=0",
            "--min-rep-duration=-1",
            "--countdown=inf",
            "--min-visibility=1.5",
        ] {
            let result = Settings::from_iter_safe(&["curl-tracker", *arg]);
            assert!(result.is_err(), "{} was accepted", arg);
        }
    }

    #[test]
    fn boundary_values_are_accepted() {
        let parsed = Settings::from_iter(&[
            "curl-tracker",
            "--safety-margin",
            "0",
            "--countdown",
            "0",
            "--min-visibility",
            "1",
        ]);
        assert_eq!(parsed.safety_margin, 0);
        assert_eq!(parsed.countdown, 0.0);
        assert_eq!(parsed.min_visibility, 1.0);
    }
}
