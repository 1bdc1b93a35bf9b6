use std::time::Duration;

use crate::error::{AppError, AppResult};

pub const MIN_MINUTES: u32 = 1;
pub const MAX_MINUTES: u32 = 30;
pub const DEFAULT_MINUTES: u32 = 5;

pub const COMPLETE_MESSAGE: &str =
    "Session Complete! Take a moment to reflect in the Gratitude Journal.";

/// A validated meditation countdown.
#[derive(Debug, Clone, Copy)]
pub struct Countdown {
    minutes: u32,
    period: Duration,
}

impl Countdown {
    pub fn new(minutes: u32) -> AppResult<Self> {
        if !(MIN_MINUTES..=MAX_MINUTES).contains(&minutes) {
            return Err(AppError::validation(format!(
                "Duration must be between {} and {} minutes",
                MIN_MINUTES, MAX_MINUTES
            )));
        }
        Ok(Self {
            minutes,
            period: Duration::from_secs(1),
        })
    }

    #[cfg(test)]
    /// Time between ticks; one second unless overridden.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn start_message(&self) -> String {
        format!(
            "Starting a {}-minute mindfulness session. Relax and breathe deeply.",
            self.minutes
        )
    }

    /// `MM:SS` labels from the full duration down to `00:01`.
    pub fn labels(&self) -> impl Iterator<Item = String> {
        (1..=self.minutes * 60)
            .rev()
            .map(|remaining| format!("{:02}:{:02}", remaining / 60, remaining % 60))
    }
}
