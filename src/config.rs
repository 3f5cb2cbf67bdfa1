//! Engine configuration
//!
//! Batch parameters are carried as an explicitly passed value with a defined
//! lifecycle, never as global mutable state.

use crate::error::EngineError;
use crate::types::{DateWindow, UserId};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Default analysis window length in days
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Default minimum number of overlapping dates required per pair
pub const DEFAULT_MIN_SAMPLE_SIZE: usize = 4;

/// Configuration for one batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Window length in days; the window always ends yesterday
    pub window_days: u32,
    /// Minimum overlapping dates required for a pair to qualify
    pub min_sample_size: usize,
    /// Restrict the batch pass to a single user
    pub user_filter: Option<UserId>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            min_sample_size: DEFAULT_MIN_SAMPLE_SIZE,
            user_filter: None,
        }
    }
}

impl EngineConfig {
    /// Derive the inclusive analysis window ending the day before `today`.
    pub fn window_ending_yesterday(&self, today: NaiveDate) -> Result<DateWindow, EngineError> {
        if self.window_days == 0 {
            return Err(EngineError::InvalidWindow(
                "window length must be at least 1 day".to_string(),
            ));
        }

        let end = today - Duration::days(1);
        let start = end - Duration::days(i64::from(self.window_days) - 1);
        Ok(DateWindow::new(start, end))
    }
}
