//! Cron trigger evaluation for schedules.
//!
//! Expressions use the 7-field syntax of the `cron` crate
//! (`sec min hour day month weekday year`).

use chrono::{DateTime, Utc};
use std::str::FromStr;

/// Result of checking whether a schedule is due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerCheck {
    /// Whether the schedule should run now
    pub should_run: bool,
    /// When the schedule should be checked next
    pub next_run: Option<DateTime<Utc>>,
}

impl TriggerCheck {
    /// Create a new trigger check result.
    pub fn new(should_run: bool, next_run: Option<DateTime<Utc>>) -> Self {
        Self {
            should_run,
            next_run,
        }
    }

    /// Not due yet, check again at `next_run`.
    pub fn wait_until(next_run: DateTime<Utc>) -> Self {
        Self {
            should_run: false,
            next_run: Some(next_run),
        }
    }

    /// Due now, next occurrence at `next_run`.
    pub fn run_and_schedule(next_run: DateTime<Utc>) -> Self {
        Self {
            should_run: true,
            next_run: Some(next_run),
        }
    }
}

/// Something that decides when a schedule fires.
pub trait Trigger {
    /// Check whether to fire at `now`, given the last run.
    fn check(&self, last_run: Option<DateTime<Utc>>, now: DateTime<Utc>) -> TriggerCheck;

    /// First occurrence strictly after `after`, if any.
    fn next_execution(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>>;
}

/// Cron-expression trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronTrigger {
    expression: String,
}

impl CronTrigger {
    /// Wraps an expression without validating it.
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }

    /// Whether the expression parses.
    pub fn is_valid(&self) -> bool {
        cron::Schedule::from_str(&self.expression).is_ok()
    }

    /// The wrapped expression.
    pub fn expression(&self) -> &str {
        &self.expression
    }
}

impl Trigger for CronTrigger {
    fn check(&self, last_run: Option<DateTime<Utc>>, now: DateTime<Utc>) -> TriggerCheck {
        let Ok(schedule) = cron::Schedule::from_str(&self.expression) else {
            return TriggerCheck::new(false, None);
        };

        // A schedule that never ran is due immediately.
        let Some(last) = last_run else {
            return TriggerCheck::new(true, schedule.after(&now).next());
        };

        match schedule.after(&last).next() {
            Some(next) if now >= next => match schedule.after(&now).next() {
                Some(future) => TriggerCheck::run_and_schedule(future),
                None => TriggerCheck::new(true, None),
            },
            Some(next) => TriggerCheck::wait_until(next),
            None => TriggerCheck::new(false, None),
        }
    }

    fn next_execution(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        cron::Schedule::from_str(&self.expression)
            .ok()
            .and_then(|schedule| schedule.after(&after).next())
    }
}
