//! Schedule expression evaluation.
//!
//! Four keywords are understood (`every_5_minutes`, `every_15_minutes`,
//! `every_hour`, `daily`). Anything else that parses as a cron expression
//! with five, six or seven fields fires on that schedule. Strings matching
//! neither run every five minutes and are logged as a fallback.

use std::str::FromStr;

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};

use crate::jobs::error::{JobError, JobResult};

const FALLBACK_INTERVAL_MINUTES: i64 = 5;

/// How an expression is interpreted
#[derive(Debug, Clone)]
pub enum ScheduleKind {
    /// Fixed interval keyword
    Interval(TimeDelta),
    /// Midnight UTC
    Daily,
    Cron(Box<cron::Schedule>),
    /// Unrecognized; treated as a five minute interval
    Fallback,
}

impl ScheduleKind {
    pub fn parse(expression: &str) -> Self {
        let trimmed = expression.trim();
        match trimmed {
            "every_5_minutes" => ScheduleKind::Interval(TimeDelta::minutes(5)),
            "every_15_minutes" => ScheduleKind::Interval(TimeDelta::minutes(15)),
            "every_hour" => ScheduleKind::Interval(TimeDelta::minutes(60)),
            "daily" => ScheduleKind::Daily,
            _ => match parse_cron(trimmed) {
                Some(schedule) => ScheduleKind::Cron(Box::new(schedule)),
                None => ScheduleKind::Fallback,
            },
        }
    }

    /// Next instant strictly after `reference`
    pub fn next_after(&self, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            ScheduleKind::Interval(delta) => reference.checked_add_signed(*delta),
            ScheduleKind::Daily => {
                let tomorrow = reference.date_naive().succ_opt()?;
                Some(tomorrow.and_time(NaiveTime::MIN).and_utc())
            }
            ScheduleKind::Cron(schedule) => schedule.after(&reference).next(),
            ScheduleKind::Fallback => {
                reference.checked_add_signed(TimeDelta::minutes(FALLBACK_INTERVAL_MINUTES))
            }
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ScheduleKind::Fallback)
    }
}

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Five-field expressions gain a leading seconds field and a trailing year.
///
/// Their day-of-week field uses the usual crontab numbering (0 and 7 are
/// Sunday) and is rewritten to day names, because the `cron` crate counts
/// Sunday as 1. Six and seven field expressions are passed through as is.
fn parse_cron(expression: &str) -> Option<cron::Schedule> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    let normalized = match fields.as_slice() {
        [minute, hour, day, month, weekday] => format!(
            "0 {} {} {} {} {} *",
            minute,
            hour,
            day,
            month,
            crontab_day_of_week(weekday)?
        ),
        [_, _, _, _, _, _] | [_, _, _, _, _, _, _] => expression.to_string(),
        _ => return None,
    };
    cron::Schedule::from_str(&normalized).ok()
}

/// Translate numeric items of a crontab day-of-week field into day names.
///
/// Handles lists, ranges and steps (`1-5`, `0,6`, `*/2`, `1-5/2`, `3/2`).
/// Items already written with names are kept unchanged. Returns `None` for
/// a day above 7, a reversed range or a zero step.
fn crontab_day_of_week(field: &str) -> Option<String> {
    if matches!(field, "*" | "?") {
        return Some(field.to_string());
    }

    let is_number = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let mut selected = [false; 7];
    let mut named: Vec<&str> = Vec::new();

    for item in field.split(',') {
        let (base, step) = match item.split_once('/') {
            Some((base, step)) if is_number(step) => (base, Some(step.parse::<usize>().ok()?)),
            Some(_) => return None,
            None => (item, None),
        };
        let (start, end): (usize, usize) = match base.split_once('-') {
            _ if base == "*" => (0, 6),
            Some((from, to)) if is_number(from) && is_number(to) => {
                (from.parse().ok()?, to.parse().ok()?)
            }
            None if is_number(base) => {
                let from = base.parse().ok()?;
                (from, if step.is_some() { 6 } else { from })
            }
            _ => {
                named.push(item);
                continue;
            }
        };

        let step = step.unwrap_or(1);
        if step == 0 || start > 7 || end > 7 || start > end {
            return None;
        }
        for day in (start..=end).step_by(step) {
            selected[day % 7] = true;
        }
    }

    let mut days: Vec<&str> = DAY_NAMES
        .iter()
        .zip(selected)
        .filter_map(|(name, on)| on.then_some(*name))
        .collect();
    days.extend(named);
    Some(days.join(","))
}

/// Compute the next run for `expression` after `reference`.
///
/// Returns `None` only for a cron expression with no upcoming fire time
/// (for example a year that has passed).
pub fn next_execution(expression: &str, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let kind = ScheduleKind::parse(expression);
    if kind.is_fallback() {
        tracing::warn!(
            expression = %expression,
            "Unrecognized schedule expression, falling back to a 5 minute interval"
        );
    }
    kind.next_after(reference)
}

/// Reject expressions that would only run through the fallback path.
pub fn validate_expression(expression: &str) -> JobResult<ScheduleKind> {
    match ScheduleKind::parse(expression) {
        ScheduleKind::Fallback => Err(JobError::InvalidSchedule(expression.to_string())),
        kind => Ok(kind),
    }
}
