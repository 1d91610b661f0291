//! Human-readable rendering of durations in seconds
//!
//! `3725` renders as `"1 hour, 2 minutes and 5 seconds"`. Only the three
//! largest non-zero units are kept.

const MAX_UNITS: usize = 3;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
const YEAR: u64 = 52 * WEEK;

const UNITS: &[(u64, &str, &str)] = &[
    (YEAR, "year", "years"),
    (WEEK, "week", "weeks"),
    (DAY, "day", "days"),
    (HOUR, "hour", "hours"),
    (MINUTE, "minute", "minutes"),
    (1, "second", "seconds"),
];

pub fn format_timespan(total_seconds: u64) -> String {
    if total_seconds < MINUTE {
        return pluralize(total_seconds, "second", "seconds");
    }

    let mut remaining = total_seconds;
    let mut parts = Vec::new();
    for &(divider, singular, plural) in UNITS {
        let count = remaining / divider;
        remaining %= divider;
        if count > 0 {
            parts.push(pluralize(count, singular, plural));
        }
    }
    parts.truncate(MAX_UNITS);
    concatenate(&parts)
}

fn pluralize(count: u64, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

fn concatenate(parts: &[String]) -> String {
    match parts {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}
