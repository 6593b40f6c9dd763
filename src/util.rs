use chrono::{DateTime, Utc};

use crate::entities::{application, status_history, study_problem};

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

pub fn day_name(day: i32) -> &'static str {
    usize::try_from(day)
        .ok()
        .and_then(|idx| DAY_NAMES.get(idx))
        .copied()
        .unwrap_or("?")
}

/// Parses `0`..`6` or a (prefix of a) weekday name, Sunday first.
pub fn parse_day(value: &str) -> Option<i32> {
    let trimmed = value.trim();
    if let Ok(day) = trimmed.parse::<i32>() {
        return (0..=6).contains(&day).then_some(day);
    }
    let lowered = trimmed.to_lowercase();
    if lowered.len() < 2 {
        return None;
    }
    DAY_NAMES
        .iter()
        .position(|name| name.to_lowercase().starts_with(&lowered))
        .map(|idx| idx as i32)
}

/// Human label for how long ago `then` was, relative to `now`.
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    if seconds < 60 {
        return "just now".to_string();
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return ago(minutes, "minute");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return ago(hours, "hour");
    }
    let days = hours / 24;
    if days < 7 {
        return ago(days, "day");
    }
    let weeks = days / 7;
    if weeks < 4 {
        return ago(weeks, "week");
    }
    ago(days / 30, "month")
}

fn ago(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{count} {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}

pub fn format_application_detail(
    item: &application::Model,
    status_name: &str,
    company: &str,
    history: &[status_history::Model],
) -> String {
    let mut output = String::new();
    output.push_str(&format!("Application ID: {}\n", item.id));
    output.push_str(&format!("Role: {}\n", item.role));
    output.push_str(&format!("Company: {company}\n"));
    output.push_str(&format!("Status: {} (id {})\n", status_name, item.status_id));
    if let Some(notes) = item.notes.as_deref() {
        output.push_str(&format!("Notes: {notes}\n"));
    }
    output.push_str(&format!("Created: {}\n", format_datetime(item.created_at)));
    output.push_str(&format!("Updated: {}\n", format_datetime(item.updated_at)));
    push_history(&mut output, history);
    output.trim_end().to_string()
}

pub fn format_study_detail(
    item: &study_problem::Model,
    status_name: &str,
    history: &[status_history::Model],
) -> String {
    let mut output = String::new();
    output.push_str(&format!("Study problem ID: {}\n", item.id));
    output.push_str(&format!("Title: {}\n", item.title));
    output.push_str(&format!("Status: {} (id {})\n", status_name, item.status_id));
    output.push_str(&format!(
        "Day: {} (position {})\n",
        day_name(item.day_of_week),
        item.order_index
    ));
    if let Some(difficulty) = item.difficulty.as_deref() {
        output.push_str(&format!("Difficulty: {difficulty}\n"));
    }
    if let Some(link) = item.link.as_deref() {
        output.push_str(&format!("Link: {link}\n"));
    }
    output.push_str(&format!("Created: {}\n", format_datetime(item.created_at)));
    output.push_str(&format!("Updated: {}\n", format_datetime(item.updated_at)));
    push_history(&mut output, history);
    output.trim_end().to_string()
}

fn push_history(output: &mut String, history: &[status_history::Model]) {
    output.push('\n');
    if history.is_empty() {
        output.push_str("History: (none)");
        return;
    }
    output.push_str("History:\n");
    for entry in history {
        output.push_str(&format!(
            "- {} {}\n",
            format_datetime(entry.created_at),
            entry.status_name
        ));
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn label(delta: Duration) -> String {
        let now = Utc::now();
        relative_time(now - delta, now)
    }

    #[test]
    fn relative_time_thresholds() {
        assert_eq!(label(Duration::seconds(59)), "just now");
        assert_eq!(label(Duration::seconds(60)), "1 minute ago");
        assert_eq!(label(Duration::minutes(59)), "59 minutes ago");
        assert_eq!(label(Duration::minutes(60)), "1 hour ago");
        assert_eq!(label(Duration::hours(23)), "23 hours ago");
        assert_eq!(label(Duration::hours(24)), "1 day ago");
        assert_eq!(label(Duration::days(6)), "6 days ago");
        assert_eq!(label(Duration::days(7)), "1 week ago");
        assert_eq!(label(Duration::days(27)), "3 weeks ago");
        assert_eq!(label(Duration::days(28)), "0 months ago");
        assert_eq!(label(Duration::days(65)), "2 months ago");
    }

    #[test]
    fn future_timestamps_are_just_now() {
        let now = Utc::now();
        assert_eq!(relative_time(now + Duration::hours(2), now), "just now");
    }

    #[test]
    fn parse_day_accepts_numbers_and_names() {
        assert_eq!(parse_day("0"), Some(0));
        assert_eq!(parse_day("6"), Some(6));
        assert_eq!(parse_day("7"), None);
        assert_eq!(parse_day("mon"), Some(1));
        assert_eq!(parse_day("Sat"), Some(6));
        assert_eq!(parse_day("th"), Some(4));
        assert_eq!(parse_day("t"), None);
        assert_eq!(parse_day("funday"), None);
        assert_eq!(day_name(3), "Wednesday");
        assert_eq!(day_name(9), "?");
    }
}
