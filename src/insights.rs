use crate::merge::parse_date;
use crate::models::{DailyPoint, HistoryEntry, InsightsResponse, TodayTally, Totals};
use chrono::{Duration, Local, NaiveDate};
use std::collections::BTreeMap;

pub fn build_insights(today: &TodayTally, history: &[HistoryEntry]) -> InsightsResponse {
    build_insights_at(Local::now().date_naive(), today, history)
}

/// Per-day figures come from archived entries (bucketed by local date) plus
/// the live tally, which counts towards `date`.
pub fn build_insights_at(
    date: NaiveDate,
    today: &TodayTally,
    history: &[HistoryEntry],
) -> InsightsResponse {
    let mut days: BTreeMap<NaiveDate, (f64, u64)> = BTreeMap::new();
    for entry in history {
        let Some(at) = parse_date(&entry.date) else {
            continue;
        };
        let bucket = days.entry(at.with_timezone(&Local).date_naive()).or_default();
        bucket.0 += entry.cups;
        bucket.1 = bucket.1.saturating_add(entry.coding_minutes);
    }

    let live = days.entry(date).or_default();
    live.0 += today.cups;
    live.1 = live.1.saturating_add(today.coding_minutes);

    let mut last_7_days = Vec::with_capacity(7);
    for offset in (0..7).rev() {
        let day = date - Duration::days(offset);
        let (cups, coding_minutes) = days.get(&day).copied().unwrap_or_default();
        last_7_days.push(DailyPoint {
            date: day.to_string(),
            cups: round_tenth(cups),
            coding_minutes,
            cups_per_hour: ratio(cups, coding_minutes),
        });
    }

    let cups: f64 = history.iter().map(|entry| entry.cups).sum::<f64>() + today.cups;
    let coding_minutes = history
        .iter()
        .fold(today.coding_minutes, |acc, entry| acc.saturating_add(entry.coding_minutes));

    InsightsResponse {
        last_7_days,
        totals: Totals {
            days_logged: history.len(),
            cups: round_tenth(cups),
            coding_minutes,
            cups_per_hour: ratio(cups, coding_minutes),
        },
    }
}

fn ratio(cups: f64, coding_minutes: u64) -> Option<f64> {
    if coding_minutes == 0 {
        return None;
    }
    let per_hour = cups / (coding_minutes as f64 / 60.0);
    Some((per_hour * 100.0).round() / 100.0)
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
