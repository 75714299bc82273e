//! Derivation of the visible task subset.
//!
//! Pure functions over a task slice, its label associations and a
//! [`Selector`]. Label selection wins over list selection, which wins over the
//! time window; the completion filter and search run afterwards.

pub mod search;

pub use search::{FuzzyRanker, SearchRanker};

use crate::types::{Task, TaskLabel};
use chrono::{DateTime, Days, LocalResult, NaiveDate, NaiveTime, TimeZone};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

const DAY_MS: i64 = 86_400_000;

/// Named time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Today,
    #[value(name = "next7days")]
    Next7Days,
    Upcoming,
    All,
}

impl View {
    pub fn as_str(self) -> &'static str {
        match self {
            View::Today => "today",
            View::Next7Days => "next7days",
            View::Upcoming => "upcoming",
            View::All => "all",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(View::Today),
            "next7days" => Ok(View::Next7Days),
            "upcoming" => Ok(View::Upcoming),
            "all" => Ok(View::All),
            other => Err(format!("unknown view '{}'", other)),
        }
    }
}

/// What the user is currently looking at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    pub view: View,
    pub selected_list_id: Option<String>,
    pub selected_label_id: Option<String>,
    pub show_completed: bool,
    pub search_query: String,
}

impl Default for Selector {
    fn default() -> Self {
        Self {
            view: View::Today,
            selected_list_id: None,
            selected_label_id: None,
            show_completed: true,
            search_query: String::new(),
        }
    }
}

/// Millisecond boundaries of the time windows, relative to one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Start of the local day containing the instant.
    pub start: i64,
    /// Exclusive end of today.
    pub today_end: i64,
    /// Inclusive end of the seventh day after today (23:59:59.999 local).
    pub week_end: i64,
}

impl Window {
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let day = now.date_naive();
        let start = local_midnight(&tz, day);
        let week_end = local_midnight(&tz, day + Days::new(8)) - 1;
        Self {
            start,
            today_end: start + DAY_MS,
            week_end,
        }
    }

    /// Whether a task's scheduled day falls in the view's window.
    pub fn admits(&self, view: View, date: Option<i64>) -> bool {
        match view {
            View::All => true,
            View::Today => date.is_some_and(|d| d >= self.start && d < self.today_end),
            View::Next7Days => date.is_some_and(|d| d >= self.start && d <= self.week_end),
            View::Upcoming => date.is_some_and(|d| d >= self.start),
        }
    }
}

/// Milliseconds of local midnight on `day`.
///
/// When midnight is skipped by a DST change the first existing instant of the
/// day is used; when it is repeated the earlier one is.
fn local_midnight<Tz: TimeZone>(tz: &Tz, day: NaiveDate) -> i64 {
    let mut naive = day.and_time(NaiveTime::MIN);
    for _ in 0..4 {
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => return dt.timestamp_millis(),
            LocalResult::Ambiguous(first, second) => {
                return first.timestamp_millis().min(second.timestamp_millis());
            }
            LocalResult::None => naive += chrono::Duration::minutes(30),
        }
    }
    naive.and_utc().timestamp_millis()
}

/// Filters tasks through a selector, ranking search hits with `R`.
#[derive(Debug, Clone, Default)]
pub struct ViewEngine<R = FuzzyRanker> {
    ranker: R,
}

impl<R: SearchRanker> ViewEngine<R> {
    pub fn new(ranker: R) -> Self {
        Self { ranker }
    }

    pub fn ranker(&self) -> &R {
        &self.ranker
    }

    /// Visible tasks for `selector` evaluated at `now`.
    ///
    /// Without a search query the input order is preserved; with one, hits are
    /// ordered best first and ties keep input order.
    pub fn visible<'a, Tz: TimeZone>(
        &self,
        tasks: &'a [Task],
        task_labels: &[TaskLabel],
        selector: &Selector,
        now: &DateTime<Tz>,
    ) -> Vec<&'a Task> {
        let window = Window::at(now);

        let scoped: Vec<&Task> = if let Some(label_id) = &selector.selected_label_id {
            let tagged: HashSet<&str> = task_labels
                .iter()
                .filter(|tl| &tl.label_id == label_id)
                .map(|tl| tl.task_id.as_str())
                .collect();
            tasks
                .iter()
                .filter(|t| tagged.contains(t.id.as_str()))
                .collect()
        } else if let Some(list_id) = &selector.selected_list_id {
            tasks.iter().filter(|t| &t.list_id == list_id).collect()
        } else {
            tasks
                .iter()
                .filter(|t| window.admits(selector.view, t.date))
                .collect()
        };

        let remaining = scoped
            .into_iter()
            .filter(|t| selector.show_completed || !t.completed);

        let query = selector.search_query.trim();
        if query.is_empty() {
            return remaining.collect();
        }

        let mut hits: Vec<(f64, &Task)> = remaining
            .filter_map(|t| self.task_score(query, t).map(|score| (score, t)))
            .collect();
        // sort_by is stable, so equal scores keep input order.
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.into_iter().map(|(_, t)| t).collect()
    }

    fn task_score(&self, query: &str, task: &Task) -> Option<f64> {
        let name = self.ranker.score(query, &task.name);
        let description = self.ranker.score(query, &task.description);
        match (name, description) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn window_is_anchored_to_local_midnight() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        // 01:30 local on 2024-03-10 is 23:30 UTC the previous day.
        let now = tz.with_ymd_and_hms(2024, 3, 10, 1, 30, 0).unwrap();
        let window = Window::at(&now);
        let midnight = tz.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        assert_eq!(window.start, midnight.timestamp_millis());
        assert_eq!(window.today_end - window.start, DAY_MS);
        assert_eq!(window.week_end, window.start + 8 * DAY_MS - 1);
    }

    #[test]
    fn admits_respects_bounds() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let w = Window::at(&now);
        assert!(w.admits(View::Today, Some(w.start)));
        assert!(!w.admits(View::Today, Some(w.today_end)));
        assert!(w.admits(View::Next7Days, Some(w.week_end)));
        assert!(!w.admits(View::Next7Days, Some(w.week_end + 1)));
        assert!(!w.admits(View::Upcoming, Some(w.start - 1)));
        assert!(w.admits(View::Upcoming, Some(w.week_end + DAY_MS * 30)));
        assert!(!w.admits(View::Today, None));
        assert!(!w.admits(View::Upcoming, None));
        assert!(w.admits(View::All, None));
    }

    #[test]
    fn view_names_round_trip() {
        for view in [View::Today, View::Next7Days, View::Upcoming, View::All] {
            assert_eq!(view.as_str().parse::<View>().unwrap(), view);
            assert_eq!(
                serde_json::to_string(&view).unwrap(),
                format!("\"{}\"", view.as_str())
            );
        }
        assert!("tomorrow".parse::<View>().is_err());
    }

    #[test]
    fn default_selector_shows_today_with_completed() {
        let selector = Selector::default();
        assert_eq!(selector.view, View::Today);
        assert!(selector.show_completed);
        assert!(selector.search_query.is_empty());
    }
}
