//! Task report aggregation: totals, breakdowns, workload, burndown and
//! cumulative flow, plus month-over-month analytics.
//!
//! Input is the flat task list a handler already fetched for the requested
//! scope. All counters are `u64`; the API layer converts as needed.

use std::collections::HashMap;

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::task::{Priority, TaskStatus};
use crate::time::{each_day, inclusive_days};
use crate::CoreError;

/// The fields of a task that reports look at.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub assignee_id: Option<String>,
    pub assignee_name: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

impl TaskRecord {
    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    /// Not done and due strictly before `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_done() && self.due_date.is_some_and(|due| due < today)
    }

    /// Day the task was completed. Done tasks without a stamp count as
    /// completed on the day they were created.
    pub fn completed_on(&self) -> Option<NaiveDate> {
        if !self.is_done() {
            return None;
        }
        Some(self.completed_at.unwrap_or(self.created_at).date())
    }

    fn created_on(&self) -> NaiveDate {
        self.created_at.date()
    }

    /// Column the task occupied at the end of `day`.
    fn status_on(&self, day: NaiveDate) -> TaskStatus {
        match self.completed_on() {
            Some(done) if done <= day => TaskStatus::Done,
            Some(_) => TaskStatus::InProgress,
            None => self.status,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub total: u64,
    pub completed: u64,
    pub in_progress: u64,
    pub overdue: u64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: TaskStatus,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorityCount {
    pub priority: Priority,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssigneeWorkload {
    pub assignee_id: Option<String>,
    pub assignee_name: Option<String>,
    pub assigned: u64,
    pub completed: u64,
    pub overdue: u64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BurndownPoint {
    pub date: NaiveDate,
    pub remaining: u64,
    pub ideal: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowPoint {
    pub date: NaiveDate,
    pub counts: Vec<StatusCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub totals: Totals,
    pub by_status: Vec<StatusCount>,
    pub by_priority: Vec<PriorityCount>,
    pub by_assignee: Vec<AssigneeWorkload>,
    pub burndown: Vec<BurndownPoint>,
    pub cumulative_flow: Vec<FlowPoint>,
}

/// Percentage of `completed` over `total`, rounded to two decimals. Zero when `total` is zero.
pub fn completion_rate(completed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(completed as f64 / total as f64 * 100.0)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn totals(tasks: &[TaskRecord], today: NaiveDate) -> Totals {
    let total = tasks.len() as u64;
    let completed = tasks.iter().filter(|t| t.is_done()).count() as u64;
    let in_progress = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::InProgress)
        .count() as u64;
    let overdue = tasks.iter().filter(|t| t.is_overdue(today)).count() as u64;
    Totals {
        total,
        completed,
        in_progress,
        overdue,
        completion_rate: completion_rate(completed, total),
    }
}

/// Count per status. Every status is present, in column order.
pub fn by_status<'a>(
    tasks: impl IntoIterator<Item = &'a TaskRecord>,
    status_of: impl Fn(&TaskRecord) -> TaskStatus,
) -> Vec<StatusCount> {
    let mut counts: HashMap<TaskStatus, u64> = HashMap::new();
    for t in tasks {
        *counts.entry(status_of(t)).or_default() += 1;
    }
    TaskStatus::ALL
        .iter()
        .map(|&status| StatusCount {
            status,
            count: counts.get(&status).copied().unwrap_or(0),
        })
        .collect()
}

/// Count per priority. Every priority is present, lowest first.
pub fn by_priority(tasks: &[TaskRecord]) -> Vec<PriorityCount> {
    Priority::ALL
        .iter()
        .map(|&priority| PriorityCount {
            priority,
            count: tasks.iter().filter(|t| t.priority == priority).count() as u64,
        })
        .collect()
}

/// Workload per assignee, busiest first, ties broken by name. Unassigned tasks
/// are grouped under `assignee_id = None` and listed last.
pub fn by_assignee(tasks: &[TaskRecord], today: NaiveDate) -> Vec<AssigneeWorkload> {
    let mut groups: HashMap<Option<String>, AssigneeWorkload> = HashMap::new();
    for t in tasks {
        let entry = groups
            .entry(t.assignee_id.clone())
            .or_insert_with(|| AssigneeWorkload {
                assignee_id: t.assignee_id.clone(),
                assignee_name: t.assignee_name.clone(),
                assigned: 0,
                completed: 0,
                overdue: 0,
                completion_rate: 0.0,
            });
        entry.assigned += 1;
        if t.is_done() {
            entry.completed += 1;
        }
        if t.is_overdue(today) {
            entry.overdue += 1;
        }
    }

    let mut result: Vec<AssigneeWorkload> = groups
        .into_values()
        .map(|mut w| {
            w.completion_rate = completion_rate(w.completed, w.assigned);
            w
        })
        .collect();
    // Unassigned bucket last, then heaviest load first.
    result.sort_by(|a, b| {
        a.assignee_id
            .is_none()
            .cmp(&b.assignee_id.is_none())
            .then(b.assigned.cmp(&a.assigned))
            .then_with(|| a.assignee_name.cmp(&b.assignee_name))
            .then_with(|| a.assignee_id.cmp(&b.assignee_id))
    });
    result
}

/// Remaining open work per day and a straight ideal line from the first
/// day's remaining count down to zero on the last day.
pub fn burndown(tasks: &[TaskRecord], from: NaiveDate, to: NaiveDate) -> Vec<BurndownPoint> {
    let remaining_on = |day: NaiveDate| -> u64 {
        tasks
            .iter()
            .filter(|t| t.created_on() <= day)
            .filter(|t| t.completed_on().is_none_or(|done| done > day))
            .count() as u64
    };

    let days: Vec<NaiveDate> = each_day(from, to).collect();
    let Some(&first) = days.first() else {
        return Vec::new();
    };
    let initial = remaining_on(first) as f64;
    let steps = (days.len() - 1) as f64;

    days.iter()
        .enumerate()
        .map(|(i, &date)| {
            let ideal = if steps == 0.0 {
                initial
            } else {
                round2(initial * (1.0 - i as f64 / steps))
            };
            BurndownPoint {
                date,
                remaining: remaining_on(date),
                ideal,
            }
        })
        .collect()
}

/// Per-day status counts for every task that existed by that day.
pub fn cumulative_flow(tasks: &[TaskRecord], from: NaiveDate, to: NaiveDate) -> Vec<FlowPoint> {
    each_day(from, to)
        .map(|date| FlowPoint {
            date,
            counts: by_status(
                tasks.iter().filter(|t| t.created_on() <= date),
                |t| t.status_on(date),
            ),
        })
        .collect()
}

/// Days covered when a report request gives no range.
pub const DEFAULT_RANGE_DAYS: i64 = 14;
/// Longest range a single report may cover.
pub const MAX_RANGE_DAYS: i64 = 366;

/// Fill in a missing report range and reject inverted or oversized ones.
///
/// With neither bound the range is the last [`DEFAULT_RANGE_DAYS`] ending
/// `today`; with one bound the other is derived from the same width.
pub fn resolve_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), CoreError> {
    let width = chrono::Duration::days(DEFAULT_RANGE_DAYS - 1);
    let (from, to) = match (from, to) {
        (Some(f), Some(t)) => (f, t),
        (Some(f), None) => (f, f + width),
        (None, Some(t)) => (t - width, t),
        (None, None) => (today - width, today),
    };
    if from > to {
        return Err(CoreError::InvalidRange(format!("{from} is after {to}")));
    }
    if inclusive_days(from, to) > MAX_RANGE_DAYS {
        return Err(CoreError::InvalidRange(format!(
            "range spans more than {MAX_RANGE_DAYS} days"
        )));
    }
    Ok((from, to))
}

pub fn build_report(
    tasks: &[TaskRecord],
    from: NaiveDate,
    to: NaiveDate,
    today: NaiveDate,
) -> TaskReport {
    TaskReport {
        from,
        to,
        totals: totals(tasks, today),
        by_status: by_status(tasks, |t| t.status),
        by_priority: by_priority(tasks),
        by_assignee: by_assignee(tasks, today),
        burndown: burndown(tasks, from, to),
        cumulative_flow: cumulative_flow(tasks, from, to),
    }
}

// ─── Month-over-month analytics ─────────────────────────────────────────────

/// A count for the current month and its change against the previous month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricDelta {
    pub count: u64,
    pub difference: i64,
}

impl MetricDelta {
    fn new(current: u64, previous: u64) -> Self {
        Self {
            count: current,
            difference: current as i64 - previous as i64,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskAnalytics {
    pub task_count: MetricDelta,
    pub assigned_task_count: MetricDelta,
    pub incomplete_task_count: MetricDelta,
    pub completed_task_count: MetricDelta,
    pub overdue_task_count: MetricDelta,
}

#[derive(Default)]
struct MonthCounts {
    total: u64,
    assigned: u64,
    incomplete: u64,
    completed: u64,
    overdue: u64,
}

fn month_counts<'a>(
    tasks: impl Iterator<Item = &'a TaskRecord>,
    user_id: &str,
    today: NaiveDate,
) -> MonthCounts {
    let mut c = MonthCounts::default();
    for t in tasks {
        c.total += 1;
        if t.assignee_id.as_deref() == Some(user_id) {
            c.assigned += 1;
        }
        if t.is_done() {
            c.completed += 1;
        } else {
            c.incomplete += 1;
        }
        if t.is_overdue(today) {
            c.overdue += 1;
        }
    }
    c
}

/// First day of `today`'s month and of the month before it.
fn month_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate, NaiveDate) {
    let this_start = today.with_day(1).unwrap_or(today);
    let last_start = this_start
        .checked_sub_months(Months::new(1))
        .unwrap_or(this_start);
    let next_start = this_start
        .checked_add_months(Months::new(1))
        .unwrap_or(this_start);
    (last_start, this_start, next_start)
}

/// Compare tasks created this month against tasks created last month.
pub fn month_over_month(tasks: &[TaskRecord], user_id: &str, today: NaiveDate) -> TaskAnalytics {
    let (last_start, this_start, next_start) = month_bounds(today);
    let in_range = |lo: NaiveDate, hi: NaiveDate| {
        move |t: &&TaskRecord| {
            let d = t.created_on();
            d >= lo && d < hi
        }
    };

    let this = month_counts(
        tasks.iter().filter(in_range(this_start, next_start)),
        user_id,
        today,
    );
    let last = month_counts(
        tasks.iter().filter(in_range(last_start, this_start)),
        user_id,
        today,
    );

    TaskAnalytics {
        task_count: MetricDelta::new(this.total, last.total),
        assigned_task_count: MetricDelta::new(this.assigned, last.assigned),
        incomplete_task_count: MetricDelta::new(this.incomplete, last.incomplete),
        completed_task_count: MetricDelta::new(this.completed, last.completed),
        overdue_task_count: MetricDelta::new(this.overdue, last.overdue),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_resolve_range_defaults_and_limits() {
        let today = d("2024-06-30");
        assert_eq!(
            resolve_range(None, None, today).unwrap(),
            (d("2024-06-17"), today)
        );
        assert_eq!(
            resolve_range(Some(d("2024-06-01")), None, today).unwrap(),
            (d("2024-06-01"), d("2024-06-14"))
        );
        assert!(resolve_range(Some(d("2024-06-02")), Some(d("2024-06-01")), today).is_err());
        assert!(resolve_range(Some(d("2023-01-01")), Some(d("2024-06-01")), today).is_err());
    }

    fn task(id: &str, status: TaskStatus, created: &str) -> TaskRecord {
        TaskRecord {
            id: id.into(),
            status,
            priority: Priority::Medium,
            assignee_id: None,
            assignee_name: None,
            due_date: None,
            created_at: d(created).and_hms_opt(9, 0, 0).unwrap(),
            completed_at: None,
        }
    }

    fn done(id: &str, created: &str, completed: &str) -> TaskRecord {
        TaskRecord {
            completed_at: Some(d(completed).and_hms_opt(17, 0, 0).unwrap()),
            ..task(id, TaskStatus::Done, created)
        }
    }

    fn assigned(mut t: TaskRecord, who: &str) -> TaskRecord {
        t.assignee_id = Some(who.into());
        t.assignee_name = Some(who.to_uppercase());
        t
    }

    #[test]
    fn test_completion_rate() {
        assert_eq!(completion_rate(0, 0), 0.0);
        assert_eq!(completion_rate(1, 3), 33.33);
        assert_eq!(completion_rate(2, 3), 66.67);
        assert_eq!(completion_rate(4, 4), 100.0);
    }

    #[test]
    fn test_totals_and_overdue() {
        let today = d("2024-05-10");
        let mut late = task("late", TaskStatus::InProgress, "2024-05-01");
        late.due_date = Some(d("2024-05-09"));
        let mut due_today = task("due-today", TaskStatus::Todo, "2024-05-01");
        due_today.due_date = Some(d("2024-05-10"));
        let mut done_late = done("done-late", "2024-05-01", "2024-05-08");
        done_late.due_date = Some(d("2024-05-02"));

        let t = totals(&[late, due_today, done_late], today);
        assert_eq!(t.total, 3);
        assert_eq!(t.completed, 1);
        assert_eq!(t.in_progress, 1);
        assert_eq!(t.overdue, 1);
        assert_eq!(t.completion_rate, 33.33);
    }

    #[test]
    fn test_breakdowns_include_every_variant() {
        let tasks = vec![
            task("a", TaskStatus::Todo, "2024-05-01"),
            task("b", TaskStatus::Todo, "2024-05-01"),
        ];
        let status = by_status(&tasks, |t| t.status);
        assert_eq!(status.len(), TaskStatus::ALL.len());
        assert_eq!(status[1], StatusCount { status: TaskStatus::Todo, count: 2 });
        assert_eq!(status[0].count, 0);

        let priority = by_priority(&tasks);
        assert_eq!(priority.len(), 4);
        assert_eq!(priority[1].count, 2);
    }

    #[test]
    fn test_workload_sorted_with_unassigned_last() {
        let today = d("2024-05-10");
        let tasks = vec![
            assigned(task("1", TaskStatus::Todo, "2024-05-01"), "bo"),
            assigned(done("2", "2024-05-01", "2024-05-02"), "al"),
            assigned(task("3", TaskStatus::Todo, "2024-05-01"), "al"),
            task("4", TaskStatus::Todo, "2024-05-01"),
            task("5", TaskStatus::Todo, "2024-05-01"),
            task("6", TaskStatus::Todo, "2024-05-01"),
        ];
        let w = by_assignee(&tasks, today);
        assert_eq!(w.len(), 3);
        assert_eq!(w[0].assignee_id.as_deref(), Some("al"));
        assert_eq!(w[0].assigned, 2);
        assert_eq!(w[0].completion_rate, 50.0);
        assert_eq!(w[1].assignee_id.as_deref(), Some("bo"));
        assert_eq!(w[2].assignee_id, None);
        assert_eq!(w[2].assigned, 3);
    }

    #[test]
    fn test_burndown() {
        let tasks = vec![
            task("open", TaskStatus::Todo, "2024-05-01"),
            done("early", "2024-05-01", "2024-05-02"),
            done("late", "2024-05-01", "2024-05-03"),
            task("added", TaskStatus::Todo, "2024-05-03"),
        ];
        let points = burndown(&tasks, d("2024-05-01"), d("2024-05-03"));
        let remaining: Vec<u64> = points.iter().map(|p| p.remaining).collect();
        assert_eq!(remaining, vec![3, 2, 2]);
        let ideal: Vec<f64> = points.iter().map(|p| p.ideal).collect();
        assert_eq!(ideal, vec![3.0, 1.5, 0.0]);
    }

    #[test]
    fn test_burndown_single_day_and_empty_range() {
        let tasks = vec![task("a", TaskStatus::Todo, "2024-05-01")];
        let one = burndown(&tasks, d("2024-05-01"), d("2024-05-01"));
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].ideal, 1.0);
        assert!(burndown(&tasks, d("2024-05-02"), d("2024-05-01")).is_empty());
    }

    #[test]
    fn test_cumulative_flow() {
        let tasks = vec![
            task("review", TaskStatus::InReview, "2024-05-01"),
            done("done", "2024-05-01", "2024-05-02"),
            task("later", TaskStatus::Backlog, "2024-05-02"),
        ];
        let flow = cumulative_flow(&tasks, d("2024-05-01"), d("2024-05-02"));
        assert_eq!(flow.len(), 2);

        let count = |p: &FlowPoint, s: TaskStatus| {
            p.counts.iter().find(|c| c.status == s).map(|c| c.count).unwrap()
        };
        // Day one: the completed task was still in progress.
        assert_eq!(count(&flow[0], TaskStatus::InReview), 1);
        assert_eq!(count(&flow[0], TaskStatus::InProgress), 1);
        assert_eq!(count(&flow[0], TaskStatus::Done), 0);
        assert_eq!(count(&flow[0], TaskStatus::Backlog), 0);
        // Day two.
        assert_eq!(count(&flow[1], TaskStatus::Done), 1);
        assert_eq!(count(&flow[1], TaskStatus::InProgress), 0);
        assert_eq!(count(&flow[1], TaskStatus::Backlog), 1);
    }

    #[test]
    fn test_month_over_month() {
        let today = d("2024-03-15");
        let mut overdue = assigned(task("a", TaskStatus::Todo, "2024-03-02"), "me");
        overdue.due_date = Some(d("2024-03-10"));
        let tasks = vec![
            overdue,
            done("b", "2024-03-03", "2024-03-04"),
            assigned(task("c", TaskStatus::Todo, "2024-02-20"), "me"),
            assigned(task("d", TaskStatus::Todo, "2024-02-21"), "me"),
            task("e", TaskStatus::Todo, "2024-01-31"),
        ];
        let a = month_over_month(&tasks, "me", today);
        assert_eq!(a.task_count, MetricDelta { count: 2, difference: 0 });
        assert_eq!(a.assigned_task_count, MetricDelta { count: 1, difference: -1 });
        assert_eq!(a.completed_task_count, MetricDelta { count: 1, difference: 1 });
        assert_eq!(a.incomplete_task_count, MetricDelta { count: 1, difference: -1 });
        assert_eq!(a.overdue_task_count, MetricDelta { count: 1, difference: 1 });
    }

    #[test]
    fn test_month_bounds_across_year() {
        let (last, this, next) = month_bounds(d("2024-01-20"));
        assert_eq!(last, d("2023-12-01"));
        assert_eq!(this, d("2024-01-01"));
        assert_eq!(next, d("2024-02-01"));
    }
}
