//! Urgency classification of open tasks.
//!
//! Every comparison is made against one `Snapshot` taken at the start of a
//! run, so the whole batch shares a single cutoff.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::fields::TaskStatus;
use crate::task::Task;

/// Tasks due within this many days are urgent when not yet started.
pub const URGENT_WITHIN_DAYS: i64 = 3;
/// Tasks due within this many days are a warning when not yet started.
pub const WARNING_WITHIN_DAYS: i64 = 7;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// The instant a run is evaluated at, today at local midnight, together with
/// the day boundaries the buckets and the weekly window are measured against.
///
/// Boundaries are calendar days in the run's time zone, so a window that
/// crosses a DST change is an hour longer or shorter than `n * 24h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub now: DateTime<Utc>,
    /// End of the urgent window, inclusive.
    pub urgent_until: DateTime<Utc>,
    /// End of the warning window and of "due next week", inclusive.
    pub week_ahead: DateTime<Utc>,
    /// Start of "completed this week", inclusive.
    pub week_ago: DateTime<Utc>,
}

impl Snapshot {
    /// Take the snapshot for a run started now.
    pub fn today() -> Self {
        Snapshot::on(&Local, Local::now().date_naive())
    }

    /// The snapshot for `date` as a calendar day in `tz`.
    pub fn on<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Self {
        let midnight_after = |days: i64| {
            let day = date.checked_add_signed(Duration::days(days)).unwrap_or(date);
            local_midnight(tz, day)
        };
        Snapshot {
            now: local_midnight(tz, date),
            urgent_until: midnight_after(URGENT_WITHIN_DAYS),
            week_ahead: midnight_after(WARNING_WITHIN_DAYS),
            week_ago: midnight_after(-WARNING_WITHIN_DAYS),
        }
    }

    /// Whole days from `earlier` to `later`, rounded down.
    pub fn whole_days(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
        (later - earlier).num_milliseconds().div_euclid(MS_PER_DAY)
    }
}

/// Start of `date` in `tz`. When midnight falls in a DST gap this is the first
/// hour of the day that exists.
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    (0..24)
        .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
        .find_map(|t| tz.from_local_datetime(&t).earliest())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&date.and_time(NaiveTime::default())))
}

/// An open task past its due date.
#[derive(Debug, Clone)]
pub struct OverdueTask<'a> {
    pub task: &'a Task,
    pub days_overdue: i64,
}

/// An unstarted task due soon.
#[derive(Debug, Clone)]
pub struct DueSoonTask<'a> {
    pub task: &'a Task,
    pub days_remaining: i64,
}

/// The three disjoint urgency buckets, each in presentation order.
#[derive(Debug, Default)]
pub struct UrgencyReport<'a> {
    pub overdue: Vec<OverdueTask<'a>>,
    pub urgent: Vec<DueSoonTask<'a>>,
    pub warning: Vec<DueSoonTask<'a>>,
}

impl UrgencyReport<'_> {
    /// Whether there is anything worth alerting on.
    pub fn needs_alert(&self) -> bool {
        !self.overdue.is_empty() || !self.urgent.is_empty()
    }
}

/// Which bucket a single task falls into, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Overdue { days_overdue: i64 },
    Urgent { days_remaining: i64 },
    Warning { days_remaining: i64 },
}

/// Classify one task. Buckets are tried in the order overdue, urgent, warning
/// and the first match wins.
pub fn classify_task(snapshot: &Snapshot, task: &Task) -> Option<Urgency> {
    if task.status.is_closed() {
        return None;
    }
    let due = task.due?;
    let now = snapshot.now;

    if due < now {
        return Some(Urgency::Overdue { days_overdue: Snapshot::whole_days(due, now) });
    }
    if task.status != TaskStatus::NotStarted {
        return None;
    }
    let days_remaining = Snapshot::whole_days(now, due);
    if due <= snapshot.urgent_until {
        Some(Urgency::Urgent { days_remaining })
    } else if due <= snapshot.week_ahead {
        Some(Urgency::Warning { days_remaining })
    } else {
        None
    }
}

/// Sort tasks into overdue, urgent and warning buckets.
///
/// Overdue tasks are ordered most overdue first; urgent and warning tasks
/// soonest first. Ties keep input order.
pub fn classify<'a, I>(snapshot: &Snapshot, tasks: I) -> UrgencyReport<'a>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut report = UrgencyReport::default();
    for task in tasks {
        match classify_task(snapshot, task) {
            Some(Urgency::Overdue { days_overdue }) => {
                report.overdue.push(OverdueTask { task, days_overdue })
            }
            Some(Urgency::Urgent { days_remaining }) => {
                report.urgent.push(DueSoonTask { task, days_remaining })
            }
            Some(Urgency::Warning { days_remaining }) => {
                report.warning.push(DueSoonTask { task, days_remaining })
            }
            None => {}
        }
    }
    report.overdue.sort_by(|a, b| b.days_overdue.cmp(&a.days_overdue));
    report.urgent.sort_by_key(|t| t.days_remaining);
    report.warning.sort_by_key(|t| t.days_remaining);
    report
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    impl Snapshot {
        /// Snapshot for the UTC calendar day starting at `now`.
        pub fn at(now: DateTime<Utc>) -> Self {
            Snapshot::on(&Utc, now.date_naive())
        }
    }

    pub fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    pub fn task(id: &str, status: TaskStatus, due: Option<DateTime<Utc>>) -> Task {
        Task {
            id: id.to_string(),
            name: format!("Task {id}"),
            wbs: None,
            category: None,
            status,
            due,
            assignee: None,
            customer_ids: Vec::new(),
            updated: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn snapshot() -> Snapshot {
        Snapshot::at(day(2024, 6, 10))
    }

    #[test]
    fn test_overdue_detection() {
        let a = task("A", TaskStatus::InProgress, Some(day(2024, 6, 8)));
        let b = task("B", TaskStatus::Done, Some(day(2024, 6, 8)));
        let tasks = [a, b];
        let report = classify(&snapshot(), &tasks);

        assert_eq!(report.overdue.len(), 1);
        assert_eq!(report.overdue[0].task.id, "A");
        assert_eq!(report.overdue[0].days_overdue, 2);
        assert!(report.urgent.is_empty());
        assert!(report.warning.is_empty());
    }

    #[test]
    fn test_urgency_boundary() {
        let tasks = [
            task("three", TaskStatus::NotStarted, Some(day(2024, 6, 13))),
            task("four", TaskStatus::NotStarted, Some(day(2024, 6, 14))),
        ];
        let report = classify(&snapshot(), &tasks);

        assert_eq!(report.urgent.len(), 1);
        assert_eq!(report.urgent[0].task.id, "three");
        assert_eq!(report.urgent[0].days_remaining, 3);
        assert_eq!(report.warning.len(), 1);
        assert_eq!(report.warning[0].task.id, "four");
        assert_eq!(report.warning[0].days_remaining, 4);
    }

    #[test]
    fn test_due_today_is_urgent_not_overdue() {
        let tasks = [task("today", TaskStatus::NotStarted, Some(day(2024, 6, 10)))];
        let report = classify(&snapshot(), &tasks);
        assert!(report.overdue.is_empty());
        assert_eq!(report.urgent[0].days_remaining, 0);
    }

    #[test]
    fn test_warning_window_ends_at_seven_days() {
        let tasks = [
            task("seven", TaskStatus::NotStarted, Some(day(2024, 6, 17))),
            task("eight", TaskStatus::NotStarted, Some(day(2024, 6, 18))),
        ];
        let report = classify(&snapshot(), &tasks);
        assert_eq!(report.warning.len(), 1);
        assert_eq!(report.warning[0].days_remaining, 7);
    }

    #[test]
    fn test_started_tasks_are_only_ever_overdue() {
        let tasks = [
            task("ip", TaskStatus::InProgress, Some(day(2024, 6, 11))),
            task("blocked", TaskStatus::Blocked, Some(day(2024, 6, 12))),
            task("blocked-late", TaskStatus::Blocked, Some(day(2024, 6, 1))),
        ];
        let report = classify(&snapshot(), &tasks);
        assert!(report.urgent.is_empty());
        assert!(report.warning.is_empty());
        assert_eq!(report.overdue.len(), 1);
        assert_eq!(report.overdue[0].days_overdue, 9);
    }

    #[test]
    fn test_closed_and_undated_tasks_never_classified() {
        let mut tasks = Vec::new();
        for (i, status) in [TaskStatus::Done, TaskStatus::OnHold].into_iter().enumerate() {
            for offset in [-5i64, 0, 2, 5] {
                tasks.push(task(
                    &format!("{i}:{offset}"),
                    status,
                    Some(day(2024, 6, 10) + Duration::days(offset)),
                ));
            }
        }
        tasks.push(task("undated", TaskStatus::NotStarted, None));

        let report = classify(&snapshot(), &tasks);
        assert!(report.overdue.is_empty());
        assert!(report.urgent.is_empty());
        assert!(report.warning.is_empty());
        assert!(!report.needs_alert());
    }

    #[test]
    fn test_overdue_sorted_most_overdue_first() {
        let tasks = [
            task("five", TaskStatus::InProgress, Some(day(2024, 6, 5))),
            task("one", TaskStatus::NotStarted, Some(day(2024, 6, 9))),
            task("nine", TaskStatus::Blocked, Some(day(2024, 6, 1))),
        ];
        let report = classify(&snapshot(), &tasks);
        let days: Vec<i64> = report.overdue.iter().map(|t| t.days_overdue).collect();
        assert_eq!(days, [9, 5, 1]);
        assert!(report.needs_alert());
    }

    #[test]
    fn test_due_soon_sorted_soonest_first() {
        let tasks = [
            task("c", TaskStatus::NotStarted, Some(day(2024, 6, 13))),
            task("a", TaskStatus::NotStarted, Some(day(2024, 6, 11))),
            task("b", TaskStatus::NotStarted, Some(day(2024, 6, 12))),
            task("w2", TaskStatus::NotStarted, Some(day(2024, 6, 17))),
            task("w1", TaskStatus::NotStarted, Some(day(2024, 6, 15))),
        ];
        let report = classify(&snapshot(), &tasks);
        let urgent: Vec<&str> = report.urgent.iter().map(|t| t.task.id.as_str()).collect();
        let warning: Vec<&str> = report.warning.iter().map(|t| t.task.id.as_str()).collect();
        assert_eq!(urgent, ["a", "b", "c"]);
        assert_eq!(warning, ["w1", "w2"]);
    }

    #[test]
    fn test_unknown_status_is_only_ever_overdue() {
        let tasks = [
            task("soon", TaskStatus::Unknown, Some(day(2024, 6, 11))),
            task("week", TaskStatus::Unknown, Some(day(2024, 6, 15))),
            task("late", TaskStatus::Unknown, Some(day(2024, 6, 9))),
        ];
        let report = classify(&snapshot(), &tasks);
        assert!(report.urgent.is_empty());
        assert!(report.warning.is_empty());
        assert_eq!(report.overdue.len(), 1);
        assert_eq!(report.overdue[0].task.id, "late");
    }

    #[test]
    fn test_windows_follow_local_calendar_across_dst() {
        use chrono_tz::America::New_York;

        // DST ends on 2024-11-03, so local midnight three days out is 73h away.
        let snap = Snapshot::on(&New_York, NaiveDate::from_ymd_opt(2024, 11, 1).unwrap());
        assert_eq!(snap.now, Utc.with_ymd_and_hms(2024, 11, 1, 4, 0, 0).unwrap());
        assert_eq!(snap.urgent_until, Utc.with_ymd_and_hms(2024, 11, 4, 5, 0, 0).unwrap());

        let tasks = [
            task("three", TaskStatus::NotStarted, Some(snap.urgent_until)),
            task("four", TaskStatus::NotStarted, Some(Utc.with_ymd_and_hms(2024, 11, 5, 5, 0, 0).unwrap())),
            task("seven", TaskStatus::NotStarted, Some(snap.week_ahead)),
        ];
        let report = classify(&snap, &tasks);

        assert_eq!(report.urgent.len(), 1);
        assert_eq!(report.urgent[0].task.id, "three");
        assert_eq!(report.urgent[0].days_remaining, 3);
        let warning: Vec<(&str, i64)> =
            report.warning.iter().map(|t| (t.task.id.as_str(), t.days_remaining)).collect();
        assert_eq!(warning, [("four", 4), ("seven", 7)]);
    }

    #[test]
    fn test_midnight_in_dst_gap_uses_first_valid_hour() {
        use chrono_tz::America::Santiago;

        // Clocks jump from 00:00 to 01:00 on 2024-09-08.
        let snap = Snapshot::on(&Santiago, NaiveDate::from_ymd_opt(2024, 9, 8).unwrap());
        assert_eq!(snap.now, Utc.with_ymd_and_hms(2024, 9, 8, 4, 0, 0).unwrap());
    }

    #[test]
    fn test_partial_days_round_down() {
        let due = day(2024, 6, 8) + Duration::hours(15);
        let tasks = [task("x", TaskStatus::InProgress, Some(due))];
        let report = classify(&snapshot(), &tasks);
        assert_eq!(report.overdue[0].days_overdue, 1);
    }
}
