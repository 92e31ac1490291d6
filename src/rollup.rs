//! Completion rollups by category and by customer.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::classify::Snapshot;
use crate::fields::TaskStatus;
use crate::task::{Customer, Task};

/// Separator between segments of a WBS number, e.g. `3.10`.
pub const DEFAULT_WBS_SEPARATOR: char = '.';

/// Counts of tasks in one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub total: usize,
    pub completed: usize,
}

impl Completion {
    fn add(&mut self, task: &Task) {
        self.total += 1;
        if task.status == TaskStatus::Done {
            self.completed += 1;
        }
    }

    /// Completed share in `0.0..=1.0`; zero for an empty group.
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    /// Completion rate as a whole percentage, rounded half up.
    pub fn percent(&self) -> u32 {
        (self.rate() * 100.0).round() as u32
    }
}

/// How a task's category key is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryRule {
    /// The task's category field.
    Field,
    /// The WBS number's leading segment. Numbers without the separator are
    /// category headings, not tasks, and are skipped.
    WbsPrefix { separator: char },
}

impl CategoryRule {
    pub fn key(&self, task: &Task) -> Option<String> {
        match self {
            CategoryRule::Field => task.category.clone(),
            CategoryRule::WbsPrefix { separator } => {
                let wbs = task.wbs.as_deref()?;
                let (head, _) = wbs.split_once(*separator)?;
                let head = head.trim();
                (!head.is_empty()).then(|| head.to_string())
            }
        }
    }
}

/// Per-category completion counts, ordered by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryRollup {
    pub categories: BTreeMap<String, Completion>,
}

impl CategoryRollup {
    /// Counts for a category; a category with no tasks reads as all zeros.
    pub fn get(&self, key: &str) -> Completion {
        self.categories.get(key).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Completion)> {
        self.categories.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Group tasks by category and count completions. Tasks without a key are
/// left out.
pub fn category_rollup<'a, I>(tasks: I, rule: CategoryRule) -> CategoryRollup
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut rollup = CategoryRollup::default();
    for task in tasks {
        if let Some(key) = rule.key(task) {
            rollup.categories.entry(key).or_default().add(task);
        }
    }
    rollup
}

/// Weekly figures for one active customer.
#[derive(Debug, Clone)]
pub struct CustomerProgress<'a> {
    pub customer: &'a Customer,
    pub completion: Completion,
    pub overdue: usize,
    pub this_week_completed: usize,
    pub next_week_due: Vec<&'a Task>,
}

/// Figures across every fetched task, whoever it belongs to.
#[derive(Debug, Clone, Default)]
pub struct GlobalProgress<'a> {
    pub completion: Completion,
    pub overdue: usize,
    pub this_week_completed: Vec<&'a Task>,
    pub next_week_due: Vec<&'a Task>,
}

#[derive(Debug, Clone, Default)]
pub struct WeeklyRollup<'a> {
    pub active_customers: usize,
    pub global: GlobalProgress<'a>,
    /// Customers with at least one task, lowest completion rate first.
    pub customers: Vec<CustomerProgress<'a>>,
}

/// How a task relates to the reporting week.
struct WeekFacts {
    completed_this_week: bool,
    overdue: bool,
    due_next_week: bool,
}

fn week_facts(snapshot: &Snapshot, task: &Task) -> WeekFacts {
    let now = snapshot.now;
    let week_ago = snapshot.week_ago;
    let week_ahead = snapshot.week_ahead;

    let completed_this_week = task.status == TaskStatus::Done
        && task.updated.is_some_and(|t| t >= week_ago);
    let open = !task.status.is_closed();
    let overdue = open && task.due.is_some_and(|d| d < now);
    let due_next_week = open && task.due.is_some_and(|d| d >= now && d <= week_ahead);

    WeekFacts { completed_this_week, overdue, due_next_week }
}

/// Build the weekly progress rollup.
///
/// Global figures count every task. Per-customer figures only count tasks
/// whose first customer link resolves to one of `customers`. The global
/// next-week list is ordered by due date.
pub fn weekly_rollup<'a>(
    snapshot: &Snapshot,
    tasks: &'a [Task],
    customers: &'a [Customer],
) -> WeeklyRollup<'a> {
    let index: HashMap<&str, usize> = customers
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.as_str(), i))
        .collect();

    let mut per_customer: Vec<CustomerProgress<'a>> = customers
        .iter()
        .map(|customer| CustomerProgress {
            customer,
            completion: Completion::default(),
            overdue: 0,
            this_week_completed: 0,
            next_week_due: Vec::new(),
        })
        .collect();
    let mut global = GlobalProgress::default();

    for task in tasks {
        let facts = week_facts(snapshot, task);

        global.completion.add(task);
        if facts.completed_this_week {
            global.this_week_completed.push(task);
        }
        if facts.overdue {
            global.overdue += 1;
        }
        if facts.due_next_week {
            global.next_week_due.push(task);
        }

        let Some(&slot) = task.customer_id().and_then(|id| index.get(id)) else {
            continue;
        };
        let progress = &mut per_customer[slot];
        progress.completion.add(task);
        if facts.completed_this_week {
            progress.this_week_completed += 1;
        }
        if facts.overdue {
            progress.overdue += 1;
        }
        if facts.due_next_week {
            progress.next_week_due.push(task);
        }
    }

    global.next_week_due.sort_by_key(|t| t.due);

    per_customer.retain(|p| p.completion.total > 0);
    // Stable, so equal rates keep fetch order.
    per_customer.sort_by(|a, b| a.completion.rate().total_cmp(&b.completion.rate()));

    WeeklyRollup {
        active_customers: customers.len(),
        global,
        customers: per_customer,
    }
}
