//! Task status, priority and kanban ordering rules.

labeled_enum! {
    /// Kanban column a task sits in.
    pub enum TaskStatus ("task status") {
        Backlog => "BACKLOG",
        Todo => "TODO",
        InProgress => "IN_PROGRESS",
        InReview => "IN_REVIEW",
        Done => "DONE",
    }
}

labeled_enum! {
    /// Priority shared by tasks and bugs.
    pub enum Priority ("priority") {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        Urgent => "URGENT",
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Todo
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

/// Longest task name, in characters.
pub const NAME_MAX: usize = 200;
pub const DESCRIPTION_MAX: usize = 5000;

/// Gap between neighbouring task positions within a column.
pub const POSITION_STEP: i64 = 1000;

/// Position for a task appended to a column whose highest position is `max_in_column`.
pub fn next_position(max_in_column: Option<i64>) -> i64 {
    max_in_column.map_or(POSITION_STEP, |max| max + POSITION_STEP)
}

/// What happens to `completed_at` when a task moves between columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStamp {
    Unchanged,
    Set,
    Clear,
}

pub fn completion_change(previous: TaskStatus, next: TaskStatus) -> CompletionStamp {
    match (previous == TaskStatus::Done, next == TaskStatus::Done) {
        (false, true) => CompletionStamp::Set,
        (true, false) => CompletionStamp::Clear,
        _ => CompletionStamp::Unchanged,
    }
}
