labeled_enum! {
    /// Event that produced a notification.
    pub enum NotificationKind ("notification kind") {
        TaskAssigned => "TASK_ASSIGNED",
        BugAssigned => "BUG_ASSIGNED",
        BugStatusChanged => "BUG_STATUS_CHANGED",
        ClientJoined => "CLIENT_JOINED",
        WeeklyReportSubmitted => "WEEKLY_REPORT_SUBMITTED",
    }
}
