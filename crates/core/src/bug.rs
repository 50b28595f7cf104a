labeled_enum! {
    /// Lifecycle of a bug report.
    pub enum BugStatus ("bug status") {
        Open => "OPEN",
        InProgress => "IN_PROGRESS",
        Resolved => "RESOLVED",
        Closed => "CLOSED",
    }
}

labeled_enum! {
    pub enum BugType ("bug type") {
        Functional => "FUNCTIONAL",
        Ui => "UI",
        Performance => "PERFORMANCE",
        Security => "SECURITY",
        Other => "OTHER",
    }
}

impl Default for BugStatus {
    fn default() -> Self {
        Self::Open
    }
}

impl Default for BugType {
    fn default() -> Self {
        Self::Functional
    }
}
