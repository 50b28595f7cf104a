//! Workspace roles and the permission rules route handlers apply.

labeled_enum! {
    /// Role of a member within a workspace.
    pub enum WorkspaceRole ("role") {
        Admin => "ADMIN",
        Member => "MEMBER",
        Client => "CLIENT",
    }
}

impl WorkspaceRole {
    pub fn is_admin(self) -> bool {
        self == Self::Admin
    }

    /// Staff roles see every project in the workspace and may create and edit tasks.
    /// Clients only see projects they were invited to.
    pub fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Member)
    }
}

/// Whether changing a member from `current` to `next` would leave the workspace
/// without an admin, given the current number of admins.
pub fn demotes_last_admin(admin_count: i64, current: WorkspaceRole, next: WorkspaceRole) -> bool {
    current.is_admin() && !next.is_admin() && admin_count <= 1
}

/// Whether removing a member with role `role` would leave the workspace
/// without an admin or without any member at all.
pub fn removal_blocked(member_count: i64, admin_count: i64, role: WorkspaceRole) -> Option<&'static str> {
    if member_count <= 1 {
        return Some("cannot remove the only member of a workspace");
    }
    if role.is_admin() && admin_count <= 1 {
        return Some("cannot remove the last admin of a workspace");
    }
    None
}

pub fn can_delete_task(role: WorkspaceRole, is_creator: bool) -> bool {
    role.is_admin() || (role.is_staff() && is_creator)
}

pub fn can_view_bug(role: WorkspaceRole, is_reporter: bool, is_assignee: bool) -> bool {
    role.is_admin() || is_reporter || is_assignee
}

pub fn can_update_bug(role: WorkspaceRole, is_reporter: bool, is_assignee: bool) -> bool {
    can_view_bug(role, is_reporter, is_assignee)
}

pub fn can_delete_bug(role: WorkspaceRole, is_reporter: bool) -> bool {
    role.is_admin() || is_reporter
}

/// Admins see every member's records; everyone else only their own.
pub fn sees_all_records(role: WorkspaceRole) -> bool {
    role.is_admin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_and_display() {
        assert_eq!("admin".parse::<WorkspaceRole>().unwrap(), WorkspaceRole::Admin);
        assert_eq!(WorkspaceRole::Client.to_string(), "CLIENT");
        assert!("owner".parse::<WorkspaceRole>().is_err());
    }

    #[test]
    fn test_role_serde_uses_labels() {
        let json = serde_json::to_string(&WorkspaceRole::Member).unwrap();
        assert_eq!(json, "\"MEMBER\"");
        let back: WorkspaceRole = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(back, WorkspaceRole::Admin);
    }

    #[test]
    fn test_last_admin_cannot_be_demoted() {
        use WorkspaceRole::*;
        assert!(demotes_last_admin(1, Admin, Member));
        assert!(!demotes_last_admin(2, Admin, Member));
        assert!(!demotes_last_admin(1, Admin, Admin));
        assert!(!demotes_last_admin(1, Member, Admin));
    }

    #[test]
    fn test_removal_blocked() {
        use WorkspaceRole::*;
        assert!(removal_blocked(1, 1, Admin).is_some());
        assert!(removal_blocked(3, 1, Admin).is_some());
        assert!(removal_blocked(3, 1, Member).is_none());
        assert!(removal_blocked(3, 2, Admin).is_none());
    }

    #[test]
    fn test_task_and_bug_permissions() {
        use WorkspaceRole::*;
        assert!(can_delete_task(Admin, false));
        assert!(can_delete_task(Member, true));
        assert!(!can_delete_task(Member, false));
        assert!(!can_delete_task(Client, true));

        assert!(can_update_bug(Client, true, false));
        assert!(can_update_bug(Member, false, true));
        assert!(!can_update_bug(Member, false, false));
        assert!(can_delete_bug(Admin, false));
        assert!(!can_delete_bug(Member, false));
    }
}
