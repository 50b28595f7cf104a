//! Notification query builders. Every query is scoped to the owning user.

use sea_query::{Alias, Asterisk, Expr, Func, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::Notifications;

pub struct NewNotification<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub workspace_id: Option<&'a str>,
    pub kind: &'a str,
    pub title: &'a str,
    pub message: &'a str,
    /// JSON object text.
    pub metadata: &'a str,
}

pub fn insert(n: &NewNotification<'_>) -> Built {
    Query::insert()
        .into_table(Notifications::Table)
        .columns([
            Notifications::Id,
            Notifications::UserId,
            Notifications::WorkspaceId,
            Notifications::Kind,
            Notifications::Title,
            Notifications::Message,
            Notifications::Metadata,
        ])
        .values_panic([
            n.id.into(),
            n.user_id.into(),
            n.workspace_id.map(|s| s.to_string()).into(),
            n.kind.into(),
            n.title.into(),
            n.message.into(),
            n.metadata.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// id, workspace_id, kind, title, message, metadata, is_read, created_at;
/// newest first.
pub fn list(user_id: &str, unread_only: bool, limit: u64) -> Built {
    let mut q = Query::select().to_owned();
    q.columns([
        Notifications::Id,
        Notifications::WorkspaceId,
        Notifications::Kind,
        Notifications::Title,
        Notifications::Message,
        Notifications::Metadata,
        Notifications::IsRead,
        Notifications::CreatedAt,
    ])
    .from(Notifications::Table)
    .and_where(Expr::col(Notifications::UserId).eq(user_id));
    if unread_only {
        q.and_where(Expr::col(Notifications::IsRead).eq(false));
    }
    q.order_by(Notifications::CreatedAt, Order::Desc)
        .order_by(Alias::new("rowid"), Order::Desc)
        .limit(limit)
        .build(SqliteQueryBuilder)
}

pub fn unread_count(user_id: &str) -> Built {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
        .from(Notifications::Table)
        .and_where(Expr::col(Notifications::UserId).eq(user_id))
        .and_where(Expr::col(Notifications::IsRead).eq(false))
        .build(SqliteQueryBuilder)
}

pub fn mark_read(id: &str, user_id: &str) -> Built {
    Query::update()
        .table(Notifications::Table)
        .value(Notifications::IsRead, true)
        .and_where(Expr::col(Notifications::Id).eq(id))
        .and_where(Expr::col(Notifications::UserId).eq(user_id))
        .build(SqliteQueryBuilder)
}

pub fn mark_all_read(user_id: &str) -> Built {
    Query::update()
        .table(Notifications::Table)
        .value(Notifications::IsRead, true)
        .and_where(Expr::col(Notifications::UserId).eq(user_id))
        .and_where(Expr::col(Notifications::IsRead).eq(false))
        .build(SqliteQueryBuilder)
}

pub fn delete(id: &str, user_id: &str) -> Built {
    Query::delete()
        .from_table(Notifications::Table)
        .and_where(Expr::col(Notifications::Id).eq(id))
        .and_where(Expr::col(Notifications::UserId).eq(user_id))
        .build(SqliteQueryBuilder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_orders_newest_first_with_limit() {
        let (sql, values) = list("u1", true, 50);
        assert!(sql.contains(r#"ORDER BY "created_at" DESC, "rowid" DESC"#), "{sql}");
        assert!(sql.contains("LIMIT"), "{sql}");
        // user, is_read, limit
        assert_eq!(values.0.len(), 3);
    }

    #[test]
    fn test_mutations_are_owner_scoped() {
        for (sql, _) in [mark_read("n1", "u1"), delete("n1", "u1")] {
            assert!(sql.contains(r#""user_id" = ?"#), "{sql}");
        }
    }
}
