//! Database schema, migrations, and sea-query builders.
//!
//! Every builder returns a [`Built`] pair of SQL text and bound values; the
//! server binds the values when executing.

pub mod attendance;
pub mod bugs;
pub mod client_invitations;
pub mod migrations;
pub mod notifications;
pub mod projects;
pub mod tables;
pub mod tasks;
pub mod users;
pub mod weekly_reports;
pub mod workspaces;

pub use tables::*;

/// SQL text plus its positional values.
pub type Built = (String, sea_query::Values);

/// `CURRENT_TIMESTAMP` in SQLite is UTC `YYYY-MM-DD HH:MM:SS`, matching the
/// column format.
pub(crate) fn now_expr() -> sea_query::SimpleExpr {
    sea_query::Expr::current_timestamp().into()
}
