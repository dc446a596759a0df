//! Shared database schema, migrations, and query builders.
//!
//! Every builder returns [`Built`]: SQL with `?` placeholders plus the
//! values to bind, ready for the server's rusqlite adapter.

pub mod announcements;
pub mod attendance;
pub mod checklists;
pub mod companies;
pub mod landing;
pub mod lost_items;
pub mod migrations;
pub mod problem_reports;
pub mod stores;
pub mod supply_requests;
pub mod tables;
pub mod users;

// Re-export tables for convenience
pub use tables::*;

pub type Built = (String, sea_query::Values);

/// SQL expression for the current UTC time in the stored timestamp layout.
pub(crate) fn now() -> sea_query::SimpleExpr {
    sea_query::Expr::cust("datetime('now')")
}
