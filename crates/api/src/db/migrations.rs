//! Canonical migration definitions.

/// A named migration: `(name, sql)`.
pub type Migration = (&'static str, &'static str);

/// Applied in order; each name is recorded in `_migrations` once run.
pub const MIGRATIONS: &[Migration] = &[
    (
        "0001_schema",
        include_str!("../../migrations/0001_schema.sql"),
    ),
    (
        "0002_signup_code_unique",
        include_str!("../../migrations/0002_signup_code_unique.sql"),
    ),
    (
        "0003_reviews_problem_reports",
        include_str!("../../migrations/0003_reviews_problem_reports.sql"),
    ),
];
