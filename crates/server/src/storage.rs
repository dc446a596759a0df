use anyhow::{Context, Result};
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{Connection, OptionalExtension, Row, params_from_iter};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use cleanops_api::db::{Built, migrations::MIGRATIONS};
use cleanops_api::service::checklist_progress;
use cleanops_api::{
    AnnouncementResponse, AttendanceResponse, CaseStudyResponse, ChecklistItem,
    ChecklistResponse, CompanyResponse, CustomPageResponse, LostItemResponse,
    ProblemReportResponse, StoreResponse, SupplyRequestResponse, UnknownVariant, UserResponse,
};

/// Shared database state
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }
}

/// Initialize the database: open connection, enable WAL, run migrations
pub fn init_db(data_dir: &Path) -> Result<Db> {
    std::fs::create_dir_all(data_dir)?;
    let db_path = data_dir.join("cleanops.db");
    let conn = Connection::open(&db_path).context("opening SQLite database")?;

    // Enable WAL mode for better concurrent read performance
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    finish_open(conn)
}

/// Private in-memory database, used by tests.
pub fn init_in_memory() -> Result<Db> {
    let conn = Connection::open_in_memory().context("opening in-memory SQLite")?;
    finish_open(conn)
}

fn finish_open(conn: Connection) -> Result<Db> {
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    run_migrations(&conn)?;
    Ok(Db {
        conn: Arc::new(Mutex::new(conn)),
    })
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for &(name, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
            [name],
            |row| row.get(0),
        )?;

        if !already_applied {
            conn.execute_batch(sql)
                .with_context(|| format!("running migration {name}"))?;
            conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])?;
            tracing::info!("Applied migration: {name}");
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// sea-query adapter
// ---------------------------------------------------------------------------

/// Convert `sea_query::Values` into rusqlite bind params.
fn bind_values(values: &sea_query::Values) -> Vec<SqlValue> {
    use sea_query::Value as V;
    values
        .0
        .iter()
        .map(|v| match v {
            V::Bool(Some(b)) => SqlValue::Integer(i64::from(*b)),
            V::TinyInt(Some(i)) => SqlValue::Integer(i64::from(*i)),
            V::SmallInt(Some(i)) => SqlValue::Integer(i64::from(*i)),
            V::Int(Some(i)) => SqlValue::Integer(i64::from(*i)),
            V::BigInt(Some(i)) => SqlValue::Integer(*i),
            V::TinyUnsigned(Some(i)) => SqlValue::Integer(i64::from(*i)),
            V::SmallUnsigned(Some(i)) => SqlValue::Integer(i64::from(*i)),
            V::Unsigned(Some(i)) => SqlValue::Integer(i64::from(*i)),
            V::BigUnsigned(Some(i)) => SqlValue::Integer(*i as i64),
            V::Float(Some(f)) => SqlValue::Real(f64::from(*f)),
            V::Double(Some(f)) => SqlValue::Real(*f),
            V::String(Some(s)) => SqlValue::Text((**s).clone()),
            V::Char(Some(c)) => SqlValue::Text(c.to_string()),
            V::Bytes(Some(b)) => SqlValue::Blob((**b).clone()),
            _ => SqlValue::Null,
        })
        .collect()
}

/// Run a built statement; returns affected rows.
pub fn sq_execute(conn: &Connection, built: Built) -> rusqlite::Result<usize> {
    let (sql, values) = built;
    conn.execute(&sql, params_from_iter(bind_values(&values)))
}

/// Exactly one row.
pub fn sq_query_row<T>(
    conn: &Connection,
    built: Built,
    f: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<T> {
    let (sql, values) = built;
    conn.query_row(&sql, params_from_iter(bind_values(&values)), f)
}

/// Zero or one row.
pub fn sq_query_opt<T>(
    conn: &Connection,
    built: Built,
    f: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Option<T>> {
    sq_query_row(conn, built, f).optional()
}

/// Every row, mapped.
pub fn sq_query_map<T>(
    conn: &Connection,
    built: Built,
    f: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
    let (sql, values) = built;
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(bind_values(&values)), f)?;
    rows.collect()
}

/// Single boolean/count column.
pub fn sq_flag(conn: &Connection, built: Built) -> rusqlite::Result<bool> {
    sq_query_row(conn, built, |row| row.get(0))
}

// ---------------------------------------------------------------------------
// Row mappers (columns are read by name)
// ---------------------------------------------------------------------------

/// Parse a string-backed enum column.
pub fn enum_col<T>(row: &Row<'_>, col: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: String = row.get(col)?;
    raw.parse().map_err(|e: UnknownVariant| {
        let idx = row.as_ref().column_index(col).unwrap_or_default();
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
    })
}

pub fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserResponse> {
    Ok(UserResponse {
        id: row.get("id")?,
        email: row.get("email")?,
        name: row.get("name")?,
        phone: row.get("phone")?,
        role: enum_col(row, "role")?,
        company_id: row.get("company_id")?,
        approval_status: enum_col(row, "approval_status")?,
        approved_at: row.get("approved_at")?,
        rejection_reason: row.get("rejection_reason")?,
        employment_active: row.get("employment_active")?,
        signup_type: row.get("signup_type")?,
        created_at: row.get("created_at")?,
    })
}

pub fn company_from_row(row: &Row<'_>) -> rusqlite::Result<CompanyResponse> {
    Ok(CompanyResponse {
        id: row.get("id")?,
        name: row.get("name")?,
        address: row.get("address")?,
        business_registration_number: row.get("business_registration_number")?,
        subscription_plan: enum_col(row, "subscription_plan")?,
        subscription_status: enum_col(row, "subscription_status")?,
        trial_ends_at: row.get("trial_ends_at")?,
        basic_units: row.get("basic_units")?,
        premium_units: row.get("premium_units")?,
        signup_code: row.get("signup_code")?,
        signup_code_active: row.get("signup_code_active")?,
        requires_approval: row.get("requires_approval")?,
        default_role: enum_col(row, "default_role")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn store_from_row(row: &Row<'_>) -> rusqlite::Result<StoreResponse> {
    Ok(StoreResponse {
        id: row.get("id")?,
        company_id: row.get("company_id")?,
        name: row.get("name")?,
        address: row.get("address")?,
        management_days: row.get("management_days")?,
        service_active: row.get("service_active")?,
        is_night_shift: row.get("is_night_shift")?,
        work_start_hour: row.get("work_start_hour")?,
        work_end_hour: row.get("work_end_hour")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn attendance_from_row(row: &Row<'_>) -> rusqlite::Result<AttendanceResponse> {
    Ok(AttendanceResponse {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        store_id: row.get("store_id")?,
        store_name: row.get("store_name")?,
        work_date: row.get("work_date")?,
        clock_in_at: row.get("clock_in_at")?,
        clock_in_latitude: row.get("clock_in_latitude")?,
        clock_in_longitude: row.get("clock_in_longitude")?,
        clock_out_at: row.get("clock_out_at")?,
        clock_out_latitude: row.get("clock_out_latitude")?,
        clock_out_longitude: row.get("clock_out_longitude")?,
        selfie_url: row.get("selfie_url")?,
        attendance_type: enum_col(row, "attendance_type")?,
        scheduled_date: row.get("scheduled_date")?,
        problem_report_id: row.get("problem_report_id")?,
        change_reason: row.get("change_reason")?,
    })
}

/// A checklist row together with the company that owns its store.
pub struct ChecklistRow {
    pub company_id: String,
    pub checklist: ChecklistResponse,
}

pub fn checklist_from_row(row: &Row<'_>) -> rusqlite::Result<ChecklistRow> {
    let raw_items: String = row.get("items")?;
    let items: Vec<ChecklistItem> = serde_json::from_str(&raw_items).map_err(|e| {
        let idx = row.as_ref().column_index("items").unwrap_or_default();
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
    })?;
    let progress = checklist_progress(&items);
    Ok(ChecklistRow {
        company_id: row.get("company_id")?,
        checklist: ChecklistResponse {
            id: row.get("id")?,
            store_id: row.get("store_id")?,
            store_name: row.get("store_name")?,
            created_by: row.get("created_by")?,
            assigned_user_id: row.get("assigned_user_id")?,
            template_id: row.get("template_id")?,
            work_date: row.get("work_date")?,
            items,
            note: row.get("note")?,
            requires_photos: row.get("requires_photos")?,
            review_status: enum_col(row, "review_status")?,
            reviewed_by: row.get("reviewed_by")?,
            reviewed_at: row.get("reviewed_at")?,
            review_comment: row.get("review_comment")?,
            progress,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        },
    })
}

/// A supply request row together with the company that owns its store.
pub struct SupplyRow {
    pub company_id: String,
    pub request: SupplyRequestResponse,
}

pub fn supply_from_row(row: &Row<'_>) -> rusqlite::Result<SupplyRow> {
    Ok(SupplyRow {
        company_id: row.get("company_id")?,
        request: SupplyRequestResponse {
            id: row.get("id")?,
            store_id: row.get("store_id")?,
            store_name: row.get("store_name")?,
            user_id: row.get("user_id")?,
            user_name: row.get("user_name")?,
            title: row.get("title")?,
            description: row.get("description")?,
            category: row.get("category")?,
            photo_url: row.get("photo_url")?,
            status: enum_col(row, "status")?,
            manager_comment: row.get("manager_comment")?,
            completion_photo_url: row.get("completion_photo_url")?,
            completion_description: row.get("completion_description")?,
            completed_at: row.get("completed_at")?,
            is_archived: row.get("is_archived")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        },
    })
}

/// A lost item row together with the company that owns its store.
pub struct LostItemRow {
    pub company_id: String,
    pub item: LostItemResponse,
}

pub fn lost_item_from_row(row: &Row<'_>) -> rusqlite::Result<LostItemRow> {
    Ok(LostItemRow {
        company_id: row.get("company_id")?,
        item: LostItemResponse {
            id: row.get("id")?,
            store_id: row.get("store_id")?,
            store_name: row.get("store_name")?,
            user_id: row.get("user_id")?,
            user_name: row.get("user_name")?,
            item_type: row.get("item_type")?,
            description: row.get("description")?,
            photo_url: row.get("photo_url")?,
            storage_location: row.get("storage_location")?,
            status: enum_col(row, "status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        },
    })
}

/// A problem report row together with the company that owns its store.
pub struct ProblemReportRow {
    pub company_id: String,
    pub report: ProblemReportResponse,
}

pub fn problem_report_from_row(row: &Row<'_>) -> rusqlite::Result<ProblemReportRow> {
    let raw_photos: String = row.get("completion_photo_urls")?;
    let completion_photo_urls: Vec<String> = serde_json::from_str(&raw_photos).map_err(|e| {
        let idx = row
            .as_ref()
            .column_index("completion_photo_urls")
            .unwrap_or_default();
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
    })?;
    Ok(ProblemReportRow {
        company_id: row.get("company_id")?,
        report: ProblemReportResponse {
            id: row.get("id")?,
            store_id: row.get("store_id")?,
            store_name: row.get("store_name")?,
            user_id: row.get("user_id")?,
            user_name: row.get("user_name")?,
            category: enum_col(row, "category")?,
            title: row.get("title")?,
            description: row.get("description")?,
            photo_url: row.get("photo_url")?,
            vending_machine_number: row.get("vending_machine_number")?,
            product_number: row.get("product_number")?,
            status: enum_col(row, "status")?,
            completion_description: row.get("completion_description")?,
            completion_photo_urls,
            completed_at: row.get("completed_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        },
    })
}

pub fn announcement_from_row(row: &Row<'_>) -> rusqlite::Result<AnnouncementResponse> {
    Ok(AnnouncementResponse {
        id: row.get("id")?,
        company_id: row.get("company_id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        audience: enum_col(row, "audience")?,
        created_by: row.get("created_by")?,
        created_by_name: row.get("created_by_name")?,
        created_at: row.get("created_at")?,
        read_count: None,
        total_users: None,
        is_read: None,
        read_at: None,
    })
}

pub fn case_study_from_row(row: &Row<'_>) -> rusqlite::Result<CaseStudyResponse> {
    Ok(CaseStudyResponse {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        blog_url: row.get("blog_url")?,
        thumbnail_url: row.get("thumbnail_url")?,
        display_order: row.get("display_order")?,
        is_active: row.get("is_active")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn page_from_row(row: &Row<'_>) -> rusqlite::Result<CustomPageResponse> {
    Ok(CustomPageResponse {
        id: row.get("id")?,
        slug: row.get("slug")?,
        title: row.get("title")?,
        content: row.get("content")?,
        meta_title: row.get("meta_title")?,
        meta_description: row.get("meta_description")?,
        is_published: row.get("is_published")?,
        is_active: row.get("is_active")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// `true` for a UNIQUE / foreign-key violation.
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cleanops_api::db as dbq;

    #[test]
    fn migrations_apply_once() {
        let db = init_in_memory().unwrap();
        let conn = db.conn();
        run_migrations(&conn).unwrap();
        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied as usize, MIGRATIONS.len());
    }

    #[test]
    fn built_statements_bind_through_adapter() {
        let db = init_in_memory().unwrap();
        let conn = db.conn();
        let extra = dbq::companies::CompanyExtras::default();
        sq_execute(
            &conn,
            dbq::companies::insert_trial("c1", "Acme", &extra, "2099-01-01 00:00:00"),
        )
        .unwrap();

        let company = sq_query_row(&conn, dbq::companies::get_by_id("c1"), company_from_row)
            .unwrap();
        assert_eq!(company.name, "Acme");
        assert_eq!(company.basic_units, 3);
        assert!(!company.signup_code_active);
        assert!(company.requires_approval);

        let missing =
            sq_query_opt(&conn, dbq::companies::get_by_id("nope"), company_from_row).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn unknown_enum_values_fail_conversion() {
        let db = init_in_memory().unwrap();
        let conn = db.conn();
        let err = conn
            .query_row("SELECT 'janitor' AS role", [], |row| {
                enum_col::<cleanops_api::UserRole>(row, "role")
            })
            .unwrap_err();
        assert!(matches!(err, rusqlite::Error::FromSqlConversionFailure(..)));
    }

    #[test]
    fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = init_db(dir.path()).unwrap();
            let extra = dbq::companies::CompanyExtras::default();
            sq_execute(
                &db.conn(),
                dbq::companies::insert_trial("c1", "Acme", &extra, "2099-01-01 00:00:00"),
            )
            .unwrap();
        }

        let db = init_db(dir.path()).unwrap();
        let conn = db.conn();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
        assert!(
            sq_query_opt(&conn, dbq::companies::get_by_id("c1"), company_from_row)
                .unwrap()
                .is_some()
        );
    }
}
