//! Cleaning-operations backend: role-gated REST API over SQLite.

pub mod error;
pub mod extract;
pub mod routes;
pub mod storage;

use axum::{
    Router,
    extract::FromRef,
    routing::{get, patch, post, put},
};
use std::path::Path;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use cleanops_api::crypto::DataKey;
use storage::Db;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: AppConfig,
}

/// Server configuration loaded from environment variables.
#[derive(Clone)]
pub struct AppConfig {
    pub base_url: String,
    pub jwt_secret: String,
    /// Seals resident registration numbers at rest.
    pub data_key: DataKey,
}

impl FromRef<AppState> for Db {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

/// Every `/api` route.
fn api_routes() -> Router<AppState> {
    use routes::*;

    Router::new()
        // Health
        .route("/health", get(health::health))
        // Auth
        .route("/auth/signup", post(auth::signup))
        .route("/auth/validate-code", get(auth::validate_code))
        .route("/auth/join", post(auth::join))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/password", put(auth::change_password))
        .route("/auth/me", get(auth::me))
        // Navigation
        .route("/home", get(home::home))
        .route("/sections/{section}", get(home::section))
        .route("/features", get(home::features))
        // Staff
        .route("/attendance/clock-in", post(attendance::clock_in))
        .route("/attendance/clock-out", post(attendance::clock_out))
        .route("/staff/attendance", get(attendance::list_recent))
        .route("/staff/assigned-stores", get(stores::assigned_stores))
        .route("/staff/checklists", get(checklists::staff_checklists))
        .route("/staff/checklists/{id}", patch(checklists::update_checklist))
        .route("/staff/checklist-progress", get(checklists::progress_summary))
        .route(
            "/staff/supply-requests",
            get(supply_requests::list_mine).post(supply_requests::create),
        )
        .route(
            "/staff/lost-items",
            get(lost_items::list_mine).post(lost_items::create),
        )
        .route(
            "/staff/problem-reports",
            get(problem_reports::list_mine).post(problem_reports::create),
        )
        .route("/staff/announcements", get(announcements::list_for_staff))
        .route("/staff/announcements/read", post(announcements::mark_read))
        // Business owner
        .route(
            "/business/company",
            get(companies::get_own).put(companies::update_own),
        )
        .route(
            "/business/stores",
            get(stores::list_company_stores).post(stores::create_store),
        )
        .route(
            "/business/stores/{id}",
            get(stores::get_store)
                .put(stores::update_store)
                .delete(stores::delete_store),
        )
        .route("/business/stores/{id}/users", put(stores::assign_users))
        .route(
            "/business/stores/{id}/problem-reports",
            get(problem_reports::list_for_store),
        )
        .route(
            "/business/problem-reports/{id}/confirm",
            patch(problem_reports::confirm),
        )
        .route(
            "/business/problem-reports/{id}/complete",
            patch(problem_reports::complete),
        )
        .route(
            "/business/checklists",
            get(checklists::list_templates).post(checklists::create_template),
        )
        .route(
            "/business/checklists/{id}",
            axum::routing::delete(checklists::delete_template),
        )
        .route(
            "/business/supply-requests",
            get(supply_requests::list_for_company),
        )
        .route(
            "/business/supply-requests/received",
            get(supply_requests::list_received),
        )
        .route(
            "/business/supply-requests/archive",
            post(supply_requests::archive),
        )
        .route(
            "/business/supply-requests/{id}/confirm",
            post(supply_requests::confirm),
        )
        .route(
            "/business/supply-requests/{id}/forward",
            post(supply_requests::forward),
        )
        .route(
            "/business/supply-requests/{id}/complete",
            post(supply_requests::owner_complete),
        )
        .route("/business/lost-items", get(lost_items::list_for_company))
        .route(
            "/business/lost-items/{id}/confirm",
            patch(lost_items::confirm),
        )
        .route(
            "/business/announcements",
            get(announcements::list_for_company).post(announcements::create),
        )
        .route(
            "/business/announcements/{id}",
            axum::routing::delete(announcements::delete),
        )
        .route(
            "/business/users",
            get(users::list_company_users).post(users::create_company_user),
        )
        .route("/business/users/pending", get(users::list_pending))
        .route("/business/users/{id}", patch(users::update_company_user))
        .route("/business/users/{id}/stores", put(users::set_user_stores))
        .route("/business/users/{id}/approve", patch(users::approve))
        .route("/business/users/{id}/reject", patch(users::reject))
        .route("/business/users/{id}/role", patch(users::change_role))
        .route(
            "/business/users/{id}/sensitive",
            get(users::get_sensitive).put(users::put_sensitive),
        )
        // Manager
        .route("/manager/reviews", get(checklists::list_reviews))
        .route("/manager/reviews/{id}", patch(checklists::review_checklist))
        .route(
            "/manager/announcements",
            get(announcements::list_for_manager).post(announcements::manager_mark_read),
        )
        // Store manager
        .route(
            "/store-manager/supply-requests",
            get(supply_requests::list_for_manager),
        )
        .route(
            "/store-manager/supply-requests/{id}/complete",
            post(supply_requests::manager_complete),
        )
        // Platform admin
        .route(
            "/platform/companies",
            get(companies::list).post(companies::create),
        )
        .route(
            "/platform/companies/{id}",
            get(companies::get)
                .put(companies::update)
                .delete(companies::delete),
        )
        .route("/platform/stores", get(stores::list_all_stores))
        .route("/platform/users", get(users::list_all))
        .route("/platform/users/pending-owner", get(users::list_pending_owners))
        .route(
            "/platform/users/{id}/approve-owner",
            patch(users::approve_owner),
        )
        // Landing content
        .route("/case-studies", get(landing::public_case_studies))
        .route("/pages/{slug}", get(landing::public_page))
        .route(
            "/admin/case-studies",
            get(landing::list_case_studies).post(landing::create_case_study),
        )
        .route(
            "/admin/case-studies/{id}",
            put(landing::update_case_study).delete(landing::delete_case_study),
        )
        .route(
            "/admin/pages",
            get(landing::list_pages).post(landing::create_page),
        )
        .route(
            "/admin/pages/{id}",
            put(landing::update_page).delete(landing::delete_page),
        )
}

/// The full application router, optionally serving a static web build.
pub fn app(state: AppState, web_dir: Option<&Path>) -> Router {
    let mut app = Router::new()
        .nest("/api", api_routes())
        .route("/manifest.json", get(routes::landing::manifest));

    if let Some(web_dir) = web_dir.filter(|d| d.exists()) {
        tracing::info!("serving static files from {}", web_dir.display());
        let index_html = web_dir.join("index.html");
        app = app.fallback_service(ServeDir::new(web_dir).fallback(ServeFile::new(index_html)));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
