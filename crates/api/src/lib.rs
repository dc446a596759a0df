//! Shared API types, business rules, crypto, and SQL builders for cleanops.
//!
//! This crate is the **single source of truth** for every request/response
//! body the server speaks. Pure rules that need no database (`roles`, `plan`,
//! `format`) are always compiled; everything touching crypto or SQL sits
//! behind the `backend` feature.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[cfg(feature = "backend")]
pub mod crypto;
#[cfg(feature = "backend")]
pub mod db;
pub mod format;
pub mod plan;
pub mod roles;
#[cfg(feature = "backend")]
pub mod service;

// ─── Shared Enums ────────────────────────────────────────────────────────────

/// A stored string did not match any variant of a domain enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl std::fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {} value: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Declares a string-backed enum whose serde names, `as_str`, `Display` and
/// `FromStr` all agree on the same literal.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $lit:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $lit)] $variant ),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $lit),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($lit => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

string_enum! {
    /// Role of an account. Stored in `users.role`.
    #[derive(Default)]
    pub enum UserRole {
        #[default]
        Staff => "staff",
        Manager => "manager",
        BusinessOwner => "business_owner",
        FranchiseManager => "franchise_manager",
        StoreManager => "store_manager",
        PlatformAdmin => "platform_admin",
        Admin => "admin",
        SubcontractIndividual => "subcontract_individual",
        SubcontractCompany => "subcontract_company",
    }
}

impl UserRole {
    /// Staff and both subcontract roles: the people who clock in at stores.
    pub fn is_field_worker(&self) -> bool {
        matches!(
            self,
            Self::Staff | Self::SubcontractIndividual | Self::SubcontractCompany
        )
    }

    /// Roles an owner may hand out when approving a join request.
    pub fn is_assignable_on_approval(&self) -> bool {
        matches!(
            self,
            Self::Staff
                | Self::Manager
                | Self::StoreManager
                | Self::SubcontractIndividual
                | Self::SubcontractCompany
        )
    }

    /// Roles that manage a company's staff and announcements.
    pub fn is_company_admin(&self) -> bool {
        matches!(
            self,
            Self::BusinessOwner | Self::FranchiseManager | Self::PlatformAdmin
        )
    }
}

string_enum! {
    /// Approval state of a signed-up account.
    #[derive(Default)]
    pub enum ApprovalStatus {
        #[default]
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

string_enum! {
    /// How an account was created.
    pub enum SignupType {
        OwnerSelfSignup => "owner_self_signup",
        CompanyCode => "company_code",
        AdminCreated => "admin_created",
    }
}

string_enum! {
    /// Kind of attendance record.
    #[derive(Default)]
    pub enum AttendanceType {
        #[default]
        Regular => "regular",
        Rescheduled => "rescheduled",
        Emergency => "emergency",
    }
}

string_enum! {
    /// Lifecycle of a supply request.
    #[derive(Default)]
    pub enum SupplyRequestStatus {
        #[default]
        Received => "received",
        InProgress => "in_progress",
        ManagerInProgress => "manager_in_progress",
        Completed => "completed",
    }
}

string_enum! {
    #[derive(Default)]
    pub enum LostItemStatus {
        #[default]
        Submitted => "submitted",
        Completed => "completed",
    }
}

string_enum! {
    #[derive(Default)]
    pub enum ProblemReportStatus {
        #[default]
        Submitted => "submitted",
        Completed => "completed",
    }
}

string_enum! {
    /// What a field worker is reporting a problem with.
    #[derive(Default)]
    pub enum ProblemCategory {
        StoreProblem => "store_problem",
        VendingMachine => "vending_machine",
        #[default]
        Other => "other",
    }
}

string_enum! {
    /// Who an announcement is addressed to.
    #[derive(Default)]
    pub enum AnnouncementAudience {
        #[default]
        Staff => "staff",
        Owner => "owner",
    }
}

string_enum! {
    /// Review state of a checklist instance.
    #[derive(Default)]
    pub enum ReviewStatus {
        #[default]
        Pending => "pending",
        Approved => "approved",
        ReshootRequested => "reshoot_requested",
    }
}

string_enum! {
    /// Kind of checklist item; determines how it counts towards progress.
    #[derive(Default)]
    pub enum ChecklistItemType {
        #[default]
        Check => "check",
        BeforePhoto => "before_photo",
        AfterPhoto => "after_photo",
        BeforeAfterPhoto => "before_after_photo",
    }
}

string_enum! {
    #[derive(Default)]
    pub enum SubscriptionPlan {
        #[default]
        Free => "free",
        Basic => "basic",
        Premium => "premium",
    }
}

string_enum! {
    #[derive(Default)]
    pub enum SubscriptionStatus {
        #[default]
        Active => "active",
        Suspended => "suspended",
        Cancelled => "cancelled",
    }
}

string_enum! {
    /// Role-gated area of the web app.
    pub enum Section {
        Staff => "staff",
        Business => "business",
        Franchise => "franchise",
        Manager => "manager",
        StoreManager => "store-manager",
        Platform => "platform",
    }
}

string_enum! {
    /// Business feature keys gated by subscription plan.
    pub enum Feature {
        Dashboard => "dashboard",
        AttendanceReport => "attendance_report",
        Stores => "stores",
        StoresStatus => "stores_status",
        Franchises => "franchises",
        Payrolls => "payrolls",
        Receivables => "receivables",
        Financial => "financial",
        Users => "users",
        Products => "products",
        Checklists => "checklists",
        Announcements => "announcements",
        Reports => "reports",
        SupplyRequests => "supply_requests",
        Company => "company",
    }
}

// ─── Envelopes ───────────────────────────────────────────────────────────────

/// `{"success": true, "data": ...}` wrapper used by list/get/create endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// `{"success": true}` returned by state transitions.
#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub success: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ─── Auth ────────────────────────────────────────────────────────────────────

/// Business-owner self signup: creates the company and its owner.
#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub company_name: String,
    pub company_address: Option<String>,
    pub business_registration_number: Option<String>,
}

/// Staff signup with a company signup code.
#[derive(Debug, Default, Deserialize)]
pub struct JoinRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub signup_code: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Issued by login, refresh, signup and join.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub user_id: String,
    pub name: String,
    pub role: UserRole,
    pub home_path: String,
}

#[derive(Debug, Deserialize)]
pub struct ValidateCodeQuery {
    pub code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateCodeResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Landing path after login.
#[derive(Debug, Serialize, Deserialize)]
pub struct HomeResponse {
    pub role: UserRole,
    pub home_path: String,
}

/// Answer of the role-gated layout check.
/// Plan gate of the caller's company, for hiding unavailable screens.
#[derive(Debug, Serialize, Deserialize)]
pub struct FeaturesResponse {
    pub company_id: String,
    pub subscription_plan: SubscriptionPlan,
    pub subscription_status: SubscriptionStatus,
    pub trial_ends_at: Option<String>,
    pub trial_expired: bool,
    pub features: Vec<Feature>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SectionAccessResponse {
    pub allowed: bool,
    pub redirect_to: Option<String>,
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub company_id: Option<String>,
    pub approval_status: ApprovalStatus,
    pub approved_at: Option<String>,
    pub rejection_reason: Option<String>,
    pub employment_active: bool,
    pub signup_type: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproveUserRequest {
    pub role: Option<UserRole>,
    pub store_ids: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectUserRequest {
    pub rejection_reason: Option<String>,
}

/// Account created directly by a company admin, approved from the start.
#[derive(Debug, Default, Deserialize)]
pub struct CreateCompanyUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    pub phone: Option<String>,
    pub role: Option<UserRole>,
    pub store_ids: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCompanyUserRequest {
    #[serde(default)]
    pub name: String,
    pub phone: Option<String>,
    pub role: Option<UserRole>,
    pub employment_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserStoresRequest {
    #[serde(default)]
    pub store_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct SensitiveInfoRequest {
    pub resident_number: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SensitiveInfoResponse {
    pub user_id: String,
    pub resident_number_masked: Option<String>,
    pub updated_at: Option<String>,
}

// ─── Companies ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyResponse {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub business_registration_number: Option<String>,
    pub subscription_plan: SubscriptionPlan,
    pub subscription_status: SubscriptionStatus,
    pub trial_ends_at: Option<String>,
    pub basic_units: i64,
    pub premium_units: i64,
    pub signup_code: Option<String>,
    pub signup_code_active: bool,
    pub requires_approval: bool,
    pub default_role: UserRole,
    pub created_at: String,
    pub updated_at: String,
}

/// Platform-admin create/update of a company.
#[derive(Debug, Default, Deserialize)]
pub struct CompanyRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub business_registration_number: Option<String>,
    pub subscription_plan: Option<String>,
    pub subscription_status: Option<String>,
    pub trial_ends_at: Option<String>,
    pub basic_units: Option<i64>,
    pub premium_units: Option<i64>,
}

/// Owner-side edit of their own company.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateOwnCompanyRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub business_registration_number: Option<String>,
    pub signup_code: Option<String>,
    pub signup_code_active: Option<bool>,
    pub requires_approval: Option<bool>,
    pub default_role: Option<UserRole>,
}

// ─── Stores ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreResponse {
    pub id: String,
    pub company_id: String,
    pub name: String,
    pub address: Option<String>,
    pub management_days: Option<String>,
    pub service_active: bool,
    pub is_night_shift: bool,
    pub work_start_hour: i64,
    pub work_end_hour: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A store assigned to the caller, optionally flagged with open attendance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignedStoreResponse {
    #[serde(flatten)]
    pub store: StoreResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_clocked_in: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssignedStoresQuery {
    pub include_attendance: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StoreRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub management_days: Option<String>,
    pub service_active: Option<bool>,
    pub is_night_shift: Option<bool>,
    pub work_start_hour: Option<i64>,
    pub work_end_hour: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AssignStoreUsersRequest {
    pub user_ids: Vec<String>,
}

// ─── Attendance ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GpsLocation {
    pub lat: f64,
    pub lng: f64,
    pub accuracy: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ClockInRequest {
    #[serde(default)]
    pub store_id: String,
    pub location: GpsLocation,
    pub selfie_url: Option<String>,
    #[serde(default)]
    pub attendance_type: AttendanceType,
    pub scheduled_date: Option<String>,
    pub problem_report_id: Option<String>,
    pub change_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClockOutRequest {
    #[serde(default)]
    pub store_id: String,
    pub location: GpsLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceResponse {
    pub id: String,
    pub user_id: String,
    pub store_id: String,
    pub store_name: Option<String>,
    pub work_date: String,
    pub clock_in_at: String,
    pub clock_in_latitude: Option<f64>,
    pub clock_in_longitude: Option<f64>,
    pub clock_out_at: Option<String>,
    pub clock_out_latitude: Option<f64>,
    pub clock_out_longitude: Option<f64>,
    pub selfie_url: Option<String>,
    pub attendance_type: AttendanceType,
    pub scheduled_date: Option<String>,
    pub problem_report_id: Option<String>,
    pub change_reason: Option<String>,
}

// ─── Checklists ──────────────────────────────────────────────────────────────

/// One line of a checklist, stored inside `checklist.items` as JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChecklistItem {
    #[serde(default)]
    pub area: String,
    #[serde(rename = "type", default)]
    pub item_type: ChecklistItemType,
    #[serde(default)]
    pub checked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_photo_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChecklistProgress {
    pub total_items: u32,
    pub completed_items: u32,
    pub percentage: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistResponse {
    pub id: String,
    pub store_id: String,
    pub store_name: Option<String>,
    pub created_by: String,
    pub assigned_user_id: Option<String>,
    pub template_id: Option<String>,
    pub work_date: Option<String>,
    pub items: Vec<ChecklistItem>,
    pub note: Option<String>,
    pub requires_photos: bool,
    pub review_status: ReviewStatus,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<String>,
    pub review_comment: Option<String>,
    pub progress: ChecklistProgress,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateChecklistTemplateRequest {
    #[serde(default)]
    pub store_id: String,
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
    pub note: Option<String>,
    #[serde(default)]
    pub requires_photos: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateChecklistRequest {
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
    pub note: Option<String>,
}

/// Checklists visible to a clocked-in worker, split by completion.
#[derive(Debug, Serialize, Deserialize)]
pub struct StaffChecklistsResponse {
    pub checklists: Vec<ChecklistResponse>,
    pub completed_checklists: Vec<ChecklistResponse>,
}

/// A manager's verdict on a submitted checklist.
#[derive(Debug, Deserialize)]
pub struct ReviewChecklistRequest {
    pub status: ReviewStatus,
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewListQuery {
    pub status: Option<ReviewStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChecklistSummaryResponse {
    pub work_date: String,
    pub checklist_count: u32,
    pub completed_count: u32,
    pub progress: ChecklistProgress,
}

// ─── Supply requests ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplyRequestResponse {
    pub id: String,
    pub store_id: String,
    pub store_name: Option<String>,
    pub user_id: String,
    pub user_name: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub photo_url: Option<String>,
    pub status: SupplyRequestStatus,
    pub manager_comment: Option<String>,
    pub completion_photo_url: Option<String>,
    pub completion_description: Option<String>,
    pub completed_at: Option<String>,
    pub is_archived: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateSupplyRequest {
    #[serde(default)]
    pub store_id: String,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub category: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteSupplyRequest {
    pub completion_photo_url: Option<String>,
    pub completion_description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForwardSupplyRequest {
    pub manager_comment: Option<String>,
}

/// Filters for the owner's supply-request list.
#[derive(Debug, Default, Deserialize)]
pub struct SupplyRequestListQuery {
    pub include_archived: Option<bool>,
    pub archived_only: Option<bool>,
    pub all_period: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArchiveResponse {
    pub success: bool,
    pub archived_count: usize,
}

// ─── Lost items ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LostItemResponse {
    pub id: String,
    pub store_id: String,
    pub store_name: Option<String>,
    pub user_id: String,
    pub user_name: Option<String>,
    pub item_type: String,
    pub description: Option<String>,
    pub photo_url: Option<String>,
    pub storage_location: String,
    pub status: LostItemStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateLostItemRequest {
    #[serde(default)]
    pub store_id: String,
    pub item_type: Option<String>,
    pub description: Option<String>,
    pub photo_url: Option<String>,
    pub photo_urls: Option<Vec<String>>,
    pub storage_location: Option<String>,
}

// ─── Problem reports ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemReportResponse {
    pub id: String,
    pub store_id: String,
    pub store_name: Option<String>,
    pub user_id: String,
    pub user_name: Option<String>,
    pub category: ProblemCategory,
    pub title: String,
    pub description: Option<String>,
    pub photo_url: Option<String>,
    pub vending_machine_number: Option<i64>,
    pub product_number: Option<String>,
    pub status: ProblemReportStatus,
    pub completion_description: Option<String>,
    pub completion_photo_urls: Vec<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateProblemReportRequest {
    #[serde(default)]
    pub store_id: String,
    #[serde(default)]
    pub category: ProblemCategory,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub photo_url: Option<String>,
    pub photo_urls: Option<Vec<String>>,
    pub vending_machine_number: Option<i64>,
    pub product_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteProblemReportRequest {
    pub description: Option<String>,
    pub photo_urls: Option<Vec<String>>,
}

/// A store's reports split the way the store detail screen shows them.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreProblemReportsResponse {
    pub store_problems: Vec<ProblemReportResponse>,
    pub vending_problems: Vec<ProblemReportResponse>,
}

// ─── Announcements ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementResponse {
    pub id: String,
    pub company_id: String,
    pub title: String,
    pub content: String,
    pub audience: AnnouncementAudience,
    pub created_by: String,
    pub created_by_name: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_users: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateAnnouncementRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub audience: AnnouncementAudience,
}

#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    #[serde(default)]
    pub announcement_id: String,
}

// ─── Landing content ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseStudyResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub blog_url: String,
    pub thumbnail_url: Option<String>,
    pub display_order: i64,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CaseStudyRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub blog_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub display_order: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPageResponse {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub content: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub is_published: bool,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomPageRequest {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub is_published: Option<bool>,
    pub is_active: Option<bool>,
}

// ─── Service Error ───────────────────────────────────────────────────────────

/// Per-field validation messages, serialized as `{"fieldErrors": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
    #[serde(rename = "fieldErrors")]
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.field_errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.field_errors.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.field_errors.contains_key(field)
    }

    /// `Ok(())` when nothing was recorded, else `ServiceError::Invalid`.
    pub fn into_result(self) -> Result<(), ServiceError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Invalid(self))
        }
    }
}

/// Framework-agnostic service error.
///
/// The server maps each variant to an HTTP status via [`ServiceError::status_code`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    BadRequest(String),
    Invalid(FieldErrors),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    AlreadyClockedIn(String),
    AlreadyClockedOut(String),
    Internal(String),
}

impl ServiceError {
    /// HTTP status code as a `u16`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) | Self::Invalid(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) | Self::AlreadyClockedIn(_) | Self::AlreadyClockedOut(_) => 409,
            Self::Internal(_) => 500,
        }
    }

    /// Machine-readable code for errors the client branches on.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::AlreadyClockedIn(_) => Some("AlreadyClockedIn"),
            Self::AlreadyClockedOut(_) => Some("AlreadyClockedOut"),
            _ => None,
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        match self {
            Self::Invalid(_) => "validation failed",
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::AlreadyClockedIn(m)
            | Self::AlreadyClockedOut(m)
            | Self::Internal(m) => m,
        }
    }

    /// Validation details, when this is a field-level failure.
    pub fn details(&self) -> Option<&FieldErrors> {
        match self {
            Self::Invalid(details) => Some(details),
            _ => None,
        }
    }

    /// Build a closure that wraps a DB/IO error into `Internal`.
    pub fn from_db<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> Self + '_ {
        move |e| Self::Internal(format!("{context}: {e}"))
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ServiceError {}

// ─── Error (JSON shape) ──────────────────────────────────────────────────────

/// JSON error body returned by every failing endpoint.
///
/// `error` carries the machine code when one exists, otherwise the message.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<FieldErrors>,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

impl From<&ServiceError> for ApiError {
    fn from(e: &ServiceError) -> Self {
        match e.code() {
            Some(code) => Self {
                error: code.to_string(),
                message: Some(e.message().to_string()),
                details: None,
                status_code: e.status_code(),
            },
            None => Self {
                error: e.message().to_string(),
                message: None,
                details: e.details().cloned(),
                status_code: e.status_code(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_strings_round_trip_through_from_str() {
        for role in UserRole::ALL {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), *role);
        }
        assert!("janitor".parse::<UserRole>().is_err());
    }

    #[test]
    fn section_uses_url_segment() {
        assert_eq!(Section::StoreManager.as_str(), "store-manager");
        assert_eq!(
            serde_json::to_string(&Section::StoreManager).unwrap(),
            "\"store-manager\""
        );
    }

    #[test]
    fn field_workers() {
        assert!(UserRole::Staff.is_field_worker());
        assert!(UserRole::SubcontractCompany.is_field_worker());
        assert!(!UserRole::StoreManager.is_field_worker());
        assert!(!UserRole::BusinessOwner.is_field_worker());
    }

    #[test]
    fn coded_error_body_carries_message() {
        let err = ServiceError::AlreadyClockedIn("already clocked in today".into());
        let body = serde_json::to_value(ApiError::from(&err)).unwrap();
        assert_eq!(body["error"], "AlreadyClockedIn");
        assert_eq!(body["message"], "already clocked in today");
        assert_eq!(body["statusCode"], 409);
        assert!(body.get("details").is_none());
    }

    #[test]
    fn validation_error_body_carries_details() {
        let mut errs = FieldErrors::default();
        errs.push("store_id", "invalid uuid");
        let err = errs.into_result().unwrap_err();
        let body = serde_json::to_value(ApiError::from(&err)).unwrap();
        assert_eq!(body["error"], "validation failed");
        assert_eq!(body["statusCode"], 400);
        assert_eq!(body["details"]["fieldErrors"]["store_id"][0], "invalid uuid");
    }

    #[test]
    fn checklist_item_reads_type_field() {
        let item: ChecklistItem =
            serde_json::from_str(r#"{"area":"floor","type":"before_after_photo"}"#).unwrap();
        assert_eq!(item.item_type, ChecklistItemType::BeforeAfterPhoto);
        assert!(!item.checked);
    }
}
