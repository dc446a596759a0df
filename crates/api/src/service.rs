//! Shared business rules as framework-agnostic pure functions.
//!
//! Route handlers stay thin adapters: they load rows, call into here to
//! validate and decide, then persist.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::format::sqlite_timestamp;
use crate::{
    AuthTokenResponse, ChecklistItem, ChecklistItemType, ChecklistProgress, ClockInRequest,
    ClockOutRequest, CompanyRequest, CompleteProblemReportRequest, CompleteSupplyRequest,
    CreateCompanyUserRequest, CreateLostItemRequest, CreateProblemReportRequest,
    CreateSupplyRequest, FieldErrors, GpsLocation, LostItemStatus, ProblemCategory,
    ProblemReportResponse, ProblemReportStatus, ReviewChecklistRequest, ReviewStatus,
    ServiceError, StoreProblemReportsResponse, SubscriptionPlan, SubscriptionStatus,
    SupplyRequestStatus, UpdateCompanyUserRequest, UserRole,
};

// ─── Validation ─────────────────────────────────────────────────────────────

/// Validate and normalize an email address. Returns the lowercased, trimmed email.
pub fn validate_email(email: &str) -> Result<String, ServiceError> {
    let email = email.trim().to_lowercase();
    let valid = email.len() <= 254
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(ServiceError::BadRequest("invalid email address".into()));
    }
    Ok(email)
}

/// Minimum password length accepted at signup and password change.
pub const MIN_PASSWORD_LEN: usize = 6;

pub fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if password.len() > 128 {
        return Err(ServiceError::BadRequest(
            "password must be at most 128 characters".into(),
        ));
    }
    Ok(())
}

/// Trim a required text field and check its length in characters.
pub fn require_text(
    errs: &mut FieldErrors,
    field: &str,
    value: &str,
    max: usize,
) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errs.push(field, "required");
        return None;
    }
    if trimmed.chars().count() > max {
        errs.push(field, format!("must be at most {max} characters"));
        return None;
    }
    Some(trimmed.to_string())
}

/// Blank or whitespace-only optional strings become `None`.
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn is_uuid(value: &str) -> bool {
    uuid::Uuid::parse_str(value).is_ok()
}

pub fn check_uuid(errs: &mut FieldErrors, field: &str, value: &str) {
    if !is_uuid(value) {
        errs.push(field, "must be a valid UUID");
    }
}

/// Absolute http(s) URL.
pub fn is_url(value: &str) -> bool {
    url::Url::parse(value).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

pub fn check_optional_url(errs: &mut FieldErrors, field: &str, value: Option<&str>) {
    if let Some(v) = value {
        if !is_url(v) {
            errs.push(field, "must be a valid URL");
        }
    }
}

pub fn is_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

pub fn check_location(errs: &mut FieldErrors, location: &GpsLocation) {
    if !(-90.0..=90.0).contains(&location.lat) {
        errs.push("location.lat", "must be between -90 and 90");
    }
    if !(-180.0..=180.0).contains(&location.lng) {
        errs.push("location.lng", "must be between -180 and 180");
    }
    if let Some(acc) = location.accuracy {
        if acc.is_nan() || acc <= 0.0 {
            errs.push("location.accuracy", "must be positive");
        }
    }
}

/// Signup codes are matched case-insensitively and stored upper-cased.
pub fn normalize_signup_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Slugs for custom pages: lowercase letters, digits and hyphens.
pub fn is_slug(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

// ─── Attendance ─────────────────────────────────────────────────────────────

pub fn validate_clock_in(req: &ClockInRequest) -> Result<(), ServiceError> {
    let mut errs = FieldErrors::default();
    check_uuid(&mut errs, "store_id", &req.store_id);
    check_location(&mut errs, &req.location);
    check_optional_url(&mut errs, "selfie_url", req.selfie_url.as_deref());
    if let Some(date) = req.scheduled_date.as_deref() {
        if !is_date(date) {
            errs.push("scheduled_date", "must be a YYYY-MM-DD date");
        }
    }
    if let Some(id) = req.problem_report_id.as_deref() {
        check_uuid(&mut errs, "problem_report_id", id);
    }
    errs.into_result()
}

pub fn validate_clock_out(req: &ClockOutRequest) -> Result<(), ServiceError> {
    let mut errs = FieldErrors::default();
    check_uuid(&mut errs, "store_id", &req.store_id);
    check_location(&mut errs, &req.location);
    errs.into_result()
}

/// Clock-in is refused while any shift is still open (today or yesterday),
/// or when this store already has a shift today.
pub fn check_clock_in(has_open_shift: bool, has_store_shift: bool) -> Result<(), ServiceError> {
    if has_open_shift {
        return Err(ServiceError::AlreadyClockedIn(
            "clock out of the store you are currently working at first".into(),
        ));
    }
    if has_store_shift {
        return Err(ServiceError::AlreadyClockedIn(
            "already clocked in at this store".into(),
        ));
    }
    Ok(())
}

/// An attendance row that has not been clocked out yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenShift {
    pub id: String,
    pub work_date: String,
}

/// Choose the shift to close: today's, else yesterday's, else the latest open one.
///
/// `open` must be ordered newest clock-in first.
pub fn pick_clock_out_shift<'a>(
    open: &'a [OpenShift],
    today: &str,
    yesterday: &str,
) -> Option<&'a OpenShift> {
    open.iter()
        .find(|s| s.work_date == today)
        .or_else(|| open.iter().find(|s| s.work_date == yesterday))
        .or_else(|| open.first())
}

// ─── Checklists ─────────────────────────────────────────────────────────────

/// Progress over a checklist's items. Paired photos count as two steps.
pub fn checklist_progress(items: &[ChecklistItem]) -> ChecklistProgress {
    let mut total = 0u32;
    let mut done = 0u32;
    for item in items {
        let has = |url: &Option<String>| url.as_deref().is_some_and(|u| !u.is_empty());
        match item.item_type {
            ChecklistItemType::Check => {
                total += 1;
                done += u32::from(item.checked);
            }
            ChecklistItemType::BeforePhoto => {
                total += 1;
                done += u32::from(has(&item.before_photo_url));
            }
            ChecklistItemType::AfterPhoto => {
                total += 1;
                done += u32::from(has(&item.after_photo_url));
            }
            ChecklistItemType::BeforeAfterPhoto => {
                total += 2;
                done += u32::from(has(&item.before_photo_url));
                done += u32::from(has(&item.after_photo_url));
            }
        }
    }
    ChecklistProgress {
        total_items: total,
        completed_items: done,
        percentage: percentage(done, total),
    }
}

fn percentage(done: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(done) / f64::from(total) * 100.0).round() as u32
}

/// Sum progress across several checklists.
pub fn combined_progress<'a>(
    progresses: impl IntoIterator<Item = &'a ChecklistProgress>,
) -> ChecklistProgress {
    let (total, done) = progresses.into_iter().fold((0, 0), |(t, d), p| {
        (t + p.total_items, d + p.completed_items)
    });
    ChecklistProgress {
        total_items: total,
        completed_items: done,
        percentage: percentage(done, total),
    }
}

/// A checklist counts as complete when it has steps and all are done.
pub fn is_checklist_complete(progress: &ChecklistProgress) -> bool {
    progress.total_items > 0 && progress.completed_items == progress.total_items
}

/// Copy template items for a fresh instance: nothing checked, no photos.
pub fn reset_items(items: &[ChecklistItem]) -> Vec<ChecklistItem> {
    items
        .iter()
        .map(|item| ChecklistItem {
            area: item.area.clone(),
            item_type: item.item_type,
            checked: false,
            comment: None,
            before_photo_url: None,
            after_photo_url: None,
        })
        .collect()
}

/// Workers only fill in a checklist on the day it was issued for.
pub fn check_checklist_workday(work_date: Option<&str>, today: &str) -> Result<(), ServiceError> {
    if work_date == Some(today) {
        return Ok(());
    }
    Err(ServiceError::Forbidden(
        "checklists can only be filled in on their work date".into(),
    ))
}

/// Items must be non-empty and each must name its area.
pub fn validate_checklist_items(items: &[ChecklistItem]) -> Result<(), ServiceError> {
    let mut errs = FieldErrors::default();
    if items.is_empty() {
        errs.push("items", "at least one item is required");
    }
    for (i, item) in items.iter().enumerate() {
        if item.area.trim().is_empty() {
            errs.push(&format!("items.{i}.area"), "required");
        }
    }
    errs.into_result()
}

/// A review verdict. Sending a checklist back needs a comment for the worker.
pub fn validate_review(req: &ReviewChecklistRequest) -> Result<Option<String>, ServiceError> {
    let comment = blank_to_none(req.comment.clone());
    match req.status {
        ReviewStatus::Pending => Err(ServiceError::BadRequest(
            "review status must be 'approved' or 'reshoot_requested'".into(),
        )),
        ReviewStatus::ReshootRequested if comment.is_none() => {
            let mut errs = FieldErrors::default();
            errs.push("comment", "required when requesting a reshoot");
            Err(ServiceError::Invalid(errs))
        }
        _ => Ok(comment),
    }
}

// ─── Supply requests ────────────────────────────────────────────────────────

/// Completed requests stay visible (and unarchived) this long.
pub const SUPPLY_ARCHIVE_DAYS: i64 = 14;

/// Timestamp before which completed requests fall out of the default view.
pub fn archive_cutoff(now: DateTime<Utc>) -> String {
    sqlite_timestamp(now - Duration::days(SUPPLY_ARCHIVE_DAYS))
}

/// Validated fields of a new supply request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSupplyRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub photo_url: Option<String>,
}

pub fn validate_supply_request(req: &CreateSupplyRequest) -> Result<NewSupplyRequest, ServiceError> {
    let mut errs = FieldErrors::default();
    check_uuid(&mut errs, "store_id", &req.store_id);
    let title = require_text(&mut errs, "title", &req.title, 200);
    let category = require_text(&mut errs, "category", &req.category, 50);
    let photo_url = blank_to_none(req.photo_url.clone());
    check_optional_url(&mut errs, "photo_url", photo_url.as_deref());
    errs.into_result()?;

    Ok(NewSupplyRequest {
        title: title.unwrap_or_default(),
        description: blank_to_none(req.description.clone()),
        category: category.unwrap_or_default(),
        photo_url,
    })
}

/// Who moves a supply request forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplyAction {
    /// Owner takes the request on.
    Confirm,
    /// Owner hands the request to the store manager.
    Forward,
    OwnerComplete,
    ManagerComplete,
}

/// The only allowed moves; anything else is a validation error.
pub fn next_supply_status(
    current: SupplyRequestStatus,
    action: SupplyAction,
) -> Result<SupplyRequestStatus, ServiceError> {
    use SupplyRequestStatus as S;
    let next = match (current, action) {
        (S::Received, SupplyAction::Confirm) => S::InProgress,
        (S::Received, SupplyAction::Forward) => S::ManagerInProgress,
        (S::InProgress, SupplyAction::OwnerComplete) => S::Completed,
        (S::ManagerInProgress, SupplyAction::ManagerComplete) => S::Completed,
        (from, _) => {
            return Err(ServiceError::BadRequest(format!(
                "cannot change a supply request in status '{from}' this way"
            )));
        }
    };
    Ok(next)
}

/// Completion evidence. The store manager must attach a photo; the owner need not.
pub fn validate_completion(
    req: &CompleteSupplyRequest,
    photo_required: bool,
) -> Result<(Option<String>, Option<String>), ServiceError> {
    let mut errs = FieldErrors::default();
    let photo = blank_to_none(req.completion_photo_url.clone());
    if photo_required && photo.is_none() {
        errs.push("completion_photo_url", "required");
    }
    check_optional_url(&mut errs, "completion_photo_url", photo.as_deref());
    errs.into_result()?;
    Ok((photo, blank_to_none(req.completion_description.clone())))
}

// ─── Lost items ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLostItem {
    pub item_type: String,
    pub description: Option<String>,
    pub photo_url: Option<String>,
    pub storage_location: String,
}

/// Staff report of a found item. Only the first photo is kept.
pub fn validate_lost_item(req: &CreateLostItemRequest) -> Result<NewLostItem, ServiceError> {
    let mut errs = FieldErrors::default();
    check_uuid(&mut errs, "store_id", &req.store_id);
    let storage_location = require_text(
        &mut errs,
        "storage_location",
        req.storage_location.as_deref().unwrap_or_default(),
        200,
    );
    let photo_url = blank_to_none(req.photo_url.clone()).or_else(|| {
        req.photo_urls
            .as_ref()
            .and_then(|urls| urls.iter().find(|u| !u.trim().is_empty()))
            .map(|u| u.trim().to_string())
    });
    errs.into_result()?;

    Ok(NewLostItem {
        item_type: blank_to_none(req.item_type.clone()).unwrap_or_else(|| "other".into()),
        description: blank_to_none(req.description.clone()),
        photo_url,
        storage_location: storage_location.unwrap_or_default(),
    })
}

/// Only submitted items can be confirmed.
pub fn check_lost_item_confirmable(status: LostItemStatus) -> Result<(), ServiceError> {
    match status {
        LostItemStatus::Submitted => Ok(()),
        other => Err(ServiceError::BadRequest(format!(
            "cannot confirm a lost item in status '{other}'"
        ))),
    }
}

// ─── Problem reports ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProblemReport {
    pub category: ProblemCategory,
    pub title: String,
    pub description: Option<String>,
    pub photo_url: Option<String>,
    pub vending_machine_number: Option<i64>,
    pub product_number: Option<String>,
}

/// Field worker's report. Like lost items, only the first photo is kept.
pub fn validate_problem_report(
    req: &CreateProblemReportRequest,
) -> Result<NewProblemReport, ServiceError> {
    let mut errs = FieldErrors::default();
    check_uuid(&mut errs, "store_id", &req.store_id);
    let title = require_text(&mut errs, "title", &req.title, 200);
    let photo_url = blank_to_none(req.photo_url.clone()).or_else(|| {
        req.photo_urls
            .as_ref()
            .and_then(|urls| urls.iter().find(|u| !u.trim().is_empty()))
            .map(|u| u.trim().to_string())
    });
    check_optional_url(&mut errs, "photo_url", photo_url.as_deref());
    if req.vending_machine_number.is_some_and(|n| n < 1) {
        errs.push("vending_machine_number", "must be positive");
    }
    errs.into_result()?;

    Ok(NewProblemReport {
        category: req.category,
        title: title.unwrap_or_default(),
        description: blank_to_none(req.description.clone()),
        photo_url,
        vending_machine_number: req.vending_machine_number,
        product_number: blank_to_none(req.product_number.clone()),
    })
}

/// Confirmation and completion both close a submitted report, once.
pub fn check_problem_report_open(status: ProblemReportStatus) -> Result<(), ServiceError> {
    match status {
        ProblemReportStatus::Submitted => Ok(()),
        other => Err(ServiceError::BadRequest(format!(
            "problem report is already {other}"
        ))),
    }
}

/// Completion note and photos. Blank URLs are dropped.
pub fn validate_problem_completion(
    req: &CompleteProblemReportRequest,
) -> Result<(Option<String>, Vec<String>), ServiceError> {
    let mut errs = FieldErrors::default();
    let photos: Vec<String> = req
        .photo_urls
        .iter()
        .flatten()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();
    if photos.iter().any(|u| !is_url(u)) {
        errs.push("photo_urls", "must be valid URLs");
    }
    errs.into_result()?;
    Ok((blank_to_none(req.description.clone()), photos))
}

/// Vending machine reports go to their own list; everything else is a store problem.
pub fn group_problem_reports(reports: Vec<ProblemReportResponse>) -> StoreProblemReportsResponse {
    let (vending_problems, store_problems) = reports
        .into_iter()
        .partition(|r| r.category == ProblemCategory::VendingMachine);
    StoreProblemReportsResponse {
        store_problems,
        vending_problems,
    }
}

// ─── Companies ──────────────────────────────────────────────────────────────

/// Platform-admin company fields after validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyFields {
    pub name: Option<String>,
    pub plan: Option<SubscriptionPlan>,
    pub status: Option<SubscriptionStatus>,
    pub basic_units: Option<i64>,
    pub premium_units: Option<i64>,
}

/// Plan and status must be known values; unit counts are clamped at zero.
pub fn validate_company_request(
    req: &CompanyRequest,
    creating: bool,
) -> Result<CompanyFields, ServiceError> {
    let mut errs = FieldErrors::default();
    let name = match req.name.as_deref() {
        Some(n) => require_text(&mut errs, "name", n, 200),
        None if creating => {
            errs.push("name", "required");
            None
        }
        None => None,
    };
    if let Some(id) = req.id.as_deref() {
        check_uuid(&mut errs, "id", id);
    }
    let plan = req.subscription_plan.as_deref().and_then(|p| {
        p.parse::<SubscriptionPlan>()
            .map_err(|_| errs.push("subscription_plan", "must be free, basic or premium"))
            .ok()
    });
    let status = req.subscription_status.as_deref().and_then(|s| {
        s.parse::<SubscriptionStatus>()
            .map_err(|_| {
                errs.push(
                    "subscription_status",
                    "must be active, suspended or cancelled",
                )
            })
            .ok()
    });
    errs.into_result()?;

    Ok(CompanyFields {
        name,
        plan,
        status,
        basic_units: req.basic_units.map(|n| n.max(0)),
        premium_units: req.premium_units.map(|n| n.max(0)),
    })
}

// ─── Stores ─────────────────────────────────────────────────────────────────

/// Store create/update input. Hours are 0-23; `name` is required on create.
pub fn validate_store_request(
    req: &crate::StoreRequest,
    creating: bool,
) -> Result<crate::db::stores::StoreFields, ServiceError> {
    let mut errs = FieldErrors::default();
    let name = match req.name.as_deref() {
        Some(n) => require_text(&mut errs, "name", n, 100),
        None if creating => {
            errs.push("name", "required");
            None
        }
        None => None,
    };
    for (field, hour) in [
        ("work_start_hour", req.work_start_hour),
        ("work_end_hour", req.work_end_hour),
    ] {
        if hour.is_some_and(|h| !(0..=23).contains(&h)) {
            errs.push(field, "must be between 0 and 23");
        }
    }
    errs.into_result()?;

    Ok(crate::db::stores::StoreFields {
        name,
        address: req.address.clone().map(|a| blank_to_none(Some(a))),
        management_days: req.management_days.clone().map(|d| blank_to_none(Some(d))),
        service_active: req.service_active,
        is_night_shift: req.is_night_shift,
        work_start_hour: req.work_start_hour,
        work_end_hour: req.work_end_hour,
    })
}

// ─── Users ──────────────────────────────────────────────────────────────────

/// Role given on approval: the requested one if assignable, else the current one.
pub fn approval_role(
    requested: Option<UserRole>,
    current: UserRole,
) -> Result<UserRole, ServiceError> {
    match requested {
        Some(role) if !role.is_assignable_on_approval() => Err(ServiceError::BadRequest(format!(
            "role '{role}' cannot be assigned here"
        ))),
        Some(role) => Ok(role),
        None => Ok(current),
    }
}

/// Company admins hand out assignable roles only; platform admins any role.
pub fn check_role_change(actor: UserRole, new_role: UserRole) -> Result<(), ServiceError> {
    if actor == UserRole::PlatformAdmin || new_role.is_assignable_on_approval() {
        return Ok(());
    }
    Err(ServiceError::BadRequest(format!(
        "role '{new_role}' cannot be assigned here"
    )))
}

/// Validated fields of an account created by a company admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCompanyUser {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: UserRole,
}

/// The password is checked here but hashed by the caller.
pub fn validate_company_user(req: &CreateCompanyUserRequest) -> Result<NewCompanyUser, ServiceError> {
    let email = validate_email(&req.email)?;
    validate_password(&req.password)?;
    let role = approval_role(req.role, UserRole::Staff)?;
    let mut errs = FieldErrors::default();
    let name = require_text(&mut errs, "name", &req.name, 100);
    errs.into_result()?;
    Ok(NewCompanyUser {
        email,
        name: name.unwrap_or_default(),
        phone: blank_to_none(req.phone.clone()),
        role,
    })
}

/// Profile edit by a company admin. Returns the trimmed name.
pub fn validate_user_update(
    actor: UserRole,
    req: &UpdateCompanyUserRequest,
) -> Result<String, ServiceError> {
    if let Some(role) = req.role {
        check_role_change(actor, role)?;
    }
    let mut errs = FieldErrors::default();
    let name = require_text(&mut errs, "name", &req.name, 100);
    errs.into_result()?;
    Ok(name.unwrap_or_default())
}

/// Resident registration numbers: 13 digits, optionally `YYMMDD-NNNNNNN`.
pub fn normalize_resident_number(value: &str) -> Result<String, ServiceError> {
    let digits: String = value.chars().filter(|c| *c != '-' && !c.is_whitespace()).collect();
    if digits.len() != 13 || !digits.chars().all(|c| c.is_ascii_digit()) {
        let mut errs = FieldErrors::default();
        errs.push("resident_number", "must be 13 digits");
        return Err(ServiceError::Invalid(errs));
    }
    Ok(format!("{}-{}", &digits[..6], &digits[6..]))
}

// ─── Announcements ──────────────────────────────────────────────────────────

pub fn validate_announcement(
    req: &crate::CreateAnnouncementRequest,
) -> Result<(String, String), ServiceError> {
    let mut errs = FieldErrors::default();
    let title = require_text(&mut errs, "title", &req.title, 200);
    let content = require_text(&mut errs, "content", &req.content, 10_000);
    errs.into_result()?;
    Ok((title.unwrap_or_default(), content.unwrap_or_default()))
}

// ─── Landing content ────────────────────────────────────────────────────────

/// Validated case study input. Inner `None` clears a nullable column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseStudyFields {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub blog_url: Option<String>,
    pub thumbnail_url: Option<Option<String>>,
    pub display_order: Option<i64>,
    pub is_active: Option<bool>,
}

/// Title and blog URL are required on create; blank optionals become NULL.
pub fn validate_case_study(
    req: &crate::CaseStudyRequest,
    creating: bool,
) -> Result<CaseStudyFields, ServiceError> {
    let mut errs = FieldErrors::default();
    let title = required_on_create(&mut errs, "title", req.title.as_deref(), 200, creating);
    let blog_url = required_on_create(&mut errs, "blog_url", req.blog_url.as_deref(), 2000, creating);
    check_optional_url(&mut errs, "blog_url", blog_url.as_deref());
    let thumbnail_url = req.thumbnail_url.clone().map(|t| blank_to_none(Some(t)));
    check_optional_url(&mut errs, "thumbnail_url", thumbnail_url.clone().flatten().as_deref());
    errs.into_result()?;

    Ok(CaseStudyFields {
        title,
        description: req.description.clone().map(|d| blank_to_none(Some(d))),
        blog_url,
        thumbnail_url,
        display_order: req.display_order,
        is_active: req.is_active,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomPageFields {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub content: Option<Option<String>>,
    pub meta_title: Option<Option<String>>,
    pub meta_description: Option<Option<String>>,
    pub is_published: Option<bool>,
    pub is_active: Option<bool>,
}

/// Slug and title are required on create; slugs are `[a-z0-9-]+`.
pub fn validate_custom_page(
    req: &crate::CustomPageRequest,
    creating: bool,
) -> Result<CustomPageFields, ServiceError> {
    let mut errs = FieldErrors::default();
    let slug = required_on_create(&mut errs, "slug", req.slug.as_deref(), 100, creating);
    if slug.as_deref().is_some_and(|s| !is_slug(s)) {
        errs.push("slug", "only lowercase letters, digits and hyphens");
    }
    let title = required_on_create(&mut errs, "title", req.title.as_deref(), 200, creating);
    errs.into_result()?;

    let nullable = |v: &Option<String>| v.clone().map(|s| blank_to_none(Some(s)));
    Ok(CustomPageFields {
        slug,
        title,
        content: nullable(&req.content),
        meta_title: nullable(&req.meta_title),
        meta_description: nullable(&req.meta_description),
        is_published: req.is_published,
        is_active: req.is_active,
    })
}

fn required_on_create(
    errs: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
    max: usize,
    creating: bool,
) -> Option<String> {
    match value {
        Some(v) => require_text(errs, field, v, max),
        None if creating => {
            errs.push(field, "required");
            None
        }
        None => None,
    }
}

// ─── Auth Token Resolution ──────────────────────────────────────────────────

/// Resolve a bearer token into the user id it was issued for.
pub fn resolve_auth_token(token: &str, jwt_secret: &str, now: u64) -> Result<String, ServiceError> {
    if jwt_secret.is_empty() {
        return Err(ServiceError::Unauthorized(
            "JWT authentication not configured".into(),
        ));
    }
    crate::crypto::verify_jwt(token, jwt_secret, now)
}

// ─── Token Bundle ───────────────────────────────────────────────────────────

/// Pre-computed token bundle returned by [`prepare_token_bundle`].
///
/// The caller only needs to insert the refresh token row.
pub struct TokenBundle {
    /// SHA-256 hash of the refresh token (stored in DB).
    pub token_hash: String,
    /// UUID primary key for the refresh_tokens row.
    pub token_id: String,
    /// `datetime` string for the refresh token expiry (DB column value).
    pub expires_at: String,
    /// Ready-to-return API response.
    pub response: AuthTokenResponse,
}

/// Build a [`TokenBundle`] containing a JWT, refresh token, and the auth response.
pub fn prepare_token_bundle(
    jwt_secret: &str,
    user_id: &str,
    name: &str,
    role: UserRole,
    now_unix: u64,
) -> Result<TokenBundle, ServiceError> {
    use crate::crypto;

    let access_token = crypto::sign_jwt(user_id, jwt_secret, now_unix);
    let refresh_token = crypto::generate_token()?;
    let token_hash = crypto::hash_token(&refresh_token);
    let token_id = uuid::Uuid::new_v4().to_string();

    let base = DateTime::from_timestamp(now_unix as i64, 0)
        .ok_or_else(|| ServiceError::Internal("invalid timestamp".into()))?;
    let expires_at = base
        .checked_add_signed(Duration::seconds(crypto::REFRESH_EXPIRY_SECS as i64))
        .ok_or_else(|| ServiceError::Internal("timestamp overflow".into()))?;

    let response = AuthTokenResponse {
        access_token,
        refresh_token,
        expires_in: crypto::JWT_EXPIRY_SECS,
        user_id: user_id.to_string(),
        name: name.to_string(),
        role,
        home_path: crate::roles::home_path(role).to_string(),
    };

    Ok(TokenBundle {
        token_hash,
        token_id,
        expires_at: sqlite_timestamp(expires_at),
        response,
    })
}
