//! Compile-time–checked column identifiers for all tables.

use sea_query::Iden;

#[derive(Iden, Clone, Copy)]
pub enum Users {
    Table,
    Id,
    Email,
    PasswordHash,
    PasswordSalt,
    Name,
    Phone,
    Role,
    CompanyId,
    ApprovalStatus,
    ApprovedAt,
    ApprovedBy,
    RejectionReason,
    EmploymentActive,
    SignupType,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum RefreshTokens {
    Table,
    Id,
    UserId,
    TokenHash,
    ExpiresAt,
    CreatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum UserSensitive {
    Table,
    UserId,
    CompanyId,
    ResidentNumberSealed,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum Companies {
    Table,
    Id,
    Name,
    Address,
    BusinessRegistrationNumber,
    SubscriptionPlan,
    SubscriptionStatus,
    TrialEndsAt,
    BasicUnits,
    PremiumUnits,
    SignupCode,
    SignupCodeActive,
    RequiresApproval,
    DefaultRole,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum Stores {
    Table,
    Id,
    CompanyId,
    Name,
    Address,
    ManagementDays,
    ServiceActive,
    IsNightShift,
    WorkStartHour,
    WorkEndHour,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum StoreAssign {
    Table,
    UserId,
    StoreId,
    CreatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum Attendance {
    Table,
    Id,
    UserId,
    StoreId,
    WorkDate,
    ClockInAt,
    ClockInLatitude,
    ClockInLongitude,
    ClockOutAt,
    ClockOutLatitude,
    ClockOutLongitude,
    SelfieUrl,
    AttendanceType,
    ScheduledDate,
    ProblemReportId,
    ChangeReason,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum Checklist {
    Table,
    Id,
    StoreId,
    CreatedBy,
    AssignedUserId,
    TemplateId,
    WorkDate,
    Items,
    Note,
    RequiresPhotos,
    ReviewStatus,
    ReviewedBy,
    ReviewedAt,
    ReviewComment,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum SupplyRequests {
    Table,
    Id,
    StoreId,
    UserId,
    Title,
    Description,
    Category,
    PhotoUrl,
    Status,
    ManagerComment,
    CompletionPhotoUrl,
    CompletionDescription,
    CompletedAt,
    IsArchived,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum LostItems {
    Table,
    Id,
    StoreId,
    UserId,
    ItemType,
    Description,
    PhotoUrl,
    StorageLocation,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum ProblemReports {
    Table,
    Id,
    StoreId,
    UserId,
    Category,
    Title,
    Description,
    PhotoUrl,
    VendingMachineNumber,
    ProductNumber,
    Status,
    CompletionDescription,
    CompletionPhotoUrls,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum Announcements {
    Table,
    Id,
    CompanyId,
    Title,
    Content,
    Audience,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum AnnouncementReads {
    Table,
    AnnouncementId,
    UserId,
    ReadAt,
}

#[derive(Iden, Clone, Copy)]
pub enum CaseStudies {
    Table,
    Id,
    Title,
    Description,
    BlogUrl,
    ThumbnailUrl,
    DisplayOrder,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum CustomPages {
    Table,
    Id,
    Slug,
    Title,
    Content,
    MetaTitle,
    MetaDescription,
    IsPublished,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
