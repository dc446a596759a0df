//! Role-gated navigation: where each role lands and which sections it may open.

use crate::{ApprovalStatus, Section, SectionAccessResponse, UserRole};

/// Landing path after login.
pub fn home_path(role: UserRole) -> &'static str {
    match role {
        UserRole::Staff | UserRole::SubcontractIndividual | UserRole::SubcontractCompany => {
            "/mobile-dashboard"
        }
        UserRole::Manager => "/reviews",
        UserRole::BusinessOwner => "/business/dashboard",
        UserRole::FranchiseManager => "/franchise/dashboard",
        UserRole::StoreManager => "/store-manager/dashboard",
        UserRole::PlatformAdmin => "/platform/dashboard",
        UserRole::Admin => "/dashboard",
    }
}

impl Section {
    /// The single role allowed into this section's layout.
    pub fn required_role(&self) -> UserRole {
        match self {
            Self::Staff => UserRole::Staff,
            Self::Business => UserRole::BusinessOwner,
            Self::Franchise => UserRole::FranchiseManager,
            Self::Manager => UserRole::Manager,
            Self::StoreManager => UserRole::StoreManager,
            Self::Platform => UserRole::PlatformAdmin,
        }
    }
}

/// Outcome of opening a role-gated section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionGate {
    Allow,
    Redirect(&'static str),
}

impl From<SectionGate> for SectionAccessResponse {
    fn from(gate: SectionGate) -> Self {
        match gate {
            SectionGate::Allow => Self {
                allowed: true,
                redirect_to: None,
            },
            SectionGate::Redirect(to) => Self {
                allowed: false,
                redirect_to: Some(to.to_string()),
            },
        }
    }
}

/// Anonymous callers go to `/login`; any other role mismatch goes to `/`.
pub fn section_gate(role: Option<UserRole>, section: Section) -> SectionGate {
    match role {
        None => SectionGate::Redirect("/login"),
        Some(role) if role != section.required_role() => SectionGate::Redirect("/"),
        Some(_) => SectionGate::Allow,
    }
}

/// Role check used by every role-gated API endpoint.
///
/// Unapproved accounts fail the same way a wrong role does.
pub fn has_role(role: UserRole, approval: ApprovalStatus, allowed: &[UserRole]) -> bool {
    approval == ApprovalStatus::Approved && allowed.contains(&role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_workers_land_on_mobile_dashboard() {
        for role in [
            UserRole::Staff,
            UserRole::SubcontractIndividual,
            UserRole::SubcontractCompany,
        ] {
            assert_eq!(home_path(role), "/mobile-dashboard");
        }
        assert_eq!(home_path(UserRole::Manager), "/reviews");
        assert_eq!(home_path(UserRole::Admin), "/dashboard");
    }

    #[test]
    fn anonymous_is_sent_to_login() {
        assert_eq!(
            section_gate(None, Section::Business),
            SectionGate::Redirect("/login")
        );
    }

    #[test]
    fn wrong_role_is_sent_home() {
        assert_eq!(
            section_gate(Some(UserRole::Staff), Section::Business),
            SectionGate::Redirect("/")
        );
        assert_eq!(
            section_gate(Some(UserRole::PlatformAdmin), Section::StoreManager),
            SectionGate::Redirect("/")
        );
    }

    #[test]
    fn matching_role_is_allowed() {
        for section in Section::ALL {
            assert_eq!(
                section_gate(Some(section.required_role()), *section),
                SectionGate::Allow
            );
        }
    }

    #[test]
    fn pending_accounts_fail_role_checks() {
        let allowed = [UserRole::BusinessOwner];
        assert!(has_role(
            UserRole::BusinessOwner,
            ApprovalStatus::Approved,
            &allowed
        ));
        assert!(!has_role(
            UserRole::BusinessOwner,
            ApprovalStatus::Pending,
            &allowed
        ));
        assert!(!has_role(UserRole::Staff, ApprovalStatus::Approved, &allowed));
    }
}
