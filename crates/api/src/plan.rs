//! Subscription plans and the business features they unlock.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::{Feature, ServiceError, SubscriptionPlan, SubscriptionStatus};

/// Features only the premium plan (or a premium unit) opens.
pub const PREMIUM_ONLY_FEATURES: &[Feature] = &[Feature::AttendanceReport, Feature::Franchises];

/// Free-trial length granted on owner self signup.
pub const TRIAL_DAYS: i64 = 7;

/// Basic units granted on owner self signup.
pub const SIGNUP_BASIC_UNITS: i64 = 3;

/// Features included in a plan, before premium units are considered.
pub fn plan_features(plan: SubscriptionPlan) -> Vec<Feature> {
    Feature::ALL
        .iter()
        .copied()
        .filter(|f| match plan {
            SubscriptionPlan::Free | SubscriptionPlan::Basic => {
                !PREMIUM_ONLY_FEATURES.contains(f) && *f != Feature::Products
            }
            SubscriptionPlan::Premium => *f != Feature::Products,
        })
        .collect()
}

/// Whether `feature` is usable. Inactive subscriptions allow nothing.
pub fn is_feature_allowed(
    plan: SubscriptionPlan,
    status: SubscriptionStatus,
    feature: Feature,
    premium_units: i64,
) -> bool {
    if status != SubscriptionStatus::Active {
        return false;
    }
    if PREMIUM_ONLY_FEATURES.contains(&feature) && premium_units >= 1 {
        return true;
    }
    plan_features(plan).contains(&feature)
}

/// Every usable feature for the given subscription.
pub fn allowed_features(
    plan: SubscriptionPlan,
    status: SubscriptionStatus,
    premium_units: i64,
) -> Vec<Feature> {
    Feature::ALL
        .iter()
        .copied()
        .filter(|f| is_feature_allowed(plan, status, *f, premium_units))
        .collect()
}

/// Parse a stored timestamp: SQLite `YYYY-MM-DD HH:MM:SS`, RFC 3339, or a bare date.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// A free, active plan whose trial end lies in the past.
///
/// Missing or unparseable trial dates never expire.
pub fn is_trial_expired(
    plan: SubscriptionPlan,
    status: SubscriptionStatus,
    trial_ends_at: Option<&str>,
    now: DateTime<Utc>,
) -> bool {
    plan == SubscriptionPlan::Free
        && status == SubscriptionStatus::Active
        && trial_ends_at
            .and_then(parse_timestamp)
            .is_some_and(|ends| ends < now)
}

/// Gate used by every business endpoint: trial first, then the feature key.
pub fn assert_business_feature(
    plan: SubscriptionPlan,
    status: SubscriptionStatus,
    trial_ends_at: Option<&str>,
    premium_units: i64,
    feature: Feature,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    if is_trial_expired(plan, status, trial_ends_at, now) {
        return Err(ServiceError::Forbidden(
            "free trial has ended; contact the platform administrator to change plans".into(),
        ));
    }
    if !is_feature_allowed(plan, status, feature, premium_units) {
        return Err(ServiceError::Forbidden(format!(
            "feature '{feature}' is not available on the current plan"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn free_and_basic_lack_premium_features() {
        for plan in [SubscriptionPlan::Free, SubscriptionPlan::Basic] {
            let features = plan_features(plan);
            assert!(features.contains(&Feature::Stores));
            assert!(features.contains(&Feature::SupplyRequests));
            assert!(!features.contains(&Feature::AttendanceReport));
            assert!(!features.contains(&Feature::Franchises));
            assert!(!features.contains(&Feature::Products));
        }
    }

    #[test]
    fn premium_adds_report_and_franchises_only() {
        let features = plan_features(SubscriptionPlan::Premium);
        assert!(features.contains(&Feature::AttendanceReport));
        assert!(features.contains(&Feature::Franchises));
        assert!(!features.contains(&Feature::Products));
    }

    #[test]
    fn premium_unit_unlocks_premium_only_features() {
        assert!(!is_feature_allowed(
            SubscriptionPlan::Basic,
            SubscriptionStatus::Active,
            Feature::AttendanceReport,
            0
        ));
        assert!(is_feature_allowed(
            SubscriptionPlan::Basic,
            SubscriptionStatus::Active,
            Feature::AttendanceReport,
            1
        ));
        assert!(!is_feature_allowed(
            SubscriptionPlan::Basic,
            SubscriptionStatus::Active,
            Feature::Products,
            5
        ));
    }

    #[test]
    fn inactive_subscription_allows_nothing() {
        assert!(
            allowed_features(SubscriptionPlan::Premium, SubscriptionStatus::Suspended, 3)
                .is_empty()
        );
        assert!(!is_feature_allowed(
            SubscriptionPlan::Free,
            SubscriptionStatus::Cancelled,
            Feature::Dashboard,
            0
        ));
    }

    #[test]
    fn trial_expiry() {
        let free = SubscriptionPlan::Free;
        let active = SubscriptionStatus::Active;
        assert!(is_trial_expired(free, active, Some("2025-03-01 00:00:00"), now()));
        assert!(is_trial_expired(free, active, Some("2025-03-09T00:00:00Z"), now()));
        assert!(!is_trial_expired(free, active, Some("2025-03-17 00:00:00"), now()));
        assert!(!is_trial_expired(free, active, None, now()));
        assert!(!is_trial_expired(free, active, Some("not a date"), now()));
        assert!(!is_trial_expired(
            SubscriptionPlan::Basic,
            active,
            Some("2025-03-01 00:00:00"),
            now()
        ));
    }

    #[test]
    fn business_gate_checks_trial_before_feature() {
        let err = assert_business_feature(
            SubscriptionPlan::Free,
            SubscriptionStatus::Active,
            Some("2025-01-01"),
            0,
            Feature::Stores,
            now(),
        )
        .unwrap_err();
        assert!(err.message().contains("trial"));

        let err = assert_business_feature(
            SubscriptionPlan::Free,
            SubscriptionStatus::Active,
            None,
            0,
            Feature::Franchises,
            now(),
        )
        .unwrap_err();
        assert_eq!(err.status_code(), 403);

        assert!(
            assert_business_feature(
                SubscriptionPlan::Free,
                SubscriptionStatus::Active,
                None,
                0,
                Feature::Stores,
                now()
            )
            .is_ok()
        );
    }
}
