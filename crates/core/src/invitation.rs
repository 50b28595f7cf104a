//! Client invitation lifecycle.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

labeled_enum! {
    pub enum InvitationStatus ("invitation status") {
        Pending => "PENDING",
        Accepted => "ACCEPTED",
        Revoked => "REVOKED",
    }
}

/// Days an invitation stays valid unless configured otherwise.
pub const DEFAULT_TTL_DAYS: i64 = 7;

/// Why an invitation token cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationRejection {
    NotFound,
    Expired,
    AlreadyAccepted,
    Revoked,
}

impl InvitationRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Expired => "expired",
            Self::AlreadyAccepted => "already_accepted",
            Self::Revoked => "revoked",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::NotFound => "invitation not found",
            Self::Expired => "invitation has expired",
            Self::AlreadyAccepted => "invitation has already been accepted",
            Self::Revoked => "invitation has been revoked",
        }
    }
}

impl std::fmt::Display for InvitationRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check whether an invitation may be accepted at `now`.
///
/// Status is checked before expiry so an accepted invitation reports
/// `AlreadyAccepted` even after its expiry date.
pub fn check(
    status: InvitationStatus,
    expires_at: NaiveDateTime,
    now: NaiveDateTime,
) -> Result<(), InvitationRejection> {
    match status {
        InvitationStatus::Accepted => Err(InvitationRejection::AlreadyAccepted),
        InvitationStatus::Revoked => Err(InvitationRejection::Revoked),
        InvitationStatus::Pending if now > expires_at => Err(InvitationRejection::Expired),
        InvitationStatus::Pending => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_pending_before_expiry_is_valid() {
        assert_eq!(check(InvitationStatus::Pending, at(12), at(11)), Ok(()));
        assert_eq!(check(InvitationStatus::Pending, at(12), at(12)), Ok(()));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        assert_eq!(
            check(InvitationStatus::Pending, at(12), at(13)),
            Err(InvitationRejection::Expired)
        );
    }

    #[test]
    fn test_status_wins_over_expiry() {
        assert_eq!(
            check(InvitationStatus::Accepted, at(12), at(13)),
            Err(InvitationRejection::AlreadyAccepted)
        );
        assert_eq!(
            check(InvitationStatus::Revoked, at(12), at(1)),
            Err(InvitationRejection::Revoked)
        );
    }
}
