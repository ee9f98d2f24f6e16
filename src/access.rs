//! Role-based gating of laundry status updates.

use std::{error::Error as StdError, str::FromStr};

use serde::{Deserialize, Serialize};
use tokio_postgres::types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};

use crate::db::laundry::Status;

/// Authorization class of a caller, carried as a string in JWT claims.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Staff,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Staff => "staff",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "staff" => Ok(Self::Staff),
            _ => Err(UnknownRole),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct UnknownRole;

impl FromSql<'_> for Role {
    accepts!(TEXT);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        let repr = <&str>::from_sql(ty, raw)?;
        let role = repr.parse().map_err(|_| "invalid role")?;
        Ok(role)
    }
}

impl ToSql for Role {
    accepts!(TEXT);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.as_str().to_sql(ty, out)
    }
}

/// Statuses the given role is allowed to set on a laundry ticket.
pub fn permitted_statuses(role: Role) -> &'static [Status] {
    match role {
        Role::Staff => &[Status::Pending, Status::Washed],
        Role::Student => &[Status::PickedUp],
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Denied {
    /// Requested status is not one of the enumerated values.
    InvalidStatus,
    /// Status is valid, but not in the role's permitted set.
    RoleForbids(Role),
    /// Caller's role string is not a recognized role.
    UnknownRole,
}

/// Decides whether a caller with the given role string may set a laundry
/// ticket to the requested status.
///
/// Deliberately independent of the ticket's current status: any permitted
/// status may overwrite any prior one.
pub fn authorize_status_update(
    role: &str,
    status: &str,
) -> Result<Status, Denied> {
    let status = status.parse().map_err(|_| Denied::InvalidStatus)?;
    let role = role.parse().map_err(|_| Denied::UnknownRole)?;
    if permitted_statuses(role).contains(&status) {
        Ok(status)
    } else {
        Err(Denied::RoleForbids(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_status_for_any_role() {
        for role in ["staff", "student", "warden"] {
            assert_eq!(
                authorize_status_update(role, "DONE"),
                Err(Denied::InvalidStatus),
            );
        }
    }

    #[test]
    fn staff_may_set_pending_and_washed_only() {
        assert_eq!(
            authorize_status_update("staff", "PENDING"),
            Ok(Status::Pending),
        );
        assert_eq!(
            authorize_status_update("staff", "WASHED"),
            Ok(Status::Washed),
        );
        for status in ["PICKED_UP", "DELIVERED"] {
            assert_eq!(
                authorize_status_update("staff", status),
                Err(Denied::RoleForbids(Role::Staff)),
            );
        }
    }

    #[test]
    fn student_may_set_picked_up_only() {
        assert_eq!(
            authorize_status_update("student", "PICKED_UP"),
            Ok(Status::PickedUp),
        );
        for status in ["PENDING", "WASHED", "DELIVERED"] {
            assert_eq!(
                authorize_status_update("student", status),
                Err(Denied::RoleForbids(Role::Student)),
            );
        }
    }

    #[test]
    fn rejects_unrecognized_role() {
        for status in ["PENDING", "PICKED_UP", "WASHED", "DELIVERED"] {
            assert_eq!(
                authorize_status_update("warden", status),
                Err(Denied::UnknownRole),
            );
        }
    }

    #[test]
    fn status_is_validated_before_role() {
        // A bad status is a validation error even when the role is
        // unrecognized too.
        assert_eq!(
            authorize_status_update("warden", "DONE"),
            Err(Denied::InvalidStatus),
        );
    }
}
