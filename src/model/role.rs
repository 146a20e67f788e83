use std::str::FromStr;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use crate::utils::errors::{ErrorCode, TurnstileError};

///
/// Accounts live in one of two disjoint namespaces. An account is only ever matched within
/// the namespace a request names.
///
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum Role {
    #[display(fmt = "user")]
    User,
    #[display(fmt = "admin")]
    Admin,
}

impl FromStr for Role {
    type Err = TurnstileError;

    fn from_str(input: &str) -> Result<Role, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "user"  => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _       => Err(ErrorCode::InvalidRole.with_msg(&format!("role '{}' is not one of user or admin", input))),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() -> Result<(), TurnstileError> {
        assert_eq!(Role::from_str("user")?, Role::User);
        assert_eq!(Role::from_str(" Admin ")?, Role::Admin);
        assert_eq!(Role::Admin.to_string(), "admin");
        Ok(())
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let err = Role::from_str("operator").unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidRole);
        assert_eq!(err.field(), Some("role"));
    }
}
