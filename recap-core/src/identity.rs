//! Identity types for recap entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Calendar year a dataset belongs to.
pub type Year = i32;

/// Numeric user identifier (platform snowflake).
///
/// Callers receive ids both as integers and as decimal strings; both parse
/// to the same `UserId`, which is the only form used for queries and cache
/// keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error when parsing a user id string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdParseError(pub String);

impl fmt::Display for UserIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid user id: {}", self.0)
    }
}

impl std::error::Error for UserIdParseError {}

impl FromStr for UserId {
    type Err = UserIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| UserIdParseError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_parses_numeric_strings() {
        let from_int = UserId::from(123456789012345678);
        let from_str: UserId = "123456789012345678".parse().unwrap();
        let padded: UserId = " 123456789012345678 ".parse().unwrap();
        assert_eq!(from_int, from_str);
        assert_eq!(from_int, padded);
    }

    #[test]
    fn test_user_id_rejects_non_numeric() {
        assert!("abc".parse::<UserId>().is_err());
        assert!("12.5".parse::<UserId>().is_err());
        assert!("".parse::<UserId>().is_err());
    }

    #[test]
    fn test_user_id_display_is_canonical() {
        let id: UserId = "0042".parse().unwrap();
        assert_eq!(id.to_string(), "42");
    }
}
