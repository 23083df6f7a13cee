//! Subject catalog. Closed set of academic subjects known at compile time.
//!
//! The display name is the interchange format: it is what the `subject` and
//! `specialization` columns store.

use crate::domain::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Subject {
    #[serde(rename = "Math")]
    Mathematics,
    #[serde(rename = "Science")]
    Science,
    #[serde(rename = "English")]
    English,
    #[serde(rename = "History")]
    History,
    #[serde(rename = "Computer Science")]
    ComputerScience,
}

impl Subject {
    /// All subjects in catalog order.
    pub const ALL: [Subject; 5] = [
        Subject::Mathematics,
        Subject::Science,
        Subject::English,
        Subject::History,
        Subject::ComputerScience,
    ];

    /// Subject returned by [`Subject::lookup_or_default`] when a name is not recognized.
    pub const DEFAULT: Subject = Subject::Mathematics;

    pub fn display_name(self) -> &'static str {
        match self {
            Subject::Mathematics => "Math",
            Subject::Science => "Science",
            Subject::English => "English",
            Subject::History => "History",
            Subject::ComputerScience => "Computer Science",
        }
    }

    /// Nominal credit hours for the subject (informational; courses carry their own credits).
    pub fn credit_hours(self) -> u32 {
        match self {
            Subject::Mathematics => 4,
            Subject::Science => 5,
            Subject::English => 3,
            Subject::History => 3,
            Subject::ComputerScience => 5,
        }
    }

    /// Exact, case-sensitive lookup by display name.
    ///
    /// # Errors
    /// Returns [`DomainError::UnknownSubject`] when no subject has that display name.
    pub fn lookup(display_name: &str) -> Result<Self, DomainError> {
        Self::ALL
            .into_iter()
            .find(|s| s.display_name() == display_name)
            .ok_or_else(|| DomainError::UnknownSubject(display_name.to_string()))
    }

    /// Legacy lookup: unknown names resolve to [`Subject::DEFAULT`].
    ///
    /// Only for callers that must accept arbitrary stored strings. The fallback masks
    /// typos and corrupt rows, so every fallback is logged.
    pub fn lookup_or_default(display_name: &str) -> Self {
        Self::lookup(display_name).unwrap_or_else(|_| {
            warn!(
                name = display_name,
                fallback = Self::DEFAULT.display_name(),
                "unknown subject name, using default subject"
            );
            Self::DEFAULT
        })
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Subject {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_matches_display_names() {
        for subject in Subject::ALL {
            assert_eq!(Subject::lookup(subject.display_name()).unwrap(), subject);
        }
        assert_eq!(
            "Computer Science".parse::<Subject>().unwrap(),
            Subject::ComputerScience
        );
    }

    #[test]
    fn lookup_unknown_name_is_an_error() {
        let err = Subject::lookup("NonexistentSubject").unwrap_err();
        assert!(matches!(err, DomainError::UnknownSubject(ref n) if n == "NonexistentSubject"));
        // Case-sensitive, like the stored strings.
        assert!(Subject::lookup("math").is_err());
    }

    #[test]
    fn lookup_or_default_falls_back_to_math() {
        assert_eq!(
            Subject::lookup_or_default("NonexistentSubject"),
            Subject::Mathematics
        );
        assert_eq!(Subject::lookup_or_default("History"), Subject::History);
    }

    #[test]
    fn credit_hours() {
        assert_eq!(Subject::Mathematics.credit_hours(), 4);
        assert_eq!(Subject::ComputerScience.credit_hours(), 5);
        assert_eq!(Subject::English.credit_hours(), 3);
    }

    #[test]
    fn serializes_as_display_name() {
        let json = serde_json::to_string(&Subject::ComputerScience).unwrap();
        assert_eq!(json, "\"Computer Science\"");
    }
}
