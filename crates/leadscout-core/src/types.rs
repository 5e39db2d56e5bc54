//! Shared types used across LeadScout.
//!
//! This module defines common newtypes and enums that provide type safety
//! and clear domain modeling.

use crate::error::LeadScoutError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Newtype for scraping session identifiers with validation.
///
/// Session IDs must be valid UUIDs (v4 format).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new `SessionId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID is not a valid UUID v4.
    pub fn new(id: impl Into<String>) -> Result<Self, LeadScoutError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Create a new random `SessionId` using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<(), LeadScoutError> {
        static UUID_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = UUID_REGEX.get_or_init(|| {
            Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
                .expect("valid regex")
        });

        if regex.is_match(id) {
            Ok(())
        } else {
            Err(LeadScoutError::Validation(format!(
                "invalid session ID: must be a valid UUID v4, got '{id}'"
            )))
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a scraping session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Workers are crawling
    Running,
    /// Every town was processed
    Completed,
    /// A stop was requested, or the process died mid-run
    Stopped,
    /// The run aborted on a fatal error
    Failed,
}

impl SessionStatus {
    /// Stored representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = LeadScoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "stopped" => Ok(Self::Stopped),
            "failed" => Ok(Self::Failed),
            other => Err(LeadScoutError::Validation(format!(
                "unknown session status '{other}'"
            ))),
        }
    }
}

/// A phone number normalized to local digit form.
///
/// South African numbers in international (`+27 82 ...`, `27 82 ...`) or
/// local (`082 ...`) notation normalize to the ten-digit `0XXXXXXXXX` form,
/// as does the mixed `+27 (0)82 ...` notation.
/// Other numbers with 7 to 15 digits are kept as bare digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Normalize and validate a raw phone number.
    ///
    /// # Errors
    /// Returns error if the input does not contain a plausible phone number.
    pub fn parse(raw: &str) -> Result<Self, LeadScoutError> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

        let normalized = match digits.len() {
            11 if digits.starts_with("27") => format!("0{}", &digits[2..]),
            12 if digits.starts_with("270") => digits[2..].to_string(),
            10 if digits.starts_with('0') => digits,
            9 if !digits.starts_with('0') => format!("0{digits}"),
            7..=15 => digits,
            _ => {
                return Err(LeadScoutError::Validation(format!(
                    "invalid phone number '{raw}'"
                )))
            }
        };

        Ok(Self(normalized))
    }

    /// Get the normalized digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// South African mobile ranges start with 06, 07 or 08.
    #[must_use]
    pub fn is_mobile(&self) -> bool {
        self.0.len() == 10 && matches!(self.0.get(..2), Some("06" | "07" | "08"))
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = LeadScoutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(value: PhoneNumber) -> Self {
        value.0
    }
}

/// Network operator servicing a phone number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Provider {
    /// Vodacom
    Vodacom,
    /// MTN
    #[serde(rename = "MTN")]
    Mtn,
    /// Cell C
    #[serde(rename = "Cell C")]
    CellC,
    /// Telkom (including Telkom Mobile / 8ta)
    Telkom,
    /// Rain
    Rain,
    /// A lookup answered with an operator outside the known set
    Other,
    /// Every lookup attempt failed
    Unknown,
}

impl Provider {
    /// Human-readable, stored name.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Vodacom => "Vodacom",
            Self::Mtn => "MTN",
            Self::CellC => "Cell C",
            Self::Telkom => "Telkom",
            Self::Rain => "Rain",
            Self::Other => "Other",
            Self::Unknown => "Unknown",
        }
    }

    /// Recognize a provider mentioned in free text (case-insensitive).
    ///
    /// The earliest mention wins. Returns `None` when no known operator is
    /// named.
    #[must_use]
    pub fn from_label(text: &str) -> Option<Self> {
        static PATTERNS: OnceLock<Vec<(Regex, Provider)>> = OnceLock::new();
        let patterns = PATTERNS.get_or_init(|| {
            [
                (r"(?i)\bvodacom\b", Provider::Vodacom),
                (r"(?i)\bmtn\b", Provider::Mtn),
                (r"(?i)\bcell[\s-]?c\b", Provider::CellC),
                (r"(?i)\b(telkom|8ta)\b", Provider::Telkom),
                (r"(?i)\brain\b", Provider::Rain),
            ]
            .into_iter()
            .map(|(pattern, provider)| (Regex::new(pattern).expect("valid regex"), provider))
            .collect()
        });

        patterns
            .iter()
            .filter_map(|(regex, provider)| regex.find(text).map(|m| (m.start(), *provider)))
            .min_by_key(|(start, _)| *start)
            .map(|(_, provider)| provider)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Provider {
    type Err = LeadScoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vodacom" => Ok(Self::Vodacom),
            "mtn" => Ok(Self::Mtn),
            "cell c" => Ok(Self::CellC),
            "telkom" => Ok(Self::Telkom),
            "rain" => Ok(Self::Rain),
            "other" => Ok(Self::Other),
            "unknown" => Ok(Self::Unknown),
            other => Err(LeadScoutError::Validation(format!(
                "unknown provider '{other}'"
            ))),
        }
    }
}

/// One Maps search: an industry within a town.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchTarget {
    /// Town or suburb name
    pub town: String,
    /// Industry / business category
    pub industry: String,
}

impl SearchTarget {
    /// Create a target from untrimmed input.
    ///
    /// # Errors
    /// Returns error if either part is blank.
    pub fn new(town: &str, industry: &str) -> Result<Self, LeadScoutError> {
        let town = town.trim();
        let industry = industry.trim();
        if town.is_empty() || industry.is_empty() {
            return Err(LeadScoutError::Validation(
                "search target needs a non-empty town and industry".to_string(),
            ));
        }
        Ok(Self {
            town: town.to_string(),
            industry: industry.to_string(),
        })
    }
}

impl fmt::Display for SearchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.industry, self.town)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_valid() {
        let id = "550e8400-e29b-41d4-a716-446655440000";
        let session_id = SessionId::new(id).expect("valid session ID");
        assert_eq!(session_id.as_str(), id);
    }

    #[test]
    fn test_session_id_invalid() {
        let invalid_ids = vec![
            "not-a-uuid",
            "550e8400-e29b-51d4-a716-446655440000", // Wrong version
            "550e8400-e29b-41d4-x716-446655440000", // Invalid hex
            "",
        ];

        for id in invalid_ids {
            assert!(SessionId::new(id).is_err());
        }
    }

    #[test]
    fn test_session_id_generate() {
        let id1 = SessionId::generate();
        let id2 = SessionId::generate();
        assert_ne!(id1, id2);
        assert!(SessionId::new(id1.as_str()).is_ok());
    }

    #[test]
    fn test_session_status_round_trip_strings() {
        for status in [
            SessionStatus::Running,
            SessionStatus::Completed,
            SessionStatus::Stopped,
            SessionStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<SessionStatus>().ok(), Some(status));
        }
        assert!("Running".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn test_phone_normalization() {
        let cases = [
            ("+27 82 123 4567", "0821234567"),
            ("+27 (0) 82 123 4567", "0821234567"),
            ("+27 (0)12 345 6789", "0123456789"),
            ("27821234567", "0821234567"),
            ("082 123 4567", "0821234567"),
            ("(011) 555-0100", "0115550100"),
            ("821234567", "0821234567"),
            ("+44 20 7946 0958", "442079460958"),
        ];

        for (raw, expected) in cases {
            let phone = PhoneNumber::parse(raw).expect("valid phone");
            assert_eq!(phone.as_str(), expected, "for input {raw}");
        }
    }

    #[test]
    fn test_phone_invalid() {
        for raw in ["", "12345", "call us", "1234567890123456"] {
            assert!(PhoneNumber::parse(raw).is_err(), "should fail for: {raw}");
        }
    }

    #[test]
    fn test_phone_is_mobile() {
        assert!(PhoneNumber::parse("082 123 4567").unwrap().is_mobile());
        assert!(PhoneNumber::parse("0612345678").unwrap().is_mobile());
        assert!(!PhoneNumber::parse("011 555 0100").unwrap().is_mobile());
        assert!(PhoneNumber::parse("+27 (0) 82 123 4567").unwrap().is_mobile());
    }

    #[test]
    fn test_phone_serde() {
        let phone: PhoneNumber = serde_json::from_str("\"+27 72 000 1111\"").expect("deserialize");
        assert_eq!(phone.as_str(), "0720001111");
        assert_eq!(serde_json::to_string(&phone).unwrap(), "\"0720001111\"");
        assert!(serde_json::from_str::<PhoneNumber>("\"n/a\"").is_err());
    }

    #[test]
    fn test_provider_from_label() {
        assert_eq!(Provider::from_label("Network: VODACOM"), Some(Provider::Vodacom));
        assert_eq!(Provider::from_label("MTN (Pty) Ltd"), Some(Provider::Mtn));
        assert_eq!(Provider::from_label("Cell C Limited"), Some(Provider::CellC));
        assert_eq!(Provider::from_label("cellc"), Some(Provider::CellC));
        assert_eq!(Provider::from_label("Telkom Mobile"), Some(Provider::Telkom));
        assert_eq!(Provider::from_label("8ta"), Some(Provider::Telkom));
        assert_eq!(Provider::from_label("Rain"), Some(Provider::Rain));
        assert_eq!(Provider::from_label("Staff training portal"), None);
        assert_eq!(Provider::from_label("no result"), None);
    }

    #[test]
    fn test_provider_from_label_earliest_mention() {
        assert_eq!(
            Provider::from_label("Ported from Vodacom to MTN"),
            Some(Provider::Vodacom)
        );
        assert_eq!(
            Provider::from_label("Current network: MTN (originally Vodacom)"),
            Some(Provider::Mtn)
        );
        assert_eq!(
            Provider::from_label("Rain, previously Telkom"),
            Some(Provider::Rain)
        );
    }

    #[test]
    fn test_provider_stored_names() {
        for provider in [
            Provider::Vodacom,
            Provider::Mtn,
            Provider::CellC,
            Provider::Telkom,
            Provider::Rain,
            Provider::Other,
            Provider::Unknown,
        ] {
            assert_eq!(
                provider.display_name().parse::<Provider>().ok(),
                Some(provider)
            );
        }
        assert_eq!(serde_json::to_string(&Provider::CellC).unwrap(), "\"Cell C\"");
    }

    #[test]
    fn test_search_target() {
        let target = SearchTarget::new("  Pretoria ", "Plumbers").expect("valid target");
        assert_eq!(target.town, "Pretoria");
        assert_eq!(target.to_string(), "Plumbers in Pretoria");
        assert!(SearchTarget::new(" ", "Plumbers").is_err());
    }
}
