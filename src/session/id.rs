//! Transport session identifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Opaque identifier of a client session.
///
/// Issued by the transport when a connection opens (or a client calls the
/// session endpoint), independent of whether anyone has signed in. The ID is
/// the only thing tying a request to a signed-in user, so it is a random
/// v4 UUID. Displayed and serialized as `sess-` followed by 32 hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Allocate a fresh random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Rebuild an ID from a raw value. Tests only.
    pub fn from_raw(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sess-{}", self.0.simple())
    }
}

impl FromStr for SessionId {
    type Err = crate::error::RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("sess-")
            .filter(|hex| hex.len() == 32)
            .and_then(|hex| Uuid::try_parse(hex).ok())
            .map(SessionId)
            .ok_or_else(|| crate::error::RelayError::SessionNotFound(s.into()))
    }
}

impl Serialize for SessionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_uniqueness() {
        let ids: HashSet<_> = (0..10_000).map(|_| SessionId::new()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_ids_are_random_v4() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_eq!(a.as_uuid().get_version_num(), 4);

        // Consecutive IDs share no counter relationship
        let (x, y) = (a.as_uuid().as_u128(), b.as_uuid().as_u128());
        assert_ne!(x.wrapping_add(1), y);
        assert_ne!(y.wrapping_add(1), x);
    }

    #[test]
    fn test_display_format() {
        assert_eq!(
            SessionId::from_raw(255).to_string(),
            "sess-000000000000000000000000000000ff"
        );
        assert_eq!(SessionId::new().to_string().len(), 37);
    }

    #[test]
    fn test_parse_invalid() {
        assert!("000000ff".parse::<SessionId>().is_err());
        assert!("sess-000000ff".parse::<SessionId>().is_err());
        assert!("sess-gggggggggggggggggggggggggggggggg".parse::<SessionId>().is_err());
        assert!("sess-67e55044-10b1-426f-9247-bb680e5fe0c8".parse::<SessionId>().is_err());
        assert!("".parse::<SessionId>().is_err());
    }

    #[test]
    fn test_parse_display_agree() {
        let original = SessionId::new();
        let parsed: SessionId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_value(SessionId::from_raw(16)).unwrap();
        assert_eq!(
            json,
            serde_json::json!("sess-00000000000000000000000000000010")
        );

        let back: SessionId = serde_json::from_value(json).unwrap();
        assert_eq!(back, SessionId::from_raw(16));

        assert!(serde_json::from_value::<SessionId>(serde_json::json!("nope")).is_err());
    }
}
