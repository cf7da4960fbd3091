// src/models/id.rs
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque document identifier, rendered as 32 lowercase hex characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(Uuid);

impl Id {
    pub fn new() -> Self {
        Id(Uuid::new_v4())
    }

    // The all-zero id is how clients spell "no team"
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    pub fn as_hex(&self) -> String {
        self.0.simple().to_string()
    }

    /// Parses an optional reference where an empty string or the nil id mean "none".
    pub fn parse_optional(raw: &str) -> Result<Option<Id>, IdParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let id: Id = trimmed.parse()?;
        Ok(if id.is_nil() { None } else { Some(id) })
    }
}

impl Default for Id {
    fn default() -> Self {
        Id::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdParseError(pub String);

impl fmt::Display for IdParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid id: {}", self.0)
    }
}

impl std::error::Error for IdParseError {}

impl FromStr for Id {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Placeholder values some clients send instead of omitting the id
        if s == "undefined" || s == "null" {
            return Err(IdParseError(s.to_string()));
        }
        Uuid::parse_str(s).map(Id).map_err(|_| IdParseError(s.to_string()))
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_hex())
    }
}

struct IdVisitor;

impl<'de> Visitor<'de> for IdVisitor {
    type Value = Id;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a hex document id")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Id, E> {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(IdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_form_round_trips() {
        let id = Id::new();
        let hex = id.to_string();
        assert_eq!(hex.len(), 32);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(hex.parse::<Id>().unwrap(), id);
    }

    #[test]
    fn hyphenated_form_is_accepted() {
        let id: Id = "67e55044-10b1-426f-9247-bb680e5fe0c8".parse().unwrap();
        assert_eq!(id.to_string(), "67e5504410b1426f9247bb680e5fe0c8");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!("not-an-id".parse::<Id>().is_err());
        assert!("undefined".parse::<Id>().is_err());
        assert!("".parse::<Id>().is_err());
    }

    #[test]
    fn optional_reference_treats_zero_as_none() {
        assert_eq!(Id::parse_optional("").unwrap(), None);
        assert_eq!(Id::parse_optional("00000000000000000000000000000000").unwrap(), None);
        let id = Id::new();
        assert_eq!(Id::parse_optional(&id.to_string()).unwrap(), Some(id));
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = Id::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: Id = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
