//! Node identity system using store-prefixed ULIDs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

/// Protocol prefix used for every node reference in a repository store
pub const STORE_PROTOCOL: &str = "workspace";

/// A unique reference to a node in the content repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef {
    ulid: Ulid,
}

impl NodeRef {
    /// Create a new, never-before-seen node reference
    pub fn new() -> Self {
        Self { ulid: Ulid::new() }
    }

    /// Get the ULID component
    pub fn ulid(&self) -> Ulid {
        self.ulid
    }

    /// Parse a NodeRef from a string
    pub fn parse(s: &str) -> Result<Self, NodeRefParseError> {
        s.parse()
    }
}

impl Default for NodeRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", STORE_PROTOCOL, self.ulid)
    }
}

impl FromStr for NodeRef {
    type Err = NodeRefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (protocol, ulid_str) = s
            .split_once("://")
            .ok_or_else(|| NodeRefParseError::MissingDelimiter(s.to_string()))?;

        if protocol != STORE_PROTOCOL {
            return Err(NodeRefParseError::InvalidProtocol(protocol.to_string()));
        }

        let ulid = Ulid::from_string(ulid_str)
            .map_err(|e| NodeRefParseError::InvalidUlid(ulid_str.to_string(), e.to_string()))?;

        Ok(Self { ulid })
    }
}

impl Serialize for NodeRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for NodeRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when parsing node references
#[derive(Debug, Error)]
pub enum NodeRefParseError {
    #[error("invalid store protocol: '{0}' (expected '{STORE_PROTOCOL}')")]
    InvalidProtocol(String),

    #[error("missing '://' delimiter in node reference: '{0}'")]
    MissingDelimiter(String),

    #[error("invalid ULID '{0}': {1}")]
    InvalidUlid(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_ref_generation() {
        let node = NodeRef::new();
        assert!(node.to_string().starts_with("workspace://"));
        assert_eq!(node.to_string().len(), 38); // workspace:// (12) + ULID (26)
    }

    #[test]
    fn test_node_ref_parsing() {
        let original = NodeRef::new();
        let parsed = NodeRef::parse(&original.to_string()).unwrap();
        assert_eq!(original, parsed);
        assert_eq!(parsed.ulid(), original.ulid());
    }

    #[test]
    fn test_node_ref_invalid_protocol() {
        let err = NodeRef::parse("archive://01HQ3K4N5M6P7R8S9T0VWXYZAB").unwrap_err();
        assert!(matches!(err, NodeRefParseError::InvalidProtocol(_)));
    }

    #[test]
    fn test_node_ref_missing_delimiter() {
        let err = NodeRef::parse("workspace01HQ3K4N5M6P7R8S9T0VWXYZAB").unwrap_err();
        assert!(matches!(err, NodeRefParseError::MissingDelimiter(_)));
    }

    #[test]
    fn test_node_ref_invalid_ulid() {
        let err = NodeRef::parse("workspace://notaulid").unwrap_err();
        assert!(matches!(err, NodeRefParseError::InvalidUlid(_, _)));
    }

    #[test]
    fn test_node_ref_serde_as_string() {
        let node = NodeRef::new();
        let yaml = serde_yml::to_string(&node).unwrap();
        assert!(yaml.contains("workspace://"));
        let back: NodeRef = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(node, back);
    }
}
