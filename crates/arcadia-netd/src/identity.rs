//! Identity collaborator boundary.
//!
//! The server resolves an identity reference exactly once, at `auth`, and
//! never re-validates it per message.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("malformed identity reference: {0}")]
    Malformed(String),
    #[error("identity not found: {0}")]
    NotFound(String),
    #[error("invalid identity seed: {0}")]
    Seed(#[from] serde_json::Error),
}

/// Resolves an identity reference to a display name.
pub trait IdentityResolver: Send + Sync {
    fn resolve_identity(&self, identity_ref: &str) -> Result<String, IdentityError>;
}

/// Split `did:<method>:<id>` into method and method-specific id.
pub fn parse_did(identity_ref: &str) -> Result<(&str, &str), IdentityError> {
    let malformed = || IdentityError::Malformed(identity_ref.to_string());

    let rest = identity_ref.strip_prefix("did:").ok_or_else(malformed)?;
    let (method, id) = rest.split_once(':').ok_or_else(malformed)?;
    let method_ok = !method.is_empty()
        && method
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !method_ok || id.is_empty() || id.chars().any(char::is_whitespace) {
        return Err(malformed());
    }
    Ok((method, id))
}

/// `Player_` followed by the last eight characters of the reference.
pub fn default_display_name(identity_ref: &str) -> String {
    let mut tail: Vec<char> = identity_ref.chars().rev().take(8).collect();
    tail.reverse();
    format!("Player_{}", tail.into_iter().collect::<String>())
}

/// A registered identity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityDocument {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// In-memory identity store. Only registered identities resolve.
#[derive(Debug, Default)]
pub struct DidRegistry {
    docs: DashMap<String, IdentityDocument>,
}

impl DidRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a JSON array of identity documents.
    ///
    /// Every document id must be a well-formed DID; the first bad one fails
    /// the whole load.
    pub fn from_json(json: &str) -> Result<Self, IdentityError> {
        let docs: Vec<IdentityDocument> = serde_json::from_str(json)?;
        let registry = Self::new();
        for doc in docs {
            parse_did(&doc.id)?;
            registry.docs.insert(doc.id.clone(), doc);
        }
        Ok(registry)
    }

    /// Register an identity, replacing any previous document with the same id.
    pub fn register(
        &self,
        identity_ref: &str,
        display_name: Option<String>,
    ) -> Result<(), IdentityError> {
        parse_did(identity_ref)?;
        self.docs.insert(
            identity_ref.to_string(),
            IdentityDocument {
                id: identity_ref.to_string(),
                display_name,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    pub fn remove(&self, identity_ref: &str) -> Option<IdentityDocument> {
        self.docs.remove(identity_ref).map(|(_, doc)| doc)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl IdentityResolver for DidRegistry {
    fn resolve_identity(&self, identity_ref: &str) -> Result<String, IdentityError> {
        let doc = self
            .docs
            .get(identity_ref)
            .ok_or_else(|| IdentityError::NotFound(identity_ref.to_string()))?;
        Ok(doc
            .display_name
            .clone()
            .unwrap_or_else(|| default_display_name(identity_ref)))
    }
}

/// Accepts any syntactically valid DID. Used when no registry is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DidSyntaxResolver;

impl IdentityResolver for DidSyntaxResolver {
    fn resolve_identity(&self, identity_ref: &str) -> Result<String, IdentityError> {
        parse_did(identity_ref)?;
        Ok(default_display_name(identity_ref))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_method_and_id() {
        assert_eq!(
            parse_did("did:player:game1:abc").unwrap(),
            ("player", "game1:abc")
        );
        assert!(parse_did("player:abc").is_err());
        assert!(parse_did("did::abc").is_err());
        assert!(parse_did("did:Key:abc").is_err());
        assert!(parse_did("did:key:").is_err());
        assert!(parse_did("did:key:a b").is_err());
    }

    #[test]
    fn display_name_uses_reference_tail() {
        assert_eq!(
            default_display_name("did:player:default:1234abcd"),
            "Player_1234abcd"
        );
        assert_eq!(default_display_name("did:x:ab"), "Player_did:x:ab");
    }

    #[test]
    fn registry_resolves_only_registered_identities() {
        let registry = DidRegistry::new();
        registry
            .register("did:example:alice", Some("Alice".into()))
            .unwrap();
        registry.register("did:example:bob12345", None).unwrap();

        assert_eq!(registry.resolve_identity("did:example:alice").unwrap(), "Alice");
        assert_eq!(
            registry.resolve_identity("did:example:bob12345").unwrap(),
            "Player_bob12345"
        );
        assert!(matches!(
            registry.resolve_identity("did:example:carol"),
            Err(IdentityError::NotFound(_))
        ));

        registry.remove("did:example:alice");
        assert!(registry.resolve_identity("did:example:alice").is_err());
    }

    #[test]
    fn registry_refuses_malformed_references() {
        let registry = DidRegistry::new();
        assert!(matches!(
            registry.register("alice", None),
            Err(IdentityError::Malformed(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn registry_loads_from_json() {
        let registry = DidRegistry::from_json(
            r#"[{"id":"did:example:alice","displayName":"Alice"},{"id":"did:example:bob"}]"#,
        )
        .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve_identity("did:example:alice").unwrap(), "Alice");
    }

    #[test]
    fn seed_with_malformed_id_is_rejected() {
        let err = DidRegistry::from_json(
            r#"[{"id":"did:example:alice"},{"id":"alice-without-method"}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, IdentityError::Malformed(id) if id == "alice-without-method"));

        let err = DidRegistry::from_json("{not json").unwrap_err();
        assert!(matches!(err, IdentityError::Seed(_)));
    }

    #[test]
    fn syntax_resolver_accepts_any_well_formed_did() {
        let resolver = DidSyntaxResolver;
        assert_eq!(
            resolver.resolve_identity("did:key:z6Mkabcdefgh").unwrap(),
            "Player_abcdefgh"
        );
        assert!(resolver.resolve_identity("not-a-did").is_err());
    }
}
