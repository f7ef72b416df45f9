//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout the lifecycle
//! service. Each identifier is a distinct type - you cannot pass a
//! [`CategoryId`] where a [`ProductId`] is expected.
//!
//! ## Validation
//!
//! String-based identifiers ([`ActorId`], [`Sku`]) validate format at
//! construction time. UUID-based identifiers ([`ProductId`],
//! [`AuditEventId`]) are always valid by construction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Deserialize a string newtype through its validating `new()` constructor
/// so that invalid values are rejected at deserialization time.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// UUID-based identifiers (always valid by construction)
// ---------------------------------------------------------------------------

/// Opaque identifier of a product (the lifecycle entity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(Uuid);

impl ProductId {
    /// Create a new random product identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a product identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ProductId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProductId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

/// Identifier of one audit event. Appends are idempotent on this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AuditEventId(Uuid);

impl AuditEventId {
    /// Create a new random audit event identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an audit event identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AuditEventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AuditEventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Integer identifiers
// ---------------------------------------------------------------------------

/// Identifier of a product category owned by the product catalogue service.
///
/// Accepts either a JSON integer or a numeric string on input, since the
/// admin UI submits select-box values as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CategoryId(i64);

impl CategoryId {
    /// Create a category identifier, rejecting zero and negative values.
    pub fn new(id: i64) -> Result<Self, ValidationError> {
        if id <= 0 {
            return Err(ValidationError::InvalidCategoryId(id));
        }
        Ok(Self(id))
    }

    /// The raw integer value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for CategoryId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Str(String),
        }

        let id = match Raw::deserialize(deserializer)? {
            Raw::Int(n) => n,
            Raw::Str(s) => s.trim().parse::<i64>().map_err(|_| {
                serde::de::Error::custom(format!("invalid category id: \"{s}\""))
            })?,
        };
        Self::new(id).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// String-based identifiers (validated at construction)
// ---------------------------------------------------------------------------

/// Identifier of an authenticated principal as issued by the identity provider.
///
/// # Validation
///
/// - 1 to 128 characters (Unicode scalar values) after trimming
/// - No `:` (reserved by the bearer token format) and no whitespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ActorId(String);

impl_validating_deserialize!(ActorId);

impl ActorId {
    /// Maximum length of an actor identifier.
    pub const MAX_LEN: usize = 128;

    /// Create an actor identifier, validating format.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let trimmed = s.trim();
        if trimmed.is_empty()
            || trimmed.chars().count() > Self::MAX_LEN
            || trimmed.chars().any(|c| c == ':' || c.is_whitespace())
        {
            return Err(ValidationError::InvalidActorId(s));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stock keeping unit assigned to a product at creation.
///
/// Format: `PRD-` followed by the 32 uppercase hex digits of the product
/// identifier, via [`Sku::for_product`]. The mapping is one-to-one, so SKUs
/// are unique exactly when product ids are.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Sku(String);

impl_validating_deserialize!(Sku);

impl Sku {
    const PREFIX: &'static str = "PRD-";
    const HEX_LEN: usize = 32;

    /// Parse a SKU string, validating format.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let valid = s
            .strip_prefix(Self::PREFIX)
            .map(|rest| {
                rest.len() == Self::HEX_LEN
                    && rest
                        .chars()
                        .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
            })
            .unwrap_or(false);
        if !valid {
            return Err(ValidationError::InvalidSku(s));
        }
        Ok(Self(s))
    }

    /// Derive the SKU for a product from its identifier.
    pub fn for_product(id: &ProductId) -> Self {
        let hex = id.as_uuid().simple().to_string();
        Self(format!("{}{}", Self::PREFIX, hex.to_ascii_uppercase()))
    }

    /// Access the SKU string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Sku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
