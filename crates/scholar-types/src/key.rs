use serde::{Deserialize, Serialize};

/// Normalized identifier of a cached entity, or of one field of an entity.
///
/// Ledger identifiers (addresses, usernames) are case-insensitive, so the
/// entity part is case-folded at construction. Two spellings of one
/// identifier always hash and compare equal. Field names are kept verbatim.
/// Entity and field are stored apart, so no identifier content can make two
/// distinct `(entity, field)` pairs collide.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "KeyParts")]
pub struct EntityKey {
    entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

#[derive(Deserialize)]
struct KeyParts {
    entity: String,
    #[serde(default)]
    field: Option<String>,
}

impl From<KeyParts> for EntityKey {
    fn from(parts: KeyParts) -> Self {
        match parts.field {
            Some(field) => Self::field(parts.entity, field),
            None => Self::new(parts.entity),
        }
    }
}

impl EntityKey {
    /// Key for a whole entity.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self {
            entity: raw.as_ref().to_lowercase(),
            field: None,
        }
    }

    /// Key for a single field of an entity.
    pub fn field(entity: impl AsRef<str>, field: impl AsRef<str>) -> Self {
        Self {
            entity: entity.as_ref().to_lowercase(),
            field: Some(field.as_ref().to_string()),
        }
    }

    /// The folded entity component, for field keys and entity keys alike.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn field_name(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Whether this key belongs to `entity` (the entity itself or one of
    /// its fields).
    pub fn belongs_to(&self, entity: &EntityKey) -> bool {
        self.entity == entity.entity
    }
}

impl From<&str> for EntityKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for EntityKey {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}[{}]", self.entity, field),
            None => f.write_str(&self.entity),
        }
    }
}
