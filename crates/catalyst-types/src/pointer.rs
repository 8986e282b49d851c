use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The closed set of deployable entity kinds.
///
/// Each type owns an independent pointer namespace: a scene and a profile may
/// both claim the pointer `"0,0"` without conflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Scene,
    Profile,
    Wearable,
}

impl EntityType {
    /// Every entity type, in a stable order.
    pub const ALL: [EntityType; 3] = [EntityType::Scene, EntityType::Profile, EntityType::Wearable];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Scene => "scene",
            EntityType::Profile => "profile",
            EntityType::Wearable => "wearable",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scene" => Ok(EntityType::Scene),
            "profile" => Ok(EntityType::Profile),
            "wearable" => Ok(EntityType::Wearable),
            other => Err(TypeError::UnknownEntityType(other.to_string())),
        }
    }
}

/// A logical address an entity claims, e.g. a parcel coordinate `"-3,12"`.
///
/// Pointers are case-insensitive. The constructor trims surrounding
/// whitespace and lower-cases the value, so two spellings of the same pointer
/// compare equal and hash to the same lock and storage key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pointer(String);

impl Pointer {
    /// Normalize and validate a pointer. Empty pointers are rejected.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, TypeError> {
        let normalized = raw.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            return Err(TypeError::InvalidPointer(raw.as_ref().to_string()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pointer({:?})", self.0)
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Pointer {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Pointer {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Pointer> for String {
    fn from(pointer: Pointer) -> Self {
        pointer.0
    }
}

impl AsRef<str> for Pointer {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn entity_type_roundtrip() {
        for ty in EntityType::ALL {
            assert_eq!(ty.to_string().parse::<EntityType>().unwrap(), ty);
        }
    }

    #[test]
    fn entity_type_parse_is_case_insensitive() {
        assert_eq!("SCENE".parse::<EntityType>().unwrap(), EntityType::Scene);
    }

    #[test]
    fn unknown_entity_type() {
        assert!(matches!(
            "emote".parse::<EntityType>(),
            Err(TypeError::UnknownEntityType(_))
        ));
    }

    #[test]
    fn entity_type_serde_is_lowercase() {
        let json = serde_json::to_string(&EntityType::Wearable).unwrap();
        assert_eq!(json, "\"wearable\"");
    }

    #[test]
    fn pointer_normalizes_case_and_whitespace() {
        let a = Pointer::new("  0,0 ").unwrap();
        let b = Pointer::new("0,0").unwrap();
        assert_eq!(a, b);
        assert_eq!(
            Pointer::new("0xABCdef").unwrap().as_str(),
            "0xabcdef"
        );
    }

    #[test]
    fn empty_pointer_rejected() {
        assert!(Pointer::new("").is_err());
        assert!(Pointer::new("   ").is_err());
    }

    #[test]
    fn pointer_deserialize_normalizes() {
        let p: Pointer = serde_json::from_str("\"-5,EAST\"").unwrap();
        assert_eq!(p.as_str(), "-5,east");
    }

    #[test]
    fn pointer_deserialize_rejects_empty() {
        let result: Result<Pointer, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(raw in "[ a-zA-Z0-9,\\-]{1,24}") {
            if let Ok(p) = Pointer::new(&raw) {
                let again = Pointer::new(p.as_str()).unwrap();
                prop_assert_eq!(again, p);
            }
        }

        #[test]
        fn case_variants_are_equal(raw in "[a-zA-Z0-9,]{1,24}") {
            let lower = Pointer::new(raw.to_lowercase()).unwrap();
            let upper = Pointer::new(raw.to_uppercase()).unwrap();
            prop_assert_eq!(lower, upper);
        }
    }
}
