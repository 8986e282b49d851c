use std::fmt;

use catalyst_types::{Entity, EntityType, Pointer, SignerAddress};
use serde::{Deserialize, Serialize};

/// Coordinates of the parcel grid extend from `-limit` to `+limit` on both axes.
pub const DEFAULT_PARCEL_LIMIT: u16 = 150;

/// Source of access-control rules and per-type structural schema.
///
/// The gate calls into this seam but does not own the rules. A node may
/// swap in a policy backed by an on-chain registry or a remote service.
pub trait ValidationPolicy: Send + Sync {
    /// Whether `signer` may claim `pointer` for an entity of `entity_type`.
    fn can_write(&self, signer: &SignerAddress, entity_type: EntityType, pointer: &Pointer) -> bool;

    /// Type-specific structural checks. `Err` carries a human-readable reason.
    fn check_structure(&self, entity: &Entity) -> Result<(), String>;
}

// ---------------------------------------------------------------------------
// Parcel
// ---------------------------------------------------------------------------

/// A coordinate on the parcel grid, written as the pointer `"x,y"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Parcel {
    pub x: i32,
    pub y: i32,
}

impl Parcel {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Parse a parcel pointer. Returns `None` for anything not `"x,y"`.
    pub fn parse(pointer: &Pointer) -> Option<Self> {
        let (x, y) = pointer.as_str().split_once(',')?;
        Some(Self {
            x: x.trim().parse().ok()?,
            y: y.trim().parse().ok()?,
        })
    }

    /// Whether this parcel lies in the rectangle spanned by `min` and `max`.
    pub fn within(&self, min: &Parcel, max: &Parcel) -> bool {
        (min.x..=max.x).contains(&self.x) && (min.y..=max.y).contains(&self.y)
    }
}

impl fmt::Display for Parcel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Access rules
// ---------------------------------------------------------------------------

/// A single grant. A pointer is writable if any rule for its type grants it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum AccessRule {
    /// Anyone may write any pointer.
    Open,
    /// A signer may write only the pointer equal to its own address.
    OwnAddress,
    /// `grantee` may write every parcel in the rectangle `min..=max`.
    Parcels {
        grantee: SignerAddress,
        min: Parcel,
        max: Parcel,
    },
    /// `grantee` may write exactly the listed pointers.
    Pointers {
        grantee: SignerAddress,
        pointers: Vec<Pointer>,
    },
}

impl AccessRule {
    pub fn grants(&self, signer: &SignerAddress, pointer: &Pointer) -> bool {
        match self {
            AccessRule::Open => true,
            AccessRule::OwnAddress => pointer.as_str() == signer.to_hex(),
            AccessRule::Parcels { grantee, min, max } => {
                grantee == signer
                    && Parcel::parse(pointer).is_some_and(|parcel| parcel.within(min, max))
            }
            AccessRule::Pointers { grantee, pointers } => {
                grantee == signer && pointers.contains(pointer)
            }
        }
    }
}

/// Access rules per entity type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessPolicy {
    pub scene: Vec<AccessRule>,
    pub profile: Vec<AccessRule>,
    pub wearable: Vec<AccessRule>,
}

impl AccessPolicy {
    pub fn rules(&self, entity_type: EntityType) -> &[AccessRule] {
        match entity_type {
            EntityType::Scene => &self.scene,
            EntityType::Profile => &self.profile,
            EntityType::Wearable => &self.wearable,
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            scene: vec![AccessRule::Open],
            profile: vec![AccessRule::OwnAddress],
            wearable: vec![AccessRule::Open],
        }
    }
}

/// Serializable configuration for [`RulePolicy`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub access: AccessPolicy,
    /// Bound on parcel coordinates for scene pointers.
    pub parcel_limit: u16,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            access: AccessPolicy::default(),
            parcel_limit: DEFAULT_PARCEL_LIMIT,
        }
    }
}

// ---------------------------------------------------------------------------
// RulePolicy
// ---------------------------------------------------------------------------

/// The built-in [`ValidationPolicy`], driven by a [`PolicyConfig`].
///
/// Structural rules:
/// - scene: every pointer is a parcel within the configured limit
/// - profile: exactly one pointer
/// - wearable: metadata is an object with a non-empty string `name`
#[derive(Clone, Debug, Default)]
pub struct RulePolicy {
    config: PolicyConfig,
}

impl RulePolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    fn check_scene(&self, entity: &Entity) -> Result<(), String> {
        let limit = i32::from(self.config.parcel_limit);
        let min = Parcel::new(-limit, -limit);
        let max = Parcel::new(limit, limit);
        for pointer in &entity.pointers {
            match Parcel::parse(pointer) {
                Some(parcel) if parcel.within(&min, &max) => {}
                Some(parcel) => {
                    return Err(format!("parcel {parcel} is outside the ±{limit} grid"));
                }
                None => return Err(format!("scene pointer '{pointer}' is not a parcel 'x,y'")),
            }
        }
        Ok(())
    }

    fn check_profile(entity: &Entity) -> Result<(), String> {
        if entity.pointers.len() != 1 {
            return Err(format!(
                "a profile must claim exactly one pointer, got {}",
                entity.pointers.len()
            ));
        }
        Ok(())
    }

    fn check_wearable(entity: &Entity) -> Result<(), String> {
        let name = entity
            .metadata
            .as_ref()
            .and_then(|m| m.as_object())
            .and_then(|m| m.get("name"))
            .and_then(|n| n.as_str());
        match name {
            Some(name) if !name.trim().is_empty() => Ok(()),
            _ => Err("wearable metadata must be an object with a non-empty 'name'".into()),
        }
    }
}

impl ValidationPolicy for RulePolicy {
    fn can_write(&self, signer: &SignerAddress, entity_type: EntityType, pointer: &Pointer) -> bool {
        self.config
            .access
            .rules(entity_type)
            .iter()
            .any(|rule| rule.grants(signer, pointer))
    }

    fn check_structure(&self, entity: &Entity) -> Result<(), String> {
        match entity.entity_type {
            EntityType::Scene => self.check_scene(entity),
            EntityType::Profile => Self::check_profile(entity),
            EntityType::Wearable => Self::check_wearable(entity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalyst_types::{ContentHash, Timestamp};

    fn signer(n: u8) -> SignerAddress {
        SignerAddress::from_bytes([n; 32])
    }

    fn ptr(s: &str) -> Pointer {
        Pointer::new(s).unwrap()
    }

    fn entity(entity_type: EntityType, pointers: &[&str], metadata: Option<serde_json::Value>) -> Entity {
        Entity {
            id: ContentHash::from_hash([1; 32]),
            entity_type,
            pointers: pointers.iter().map(|p| ptr(p)).collect(),
            timestamp: Timestamp::from_millis(1),
            content: vec![],
            metadata,
        }
    }

    #[test]
    fn parcel_parse() {
        assert_eq!(Parcel::parse(&ptr("-3, 12")), Some(Parcel::new(-3, 12)));
        assert_eq!(Parcel::parse(&ptr("a,b")), None);
        assert_eq!(Parcel::parse(&ptr("1")), None);
    }

    #[test]
    fn default_scene_access_is_open() {
        let policy = RulePolicy::default();
        assert!(policy.can_write(&signer(1), EntityType::Scene, &ptr("0,0")));
    }

    #[test]
    fn profile_requires_own_address() {
        let policy = RulePolicy::default();
        let me = signer(7);
        assert!(policy.can_write(&me, EntityType::Profile, &ptr(&me.to_hex())));
        assert!(!policy.can_write(&me, EntityType::Profile, &ptr(&signer(8).to_hex())));
    }

    #[test]
    fn own_address_matches_uppercase_pointer() {
        let policy = RulePolicy::default();
        let me = signer(0xab);
        let upper = me.to_hex().to_uppercase();
        assert!(policy.can_write(&me, EntityType::Profile, &ptr(&upper)));
    }

    #[test]
    fn parcel_grant() {
        let owner = signer(1);
        let config = PolicyConfig {
            access: AccessPolicy {
                scene: vec![AccessRule::Parcels {
                    grantee: owner,
                    min: Parcel::new(0, 0),
                    max: Parcel::new(2, 2),
                }],
                ..Default::default()
            },
            ..Default::default()
        };
        let policy = RulePolicy::new(config);
        assert!(policy.can_write(&owner, EntityType::Scene, &ptr("1,2")));
        assert!(!policy.can_write(&owner, EntityType::Scene, &ptr("3,0")));
        assert!(!policy.can_write(&signer(2), EntityType::Scene, &ptr("1,1")));
    }

    #[test]
    fn pointer_grant() {
        let owner = signer(1);
        let rule = AccessRule::Pointers {
            grantee: owner,
            pointers: vec![ptr("urn:hat")],
        };
        assert!(rule.grants(&owner, &ptr("URN:HAT")));
        assert!(!rule.grants(&owner, &ptr("urn:shoe")));
    }

    #[test]
    fn scene_structure() {
        let policy = RulePolicy::default();
        assert!(policy
            .check_structure(&entity(EntityType::Scene, &["0,0", "150,-150"], None))
            .is_ok());
        assert!(policy
            .check_structure(&entity(EntityType::Scene, &["151,0"], None))
            .is_err());
        assert!(policy
            .check_structure(&entity(EntityType::Scene, &["plaza"], None))
            .is_err());
    }

    #[test]
    fn profile_structure() {
        let policy = RulePolicy::default();
        assert!(policy
            .check_structure(&entity(EntityType::Profile, &["0xaa"], None))
            .is_ok());
        assert!(policy
            .check_structure(&entity(EntityType::Profile, &["0xaa", "0xbb"], None))
            .is_err());
    }

    #[test]
    fn wearable_structure() {
        let policy = RulePolicy::default();
        let named = serde_json::json!({"name": "Top Hat"});
        assert!(policy
            .check_structure(&entity(EntityType::Wearable, &["urn:hat"], Some(named)))
            .is_ok());
        let blank = serde_json::json!({"name": "  "});
        assert!(policy
            .check_structure(&entity(EntityType::Wearable, &["urn:hat"], Some(blank)))
            .is_err());
        assert!(policy
            .check_structure(&entity(EntityType::Wearable, &["urn:hat"], None))
            .is_err());
    }

    #[test]
    fn policy_config_from_json() {
        let json = format!(
            r#"{{"access": {{"scene": [{{"rule": "parcels", "grantee": "{}", "min": {{"x": 0, "y": 0}}, "max": {{"x": 1, "y": 1}}}}]}}}}"#,
            signer(3).to_hex()
        );
        let config: PolicyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.parcel_limit, DEFAULT_PARCEL_LIMIT);
        assert_eq!(config.access.profile, vec![AccessRule::OwnAddress]);
        assert!(matches!(config.access.scene[0], AccessRule::Parcels { .. }));
    }

    #[test]
    fn widest_parcel_limit_stays_in_range() {
        let policy = RulePolicy::new(PolicyConfig {
            parcel_limit: u16::MAX,
            ..PolicyConfig::default()
        });
        let edge = entity(EntityType::Scene, &["65535,-65535"], None);
        let beyond = entity(EntityType::Scene, &["65536,0"], None);
        assert!(policy.check_structure(&edge).is_ok());
        assert!(policy.check_structure(&beyond).is_err());
    }

    #[test]
    fn negative_parcel_limit_is_rejected() {
        let parsed = serde_json::from_str::<PolicyConfig>(r#"{"parcel_limit": -2147483648}"#);
        assert!(parsed.is_err());
    }
}
