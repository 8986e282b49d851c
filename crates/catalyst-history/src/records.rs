use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use catalyst_crypto::Signature;
use catalyst_types::{EntityId, EntityType, Pointer, SignerAddress, Timestamp};
use serde::{Deserialize, Serialize};

/// Pointer tables of every type at one instant.
pub type ActiveEntities = BTreeMap<EntityType, BTreeMap<Pointer, EntityId>>;

/// Who deployed an entity, and when it was committed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditInfo {
    pub deployed_timestamp: Timestamp,
    pub signer: SignerAddress,
    pub signature: Signature,
}

/// One entry in the deployment history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistoryEvent {
    /// A committed deployment.
    Deployment {
        timestamp: Timestamp,
        entity_type: EntityType,
        entity_id: EntityId,
    },
    /// The full pointer state at `timestamp`.
    Snapshot {
        timestamp: Timestamp,
        active_entities: ActiveEntities,
        /// Merkle root over the deployment events since the previous snapshot.
        delta_events_hash: EntityId,
        previous_snapshot_timestamp: Option<Timestamp>,
    },
}

impl HistoryEvent {
    pub fn timestamp(&self) -> Timestamp {
        match self {
            HistoryEvent::Deployment { timestamp, .. } => *timestamp,
            HistoryEvent::Snapshot { timestamp, .. } => *timestamp,
        }
    }

    pub fn kind(&self) -> HistoryType {
        match self {
            HistoryEvent::Deployment { .. } => HistoryType::Deployment,
            HistoryEvent::Snapshot { .. } => HistoryType::Snapshot,
        }
    }

    /// Storage key: zero-padded timestamp, so keys sort chronologically.
    pub fn storage_key(&self) -> String {
        match self {
            HistoryEvent::Deployment {
                timestamp,
                entity_id,
                ..
            } => format!("{:020}-deployment-{}", timestamp.as_millis(), entity_id.to_hex()),
            HistoryEvent::Snapshot { timestamp, .. } => {
                format!("{:020}-snapshot", timestamp.as_millis())
            }
        }
    }
}

/// Discriminant of [`HistoryEvent`], used for filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryType {
    Deployment,
    Snapshot,
}

impl HistoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryType::Deployment => "deployment",
            HistoryType::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for HistoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deployment" => Ok(HistoryType::Deployment),
            "snapshot" => Ok(HistoryType::Snapshot),
            other => Err(format!("unknown history type: {other}")),
        }
    }
}

/// Filter for history reads. Both bounds are inclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub kind: Option<HistoryType>,
}

impl HistoryQuery {
    /// A query matching every event.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from(mut self, from: Timestamp) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: Timestamp) -> Self {
        self.to = Some(to);
        self
    }

    pub fn kind(mut self, kind: HistoryType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn matches(&self, event: &HistoryEvent) -> bool {
        let ts = event.timestamp();
        self.from.map_or(true, |from| ts >= from)
            && self.to.map_or(true, |to| ts <= to)
            && self.kind.map_or(true, |kind| event.kind() == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalyst_types::ContentHash;

    fn deployment(ts: u64) -> HistoryEvent {
        HistoryEvent::Deployment {
            timestamp: Timestamp::from_millis(ts),
            entity_type: EntityType::Scene,
            entity_id: ContentHash::from_hash([1; 32]),
        }
    }

    #[test]
    fn storage_keys_sort_by_timestamp() {
        let early = deployment(9).storage_key();
        let late = deployment(10).storage_key();
        assert!(early < late);
        assert!(early.starts_with("00000000000000000009-deployment-"));
    }

    #[test]
    fn query_bounds_are_inclusive() {
        let q = HistoryQuery::all()
            .from(Timestamp::from_millis(10))
            .to(Timestamp::from_millis(20));
        assert!(!q.matches(&deployment(9)));
        assert!(q.matches(&deployment(10)));
        assert!(q.matches(&deployment(20)));
        assert!(!q.matches(&deployment(21)));
    }

    #[test]
    fn query_filters_by_kind() {
        let q = HistoryQuery::all().kind(HistoryType::Snapshot);
        assert!(!q.matches(&deployment(1)));
        assert!(HistoryQuery::all().matches(&deployment(1)));
    }

    #[test]
    fn event_json_is_tagged() {
        let json = serde_json::to_value(deployment(5)).unwrap();
        assert_eq!(json["kind"], "deployment");
        assert_eq!(json["entity_type"], "scene");
        assert_eq!(json["timestamp"], 5);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut scene = BTreeMap::new();
        scene.insert(Pointer::new("0,0").unwrap(), ContentHash::from_hash([2; 32]));
        let snapshot = HistoryEvent::Snapshot {
            timestamp: Timestamp::from_millis(7),
            active_entities: BTreeMap::from([(EntityType::Scene, scene)]),
            delta_events_hash: ContentHash::ZERO,
            previous_snapshot_timestamp: None,
        };
        let bytes = serde_json::to_vec(&snapshot).unwrap();
        let back: HistoryEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, snapshot);
        assert_eq!(back.kind(), HistoryType::Snapshot);
    }

    #[test]
    fn history_type_parses() {
        assert_eq!("Snapshot".parse::<HistoryType>(), Ok(HistoryType::Snapshot));
        assert!("other".parse::<HistoryType>().is_err());
    }
}
