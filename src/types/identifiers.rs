//! Identifier types for the border crossing simulator
//!
//! Cars and service nodes carry compact, human-readable identifiers that encode
//! the lane they belong to. Simulation runs are identified by UUID.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a car within one border crossing
///
/// Rendered as `q{queue}_c{seq}`. `seq` is assigned sequentially per queue,
/// so the pair is unique across the whole crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CarId {
    /// Index of the queue the car was admitted to
    pub queue: usize,
    /// Sequence number within that queue
    pub seq: u64,
}

impl CarId {
    /// Create a car identifier
    pub fn new(queue: usize, seq: u64) -> Self {
        Self { queue, seq }
    }
}

impl fmt::Display for CarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}_c{}", self.queue, self.seq)
    }
}

impl FromStr for CarId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (queue, seq) = parse_pair(s, "c").ok_or_else(|| format!("Invalid car id: {}", s))?;
        Ok(CarId { queue, seq: seq as u64 })
    }
}

impl Serialize for CarId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CarId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier for a service node (inspection booth)
///
/// Rendered as `q{queue}_n{slot}`, where `slot` is the booth's index within
/// its lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    /// Index of the queue the node serves
    pub queue: usize,
    /// Position of the node within its queue
    pub slot: usize,
}

impl NodeId {
    /// Create a node identifier
    pub fn new(queue: usize, slot: usize) -> Self {
        Self { queue, slot }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}_n{}", self.queue, self.slot)
    }
}

impl FromStr for NodeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (queue, slot) =
            parse_pair(s, "n").ok_or_else(|| format!("Invalid node id: {}", s))?;
        Ok(NodeId { queue, slot })
    }
}

impl Serialize for NodeId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// "q{a}_{tag}{b}"
fn parse_pair(s: &str, tag: &str) -> Option<(usize, usize)> {
    let rest = s.strip_prefix('q')?;
    let (queue, tail) = rest.split_once('_')?;
    let index = tail.strip_prefix(tag)?;
    Some((queue.parse().ok()?, index.parse().ok()?))
}

/// Unique identifier for a simulation run held in a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimulationId(pub Uuid);

impl SimulationId {
    /// Create a new random simulation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SimulationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SimulationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SIM_{}", self.0.simple())
    }
}

impl Serialize for SimulationId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("SIM_{}", self.0.simple()))
    }
}

impl<'de> Deserialize<'de> for SimulationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let raw = s.strip_prefix("SIM_").unwrap_or(&s);
        let uuid = Uuid::parse_str(raw).map_err(serde::de::Error::custom)?;
        Ok(SimulationId(uuid))
    }
}
