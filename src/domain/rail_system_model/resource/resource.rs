use serde::{Deserialize, Serialize};

use crate::domain::rail_system_model::utils::id::ResourceId;

/// Kind of infrastructure a block occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Platform,
    Track,
}

/// Operational availability of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    Available,

    /// Locked by an operator. No new block may be placed here and existing blocks are reported as conflicts.
    Maintenance,
}

/// A track or platform together with its static constraints.
///
/// Resources are defined at network configuration time and only change through an explicit admin
/// update on the `IntervalStore`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub id: ResourceId,
    pub kind: ResourceKind,

    /// Longest train (in meters) the resource can hold.
    pub length_capacity_meters: f64,

    /// Overhead line available.
    pub electrified: bool,

    /// Step-free access for passengers.
    pub accessible: bool,

    pub status: ResourceStatus,
}

impl Resource {
    pub fn new(id: ResourceId, kind: ResourceKind, length_capacity_meters: f64, electrified: bool, accessible: bool) -> Self {
        Resource { id, kind, length_capacity_meters, electrified, accessible, status: ResourceStatus::Available }
    }

    pub fn platform(id: impl Into<String>, length_capacity_meters: f64, electrified: bool, accessible: bool) -> Self {
        Resource::new(ResourceId::new(id), ResourceKind::Platform, length_capacity_meters, electrified, accessible)
    }

    pub fn track(id: impl Into<String>, length_capacity_meters: f64, electrified: bool) -> Self {
        Resource::new(ResourceId::new(id), ResourceKind::Track, length_capacity_meters, electrified, false)
    }

    pub fn is_available(&self) -> bool {
        self.status == ResourceStatus::Available
    }
}
