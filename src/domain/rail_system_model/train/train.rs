use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::rail_system_model::utils::id::TrainId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainClass {
    Express,
    Local,
    Freight,
}

/// Dispatching priority. The declaration order is the ranking order: `High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityClass {
    Low,
    Medium,
    High,
}

impl fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorityClass::Low => write!(f, "low"),
            PriorityClass::Medium => write!(f, "medium"),
            PriorityClass::High => write!(f, "high"),
        }
    }
}

/// A train as known to the scheduler: identity, dispatching priority and the physical properties
/// that the constraint validator checks against a resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Train {
    pub id: TrainId,
    pub class: TrainClass,
    pub priority_class: PriorityClass,
    pub length_meters: f64,
    pub requires_electrification: bool,
    pub requires_accessibility: bool,
}

impl Train {
    pub fn new(id: impl Into<String>, class: TrainClass, priority_class: PriorityClass, length_meters: f64, requires_electrification: bool) -> Self {
        Train { id: TrainId::new(id), class, priority_class, length_meters, requires_electrification, requires_accessibility: false }
    }

    pub fn with_accessibility(mut self, requires_accessibility: bool) -> Self {
        self.requires_accessibility = requires_accessibility;
        self
    }
}
