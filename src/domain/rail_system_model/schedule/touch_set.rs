use std::collections::BTreeSet;

use crate::domain::rail_system_model::utils::id::{ResourceId, TrainId};

/// Resources and trains written by a mutation (or by a scenario since its fork).
///
/// Two edits are compatible iff their touch sets are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TouchSet {
    pub resources: BTreeSet<ResourceId>,
    pub trains: BTreeSet<TrainId>,
}

impl TouchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch_resource(&mut self, id: &ResourceId) {
        if !self.resources.contains(id) {
            self.resources.insert(id.clone());
        }
    }

    pub fn touch_train(&mut self, id: &TrainId) {
        if !self.trains.contains(id) {
            self.trains.insert(id.clone());
        }
    }

    pub fn merge(&mut self, other: &TouchSet) {
        self.resources.extend(other.resources.iter().cloned());
        self.trains.extend(other.trains.iter().cloned());
    }

    pub fn intersects(&self, other: &TouchSet) -> bool {
        !self.resources.is_disjoint(&other.resources) || !self.trains.is_disjoint(&other.trains)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.trains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects_on_resource_or_train() {
        let mut a = TouchSet::new();
        a.touch_resource(&ResourceId::new("P1"));
        a.touch_train(&TrainId::new("T1"));

        let mut b = TouchSet::new();
        b.touch_resource(&ResourceId::new("P2"));
        assert!(!a.intersects(&b));

        b.touch_train(&TrainId::new("T1"));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&TouchSet::new()));
    }
}
