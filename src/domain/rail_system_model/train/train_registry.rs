use std::collections::BTreeMap;

use crate::domain::rail_system_model::train::train::{PriorityClass, Train};
use crate::domain::rail_system_model::utils::id::TrainId;

#[derive(Debug, Clone, Default)]
pub struct TrainRegistry {
    trains: BTreeMap<TrainId, Train>,
}

impl TrainRegistry {
    pub fn new() -> Self {
        Self { trains: BTreeMap::new() }
    }

    /// Registers the train.
    ///
    /// # Returns
    /// `true` if the train was added or an identical definition was already present,
    /// `false` if a different train with the same id exists.
    pub fn add(&mut self, train: Train) -> bool {
        match self.trains.get(&train.id) {
            Some(existing) => existing == &train,
            None => {
                self.trains.insert(train.id.clone(), train);
                true
            }
        }
    }

    pub fn remove(&mut self, id: &TrainId) -> Option<Train> {
        self.trains.remove(id)
    }

    pub fn get(&self, id: &TrainId) -> Option<&Train> {
        self.trains.get(id)
    }

    pub fn contains(&self, id: &TrainId) -> bool {
        self.trains.contains_key(id)
    }

    pub fn set_priority(&mut self, id: &TrainId, priority_class: PriorityClass) -> bool {
        match self.trains.get_mut(id) {
            Some(train) => {
                train.priority_class = priority_class;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Train> {
        self.trains.values()
    }

    pub fn len(&self) -> usize {
        self.trains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trains.is_empty()
    }
}
