use std::cmp::Ordering;

use crate::domain::rail_system_model::block::block::Block;
use crate::domain::rail_system_model::train::train_registry::TrainRegistry;
use crate::domain::rail_system_model::train::train::PriorityClass;

/// Compares two blocks competing for the same resource.
///
/// Returns `Ordering::Less` if `a` wins (is served first):
/// 1. higher priority class,
/// 2. earlier original start,
/// 3. lower train id (lexicographic),
/// 4. lower block id.
///
/// Note: the last rule is only reached when one train holds two competing blocks. It keeps the
/// order strict, `Ordering::Equal` is returned for a block compared with itself only.
pub struct PrecedenceCompare<'a> {
    trains: &'a TrainRegistry,
}

impl<'a> PrecedenceCompare<'a> {
    pub fn new(trains: &'a TrainRegistry) -> Self {
        Self { trains }
    }

    pub fn compare(&self, a: &Block, b: &Block) -> Ordering {
        if a.id == b.id {
            return Ordering::Equal;
        }

        self.priority(b)
            .cmp(&self.priority(a))
            .then_with(|| a.original_start.cmp(&b.original_start))
            .then_with(|| a.train_id.cmp(&b.train_id))
            .then_with(|| a.id.cmp(&b.id))
    }

    /// Unknown trains rank lowest.
    fn priority(&self, block: &Block) -> Option<PriorityClass> {
        self.trains.get(&block.train_id).map(|train| train.priority_class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rail_system_model::block::block::{BlockId, BlockStatus};
    use crate::domain::rail_system_model::train::train::{Train, TrainClass};
    use crate::domain::rail_system_model::utils::id::{ResourceId, TrainId};
    use crate::domain::rail_system_model::utils::time::TimeInterval;

    fn block(id: u64, train: &str, start: i64) -> Block {
        Block {
            id: BlockId(id),
            train_id: TrainId::new(train),
            resource_id: ResourceId::new("P1"),
            interval: TimeInterval::new(start, start + 30),
            status: BlockStatus::Scheduled,
            source_version: 1,
            original_start: start,
            conflict_override: false,
        }
    }

    fn trains() -> TrainRegistry {
        let mut trains = TrainRegistry::new();
        trains.add(Train::new("A", TrainClass::Local, PriorityClass::Medium, 100.0, false));
        trains.add(Train::new("B", TrainClass::Local, PriorityClass::Medium, 100.0, false));
        trains.add(Train::new("X", TrainClass::Express, PriorityClass::High, 100.0, false));
        trains
    }

    #[test]
    fn test_priority_beats_start() {
        let trains = trains();
        let compare = PrecedenceCompare::new(&trains);

        assert_eq!(compare.compare(&block(1, "X", 100), &block(2, "A", 0)), Ordering::Less);
        assert_eq!(compare.compare(&block(2, "A", 0), &block(1, "X", 100)), Ordering::Greater);
    }

    #[test]
    fn test_equal_priority_and_start_is_strict() {
        let trains = trains();
        let compare = PrecedenceCompare::new(&trains);

        let mut blocks = vec![block(3, "B", 0), block(1, "B", 0), block(2, "A", 0)];
        blocks.sort_by(|a, b| compare.compare(a, b));

        let ids: Vec<u64> = blocks.iter().map(|b| b.id.0).collect();
        assert_eq!(ids, vec![2, 1, 3]);

        for a in &blocks {
            for b in &blocks {
                assert_eq!(compare.compare(a, b) == Ordering::Equal, a.id == b.id);
            }
        }
    }
}
