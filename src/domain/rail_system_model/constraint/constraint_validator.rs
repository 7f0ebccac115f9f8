use crate::domain::rail_system_model::block::block::BlockId;
use crate::domain::rail_system_model::block::resource_timeline::ResourceTimeline;
use crate::domain::rail_system_model::constraint::constraint_violation::ConstraintViolation;
use crate::domain::rail_system_model::resource::resource::Resource;
use crate::domain::rail_system_model::train::train::Train;
use crate::domain::rail_system_model::utils::time::{Minutes, TimeInterval};

/// Pure predicates deciding whether a train may occupy a resource.
///
/// Called by the schedule before every mutation. The only way around it is the audited
/// `allow_conflict` override, which still records every violation returned here.
pub struct ConstraintValidator;

impl ConstraintValidator {
    /// Checks the static requirements of `train` against `resource`.
    ///
    /// Returns the first violated rule in the order: availability, length, electrification, accessibility.
    pub fn validate(train: &Train, resource: &Resource) -> Result<(), ConstraintViolation> {
        match Self::violations(train, resource).into_iter().next() {
            Some(violation) => Err(violation),
            None => Ok(()),
        }
    }

    /// All static rules `train` breaks on `resource`, in a fixed order.
    pub fn violations(train: &Train, resource: &Resource) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();

        if !resource.is_available() {
            violations.push(ConstraintViolation::ResourceUnavailable { resource_id: resource.id.clone() });
        }

        if train.length_meters > resource.length_capacity_meters {
            violations.push(ConstraintViolation::LengthExceeded {
                train_id: train.id.clone(),
                resource_id: resource.id.clone(),
                train_length: train.length_meters,
                capacity: resource.length_capacity_meters,
            });
        }

        if train.requires_electrification && !resource.electrified {
            violations.push(ConstraintViolation::ElectrificationMismatch { train_id: train.id.clone(), resource_id: resource.id.clone() });
        }

        if train.requires_accessibility && !resource.accessible {
            violations.push(ConstraintViolation::AccessibilityMismatch { train_id: train.id.clone(), resource_id: resource.id.clone() });
        }

        violations
    }

    pub fn validate_interval(interval: &TimeInterval) -> Result<(), ConstraintViolation> {
        if interval.is_degenerate() {
            return Err(ConstraintViolation::DegenerateInterval { interval: *interval });
        }
        Ok(())
    }

    /// Checks the safety buffer between `interval` and the blocks around it on `resource`.
    ///
    /// Blocks that actually overlap `interval` are reported as overlaps by the caller, not here.
    /// `ignore` excludes the block that is being moved.
    pub fn validate_headway(
        resource: &Resource,
        timeline: &ResourceTimeline,
        interval: &TimeInterval,
        buffer: Minutes,
        ignore: Option<BlockId>,
    ) -> Result<(), ConstraintViolation> {
        if buffer <= 0 {
            return Ok(());
        }

        let too_close = timeline
            .within_buffer(interval, buffer)
            .filter(|block| Some(block.id) != ignore && !block.interval.intersects(interval))
            .min_by_key(|block| (Self::gap(&block.interval, interval), block.id));

        match too_close {
            Some(block) => Err(ConstraintViolation::InsufficientHeadway {
                resource_id: resource.id.clone(),
                neighbour: block.id,
                gap: Self::gap(&block.interval, interval),
                required: buffer,
            }),
            None => Ok(()),
        }
    }

    /// Free minutes between two non-overlapping intervals.
    fn gap(a: &TimeInterval, b: &TimeInterval) -> Minutes {
        if a.end <= b.start { b.start - a.end } else { a.start - b.end }
    }
}
