pub mod block;
pub mod resource_timeline;
