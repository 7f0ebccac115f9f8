pub mod audit_log;
pub mod block_filter;
pub mod interval_store;
pub mod placement;
pub mod schedule_config;
pub mod schedule_state;
pub mod touch_set;
