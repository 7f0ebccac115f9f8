pub mod id;
pub mod load_metric;
pub mod time;
