pub mod train;
pub mod train_registry;
