pub mod schedule_generator;
