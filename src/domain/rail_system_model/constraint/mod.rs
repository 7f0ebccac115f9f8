pub mod constraint_validator;
pub mod constraint_violation;
