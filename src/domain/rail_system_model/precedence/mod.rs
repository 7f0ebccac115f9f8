pub mod cascade_resolver;
pub mod precedence_compare;
pub mod precedence_resolver;
pub mod suggestion;
