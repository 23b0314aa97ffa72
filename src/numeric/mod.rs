//! Sign predicates, inverse interpolation and classification.

pub mod classify;
pub mod interpolation;
pub mod predicate;
