//! Communication, wire records, the union exchange and mesh generators.

pub mod communicator;
pub mod meshgen;
pub mod union_exchange;
pub mod wire;

pub use union_exchange::exchange_unions;
