// Core data models for Negocia
// These structs represent the domain entities

pub mod stage;
pub mod negotiation;

pub use stage::*;
pub use negotiation::*;
