//! Launch descriptions: arguments, nodes and timers

mod action;
pub mod fleet;
mod node;

pub use action::*;
pub use fleet::{fleet_description, FleetOptions};
pub use node::*;
