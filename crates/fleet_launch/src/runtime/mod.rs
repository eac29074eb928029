//! Runtime components: plan resolution and process management

pub mod executor;
pub mod package;
pub mod plan;
pub mod process;

pub use executor::*;
pub use package::*;
pub use plan::*;
pub use process::*;
