//! Launch arguments, overrides and substitution

mod arguments;
mod overrides;
mod substitution;

pub use arguments::*;
pub use overrides::*;
pub use substitution::*;
