pub mod date;
pub mod fuzzy;
pub mod money;

pub use date::*;
pub use money::*;
