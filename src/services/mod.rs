pub mod blog;
pub mod default;

pub use blog::*;
pub use default::*;
