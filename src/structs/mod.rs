pub mod auth;
pub mod blog;

pub use auth::*;
pub use blog::*;
