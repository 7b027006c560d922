pub mod app_context;
pub mod catchers;
pub mod guards;
pub mod jwt;

pub use app_context::*;
pub use catchers::*;
pub use jwt::*;
