// HTTP routes
pub mod goods;
pub mod health;

pub use goods::*;
pub use health::*;
