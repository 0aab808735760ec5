pub mod good;

pub use good::*;
