pub mod asset;
pub mod portfolio;

pub use asset::*;
pub use portfolio::*;
