//! sm-core
//!
//! Domain logic and interface definitions for Story Market.

pub mod error;
pub mod export;
pub mod models;
pub mod search;
pub mod service;
pub mod stats;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use export::*;
pub use models::*;
pub use search::*;
pub use service::*;
pub use stats::*;
pub use traits::*;
