//! Core data models for the ranking engine.

mod adjustment;
mod category;
mod ids;
mod matches;
mod season;
mod snapshot;
mod standings;
mod tournament;

pub use adjustment::*;
pub use category::*;
pub use ids::*;
pub use matches::*;
pub use season::*;
pub use snapshot::*;
pub use standings::*;
pub use tournament::*;
