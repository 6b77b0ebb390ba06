pub mod entity;
pub mod error;
pub mod kind;

pub use entity::{Entity, Metadata};
pub use kind::{ExecutionStrategy, Kind, ProceduralSignature};
