pub mod frame;
pub mod mapping;

pub use frame::{Frame, Row};
pub use mapping::{DropPolicy, Entity, EntitySchema};
