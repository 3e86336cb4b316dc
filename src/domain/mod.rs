//! Domain layer: the page tree, shapes and entities
//!
//! This layer is independent of external concerns (no config loading, no CLI,
//! no timers).

pub mod arena;
pub mod builder;
pub mod entities;
pub mod error;
pub mod selector;

pub use arena::{Document, NodeData, NodeId, TreeNode};
pub use builder::{DocumentBuilder, NodeDescription, PageDescription, TreeDescription};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use selector::Shape;
