//! Infrastructure layer: collaborator traits, their in-process
//! implementations and the DI container.

pub mod di;
pub mod error;
pub mod traits;

pub use error::{InfraError, InfraResult};
