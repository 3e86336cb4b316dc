//! Dependency wiring: service container and host sessions

mod service_container;
mod session;

pub use service_container::ServiceContainer;
pub use session::Session;
