mod in_memory_registry;
mod media_update;
mod membership_registry;
mod membership_service;

pub use in_memory_registry::*;
pub use media_update::*;
pub use membership_registry::*;
pub use membership_service::*;
