//! Domain model (endpoint config, locators, errors, events).

pub mod config;
pub mod locator;
pub mod errors;
pub mod events;

pub use self::config::{ConfigError, StorageEndpointConfig};
pub use self::locator::ArtifactLocator;
pub use self::errors::ArtifactError;
pub use self::events::TransferEvent;
