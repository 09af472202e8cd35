//! # Extension host
//!
//! The pieces of the host server that extensions plug into: the
//! [`Extension`] trait, registration metadata, the registry that maps
//! configuration keys to extensions and the manager that runs them.

pub mod context;
pub mod error;
pub mod extension;
pub mod manager;
pub mod manifest;
pub mod registry;

pub use context::ExtensionContext;
pub use error::PluginError;
pub use extension::Extension;
pub use manager::ExtensionManager;
pub use manifest::ExtensionManifest;
pub use registry::ExtensionRegistry;
