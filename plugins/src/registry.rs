//! # Extension Registry
//!
//! Maps configuration keys to extension factories, the equivalent of a
//! plugin entry-point table.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::PluginError;
use crate::extension::Extension;
use crate::manifest::ExtensionManifest;

type Factory = Box<dyn Fn() -> Arc<dyn Extension> + Send + Sync>;

#[derive(Default)]
pub struct ExtensionRegistry {
    factories: BTreeMap<String, Factory>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &str, factory: F) -> Result<(), PluginError>
    where
        F: Fn() -> Arc<dyn Extension> + Send + Sync + 'static,
    {
        if self.factories.contains_key(name) {
            return Err(PluginError::DuplicateExtension(name.to_string()));
        }
        self.factories.insert(name.to_string(), Box::new(factory));
        Ok(())
    }

    pub fn create(&self, name: &str) -> Result<Arc<dyn Extension>, PluginError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| PluginError::UnknownExtension(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn manifests(&self) -> Vec<ExtensionManifest> {
        self.factories.values().map(|factory| factory().manifest()).collect()
    }
}
