//! # Extension Manager
//!
//! Resolves the extensions enabled in the configuration file against the
//! registry, checks that their dependencies are satisfied and runs them
//! side by side until the host shuts down.

use std::collections::BTreeSet;
use std::sync::Arc;

use qualisys_common::config::{ExtensionEntry, ServerConfig};
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::context::ExtensionContext;
use crate::error::PluginError;
use crate::extension::Extension;
use crate::manifest::ExtensionManifest;
use crate::registry::ExtensionRegistry;

pub struct LoadedExtension {
    pub name: String,
    pub extension: Arc<dyn Extension>,
    pub config: ExtensionEntry,
}

pub struct ExtensionManager {
    registry: ExtensionRegistry,
    provided_apis: BTreeSet<String>,
}

impl ExtensionManager {
    pub fn new(registry: ExtensionRegistry) -> Self {
        Self {
            registry,
            provided_apis: BTreeSet::new(),
        }
    }

    /// Declares an API the host itself offers to extensions.
    pub fn provide_api(mut self, api: &str) -> Self {
        self.provided_apis.insert(api.to_string());
        self
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Instantiates every enabled extension, failing on unknown keys or
    /// unsatisfied dependencies.
    pub fn load(&self, config: &ServerConfig) -> Result<Vec<LoadedExtension>, PluginError> {
        let enabled: BTreeSet<&str> = config.enabled_extensions().map(|(name, _)| name).collect();
        let mut loaded: Vec<LoadedExtension> = Vec::new();

        for (name, entry) in config.enabled_extensions() {
            let extension: Arc<dyn Extension> = self.registry.create(name)?;
            let manifest: ExtensionManifest = extension.manifest();

            for dependency in &manifest.dependencies {
                let satisfied: bool = self.provided_apis.contains(dependency)
                    || enabled.contains(dependency.as_str());
                if !satisfied {
                    return Err(PluginError::MissingDependency {
                        extension: name.to_string(),
                        dependency: dependency.clone(),
                    });
                }
            }

            loaded.push(LoadedExtension {
                name: name.to_string(),
                extension,
                config: entry.clone(),
            });
        }

        Ok(loaded)
    }

    /// Runs all enabled extensions until each of them has returned.
    pub async fn run(&self, config: &ServerConfig, ctx: ExtensionContext) -> anyhow::Result<()> {
        let loaded: Vec<LoadedExtension> = self.load(config)?;
        if loaded.is_empty() {
            info!("No extensions enabled in configuration");
            return Ok(());
        }

        let mut tasks = JoinSet::new();
        for LoadedExtension {
            name,
            extension,
            config,
        } in loaded
        {
            info!("Loading extension: {name}");
            let ctx = ctx.clone();
            tasks.spawn(async move {
                let result = extension.run(ctx, &config).await;
                (name, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(()))) => info!("Extension {name} stopped"),
                Ok((name, Err(e))) => error!("Extension {name} failed: {e:#}"),
                Err(e) => error!("Extension task aborted: {e}"),
            }
        }

        Ok(())
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use qualisys_common::mocap::{MotionCaptureFrame, MotionCaptureSink};
    use qualisys_common::network::ConnectionRegistry;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    struct CountingExtension {
        runs: Arc<AtomicUsize>,
        dependencies: &'static [&'static str],
    }

    #[async_trait]
    impl Extension for CountingExtension {
        fn manifest(&self) -> ExtensionManifest {
            ExtensionManifest::new("counting", "Counts runs").with_dependencies(self.dependencies)
        }

        async fn run(&self, ctx: ExtensionContext, _config: &ExtensionEntry) -> anyhow::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            ctx.shutdown.cancelled().await;
            Ok(())
        }
    }

    fn manager_with(runs: Arc<AtomicUsize>, dependencies: &'static [&'static str]) -> ExtensionManager {
        let mut registry = ExtensionRegistry::new();
        registry
            .register("counting", move || {
                Arc::new(CountingExtension {
                    runs: runs.clone(),
                    dependencies,
                }) as Arc<dyn Extension>
            })
            .unwrap();
        ExtensionManager::new(registry)
    }

    fn config(json: &str) -> ServerConfig {
        ServerConfig::from_json(json).unwrap()
    }

    fn context(shutdown: CancellationToken) -> ExtensionContext {
        let sink: Arc<dyn MotionCaptureSink> = Arc::new(|_frame: MotionCaptureFrame| {});
        ExtensionContext::new(ConnectionRegistry::new(), sink, shutdown)
    }

    #[test]
    fn registry_lists_registered_names() {
        let manager = manager_with(Arc::new(AtomicUsize::new(0)), &[]);
        let names: Vec<&str> = manager.registry().names().collect();
        assert_eq!(names, vec!["counting"]);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let manager = manager_with(Arc::new(AtomicUsize::new(0)), &[]);
        let result = manager.load(&config(r#"{"extensions": {"nope": {}}}"#));
        assert!(matches!(result, Err(PluginError::UnknownExtension(name)) if name == "nope"));
    }

    #[test]
    fn disabled_extensions_are_not_loaded() {
        let manager = manager_with(Arc::new(AtomicUsize::new(0)), &[]);
        let loaded = manager
            .load(&config(r#"{"extensions": {"counting": {"enabled": false}}}"#))
            .unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn missing_dependency_is_reported() {
        let manager = manager_with(Arc::new(AtomicUsize::new(0)), &["motion_capture"]);
        let result = manager.load(&config(r#"{"extensions": {"counting": {}}}"#));
        assert_eq!(
            result.err(),
            Some(PluginError::MissingDependency {
                extension: "counting".into(),
                dependency: "motion_capture".into(),
            })
        );
    }

    #[test]
    fn provided_api_satisfies_dependency() {
        let manager =
            manager_with(Arc::new(AtomicUsize::new(0)), &["motion_capture"]).provide_api("motion_capture");
        let loaded = manager.load(&config(r#"{"extensions": {"counting": {}}}"#)).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "counting");
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = ExtensionRegistry::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let make = move || {
            Arc::new(CountingExtension {
                runs: runs.clone(),
                dependencies: &[],
            }) as Arc<dyn Extension>
        };
        registry.register("counting", make.clone()).unwrap();
        assert_eq!(
            registry.register("counting", make),
            Err(PluginError::DuplicateExtension("counting".into()))
        );
    }

    #[tokio::test]
    async fn run_returns_after_shutdown() {
        let runs = Arc::new(AtomicUsize::new(0));
        let manager = manager_with(runs.clone(), &[]);
        let shutdown = CancellationToken::new();

        let cfg = config(r#"{"extensions": {"counting": {}}}"#);
        let handle = {
            let ctx = context(shutdown.clone());
            async move { manager.run(&cfg, ctx).await }
        };

        let stopper = async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            shutdown.cancel();
        };

        let (result, _) = tokio::join!(handle, stopper);
        assert!(result.is_ok());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
