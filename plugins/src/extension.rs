use async_trait::async_trait;
use qualisys_common::config::ExtensionEntry;

use crate::context::ExtensionContext;
use crate::manifest::ExtensionManifest;

/// A loadable unit of functionality hosted by the server.
///
/// `run` is called once the extension is loaded and should return when
/// `ctx.shutdown` is cancelled.
#[async_trait]
pub trait Extension: Send + Sync {
    fn manifest(&self) -> ExtensionManifest;

    async fn run(&self, ctx: ExtensionContext, config: &ExtensionEntry) -> anyhow::Result<()>;
}
