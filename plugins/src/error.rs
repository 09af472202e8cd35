use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PluginError {
    #[error("No such extension: {0}")]
    UnknownExtension(String),

    #[error("Extension '{extension}' depends on '{dependency}', which is not available")]
    MissingDependency {
        extension: String,
        dependency: String,
    },

    #[error("Extension '{0}' is already registered")]
    DuplicateExtension(String),
}
