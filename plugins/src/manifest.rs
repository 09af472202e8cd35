use serde::Serialize;
use serde_json::Value;

/// Registration metadata of an extension, as shown to operators and used by
/// the host to resolve dependencies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionManifest {
    /// Configuration key the extension is loaded under.
    pub name: String,
    pub description: String,
    /// APIs or other extensions that must be available first.
    pub dependencies: Vec<String>,
    pub tags: Vec<String>,
    /// JSON schema of the extension's configuration object.
    pub schema: Value,
}

impl ExtensionManifest {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            dependencies: Vec::new(),
            tags: Vec::new(),
            schema: Value::Object(Default::default()),
        }
    }

    pub fn with_dependencies(mut self, dependencies: &[&str]) -> Self {
        self.dependencies = dependencies.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }

    pub fn is_experimental(&self) -> bool {
        self.tags.iter().any(|t| t == "experimental")
    }
}
