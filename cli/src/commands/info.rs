use qualisys_plugins::ExtensionRegistry;

use crate::terminal::print;

pub fn info() -> anyhow::Result<()> {
    let mut registry = ExtensionRegistry::new();
    qualisys_core::register(&mut registry)?;

    for (idx, manifest) in registry.manifests().iter().enumerate() {
        print::tree_head(idx, &manifest.name);
        print::as_tree_one_level(&[
            ("description".to_string(), manifest.description.clone()),
            ("requires".to_string(), manifest.dependencies.join(", ")),
            ("tags".to_string(), manifest.tags.join(", ")),
        ]);

        print::print_status("configuration schema");
        for line in serde_json::to_string_pretty(&manifest.schema)?.lines() {
            print::print(line);
        }
    }

    print::end_of_program();
    Ok(())
}
