use anyhow::Result;
use pagesmith_core::ExtensionRegistry;

/// Print every identifier usable in the `extensions` config list
pub fn list_extensions() -> Result<()> {
    for id in ExtensionRegistry::builtin().available() {
        println!("{id}");
    }
    Ok(())
}
