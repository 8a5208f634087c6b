//! Extensions shipped with the generator.

mod drafts;
mod reading_time;
mod sitemap;

pub use drafts::Drafts;
pub use reading_time::{ReadingTime, WORDS_PER_MINUTE};
pub use sitemap::{Sitemap, SITEMAP_FILENAME};

use crate::extension::ExtensionRegistry;

/// Register every built-in extension under its config identifier
pub fn register_builtins(registry: &mut ExtensionRegistry) {
    registry.register("drafts", || Box::new(Drafts));
    registry.register("reading_time", || Box::new(ReadingTime));
    registry.register("sitemap", || Box::new(Sitemap));
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::{Meta, SourceRecord};
    use serde_yaml::Value;

    pub fn record(name: &str, content: &str, meta: &[(&str, Value)]) -> SourceRecord {
        let meta: Meta = meta
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        SourceRecord::new(name, content, meta)
    }
}
