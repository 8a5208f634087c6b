use crate::config::Config;
use crate::extension::Extension;
use crate::generator::PipelineHandle;
use crate::models::SourceRecord;
use serde_yaml::Value;

/// Drops pages marked `draft: true` before anything else sees them.
pub struct Drafts;

impl Extension for Drafts {
    fn on_generation_start(
        &mut self,
        _pipeline: &PipelineHandle,
        _config: &mut Config,
        files: &mut Vec<SourceRecord>,
    ) -> anyhow::Result<()> {
        let before = files.len();
        files.retain(|record| !matches!(record.meta.get("draft"), Some(Value::Bool(true))));

        let dropped = before - files.len();
        if dropped > 0 {
            tracing::info!("Skipping {} draft page(s)", dropped);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::test_support::record;

    #[test]
    fn test_drops_only_true_drafts() {
        let mut files = vec![
            record("a.md", "", &[("draft", Value::Bool(true))]),
            record("b.md", "", &[("draft", Value::Bool(false))]),
            record("c.md", "", &[("draft", Value::String("yes".into()))]),
            record("d.md", "", &[]),
        ];

        Drafts
            .on_generation_start(
                &PipelineHandle::new(),
                &mut Config::new("site", "public"),
                &mut files,
            )
            .unwrap();

        let names: Vec<_> = files.iter().map(|r| r.filename.to_str().unwrap()).collect();
        assert_eq!(names, vec!["b.md", "c.md", "d.md"]);
    }
}
