use crate::config::Config;
use crate::extension::Extension;
use crate::generator::PipelineHandle;
use crate::models::SourceRecord;
use serde_yaml::Value;

pub const WORDS_PER_MINUTE: usize = 200;

/// Adds `word_count` and `reading_time` (whole minutes) to every page's
/// metadata so templates can show them.
pub struct ReadingTime;

impl Extension for ReadingTime {
    fn preprocessing(
        &mut self,
        _pipeline: &PipelineHandle,
        _config: &mut Config,
        files: &mut [SourceRecord],
    ) -> anyhow::Result<()> {
        for record in files.iter_mut() {
            let words = record.content.split_whitespace().count();
            record
                .meta
                .insert("word_count".to_string(), Value::from(words as u64));
            record
                .meta
                .insert("reading_time".to_string(), Value::from(minutes(words) as u64));
        }
        Ok(())
    }
}

fn minutes(words: usize) -> usize {
    words.div_ceil(WORDS_PER_MINUTE).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::test_support::record;

    #[test]
    fn test_minutes_round_up() {
        assert_eq!(minutes(0), 1);
        assert_eq!(minutes(200), 1);
        assert_eq!(minutes(201), 2);
        assert_eq!(minutes(1000), 5);
    }

    #[test]
    fn test_sets_meta() {
        let body = "word ".repeat(450);
        let mut files = vec![record("post.md", &body, &[])];

        ReadingTime
            .preprocessing(
                &PipelineHandle::new(),
                &mut Config::new("site", "public"),
                &mut files,
            )
            .unwrap();

        assert_eq!(files[0].meta["word_count"], Value::from(450u64));
        assert_eq!(files[0].meta["reading_time"], Value::from(3u64));
    }
}
