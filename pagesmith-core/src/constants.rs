//! Substitution of configuration constants written as `~~KEY~~`.

use crate::models::SourceRecord;
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Wrap a key in the substitution sigil.
pub fn token(key: &str) -> String {
    format!("~~{key}~~")
}

/// Text to substitute for `value`, if the value may be substituted at all.
///
/// Strings qualify as-is. Numbers qualify when their string form is a plain
/// decimal (digits with at most one dot). Everything else is left alone so
/// structured data never lands in a scalar position.
pub fn substitution_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            let text = n.to_string();
            is_plain_decimal(&text).then_some(text)
        }
        _ => None,
    }
}

fn is_plain_decimal(text: &str) -> bool {
    let digits = text.replacen('.', "", 1);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Replace every `~~KEY~~` in `content` with its constant.
pub fn inject_constants(constants: &BTreeMap<String, Value>, content: &str) -> String {
    let mut content = content.to_string();
    for (key, value) in constants {
        let Some(replacement) = substitution_text(value) else {
            continue;
        };
        let needle = token(key);
        if content.contains(&needle) {
            content = content.replace(&needle, &replacement);
        }
    }
    content
}

/// Apply constants to a record's content and to every string metadata value.
pub fn inject_into_record(constants: &BTreeMap<String, Value>, record: &mut SourceRecord) {
    record.content = inject_constants(constants, &record.content);
    for value in record.meta.values_mut() {
        if let Value::String(s) = value {
            *s = inject_constants(constants, s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Meta;

    fn constants(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_string_and_numeric_substitution() {
        let c = constants(&[
            ("SITE", Value::from("Example")),
            ("VERSION", Value::from(3)),
            ("RATIO", Value::from(1.5)),
        ]);
        let out = inject_constants(&c, "~~SITE~~ v~~VERSION~~ at ~~RATIO~~x ~~SITE~~");
        assert_eq!(out, "Example v3 at 1.5x Example");
    }

    #[test]
    fn test_non_qualifying_values_untouched() {
        let mut map = serde_yaml::Mapping::new();
        map.insert(Value::from("a"), Value::from(1));
        let c = constants(&[
            ("FLAG", Value::from(true)),
            ("LIST", Value::Sequence(vec![Value::from("x")])),
            ("MAP", Value::Mapping(map)),
            ("NEG", Value::from(-4)),
            ("NOTHING", Value::Null),
        ]);
        let text = "~~FLAG~~ ~~LIST~~ ~~MAP~~ ~~NEG~~ ~~NOTHING~~ ~~MISSING~~";
        assert_eq!(inject_constants(&c, text), text);
    }

    #[test]
    fn test_idempotent_once_tokens_are_gone() {
        let c = constants(&[("BASE", Value::from("/blog"))]);
        let once = inject_constants(&c, "<a href=\"~~BASE~~/post\">");
        let twice = inject_constants(&c, &once);
        assert_eq!(once, "<a href=\"/blog/post\">");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_literal_key_text_is_not_a_token() {
        let c = constants(&[("BASE", Value::from("/blog"))]);
        assert_eq!(inject_constants(&c, "BASE ~BASE~"), "BASE ~BASE~");
    }

    #[test]
    fn test_inject_into_record_meta() {
        let mut meta = Meta::new();
        meta.insert("route".into(), Value::from("~~BASE~~/about"));
        meta.insert("weight".into(), Value::from(2));
        let mut record = SourceRecord::new("about.md", "See ~~BASE~~", meta);

        let c = constants(&[("BASE", Value::from("/blog"))]);
        inject_into_record(&c, &mut record);

        assert_eq!(record.content, "See /blog");
        assert_eq!(record.route(), Some("/blog/about"));
        assert_eq!(record.meta["weight"], Value::from(2));
    }
}
