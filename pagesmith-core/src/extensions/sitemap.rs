use crate::config::Config;
use crate::extension::Extension;
use crate::generator::PipelineHandle;
use crate::models::SourceRecord;
use anyhow::Context;
use std::fs;

pub const SITEMAP_FILENAME: &str = "sitemap.xml";

/// Writes `sitemap.xml` for every page that made it to disk.
///
/// URLs are `protocol + domain + route`; `domain` comes from the config.
pub struct Sitemap;

impl Extension for Sitemap {
    fn on_generation_end(
        &mut self,
        _pipeline: &PipelineHandle,
        config: &mut Config,
        files: &mut [SourceRecord],
    ) -> anyhow::Result<()> {
        let domain = config
            .get("domain")
            .and_then(|v| v.as_str().map(str::to_string))
            .context("sitemap needs a `domain` config key")?;

        let xml = build_sitemap(config, &domain, files);
        let path = config.output_dir().join(SITEMAP_FILENAME);
        fs::write(&path, xml).with_context(|| format!("Failed to write {:?}", path))?;

        tracing::info!("Generated {}", SITEMAP_FILENAME);
        Ok(())
    }
}

fn build_sitemap(config: &Config, domain: &str, files: &[SourceRecord]) -> String {
    let domain = domain.trim_end_matches('/');
    let mut urls = String::new();

    for record in files.iter().filter(|r| r.is_written()) {
        let Some(route) = record.route() else {
            continue;
        };
        let separator = if route.starts_with('/') { "" } else { "/" };
        let loc = format!("{}{}{}{}", config.protocol, domain, separator, route);
        let lastmod = record
            .meta_str("date")
            .unwrap_or(config.generation_time.as_str());

        urls.push_str("<url>");
        urls.push_str(&format!("<loc>{}</loc>", escape_xml(&loc)));
        if !lastmod.is_empty() {
            urls.push_str(&format!("<lastmod>{}</lastmod>", escape_xml(lastmod)));
        }
        urls.push_str("</url>\n");
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
{}</urlset>
"#,
        urls
    )
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
