//! BRD artifact rendering: Markdown to a standalone HTML file

use crate::adapter::{AdapterResult, ArtifactWriter};
use pulldown_cmark::{html, Options, Parser};
use std::path::{Path, PathBuf};
use tracing::info;

/// Lowercase the topic and collapse every run of non-alphanumerics to `_`.
pub fn slugify(topic: Option<&str>) -> String {
    let topic = topic.map(str::trim).filter(|t| !t.is_empty()).unwrap_or("campaign");
    let mut slug = String::with_capacity(topic.len());
    let mut in_gap = false;
    for c in topic.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            in_gap = false;
        } else if !in_gap {
            slug.push('_');
            in_gap = true;
        }
    }
    slug
}

pub fn brd_filename(slug: &str) -> String {
    format!("{}_brd.html", slug)
}

/// A bare file name: no traversal, no separators, not absolute.
pub fn is_safe_artifact_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !Path::new(name).is_absolute()
}

pub fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut body = String::new();
    html::push_html(&mut body, Parser::new_ext(markdown, options));
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\" />\n\
         <title>Business Requirements Document</title>\n\
         <style>body{{font-family:Helvetica,Arial,sans-serif;max-width:860px;margin:40px auto;line-height:1.5;color:#111}}\
         table{{border-collapse:collapse}}td,th{{border:1px solid #ccc;padding:4px 8px}}</style>\n\
         </head>\n<body>\n{}</body>\n</html>\n",
        body
    )
}

pub struct HtmlArtifactWriter {
    dir: PathBuf,
}

impl HtmlArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait::async_trait]
impl ArtifactWriter for HtmlArtifactWriter {
    async fn write_brd(&self, slug: &str, markdown: &str) -> AdapterResult<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(brd_filename(slug));
        tokio::fs::write(&path, markdown_to_html(markdown)).await?;
        info!("Wrote BRD to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_collapses_runs() {
        assert_eq!(slugify(Some("AI Fintech -- Launch")), "ai_fintech_launch");
        assert_eq!(slugify(Some("Fintech!")), "fintech_");
        assert_eq!(slugify(None), "campaign");
        assert_eq!(slugify(Some("  ")), "campaign");
    }

    #[test]
    fn rejects_traversal_and_separators() {
        assert!(is_safe_artifact_name("fintech_brd.html"));
        assert!(!is_safe_artifact_name("../secret"));
        assert!(!is_safe_artifact_name("a/b.html"));
        assert!(!is_safe_artifact_name("a\\b.html"));
        assert!(!is_safe_artifact_name("/etc/passwd"));
        assert!(!is_safe_artifact_name(""));
    }

    #[test]
    fn renders_headings_and_tables() {
        let html = markdown_to_html("# BRD\n\n| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<h1>BRD</h1>"));
        assert!(html.contains("<table>"));
        assert!(html.starts_with("<!doctype html>"));
    }

    #[tokio::test]
    async fn writes_file_under_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let writer = HtmlArtifactWriter::new(dir.path().join("campaign_outputs"));
        let path = writer.write_brd("fintech", "# Hello").await.unwrap();
        assert_eq!(path.file_name().unwrap(), "fintech_brd.html");
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("<h1>Hello</h1>"));
    }
}
