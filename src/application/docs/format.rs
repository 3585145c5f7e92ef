//! Assemble generated sections into downloadable documents.

use std::collections::{BTreeMap, HashSet};

use ammonia::Builder as AmmoniaBuilder;
use comrak::{markdown_to_html, options::Options};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::domain::entities::Artifact;
use crate::domain::types::OutputFormat;

use super::generator::GeneratedSection;

const MAX_BLANK_LINES: usize = 2;

/// Builds artifacts for every requested output format.
pub struct DocumentFormatter {
    options: Options<'static>,
    sanitizer: AmmoniaBuilder<'static>,
    public_base_url: String,
}

impl DocumentFormatter {
    pub fn new(public_base_url: Option<&str>) -> Self {
        Self {
            options: markdown_options(),
            sanitizer: build_sanitizer(),
            public_base_url: public_base_url
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_default(),
        }
    }

    pub fn render_all(
        &self,
        job_id: Uuid,
        service_name: &str,
        formats: &[OutputFormat],
        sections: &[GeneratedSection],
        generated_at: OffsetDateTime,
    ) -> BTreeMap<OutputFormat, Artifact> {
        let markdown = render_markdown(service_name, sections, generated_at);

        formats
            .iter()
            .map(|format| {
                let content = match format {
                    OutputFormat::Markdown => markdown.clone(),
                    OutputFormat::Html => self.render_html(service_name, &markdown),
                };
                let artifact = Artifact {
                    content,
                    download_url: self.download_url(job_id, *format),
                    media_type: format.media_type().to_string(),
                    file_name: format!("{}.{}", file_stem(service_name), format.extension()),
                };
                (*format, artifact)
            })
            .collect()
    }

    pub fn download_url(&self, job_id: Uuid, format: OutputFormat) -> String {
        format!(
            "{}/api/v1/jobs/{job_id}/download/{}",
            self.public_base_url,
            format.as_str()
        )
    }

    fn render_html(&self, service_name: &str, markdown: &str) -> String {
        let body = markdown_to_html(markdown, &self.options);
        let body = self.sanitizer.clean(&body).to_string();
        let title = ammonia::clean_text(&format!("{service_name} API Documentation"));

        format!(
            "<!DOCTYPE html>\n\
             <html lang=\"en\">\n\
             <head>\n\
             <meta charset=\"UTF-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
             <title>{title}</title>\n\
             <style>\n{STYLE}</style>\n\
             </head>\n\
             <body>\n\
             <main class=\"documentation\">\n{body}</main>\n\
             </body>\n\
             </html>\n"
        )
    }
}

const STYLE: &str = "body { font-family: system-ui, sans-serif; line-height: 1.6; color: #24292f; }
.documentation { max-width: 960px; margin: 0 auto; padding: 2rem; }
pre { background: #f6f8fa; padding: 1rem; overflow-x: auto; border-radius: 6px; }
code { font-family: ui-monospace, monospace; }
table { border-collapse: collapse; }
th, td { border: 1px solid #d0d7de; padding: 0.4rem 0.8rem; }
";

/// The Markdown document is the canonical rendering; HTML is derived from it.
pub fn render_markdown(
    service_name: &str,
    sections: &[GeneratedSection],
    generated_at: OffsetDateTime,
) -> String {
    let mut parts = vec![
        format!("# {service_name} API Documentation\n"),
        "*Generated automatically from API specification*\n".to_string(),
        "## Table of Contents\n".to_string(),
    ];
    for generated in sections {
        parts.push(format!(
            "- [{}](#{})",
            generated.section.title(),
            generated.section.anchor()
        ));
    }
    parts.push(String::new());

    for generated in sections {
        parts.push(format!("## {}\n", generated.section.title()));
        parts.push(clean_content(&generated.content));
        parts.push("\n---\n".to_string());
    }

    let timestamp = generated_at
        .format(&Rfc3339)
        .unwrap_or_else(|_| generated_at.unix_timestamp().to_string());
    parts.push(format!(
        "*Documentation generated on {timestamp} by specdoc.*\n"
    ));

    parts.join("\n")
}

/// Trim trailing whitespace and collapse runs of blank lines.
fn clean_content(content: &str) -> String {
    let mut lines = Vec::new();
    let mut blank_run = 0;

    for line in content.trim().lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > MAX_BLANK_LINES {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(line);
    }

    lines.join("\n")
}

fn file_stem(service_name: &str) -> String {
    let stem: String = service_name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '-'
            }
        })
        .collect();
    let stem = stem.trim_matches('-');
    if stem.is_empty() {
        "documentation".to_string()
    } else {
        stem.to_string()
    }
}

fn markdown_options() -> Options<'static> {
    let mut options = Options::default();
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.header_ids = Some(String::new());

    options.render.github_pre_lang = true;
    options
}

fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();
    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "blockquote",
        "br",
        "code",
        "del",
        "em",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "input",
        "li",
        "ol",
        "p",
        "pre",
        "strong",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "ul",
    ]);
    builder.tags(tags);
    builder.add_generic_attributes(&["id", "class"]);
    builder.add_tag_attributes("a", &["aria-hidden"]);
    builder.add_tag_attributes("pre", &["lang"]);
    builder.add_tag_attributes("th", &["align"]);
    builder.add_tag_attributes("td", &["align"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);
    builder.url_schemes(HashSet::from(["http", "https", "mailto"]));
    builder
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::application::docs::DocSection;

    fn sections() -> Vec<GeneratedSection> {
        vec![
            GeneratedSection {
                section: DocSection::Overview,
                content: "The pets API.   \n\n\n\n\nSecond paragraph.".into(),
                tokens_used: 5,
            },
            GeneratedSection {
                section: DocSection::Endpoints,
                content: "### GET /pets\n<script>alert(1)</script>\n\n```bash\ncurl /pets\n```"
                    .into(),
                tokens_used: 5,
            },
        ]
    }

    #[test]
    fn markdown_has_toc_sections_and_footer() {
        let markdown = render_markdown("pets", &sections(), datetime!(2026-01-02 03:04:05 UTC));

        assert!(markdown.starts_with("# pets API Documentation"));
        assert!(markdown.contains("- [Overview](#overview)"));
        assert!(markdown.contains("- [API Endpoints](#api-endpoints)"));
        assert!(markdown.contains("## API Endpoints"));
        assert!(markdown.contains("The pets API.\n\n\nSecond paragraph."));
        assert!(markdown.contains("2026-01-02T03:04:05Z"));
    }

    #[test]
    fn html_is_sanitised_and_wrapped() {
        let formatter = DocumentFormatter::new(Some("https://docs.test/"));
        let id = Uuid::nil();
        let artifacts = formatter.render_all(
            id,
            "pets",
            &[OutputFormat::Markdown, OutputFormat::Html],
            &sections(),
            datetime!(2026-01-02 03:04:05 UTC),
        );

        let html = &artifacts[&OutputFormat::Html];
        assert!(html.content.starts_with("<!DOCTYPE html>"));
        assert!(html.content.contains("<h2"));
        assert!(!html.content.contains("<script>"));
        assert_eq!(html.file_name, "pets.html");
        assert_eq!(
            html.download_url,
            format!("https://docs.test/api/v1/jobs/{id}/download/html")
        );

        let markdown = &artifacts[&OutputFormat::Markdown];
        assert_eq!(markdown.media_type, "text/markdown; charset=utf-8");
        assert_eq!(markdown.file_name, "pets.md");
    }

    #[test]
    fn relative_links_without_public_base() {
        let formatter = DocumentFormatter::new(None);
        let id = Uuid::nil();
        assert_eq!(
            formatter.download_url(id, OutputFormat::Markdown),
            format!("/api/v1/jobs/{id}/download/markdown")
        );
    }

    #[test]
    fn file_names_are_filesystem_safe() {
        assert_eq!(file_stem("billing service/v2"), "billing-service-v2");
        assert_eq!(file_stem("///"), "documentation");
    }
}
