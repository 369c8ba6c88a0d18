//! Mirrors the archive's accessible HTML agendas and packets as plain text,
//! then concatenates them into one combined source file.

use anyhow::{bail, Context, Result};
use chrono::Local;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};
use url::Url;
use walkdir::WalkDir;

use crate::driver::PageSource;
use crate::extract::anchor_images;
use crate::naming;
use crate::pipeline::artifacts::write_atomic;

/// Marker every accessible-document href carries.
pub const DOCUMENT_HREF_MARKER: &str = "adaHtmlDocument";

const RULE_WIDTH: usize = 80;
const COMBINED_TITLE: &str = "MEETING ARCHIVE DOCUMENTS";
const SKIPPED_TAGS: &[&str] = &["script", "style", "nav", "footer", "header"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Agenda,
    Packet,
}

impl DocumentKind {
    const ALL: [DocumentKind; 2] = [DocumentKind::Agenda, DocumentKind::Packet];

    /// Prefix of the thumbnail `alt` text that identifies this kind.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Agenda => "HTML Agenda",
            DocumentKind::Packet => "HTML Packet",
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            DocumentKind::Agenda => "agenda",
            DocumentKind::Packet => "packet",
        }
    }

    fn from_alt(alt: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| alt.starts_with(kind.label()))
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLink {
    pub url: String,
    pub kind: DocumentKind,
    pub meeting_info: String,
}

impl DocumentLink {
    pub fn file_name(&self) -> String {
        let id = naming::normalize(Some(&self.meeting_info), &self.url);
        format!("{}_{}.txt", id, self.kind.suffix())
    }

    /// Header block followed by the document text.
    pub fn render(&self, text: &str) -> String {
        let header = [
            format!("DOCUMENT TYPE: {}", self.kind),
            format!("MEETING: {}", self.meeting_info),
            format!("URL: {}", self.url),
            "=".repeat(RULE_WIDTH),
        ];
        format!("{}\n\n{}\n\n", header.join("\n"), text)
    }
}

/// Agenda and packet links on one archive page, in document order.
pub fn find_document_links(html: &str, page_url: &Url) -> Vec<DocumentLink> {
    anchor_images(html, page_url)
        .into_iter()
        .filter(|anchor| anchor.href.contains(DOCUMENT_HREF_MARKER))
        .filter_map(|anchor| {
            let alt = anchor.alt?;
            let kind = DocumentKind::from_alt(&alt)?;
            Some(DocumentLink {
                url: anchor.href,
                kind,
                meeting_info: meeting_info(&alt, kind),
            })
        })
        .collect()
}

/// Text after `"<kind> for "`, e.g. the date and meeting name.
fn meeting_info(alt: &str, kind: DocumentKind) -> String {
    let rest = alt[kind.label().len()..].trim_start();
    let info = rest.strip_prefix("for ").unwrap_or(rest).trim();
    if info.is_empty() {
        "Unknown Meeting".to_string()
    } else {
        info.to_string()
    }
}

/// Visible text of an HTML document, one trimmed non-empty line per text run.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let body = Selector::parse("body").expect("body selector");
    let root = document
        .select(&body)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut lines = Vec::new();
    collect_lines(root, &mut lines);
    lines.join("\n")
}

fn collect_lines(element: ElementRef<'_>, lines: &mut Vec<String>) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if SKIPPED_TAGS.contains(&child_element.value().name()) {
                continue;
            }
            collect_lines(child_element, lines);
        } else if let Some(text) = child.value().as_text() {
            lines.extend(
                text.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string),
            );
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentSummary {
    pub links: usize,
    pub saved: usize,
    pub existing: usize,
    pub failed: usize,
    pub combined: usize,
}

pub struct DocumentMirror {
    source: Box<dyn PageSource>,
    documents_dir: PathBuf,
    combined_file: PathBuf,
    source_label: String,
    pause: Duration,
}

impl DocumentMirror {
    pub fn new(
        source: Box<dyn PageSource>,
        documents_dir: impl Into<PathBuf>,
        combined_file: impl Into<PathBuf>,
        source_label: impl Into<String>,
    ) -> Self {
        Self {
            source,
            documents_dir: documents_dir.into(),
            combined_file: combined_file.into(),
            source_label: source_label.into(),
            pause: Duration::from_secs(1),
        }
    }

    /// Pause between successive document fetches.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub async fn run(&self, page_urls: &[String]) -> Result<DocumentSummary> {
        std::fs::create_dir_all(&self.documents_dir).with_context(|| {
            format!("Failed to create {}", self.documents_dir.display())
        })?;

        let links = self.collect_links(page_urls).await?;
        let mut summary = DocumentSummary {
            links: links.len(),
            ..Default::default()
        };

        if links.is_empty() {
            warn!("No agenda or packet links found; nothing to combine");
            return Ok(summary);
        }
        info!("Found {} document links", links.len());

        let mut fetched_any = false;
        for (index, link) in links.iter().enumerate() {
            let path = self.documents_dir.join(link.file_name());
            if path.exists() {
                info!("[{}/{}] Already saved: {:?}", index + 1, links.len(), path);
                summary.existing += 1;
                continue;
            }

            if fetched_any {
                tokio::time::sleep(self.pause).await;
            }
            fetched_any = true;

            info!(
                "[{}/{}] Fetching {} for {}",
                index + 1,
                links.len(),
                link.kind,
                link.meeting_info
            );
            let html = match self.source.fetch_page(&link.url).await {
                Ok(html) => html,
                Err(e) => {
                    error!("Skipping {}: {:#}", link.url, e);
                    summary.failed += 1;
                    continue;
                }
            };

            let text = extract_text(&html);
            match write_atomic(&path, link.render(&text).as_bytes()) {
                Ok(()) => {
                    info!("Saved {:?} ({} characters)", path, text.len());
                    summary.saved += 1;
                }
                Err(e) => {
                    error!("Failed to save {:?}: {:#}", path, e);
                    summary.failed += 1;
                }
            }
        }

        summary.combined = combine_documents(
            &self.documents_dir,
            &self.combined_file,
            &self.source_label,
        )?;
        Ok(summary)
    }

    async fn collect_links(&self, page_urls: &[String]) -> Result<Vec<DocumentLink>> {
        let mut links = Vec::new();
        let mut pages_failed = 0;

        for page_url in page_urls {
            let parsed = match Url::parse(page_url) {
                Ok(url) => url,
                Err(e) => {
                    error!("Invalid page URL {}: {}", page_url, e);
                    pages_failed += 1;
                    continue;
                }
            };
            match self.source.fetch_page(page_url).await {
                Ok(html) => links.extend(find_document_links(&html, &parsed)),
                Err(e) => {
                    error!("Error scraping page {}: {:#}", page_url, e);
                    pages_failed += 1;
                }
            }
        }

        if pages_failed > 0 && pages_failed == page_urls.len() {
            bail!("All {} archive pages failed to load", pages_failed);
        }
        Ok(links)
    }
}

/// Concatenate every `.txt` in `documents_dir` (by name) into `output` under a
/// banner. Returns the number of files combined.
pub fn combine_documents(documents_dir: &Path, output: &Path, source_label: &str) -> Result<usize> {
    let mut files = Vec::new();
    for entry in WalkDir::new(documents_dir).min_depth(1).max_depth(1) {
        let entry =
            entry.with_context(|| format!("Failed to read {}", documents_dir.display()))?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().is_some_and(|ext| ext == "txt")
            && path != output
        {
            files.push(entry.into_path());
        }
    }
    files.sort();

    if files.is_empty() {
        warn!("No documents found in {:?} to combine", documents_dir);
        return Ok(0);
    }

    let rule = "=".repeat(RULE_WIDTH);
    let mut parts = vec![
        rule.clone(),
        COMBINED_TITLE.to_string(),
        format!("Scraped from: {}", source_label),
        format!("Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
        rule.clone(),
        "\n\n".to_string(),
    ];
    for file in &files {
        let content = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        parts.push(content);
        parts.push(format!("\n{}\n\n", rule));
    }

    let combined = parts.join("\n");
    write_atomic(output, combined.as_bytes())?;
    info!(
        "Combined {} documents into {:?} ({} characters)",
        files.len(),
        output,
        combined.len()
    );
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PAGE: &str = r#"
        <html><body>
          <a href="/adaHtmlDocument/index?cc=1&id=7">
            <img alt="HTML Agenda for November 13, 2025 City Council Regular Meeting at 6:00 PM">
          </a>
          <a href="/adaHtmlDocument/index?cc=1&id=8">
            <img alt="HTML Packet for November 13, 2025 City Council Regular Meeting at 6:00 PM">
          </a>
          <a href="/adaHtmlDocument/index?cc=1&id=9"><img alt="Minutes for something"></a>
          <a href="/Document/pdf?id=7"><img alt="HTML Agenda for not accessible"></a>
        </body></html>
    "#;

    fn page_url() -> Url {
        Url::parse("https://meetings.example/PublishPage?p=1").unwrap()
    }

    #[test]
    fn test_find_document_links() {
        let links = find_document_links(PAGE, &page_url());

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].kind, DocumentKind::Agenda);
        assert_eq!(
            links[0].url,
            "https://meetings.example/adaHtmlDocument/index?cc=1&id=7"
        );
        assert_eq!(
            links[0].meeting_info,
            "November 13, 2025 City Council Regular Meeting at 6:00 PM"
        );
        assert_eq!(links[1].kind, DocumentKind::Packet);
    }

    #[test]
    fn test_file_name_uses_canonical_id() {
        let link = DocumentLink {
            url: "https://meetings.example/adaHtmlDocument/index?id=7".to_string(),
            kind: DocumentKind::Packet,
            meeting_info: "November 13, 2025 City Council Regular Meeting at 6:00 PM".to_string(),
        };
        assert_eq!(
            link.file_name(),
            "2025-11-13T1800_City_Council_Regular_Meeting_packet.txt"
        );
    }

    #[test]
    fn test_meeting_info_without_for() {
        assert_eq!(
            meeting_info("HTML Agenda Budget Workshop", DocumentKind::Agenda),
            "Budget Workshop"
        );
        assert_eq!(meeting_info("HTML Agenda", DocumentKind::Agenda), "Unknown Meeting");
    }

    #[test]
    fn test_extract_text_drops_chrome() {
        let html = r#"
            <html><head><title>Ignored</title><style>p { color: red }</style></head>
            <body>
              <header>Site header</header>
              <nav><a href="/">Home</a></nav>
              <h1>  Agenda  </h1>
              <p>1. Call to order</p>
              <script>var x = 1;</script>
              <p>
                 2. Roll call
              </p>
              <footer>Footer text</footer>
            </body></html>
        "#;
        assert_eq!(extract_text(html), "Agenda\n1. Call to order\n2. Roll call");
    }

    #[test]
    fn test_render_header() {
        let link = DocumentLink {
            url: "https://x/adaHtmlDocument?id=1".to_string(),
            kind: DocumentKind::Agenda,
            meeting_info: "Budget Workshop".to_string(),
        };
        let rendered = link.render("Body");
        let mut lines = rendered.lines();
        assert_eq!(lines.next(), Some("DOCUMENT TYPE: HTML Agenda"));
        assert_eq!(lines.next(), Some("MEETING: Budget Workshop"));
        assert_eq!(lines.next(), Some("URL: https://x/adaHtmlDocument?id=1"));
        assert_eq!(lines.next(), Some("=".repeat(80).as_str()));
        assert!(rendered.ends_with("\n\nBody\n\n"));
    }

    #[test]
    fn test_combine_documents_in_name_order() {
        let dir = TempDir::new().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir(&docs).unwrap();
        fs::write(docs.join("b.txt"), "second").unwrap();
        fs::write(docs.join("a.txt"), "first").unwrap();
        fs::write(docs.join("skip.html"), "nope").unwrap();
        let output = dir.path().join("combined.txt");

        let count = combine_documents(&docs, &output, "https://source").unwrap();

        assert_eq!(count, 2);
        let combined = fs::read_to_string(&output).unwrap();
        assert!(combined.starts_with(&"=".repeat(80)));
        assert!(combined.contains(COMBINED_TITLE));
        assert!(combined.contains("Scraped from: https://source"));
        let first = combined.find("first").unwrap();
        let second = combined.find("second").unwrap();
        assert!(first < second);
        assert!(!combined.contains("nope"));
    }

    #[test]
    fn test_combine_empty_dir_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("combined.txt");
        assert_eq!(combine_documents(dir.path(), &output, "src").unwrap(), 0);
        assert!(!output.exists());
    }
}
