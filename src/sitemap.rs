//! Google News sitemap rendering and output.

use crate::feed::FeedItem;
use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
const NEWS_NS: &str = "http://www.google.com/schemas/sitemap-news/0.9";

/// Publication details repeated in every `<news:publication>` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub name: String,
    pub language: String,
}

impl Publication {
    pub fn new(name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
        }
    }
}

/// Renders items as a News sitemap document.
///
/// One `<url>` per item, in the order given. Links and titles are written
/// as escaped element text; dates as `YYYY-MM-DDTHH:MM:SSZ`. An empty
/// slice produces a `<urlset>` with no children.
pub fn render_sitemap(items: &[FeedItem], publication: &Publication) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .context("Failed to write XML declaration")?;

    let mut urlset = BytesStart::new("urlset");
    urlset.push_attribute(("xmlns", SITEMAP_NS));
    urlset.push_attribute(("xmlns:news", NEWS_NS));
    writer
        .write_event(Event::Start(urlset))
        .context("Failed to write urlset element")?;

    for item in items {
        write_url(&mut writer, item, publication)
            .with_context(|| format!("Failed to write sitemap entry for {}", item.link))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("urlset")))
        .context("Failed to write urlset end")?;

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).context("Generated sitemap contains invalid UTF-8")
}

fn write_url<W: std::io::Write>(
    writer: &mut Writer<W>,
    item: &FeedItem,
    publication: &Publication,
) -> Result<()> {
    let published = item.published.format("%Y-%m-%dT%H:%M:%SZ").to_string();

    writer.write_event(Event::Start(BytesStart::new("url")))?;
    write_text_element(writer, "loc", &item.link)?;

    writer.write_event(Event::Start(BytesStart::new("news:news")))?;
    writer.write_event(Event::Start(BytesStart::new("news:publication")))?;
    write_text_element(writer, "news:name", &publication.name)?;
    write_text_element(writer, "news:language", &publication.language)?;
    writer.write_event(Event::End(BytesEnd::new("news:publication")))?;
    write_text_element(writer, "news:publication_date", &published)?;
    write_text_element(writer, "news:title", &item.title)?;
    writer.write_event(Event::End(BytesEnd::new("news:news")))?;

    writer.write_event(Event::End(BytesEnd::new("url")))?;
    Ok(())
}

/// `<name>text</name>` on one line. `BytesText::new` escapes the content.
fn write_text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Writes the sitemap to `path`, replacing any existing file.
///
/// The document is staged in a hidden sibling file, flushed and synced,
/// then renamed over `path`. On failure the staging file is removed and
/// `path` is left as it was.
pub async fn write_sitemap(content: &str, path: &Path) -> Result<()> {
    let staging = staging_path(path);

    if let Err(e) = write_synced(&staging, content.as_bytes()).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(e).with_context(|| format!("Failed to stage sitemap at '{}'", staging.display()));
    }

    if let Err(e) = tokio::fs::rename(&staging, path).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(e).with_context(|| format!("Failed to move sitemap into '{}'", path.display()));
    }

    Ok(())
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}

/// `dir/news-sitemap.xml` → `dir/.news-sitemap.xml.<pid>.<nanos>.tmp`
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sitemap".to_string());
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    path.with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), nanos))
}
