use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// Numeric-offset layouts tried after RFC 2822 fails, weekday already removed.
const ZONED_DATE_FORMATS: &[&str] = &["%d %b %Y %-H:%M:%S %z", "%d %b %Y %-H:%M %z"];

/// Zone-less layouts. Dates matched here are taken as UTC.
const NAIVE_DATE_FORMATS: &[&str] = &["%d %b %Y %-H:%M:%S", "%d %b %Y %-H:%M"];

/// Errors that make a whole feed unusable.
///
/// Individual items with missing or unparseable fields never produce
/// an error; they are counted in [`ParseResult::skipped`] instead.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document is not well-formed XML.
    #[error("XML parse error at byte {position}: {message}")]
    Xml { position: u64, message: String },
    /// Element text contained an unknown entity or invalid UTF-8.
    #[error("Invalid text in <{element}>: {message}")]
    Text { element: String, message: String },
    /// The input contained no element at all.
    #[error("Document has no root element")]
    NoRootElement,
    /// The input ended while elements were still open.
    #[error("Document ended with {0} unclosed element(s)")]
    Truncated(usize),
}

/// One feed entry after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    /// Trimmed title text; may be empty. Escaped only when rendered.
    pub title: String,
    /// Trimmed absolute link. Deduplication key across the whole run.
    pub link: String,
    /// Publication time, always UTC.
    pub published: DateTime<Utc>,
}

/// Items recovered from one feed plus the number of `<item>` elements dropped.
#[derive(Debug, Default)]
pub struct ParseResult {
    pub items: Vec<FeedItem>,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    PubDate,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"pubDate" => Some(Field::PubDate),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Link => "link",
            Field::PubDate => "pubDate",
        }
    }
}

/// Raw text of the first `title`, `link` and `pubDate` children of an item.
#[derive(Default)]
struct RawItem {
    title: Option<String>,
    link: Option<String>,
    pub_date: Option<String>,
}

impl RawItem {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::PubDate => &mut self.pub_date,
        }
    }

    fn into_item(self) -> Option<FeedItem> {
        let link = self.link.unwrap_or_default();
        let link = link.trim();
        let pub_date = self.pub_date.unwrap_or_default();
        if link.is_empty() || pub_date.trim().is_empty() {
            return None;
        }

        let published = parse_pub_date(&pub_date)?;

        Some(FeedItem {
            title: self.title.unwrap_or_default().trim().to_string(),
            link: link.to_string(),
            published,
        })
    }
}

/// Field currently being read, with the depth its start tag opened.
struct OpenField {
    field: Field,
    depth: usize,
    text: String,
    /// Set once a child element opens; only text before it belongs to the field.
    child_seen: bool,
}

impl OpenField {
    fn collecting(&self, depth: usize) -> bool {
        self.depth == depth && !self.child_seen
    }
}

/// Parses RSS bytes into normalized feed items.
///
/// Every `<item>` element is visited regardless of where it sits in the
/// document. Within an item only direct children named `title`, `link`
/// and `pubDate` are read, first occurrence wins, and a missing child
/// counts as empty text. Items with an empty link, an empty `pubDate`, or
/// a date that cannot be parsed are dropped and counted in `skipped`.
///
/// # Errors
///
/// Returns [`ParseError`] when the document is not well-formed. Entity
/// references other than the five XML builtins are rejected here as well,
/// since quick-xml never expands `<!ENTITY>` declarations.
pub fn parse_feed(bytes: &[u8]) -> Result<ParseResult, ParseError> {
    let mut reader = Reader::from_reader(bytes);

    let mut result = ParseResult::default();
    let mut buf = Vec::new();
    let mut depth: usize = 0;
    let mut seen_root = false;

    // Innermost open <item> and its depth; nested items replace the outer one until closed.
    let mut items: Vec<(usize, RawItem)> = Vec::new();
    let mut open_field: Option<OpenField> = None;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| ParseError::Xml {
            position: reader.error_position() as u64,
            message: e.to_string(),
        })?;

        match event {
            Event::Start(e) => {
                depth += 1;
                seen_root = true;
                let name = e.name();

                if let Some(open) = open_field.as_mut() {
                    open.child_seen = true;
                }

                if name.as_ref() == b"item" {
                    items.push((depth, RawItem::default()));
                } else if open_field.is_none() {
                    if let Some((item_depth, raw)) = items.last_mut() {
                        if depth == *item_depth + 1 {
                            if let Some(field) = Field::from_name(name.as_ref()) {
                                if raw.slot(field).is_none() {
                                    open_field = Some(OpenField {
                                        field,
                                        depth,
                                        text: String::new(),
                                        child_seen: false,
                                    });
                                }
                            }
                        }
                    }
                }
            }
            Event::Empty(e) => {
                seen_root = true;
                if let Some(open) = open_field.as_mut() {
                    open.child_seen = true;
                }
                if let Some((item_depth, raw)) = items.last_mut() {
                    if open_field.is_none() && depth == *item_depth {
                        if let Some(field) = Field::from_name(e.name().as_ref()) {
                            raw.slot(field).get_or_insert_with(String::new);
                        }
                    }
                }
            }
            Event::End(_) => {
                if let Some(open) = open_field.take_if(|f| f.depth == depth) {
                    if let Some((_, raw)) = items.last_mut() {
                        *raw.slot(open.field) = Some(open.text);
                    }
                }

                if items.last().is_some_and(|(d, _)| *d == depth) {
                    if let Some((_, raw)) = items.pop() {
                        match raw.into_item() {
                            Some(item) => result.items.push(item),
                            None => result.skipped += 1,
                        }
                    }
                }

                depth = depth.saturating_sub(1);
            }
            Event::Text(t) => {
                if let Some(open) = open_field.as_mut().filter(|f| f.collecting(depth)) {
                    let text = t.unescape().map_err(|e| ParseError::Text {
                        element: open.field.name().to_string(),
                        message: e.to_string(),
                    })?;
                    open.text.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(open) = open_field.as_mut().filter(|f| f.collecting(depth)) {
                    let text = std::str::from_utf8(&c).map_err(|e| ParseError::Text {
                        element: open.field.name().to_string(),
                        message: e.to_string(),
                    })?;
                    open.text.push_str(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(ParseError::NoRootElement);
    }
    if depth > 0 {
        return Err(ParseError::Truncated(depth));
    }

    Ok(result)
}

/// Parses an RSS `pubDate` into UTC.
///
/// The leading day name is ignored, so a weekday that disagrees with the
/// date does not reject it. RFC 2822 zones and numeric offsets are
/// converted; the obsolete `-0000` zone means UTC. Dates with no zone, or
/// with a zone name chrono does not know (`CEST`), are read as UTC.
/// Returns `None` for anything else.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let date = strip_weekday(raw.trim());

    if let Ok(dt) = DateTime::parse_from_rfc2822(date) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(dt) = ZONED_DATE_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(date, fmt).ok())
    {
        return Some(dt.with_timezone(&Utc));
    }

    let date = strip_zone_name(date);
    NAIVE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(date, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// `"Mon, 12 Oct ..."` → `"12 Oct ..."`.
fn strip_weekday(date: &str) -> &str {
    match date.split_once(',') {
        Some((day, rest))
            if !day.trim().is_empty() && day.trim().chars().all(|c| c.is_ascii_alphabetic()) =>
        {
            rest.trim_start()
        }
        _ => date,
    }
}

/// Drops a trailing alphabetic zone token such as `CEST`.
fn strip_zone_name(date: &str) -> &str {
    match date.rsplit_once(char::is_whitespace) {
        Some((rest, zone)) if !zone.is_empty() && zone.chars().all(|c| c.is_ascii_alphabetic()) => {
            rest.trim_end()
        }
        _ => date,
    }
}
