//! RSS feed retrieval and parsing.
//!
//! - [`fetcher`] - Single-shot HTTP download of a feed body
//! - [`parser`] - Extraction of `<item>` title, link and publish date
//!
//! Both report whole-feed failures as errors. Items that lack a link or
//! a usable date are not errors; the parser drops and counts them.

mod fetcher;
mod parser;

pub use fetcher::{fetch_feed, FetchError};
pub use parser::{parse_feed, parse_pub_date, FeedItem, ParseError, ParseResult};
