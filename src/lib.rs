//! The docforge library turns scraped API documentation pages into
//! connector definitions for an integration platform: pages are reduced
//! to bounded, priority-ordered digests, an LLM mines the digests for
//! cURL commands, and the commands are validated against the
//! `<<namespace.name>>` placeholder grammar before export or push.

pub mod auth;
pub mod classify;
pub mod config;
pub mod constants;
pub mod content;
pub mod dedupe;
pub mod digest;
pub mod export;
pub mod extract;
pub mod mapping;
pub mod platform;
pub mod scrape;
pub mod sitemap;
pub mod storage;

/// Enum representing the target for digesting.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub enum DigestTarget {
    /// All database pages.
    #[default]
    All,
    /// A page with specified URL.
    Page { url: String },
}

impl From<&str> for DigestTarget {
    fn from(value: &str) -> Self {
        match value {
            "all" => Self::All,
            url => Self::Page {
                url: url.to_string(),
            },
        }
    }
}

/// Enum representing the target for command extraction.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub enum ExtractTarget {
    /// All digested pages with no extracted commands.
    #[default]
    Unextracted,
    /// All digested pages.
    All,
    /// A page with specified URL.
    Page { url: String },
}

impl From<&str> for ExtractTarget {
    fn from(value: &str) -> Self {
        match value {
            "unextracted" => Self::Unextracted,
            "all" => Self::All,
            url => Self::Page {
                url: url.to_string(),
            },
        }
    }
}

pub use config::DigestConfig;
pub use digest::{assemble, digest_db_pages, digest_page};
pub use export::export;
pub use extract::extract;
pub use mapping::normalize;
pub use scrape::process_sitemap;
