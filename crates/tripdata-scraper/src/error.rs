//! Error taxonomy for a scrape run.
//!
//! Messages name only their own layer; causes hang off `source()` so a
//! `{:#}` render (anyhow) or [`ScrapeError::chain_message`] prints each once.

use std::error::Error as _;

/// Errors that can occur while fetching the index page or downloading files.
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    #[error("failed to launch browser")]
    Launch(#[source] anyhow::Error),

    #[error("navigation to {url} failed")]
    Navigation {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to read rendered page")]
    Render(#[source] anyhow::Error),

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("request failed")]
    Request(#[from] reqwest::Error),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("invalid target URL {url}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl ScrapeError {
    /// This error and every cause below it, joined with `": "`.
    pub fn chain_message(&self) -> String {
        let mut message = self.to_string();
        let mut cause = self.source();
        while let Some(err) = cause {
            message.push_str(": ");
            message.push_str(&err.to_string());
            cause = err.source();
        }
        message
    }
}

/// Convenience result type.
pub type ScrapeResult<T> = Result<T, ScrapeError>;
