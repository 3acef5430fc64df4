// Copyright 2026 Tripdata Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tripdata scraper library — renders the NYC TLC trip record page in
//! headless Chromium and downloads the monthly files it links to.
//!
//! The binary is a thin wrapper around [`pipeline::run`]; the page fetcher
//! and the byte source are traits so the whole run can be driven from
//! canned data in tests.

pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod logging;
pub mod pipeline;
pub mod renderer;
pub mod report;

pub use config::ScrapeConfig;
pub use download::{ByteSource, DownloadSummary, Downloader, FailurePolicy, HttpSource};
pub use error::{ScrapeError, ScrapeResult};
pub use extract::{extract_links, Link};
pub use fetch::{BrowserFetcher, PageFetcher, StaticFetcher};
pub use report::Reporter;
