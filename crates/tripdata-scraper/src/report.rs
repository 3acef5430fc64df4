//! Console progress lines.

use std::io::{self, Write};
use std::path::Path;

use crate::config::DEFAULT_PATTERN;
use crate::download::DownloadSummary;
use crate::error::ScrapeError;
use crate::extract::Link;

/// Writes human-readable progress, one line per event.
pub struct Reporter<W: Write = io::Stdout> {
    out: W,
}

impl Reporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Match count followed by every matched link.
    pub fn found(&mut self, links: &[Link], pattern: &str) -> io::Result<()> {
        if pattern == DEFAULT_PATTERN {
            writeln!(self.out, "Found {} Yellow Taxi files:", links.len())?;
        } else {
            writeln!(self.out, "Found {} files matching '{pattern}':", links.len())?;
        }
        for link in links {
            writeln!(self.out, "{link}")?;
        }
        Ok(())
    }

    pub fn skipping(&mut self, file_name: &str) -> io::Result<()> {
        writeln!(self.out, "{file_name} already exists, skipping...")
    }

    pub fn unnamed(&mut self, link: &Link) -> io::Result<()> {
        writeln!(self.out, "{link} has no file name, skipping...")
    }

    pub fn downloading(&mut self, file_name: &str) -> io::Result<()> {
        writeln!(self.out, "Downloading {file_name}...")?;
        self.out.flush()
    }

    pub fn failed(&mut self, file_name: &str, error: &ScrapeError) -> io::Result<()> {
        writeln!(
            self.out,
            "Failed to download {file_name}: {}",
            error.chain_message()
        )
    }

    pub fn dry_run(&mut self, count: usize, dir: &Path) -> io::Result<()> {
        writeln!(
            self.out,
            "Dry run: {count} files would be considered for {}",
            dir.display()
        )
    }

    pub fn finished(&mut self, summary: &DownloadSummary, dir: &Path) -> io::Result<()> {
        if summary.is_clean() {
            writeln!(self.out, "✅ All files downloaded to {}", dir.display())?;
        } else {
            writeln!(
                self.out,
                "⚠ {} of {} files failed; completed files are in {}",
                summary.failed.len(),
                summary.total(),
                dir.display()
            )?;
        }
        self.out.flush()
    }
}
