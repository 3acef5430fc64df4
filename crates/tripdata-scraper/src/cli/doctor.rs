//! Environment readiness check.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::config::ScrapeConfig;
use crate::renderer::chromium::find_chromium;

/// One line of the doctor report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub ok: bool,
    pub message: String,
}

impl Check {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Check Chromium availability, the target URL, the download directory and memory.
pub async fn run(config: &ScrapeConfig) -> Result<()> {
    println!("Tripdata Doctor");
    println!("===============");
    println!();

    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    let chromium = find_chromium();
    let chromium_check = match &chromium {
        Some(path) => Check::ok(format!("Chromium found: {}", path.display())),
        None => Check::fail(
            "Chromium NOT found in known locations. Set TRIPDATA_CHROMIUM_PATH or install google-chrome/chromium.",
        ),
    };

    let mut checks = vec![chromium_check];
    checks.extend(static_checks(config));

    match available_memory_mb() {
        Some(mb) if mb >= 256 => checks.push(Check::ok(format!("Available memory: {mb}MB"))),
        Some(mb) => checks.push(Check::fail(format!(
            "Available memory: {mb}MB (< 256MB, Chromium may not start)"
        ))),
        None => println!("[??] Could not determine available memory"),
    }

    for check in &checks {
        let tag = if check.ok { "[OK]" } else { "[!!]" };
        println!("{tag} {}", check.message);
    }

    println!();
    if checks.iter().all(|c| c.ok) {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}

/// Checks that need no browser or system probing.
pub fn static_checks(config: &ScrapeConfig) -> Vec<Check> {
    let url_check = match config.validate() {
        Ok(()) => Check::ok(format!("Target URL: {}", config.target_url)),
        Err(e) => Check::fail(e.to_string()),
    };

    vec![url_check, dir_check(&config.download_dir)]
}

fn dir_check(dir: &Path) -> Check {
    if dir.is_dir() {
        return match std::fs::metadata(dir) {
            Ok(meta) if !meta.permissions().readonly() => {
                Check::ok(format!("Download directory {} is writable", dir.display()))
            }
            _ => Check::fail(format!("Download directory {} is read-only", dir.display())),
        };
    }

    if dir.exists() {
        return Check::fail(format!("{} exists but is not a directory", dir.display()));
    }

    // It will be created on the first run; make sure something above it exists.
    let parent = nearest_existing_ancestor(dir);
    match parent {
        Some(p) => Check::ok(format!(
            "Download directory {} will be created under {}",
            dir.display(),
            p.display()
        )),
        None => Check::fail(format!("No existing parent for {}", dir.display())),
    }
}

fn nearest_existing_ancestor(dir: &Path) -> Option<PathBuf> {
    let absolute = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(dir)
    };
    absolute.ancestors().skip(1).find(|p| p.is_dir()).map(Path::to_path_buf)
}

/// Memory Chromium could use right now, in MB.
fn available_memory_mb() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
        mem_available_mb(&meminfo)
    }
    #[cfg(target_os = "macos")]
    {
        // Total physical memory; macOS has no cheap "available" figure.
        let output = std::process::Command::new("sysctl")
            .args(["-n", "hw.memsize"])
            .output()
            .ok()?;
        let bytes: u64 = String::from_utf8_lossy(&output.stdout).trim().parse().ok()?;
        Some(bytes >> 20)
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

/// `MemAvailable` from `/proc/meminfo` text, converted from kB.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn mem_available_mb(meminfo: &str) -> Option<u64> {
    let rest = meminfo
        .lines()
        .find_map(|line| line.strip_prefix("MemAvailable:"))?;
    let kb: u64 = rest.trim().trim_end_matches("kB").trim().parse().ok()?;
    Some(kb / 1024)
}
