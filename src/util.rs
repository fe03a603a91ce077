use anyhow::{Context, Result};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::path::Path;
use time::OffsetDateTime;
use tracing::warn;

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    format!("{:x}", h.finalize())
}

/// `run-<unix millis>`, so run directories sort by start time.
pub fn run_dir_name(started: OffsetDateTime) -> String {
    let millis = started.unix_timestamp_nanos() / 1_000_000;
    format!("run-{millis}")
}

/// Invalid patterns are logged and dropped; order is kept.
pub fn compile_patterns(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(err) => {
                warn!("dropping invalid pattern {p}: {err}");
                None
            }
        })
        .collect()
}

pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn run_dir_uses_unix_millis() {
        assert_eq!(run_dir_name(datetime!(1970-01-01 0:00:01.5 UTC)), "run-1500");
    }

    #[test]
    fn invalid_patterns_are_dropped_in_order() {
        let res = compile_patterns(&[r"^a(\d+)$", r"(unclosed", r"^b$"]);
        assert_eq!(res.len(), 2);
        assert!(res[0].is_match("a12"));
        assert!(res[1].is_match("b"));
    }

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
