// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! HTTP registry client.
//!
//! Modules are served Go-proxy style: `https://<path>/@v/list` returns the
//! published versions one per line, `https://<path>/@v/<version>.zip` the
//! archive. Extractions are cached; cache hits never touch the network.
//! Cancellation is by dropping the returned future; every request also has
//! a hard timeout.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::Retry;
use tracing::{debug, info};

use crate::index::Index;
use crate::module::{extract_dir, split_version};
use crate::version::{parse_listed, parse_selector, pick_latest};
use crate::INDEX_MODULE;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Retry delays in milliseconds: 250, 500 (three attempts total).
const RETRY_BASE_MS: u64 = 2;
const RETRY_FACTOR: u64 = 125;
const RETRY_COUNT: usize = 2;

pub struct RegistryClient {
    http: reqwest::Client,
    cache_root: PathBuf,
}

impl RegistryClient {
    /// Cache root: `$LIFTOFF_CACHE_DIR`, else the platform cache directory.
    pub fn new() -> anyhow::Result<Self> {
        let cache_root = std::env::var_os("LIFTOFF_CACHE_DIR")
            .map(PathBuf::from)
            .or_else(|| dirs::cache_dir().map(|c| c.join("liftoff")))
            .context("cannot determine a cache directory")?;
        Ok(Self::with_cache_root(cache_root))
    }

    pub fn with_cache_root(cache_root: PathBuf) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { http, cache_root }
    }

    /// Exposed so the composer can compute `@module/` paths.
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Published versions of a version-less module path, unsorted.
    pub async fn list_versions(&self, module: &str) -> anyhow::Result<Vec<semver::Version>> {
        let url = format!("https://{module}/@v/list");
        let body = self
            .get_text(&url)
            .await
            .with_context(|| format!("listing versions of {module}"))?;
        Ok(body.lines().filter_map(parse_listed).collect())
    }

    /// Translate a major selector (`…@v0`) into the newest canonical
    /// versioned path (`…@v0.3.1`).
    pub async fn resolve_latest(&self, module: &str) -> anyhow::Result<String> {
        let (path, major) = parse_selector(module)?;
        let versions = self.list_versions(path).await?;
        let latest = pick_latest(&versions, major).with_context(|| match major {
            Some(m) => format!("{path} has no published v{m}.x version"),
            None => format!("{path} has no published versions"),
        })?;
        Ok(format!("{path}@v{latest}"))
    }

    /// Ensure a canonical versioned module is cached; returns its extraction
    /// directory.
    pub async fn fetch(&self, canonical: &str) -> anyhow::Result<PathBuf> {
        let (path, version) = split_version(canonical);
        let Some(version) = version else {
            bail!("{canonical:?} has no version; resolve it first");
        };
        let dest = extract_dir(&self.cache_root, canonical);
        if dest.is_dir() {
            debug!(module = canonical, dir = %dest.display(), "module cache hit");
            return Ok(dest);
        }

        let url = format!("https://{path}/@v/{version}.zip");
        info!(module = canonical, "fetching module");
        let bytes = self
            .get_bytes(&url)
            .await
            .with_context(|| format!("fetching {canonical}"))?;

        // Extract next to the destination, then rename, so a crash never
        // leaves a half-populated cache entry behind.
        let parent = dest
            .parent()
            .with_context(|| format!("no parent for {}", dest.display()))?;
        tokio::fs::create_dir_all(parent).await?;
        let staging = tempfile::tempdir_in(parent)?;
        let staging_path = staging.path().to_path_buf();
        tokio::task::spawn_blocking(move || extract_zip(&bytes, &staging_path))
            .await
            .context("archive extraction task")??;
        match tokio::fs::rename(staging.into_path(), &dest).await {
            Ok(()) => {}
            // A concurrent invocation may have won the race; its extraction
            // is byte-identical.
            Err(_) if dest.is_dir() => {}
            Err(e) => return Err(e).with_context(|| format!("installing {}", dest.display())),
        }
        Ok(dest)
    }

    /// Fetch and parse the well-known catalogue module of a registry base.
    pub async fn fetch_index(&self, registry: &str) -> anyhow::Result<Index> {
        let canonical = self
            .resolve_latest(&format!("{registry}/{INDEX_MODULE}@v0"))
            .await?;
        let dir = self.fetch(&canonical).await?;
        let path = dir.join("index.yaml");
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    async fn get_text(&self, url: &str) -> anyhow::Result<String> {
        Retry::spawn(retry_strategy(), || async move {
            let resp = self.http.get(url).send().await?.error_for_status()?;
            Ok::<_, anyhow::Error>(resp.text().await?)
        })
        .await
    }

    async fn get_bytes(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        Retry::spawn(retry_strategy(), || async move {
            let resp = self.http.get(url).send().await?.error_for_status()?;
            Ok::<_, anyhow::Error>(resp.bytes().await?.to_vec())
        })
        .await
    }
}

fn retry_strategy() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(RETRY_BASE_MS)
        .factor(RETRY_FACTOR)
        .take(RETRY_COUNT)
}

/// Unpack a zip archive into `dest`, rejecting entries that escape it.
fn extract_zip(bytes: &[u8], dest: &Path) -> anyhow::Result<()> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).context("opening module archive")?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(rel) = entry.enclosed_name() else {
            bail!("archive entry {:?} escapes the extraction root", entry.name());
        };
        let out = dest.join(rel);
        if entry.is_dir() {
            std::fs::create_dir_all(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(&out)?;
        std::io::copy(&mut entry, &mut file)?;
    }
    Ok(())
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn make_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(&mut buf);
        for (name, body) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        buf.into_inner()
    }

    #[test]
    fn extract_zip_writes_nested_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let bytes = make_zip(&[("index.yaml", "agents: {}\n"), ("sub/notes.md", "hi")]);
        extract_zip(&bytes, tmp.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("index.yaml")).unwrap(),
            "agents: {}\n"
        );
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("sub/notes.md")).unwrap(),
            "hi"
        );
    }

    #[test]
    fn extract_zip_rejects_path_escape() {
        let tmp = tempfile::tempdir().unwrap();
        let bytes = make_zip(&[("../evil.txt", "x")]);
        assert!(extract_zip(&bytes, tmp.path()).is_err());
    }

    #[tokio::test]
    async fn fetch_requires_canonical_version() {
        let tmp = tempfile::tempdir().unwrap();
        let client = RegistryClient::with_cache_root(tmp.path().to_path_buf());
        let err = client.fetch("host/org/thing").await.unwrap_err();
        assert!(err.to_string().contains("no version"));
    }

    #[tokio::test]
    async fn fetch_cache_hit_skips_network() {
        let tmp = tempfile::tempdir().unwrap();
        let client = RegistryClient::with_cache_root(tmp.path().to_path_buf());
        let canonical = "host/org/tasks/review@v0.1.2";
        let dir = extract_dir(tmp.path(), canonical);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("task.yaml"), "prompt: hi\n").unwrap();
        // No HTTP server exists; success proves the cache short-circuits.
        let fetched = client.fetch(canonical).await.unwrap();
        assert_eq!(fetched, dir);
    }

    #[test]
    fn cache_root_is_exposed() {
        let client = RegistryClient::with_cache_root(PathBuf::from("/tmp/c"));
        assert_eq!(client.cache_root(), Path::new("/tmp/c"));
    }
}
