//! Canonicalization and validation of wiki URLs.
//!
//! Every URL entering the frontier passes through here first: reject
//! early, and the frontier never explodes into foreign hosts or asset
//! files.

use url::Url;
use wikivec_core::error::{Error, Result};

/// File extensions that never carry indexable page content.
const EXCLUDED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "zip", "rar", "jpg", "jpeg", "png", "gif", "svg", "ico",
    "css", "js",
];

const EXCLUDED_PATH_SEGMENTS: &[&str] = &["api", "admin"];

pub struct UrlPolicy {
    base: Url,
}

impl UrlPolicy {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| Error::InvalidConfig(format!("bad base url {base_url}: {e}")))?;
        if base.host_str().is_none() {
            return Err(Error::InvalidConfig(format!(
                "base url {base_url} has no host"
            )));
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Joins the configured seed paths against the base URL, dropping
    /// anything the policy rejects.
    pub fn seeds(&self, paths: &[String]) -> Vec<String> {
        paths
            .iter()
            .filter_map(|p| self.accept(&self.base, p))
            .collect()
    }

    /// Normalizes `href` relative to the page it appeared on and
    /// validates the result. `None` means the link must not be
    /// enqueued.
    pub fn accept(&self, page: &Url, href: &str) -> Option<String> {
        let mut joined = page.join(href).ok()?;
        if joined.scheme() != "http" && joined.scheme() != "https" {
            return None;
        }
        joined.set_fragment(None);
        joined.set_query(None);

        // Extensionless paths get a canonical trailing slash so the
        // same page never appears under two spellings.
        let path = joined.path().to_string();
        if !path.ends_with('/') && !has_extension(&path) {
            joined.set_path(&format!("{path}/"));
        }

        if !self.is_valid(&joined) {
            return None;
        }
        Some(joined.to_string())
    }

    /// Checks a fully-parsed URL against the host and path rules.
    pub fn validate(&self, url: &Url) -> bool {
        self.is_valid(url)
    }

    fn is_valid(&self, url: &Url) -> bool {
        if url.host_str() != self.base.host_str() {
            return false;
        }
        let path = url.path().to_ascii_lowercase();
        if let Some(ext) = extension_of(&path) {
            if EXCLUDED_EXTENSIONS.contains(&ext) {
                return false;
            }
        }
        for segment in path.split('/') {
            if EXCLUDED_PATH_SEGMENTS.contains(&segment) {
                return false;
            }
        }
        true
    }
}

fn has_extension(path: &str) -> bool {
    extension_of(path).is_some()
}

fn extension_of(path: &str) -> Option<&str> {
    let last = path.rsplit('/').next()?;
    let (_, ext) = last.rsplit_once('.')?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext)
}
