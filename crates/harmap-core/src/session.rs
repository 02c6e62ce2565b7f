//! Captured session state (cookies) used for prompts and endpoint replay.
//!
//! Loaded once per run and never mutated afterwards.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Cookie names containing any of these look like credentials.
const AUTH_COOKIE_HINTS: &[&str] = &[
    "token",
    "auth",
    "session",
    "jwt",
    "bearer",
    "api",
    "key",
    "credential",
    "csrf",
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Cookie {
    pub name: String,
    #[serde(default)]
    pub value: String,
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, rename = "httpOnly")]
    pub http_only: bool,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

/// Either a bare cookie list or a browser storage-state document (`{"cookies": [...]}`).
#[derive(Deserialize)]
#[serde(untagged)]
enum CookieFile {
    List(Vec<Cookie>),
    StorageState { cookies: Vec<Cookie> },
}

#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    cookies: Vec<Cookie>,
}

impl SessionStore {
    pub fn new(cookies: Vec<Cookie>) -> Self {
        Self { cookies }
    }

    /// Loads cookies from a JSON file. A missing file yields an empty store;
    /// an unreadable or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("cookies file not found: {}", path.display());
            return Ok(Self::default());
        }
        let bytes =
            std::fs::read(path).with_context(|| format!("read cookies: {}", path.display()))?;
        let file: CookieFile = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse cookies JSON: {}", path.display()))?;
        let cookies = match file {
            CookieFile::List(c) | CookieFile::StorageState { cookies: c } => c,
        };
        let store = Self::new(
            cookies
                .into_iter()
                .filter(|c| !c.name.is_empty() && !c.domain.is_empty())
                .collect(),
        );
        tracing::info!(
            cookies = store.len(),
            domains = store.domain_count(),
            "loaded session cookies"
        );
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    fn domain_count(&self) -> usize {
        let mut domains: Vec<&str> = self
            .cookies
            .iter()
            .map(|c| c.domain.trim_start_matches('.'))
            .collect();
        domains.sort_unstable();
        domains.dedup();
        domains.len()
    }

    /// Cookies applicable to `host` + `path`: domain equal to or a parent of
    /// the host, and cookie path a prefix of the request path.
    pub fn cookies_for(&self, host: &str, path: &str) -> Vec<&Cookie> {
        let host = host.to_ascii_lowercase();
        self.cookies
            .iter()
            .filter(|c| domain_matches(&host, &c.domain))
            .filter(|c| path_matches(path, &c.path))
            .collect()
    }

    /// `Cookie` header value for a request, or `None` when nothing applies.
    pub fn cookie_header(&self, host: &str, path: &str) -> Option<String> {
        let cookies = self.cookies_for(host, path);
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Names of cookies that look like authentication material, in file order.
    pub fn auth_cookie_names(&self) -> Vec<String> {
        self.cookies
            .iter()
            .filter(|c| {
                let name = c.name.to_ascii_lowercase();
                AUTH_COOKIE_HINTS.iter().any(|hint| name.contains(hint))
            })
            .map(|c| c.name.clone())
            .collect()
    }
}

/// True if `host` equals `domain` (leading dot ignored) or is a subdomain of it.
pub fn domain_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim_start_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return false;
    }
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(&domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if cookie_path.is_empty() || cookie_path == "/" {
        return true;
    }
    let request_path = if request_path.is_empty() { "/" } else { request_path };
    request_path == cookie_path
        || (request_path.starts_with(cookie_path)
            && (cookie_path.ends_with('/')
                || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/')))
}
