//! Memoized GETs for the roster adapters.
//!
//! A response fetched during this session is reused without touching the network until
//! the session TTL passes (no TTL means for the whole session). Bodies are also kept on
//! disk so the next session can revalidate with `If-None-Match` / `If-Modified-Since`.
//! The key is the full URL, i.e. provider host plus query parameters.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ETAG, HeaderMap, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const STORE_FORMAT: u32 = 1;
const CACHE_DIR: &str = "prop_edge";
const STORE_FILE: &str = "responses.json";

static SESSION: Mutex<Option<Session>> = Mutex::new(None);

struct Session {
    ttl: Option<Duration>,
    seen: HashMap<String, Instant>,
    store: DiskStore,
    /// Responses remembered since the store was last written.
    dirty: bool,
}

impl Session {
    fn open() -> Self {
        Self {
            ttl: None,
            seen: HashMap::new(),
            store: DiskStore::read(),
            dirty: false,
        }
    }

    /// Body fetched earlier in this session and still inside the TTL.
    fn memoized(&self, url: &str, now: Instant) -> Option<String> {
        let seen_at = *self.seen.get(url)?;
        if let Some(ttl) = self.ttl {
            if now.saturating_duration_since(seen_at) >= ttl {
                return None;
            }
        }
        self.store.responses.get(url).map(|r| r.body.clone())
    }

    fn remember(&mut self, url: &str, response: StoredResponse) {
        self.seen.insert(url.to_string(), Instant::now());
        self.store.responses.insert(url.to_string(), response);
        self.dirty = true;
    }

    /// Snapshot to write, if anything changed. Clears the dirty flag.
    fn take_dirty(&mut self) -> Option<DiskStore> {
        if !std::mem::take(&mut self.dirty) {
            return None;
        }
        Some(self.store.clone())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DiskStore {
    format: u32,
    responses: HashMap<String, StoredResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredResponse {
    body: String,
    etag: Option<String>,
    last_modified: Option<String>,
}

impl StoredResponse {
    fn conditional(&self, mut req: RequestBuilder) -> RequestBuilder {
        if let Some(etag) = &self.etag {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(stamp) = &self.last_modified {
            req = req.header(IF_MODIFIED_SINCE, stamp);
        }
        req
    }
}

impl DiskStore {
    /// A missing, unreadable or older-format file is an empty store.
    fn read() -> Self {
        let raw = store_path().and_then(|path| fs::read_to_string(path).ok());
        match raw.and_then(|raw| serde_json::from_str::<DiskStore>(&raw).ok()) {
            Some(store) if store.format == STORE_FORMAT => store,
            _ => DiskStore {
                format: STORE_FORMAT,
                responses: HashMap::new(),
            },
        }
    }

    fn write(&self) -> Result<()> {
        let Some(path) = store_path() else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let staging = path.with_extension("json.partial");
        let json = serde_json::to_string(self).context("encode response store")?;
        fs::write(&staging, json).context("write response store")?;
        fs::rename(&staging, &path).context("replace response store")?;
        Ok(())
    }
}

fn session() -> MutexGuard<'static, Option<Session>> {
    SESSION.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// `None` keeps memoized responses for the life of the process.
pub fn set_session_ttl(ttl: Option<Duration>) {
    session().get_or_insert_with(Session::open).ttl = ttl;
}

/// Writes responses gathered since the last flush to disk. The file write happens
/// outside the session lock so concurrent fetches are not held up by it.
pub fn flush() {
    let snapshot = session().as_mut().and_then(Session::take_dirty);
    if let Some(store) = snapshot {
        if let Err(err) = store.write() {
            warn!("response store not saved: {err:#}");
        }
    }
}

/// Forget what this session fetched; the next request revalidates against the server.
pub fn clear_session() {
    if let Some(s) = session().as_mut() {
        s.seen.clear();
    }
}

pub fn fetch_json_cached(
    client: &Client,
    url: &str,
    extra_headers: &[(&str, &str)],
) -> Result<String> {
    let previous = {
        let mut guard = session();
        let s = guard.get_or_insert_with(Session::open);
        if let Some(body) = s.memoized(url, Instant::now()) {
            debug!(url, "session cache hit");
            return Ok(body);
        }
        s.store.responses.get(url).cloned()
    };

    let mut req = extra_headers
        .iter()
        .fold(client.get(url), |req, (name, value)| req.header(*name, *value));
    if let Some(prev) = &previous {
        req = prev.conditional(req);
    }

    let resp = req.send().with_context(|| format!("GET {url}"))?;
    let status = resp.status();
    if status == StatusCode::NOT_MODIFIED {
        let Some(prev) = previous else {
            bail!("304 for {url} with nothing stored");
        };
        debug!(url, "revalidated");
        let body = prev.body.clone();
        session().get_or_insert_with(Session::open).remember(url, prev);
        return Ok(body);
    }

    let etag = header_value(resp.headers(), ETAG);
    let last_modified = header_value(resp.headers(), LAST_MODIFIED);
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        bail!("http {status}: {}", snippet(&body, 200));
    }

    let stored = StoredResponse {
        body: body.clone(),
        etag,
        last_modified,
    };
    session().get_or_insert_with(Session::open).remember(url, stored);
    Ok(body)
}

fn header_value(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?;
    Some(value.to_string())
}

/// `$XDG_CACHE_HOME/prop_edge`, falling back to `~/.cache/prop_edge`.
pub fn app_cache_dir() -> Option<PathBuf> {
    let xdg = std::env::var("XDG_CACHE_HOME")
        .ok()
        .filter(|base| !base.trim().is_empty());
    if let Some(base) = xdg {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok().filter(|h| !h.trim().is_empty())?;
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn store_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(STORE_FILE))
}

fn snippet(s: &str, max: usize) -> &str {
    s.char_indices().nth(max).map_or(s, |(idx, _)| &s[..idx])
}
