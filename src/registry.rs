//! Registry façade: URL composition, retry/backoff, single-flight fetch
//! deduplication, and JSON decoding over an abstract HTTP port.
//!
//! The port itself ([`RegistryTransport`]) is deliberately the only part of
//! this module that talks HTTP; actually performing the request is out of
//! scope here. Single-threaded cooperative concurrency means the cache and
//! the in-flight-fetch table are plain `RefCell`s behind `Rc`, not
//! `Mutex`es — there is never more than one task touching them at a time,
//! just possibly several suspended `.await`s interleaved within that one
//! task.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::future::{FutureExt, Shared};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256, Sha512};

use crate::cache::Cache;
use crate::config::{CacheConfig, RegistryConfig};
use crate::error::{Error, ErrorContext};

pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Raw response from an HTTP port, independent of the registry/CDN
/// distinction so the same transport implementation and retry policy serve
/// both (§4.7's `CdnTransport` is built on the same shape).
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub headers: BTreeMap<String, String>,
    /// The URL actually reached after redirects, for the CDN port's
    /// version-resolution precedence (§6).
    pub final_url: String,
}

impl TransportResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        let lower = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_ascii_lowercase() == lower)
            .map(|(_, v)| v.as_str())
    }
}

/// The abstract HTTP port. Implementors need not be `Send`/`Sync`: nothing
/// in this crate spawns a transport call onto another thread.
pub trait RegistryTransport {
    fn get<'a>(&'a self, url: &'a str, timeout: Duration) -> LocalBoxFuture<'a, TransportOutcome>;
}

/// Either a well-formed HTTP response (any status code, including 4xx/5xx —
/// those are not transport failures) or a transport-level failure (DNS,
/// connection refused, TLS, or a timeout).
pub type TransportOutcome = Result<TransportResponse, TransportFailure>;

#[derive(Debug, Clone)]
pub enum TransportFailure {
    TimedOut,
    Other(String),
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFailure::TimedOut => write!(f, "request timed out"),
            TransportFailure::Other(m) => write!(f, "{}", m),
        }
    }
}

/// A production transport backed by `reqwest`'s async client, run under a
/// single current-thread `tokio` runtime per §5.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryTransport for ReqwestTransport {
    fn get<'a>(&'a self, url: &'a str, timeout: Duration) -> LocalBoxFuture<'a, TransportOutcome> {
        Box::pin(async move {
            let send = self.client.get(url).send();
            let response = match tokio::time::timeout(timeout, send).await {
                Ok(Ok(resp)) => resp,
                Ok(Err(e)) => return Err(TransportFailure::Other(e.to_string())),
                Err(_) => return Err(TransportFailure::TimedOut),
            };
            let status = response.status().as_u16();
            let final_url = response.url().to_string();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
                .collect();
            let body = match tokio::time::timeout(timeout, response.bytes()).await {
                Ok(Ok(b)) => b.to_vec(),
                Ok(Err(e)) => return Err(TransportFailure::Other(e.to_string())),
                Err(_) => return Err(TransportFailure::TimedOut),
            };
            Ok(TransportResponse {
                status,
                body,
                headers,
                final_url,
            })
        })
    }
}

/// An in-memory transport for tests: canned responses keyed by exact URL.
#[derive(Default)]
pub struct InMemoryTransport {
    responses: RefCell<BTreeMap<String, Vec<TransportOutcome>>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one response for `url`; repeated calls queue additional
    /// responses (consumed in order), which lets tests exercise retry
    /// (e.g. a 503 followed by a 200).
    pub fn push(&self, url: impl Into<String>, outcome: TransportOutcome) {
        self.responses
            .borrow_mut()
            .entry(url.into())
            .or_default()
            .push(outcome);
    }

    pub fn push_json(&self, url: impl Into<String>, status: u16, body: &Value) {
        self.push(
            url,
            Ok(TransportResponse {
                status,
                body: serde_json::to_vec(body).unwrap(),
                headers: BTreeMap::new(),
                final_url: String::new(),
            }),
        );
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.responses
            .borrow()
            .get(url)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl RegistryTransport for InMemoryTransport {
    fn get<'a>(&'a self, url: &'a str, _timeout: Duration) -> LocalBoxFuture<'a, TransportOutcome> {
        let outcome = {
            let mut responses = self.responses.borrow_mut();
            match responses.get_mut(url) {
                Some(queue) if !queue.is_empty() => queue.remove(0),
                _ => Err(TransportFailure::Other(format!("no canned response for {}", url))),
            }
        };
        Box::pin(async move { outcome })
    }
}

/// `{ name, dist-tags, versions, time? }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub versions: BTreeMap<String, VersionMetadata>,
    #[serde(default)]
    pub time: Option<BTreeMap<String, String>>,
}

impl PackageMetadata {
    /// Invariant: every `dist-tags` value is a key in `versions`.
    pub fn dist_tags_are_consistent(&self) -> bool {
        self.dist_tags.values().all(|v| self.versions.contains_key(v))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BinField {
    Single(String),
    Map(BTreeMap<String, String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionMetadata {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(rename = "devDependencies", default)]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(rename = "peerDependencies", default)]
    pub peer_dependencies: BTreeMap<String, String>,
    #[serde(rename = "optionalDependencies", default)]
    pub optional_dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<BinField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exports: Option<Value>,
    #[serde(default)]
    pub engines: BTreeMap<String, String>,
    pub dist: DistInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistInfo {
    pub tarball: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shasum: Option<String>,
}

/// Cloneable error wrapper so `Shared<_>`'s `Output: Clone` bound is
/// satisfiable without making [`Error`] itself `Clone`.
#[derive(Debug, Clone)]
pub struct SharedFetchError(Rc<Error>);

impl From<Error> for SharedFetchError {
    fn from(e: Error) -> Self {
        SharedFetchError(Rc::new(e))
    }
}

impl SharedFetchError {
    pub fn into_error(self) -> Error {
        match Rc::try_unwrap(self.0) {
            Ok(e) => e,
            Err(rc) => Error::wrap(rc.to_string(), rc.code()),
        }
    }
}

type SharedFetch = Shared<LocalBoxFuture<'static, Result<TransportResponse, SharedFetchError>>>;

struct RetryPolicy {
    attempts: u32,
    base: Duration,
}

async fn fetch_with_retry(
    transport: Rc<dyn RegistryTransport>,
    url: String,
    timeout: Duration,
    retry: RetryPolicy,
) -> Result<TransportResponse, SharedFetchError> {
    let mut last_err = None;
    for attempt in 0..retry.attempts.max(1) {
        match transport.get(&url, timeout).await {
            Ok(resp) if resp.status >= 500 => {
                last_err = Some(Error::fetch(
                    format!("server error {} fetching {}", resp.status, url),
                    Some(resp.status),
                ));
            }
            Ok(resp) => return Ok(resp),
            Err(TransportFailure::TimedOut) => {
                return Err(Error::Timeout { ms: timeout.as_millis() as u64 }.into());
            }
            Err(TransportFailure::Other(msg)) => {
                last_err = Some(Error::fetch(msg, None));
            }
        }
        if attempt + 1 < retry.attempts {
            let delay = retry.base * 2u32.pow(attempt);
            tracing::warn!(url = %url, attempt, delay_ms = delay.as_millis() as u64, "retrying after transport failure");
            tokio::time::sleep(delay).await;
        }
    }
    Err(last_err.unwrap_or_else(|| Error::fetch("exhausted retries", None)).into())
}

/// Fetches a package document or tarball through the cache, deduplicating
/// concurrent requests for the same key via a single-flight table.
pub struct RegistryFacade {
    transport: Rc<dyn RegistryTransport>,
    root: String,
    timeout: Duration,
    retry_attempts: u32,
    retry_base: Duration,
    metadata_cache: RefCell<Cache<String, Rc<PackageMetadata>>>,
    tarball_cache: RefCell<Cache<String, Rc<Vec<u8>>>>,
    inflight: RefCell<BTreeMap<String, SharedFetch>>,
}

impl RegistryFacade {
    pub fn new(transport: Rc<dyn RegistryTransport>, registry: &RegistryConfig, cache: &CacheConfig) -> Self {
        Self {
            transport,
            root: registry.url.trim_end_matches('/').to_string(),
            timeout: registry.timeout(),
            retry_attempts: registry.retry_attempts,
            retry_base: registry.retry_base(),
            metadata_cache: RefCell::new(Cache::new(cache.metadata_entries)),
            tarball_cache: RefCell::new(Cache::new(cache.tarball_entries)),
            inflight: RefCell::new(BTreeMap::new()),
        }
    }

    /// `@scope/name` -> `@scope%2Fname`; unscoped names pass through
    /// percent-encoding unchanged in the common case.
    pub fn encode_package_name(name: &str) -> String {
        match name.strip_prefix('@').and_then(|rest| rest.split_once('/')) {
            Some((scope, pkg)) => format!(
                "%40{}%2F{}",
                urlencoding::encode(scope),
                urlencoding::encode(pkg)
            ),
            None => urlencoding::encode(name).into_owned(),
        }
    }

    fn package_url(&self, name: &str) -> String {
        format!("{}/{}", self.root, Self::encode_package_name(name))
    }

    fn version_url(&self, name: &str, version: &str) -> String {
        format!("{}/{}", self.package_url(name), version)
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts,
            base: self.retry_base,
        }
    }

    async fn fetch_deduped(&self, key: String, url: String) -> Result<TransportResponse, Error> {
        let shared = {
            let mut inflight = self.inflight.borrow_mut();
            if let Some(existing) = inflight.get(&key) {
                existing.clone()
            } else {
                let transport = self.transport.clone();
                let timeout = self.timeout;
                let retry = self.retry_policy();
                let fut: LocalBoxFuture<'static, Result<TransportResponse, SharedFetchError>> =
                    Box::pin(fetch_with_retry(transport, url, timeout, retry));
                let shared = fut.shared();
                inflight.insert(key.clone(), shared.clone());
                shared
            }
        };
        let result = shared.await;
        self.inflight.borrow_mut().remove(&key);
        result.map_err(SharedFetchError::into_error)
    }

    /// Returns `None` on a 404 (package not found is not an error), never an
    /// `Err`.
    pub async fn get_package_metadata(&self, name: &str) -> Result<Option<Rc<PackageMetadata>>, Error> {
        let key = name.to_string();
        if let Some(cached) = self.metadata_cache.borrow_mut().get(&key) {
            tracing::debug!(package = name, "metadata cache hit");
            return Ok(Some(cached.clone()));
        }

        tracing::debug!(package = name, "fetching package metadata");
        let resp = self.fetch_deduped(format!("meta:{}", key), self.package_url(name)).await?;
        if resp.status == 404 {
            tracing::debug!(package = name, "package not found");
            return Ok(None);
        }
        if resp.status >= 400 {
            return Err(Error::fetch(
                format!("registry returned {} for {}", resp.status, name),
                Some(resp.status),
            ));
        }
        let metadata: PackageMetadata = serde_json::from_slice(&resp.body)
            .map_err(|e| Error::Parse(format!("malformed package document for {}: {}", name, e)))?;
        let rc = Rc::new(metadata);
        self.metadata_cache.borrow_mut().set(key, rc.clone());
        Ok(Some(rc))
    }

    pub async fn get_package_version(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Option<VersionMetadata>, Error> {
        let resp = self
            .fetch_deduped(format!("ver:{}@{}", name, version), self.version_url(name, version))
            .await?;
        if resp.status == 404 {
            return Ok(None);
        }
        if resp.status >= 400 {
            return Err(Error::fetch(
                format!("registry returned {} for {}@{}", resp.status, name, version),
                Some(resp.status),
            ));
        }
        let metadata: VersionMetadata = serde_json::from_slice(&resp.body)?;
        Ok(Some(metadata))
    }

    /// Fetches and caches tarball bytes, verifying `integrity` (an
    /// algorithm-prefixed base64 digest, e.g. `sha512-...`) against the
    /// fetched body before returning it. A mismatch is a hard error; a
    /// missing `integrity` is a warning only.
    pub async fn get_tarball(
        &self,
        name: &str,
        version: &str,
        tarball_url: &str,
        integrity: Option<&str>,
    ) -> Result<Rc<Vec<u8>>, Error> {
        let key = format!("{}@{}", name, version);
        if let Some(cached) = self.tarball_cache.borrow_mut().get(&key) {
            return Ok(cached.clone());
        }
        let resp = self
            .fetch_deduped(format!("tar:{}", key), tarball_url.to_string())
            .await?;
        if resp.status >= 400 {
            return Err(Error::Tarball(format!(
                "fetching tarball for {}@{} returned {}",
                name, version, resp.status
            )));
        }

        match integrity {
            Some(digest) => verify_integrity(name, version, digest, &resp.body)?,
            None => tracing::warn!(package = name, version, "tarball has no integrity digest to verify"),
        }

        let bytes = Rc::new(resp.body);
        self.tarball_cache.borrow_mut().set(key, bytes.clone());
        Ok(bytes)
    }

    pub async fn resolve_tag(&self, name: &str, tag: &str) -> Result<Option<String>, Error> {
        match self.get_package_metadata(name).await? {
            Some(doc) => Ok(doc.dist_tags.get(tag).cloned()),
            None => Ok(None),
        }
    }

    /// Drops the cached document for `name`, forcing the next fetch to hit
    /// the transport again.
    pub fn invalidate(&self, name: &str) {
        self.metadata_cache.borrow_mut().delete(&name.to_string());
    }

    pub fn metadata_cache_stats(&self) -> crate::cache::CacheStats {
        self.metadata_cache.borrow().stats()
    }

    pub fn tarball_cache_stats(&self) -> crate::cache::CacheStats {
        self.tarball_cache.borrow().stats()
    }

    pub async fn search(
        &self,
        text: &str,
        size: u32,
        from: u32,
    ) -> Result<Value, Error> {
        let url = format!(
            "{}/-/v1/search?text={}&size={}&from={}",
            self.root,
            urlencoding::encode(text),
            size,
            from
        );
        let resp = self.fetch_deduped(format!("search:{}", url), url).await?;
        if resp.status >= 400 {
            return Err(Error::fetch(
                format!("search returned {}", resp.status),
                Some(resp.status),
            ));
        }
        Ok(serde_json::from_slice(&resp.body)?)
    }
}

pub fn context_for(name: &str, version: Option<&str>) -> ErrorContext {
    let mut ctx = ErrorContext::default().with_package(name);
    if let Some(v) = version {
        ctx = ctx.with_version(v);
    }
    ctx
}

/// Verifies `digest` (e.g. `sha512-<base64>` or `sha256-<base64>`) against
/// `body`. Unrecognized algorithm prefixes are skipped with a warning rather
/// than rejected, since npm's integrity field has carried legacy `sha1`
/// shasums this crate has no reason to implement just to reject them.
fn verify_integrity(name: &str, version: &str, digest: &str, body: &[u8]) -> Result<(), Error> {
    let Some((algo, expected_b64)) = digest.split_once('-') else {
        tracing::warn!(package = name, version, digest, "malformed integrity field, skipping verification");
        return Ok(());
    };
    let expected = match BASE64.decode(expected_b64) {
        Ok(bytes) => bytes,
        Err(_) => {
            tracing::warn!(package = name, version, digest, "integrity field is not valid base64, skipping verification");
            return Ok(());
        }
    };
    let actual = match algo {
        "sha512" => Sha512::digest(body).to_vec(),
        "sha256" => Sha256::digest(body).to_vec(),
        other => {
            tracing::warn!(package = name, version, algorithm = other, "unsupported integrity algorithm, skipping verification");
            return Ok(());
        }
    };
    if actual != expected {
        return Err(Error::Tarball(format!(
            "integrity check failed for {}@{}: expected {}, body hashed to a different digest",
            name, version, digest
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn facade(transport: Rc<InMemoryTransport>) -> RegistryFacade {
        RegistryFacade::new(
            transport,
            &RegistryConfig {
                url: "https://registry.example.com".to_string(),
                ..RegistryConfig::default()
            },
            &CacheConfig::default(),
        )
    }

    fn sample_doc() -> Value {
        json!({
            "name": "left-pad",
            "dist-tags": { "latest": "1.3.0" },
            "versions": {
                "1.3.0": {
                    "name": "left-pad",
                    "version": "1.3.0",
                    "dependencies": {},
                    "dist": { "tarball": "https://registry.example.com/left-pad/-/left-pad-1.3.0.tgz" }
                }
            }
        })
    }

    #[test]
    fn scope_encoding_uses_percent_2f() {
        assert_eq!(
            RegistryFacade::encode_package_name("@scope/name"),
            "%40scope%2Fname"
        );
        assert_eq!(RegistryFacade::encode_package_name("left-pad"), "left-pad");
    }

    #[tokio::test]
    async fn fetches_and_caches_package_metadata() {
        let transport = Rc::new(InMemoryTransport::new());
        transport.push_json(
            "https://registry.example.com/left-pad",
            200,
            &sample_doc(),
        );
        let facade = facade(transport.clone());

        let doc = facade.get_package_metadata("left-pad").await.unwrap().unwrap();
        assert_eq!(doc.name, "left-pad");
        assert!(doc.dist_tags_are_consistent());

        // Second call must be served from cache, not a second transport hit.
        facade.get_package_metadata("left-pad").await.unwrap();
        assert_eq!(transport.request_count("https://registry.example.com/left-pad"), 0);
    }

    #[tokio::test]
    async fn missing_package_returns_none_not_error() {
        let transport = Rc::new(InMemoryTransport::new());
        transport.push(
            "https://registry.example.com/missing",
            Ok(TransportResponse {
                status: 404,
                body: Vec::new(),
                headers: BTreeMap::new(),
                final_url: String::new(),
            }),
        );
        let facade = facade(transport);
        assert!(facade.get_package_metadata("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn retries_on_5xx_and_succeeds() {
        let transport = Rc::new(InMemoryTransport::new());
        let url = "https://registry.example.com/flaky";
        transport.push(
            url,
            Ok(TransportResponse {
                status: 503,
                body: Vec::new(),
                headers: BTreeMap::new(),
                final_url: String::new(),
            }),
        );
        transport.push_json(
            url,
            200,
            &json!({ "name": "flaky", "dist-tags": {}, "versions": {} }),
        );
        let facade = facade(transport);
        let doc = facade.get_package_metadata("flaky").await.unwrap();
        assert!(doc.is_some());
    }

    #[tokio::test]
    async fn does_not_retry_on_4xx() {
        let transport = Rc::new(InMemoryTransport::new());
        let url = "https://registry.example.com/bad";
        transport.push(
            url,
            Ok(TransportResponse {
                status: 400,
                body: Vec::new(),
                headers: BTreeMap::new(),
                final_url: String::new(),
            }),
        );
        let facade = facade(transport);
        let err = facade.get_package_metadata("bad").await.unwrap_err();
        assert!(err.has_code(crate::error::ErrorCode::EFETCH));
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let transport = Rc::new(InMemoryTransport::new());
        let url = "https://registry.example.com/left-pad";
        transport.push_json(url, 200, &sample_doc());
        transport.push_json(url, 200, &sample_doc());
        let facade = facade(transport.clone());

        facade.get_package_metadata("left-pad").await.unwrap();
        facade.invalidate("left-pad");
        facade.get_package_metadata("left-pad").await.unwrap();
        // Two documents were queued and both consumed: one per fetch.
        assert_eq!(transport.request_count(url), 0);
    }

    #[tokio::test]
    async fn resolve_tag_reads_dist_tags() {
        let transport = Rc::new(InMemoryTransport::new());
        transport.push_json("https://registry.example.com/left-pad", 200, &sample_doc());
        let facade = facade(transport);
        assert_eq!(
            facade.resolve_tag("left-pad", "latest").await.unwrap(),
            Some("1.3.0".to_string())
        );
    }

    #[tokio::test]
    async fn tarball_matching_integrity_is_accepted() {
        let transport = Rc::new(InMemoryTransport::new());
        let body = b"tarball bytes".to_vec();
        let digest = format!("sha512-{}", BASE64.encode(Sha512::digest(&body)));
        transport.push(
            "https://registry.example.com/left-pad/-/left-pad-1.3.0.tgz",
            Ok(TransportResponse { status: 200, body: body.clone(), headers: BTreeMap::new(), final_url: String::new() }),
        );
        let facade = facade(transport);
        let bytes = facade
            .get_tarball("left-pad", "1.3.0", "https://registry.example.com/left-pad/-/left-pad-1.3.0.tgz", Some(&digest))
            .await
            .unwrap();
        assert_eq!(*bytes, body);
    }

    #[tokio::test]
    async fn tarball_with_mismatched_integrity_is_rejected() {
        let transport = Rc::new(InMemoryTransport::new());
        transport.push(
            "https://registry.example.com/left-pad/-/left-pad-1.3.0.tgz",
            Ok(TransportResponse { status: 200, body: b"tarball bytes".to_vec(), headers: BTreeMap::new(), final_url: String::new() }),
        );
        let facade = facade(transport);
        let bogus = format!("sha512-{}", BASE64.encode(Sha512::digest(b"something else")));
        let result = facade
            .get_tarball("left-pad", "1.3.0", "https://registry.example.com/left-pad/-/left-pad-1.3.0.tgz", Some(&bogus))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn tarball_with_no_integrity_is_accepted_with_a_warning() {
        let transport = Rc::new(InMemoryTransport::new());
        transport.push(
            "https://registry.example.com/left-pad/-/left-pad-1.3.0.tgz",
            Ok(TransportResponse { status: 200, body: b"tarball bytes".to_vec(), headers: BTreeMap::new(), final_url: String::new() }),
        );
        let facade = facade(transport);
        let bytes = facade
            .get_tarball("left-pad", "1.3.0", "https://registry.example.com/left-pad/-/left-pad-1.3.0.tgz", None)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"tarball bytes");
    }
}
