// ── Lazy element ──
//
// An `Element` is a local handle on one server resource. Construction never
// performs I/O; the representation and its concurrency token are fetched on
// first access and cached until a mutation or an explicit refresh.
//
//   Unresolved ──access──▶ Fetched ──update──▶ Stale ──access──▶ Fetched
//        │                    │                   │
//        └──────── delete / 404 ──────────────────┴──▶ Deleted (terminal)

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use smc_api::{Etag, Href, Method, Session, SmcResult};
use tracing::{debug, trace};

use crate::error::CoreError;
use crate::reference::ElementRef;
use crate::registry::{TypeRegistry, TypedElement};

/// A resource's JSON object representation.
pub type Representation = Map<String, Value>;

/// Kind used when none is known or can be inferred.
pub const GENERIC_KIND: &str = "element";

/// Identity of an element: what can be known without fetching it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementMeta {
    pub href: Href,
    pub name: Option<String>,
    pub kind: String,
}

impl ElementMeta {
    pub fn new(href: impl Into<Href>, name: Option<String>, kind: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            name,
            kind: kind.into(),
        }
    }

    /// Meta for a bare href; the kind is inferred from its path.
    pub fn from_href(href: impl Into<Href>) -> Self {
        let href = href.into();
        let kind = kind_from_href(&href).unwrap_or_else(|| GENERIC_KIND.to_owned());
        Self {
            href,
            name: None,
            kind,
        }
    }
}

/// Infer a kind from an element href of the form `.../<kind>/<id>`.
pub fn kind_from_href(href: &Href) -> Option<String> {
    let segments = href.segments();
    match segments.as_slice() {
        [.., kind, id] if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) => {
            Some((*kind).to_owned())
        }
        _ => None,
    }
}

/// Cache state, as observed from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    /// Never fetched.
    Unresolved,
    /// Representation and token cached.
    Fetched,
    /// Cache invalidated by a mutation; next access refetches.
    Stale,
    /// Deleted or found missing. Terminal.
    Deleted,
}

impl fmt::Display for ElementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unresolved => "unresolved",
            Self::Fetched => "fetched",
            Self::Stale => "stale",
            Self::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
enum Cache {
    Unresolved,
    Fetched {
        data: Representation,
        etag: Option<Etag>,
    },
    Stale,
    Deleted,
}

/// A link advertised in a representation's `link` array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: Href,
    #[serde(default)]
    pub method: Option<String>,
}

// ── Element ─────────────────────────────────────────────────────────

/// Lazily-loaded handle on one server resource.
///
/// Methods that may fetch take `&mut self`; one handle is one cache and is
/// not meant to be shared between tasks without external locking.
#[derive(Debug)]
pub struct Element {
    meta: ElementMeta,
    session: Arc<Session>,
    cache: Cache,
    pending: Representation,
}

impl Element {
    pub fn new(session: Arc<Session>, meta: ElementMeta) -> Self {
        Self {
            meta,
            session,
            cache: Cache::Unresolved,
            pending: Representation::new(),
        }
    }

    pub fn from_href(session: Arc<Session>, href: impl Into<Href>) -> Self {
        Self::new(session, ElementMeta::from_href(href))
    }

    // ── Identity (no I/O) ────────────────────────────────────────────

    pub fn meta(&self) -> &ElementMeta {
        &self.meta
    }

    pub fn href(&self) -> &Href {
        &self.meta.href
    }

    pub fn name(&self) -> Option<&str> {
        self.meta.name.as_deref()
    }

    pub fn kind(&self) -> &str {
        &self.meta.kind
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn state(&self) -> ElementState {
        match self.cache {
            Cache::Unresolved => ElementState::Unresolved,
            Cache::Fetched { .. } => ElementState::Fetched,
            Cache::Stale => ElementState::Stale,
            Cache::Deleted => ElementState::Deleted,
        }
    }

    /// Cached concurrency token, if fetched.
    pub fn etag(&self) -> Option<&Etag> {
        match &self.cache {
            Cache::Fetched { etag, .. } => etag.as_ref(),
            _ => None,
        }
    }

    /// Cached representation, if fetched. Never performs I/O.
    pub fn cached(&self) -> Option<&Representation> {
        match &self.cache {
            Cache::Fetched { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Promote to the view registered for this element's kind.
    pub fn into_typed(self, registry: &TypeRegistry) -> Box<dyn TypedElement> {
        registry.construct(self)
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Return the cached representation, fetching it first if needed.
    pub async fn ensure_loaded(&mut self) -> Result<&Representation, CoreError> {
        match self.state() {
            ElementState::Fetched => trace!(href = %self.meta.href, "cache hit"),
            ElementState::Deleted => {
                return Err(CoreError::ResourceNotFound {
                    href: self.meta.href.clone(),
                });
            }
            ElementState::Unresolved | ElementState::Stale => self.fetch().await?,
        }
        self.fetched().map(|(data, _)| data)
    }

    /// Discard the cache and fetch again.
    ///
    /// A deleted element stays deleted; this fails without touching the
    /// server.
    pub async fn refresh(&mut self) -> Result<&Representation, CoreError> {
        if matches!(self.cache, Cache::Deleted) {
            return Err(CoreError::ResourceNotFound {
                href: self.meta.href.clone(),
            });
        }
        self.fetch().await?;
        self.fetched().map(|(data, _)| data)
    }

    /// Mark the cache stale so the next access refetches. No I/O.
    pub fn invalidate(&mut self) {
        if matches!(self.cache, Cache::Fetched { .. }) {
            self.cache = Cache::Stale;
        }
    }

    async fn fetch(&mut self) -> Result<(), CoreError> {
        debug!(href = %self.meta.href, kind = %self.meta.kind, "fetching element");
        let result = match self.session.read(&self.meta.href).await {
            Ok(result) => result,
            Err(e) => return Err(self.absorb(e)),
        };
        if !result.success {
            return Err(CoreError::RequestFailed {
                href: self.meta.href.clone(),
                status: result.status,
                message: result.message.unwrap_or_default(),
            });
        }

        let etag = result.etag.clone();
        let Some(data) = result.into_json().and_then(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        }) else {
            return Err(CoreError::InvalidRepresentation {
                href: self.meta.href.clone(),
                reason: "response body is not a JSON object".into(),
            });
        };

        self.adopt_name(&data);
        self.cache = Cache::Fetched { data, etag };
        Ok(())
    }

    fn fetched(&self) -> Result<(&Representation, Option<&Etag>), CoreError> {
        match &self.cache {
            Cache::Fetched { data, etag } => Ok((data, etag.as_ref())),
            Cache::Deleted => Err(CoreError::ResourceNotFound {
                href: self.meta.href.clone(),
            }),
            Cache::Unresolved | Cache::Stale => Err(CoreError::InvalidRepresentation {
                href: self.meta.href.clone(),
                reason: "element is not loaded".into(),
            }),
        }
    }

    /// Record a 404 as a terminal state, then convert.
    fn absorb(&mut self, err: smc_api::Error) -> CoreError {
        if err.is_not_found() {
            debug!(href = %self.meta.href, "element is gone");
            self.cache = Cache::Deleted;
            self.pending.clear();
        }
        err.into()
    }

    fn adopt_name(&mut self, data: &Representation) {
        if let Some(name) = data.get("name").and_then(Value::as_str) {
            self.meta.name = Some(name.to_owned());
        }
    }

    // ── Field access ─────────────────────────────────────────────────

    /// Raw field value. `None` when the field is absent.
    pub async fn get(&mut self, key: &str) -> Result<Option<&Value>, CoreError> {
        Ok(self.ensure_loaded().await?.get(key))
    }

    pub async fn get_str(&mut self, key: &str) -> Result<Option<&str>, CoreError> {
        let href = self.meta.href.clone();
        let data = self.ensure_loaded().await?;
        typed_field(&href, data, key, "a string", Value::as_str)
    }

    pub async fn get_bool(&mut self, key: &str) -> Result<Option<bool>, CoreError> {
        let href = self.meta.href.clone();
        let data = self.ensure_loaded().await?;
        typed_field(&href, data, key, "a boolean", Value::as_bool)
    }

    pub async fn get_i64(&mut self, key: &str) -> Result<Option<i64>, CoreError> {
        let href = self.meta.href.clone();
        let data = self.ensure_loaded().await?;
        typed_field(&href, data, key, "an integer", Value::as_i64)
    }

    /// A list of strings. Absent or null reads as empty.
    pub async fn get_str_list(&mut self, key: &str) -> Result<Vec<String>, CoreError> {
        let href = self.meta.href.clone();
        let data = self.ensure_loaded().await?;
        let list = typed_field(&href, data, key, "a list of strings", |v| {
            v.as_array()?
                .iter()
                .map(|item| item.as_str().map(str::to_owned))
                .collect::<Option<Vec<_>>>()
        })?;
        Ok(list.unwrap_or_default())
    }

    /// Field holding a single element href.
    pub async fn reference(&mut self, key: &str) -> Result<Option<ElementRef>, CoreError> {
        Ok(self.get_str(key).await?.map(ElementRef::new))
    }

    /// Field holding a list of element hrefs.
    pub async fn references(&mut self, key: &str) -> Result<Vec<ElementRef>, CoreError> {
        Ok(self
            .get_str_list(key)
            .await?
            .into_iter()
            .map(ElementRef::new)
            .collect())
    }

    // ── Links ────────────────────────────────────────────────────────

    /// Every link the representation advertises.
    pub async fn links(&mut self) -> Result<Vec<Link>, CoreError> {
        let href = self.meta.href.clone();
        let data = self.ensure_loaded().await?;
        match data.get("link") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(v) => {
                Vec::<Link>::deserialize(v).map_err(|e| CoreError::InvalidRepresentation {
                    href,
                    reason: format!("malformed link list: {e}"),
                })
            }
        }
    }

    /// Href of the link with relation `rel`.
    pub async fn link(&mut self, rel: &str) -> Result<Href, CoreError> {
        self.links()
            .await?
            .into_iter()
            .find(|l| l.rel == rel)
            .map(|l| l.href)
            .ok_or_else(|| CoreError::UnsupportedOperation {
                href: self.meta.href.clone(),
                operation: rel.to_owned(),
            })
    }

    /// Call the action behind link `rel`.
    ///
    /// Anything but a `GET` may change the element server-side, so the cache
    /// is marked stale when it succeeds.
    pub async fn invoke(
        &mut self,
        rel: &str,
        method: Method,
        body: Option<Value>,
        query: &[(&str, String)],
    ) -> Result<SmcResult, CoreError> {
        let href = self.link(rel).await?;
        debug!(element = %self.meta.href, rel, %method, "invoking action");
        let mutates = method != Method::GET;
        let result = self.session.invoke(&href, method, body, query).await?;
        if result.success && mutates {
            self.invalidate();
        }
        Ok(result)
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Stage a field change for the next [`save`](Self::save). No I/O.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.pending.insert(key.into(), value.into());
    }

    pub fn pending(&self) -> &Representation {
        &self.pending
    }

    pub fn discard_changes(&mut self) {
        self.pending.clear();
    }

    /// Send staged changes. They are kept if the server does not accept
    /// them.
    pub async fn save(&mut self) -> Result<SmcResult, CoreError> {
        let changes = std::mem::take(&mut self.pending);
        let outcome = self.update(changes.clone()).await;
        if !matches!(outcome, Ok(ref r) if r.success) && !self.is_deleted() {
            self.pending = changes;
        }
        outcome
    }

    fn is_deleted(&self) -> bool {
        matches!(self.cache, Cache::Deleted)
    }

    /// Merge `changes` into the cached representation and replace it on the
    /// server, guarded by the cached token.
    ///
    /// On success the cache becomes stale (or fresh, if the server echoed
    /// the new representation and token). A conflict or a rejected body
    /// leaves the cache exactly as it was.
    pub async fn update(&mut self, changes: Representation) -> Result<SmcResult, CoreError> {
        self.ensure_loaded().await?;
        let (body, etag) = {
            let (data, etag) = self.fetched()?;
            let etag = self.require_etag(etag)?;
            let mut body = data.clone();
            body.extend(changes);
            (body, etag)
        };

        debug!(href = %self.meta.href, "updating element");
        let result = match self
            .session
            .update(&self.meta.href, Value::Object(body.clone()), &etag)
            .await
        {
            Ok(result) => result,
            Err(e) => return Err(self.absorb(e)),
        };

        if result.success {
            self.adopt_name(&body);
            self.settle(&result);
        }
        Ok(result)
    }

    /// Delete on the server. Loads first if no token is cached yet.
    pub async fn delete(&mut self) -> Result<SmcResult, CoreError> {
        self.ensure_loaded().await?;
        let (_, etag) = self.fetched()?;
        let etag = self.require_etag(etag)?;

        debug!(href = %self.meta.href, "deleting element");
        let result = match self.session.delete(&self.meta.href, &etag).await {
            Ok(result) => result,
            Err(e) => return Err(self.absorb(e)),
        };

        if result.success {
            self.cache = Cache::Deleted;
            self.pending.clear();
        }
        Ok(result)
    }

    fn require_etag(&self, etag: Option<&Etag>) -> Result<Etag, CoreError> {
        etag.cloned()
            .ok_or_else(|| CoreError::InvalidRepresentation {
                href: self.meta.href.clone(),
                reason: "server sent no ETag for this element".into(),
            })
    }

    /// Post-mutation cache transition.
    fn settle(&mut self, result: &SmcResult) {
        match (result.object(), &result.etag) {
            (Some(data), Some(etag)) => {
                trace!(href = %self.meta.href, "mutation echoed representation");
                self.cache = Cache::Fetched {
                    data: data.clone(),
                    etag: Some(etag.clone()),
                };
            }
            _ => self.cache = Cache::Stale,
        }
    }
}

fn typed_field<'a, T>(
    href: &Href,
    data: &'a Representation,
    key: &str,
    expected: &'static str,
    extract: impl Fn(&'a Value) -> Option<T>,
) -> Result<Option<T>, CoreError> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => extract(value)
            .map(Some)
            .ok_or_else(|| CoreError::InvalidField {
                href: href.clone(),
                field: key.to_owned(),
                expected,
            }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn kind_is_inferred_from_element_hrefs() {
        let href = Href::from("https://smc:8082/6.5/elements/host/42");
        assert_eq!(kind_from_href(&href).as_deref(), Some("host"));

        let nested = Href::from("https://smc:8082/6.5/elements/fw_policy/3/fw_ipv4_access_rule/99");
        assert_eq!(kind_from_href(&nested).as_deref(), Some("fw_ipv4_access_rule"));
    }

    #[test]
    fn collection_hrefs_have_no_kind() {
        let href = Href::from("https://smc:8082/6.5/elements/host");
        assert_eq!(kind_from_href(&href), None);
        assert_eq!(ElementMeta::from_href(href).kind, GENERIC_KIND);
    }

    #[test]
    fn typed_field_distinguishes_absent_from_wrong_shape() {
        let href = Href::from("http://smc/6.5/elements/host/1");
        let data = json!({ "address": "10.0.0.1", "comment": null, "secondary": 5 });
        let data = data.as_object().unwrap();

        assert_eq!(
            typed_field(&href, data, "address", "a string", Value::as_str).unwrap(),
            Some("10.0.0.1")
        );
        assert_eq!(
            typed_field(&href, data, "comment", "a string", Value::as_str).unwrap(),
            None
        );
        assert_eq!(
            typed_field(&href, data, "missing", "a string", Value::as_str).unwrap(),
            None
        );
        assert!(matches!(
            typed_field(&href, data, "secondary", "a string", Value::as_str),
            Err(CoreError::InvalidField { ref field, .. }) if field == "secondary"
        ));
    }

    #[test]
    fn links_deserialize_with_optional_method() {
        let links: Vec<Link> = serde_json::from_value(json!([
            { "rel": "self", "href": "http://smc/6.5/elements/host/1" },
            { "rel": "export", "href": "http://smc/6.5/elements/host/1/export", "method": "POST" }
        ]))
        .unwrap();
        assert_eq!(links[1].method.as_deref(), Some("POST"));
    }
}
