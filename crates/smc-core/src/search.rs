// ── Collection / search facade ──
//
// Turns "kind + name/filter" into one listing request and yields lightweight
// handles. Handles promote to typed elements independently; nothing is
// fetched until a promoted element is accessed.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use smc_api::{Href, Session, SmcResult};
use tracing::debug;

use crate::element::{Element, ElementMeta, GENERIC_KIND, Representation, kind_from_href};
use crate::error::CoreError;
use crate::model::ElementSpec;
use crate::registry::{ElementType, TypeRegistry, TypedElement};

/// Entry point for cross-kind searches.
const ELEMENTS_ENTRY_POINT: &str = "elements";

// ── Query ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub kind: Option<String>,
    pub name: Option<String>,
    /// Raw `filter_context` passed through to the server.
    pub filter: Option<String>,
    pub exact_match: bool,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            kind: None,
            name: None,
            filter: None,
            exact_match: true,
        }
    }
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn exact_match(mut self, exact: bool) -> Self {
        self.exact_match = exact;
        self
    }
}

// ── Results ─────────────────────────────────────────────────────────

/// One search hit. Cheap; promotes to an unloaded element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub href: Href,
    pub name: String,
    pub kind: String,
}

impl ElementHandle {
    pub fn into_element(self, session: &Arc<Session>) -> Element {
        let meta = ElementMeta::new(self.href, Some(self.name), self.kind);
        Element::new(Arc::clone(session), meta)
    }

    /// Unloaded element wrapped in the view registered for its kind.
    pub fn promote(self, session: &Arc<Session>, registry: &TypeRegistry) -> Box<dyn TypedElement> {
        registry.construct(self.into_element(session))
    }
}

/// Single-pass sequence of search hits. Run the search again to re-iterate.
#[derive(Debug)]
pub struct SearchResults {
    inner: std::vec::IntoIter<ElementHandle>,
}

impl Iterator for SearchResults {
    type Item = ElementHandle;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for SearchResults {}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    href: Href,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

struct SearchTarget {
    href: Href,
    filter_context: Option<String>,
    /// Hits of any other kind are dropped.
    type_filter: Option<String>,
}

/// Listing bodies are either a bare array or `{"result": [...]}`.
fn parse_entries(href: &Href, result: &SmcResult) -> Result<Vec<SearchEntry>, CoreError> {
    let list = match result.json() {
        None => return Ok(Vec::new()),
        Some(Value::Array(_)) => result.json(),
        Some(Value::Object(map)) => map.get("result"),
        Some(_) => None,
    };
    let Some(list) = list else {
        return Err(CoreError::InvalidRepresentation {
            href: href.clone(),
            reason: "listing is neither an array nor {\"result\": [...]}".into(),
        });
    };
    Vec::<SearchEntry>::deserialize(list).map_err(|e| CoreError::InvalidRepresentation {
        href: href.clone(),
        reason: format!("malformed listing entry: {e}"),
    })
}

// ── Collection ──────────────────────────────────────────────────────

/// Search, lookup and creation against one session and type registry.
#[derive(Debug, Clone)]
pub struct Collection<'r> {
    session: Arc<Session>,
    registry: &'r TypeRegistry,
}

impl Collection<'static> {
    /// Collection over the global registry.
    pub fn global(session: Arc<Session>) -> Self {
        Self::new(session, TypeRegistry::global())
    }
}

impl<'r> Collection<'r> {
    pub fn new(session: Arc<Session>, registry: &'r TypeRegistry) -> Self {
        Self { session, registry }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }

    /// Unloaded typed handle for a known href. No I/O.
    pub fn element(&self, href: impl Into<Href>) -> Box<dyn TypedElement> {
        self.registry
            .construct(Element::from_href(Arc::clone(&self.session), href))
    }

    // ── Search ───────────────────────────────────────────────────────

    /// One listing request. An empty result is not an error.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResults, CoreError> {
        let SearchTarget {
            href,
            filter_context,
            type_filter,
        } = self.resolve_target(query)?;

        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(ref name) = query.name {
            params.push(("filter", name.clone()));
            params.push(("exact_match", query.exact_match.to_string()));
        }
        if let Some(context) = filter_context {
            params.push(("filter_context", context));
        }

        debug!(%href, ?query, "searching");
        let result = self.session.read_with_params(&href, &params).await?;
        if !result.success {
            return Err(CoreError::RequestFailed {
                href,
                status: result.status,
                message: result.message.unwrap_or_default(),
            });
        }

        let wanted_kind = type_filter.as_deref();
        let handles: Vec<ElementHandle> = parse_entries(&href, &result)?
            .into_iter()
            .filter_map(|entry| {
                let kind = entry
                    .kind
                    .or_else(|| kind_from_href(&entry.href))
                    .or_else(|| wanted_kind.map(str::to_owned))
                    .unwrap_or_else(|| GENERIC_KIND.to_owned());
                if wanted_kind.is_some_and(|wanted| wanted != kind) {
                    return None;
                }
                Some(ElementHandle {
                    href: entry.href,
                    name: entry.name.unwrap_or_default(),
                    kind,
                })
            })
            .collect();

        debug!(%href, hits = handles.len(), "search complete");
        Ok(SearchResults {
            inner: handles.into_iter(),
        })
    }

    /// Where a query is sent and how its hits are narrowed.
    ///
    /// A registered kind with its own entry point lists that collection.
    /// Anything else goes through the cross-kind `elements` entry point with
    /// the kind passed as a raw filter. When an explicit filter takes the
    /// `filter_context` slot, hits are narrowed to the requested kind
    /// locally instead, registered or not.
    fn resolve_target(&self, query: &SearchQuery) -> Result<SearchTarget, CoreError> {
        let Some(kind) = query.kind.as_deref() else {
            return Ok(SearchTarget {
                href: self.session.entry_point(ELEMENTS_ENTRY_POINT)?,
                filter_context: query.filter.clone(),
                type_filter: None,
            });
        };

        let registered = self.registry.is_registered(kind);
        if registered {
            match self.session.entry_point(kind) {
                Ok(href) => {
                    return Ok(SearchTarget {
                        href,
                        filter_context: query.filter.clone(),
                        type_filter: Some(kind.to_owned()),
                    });
                }
                Err(smc_api::Error::UnsupportedEntryPoint(_)) => {
                    debug!(kind, "no entry point for kind, using filter context");
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            debug!(kind, "unregistered kind, passing through as filter context");
        }

        let href = self.session.entry_point(ELEMENTS_ENTRY_POINT)?;
        Ok(match query.filter.clone() {
            Some(filter) => SearchTarget {
                href,
                filter_context: Some(filter),
                type_filter: Some(kind.to_owned()),
            },
            None => SearchTarget {
                href,
                filter_context: Some(kind.to_owned()),
                // An unregistered kind may name a server-side context
                // ("network_elements") rather than a single type.
                type_filter: registered.then(|| kind.to_owned()),
            },
        })
    }

    /// Exactly one element of `kind` named `name`.
    pub async fn get(&self, kind: &str, name: &str) -> Result<Box<dyn TypedElement>, CoreError> {
        let handle = self.get_handle(kind, name).await?;
        Ok(handle.promote(&self.session, self.registry))
    }

    /// Like [`get`](Self::get), returning the concrete type directly.
    pub async fn get_as<T: ElementType>(&self, name: &str) -> Result<T, CoreError> {
        let kind = T::KINDS.first().copied().unwrap_or(GENERIC_KIND);
        let handle = self.get_handle(kind, name).await?;
        Ok(T::from_element(handle.into_element(&self.session)))
    }

    async fn get_handle(&self, kind: &str, name: &str) -> Result<ElementHandle, CoreError> {
        let query = SearchQuery::new().kind(kind).name(name);
        let mut hits: Vec<ElementHandle> = self.search(&query).await?.collect();
        match hits.len() {
            0 => Err(CoreError::NotFound {
                kind: kind.to_owned(),
                name: name.to_owned(),
            }),
            1 => hits.pop().ok_or_else(|| CoreError::NotFound {
                kind: kind.to_owned(),
                name: name.to_owned(),
            }),
            count => Err(CoreError::Ambiguous {
                kind: kind.to_owned(),
                name: name.to_owned(),
                count,
            }),
        }
    }

    // ── Create ───────────────────────────────────────────────────────

    /// POST `body` to the entry point for `kind`. Validation failures come
    /// back as a failed envelope.
    pub async fn create(&self, kind: &str, body: Representation) -> Result<SmcResult, CoreError> {
        let href = self.session.entry_point(kind)?;
        debug!(kind, %href, "creating element");
        Ok(self.session.create(&href, Value::Object(body)).await?)
    }

    pub async fn create_spec<S: ElementSpec>(&self, spec: &S) -> Result<SmcResult, CoreError> {
        self.create(S::KIND, spec.to_representation()?).await
    }

    /// Create and return an unloaded handle on the new element.
    ///
    /// A rejected body is raised as `RequestFailed` since there is no element
    /// to hand back.
    pub async fn create_element(
        &self,
        kind: &str,
        body: Representation,
    ) -> Result<Box<dyn TypedElement>, CoreError> {
        let name = body.get("name").and_then(Value::as_str).map(str::to_owned);
        let result = self.create(kind, body).await?;
        let collection = self.session.entry_point(kind)?;
        if !result.success {
            return Err(CoreError::RequestFailed {
                href: collection,
                status: result.status,
                message: result.message.unwrap_or_default(),
            });
        }
        let Some(href) = result.href else {
            return Err(CoreError::InvalidRepresentation {
                href: collection,
                reason: "create succeeded but returned no href".into(),
            });
        };

        let meta = ElementMeta::new(href, name, kind);
        Ok(self
            .registry
            .construct(Element::new(Arc::clone(&self.session), meta)))
    }

    pub async fn create_element_spec<S: ElementSpec>(
        &self,
        spec: &S,
    ) -> Result<Box<dyn TypedElement>, CoreError> {
        self.create_element(S::KIND, spec.to_representation()?).await
    }
}
