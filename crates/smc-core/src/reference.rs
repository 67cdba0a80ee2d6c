// Weak, href-only reference to another element.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smc_api::{Href, Session};

use crate::element::{Element, kind_from_href};
use crate::registry::{TypeRegistry, TypedElement};

/// A pointer to another element found inside a representation.
///
/// Holds only the href; resolving it builds an unloaded handle and performs
/// no I/O. Cycles between elements are harmless for the same reason.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementRef {
    href: Href,
}

impl ElementRef {
    pub fn new(href: impl Into<Href>) -> Self {
        Self { href: href.into() }
    }

    pub fn href(&self) -> &Href {
        &self.href
    }

    /// Kind inferred from the href, if it has the usual shape.
    pub fn kind(&self) -> Option<String> {
        kind_from_href(&self.href)
    }

    /// Unloaded generic handle.
    pub fn element(&self, session: &Arc<Session>) -> Element {
        Element::from_href(Arc::clone(session), self.href.clone())
    }

    /// Unloaded handle promoted through `registry`.
    pub fn resolve(&self, session: &Arc<Session>, registry: &TypeRegistry) -> Box<dyn TypedElement> {
        registry.construct(self.element(session))
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.href.fmt(f)
    }
}

impl From<Href> for ElementRef {
    fn from(href: Href) -> Self {
        Self { href }
    }
}
