//! Resource model between `smc-api` and application code.
//!
//! - **[`Element`]** — Lazily-loaded handle on one server resource. Fetches
//!   its representation and concurrency token on first access, caches them,
//!   and presents the token on every update or delete. An explicit state
//!   machine ([`ElementState`]) tracks unresolved / fetched / stale / deleted.
//!
//! - **[`TypeRegistry`]** — Kind string → typed view. Built-in views are
//!   registered in [`TypeRegistry::global()`]; unknown kinds fall back to
//!   [`GenericElement`].
//!
//! - **[`Collection`]** — Search, exact lookup and creation. Searches return
//!   [`SearchResults`], a single-pass sequence of [`ElementHandle`]s that
//!   promote to typed elements without I/O.
//!
//! - **Model** ([`model`]) — `Host`, `Network`, `AddressRange`, `Group`,
//!   `Router` and `Service`, each with a serializable create spec.

pub mod element;
pub mod error;
pub mod model;
pub mod reference;
pub mod registry;
pub mod search;

// ── Primary re-exports ──────────────────────────────────────────────
pub use element::{
    Element, ElementMeta, ElementState, GENERIC_KIND, Link, Representation, kind_from_href,
};
pub use error::CoreError;
pub use model::{
    AddressRange, AddressRangeSpec, ElementSpec, GenericElement, Group, GroupSpec, Host,
    HostSpec, Network, NetworkSpec, Router, RouterSpec, Service, TcpServiceSpec, UdpServiceSpec,
};
pub use reference::ElementRef;
pub use registry::{ElementType, TypeRegistry, TypedElement};
pub use search::{Collection, ElementHandle, SearchQuery, SearchResults};
