// ── Type registry ──
//
// Maps server kind strings ("host", "network", ...) to the typed view that
// represents them. Unknown kinds fall back to `GenericElement` so every
// href can be promoted to something usable.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::LazyLock;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use smc_api::Href;
use tracing::{debug, trace};

use crate::element::Element;
use crate::error::CoreError;
use crate::model::{AddressRange, GenericElement, Group, Host, Network, Router, Service};

/// A typed view over an [`Element`].
///
/// Implemented by every model type; use [`element_type!`](crate::element_type)
/// rather than writing the impl by hand.
pub trait TypedElement: Any + Send + Sync + fmt::Debug {
    fn element(&self) -> &Element;
    fn element_mut(&mut self) -> &mut Element;
    fn into_element(self: Box<Self>) -> Element;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn href(&self) -> &Href {
        self.element().href()
    }

    fn name(&self) -> Option<&str> {
        self.element().name()
    }

    fn kind(&self) -> &str {
        self.element().kind()
    }
}

/// A concrete, registrable element type.
pub trait ElementType: TypedElement + Sized {
    /// Server kind strings this type represents. The first is primary.
    const KINDS: &'static [&'static str];

    fn from_element(element: Element) -> Self;
}

impl dyn TypedElement {
    pub fn is<T: ElementType>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: ElementType>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Take ownership of the concrete type. `None` when the view is not a `T`.
    pub fn downcast<T: ElementType>(self: Box<Self>) -> Option<T> {
        self.into_any().downcast::<T>().ok().map(|boxed| *boxed)
    }
}

/// Implements [`TypedElement`] and [`ElementType`] for a struct whose only
/// field is `element: Element`.
#[macro_export]
macro_rules! element_type {
    ($ty:ident, [$($kind:literal),* $(,)?]) => {
        impl $crate::TypedElement for $ty {
            fn element(&self) -> &$crate::Element {
                &self.element
            }

            fn element_mut(&mut self) -> &mut $crate::Element {
                &mut self.element
            }

            fn into_element(self: Box<Self>) -> $crate::Element {
                self.element
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn into_any(self: Box<Self>) -> Box<dyn ::std::any::Any> {
                self
            }
        }

        impl $crate::ElementType for $ty {
            const KINDS: &'static [&'static str] = &[$($kind),*];

            fn from_element(element: $crate::Element) -> Self {
                Self { element }
            }
        }
    };
}

// ── Registry ────────────────────────────────────────────────────────

type Constructor = fn(Element) -> Box<dyn TypedElement>;

#[derive(Clone, Copy)]
struct Registration {
    type_id: TypeId,
    type_name: &'static str,
    construct: Constructor,
}

impl Registration {
    fn of<T: ElementType>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            construct: construct_boxed::<T>,
        }
    }
}

fn construct_boxed<T: ElementType>(element: Element) -> Box<dyn TypedElement> {
    Box::new(T::from_element(element))
}

/// Kind string → typed view constructor.
///
/// Safe to share across tasks; registration and lookup never block each
/// other for long.
pub struct TypeRegistry {
    entries: DashMap<String, Registration>,
}

impl TypeRegistry {
    /// An empty registry. Every kind resolves to `GenericElement`.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// A registry pre-populated with the built-in model types.
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.insert::<Host>();
        registry.insert::<Network>();
        registry.insert::<AddressRange>();
        registry.insert::<Group>();
        registry.insert::<Router>();
        registry.insert::<Service>();
        registry
    }

    /// The process-wide registry, populated with the built-ins on first use.
    pub fn global() -> &'static Self {
        static GLOBAL: LazyLock<TypeRegistry> = LazyLock::new(TypeRegistry::with_builtin);
        &GLOBAL
    }

    /// Bind every kind in `T::KINDS` to `T`.
    ///
    /// Re-registering the same type is a no-op. Binding a kind that already
    /// belongs to a different type fails and leaves the registry as it was.
    /// Each kind is checked and bound under its shard lock, so concurrent
    /// conflicting registrations cannot both succeed.
    pub fn register<T: ElementType>(&self) -> Result<(), CoreError> {
        let registration = Registration::of::<T>();
        let mut bound: Vec<&str> = Vec::with_capacity(T::KINDS.len());
        for kind in T::KINDS {
            match self.entries.entry((*kind).to_owned()) {
                Entry::Occupied(existing) if existing.get().type_id != registration.type_id => {
                    let existing_name = existing.get().type_name;
                    drop(existing);
                    self.unbind(&bound, registration.type_id);
                    return Err(CoreError::RegistryConflict {
                        kind: (*kind).to_owned(),
                        existing: existing_name,
                        attempted: registration.type_name,
                    });
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(registration);
                    bound.push(*kind);
                }
            }
        }
        debug!(kinds = ?T::KINDS, type_name = registration.type_name, "registered element type");
        Ok(())
    }

    fn unbind(&self, kinds: &[&str], type_id: TypeId) {
        for kind in kinds {
            self.entries.remove_if(*kind, |_, r| r.type_id == type_id);
        }
    }

    fn insert<T: ElementType>(&self) {
        let registration = Registration::of::<T>();
        for kind in T::KINDS {
            self.entries
                .entry((*kind).to_owned())
                .or_insert(registration);
        }
        trace!(kinds = ?T::KINDS, type_name = registration.type_name, "registered built-in type");
    }

    pub fn is_registered(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    /// Rust type name bound to `kind`, if any.
    pub fn type_name(&self, kind: &str) -> Option<&'static str> {
        self.entries.get(kind).map(|r| r.type_name)
    }

    /// All registered kinds, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        kinds.sort();
        kinds
    }

    /// Wrap `element` in the view registered for its kind.
    pub fn construct(&self, element: Element) -> Box<dyn TypedElement> {
        let construct = self.entries.get(element.kind()).map(|r| r.construct);
        if let Some(construct) = construct {
            construct(element)
        } else {
            trace!(kind = element.kind(), "no registered type, using generic view");
            Box::new(GenericElement::from_element(element))
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
