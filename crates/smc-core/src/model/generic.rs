use serde_json::Value;

use crate::element::{Element, Representation};
use crate::error::CoreError;

/// View for kinds with no registered type. Exposes the raw representation.
#[derive(Debug)]
pub struct GenericElement {
    element: Element,
}

crate::element_type!(GenericElement, []);

impl GenericElement {
    pub async fn raw(&mut self) -> Result<&Representation, CoreError> {
        self.element.ensure_loaded().await
    }

    pub async fn field(&mut self, key: &str) -> Result<Option<&Value>, CoreError> {
        self.element.get(key).await
    }

    pub fn set_field(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.element.set(key, value);
    }
}
