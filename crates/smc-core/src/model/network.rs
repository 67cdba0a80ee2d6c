// Network address elements: hosts, networks, ranges and routers.

use serde::Serialize;

use crate::element::Element;
use crate::error::CoreError;
use crate::model::ElementSpec;

// ── Host ────────────────────────────────────────────────────────────

/// A single host address, optionally with secondary addresses.
#[derive(Debug)]
pub struct Host {
    element: Element,
}

crate::element_type!(Host, ["host"]);

impl Host {
    pub async fn address(&mut self) -> Result<Option<&str>, CoreError> {
        self.element.get_str("address").await
    }

    pub async fn ipv6_address(&mut self) -> Result<Option<&str>, CoreError> {
        self.element.get_str("ipv6_address").await
    }

    pub async fn secondary(&mut self) -> Result<Vec<String>, CoreError> {
        self.element.get_str_list("secondary").await
    }

    pub async fn comment(&mut self) -> Result<Option<&str>, CoreError> {
        self.element.get_str("comment").await
    }

    pub fn set_address(&mut self, address: impl Into<String>) {
        self.element.set("address", address.into());
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.element.set("comment", comment.into());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostSpec {
    pub name: String,
    pub address: String,
    pub secondary: Vec<String>,
    pub comment: String,
}

impl HostSpec {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            secondary: Vec::new(),
            comment: String::new(),
        }
    }

    pub fn secondary(mut self, address: impl Into<String>) -> Self {
        self.secondary.push(address.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

impl ElementSpec for HostSpec {
    const KIND: &'static str = "host";
}

// ── Network ─────────────────────────────────────────────────────────

/// An address block. `ipv4_network` accepts CIDR or dotted mask notation.
#[derive(Debug)]
pub struct Network {
    element: Element,
}

crate::element_type!(Network, ["network"]);

impl Network {
    pub async fn ipv4_network(&mut self) -> Result<Option<&str>, CoreError> {
        self.element.get_str("ipv4_network").await
    }

    pub async fn ipv6_network(&mut self) -> Result<Option<&str>, CoreError> {
        self.element.get_str("ipv6_network").await
    }

    pub async fn comment(&mut self) -> Result<Option<&str>, CoreError> {
        self.element.get_str("comment").await
    }

    pub fn set_ipv4_network(&mut self, cidr: impl Into<String>) {
        self.element.set("ipv4_network", cidr.into());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4_network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6_network: Option<String>,
    pub comment: String,
}

impl NetworkSpec {
    pub fn ipv4(name: impl Into<String>, cidr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ipv4_network: Some(cidr.into()),
            ipv6_network: None,
            comment: String::new(),
        }
    }

    pub fn ipv6(name: impl Into<String>, cidr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ipv4_network: None,
            ipv6_network: Some(cidr.into()),
            comment: String::new(),
        }
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

impl ElementSpec for NetworkSpec {
    const KIND: &'static str = "network";
}

// ── Address range ───────────────────────────────────────────────────

#[derive(Debug)]
pub struct AddressRange {
    element: Element,
}

crate::element_type!(AddressRange, ["address_range"]);

impl AddressRange {
    /// Range as `first-last`, e.g. `10.0.0.1-10.0.0.50`.
    pub async fn ip_range(&mut self) -> Result<Option<&str>, CoreError> {
        self.element.get_str("ip_range").await
    }

    pub async fn comment(&mut self) -> Result<Option<&str>, CoreError> {
        self.element.get_str("comment").await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressRangeSpec {
    pub name: String,
    pub ip_range: String,
    pub comment: String,
}

impl AddressRangeSpec {
    pub fn new(name: impl Into<String>, ip_range: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ip_range: ip_range.into(),
            comment: String::new(),
        }
    }
}

impl ElementSpec for AddressRangeSpec {
    const KIND: &'static str = "address_range";
}

// ── Router ──────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Router {
    element: Element,
}

crate::element_type!(Router, ["router"]);

impl Router {
    pub async fn address(&mut self) -> Result<Option<&str>, CoreError> {
        self.element.get_str("address").await
    }

    pub async fn secondary(&mut self) -> Result<Vec<String>, CoreError> {
        self.element.get_str_list("secondary").await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouterSpec {
    pub name: String,
    pub address: String,
    pub secondary: Vec<String>,
    pub comment: String,
}

impl RouterSpec {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            secondary: Vec::new(),
            comment: String::new(),
        }
    }
}

impl ElementSpec for RouterSpec {
    const KIND: &'static str = "router";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn host_spec_body() {
        let body = HostSpec::new("web-1", "10.0.0.5")
            .secondary("10.0.0.6")
            .comment("frontend")
            .to_representation()
            .unwrap();
        assert_eq!(
            serde_json::Value::Object(body),
            json!({
                "name": "web-1",
                "address": "10.0.0.5",
                "secondary": ["10.0.0.6"],
                "comment": "frontend"
            })
        );
    }

    #[test]
    fn network_spec_omits_unused_family() {
        let body = NetworkSpec::ipv4("net-10", "10.0.0.0/8")
            .to_representation()
            .unwrap();
        assert_eq!(body["ipv4_network"], "10.0.0.0/8");
        assert!(!body.contains_key("ipv6_network"));
        assert_eq!(body["comment"], "");
    }
}
