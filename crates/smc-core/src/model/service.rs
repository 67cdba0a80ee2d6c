// Port-based services used in access rules.

use serde::Serialize;

use crate::element::Element;
use crate::error::CoreError;
use crate::model::ElementSpec;

/// A TCP or UDP service. `max_dst_port` is only set for port ranges.
#[derive(Debug)]
pub struct Service {
    element: Element,
}

crate::element_type!(Service, ["tcp_service", "udp_service"]);

impl Service {
    pub async fn min_dst_port(&mut self) -> Result<Option<u16>, CoreError> {
        self.port("min_dst_port").await
    }

    pub async fn max_dst_port(&mut self) -> Result<Option<u16>, CoreError> {
        self.port("max_dst_port").await
    }

    pub async fn comment(&mut self) -> Result<Option<&str>, CoreError> {
        self.element.get_str("comment").await
    }

    /// `tcp` or `udp`, from the element's kind.
    pub fn protocol(&self) -> &str {
        self.element
            .kind()
            .strip_suffix("_service")
            .unwrap_or(self.element.kind())
    }

    pub fn set_min_dst_port(&mut self, port: u16) {
        self.element.set("min_dst_port", port);
    }

    async fn port(&mut self, field: &str) -> Result<Option<u16>, CoreError> {
        let Some(raw) = self.element.get_i64(field).await? else {
            return Ok(None);
        };
        u16::try_from(raw)
            .map(Some)
            .map_err(|_| CoreError::InvalidField {
                href: self.element.href().clone(),
                field: field.to_owned(),
                expected: "a port number",
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TcpServiceSpec {
    pub name: String,
    pub min_dst_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_dst_port: Option<u16>,
    pub comment: String,
}

impl TcpServiceSpec {
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            min_dst_port: port,
            max_dst_port: None,
            comment: String::new(),
        }
    }

    pub fn port_range(mut self, max_dst_port: u16) -> Self {
        self.max_dst_port = Some(max_dst_port);
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

impl ElementSpec for TcpServiceSpec {
    const KIND: &'static str = "tcp_service";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UdpServiceSpec {
    pub name: String,
    pub min_dst_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_dst_port: Option<u16>,
    pub comment: String,
}

impl UdpServiceSpec {
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            min_dst_port: port,
            max_dst_port: None,
            comment: String::new(),
        }
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

impl ElementSpec for UdpServiceSpec {
    const KIND: &'static str = "udp_service";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn tcp_spec_body() {
        let body = TcpServiceSpec::new("https-alt", 8443)
            .comment("admin ui")
            .to_representation()
            .unwrap();
        assert_eq!(
            serde_json::Value::Object(body),
            json!({ "name": "https-alt", "min_dst_port": 8443, "comment": "admin ui" })
        );
    }

    #[test]
    fn port_range_sets_upper_bound() {
        let body = TcpServiceSpec::new("ephemeral", 49152)
            .port_range(65535)
            .to_representation()
            .unwrap();
        assert_eq!(body["max_dst_port"], 65535);
        assert_eq!(UdpServiceSpec::KIND, "udp_service");
    }
}
