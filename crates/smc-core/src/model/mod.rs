// ── Element model ──
//
// Typed views over `Element` for the kinds this crate knows about, plus the
// generic fallback used for everything else.

pub mod generic;
pub mod group;
pub mod network;
pub mod service;

pub use generic::GenericElement;
pub use group::{Group, GroupSpec};
pub use network::{AddressRange, AddressRangeSpec, Host, HostSpec, Network, NetworkSpec, Router, RouterSpec};
pub use service::{Service, TcpServiceSpec, UdpServiceSpec};

use serde::Serialize;
use serde_json::Value;

use crate::element::Representation;
use crate::error::CoreError;

/// Creation body for a kind.
pub trait ElementSpec: Serialize {
    /// Kind of the element this spec creates.
    const KIND: &'static str;

    fn to_representation(&self) -> Result<Representation, CoreError> {
        match serde_json::to_value(self).map_err(|e| CoreError::Encode(e.to_string()))? {
            Value::Object(map) => Ok(map),
            other => Err(CoreError::Encode(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }
}
