//! SourceAddress - canonical, protocol-prefixed sensor address
//!
//! Uses Arc<str> internally for O(1) clone operations.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

const PACKET_PREFIX: &str = "pws_";
const MESH_PREFIX: &str = "wirepas_";
const ENVELOPE_PREFIX: &str = "hetic_";

/// Gateway family a canonical address belongs to, derived from its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    /// `pws_<addr>` - packet gateway
    PacketGateway,
    /// `wirepas_<addr>` - mesh gateway
    MeshGateway,
    /// `hetic_<endpoint>` - envelope gateway
    GatewayEnvelope,
    /// Raw address of a directly relayed RuuviTag
    RuuviTag,
}

impl AddressFamily {
    fn prefix(self) -> &'static str {
        match self {
            Self::PacketGateway => PACKET_PREFIX,
            Self::MeshGateway => MESH_PREFIX,
            Self::GatewayEnvelope => ENVELOPE_PREFIX,
            Self::RuuviTag => "",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::PacketGateway => "PWS Sensor",
            Self::MeshGateway => "Wirepas",
            Self::GatewayEnvelope => "Hetic",
            Self::RuuviTag => "RuuviTag",
        }
    }
}

/// Canonical sensor address with cheap cloning.
///
/// The address is globally unique across gateway families: the same physical
/// sensor relayed by the packet gateway is `pws_42`, by the mesh gateway
/// `wirepas_42`. Direct RuuviTag sensors keep their raw address.
///
/// # Examples
/// ```
/// use contracts::{AddressFamily, SourceAddress};
///
/// let addr = SourceAddress::packet_gateway("42");
/// assert_eq!(addr, "pws_42");
/// assert_eq!(addr.family(), AddressFamily::PacketGateway);
/// assert_eq!(addr.display_name(), "PWS Sensor 42");
/// ```
#[derive(Clone, Default)]
pub struct SourceAddress(Arc<str>);

impl SourceAddress {
    /// Create a new SourceAddress from an already canonical string.
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Address of a sensor relayed by the packet gateway.
    pub fn packet_gateway(addr: &str) -> Self {
        Self::with_prefix(AddressFamily::PacketGateway, addr)
    }

    /// Address of a sensor relayed by the mesh gateway.
    pub fn mesh_gateway(addr: &str) -> Self {
        Self::with_prefix(AddressFamily::MeshGateway, addr)
    }

    /// Address of a sensor relayed by the envelope gateway.
    pub fn gateway_envelope(endpoint: &str) -> Self {
        Self::with_prefix(AddressFamily::GatewayEnvelope, endpoint)
    }

    /// Address of a directly relayed RuuviTag.
    pub fn ruuvitag(addr: &str) -> Self {
        Self::new(addr)
    }

    fn with_prefix(family: AddressFamily, addr: &str) -> Self {
        let mut s = String::with_capacity(family.prefix().len() + addr.len());
        s.push_str(family.prefix());
        s.push_str(addr);
        Self::from(s)
    }

    /// Get the underlying string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Gateway family, derived from the prefix.
    pub fn family(&self) -> AddressFamily {
        if self.0.starts_with(PACKET_PREFIX) {
            AddressFamily::PacketGateway
        } else if self.0.starts_with(MESH_PREFIX) {
            AddressFamily::MeshGateway
        } else if self.0.starts_with(ENVELOPE_PREFIX) {
            AddressFamily::GatewayEnvelope
        } else {
            AddressFamily::RuuviTag
        }
    }

    /// Address without its family prefix.
    pub fn suffix(&self) -> &str {
        let family = self.family();
        &self.0[family.prefix().len()..]
    }

    /// Human readable default name given to a newly discovered sensor.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.family().label(), self.suffix())
    }
}

impl Deref for SourceAddress {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for SourceAddress {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SourceAddress {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceAddress {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for SourceAddress {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for SourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for SourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceAddress({:?})", self.0)
    }
}

impl PartialEq for SourceAddress {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        // Fast path: same Arc pointer
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for SourceAddress {}

impl PartialEq<str> for SourceAddress {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for SourceAddress {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl PartialEq<String> for SourceAddress {
    #[inline]
    fn eq(&self, other: &String) -> bool {
        self.0.as_ref() == other
    }
}

// Same as str hash so maps keyed by SourceAddress can be queried with &str
impl Hash for SourceAddress {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for SourceAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SourceAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_family_prefixes() {
        assert_eq!(SourceAddress::packet_gateway("192"), "pws_192");
        assert_eq!(
            SourceAddress::mesh_gateway("AA:BB:CC"),
            "wirepas_AA:BB:CC"
        );
        assert_eq!(SourceAddress::gateway_envelope("7"), "hetic_7");
        assert_eq!(SourceAddress::ruuvitag("C4:64:E3:4A:5B:1C"), "C4:64:E3:4A:5B:1C");
    }

    #[test]
    fn test_family_detection() {
        assert_eq!(
            SourceAddress::new("pws_1").family(),
            AddressFamily::PacketGateway
        );
        assert_eq!(
            SourceAddress::new("wirepas_1").family(),
            AddressFamily::MeshGateway
        );
        assert_eq!(
            SourceAddress::new("hetic_1").family(),
            AddressFamily::GatewayEnvelope
        );
        assert_eq!(
            SourceAddress::new("C4:64:E3:4A:5B:1C").family(),
            AddressFamily::RuuviTag
        );
    }

    #[test]
    fn test_display_names() {
        assert_eq!(SourceAddress::new("pws_192").display_name(), "PWS Sensor 192");
        assert_eq!(
            SourceAddress::new("wirepas_AA:BB").display_name(),
            "Wirepas AA:BB"
        );
        assert_eq!(SourceAddress::new("hetic_7").display_name(), "Hetic 7");
        assert_eq!(
            SourceAddress::new("C4:64:E3:4A:5B:1C").display_name(),
            "RuuviTag C4:64:E3:4A:5B:1C"
        );
    }

    #[test]
    fn test_clone_is_cheap() {
        let a = SourceAddress::new("pws_1");
        let b = a.clone();
        assert_eq!(a.as_str().as_ptr(), b.as_str().as_ptr());
    }

    #[test]
    fn test_hashmap_lookup_by_str() {
        let mut map: HashMap<SourceAddress, i64> = HashMap::new();
        map.insert(SourceAddress::packet_gateway("42"), 1);
        assert_eq!(map.get("pws_42"), Some(&1));
    }

    #[test]
    fn test_serde() {
        let addr = SourceAddress::gateway_envelope("7");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"hetic_7\"");
        let parsed: SourceAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, addr);
    }
}
