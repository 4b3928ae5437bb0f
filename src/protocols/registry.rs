//! Protocol module registry and dispatch
//!
//! Signature modules are static records carrying their identifier,
//! category, display name, priority and a predicate over the flow
//! observation. Classification walks the registered modules in ascending
//! priority order (registration order breaks ties) and returns the first
//! module whose predicate accepts the observation.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::core::{FlowObservation, IpProtocol};
use crate::error::{ClassifyError, Result};
use crate::protocols::types::{Category, Protocol};

/// One protocol signature module
pub struct ProtocolModule {
    /// Protocol identifier reported on a match
    pub protocol: Protocol,

    /// Traffic category of this protocol
    pub category: Category,

    /// Human-readable display name
    pub name: &'static str,

    /// Evaluation priority (lower = checked first)
    pub priority: u8,

    /// Signature predicate over the flow observation
    pub matches: fn(&FlowObservation) -> bool,
}

impl std::fmt::Debug for ProtocolModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolModule")
            .field("name", &self.name)
            .field("protocol", &self.protocol)
            .field("category", &self.category)
            .field("priority", &self.priority)
            .finish()
    }
}

fn never_matches(_: &FlowObservation) -> bool {
    false
}

/// Fallback for ICMP and ICMPv6 flows. Never registered or scanned.
pub static ICMP: ProtocolModule = ProtocolModule {
    protocol: Protocol::Icmp,
    category: Category::Icmp,
    name: "ICMP",
    priority: 255,
    matches: never_matches,
};

/// Fallback for transports other than TCP, UDP and ICMP.
pub static UNSUPPORTED: ProtocolModule = ProtocolModule {
    protocol: Protocol::Unsupported,
    category: Category::Unsupported,
    name: "Unsupported",
    priority: 255,
    matches: never_matches,
};

/// Fallback when no registered TCP module matched.
pub static UNKNOWN_TCP: ProtocolModule = ProtocolModule {
    protocol: Protocol::Unknown,
    category: Category::Unknown,
    name: "Unknown_TCP",
    priority: 255,
    matches: never_matches,
};

/// Fallback when no registered UDP module matched.
pub static UNKNOWN_UDP: ProtocolModule = ProtocolModule {
    protocol: Protocol::UnknownUdp,
    category: Category::Unknown,
    name: "Unknown_UDP",
    priority: 255,
    matches: never_matches,
};

type PriorityBuckets = BTreeMap<u8, Vec<&'static ProtocolModule>>;

/// Builder for a [`Registry`]
#[derive(Default)]
pub struct RegistryBuilder {
    tcp: PriorityBuckets,
    udp: PriorityBuckets,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module for TCP flows.
    pub fn register_tcp(&mut self, module: &'static ProtocolModule) -> &mut Self {
        debug!(name = module.name, priority = module.priority, "registered TCP module");
        self.tcp.entry(module.priority).or_default().push(module);
        self
    }

    /// Register a module for UDP flows.
    pub fn register_udp(&mut self, module: &'static ProtocolModule) -> &mut Self {
        debug!(name = module.name, priority = module.priority, "registered UDP module");
        self.udp.entry(module.priority).or_default().push(module);
        self
    }

    /// Finalize the registry. Fails if nothing was registered.
    pub fn build(self) -> Result<Registry> {
        if self.tcp.is_empty() && self.udp.is_empty() {
            return Err(ClassifyError::EmptyRegistry);
        }
        let registry = Registry {
            tcp: self.tcp,
            udp: self.udp,
        };
        info!(
            tcp_modules = registry.tcp_len(),
            udp_modules = registry.udp_len(),
            "protocol registry built"
        );
        Ok(registry)
    }
}

/// Immutable set of registered signature modules
pub struct Registry {
    tcp: PriorityBuckets,
    udp: PriorityBuckets,
}

impl Registry {
    /// Registry loaded with the full built-in signature catalogue.
    pub fn with_defaults() -> Result<Registry> {
        let mut builder = RegistryBuilder::new();
        for module in super::default_tcp_modules() {
            builder.register_tcp(module);
        }
        for module in super::default_udp_modules() {
            builder.register_udp(module);
        }
        builder.build()
    }

    /// Classify a flow observation. Total: always returns a module, using
    /// the fallback singletons when no signature matches.
    pub fn classify(&self, obs: &FlowObservation) -> &'static ProtocolModule {
        match obs.trans_proto {
            Some(IpProtocol::Icmp) | Some(IpProtocol::Icmpv6) => &ICMP,
            Some(IpProtocol::Tcp) => Self::scan(&self.tcp, obs).unwrap_or(&UNKNOWN_TCP),
            Some(IpProtocol::Udp) => Self::scan(&self.udp, obs).unwrap_or(&UNKNOWN_UDP),
            Some(IpProtocol::Other(_)) | None => &UNSUPPORTED,
        }
    }

    fn scan(buckets: &PriorityBuckets, obs: &FlowObservation) -> Option<&'static ProtocolModule> {
        for bucket in buckets.values() {
            for module in bucket {
                if (module.matches)(obs) {
                    return Some(module);
                }
            }
        }
        None
    }

    /// Number of registered TCP modules.
    pub fn tcp_len(&self) -> usize {
        self.tcp.values().map(Vec::len).sum()
    }

    /// Number of registered UDP modules.
    pub fn udp_len(&self) -> usize {
        self.udp.values().map(Vec::len).sum()
    }
}

/// Category of a classification result; `None` maps to the
/// never-classified sentinel.
pub fn categorise(module: Option<&ProtocolModule>) -> Category {
    match module {
        Some(m) => m.category,
        None => Category::NoCategory,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always_matches(_: &FlowObservation) -> bool {
        true
    }

    static LOW_PRIORITY: ProtocolModule = ProtocolModule {
        protocol: Protocol::Http,
        category: Category::Web,
        name: "low",
        priority: 100,
        matches: always_matches,
    };

    static HIGH_PRIORITY: ProtocolModule = ProtocolModule {
        protocol: Protocol::WeChat,
        category: Category::Chat,
        name: "high",
        priority: 10,
        matches: always_matches,
    };

    static SECOND_REGISTERED: ProtocolModule = ProtocolModule {
        protocol: Protocol::Ssl,
        category: Category::Encryption,
        name: "second",
        priority: 10,
        matches: always_matches,
    };

    fn tcp_obs() -> FlowObservation {
        let mut obs = FlowObservation::new();
        obs.trans_proto = Some(IpProtocol::Tcp);
        obs.payload[0] = *b"test";
        obs.payload_len[0] = 4;
        obs
    }

    #[test]
    fn test_empty_registry_rejected() {
        assert!(matches!(
            RegistryBuilder::new().build(),
            Err(ClassifyError::EmptyRegistry)
        ));
    }

    #[test]
    fn test_lower_priority_wins() {
        let mut builder = RegistryBuilder::new();
        builder.register_tcp(&LOW_PRIORITY);
        builder.register_tcp(&HIGH_PRIORITY);
        let registry = builder.build().unwrap();
        // Registration order does not matter across priorities.
        assert_eq!(registry.classify(&tcp_obs()).protocol, Protocol::WeChat);
    }

    #[test]
    fn test_registration_order_breaks_ties() {
        let mut builder = RegistryBuilder::new();
        builder.register_tcp(&HIGH_PRIORITY);
        builder.register_tcp(&SECOND_REGISTERED);
        let registry = builder.build().unwrap();
        assert_eq!(registry.classify(&tcp_obs()).protocol, Protocol::WeChat);
    }

    #[test]
    fn test_fallbacks_are_total() {
        let mut builder = RegistryBuilder::new();
        builder.register_udp(&HIGH_PRIORITY);
        let registry = builder.build().unwrap();

        // TCP flow with no TCP modules registered at all.
        assert_eq!(registry.classify(&tcp_obs()).protocol, Protocol::Unknown);

        let mut icmp = FlowObservation::new();
        icmp.trans_proto = Some(IpProtocol::Icmp);
        assert_eq!(registry.classify(&icmp).protocol, Protocol::Icmp);

        let mut sctp = FlowObservation::new();
        sctp.trans_proto = Some(IpProtocol::Other(132));
        assert_eq!(registry.classify(&sctp).protocol, Protocol::Unsupported);

        // A flow that never saw a single packet.
        let blank = FlowObservation::new();
        assert_eq!(registry.classify(&blank).protocol, Protocol::Unsupported);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let registry = Registry::with_defaults().unwrap();
        let obs = tcp_obs();
        let first = registry.classify(&obs).protocol;
        for _ in 0..8 {
            assert_eq!(registry.classify(&obs).protocol, first);
        }
    }

    #[test]
    fn test_categorise() {
        assert_eq!(categorise(Some(&UNKNOWN_TCP)), Category::Unknown);
        assert_eq!(categorise(None), Category::NoCategory);
    }

    #[test]
    fn test_default_catalogue_nonempty() {
        let registry = Registry::with_defaults().unwrap();
        assert!(registry.tcp_len() > 30);
        assert!(registry.udp_len() > 15);
    }
}
