//! Protocol signature modules
//!
//! Each module pairs a protocol identity with a predicate over a
//! [`FlowObservation`](crate::core::FlowObservation). Modules are grouped
//! into a TCP catalogue and a UDP catalogue; the [`registry`] dispatches a
//! flow to the lowest-priority module whose predicate matches.

pub mod registry;
pub mod tcp;
pub mod types;
pub mod udp;

pub use registry::{categorise, ProtocolModule, Registry, RegistryBuilder};
pub use types::{Category, Protocol};

use crate::core::FlowObservation;

fn no_payload(obs: &FlowObservation) -> bool {
    obs.is_empty()
}

/// Claims flows where neither direction ever carried payload, before any
/// signature that tolerates a missing direction gets a look at them.
pub static NO_PAYLOAD: ProtocolModule = ProtocolModule {
    protocol: Protocol::NoPayload,
    category: Category::NoPayload,
    name: "No_Payload",
    priority: 1,
    matches: no_payload,
};

static TCP_MODULES: [&ProtocolModule; 49] = [
    &NO_PAYLOAD,
    &tcp::HTTP,
    &tcp::SMTP,
    &tcp::SSH,
    &tcp::POP3,
    &tcp::IMAP,
    &tcp::BITTORRENT,
    &tcp::RSYNC,
    &tcp::NNTP,
    &tcp::WECHAT,
    &tcp::IRC,
    &tcp::RFB,
    &tcp::SHOUTCAST,
    &tcp::GNUTELLA,
    &tcp::SVN,
    &tcp::TELNET,
    &tcp::SMB,
    &tcp::NETBIOS,
    &tcp::HTTPS,
    &tcp::SSL,
    &tcp::RDP,
    &tcp::STEAM,
    &tcp::WOW,
    &tcp::BLIZZARD,
    &tcp::COD_WAW,
    &tcp::CONQUER,
    &tcp::MYSQL,
    &tcp::TDS,
    &tcp::POSTGRESQL,
    &tcp::SOCKS5,
    &tcp::SOCKS4,
    &tcp::RTMP,
    &tcp::RTSP,
    &tcp::SIP,
    &tcp::MP2P,
    &tcp::WINMX,
    &tcp::CLUBBOX,
    &tcp::PDBOX,
    &tcp::IMESH,
    &tcp::MESSAGE4U,
    &tcp::MITGLIEDER,
    &tcp::XML,
    &tcp::RBL,
    &tcp::TOR,
    &tcp::BITEXTEND,
    &tcp::EMULE,
    &tcp::DNS_TCP,
    &tcp::FTP_CONTROL,
    &tcp::FTP_DATA,
];

static UDP_MODULES: [&ProtocolModule; 21] = [
    &NO_PAYLOAD,
    &udp::BTDHT,
    &udp::SSDP,
    &udp::DNS,
    &udp::DHCP,
    &udp::NTP,
    &udp::SNMP,
    &udp::TFTP,
    &udp::STUN,
    &udp::GNUTELLA,
    &udp::EMULE,
    &udp::SIP,
    &udp::QUAKE,
    &udp::GAMESPY,
    &udp::STEAM,
    &udp::SLP,
    &udp::NETBIOS,
    &udp::TEREDO,
    &udp::RTP,
    &udp::DTLS,
    &udp::ISAKMP,
];

/// The built-in TCP catalogue, in registration order.
pub fn default_tcp_modules() -> &'static [&'static ProtocolModule] {
    &TCP_MODULES
}

/// The built-in UDP catalogue, in registration order.
pub fn default_udp_modules() -> &'static [&'static ProtocolModule] {
    &UDP_MODULES
}
