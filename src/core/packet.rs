//! Decoded packet view
//!
//! A minimal, borrowed view of one packet: addresses, transport header
//! fields, and the application payload slice. This is the only shape the
//! observation layer consumes, so callers with their own capture stack can
//! build one directly instead of going through the etherparse adapters.

use std::net::IpAddr;

use etherparse::{InternetSlice, SlicedPacket, TransportSlice};
use serde::{Deserialize, Serialize};

use crate::error::{ClassifyError, Result};

/// IP protocol numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpProtocol {
    Icmp,
    Tcp,
    Udp,
    Icmpv6,
    Other(u8),
}

impl From<u8> for IpProtocol {
    fn from(val: u8) -> Self {
        match val {
            1 => IpProtocol::Icmp,
            6 => IpProtocol::Tcp,
            17 => IpProtocol::Udp,
            58 => IpProtocol::Icmpv6,
            other => IpProtocol::Other(other),
        }
    }
}

impl From<IpProtocol> for u8 {
    fn from(val: IpProtocol) -> Self {
        match val {
            IpProtocol::Icmp => 1,
            IpProtocol::Tcp => 6,
            IpProtocol::Udp => 17,
            IpProtocol::Icmpv6 => 58,
            IpProtocol::Other(v) => v,
        }
    }
}

impl std::fmt::Display for IpProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpProtocol::Icmp => write!(f, "ICMP"),
            IpProtocol::Tcp => write!(f, "TCP"),
            IpProtocol::Udp => write!(f, "UDP"),
            IpProtocol::Icmpv6 => write!(f, "ICMPv6"),
            IpProtocol::Other(n) => write!(f, "Proto({})", n),
        }
    }
}

/// TCP flags relevant to first-payload observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TcpFlags {
    pub fin: bool,
    pub syn: bool,
    pub rst: bool,
    pub ack: bool,
}

impl TcpFlags {
    pub const SYN: TcpFlags = TcpFlags {
        fin: false,
        syn: true,
        rst: false,
        ack: false,
    };

    pub const RST: TcpFlags = TcpFlags {
        fin: false,
        syn: false,
        rst: true,
        ack: false,
    };

    pub fn from_u8(flags: u8) -> Self {
        Self {
            fin: flags & 0x01 != 0,
            syn: flags & 0x02 != 0,
            rst: flags & 0x04 != 0,
            ack: flags & 0x10 != 0,
        }
    }
}

/// Packet direction relative to the connection initiator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// From client to server (initiator -> responder)
    ToServer,
    /// From server to client (responder -> initiator)
    ToClient,
}

impl Direction {
    /// Index into the per-direction arrays of a flow observation.
    pub fn index(&self) -> usize {
        match self {
            Direction::ToServer => 0,
            Direction::ToClient => 1,
        }
    }
}

/// Parsed transport header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp {
        src_port: u16,
        dst_port: u16,
        seq: u32,
        flags: TcpFlags,
    },
    Udp {
        src_port: u16,
        dst_port: u16,
    },
}

/// Borrowed view of a single decoded packet
///
/// `transport` is `None` when the transport header was absent, truncated,
/// or of a kind that carries no ports (ICMP and friends). `trans_proto`
/// still records the IP protocol number in that case.
#[derive(Debug, Clone)]
pub struct PacketView<'a> {
    pub src_ip: Option<IpAddr>,
    pub dst_ip: Option<IpAddr>,
    pub trans_proto: IpProtocol,
    pub transport: Option<Transport>,
    pub payload: &'a [u8],
}

impl<'a> PacketView<'a> {
    /// Decode a packet starting at the Ethernet header.
    pub fn from_ethernet(data: &'a [u8]) -> Result<Self> {
        let sliced = SlicedPacket::from_ethernet(data)
            .map_err(|e| ClassifyError::PacketParse(e.to_string()))?;
        Ok(Self::from_sliced(sliced))
    }

    /// Decode a packet starting at the IP header.
    pub fn from_ip(data: &'a [u8]) -> Result<Self> {
        let sliced = SlicedPacket::from_ip(data)
            .map_err(|e| ClassifyError::PacketParse(e.to_string()))?;
        Ok(Self::from_sliced(sliced))
    }

    fn from_sliced(sliced: SlicedPacket<'a>) -> Self {
        let (src_ip, dst_ip, ip_proto) = match &sliced.net {
            Some(InternetSlice::Ipv4(ipv4)) => (
                Some(IpAddr::from(ipv4.header().source())),
                Some(IpAddr::from(ipv4.header().destination())),
                ipv4.header().protocol().0,
            ),
            Some(InternetSlice::Ipv6(ipv6)) => (
                Some(IpAddr::from(ipv6.header().source())),
                Some(IpAddr::from(ipv6.header().destination())),
                ipv6.header().next_header().0,
            ),
            None => (None, None, 0),
        };

        let (trans_proto, transport, payload): (IpProtocol, Option<Transport>, &'a [u8]) =
            match &sliced.transport {
                Some(TransportSlice::Tcp(tcp)) => (
                    IpProtocol::Tcp,
                    Some(Transport::Tcp {
                        src_port: tcp.source_port(),
                        dst_port: tcp.destination_port(),
                        seq: tcp.sequence_number(),
                        flags: TcpFlags {
                            fin: tcp.fin(),
                            syn: tcp.syn(),
                            rst: tcp.rst(),
                            ack: tcp.ack(),
                        },
                    }),
                    tcp.payload(),
                ),
                Some(TransportSlice::Udp(udp)) => (
                    IpProtocol::Udp,
                    Some(Transport::Udp {
                        src_port: udp.source_port(),
                        dst_port: udp.destination_port(),
                    }),
                    udp.payload(),
                ),
                Some(TransportSlice::Icmpv4(_)) => (IpProtocol::Icmp, None, &[]),
                Some(TransportSlice::Icmpv6(_)) => (IpProtocol::Icmpv6, None, &[]),
                None => (IpProtocol::from(ip_proto), None, &[]),
            };

        Self {
            src_ip,
            dst_ip,
            trans_proto,
            transport,
            payload,
        }
    }

    /// Source port, 0 if the transport has none.
    pub fn src_port(&self) -> u16 {
        match self.transport {
            Some(Transport::Tcp { src_port, .. }) | Some(Transport::Udp { src_port, .. }) => {
                src_port
            }
            None => 0,
        }
    }

    /// Destination port, 0 if the transport has none.
    pub fn dst_port(&self) -> u16 {
        match self.transport {
            Some(Transport::Tcp { dst_port, .. }) | Some(Transport::Udp { dst_port, .. }) => {
                dst_port
            }
            None => 0,
        }
    }
}
