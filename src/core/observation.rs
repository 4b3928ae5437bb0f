//! Per-flow first-payload fingerprint
//!
//! Records, for each direction of a bidirectional flow, the first four
//! payload bytes, the full first-payload length, and enough TCP state to
//! reject out-of-order and reset segments. Classification only ever looks
//! at this fixed-size record, never at the packets themselves.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::packet::{Direction, IpProtocol, PacketView, Transport};

/// Observation stops once a direction has carried this many payload bytes.
pub const MAX_OBSERVED_BYTES: u64 = 32 * 1024;

/// Fixed-size classification record for one flow.
///
/// All per-direction arrays are indexed by [`Direction::index`]:
/// slot 0 is client-to-server, slot 1 is server-to-client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowObservation {
    /// First payload bytes per direction, zero-padded to four bytes.
    pub payload: [[u8; 4]; 2],
    /// Full length of the first payload-bearing packet per direction.
    pub payload_len: [u32; 2],
    /// Expected next sequence number per direction (TCP only).
    pub seqno: [u32; 2],
    /// Total payload bytes seen per direction, including ignored packets.
    pub observed: [u64; 2],
    /// Destination port of the first packet.
    pub server_port: u16,
    /// Source port of the first packet.
    pub client_port: u16,
    /// Transport protocol, fixed by the first packet submitted.
    pub trans_proto: Option<IpProtocol>,
    /// Endpoint addresses, slot 0 = client, slot 1 = server.
    pub ips: [Option<IpAddr>; 2],
}

impl Default for FlowObservation {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowObservation {
    pub fn new() -> Self {
        Self {
            payload: [[0; 4]; 2],
            payload_len: [0; 2],
            seqno: [0; 2],
            observed: [0; 2],
            server_port: 0,
            client_port: 0,
            trans_proto: None,
            ips: [None, None],
        }
    }

    /// Feed one packet of the flow in the given direction.
    ///
    /// Returns `true` when the packet updated the stored fingerprint for
    /// that direction, `false` when it was counted but otherwise ignored.
    /// For TCP the fingerprint may be updated more than once: a qualifying
    /// retransmit or overlapping segment overwrites the previous bytes,
    /// and the last qualifying packet wins.
    pub fn update(&mut self, pkt: &PacketView<'_>, dir: Direction) -> bool {
        let d = dir.index();
        let psize = pkt.payload.len();

        if self.observed[d] > MAX_OBSERVED_BYTES {
            return false;
        }
        self.observed[d] += psize as u64;

        // Only TCP may revisit a direction that already has payload bytes.
        if self.trans_proto != Some(IpProtocol::Tcp) && self.payload_len[d] != 0 {
            return false;
        }

        if self.trans_proto.is_none() {
            self.trans_proto = Some(pkt.trans_proto);
        }

        let transport = match &pkt.transport {
            Some(t) => t,
            None => return false,
        };

        match transport {
            Transport::Tcp {
                src_port,
                dst_port,
                seq,
                flags,
            } => {
                if flags.rst {
                    return false;
                }
                if self.server_port == 0 {
                    self.server_port = *dst_port;
                    self.client_port = *src_port;
                }
                // A SYN pins where the first payload byte must start.
                if flags.syn && self.payload_len[d] == 0 {
                    self.seqno[d] = seq.wrapping_add(1);
                }
                if seq_ahead(*seq, self.seqno[d]) {
                    trace!(seq, expected = self.seqno[d], "out-of-order segment ignored");
                    return false;
                }
            }
            Transport::Udp { src_port, dst_port } => {
                if self.server_port == 0 {
                    self.server_port = *dst_port;
                    self.client_port = *src_port;
                }
            }
        }

        if psize == 0 {
            return false;
        }

        let mut word = [0u8; 4];
        let take = psize.min(4);
        word[..take].copy_from_slice(&pkt.payload[..take]);
        self.payload[d] = word;
        self.payload_len[d] = psize as u32;

        if self.ips[0].is_none() {
            if let (Some(src), Some(dst)) = (pkt.src_ip, pkt.dst_ip) {
                self.ips[d] = Some(src);
                self.ips[d ^ 1] = Some(dst);
            }
        }

        true
    }

    /// True when neither direction has carried any payload yet.
    pub fn is_empty(&self) -> bool {
        self.payload_len[0] == 0 && self.payload_len[1] == 0
    }
}

/// True when `seq` starts strictly after the expected sequence number,
/// treating the 32-bit space as a circle.
fn seq_ahead(seq: u32, expected: u32) -> bool {
    seq.wrapping_sub(expected) as i32 > 0
}
