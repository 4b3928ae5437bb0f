//! UDP signature modules
//!
//! UDP flows freeze the first payload per direction, so signatures here
//! lean on header constants, message lengths, and well-known ports more
//! than the TCP set does.

use crate::core::FlowObservation;
use crate::pattern::{empty_or, match_str, match_str_either, ANY};
use crate::protocols::registry::ProtocolModule;
use crate::protocols::types::{Category, Protocol};
use crate::{match_bytes, match_chars_either};

fn port_either(obs: &FlowObservation, port: u16) -> bool {
    obs.server_port == port || obs.client_port == port
}

/* ----------------------------------------------------------------- DHT */

fn is_btdht(obs: &FlowObservation) -> bool {
    // Bencoded dictionary: "d1:a...", "d1:r..." and friends.
    match_chars_either!(obs, b'd', b'1', b':', ANY)
        || match_chars_either!(obs, b'd', b'1', ANY, b':')
}

pub static BTDHT: ProtocolModule = ProtocolModule {
    protocol: Protocol::UdpBtDht,
    category: Category::P2pStructure,
    name: "BitTorrent_UDP",
    priority: 2,
    matches: is_btdht,
};

/* ---------------------------------------------------------------- SSDP */

fn is_ssdp(obs: &FlowObservation) -> bool {
    match_str_either(obs, b"M-SE") || match_str_either(obs, b"NOTI")
}

pub static SSDP: ProtocolModule = ProtocolModule {
    protocol: Protocol::UdpSsdp,
    category: Category::Services,
    name: "SSDP",
    priority: 8,
    matches: is_ssdp,
};

/* ----------------------------------------------------------------- DNS */

fn dns_query_flags(word: [u8; 4]) -> bool {
    // Standard query, optionally with recursion desired, or a response
    // with no error. Anything fancier is left to the bidirectional rule.
    matches!(
        (word[2], word[3]),
        (0x00, 0x00) | (0x01, 0x00) | (0x00, 0x10)
    )
}

fn is_dns(obs: &FlowObservation) -> bool {
    let (w0, l0) = (obs.payload[0], obs.payload_len[0]);
    let (w1, l1) = (obs.payload[1], obs.payload_len[1]);

    // One-sided flow: require the DNS port, a payload longer than the
    // 12-byte header, and sane flag bytes.
    if l0 == 0 || l1 == 0 {
        if !port_either(obs, 53) {
            return false;
        }
        let (w, l) = if l0 > 0 { (w0, l0) } else { (w1, l1) };
        return l > 12 && dns_query_flags(w);
    }

    // Both directions observed: transaction IDs must agree, opcodes must
    // agree, and exactly one side must have the response bit set.
    if w0[0] != w1[0] || w0[1] != w1[1] {
        return false;
    }
    if (w0[2] & 0x78) != (w1[2] & 0x78) {
        return false;
    }
    (w0[2] & 0x80) != (w1[2] & 0x80)
}

pub static DNS: ProtocolModule = ProtocolModule {
    protocol: Protocol::UdpDns,
    category: Category::Services,
    name: "DNS",
    priority: 10,
    matches: is_dns,
};

/* ---------------------------------------------------------------- DHCP */

fn dhcp_header(word: [u8; 4], len: u32) -> bool {
    // op 1/2, htype 1 (ethernet), hlen 6, hops 0.
    empty_or(
        len,
        (word[0] == 0x01 || word[0] == 0x02) && word[1] == 0x01 && word[2] == 0x06,
    )
}

fn is_dhcp(obs: &FlowObservation) -> bool {
    if !port_either(obs, 67) && !port_either(obs, 68) {
        return false;
    }
    if obs.is_empty() {
        return false;
    }
    dhcp_header(obs.payload[0], obs.payload_len[0])
        && dhcp_header(obs.payload[1], obs.payload_len[1])
}

pub static DHCP: ProtocolModule = ProtocolModule {
    protocol: Protocol::UdpDhcp,
    category: Category::Services,
    name: "DHCP",
    priority: 12,
    matches: is_dhcp,
};

/* ----------------------------------------------------------------- NTP */

fn ntp_header(word: [u8; 4], len: u32) -> bool {
    if len == 0 {
        return true;
    }
    if len != 48 {
        return false;
    }
    let version = (word[0] >> 3) & 0x07;
    let mode = word[0] & 0x07;
    (1..=4).contains(&version) && (1..=5).contains(&mode)
}

fn is_ntp(obs: &FlowObservation) -> bool {
    if obs.is_empty() {
        return false;
    }
    ntp_header(obs.payload[0], obs.payload_len[0])
        && ntp_header(obs.payload[1], obs.payload_len[1])
}

pub static NTP: ProtocolModule = ProtocolModule {
    protocol: Protocol::UdpNtp,
    category: Category::Services,
    name: "NTP",
    priority: 14,
    matches: is_ntp,
};

/* ---------------------------------------------------------------- SNMP */

fn snmp_header(word: [u8; 4], len: u32) -> bool {
    // BER sequence, then an integer version field.
    empty_or(len, word[0] == 0x30 && word[2] == 0x02 && word[3] == 0x01)
}

fn is_snmp(obs: &FlowObservation) -> bool {
    if obs.is_empty() {
        return false;
    }
    snmp_header(obs.payload[0], obs.payload_len[0])
        && snmp_header(obs.payload[1], obs.payload_len[1])
}

pub static SNMP: ProtocolModule = ProtocolModule {
    protocol: Protocol::UdpSnmp,
    category: Category::Services,
    name: "SNMP",
    priority: 16,
    matches: is_snmp,
};

/* ---------------------------------------------------------------- TFTP */

fn is_tftp(obs: &FlowObservation) -> bool {
    if !port_either(obs, 69) {
        return false;
    }
    let request = |w: [u8; 4]| w[0] == 0x00 && (w[1] == 0x01 || w[1] == 0x02);
    let transfer = |w: [u8; 4], l: u32| empty_or(l, w[0] == 0x00 && (0x03..=0x05).contains(&w[1]));
    (request(obs.payload[0]) && transfer(obs.payload[1], obs.payload_len[1]))
        || (request(obs.payload[1]) && transfer(obs.payload[0], obs.payload_len[0]))
}

pub static TFTP: ProtocolModule = ProtocolModule {
    protocol: Protocol::UdpTftp,
    category: Category::Files,
    name: "TFTP",
    priority: 18,
    matches: is_tftp,
};

/* ---------------------------------------------------------------- STUN */

fn stun_message(word: [u8; 4], len: u32) -> bool {
    if len == 0 {
        return true;
    }
    let msg_type = u16::from_be_bytes([word[0], word[1]]);
    let msg_len = u16::from_be_bytes([word[2], word[3]]) as u32;
    // Binding request/response/indication, with the length field covering
    // everything after the 20-byte header.
    matches!(msg_type, 0x0001 | 0x0101 | 0x0011 | 0x0111) && msg_len == len.wrapping_sub(20)
}

fn is_stun(obs: &FlowObservation) -> bool {
    if obs.is_empty() {
        return false;
    }
    stun_message(obs.payload[0], obs.payload_len[0])
        && stun_message(obs.payload[1], obs.payload_len[1])
}

pub static STUN: ProtocolModule = ProtocolModule {
    protocol: Protocol::UdpStun,
    category: Category::Nat,
    name: "STUN",
    priority: 20,
    matches: is_stun,
};

/* ------------------------------------------------------------ P2P misc */

fn is_gnutella_udp(obs: &FlowObservation) -> bool {
    match_chars_either!(obs, b'G', b'N', b'D', ANY)
}

pub static GNUTELLA: ProtocolModule = ProtocolModule {
    protocol: Protocol::UdpGnutella,
    category: Category::P2p,
    name: "Gnutella_UDP",
    priority: 22,
    matches: is_gnutella_udp,
};

fn emule_marker(word: [u8; 4]) -> bool {
    matches!(word[0], 0xe3 | 0xe4 | 0xe5 | 0xc5)
}

fn is_emule_udp(obs: &FlowObservation) -> bool {
    let (l0, l1) = (obs.payload_len[0], obs.payload_len[1]);
    if l0 > 0 && l1 > 0 {
        return emule_marker(obs.payload[0]) && emule_marker(obs.payload[1]);
    }
    (l0 > 0 && emule_marker(obs.payload[0])) || (l1 > 0 && emule_marker(obs.payload[1]))
}

pub static EMULE: ProtocolModule = ProtocolModule {
    protocol: Protocol::UdpEmule,
    category: Category::P2p,
    name: "eMule_UDP",
    priority: 24,
    matches: is_emule_udp,
};

/* ----------------------------------------------------------------- SIP */

fn sip_request(word: [u8; 4]) -> bool {
    for method in [b"INVI", b"REGI", b"SUBS", b"NOTI", b"CANC"] {
        if match_str(word, method) {
            return true;
        }
    }
    false
}

fn is_sip_udp(obs: &FlowObservation) -> bool {
    if match_str_either(obs, b"SIP/") {
        return true;
    }
    (sip_request(obs.payload[0]) && obs.payload_len[1] == 0)
        || (sip_request(obs.payload[1]) && obs.payload_len[0] == 0)
}

pub static SIP: ProtocolModule = ProtocolModule {
    protocol: Protocol::UdpSip,
    category: Category::Voip,
    name: "SIP_UDP",
    priority: 26,
    matches: is_sip_udp,
};

/* -------------------------------------------------------------- gaming */

fn quake_oob(word: [u8; 4]) -> bool {
    word == [0xff, 0xff, 0xff, 0xff]
}

fn is_quake(obs: &FlowObservation) -> bool {
    let on_quake_port = [26000u16, 27500, 27910, 27960]
        .iter()
        .any(|&p| port_either(obs, p));
    if !on_quake_port {
        return false;
    }
    quake_oob(obs.payload[0]) || quake_oob(obs.payload[1])
}

pub static QUAKE: ProtocolModule = ProtocolModule {
    protocol: Protocol::UdpQuake,
    category: Category::Gaming,
    name: "Quake",
    priority: 28,
    matches: is_quake,
};

fn is_gamespy(obs: &FlowObservation) -> bool {
    match_chars_either!(obs, 0xfe, 0xfd, ANY, ANY) || match_str_either(obs, b"\\sta")
}

pub static GAMESPY: ProtocolModule = ProtocolModule {
    protocol: Protocol::UdpGamespy,
    category: Category::Gaming,
    name: "Gamespy",
    priority: 30,
    matches: is_gamespy,
};

fn is_steam_udp(obs: &FlowObservation) -> bool {
    let on_steam_port = (27015..=27030).any(|p| port_either(obs, p));
    if !on_steam_port {
        return false;
    }
    quake_oob(obs.payload[0]) || quake_oob(obs.payload[1])
}

pub static STEAM: ProtocolModule = ProtocolModule {
    protocol: Protocol::UdpSteam,
    category: Category::Gaming,
    name: "Steam_UDP",
    priority: 32,
    matches: is_steam_udp,
};

/* ----------------------------------------------------------------- SLP */

fn is_slp(obs: &FlowObservation) -> bool {
    if !port_either(obs, 427) {
        return false;
    }
    let header = |w: [u8; 4], l: u32| empty_or(l, w[0] == 0x02 && (1..=11).contains(&w[1]));
    if obs.is_empty() {
        return false;
    }
    header(obs.payload[0], obs.payload_len[0]) && header(obs.payload[1], obs.payload_len[1])
}

pub static SLP: ProtocolModule = ProtocolModule {
    protocol: Protocol::UdpSlp,
    category: Category::Services,
    name: "SLP",
    priority: 34,
    matches: is_slp,
};

/* -------------------------------------------------------------- NetBIOS */

fn is_netbios_udp(obs: &FlowObservation) -> bool {
    if !port_either(obs, 137) && !port_either(obs, 138) {
        return false;
    }
    if obs.is_empty() {
        return false;
    }
    let header = |w: [u8; 4], l: u32| empty_or(l, w[2] == 0x00 || w[2] == 0x01);
    header(obs.payload[0], obs.payload_len[0]) && header(obs.payload[1], obs.payload_len[1])
}

pub static NETBIOS: ProtocolModule = ProtocolModule {
    protocol: Protocol::UdpNetbios,
    category: Category::Services,
    name: "Netbios_UDP",
    priority: 36,
    matches: is_netbios_udp,
};

/* -------------------------------------------------------------- Teredo */

fn teredo_payload(word: [u8; 4], len: u32) -> bool {
    // Either a raw tunnelled IPv6 header or a Teredo auth header.
    empty_or(
        len,
        (word[0] & 0xf0) == 0x60 || (word[0] == 0x00 && word[1] == 0x01),
    )
}

fn is_teredo(obs: &FlowObservation) -> bool {
    if !port_either(obs, 3544) {
        return false;
    }
    if obs.is_empty() {
        return false;
    }
    teredo_payload(obs.payload[0], obs.payload_len[0])
        && teredo_payload(obs.payload[1], obs.payload_len[1])
}

pub static TEREDO: ProtocolModule = ProtocolModule {
    protocol: Protocol::UdpTeredo,
    category: Category::Tunnelling,
    name: "Teredo",
    priority: 38,
    matches: is_teredo,
};

/* ----------------------------------------------------------------- RTP */

fn is_rtp(obs: &FlowObservation) -> bool {
    let header = |w: [u8; 4], l: u32| empty_or(l, w[0] == 0x80 && l >= 12);
    if obs.is_empty() {
        return false;
    }
    header(obs.payload[0], obs.payload_len[0]) && header(obs.payload[1], obs.payload_len[1])
}

pub static RTP: ProtocolModule = ProtocolModule {
    protocol: Protocol::UdpRtp,
    category: Category::Streaming,
    name: "RTP",
    priority: 70,
    matches: is_rtp,
};

/* ---------------------------------------------------------------- DTLS */

fn is_dtls(obs: &FlowObservation) -> bool {
    // DTLS versioning differs from conventional TLS.
    if match_bytes!(obs.payload[0], 0x17, 0x01, 0x00, 0x00) {
        if obs.payload_len[1] == 0 {
            return true;
        }
        if match_bytes!(obs.payload[1], 0x17, 0x01, 0x00, 0x00) {
            return true;
        }
    }
    match_bytes!(obs.payload[1], 0x17, 0x01, 0x00, 0x00) && obs.payload_len[0] == 0
}

pub static DTLS: ProtocolModule = ProtocolModule {
    protocol: Protocol::UdpDtls,
    category: Category::Encryption,
    name: "DTLS",
    priority: 100,
    matches: is_dtls,
};

/* -------------------------------------------------------------- ISAKMP */

fn is_isakmp(obs: &FlowObservation) -> bool {
    // Initiator cookies are random, so this is a weak port+shape rule.
    if !port_either(obs, 500) {
        return false;
    }
    let header = |w: [u8; 4], l: u32| empty_or(l, l >= 28 && w != [0; 4]);
    if obs.is_empty() {
        return false;
    }
    header(obs.payload[0], obs.payload_len[0]) && header(obs.payload[1], obs.payload_len[1])
}

pub static ISAKMP: ProtocolModule = ProtocolModule {
    protocol: Protocol::UdpIsakmp,
    category: Category::KeyExchange,
    name: "ISAKMP",
    priority: 120,
    matches: is_isakmp,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(p0: &[u8], p1: &[u8]) -> FlowObservation {
        let mut o = FlowObservation::new();
        let mut w = [0u8; 4];
        w[..p0.len().min(4)].copy_from_slice(&p0[..p0.len().min(4)]);
        o.payload[0] = w;
        o.payload_len[0] = p0.len() as u32;
        let mut w = [0u8; 4];
        w[..p1.len().min(4)].copy_from_slice(&p1[..p1.len().min(4)]);
        o.payload[1] = w;
        o.payload_len[1] = p1.len() as u32;
        o
    }

    #[test]
    fn test_dns_one_sided_query() {
        // 13-byte query to port 53 with all-zero flag bytes.
        let mut o = obs(&[0xab, 0xcd, 0x00, 0x00, 0, 0, 0, 0, 0, 0, 0, 0, 0], &[]);
        o.server_port = 53;
        o.client_port = 5353;
        assert!(is_dns(&o));
        // Too short to be a real message.
        o.payload_len[0] = 12;
        assert!(!is_dns(&o));
    }

    #[test]
    fn test_dns_one_sided_wrong_port() {
        let mut o = obs(&[0xab, 0xcd, 0x01, 0x00, 0, 0, 0, 0, 0, 0, 0, 0, 0], &[]);
        o.server_port = 5000;
        o.client_port = 6000;
        assert!(!is_dns(&o));
    }

    #[test]
    fn test_dns_bidirectional_id_and_qr() {
        let query = [0xab, 0xcd, 0x01, 0x00, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let reply = [0xab, 0xcd, 0x81, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let o = obs(&query, &reply);
        assert!(is_dns(&o));

        // Mismatched transaction ID.
        let bad_reply = [0xab, 0xce, 0x81, 0x80, 0, 0, 0, 0];
        let o = obs(&query, &bad_reply);
        assert!(!is_dns(&o));

        // Both sides claim to be queries.
        let o = obs(&query, &query);
        assert!(!is_dns(&o));
    }

    #[test]
    fn test_btdht_bencoded_dict() {
        let o = obs(b"d1:ad2:id20:...", b"");
        assert!(is_btdht(&o));
        let o = obs(b"d1:rd2:id20:...", b"");
        assert!(is_btdht(&o));
        let o = obs(b"d2:aa1:b", b"");
        assert!(!is_btdht(&o));
    }

    #[test]
    fn test_dtls_one_sided() {
        let o = obs(&[0x17, 0x01, 0x00, 0x00, 0xaa], &[]);
        assert!(is_dtls(&o));
        let o = obs(&[], &[0x17, 0x01, 0x00, 0x00, 0xaa]);
        assert!(is_dtls(&o));
        // Response present but not DTLS.
        let o = obs(&[0x17, 0x01, 0x00, 0x00, 0xaa], &[0x16, 0x03, 0x01, 0x00]);
        assert!(!is_dtls(&o));
    }

    #[test]
    fn test_ntp_length_and_mode() {
        let mut client = vec![0x23u8]; // v4, mode 3
        client.resize(48, 0);
        let mut server = vec![0x24u8]; // v4, mode 4
        server.resize(48, 0);
        let o = obs(&client, &server);
        assert!(is_ntp(&o));
        let o = obs(&client[..40], &[]);
        assert!(!is_ntp(&o));
    }

    #[test]
    fn test_stun_binding() {
        // Binding request, 8 bytes of attributes after the 20-byte header.
        let mut req = vec![0x00, 0x01, 0x00, 0x08];
        req.resize(28, 0);
        let o = obs(&req, &[]);
        assert!(is_stun(&o));
        let o = obs(&req[..20], &[]);
        assert!(!is_stun(&o));
    }

    #[test]
    fn test_tftp_request_on_port_69() {
        let mut o = obs(&[0x00, 0x01, b'f', b'i'], &[0x00, 0x03, 0x00, 0x01]);
        o.server_port = 69;
        assert!(is_tftp(&o));
        o.server_port = 70;
        o.client_port = 70;
        assert!(!is_tftp(&o));
    }

    #[test]
    fn test_dhcp_discover() {
        let mut o = obs(&[0x01, 0x01, 0x06, 0x00], &[]);
        o.payload_len[0] = 300;
        o.server_port = 67;
        o.client_port = 68;
        assert!(is_dhcp(&o));
    }
}
