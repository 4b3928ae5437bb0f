//! TCP signature modules
//!
//! Each signature is a standalone predicate over the flow observation plus
//! a static module record. Helper predicates that inspect a single
//! direction take the fingerprint word and the full first-payload length,
//! since several protocols deliver their banner a byte or two at a time.

use crate::core::FlowObservation;
use crate::pattern::{empty_or, match_str, match_str_both, match_str_either, ANY};
use crate::protocols::registry::ProtocolModule;
use crate::protocols::types::{Category, Protocol};
use crate::{match_bytes, match_chars_either};

fn port_either(obs: &FlowObservation, port: u16) -> bool {
    obs.server_port == port || obs.client_port == port
}

/* ---------------------------------------------------------------- HTTP */

fn http_request(word: [u8; 4], len: u32) -> bool {
    if len == 0 {
        return true;
    }
    if match_str(word, b"GET ") {
        return true;
    }
    // Some clients dribble the method out a byte or two at a time.
    if len == 1 && match_bytes!(word, b'G', 0x00, 0x00, 0x00) {
        return true;
    }
    if len == 2 && match_bytes!(word, b'G', b'E', 0x00, 0x00) {
        return true;
    }
    if len == 3 && match_bytes!(word, b'G', b'E', b'T', 0x00) {
        return true;
    }

    // REPO covers SVN's HTTP-tunnelled report requests.
    for method in [b"POST", b"HEAD", b"PUT ", b"DELE", b"auth", b"REPO"] {
        if match_str(word, method) {
            return true;
        }
    }

    // Webdav and other extension methods seen on real servers.
    for method in [b"LOCK", b"UNLO", b"OPTI", b"PROP", b"MKCO", b"POLL", b"SEAR"] {
        if match_str(word, method) {
            return true;
        }
    }

    // Ntrip, a differential GPS system layered over HTTP.
    match_str(word, b"SOUR")
}

fn http_response(word: [u8; 4], len: u32) -> bool {
    if len == 0 {
        return true;
    }
    if len == 1 && match_bytes!(word, b'H', 0x00, 0x00, 0x00) {
        return true;
    }
    if match_str(word, b"HTTP") {
        return true;
    }
    // mini_httpd and friends emit this as a valid response.
    match_str(word, b"UNKN")
}

fn is_http(obs: &FlowObservation) -> bool {
    (http_request(obs.payload[0], obs.payload_len[0])
        && http_response(obs.payload[1], obs.payload_len[1]))
        || (http_request(obs.payload[1], obs.payload_len[1])
            && http_response(obs.payload[0], obs.payload_len[0]))
}

pub static HTTP: ProtocolModule = ProtocolModule {
    protocol: Protocol::Http,
    category: Category::Web,
    name: "HTTP",
    priority: 3,
    matches: is_http,
};

/* ---------------------------------------------------------------- SMTP */

fn smtp_banner(word: [u8; 4], len: u32) -> bool {
    match len {
        1 => match_bytes!(word, b'2', 0x00, 0x00, 0x00),
        2 => match_bytes!(word, b'2', b'2', 0x00, 0x00),
        3 => match_bytes!(word, b'2', b'2', b'0', 0x00),
        _ => match_str(word, b"220 ") || match_str(word, b"220-"),
    }
}

fn smtp_command(word: [u8; 4], len: u32) -> bool {
    for cmd in [b"EHLO", b"ehlo", b"HELO", b"helo", b"NOOP", b"XXXX", b"HELP"] {
        if match_str(word, cmd) {
            return true;
        }
    }
    // One byte at a time, again.
    if len == 1 {
        for c in [b'e', b'E', b'h', b'H'] {
            if match_bytes!(word, c, 0x00, 0x00, 0x00) {
                return true;
            }
        }
    }
    false
}

fn is_smtp(obs: &FlowObservation) -> bool {
    // One-sided flows: accept the common reply codes on their own.
    if obs.payload_len[0] == 0 || obs.payload_len[1] == 0 {
        for code in [
            b"220 ", b"450 ", b"550 ", b"550-", b"421 ", b"421-", b"451 ", b"451-", b"452 ",
            b"420 ", b"571 ", b"553 ", b"554 ", b"554-", b"476 ", b"475 ",
        ] {
            if match_str_either(obs, code) {
                return true;
            }
        }
    }

    if match_str_either(obs, b"QUIT") && port_either(obs, 25) {
        return true;
    }

    (smtp_banner(obs.payload[0], obs.payload_len[0])
        && smtp_command(obs.payload[1], obs.payload_len[1]))
        || (smtp_banner(obs.payload[1], obs.payload_len[1])
            && smtp_command(obs.payload[0], obs.payload_len[0]))
}

pub static SMTP: ProtocolModule = ProtocolModule {
    protocol: Protocol::Smtp,
    category: Category::Mail,
    name: "SMTP",
    priority: 4,
    matches: is_smtp,
};

/* ----------------------------------------------------------------- SSH */

fn is_ssh(obs: &FlowObservation) -> bool {
    if match_str_either(obs, b"SSH-") {
        return true;
    }
    // QUIT is not SSH-specific, so require the well-known port.
    port_either(obs, 22) && match_str_either(obs, b"QUIT")
}

pub static SSH: ProtocolModule = ProtocolModule {
    protocol: Protocol::Ssh,
    category: Category::Remote,
    name: "SSH",
    priority: 5,
    matches: is_ssh,
};

/* ---------------------------------------------------------- POP3 / IMAP */

fn is_pop3(obs: &FlowObservation) -> bool {
    match_chars_either!(obs, b'+', b'O', b'K', ANY)
}

pub static POP3: ProtocolModule = ProtocolModule {
    protocol: Protocol::Pop3,
    category: Category::Mail,
    name: "POP3",
    priority: 6,
    matches: is_pop3,
};

fn is_imap(obs: &FlowObservation) -> bool {
    match_str_either(obs, b"* OK")
}

pub static IMAP: ProtocolModule = ProtocolModule {
    protocol: Protocol::Imap,
    category: Category::Mail,
    name: "IMAP",
    priority: 7,
    matches: is_imap,
};

/* ----------------------------------------------------------- BitTorrent */

fn bittorrent_header(word: [u8; 4], len: u32) -> bool {
    if len == 0 {
        return true;
    }
    if match_bytes!(word, 0x13, b'B', b'i', b't') {
        return true;
    }
    // Handshake delivered in pieces.
    if len == 3 && match_bytes!(word, 0x13, b'B', b'i', 0x00) {
        return true;
    }
    if len == 2 && match_bytes!(word, 0x13, b'B', 0x00, 0x00) {
        return true;
    }
    if len == 1 && match_bytes!(word, 0x13, 0x00, 0x00, 0x00) {
        return true;
    }
    false
}

fn is_bittorrent(obs: &FlowObservation) -> bool {
    bittorrent_header(obs.payload[0], obs.payload_len[0])
        && bittorrent_header(obs.payload[1], obs.payload_len[1])
}

pub static BITTORRENT: ProtocolModule = ProtocolModule {
    protocol: Protocol::Bittorrent,
    category: Category::P2p,
    name: "BitTorrent",
    priority: 8,
    matches: is_bittorrent,
};

fn is_bitextend(obs: &FlowObservation) -> bool {
    if match_str_both(obs, b"\x00\x00\x00\x0d", b"\x00\x00\x00\x01") {
        return true;
    }
    if match_str_both(obs, b"\x00\x00\x00\x03", b"\x00\x00\x00\x38") {
        return true;
    }
    if match_str_both(obs, b"\x00\x00\x00\x03", b"\x00\x00\x00\x39") {
        return true;
    }
    if match_str_both(obs, b"\x00\x00\x00\x03", b"\x00\x00\x00\x03") {
        return true;
    }
    if match_str_both(obs, b"\x00\x00\x00\x4e", b"\x00\x00\x00\xb2") {
        return true;
    }
    if match_chars_either!(obs, 0x00, 0x00, 0x40, 0x09) {
        return true;
    }
    if (match_bytes!(obs.payload[0], 0x00, 0x00, 0x01, ANY)
        && match_bytes!(obs.payload[1], 0x00, 0x00, 0x00, 0x38))
        || (match_bytes!(obs.payload[1], 0x00, 0x00, 0x01, ANY)
            && match_bytes!(obs.payload[0], 0x00, 0x00, 0x00, 0x38))
    {
        return true;
    }
    if (match_bytes!(obs.payload[0], 0x00, 0x00, 0x00, ANY)
        && match_bytes!(obs.payload[1], 0x00, 0x00, 0x00, 0x05))
        || (match_bytes!(obs.payload[1], 0x00, 0x00, 0x00, ANY)
            && match_bytes!(obs.payload[0], 0x00, 0x00, 0x00, 0x05))
    {
        return true;
    }
    (match_bytes!(obs.payload[0], 0x01, 0x00, ANY, 0x68)
        && match_bytes!(obs.payload[1], 0x00, 0x00, 0x00, 0x05))
        || (match_bytes!(obs.payload[1], 0x01, 0x00, ANY, 0x68)
            && match_bytes!(obs.payload[0], 0x00, 0x00, 0x00, 0x05))
}

pub static BITEXTEND: ProtocolModule = ProtocolModule {
    protocol: Protocol::BittorrentExtension,
    category: Category::P2p,
    name: "BitTorrent_Extension",
    priority: 45,
    matches: is_bitextend,
};

/* --------------------------------------------------------- small texts */

fn is_rsync(obs: &FlowObservation) -> bool {
    match_str_either(obs, b"@RSY")
}

pub static RSYNC: ProtocolModule = ProtocolModule {
    protocol: Protocol::Rsync,
    category: Category::Files,
    name: "Rsync",
    priority: 9,
    matches: is_rsync,
};

fn is_nntp(obs: &FlowObservation) -> bool {
    for greet in [b"mode", b"MODE", b"GROU", b"grou"] {
        if match_str_either(obs, greet) {
            return true;
        }
    }
    for auth in [b"AUTH", b"auth"] {
        for code in [b"200 ", b"200-", b"201 ", b"201-"] {
            if match_str_both(obs, auth, code) {
                return true;
            }
        }
    }
    false
}

pub static NNTP: ProtocolModule = ProtocolModule {
    protocol: Protocol::Nntp,
    category: Category::News,
    name: "NNTP",
    priority: 10,
    matches: is_nntp,
};

fn is_irc(obs: &FlowObservation) -> bool {
    match_str_either(obs, b"PASS") || match_str_either(obs, b"NICK")
}

pub static IRC: ProtocolModule = ProtocolModule {
    protocol: Protocol::Irc,
    category: Category::Chat,
    name: "IRC",
    priority: 11,
    matches: is_irc,
};

fn is_rfb(obs: &FlowObservation) -> bool {
    match_str_either(obs, b"RFB ")
}

pub static RFB: ProtocolModule = ProtocolModule {
    protocol: Protocol::Rfb,
    category: Category::Remote,
    name: "RFB",
    priority: 12,
    matches: is_rfb,
};

fn is_shoutcast(obs: &FlowObservation) -> bool {
    match_str_either(obs, b"ICY ") || match_chars_either!(obs, b'O', b'K', b'2', 0x0d)
}

pub static SHOUTCAST: ProtocolModule = ProtocolModule {
    protocol: Protocol::Shoutcast,
    category: Category::Streaming,
    name: "Shoutcast",
    priority: 13,
    matches: is_shoutcast,
};

fn is_gnutella(obs: &FlowObservation) -> bool {
    match_str_either(obs, b"GNUT")
}

pub static GNUTELLA: ProtocolModule = ProtocolModule {
    protocol: Protocol::Gnutella,
    category: Category::P2p,
    name: "Gnutella",
    priority: 14,
    matches: is_gnutella,
};

fn svn_greeting(word: [u8; 4], _len: u32) -> bool {
    match_str(word, b"( su")
}

fn svn_response(word: [u8; 4], len: u32) -> bool {
    empty_or(len, match_str(word, b"( 2 "))
}

fn is_svn(obs: &FlowObservation) -> bool {
    (svn_greeting(obs.payload[0], obs.payload_len[0])
        && svn_response(obs.payload[1], obs.payload_len[1]))
        || (svn_greeting(obs.payload[1], obs.payload_len[1])
            && svn_response(obs.payload[0], obs.payload_len[0]))
}

pub static SVN: ProtocolModule = ProtocolModule {
    protocol: Protocol::Svn,
    category: Category::Rcs,
    name: "SVN",
    priority: 15,
    matches: is_svn,
};

/* -------------------------------------------------------------- Telnet */

fn telnet_negotiation(word: [u8; 4], len: u32) -> bool {
    // Two IAC bytes (0xff) bracket the option; cannot express 0xff via a
    // wildcard pattern, so compare directly.
    let framed = if len >= 4 {
        word[0] == 0xff && word[3] == 0xff
    } else if len == 3 {
        word[0] == 0xff
    } else {
        false
    };
    framed && (0xfb..=0xfe).contains(&word[1])
}

fn is_telnet(obs: &FlowObservation) -> bool {
    telnet_negotiation(obs.payload[0], obs.payload_len[0])
        || telnet_negotiation(obs.payload[1], obs.payload_len[1])
}

pub static TELNET: ProtocolModule = ProtocolModule {
    protocol: Protocol::Telnet,
    category: Category::Remote,
    name: "Telnet",
    priority: 16,
    matches: is_telnet,
};

/* --------------------------------------------------------- SMB/NetBIOS */

fn length_prefixed(word: [u8; 4], len: u32) -> bool {
    u32::from_be_bytes(word) == len.wrapping_sub(4)
}

fn smb_payload(word: [u8; 4], len: u32) -> bool {
    if len == 0 {
        return true;
    }
    // NetBIOS session header treated as a 4-byte length field.
    if length_prefixed(word, len) {
        return true;
    }
    // Header sent separately, or skipped entirely.
    if match_bytes!(word, 0x00, 0x00, 0x00, 0x85) {
        return true;
    }
    match_bytes!(word, 0xff, b'S', b'M', b'B')
}

fn is_smb(obs: &FlowObservation) -> bool {
    if !port_either(obs, 445) {
        return false;
    }
    smb_payload(obs.payload[0], obs.payload_len[0])
        && smb_payload(obs.payload[1], obs.payload_len[1])
}

pub static SMB: ProtocolModule = ProtocolModule {
    protocol: Protocol::Smb,
    category: Category::Files,
    name: "SMB",
    priority: 17,
    matches: is_smb,
};

fn netbios_session(word: [u8; 4], len: u32) -> bool {
    match_bytes!(word, 0x81, 0x00, ANY, ANY)
        && (u32::from_be_bytes(word) & 0xffff) == len.wrapping_sub(4)
}

fn is_netbios(obs: &FlowObservation) -> bool {
    netbios_session(obs.payload[0], obs.payload_len[0])
        || netbios_session(obs.payload[1], obs.payload_len[1])
}

pub static NETBIOS: ProtocolModule = ProtocolModule {
    protocol: Protocol::NetbiosSession,
    category: Category::Services,
    name: "Netbios",
    priority: 18,
    matches: is_netbios,
};

/* ------------------------------------------------------------- SSL/TLS */

fn ssl3_handshake(word: [u8; 4], len: u32) -> bool {
    if len == 0 {
        return true;
    }
    if len == 1 && match_bytes!(word, 0x16, 0x00, 0x00, 0x00) {
        return true;
    }
    match_bytes!(word, 0x16, 0x03, 0x00, ANY)
}

fn tls_handshake(word: [u8; 4], len: u32) -> bool {
    if len == 0 {
        return true;
    }
    if len == 1 && match_bytes!(word, 0x16, 0x00, 0x00, 0x00) {
        return true;
    }
    match_bytes!(word, 0x16, 0x03, 0x01, ANY)
}

fn tls_alert(word: [u8; 4]) -> bool {
    match_bytes!(word, 0x15, 0x03, 0x01, ANY)
}

fn tls_change_cipher(word: [u8; 4]) -> bool {
    match_bytes!(word, 0x14, 0x03, 0x01, ANY)
}

fn tls_app_data(word: [u8; 4]) -> bool {
    match_bytes!(word, 0x17, 0x03, 0x01, ANY)
}

fn is_ssl(obs: &FlowObservation) -> bool {
    let (w0, l0) = (obs.payload[0], obs.payload_len[0]);
    let (w1, l1) = (obs.payload[1], obs.payload_len[1]);

    let hs0 = ssl3_handshake(w0, l0) || tls_handshake(w0, l0);
    let hs1 = ssl3_handshake(w1, l1) || tls_handshake(w1, l1);
    if hs0 && hs1 {
        return true;
    }

    // Resumed sessions may jump straight to data, alerts or cipher
    // changes on one side.
    if tls_handshake(w0, l0) && (tls_app_data(w1) || tls_alert(w1) || tls_change_cipher(w1)) {
        return true;
    }
    tls_handshake(w1, l1) && (tls_app_data(w0) || tls_alert(w0) || tls_change_cipher(w0))
}

fn is_https(obs: &FlowObservation) -> bool {
    port_either(obs, 443) && is_ssl(obs)
}

// Checked just before the generic SSL module so port 443 wins.
pub static HTTPS: ProtocolModule = ProtocolModule {
    protocol: Protocol::Https,
    category: Category::Web,
    name: "HTTPS",
    priority: 19,
    matches: is_https,
};

pub static SSL: ProtocolModule = ProtocolModule {
    protocol: Protocol::Ssl,
    category: Category::Encryption,
    name: "SSL/TLS",
    priority: 20,
    matches: is_ssl,
};

/* ----------------------------------------------------------------- RDP */

fn is_rdp(obs: &FlowObservation) -> bool {
    // TPKT framing: 03 00 plus a 16-bit length that covers the header.
    if !match_bytes!(obs.payload[0], 0x03, 0x00, ANY, ANY)
        && !match_bytes!(obs.payload[1], 0x03, 0x00, ANY, ANY)
    {
        return false;
    }
    (u32::from_be_bytes(obs.payload[0]) & 0xffff) == obs.payload_len[0]
        && (u32::from_be_bytes(obs.payload[1]) & 0xffff) == obs.payload_len[1]
}

pub static RDP: ProtocolModule = ProtocolModule {
    protocol: Protocol::Rdp,
    category: Category::Remote,
    name: "RDP",
    priority: 21,
    matches: is_rdp,
};

/* -------------------------------------------------------------- gaming */

fn is_steam(obs: &FlowObservation) -> bool {
    if !match_str_either(obs, b"\x01\x00\x00\x00") {
        return false;
    }
    if !match_chars_either!(obs, 0x00, 0x00, 0x00, ANY) {
        return false;
    }
    (obs.payload_len[0] == 4 && obs.payload_len[1] == 1)
        || (obs.payload_len[1] == 4 && obs.payload_len[0] == 1)
}

pub static STEAM: ProtocolModule = ProtocolModule {
    protocol: Protocol::Steam,
    category: Category::Gaming,
    name: "Steam",
    priority: 22,
    matches: is_steam,
};

fn wow_request(word: [u8; 4], len: u32) -> bool {
    if !match_bytes!(word, 0x00, 0x08, ANY, 0x00) {
        return false;
    }
    // Bytes 2-3 hold the message size, excluding the 4-byte header.
    u16::from_le_bytes([word[2], word[3]]) as u32 == len.wrapping_sub(4)
}

fn wow_response(word: [u8; 4], len: u32) -> bool {
    if len == 0 {
        return true;
    }
    len == 119 && match_bytes!(word, 0x00, 0x00, 0x00, ANY)
}

fn is_wow(obs: &FlowObservation) -> bool {
    (wow_request(obs.payload[0], obs.payload_len[0])
        && wow_response(obs.payload[1], obs.payload_len[1]))
        || (wow_request(obs.payload[1], obs.payload_len[1])
            && wow_response(obs.payload[0], obs.payload_len[0]))
}

pub static WOW: ProtocolModule = ProtocolModule {
    protocol: Protocol::WorldOfWarcraft,
    category: Category::Gaming,
    name: "WorldOfWarcraft",
    priority: 23,
    matches: is_wow,
};

fn is_blizzard(obs: &FlowObservation) -> bool {
    if match_str_both(obs, b"\x10\xdf\x22\x00", b"\x10\x00\x00\x00") {
        return true;
    }
    (match_bytes!(obs.payload[0], 0x00, ANY, 0xed, 0x01)
        && match_bytes!(obs.payload[1], 0x00, 0x06, 0xec, 0x01))
        || (match_bytes!(obs.payload[1], 0x00, ANY, 0xed, 0x01)
            && match_bytes!(obs.payload[0], 0x00, 0x06, 0xec, 0x01))
}

pub static BLIZZARD: ProtocolModule = ProtocolModule {
    protocol: Protocol::Blizzard,
    category: Category::Gaming,
    name: "Blizzard",
    priority: 24,
    matches: is_blizzard,
};

fn is_cod_waw(obs: &FlowObservation) -> bool {
    // Both directions are exactly four zero bytes on the CoD port.
    port_either(obs, 3074)
        && obs.payload_len[0] == 4
        && obs.payload_len[1] == 4
        && obs.payload[0] == [0; 4]
        && obs.payload[1] == [0; 4]
}

pub static COD_WAW: ProtocolModule = ProtocolModule {
    protocol: Protocol::CallOfDuty,
    category: Category::Gaming,
    name: "Call_of_Duty",
    priority: 25,
    matches: is_cod_waw,
};

fn is_conquer(obs: &FlowObservation) -> bool {
    if obs.payload_len[0] == 5
        && obs.payload_len[1] == 4
        && match_str(obs.payload[0], b"READ")
    {
        return true;
    }
    if obs.payload_len[1] == 5
        && obs.payload_len[0] == 4
        && match_str(obs.payload[1], b"READ")
    {
        return true;
    }
    if obs.payload_len[0] == 4
        && (match_bytes!(obs.payload[0], b'5', b'0', ANY, ANY)
            || match_bytes!(obs.payload[0], b'5', b'1', ANY, ANY))
        && match_str(obs.payload[1], b"UPDA")
    {
        return true;
    }
    obs.payload_len[1] == 4
        && (match_bytes!(obs.payload[1], b'5', b'0', ANY, ANY)
            || match_bytes!(obs.payload[1], b'5', b'1', ANY, ANY))
        && match_str(obs.payload[0], b"UPDA")
}

pub static CONQUER: ProtocolModule = ProtocolModule {
    protocol: Protocol::ConquerOnline,
    category: Category::Gaming,
    name: "ConquerOnline",
    priority: 26,
    matches: is_conquer,
};

/* ----------------------------------------------------------- databases */

fn is_mysql(obs: &FlowObservation) -> bool {
    if obs.payload_len[0] == 0 && obs.payload_len[1] == 0 {
        return false;
    }

    // Packets start with a 3-byte little-endian length and a sequence id.
    let stated0 = u32::from_le_bytes(obs.payload[0]) & 0xffffff;
    if obs.payload_len[0] > 0 && stated0 != obs.payload_len[0].wrapping_sub(4) {
        return false;
    }
    let stated1 = u32::from_le_bytes(obs.payload[1]) & 0xffffff;
    if obs.payload_len[1] > 0 && stated1 != obs.payload_len[1].wrapping_sub(4) {
        return false;
    }

    // Greeting carries sequence 0, the client reply sequence 1.
    let seq0 = obs.payload[0][3];
    let seq1 = obs.payload[1][3];
    if (seq0 == 0x00 && seq1 == 0x01) || (seq1 == 0x00 && seq0 == 0x01) {
        return true;
    }

    if !port_either(obs, 3306) {
        return false;
    }
    (seq0 == 0x00 && obs.payload_len[1] == 0) || (seq1 == 0x00 && obs.payload_len[0] == 0)
}

pub static MYSQL: ProtocolModule = ProtocolModule {
    protocol: Protocol::Mysql,
    category: Category::Databases,
    name: "MySQL",
    priority: 27,
    matches: is_mysql,
};

fn tds_request(word: [u8; 4], len: u32) -> bool {
    if (u32::from_be_bytes(word) & 0xffff) != len {
        return false;
    }
    match_bytes!(word, 0x12, 0x01, ANY, ANY) || match_bytes!(word, 0x10, 0x01, ANY, ANY)
}

fn tds_response(word: [u8; 4], len: u32) -> bool {
    if len == 0 {
        return true;
    }
    match_bytes!(word, 0x04, 0x01, ANY, ANY) && (u32::from_be_bytes(word) & 0xffff) == len
}

fn is_tds(obs: &FlowObservation) -> bool {
    (tds_request(obs.payload[0], obs.payload_len[0])
        && tds_response(obs.payload[1], obs.payload_len[1]))
        || (tds_request(obs.payload[1], obs.payload_len[1])
            && tds_response(obs.payload[0], obs.payload_len[0]))
}

pub static TDS: ProtocolModule = ProtocolModule {
    protocol: Protocol::Tds,
    category: Category::Databases,
    name: "TDS",
    priority: 28,
    matches: is_tds,
};

fn is_postgresql(obs: &FlowObservation) -> bool {
    // Startup messages begin with a 4-byte length; auth requests with 'R'.
    if u32::from_be_bytes(obs.payload[0]) == obs.payload_len[0]
        && match_bytes!(obs.payload[1], 0x52, 0x00, 0x00, 0x00)
    {
        return true;
    }
    u32::from_be_bytes(obs.payload[1]) == obs.payload_len[1]
        && match_bytes!(obs.payload[0], 0x52, 0x00, 0x00, 0x00)
}

pub static POSTGRESQL: ProtocolModule = ProtocolModule {
    protocol: Protocol::Postgresql,
    category: Category::Databases,
    name: "Postgresql",
    priority: 29,
    matches: is_postgresql,
};

/* --------------------------------------------------------------- SOCKS */

fn socks5_request(word: [u8; 4], len: u32) -> bool {
    // Client offering exactly the "no auth" method.
    match_bytes!(word, 0x05, 0x01, 0x00, 0x00) && len == 3
}

fn socks5_response(word: [u8; 4], len: u32) -> bool {
    if len == 0 {
        return true;
    }
    match_bytes!(word, 0x05, 0x00, 0x00, 0x00) && len == 2
}

fn is_socks5(obs: &FlowObservation) -> bool {
    (socks5_request(obs.payload[0], obs.payload_len[0])
        && socks5_response(obs.payload[1], obs.payload_len[1]))
        || (socks5_request(obs.payload[1], obs.payload_len[1])
            && socks5_response(obs.payload[0], obs.payload_len[0]))
}

pub static SOCKS5: ProtocolModule = ProtocolModule {
    protocol: Protocol::Socks5,
    category: Category::Tunnelling,
    name: "SOCKS5",
    priority: 30,
    matches: is_socks5,
};

fn socks4_request(word: [u8; 4], len: u32) -> bool {
    // Connect request to port 80; octets 3-4 are the destination port.
    match_bytes!(word, 0x04, 0x01, 0x00, 0x50) && len == 9
}

fn is_socks4(obs: &FlowObservation) -> bool {
    (socks4_request(obs.payload[0], obs.payload_len[0]) && obs.payload_len[1] == 0)
        || (socks4_request(obs.payload[1], obs.payload_len[1]) && obs.payload_len[0] == 0)
}

pub static SOCKS4: ProtocolModule = ProtocolModule {
    protocol: Protocol::Socks4,
    category: Category::Tunnelling,
    name: "SOCKS4",
    priority: 31,
    matches: is_socks4,
};

/* ----------------------------------------------------------- streaming */

fn is_rtmp(obs: &FlowObservation) -> bool {
    if obs.payload_len[0] < 4 && obs.payload_len[1] < 4 {
        return false;
    }
    match_bytes!(obs.payload[0], 0x03, ANY, ANY, ANY)
        && match_bytes!(obs.payload[1], 0x03, ANY, ANY, ANY)
}

pub static RTMP: ProtocolModule = ProtocolModule {
    protocol: Protocol::Rtmp,
    category: Category::Streaming,
    name: "RTMP",
    priority: 32,
    matches: is_rtmp,
};

fn is_rtsp(obs: &FlowObservation) -> bool {
    match_str_either(obs, b"RTSP")
}

pub static RTSP: ProtocolModule = ProtocolModule {
    protocol: Protocol::Rtsp,
    category: Category::Streaming,
    name: "RTSP",
    priority: 33,
    matches: is_rtsp,
};

fn is_sip(obs: &FlowObservation) -> bool {
    if match_str_both(obs, b"SIP/", b"REGI") {
        return true;
    }
    match_str_either(obs, b"SIP-") && match_chars_either!(obs, b'R', b' ', ANY, ANY)
}

pub static SIP: ProtocolModule = ProtocolModule {
    protocol: Protocol::Sip,
    category: Category::Voip,
    name: "SIP",
    priority: 34,
    matches: is_sip,
};

/* ------------------------------------------------------------ P2P misc */

fn is_mp2p(obs: &FlowObservation) -> bool {
    if match_str_both(obs, b"STR ", b"SIZ ") {
        return true;
    }
    if match_str(obs.payload[0], b"STR ")
        && (obs.payload_len[0] == 10 || obs.payload_len[0] == 11)
    {
        return true;
    }
    match_str(obs.payload[1], b"STR ") && (obs.payload_len[1] == 10 || obs.payload_len[1] == 11)
}

pub static MP2P: ProtocolModule = ProtocolModule {
    protocol: Protocol::Mp2p,
    category: Category::P2p,
    name: "MP2P",
    priority: 35,
    matches: is_mp2p,
};

fn is_winmx(obs: &FlowObservation) -> bool {
    let one_byte_side = obs.payload_len[0] == 1 || obs.payload_len[1] == 1;
    if !one_byte_side {
        return false;
    }
    match_str_either(obs, b"SEND") || match_chars_either!(obs, b'G', b'E', b'T', ANY)
}

pub static WINMX: ProtocolModule = ProtocolModule {
    protocol: Protocol::WinMx,
    category: Category::P2p,
    name: "WinMX",
    priority: 36,
    matches: is_winmx,
};

fn is_clubbox(obs: &FlowObservation) -> bool {
    if !match_str_both(obs, b"\x00\x00\x01\x03", b"\x00\x00\x01\x03") {
        return false;
    }
    (obs.payload_len[0] == 36 && obs.payload_len[1] == 28)
        || (obs.payload_len[1] == 36 && obs.payload_len[0] == 28)
}

pub static CLUBBOX: ProtocolModule = ProtocolModule {
    protocol: Protocol::Clubbox,
    category: Category::P2p,
    name: "Clubbox",
    priority: 37,
    matches: is_clubbox,
};

fn is_pdbox(obs: &FlowObservation) -> bool {
    match_str_both(obs, b"0127", b"0326")
}

pub static PDBOX: ProtocolModule = ProtocolModule {
    protocol: Protocol::Pdbox,
    category: Category::P2p,
    name: "Pdbox",
    priority: 38,
    matches: is_pdbox,
};

fn imesh_payload(word: [u8; 4], len: u32) -> bool {
    if len == 0 {
        return true;
    }
    if len == 2 && match_bytes!(word, 0x06, 0x00, 0x00, 0x00) {
        return true;
    }
    if len == 10 && match_bytes!(word, 0x06, 0x00, 0x04, 0x00) {
        return true;
    }
    len == 12 && match_bytes!(word, 0x06, 0x00, 0x06, 0x00)
}

fn is_imesh(obs: &FlowObservation) -> bool {
    imesh_payload(obs.payload[0], obs.payload_len[0])
        && imesh_payload(obs.payload[1], obs.payload_len[1])
}

pub static IMESH: ProtocolModule = ProtocolModule {
    protocol: Protocol::Imesh,
    category: Category::P2p,
    name: "iMesh",
    priority: 39,
    matches: is_imesh,
};

fn is_message4u(obs: &FlowObservation) -> bool {
    match_str_either(obs, b"m4ul")
}

pub static MESSAGE4U: ProtocolModule = ProtocolModule {
    protocol: Protocol::Message4U,
    category: Category::Chat,
    name: "Message4U",
    priority: 40,
    matches: is_message4u,
};

fn is_mitglieder(obs: &FlowObservation) -> bool {
    match_chars_either!(obs, 0x04, 0x01, 0x00, 0x19)
}

pub static MITGLIEDER: ProtocolModule = ProtocolModule {
    protocol: Protocol::Mitglieder,
    category: Category::Malware,
    name: "Mitglieder_Trojan",
    priority: 41,
    matches: is_mitglieder,
};

fn is_xml(obs: &FlowObservation) -> bool {
    match_str_either(obs, b"<?xm") || match_str_either(obs, b"<iq ")
}

pub static XML: ProtocolModule = ProtocolModule {
    protocol: Protocol::Xml,
    category: Category::Services,
    name: "XML",
    priority: 42,
    matches: is_xml,
};

fn is_rbl(obs: &FlowObservation) -> bool {
    match_str_either(obs, b"rbls")
}

pub static RBL: ProtocolModule = ProtocolModule {
    protocol: Protocol::Rbl,
    category: Category::Antispam,
    name: "RBL",
    priority: 43,
    matches: is_rbl,
};

fn is_tor(obs: &FlowObservation) -> bool {
    match_chars_either!(obs, 0x3d, 0x00, 0x00, 0x00)
        && (obs.payload_len[0] == 4 || obs.payload_len[1] == 4)
}

pub static TOR: ProtocolModule = ProtocolModule {
    protocol: Protocol::Tor,
    category: Category::Encryption,
    name: "TOR",
    priority: 44,
    matches: is_tor,
};

fn is_emule(obs: &FlowObservation) -> bool {
    if obs.payload_len[0] < 4 && obs.payload_len[1] < 4 {
        return false;
    }
    let e3_0 = match_bytes!(obs.payload[0], 0xe3, ANY, 0x00, 0x00);
    let e3_1 = match_bytes!(obs.payload[1], 0xe3, ANY, 0x00, 0x00);
    let c5_0 = match_bytes!(obs.payload[0], 0xc5, ANY, 0x00, 0x00);
    let c5_1 = match_bytes!(obs.payload[1], 0xc5, ANY, 0x00, 0x00);

    if e3_0 && e3_1 {
        return true;
    }
    if (e3_0 && c5_1) || (c5_0 && e3_1) {
        return true;
    }
    (e3_0 && obs.payload_len[1] == 0) || (e3_1 && obs.payload_len[0] == 0)
}

pub static EMULE: ProtocolModule = ProtocolModule {
    protocol: Protocol::Emule,
    category: Category::P2p,
    name: "eMule",
    priority: 46,
    matches: is_emule,
};

/* ------------------------------------------------------------- TCP DNS */

fn dns_tcp_message(word: [u8; 4], len: u32) -> bool {
    // TCP DNS prepends a 16-bit length to the wire message.
    empty_or(
        len,
        u16::from_be_bytes([word[0], word[1]]) as u32 == len.wrapping_sub(2),
    )
}

fn is_dns_tcp(obs: &FlowObservation) -> bool {
    if !port_either(obs, 53) {
        return false;
    }
    if obs.is_empty() {
        return false;
    }
    dns_tcp_message(obs.payload[0], obs.payload_len[0])
        && dns_tcp_message(obs.payload[1], obs.payload_len[1])
}

pub static DNS_TCP: ProtocolModule = ProtocolModule {
    protocol: Protocol::Dns,
    category: Category::Services,
    name: "DNS",
    priority: 47,
    matches: is_dns_tcp,
};

/* ----------------------------------------------------------------- FTP */

fn ftp_reply_code(word: [u8; 4], len: u32) -> bool {
    if len == 0 {
        return true;
    }
    match_str(word, b"220 ") || match_str(word, b"220-")
}

fn ftp_command(word: [u8; 4], len: u32) -> bool {
    if len == 0 {
        return true;
    }
    for cmd in [b"USER", b"QUIT", b"FEAT", b"HELP", b"user", b"HOST"] {
        if match_str(word, cmd) {
            return true;
        }
    }
    false
}

fn is_ftp_control(obs: &FlowObservation) -> bool {
    // Port 25 banners belong to SMTP even when they look like FTP.
    if port_either(obs, 25) {
        return false;
    }
    (ftp_reply_code(obs.payload[0], obs.payload_len[0])
        && ftp_command(obs.payload[1], obs.payload_len[1]))
        || (ftp_reply_code(obs.payload[1], obs.payload_len[1])
            && ftp_command(obs.payload[0], obs.payload_len[0]))
}

pub static FTP_CONTROL: ProtocolModule = ProtocolModule {
    protocol: Protocol::FtpControl,
    category: Category::Files,
    name: "FTP_Control",
    priority: 48,
    matches: is_ftp_control,
};

fn unix_permissions(word: [u8; 4]) -> bool {
    (word[0] == b'-' || word[0] == b'd')
        && (word[1] == b'-' || word[1] == b'r')
        && (word[2] == b'-' || word[2] == b'w')
        && (word[3] == b'-' || word[3] == b'x')
}

fn is_ftp_data(obs: &FlowObservation) -> bool {
    // Data channels are one-way exchanges.
    if obs.payload_len[0] > 0 && obs.payload_len[1] > 0 {
        return false;
    }
    // Directory listings start with a permissions string.
    if unix_permissions(obs.payload[0]) || unix_permissions(obs.payload[1]) {
        return true;
    }
    // No usable header otherwise; fall back to the well-known port.
    obs.client_port == 20 || obs.server_port == 20
}

// Port-based and deliberately last among the TCP signatures.
pub static FTP_DATA: ProtocolModule = ProtocolModule {
    protocol: Protocol::FtpData,
    category: Category::Files,
    name: "FTP_Data",
    priority: 200,
    matches: is_ftp_data,
};

/* -------------------------------------------------------------- WeChat */

fn wechat_first(word: [u8; 4], len: u32) -> bool {
    // The initial request is always 16 length-prefixed bytes.
    len == 16 && match_bytes!(word, 0x00, 0x00, 0x00, 0x10)
}

fn wechat_second(word: [u8; 4], len: u32) -> bool {
    if len == 0 {
        return true;
    }
    if len == 16 && match_bytes!(word, 0x00, 0x00, 0x00, 0x10) {
        return true;
    }
    len == 18 && match_bytes!(word, 0x00, 0x00, 0x00, 0x12)
}

fn is_wechat(obs: &FlowObservation) -> bool {
    // The length-field signature is not unique to WeChat, so restrict
    // matches to the ports it is known to use.
    if !port_either(obs, 80) && !port_either(obs, 443) && !port_either(obs, 8080) {
        return false;
    }
    (wechat_first(obs.payload[0], obs.payload_len[0])
        && wechat_second(obs.payload[1], obs.payload_len[1]))
        || (wechat_first(obs.payload[1], obs.payload_len[1])
            && wechat_second(obs.payload[0], obs.payload_len[0]))
}

pub static WECHAT: ProtocolModule = ProtocolModule {
    protocol: Protocol::WeChat,
    category: Category::Chat,
    name: "WeChat",
    priority: 10,
    matches: is_wechat,
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
    fn test_http_get_response() {
        let o = obs(b"GET / HTTP/1.1", b"HTTP/1.1 200 OK");
        assert!(is_http(&o));
    }

    #[test]
    fn test_http_partial_get() {
        let o = obs(b"GE", b"");
        assert!(is_http(&o));
        let o = obs(b"GEX", b"");
        assert!(!is_http(&o));
    }

    #[test]
    fn test_http_svn_report_method() {
        let o = obs(b"REPORT /svn/repo HTTP/1.1", b"HTTP/1.1 200 OK");
        assert!(is_http(&o));
    }

    #[test]
    fn test_http_mismatched_response() {
        let o = obs(b"GET /", b"RTSP/1.0 200 OK");
        assert!(!is_http(&o));
    }

    #[test]
    fn test_smtp_banner_and_command() {
        let mut o = obs(b"EHLO example.com", b"220 mail.example.com ESMTP");
        o.server_port = 25;
        assert!(is_smtp(&o));
    }

    #[test]
    fn test_smtp_one_sided_error() {
        let o = obs(b"554 rejected", b"");
        assert!(is_smtp(&o));
    }

    #[test]
    fn test_ssh_banner() {
        let o = obs(b"SSH-2.0-OpenSSH_8.9", b"SSH-2.0-OpenSSH_9.0");
        assert!(is_ssh(&o));
    }

    #[test]
    fn test_bittorrent_handshake_full_and_partial() {
        let o = obs(b"\x13BitTorrent protocol", b"\x13BitTorrent protocol");
        assert!(is_bittorrent(&o));
        // One direction only saw the first byte of the handshake.
        let o = obs(b"\x13BitTorrent protocol", b"\x13");
        assert!(is_bittorrent(&o));
        let o = obs(b"\x14BitTorrent protocol", b"");
        assert!(!is_bittorrent(&o));
    }

    #[test]
    fn test_https_requires_port_443() {
        let tls0 = b"\x16\x03\x01\x02\x00";
        let tls1 = b"\x16\x03\x01\x00\x55";
        let mut o = obs(tls0, tls1);
        o.server_port = 443;
        assert!(is_https(&o));
        assert!(is_ssl(&o));
        o.server_port = 8443;
        assert!(!is_https(&o));
        assert!(is_ssl(&o));
    }

    #[test]
    fn test_socks5_handshake_lengths() {
        let mut o = obs(b"\x05\x01\x00", b"\x05\x00");
        assert!(is_socks5(&o));
        // Request must be exactly three bytes.
        o = obs(b"\x05\x01\x00\x01", b"\x05\x00");
        assert!(!is_socks5(&o));
    }

    #[test]
    fn test_wechat_ports_and_lengths() {
        let first = [
            0x00, 0x00, 0x00, 0x10, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ];
        let second = [
            0x00, 0x00, 0x00, 0x12, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ];
        let mut o = obs(&first, &second);
        o.server_port = 443;
        assert!(is_wechat(&o));
        o.server_port = 9999;
        o.client_port = 9999;
        assert!(!is_wechat(&o));
    }

    #[test]
    fn test_ftp_data_one_way_listing() {
        let o = obs(b"drwxr-xr-x  2 ftp ftp", b"");
        assert!(is_ftp_data(&o));
        let mut o = obs(b"\x89PNG\r\n", b"");
        o.server_port = 20;
        assert!(is_ftp_data(&o));
        // Two-way traffic is never FTP data.
        let mut o = obs(b"drwx", b"drwx");
        o.server_port = 20;
        assert!(!is_ftp_data(&o));
    }

    #[test]
    fn test_rdp_tpkt_lengths() {
        let mut o = obs(&[0x03, 0x00, 0x00, 0x13], &[0x03, 0x00, 0x00, 0x0b]);
        o.payload_len = [0x13, 0x0b];
        assert!(is_rdp(&o));
        o.payload_len = [0x13, 0x0c];
        assert!(!is_rdp(&o));
    }

    #[test]
    fn test_telnet_negotiation() {
        let o = obs(&[0xff, 0xfd, 0x18, 0xff], b"");
        assert!(is_telnet(&o));
        let o = obs(&[0xff, 0xfa, 0x18, 0xff], b"");
        assert!(!is_telnet(&o));
    }

    #[test]
    fn test_mysql_greeting() {
        // 74-byte greeting: 3-byte LE length 70, sequence 0, then a
        // 40-byte client reply with sequence 1.
        let mut o = obs(&[0x46, 0x00, 0x00, 0x00], &[0x24, 0x00, 0x00, 0x01]);
        o.payload_len = [74, 40];
        assert!(is_mysql(&o));
        o.payload_len = [75, 40];
        assert!(!is_mysql(&o));
    }

    #[test]
    fn test_dns_tcp_zone_transfer() {
        let mut o = obs(&[0x00, 0x1e, 0xab, 0xcd], &[0x00, 0x40, 0xab, 0xcd]);
        o.payload_len = [0x20, 0x42];
        o.server_port = 53;
        assert!(is_dns_tcp(&o));
        o.server_port = 5353;
        o.client_port = 5353;
        assert!(!is_dns_tcp(&o));
    }
}
