//! Protocol and category identifiers
//!
//! The identifiers are deliberately dumb enums: all matching logic lives
//! in the signature modules, and the display names live on the module
//! records so that the two can never drift apart per protocol.

use serde::{Deserialize, Serialize};

/// Application layer protocol identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Protocol {
    // Sentinels
    NoPayload,
    #[default]
    Unknown,
    UnknownUdp,
    Unsupported,
    Icmp,

    // TCP
    Http,
    Https,
    Ssl,
    Smtp,
    Pop3,
    Imap,
    Ssh,
    FtpControl,
    FtpData,
    Bittorrent,
    BittorrentExtension,
    Dns,
    Smb,
    NetbiosSession,
    Rdp,
    Rfb,
    Irc,
    Telnet,
    Nntp,
    Rtmp,
    Rtsp,
    Sip,
    Socks4,
    Socks5,
    Mysql,
    Postgresql,
    Tds,
    Steam,
    WorldOfWarcraft,
    Blizzard,
    CallOfDuty,
    ConquerOnline,
    WeChat,
    Emule,
    Gnutella,
    Shoutcast,
    Rsync,
    Svn,
    Tor,
    WinMx,
    Mp2p,
    Message4U,
    Imesh,
    Mitglieder,
    Xml,
    Rbl,
    Clubbox,
    Pdbox,

    // UDP
    UdpDns,
    UdpDhcp,
    UdpNtp,
    UdpSnmp,
    UdpDtls,
    UdpBtDht,
    UdpStun,
    UdpTftp,
    UdpTeredo,
    UdpSsdp,
    UdpSlp,
    UdpQuake,
    UdpGamespy,
    UdpSteam,
    UdpEmule,
    UdpGnutella,
    UdpSip,
    UdpRtp,
    UdpIsakmp,
    UdpNetbios,
}

/// Traffic categories, one per protocol module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Web,
    Mail,
    Chat,
    P2p,
    /// Peer-to-peer overlay maintenance rather than payload transfer.
    P2pStructure,
    KeyExchange,
    Gaming,
    Encryption,
    News,
    Malware,
    Antispam,
    Voip,
    Tunnelling,
    Nat,
    Streaming,
    Services,
    Databases,
    Files,
    Remote,
    Rcs,
    Icmp,
    Unknown,
    Unsupported,
    NoPayload,
    /// Flow has never been classified at all.
    NoCategory,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::Web => "Web",
            Category::Mail => "Mail",
            Category::Chat => "Chat",
            Category::P2p => "P2P",
            Category::P2pStructure => "P2P_Structure",
            Category::KeyExchange => "Key_Exchange",
            Category::Gaming => "Gaming",
            Category::Encryption => "Encryption",
            Category::News => "News",
            Category::Malware => "Malware",
            Category::Antispam => "Antispam",
            Category::Voip => "VOIP",
            Category::Tunnelling => "Tunnelling",
            Category::Nat => "NAT",
            Category::Streaming => "Streaming",
            Category::Services => "Services",
            Category::Databases => "Databases",
            Category::Files => "Files",
            Category::Remote => "Remote_Access",
            Category::Rcs => "Revision_Control",
            Category::Icmp => "ICMP",
            Category::Unknown => "Unknown",
            Category::Unsupported => "Unsupported",
            Category::NoPayload => "No_Payload",
            Category::NoCategory => "Uncategorised",
        };
        write!(f, "{}", s)
    }
}
