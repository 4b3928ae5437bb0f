//! Core shared types for flow observation
//!
//! - `PacketView`: borrowed per-packet view fed into observation
//! - `FlowObservation`: fixed-size per-flow fingerprint record

pub mod observation;
pub mod packet;

pub use observation::{FlowObservation, MAX_OBSERVED_BYTES};
pub use packet::{Direction, IpProtocol, PacketView, TcpFlags, Transport};
