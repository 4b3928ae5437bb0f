//! Lightweight flow classification from first-packet payload signatures.
//!
//! Identifies the application protocol of a bidirectional flow using only
//! the first four payload bytes sent in each direction, plus payload
//! lengths and port numbers. Callers feed decoded packets into a
//! [`FlowObservation`] and hand the finished observation to a [`Registry`]:
//!
//! ```
//! use flowsig::{Direction, FlowObservation, PacketView, Registry};
//!
//! # fn demo(first_packet: &[u8]) -> flowsig::Result<()> {
//! let registry = Registry::with_defaults()?;
//! let mut obs = FlowObservation::new();
//!
//! let pkt = PacketView::from_ethernet(first_packet)?;
//! obs.update(&pkt, Direction::ToServer);
//!
//! let module = registry.classify(&obs);
//! println!("{} ({})", module.name, module.category);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod error;
pub mod pattern;
pub mod protocols;

pub use core::{
    Direction, FlowObservation, IpProtocol, PacketView, TcpFlags, Transport, MAX_OBSERVED_BYTES,
};
pub use error::{ClassifyError, Result};
pub use protocols::{categorise, Category, Protocol, ProtocolModule, Registry, RegistryBuilder};
