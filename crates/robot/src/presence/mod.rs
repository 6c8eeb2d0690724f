//! Presence module — wire messages, the peer table, and the receive-side protocol.

pub mod handler;
pub mod message;
pub mod table;

pub use handler::{Presence, ReceiveOutcome};
pub use message::{DecodeError, Message, MAX_DATAGRAM, STOP_MARKER};
pub use table::{PeerEntry, PeerTable, TableChange};
