#![deny(
    unsafe_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]

//! Length-Prefixed Packet Parser
//!
//! This demo decodes a stream of packets, each a one-byte size followed by that
//! many data bytes, from input that arrives in arbitrary chunks.
//!
//! # Format
//!
//! ```text
//! [1] [42]               -> Packet { size: 1, data: [42] }
//! [3] [101] [102] [103]  -> Packet { size: 3, data: [101, 102, 103] }
//! [0]                    -> Packet { size: 0, data: [] }
//! ```
//!
//! Two parsers are provided: [`Packetizer`], an explicit state machine with a
//! strict end-of-stream check, and [`packet`], the same format written as a
//! linear procedure that silently drops a truncated tail.

use bytes::Bytes;
use chunkwise::{Emitter, ParseOutcome, ParseSession, Reader, SinkEvent, StreamError};
use core::fmt;
use thiserror::Error;

// ANCHOR: error_type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("stream ended inside a packet of {size} bytes")]
    Truncated { size: u8 },

    #[error("size byte {0:#04x} is reserved")]
    Reserved(u8),
}
// ANCHOR_END: error_type

/// Size byte that never starts a packet.
pub const RESERVED_SIZE: u8 = 0xff;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub size: u8,
    pub data: Bytes,
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "packet size={} data={:?}", self.size, &self.data[..])
    }
}

// ANCHOR: state_machine
/// Explicit state machine for one packet.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Packetizer {
    #[default]
    Header,
    Body {
        size: u8,
    },
}

impl ParseSession for Packetizer {
    type View = Bytes;
    type Output = Packet;
    type Error = PacketError;

    fn step(
        &mut self,
        input: Option<Bytes>,
        _out: &mut Emitter<'_, Packet>,
    ) -> ParseOutcome<Packet, PacketError> {
        match (*self, input) {
            (Packetizer::Header, None) => ParseOutcome::Suspended(1),
            (Packetizer::Header, Some(header)) => match header.first().copied() {
                Some(RESERVED_SIZE) => ParseOutcome::Failed(PacketError::Reserved(RESERVED_SIZE)),
                Some(size) => {
                    *self = Packetizer::Body { size };
                    ParseOutcome::Suspended(size as usize)
                }
                None => ParseOutcome::Suspended(1),
            },
            (Packetizer::Body { size }, Some(data)) => ParseOutcome::Completed(Packet { size, data }),
            (Packetizer::Body { size }, None) => ParseOutcome::Suspended(size as usize),
        }
    }

    fn abort(&mut self, _out: &mut Emitter<'_, Packet>) -> Result<Option<Packet>, PacketError> {
        match self {
            Packetizer::Header => Ok(None),
            Packetizer::Body { size } => Err(PacketError::Truncated { size: *size }),
        }
    }
}
// ANCHOR_END: state_machine

// ANCHOR: linear
/// The same format as a linear procedure.
pub async fn packet(io: Reader<Bytes, Packet>) -> Result<Packet, PacketError> {
    let size = match io.read(1).await.first().copied() {
        Some(RESERVED_SIZE) => return Err(PacketError::Reserved(RESERVED_SIZE)),
        Some(size) => size,
        None => 0,
    };
    let data = io.read(size as usize).await;
    Ok(Packet { size, data })
}
// ANCHOR_END: linear

/// Encode packets onto the wire.
pub fn encode<'a>(payloads: impl IntoIterator<Item = &'a [u8]>) -> Vec<u8> {
    let mut wire = Vec::new();
    for payload in payloads {
        let size = payload.len().min(RESERVED_SIZE as usize - 1);
        wire.push(size as u8);
        wire.extend_from_slice(&payload[..size]);
    }
    wire
}

/// One line per sink call, for logs and snapshots.
pub fn render(events: &[SinkEvent<Packet, PacketError>]) -> String {
    let mut out = String::new();
    for event in events {
        match event {
            SinkEvent::Enqueue(packet) => out.push_str(&packet.to_string()),
            SinkEvent::Error(error) => out.push_str(&render_error(error)),
            SinkEvent::Terminate => out.push_str("terminate"),
        }
        out.push('\n');
    }
    out
}

fn render_error(error: &StreamError<PacketError>) -> String {
    format!("error ({}): {error}", error.kind())
}
