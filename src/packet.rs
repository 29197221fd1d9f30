//! Binary frame format of the [Source RCON protocol](https://developer.valvesoftware.com/wiki/Source_RCON_Protocol).
//!
//! Every frame is `size | id | type | body | \0\0` with little-endian `i32`
//! fields, where `size` counts everything after itself.
use std::borrow::Cow;

use crate::error::ProtocolError;

/// Largest frame we are willing to send, header included.
pub const MAX_PACKET_SIZE: usize = 4096;

/// `size`, `id` and `type`, three little-endian `i32`s.
pub const HEADER_SIZE: usize = 12;

/// Squad servers end a multi-packet response with these bytes where the next
/// header would be.
pub const END_OF_MULTIPACKET_MARKER: [u8; 7] = [0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    // SERVERDATA_AUTH
    Auth,
    // SERVERDATA_EXECCOMMAND
    Exec,
    // SERVERDATA_AUTH_RESPONSE
    AuthResponse,
    // SERVERDATA_RESPONSE_VALUE
    Response,
    // Squad chat notifications, pushed by the server at any time
    ChatStream,
    /// Produced locally when [END_OF_MULTIPACKET_MARKER] is read, never sent
    /// by a server as a real type tag.
    EndOfMultipacket,
    /// Any tag a server sent that we don't know about.
    Unknown(i32),
}

impl PacketType {
    pub const fn value(self) -> i32 {
        match self {
            PacketType::Auth => 3,
            PacketType::Exec => 2,
            PacketType::AuthResponse => 2,
            PacketType::ChatStream => 1,
            PacketType::Response => 0,
            PacketType::EndOfMultipacket => 77,
            PacketType::Unknown(value) => value,
        }
    }

    /// Interpret a type tag sent by the server. A `2` coming from the server
    /// is always an auth response, since we are the only ones sending `Exec`.
    pub const fn from_server(value: i32) -> Self {
        match value {
            3 => PacketType::Auth,
            2 => PacketType::AuthResponse,
            1 => PacketType::ChatStream,
            0 => PacketType::Response,
            other => PacketType::Unknown(other),
        }
    }

    pub fn to_le_bytes(self) -> [u8; 4] {
        self.value().to_le_bytes()
    }
}

/// The three fixed fields at the start of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub size: i32,
    pub id: i32,
    pub packet_type: i32,
}

impl Header {
    pub fn parse(bytes: &[u8; HEADER_SIZE]) -> Self {
        let field = |at: usize| {
            i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        Header {
            size: field(0),
            id: field(4),
            packet_type: field(8),
        }
    }

    /// Parse the header at the start of `bytes`, if there are enough of them.
    pub fn peek(bytes: &[u8]) -> Option<Self> {
        let header: &[u8; HEADER_SIZE] = bytes.get(..HEADER_SIZE)?.try_into().ok()?;
        Some(Header::parse(header))
    }

    /// Number of bytes following the header, terminator included.
    pub fn body_len(&self) -> Result<usize, ProtocolError> {
        usize::try_from(self.size)
            .ok()
            .and_then(|size| size.checked_sub(8))
            .ok_or(ProtocolError::InvalidPacketSize(self.size))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    id: i32,
    packet_type: PacketType,
    body: Vec<u8>,
}

impl Packet {
    pub const BASE_PACKET_SIZE: usize = 10;

    pub fn new(id: i32, packet_type: PacketType, body: impl Into<Vec<u8>>) -> Self {
        Packet {
            id,
            packet_type,
            body: body.into(),
        }
    }

    /// The synthetic packet standing in for [END_OF_MULTIPACKET_MARKER].
    pub fn end_of_multipacket() -> Self {
        Packet::new(-1, PacketType::EndOfMultipacket, Vec::new())
    }

    /// Build a packet from a parsed header and the bytes that followed it.
    /// The `\0\0` terminator is dropped from the body if present.
    pub fn decode(header: Header, mut body: Vec<u8>) -> Self {
        if body.ends_with(&[0, 0]) {
            body.truncate(body.len() - 2);
        } else if body.ends_with(&[0]) {
            body.truncate(body.len() - 1);
        }
        Packet::new(header.id, PacketType::from_server(header.packet_type), body)
    }

    // Since the only one of these values that can change in length is the body,
    // an easy way to calculate the size of a packet is to find the byte-length
    // of the packet body, then add 10 to it.
    pub fn size(&self) -> usize {
        self.body.len() + Self::BASE_PACKET_SIZE
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Encode the packet as it goes on the wire. Size limits are checked by
    /// the transport, not here.
    pub fn pack(&self) -> Vec<u8> {
        // Size, ID, Type, Body, Terminator
        let mut payload = Vec::with_capacity(self.size() + 4);
        payload.extend_from_slice(&(self.size() as i32).to_le_bytes());
        payload.extend_from_slice(&self.id.to_le_bytes());
        payload.extend_from_slice(&self.packet_type.to_le_bytes());
        payload.extend_from_slice(&self.body);
        // null terminate the body (C++ interop 🤢), then null terminate the entire package
        payload.extend_from_slice(&[0, 0]);
        payload
    }
}
