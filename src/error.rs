use thiserror::Error;
use tokio::time::error::Elapsed;

/// Shorthand for results returned by this crate.
pub type Result<T> = std::result::Result<T, RconError>;

/// Possible errors for the package.
#[derive(Error, Debug)]
pub enum RconError {
    /// Returned before anything is written if an outgoing packet would not
    /// fit in a single rcon frame.
    #[error("packet size {size} exceeds the {max} byte limit")]
    PacketTooLarge { size: usize, max: usize },
    /// Returned if you can't remember the password.
    #[error("bad password")]
    AuthenticationError,
    /// The server sent something we did not expect. The byte stream can no
    /// longer be trusted after this.
    #[error("rcon protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// A buffered chat message has no `[SteamID:...]` tag.
    #[error("chat message has no steam id: {0:?}")]
    MalformedChatMessage(String),
    /// Returned if the response body is not valid utf-8.
    #[error("packet body malformed (not valid utf-8)")]
    MalformedPacketBody(#[from] std::string::FromUtf8Error),
    /// Returned if the host is down or behind a firewall.
    #[error("host cannot be reached")]
    UnreachableHost(#[source] std::io::Error),
    /// Internal error used if the stream was successfully established, but
    /// there was a problem writing to the socket.
    #[error("cannot send message to host")]
    SendError(#[source] std::io::Error),
    /// Internal error used if the stream was successfully established, but
    /// there was a problem reading from the socket.
    #[error("cannot receive response from host")]
    ReceiveError(#[source] std::io::Error),
    /// Returned if the server did not respond in time.
    #[error("timeout")]
    TimeoutError(#[from] Elapsed),
    /// The connection has used up every positive packet id.
    #[error("no packet ids left on this connection")]
    PacketIdsExhausted,
}

impl RconError {
    /// Whether the connection is unusable after this error. Callers should
    /// drop the client and reconnect instead of issuing another command.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RconError::PacketTooLarge { .. }
                | RconError::MalformedChatMessage(_)
                | RconError::MalformedPacketBody(_)
        )
    }
}

/// Ways the server can break the request/response contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Fewer than 12 header bytes arrived and they were not the end-of-multipacket marker.
    #[error("packet header malformed (got {len} of 12 bytes)")]
    MalformedHeader { len: usize },
    #[error("packet declares an impossible size of {0}")]
    InvalidPacketSize(i32),
    #[error("received unexpected rcon packet type {0}")]
    UnexpectedPacketType(i32),
    #[error("received invalid auth response packet (type {0})")]
    InvalidAuthResponse(i32),
    /// The response belongs to a different request, the stream is out of sync.
    #[error("response id {actual} does not match request id {expected}")]
    IdMismatch { expected: i32, actual: i32 },
    #[error("expected empty response after multipacket")]
    MissingMultipacketConfirmation,
    #[error("expected end-of-multipacket response not received")]
    MissingEndOfMultipacket,
    #[error("connection closed by the server")]
    ConnectionClosed,
}
