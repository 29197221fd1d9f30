//! Reading and writing single frames on a byte stream.
//!
//! These functions never look past one frame: gluing multi-packet responses
//! together is the job of [crate::client::Client].
use log::trace;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    error::{ProtocolError, RconError, Result},
    packet::{Header, Packet, END_OF_MULTIPACKET_MARKER, HEADER_SIZE, MAX_PACKET_SIZE},
};

/// Send one packet. Oversized packets are rejected before a single byte is
/// written, so the stream stays usable.
pub async fn write_packet<W>(stream: &mut W, packet: &Packet) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if packet.size() > MAX_PACKET_SIZE {
        return Err(RconError::PacketTooLarge {
            size: packet.size(),
            max: MAX_PACKET_SIZE,
        });
    }

    trace!(
        "send packet id {} type {:?} ({} bytes)",
        packet.id(),
        packet.packet_type(),
        packet.size()
    );
    stream
        .write_all(&packet.pack())
        .await
        .map_err(RconError::SendError)?;
    stream.flush().await.map_err(RconError::SendError)
}

/// When a run of header bytes counts as the end-of-multipacket marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerDetection {
    /// The marker was sent on its own: exactly its 7 bytes are available.
    Exact,
    /// The marker is due next, so it is recognised even when more frames
    /// (usually chat) are already queued behind it.
    Prefix,
}

/// Read one frame, or the end-of-multipacket marker.
///
/// Only the bytes of this frame are consumed, anything after it stays in the
/// reader's buffer. Reads that come back empty before any header byte arrived
/// are retried up to `max_empty_reads` times.
pub async fn read_packet<R>(
    stream: &mut R,
    max_empty_reads: usize,
    detection: MarkerDetection,
) -> Result<Packet>
where
    R: AsyncBufRead + Unpin,
{
    let marker_len = END_OF_MULTIPACKET_MARKER.len();
    let mut header = [0u8; HEADER_SIZE];
    let mut filled = 0;
    let mut empty_reads = 0;

    while filled < HEADER_SIZE {
        let available = stream.fill_buf().await.map_err(RconError::ReceiveError)?;

        if available.is_empty() {
            if filled > 0 {
                return Err(ProtocolError::MalformedHeader { len: filled }.into());
            }
            empty_reads += 1;
            if empty_reads > max_empty_reads {
                return Err(ProtocolError::ConnectionClosed.into());
            }
            continue;
        }

        let buffered = filled + available.len();
        let take = available.len().min(HEADER_SIZE - filled);
        header[filled..filled + take].copy_from_slice(&available[..take]);
        let seen = filled + take;

        // the marker is shorter than a header, so it has to be recognised
        // before waiting for the remaining bytes
        if seen >= marker_len
            && header[..marker_len] == END_OF_MULTIPACKET_MARKER
            && (detection == MarkerDetection::Prefix || buffered == marker_len)
        {
            stream.consume(marker_len - filled);
            trace!("receive end-of-multipacket marker");
            return Ok(Packet::end_of_multipacket());
        }

        stream.consume(take);
        filled = seen;
    }

    let header = Header::parse(&header);
    let body_len = header.body_len()?;
    // grow with the bytes actually received, not with the declared size
    let mut body = Vec::with_capacity(body_len.min(MAX_PACKET_SIZE));
    (&mut *stream)
        .take(body_len as u64)
        .read_to_end(&mut body)
        .await
        .map_err(RconError::ReceiveError)?;
    if body.len() != body_len {
        return Err(ProtocolError::ConnectionClosed.into());
    }

    trace!(
        "receive packet id {} type {} ({} byte body)",
        header.id,
        header.packet_type,
        body.len()
    );
    Ok(Packet::decode(header, body))
}
