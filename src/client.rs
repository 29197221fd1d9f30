use std::{future::Future, time::Duration};

use crate::{
    chat::{ChatLog, ChatParsing, ParsedChat},
    config::ClientConfig,
    error::{ProtocolError, RconError, Result},
    packet::{Header, Packet, PacketType, HEADER_SIZE},
    transport::{self, MarkerDetection},
};
use log::{debug, trace};
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpStream,
};

/// Simple asynchronous rcon client. Call `connect()` to establish a connection
/// and authenticate. The client should be `mut` as it keeps a counter used for
/// [Packet] IDs, and only one command may be in flight at a time.
///
/// ## Example
/// ```no_run
/// use srcds_rcon::{client::Client, config::ClientConfig};
/// use std::error::Error;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn Error>> {
///     let config = ClientConfig::new("dev.viora.sh", "<put rcon password here>").port(27016);
///     // client must be mutable so we can increment packet IDs
///     let mut client = Client::connect(&config).await?;
///     let response = client.command("echo hi").await?;
///
///     assert_eq!(response.body(), "hi");
///     Ok(())
/// }
/// ```
pub struct Client<S = TcpStream> {
    stream: BufReader<S>,
    last_packet_id: i32,
    single_packet_mode: bool,
    max_empty_reads: usize,
    timeout: Option<Duration>,
    chat_parsing: ChatParsing,
    chat: ChatLog,
}

/// Container struct for a response that can be glued together from multiple [Packet]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    id: i32,
    body: String,
}

impl Response {
    /// Id of the command packet this responds to.
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn body(&self) -> &str {
        self.body.as_ref()
    }

    pub fn into_body(self) -> String {
        self.body
    }
}

impl Client<TcpStream> {
    /// Open a tcp connection to the configured host and authenticate.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        with_timeout(config.timeout, async {
            let address = config.address();
            let stream = TcpStream::connect(&address)
                .await
                .map_err(RconError::UnreachableHost)?;

            trace!("opened tcp stream to {}, attempting auth", address);

            Client::with_stream(stream, config).await
        })
        .await
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Authenticate over an already open stream. The configured host and port
    /// are ignored, and so is the timeout: wrap the call if you need one.
    pub async fn with_stream(stream: S, config: &ClientConfig) -> Result<Self> {
        let mut client = Client {
            stream: BufReader::new(stream),
            last_packet_id: 0,
            single_packet_mode: config.single_packet_mode,
            max_empty_reads: config.max_empty_reads,
            timeout: config.timeout,
            chat_parsing: config.chat_parsing,
            chat: ChatLog::default(),
        };

        client.auth(&config.password).await?;

        trace!("auth complete");

        Ok(client)
    }

    /// Run a rcon command asynchronously. In case of a response being split
    /// between multiple packets, they will be joined together afterwards.
    ///
    /// Chat messages arriving while we wait are stored, see
    /// [Client::chat_messages].
    pub async fn command(&mut self, command: &str) -> Result<Response> {
        let timeout = self.timeout;
        with_timeout(timeout, self.execute(command)).await
    }

    /// Chat messages received so far, oldest first.
    pub fn chat_messages(&self) -> &[String] {
        self.chat.messages()
    }

    /// Buffered chat messages grouped by the steam id of their author.
    pub fn parsed_chat(&self) -> Result<ParsedChat> {
        self.chat.parse(self.chat_parsing)
    }

    pub fn clear_chat_messages(&mut self) {
        self.chat.clear();
    }

    /// Shut down the write half of the stream and drop the connection.
    pub async fn close(mut self) -> Result<()> {
        self.stream
            .get_mut()
            .shutdown()
            .await
            .map_err(RconError::SendError)
    }

    async fn execute(&mut self, command: &str) -> Result<Response> {
        let command_packet = self.create_packet(PacketType::Exec, command)?;

        trace!("sending command packet to server");
        self.send(&command_packet).await?;

        let response = if self.single_packet_mode {
            self.read_response(Some(&command_packet)).await?
        } else {
            self.read_multi_response(&command_packet).await?
        };
        self.absorb_buffered_chat().await?;

        Ok(Response {
            id: response.id(),
            body: String::from_utf8(response.into_body())?,
        })
    }

    async fn auth(&mut self, password: &str) -> Result<()> {
        let auth_packet = self.create_packet(PacketType::Auth, password)?;

        trace!("sending auth packet to server");
        self.send(&auth_packet).await?;

        // srcds mirrors an empty response value before the real auth
        // response, but not every server does
        let mut response = self.read_response(None).await?;
        if response.packet_type() == PacketType::Response {
            debug!("skipping empty response before auth response");
            response = self.read_response(None).await?;
        }

        if response.packet_type() != PacketType::AuthResponse {
            let packet_type = response.packet_type().value();
            return Err(ProtocolError::InvalidAuthResponse(packet_type).into());
        }
        if response.id() == -1 {
            return Err(RconError::AuthenticationError);
        }
        if response.id() != auth_packet.id() {
            debug!(
                "auth accepted with id {} (sent {})",
                response.id(),
                auth_packet.id()
            );
        }
        Ok(())
    }

    /// Read the next response that is not a chat message. If `request` is
    /// given, the response must carry its id.
    async fn read_response(&mut self, request: Option<&Packet>) -> Result<Packet> {
        let response = self.next_non_chat_packet(MarkerDetection::Exact).await?;

        if !self.single_packet_mode
            && !matches!(
                response.packet_type(),
                PacketType::Response | PacketType::AuthResponse
            )
        {
            let packet_type = response.packet_type().value();
            return Err(ProtocolError::UnexpectedPacketType(packet_type).into());
        }

        if let Some(request) = request {
            if response.id() != request.id() {
                return Err(ProtocolError::IdMismatch {
                    expected: request.id(),
                    actual: response.id(),
                }
                .into());
            }
        }

        Ok(response)
    }

    async fn read_multi_response(&mut self, request: &Packet) -> Result<Packet> {
        // since srcds can split up the response but it won't tell us how many
        // packets to expect, we send a second packet immediately afterwards
        // with a blank body. Its mirror tells us there are no more packets
        // in response to our command.
        let check_packet = self.create_packet(PacketType::Response, "")?;
        trace!("sending check (blank) packet to server");
        self.send(&check_packet).await?;

        let mut body = Vec::new();
        let mut fragments = 0;

        loop {
            let response = self.next_non_chat_packet(MarkerDetection::Exact).await?;
            if response.packet_type() != PacketType::Response {
                let packet_type = response.packet_type().value();
                return Err(ProtocolError::UnexpectedPacketType(packet_type).into());
            }
            if response.id() == check_packet.id() {
                trace!("that was the check packet, completing response");
                break;
            }
            if response.id() != request.id() {
                return Err(ProtocolError::IdMismatch {
                    expected: request.id(),
                    actual: response.id(),
                }
                .into());
            }
            fragments += 1;
            body.extend_from_slice(response.body());
        }

        // the mirrored check packet is followed by an empty response and a
        // short end-of-multipacket marker
        let confirmation = self.next_non_chat_packet(MarkerDetection::Exact).await?;
        if confirmation.packet_type() != PacketType::Response
            || (confirmation.id() != check_packet.id() && confirmation.id() != request.id())
        {
            return Err(ProtocolError::MissingMultipacketConfirmation.into());
        }
        if !confirmation.body().is_empty() {
            trace!(
                "ignoring {} byte body of multipacket confirmation",
                confirmation.body().len()
            );
        }

        let end = self.next_non_chat_packet(MarkerDetection::Prefix).await?;
        if end.packet_type() != PacketType::EndOfMultipacket {
            return Err(ProtocolError::MissingEndOfMultipacket.into());
        }

        debug!(
            "assembled {} byte response to packet {} from {} fragments",
            body.len(),
            request.id(),
            fragments
        );
        Ok(Packet::new(request.id(), PacketType::Response, body))
    }

    /// Chat packets can show up at any point. Store them and keep reading.
    async fn next_non_chat_packet(&mut self, detection: MarkerDetection) -> Result<Packet> {
        loop {
            let packet =
                transport::read_packet(&mut self.stream, self.max_empty_reads, detection).await?;
            if packet.packet_type() != PacketType::ChatStream {
                return Ok(packet);
            }
            self.store_chat(&packet);
        }
    }

    /// Store chat frames that already sit complete in the read buffer, so
    /// they don't wait for the next command. Never waits on the socket.
    async fn absorb_buffered_chat(&mut self) -> Result<()> {
        loop {
            let buffered = self.stream.buffer();
            let complete_chat = Header::peek(buffered).is_some_and(|header| {
                PacketType::from_server(header.packet_type) == PacketType::ChatStream
                    && header
                        .body_len()
                        .is_ok_and(|len| buffered.len() >= HEADER_SIZE + len)
            });
            if !complete_chat {
                return Ok(());
            }

            let packet =
                transport::read_packet(&mut self.stream, 0, MarkerDetection::Exact).await?;
            self.store_chat(&packet);
        }
    }

    fn store_chat(&mut self, packet: &Packet) {
        trace!("storing chat message from packet {}", packet.id());
        self.chat.push(packet.body_text().into_owned());
    }

    async fn send(&mut self, packet: &Packet) -> Result<()> {
        transport::write_packet(self.stream.get_mut(), packet).await
    }

    fn create_packet(&mut self, packet_type: PacketType, body: &str) -> Result<Packet> {
        self.last_packet_id = self
            .last_packet_id
            .checked_add(1)
            .ok_or(RconError::PacketIdsExhausted)?;

        Ok(Packet::new(self.last_packet_id, packet_type, body))
    }
}

async fn with_timeout<T>(
    limit: Option<Duration>,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, future).await?,
        None => future.await,
    }
}
