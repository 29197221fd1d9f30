use std::{fmt, time::Duration};

use crate::chat::ChatParsing;

/// Everything needed to open and authenticate a [crate::client::Client].
#[derive(Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    /// For servers that never answer the empty check packet used to detect
    /// the end of a multi-packet response (Factorio, for one).
    pub single_packet_mode: bool,
    /// Applies to connect plus auth, and separately to each command.
    pub timeout: Option<Duration>,
    pub chat_parsing: ChatParsing,
    /// How many zero-length reads to tolerate before the connection is
    /// considered closed.
    pub max_empty_reads: usize,
}

impl ClientConfig {
    pub const DEFAULT_PORT: u16 = 27015;
    pub const DEFAULT_MAX_EMPTY_READS: usize = 64;

    pub fn new(host: impl Into<String>, password: impl Into<String>) -> Self {
        ClientConfig {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            password: password.into(),
            single_packet_mode: false,
            timeout: None,
            chat_parsing: ChatParsing::default(),
            max_empty_reads: Self::DEFAULT_MAX_EMPTY_READS,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn single_packet_mode(mut self, enabled: bool) -> Self {
        self.single_packet_mode = enabled;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn chat_parsing(mut self, mode: ChatParsing) -> Self {
        self.chat_parsing = mode;
        self
    }

    pub fn max_empty_reads(mut self, reads: usize) -> Self {
        self.max_empty_reads = reads;
        self
    }

    /// `host:port`, ready for [tokio::net::TcpStream::connect].
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// keep the password out of logs
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .field("single_packet_mode", &self.single_packet_mode)
            .field("timeout", &self.timeout)
            .field("chat_parsing", &self.chat_parsing)
            .field("max_empty_reads", &self.max_empty_reads)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_source_port() {
        let config = ClientConfig::new("dev.viora.sh", "hunter2");
        assert_eq!(config.address(), "dev.viora.sh:27015");
        assert!(!config.single_packet_mode);
        assert_eq!(config.chat_parsing, ChatParsing::Strict);
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn builder_overrides() {
        let config = ClientConfig::new("localhost", "pw")
            .port(34198)
            .single_packet_mode(true)
            .timeout(Duration::from_secs(3))
            .chat_parsing(ChatParsing::Lenient)
            .max_empty_reads(1);
        assert_eq!(config.address(), "localhost:34198");
        assert!(config.single_packet_mode);
        assert_eq!(config.timeout, Some(Duration::from_secs(3)));
        assert_eq!(config.max_empty_reads, 1);
    }

    #[test]
    fn debug_hides_password() {
        let config = ClientConfig::new("localhost", "hunter2");
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
