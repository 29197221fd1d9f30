//! Chat notifications pushed by Squad servers between regular responses.
use std::collections::HashMap;

use log::warn;

use crate::error::{RconError, Result};

const STEAM_ID_TAG: &str = "[SteamID:";

/// What to do with a chat message that carries no `[SteamID:...]` tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChatParsing {
    /// Fail the whole parse.
    #[default]
    Strict,
    /// Skip the message and report it in [ParsedChat::malformed].
    Lenient,
}

/// Chat messages in the order they were received.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    messages: Vec<String>,
}

impl ChatLog {
    pub fn push(&mut self, message: String) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Group the buffered messages by the steam id of their author, keeping
    /// each player's messages in chronological order.
    pub fn parse(&self, mode: ChatParsing) -> Result<ParsedChat> {
        let mut parsed = ParsedChat::default();

        for message in &self.messages {
            let text = message.trim_matches('\0');
            match steam_id(text) {
                Some(id) => parsed
                    .players
                    .entry(id.to_owned())
                    .or_default()
                    .push(text.to_owned()),
                None if mode == ChatParsing::Strict => {
                    return Err(RconError::MalformedChatMessage(text.to_owned()))
                }
                None => {
                    warn!("skipping chat message without steam id: {:?}", text);
                    parsed.malformed.push(text.to_owned());
                }
            }
        }

        Ok(parsed)
    }
}

/// Chat messages grouped by player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedChat {
    players: HashMap<String, Vec<String>>,
    malformed: Vec<String>,
}

impl ParsedChat {
    pub fn players(&self) -> &HashMap<String, Vec<String>> {
        &self.players
    }

    pub fn messages_from(&self, steam_id: &str) -> &[String] {
        self.players.get(steam_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Messages skipped in [ChatParsing::Lenient] mode.
    pub fn malformed(&self) -> &[String] {
        &self.malformed
    }

    pub fn into_players(self) -> HashMap<String, Vec<String>> {
        self.players
    }
}

/// Find the first `[SteamID:<token>]` in `text`, where the token is made of
/// `[A-Za-z0-9_]`, and return the token.
pub fn steam_id(text: &str) -> Option<&str> {
    let mut rest = text;
    while let Some(start) = rest.find(STEAM_ID_TAG) {
        rest = &rest[start + STEAM_ID_TAG.len()..];
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if rest[end..].starts_with(']') {
            return Some(&rest[..end]);
        }
    }
    None
}
