//! STOMP Frame Codec
//!
//! Minimal STOMP 1.2 framing for text WebSocket messages: the client
//! frames (CONNECT, SUBSCRIBE, SEND, DISCONNECT) and the server frames
//! (CONNECTED, MESSAGE, RECEIPT, ERROR). A message that is nothing but
//! end-of-line characters is a heart-beat.

use std::fmt;
use std::str::FromStr;

/// Codec errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StompError {
    /// Command line not recognised.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Header line without a colon.
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    /// Backslash escape outside the allowed set.
    #[error("Invalid escape sequence in: {0}")]
    InvalidEscape(String),

    /// Frame not terminated by NUL.
    #[error("Frame not NUL-terminated")]
    MissingTerminator,

    /// `content-length` unparsable or beyond the payload.
    #[error("Bad content-length: {0}")]
    BadContentLength(String),
}

/// Frame command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum StompCommand {
    Connect,
    Stomp,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Disconnect,
    Message,
    Receipt,
    Error,
}

impl StompCommand {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            StompCommand::Connect => "CONNECT",
            StompCommand::Stomp => "STOMP",
            StompCommand::Connected => "CONNECTED",
            StompCommand::Send => "SEND",
            StompCommand::Subscribe => "SUBSCRIBE",
            StompCommand::Unsubscribe => "UNSUBSCRIBE",
            StompCommand::Disconnect => "DISCONNECT",
            StompCommand::Message => "MESSAGE",
            StompCommand::Receipt => "RECEIPT",
            StompCommand::Error => "ERROR",
        }
    }

    /// Handshake frames carry raw header values.
    fn escapes_headers(self) -> bool {
        !matches!(self, StompCommand::Connect | StompCommand::Connected)
    }
}

impl FromStr for StompCommand {
    type Err = StompError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CONNECT" => StompCommand::Connect,
            "STOMP" => StompCommand::Stomp,
            "CONNECTED" => StompCommand::Connected,
            "SEND" => StompCommand::Send,
            "SUBSCRIBE" => StompCommand::Subscribe,
            "UNSUBSCRIBE" => StompCommand::Unsubscribe,
            "DISCONNECT" => StompCommand::Disconnect,
            "MESSAGE" => StompCommand::Message,
            "RECEIPT" => StompCommand::Receipt,
            "ERROR" => StompCommand::Error,
            other => return Err(StompError::UnknownCommand(other.to_string())),
        })
    }
}

impl fmt::Display for StompCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One STOMP frame. Header order is preserved; on lookup the first
/// occurrence of a repeated header wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompFrame {
    /// Command line.
    pub command: StompCommand,
    /// Decoded headers in wire order.
    pub headers: Vec<(String, String)>,
    /// Payload.
    pub body: String,
}

impl StompFrame {
    /// Frame with no headers and an empty body.
    pub fn new(command: StompCommand) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value for a header.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// `destination` header.
    pub fn destination(&self) -> Option<&str> {
        self.get("destination")
    }

    // ===== CLIENT FRAMES =====

    /// CONNECT with heart-beats disabled.
    pub fn connect(host: &str) -> Self {
        Self::new(StompCommand::Connect)
            .header("accept-version", "1.2,1.1")
            .header("host", host)
            .header("heart-beat", "0,0")
    }

    /// SUBSCRIBE with auto acknowledgement.
    pub fn subscribe(id: impl Into<String>, destination: impl Into<String>) -> Self {
        Self::new(StompCommand::Subscribe)
            .header("id", id)
            .header("destination", destination)
            .header("ack", "auto")
    }

    /// SEND a JSON body.
    pub fn send_json(destination: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        Self::new(StompCommand::Send)
            .header("destination", destination)
            .header("content-type", "application/json")
            .header("content-length", body.len().to_string())
            .with_body(body)
    }

    /// DISCONNECT.
    pub fn disconnect() -> Self {
        Self::new(StompCommand::Disconnect)
    }

    // ===== CODEC =====

    /// Encode to the text of one WebSocket message.
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(32 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Decode one WebSocket text message. `Ok(None)` is a heart-beat.
    pub fn decode(text: &str) -> Result<Option<Self>, StompError> {
        let text = text.trim_start_matches(&['\r', '\n'][..]);
        if text.is_empty() {
            return Ok(None);
        }

        let (command_line, mut rest) = split_line(text);
        let command: StompCommand = command_line.parse()?;
        let escape = command.escapes_headers();

        let mut headers = Vec::new();
        loop {
            if rest.is_empty() {
                return Err(StompError::MissingTerminator);
            }
            let (line, tail) = split_line(rest);
            rest = tail;
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| StompError::MalformedHeader(line.to_string()))?;
            if escape {
                headers.push((unescape_header(name)?, unescape_header(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let frame = Self {
            command,
            headers,
            body: String::new(),
        };

        let body = match frame.get("content-length") {
            Some(raw) => {
                let len: usize = raw
                    .trim()
                    .parse()
                    .map_err(|_| StompError::BadContentLength(raw.to_string()))?;
                let body = rest
                    .get(..len)
                    .ok_or_else(|| StompError::BadContentLength(raw.to_string()))?;
                if !rest[len..].starts_with('\0') {
                    return Err(StompError::MissingTerminator);
                }
                body
            }
            None => {
                let end = rest.find('\0').ok_or(StompError::MissingTerminator)?;
                &rest[..end]
            }
        };

        Ok(Some(Self {
            body: body.to_string(),
            ..frame
        }))
    }
}

/// Split at the first EOL (`\n` or `\r\n`).
fn split_line(text: &str) -> (&str, &str) {
    match text.find('\n') {
        Some(i) => (text[..i].strip_suffix('\r').unwrap_or(&text[..i]), &text[i + 1..]),
        None => (text, ""),
    }
}

fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_header(raw: &str) -> Result<String, StompError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(StompError::InvalidEscape(raw.to_string())),
        }
    }
    Ok(out)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_send() {
        let frame = StompFrame::send_json("/app/game/action", "{\"type\":\"PLAYER_SHOOT\"}");
        assert_eq!(
            frame.encode(),
            "SEND\ndestination:/app/game/action\ncontent-type:application/json\ncontent-length:23\n\n{\"type\":\"PLAYER_SHOOT\"}\0"
        );
    }

    #[test]
    fn test_connect_headers_not_escaped() {
        let encoded = StompFrame::connect("localhost").encode();
        assert!(encoded.starts_with("CONNECT\naccept-version:1.2,1.1\nhost:localhost\nheart-beat:0,0\n\n"));
        assert!(encoded.ends_with('\0'));
    }

    #[test]
    fn test_decode_message() {
        let text = "MESSAGE\ndestination:/topic/gamestate\nsubscription:sub-0\nmessage-id:1\n\n{\"tanks\":[]}\0";
        let frame = StompFrame::decode(text).unwrap().unwrap();
        assert_eq!(frame.command, StompCommand::Message);
        assert_eq!(frame.destination(), Some("/topic/gamestate"));
        assert_eq!(frame.get("subscription"), Some("sub-0"));
        assert_eq!(frame.body, "{\"tanks\":[]}");
    }

    #[test]
    fn test_decode_crlf_and_trailing_eol() {
        let text = "\r\nCONNECTED\r\nversion:1.2\r\n\r\n\0\n";
        let frame = StompFrame::decode(text).unwrap().unwrap();
        assert_eq!(frame.command, StompCommand::Connected);
        assert_eq!(frame.get("version"), Some("1.2"));
        assert!(frame.body.is_empty());
    }

    #[test]
    fn test_decode_content_length_allows_nul_in_body() {
        let text = "MESSAGE\ncontent-length:3\n\na\0b\0";
        let frame = StompFrame::decode(text).unwrap().unwrap();
        assert_eq!(frame.body, "a\0b");
    }

    #[test]
    fn test_heartbeat() {
        assert_eq!(StompFrame::decode("\n").unwrap(), None);
        assert_eq!(StompFrame::decode("\r\n\n").unwrap(), None);
    }

    #[test]
    fn test_header_escaping() {
        let frame = StompFrame::new(StompCommand::Send).header("note", "a:b\\c\nd");
        let encoded = frame.encode();
        assert!(encoded.contains("note:a\\cb\\\\c\\nd\n"));

        let decoded = StompFrame::decode(&encoded).unwrap().unwrap();
        assert_eq!(decoded.get("note"), Some("a:b\\c\nd"));
    }

    #[test]
    fn test_first_repeated_header_wins() {
        let text = "MESSAGE\nfoo:first\nfoo:second\n\n\0";
        let frame = StompFrame::decode(text).unwrap().unwrap();
        assert_eq!(frame.get("foo"), Some("first"));
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            StompFrame::decode("BOGUS\n\n\0"),
            Err(StompError::UnknownCommand("BOGUS".to_string()))
        );
        assert_eq!(
            StompFrame::decode("MESSAGE\nnocolon\n\n\0"),
            Err(StompError::MalformedHeader("nocolon".to_string()))
        );
        assert_eq!(StompFrame::decode("MESSAGE\n\nbody"), Err(StompError::MissingTerminator));
        assert_eq!(
            StompFrame::decode("MESSAGE\nx:\\t\n\n\0"),
            Err(StompError::InvalidEscape("\\t".to_string()))
        );
        assert!(matches!(
            StompFrame::decode("MESSAGE\ncontent-length:99\n\nab\0"),
            Err(StompError::BadContentLength(_))
        ));
    }
}
