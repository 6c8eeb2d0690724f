//! Message — the two wire messages and their text codec.
//!
//! Announce: `<id> <x> <y>`
//! Depart:   `<id> STOP!`

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::state::{AgentId, Position};

/// Reserved token marking a departure.
pub const STOP_MARKER: &str = "STOP!";

/// Upper bound for one encoded message; it must fit a single datagram.
pub const MAX_DATAGRAM: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Announce { id: AgentId, position: Position },
    Depart { id: AgentId },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DecodeError {
    #[error("datagram is not valid UTF-8")]
    InvalidUtf8,

    #[error("empty message")]
    Empty,

    #[error("invalid identity token: {0:?}")]
    InvalidId(String),

    #[error("identity token is the reserved departure marker")]
    ReservedId,

    #[error("expected two coordinates, found {0}")]
    MissingCoordinates(usize),

    #[error("unexpected trailing field: {0:?}")]
    TrailingFields(String),

    #[error("invalid coordinate: {0:?}")]
    InvalidCoordinate(String),

    #[error("coordinate is not finite: {0:?}")]
    NonFinite(String),
}

impl Message {
    pub fn id(&self) -> &AgentId {
        match self {
            Message::Announce { id, .. } | Message::Depart { id } => id,
        }
    }

    pub fn is_departure(&self) -> bool {
        matches!(self, Message::Depart { .. })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Decode one datagram.
    pub fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        std::str::from_utf8(raw)
            .map_err(|_| DecodeError::InvalidUtf8)?
            .parse()
    }
}

impl FromStr for Message {
    type Err = DecodeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut tokens = text.split_ascii_whitespace();
        let head = tokens.next().ok_or(DecodeError::Empty)?;
        if head == STOP_MARKER {
            return Err(DecodeError::ReservedId);
        }
        let id = AgentId::parse(head).ok_or_else(|| DecodeError::InvalidId(head.to_string()))?;

        let fields: Vec<&str> = tokens.collect();

        // The marker wins over any other field, matched as a whole token.
        if fields.iter().any(|f| *f == STOP_MARKER) {
            return Ok(Message::Depart { id });
        }

        match fields.as_slice() {
            [x, y] => Ok(Message::Announce {
                id,
                position: Position::new(parse_coordinate(x)?, parse_coordinate(y)?),
            }),
            [_, _, extra, ..] => Err(DecodeError::TrailingFields(extra.to_string())),
            short => Err(DecodeError::MissingCoordinates(short.len())),
        }
    }
}

fn parse_coordinate(token: &str) -> Result<f64, DecodeError> {
    let value: f64 = token
        .parse()
        .map_err(|_| DecodeError::InvalidCoordinate(token.to_string()))?;
    if !value.is_finite() {
        return Err(DecodeError::NonFinite(token.to_string()));
    }
    Ok(value)
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Announce { id, position } => write!(f, "{} {} {}", id, position.x, position.y),
            Message::Depart { id } => write!(f, "{} {}", id, STOP_MARKER),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> AgentId {
        AgentId::parse(s).unwrap()
    }

    // ── Encoding ─────────────────────────────────────────────────

    #[test]
    fn test_encode_announce() {
        let msg = Message::Announce {
            id: id("aB3dE5gH9k"),
            position: Position::new(640.5, 12.0),
        };
        assert_eq!(msg.to_string(), "aB3dE5gH9k 640.5 12");
    }

    #[test]
    fn test_encode_depart() {
        let msg = Message::Depart { id: id("aB3dE5gH9k") };
        assert_eq!(msg.to_string(), "aB3dE5gH9k STOP!");
        assert_eq!(msg.to_bytes(), b"aB3dE5gH9k STOP!".to_vec());
    }

    #[test]
    fn test_encoded_announce_fits_datagram() {
        let msg = Message::Announce {
            id: AgentId::random(),
            position: Position::new(-f64::MAX, f64::MIN_POSITIVE),
        };
        assert!(msg.to_bytes().len() <= MAX_DATAGRAM);
        assert_eq!(Message::decode(&msg.to_bytes()).unwrap(), msg);
    }

    // ── Decoding ─────────────────────────────────────────────────

    #[test]
    fn test_decode_announce_accepts_integer_and_float_coordinates() {
        let msg = Message::decode(b"peer1 640 360.25").unwrap();
        assert_eq!(
            msg,
            Message::Announce {
                id: id("peer1"),
                position: Position::new(640.0, 360.25),
            }
        );
    }

    #[test]
    fn test_decode_tolerates_extra_whitespace() {
        let msg = Message::decode(b"  peer1\t1.0   2.0\n").unwrap();
        assert_eq!(msg.id(), &id("peer1"));
    }

    #[test]
    fn test_decode_depart() {
        let msg = Message::decode(b"peer1 STOP!").unwrap();
        assert_eq!(msg, Message::Depart { id: id("peer1") });
        assert!(msg.is_departure());
    }

    #[test]
    fn test_marker_anywhere_means_depart() {
        assert!(Message::decode(b"peer1 10 STOP!").unwrap().is_departure());
        assert!(Message::decode(b"peer1 10 20 STOP!").unwrap().is_departure());
    }

    #[test]
    fn test_marker_inside_id_is_not_a_departure() {
        let msg = Message::decode(b"xSTOP!x 1 2").unwrap();
        assert!(!msg.is_departure());
        assert_eq!(msg.id(), &id("xSTOP!x"));
    }

    #[test]
    fn test_reserved_marker_as_id_rejected() {
        assert_eq!(Message::decode(b"STOP! 1 2"), Err(DecodeError::ReservedId));
    }

    #[test]
    fn test_decode_missing_coordinates() {
        assert_eq!(Message::decode(b"abc"), Err(DecodeError::MissingCoordinates(0)));
        assert_eq!(Message::decode(b"abc 1.0"), Err(DecodeError::MissingCoordinates(1)));
    }

    #[test]
    fn test_decode_trailing_fields() {
        assert_eq!(
            Message::decode(b"abc 1 2 3"),
            Err(DecodeError::TrailingFields("3".to_string()))
        );
    }

    #[test]
    fn test_decode_non_numeric_coordinate() {
        assert_eq!(
            Message::decode(b"abc one 2"),
            Err(DecodeError::InvalidCoordinate("one".to_string()))
        );
    }

    #[test]
    fn test_decode_rejects_non_finite() {
        assert_eq!(Message::decode(b"abc NaN 2"), Err(DecodeError::NonFinite("NaN".to_string())));
        assert_eq!(Message::decode(b"abc 1 inf"), Err(DecodeError::NonFinite("inf".to_string())));
    }

    #[test]
    fn test_decode_empty_and_blank() {
        assert_eq!(Message::decode(b""), Err(DecodeError::Empty));
        assert_eq!(Message::decode(b"   \n"), Err(DecodeError::Empty));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        assert_eq!(Message::decode(&[0xff, 0xfe, b' ', b'1']), Err(DecodeError::InvalidUtf8));
    }
}
