//! Identity — random agent identifiers.

use std::fmt;

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Characters in a generated id. 62^10 ≈ 8.4e17 distinct ids.
pub const ID_LEN: usize = 10;

/// Opaque identity of one agent on the wire.
///
/// Generated ids are alphanumeric; ids parsed off the wire only need to be
/// a single non-empty token so peers running other builds still interoperate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(String);

impl AgentId {
    /// Generate a fresh id from the thread-local RNG.
    pub fn random() -> Self {
        Self::random_with(&mut rand::thread_rng())
    }

    pub fn random_with<R: Rng>(rng: &mut R) -> Self {
        let id: String = (0..ID_LEN)
            .map(|_| char::from(rng.sample(Alphanumeric)))
            .collect();
        Self(id)
    }

    /// Accept a wire token as an id. Rejects empty tokens and tokens containing whitespace.
    pub fn parse(token: &str) -> Option<Self> {
        if token.is_empty() || token.chars().any(char::is_whitespace) {
            return None;
        }
        Some(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
