//! `Text` is not a MIDI-specific concept. MIDI recommends text payloads be ASCII but does not
//! enforce it, so `Text` holds a UTF-8 `String` whenever possible and falls back to raw bytes
//! when the payload is not valid UTF-8. Meta-event text payloads are also capped at 255 bytes,
//! the largest length a single octet can express.

use crate::error::{LibError, LibResult};
use log::warn;
use std::borrow::Cow;
use std::fmt::{Display, Formatter};

/// The largest number of bytes a text-like meta-event payload may occupy.
pub(crate) const MAX_TEXT_BYTES: usize = 255;

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub enum Text {
    /// A UTF-8 encoded string.
    Utf8(String),
    /// Bytes that didn't decode as UTF-8, probably text in some other encoding.
    Other(Vec<u8>),
}

impl Default for Text {
    fn default() -> Self {
        Text::Utf8(String::new())
    }
}

impl Display for Text {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Text::Utf8(s) => Display::fmt(s, f),
            Text::Other(b) => write!(f, "{}", String::from_utf8_lossy(b)),
        }
    }
}

impl From<Vec<u8>> for Text {
    fn from(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes.clone()) {
            Ok(s) => Text::Utf8(s),
            Err(_) => {
                warn!("non UTF-8 text payload encountered, encoding unknown");
                Text::Other(bytes)
            }
        }
    }
}

impl From<String> for Text {
    fn from(s: String) -> Self {
        Text::Utf8(s)
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Text::Utf8(s.into())
    }
}

/// Lossy if the `Text` is not UTF-8 encoded.
impl From<Text> for String {
    fn from(t: Text) -> Self {
        match t {
            Text::Utf8(s) => s,
            Text::Other(b) => String::from_utf8_lossy(&b).into(),
        }
    }
}

impl Text {
    pub fn new<S: Into<String>>(s: S) -> Self {
        Text::Utf8(s.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Text::Utf8(s) => s.as_bytes(),
            Text::Other(b) => b.as_slice(),
        }
    }

    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            Text::Utf8(s) => Cow::Borrowed(s.as_str()),
            Text::Other(b) => String::from_utf8_lossy(b),
        }
    }

    /// Checks the 255-byte cap before a meta-event write serializes this payload.
    pub(crate) fn check_len(&self) -> LibResult<()> {
        let len = self.as_bytes().len();
        if len > MAX_TEXT_BYTES {
            return Err(LibError::StringTooLong { site: site!(), len });
        }
        Ok(())
    }
}
