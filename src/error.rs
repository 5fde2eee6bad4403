use snafu::Snafu;

/// The public Error type for this library.
#[derive(Debug, Snafu)]
pub struct Error(LibError);

/// The public Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// The internal Result type for this library.
pub(crate) type LibResult<T> = std::result::Result<T, LibError>;

/// The internal Error type for this library. One variant per error kind named in the codec's
/// error handling design.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum LibError {
    #[snafu(display("{}: error while reading bytes: {}", site, source))]
    Io {
        site: String,
        source: crate::byte_iter::ByteError,
    },

    #[snafu(display("{}: error while writing bytes: {}", site, source))]
    Write {
        site: String,
        source: std::io::Error,
    },

    #[snafu(display("{}: the MIDI file is invalid: {}", site, description))]
    InvalidFile { site: String, description: String },

    #[snafu(display("{}: truncated input: {}", site, description))]
    Truncated { site: String, description: String },

    #[snafu(display("{}: bad MIDI header: {}", site, description))]
    BadHeader { site: String, description: String },

    #[snafu(display("{}: no decoder for status byte {:#04x}", site, status))]
    UnknownEventType { site: String, status: u8 },

    #[snafu(display("{}: malformed variable-length quantity: {}", site, source))]
    MalformedVlq {
        site: String,
        source: crate::byte_iter::ByteError,
    },

    #[snafu(display(
        "{}: meta-event length mismatch, expected {}, got {}",
        site,
        expected,
        got
    ))]
    LengthMismatch {
        site: String,
        expected: u32,
        got: u32,
    },

    #[snafu(display("{}: track chunk body is too long to encode: {}", site, source))]
    TrackTooLong {
        site: String,
        source: std::num::TryFromIntError,
    },

    #[snafu(display(
        "{}: text payload of {} bytes exceeds the 255-byte cap",
        site,
        len
    ))]
    StringTooLong { site: String, len: usize },

    #[snafu(display("{}: transposition crosses major/minor", site))]
    KeyModeMismatch { site: String },
}

macro_rules! site {
    () => {
        format!("{}:{}", file!(), line!())
    };
}

macro_rules! io {
    () => {
        crate::error::Io { site: site!() }
    };
}

macro_rules! wr {
    () => {
        crate::error::Write { site: site!() }
    };
}

/// Reads a VLQ-bearing value off a `ByteIter`, classifying a failure as `MalformedVlq` rather
/// than generic `Io` when the underlying error is VLQ-specific (overflow or truncation mid-VLQ).
macro_rules! vlq_io {
    ($result:expr) => {
        $result.map_err(|source| {
            if source.is_vlq() {
                crate::error::LibError::MalformedVlq {
                    site: site!(),
                    source,
                }
            } else {
                crate::error::LibError::Io {
                    site: site!(),
                    source,
                }
            }
        })
    };
}

macro_rules! truncated {
    ($msg:expr) => {
        return Err(crate::error::LibError::Truncated {
            site: site!(),
            description: $msg.to_string(),
        })
    };
    ($fmt:expr, $($arg:expr),+) => {
        return Err(crate::error::LibError::Truncated {
            site: site!(),
            description: format!($fmt, $($arg),+),
        })
    };
}

macro_rules! bad_header {
    ($msg:expr) => {
        return Err(crate::error::LibError::BadHeader {
            site: site!(),
            description: $msg.to_string(),
        })
    };
    ($fmt:expr, $($arg:expr),+) => {
        return Err(crate::error::LibError::BadHeader {
            site: site!(),
            description: format!($fmt, $($arg),+),
        })
    };
}

macro_rules! unknown_event {
    ($status:expr) => {
        return Err(crate::error::LibError::UnknownEventType {
            site: site!(),
            status: $status,
        })
    };
}

macro_rules! invalid_file_s {
    () => {
        crate::error::InvalidFile {
            site: site!(),
            description: "[no description]",
        }
    };
    ($msg:expr) => {
        crate::error::InvalidFile {
            site: site!(),
            description: $msg,
        }
    };
    ($fmt:expr, $($arg:expr),+) => {
        crate::error::InvalidFile {
            site: site!(),
            description: format!($fmt, $($arg),+),
        }
    };
}

macro_rules! invalid_file_e {
    () => {
        invalid_file_s!().build()
    };
    ($msg:expr) => {
        invalid_file_s!($msg).build()
    };
    ($fmt:expr, $($arg:expr),+) => {
        invalid_file_s!($fmt, $($arg),+).build()
    };
}

macro_rules! invalid_file {
    () => {
        return Err(invalid_file_e!())
    };
    ($msg:expr) => {
        return Err(invalid_file_e!($msg))
    };
    ($fmt:expr, $($arg:expr),+) => {
        return Err(invalid_file_e!($fmt, $($arg),+))
    };
}

#[test]
fn site_test() {
    let line = line!() + 1;
    let site = site!();
    assert!(site.contains("error.rs"));
    assert!(site.contains(format!("{}", line).as_str()));
}

#[test]
fn invalid_file_macro_test() {
    fn foo() -> LibResult<u64> {
        invalid_file!("hello {}", "world");
    }
    let result = foo();
    assert!(result.is_err());
    let message = format!("{}", result.err().unwrap());
    assert!(message.contains("hello world"));
}
