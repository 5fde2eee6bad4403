//! `SysEx2`: the `0xF0`/`0xF7` system-exclusive track event (distinct from the `0xFF 0x7F`
//! meta-event escape in `meta_event.rs`, which shares the same 255-byte `Text` payload model but
//! different framing). Both read and write use a single length octet, preserving the source's
//! non-conformant framing per §4.1.4 and the 255-byte cap §9 chose to keep — a VLQ reader paired
//! with a single-octet writer would desync for any 128-255 byte payload, since such a length byte
//! has its high bit set and would be misread as a VLQ continuation byte (§4.1.5 round-trip
//! guarantee).

use crate::byte_iter::ByteIter;
use crate::error::LibResult;
use crate::text::Text;
use snafu::ResultExt;
use std::io::{Read, Write};

/// `0xF0`: a sysex message, complete or the first packet of one.
pub(crate) const SYSEX_START: u8 = 0xf0;
/// `0xF7`: a sysex continuation packet, or an "escape" carrying arbitrary bytes.
pub(crate) const SYSEX_ESCAPE: u8 = 0xf7;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SysEx2 {
    /// `false` for `0xF0` (start/complete message), `true` for `0xF7` (continuation/escape).
    continuation: bool,
    data: Text,
}

impl SysEx2 {
    pub fn new<T: Into<Text>>(continuation: bool, data: T) -> Self {
        Self {
            continuation,
            data: data.into(),
        }
    }

    pub fn is_continuation(&self) -> bool {
        self.continuation
    }

    pub fn data(&self) -> &Text {
        &self.data
    }

    pub(crate) fn parse<R: Read>(iter: &mut ByteIter<R>, continuation: bool) -> LibResult<Self> {
        let length = iter.read_or_die().context(io!())?;
        let bytes = iter.read_n(length as usize).context(io!())?;
        Ok(Self {
            continuation,
            data: bytes.into(),
        })
    }

    pub(crate) fn write<W: Write>(&self, w: &mut W) -> LibResult<()> {
        self.data.check_len()?;
        let status = if self.continuation {
            SYSEX_ESCAPE
        } else {
            SYSEX_START
        };
        write_u8!(w, status)?;
        write_u8!(w, self.data.as_bytes().len() as u8)?;
        w.write_all(self.data.as_bytes()).context(wr!())?;
        Ok(())
    }
}
