//! The `MThd` chunk: file format, track count, and PPQ division. SMPTE-based division is out of
//! scope (§1 Non-goals), so a division byte with bit 15 set is a hard `BadHeader` rather than a
//! variant we silently misinterpret.

use crate::byte_iter::ByteIter;
use crate::error::LibResult;
use snafu::ResultExt;
use std::convert::TryFrom;
use std::io::{Read, Write};

/// Bit 15 of the division field, set for SMPTE-based (as opposed to PPQ) timing.
const DIVISION_TYPE_BIT: u16 = 0b1000_0000_0000_0000;

/// `MThd` payload is always exactly 6 bytes: format, ntrks, division.
const HEADER_CHUNK_LENGTH: u32 = 6;

#[repr(u16)]
#[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub enum Format {
    /// 0: the file contains a single multi-channel track.
    Single = 0,
    /// 1: one or more simultaneous tracks of a sequence.
    #[default]
    Multi = 1,
    /// 2: one or more sequentially independent single-track patterns.
    Sequential = 2,
}

impl Format {
    pub(crate) fn from_u16(value: u16) -> LibResult<Self> {
        match value {
            0 => Ok(Format::Single),
            1 => Ok(Format::Multi),
            2 => Ok(Format::Sequential),
            _ => bad_header!("format must be 0, 1, or 2, got {}", value),
        }
    }
}

impl TryFrom<u16> for Format {
    type Error = crate::Error;

    fn try_from(value: u16) -> crate::Result<Self> {
        Ok(Self::from_u16(value)?)
    }
}

/// Pulses (ticks) per quarter note: a nonzero positive `u15`. The high bit is reserved on the wire
/// for SMPTE-based division, which this codec does not support.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub struct Ppq(u16);

impl Default for Ppq {
    /// 480 PPQ, the baseline the Player's default tempo (§4.3) is defined against.
    fn default() -> Self {
        Ppq(480)
    }
}

impl Ppq {
    /// Validates and wraps a raw division value (§6.1 header chunk `PQ PQ` field).
    pub fn new(value: u16) -> crate::Result<Self> {
        Ok(Self::new_checked(value)?)
    }

    pub(crate) fn new_checked(value: u16) -> LibResult<Self> {
        if value & DIVISION_TYPE_BIT != 0 {
            bad_header!(
                "SMPTE-based timing division is not supported, got {:#06x}",
                value
            );
        }
        if value == 0 {
            bad_header!("PPQ division must be nonzero");
        }
        Ok(Ppq(value))
    }

    pub fn get(&self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for Ppq {
    type Error = crate::Error;

    fn try_from(value: u16) -> crate::Result<Self> {
        Self::new(value)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub struct Header {
    format: Format,
    ppq: Ppq,
}

impl Header {
    pub fn new(format: Format, ppq: Ppq) -> Self {
        Self { format, ppq }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn ppq(&self) -> Ppq {
        self.ppq
    }

    /// Parses the `MThd` chunk, returning the header and the declared track count (`ntrks`,
    /// which the caller uses to decide how many `MTrk` chunks to expect but not to blindly trust
    /// — unknown chunks and extra/missing tracks are tolerated, per §4.1.2).
    pub(crate) fn parse<R: Read>(iter: &mut ByteIter<R>) -> LibResult<(Self, u16)> {
        iter.expect_tag("MThd").context(io!())?;
        let chunk_length = iter.read_u32().context(io!())?;
        if chunk_length != HEADER_CHUNK_LENGTH {
            bad_header!(
                "MThd chunk length must be {}, got {}",
                HEADER_CHUNK_LENGTH,
                chunk_length
            );
        }
        let format = Format::from_u16(iter.read_u16().context(io!())?)?;
        let ntrks = iter.read_u16().context(io!())?;
        let ppq = Ppq::new_checked(iter.read_u16().context(io!())?)?;
        if format == Format::Single && ntrks > 1 {
            bad_header!(
                "format 0 requires exactly one track, header declares {}",
                ntrks
            );
        }
        Ok((Self { format, ppq }, ntrks))
    }

    pub(crate) fn write<W: Write>(&self, w: &mut W, ntracks: u16) -> LibResult<()> {
        w.write_all(b"MThd").context(wr!())?;
        w.write_all(&HEADER_CHUNK_LENGTH.to_be_bytes())
            .context(wr!())?;
        w.write_all(&(self.format as u16).to_be_bytes())
            .context(wr!())?;
        w.write_all(&ntracks.to_be_bytes()).context(wr!())?;
        w.write_all(&self.ppq.get().to_be_bytes()).context(wr!())?;
        Ok(())
    }
}
