//! `Event = (delta_time, EventBody)`, and the running-status state machine that resolves which
//! `EventBody` variant a track-stream byte belongs to (§4.1.3). Running status is owned here, by
//! the track-stream reader, for the lifetime of one track's decode — not by the byte cursor and
//! not by the channel-message decoder, per the design notes on reimplementing the source's
//! stateful parsing.

use crate::byte_iter::ByteIter;
use crate::core::message::ChannelMessage;
use crate::error::LibResult;
use crate::file::meta_event::MetaEvent;
use crate::file::sysex::{SysEx2, SYSEX_ESCAPE, SYSEX_START};
use snafu::ResultExt;
use std::io::{Read, Write};

const META_EVENT: u8 = 0xff;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum EventBody {
    /// A channel voice message (NoteOn, ControlChange, ...). Running status applies.
    Channel(ChannelMessage),
    /// `0xFF <type> <len> <payload>`: tempo, text, key signature, and the rest of §6.1's table.
    Meta(MetaEvent),
    /// `0xF0`/`0xF7`: a system-exclusive packet.
    SysEx2(SysEx2),
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Event {
    delta_time: u32,
    body: EventBody,
}

impl Event {
    pub fn new(delta_time: u32, body: EventBody) -> Self {
        Self { delta_time, body }
    }

    pub fn delta_time(&self) -> u32 {
        self.delta_time
    }

    pub fn body(&self) -> &EventBody {
        &self.body
    }

    pub(crate) fn body_mut(&mut self) -> &mut EventBody {
        &mut self.body
    }

    pub(crate) fn is_end_of_track(&self) -> bool {
        matches!(&self.body, EventBody::Meta(MetaEvent::EndOfTrack))
    }

    /// Parses one `(delta-time, event)` pair, resolving running status against `running_status`,
    /// which the caller owns for the duration of a single track's decode.
    pub(crate) fn parse<R: Read>(
        iter: &mut ByteIter<R>,
        running_status: &mut Option<u8>,
    ) -> LibResult<Self> {
        let delta_time = vlq_io!(iter.read_vlq_u32())?;
        let b = iter.peek_or_die().context(io!())?;
        let body = match b {
            META_EVENT => {
                *running_status = None;
                EventBody::Meta(MetaEvent::parse(iter)?)
            }
            SYSEX_START => {
                *running_status = None;
                iter.read_expect(SYSEX_START).context(io!())?;
                EventBody::SysEx2(SysEx2::parse(iter, false)?)
            }
            SYSEX_ESCAPE => {
                *running_status = None;
                iter.read_expect(SYSEX_ESCAPE).context(io!())?;
                EventBody::SysEx2(SysEx2::parse(iter, true)?)
            }
            0x80..=0xef => {
                iter.read_expect(b).context(io!())?;
                *running_status = Some(b);
                EventBody::Channel(Self::parse_channel(iter, b)?)
            }
            0x00..=0x7f => match *running_status {
                Some(status) => EventBody::Channel(Self::parse_channel(iter, status)?),
                None => unknown_event!(b),
            },
            _ => unknown_event!(b),
        };
        Ok(Self { delta_time, body })
    }

    fn parse_channel<R: Read>(iter: &mut ByteIter<R>, status: u8) -> LibResult<ChannelMessage> {
        ChannelMessage::parse(status, || iter.read_or_die().context(io!()))
    }

    pub(crate) fn write<W: Write>(&self, w: &mut W) -> LibResult<()> {
        w.write_all(&crate::vlq::encode_u32(self.delta_time))
            .context(wr!())?;
        match &self.body {
            EventBody::Channel(msg) => msg.write(w),
            EventBody::Meta(meta) => meta.write(w),
            EventBody::SysEx2(sysex) => sysex.write(w),
        }
    }
}

/// Re-exported so `track.rs` can build a terminating `EndOfTrack` event without reaching into
/// `meta_event`'s internals.
pub(crate) fn end_of_track() -> EventBody {
    EventBody::Meta(MetaEvent::EndOfTrack)
}
