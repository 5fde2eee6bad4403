//! `Track`: one `MTrk` chunk — a flat, ordered sequence of delta-time-prefixed `Event`s (§3).
//! Running status (§4.1.3) is scoped to the decode of a single track, so it lives on the stack of
//! `Track::parse_body` rather than anywhere on `Track` itself.

use crate::byte_iter::ByteIter;
use crate::error::LibResult;
use crate::file::event::{end_of_track, Event};
use log::warn;
use snafu::ResultExt;
use std::convert::TryFrom;
use std::io::{Read, Write};

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Track {
    events: Vec<Event>,
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if the track has no events at all (not even a trailing `EndOfTrack`).
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events_len(&self) -> usize {
        self.events.len()
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn event(&self, index: usize) -> Option<&Event> {
        self.events.get(index)
    }

    pub(crate) fn events_mut(&mut self) -> impl Iterator<Item = &mut Event> {
        self.events.iter_mut()
    }

    pub(crate) fn events_slice(&self) -> &[Event] {
        &self.events
    }

    /// Adds an event to the end of the track.
    pub fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Parses a whole `MTrk` chunk, including its own tag and length. Used directly by tests;
    /// `MidiFile::read` goes through `parse_body` instead, having already read the tag itself to
    /// decide this chunk was an `MTrk` in the first place.
    #[cfg(test)]
    pub(crate) fn parse<R: Read>(iter: &mut ByteIter<R>) -> LibResult<Self> {
        iter.expect_tag("MTrk").context(io!())?;
        let chunk_length = iter.read_u32().context(io!())?;
        Self::parse_body(iter, chunk_length)
    }

    /// Parses the body of an `MTrk` chunk whose tag and declared length the caller has already
    /// consumed. The declared length bounds the read (§4.1.2): a track is done once either an
    /// `EndOfTrack` event is seen or the chunk's declared byte count is exhausted, whichever comes
    /// first, and a chunk that runs out of bytes before either is reached is an invalid file.
    ///
    /// On error, drains any unread bytes up to the chunk's declared length before returning, so a
    /// caller that tolerates a bad track (§7: "errors inside a single track abort that track's
    /// decoding but preserve already-decoded tracks") can resume chunk dispatch at the next
    /// chunk's tag rather than mid-stream.
    pub(crate) fn parse_body<R: Read>(iter: &mut ByteIter<R>, chunk_length: u32) -> LibResult<Self> {
        iter.set_size_limit(chunk_length as u64);
        let result = Self::parse_body_inner(iter);
        if result.is_err() {
            while !iter.is_end() {
                if iter.read().is_err() {
                    break;
                }
            }
        }
        iter.clear_size_limit();
        result
    }

    fn parse_body_inner<R: Read>(iter: &mut ByteIter<R>) -> LibResult<Self> {
        let mut events = Vec::new();
        let mut running_status = None;
        loop {
            if iter.is_end() {
                invalid_file!("MTrk chunk ended before an EndOfTrack event was found");
            }
            let event = Event::parse(iter, &mut running_status)?;
            let is_track_end = event.is_end_of_track();
            events.push(event);
            if is_track_end {
                break;
            }
        }
        if !iter.is_end() {
            warn!("EndOfTrack event was followed by additional bytes in the same track chunk");
        }
        Ok(Self { events })
    }

    /// Writes the track as a complete `MTrk` chunk, appending a terminating `EndOfTrack` event if
    /// the caller didn't already end the track with one (§4.1.4).
    pub(crate) fn write<W: Write>(&self, w: &mut W) -> LibResult<()> {
        let mut body = Vec::new();
        let mut wrote_end = false;
        for event in &self.events {
            event.write(&mut body)?;
            if event.is_end_of_track() {
                wrote_end = true;
            }
        }
        if !wrote_end {
            Event::new(0, end_of_track()).write(&mut body)?;
        }
        let length = u32::try_from(body.len())
            .context(crate::error::TrackTooLong { site: site!() })?;
        w.write_all(b"MTrk").context(wr!())?;
        w.write_all(&length.to_be_bytes()).context(wr!())?;
        w.write_all(&body).context(wr!())?;
        Ok(())
    }
}
