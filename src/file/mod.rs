//! The `File` data model (§3): a `Header` plus an ordered sequence of `Track`s, each a flat
//! sequence of `Event`s. This module owns the chunk-dispatch loop that ties the header parser,
//! the track parser, and unknown-chunk forward compatibility (§4.1.2) together into one complete
//! SMF reader/writer.

mod header;
mod track;

pub mod event;
pub mod meta_event;
pub mod sysex;

pub use event::{Event, EventBody};
pub use header::{Format, Header, Ppq};
pub use meta_event::{
    KeyAccidentals, KeySignature, MetaEvent, MicrosecondsPerQuarter, SmpteOffset, TimeSignature,
};
pub use sysex::SysEx2;
pub use track::Track;

use crate::byte_iter::ByteIter;
use crate::error::LibResult;
use log::{debug, trace, warn};
use snafu::ResultExt;
use std::io::{Read, Write};
use std::path::Path;

/// The top-level container produced by the codec: a header plus the tracks it declares (§3
/// `File`). Owns every `Track`/`Event`/payload reachable from it; there is no `close()` — dropping
/// a `MidiFile` releases everything it owns, which is how Rust's ownership model retires the
/// source's explicit free.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct MidiFile {
    header: Header,
    tracks: Vec<Track>,
}

impl MidiFile {
    pub fn new(format: Format, ppq: Ppq) -> Self {
        Self {
            header: Header::new(format, ppq),
            tracks: Vec::new(),
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn tracks_len(&self) -> usize {
        self.tracks.len()
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub(crate) fn tracks_mut(&mut self) -> impl Iterator<Item = &mut Track> {
        self.tracks.iter_mut()
    }

    pub(crate) fn tracks_slice(&self) -> &[Track] {
        &self.tracks
    }

    /// Adds a track to the end of the file. Format 0 files may carry only one track (§3 `File`
    /// invariant); adding a second is rejected rather than silently producing an invalid file.
    pub fn push_track(&mut self, track: Track) -> crate::Result<()> {
        if self.header.format() == Format::Single && !self.tracks.is_empty() {
            return Err(invalid_file_e!("format 0 files may contain only one track").into());
        }
        self.tracks.push(track);
        Ok(())
    }

    fn read_from<R: Read>(mut iter: ByteIter<R>) -> LibResult<Self> {
        trace!("parsing MThd chunk");
        let (header, ntrks) = Header::parse(&mut iter)?;
        let mut tracks = Vec::with_capacity(ntrks as usize);
        // `is_end()` is a size-limit check meant for use inside a single chunk's bounded read; at
        // this level there is no size limit, and `current` still holds the previous chunk's final
        // byte until a read goes past it. Peek instead: a clean end-of-file leaves nothing left to
        // peek at, whereas a real next chunk tag does.
        while iter.peek().is_some() {
            let tag = iter.read4().context(io!())?;
            let chunk_length = iter.read_u32().context(io!())?;
            match &tag {
                b"MTrk" => {
                    trace!("parsing MTrk chunk {} (zero-based)", tracks.len());
                    match Track::parse_body(&mut iter, chunk_length) {
                        Ok(track) => tracks.push(track),
                        Err(e) => warn!(
                            "dropping track {} (zero-based): {}",
                            tracks.len(),
                            e
                        ),
                    }
                }
                b"MThd" => invalid_file!("a second MThd chunk was encountered"),
                _ => {
                    debug!(
                        "skipping unrecognized chunk '{}' ({} bytes)",
                        String::from_utf8_lossy(&tag),
                        chunk_length
                    );
                    for _ in 0..chunk_length {
                        iter.read_or_die().context(io!())?;
                    }
                }
            }
        }
        if header.format() == Format::Single && tracks.len() > 1 {
            bad_header!(
                "format 0 requires exactly one track, found {}",
                tracks.len()
            );
        }
        debug!(
            "parsed {} tracks (header declared {})",
            tracks.len(),
            ntrks
        );
        Ok(Self { header, tracks })
    }

    /// Parses a complete SMF from any `Read` source.
    pub fn read<R: Read>(r: R) -> crate::Result<Self> {
        let iter = ByteIter::new(r.bytes()).context(io!())?;
        Ok(Self::read_from(iter)?)
    }

    /// Parses a complete SMF from a file on disk (§6.2 `open`).
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let iter = ByteIter::new_file(path).context(io!())?;
        Ok(Self::read_from(iter)?)
    }

    /// Serializes the file (header followed by every track) to any `Write` sink.
    pub fn write<W: Write>(&self, w: &mut W) -> crate::Result<()> {
        self.header.write(w, self.tracks.len() as u16)?;
        for track in &self.tracks {
            track.write(w)?;
        }
        Ok(())
    }

    /// Serializes and writes a complete SMF to a file on disk (§6.2 `save`).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let mut f = std::fs::File::create(path).context(wr!())?;
        self.write(&mut f)
    }
}
