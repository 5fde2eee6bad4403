//! A library for reading, manipulating, writing, and scheduling playback of Standard MIDI Files
//! (SMF, format 0/1/2).
//!
//! Three layered pieces share one event model:
//!
//! - [`file`]: the binary codec for the SMF container and its event variants — chunk framing,
//!   variable-length quantities, running-status decoding, and meta-event framing. [`MidiFile`] is
//!   the in-memory model everything else operates on.
//! - [`time_map`]: walks every track in tick order maintaining a tempo-aware clock, pairing
//!   NoteOn/NoteOff events into absolute-time intervals.
//! - [`player`]: the same tick-ordered walk, driving a caller-supplied callback and dispatching
//!   note/program-change events to an injected synth sink at an injected clock's pace.
//!
//! The audio backend and the high-resolution sleep primitive are external collaborators this
//! crate only depends on through the [`player::SynthSink`] and [`player::Clock`] traits; this
//! crate implements neither.

#![allow(dead_code)]

#[macro_use]
mod error;
#[macro_use]
mod clamp;
#[macro_use]
mod macros;

mod byte_iter;
mod vlq;
mod text;

pub mod core;
pub mod file;
mod schedule;
pub mod player;
pub mod time_map;
pub mod transpose;

pub use error::{Error, Result};
pub use file::{
    Event, EventBody, Format, Header, KeyAccidentals, KeySignature, MetaEvent, MicrosecondsPerQuarter,
    MidiFile, Ppq, SmpteOffset, SysEx2, TimeSignature, Track,
};
pub use player::{Clock, NullClock, PlayControl, PlayOutcome, Player, SynthSink};
pub use time_map::{map_absolute_time, AbsoluteNote, EventRef, UNCLOSED};
pub use transpose::{get_key_signature, is_sharp, transpose, transposition_table, KeyEntry};
