//! Key-signature transposition (§4.4): a 30-row circle-of-fifths table (15 major, 15 minor) gives
//! the tonic pitch class for every key signature the codec can represent. `transpose` uses it to
//! compute the semitone delta between a file's first `KeySignature` event and a caller-supplied
//! target, applies that delta to every NoteOn/NoteOff key in the file, and overwrites the source
//! `KeySignature` event to match the target.

use crate::core::{ChannelMessage, Key};
use crate::file::event::EventBody;
use crate::file::meta_event::{KeySignature, MetaEvent};
use crate::file::MidiFile;

/// One row of the transposition table: `sf` sharps(+)/flats(-), `mi` mode (`0` major, `1` minor),
/// the tonic's pitch class in `0..=11`, and a display label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEntry {
    pub sf: i8,
    pub mi: u8,
    pub tonic_pc: u8,
    pub label: &'static str,
}

const MAJOR_LABELS: [&str; 15] = [
    "Cb major", "Gb major", "Db major", "Ab major", "Eb major", "Bb major", "F major", "C major",
    "G major", "D major", "A major", "E major", "B major", "F# major", "C# major",
];

/// Relative minors of the same row in `MAJOR_LABELS`, in traditional (not enharmonically
/// respelled) circle-of-fifths order.
const MINOR_LABELS: [&str; 15] = [
    "Ab minor", "Eb minor", "Bb minor", "F minor", "C minor", "G minor", "D minor", "A minor",
    "E minor", "B minor", "F# minor", "C# minor", "G# minor", "D# minor", "A# minor",
];

fn major_tonic_pc(sf: i8) -> u8 {
    (7 * sf as i32).rem_euclid(12) as u8
}

/// The relative minor's tonic sits a minor third below the major tonic of the same `sf`.
fn minor_tonic_pc(sf: i8) -> u8 {
    (major_tonic_pc(sf) as i32 - 3).rem_euclid(12) as u8
}

fn tonic_pc(sf: i8, mi: u8) -> u8 {
    if mi == 1 {
        minor_tonic_pc(sf)
    } else {
        major_tonic_pc(sf)
    }
}

/// Builds the 30-row transposition table. Built fresh on each call — at 30 rows of cheap
/// arithmetic this isn't worth caching behind a `once_cell`/`lazy_static` dependency.
pub fn transposition_table() -> Vec<KeyEntry> {
    let mut table = Vec::with_capacity(30);
    for (i, sf) in (-7i8..=7).enumerate() {
        table.push(KeyEntry {
            sf,
            mi: 0,
            tonic_pc: major_tonic_pc(sf),
            label: MAJOR_LABELS[i],
        });
    }
    for (i, sf) in (-7i8..=7).enumerate() {
        table.push(KeyEntry {
            sf,
            mi: 1,
            tonic_pc: minor_tonic_pc(sf),
            label: MINOR_LABELS[i],
        });
    }
    table
}

/// `key mod 12 ∈ {1,3,6,8,10}` (§6.2): true for the five "black key" pitch classes.
pub fn is_sharp(key: u8) -> bool {
    matches!(key % 12, 1 | 3 | 6 | 8 | 10)
}

/// The first `KeySignature` meta-event in file order (tracks in order, events within a track in
/// order), if any.
pub fn get_key_signature(file: &MidiFile) -> Option<KeySignature> {
    for track in file.tracks() {
        for event in track.events() {
            if let EventBody::Meta(MetaEvent::KeySignature(ks)) = event.body() {
                return Some(*ks);
            }
        }
    }
    None
}

/// Transposes every NoteOn/NoteOff key in `file` from its first `KeySignature` event to `target`,
/// and overwrites that event to match. Returns the semitone delta (`0..=11`) that was applied.
///
/// Rejects a transposition that crosses major/minor (§4.4 step 1) and a file with no
/// `KeySignature` event to transpose from, since there would be no source key to measure from.
pub fn transpose(file: &mut MidiFile, target: KeySignature) -> crate::Result<i8> {
    let source = get_key_signature(file)
        .ok_or_else(|| -> crate::Error {
            invalid_file_e!("file has no KeySignature event to transpose from").into()
        })?;
    if source.is_minor() != target.is_minor() {
        return Err(crate::error::KeyModeMismatch { site: site!() }.build().into());
    }

    let delta = (tonic_pc(target.sf.get(), target.mi) as i16
        - tonic_pc(source.sf.get(), source.mi) as i16)
        .rem_euclid(12) as i8;

    let mut replaced_key_signature = false;
    for track in file.tracks_mut() {
        for event in track.events_mut() {
            match event.body_mut() {
                EventBody::Channel(msg) => apply_delta(msg, delta),
                EventBody::Meta(MetaEvent::KeySignature(ks)) if !replaced_key_signature => {
                    *ks = target;
                    replaced_key_signature = true;
                }
                _ => {}
            }
        }
    }

    Ok(delta)
}

fn apply_delta(msg: &mut ChannelMessage, delta: i8) {
    if let ChannelMessage::NoteOn { key, .. } | ChannelMessage::NoteOff { key, .. } = msg {
        let shifted = (key.get() as i16 + delta as i16).clamp(0, 127) as u8;
        *key = Key::new(shifted);
    }
}
