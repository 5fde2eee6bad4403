//! The Time Map (§4.2): reconstructs absolute note intervals by driving the shared scheduling walk
//! (`schedule::walk`) with a no-op step callback and a note-pairing observer, rather than
//! duplicating the merge-over-tracks logic the Player also needs.

use crate::core::{Channel, Key};
use crate::file::event::EventBody;
use crate::file::MidiFile;
use crate::schedule::{self, WalkControl};

/// Sentinel `end_us` for a note that was never closed by a matching NoteOff (§3 `AbsoluteNote`:
/// "`end_us = UINT_MAX` means the note was never closed").
pub const UNCLOSED: u64 = u64::MAX;

/// A weak reference to an event within the `MidiFile` the Time Map was built from: a (track,
/// event) index pair rather than a borrowed pointer, so `AbsoluteNote`s don't tie up a borrow of
/// the file they describe (§3 "Time Map entries *reference* events within a File and must not
/// outlive it").
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct EventRef {
    pub track: usize,
    pub event: usize,
}

impl EventRef {
    fn new(track: usize, event: usize) -> Self {
        Self { track, event }
    }
}

/// One reconstructed note interval (§3 `AbsoluteNote`). `channel`/`key` are kept privately to
/// drive NoteOff matching during construction; callers who need them can re-derive them from
/// `on_event(file)`'s payload.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct AbsoluteNote {
    track: u16,
    channel: Channel,
    key: Key,
    on_event: EventRef,
    off_event: Option<EventRef>,
    start_us: u64,
    end_us: u64,
}

impl AbsoluteNote {
    pub fn track(&self) -> u16 {
        self.track
    }

    pub fn on_event_ref(&self) -> EventRef {
        self.on_event
    }

    pub fn off_event_ref(&self) -> Option<EventRef> {
        self.off_event
    }

    pub fn start_us(&self) -> u64 {
        self.start_us
    }

    pub fn end_us(&self) -> u64 {
        self.end_us
    }

    /// `true` if a matching NoteOff (or velocity-0 NoteOn) closed this note (§8 Property P5).
    pub fn is_closed(&self) -> bool {
        self.end_us != UNCLOSED
    }

    /// Looks up the NoteOn event this entry describes in its owning file.
    pub fn on_event<'f>(&self, file: &'f MidiFile) -> &'f crate::file::Event {
        file.track(self.on_event.track)
            .and_then(|t| t.event(self.on_event.event))
            .expect("AbsoluteNote outlived the MidiFile it was built from")
    }

    /// Looks up the NoteOff event this entry describes, if it was ever closed.
    pub fn off_event<'f>(&self, file: &'f MidiFile) -> Option<&'f crate::file::Event> {
        let r = self.off_event?;
        file.track(r.track).and_then(|t| t.event(r.event))
    }

    fn is_open_match(&self, track_idx: usize, channel: Channel, key: Key) -> bool {
        !self.is_closed() && self.track as usize == track_idx && self.channel == channel && self.key == key
    }
}

/// Builds the absolute-time note map for every track of `file` (§4.2, §6.2 `map_absolute_time`).
///
/// Pairing policy: a NoteOn opens a new entry with `end_us = UNCLOSED`. A NoteOff (or a NoteOn
/// with velocity 0, per §8 Property P6) closes the most-recently-opened still-open entry on the
/// same `(track, channel, key)` — scanning from most recent to oldest, not first-opened, so
/// overlapping same-key NoteOns pair LIFO. Entries nothing ever closes are left `UNCLOSED`; that
/// is an allowed outcome, not an error (§8 Property P5, Scenario S6).
pub fn map_absolute_time(file: &MidiFile) -> Vec<AbsoluteNote> {
    let ppq = file.header().ppq().get() as u32;
    let mut notes: Vec<AbsoluteNote> = Vec::new();

    schedule::walk(
        file,
        ppq,
        |_step_us, _clock_us| {},
        |track_idx, event_idx, event, _clock_ticks, clock_us| {
            if let EventBody::Channel(msg) = event.body() {
                if let Some((channel, key, _velocity)) = msg.as_note_on() {
                    notes.push(AbsoluteNote {
                        track: track_idx as u16,
                        channel,
                        key,
                        on_event: EventRef::new(track_idx, event_idx),
                        off_event: None,
                        start_us: clock_us,
                        end_us: UNCLOSED,
                    });
                } else if let Some((channel, key, _velocity)) = msg.as_note_off() {
                    if let Some(note) = notes
                        .iter_mut()
                        .rev()
                        .find(|n| n.is_open_match(track_idx, channel, key))
                    {
                        note.off_event = Some(EventRef::new(track_idx, event_idx));
                        note.end_us = clock_us;
                    }
                }
            }
            WalkControl::Continue
        },
    );

    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChannelMessage, Velocity};
    use crate::file::event::EventBody;
    use crate::file::meta_event::MicrosecondsPerQuarter;
    use crate::file::meta_event::MetaEvent;
    use crate::file::{Event, Format, Ppq, Track};

    fn note(delta: u32, channel: u8, key: u8, velocity: u8) -> Event {
        Event::new(
            delta,
            EventBody::Channel(ChannelMessage::NoteOn {
                channel: Channel::new(channel),
                key: Key::new(key),
                velocity: Velocity::new(velocity),
            }),
        )
    }

    fn note_off(delta: u32, channel: u8, key: u8) -> Event {
        Event::new(
            delta,
            EventBody::Channel(ChannelMessage::NoteOff {
                channel: Channel::new(channel),
                key: Key::new(key),
                velocity: Velocity::new(64),
            }),
        )
    }

    /// Scenario S6: one unterminated NoteOn yields exactly one entry with `end_us == UNCLOSED`.
    #[test]
    fn scenario_s6_unterminated_note() {
        let mut file = MidiFile::new(Format::Multi, Ppq::new(96).unwrap());
        let mut track = Track::new();
        track.push_event(note(0, 0, 60, 64));
        file.push_track(track).unwrap();

        let notes = map_absolute_time(&file);
        assert_eq!(1, notes.len());
        assert_eq!(UNCLOSED, notes[0].end_us());
        assert!(!notes[0].is_closed());
    }

    /// Property P5 / P6: a plain NoteOff and a velocity-0 NoteOn both close a prior NoteOn with
    /// the correct `end_us`.
    #[test]
    fn note_off_and_velocity_zero_note_on_both_close() {
        let mut file = MidiFile::new(Format::Multi, Ppq::new(96).unwrap());
        let mut track = Track::new();
        track.push_event(note(0, 0, 60, 64));
        track.push_event(note_off(96, 0, 60));
        track.push_event(note(0, 0, 62, 64));
        track.push_event(note(96, 0, 62, 0)); // velocity-0 NoteOn == NoteOff
        file.push_track(track).unwrap();

        let notes = map_absolute_time(&file);
        assert_eq!(2, notes.len());
        assert!(notes[0].is_closed());
        assert!(notes[1].is_closed());
        assert_eq!(notes[0].end_us(), notes[0].start_us() + 96 * 500_000 / 96);
    }

    #[test]
    fn overlapping_same_key_notes_pair_most_recent_first() {
        let mut file = MidiFile::new(Format::Multi, Ppq::new(96).unwrap());
        let mut track = Track::new();
        track.push_event(note(0, 0, 60, 64)); // note A
        track.push_event(note(0, 0, 60, 70)); // note B, same key, overlapping
        track.push_event(note_off(48, 0, 60)); // should close B (most recent)
        track.push_event(note_off(48, 0, 60)); // should close A
        file.push_track(track).unwrap();

        let notes = map_absolute_time(&file);
        assert_eq!(2, notes.len());
        assert!(notes[0].is_closed());
        assert!(notes[1].is_closed());
        // B (pushed second) closed by the first NoteOff, so it ends before or with A.
        assert!(notes[1].end_us() <= notes[0].end_us());
    }

    #[test]
    fn tempo_change_mid_track_affects_subsequent_absolute_times() {
        let mut file = MidiFile::new(Format::Multi, Ppq::new(480).unwrap());
        let mut track = Track::new();
        track.push_event(Event::new(
            0,
            EventBody::Meta(MetaEvent::SetTempo(MicrosecondsPerQuarter::new(500_000))),
        ));
        track.push_event(note(480, 0, 60, 64));
        track.push_event(Event::new(
            0,
            EventBody::Meta(MetaEvent::SetTempo(MicrosecondsPerQuarter::new(250_000))),
        ));
        track.push_event(note_off(480, 0, 60));
        file.push_track(track).unwrap();

        let notes = map_absolute_time(&file);
        assert_eq!(1, notes.len());
        assert_eq!(500_000, notes[0].start_us());
        // second half runs at half the tick duration (250_000/480 per tick)
        assert_eq!(500_000 + 480 * 250_000 / 480, notes[0].end_us());
    }
}
