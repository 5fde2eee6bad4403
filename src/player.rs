//! The Player (§4.3): a tick-ordered multi-track scheduler built on the same merge-walk the Time
//! Map uses, dispatching NoteOn/NoteOff/ProgramChange events to an injected synth sink and sleeping
//! between steps through an injected clock. Both collaborators are external to this crate (§1,
//! §6.3, §9 "Platform synth backend" / "Cross-platform high-resolution sleep") — the Player only
//! knows their trait shape, not how FluidSynth, Win32 MM, or a real sleep are implemented.

use crate::file::event::EventBody;
use crate::file::{Event, MidiFile};
use crate::schedule::{self, WalkControl};
use log::warn;

/// What a firing event should do to the synth sink (§4.3 "Firing an event").
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlayControl {
    /// Apply the event's side effect (dispatch the note/program-change) if it has one.
    Play,
    /// Surface the event to the callback but skip its side effect.
    Ignore,
    /// Stop the scheduler immediately, before this or any later event in the same tied step
    /// fires its side effect.
    Abort,
}

/// The audio backend the Player dispatches note and program-change messages to (§6.3). Two
/// concrete backends exist in the system this crate replaces (FluidSynth on Unix, Win32
/// multimedia on Windows); this crate depends only on this trait, chosen by the caller at
/// construction time.
pub trait SynthSink {
    type Error: std::fmt::Display;

    fn open(&mut self) -> Result<(), Self::Error>;
    fn close(&mut self);
    fn reset(&mut self) -> Result<(), Self::Error>;
    fn program_change(&mut self, channel: u8, program: u8) -> Result<(), Self::Error>;
    fn note(&mut self, key: u8, channel: u8, velocity: u8, on: bool) -> Result<(), Self::Error>;
}

/// The high-resolution sleep primitive the Player blocks on between scheduling steps (§6.3 "tick
/// clock", §9 "Cross-platform high-resolution sleep"). Injectable so tests can run a whole file's
/// schedule without actually waiting in real time.
pub trait Clock {
    fn sleep_microseconds(&mut self, micros: u64);
}

/// A `Clock` that never sleeps, for tests and for fast-forwarding through a whole file (`start_us
/// = u64::MAX` skips every step's sleep per §4.3 step 3, making this the natural choice when the
/// caller only wants final-state side effects without wall-clock delay).
#[derive(Clone, Copy, Debug, Default)]
pub struct NullClock;

impl Clock for NullClock {
    fn sleep_microseconds(&mut self, _micros: u64) {}
}

/// The result of driving one `Player::play` call to completion or to an `Abort`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlayOutcome {
    /// Every track ran out of events.
    Finished,
    /// The callback returned `Abort` on some event; playback stopped before that event's side
    /// effect (if any) was dispatched.
    Aborted,
}

/// Owns the synth sink and clock for the duration of one `play()` call (§5 "the synth sink is
/// assumed exclusively owned by the Player for the duration of `play()`").
pub struct Player<S: SynthSink, C: Clock> {
    sink: S,
    clock: C,
}

impl<S: SynthSink, C: Clock> Player<S, C> {
    pub fn new(sink: S, clock: C) -> Self {
        Self { sink, clock }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Runs the scheduling loop over every track of `file` (§4.3 "Scheduling loop"), invoking
    /// `callback` for every event fired and dispatching NoteOn/NoteOff/ProgramChange side effects
    /// to the synth sink per `callback`'s `PlayControl` verdict. `SetTempo` is always applied
    /// internally by the shared walk, regardless of what the callback returns (§4.3 step 3).
    ///
    /// Events before `start_us` are fast-forwarded without sleeping but still dispatched once
    /// `clock_us` reaches `start_us` (§4.3 step 3, step 5); a synth sink error is logged and
    /// playback continues (§7 "Player errors from the synth sink are logged but do not stop
    /// playback").
    pub fn play<F>(&mut self, file: &MidiFile, start_us: u64, mut callback: F) -> PlayOutcome
    where
        F: FnMut(&Event, u16, u64, u64) -> PlayControl,
    {
        let ppq = file.header().ppq().get() as u32;
        let sink = &mut self.sink;
        let clock = &mut self.clock;
        let mut outcome = PlayOutcome::Finished;

        schedule::walk(
            file,
            ppq,
            |step_us, clock_us| {
                if clock_us >= start_us {
                    clock.sleep_microseconds(step_us);
                }
            },
            |track_idx, _event_idx, event, clock_ticks, clock_us| {
                let control = callback(event, track_idx as u16, clock_ticks, clock_us);
                match control {
                    PlayControl::Abort => {
                        outcome = PlayOutcome::Aborted;
                        return WalkControl::Abort;
                    }
                    PlayControl::Ignore => return WalkControl::Continue,
                    PlayControl::Play => {}
                }

                if let EventBody::Channel(msg) = event.body() {
                    if let Some((channel, key, velocity)) = msg.as_note_on() {
                        if clock_us >= start_us {
                            if let Err(e) = sink.note(key.get(), channel.get(), velocity.get(), true) {
                                warn!("synth sink rejected note-on: {}", e);
                            }
                        }
                    } else if let Some((channel, key, velocity)) = msg.as_note_off() {
                        if clock_us >= start_us {
                            if let Err(e) = sink.note(key.get(), channel.get(), velocity.get(), false) {
                                warn!("synth sink rejected note-off: {}", e);
                            }
                        }
                    } else if let crate::core::ChannelMessage::ProgramChange { channel, program } = msg
                    {
                        if let Err(e) = sink.program_change(channel.get(), program.get()) {
                            warn!("synth sink rejected program change: {}", e);
                        }
                    }
                }
                WalkControl::Continue
            },
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Channel, ChannelMessage, Key, Velocity};
    use crate::file::{Format, Ppq, Track};
    use std::cell::RefCell;
    use std::fmt;
    use std::rc::Rc;

    #[derive(Debug)]
    struct NeverError;
    impl fmt::Display for NeverError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "never")
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        notes: Rc<RefCell<Vec<(u8, u8, u8, bool)>>>,
        programs: Rc<RefCell<Vec<(u8, u8)>>>,
    }

    impl SynthSink for RecordingSink {
        type Error = NeverError;
        fn open(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
        fn close(&mut self) {}
        fn reset(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
        fn program_change(&mut self, channel: u8, program: u8) -> Result<(), Self::Error> {
            self.programs.borrow_mut().push((channel, program));
            Ok(())
        }
        fn note(&mut self, key: u8, channel: u8, velocity: u8, on: bool) -> Result<(), Self::Error> {
            self.notes.borrow_mut().push((key, channel, velocity, on));
            Ok(())
        }
    }

    fn note_on(delta: u32, key: u8) -> Event {
        Event::new(
            delta,
            EventBody::Channel(ChannelMessage::NoteOn {
                channel: Channel::new(0),
                key: Key::new(key),
                velocity: Velocity::new(64),
            }),
        )
    }

    fn note_off(delta: u32, key: u8) -> Event {
        Event::new(
            delta,
            EventBody::Channel(ChannelMessage::NoteOff {
                channel: Channel::new(0),
                key: Key::new(key),
                velocity: Velocity::new(64),
            }),
        )
    }

    /// Scenario S5: a callback that returns `Abort` on the third event stops before that event's
    /// side effect dispatches.
    #[test]
    fn scenario_s5_abort_stops_before_third_event_side_effect() {
        let mut file = MidiFile::new(Format::Multi, Ppq::new(480).unwrap());
        let mut track = Track::new();
        track.push_event(note_on(0, 60));
        track.push_event(note_on(0, 61));
        track.push_event(note_on(0, 62));
        file.push_track(track).unwrap();

        let sink = RecordingSink::default();
        let notes_seen = sink.notes.clone();
        let mut player = Player::new(sink, NullClock);

        let mut fired = 0;
        let outcome = player.play(&file, 0, |_event, _track, _ticks, _us| {
            fired += 1;
            if fired == 3 {
                PlayControl::Abort
            } else {
                PlayControl::Play
            }
        });

        assert_eq!(PlayOutcome::Aborted, outcome);
        assert_eq!(3, fired);
        assert_eq!(2, notes_seen.borrow().len());
    }

    /// Velocity-0 NoteOn dispatches as a NoteOff to the synth sink (§4.3 step 5, §8 Property P6).
    #[test]
    fn velocity_zero_note_on_dispatches_as_note_off() {
        let mut file = MidiFile::new(Format::Multi, Ppq::new(480).unwrap());
        let mut track = Track::new();
        track.push_event(note_on(0, 60));
        track.push_event(Event::new(
            480,
            EventBody::Channel(ChannelMessage::NoteOn {
                channel: Channel::new(0),
                key: Key::new(60),
                velocity: Velocity::new(0),
            }),
        ));
        file.push_track(track).unwrap();

        let sink = RecordingSink::default();
        let notes_seen = sink.notes.clone();
        let mut player = Player::new(sink, NullClock);
        player.play(&file, 0, |_e, _t, _ticks, _us| PlayControl::Play);

        let notes = notes_seen.borrow();
        assert_eq!(2, notes.len());
        assert_eq!((60, 0, 64, true), notes[0]);
        assert_eq!((60, 0, 0, false), notes[1]);
    }

    #[test]
    fn ignore_skips_side_effect_but_still_advances() {
        let mut file = MidiFile::new(Format::Multi, Ppq::new(480).unwrap());
        let mut track = Track::new();
        track.push_event(note_on(0, 60));
        track.push_event(note_off(480, 60));
        file.push_track(track).unwrap();

        let sink = RecordingSink::default();
        let notes_seen = sink.notes.clone();
        let mut player = Player::new(sink, NullClock);
        let outcome = player.play(&file, 0, |_e, _t, _ticks, _us| PlayControl::Ignore);

        assert_eq!(PlayOutcome::Finished, outcome);
        assert!(notes_seen.borrow().is_empty());
    }

    #[test]
    fn program_change_dispatches_regardless_of_start_us() {
        let mut file = MidiFile::new(Format::Multi, Ppq::new(480).unwrap());
        let mut track = Track::new();
        track.push_event(Event::new(
            0,
            EventBody::Channel(ChannelMessage::ProgramChange {
                channel: Channel::new(2),
                program: crate::core::Program::new(40),
            }),
        ));
        file.push_track(track).unwrap();

        let sink = RecordingSink::default();
        let programs_seen = sink.programs.clone();
        let mut player = Player::new(sink, NullClock);
        // start_us far in the future: notes would be suppressed, program change still applies.
        player.play(&file, u64::MAX, |_e, _t, _ticks, _us| PlayControl::Play);

        assert_eq!(vec![(2, 40)], *programs_seen.borrow());
    }
}
