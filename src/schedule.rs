//! The tempo-aware multi-track merge-walk shared by the Time Map and the Player (§4.3, §9 "Nested
//! function pointers in Time Map"): both drive the exact same per-tick scheduling loop, differing
//! only in what they do when a step elapses and when an event fires. Reimplemented here as one
//! generic walker taking two closures, rather than duplicating the merge logic in each component.

use crate::file::event::Event;
use crate::file::meta_event::MetaEvent;
use crate::file::event::EventBody;
use crate::file::MidiFile;

/// The tick duration before the first `SetTempo` event: 500,000 µs/qn, the MIDI file default
/// tempo (120 BPM), matching `MicrosecondsPerQuarter`'s own default.
pub(crate) const DEFAULT_TEMPO_US: u32 = 500_000;

/// What the per-event callback decides after observing an event (§4.3 "Firing an event"); the
/// walker stops immediately on `Abort`, before giving any later track in the same tie-broken step
/// a chance to fire.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum WalkControl {
    Continue,
    Abort,
}

struct TrackCursor {
    index: usize,
    wait_ticks: u32,
    finished: bool,
}

/// Walks every track of `file` in tick order.
///
/// `on_step` is called once per elapsed step with `(step_us, clock_us)`, where `clock_us` already
/// reflects this step's advance — the Player uses it to decide whether/how long to sleep; the
/// Time Map ignores it.
///
/// `on_event` is called once per fired event with `(track_index, event_index, event, clock_ticks,
/// clock_us)`. `SetTempo` is always applied to the walker's own tempo before `on_event` runs,
/// regardless of what `on_event` returns — tempo must stay consistent for every consumer (§4.3
/// step 3). Ties at the same wait time fire in ascending track order (§4.3 "Tie-break").
pub(crate) fn walk<OnStep, OnEvent>(
    file: &MidiFile,
    ppq: u32,
    mut on_step: OnStep,
    mut on_event: OnEvent,
) where
    OnStep: FnMut(u64, u64),
    OnEvent: FnMut(usize, usize, &Event, u64, u64) -> WalkControl,
{
    let tracks = file.tracks_slice();
    let mut cursors: Vec<TrackCursor> = tracks
        .iter()
        .map(|t| TrackCursor {
            index: 0,
            wait_ticks: t.event(0).map(Event::delta_time).unwrap_or(0),
            finished: t.is_empty(),
        })
        .collect();

    let mut tempo_us: u32 = DEFAULT_TEMPO_US;
    let mut clock_ticks: u64 = 0;
    let mut clock_us: u64 = 0;

    loop {
        let d = cursors
            .iter()
            .filter(|c| !c.finished)
            .map(|c| c.wait_ticks)
            .min();
        let d = match d {
            Some(d) => d,
            None => break,
        };

        let step_us = (d as u64 * tempo_us as u64) / ppq as u64;
        clock_ticks += d as u64;
        clock_us += step_us;
        on_step(step_us, clock_us);

        for (track_idx, cursor) in cursors.iter_mut().enumerate() {
            if cursor.finished {
                continue;
            }
            cursor.wait_ticks -= d;
            if cursor.wait_ticks != 0 {
                continue;
            }

            let track = &tracks[track_idx];
            let event_index = cursor.index;
            let event = track
                .event(event_index)
                .expect("cursor index always points at a live event until the track finishes");

            if let EventBody::Meta(MetaEvent::SetTempo(tempo)) = event.body() {
                tempo_us = tempo.get();
            }

            let control = on_event(track_idx, event_index, event, clock_ticks, clock_us);

            cursor.index += 1;
            match track.event(cursor.index) {
                Some(next) => cursor.wait_ticks = next.delta_time(),
                None => cursor.finished = true,
            }

            if control == WalkControl::Abort {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Channel, ChannelMessage, Key, Velocity};
    use crate::file::meta_event::MicrosecondsPerQuarter;
    use crate::file::{Event, Format, Ppq, Track};

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

    /// Property P4 / Scenario S3: PPQ=480, a single `SetTempo` of 500,000 at tick 0, after
    /// advancing 480 ticks `clock_us == 500000` exactly (multiply-before-divide avoids the
    /// rounding a cached per-tick constant would introduce).
    #[test]
    fn property_p4_tempo_aware_clock() {
        let mut file = MidiFile::new(Format::Multi, Ppq::new(480).unwrap());
        let mut track = Track::new();
        track.push_event(Event::new(
            0,
            EventBody::Meta(MetaEvent::SetTempo(MicrosecondsPerQuarter::new(500_000))),
        ));
        track.push_event(note_on(480, 60));
        file.push_track(track).unwrap();

        let mut observed_us = 0u64;
        walk(
            &file,
            480,
            |_step_us, _clock_us| {},
            |_t, _i, _event, _ticks, clock_us| {
                observed_us = clock_us;
                WalkControl::Continue
            },
        );
        assert_eq!(500_000, observed_us);
    }

    /// Scenario S3: PPQ 480, SetTempo 600000 -> tick_us == 1250.
    #[test]
    fn scenario_s3_tick_duration() {
        let mut file = MidiFile::new(Format::Multi, Ppq::new(480).unwrap());
        let mut track = Track::new();
        track.push_event(Event::new(
            0,
            EventBody::Meta(MetaEvent::SetTempo(MicrosecondsPerQuarter::new(600_000))),
        ));
        track.push_event(note_on(1, 60));
        file.push_track(track).unwrap();

        let mut step_us_observed = 0u64;
        walk(
            &file,
            480,
            |step_us, _clock_us| step_us_observed = step_us,
            |_t, _i, _event, _ticks, _us| WalkControl::Continue,
        );
        assert_eq!(1250, step_us_observed);
    }

    #[test]
    fn ties_fire_in_track_order() {
        let mut file = MidiFile::new(Format::Multi, Ppq::new(480).unwrap());
        let mut track_a = Track::new();
        track_a.push_event(note_on(0, 60));
        let mut track_b = Track::new();
        track_b.push_event(note_on(0, 61));
        file.push_track(track_a).unwrap();
        file.push_track(track_b).unwrap();

        let mut order = Vec::new();
        walk(
            &file,
            480,
            |_s, _c| {},
            |t, _i, _event, _ticks, _us| {
                order.push(t);
                WalkControl::Continue
            },
        );
        assert_eq!(vec![0, 1], order);
    }

    #[test]
    fn abort_stops_before_later_events() {
        let mut file = MidiFile::new(Format::Multi, Ppq::new(480).unwrap());
        let mut track = Track::new();
        track.push_event(note_on(0, 60));
        track.push_event(note_on(0, 61));
        track.push_event(note_on(0, 62));
        file.push_track(track).unwrap();

        let mut fired = 0;
        walk(
            &file,
            480,
            |_s, _c| {},
            |_t, _i, _event, _ticks, _us| {
                fired += 1;
                if fired == 2 {
                    WalkControl::Abort
                } else {
                    WalkControl::Continue
                }
            },
        );
        assert_eq!(2, fired);
    }
}
