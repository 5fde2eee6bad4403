//! Meta-events: `0xFF <type> <VLQ length> <payload>`. Defined by the MIDI file spec, not the wire
//! protocol proper — they carry metadata (tempo, key signature, text) rather than performance
//! data, and running status never applies to them.

use crate::byte_iter::ByteIter;
use crate::core::{Channel, Port};
use crate::error::LibResult;
use crate::text::Text;
use log::warn;
use snafu::ResultExt;
use std::io::{Read, Write};

pub(crate) const META_SEQUENCE_NUM: u8 = 0x00;
pub(crate) const META_TEXT: u8 = 0x01;
pub(crate) const META_COPYRIGHT: u8 = 0x02;
pub(crate) const META_TRACK_NAME: u8 = 0x03;
pub(crate) const META_INSTR_NAME: u8 = 0x04;
pub(crate) const META_LYRIC: u8 = 0x05;
pub(crate) const META_MARKER: u8 = 0x06;
pub(crate) const META_CUE_POINT: u8 = 0x07;
pub(crate) const META_PROG_NAME: u8 = 0x08;
pub(crate) const META_DEVICE_NAME: u8 = 0x09;
pub(crate) const META_CHAN_PREFIX: u8 = 0x20;
pub(crate) const META_PORT: u8 = 0x21;
pub(crate) const META_END_OF_TRACK: u8 = 0x2f;
pub(crate) const META_SET_TEMPO: u8 = 0x51;
pub(crate) const META_SMPTE_OFFSET: u8 = 0x54;
pub(crate) const META_TIME_SIG: u8 = 0x58;
pub(crate) const META_KEY_SIG: u8 = 0x59;
pub(crate) const META_SYSEX_ESCAPE: u8 = 0x7f;

const LEN_CHAN_PREFIX: u32 = 1;
const LEN_PORT: u32 = 1;
const LEN_END_OF_TRACK: u32 = 0;
const LEN_SET_TEMPO: u32 = 3;
const LEN_SEQUENCE_NUM: u32 = 2;
const LEN_SMPTE_OFFSET: u32 = 5;
const LEN_TIME_SIG: u32 = 4;
const LEN_KEY_SIG: u32 = 2;

/// 1-3 microseconds-per-quarter-note, stored as a 24-bit big-endian integer on the wire.
clamp!(MicrosecondsPerQuarter, u32, 1, 16_777_215, 500_000, pub);

/// `sf`: flats (negative) or sharps (positive) in a key signature, `-7..=7`.
clamp!(KeyAccidentals, i8, -7, 7, 0, pub);

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct SmpteOffset {
    pub hr: u8,
    pub mn: u8,
    pub se: u8,
    pub fr: u8,
    pub ff: u8,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct TimeSignature {
    pub numerator: u8,
    /// Denominator expressed as the MIDI file's negative power of two (2 == quarter-note).
    pub denominator_power: u8,
    pub click: u8,
    pub notated_32nds_per_quarter: u8,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct KeySignature {
    pub sf: KeyAccidentals,
    /// `0` major, `1` minor. Any other value is out of spec; parsing warns but preserves it
    /// verbatim so a round-tripped file stays byte-identical in content.
    pub mi: u8,
}

impl KeySignature {
    pub fn is_minor(&self) -> bool {
        self.mi == 1
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum MetaEvent {
    SequenceNumber(u16),
    Text(Text),
    Copyright(Text),
    SequenceName(Text),
    InstrumentName(Text),
    Lyric(Text),
    Marker(Text),
    CuePoint(Text),
    ProgramName(Text),
    DeviceName(Text),
    ChannelPrefix(Channel),
    MidiPort(Port),
    EndOfTrack,
    SetTempo(MicrosecondsPerQuarter),
    SmpteOffset(SmpteOffset),
    TimeSignature(TimeSignature),
    KeySignature(KeySignature),
    /// `FF 7F <len> <data>`: a SysEx-style escape sequence, manufacturer id plus payload.
    SysEx(Text),
    /// A meta-event type this codec doesn't interpret. Preserved verbatim (type byte and raw
    /// payload) so unrecognized-but-well-formed events survive a round trip unchanged.
    Unknown { meta_type: u8, data: Vec<u8> },
}

impl MetaEvent {
    pub(crate) fn parse<R: Read>(iter: &mut ByteIter<R>) -> LibResult<Self> {
        iter.read_expect(0xff).context(io!())?;
        let meta_type = iter.read_or_die().context(io!())?;
        match meta_type {
            META_SEQUENCE_NUM => {
                let bytes = Self::read_payload_strict(iter, LEN_SEQUENCE_NUM)?;
                let b = fixed_len_bytes::<2>(&bytes).expect("length checked by read_payload_strict");
                Ok(MetaEvent::SequenceNumber(u16::from_be_bytes(b)))
            }
            META_TEXT..=META_DEVICE_NAME => Self::parse_text(iter, meta_type),
            META_CHAN_PREFIX => {
                let bytes = Self::read_payload(iter, LEN_CHAN_PREFIX)?;
                let raw = byte_at(&bytes, 0);
                if raw > 15 {
                    warn!("channel prefix {} is out of the 0..=15 range, clamping", raw);
                }
                Ok(MetaEvent::ChannelPrefix(Channel::new(raw)))
            }
            META_PORT => {
                let bytes = Self::read_payload(iter, LEN_PORT)?;
                Ok(MetaEvent::MidiPort(Port::new(byte_at(&bytes, 0))))
            }
            META_END_OF_TRACK => {
                Self::read_payload(iter, LEN_END_OF_TRACK)?;
                Ok(MetaEvent::EndOfTrack)
            }
            META_SET_TEMPO => {
                let bytes = Self::read_payload_strict(iter, LEN_SET_TEMPO)?;
                let b = fixed_len_bytes::<3>(&bytes).expect("length checked by read_payload_strict");
                let value = u32::from_be_bytes([0, b[0], b[1], b[2]]);
                Ok(MetaEvent::SetTempo(MicrosecondsPerQuarter::new(value)))
            }
            META_SMPTE_OFFSET => {
                let bytes = Self::read_payload(iter, LEN_SMPTE_OFFSET)?;
                Ok(MetaEvent::SmpteOffset(SmpteOffset {
                    hr: byte_at(&bytes, 0),
                    mn: byte_at(&bytes, 1),
                    se: byte_at(&bytes, 2),
                    fr: byte_at(&bytes, 3),
                    ff: byte_at(&bytes, 4),
                }))
            }
            META_TIME_SIG => {
                let bytes = Self::read_payload(iter, LEN_TIME_SIG)?;
                Ok(MetaEvent::TimeSignature(TimeSignature {
                    numerator: byte_at(&bytes, 0),
                    denominator_power: byte_at(&bytes, 1),
                    click: byte_at(&bytes, 2),
                    notated_32nds_per_quarter: byte_at(&bytes, 3),
                }))
            }
            META_KEY_SIG => {
                let bytes = Self::read_payload(iter, LEN_KEY_SIG)?;
                let mi = byte_at(&bytes, 1);
                if mi != 0 && mi != 1 {
                    warn!("key signature mode byte {} is neither major (0) nor minor (1)", mi);
                }
                Ok(MetaEvent::KeySignature(KeySignature {
                    sf: KeyAccidentals::new(byte_at(&bytes, 0) as i8),
                    mi,
                }))
            }
            META_SYSEX_ESCAPE => {
                let length = iter.read_vlq_u32().context(io!())?;
                let bytes = iter.read_n(length as usize).context(io!())?;
                Ok(MetaEvent::SysEx(bytes.into()))
            }
            _ => {
                let length = iter.read_vlq_u32().context(io!())?;
                let data = iter.read_n(length as usize).context(io!())?;
                warn!("unrecognized meta-event type {:#04x}, preserving raw bytes", meta_type);
                Ok(MetaEvent::Unknown { meta_type, data })
            }
        }
    }

    fn parse_text<R: Read>(iter: &mut ByteIter<R>, meta_type: u8) -> LibResult<Self> {
        let length = iter.read_vlq_u32().context(io!())?;
        let bytes = iter.read_n(length as usize).context(io!())?;
        let text: Text = bytes.into();
        Ok(match meta_type {
            META_TEXT => MetaEvent::Text(text),
            META_COPYRIGHT => MetaEvent::Copyright(text),
            META_TRACK_NAME => MetaEvent::SequenceName(text),
            META_INSTR_NAME => MetaEvent::InstrumentName(text),
            META_LYRIC => MetaEvent::Lyric(text),
            META_MARKER => MetaEvent::Marker(text),
            META_CUE_POINT => MetaEvent::CuePoint(text),
            META_PROG_NAME => MetaEvent::ProgramName(text),
            META_DEVICE_NAME => MetaEvent::DeviceName(text),
            _ => unreachable!("meta_type {} is outside the text range", meta_type),
        })
    }

    /// Reads a VLQ length then that many bytes, warning (not failing) if the length disagrees
    /// with the canonical fixed size for this meta-event type. Used for meta-events whose width
    /// is cosmetic: a wrong-length `ChannelPrefix`/`Port`/`SmpteOffset`/`TimeSignature`/
    /// `KeySignature` still has a sensible (if maybe wrong) value to extract.
    fn read_payload<R: Read>(iter: &mut ByteIter<R>, expected: u32) -> LibResult<Vec<u8>> {
        let length = iter.read_vlq_u32().context(io!())?;
        if length != expected {
            warn!(
                "meta-event length mismatch: expected {}, got {}",
                expected, length
            );
        }
        iter.read_n(length as usize).context(io!())
    }

    /// Like `read_payload`, but a length disagreement is a fatal `LengthMismatch` rather than a
    /// warning: used for `SequenceNumber`/`SetTempo`, whose width is semantic (a truncated tempo
    /// or sequence number value isn't a usable fallback, unlike a truncated text payload).
    fn read_payload_strict<R: Read>(iter: &mut ByteIter<R>, expected: u32) -> LibResult<Vec<u8>> {
        let length = iter.read_vlq_u32().context(io!())?;
        if length != expected {
            return Err(crate::error::LibError::LengthMismatch {
                site: site!(),
                expected,
                got: length,
            });
        }
        iter.read_n(length as usize).context(io!())
    }

    pub(crate) fn write<W: Write>(&self, w: &mut W) -> LibResult<()> {
        write_u8!(w, 0xff)?;
        match self {
            MetaEvent::SequenceNumber(n) => {
                write_fixed(w, META_SEQUENCE_NUM, &n.to_be_bytes())
            }
            MetaEvent::Text(s) => write_text(w, META_TEXT, s),
            MetaEvent::Copyright(s) => write_text(w, META_COPYRIGHT, s),
            MetaEvent::SequenceName(s) => write_text(w, META_TRACK_NAME, s),
            MetaEvent::InstrumentName(s) => write_text(w, META_INSTR_NAME, s),
            MetaEvent::Lyric(s) => write_text(w, META_LYRIC, s),
            MetaEvent::Marker(s) => write_text(w, META_MARKER, s),
            MetaEvent::CuePoint(s) => write_text(w, META_CUE_POINT, s),
            MetaEvent::ProgramName(s) => write_text(w, META_PROG_NAME, s),
            MetaEvent::DeviceName(s) => write_text(w, META_DEVICE_NAME, s),
            MetaEvent::ChannelPrefix(c) => write_fixed(w, META_CHAN_PREFIX, &[c.get()]),
            MetaEvent::MidiPort(p) => write_fixed(w, META_PORT, &[p.get()]),
            MetaEvent::EndOfTrack => write_fixed(w, META_END_OF_TRACK, &[]),
            MetaEvent::SetTempo(t) => {
                let be = t.get().to_be_bytes();
                write_fixed(w, META_SET_TEMPO, &be[1..])
            }
            MetaEvent::SmpteOffset(v) => {
                write_fixed(w, META_SMPTE_OFFSET, &[v.hr, v.mn, v.se, v.fr, v.ff])
            }
            MetaEvent::TimeSignature(v) => write_fixed(
                w,
                META_TIME_SIG,
                &[
                    v.numerator,
                    v.denominator_power,
                    v.click,
                    v.notated_32nds_per_quarter,
                ],
            ),
            MetaEvent::KeySignature(v) => {
                write_fixed(w, META_KEY_SIG, &[v.sf.get() as u8, v.mi])
            }
            MetaEvent::SysEx(s) => write_text(w, META_SYSEX_ESCAPE, s),
            MetaEvent::Unknown { meta_type, data } => write_fixed(w, *meta_type, data),
        }
    }
}

fn byte_at(bytes: &[u8], index: usize) -> u8 {
    bytes.get(index).copied().unwrap_or(0)
}

fn fixed_len_bytes<const N: usize>(bytes: &[u8]) -> Option<[u8; N]> {
    if bytes.len() != N {
        return None;
    }
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    Some(out)
}

fn write_fixed<W: Write>(w: &mut W, meta_type: u8, payload: &[u8]) -> LibResult<()> {
    write_u8!(w, meta_type)?;
    let len = crate::vlq::encode_u32(payload.len() as u32);
    w.write_all(&len).context(wr!())?;
    w.write_all(payload).context(wr!())?;
    Ok(())
}

fn write_text<W: Write>(w: &mut W, meta_type: u8, text: &Text) -> LibResult<()> {
    text.check_len()?;
    write_fixed(w, meta_type, text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn iter_for(bytes: &[u8]) -> ByteIter<Cursor<Vec<u8>>> {
        ByteIter::new(Cursor::new(bytes.to_vec()).bytes()).unwrap()
    }

    #[test]
    fn parses_end_of_track() {
        let mut i = iter_for(&[0xff, 0x2f, 0x00]);
        assert_eq!(MetaEvent::EndOfTrack, MetaEvent::parse(&mut i).unwrap());
    }

    #[test]
    fn parses_set_tempo() {
        let mut i = iter_for(&[0xff, 0x51, 0x03, 0x07, 0xa1, 0x20]);
        let ev = MetaEvent::parse(&mut i).unwrap();
        assert_eq!(MetaEvent::SetTempo(MicrosecondsPerQuarter::new(500_000)), ev);
    }

    /// SetTempo's width is semantic (§7 LengthMismatch), so a wrong-length payload is fatal
    /// rather than silently preserved as an unknown event.
    #[test]
    fn set_tempo_length_mismatch_is_fatal() {
        let mut i = iter_for(&[0xff, 0x51, 0x02, 0x07, 0xa1]);
        assert!(MetaEvent::parse(&mut i).is_err());
    }

    /// SequenceNumber's width is likewise semantic.
    #[test]
    fn sequence_number_length_mismatch_is_fatal() {
        let mut i = iter_for(&[0xff, 0x00, 0x01, 0x07]);
        assert!(MetaEvent::parse(&mut i).is_err());
    }

    #[test]
    fn parses_key_signature() {
        let mut i = iter_for(&[0xff, 0x59, 0x02, 0x02, 0x00]);
        let ev = MetaEvent::parse(&mut i).unwrap();
        assert_eq!(
            MetaEvent::KeySignature(KeySignature {
                sf: KeyAccidentals::new(2),
                mi: 0,
            }),
            ev
        );
    }

    #[test]
    fn round_trip_text_event() {
        let ev = MetaEvent::SequenceName(Text::new("violin 1"));
        let mut buf = Vec::new();
        ev.write(&mut buf).unwrap();
        let mut i = ByteIter::new(Cursor::new(buf).bytes()).unwrap();
        assert_eq!(ev, MetaEvent::parse(&mut i).unwrap());
    }

    #[test]
    fn preserves_unknown_meta_type() {
        let ev = MetaEvent::Unknown {
            meta_type: 0x60,
            data: vec![1, 2, 3],
        };
        let mut buf = Vec::new();
        ev.write(&mut buf).unwrap();
        let mut i = ByteIter::new(Cursor::new(buf).bytes()).unwrap();
        assert_eq!(ev, MetaEvent::parse(&mut i).unwrap());
    }
}
