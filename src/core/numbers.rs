//! Clamped newtypes for the small numeric ranges MIDI channel events operate on. Each wraps a
//! primitive and silently clamps out-of-range values rather than panicking, matching the way the
//! codec is asked to tolerate malformed but non-fatal field values (e.g. an out-of-range channel
//! prefix).

// channel is 0-15, displayed to users as 1-16.
clamp!(Channel, u8, 0, 15, 0, pub);

clamp!(Key, u8, 0, 127, 60, pub);
clamp!(Velocity, u8, 0, 127, 64, pub);
clamp!(Pressure, u8, 0, 127, 0, pub);
clamp!(Program, u8, 0, 127, 0, pub);
clamp!(ControlNumber, u8, 0, 127, 0, pub);
clamp!(ControlValue, u8, 0, 127, 0, pub);
clamp!(Port, u8, 0, 127, 0, pub);

/// A 14-bit pitch wheel value, transmitted on the wire as two 7-bit bytes (LSB first). The
/// center/no-bend value is `0x2000` (8192).
clamp!(PitchWheel, u16, 0, 0x3fff, 0x2000, pub);
