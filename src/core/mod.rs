//! Event-model primitives shared by the codec, time map, and player: clamped numeric newtypes and
//! the channel voice message family.

pub(crate) mod message;
pub(crate) mod numbers;

pub use message::ChannelMessage;
pub use numbers::{
    Channel, ControlNumber, ControlValue, Key, PitchWheel, Port, Pressure, Program, Velocity,
};
