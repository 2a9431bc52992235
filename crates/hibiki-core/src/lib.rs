//! Domain model and capability contracts for the Hibiki audio engine.

pub mod clip;
pub mod error;
pub mod session;
pub mod track;
pub mod traits;

pub use clip::{AudioClip, Clip, ClipKind, MidiClip, MidiEvent};
pub use error::{HibikiError, Result};
pub use session::Session;
pub use track::{ChainSlot, ExclusivityEffect, Track};
pub use traits::{HostContext, MidiNoteEvent, ParamInfo, Plugin, Sink, BLOCK, OUT_CHANNELS};
