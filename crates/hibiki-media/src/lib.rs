//! Commodity media decoders and the real-time output sink.

pub mod error;
pub mod midi;
pub mod sink;
pub mod wav;

pub use error::MediaError;
pub use sink::CpalSink;

use std::path::Path;

use hibiki_core::clip::Clip;

/// Loads a clip from `path`, dispatching on extension: `.wav` decodes as
/// audio, anything else is parsed as a MIDI file.
pub fn load_clip(path: &Path, is_loop: bool) -> Result<Clip, MediaError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("wav") => wav::load_wav_clip(path, is_loop),
        _ => midi::load_midi_clip(path, is_loop),
    }
}
