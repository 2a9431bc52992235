//! Capability traits the Scheduler and Command Router depend on. Concrete
//! implementations (VST3 hosting, cpal output) live in other crates; this
//! crate only names the contract.

use crate::error::Result;

/// Fixed render quantum, in frames per channel.
pub const BLOCK: usize = 512;
/// Engine always renders stereo.
pub const OUT_CHANNELS: usize = 2;

/// Transport/timeline context handed to a plugin on every `process` call.
#[derive(Debug, Clone, Copy)]
pub struct HostContext {
    pub sample_rate: f64,
    pub tempo_bpm: f64,
    pub time_sig_num: u32,
    pub time_sig_den: u32,
    pub continuous_time_samples: i64,
    pub project_time_music: f64,
}

/// One scheduled note on/off, already clamped into `[0, BLOCK)`.
#[derive(Debug, Clone, Copy)]
pub struct MidiNoteEvent {
    pub sample_offset: u32,
    pub channel: u8,
    pub pitch: u8,
    pub velocity: f32,
    pub is_note_on: bool,
}

#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub id: u32,
    pub name: String,
    pub default_normalized: f32,
}

/// The engine's view of a hosted instrument or effect. Implemented by the
/// VST3 adapter (`hibiki-plugin-host::Vst3Plugin`) and by `MockPlugin` for
/// tests that need no live plugin binary.
pub trait Plugin: Send {
    fn display_name(&self) -> &str;
    fn path(&self) -> &str;
    fn subindex(&self) -> i32;
    fn is_instrument(&self) -> bool;

    fn parameters(&self) -> &[ParamInfo];
    fn get_param(&self, id: u32) -> Option<f32>;
    fn set_param(&mut self, id: u32, normalized: f32);

    /// Opens the plugin's editor window, if any. Idempotent: a second call
    /// while already open is a no-op.
    fn open_editor(&mut self);
    fn close_editor(&mut self);

    /// Renders `n_samples` frames. `inputs` is `None` for the first plugin
    /// in a MIDI-driven chain (instruments generate audio from `events`
    /// alone); later plugins in the chain receive the prior plugin's output
    /// as input and an empty event list.
    fn process(
        &mut self,
        inputs: Option<[&[f32]; OUT_CHANNELS]>,
        outputs: [&mut [f32]; OUT_CHANNELS],
        n_samples: usize,
        host_ctx: &HostContext,
        events: &[MidiNoteEvent],
    ) -> Result<()>;
}

/// Blocking audio-output endpoint. Implemented by `hibiki-media::CpalSink`.
pub trait Sink: Send {
    fn is_ready(&self) -> bool;

    /// Accepts exactly `n_frames * channels` interleaved samples; blocks or
    /// applies backpressure until the device can accept them. Non-finite
    /// samples must be clamped to zero and the stream saturated to
    /// `[-1, 1]` before hand-off to the OS.
    fn write(&mut self, frames: &[f32], n_frames: usize) -> Result<()>;

    fn sample_rate(&self) -> f64;
}
