//! A synthesizer-free `Plugin` double used by every property test in the
//! engine crate that would otherwise need a live VST3 binary.

use hibiki_core::traits::OUT_CHANNELS;
use hibiki_core::{HostContext, MidiNoteEvent, ParamInfo, Plugin, Result};

/// Emits a constant DC level on note-on and silence on note-off when used as
/// an instrument; passes audio through unchanged (optionally scaled by
/// `gain`) when used as an effect.
pub struct MockPlugin {
    path: String,
    is_instrument: bool,
    params: Vec<ParamInfo>,
    gain: f32,
    active_level: f32,
    editor_open: bool,
}

impl MockPlugin {
    pub fn instrument(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_instrument: true,
            params: vec![ParamInfo {
                id: 0,
                name: "gain".into(),
                default_normalized: 1.0,
            }],
            gain: 1.0,
            active_level: 0.0,
            editor_open: false,
        }
    }

    pub fn effect(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_instrument: false,
            params: vec![ParamInfo {
                id: 0,
                name: "gain".into(),
                default_normalized: 1.0,
            }],
            gain: 1.0,
            active_level: 0.0,
            editor_open: false,
        }
    }
}

impl Plugin for MockPlugin {
    fn display_name(&self) -> &str {
        "mock"
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn subindex(&self) -> i32 {
        0
    }

    fn is_instrument(&self) -> bool {
        self.is_instrument
    }

    fn parameters(&self) -> &[ParamInfo] {
        &self.params
    }

    fn get_param(&self, id: u32) -> Option<f32> {
        (id == 0).then_some(self.gain)
    }

    fn set_param(&mut self, id: u32, normalized: f32) {
        if id == 0 {
            self.gain = normalized;
        }
    }

    fn open_editor(&mut self) {
        self.editor_open = true;
    }

    fn close_editor(&mut self) {
        self.editor_open = false;
    }

    fn process(
        &mut self,
        inputs: Option<[&[f32]; OUT_CHANNELS]>,
        outputs: [&mut [f32]; OUT_CHANNELS],
        n_samples: usize,
        _host_ctx: &HostContext,
        events: &[MidiNoteEvent],
    ) -> Result<()> {
        let [out_l, out_r] = outputs;
        match inputs {
            None => {
                for ev in events {
                    self.active_level = if ev.is_note_on { ev.velocity } else { 0.0 };
                }
                for i in 0..n_samples {
                    out_l[i] = self.active_level * self.gain;
                    out_r[i] = self.active_level * self.gain;
                }
            }
            Some(ins) => {
                for i in 0..n_samples {
                    out_l[i] = ins[0][i] * self.gain;
                    out_r[i] = ins[1][i] * self.gain;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hibiki_core::traits::BLOCK;

    fn host_ctx() -> HostContext {
        HostContext {
            sample_rate: 44100.0,
            tempo_bpm: 120.0,
            time_sig_num: 4,
            time_sig_den: 4,
            continuous_time_samples: 0,
            project_time_music: 0.0,
        }
    }

    #[test]
    fn note_on_produces_nonzero_output() {
        let mut plugin = MockPlugin::instrument("inst.mock");
        let mut l = vec![0.0f32; BLOCK];
        let mut r = vec![0.0f32; BLOCK];
        let events = [MidiNoteEvent {
            sample_offset: 0,
            channel: 0,
            pitch: 60,
            velocity: 1.0,
            is_note_on: true,
        }];
        plugin
            .process(None, [&mut l, &mut r], BLOCK, &host_ctx(), &events)
            .unwrap();
        assert!(l.iter().all(|&s| s > 0.0));
    }

    #[test]
    fn effect_passthrough_applies_gain() {
        let mut plugin = MockPlugin::effect("fx.mock");
        plugin.set_param(0, 0.5);
        let input_l = vec![1.0f32; BLOCK];
        let input_r = vec![1.0f32; BLOCK];
        let mut out_l = vec![0.0f32; BLOCK];
        let mut out_r = vec![0.0f32; BLOCK];
        plugin
            .process(
                Some([&input_l, &input_r]),
                [&mut out_l, &mut out_r],
                BLOCK,
                &host_ctx(),
                &[],
            )
            .unwrap();
        assert!((out_l[0] - 0.5).abs() < 1e-6);
    }
}
