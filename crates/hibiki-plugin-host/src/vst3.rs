//! `Plugin` adapter over the `rack` crate's VST3 host bindings.

use std::path::Path;

use rack::{midi::MidiEvent as RackMidiEvent, Plugin as RackPlugin, PluginInstance, Scanner};
use tracing::{info, warn};

use hibiki_core::traits::OUT_CHANNELS;
use hibiki_core::{HostContext, MidiNoteEvent, ParamInfo, Plugin as HibikiPlugin, Result as HibikiResult};

use crate::error::Vst3Error;
use crate::scanner::Vst3PluginInfo;

const MAX_BLOCK_SIZE: usize = hibiki_core::BLOCK;

/// A loaded, activated VST3 plugin instance hosting either an instrument or
/// an effect. Which role it plays is fixed at load time by the plugin's own
/// declared category (`info.is_instrument`).
pub struct Vst3Plugin {
    instance: RackPlugin,
    info: Vst3PluginInfo,
    path: String,
    sample_rate: f64,
    params: Vec<ParamInfo>,
    pending_midi: Vec<RackMidiEvent>,
    silent_input_left: Vec<f32>,
    silent_input_right: Vec<f32>,
    editor_open: bool,
}

// The engine guarantees a single thread (the Scheduler) ever touches a
// loaded plugin's process/parameter methods at a time.
unsafe impl Send for Vst3Plugin {}

impl Vst3Plugin {
    pub fn load(
        scanner: &Scanner,
        info: &Vst3PluginInfo,
        path: &Path,
        sample_rate: f64,
    ) -> Result<Self, Vst3Error> {
        let mut instance = scanner
            .load(&info.info)
            .map_err(|e| Vst3Error::LoadError(format!("{e:?}")))?;
        instance
            .initialize(sample_rate, MAX_BLOCK_SIZE)
            .map_err(|e| Vst3Error::ActivationError(format!("{e:?}")))?;

        let param_count = instance.parameter_count();
        let mut params = Vec::with_capacity(param_count);
        for id in 0..param_count {
            if let Ok(pinfo) = instance.parameter_info(id) {
                params.push(ParamInfo {
                    id: id as u32,
                    name: pinfo.name,
                    default_normalized: pinfo.default as f32,
                });
            }
        }

        info!(path = %path.display(), name = %info.name, sample_rate, params = params.len(), "VST3 plugin loaded");

        Ok(Self {
            instance,
            info: info.clone(),
            path: path.display().to_string(),
            sample_rate,
            params,
            pending_midi: Vec::with_capacity(256),
            silent_input_left: vec![0.0; MAX_BLOCK_SIZE],
            silent_input_right: vec![0.0; MAX_BLOCK_SIZE],
            editor_open: false,
        })
    }
}

impl HibikiPlugin for Vst3Plugin {
    fn display_name(&self) -> &str {
        &self.info.name
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn subindex(&self) -> i32 {
        0
    }

    fn is_instrument(&self) -> bool {
        self.info.is_instrument
    }

    fn parameters(&self) -> &[ParamInfo] {
        &self.params
    }

    fn get_param(&self, id: u32) -> Option<f32> {
        self.instance.get_parameter(id as usize).ok()
    }

    fn set_param(&mut self, id: u32, normalized: f32) {
        if let Err(e) = self.instance.set_parameter(id as usize, normalized) {
            warn!(id, "failed to set VST3 parameter: {e:?}");
        }
    }

    fn open_editor(&mut self) {
        if self.editor_open {
            return;
        }
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
    ) -> HibikiResult<()> {
        let n_samples = n_samples.min(MAX_BLOCK_SIZE);
        let [out_l, out_r] = outputs;

        match inputs {
            None => {
                self.pending_midi.clear();
                for ev in events {
                    let rack_ev = if ev.is_note_on {
                        RackMidiEvent::note_on(
                            ev.pitch,
                            (ev.velocity * 127.0).round() as u8,
                            ev.channel,
                            ev.sample_offset,
                        )
                    } else {
                        RackMidiEvent::note_off(ev.pitch, 0, ev.channel, ev.sample_offset)
                    };
                    self.pending_midi.push(rack_ev);
                }
                if !self.pending_midi.is_empty() {
                    if let Err(e) = self.instance.send_midi(&self.pending_midi) {
                        warn!("failed to send MIDI to plugin: {e:?}");
                    }
                }
                let rack_inputs: [&[f32]; OUT_CHANNELS] = [
                    &self.silent_input_left[..n_samples],
                    &self.silent_input_right[..n_samples],
                ];
                let mut rack_outputs: [&mut [f32]; OUT_CHANNELS] =
                    [&mut out_l[..n_samples], &mut out_r[..n_samples]];
                self.instance
                    .process(&rack_inputs, &mut rack_outputs, n_samples)
                    .map_err(|e| hibiki_core::HibikiError::PluginProcess(format!("{e:?}")))?;
            }
            Some(rack_inputs) => {
                let rack_inputs: [&[f32]; OUT_CHANNELS] =
                    [&rack_inputs[0][..n_samples], &rack_inputs[1][..n_samples]];
                let mut rack_outputs: [&mut [f32]; OUT_CHANNELS] =
                    [&mut out_l[..n_samples], &mut out_r[..n_samples]];
                self.instance
                    .process(&rack_inputs, &mut rack_outputs, n_samples)
                    .map_err(|e| hibiki_core::HibikiError::PluginProcess(format!("{e:?}")))?;
            }
        }
        Ok(())
    }
}

impl Drop for Vst3Plugin {
    fn drop(&mut self) {
        if let Err(e) = self.instance.deactivate() {
            warn!("plugin deactivation failed during drop: {e:?}");
        }
    }
}
