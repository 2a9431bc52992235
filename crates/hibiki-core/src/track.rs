//! Track: an ordered plugin chain plus a slot-indexed clip library.

use std::collections::HashMap;

use crate::clip::Clip;
use crate::error::{HibikiError, Result};
use crate::traits::Plugin;

/// One entry in a track's effect/instrument chain.
pub struct ChainSlot {
    pub plugin: Box<dyn Plugin>,
}

pub struct Track {
    pub index: i32,
    pub chain: Vec<ChainSlot>,
    pub clips: HashMap<i32, Clip>,
    pub playing_slot: Option<i32>,
    pub cursor_sec: f64,
    pub midi_cursor_idx: usize,
}

/// A clip removed as a side effect of an exclusivity rule, reported back to
/// the caller so the Command Router can emit the matching notification.
pub enum ExclusivityEffect {
    ClipRemoved { slot: i32 },
    InstrumentCleared { position: usize },
}

impl Track {
    pub fn new(index: i32) -> Self {
        Self {
            index,
            chain: Vec::new(),
            clips: HashMap::new(),
            playing_slot: None,
            cursor_sec: 0.0,
            midi_cursor_idx: 0,
        }
    }

    fn has_instrument(&self) -> bool {
        self.chain.first().is_some_and(|s| s.plugin.is_instrument())
    }

    /// Inserts a freshly-loaded plugin according to the placement policy:
    /// an instrument replaces any existing instrument at position 0 or is
    /// prepended if none exists; an effect is appended. Returns the final
    /// position and the exclusivity side effects that must be reported.
    pub fn load_plugin(&mut self, plugin: Box<dyn Plugin>) -> (usize, Vec<ExclusivityEffect>) {
        let mut effects = Vec::new();
        let is_first_plugin = self.chain.is_empty();
        let position = if plugin.is_instrument() {
            if self.has_instrument() {
                self.chain[0] = ChainSlot { plugin };
                0
            } else {
                self.chain.insert(0, ChainSlot { plugin });
                if !self.clips.is_empty() {
                    let removed: Vec<i32> = self
                        .clips
                        .iter()
                        .filter(|(_, c)| matches!(c, Clip::Audio(_)))
                        .map(|(slot, _)| *slot)
                        .collect();
                    for slot in removed {
                        self.clips.remove(&slot);
                        if self.playing_slot == Some(slot) {
                            self.playing_slot = None;
                        }
                        effects.push(ExclusivityEffect::ClipRemoved { slot });
                    }
                }
                0
            }
        } else {
            self.chain.push(ChainSlot { plugin });
            self.chain.len() - 1
        };

        if is_first_plugin {
            self.cursor_sec = 0.0;
            self.midi_cursor_idx = 0;
        }

        (position, effects)
    }

    /// Installs a decoded clip at `slot`, enforcing audio/instrument
    /// exclusivity by stripping instrument plugins from the chain when the
    /// new clip is an audio clip.
    pub fn load_clip(&mut self, slot: i32, clip: Clip) -> Vec<ExclusivityEffect> {
        let mut effects = Vec::new();
        if matches!(clip, Clip::Audio(_)) && self.has_instrument() {
            self.chain.remove(0);
            effects.push(ExclusivityEffect::InstrumentCleared { position: 0 });
        }
        self.clips.insert(slot, clip);
        if self.playing_slot == Some(slot) {
            self.cursor_sec = 0.0;
            self.midi_cursor_idx = 0;
        }
        effects
    }

    pub fn set_clip_loop(&mut self, slot: i32, is_loop: bool) -> Result<()> {
        let clip = self
            .clips
            .get_mut(&slot)
            .ok_or(HibikiError::ClipNotFound { track: self.index, slot })?;
        clip.set_loop(is_loop);
        Ok(())
    }

    pub fn delete_clip(&mut self, slot: i32) -> Result<()> {
        self.clips
            .remove(&slot)
            .ok_or(HibikiError::ClipNotFound { track: self.index, slot })?;
        if self.playing_slot == Some(slot) {
            self.playing_slot = None;
        }
        Ok(())
    }

    /// No-op if the slot is unknown, per the spec's play_clip contract.
    pub fn play_clip(&mut self, slot: i32) {
        if !self.clips.contains_key(&slot) {
            return;
        }
        self.playing_slot = Some(slot);
        self.cursor_sec = 0.0;
        self.midi_cursor_idx = 0;
    }

    pub fn stop(&mut self) {
        self.playing_slot = None;
    }

    pub fn remove_plugin(&mut self, position: usize) -> Result<()> {
        if position >= self.chain.len() {
            return Err(HibikiError::PluginNotFound(position));
        }
        self.chain.remove(position);
        Ok(())
    }

    pub fn playing_clip(&self) -> Option<&Clip> {
        self.playing_slot.and_then(|s| self.clips.get(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{HostContext, MidiNoteEvent, ParamInfo, OUT_CHANNELS};

    struct StubPlugin {
        instrument: bool,
    }

    impl Plugin for StubPlugin {
        fn display_name(&self) -> &str {
            "stub"
        }
        fn path(&self) -> &str {
            "stub.vst3"
        }
        fn subindex(&self) -> i32 {
            0
        }
        fn is_instrument(&self) -> bool {
            self.instrument
        }
        fn parameters(&self) -> &[ParamInfo] {
            &[]
        }
        fn get_param(&self, _id: u32) -> Option<f32> {
            None
        }
        fn set_param(&mut self, _id: u32, _normalized: f32) {}
        fn open_editor(&mut self) {}
        fn close_editor(&mut self) {}
        fn process(
            &mut self,
            _inputs: Option<[&[f32]; OUT_CHANNELS]>,
            _outputs: [&mut [f32]; OUT_CHANNELS],
            _n_samples: usize,
            _host_ctx: &HostContext,
            _events: &[MidiNoteEvent],
        ) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn loading_second_instrument_replaces_first_in_place() {
        let mut track = Track::new(0);
        track.load_plugin(Box::new(StubPlugin { instrument: true }));
        let (pos, effects) = track.load_plugin(Box::new(StubPlugin { instrument: true }));
        assert_eq!(pos, 0);
        assert_eq!(track.chain.len(), 1);
        assert!(effects.is_empty());
    }

    #[test]
    fn loading_audio_clip_clears_instrument() {
        let mut track = Track::new(0);
        track.load_plugin(Box::new(StubPlugin { instrument: true }));
        let clip = Clip::Audio(crate::clip::AudioClip {
            source_path: "loop.wav".into(),
            is_loop: true,
            samples: vec![0.0; 4],
            channels: 2,
            sample_rate: 44100.0,
            duration_sec: 1.0,
            waveform_summary: [0.0; crate::clip::WAVEFORM_BUCKETS],
        });
        let effects = track.load_clip(1, clip);
        assert!(track.chain.is_empty());
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn play_clip_unknown_slot_is_noop() {
        let mut track = Track::new(0);
        track.play_clip(42);
        assert_eq!(track.playing_slot, None);
    }

    #[test]
    fn delete_clip_clears_matching_playing_slot() {
        let mut track = Track::new(0);
        let clip = Clip::Midi(crate::clip::MidiClip::from_events(
            "t.mid".into(),
            false,
            vec![crate::clip::MidiEvent {
                time_sec: 0.0,
                status: 0x90,
                channel: 0,
                note: 60,
                velocity: 100,
            }],
        ).unwrap());
        track.clips.insert(0, clip);
        track.play_clip(0);
        track.delete_clip(0).unwrap();
        assert_eq!(track.playing_slot, None);
    }
}
