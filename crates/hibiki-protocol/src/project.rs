//! Project file schema (spec.md §6.2) and its `bincode` codec. Building a
//! `Project` from a live `Session` and applying a `Project` back onto one
//! both live here; only the plugin/clip *construction* (which needs the
//! VST3 adapter and the media decoders) lives in the engine binary.

use serde::{Deserialize, Serialize};

use hibiki_core::clip::{Clip, ClipKind};
use hibiki_core::Session;

use crate::error::ProtocolError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectPlugin {
    pub path: String,
    pub subindex: i32,
    pub parameters: Vec<(u32, f32)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectClip {
    pub slot: i32,
    pub path: String,
    pub is_loop: bool,
    pub kind: ClipKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectTrack {
    pub index: i32,
    pub plugins: Vec<ProjectPlugin>,
    pub clips: Vec<ProjectClip>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub bpm: f32,
    pub tracks: Vec<ProjectTrack>,
}

impl Project {
    /// Snapshots a live `Session` under `tracks_lock` plus each track's own
    /// lock, per spec.md §4.6 SaveProject.
    pub fn snapshot(session: &Session) -> Self {
        let mut tracks = Vec::new();
        for index in session.track_indices() {
            let project_track = session.with_track(index, |track| {
                let plugins = track
                    .chain
                    .iter()
                    .map(|slot| ProjectPlugin {
                        path: slot.plugin.path().to_string(),
                        subindex: slot.plugin.subindex(),
                        parameters: slot
                            .plugin
                            .parameters()
                            .iter()
                            .filter_map(|p| slot.plugin.get_param(p.id).map(|v| (p.id, v)))
                            .collect(),
                    })
                    .collect();
                let clips = track
                    .clips
                    .iter()
                    .map(|(slot, clip)| ProjectClip {
                        slot: *slot,
                        path: clip.source_path().to_string(),
                        is_loop: clip.is_loop(),
                        kind: clip.kind(),
                    })
                    .collect();
                ProjectTrack { index, plugins, clips }
            });
            tracks.push(project_track);
        }
        tracks.sort_by_key(|t| t.index);
        Self { bpm: session.tempo_bpm() as f32, tracks }
    }
}

pub fn encode_project(project: &Project) -> Result<Vec<u8>, ProtocolError> {
    Ok(bincode::serialize(project)?)
}

pub fn decode_project(bytes: &[u8]) -> Result<Project, ProtocolError> {
    Ok(bincode::deserialize(bytes)?)
}

/// `true` for clip kinds that should be round-tripped as MIDI vs AUDIO;
/// used by `LoadProject` reconstruction to pick the right decoder without
/// re-sniffing the file extension.
pub fn is_midi_kind(clip: &Clip) -> bool {
    matches!(clip.kind(), ClipKind::Midi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_session_round_trips() {
        let session = Session::new(120.0, 44100.0);
        let project = Project::snapshot(&session);
        let bytes = encode_project(&project).unwrap();
        let decoded = decode_project(&bytes).unwrap();
        assert_eq!(decoded.bpm, 120.0);
        assert!(decoded.tracks.is_empty());
    }

    #[test]
    fn track_with_plugin_and_clip_round_trips() {
        let session = Session::new(90.0, 44100.0);
        session.with_track(3, |track| {
            use hibiki_plugin_host_test_stub::StubPlugin;
            track.load_plugin(Box::new(StubPlugin::new("inst.vst3", true)));
            let clip = Clip::Midi(
                hibiki_core::clip::MidiClip::from_events(
                    "t.mid".into(),
                    true,
                    vec![hibiki_core::clip::MidiEvent {
                        time_sec: 0.0,
                        status: 0x90,
                        channel: 0,
                        note: 60,
                        velocity: 100,
                    }],
                )
                .unwrap(),
            );
            track.load_clip(0, clip);
        });

        let project = Project::snapshot(&session);
        let bytes = encode_project(&project).unwrap();
        let decoded = decode_project(&bytes).unwrap();
        assert_eq!(decoded.bpm, 90.0);
        assert_eq!(decoded.tracks.len(), 1);
        assert_eq!(decoded.tracks[0].plugins.len(), 1);
        assert_eq!(decoded.tracks[0].clips.len(), 1);
        assert!(decoded.tracks[0].clips[0].is_loop);
    }

    // Minimal in-crate stub plugin so this test does not need to depend on
    // hibiki-plugin-host (which would be a cyclic dev-dependency).
    mod hibiki_plugin_host_test_stub {
        use hibiki_core::traits::OUT_CHANNELS;
        use hibiki_core::{HostContext, MidiNoteEvent, ParamInfo, Plugin, Result};

        pub struct StubPlugin {
            path: String,
            is_instrument: bool,
        }

        impl StubPlugin {
            pub fn new(path: &str, is_instrument: bool) -> Self {
                Self { path: path.to_string(), is_instrument }
            }
        }

        impl Plugin for StubPlugin {
            fn display_name(&self) -> &str {
                "stub"
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
    }
}
