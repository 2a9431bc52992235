//! The control thread: reads length-framed `Request`s, mutates the
//! `Session` under the minimum locks needed, and emits the matching
//! `Response`s (spec.md §4.4).

use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::warn;

use hibiki_core::{Clip, ExclusivityEffect, Plugin, Session};
use hibiki_plugin_host::{Vst3Error, Vst3Plugin, Vst3Scanner};
use hibiki_protocol::framing::read_frame;
use hibiki_protocol::{
    decode_project, encode_project, ParamSnapshot, Project, ProjectClip, ProjectPlugin, ProjectTrack, ProtocolError,
    Request, Response,
};

use crate::notify::Notifier;

/// Runs the control loop until EOF or an explicit `Quit`. Both are treated
/// as an implicit shutdown: the caller observes `session.is_quitting()`
/// having been set when this returns.
pub fn run<R: Read>(reader: &mut R, session: &Session, notifier: &Notifier) {
    loop {
        let frame = match read_frame(reader) {
            Ok(frame) => frame,
            Err(ProtocolError::Eof) => break,
            Err(ProtocolError::FrameTooLarge(len, max)) => {
                notifier.send(&Response::log(format!(
                    "frame length {len} exceeds {max} byte limit, closing connection"
                )));
                break;
            }
            Err(e) => {
                notifier.send(&Response::log(format!("read error: {e}")));
                break;
            }
        };

        let request: Request = match bincode::deserialize(&frame) {
            Ok(request) => request,
            Err(e) => {
                notifier.send(&Response::log(format!("malformed request: {e}")));
                continue;
            }
        };

        if !dispatch(request, session, notifier) {
            break;
        }
    }
    session.request_quit();
}

/// Applies one request. Returns `false` when the control loop must stop
/// reading (a `Quit` request).
fn dispatch(request: Request, session: &Session, notifier: &Notifier) -> bool {
    match request {
        Request::LoadPlugin { track, path, subindex } => {
            handle_load_plugin(session, notifier, track, &path, subindex);
        }
        Request::LoadClip { track, slot, path, is_loop } => {
            handle_load_clip(session, notifier, track, slot, &path, is_loop);
        }
        Request::SetClipLoop { track, slot, is_loop } => {
            let _ = session.with_track(track, |t| t.set_clip_loop(slot, is_loop));
            notifier.send(&Response::ack("SET_CLIP_LOOP", true));
        }
        Request::DeleteClip { track, slot } => {
            let ok = session.with_track(track, |t| t.delete_clip(slot)).is_ok();
            notifier.send(&Response::ack("DELETE_CLIP", ok));
            if ok {
                notifier.send(&Response::ClipInfo { track, slot, display_name: String::new() });
            }
        }
        Request::PlayClip { track, slot } => {
            session.with_track(track, |t| t.play_clip(slot));
            notifier.send(&Response::ack("PLAY_CLIP", true));
        }
        Request::PlayScene { slot } => {
            for index in session.track_indices() {
                session.with_track(index, |t| t.play_clip(slot));
            }
            notifier.send(&Response::ack("PLAY_SCENE", true));
        }
        Request::Stop => {
            for index in session.track_indices() {
                session.with_track(index, |t| t.stop());
            }
            notifier.send(&Response::ack("STOP", true));
        }
        Request::StopTrack { track } => {
            session.with_track(track, |t| t.stop());
            notifier.send(&Response::ack("STOP_TRACK", true));
        }
        Request::RemovePlugin { track, position } => {
            let ok = session.with_track(track, |t| t.remove_plugin(position)).is_ok();
            notifier.send(&Response::ack("REMOVE_PLUGIN", ok));
        }
        Request::ShowPluginGui { track, position } => {
            session.with_track(track, |t| {
                if let Some(slot) = t.chain.get_mut(position) {
                    slot.plugin.open_editor();
                }
            });
        }
        Request::SetParamValue { track, position, id, value } => {
            session.with_track(track, |t| {
                if let Some(slot) = t.chain.get_mut(position) {
                    slot.plugin.set_param(id, value);
                }
            });
        }
        Request::SetBpm { bpm } => {
            session.set_tempo_bpm(bpm as f64);
            notifier.send(&Response::ack("SET_BPM", true));
        }
        Request::SaveProject { path } => {
            let ok = handle_save_project(session, &path);
            notifier.send(&Response::ack("SAVE_PROJECT", ok));
        }
        Request::LoadProject { path } => {
            handle_load_project(session, notifier, &path);
            notifier.send(&Response::ack("LOAD_PROJECT", true));
        }
        Request::Quit => return false,
    }
    true
}

fn handle_load_plugin(session: &Session, notifier: &Notifier, track: i32, path: &str, subindex: i32) {
    let sample_rate = session.sample_rate();
    match load_vst3_plugin(path, subindex, sample_rate) {
        Ok(plugin) => {
            let plugin_name = plugin.display_name().to_string();
            let is_instrument = plugin.is_instrument();
            let params: Vec<ParamSnapshot> = plugin
                .parameters()
                .iter()
                .map(|p| ParamSnapshot { id: p.id, name: p.name.clone(), default: p.default_normalized })
                .collect();
            let boxed: Box<dyn Plugin> = Box::new(plugin);
            let (position, effects) = session.with_track(track, |t| t.load_plugin(boxed));
            for effect in effects {
                if let ExclusivityEffect::ClipRemoved { slot } = effect {
                    notifier.send(&Response::ClipInfo { track, slot, display_name: String::new() });
                }
            }
            notifier.send(&Response::ParamList { track, position, plugin_name, is_instrument, params });
        }
        Err(e) => {
            warn!("failed to load plugin {path}: {e}");
            notifier.send(&Response::log(format!("Failed to load plugin: {path}")));
        }
    }
}

fn handle_load_clip(session: &Session, notifier: &Notifier, track: i32, slot: i32, path: &str, is_loop: bool) {
    match hibiki_media::load_clip(Path::new(path), is_loop) {
        Ok(clip) => {
            let waveform = match &clip {
                Clip::Audio(audio) => Some(audio.waveform_summary),
                Clip::Midi(_) => None,
            };
            let display_name = Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string());

            let effects = session.with_track(track, |t| t.load_clip(slot, clip));
            for effect in effects {
                if let ExclusivityEffect::InstrumentCleared { position } = effect {
                    notifier.send(&Response::ParamList {
                        track,
                        position,
                        plugin_name: String::new(),
                        is_instrument: true,
                        params: Vec::new(),
                    });
                }
            }

            notifier.send(&Response::ack("LOAD_CLIP", true));
            notifier.send(&Response::ClipInfo { track, slot, display_name });
            if let Some(peaks) = waveform {
                notifier.send(&Response::ClipWaveform { track, slot, peaks: Box::new(peaks) });
            }
        }
        Err(e) => {
            warn!("failed to load clip {path}: {e}");
            notifier.send(&Response::ack("LOAD_CLIP", false));
        }
    }
}

fn handle_save_project(session: &Session, path: &str) -> bool {
    let project = Project::snapshot(session);
    let bytes = match encode_project(&project) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("failed to encode project: {e}");
            return false;
        }
    };
    if let Err(e) = std::fs::write(path, bytes) {
        warn!("failed to write project file {path}: {e}");
        return false;
    }
    true
}

fn handle_load_project(session: &Session, notifier: &Notifier, path: &str) {
    notifier.send(&Response::ClearProject);
    session.clear_tracks();

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("failed to read project file {path}: {e}");
            return;
        }
    };
    let project: Project = match decode_project(&bytes) {
        Ok(project) => project,
        Err(e) => {
            warn!("failed to decode project file {path}: {e}");
            return;
        }
    };

    session.set_tempo_bpm(project.bpm as f64);
    let sample_rate = session.sample_rate();

    for ProjectTrack { index, plugins, clips } in project.tracks {
        session.with_track(index, |_| {});

        for ProjectPlugin { path: plugin_path, subindex, parameters } in plugins {
            match load_vst3_plugin(&plugin_path, subindex, sample_rate) {
                Ok(mut plugin) => {
                    for (id, value) in &parameters {
                        plugin.set_param(*id, *value);
                    }
                    let plugin_name = plugin.display_name().to_string();
                    let is_instrument = plugin.is_instrument();
                    let params: Vec<ParamSnapshot> = plugin
                        .parameters()
                        .iter()
                        .map(|p| ParamSnapshot { id: p.id, name: p.name.clone(), default: p.default_normalized })
                        .collect();
                    let boxed: Box<dyn Plugin> = Box::new(plugin);
                    let (position, _effects) = session.with_track(index, |t| t.load_plugin(boxed));
                    notifier.send(&Response::ParamList { track: index, position, plugin_name, is_instrument, params });
                }
                Err(e) => warn!("failed to restore plugin {plugin_path}: {e}"),
            }
        }

        for ProjectClip { slot, path: clip_path, is_loop, kind: _ } in clips {
            match hibiki_media::load_clip(Path::new(&clip_path), is_loop) {
                Ok(clip) => {
                    let display_name = Path::new(&clip_path)
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| clip_path.clone());
                    session.with_track(index, |t| t.load_clip(slot, clip));
                    notifier.send(&Response::ClipInfo { track: index, slot, display_name });
                }
                Err(e) => warn!("failed to restore clip {clip_path}: {e}"),
            }
        }
    }
}

fn load_vst3_plugin(path: &str, subindex: i32, sample_rate: f64) -> Result<Vst3Plugin, Vst3Error> {
    let path_buf = PathBuf::from(path);
    let mut scanner = Vst3Scanner::new()?;
    scanner.scan_path(&path_buf)?;
    let info = scanner.at(subindex)?.clone();
    Vst3Plugin::load(scanner.scanner(), &info, &path_buf, sample_rate)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    use super::*;
    use hibiki_protocol::write_frame;

    #[derive(Clone)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn encode_requests(requests: &[Request]) -> Vec<u8> {
        let mut buf = Vec::new();
        for req in requests {
            let payload = bincode::serialize(req).unwrap();
            write_frame(&mut buf, &payload).unwrap();
        }
        buf
    }

    fn decode_responses(bytes: &[u8]) -> Vec<Response> {
        let mut cursor = Cursor::new(bytes.to_vec());
        let mut out = Vec::new();
        while let Ok(frame) = hibiki_protocol::read_frame(&mut cursor) {
            out.push(bincode::deserialize(&frame).unwrap());
        }
        out
    }

    fn run_requests(session: &Session, requests: &[Request]) -> Vec<Response> {
        let input = encode_requests(requests);
        let mut reader = Cursor::new(input);
        let out_buf = Arc::new(Mutex::new(Vec::new()));
        let notifier = Notifier::new(Box::new(SharedBuf(out_buf.clone())));
        run(&mut reader, session, &notifier);
        let bytes = out_buf.lock().unwrap().clone();
        decode_responses(&bytes)
    }

    #[test]
    fn quit_request_sets_session_quitting_and_stops_the_loop() {
        let session = Session::new(120.0, 44_100.0);
        run_requests(&session, &[Request::Quit]);
        assert!(session.is_quitting());
    }

    #[test]
    fn eof_with_no_requests_still_requests_quit() {
        let session = Session::new(120.0, 44_100.0);
        run_requests(&session, &[]);
        assert!(session.is_quitting());
    }

    #[test]
    fn set_bpm_acknowledges_and_updates_tempo() {
        let session = Session::new(120.0, 44_100.0);
        let responses = run_requests(&session, &[Request::SetBpm { bpm: 140.0 }, Request::Quit]);
        assert_eq!(session.tempo_bpm(), 140.0);
        assert!(matches!(
            responses[0],
            Response::Acknowledge { ref cmd_name, success: true } if cmd_name == "SET_BPM"
        ));
    }

    #[test]
    fn delete_clip_on_unknown_slot_acknowledges_failure() {
        let session = Session::new(120.0, 44_100.0);
        let responses = run_requests(&session, &[Request::DeleteClip { track: 0, slot: 99 }, Request::Quit]);
        assert!(matches!(
            responses[0],
            Response::Acknowledge { ref cmd_name, success: false } if cmd_name == "DELETE_CLIP"
        ));
    }

    #[test]
    fn play_scene_starts_matching_slot_on_every_track() {
        let session = Session::new(120.0, 44_100.0);
        session.with_track(0, |t| t.clips.insert(0, test_midi_clip()));
        session.with_track(1, |t| t.clips.insert(0, test_midi_clip()));

        run_requests(&session, &[Request::PlayScene { slot: 0 }, Request::Quit]);

        assert_eq!(session.with_track(0, |t| t.playing_slot), Some(0));
        assert_eq!(session.with_track(1, |t| t.playing_slot), Some(0));
    }

    #[test]
    fn stop_clears_playing_slot_on_every_track() {
        let session = Session::new(120.0, 44_100.0);
        session.with_track(0, |t| {
            t.clips.insert(0, test_midi_clip());
            t.play_clip(0);
        });

        run_requests(&session, &[Request::Stop, Request::Quit]);

        assert_eq!(session.with_track(0, |t| t.playing_slot), None);
    }

    fn test_midi_clip() -> Clip {
        use hibiki_core::clip::{MidiClip, MidiEvent};
        Clip::Midi(
            MidiClip::from_events(
                "t.mid".into(),
                false,
                vec![MidiEvent { time_sec: 0.0, status: 0x90, channel: 0, note: 60, velocity: 100 }],
            )
            .unwrap(),
        )
    }
}
