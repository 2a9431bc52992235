//! The audio thread: fixed-block render loop over the session's tracks,
//! mixing into a stereo block and feeding the `Sink` (spec.md §4.3).

use std::time::Duration;

use tracing::warn;

use hibiki_core::traits::{HostContext, MidiNoteEvent, BLOCK, OUT_CHANNELS};
use hibiki_core::{Clip, Plugin, Session, Sink, Track};
use hibiki_protocol::{Response, TrackLevel};

use crate::notify::Notifier;

/// Every 4th rendered block publishes a `TrackLevels` notification
/// (~46 ms at 44.1 kHz / 512 frames per block).
const LEVELS_EVERY_N_BLOCKS: u32 = 4;
const IDLE_SLEEP: Duration = Duration::from_millis(10);

/// Per-track scratch reused across the life of the Scheduler so no block
/// allocates beyond the MIDI event vector (spec.md §5 real-time discipline).
struct Scratch {
    buf_l: Vec<f32>,
    buf_r: Vec<f32>,
    tmp_l: Vec<f32>,
    tmp_r: Vec<f32>,
    events: Vec<MidiNoteEvent>,
    mix_l: Vec<f32>,
    mix_r: Vec<f32>,
    interleaved: Vec<f32>,
}

impl Scratch {
    fn new() -> Self {
        Self {
            buf_l: vec![0.0; BLOCK],
            buf_r: vec![0.0; BLOCK],
            tmp_l: vec![0.0; BLOCK],
            tmp_r: vec![0.0; BLOCK],
            events: Vec::with_capacity(64),
            mix_l: vec![0.0; BLOCK],
            mix_r: vec![0.0; BLOCK],
            interleaved: vec![0.0; BLOCK * OUT_CHANNELS],
        }
    }
}

/// Runs the render loop until `session.is_quitting()`. Returns when the
/// loop observes quit, so the caller can join this thread before tearing
/// plugins down.
pub fn run(session: &Session, sink: &mut dyn Sink, notifier: &Notifier) {
    let mut scratch = Scratch::new();
    let mut rendered_blocks: u32 = 0;

    while !session.is_quitting() {
        scratch.mix_l.fill(0.0);
        scratch.mix_r.fill(0.0);

        let sample_rate = session.sample_rate();
        let tempo_bpm = session.tempo_bpm();
        let time_per_block = BLOCK as f64 / sample_rate;

        let mut any_played = false;
        for index in session.track_indices() {
            let peaks = session.with_track(index, |track| {
                render_track(track, tempo_bpm, sample_rate, time_per_block, &mut scratch)
            });
            if let Some((peak_l, peak_r)) = peaks {
                any_played = true;
                session.set_level(index, peak_l, peak_r);
                for i in 0..BLOCK {
                    scratch.mix_l[i] += scratch.buf_l[i];
                    scratch.mix_r[i] += scratch.buf_r[i];
                }
            }
        }

        if !any_played {
            session.clear_levels();
            std::thread::sleep(IDLE_SLEEP);
            continue;
        }

        rendered_blocks = rendered_blocks.wrapping_add(1);
        if rendered_blocks % LEVELS_EVERY_N_BLOCKS == 0 {
            let levels = session
                .levels_snapshot()
                .into_iter()
                .map(|(track, peak_l, peak_r)| TrackLevel { track, peak_l, peak_r })
                .collect();
            notifier.send(&Response::TrackLevels { levels });
        }

        for i in 0..BLOCK {
            scratch.interleaved[i * OUT_CHANNELS] = scratch.mix_l[i];
            scratch.interleaved[i * OUT_CHANNELS + 1] = scratch.mix_r[i];
        }
        if let Err(e) = sink.write(&scratch.interleaved, BLOCK) {
            warn!("sink write failed: {e}");
        }
    }
}

/// Renders one track's block into `scratch.buf_l`/`buf_r`, advances its
/// cursor, and returns its peak levels, or `None` if nothing is playing.
fn render_track(
    track: &mut Track,
    tempo_bpm: f64,
    sample_rate: f64,
    time_per_block: f64,
    scratch: &mut Scratch,
) -> Option<(f32, f32)> {
    let slot = track.playing_slot?;
    scratch.buf_l.fill(0.0);
    scratch.buf_r.fill(0.0);

    let host_ctx = HostContext {
        sample_rate,
        tempo_bpm,
        time_sig_num: 4,
        time_sig_den: 4,
        continuous_time_samples: (track.cursor_sec * sample_rate).round() as i64,
        project_time_music: track.cursor_sec * tempo_bpm / 60.0,
    };

    let clip = track.clips.get(&slot)?;
    let is_loop = clip.is_loop();
    let duration_sec = clip.duration_sec();
    let is_midi = matches!(clip, Clip::Midi(_));

    if is_midi {
        collect_midi_window(track, slot, time_per_block, sample_rate, &mut scratch.events);
        run_midi_chain(track, &host_ctx, scratch);
    } else {
        read_audio_window(track, slot, sample_rate, &mut scratch.buf_l, &mut scratch.buf_r);
        run_audio_chain(track, &host_ctx, scratch);
    }

    track.cursor_sec += time_per_block;
    if track.cursor_sec >= duration_sec {
        if is_loop {
            track.cursor_sec %= duration_sec;
            track.midi_cursor_idx = 0;
        } else {
            track.playing_slot = None;
        }
    }

    let peak_l = scratch.buf_l.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    let peak_r = scratch.buf_r.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    Some((peak_l, peak_r))
}

/// Half-open `[cursor_sec, cursor_sec + time_per_block)` window (spec.md §9
/// pins the strict-less-than upper bound).
fn collect_midi_window(
    track: &mut Track,
    slot: i32,
    time_per_block: f64,
    sample_rate: f64,
    events: &mut Vec<MidiNoteEvent>,
) {
    events.clear();
    let cursor_sec = track.cursor_sec;
    let window_end = cursor_sec + time_per_block;
    let Some(Clip::Midi(midi_clip)) = track.clips.get(&slot) else {
        return;
    };
    while track.midi_cursor_idx < midi_clip.events.len()
        && midi_clip.events[track.midi_cursor_idx].time_sec < window_end
    {
        let ev = midi_clip.events[track.midi_cursor_idx];
        if ev.time_sec >= cursor_sec && (ev.is_note_on() || ev.is_note_off()) {
            let offset = ((ev.time_sec - cursor_sec) * sample_rate).round();
            let offset = offset.clamp(0.0, (BLOCK - 1) as f64) as u32;
            events.push(MidiNoteEvent {
                sample_offset: offset,
                channel: ev.channel,
                pitch: ev.note,
                velocity: if ev.is_note_on() { ev.velocity as f32 / 127.0 } else { 0.0 },
                is_note_on: ev.is_note_on(),
            });
        }
        track.midi_cursor_idx += 1;
    }
}

/// First plugin in the chain receives the block's MIDI events and `None`
/// input (it is expected to be the instrument); later plugins chain on the
/// previous stage's output with no events.
fn run_midi_chain(track: &mut Track, host_ctx: &HostContext, scratch: &mut Scratch) {
    for (i, chain_slot) in track.chain.iter_mut().enumerate() {
        if i == 0 {
            if let Err(e) = chain_slot.plugin.process(
                None,
                [&mut scratch.buf_l, &mut scratch.buf_r],
                BLOCK,
                host_ctx,
                &scratch.events,
            ) {
                warn!("plugin {} process failed: {e}", chain_slot.plugin.display_name());
            }
        } else {
            scratch.tmp_l.copy_from_slice(&scratch.buf_l);
            scratch.tmp_r.copy_from_slice(&scratch.buf_r);
            if let Err(e) = chain_slot.plugin.process(
                Some([&scratch.tmp_l, &scratch.tmp_r]),
                [&mut scratch.buf_l, &mut scratch.buf_r],
                BLOCK,
                host_ctx,
                &[],
            ) {
                warn!("plugin {} process failed: {e}", chain_slot.plugin.display_name());
            }
        }
    }
}

/// Reads the decoded audio clip at the track's current cursor; out-of-range
/// reads yield silence (already the default from `AudioClip::frame_at`).
fn read_audio_window(track: &Track, slot: i32, sample_rate: f64, buf_l: &mut [f32], buf_r: &mut [f32]) {
    let Some(Clip::Audio(audio_clip)) = track.clips.get(&slot) else {
        return;
    };
    let cursor_sec = track.cursor_sec;
    for i in 0..BLOCK {
        let t = cursor_sec + i as f64 / sample_rate;
        let (l, r) = audio_clip.frame_at(t);
        buf_l[i] = l;
        buf_r[i] = r;
    }
}

/// Runs the decoded audio through every effect in the chain, skipping any
/// instrument (defensive: the exclusivity rule should already have removed
/// it, spec.md §4.3(e)).
fn run_audio_chain(track: &mut Track, host_ctx: &HostContext, scratch: &mut Scratch) {
    for chain_slot in track.chain.iter_mut() {
        if chain_slot.plugin.is_instrument() {
            continue;
        }
        scratch.tmp_l.copy_from_slice(&scratch.buf_l);
        scratch.tmp_r.copy_from_slice(&scratch.buf_r);
        if let Err(e) = chain_slot.plugin.process(
            Some([&scratch.tmp_l, &scratch.tmp_r]),
            [&mut scratch.buf_l, &mut scratch.buf_r],
            BLOCK,
            host_ctx,
            &[],
        ) {
            warn!("plugin {} process failed: {e}", chain_slot.plugin.display_name());
        }
    }
}
