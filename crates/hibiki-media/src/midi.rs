//! MIDI file decoding into the engine's flat, time-sorted `MidiEvent` list.

use std::path::Path;

use hibiki_core::clip::{Clip, MidiClip, MidiEvent};
use midly::{Smf, TrackEventKind};

use crate::error::MediaError;

#[derive(Clone, Copy)]
struct TempoSegment {
    tick: u64,
    seconds_at_tick: f64,
    us_per_beat: u32,
}

const DEFAULT_US_PER_BEAT: u32 = 500_000; // 120 BPM, MIDI's implicit default tempo.

fn build_tempo_segments(tempo_events: &[(u64, u32)], ticks_per_beat: f64) -> Vec<TempoSegment> {
    let mut segments = vec![TempoSegment {
        tick: 0,
        seconds_at_tick: 0.0,
        us_per_beat: DEFAULT_US_PER_BEAT,
    }];
    for &(tick, us_per_beat) in tempo_events {
        let prev = *segments.last().unwrap();
        let delta_ticks = tick.saturating_sub(prev.tick);
        let seconds_at_tick =
            prev.seconds_at_tick + (delta_ticks as f64 * prev.us_per_beat as f64) / (1_000_000.0 * ticks_per_beat);
        segments.push(TempoSegment { tick, seconds_at_tick, us_per_beat });
    }
    segments
}

fn ticks_to_seconds(tick: u64, segments: &[TempoSegment], ticks_per_beat: f64) -> f64 {
    let mut active = segments[0];
    for segment in segments.iter().skip(1) {
        if segment.tick > tick {
            break;
        }
        active = *segment;
    }
    let delta_ticks = tick.saturating_sub(active.tick);
    active.seconds_at_tick + (delta_ticks as f64 * active.us_per_beat as f64) / (1_000_000.0 * ticks_per_beat)
}

/// Parses a Standard MIDI File into a loaded `Clip::Midi`. An empty result
/// (no note events after parsing) is a load failure per the data model.
pub fn load_midi_clip(path: &Path, is_loop: bool) -> Result<Clip, MediaError> {
    let bytes = std::fs::read(path).map_err(MediaError::Io)?;
    let smf = Smf::parse(&bytes).map_err(|e| MediaError::Midi(format!("{e}")))?;

    let ticks_per_beat = match smf.header.timing {
        midly::Timing::Metrical(t) => t.as_int() as f64,
        _ => 480.0,
    }
    .max(1.0);

    let mut raw_events: Vec<(u64, u8, u8, u8, u8)> = Vec::new();
    let mut tempo_events: Vec<(u64, u32)> = Vec::new();

    for track in &smf.tracks {
        let mut tick: u64 = 0;
        for event in track {
            tick += event.delta.as_int() as u64;
            match event.kind {
                TrackEventKind::Midi { channel, message } => {
                    let channel = channel.as_int() as u8;
                    match message {
                        midly::MidiMessage::NoteOn { key, vel } => {
                            raw_events.push((tick, 0x90, channel, key.as_int() as u8, vel.as_int() as u8));
                        }
                        midly::MidiMessage::NoteOff { key, .. } => {
                            raw_events.push((tick, 0x80, channel, key.as_int() as u8, 0));
                        }
                        _ => {}
                    }
                }
                TrackEventKind::Meta(midly::MetaMessage::Tempo(us)) => {
                    tempo_events.push((tick, us.as_int()));
                }
                _ => {}
            }
        }
    }

    tempo_events.sort_by_key(|(tick, _)| *tick);
    let segments = build_tempo_segments(&tempo_events, ticks_per_beat);

    let events: Vec<MidiEvent> = raw_events
        .into_iter()
        .map(|(tick, status, channel, note, velocity)| MidiEvent {
            time_sec: ticks_to_seconds(tick, &segments, ticks_per_beat),
            status,
            channel,
            note,
            velocity,
        })
        .collect();

    MidiClip::from_events(path.display().to_string(), is_loop, events)
        .map(Clip::Midi)
        .ok_or_else(|| MediaError::Midi(format!("{} has no note events", path.display())))
}
