//! Clip and MIDI event data model.

use serde::{Deserialize, Serialize};

/// Number of peak buckets kept for an audio clip's waveform overview.
pub const WAVEFORM_BUCKETS: usize = 256;

/// Trailing silence margin appended to a MIDI clip's duration so loop wrap
/// does not drop the final event.
pub const MIDI_TAIL_MARGIN_SEC: f64 = 0.1;

/// A single timed MIDI status byte, decoded from a MIDI file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MidiEvent {
    pub time_sec: f64,
    pub status: u8,
    pub channel: u8,
    pub note: u8,
    pub velocity: u8,
}

impl MidiEvent {
    pub fn is_note_on(&self) -> bool {
        self.status & 0xF0 == 0x90 && self.velocity > 0
    }

    pub fn is_note_off(&self) -> bool {
        (self.status & 0xF0 == 0x80) || (self.status & 0xF0 == 0x90 && self.velocity == 0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClipKind {
    Midi,
    Audio,
}

/// An immutable-after-load unit of playable media bound to a track slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Clip {
    Midi(MidiClip),
    Audio(AudioClip),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiClip {
    pub source_path: String,
    pub is_loop: bool,
    pub events: Vec<MidiEvent>,
    pub duration_sec: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioClip {
    pub source_path: String,
    pub is_loop: bool,
    /// Interleaved float frames, `channels` samples per frame.
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: f64,
    pub duration_sec: f64,
    pub waveform_summary: [f32; WAVEFORM_BUCKETS],
}

impl Clip {
    pub fn kind(&self) -> ClipKind {
        match self {
            Clip::Midi(_) => ClipKind::Midi,
            Clip::Audio(_) => ClipKind::Audio,
        }
    }

    pub fn source_path(&self) -> &str {
        match self {
            Clip::Midi(c) => &c.source_path,
            Clip::Audio(c) => &c.source_path,
        }
    }

    pub fn is_loop(&self) -> bool {
        match self {
            Clip::Midi(c) => c.is_loop,
            Clip::Audio(c) => c.is_loop,
        }
    }

    pub fn set_loop(&mut self, is_loop: bool) {
        match self {
            Clip::Midi(c) => c.is_loop = is_loop,
            Clip::Audio(c) => c.is_loop = is_loop,
        }
    }

    pub fn duration_sec(&self) -> f64 {
        match self {
            Clip::Midi(c) => c.duration_sec,
            Clip::Audio(c) => c.duration_sec,
        }
    }
}

impl MidiClip {
    /// Builds a clip from a decoded, ascending, possibly-unsorted event list.
    /// Returns `None` for an empty event list (a load failure per the data model).
    pub fn from_events(source_path: String, is_loop: bool, mut events: Vec<MidiEvent>) -> Option<Self> {
        if events.is_empty() {
            return None;
        }
        events.sort_by(|a, b| a.time_sec.partial_cmp(&b.time_sec).unwrap());
        let last = events.iter().map(|e| e.time_sec).fold(f64::MIN, f64::max);
        Some(Self {
            source_path,
            is_loop,
            events,
            duration_sec: last + MIDI_TAIL_MARGIN_SEC,
        })
    }
}

impl AudioClip {
    /// Computes the 256-bucket peak envelope of the left channel (or the
    /// single channel of a mono source).
    pub fn compute_waveform_summary(samples: &[f32], channels: u16) -> [f32; WAVEFORM_BUCKETS] {
        let mut summary = [0.0f32; WAVEFORM_BUCKETS];
        let channels = channels.max(1) as usize;
        let frame_count = samples.len() / channels;
        if frame_count == 0 {
            return summary;
        }
        let frames_per_bucket = (frame_count as f64 / WAVEFORM_BUCKETS as f64).max(1.0);
        for (bucket, slot) in summary.iter_mut().enumerate() {
            let start = (bucket as f64 * frames_per_bucket) as usize;
            let end = (((bucket + 1) as f64 * frames_per_bucket) as usize).min(frame_count);
            let mut peak = 0.0f32;
            for frame in start..end {
                let left = samples[frame * channels];
                peak = peak.max(left.abs());
            }
            *slot = peak;
        }
        summary
    }

    /// Reads one output frame at `cursor_sec`, summing to stereo. Out-of-range
    /// reads yield silence.
    pub fn frame_at(&self, cursor_sec: f64) -> (f32, f32) {
        let frame_idx = (cursor_sec * self.sample_rate) as usize;
        let channels = self.channels.max(1) as usize;
        let base = frame_idx * channels;
        if base + channels > self.samples.len() {
            return (0.0, 0.0);
        }
        if channels >= 2 {
            (self.samples[base], self.samples[base + 1])
        } else {
            let mono = self.samples[base];
            (mono, mono)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(time_sec: f64) -> MidiEvent {
        MidiEvent { time_sec, status: 0x90, channel: 0, note: 60, velocity: 100 }
    }

    #[test]
    fn empty_event_list_fails_to_load() {
        assert!(MidiClip::from_events("t.mid".into(), false, Vec::new()).is_none());
    }

    #[test]
    fn duration_is_last_event_time_plus_tail_margin() {
        let clip = MidiClip::from_events("t.mid".into(), false, vec![note(0.0), note(1.2)]).unwrap();
        assert!((clip.duration_sec - (1.2 + MIDI_TAIL_MARGIN_SEC)).abs() < 1e-9);
    }

    #[test]
    fn events_are_sorted_ascending_with_stable_ties() {
        let clip = MidiClip::from_events(
            "t.mid".into(),
            false,
            vec![
                MidiEvent { note: 2, ..note(0.5) },
                MidiEvent { note: 1, ..note(0.1) },
                MidiEvent { note: 3, ..note(0.5) },
            ],
        )
        .unwrap();
        let notes: Vec<u8> = clip.events.iter().map(|e| e.note).collect();
        assert_eq!(notes, vec![1, 2, 3]);
    }

    #[test]
    fn waveform_summary_has_one_peak_per_bucket_for_uniform_signal() {
        let samples = vec![0.5f32; 256 * 4 * 2];
        let summary = AudioClip::compute_waveform_summary(&samples, 2);
        assert!(summary.iter().all(|&p| (p - 0.5).abs() < 1e-6));
    }

    #[test]
    fn frame_at_out_of_range_is_silent() {
        let clip = AudioClip {
            source_path: "t.wav".into(),
            is_loop: false,
            samples: vec![1.0, 1.0],
            channels: 2,
            sample_rate: 44_100.0,
            duration_sec: 1.0 / 44_100.0,
            waveform_summary: [0.0; WAVEFORM_BUCKETS],
        };
        assert_eq!(clip.frame_at(10.0), (0.0, 0.0));
    }
}
