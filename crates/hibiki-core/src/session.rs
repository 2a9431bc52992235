//! Session: the set of tracks, global tempo, and per-track level snapshots
//! owned exclusively by `main` and borrowed by the Scheduler and Command
//! Router threads for the life of the process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use atomic_float::AtomicF64;

use crate::track::Track;

pub struct Session {
    tempo_bpm: Mutex<f64>,
    sample_rate: AtomicF64,
    pub tracks: Mutex<HashMap<i32, Mutex<Track>>>,
    pub levels: Mutex<HashMap<i32, (f32, f32)>>,
    pub quit: AtomicBool,
}

impl Session {
    pub fn new(tempo_bpm: f64, sample_rate: f64) -> Self {
        Self {
            tempo_bpm: Mutex::new(tempo_bpm),
            sample_rate: AtomicF64::new(sample_rate),
            tracks: Mutex::new(HashMap::new()),
            levels: Mutex::new(HashMap::new()),
            quit: AtomicBool::new(false),
        }
    }

    pub fn tempo_bpm(&self) -> f64 {
        *self.tempo_bpm.lock().unwrap()
    }

    pub fn set_tempo_bpm(&self, bpm: f64) {
        *self.tempo_bpm.lock().unwrap() = bpm;
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate.load(Ordering::Acquire)
    }

    /// Latches the device's actual sample rate. Called once, before the
    /// Scheduler's first block; the spec treats the session rate as
    /// immutable thereafter.
    pub fn set_sample_rate(&self, rate: f64) {
        self.sample_rate.store(rate, Ordering::Release);
    }

    pub fn is_quitting(&self) -> bool {
        self.quit.load(Ordering::Acquire)
    }

    pub fn request_quit(&self) {
        self.quit.store(true, Ordering::Release);
    }

    /// Lazily inserts a track under `tracks_lock` and runs `f` against it
    /// under that track's own lock.
    pub fn with_track<R>(&self, index: i32, f: impl FnOnce(&mut Track) -> R) -> R {
        let tracks = self.tracks.lock().unwrap();
        if let Some(track_lock) = tracks.get(&index) {
            let mut track = track_lock.lock().unwrap();
            return f(&mut track);
        }
        drop(tracks);
        let mut tracks = self.tracks.lock().unwrap();
        let track_lock = tracks
            .entry(index)
            .or_insert_with(|| Mutex::new(Track::new(index)));
        let mut track = track_lock.lock().unwrap();
        f(&mut track)
    }

    pub fn has_track(&self, index: i32) -> bool {
        self.tracks.lock().unwrap().contains_key(&index)
    }

    pub fn clear_tracks(&self) {
        self.tracks.lock().unwrap().clear();
        self.levels.lock().unwrap().clear();
    }

    pub fn track_indices(&self) -> Vec<i32> {
        self.tracks.lock().unwrap().keys().copied().collect()
    }

    pub fn set_level(&self, index: i32, peak_l: f32, peak_r: f32) {
        self.levels.lock().unwrap().insert(index, (peak_l, peak_r));
    }

    pub fn clear_levels(&self) {
        self.levels.lock().unwrap().clear();
    }

    pub fn levels_snapshot(&self) -> Vec<(i32, f32, f32)> {
        self.levels
            .lock()
            .unwrap()
            .iter()
            .map(|(idx, (l, r))| (*idx, *l, *r))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_track_is_lazy() {
        let session = Session::new(120.0, 44100.0);
        assert!(!session.has_track(3));
        session.with_track(3, |t| t.index = t.index);
        assert!(session.has_track(3));
    }
}
