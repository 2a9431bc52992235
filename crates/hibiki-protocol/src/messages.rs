//! Request and response payload schemas (spec.md §6.1), `bincode`-encoded
//! inside the frames produced by [`crate::framing`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    LoadPlugin { track: i32, path: String, subindex: i32 },
    LoadClip { track: i32, slot: i32, path: String, is_loop: bool },
    SetClipLoop { track: i32, slot: i32, is_loop: bool },
    DeleteClip { track: i32, slot: i32 },
    PlayClip { track: i32, slot: i32 },
    PlayScene { slot: i32 },
    Stop,
    StopTrack { track: i32 },
    RemovePlugin { track: i32, position: usize },
    ShowPluginGui { track: i32, position: usize },
    SetParamValue { track: i32, position: usize, id: u32, value: f32 },
    SetBpm { bpm: f32 },
    SaveProject { path: String },
    LoadProject { path: String },
    Quit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSnapshot {
    pub id: u32,
    pub name: String,
    pub default: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrackLevel {
    pub track: i32,
    pub peak_l: f32,
    pub peak_r: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    Acknowledge { cmd_name: String, success: bool },
    ParamList {
        track: i32,
        position: usize,
        plugin_name: String,
        is_instrument: bool,
        params: Vec<ParamSnapshot>,
    },
    ClipInfo { track: i32, slot: i32, display_name: String },
    ClipWaveform { track: i32, slot: i32, peaks: Box<[f32; 256]> },
    TrackLevels { levels: Vec<TrackLevel> },
    Log { msg: String },
    ClearProject,
}

impl Response {
    pub fn ack(cmd_name: &str, success: bool) -> Self {
        Response::Acknowledge { cmd_name: cmd_name.to_string(), success }
    }

    pub fn log(msg: impl Into<String>) -> Self {
        Response::Log { msg: msg.into() }
    }
}
