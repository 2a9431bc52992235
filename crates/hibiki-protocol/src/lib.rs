//! Length-framed command/response wire protocol between the front-end
//! process and the engine, and the project file codec built on the same
//! `bincode` encoding.

pub mod error;
pub mod framing;
pub mod messages;
pub mod project;

pub use error::ProtocolError;
pub use framing::{read_frame, write_frame, MAX_FRAME_LEN};
pub use messages::{ParamSnapshot, Request, Response, TrackLevel};
pub use project::{decode_project, encode_project, Project, ProjectClip, ProjectPlugin, ProjectTrack};
