//! The single outbound-writer lock shared by the Scheduler and Command
//! Router threads (spec.md §5: "All outbound notifications share a single
//! serialized writer").

use std::io::Write;
use std::sync::Mutex;

use hibiki_protocol::{write_frame, Response};
use tracing::warn;

pub struct Notifier {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl Notifier {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self { writer: Mutex::new(writer) }
    }

    /// Serializes and frames `response`, logging (not panicking) on a
    /// write failure since a broken pipe on the notification stream must
    /// not take down the audio thread.
    pub fn send(&self, response: &Response) {
        let payload = match bincode::serialize(response) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed to encode notification: {e}");
                return;
            }
        };
        let mut writer = self.writer.lock().unwrap();
        if let Err(e) = write_frame(&mut *writer, &payload) {
            warn!("failed to write notification frame: {e}");
        }
    }
}
