//! Spoken announcements off the video path.
//!
//! The frame loop hands text to an [`Announcer`], which queues it for a
//! single background worker. The worker suppresses an identical message
//! repeated within the repeat window, optionally opens and closes the robot's
//! mouth around the speech, and swallows sink failures.

use crate::{
    error::{Error, Result},
    servo_controller::ServoHandle,
    worker::Worker,
};
use crossbeam_channel::{Sender, TrySendError};
use log::{debug, info};
use std::ops::ControlFlow;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Somewhere text can be spoken or displayed
pub trait AnnouncementSink: Send {
    /// Perform the announcement, blocking until it is done
    fn announce(&mut self, text: &str) -> Result<()>;
}

/// Speaks through an external text-to-speech program such as `say` or `espeak`
#[derive(Debug, Clone)]
pub struct CommandSpeech {
    program: String,
    args: Vec<String>,
}

impl CommandSpeech {
    /// `args` come before the text, which is passed as the last argument
    pub fn new<S: Into<String>>(program: S, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl AnnouncementSink for CommandSpeech {
    fn announce(&mut self, text: &str) -> Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .map_err(|e| Error::Announcement(format!("failed to run {}: {e}", self.program)))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::Announcement(format!("{} exited with {status}", self.program)))
        }
    }
}

/// Drops a message identical to the last one spoken within `window`
#[derive(Debug, Clone)]
pub struct RepeatSuppressor {
    window: Duration,
    last: Option<(String, Instant)>,
}

impl RepeatSuppressor {
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    #[must_use]
    pub fn allows(&self, text: &str, now: Instant) -> bool {
        match &self.last {
            Some((last_text, at)) => last_text != text || now.saturating_duration_since(*at) >= self.window,
            None => true,
        }
    }

    /// Remember a message that was actually spoken
    pub fn record(&mut self, text: &str, now: Instant) {
        self.last = Some((text.to_string(), now));
    }
}

/// Opens the mouth servo while speaking
#[derive(Clone)]
pub struct MouthAnimation {
    pub servos: ServoHandle,
    pub channel: u8,
    pub open_pw: u16,
    pub closed_pw: u16,
    pub settle: Duration,
}

impl MouthAnimation {
    fn open(&self) {
        self.servos.set_pw(self.channel, i32::from(self.open_pw));
    }

    fn close(&self) {
        self.servos.set_pw(self.channel, i32::from(self.closed_pw));
        self.servos.settle(self.settle);
        self.servos.set_off(self.channel);
    }
}

/// Handle to the announcement worker
pub struct Announcer {
    worker: Worker<String>,
    sender: Sender<String>,
}

impl Announcer {
    /// Start the worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread cannot be spawned.
    pub fn spawn(
        mut sink: Box<dyn AnnouncementSink>,
        repeat_window: Duration,
        capacity: usize,
        mouth: Option<MouthAnimation>,
    ) -> Result<Self> {
        let mut suppressor = RepeatSuppressor::new(repeat_window);
        let worker = Worker::spawn("announcer", capacity.max(1), move |text: String| {
            let now = Instant::now();
            if !suppressor.allows(&text, now) {
                debug!("Suppressing repeated announcement '{text}'");
                return ControlFlow::Continue(());
            }

            if let Some(mouth) = &mouth {
                mouth.open();
            }
            match sink.announce(&text) {
                Ok(()) => {
                    info!("Announced '{text}'");
                    suppressor.record(&text, Instant::now());
                }
                Err(e) => debug!("Announcement '{text}' failed: {e}"),
            }
            if let Some(mouth) = &mouth {
                mouth.close();
            }
            ControlFlow::Continue(())
        })
        .map_err(|e| Error::Announcement(format!("failed to spawn announcer: {e}")))?;

        let sender = worker.sender();
        Ok(Self { worker, sender })
    }

    /// Queue `text` without blocking. Returns `false` if it was dropped
    /// because the worker is still busy with earlier announcements.
    pub fn announce<S: Into<String>>(&self, text: S) -> bool {
        match self.sender.try_send(text.into()) {
            Ok(()) => true,
            Err(TrySendError::Full(text)) => {
                debug!("Announcer busy, dropping '{text}'");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Finish any queued announcements and stop the worker
    pub fn shutdown(self) {
        drop(self.sender);
        self.worker.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_message_suppressed_inside_window() {
        let start = Instant::now();
        let mut suppressor = RepeatSuppressor::new(Duration::from_secs(5));
        assert!(suppressor.allows("3", start));
        suppressor.record("3", start);

        assert!(!suppressor.allows("3", start + Duration::from_secs(4)));
        assert!(suppressor.allows("4", start + Duration::from_secs(1)));
        assert!(suppressor.allows("3", start + Duration::from_secs(5)));
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let mut speech = CommandSpeech::new("definitely-not-a-speech-program", Vec::new());
        assert!(matches!(speech.announce("hello"), Err(Error::Announcement(_))));
    }
}
