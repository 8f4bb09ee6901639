//! Servo bank: owns the registered servos and the bus they are driven over.
//!
//! After [`ServoController::start`] every servo lives on a single worker
//! thread. Automatic tracking, manual jog keys and the speaking mouth all talk
//! to it through cloneable [`ServoHandle`]s, so commands to a channel are
//! applied and mirrored to the bus in exactly the order they were sent.
//!
//! The bank publishes each channel's last driven pulse width, so
//! [`ServoHandle::position`] answers without waiting behind queued settles.
//!
//! If the bus cannot be opened the caller gets [`Error::HardwareUnavailable`]
//! and can carry on with [`ServoHandle::disconnected`], whose commands are
//! silently dropped.

use crate::{
    constants::SERVO_QUEUE_CAPACITY,
    error::{Error, Result},
    servo::Servo,
    servo_bus::ServoBus,
    worker::Worker,
};
use crossbeam_channel::{Sender, TrySendError};
use log::{debug, info, trace, warn};
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// A request to the servo bank worker
#[derive(Debug)]
pub enum ServoCommand {
    /// Absolute pulse width, clamped to the servo's bounds
    SetPw { channel: u8, pulse_width: i32 },
    /// Relative move from the current pulse width
    ChangePwRelative { channel: u8, delta: i32 },
    /// Return to the initial pulse width
    Home { channel: u8 },
    /// Stop driving the channel
    Off { channel: u8 },
    /// Pause the queue, letting servos reach their targets
    Settle(Duration),
    /// Report the current state of a servo
    Query { channel: u8, reply: Sender<Option<Servo>> },
    /// Power everything off, close the bus and stop the worker
    Shutdown,
}

/// Last driven pulse width per channel, readable from any thread
type Positions = Arc<BTreeMap<u8, AtomicU16>>;

/// Worker-side state: the only place servos are mutated once the bank runs
struct Bank {
    servos: BTreeMap<u8, Servo>,
    positions: Positions,
    bus: Box<dyn ServoBus>,
    bus_failed: bool,
}

impl Bank {
    fn apply(&mut self, command: ServoCommand) -> ControlFlow<()> {
        match command {
            ServoCommand::SetPw { channel, pulse_width } => {
                self.drive(channel, |servo| servo.set_pw(pulse_width));
            }
            ServoCommand::ChangePwRelative { channel, delta } => {
                self.drive(channel, |servo| servo.change_pw_relative(delta));
            }
            ServoCommand::Home { channel } => {
                self.drive(channel, |servo| servo.set_pw(i32::from(servo.initial_pw())));
            }
            ServoCommand::Off { channel } => self.release(channel),
            ServoCommand::Settle(duration) => thread::sleep(duration),
            ServoCommand::Query { channel, reply } => {
                reply.send(self.servos.get(&channel).cloned()).ok();
            }
            ServoCommand::Shutdown => {
                let channels: Vec<u8> = self.servos.keys().copied().collect();
                for channel in channels {
                    self.release(channel);
                }
                if let Err(e) = self.bus.close() {
                    warn!("Failed to close servo bus: {e}");
                }
                info!("Servo bank stopped");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn drive(&mut self, channel: u8, update: impl FnOnce(&mut Servo)) {
        let Some(servo) = self.servos.get_mut(&channel) else {
            warn!("Ignoring command for unregistered servo channel {channel}");
            return;
        };
        update(servo);
        let pulse_width = servo.pw();
        if let Some(position) = self.positions.get(&channel) {
            position.store(pulse_width, Ordering::Relaxed);
        }
        trace!("servo {channel} -> {pulse_width}");
        let result = self.bus.set_target(channel, pulse_width);
        self.report(result);
    }

    fn release(&mut self, channel: u8) {
        let Some(servo) = self.servos.get_mut(&channel) else {
            warn!("Ignoring power-off for unregistered servo channel {channel}");
            return;
        };
        servo.set_off();
        let result = self.bus.set_off(channel);
        self.report(result);
    }

    fn report(&mut self, result: Result<()>) {
        match result {
            Ok(()) => {}
            Err(e) if !self.bus_failed => {
                warn!("Servo bus write failed: {e}");
                self.bus_failed = true;
            }
            Err(e) => debug!("Servo bus write failed: {e}"),
        }
    }
}

/// Owner of the servo set and its bus lifecycle
#[derive(Default)]
pub struct ServoController {
    registered: BTreeMap<u8, Servo>,
    positions: Positions,
    worker: Option<Worker<ServoCommand>>,
}

impl ServoController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a servo to the bank. Must happen before [`ServoController::start`].
    ///
    /// # Errors
    ///
    /// Returns an error if the bank is already running or the channel is taken.
    pub fn register_servo(&mut self, servo: Servo) -> Result<()> {
        if self.worker.is_some() {
            return Err(Error::InvalidInput(format!(
                "cannot register servo {} on a running bank",
                servo.channel()
            )));
        }
        if self.registered.contains_key(&servo.channel()) {
            return Err(Error::InvalidInput(format!(
                "servo channel {} registered twice",
                servo.channel()
            )));
        }
        self.registered.insert(servo.channel(), servo);
        Ok(())
    }

    /// Open the bus with `open` and start the bank worker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareUnavailable`] if the bus cannot be opened or
    /// the worker thread cannot be spawned.
    pub fn start<B, F>(&mut self, open: F) -> Result<ServoHandle>
    where
        B: ServoBus + 'static,
        F: FnOnce() -> Result<B>,
    {
        if self.worker.is_some() {
            return Ok(self.handle());
        }

        let bus = open().map_err(|e| match e {
            Error::HardwareUnavailable(msg) => Error::HardwareUnavailable(msg),
            other => Error::HardwareUnavailable(other.to_string()),
        })?;

        self.positions = Arc::new(
            self.registered
                .iter()
                .map(|(&channel, servo)| (channel, AtomicU16::new(servo.pw())))
                .collect(),
        );
        let mut bank = Bank {
            servos: self.registered.clone(),
            positions: Arc::clone(&self.positions),
            bus: Box::new(bus),
            bus_failed: false,
        };
        let worker = Worker::spawn("servo-bank", SERVO_QUEUE_CAPACITY, move |command| bank.apply(command))
            .map_err(|e| Error::HardwareUnavailable(format!("failed to spawn servo worker: {e}")))?;

        info!("Servo bank started with {} servos", self.registered.len());
        self.worker = Some(worker);
        Ok(self.handle())
    }

    /// A handle for sending commands; disconnected if the bank is not running
    #[must_use]
    pub fn handle(&self) -> ServoHandle {
        match &self.worker {
            Some(worker) => ServoHandle {
                sender: Some(worker.sender()),
                positions: Some(Arc::clone(&self.positions)),
            },
            None => ServoHandle::disconnected(),
        }
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Power off every servo, close the bus and stop the worker.
    ///
    /// Safe to call repeatedly; only the first call reaches the bus.
    pub fn close(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.sender().send(ServoCommand::Shutdown).ok();
            worker.join();
        }
    }
}

impl Drop for ServoController {
    fn drop(&mut self) {
        self.close();
    }
}

/// Cloneable command endpoint for the servo bank
#[derive(Clone, Default)]
pub struct ServoHandle {
    sender: Option<Sender<ServoCommand>>,
    positions: Option<Positions>,
}

impl ServoHandle {
    /// A handle that drops every command (no hardware)
    #[must_use]
    pub const fn disconnected() -> Self {
        Self {
            sender: None,
            positions: None,
        }
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.sender.is_some()
    }

    fn send(&self, command: ServoCommand) {
        if let Some(sender) = &self.sender {
            if sender.send(command).is_err() {
                trace!("servo bank closed, command dropped");
            }
        }
    }

    pub fn set_pw(&self, channel: u8, pulse_width: i32) {
        self.send(ServoCommand::SetPw { channel, pulse_width });
    }

    pub fn change_pw_relative(&self, channel: u8, delta: i32) {
        self.send(ServoCommand::ChangePwRelative { channel, delta });
    }

    /// Queue a relative move only if the bank has room for it right now.
    ///
    /// Returns `false` when the move was dropped (queue full or disconnected).
    pub fn try_change_pw_relative(&self, channel: u8, delta: i32) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };
        match sender.try_send(ServoCommand::ChangePwRelative { channel, delta }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                trace!("servo queue full, dropping move of channel {channel}");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn increment(&self, channel: u8, step: i32) {
        self.change_pw_relative(channel, step);
    }

    pub fn decrement(&self, channel: u8, step: i32) {
        self.change_pw_relative(channel, step.saturating_neg());
    }

    pub fn home(&self, channel: u8) {
        self.send(ServoCommand::Home { channel });
    }

    pub fn set_off(&self, channel: u8) {
        self.send(ServoCommand::Off { channel });
    }

    pub fn settle(&self, duration: Duration) {
        self.send(ServoCommand::Settle(duration));
    }

    /// Last pulse width the bank drove on `channel`, without waiting on the queue.
    ///
    /// Returns `None` when disconnected or the channel is unknown.
    #[must_use]
    pub fn position(&self, channel: u8) -> Option<u16> {
        self.positions
            .as_ref()?
            .get(&channel)
            .map(|position| position.load(Ordering::Relaxed))
    }

    /// Current state of a servo after every previously sent command has been applied.
    ///
    /// Returns `None` when disconnected or the channel is unknown.
    #[must_use]
    pub fn snapshot(&self, channel: u8) -> Option<Servo> {
        let sender = self.sender.as_ref()?;
        let (reply, answer) = crossbeam_channel::bounded(1);
        sender.send(ServoCommand::Query { channel, reply }).ok()?;
        answer.recv().ok().flatten()
    }
}
