//! Interactive camera demo: face tracking and finger counting on a live feed.

use crate::{
    announcer::{Announcer, CommandSpeech, MouthAnimation},
    config::Config,
    face_detection::{FaceDetector, HaarFaceDetector},
    face_tracking::FaceTracker,
    hand_classifier::HandClassifier,
    jog::Jogger,
    pipeline::{FramePipeline, PipelineFlags},
    servo::Joint,
    servo_bus::MaestroBus,
    servo_controller::{ServoController, ServoHandle},
    Error, Result,
};
use log::{info, warn};
use opencv::{
    core::{Mat, Point, Scalar},
    highgui::{self, WINDOW_AUTOSIZE},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};

const KEY_ESCAPE: i32 = 27;

/// The running demo
pub struct DemoApp {
    config: Config,
    capture: VideoCapture,
    controller: ServoController,
    servos: ServoHandle,
    pipeline: FramePipeline,
    jogger: Jogger,
    flags: PipelineFlags,
}

impl DemoApp {
    /// Open the camera, the servo bank and the speech worker.
    ///
    /// A missing servo controller or face cascade only disables the feature
    /// that needs it.
    ///
    /// # Errors
    ///
    /// Returns an error if the camera cannot be opened or delivers no frame.
    pub fn new(config: Config, flags: PipelineFlags) -> Result<Self> {
        info!("Initializing InMoov vision demo");

        info!("Opening camera {}", config.camera.index);
        let mut capture = VideoCapture::new(config.camera.index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(Error::HardwareUnavailable(format!(
                "camera {} could not be opened",
                config.camera.index
            )));
        }
        capture.set(CAP_PROP_FRAME_WIDTH, f64::from(config.camera.width))?;
        capture.set(CAP_PROP_FRAME_HEIGHT, f64::from(config.camera.height))?;
        capture.set(CAP_PROP_BUFFERSIZE, 1.0)?;

        // The frame centre is fixed for the session from the first frame
        let mut first = Mat::default();
        if !capture.read(&mut first)? || first.empty() {
            return Err(Error::HardwareUnavailable("camera delivered no frame".to_string()));
        }
        info!("Capturing at {}x{}", first.cols(), first.rows());

        let (controller, servos) = start_servos(&config)?;

        let tracker = FaceTracker::new(
            first.cols(),
            first.rows(),
            config.tracking.gains(),
            config.rig.channel(Joint::Pan),
            config.rig.channel(Joint::Tilt),
        );
        let mut pipeline = FramePipeline::new(
            tracker,
            HandClassifier::new(config.counting.signature()),
            config.counting.stabilizer(),
            servos.clone(),
        );

        match HaarFaceDetector::new(&config.tracking.cascade, config.tracking.min_face_size) {
            Ok(detector) => pipeline = pipeline.with_detector(Box::new(detector) as Box<dyn FaceDetector>),
            Err(e) => warn!("Face tracking unavailable: {e}"),
        }

        if config.announcer.enabled {
            match start_announcer(&config, &servos) {
                Ok(announcer) => pipeline = pipeline.with_announcer(announcer),
                Err(e) => warn!("Speech unavailable: {e}"),
            }
        }

        let mut flags = flags;
        if flags.track_faces && !pipeline.can_track_faces() {
            flags.track_faces = false;
        }

        highgui::named_window(&config.display.window_title, WINDOW_AUTOSIZE)?;

        Ok(Self {
            jogger: Jogger::new(config.rig.clone(), &config.jog),
            config,
            capture,
            controller,
            servos,
            pipeline,
            flags,
        })
    }

    /// Run until the user quits, then release the servos and the speech worker
    ///
    /// # Errors
    ///
    /// Returns an error if the display or camera fails.
    pub fn run(mut self) -> Result<()> {
        let result = self.run_loop();
        self.shutdown();
        result
    }

    fn run_loop(&mut self) -> Result<()> {
        info!("Starting main loop (f: faces, c: count, q: quit)");

        loop {
            let mut frame = Mat::default();
            if !self.capture.read(&mut frame)? || frame.empty() {
                warn!("Failed to read frame, retrying...");
                continue;
            }

            let mut overlay = match self.pipeline.process_frame(&frame, self.flags) {
                Ok(report) => report.overlay,
                Err(e) => {
                    warn!("Frame processing failed: {e}");
                    frame
                }
            };

            if self.config.display.show_status {
                self.draw_status(&mut overlay)?;
            }
            highgui::imshow(&self.config.display.window_title, &overlay)?;

            let key = highgui::wait_key(1)?;
            if key < 0 {
                continue;
            }
            let key = key & 0xFF;
            if key == KEY_ESCAPE || key == i32::from(b'q') {
                info!("Exit requested by user");
                break;
            }
            if let Some(c) = u32::try_from(key).ok().and_then(char::from_u32) {
                self.handle_key(c);
            }
        }

        Ok(())
    }

    fn handle_key(&mut self, key: char) {
        match key {
            'f' => {
                if self.pipeline.can_track_faces() {
                    self.flags.track_faces = !self.flags.track_faces;
                    info!("Face tracking {}", on_off(self.flags.track_faces));
                } else {
                    warn!("Face tracking unavailable: no face detector");
                }
            }
            'c' => {
                self.flags.enable_counting = !self.flags.enable_counting;
                info!("Finger counting {}", on_off(self.flags.enable_counting));
            }
            other => {
                self.jogger.handle_key(other, &self.servos);
            }
        }
    }

    fn draw_status(&self, overlay: &mut Mat) -> Result<()> {
        let pan = self.config.rig.pan;
        let pan_pw = self.servos.position(pan.channel).unwrap_or(pan.initial_pw);

        let mut status = format!("Pan = {pan_pw:04}");
        if self.flags.track_faces {
            status.push_str("  faces");
        }
        if self.flags.enable_counting {
            status.push_str("  count");
        }
        if !self.servos.is_connected() {
            status.push_str("  (no servos)");
        }

        imgproc::put_text(
            overlay,
            &status,
            Point::new(10, 30),
            FONT_HERSHEY_SIMPLEX,
            0.8,
            Scalar::new(0.0, 255.0, 0.0, 0.0),
            2,
            LINE_8,
            false,
        )?;
        Ok(())
    }

    fn shutdown(self) {
        info!("Application shutting down");
        let Self {
            pipeline,
            mut controller,
            ..
        } = self;
        // The announcer may still be moving the mouth
        pipeline.shutdown();
        controller.close();
        if let Err(e) = highgui::destroy_all_windows() {
            warn!("Failed to close windows: {e}");
        }
    }
}

const fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

/// Register the rig and try to open the bus; fall back to a disconnected handle
fn start_servos(config: &Config) -> Result<(ServoController, ServoHandle)> {
    let mut controller = ServoController::new();
    for joint in Joint::ALL {
        controller.register_servo(config.rig.servo(joint).to_servo())?;
    }

    if !config.bus.enabled {
        info!("Servo output disabled");
        return Ok((controller, ServoHandle::disconnected()));
    }

    let device = config.bus.device.clone();
    match controller.start(|| MaestroBus::open(&device)) {
        Ok(handle) => Ok((controller, handle)),
        Err(e) => {
            warn!("Servos unavailable, continuing without them: {e}");
            Ok((controller, ServoHandle::disconnected()))
        }
    }
}

fn start_announcer(config: &Config, servos: &ServoHandle) -> Result<Announcer> {
    let settings = &config.announcer;
    let mouth = (settings.animate_mouth && servos.is_connected()).then(|| MouthAnimation {
        servos: servos.clone(),
        channel: config.rig.channel(Joint::Mouth),
        open_pw: settings.mouth_open_pw,
        closed_pw: settings.mouth_closed_pw,
        settle: config.jog.settle(),
    });
    let speech = CommandSpeech::new(settings.command.clone(), settings.args.clone());
    Announcer::spawn(Box::new(speech), settings.repeat_window(), settings.queue_capacity, mouth)
}
