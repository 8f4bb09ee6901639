//! Per-frame orchestration of face tracking and finger counting.
//!
//! One frame in, one annotated frame out. Both features read the untouched
//! source frame and draw into the same overlay copy, so they can run together
//! without seeing each other's annotations.

use crate::{
    announcer::Announcer,
    constants::{HERSHEY_SIMPLEX_HEIGHT, OUTLINE_THICKNESS},
    contour::extract_contour_tree,
    count_stabilizer::{CountStabilizer, StabilizerState},
    error::Result,
    face_detection::FaceDetector,
    face_tracking::{FaceTracker, ServoDelta},
    hand_classifier::{HandClassifier, HandMatch},
    servo_controller::ServoHandle,
    utils::safe_cast::f64_to_i32_trunc,
};
use log::{debug, info, warn};
use opencv::{
    core::{Mat, Point, Rect, Scalar, Vector},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
};

/// Which features run on the next frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineFlags {
    pub track_faces: bool,
    pub enable_counting: bool,
}

/// Everything one frame produced
#[derive(Debug)]
pub struct FrameReport {
    /// Source frame with annotations drawn on it
    pub overlay: Mat,
    /// Face being followed, if any
    pub face: Option<Rect>,
    /// Servo moves issued towards that face
    pub steer: Option<ServoDelta>,
    /// Finger count of each hand found, in search order
    pub finger_counts: Vec<u32>,
    /// Text handed to the announcer on this frame
    pub announcement: Option<String>,
}

fn red() -> Scalar {
    Scalar::new(0.0, 0.0, 255.0, 0.0)
}

/// The frame callback's state
pub struct FramePipeline {
    detector: Option<Box<dyn FaceDetector>>,
    tracker: FaceTracker,
    classifier: HandClassifier,
    stabilizer: CountStabilizer,
    state: StabilizerState,
    announcer: Option<Announcer>,
    servos: ServoHandle,
}

impl FramePipeline {
    /// Pipeline without a face detector or announcer
    #[must_use]
    pub fn new(tracker: FaceTracker, classifier: HandClassifier, stabilizer: CountStabilizer, servos: ServoHandle) -> Self {
        Self {
            detector: None,
            tracker,
            classifier,
            stabilizer,
            state: StabilizerState::new(),
            announcer: None,
            servos,
        }
    }

    /// Use `detector` for face tracking
    #[must_use]
    pub fn with_detector(mut self, detector: Box<dyn FaceDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Send stable counts to `announcer`
    #[must_use]
    pub fn with_announcer(mut self, announcer: Announcer) -> Self {
        self.announcer = Some(announcer);
        self
    }

    /// Whether face tracking can run at all
    #[must_use]
    pub fn can_track_faces(&self) -> bool {
        self.detector.is_some()
    }

    #[must_use]
    pub const fn stabilizer_state(&self) -> &StabilizerState {
        &self.state
    }

    #[must_use]
    pub const fn tracker(&self) -> &FaceTracker {
        &self.tracker
    }

    /// Run the enabled features over `frame`.
    ///
    /// Detector and counting failures only cost the current frame; they are
    /// logged and the frame is reported as having no face or no hands.
    ///
    /// # Errors
    ///
    /// Returns an error if the overlay cannot be allocated.
    pub fn process_frame(&mut self, frame: &Mat, flags: PipelineFlags) -> Result<FrameReport> {
        let mut overlay = frame.try_clone()?;
        let mut report_face = None;
        let mut steer = None;
        let mut finger_counts = Vec::new();
        let mut announcement = None;

        if frame.empty() {
            // A missing frame breaks a run like a frame without hands
            if flags.enable_counting {
                self.state.clear();
            }
            return Ok(FrameReport {
                overlay,
                face: None,
                steer: None,
                finger_counts,
                announcement: None,
            });
        }

        let grey = if flags.track_faces || flags.enable_counting {
            Some(to_grey(frame)?)
        } else {
            None
        };

        if let (true, Some(grey)) = (flags.track_faces, grey.as_ref()) {
            if let Some(detector) = self.detector.as_deref_mut() {
                report_face = self.tracker.locate(detector, grey);
                steer = self.tracker.steer(report_face.as_ref(), &self.servos);
                if let Some(face) = report_face {
                    imgproc::rectangle(&mut overlay, face, red(), 2, LINE_8, 0)?;
                }
            }
        }

        if let (true, Some(grey)) = (flags.enable_counting, grey.as_ref()) {
            match self.count_hands(grey, &mut overlay) {
                Ok(counts) => finger_counts = counts,
                Err(e) => warn!("Hand counting failed: {e}"),
            }
            announcement = self.stabilizer.update(&mut self.state, &finger_counts);
            if let Some(text) = &announcement {
                self.dispatch(text);
            }
        }

        Ok(FrameReport {
            overlay,
            face: report_face,
            steer,
            finger_counts,
            announcement,
        })
    }

    fn count_hands(&self, grey: &Mat, overlay: &mut Mat) -> Result<Vec<u32>> {
        let mut binary = Mat::default();
        let cut = imgproc::threshold(grey, &mut binary, 0.0, 255.0, imgproc::THRESH_BINARY | imgproc::THRESH_OTSU)?;
        let tree = extract_contour_tree(&binary)?;
        let hands = self.classifier.find_hands(&tree);
        debug!("Otsu cut {cut}, {} contours, {} hands", tree.descendant_count(), hands.len());

        for hand in &hands {
            draw_hand(overlay, hand)?;
        }
        Ok(hands.iter().map(|hand| hand.fingers).collect())
    }

    fn dispatch(&self, text: &str) {
        match &self.announcer {
            Some(announcer) => {
                if !announcer.announce(text) {
                    debug!("Dropped announcement '{text}'");
                }
            }
            None => info!("Count: {text}"),
        }
    }

    /// Stop the announcer after it finishes anything queued
    pub fn shutdown(self) {
        if let Some(announcer) = self.announcer {
            announcer.shutdown();
        }
    }
}

fn to_grey(frame: &Mat) -> Result<Mat> {
    if frame.channels() == 1 {
        return Ok(frame.try_clone()?);
    }
    let mut grey = Mat::default();
    imgproc::cvt_color(frame, &mut grey, imgproc::COLOR_BGR2GRAY, 0)?;
    Ok(grey)
}

/// Outline plus the finger count, sized to the hand
fn draw_hand(overlay: &mut Mat, hand: &HandMatch<'_>) -> Result<()> {
    let points = hand.node.points();
    if !points.is_empty() {
        let mut outline = Vector::<Vector<Point>>::new();
        outline.push(Vector::from_slice(points));
        imgproc::polylines(overlay, &outline, true, red(), OUTLINE_THICKNESS, LINE_8, 0)?;
    }

    let side = hand.area.sqrt();
    if side < 1.0 {
        return Ok(());
    }
    let text = hand.fingers.to_string();
    let scale = side / HERSHEY_SIMPLEX_HEIGHT;
    let thickness = f64_to_i32_trunc(scale * 2.0).max(1);
    let mut baseline = 0;
    let size = imgproc::get_text_size(&text, FONT_HERSHEY_SIMPLEX, scale, thickness, &mut baseline)?;

    let origin = Point::new(
        f64_to_i32_trunc(f64::from(hand.centroid.x)) - size.width / 2,
        f64_to_i32_trunc(f64::from(hand.centroid.y) + side / 2.0),
    );
    imgproc::put_text(overlay, &text, origin, FONT_HERSHEY_SIMPLEX, scale, red(), thickness, LINE_8, false)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face_tracking::TrackingGains;
    use opencv::core::CV_8UC3;

    fn pipeline() -> FramePipeline {
        FramePipeline::new(
            FaceTracker::new(640, 480, TrackingGains::default(), 0, 10),
            HandClassifier::default(),
            CountStabilizer::default(),
            ServoHandle::disconnected(),
        )
    }

    #[test]
    fn test_no_flags_returns_copy() {
        let frame = Mat::zeros(48, 64, CV_8UC3).unwrap().to_mat().unwrap();
        let report = pipeline().process_frame(&frame, PipelineFlags::default()).unwrap();
        assert_eq!(report.overlay.size().unwrap(), frame.size().unwrap());
        assert!(report.face.is_none());
        assert!(report.finger_counts.is_empty());
    }

    #[test]
    fn test_tracking_without_detector_is_skipped() {
        let frame = Mat::zeros(48, 64, CV_8UC3).unwrap().to_mat().unwrap();
        let flags = PipelineFlags {
            track_faces: true,
            enable_counting: false,
        };
        let mut pipeline = pipeline();
        assert!(!pipeline.can_track_faces());
        let report = pipeline.process_frame(&frame, flags).unwrap();
        assert!(report.steer.is_none());
    }

    #[test]
    fn test_blank_frame_counts_nothing() {
        let frame = Mat::zeros(48, 64, CV_8UC3).unwrap().to_mat().unwrap();
        let flags = PipelineFlags {
            track_faces: false,
            enable_counting: true,
        };
        let mut pipeline = pipeline();
        let report = pipeline.process_frame(&frame, flags).unwrap();
        assert!(report.finger_counts.is_empty());
        assert!(report.announcement.is_none());
        assert_eq!(pipeline.stabilizer_state().run_length(), 0);
    }
}
