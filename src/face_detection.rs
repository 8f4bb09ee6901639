//! Face detection behind a small trait so the tracking loop does not care
//! which detector produced the boxes.

use crate::{
    constants::MIN_FACE_SIZE,
    error::{Error, Result},
};
use log::info;
use opencv::{
    core::{Mat, Rect, Size, Vector},
    objdetect::CascadeClassifier,
    prelude::*,
};
use std::path::Path;

/// Anything that can find faces in a greyscale frame
pub trait FaceDetector {
    /// Face bounding boxes, most prominent first
    ///
    /// # Errors
    ///
    /// Implementations may fail per frame; callers treat that as "no face".
    fn detect(&mut self, grey: &Mat) -> Result<Vec<Rect>>;
}

/// Viola-Jones detector using an `OpenCV` Haar cascade
pub struct HaarFaceDetector {
    classifier: CascadeClassifier,
    min_size: i32,
    scale_factor: f64,
    min_neighbors: i32,
}

impl HaarFaceDetector {
    /// Load a cascade such as `haarcascade_frontalface_alt2.xml`
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or is not a cascade.
    pub fn new<P: AsRef<Path>>(cascade_path: P, min_size: i32) -> Result<Self> {
        let path = cascade_path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::InvalidInput(format!("non UTF-8 cascade path: {}", path.display())))?;
        if !path.exists() {
            return Err(Error::Detector(format!("cascade not found: {path_str}")));
        }

        let classifier = CascadeClassifier::new(path_str)?;
        if classifier.empty()? {
            return Err(Error::Detector(format!("cascade failed to load: {path_str}")));
        }
        info!("Loaded face cascade {path_str}");

        Ok(Self {
            classifier,
            min_size: if min_size > 0 { min_size } else { MIN_FACE_SIZE },
            scale_factor: 1.1,
            min_neighbors: 3,
        })
    }
}

impl FaceDetector for HaarFaceDetector {
    fn detect(&mut self, grey: &Mat) -> Result<Vec<Rect>> {
        let mut faces = Vector::<Rect>::new();
        self.classifier.detect_multi_scale(
            grey,
            &mut faces,
            self.scale_factor,
            self.min_neighbors,
            0,
            Size::new(self.min_size, self.min_size),
            Size::new(0, 0),
        )?;

        // Larger faces are nearer the camera; track those first
        let mut faces = faces.to_vec();
        faces.sort_by_key(|r| std::cmp::Reverse(r.area()));
        Ok(faces)
    }
}
