//! Sparse corner tracking between consecutive luma planes.
//!
//! Grounded on `original_source/opencv/FrameSourceWarp.cpp`'s
//! `find_corners` (Shi-Tomasi detection) and `find_point_pairs` (pyramidal
//! Lucas-Kanade tracking plus the keyframe re-detection policy), and on
//! `Warper.cpp::process_frame_mat` for the overall per-frame shape.

use opencv::core::{Mat, Point2f, Size, TermCriteria, TermCriteria_Type, Vector};
use opencv::imgproc;
use opencv::video;

use crate::error::PipelineError;

const MAX_CORNERS: i32 = 200;
const QUALITY_LEVEL: f64 = 0.01;
const MIN_DISTANCE: f64 = 30.0;
const BLOCK_SIZE: i32 = 3;
const STALENESS_LIMIT: u32 = 20;
const CARRIED_FLOOR: usize = 150;

/// One tracked correspondence between the previous and current frame.
#[derive(Clone, Copy, Debug)]
pub struct PointPair {
    pub previous: Point2f,
    pub current: Point2f,
}

pub struct CornerTracker {
    previous_luma: Option<Mat>,
    corners: Vec<Point2f>,
    frames_since_detect: u32,
}

impl CornerTracker {
    pub fn new() -> Self {
        CornerTracker { previous_luma: None, corners: Vec::new(), frames_since_detect: 0 }
    }

    /// Advances the tracker by one frame, returning the correspondences
    /// found between the previous luma plane and `luma`. Returns an empty
    /// vector for the very first call (there is no previous frame yet) and
    /// seeds the detector instead.
    pub fn track(&mut self, luma: &Mat) -> Result<Vec<PointPair>, PipelineError> {
        let Some(previous_luma) = self.previous_luma.take() else {
            self.corners = detect_corners(luma)?;
            self.previous_luma = Some(luma.clone());
            self.frames_since_detect = 0;
            return Ok(Vec::new());
        };

        let pairs = if self.corners.is_empty() {
            Vec::new()
        } else {
            track_points(&previous_luma, luma, &self.corners)?
        };

        let surviving: Vec<Point2f> = pairs.iter().map(|p| p.current).collect();
        let needs_redetect = self.frames_since_detect >= STALENESS_LIMIT || surviving.len() < CARRIED_FLOOR;

        if needs_redetect {
            log::trace!(
                "corner tracker: re-detecting (stale={}, carried={})",
                self.frames_since_detect >= STALENESS_LIMIT,
                surviving.len(),
            );
            self.corners = detect_corners(luma)?;
            self.frames_since_detect = 0;
        } else {
            self.corners = surviving;
            self.frames_since_detect += 1;
        }

        self.previous_luma = Some(luma.clone());
        Ok(pairs)
    }
}

impl Default for CornerTracker {
    fn default() -> Self {
        CornerTracker::new()
    }
}

fn detect_corners(luma: &Mat) -> Result<Vec<Point2f>, PipelineError> {
    let mut corners = Vector::<Point2f>::new();
    imgproc::good_features_to_track(
        luma,
        &mut corners,
        MAX_CORNERS,
        QUALITY_LEVEL,
        MIN_DISTANCE,
        &Mat::default(),
        BLOCK_SIZE,
        false,
        0.04,
    )
    .map_err(|e| PipelineError::gpu("tracking::detect_corners", e.to_string()))?;
    Ok(corners.to_vec())
}

fn track_points(previous_luma: &Mat, luma: &Mat, corners: &[Point2f]) -> Result<Vec<PointPair>, PipelineError> {
    let previous_points: Vector<Point2f> = Vector::from_iter(corners.iter().copied());
    let mut next_points = Vector::<Point2f>::new();
    let mut status = Vector::<u8>::new();
    let mut err = Vector::<f32>::new();

    video::calc_optical_flow_pyr_lk(
        previous_luma,
        luma,
        &previous_points,
        &mut next_points,
        &mut status,
        &mut err,
        Size::new(21, 21),
        3,
        TermCriteria::new(TermCriteria_Type::COUNT as i32 + TermCriteria_Type::EPS as i32, 30, 0.01)
            .map_err(|e| PipelineError::gpu("tracking::track_points", e.to_string()))?,
        0,
        1e-4,
    )
    .map_err(|e| PipelineError::gpu("tracking::track_points", e.to_string()))?;

    let mut pairs = Vec::with_capacity(corners.len());
    for i in 0..status.len() {
        if status.get(i).unwrap_or(0) == 1 {
            pairs.push(PointPair { previous: previous_points.get(i).unwrap(), current: next_points.get(i).unwrap() });
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::CV_8UC1;

    fn blank(size: i32) -> Mat {
        Mat::zeros(size, size, CV_8UC1).unwrap().to_mat().unwrap()
    }

    #[test]
    fn first_frame_seeds_the_detector_and_returns_no_pairs() {
        let mut tracker = CornerTracker::new();
        let pairs = tracker.track(&blank(64)).unwrap();
        assert!(pairs.is_empty());
        assert!(tracker.previous_luma.is_some());
    }

    #[test]
    fn a_textureless_second_frame_still_returns_without_pairs() {
        // good_features_to_track finds nothing on a blank image, so the
        // tracker's corner set is empty and it must skip LK entirely
        // rather than hand an empty point list to calc_optical_flow_pyr_lk.
        let mut tracker = CornerTracker::new();
        tracker.track(&blank(64)).unwrap();
        let pairs = tracker.track(&blank(64)).unwrap();
        assert!(pairs.is_empty());
    }
}
