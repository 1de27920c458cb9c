//! The stabiliser core: §4.5's look-ahead smoothing buffer and emission
//! protocol, wired to the tracker, estimator, and remap kernel.
//!
//! `frame_buffer` holds only the *frame images* still waiting to be
//! emitted — depth `radius + 1` at most, `radius` at steady state, per
//! §3's `PipelineState` invariants. The filter's own `2*radius + 1`-sample
//! window lives separately in `rotation_history`, which stores raw
//! accumulated rotations only (cheap) rather than full frames. The two are
//! linked purely by frame index (`total_pulled`, `history_start`): when a
//! window would reach before the first frame or past the last one
//! (stream start, or end-of-stream drain), [`clamped_window`] repeats the
//! nearest boundary rotation rather than narrowing the filter, so every
//! emission always sees a full-width, correctly-centred window — this is
//! the padding §4.5 bullet 3 and scenario S6 call for, applied
//! symmetrically at both ends of the stream.

use std::collections::VecDeque;

use crate::camera::{synthesize_output_camera, CameraPreset, OutputCameraParams};
use crate::error::{PipelineError, PullOutcome, PullResult};
use crate::estimation::RotationEstimator;
use crate::frame::Frame;
use crate::pixel_map::cpu::CpuMapExecutor;
use crate::pixel_map::MapExecutor;
use crate::rotation::Rotation;
use crate::smoothing::RotationFilter;
use crate::tracking::CornerTracker;

use super::{FrameSource, UncachedSource};

#[derive(Clone, Copy, Debug)]
pub struct StabilizerConfig {
    pub preset: CameraPreset,
    /// Look-ahead radius `R`: the filter window is `2R + 1` frames wide,
    /// and output lags input by exactly `R` frames.
    pub radius: usize,
    pub poly_order: usize,
    pub output_params: OutputCameraParams,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        StabilizerConfig {
            preset: CameraPreset::GoProHero4BlackWide169Measured,
            radius: 15,
            poly_order: 2,
            output_params: OutputCameraParams::default(),
        }
    }
}

pub struct StabilizerSource<S> {
    source: S,
    /// Pending frame images, oldest (next to emit) at the front.
    frame_buffer: VecDeque<Frame>,
    /// The most recent `min(total_pulled, 2*radius+1)` raw accumulated
    /// rotations, trailing the newest pulled frame.
    rotation_history: VecDeque<Rotation>,
    /// Count of real frames pulled from upstream so far.
    total_pulled: usize,
    accumulated_rotation: Rotation,
    tracker: CornerTracker,
    estimator: RotationEstimator,
    poly_order: usize,
    map_executor: CpuMapExecutor,
    radius: usize,
    upstream_exhausted: bool,
}

impl<S: FrameSource> StabilizerSource<S> {
    pub fn new(mut source: S, config: StabilizerConfig) -> Result<Self, PipelineError> {
        let first = source.peek()?;
        let Some(first_frame) = first.into_frame() else {
            return Err(PipelineError::Config("upstream source produced no frames".to_string()));
        };

        let input_camera = config.preset.resolve(first_frame.width(), first_frame.height());
        let output_camera = synthesize_output_camera(&input_camera, config.output_params);

        Ok(StabilizerSource {
            source,
            frame_buffer: VecDeque::with_capacity(config.radius + 1),
            rotation_history: VecDeque::with_capacity(2 * config.radius + 1),
            total_pulled: 0,
            accumulated_rotation: Rotation::identity(),
            tracker: CornerTracker::new(),
            estimator: RotationEstimator::new(),
            poly_order: config.poly_order,
            map_executor: CpuMapExecutor::new(input_camera, output_camera),
            radius: config.radius,
            upstream_exhausted: false,
        })
    }

    fn window_len(&self) -> usize {
        2 * self.radius + 1
    }

    /// Pulls frames until `frame_buffer` reaches its steady-state depth
    /// (`radius + 1`) or upstream ends. Each pulled frame is tracked and
    /// folded into `accumulated_rotation` immediately, so `rotation_history`
    /// always has a rotation available for every frame still in
    /// `frame_buffer`.
    fn top_up(&mut self) -> Result<(), PipelineError> {
        while !self.upstream_exhausted && self.frame_buffer.len() <= self.radius {
            match self.source.pull()? {
                PullResult::EndOfStream => {
                    self.upstream_exhausted = true;
                }
                PullResult::Frame(frame) => {
                    let luma = frame
                        .luma()
                        .ok_or_else(|| PipelineError::Config("frame reached the stabiliser with no luma plane attached".to_string()))?
                        .clone();
                    let pairs = self.tracker.track(&luma)?;
                    let inter_rotation = self.estimator.estimate(&pairs, self.map_executor.input_camera());
                    self.accumulated_rotation = inter_rotation.then(&self.accumulated_rotation);

                    self.total_pulled += 1;
                    self.rotation_history.push_back(self.accumulated_rotation);
                    if self.rotation_history.len() > self.window_len() {
                        self.rotation_history.pop_front();
                    }
                    self.frame_buffer.push_back(frame);
                }
            }
        }
        Ok(())
    }
}

impl<S: FrameSource> UncachedSource for StabilizerSource<S> {
    fn pull_uncached(&mut self) -> PullOutcome {
        self.top_up()?;

        if self.frame_buffer.is_empty() {
            return Ok(PullResult::EndOfStream);
        }

        let emit_index = self.total_pulled - self.frame_buffer.len();
        let history_start = self.total_pulled - self.rotation_history.len();

        let window = clamped_window(&self.rotation_history, history_start, self.total_pulled, emit_index, self.radius);
        let raw_rotation = self.rotation_history[emit_index - history_start];

        let smoothed = RotationFilter::new(self.radius, self.poly_order).filter_centre(&window);
        // §4.5: the centre frame is remapped with the inverse of the
        // residual rotation between its raw tracked orientation and the
        // smoothed one, i.e. `C^-1` where `C = smoothed * raw^-1`.
        let correction = smoothed.then(&raw_rotation.inverse());
        let kernel_rotation = correction.inverse();

        let centre_frame = self.frame_buffer.pop_front().expect("frame_buffer checked non-empty above");
        let output = self.map_executor.remap(&centre_frame, &kernel_rotation)?;
        Ok(PullResult::Frame(output))
    }
}

/// Builds the `2*radius + 1`-wide rotation window centred on `emit_index`
/// out of whatever `history` actually holds (`history[i]` corresponds to
/// frame index `history_start + i`, up to `total_pulled - 1`). Indices
/// that fall before frame 0 (stream start) or past `total_pulled - 1`
/// (end-of-stream drain) are clamped to the nearest boundary frame, which
/// is exactly a repeated-boundary-rotation padding scheme applied
/// symmetrically at both ends.
fn clamped_window(
    history: &VecDeque<Rotation>,
    history_start: usize,
    total_pulled: usize,
    emit_index: usize,
    radius: usize,
) -> Vec<Rotation> {
    let last_index = total_pulled - 1;
    (0..=2 * radius)
        .map(|offset| {
            let wanted = emit_index as i64 + offset as i64 - radius as i64;
            let clamped = wanted.clamp(0, last_index as i64) as usize;
            let clamped = clamped.clamp(history_start, last_index);
            history[clamped - history_start]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn rotation_at(i: usize) -> Rotation {
        Rotation::from_axis_angle(Vector3::new(0.0, 0.0, 1.0), i as f64 * 0.1)
    }

    #[test]
    fn clamped_window_centres_on_the_requested_frame_in_steady_state() {
        let radius = 3;
        let total_pulled = 10;
        let history_start = total_pulled - (2 * radius + 1);
        let history: VecDeque<Rotation> = (history_start..total_pulled).map(rotation_at).collect();
        let emit_index = total_pulled - radius - 1;

        let window = clamped_window(&history, history_start, total_pulled, emit_index, radius);
        let centre = window[radius];
        let expected = rotation_at(emit_index);
        assert!((centre.matrix() - expected.matrix()).norm() < 1e-9);
    }

    #[test]
    fn clamped_window_pads_with_the_first_rotation_at_stream_start() {
        let radius = 3;
        let total_pulled = 1;
        let history_start = 0;
        let history: VecDeque<Rotation> = vec![rotation_at(0)];

        let window = clamped_window(&history, history_start, total_pulled, 0, radius);
        assert_eq!(window.len(), 2 * radius + 1);
        for r in &window {
            assert!((r.matrix() - history[0].matrix()).norm() < 1e-9);
        }
    }

    #[test]
    fn clamped_window_pads_with_the_last_rotation_during_drain() {
        let radius = 3;
        let total_pulled = 8;
        let history_start = total_pulled - (2 * radius + 1).min(total_pulled);
        let history: VecDeque<Rotation> = (history_start..total_pulled).map(rotation_at).collect();
        let emit_index = total_pulled - 1;

        let window = clamped_window(&history, history_start, total_pulled, emit_index, radius);
        let last_real = *history.back().unwrap();
        for r in window.iter().skip(radius) {
            assert!((r.matrix() - last_real.matrix()).norm() < 1e-9);
        }
    }

    #[test]
    fn steady_state_window_is_full_width_and_unpadded() {
        // A window entirely within [history_start, total_pulled - 1]
        // should reproduce the exact rotations at each offset, with no
        // boundary repeats.
        let radius = 2;
        let total_pulled = 20;
        let history_start = total_pulled - (2 * radius + 1);
        let history: VecDeque<Rotation> = (history_start..total_pulled).map(rotation_at).collect();
        let emit_index = total_pulled - radius - 1;

        let window = clamped_window(&history, history_start, total_pulled, emit_index, radius);
        for (offset, rotation) in window.iter().enumerate() {
            let expected = rotation_at(emit_index + offset - radius);
            assert!((rotation.matrix() - expected.matrix()).norm() < 1e-9);
        }
    }
}
