//! Pull-based frame source chain.
//!
//! Grounded on `original_source/opencv/FrameSource.hpp`: an abstract base
//! exposing `pull_frame`/`peek_frame`, concrete stages composed by
//! ownership (`FrameSourceWarp` holds a `shared_ptr<FrameSource>`, not a
//! base-class reference list), and a `FrameSourceProfile` decorator that
//! wraps any stage to time it. This module reproduces that shape with
//! Rust generics in place of the shared-pointer/virtual-dispatch idiom:
//! each stage owns its upstream by value and is generic over its type, so
//! the whole chain is a single nested concrete type with no dynamic
//! dispatch or reference counting needed.

pub mod colorplane;
pub mod decoded;
pub mod stabilizer;
pub mod surface_map;

use std::time::Instant;

use crate::error::{PullOutcome, PullResult};
use crate::profiler::Profiler;

pub use colorplane::ColorplaneSource;
pub use decoded::DecodedFrameSource;
pub use stabilizer::{StabilizerConfig, StabilizerSource};
pub use surface_map::SurfaceMapSource;

/// A pull-driven stage in the frame source chain. `pull` advances and
/// returns the next frame; `peek` returns the same value `pull` would,
/// without advancing, so a downstream stage's constructor can inspect the
/// first frame (for dimensions) before the pipeline actually starts.
pub trait FrameSource {
    fn pull(&mut self) -> PullOutcome;
    fn peek(&mut self) -> PullOutcome;
}

/// Stages implement this instead of [`FrameSource`] directly; [`Cached`]
/// supplies the `peek` buffering uniformly so each stage only has to
/// implement the advancing half.
pub trait UncachedSource {
    fn pull_uncached(&mut self) -> PullOutcome;
}

/// Adds one-slot lookahead buffering to any [`UncachedSource`], giving it
/// a correct [`FrameSource::peek`] without every stage re-implementing the
/// same cache.
pub struct Cached<T> {
    inner: T,
    cached: Option<PullResult>,
}

impl<T: UncachedSource> Cached<T> {
    pub fn new(inner: T) -> Self {
        Cached { inner, cached: None }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: UncachedSource> FrameSource for Cached<T> {
    fn pull(&mut self) -> PullOutcome {
        if let Some(cached) = self.cached.take() {
            return Ok(cached);
        }
        self.inner.pull_uncached()
    }

    fn peek(&mut self) -> PullOutcome {
        if self.cached.is_none() {
            self.cached = Some(self.inner.pull_uncached()?);
        }
        Ok(self.cached.clone().unwrap())
    }
}

/// Times every `pull` through `source` and folds the elapsed duration into
/// a [`Profiler`], matching `FrameSourceProfile` in the original pipeline.
/// `peek` is forwarded untimed, since it does not do the work a real pull
/// does once the underlying stage is at steady state (the pulled value is
/// simply cached).
pub struct ProfilingSource<S> {
    source: S,
    profiler: Profiler,
}

impl<S: FrameSource> ProfilingSource<S> {
    pub fn new(label: &'static str, source: S) -> Self {
        ProfilingSource { source, profiler: Profiler::new(label) }
    }

    pub fn report(&self, wall_time: std::time::Duration) {
        self.profiler.report(wall_time);
    }
}

impl<S: FrameSource> FrameSource for ProfilingSource<S> {
    fn pull(&mut self) -> PullOutcome {
        let start = Instant::now();
        let result = self.source.pull();
        self.profiler.record(start.elapsed());
        result
    }

    fn peek(&mut self) -> PullOutcome {
        self.source.peek()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, PixelLayout};

    /// Yields `limit` frames, then `EndOfStream` forever after. Counts
    /// calls to `pull_uncached` so tests can assert how many frames the
    /// underlying source was actually asked for.
    struct Counter {
        calls: u32,
        limit: u32,
    }

    impl UncachedSource for Counter {
        fn pull_uncached(&mut self) -> PullOutcome {
            if self.calls >= self.limit {
                return Ok(PullResult::EndOfStream);
            }
            self.calls += 1;
            Ok(PullResult::Frame(Frame::new(opencv::core::Mat::default(), 1, 1, PixelLayout::Bgr)))
        }
    }

    #[test]
    fn peek_does_not_advance_the_underlying_source() {
        let mut cached = Cached::new(Counter { calls: 0, limit: 2 });

        assert!(matches!(cached.peek().unwrap(), PullResult::Frame(_)));
        assert!(matches!(cached.peek().unwrap(), PullResult::Frame(_)));
        assert_eq!(cached.inner().calls, 1);
    }

    #[test]
    fn a_peeked_frame_is_returned_again_by_the_next_pull() {
        let mut cached = Cached::new(Counter { calls: 0, limit: 1 });

        assert!(matches!(cached.peek().unwrap(), PullResult::Frame(_)));
        assert!(matches!(cached.pull().unwrap(), PullResult::Frame(_)));
        assert_eq!(cached.inner().calls, 1);
        assert!(matches!(cached.pull().unwrap(), PullResult::EndOfStream));
    }

    #[test]
    fn pulls_without_peeking_advance_one_frame_at_a_time() {
        let mut cached = Cached::new(Counter { calls: 0, limit: 2 });

        assert!(matches!(cached.pull().unwrap(), PullResult::Frame(_)));
        assert!(matches!(cached.pull().unwrap(), PullResult::Frame(_)));
        assert!(matches!(cached.pull().unwrap(), PullResult::EndOfStream));
        assert_eq!(cached.inner().calls, 2);
    }
}
