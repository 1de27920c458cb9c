//! One-shot, refcounted GPU device context.
//!
//! The original pipeline's `hw_init.cpp` acquires a VAAPI device and an
//! interop'd OpenCL context as raw handles, shared by pointer between the
//! decoder and the OpenCL map executor with no lifetime tracking — the
//! DESIGN NOTES flag this as leak- and double-free-prone. `GpuContext`
//! replaces the raw handle with an `Arc` behind a process-wide slot: the
//! underlying device is acquired once, the first time any `acquire()` call
//! (from any stage, independently) finds the slot empty, shared by every
//! later call while at least one handle is alive, and released once the
//! last handle drops — at which point the slot is re-armed for the next
//! acquisition rather than left pointing at a dead context.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

struct Inner {
    label: String,
}

#[derive(Clone)]
pub struct GpuContext(Arc<Inner>);

static CONTEXT: Mutex<Option<Weak<Inner>>> = Mutex::new(None);

impl GpuContext {
    /// Acquires the process-wide GPU device context, creating it if no
    /// other handle currently holds it alive. `label` identifies the
    /// requesting stage for diagnostics only; it only appears in the log
    /// line for whichever call actually creates the context.
    pub fn acquire(label: impl Into<String>) -> Self {
        let mut slot = CONTEXT.lock();
        if let Some(existing) = slot.as_ref().and_then(Weak::upgrade) {
            return GpuContext(existing);
        }
        let label = label.into();
        log::debug!("acquiring GPU device context (requester: {label})");
        let inner = Arc::new(Inner { label });
        *slot = Some(Arc::downgrade(&inner));
        GpuContext(inner)
    }

    pub fn label(&self) -> &str {
        &self.0.label
    }

    pub fn refcount(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        log::debug!("releasing GPU device context (requester: {})", self.label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // `CONTEXT` is a process-wide static; these tests would otherwise race
    // each other's refcounts under the default parallel test runner.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn clones_share_one_refcounted_context() {
        let _guard = TEST_LOCK.lock();
        let a = GpuContext::acquire("decoder");
        let b = a.clone();
        assert_eq!(a.refcount(), 2);
        drop(b);
        assert_eq!(a.refcount(), 1);
    }

    #[test]
    fn independent_acquisitions_share_the_same_underlying_context() {
        let _guard = TEST_LOCK.lock();
        let a = GpuContext::acquire("decoder");
        let b = GpuContext::acquire("map-executor");
        assert_eq!(a.label(), b.label());
        assert_eq!(a.refcount(), 2);
        assert_eq!(b.refcount(), 2);
    }

    #[test]
    fn the_context_is_released_once_every_handle_drops() {
        let _guard = TEST_LOCK.lock();
        let label = {
            let a = GpuContext::acquire("transient");
            a.label().to_string()
        };
        // Every handle from the previous acquisition is gone now; a fresh
        // acquire should create a new context rather than reusing a dead
        // one. This only exercises that acquisition still succeeds and
        // reports a context — the slot's internal re-arming isn't
        // observable beyond that without inspecting `CONTEXT` directly.
        let c = GpuContext::acquire("transient");
        assert_eq!(c.label(), label);
        assert_eq!(c.refcount(), 1);
    }
}
