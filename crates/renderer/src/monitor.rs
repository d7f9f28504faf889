//! Frame loop and FPS monitoring
//!
//! The [`FrameLoop`] is the single-threaded equivalent of a
//! `requestAnimationFrame` callback list: every registration hands back a
//! [`FrameRegistration`] whose cancellation (explicit or on drop) removes the
//! callback, so repeated mount/unmount cycles never leak callbacks.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crate::store::PerformanceStore;

/// Length of one FPS aggregation window
pub const FPS_WINDOW_MS: f64 = 1000.0;

/// Number of one-second samples averaged before publishing
pub const FPS_SMOOTHING_SAMPLES: usize = 5;

/// Per-frame budget at 60 FPS
pub const FRAME_BUDGET_MS: f64 = 16.67;

type FrameCallback = Rc<RefCell<dyn FnMut(f64)>>;
type CallbackList = Rc<RefCell<Vec<(u64, FrameCallback)>>>;

/// Ordered list of per-frame callbacks
#[derive(Default)]
pub struct FrameLoop {
    callbacks: CallbackList,
    next_id: Cell<u64>,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback(now_ms)` to run on every tick
    pub fn register(&self, callback: impl FnMut(f64) + 'static) -> FrameRegistration {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let callback: FrameCallback = Rc::new(RefCell::new(callback));
        self.callbacks.borrow_mut().push((id, callback));

        FrameRegistration {
            id,
            callbacks: Rc::downgrade(&self.callbacks),
        }
    }

    /// Run every registered callback in registration order
    pub fn tick(&self, now_ms: f64) {
        // Snapshot so callbacks may register or cancel during the tick
        let snapshot: Vec<(u64, FrameCallback)> = self.callbacks.borrow().clone();
        for (id, callback) in snapshot {
            let still_registered = self.callbacks.borrow().iter().any(|(cid, _)| *cid == id);
            if !still_registered {
                continue;
            }
            if let Ok(mut callback) = callback.try_borrow_mut() {
                (&mut *callback)(now_ms);
            }
        }
    }

    pub fn active_registrations(&self) -> usize {
        self.callbacks.borrow().len()
    }
}

/// Cancellation handle for a frame callback
#[must_use = "dropping the registration cancels the frame callback"]
pub struct FrameRegistration {
    id: u64,
    callbacks: Weak<RefCell<Vec<(u64, FrameCallback)>>>,
}

impl FrameRegistration {
    /// Remove the callback; idempotent
    pub fn cancel(&self) {
        if let Some(callbacks) = self.callbacks.upgrade() {
            callbacks.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.callbacks
            .upgrade()
            .map(|callbacks| callbacks.borrow().iter().any(|(id, _)| *id == self.id))
            .unwrap_or(false)
    }
}

impl Drop for FrameRegistration {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Frame counter producing smoothed FPS once per aggregation window
#[derive(Debug, Clone, Default)]
pub struct FpsMonitor {
    frame_count: u32,
    window_start: Option<f64>,
    history: VecDeque<f64>,
}

impl FpsMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one frame at `now_ms`; returns the smoothed FPS when a window closes
    pub fn record_frame(&mut self, now_ms: f64) -> Option<f64> {
        // The frame that opens a window only marks its start
        let Some(start) = self.window_start else {
            self.window_start = Some(now_ms);
            return None;
        };
        self.frame_count += 1;

        let elapsed = now_ms - start;
        if elapsed < FPS_WINDOW_MS {
            return None;
        }

        let fps = self.frame_count as f64 * 1000.0 / elapsed;
        self.frame_count = 0;
        self.window_start = Some(now_ms);

        Some(self.push_sample(fps))
    }

    /// Add a one-second sample to the rolling window and return the mean
    pub fn push_sample(&mut self, fps: f64) -> f64 {
        self.history.push_back(fps);
        if self.history.len() > FPS_SMOOTHING_SAMPLES {
            self.history.pop_front();
        }
        self.smoothed_fps().unwrap_or(fps)
    }

    pub fn smoothed_fps(&self) -> Option<f64> {
        if self.history.is_empty() {
            return None;
        }
        Some(self.history.iter().sum::<f64>() / self.history.len() as f64)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Feeds smoothed FPS from a [`FrameLoop`] into a [`PerformanceStore`]
pub struct PerformanceMonitor;

impl PerformanceMonitor {
    pub fn start(frame_loop: &FrameLoop, store: Rc<PerformanceStore>) -> MonitorHandle {
        let mut monitor = FpsMonitor::new();
        let registration = frame_loop.register(move |now_ms| {
            if let Some(fps) = monitor.record_frame(now_ms) {
                log::debug!("FPS window closed: {:.1}", fps);
                store.set_fps(fps);
            }
        });

        MonitorHandle { registration }
    }
}

/// Running monitor; stopping (or dropping) cancels its frame callback
#[must_use = "dropping the handle stops the monitor"]
pub struct MonitorHandle {
    registration: FrameRegistration,
}

impl MonitorHandle {
    pub fn stop(self) {
        self.registration.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.registration.is_active()
    }
}

/// Render timing summary for one component
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStats {
    pub render_count: u64,
    pub avg_render_time_ms: f64,
    pub slow_renders: u64,
    pub slow_render_percentage: f64,
}

/// Tracks render durations of a named component against a frame budget
#[derive(Debug, Clone)]
pub struct RenderBudget {
    component: String,
    threshold_ms: f64,
    render_count: u64,
    total_render_time_ms: f64,
    slow_renders: u64,
}

impl RenderBudget {
    pub fn new(component: impl Into<String>) -> Self {
        Self::with_threshold(component, FRAME_BUDGET_MS)
    }

    pub fn with_threshold(component: impl Into<String>, threshold_ms: f64) -> Self {
        Self {
            component: component.into(),
            threshold_ms,
            render_count: 0,
            total_render_time_ms: 0.0,
            slow_renders: 0,
        }
    }

    /// Record one render of `duration_ms`; returns true when over budget
    pub fn record(&mut self, duration_ms: f64) -> bool {
        self.render_count += 1;
        self.total_render_time_ms += duration_ms;

        let slow = duration_ms > self.threshold_ms;
        if slow {
            self.slow_renders += 1;
            log::warn!(
                "Slow render detected in {}: {:.2}ms ({:.0}% of budget)",
                self.component,
                duration_ms,
                duration_ms / self.threshold_ms * 100.0
            );
        }

        if self.render_count % 100 == 0 {
            let stats = self.stats();
            log::info!(
                "Performance summary for {}: {} renders, avg {:.2}ms, {} slow ({:.1}%)",
                self.component,
                stats.render_count,
                stats.avg_render_time_ms,
                stats.slow_renders,
                stats.slow_render_percentage
            );
        }

        slow
    }

    pub fn stats(&self) -> RenderStats {
        let (avg, pct) = if self.render_count == 0 {
            (0.0, 0.0)
        } else {
            (
                self.total_render_time_ms / self.render_count as f64,
                self.slow_renders as f64 / self.render_count as f64 * 100.0,
            )
        };

        RenderStats {
            render_count: self.render_count,
            avg_render_time_ms: avg,
            slow_renders: self.slow_renders,
            slow_render_percentage: pct,
        }
    }
}
