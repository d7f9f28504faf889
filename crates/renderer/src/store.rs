//! Quality/performance store
//!
//! An explicitly owned, single-threaded reactive store. Consumers share it as
//! `Rc<PerformanceStore>`, read snapshots at any time and may subscribe to
//! change notifications, which are delivered in registration order after each
//! mutation.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use spacetechs_config::{classify, PerformanceThresholds};
use spacetechs_shared::{DeviceCapabilities, GeometryDetail, OptimalSettings, PerformanceState, QualityTier};

/// Update interval for animated properties at full quality
pub const NORMAL_FRAME_INTERVAL_SECS: f64 = 1.0 / 60.0;

/// Update interval for animated properties in degraded mode
pub const DEGRADED_FRAME_INTERVAL_SECS: f64 = 1.0 / 5.0;

type Subscriber = Rc<dyn Fn(&PerformanceState)>;
type SubscriberList = Rc<RefCell<Vec<(u64, Subscriber)>>>;

pub struct PerformanceStore {
    thresholds: PerformanceThresholds,
    state: RefCell<PerformanceState>,
    capabilities: RefCell<Option<DeviceCapabilities>>,
    fps_observed: Cell<bool>,
    subscribers: SubscriberList,
    next_subscriber: Cell<u64>,
}

impl Default for PerformanceStore {
    fn default() -> Self {
        Self::new(PerformanceThresholds::default())
    }
}

impl PerformanceStore {
    pub fn new(thresholds: PerformanceThresholds) -> Self {
        Self {
            thresholds,
            state: RefCell::new(PerformanceState::default()),
            capabilities: RefCell::new(None),
            fps_observed: Cell::new(false),
            subscribers: Rc::new(RefCell::new(Vec::new())),
            next_subscriber: Cell::new(0),
        }
    }

    pub fn thresholds(&self) -> &PerformanceThresholds {
        &self.thresholds
    }

    /// Snapshot of the current state
    pub fn get_state(&self) -> PerformanceState {
        self.state.borrow().clone()
    }

    pub fn capabilities(&self) -> Option<DeviceCapabilities> {
        self.capabilities.borrow().clone()
    }

    /// Record a smoothed FPS sample and recompute the tier
    pub fn set_fps(&self, fps: f64) {
        self.fps_observed.set(true);
        let critical = self.thresholds.critical;
        let poor = self.thresholds.poor;

        self.update(|state| {
            state.fps = fps;

            if fps < critical && !state.is_degraded_mode {
                log::warn!("FPS critically low ({:.1}), entering degraded mode", fps);
                state.is_degraded_mode = true;
            } else if fps < poor {
                log::warn!("Low FPS detected: {:.1}fps", fps);
            }

            let tier = self.effective_tier(state);
            if tier != state.tier {
                log::info!("Quality tier {} -> {} at {:.1}fps", state.tier, tier, fps);
                state.tier = tier;
            }
        });
    }

    /// Seed the tier from detected capabilities; ignored for the tier once
    /// real FPS samples exist
    pub fn set_device_capabilities(&self, capabilities: DeviceCapabilities) {
        let seeded_tier = classify(&capabilities);
        let fps_observed = self.fps_observed.get();
        let is_mobile = capabilities.is_mobile;
        *self.capabilities.borrow_mut() = Some(capabilities);

        self.update(|state| {
            state.is_mobile = is_mobile;
            if !fps_observed {
                state.tier = if state.is_degraded_mode {
                    QualityTier::Low
                } else {
                    seeded_tier
                };
            }
        });
    }

    /// `true` forces degraded mode; `false` is the explicit reset that clears it
    pub fn set_performance_mode(&self, enabled: bool) {
        self.update(|state| {
            state.is_degraded_mode = enabled;
            state.tier = self.effective_tier(state);
        });
    }

    pub fn set_prefers_reduced_motion(&self, prefers_reduced_motion: bool) {
        self.update(|state| state.prefers_reduced_motion = prefers_reduced_motion);
    }

    pub fn set_hovered_object(&self, object_id: Option<String>) {
        self.update(|state| state.hovered_object_id = object_id);
    }

    pub fn set_selected_object(&self, object_id: Option<String>) {
        self.update(|state| state.selected_object_id = object_id);
    }

    pub fn set_scene_loading(&self, is_loading: bool) {
        self.update(|state| state.is_scene_loading = is_loading);
    }

    pub fn set_loading_progress(&self, progress: u8) {
        self.update(|state| state.loading_progress = progress.min(100));
    }

    /// Restore defaults; detected capabilities are kept
    pub fn reset(&self) {
        self.fps_observed.set(false);
        let capabilities = self.capabilities.borrow().clone();

        self.update(|state| {
            *state = PerformanceState::default();
            if let Some(caps) = &capabilities {
                state.is_mobile = caps.is_mobile;
            }
        });
    }

    pub fn should_use_reduced_quality(&self) -> bool {
        self.reduced_quality(&self.state.borrow())
    }

    /// Rendering knobs for the current state
    pub fn get_optimal_settings(&self) -> OptimalSettings {
        self.settings_for(&self.state.borrow())
    }

    pub fn settings_for(&self, state: &PerformanceState) -> OptimalSettings {
        derive_settings(&self.thresholds, state)
    }

    /// Register a change listener; dropping the [`Subscription`] unsubscribes
    pub fn subscribe(&self, callback: impl Fn(&PerformanceState) + 'static) -> Subscription {
        let id = self.next_subscriber.get();
        self.next_subscriber.set(id + 1);
        self.subscribers.borrow_mut().push((id, Rc::new(callback)));

        Subscription {
            id,
            subscribers: Rc::downgrade(&self.subscribers),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    fn reduced_quality(&self, state: &PerformanceState) -> bool {
        is_reduced_quality(&self.thresholds, state)
    }

    fn effective_tier(&self, state: &PerformanceState) -> QualityTier {
        if state.is_degraded_mode {
            QualityTier::Low
        } else if self.fps_observed.get() {
            self.thresholds.tier_for_fps(state.fps)
        } else {
            // No sample yet: fall back to the capability seed
            self.capabilities
                .borrow()
                .as_ref()
                .map(classify)
                .unwrap_or_default()
        }
    }

    fn update(&self, mutate: impl FnOnce(&mut PerformanceState)) {
        let snapshot = {
            let mut state = self.state.borrow_mut();
            let before = state.clone();
            mutate(&mut state);
            if *state == before {
                return;
            }
            state.clone()
        };
        self.notify(&snapshot);
    }

    fn notify(&self, state: &PerformanceState) {
        let subscribers: Vec<(u64, Subscriber)> = self.subscribers.borrow().clone();
        for (id, subscriber) in subscribers {
            let still_subscribed = self.subscribers.borrow().iter().any(|(sid, _)| *sid == id);
            if still_subscribed {
                subscriber(state);
            }
        }
    }
}

pub fn is_reduced_quality(thresholds: &PerformanceThresholds, state: &PerformanceState) -> bool {
    state.fps < thresholds.good
        || state.is_mobile
        || state.prefers_reduced_motion
        || state.is_degraded_mode
}

/// Pure derivation of [`OptimalSettings`] from a state snapshot
pub fn derive_settings(thresholds: &PerformanceThresholds, state: &PerformanceState) -> OptimalSettings {
    let preset = state.tier.preset();
    let reduced = is_reduced_quality(thresholds, state);

    let particle_count = if state.is_mobile {
        preset.particle_count / 2
    } else {
        preset.particle_count
    };

    let (geometry_detail, shadows_enabled, postprocessing_enabled) = if reduced {
        (GeometryDetail::Low, false, false)
    } else {
        (
            preset.geometry_detail,
            preset.shadows_enabled,
            preset.postprocessing_enabled,
        )
    };

    OptimalSettings {
        particle_count,
        geometry_detail,
        shadows_enabled,
        postprocessing_enabled,
        // Degraded mode throttles updates through `frame_interval_secs`
        animations_enabled: !state.prefers_reduced_motion,
        antialias: !reduced,
        max_pixel_ratio: if reduced { 1.0 } else { 2.0 },
        lod_distances: if reduced {
            [5.0, 15.0, 30.0]
        } else {
            [10.0, 25.0, 50.0]
        },
        frame_interval_secs: if state.is_degraded_mode {
            DEGRADED_FRAME_INTERVAL_SECS
        } else {
            NORMAL_FRAME_INTERVAL_SECS
        },
    }
}

/// Handle for a store listener
#[must_use = "dropping the subscription unsubscribes"]
pub struct Subscription {
    id: u64,
    subscribers: Weak<RefCell<Vec<(u64, Subscriber)>>>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
