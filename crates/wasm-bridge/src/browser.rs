//! `#[wasm_bindgen]` handles that only exist in the browser

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use spacetechs_config::{BrowserProbe, PerformanceThresholds};
use spacetechs_renderer::scene::ComponentSpec;
use spacetechs_renderer::Subscription;
use spacetechs_storage::{BrowserStorage, UiStore};
use wasm_bindgen::prelude::*;

use crate::render_loop::AnimationDriver;
use crate::runtime::RuntimeCore;

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Adaptive scene driven by `requestAnimationFrame`
#[wasm_bindgen]
pub struct SceneRuntime {
    core: Rc<RefCell<RuntimeCore>>,
    driver: AnimationDriver,
    listeners: Vec<Subscription>,
}

#[wasm_bindgen]
impl SceneRuntime {
    #[wasm_bindgen(constructor)]
    pub fn new() -> SceneRuntime {
        crate::init();
        let core = RuntimeCore::from_probe(&BrowserProbe, PerformanceThresholds::default());
        SceneRuntime {
            core: Rc::new(RefCell::new(core)),
            driver: AnimationDriver::new(),
            listeners: Vec::new(),
        }
    }

    /// Begin ticking the frame loop; a no-op while already running
    pub fn start(&self) -> Result<(), JsValue> {
        let core = self.core.clone();
        self.driver.start(move |timestamp| match core.try_borrow() {
            Ok(core) => core.tick(timestamp),
            Err(_) => log::debug!("Runtime busy; skipping frame"),
        })
    }

    pub fn stop(&self) {
        self.driver.stop();
    }

    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.driver.is_running()
    }

    pub fn settings(&self) -> Result<JsValue, JsValue> {
        to_js(&self.core.borrow().settings())
    }

    pub fn state(&self) -> Result<JsValue, JsValue> {
        to_js(&self.core.borrow().state())
    }

    /// Call `callback(state)` after every state change
    pub fn subscribe(&mut self, callback: js_sys::Function) {
        let subscription = self.core.borrow().store().subscribe(move |state| {
            match serde_wasm_bindgen::to_value(state) {
                Ok(value) => {
                    if let Err(e) = callback.call1(&JsValue::NULL, &value) {
                        log::warn!("State listener threw: {:?}", e);
                    }
                }
                Err(e) => log::warn!("Failed to serialise state: {}", e),
            }
        });
        self.listeners.push(subscription);
    }

    #[wasm_bindgen(js_name = setHovered)]
    pub fn set_hovered(&self, object_id: Option<String>) {
        self.core.borrow().store().set_hovered_object(object_id);
    }

    #[wasm_bindgen(js_name = setSelected)]
    pub fn set_selected(&self, object_id: Option<String>) {
        self.core.borrow().store().set_selected_object(object_id);
    }

    #[wasm_bindgen(js_name = setPerformanceMode)]
    pub fn set_performance_mode(&self, enabled: bool) {
        self.core.borrow().store().set_performance_mode(enabled);
    }

    #[wasm_bindgen(js_name = setLoadingProgress)]
    pub fn set_loading_progress(&self, progress: u8) {
        let core = self.core.borrow();
        core.store().set_loading_progress(progress);
        if progress >= 100 {
            core.store().set_scene_loading(false);
        }
    }

    pub fn reset(&self) {
        self.core.borrow().store().reset();
    }

    /// Add a `planet`, `particles` or `starfield` component; returns its id
    pub fn mount(
        &self,
        tag: &str,
        id: Option<String>,
        texture_path: Option<String>,
    ) -> Result<String, JsValue> {
        let spec = ComponentSpec {
            id,
            texture_path,
            ..ComponentSpec::default()
        };
        self.core
            .borrow()
            .mount(tag, &spec)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn unmount(&self, id: &str) -> bool {
        self.core.borrow().unmount(id)
    }
}

impl Default for SceneRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SceneRuntime {
    fn drop(&mut self) {
        self.driver.stop();
        self.listeners.clear();
    }
}

/// Site-wide UI flags; the menu state survives reloads
#[wasm_bindgen]
pub struct UiPreferences {
    store: UiStore<BrowserStorage>,
}

#[wasm_bindgen]
impl UiPreferences {
    #[wasm_bindgen(constructor)]
    pub fn new() -> UiPreferences {
        UiPreferences {
            store: UiStore::load(BrowserStorage::local()),
        }
    }

    #[wasm_bindgen(js_name = isMenuOpen)]
    pub fn is_menu_open(&self) -> bool {
        self.store.is_menu_open()
    }

    #[wasm_bindgen(js_name = setMenuOpen)]
    pub fn set_menu_open(&mut self, open: bool) {
        self.store.set_menu_open(open);
    }

    #[wasm_bindgen(js_name = toggleMenu)]
    pub fn toggle_menu(&mut self) {
        self.store.toggle_menu();
    }

    #[wasm_bindgen(js_name = scrollY)]
    pub fn scroll_y(&self) -> f64 {
        self.store.scroll_y()
    }

    #[wasm_bindgen(js_name = setScrollY)]
    pub fn set_scroll_y(&mut self, scroll_y: f64) {
        self.store.set_scroll_y(scroll_y);
    }

    #[wasm_bindgen(js_name = isLoading)]
    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    #[wasm_bindgen(js_name = setLoading)]
    pub fn set_loading(&mut self, loading: bool) {
        self.store.set_loading(loading);
    }
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self::new()
    }
}
