//! `requestAnimationFrame` driver for the runtime's frame loop
//!
//! The callback re-arms itself every frame; [`AnimationDriver::stop`] cancels
//! the pending request and drops the closure, so start/stop cycles never leave
//! a callback behind.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

type AnimationClosure = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

#[derive(Clone)]
pub struct AnimationDriver {
    animation_frame_id: Rc<Cell<Option<i32>>>,
    animation_closure: AnimationClosure,
}

impl Default for AnimationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationDriver {
    pub fn new() -> Self {
        Self {
            animation_frame_id: Rc::new(Cell::new(None)),
            animation_closure: Rc::new(RefCell::new(None)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.animation_closure.borrow().is_some()
    }

    /// Call `on_frame(timestamp_ms)` once per animation frame until stopped
    pub fn start(&self, mut on_frame: impl FnMut(f64) + 'static) -> Result<(), JsValue> {
        if self.is_running() {
            return Ok(());
        }

        let driver = self.clone();
        let closure = Closure::wrap(Box::new(move |timestamp: f64| {
            driver.animation_frame_id.set(None);
            on_frame(timestamp);
            // Stopped from inside the callback
            if !driver.is_running() {
                return;
            }
            if let Err(e) = driver.request_frame() {
                log::error!("Failed to schedule animation frame: {:?}", e);
                driver.stop();
            }
        }) as Box<dyn FnMut(f64)>);

        *self.animation_closure.borrow_mut() = Some(closure);
        if let Err(e) = self.request_frame() {
            self.animation_closure.borrow_mut().take();
            return Err(e);
        }
        log::debug!("Animation loop started");
        Ok(())
    }

    /// Cancel the pending frame and release the callback; idempotent
    pub fn stop(&self) {
        if let Some(id) = self.animation_frame_id.take() {
            if let Some(window) = web_sys::window() {
                window.cancel_animation_frame(id).ok();
            }
        }
        if self.animation_closure.borrow_mut().take().is_some() {
            log::debug!("Animation loop stopped");
        }
    }

    fn request_frame(&self) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window object"))?;
        let closure = self.animation_closure.borrow();
        let Some(closure) = closure.as_ref() else {
            return Ok(());
        };
        let id = window.request_animation_frame(closure.as_ref().unchecked_ref())?;
        self.animation_frame_id.set(Some(id));
        Ok(())
    }
}
