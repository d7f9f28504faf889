//! Browser entry point for the SpaceTechs scene runtime
//! Bridges the page's JavaScript to the adaptive renderer, the content API
//! and the persisted UI preferences

use std::sync::Once;

use wasm_bindgen::prelude::*;

pub mod content;
pub mod runtime;

#[cfg(target_arch = "wasm32")]
pub mod render_loop;
#[cfg(target_arch = "wasm32")]
mod browser;

pub use content::ContentClient;
pub use runtime::RuntimeCore;

#[cfg(target_arch = "wasm32")]
pub use browser::{SceneRuntime, UiPreferences};

static INIT: Once = Once::new();

/// Install the console logger and the panic hook; safe to call repeatedly
#[wasm_bindgen]
pub fn init() {
    INIT.call_once(|| {
        console_error_panic_hook::set_once();
        // Another logger may already be installed by the host page
        let _ = console_log::init_with_level(log::Level::Info);
        log::info!("SpaceTechs runtime initialised");
    });
}
