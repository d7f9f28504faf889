//! Device capability detection for adaptive scene quality
//!
//! Detection runs once per session. Every probe method is infallible: missing
//! browser features fall back to conservative values so a failed probe
//! degrades quality instead of breaking the page.

use once_cell::sync::Lazy;
use regex::Regex;
use spacetechs_shared::{
    DeviceCapabilities, QualityTier, DEFAULT_CPU_CORES, DEFAULT_MAX_TEXTURE_SIZE,
    DEFAULT_MEMORY_GB,
};

static MOBILE_USER_AGENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Android|webOS|iPhone|iPad|iPod|BlackBerry|IEMobile|Opera Mini")
        .expect("static mobile user-agent pattern")
});

/// Result of probing a throwaway WebGL context
#[derive(Debug, Clone, PartialEq)]
pub struct WebGlReport {
    pub has_webgl2: bool,
    pub max_texture_size: Option<u32>,
    pub renderer: Option<String>,
}

/// Source of raw environment facts
pub trait EnvironmentProbe {
    fn user_agent(&self) -> Option<String>;
    fn hardware_concurrency(&self) -> Option<u32>;
    fn device_memory_gb(&self) -> Option<f64>;
    fn prefers_reduced_motion(&self) -> bool;
    /// `None` when no WebGL context can be created
    fn probe_webgl(&self) -> Option<WebGlReport>;
}

/// Probe backed by fixed values; used for native builds, pre-rendering and tests
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    pub user_agent: Option<String>,
    pub hardware_concurrency: Option<u32>,
    pub device_memory_gb: Option<f64>,
    pub prefers_reduced_motion: bool,
    pub webgl: Option<WebGlReport>,
}

impl StaticProbe {
    /// A typical desktop browser with a WebGL2-capable GPU
    pub fn desktop() -> Self {
        Self {
            user_agent: Some(
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Chrome/126.0 Safari/537.36"
                    .to_string(),
            ),
            hardware_concurrency: Some(8),
            device_memory_gb: Some(8.0),
            prefers_reduced_motion: false,
            webgl: Some(WebGlReport {
                has_webgl2: true,
                max_texture_size: Some(16384),
                renderer: Some("ANGLE (NVIDIA GeForce GTX 1660)".to_string()),
            }),
        }
    }
}

impl EnvironmentProbe for StaticProbe {
    fn user_agent(&self) -> Option<String> {
        self.user_agent.clone()
    }

    fn hardware_concurrency(&self) -> Option<u32> {
        self.hardware_concurrency
    }

    fn device_memory_gb(&self) -> Option<f64> {
        self.device_memory_gb
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.prefers_reduced_motion
    }

    fn probe_webgl(&self) -> Option<WebGlReport> {
        self.webgl.clone()
    }
}

pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    MOBILE_USER_AGENT.is_match(user_agent)
}

/// Read the environment once and fill gaps with conservative defaults
pub fn detect_capabilities(probe: &dyn EnvironmentProbe) -> DeviceCapabilities {
    let is_mobile = probe
        .user_agent()
        .map(|ua| is_mobile_user_agent(&ua))
        .unwrap_or(false);

    let memory_gb = probe
        .device_memory_gb()
        .filter(|m| m.is_finite() && *m > 0.0)
        .unwrap_or(DEFAULT_MEMORY_GB);

    let cpu_cores = probe
        .hardware_concurrency()
        .filter(|c| *c > 0)
        .unwrap_or(DEFAULT_CPU_CORES);

    let capabilities = match probe.probe_webgl() {
        Some(report) => DeviceCapabilities {
            is_mobile,
            memory_gb,
            cpu_cores,
            has_webgl: true,
            has_webgl2: report.has_webgl2,
            max_texture_size: report.max_texture_size.unwrap_or(DEFAULT_MAX_TEXTURE_SIZE),
            gpu_renderer: report.renderer,
        },
        None => DeviceCapabilities {
            is_mobile,
            memory_gb,
            cpu_cores,
            ..DeviceCapabilities::default()
        },
    };

    log::info!(
        "Detected device: mobile={} memory={}GB cores={} webgl={} webgl2={}",
        capabilities.is_mobile,
        capabilities.memory_gb,
        capabilities.cpu_cores,
        capabilities.has_webgl,
        capabilities.has_webgl2
    );

    capabilities
}

/// Fixed scoring rubric: +2 desktop, +2 for 8GB or more, +1 discrete GPU hint
pub fn capability_score(capabilities: &DeviceCapabilities) -> u32 {
    let mut score = 0;
    if !capabilities.is_mobile {
        score += 2;
    }
    if capabilities.memory_gb >= 8.0 {
        score += 2;
    }
    if capabilities.has_discrete_gpu_hint() {
        score += 1;
    }
    score
}

/// Map capabilities to the initial quality tier
pub fn classify(capabilities: &DeviceCapabilities) -> QualityTier {
    if !capabilities.has_webgl {
        return QualityTier::Low;
    }

    match capability_score(capabilities) {
        score if score >= 4 => QualityTier::High,
        score if score >= 2 => QualityTier::Medium,
        _ => QualityTier::Low,
    }
}

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::{EnvironmentProbe, WebGlReport};
    use wasm_bindgen::JsCast;
    use web_sys::{HtmlCanvasElement, WebGl2RenderingContext, WebGlRenderingContext, WebglLoseContext};

    const UNMASKED_RENDERER_WEBGL: u32 = 0x9246;

    /// Probe reading `navigator`, `matchMedia` and a throwaway canvas
    #[derive(Debug, Clone, Copy, Default)]
    pub struct BrowserProbe;

    fn scratch_canvas() -> Option<HtmlCanvasElement> {
        web_sys::window()?
            .document()?
            .create_element("canvas")
            .ok()?
            .dyn_into::<HtmlCanvasElement>()
            .ok()
    }

    /// WebGL extension objects have no global constructor, so an
    /// `instanceof` check always fails; the cast must be unchecked
    fn lose_context(extension: Option<js_sys::Object>) {
        if let Some(ext) = extension {
            ext.unchecked_into::<WebglLoseContext>().lose_context();
        }
    }

    impl EnvironmentProbe for BrowserProbe {
        fn user_agent(&self) -> Option<String> {
            web_sys::window()?.navigator().user_agent().ok()
        }

        fn hardware_concurrency(&self) -> Option<u32> {
            let cores = web_sys::window()?.navigator().hardware_concurrency();
            (cores > 0.0).then_some(cores as u32)
        }

        fn device_memory_gb(&self) -> Option<f64> {
            let navigator = web_sys::window()?.navigator();
            js_sys::Reflect::get(&navigator, &"deviceMemory".into())
                .ok()
                .and_then(|v| v.as_f64())
        }

        fn prefers_reduced_motion(&self) -> bool {
            web_sys::window()
                .and_then(|w| w.match_media("(prefers-reduced-motion: reduce)").ok().flatten())
                .map(|query| query.matches())
                .unwrap_or(false)
        }

        fn probe_webgl(&self) -> Option<WebGlReport> {
            // WebGL2 presence is probed on its own canvas; both contexts are
            // released before the canvases go out of scope.
            let has_webgl2 = scratch_canvas()
                .and_then(|canvas| canvas.get_context("webgl2").ok().flatten())
                .and_then(|ctx| ctx.dyn_into::<WebGl2RenderingContext>().ok())
                .map(|gl| lose_context(gl.get_extension("WEBGL_lose_context").ok().flatten()))
                .is_some();

            let canvas = scratch_canvas()?;
            let gl = canvas
                .get_context("webgl")
                .ok()
                .flatten()?
                .dyn_into::<WebGlRenderingContext>()
                .ok()?;

            let max_texture_size = gl
                .get_parameter(WebGlRenderingContext::MAX_TEXTURE_SIZE)
                .ok()
                .and_then(|v| v.as_f64())
                .map(|v| v as u32);

            let renderer = gl
                .get_extension("WEBGL_debug_renderer_info")
                .ok()
                .flatten()
                .and_then(|_| gl.get_parameter(UNMASKED_RENDERER_WEBGL).ok())
                .and_then(|v| v.as_string());

            lose_context(gl.get_extension("WEBGL_lose_context").ok().flatten());

            Some(WebGlReport {
                has_webgl2,
                max_texture_size,
                renderer,
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use wasm_bindgen_test::*;

        wasm_bindgen_test_configure!(run_in_browser);

        #[wasm_bindgen_test]
        fn test_lose_context_releases_webgl() {
            let Some(gl) = scratch_canvas()
                .and_then(|canvas| canvas.get_context("webgl").ok().flatten())
                .and_then(|ctx| ctx.dyn_into::<WebGlRenderingContext>().ok())
            else {
                // Headless runner without WebGL
                return;
            };

            assert!(!gl.is_context_lost());
            lose_context(gl.get_extension("WEBGL_lose_context").ok().flatten());
            assert!(gl.is_context_lost());
        }

        #[wasm_bindgen_test]
        fn test_browser_detection_never_fails() {
            let caps = super::super::detect_capabilities(&BrowserProbe);
            assert!(caps.cpu_cores > 0);
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserProbe;
