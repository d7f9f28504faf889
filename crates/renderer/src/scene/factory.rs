//! Component registry resolved once from device capabilities

use std::collections::HashMap;

use spacetechs_shared::{DeviceCapabilities, SceneError};

use super::objects::{FallbackNode, ParticleField, Planet, StarField};
use super::{ComponentTag, SceneObject};

/// Per-instance parameters passed to a constructor
#[derive(Debug, Clone, Default)]
pub struct ComponentSpec {
    pub id: Option<String>,
    pub texture_path: Option<String>,
    pub position: [f32; 3],
}

impl ComponentSpec {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }
}

type Constructor = Box<dyn Fn(String, &ComponentSpec) -> Box<dyn SceneObject>>;

pub struct SceneFactory {
    constructors: HashMap<ComponentTag, Constructor>,
    webgl_available: bool,
}

impl SceneFactory {
    /// Registry with the built-in components; without WebGL every tag
    /// resolves to a [`FallbackNode`]
    pub fn for_capabilities(capabilities: &DeviceCapabilities) -> Self {
        let mut factory = Self {
            constructors: HashMap::new(),
            webgl_available: capabilities.has_webgl,
        };

        if !factory.webgl_available {
            log::info!("WebGL unavailable; scene components resolve to fallbacks");
            return factory;
        }

        factory.register(ComponentTag::Planet, |id, spec| {
            let planet = Planet::new(id, spec.position);
            Box::new(match &spec.texture_path {
                Some(path) => planet.with_texture(path.clone()),
                None => planet,
            })
        });
        factory.register(ComponentTag::Particles, |id, _| Box::new(ParticleField::new(id)));
        factory.register(ComponentTag::StarField, |id, _| Box::new(StarField::new(id)));
        factory
    }

    pub fn register(
        &mut self,
        tag: ComponentTag,
        constructor: impl Fn(String, &ComponentSpec) -> Box<dyn SceneObject> + 'static,
    ) {
        self.constructors.insert(tag, Box::new(constructor));
    }

    pub fn webgl_available(&self) -> bool {
        self.webgl_available
    }

    pub fn create(&self, tag: ComponentTag, spec: &ComponentSpec) -> Box<dyn SceneObject> {
        let id = spec
            .id
            .clone()
            .unwrap_or_else(|| format!("{}-{}", tag, uuid::Uuid::new_v4()));

        match self.constructors.get(&tag) {
            Some(constructor) => constructor(id, spec),
            None => Box::new(FallbackNode::new(id, tag)),
        }
    }

    /// Resolve a tag by name, as used across the JS boundary
    pub fn create_named(&self, tag: &str, spec: &ComponentSpec) -> Result<Box<dyn SceneObject>, SceneError> {
        Ok(self.create(tag.parse()?, spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webgl_caps() -> DeviceCapabilities {
        DeviceCapabilities {
            has_webgl: true,
            ..DeviceCapabilities::default()
        }
    }

    #[test]
    fn test_builtin_components() {
        let factory = SceneFactory::for_capabilities(&webgl_caps());
        let planet = factory.create(ComponentTag::Planet, &ComponentSpec::with_id("ai-dashboard"));
        assert_eq!(planet.id(), "ai-dashboard");
        assert_eq!(planet.tag(), ComponentTag::Planet);
        assert!(!planet.is_fallback());
    }

    #[test]
    fn test_no_webgl_resolves_to_fallback() {
        let factory = SceneFactory::for_capabilities(&DeviceCapabilities::default());
        assert!(!factory.webgl_available());

        for tag in [ComponentTag::Planet, ComponentTag::Particles, ComponentTag::StarField] {
            let object = factory.create(tag, &ComponentSpec::default());
            assert!(object.is_fallback());
            assert_eq!(object.tag(), tag);
        }
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let factory = SceneFactory::for_capabilities(&webgl_caps());
        let a = factory.create(ComponentTag::StarField, &ComponentSpec::default());
        let b = factory.create(ComponentTag::StarField, &ComponentSpec::default());
        assert!(a.id().starts_with("starfield-"));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_unknown_tag() {
        let factory = SceneFactory::for_capabilities(&webgl_caps());
        assert!(matches!(
            factory.create_named("nebula", &ComponentSpec::default()),
            Err(SceneError::UnknownComponent { .. })
        ));
    }
}
