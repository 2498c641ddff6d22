use std::collections::BTreeMap;

use tracefall_core::config::Config;
use tracefall_core::error::{Result, TracefallError};
use tracing::debug;

use crate::view::{HostView, WaterfallView};

/// Name the waterfall view registers under.
pub const WATERFALL_VIEW: &str = "waterfall";

pub type ViewFactory = fn(&Config) -> Box<dyn HostView>;

/// Explicit name to factory table handed to a host at startup.
#[derive(Default)]
pub struct ViewRegistry {
    factories: BTreeMap<String, ViewFactory>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in views already registered.
    pub fn with_builtin() -> Result<Self> {
        let mut registry = Self::new();
        register_waterfall(&mut registry)?;
        Ok(registry)
    }

    pub fn register(&mut self, name: &str, factory: ViewFactory) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TracefallError::Registry(
                "view name must not be empty".to_string(),
            ));
        }
        if self.factories.contains_key(name) {
            return Err(TracefallError::Registry(format!(
                "view {name} is already registered"
            )));
        }
        self.factories.insert(name.to_string(), factory);
        debug!(view = name, "view registered");
        Ok(())
    }

    pub fn create(&self, name: &str, config: &Config) -> Result<Box<dyn HostView>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| TracefallError::Registry(format!("unknown view {name}")))?;
        Ok(factory(config))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

pub fn register_waterfall(registry: &mut ViewRegistry) -> Result<()> {
    registry.register(WATERFALL_VIEW, waterfall_factory)
}

pub fn waterfall_factory(config: &Config) -> Box<dyn HostView> {
    Box::new(WaterfallView::new(config.clone()))
}
