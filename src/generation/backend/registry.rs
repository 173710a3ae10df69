// Provider registry - ordered capability table used for backend selection

use super::{Backend, ConfigError, GroqFactory, OllamaFactory, ProviderKind, ProviderSelector, SimulationBackend, SimulationFactory};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Knows how to probe for and construct one kind of backend
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Cheap check used by `auto` selection. Must not pull models or block for long.
    async fn is_available(&self, config: &ProviderConfig) -> bool;

    async fn connect(&self, config: &ProviderConfig) -> Result<Arc<dyn Backend>, ConfigError>;
}

/// Factories in `auto` priority order
pub struct ProviderRegistry {
    factories: Vec<Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// Hosted API first, then the local runtime, then the simulator
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GroqFactory));
        registry.register(Arc::new(OllamaFactory));
        registry.register(Arc::new(SimulationFactory));
        registry
    }

    /// Append a factory, replacing any existing one of the same kind in place
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        match self.factories.iter().position(|f| f.kind() == factory.kind()) {
            Some(index) => self.factories[index] = factory,
            None => self.factories.push(factory),
        }
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn ProviderFactory>> {
        self.factories.iter().find(|f| f.kind() == kind).cloned()
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.factories.iter().map(|f| f.kind()).collect()
    }

    /// Resolve a backend. Explicit selections are strict; `auto` always succeeds.
    pub async fn select(
        &self,
        selector: ProviderSelector,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn Backend>, ConfigError> {
        match selector {
            ProviderSelector::Explicit(kind) => {
                let factory = self
                    .get(kind)
                    .ok_or_else(|| ConfigError::UnknownProvider(kind.to_string()))?;
                let backend = factory.connect(config).await?;
                info!("Using {} backend ({})", backend.provider_type(), backend.model_name());
                Ok(backend)
            }
            ProviderSelector::Auto => Ok(self.select_auto(config).await),
        }
    }

    async fn select_auto(&self, config: &ProviderConfig) -> Arc<dyn Backend> {
        if let Some(kind) = config.env_override {
            match self.get(kind) {
                Some(factory) => match factory.connect(config).await {
                    Ok(backend) => {
                        info!("Using {} backend from LLM_PROVIDER", kind);
                        return backend;
                    }
                    Err(e) => warn!("LLM_PROVIDER={} could not be used: {}", kind, e),
                },
                None => warn!("LLM_PROVIDER={} is not registered", kind),
            }
        }

        for factory in &self.factories {
            let kind = factory.kind();
            if Some(kind) == config.env_override {
                continue;
            }
            if !factory.is_available(config).await {
                debug!("Provider {} not available", kind);
                continue;
            }
            match factory.connect(config).await {
                Ok(backend) => {
                    info!("Auto-selected {} backend ({})", kind, backend.model_name());
                    return backend;
                }
                Err(e) => warn!("Provider {} failed to initialize: {}", kind, e),
            }
        }

        warn!("No provider available, falling back to simulation");
        Arc::new(SimulationBackend::new())
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
