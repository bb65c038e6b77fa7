//! Entry point for starting streams.

use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;

use crate::config::validation::validate_config;
use crate::config::{ClientConfig, ConfigError};
use crate::engine::Engine;
use crate::filter::{FilterInstance, FilterRegistry};
use crate::stream::prototype::StreamPrototype;

/// Creates streams against an engine it does not own.
///
/// Cloning is cheap; clones share the configuration but each keeps its own
/// filter registry from the point of cloning.
#[derive(Clone)]
pub struct StreamClient {
    engine: Weak<dyn Engine>,
    filters: FilterRegistry,
    config: Arc<ArcSwap<ClientConfig>>,
}

impl StreamClient {
    pub fn new<E: Engine>(engine: &Arc<E>, config: ClientConfig) -> Self {
        let engine: Weak<dyn Engine> = Arc::downgrade(engine) as Weak<E>;
        Self {
            engine,
            filters: FilterRegistry::new(),
            config: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// Register a filter factory. Streams started later run one instance of it.
    pub fn register_filter<M>(&mut self, factory: M) -> &mut Self
    where
        M: Fn() -> FilterInstance + Send + Sync + 'static,
    {
        self.filters.register(factory);
        self
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    /// A prototype carrying a copy of the current filters and configuration.
    pub fn new_stream_prototype(&self) -> StreamPrototype {
        StreamPrototype::new(self.engine.clone(), self.filters.clone(), self.config.load_full())
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<ClientConfig> {
        self.config.load_full()
    }

    /// Validate and swap in a new configuration. Running streams keep the old one.
    pub fn update_config(&self, config: ClientConfig) -> Result<(), ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        self.config.store(Arc::new(config));
        tracing::info!("Client configuration updated");
        Ok(())
    }

    pub fn is_engine_running(&self) -> bool {
        self.engine.strong_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LoopbackEngine;
    use crate::error::ClientError;

    #[test]
    fn invalid_config_is_not_swapped_in() {
        let engine = Arc::new(LoopbackEngine::new());
        let client = StreamClient::new(&engine, ClientConfig::default());

        let mut bad = ClientConfig::default();
        bad.filters.buffer_limit_bytes = 0;
        assert!(matches!(client.update_config(bad), Err(ConfigError::Validation(_))));
        assert_eq!(*client.config(), ClientConfig::default());

        let mut good = ClientConfig::default();
        good.grpc.default_timeout_ms = Some(250);
        client.update_config(good.clone()).unwrap();
        assert_eq!(*client.clone().config(), good);
    }

    #[tokio::test]
    async fn dropped_engine_rejects_new_streams() {
        let engine = Arc::new(LoopbackEngine::new());
        let client = StreamClient::new(&engine, ClientConfig::default());
        assert!(client.is_engine_running());

        drop(engine);
        assert!(!client.is_engine_running());
        assert!(matches!(
            client.new_stream_prototype().start(),
            Err(ClientError::EngineUnavailable)
        ));
    }
}
