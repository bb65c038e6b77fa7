//! Stream prototype: callbacks collected before a stream starts.

use std::sync::{Arc, Weak};

use bytes::Bytes;
use tokio::runtime::Handle;

use crate::config::ClientConfig;
use crate::engine::{Engine, EngineCallbacks};
use crate::error::{ClientError, StreamError};
use crate::filter::chain::FilterChain;
use crate::filter::manager::FilterManager;
use crate::filter::FilterRegistry;
use crate::headers::{ResponseHeaders, ResponseTrailers};
use crate::stream::callbacks::ResponseCallbacks;
use crate::stream::driver::StreamDriver;
use crate::stream::event::DeliveryQueue;
use crate::stream::handle::Stream;
use crate::stream::state::AtomicStreamState;

/// Collects response callbacks, then starts a [`Stream`].
///
/// Callbacks run on the stream's driver task, never concurrently with each
/// other. Unset callbacks are skipped.
pub struct StreamPrototype {
    engine: Weak<dyn Engine>,
    filters: FilterRegistry,
    config: Arc<ClientConfig>,
    callbacks: ResponseCallbacks,
}

impl StreamPrototype {
    pub(crate) fn new(
        engine: Weak<dyn Engine>,
        filters: FilterRegistry,
        config: Arc<ClientConfig>,
    ) -> Self {
        Self {
            engine,
            filters,
            config,
            callbacks: ResponseCallbacks::default(),
        }
    }

    pub fn set_on_response_headers<F>(mut self, callback: F) -> Self
    where
        F: FnMut(ResponseHeaders, bool) + Send + 'static,
    {
        self.callbacks.on_headers = Some(Box::new(callback));
        self
    }

    pub fn set_on_response_data<F>(mut self, callback: F) -> Self
    where
        F: FnMut(Bytes, bool) + Send + 'static,
    {
        self.callbacks.on_data = Some(Box::new(callback));
        self
    }

    pub fn set_on_response_trailers<F>(mut self, callback: F) -> Self
    where
        F: FnMut(ResponseTrailers) + Send + 'static,
    {
        self.callbacks.on_trailers = Some(Box::new(callback));
        self
    }

    pub fn set_on_error<F>(mut self, callback: F) -> Self
    where
        F: FnMut(StreamError) + Send + 'static,
    {
        self.callbacks.on_error = Some(Box::new(callback));
        self
    }

    pub fn set_on_cancel<F>(mut self, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.callbacks.on_cancel = Some(Box::new(callback));
        self
    }

    pub fn set_on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.callbacks.on_complete = Some(Box::new(callback));
        self
    }

    /// Start on the current Tokio runtime.
    pub fn start(self) -> Result<Stream, ClientError> {
        let runtime = Handle::try_current().map_err(|_| ClientError::NoRuntime)?;
        self.start_on(&runtime)
    }

    /// Start with the stream's driver spawned on `runtime`.
    pub fn start_on(self, runtime: &Handle) -> Result<Stream, ClientError> {
        let Some(engine) = self.engine.upgrade() else {
            tracing::warn!("Cannot start stream, engine is no longer running");
            return Err(ClientError::EngineUnavailable);
        };

        let (queue, events) = DeliveryQueue::channel();
        let handle = engine.start_stream(EngineCallbacks::new(queue.clone()));
        let chain = FilterChain::new(self.filters.create_filters());
        let manager = FilterManager::new(chain, handle, queue.downgrade(), &self.config.filters);
        let state = Arc::new(AtomicStreamState::new());

        let driver = StreamDriver::new(
            handle,
            self.engine.clone(),
            manager,
            self.callbacks,
            state.clone(),
            queue.cancel_flag(),
        );
        runtime.spawn(driver.run(events));

        tracing::debug!(stream = %handle, "Stream started");
        Ok(Stream::new(handle, self.engine, queue, state))
    }
}
