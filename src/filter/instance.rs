//! Per-stream filter instances and the factories that create them.
//!
//! # Design Decisions
//! - A filter's capabilities are declared once through [`FilterInstanceBuilder`].
//!   Each declared capability stores the same `Arc<Mutex<F>>` coerced to the
//!   matching trait object, so the manager never inspects types at call time.
//! - Factories run once per stream; instances are never shared across streams.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::filter::traits::{
    AsyncRequestFilter, AsyncResponseFilter, Filter, RequestFilter, ResponseFilter,
};

/// Request-side capability of a filter.
#[derive(Clone)]
pub(crate) enum RequestSlot {
    Sync(Arc<Mutex<dyn RequestFilter>>),
    Async(Arc<Mutex<dyn AsyncRequestFilter>>),
}

/// Response-side capability of a filter.
#[derive(Clone)]
pub(crate) enum ResponseSlot {
    Sync(Arc<Mutex<dyn ResponseFilter>>),
    Async(Arc<Mutex<dyn AsyncResponseFilter>>),
}

/// One filter, created for one stream, with its declared capabilities.
pub struct FilterInstance {
    pub(crate) name: String,
    pub(crate) request: Option<RequestSlot>,
    pub(crate) response: Option<ResponseSlot>,
}

impl FilterInstance {
    /// Start declaring capabilities for `filter`.
    pub fn builder<F: Filter>(filter: F) -> FilterInstanceBuilder<F> {
        FilterInstanceBuilder {
            name: filter.name().to_string(),
            shared: Arc::new(Mutex::new(filter)),
            request: None,
            response: None,
        }
    }

    /// Request-only filter.
    pub fn request<F: RequestFilter>(filter: F) -> Self {
        Self::builder(filter).request().build()
    }

    /// Response-only filter.
    pub fn response<F: ResponseFilter>(filter: F) -> Self {
        Self::builder(filter).response().build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handles_requests(&self) -> bool {
        self.request.is_some()
    }

    pub fn handles_responses(&self) -> bool {
        self.response.is_some()
    }
}

impl fmt::Debug for FilterInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterInstance")
            .field("name", &self.name)
            .field("request", &self.request.is_some())
            .field("response", &self.response.is_some())
            .finish()
    }
}

/// Declares which chains a filter joins.
pub struct FilterInstanceBuilder<F> {
    name: String,
    shared: Arc<Mutex<F>>,
    request: Option<RequestSlot>,
    response: Option<ResponseSlot>,
}

impl<F: Filter> FilterInstanceBuilder<F> {
    /// Join the request chain.
    pub fn request(mut self) -> Self
    where
        F: RequestFilter,
    {
        let filter: Arc<Mutex<dyn RequestFilter>> = self.shared.clone();
        self.request = Some(RequestSlot::Sync(filter));
        self
    }

    /// Join the request chain with resume support.
    pub fn async_request(mut self) -> Self
    where
        F: AsyncRequestFilter,
    {
        let filter: Arc<Mutex<dyn AsyncRequestFilter>> = self.shared.clone();
        self.request = Some(RequestSlot::Async(filter));
        self
    }

    /// Join the response chain.
    pub fn response(mut self) -> Self
    where
        F: ResponseFilter,
    {
        let filter: Arc<Mutex<dyn ResponseFilter>> = self.shared.clone();
        self.response = Some(ResponseSlot::Sync(filter));
        self
    }

    /// Join the response chain with resume support.
    pub fn async_response(mut self) -> Self
    where
        F: AsyncResponseFilter,
    {
        let filter: Arc<Mutex<dyn AsyncResponseFilter>> = self.shared.clone();
        self.response = Some(ResponseSlot::Async(filter));
        self
    }

    /// Override the name used in logs.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn build(self) -> FilterInstance {
        if self.request.is_none() && self.response.is_none() {
            tracing::warn!(filter = %self.name, "Filter declares no capabilities and will never run");
        }
        FilterInstance {
            name: self.name,
            request: self.request,
            response: self.response,
        }
    }
}

type FilterFactory = Arc<dyn Fn() -> FilterInstance + Send + Sync>;

/// Ordered list of filter factories.
///
/// Cloning shares the factories; each stream calls every factory once.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    factories: Vec<FilterFactory>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a factory. Registration order fixes chain order.
    pub fn register<M>(&mut self, factory: M) -> &mut Self
    where
        M: Fn() -> FilterInstance + Send + Sync + 'static,
    {
        self.factories.push(Arc::new(factory));
        self
    }

    /// Fresh instances for one stream, in registration order.
    pub fn create_filters(&self) -> Vec<FilterInstance> {
        self.factories.iter().map(|factory| factory()).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("factories", &self.factories.len())
            .finish()
    }
}

/// Lock a filter, recovering from a poisoned mutex.
pub(crate) fn lock<T: ?Sized>(filter: &Mutex<T>) -> MutexGuard<'_, T> {
    filter.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;
    impl Filter for Noop {
        fn name(&self) -> &str {
            "noop"
        }
    }
    impl RequestFilter for Noop {}
    impl ResponseFilter for Noop {}

    #[test]
    fn capabilities_are_declared_explicitly() {
        let both = FilterInstance::builder(Noop).request().response().build();
        assert!(both.handles_requests());
        assert!(both.handles_responses());
        assert_eq!(both.name(), "noop");

        // implementing a trait is not enough to join a chain
        let request_only = FilterInstance::request(Noop);
        assert!(request_only.handles_requests());
        assert!(!request_only.handles_responses());
    }

    #[test]
    fn registry_creates_fresh_instances() {
        let mut registry = FilterRegistry::new();
        registry
            .register(|| FilterInstance::request(Noop))
            .register(|| FilterInstance::builder(Noop).response().named("second").build());

        let first = registry.create_filters();
        let second = registry.create_filters();
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].name(), "second");

        let (Some(RequestSlot::Sync(a)), Some(RequestSlot::Sync(b))) =
            (&first[0].request, &second[0].request)
        else {
            panic!("expected request slots");
        };
        assert!(!Arc::ptr_eq(a, b));
    }
}
