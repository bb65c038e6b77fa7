//! Mutable header builder with the restricted-name policy.
//!
//! # Responsibilities
//! - Let application code add, set and remove headers before a value is frozen
//! - Silently ignore restricted names on the public path
//! - Offer a crate-private path for pseudo-headers set during construction

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use crate::headers::container::HeaderContainer;
use crate::headers::{sealed::FromContainer, Headers};

/// Prefixes that application code may never touch.
const RESTRICTED_PREFIXES: [&str; 2] = [":", "x-envoy-mobile"];

/// Whether `name` is reserved for the client itself.
///
/// Covers `host`, pseudo-headers and the `x-envoy-mobile` namespace,
/// compared case-insensitively.
pub fn is_restricted_header(name: &str) -> bool {
    let name = name.to_lowercase();
    name == "host" || RESTRICTED_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// Builder for a typed header value `T`.
///
/// Use the aliases in [`crate::headers`] (`RequestHeadersBuilder` and friends)
/// rather than naming this type directly.
pub struct HeadersBuilder<T> {
    container: HeaderContainer,
    _kind: PhantomData<fn() -> T>,
}

impl<T: FromContainer> HeadersBuilder<T> {
    pub(crate) fn with_container(container: HeaderContainer) -> Self {
        Self {
            container,
            _kind: PhantomData,
        }
    }

    pub(crate) fn empty() -> Self {
        Self::with_container(HeaderContainer::new())
    }

    /// Append a value. Restricted names are ignored.
    pub fn add(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        if self.reject(name, "add") {
            return self;
        }
        self.container.add(name, value.into());
        self
    }

    /// Replace every value of `name`. Restricted names are ignored.
    pub fn set(&mut self, name: &str, values: Vec<String>) -> &mut Self {
        if self.reject(name, "set") {
            return self;
        }
        self.container.set(name, Some(values));
        self
    }

    /// Remove `name`. Restricted names are ignored.
    pub fn remove(&mut self, name: &str) -> &mut Self {
        if self.reject(name, "remove") {
            return self;
        }
        self.container.remove(name);
        self
    }

    /// Set a header without the restricted-name check.
    pub(crate) fn internal_set(&mut self, name: &str, values: Vec<String>) -> &mut Self {
        self.container.set(name, Some(values));
        self
    }

    pub fn value(&self, name: &str) -> Option<&[String]> {
        self.container.value(name)
    }

    pub fn all_headers(&self) -> HashMap<String, Vec<String>> {
        self.container.all_headers()
    }

    /// Freeze the current contents. The builder stays usable.
    pub fn build(&self) -> T {
        T::from_container(self.container.clone())
    }

    fn reject(&self, name: &str, operation: &'static str) -> bool {
        let restricted = is_restricted_header(name);
        if restricted {
            tracing::debug!(header = name, operation, "Ignoring restricted header");
        }
        restricted
    }
}

impl<T: Headers> From<&T> for HeadersBuilder<T> {
    fn from(headers: &T) -> Self {
        Self {
            container: headers.container().clone(),
            _kind: PhantomData,
        }
    }
}

impl<T> Clone for HeadersBuilder<T> {
    fn clone(&self) -> Self {
        Self {
            container: self.container.clone(),
            _kind: PhantomData,
        }
    }
}

impl<T> fmt::Debug for HeadersBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadersBuilder")
            .field("container", &self.container)
            .finish()
    }
}
