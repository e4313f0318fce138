//! Aggregate function trait surface and registry.
//!
//! This crate defines the open, user-implementable [`AggregateFunction`]
//! trait and a small in-memory [`FunctionRegistry`] for registering and
//! resolving aggregates by their `(name, num_args)` key.
//!
//! Arity is part of the key: a function that accepts 3, 4 or 5 arguments
//! is registered once per arity, so an unsupported argument count fails at
//! lookup time rather than on the first row.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use greplace_error::{ReplaceError, Result};
use tracing::debug;

pub mod aggregate;

pub use aggregate::{AggregateAdapter, AggregateFunction};

/// Type-erased aggregate function object used by the registry.
pub type ErasedAggregateFunction = dyn AggregateFunction<State = Box<dyn Any + Send>>;

/// Composite lookup key for functions: `(UPPERCASE name, num_args)`.
///
/// Names are stored as uppercase ASCII for case-insensitive matching.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct FunctionKey {
    /// Function name, stored as uppercase ASCII.
    pub name: String,
    /// Exact argument count.
    pub num_args: usize,
}

impl FunctionKey {
    /// Create a new function key with the name canonicalized to uppercase.
    #[must_use]
    pub fn new(name: &str, num_args: usize) -> Self {
        Self {
            name: canonical_name(name),
            num_args,
        }
    }
}

/// Registry for aggregate functions, keyed by `(name, num_args)`.
///
/// Lookup is an exact match on `(UPPERCASE_NAME, num_args)`; a miss means
/// "no such function".
#[derive(Default)]
pub struct FunctionRegistry {
    aggregates: HashMap<FunctionKey, Arc<ErasedAggregateFunction>>,
}

impl FunctionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an aggregate function using the type-erased adapter.
    ///
    /// Overwrites any existing function with the same `(name, num_args)` key
    /// and returns the previous one.
    pub fn register_aggregate<F>(&mut self, function: F) -> Option<Arc<ErasedAggregateFunction>>
    where
        F: AggregateFunction + 'static,
        F::State: 'static,
    {
        let key = FunctionKey::new(function.name(), function.num_args());
        debug!(name = %key.name, arity = key.num_args, kind = "aggregate", "registering function");
        self.aggregates
            .insert(key, Arc::new(AggregateAdapter::new(function)))
    }

    /// Look up an aggregate function by `(name, num_args)`.
    #[must_use]
    pub fn find_aggregate(
        &self,
        name: &str,
        num_args: usize,
    ) -> Option<Arc<ErasedAggregateFunction>> {
        let key = FunctionKey::new(name, num_args);
        let result = self.aggregates.get(&key).map(Arc::clone);
        debug!(
            name = %key.name,
            arity = num_args,
            kind = "aggregate",
            hit = result.is_some(),
            "registry lookup"
        );
        result
    }

    /// Like [`find_aggregate`](Self::find_aggregate), but reports a miss as
    /// [`ReplaceError::NoSuchFunction`].
    pub fn resolve_aggregate(
        &self,
        name: &str,
        num_args: usize,
    ) -> Result<Arc<ErasedAggregateFunction>> {
        self.find_aggregate(name, num_args)
            .ok_or_else(|| ReplaceError::NoSuchFunction {
                name: name.trim().to_owned(),
                num_args,
            })
    }

    /// Whether the registry contains any aggregate function with this name
    /// (any arg count).
    #[must_use]
    pub fn contains_aggregate(&self, name: &str) -> bool {
        let canon = canonical_name(name);
        self.aggregates.keys().any(|k| k.name == canon)
    }

    /// Argument counts registered for `name`, sorted ascending.
    #[must_use]
    pub fn aggregate_arities(&self, name: &str) -> Vec<usize> {
        let canon = canonical_name(name);
        let mut arities: Vec<usize> = self
            .aggregates
            .keys()
            .filter(|k| k.name == canon)
            .map(|k| k.num_args)
            .collect();
        arities.sort_unstable();
        arities
    }
}

fn canonical_name(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}
