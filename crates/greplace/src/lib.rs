//! Fold driver for the `group_replace` aggregate.
//!
//! This crate wires the replace extension into a [`FunctionRegistry`] and
//! drives it over grouped row streams:
//!
//! - [`GroupFold`] folds one group: `begin_group`, then `accumulate` once
//!   per row in row order, then `finish`.
//! - [`Aggregation`] resolves an aggregate once and folds any number of
//!   keyed groups, isolating each group's failure.
//!
//! ```
//! use greplace::{Aggregation, Cx, ReplaceConfig, SqliteValue, registry_with_config};
//!
//! let registry = registry_with_config(&ReplaceConfig::default()).unwrap();
//! let agg = Aggregation::prepare(&registry, "group_replace", 3).unwrap();
//!
//! let template = "Hello, NAME!";
//! let rows = [vec![
//!     SqliteValue::from(template),
//!     SqliteValue::from("NAME"),
//!     SqliteValue::from("world"),
//! ]];
//! let result = agg.run_group(&Cx::new(), rows).unwrap();
//! assert_eq!(result, SqliteValue::from("Hello, world!"));
//! ```

pub mod aggregation;
pub mod fold;

pub use aggregation::{Aggregation, GroupOutcome};
pub use fold::GroupFold;
pub use greplace_error::{ErrorCode, ReplaceError, Result};
pub use greplace_ext_replace::{GROUP_REPLACE, ReplaceConfig};
pub use greplace_func::FunctionRegistry;
pub use greplace_types::{Cx, SqliteValue};

use greplace_ext_replace::register_replace_aggregates;
use tracing::debug;

/// Build a registry holding every aggregate this crate ships, configured
/// with `config`.
pub fn registry_with_config(config: &ReplaceConfig) -> Result<FunctionRegistry> {
    let mut registry = FunctionRegistry::new();
    register_replace_aggregates(&mut registry, config)?;
    debug!(
        arities = ?registry.aggregate_arities(GROUP_REPLACE),
        "registry ready"
    );
    Ok(registry)
}
