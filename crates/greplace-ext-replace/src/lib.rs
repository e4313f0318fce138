//! Replace extension: the `group_replace` aggregate.
//!
//! `group_replace(text, key, value[, prefix, postfix])` works like
//! `group_concat`, but instead of joining rows it substitutes each row's
//! `key` with its `value` inside one accumulating text. This turns a
//! template with several placeholders plus a key/value table into the
//! filled-in text:
//!
//! ```sql
//! SELECT group_replace(t.body, p.key, p.value, '{', '}')
//!   FROM templates t JOIN params p ON p.template_id = t.id
//!  GROUP BY t.id;
//! ```
//!
//! The crate is split into:
//!
//! 1. [`engine`]: literal replace-all over a growing buffer, bounded by
//!    [`ReplaceConfig`].
//! 2. [`aggregate`]: the per-group accumulator and the
//!    [`AggregateFunction`](greplace_func::AggregateFunction) impl.
//!
//! [`register_replace_aggregates`] installs the function in a
//! [`FunctionRegistry`] for arities 3, 4 and 5.

use greplace_error::Result;
use greplace_func::FunctionRegistry;
use greplace_types::limits::{GROUP_REPLACE_MAX_ARGS, GROUP_REPLACE_MIN_ARGS};
use tracing::info;

pub mod aggregate;
pub mod config;
pub mod engine;

pub use aggregate::{GROUP_REPLACE, GroupReplaceFunc, GroupReplaceState};
pub use config::ReplaceConfig;
pub use engine::{
    ReplaceOutcome, SubstitutionRequest, replace_all, replace_all_with_stats, replace_in_place,
};

#[must_use]
pub const fn extension_name() -> &'static str {
    "replace"
}

/// Register `group_replace` for every supported arity.
///
/// Fails without touching the registry if `config` is invalid.
pub fn register_replace_aggregates(
    registry: &mut FunctionRegistry,
    config: &ReplaceConfig,
) -> Result<()> {
    config.validate()?;
    let functions = (GROUP_REPLACE_MIN_ARGS..=GROUP_REPLACE_MAX_ARGS)
        .map(|arity| GroupReplaceFunc::new(arity, *config))
        .collect::<Result<Vec<_>>>()?;

    info!(
        max_iterations = config.max_iterations,
        max_length = config.max_length,
        "replace extension: registering aggregate functions"
    );
    for function in functions {
        registry.register_aggregate(function);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use greplace_types::SqliteValue;

    use super::*;

    #[test]
    fn test_extension_name_matches_crate_suffix() {
        let expected = env!("CARGO_PKG_NAME")
            .strip_prefix("greplace-ext-")
            .expect("extension crates should use greplace-ext-* naming");
        assert_eq!(extension_name(), expected);
    }

    #[test]
    fn test_register_replace_aggregates() {
        let mut registry = FunctionRegistry::new();
        register_replace_aggregates(&mut registry, &ReplaceConfig::default()).unwrap();
        assert!(registry.find_aggregate("group_replace", 3).is_some());
        assert!(registry.find_aggregate("GROUP_REPLACE", 4).is_some());
        assert!(registry.find_aggregate("group_replace", 5).is_some());
        assert!(registry.find_aggregate("group_replace", 2).is_none());
        assert!(registry.find_aggregate("group_replace", 6).is_none());
        assert_eq!(registry.aggregate_arities("group_replace"), vec![3, 4, 5]);
    }

    #[test]
    fn test_registered_function_folds_through_adapter() {
        let mut registry = FunctionRegistry::new();
        register_replace_aggregates(&mut registry, &ReplaceConfig::default()).unwrap();
        let f = registry.find_aggregate("group_replace", 3).unwrap();

        let mut state = f.initial_state();
        f.step(
            &mut state,
            &[
                SqliteValue::from("Dear NAME,"),
                SqliteValue::from("NAME"),
                SqliteValue::from("Ada"),
            ],
        )
        .unwrap();
        assert_eq!(f.finalize(state).unwrap(), SqliteValue::from("Dear Ada,"));
    }

    #[test]
    fn test_invalid_config_registers_nothing() {
        let mut registry = FunctionRegistry::new();
        let config = ReplaceConfig::default().with_max_length(0);
        assert!(register_replace_aggregates(&mut registry, &config).is_err());
        assert!(!registry.contains_aggregate("group_replace"));
    }
}
