//! Multi-group driver: fold a keyed row stream into one result per group.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use greplace_error::Result;
use greplace_func::{ErasedAggregateFunction, FunctionRegistry};
use greplace_types::{Cx, SqliteValue};
use tracing::{debug, info};

use crate::fold::GroupFold;

/// The result of folding one group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOutcome<K> {
    pub key: K,
    /// Rows delivered to the group, including a failing one.
    pub rows: u64,
    pub result: Result<SqliteValue>,
}

/// An aggregate resolved once for a fixed argument count, ready to fold
/// any number of groups.
#[derive(Clone)]
pub struct Aggregation {
    function: Arc<ErasedAggregateFunction>,
    num_args: usize,
}

impl Aggregation {
    /// Resolve `name` for `num_args` arguments.
    ///
    /// An unknown name or unsupported argument count fails here, before any
    /// row is read, with
    /// [`NoSuchFunction`](greplace_error::ReplaceError::NoSuchFunction).
    pub fn prepare(registry: &FunctionRegistry, name: &str, num_args: usize) -> Result<Self> {
        let function = registry.resolve_aggregate(name, num_args)?;
        debug!(name = function.name(), num_args, "aggregation: prepared");
        Ok(Self { function, num_args })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.function.name()
    }

    #[must_use]
    pub const fn num_args(&self) -> usize {
        self.num_args
    }

    /// Start folding one group.
    #[must_use]
    pub fn begin_group(&self) -> GroupFold {
        GroupFold::begin_group(Arc::clone(&self.function))
    }

    /// Fold every group in `rows`.
    ///
    /// Rows are `(group key, arguments)` pairs. Rows of different groups may
    /// be interleaved; each group's rows are applied in the order they
    /// appear. Outcomes are returned in order of each key's first row.
    ///
    /// A failing group never affects another group. If `cx` is cancelled,
    /// every group not yet finished reports
    /// [`Interrupted`](greplace_error::ReplaceError::Interrupted).
    pub fn run<K, I, A>(&self, cx: &Cx, rows: I) -> Vec<GroupOutcome<K>>
    where
        K: Eq + Hash + Clone,
        I: IntoIterator<Item = (K, A)>,
        A: AsRef<[SqliteValue]>,
    {
        let mut index: HashMap<K, usize> = HashMap::new();
        let mut groups: Vec<(K, GroupFold)> = Vec::new();

        for (key, args) in rows {
            let slot = *index.entry(key.clone()).or_insert_with(|| {
                groups.push((key, self.begin_group()));
                groups.len() - 1
            });
            // The fold records its own failure; it is reported at finish.
            let _ = groups[slot].1.accumulate(cx, args.as_ref());
        }

        let total = groups.len();
        let outcomes: Vec<GroupOutcome<K>> = groups
            .into_iter()
            .map(|(key, mut fold)| {
                if let Err(err) = cx.checkpoint() {
                    fold.abort(err);
                }
                let rows = fold.row_count();
                GroupOutcome {
                    key,
                    rows,
                    result: fold.finish(),
                }
            })
            .collect();

        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        info!(
            function = self.name(),
            groups = total,
            failed,
            "aggregation: run complete"
        );
        outcomes
    }

    /// Fold a single group's rows.
    pub fn run_group<I, A>(&self, cx: &Cx, rows: I) -> Result<SqliteValue>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<[SqliteValue]>,
    {
        let mut fold = self.begin_group();
        for args in rows {
            fold.accumulate(cx, args.as_ref())?;
        }
        cx.checkpoint()?;
        fold.finish()
    }
}

impl std::fmt::Debug for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregation")
            .field("function", &self.function.name())
            .field("num_args", &self.num_args)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use greplace_error::ReplaceError;
    use greplace_ext_replace::ReplaceConfig;

    use super::*;
    use crate::registry_with_config;

    fn prepare(num_args: usize) -> Aggregation {
        let registry = registry_with_config(&ReplaceConfig::default()).unwrap();
        Aggregation::prepare(&registry, "group_replace", num_args).unwrap()
    }

    fn row(values: &[&str]) -> Vec<SqliteValue> {
        values.iter().map(|v| SqliteValue::from(*v)).collect()
    }

    #[test]
    fn test_prepare_rejects_bad_arity() {
        let registry = registry_with_config(&ReplaceConfig::default()).unwrap();
        for n in [0, 1, 2, 6, 7] {
            let err = Aggregation::prepare(&registry, "group_replace", n).unwrap_err();
            assert_eq!(err.kind(), "NoSuchFunction");
        }
        assert!(Aggregation::prepare(&registry, "group_concat", 2).is_err());
    }

    #[test]
    fn test_interleaved_groups_keep_first_seen_order() {
        let agg = prepare(3);
        let rows = vec![
            ("b", row(&["B1 B2", "B1", "x"])),
            ("a", row(&["A", "A", "y"])),
            ("b", row(&["B1 B2", "B2", "z"])),
        ];
        let outcomes = agg.run(&Cx::new(), rows);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].key, "b");
        assert_eq!(outcomes[0].rows, 2);
        assert_eq!(outcomes[0].result, Ok(SqliteValue::from("x z")));
        assert_eq!(outcomes[1].key, "a");
        assert_eq!(outcomes[1].result, Ok(SqliteValue::from("y")));
    }

    #[test]
    fn test_failing_group_is_isolated() {
        let agg = prepare(3);
        let rows = vec![
            (1, row(&["ok", "ok", "fine"])),
            (2, vec![SqliteValue::from("t"), SqliteValue::Integer(5), SqliteValue::from("v")]),
            (2, row(&["t", "t", "v"])),
            (1, row(&["ok", "fine", "great"])),
        ];
        let outcomes = agg.run(&Cx::new(), rows);
        assert_eq!(outcomes[0].result, Ok(SqliteValue::from("great")));
        let err = outcomes[1].result.clone().unwrap_err();
        assert_eq!(err.kind(), "InvalidArgumentType");
        assert_eq!(outcomes[1].rows, 1);
    }

    #[test]
    fn test_cancelled_run_reports_interrupted() {
        let agg = prepare(3);
        let cx = Cx::new();
        cx.cancel();
        let outcomes = agg.run(&cx, vec![("g", row(&["a", "a", "b"]))]);
        assert_eq!(outcomes[0].result, Err(ReplaceError::Interrupted));
    }

    #[test]
    fn test_run_group() {
        let agg = prepare(5);
        let result = agg
            .run_group(
                &Cx::new(),
                [row(&["<<a>> <<b>>", "a", "1", "<<", ">>"]), row(&["", "b", "2", "<<", ">>"])],
            )
            .unwrap();
        assert_eq!(result, SqliteValue::from("1 2"));
    }

    #[test]
    fn test_empty_stream_has_no_groups() {
        let agg = prepare(3);
        let outcomes = agg.run(&Cx::new(), Vec::<(u8, Vec<SqliteValue>)>::new());
        assert!(outcomes.is_empty());
    }

    #[test]
    fn test_debug_and_accessors() {
        let agg = prepare(4);
        assert_eq!(agg.name(), "group_replace");
        assert_eq!(agg.num_args(), 4);
        assert!(format!("{agg:?}").contains("num_args: 4"));
    }
}
