//! Diffs the inferred schema against the live table.
//!
//! Inferred-only columns are added in column order. Shared columns are
//! compared by kind, never by type spelling, so `int(11)` and `INT` agree.
//! Live-only columns are never touched and nothing is ever dropped. Whether a
//! differing shared column is changed depends on the [`ModifyPolicy`];
//! primary key columns keep their type either way.

use log::warn;

use crate::{
    config::ModifyPolicy,
    infer::InferredSchema,
    introspect::LiveSchema,
    kind::Kind,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChange {
    pub name: String,
    pub kind: Kind,
}

impl ColumnChange {
    pub fn native_type(&self) -> &'static str {
        self.kind.native()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The inferred kind ranks below the live one; the live column already
    /// holds every inferred value.
    Narrowing,
    /// The live type is outside the `INT`/`DOUBLE`/`TEXT` lattice.
    UnrecognizedLiveType,
    PrimaryKey,
}

impl SkipReason {
    pub fn describe(self) -> &'static str {
        match self {
            SkipReason::Narrowing => "narrower than the live type",
            SkipReason::UnrecognizedLiveType => "live type is not INT, DOUBLE or TEXT",
            SkipReason::PrimaryKey => "column is part of the primary key",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedChange {
    pub name: String,
    pub live_type: String,
    pub inferred: Kind,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub add: Vec<ColumnChange>,
    pub modify: Vec<ColumnChange>,
    pub skipped: Vec<SkippedChange>,
}

impl ReconciliationPlan {
    /// True when no DDL is needed.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.modify.is_empty()
    }
}

pub fn reconcile(
    inferred: &InferredSchema,
    live: &LiveSchema,
    policy: ModifyPolicy,
) -> ReconciliationPlan {
    let mut plan = ReconciliationPlan::default();
    for column in &inferred.columns {
        let Some(existing) = live.find(&column.name) else {
            plan.add.push(ColumnChange {
                name: column.name.clone(),
                kind: column.kind,
            });
            continue;
        };

        let live_kind = existing.kind();
        if live_kind == Some(column.kind) {
            continue;
        }
        let skip = match (policy, live_kind) {
            _ if existing.primary_key => Some(SkipReason::PrimaryKey),
            (ModifyPolicy::MatchInferred, _) => None,
            (ModifyPolicy::WidenOnly, Some(live_kind)) if column.kind > live_kind => None,
            (ModifyPolicy::WidenOnly, Some(_)) => Some(SkipReason::Narrowing),
            (ModifyPolicy::WidenOnly, None) => Some(SkipReason::UnrecognizedLiveType),
        };
        match skip {
            None => plan.modify.push(ColumnChange {
                // Keep the live spelling so the statement targets the existing column.
                name: existing.name.clone(),
                kind: column.kind,
            }),
            Some(reason) => {
                warn!(
                    "Leaving column '{}' as {} (inferred {}): {}",
                    existing.name,
                    existing.native_type,
                    column.kind.native(),
                    reason.describe()
                );
                plan.skipped.push(SkippedChange {
                    name: existing.name.clone(),
                    live_type: existing.native_type.clone(),
                    inferred: column.kind,
                    reason,
                });
            }
        }
    }
    plan
}

/// Kind each inferred column ends up with in the table once `plan` is
/// applied, in inferred column order. `None` means the live type is outside
/// the lattice and values are bound unchanged.
pub fn resolve_column_kinds(
    inferred: &InferredSchema,
    live: &LiveSchema,
    plan: &ReconciliationPlan,
) -> Vec<Option<Kind>> {
    inferred
        .columns
        .iter()
        .map(|column| {
            let changed = plan
                .add
                .iter()
                .chain(&plan.modify)
                .any(|change| change.name.eq_ignore_ascii_case(&column.name));
            if changed {
                Some(column.kind)
            } else {
                live.find(&column.name)
                    .map_or(Some(column.kind), |existing| existing.kind())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{infer::InferredColumn, introspect::LiveColumn};

    fn inferred(columns: &[(&str, Kind)]) -> InferredSchema {
        InferredSchema {
            columns: columns
                .iter()
                .map(|(name, kind)| InferredColumn {
                    name: name.to_string(),
                    kind: *kind,
                })
                .collect(),
        }
    }

    fn live(columns: &[(&str, &str)]) -> LiveSchema {
        LiveSchema::existing(
            columns
                .iter()
                .map(|(name, native_type)| LiveColumn::new(*name, *native_type))
                .collect(),
        )
    }

    fn names(changes: &[ColumnChange]) -> Vec<&str> {
        changes.iter().map(|change| change.name.as_str()).collect()
    }

    #[test]
    fn absent_table_adds_everything_in_order() {
        let plan = reconcile(
            &inferred(&[("b", Kind::Text), ("a", Kind::Integer)]),
            &LiveSchema::absent(),
            ModifyPolicy::WidenOnly,
        );
        assert_eq!(names(&plan.add), vec!["b", "a"]);
        assert!(plan.modify.is_empty());
    }

    #[test]
    fn equivalent_spellings_are_not_modified() {
        let plan = reconcile(
            &inferred(&[("a", Kind::Integer), ("b", Kind::Float), ("c", Kind::Text)]),
            &live(&[("id", "int(11)"), ("a", "int(11)"), ("B", "double"), ("c", "varchar(255)")]),
            ModifyPolicy::WidenOnly,
        );
        assert!(plan.is_empty(), "{plan:?}");
        assert!(plan.skipped.is_empty());
    }

    #[test]
    fn widening_is_proposed_under_both_policies() {
        for policy in [ModifyPolicy::WidenOnly, ModifyPolicy::MatchInferred] {
            let plan = reconcile(
                &inferred(&[("a", Kind::Float), ("b", Kind::Text)]),
                &live(&[("a", "INT"), ("b", "DOUBLE")]),
                policy,
            );
            assert_eq!(
                plan.modify,
                vec![
                    ColumnChange { name: "a".into(), kind: Kind::Float },
                    ColumnChange { name: "b".into(), kind: Kind::Text },
                ]
            );
        }
    }

    #[test]
    fn widen_only_skips_narrowing() {
        let plan = reconcile(
            &inferred(&[("x", Kind::Integer)]),
            &live(&[("x", "TEXT")]),
            ModifyPolicy::WidenOnly,
        );
        assert!(plan.is_empty());
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].reason, SkipReason::Narrowing);
    }

    #[test]
    fn match_inferred_proposes_narrowing() {
        let plan = reconcile(
            &inferred(&[("x", Kind::Integer)]),
            &live(&[("x", "TEXT")]),
            ModifyPolicy::MatchInferred,
        );
        assert_eq!(
            plan.modify,
            vec![ColumnChange { name: "x".into(), kind: Kind::Integer }]
        );
    }

    #[test]
    fn unrecognized_live_types_depend_on_policy() {
        let schema = inferred(&[("created", Kind::Text)]);
        let table = live(&[("created", "DATETIME")]);
        let plan = reconcile(&schema, &table, ModifyPolicy::WidenOnly);
        assert!(plan.is_empty());
        assert_eq!(plan.skipped[0].reason, SkipReason::UnrecognizedLiveType);
        assert_eq!(resolve_column_kinds(&schema, &table, &plan), vec![None]);

        let plan = reconcile(&schema, &table, ModifyPolicy::MatchInferred);
        assert_eq!(names(&plan.modify), vec!["created"]);
        assert_eq!(resolve_column_kinds(&schema, &table, &plan), vec![Some(Kind::Text)]);
    }

    #[test]
    fn primary_key_columns_keep_their_type() {
        let table = LiveSchema::existing(vec![
            LiveColumn::new("id", "INTEGER").primary_key(),
            LiveColumn::new("a", "INT"),
        ]);
        for policy in [ModifyPolicy::WidenOnly, ModifyPolicy::MatchInferred] {
            let plan = reconcile(
                &inferred(&[("id", Kind::Text), ("a", Kind::Float)]),
                &table,
                policy,
            );
            assert_eq!(names(&plan.modify), vec!["a"]);
            assert_eq!(plan.skipped.len(), 1);
            assert_eq!(plan.skipped[0].reason, SkipReason::PrimaryKey);
        }
    }

    #[test]
    fn legacy_columns_are_left_alone() {
        let plan = reconcile(
            &inferred(&[("new", Kind::Integer)]),
            &live(&[("id", "INTEGER"), ("legacy", "BLOB")]),
            ModifyPolicy::MatchInferred,
        );
        assert_eq!(names(&plan.add), vec!["new"]);
        assert!(plan.modify.is_empty());
        assert!(plan.skipped.is_empty());
    }

    #[test]
    fn resolved_kinds_follow_the_live_table_when_unchanged() {
        let schema = inferred(&[("a", Kind::Integer), ("b", Kind::Integer), ("c", Kind::Float)]);
        let table = live(&[("a", "TEXT"), ("b", "INT")]);
        let plan = reconcile(&schema, &table, ModifyPolicy::WidenOnly);
        assert_eq!(
            resolve_column_kinds(&schema, &table, &plan),
            vec![Some(Kind::Text), Some(Kind::Integer), Some(Kind::Float)]
        );
    }
}
