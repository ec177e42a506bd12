//! Column type inference.
//!
//! A column's type is the single kind shared by all of its non-null values.
//! All-null columns and columns mixing kinds fall back to `TEXT`; the engine
//! widens on ambiguity and never guesses, so `5` together with `5.5` yields
//! `TEXT` rather than `DOUBLE`.

use crate::{
    condense::CondensedColumns,
    kind::{Kind, Scalar},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredColumn {
    pub name: String,
    pub kind: Kind,
}

impl InferredColumn {
    pub fn native_type(&self) -> &'static str {
        self.kind.native()
    }
}

/// Desired column types in column name universe order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferredSchema {
    pub columns: Vec<InferredColumn>,
}

impl InferredSchema {
    pub fn get(&self, name: &str) -> Option<&InferredColumn> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

pub fn infer_column_kind<'a, I>(values: I) -> Kind
where
    I: IntoIterator<Item = &'a Option<Scalar>>,
{
    let mut observed: Option<Kind> = None;
    for value in values.into_iter().flatten() {
        let kind = value.kind();
        match observed {
            None => observed = Some(kind),
            Some(seen) if seen != kind => return Kind::Text,
            Some(_) => {}
        }
    }
    observed.unwrap_or(Kind::Text)
}

/// Native type for a single condensed column.
pub fn infer_column_type(values: &[Option<Scalar>]) -> &'static str {
    infer_column_kind(values).native()
}

pub fn infer_schema(condensed: &CondensedColumns) -> InferredSchema {
    let columns = condensed
        .iter()
        .map(|(name, values)| InferredColumn {
            name: name.to_string(),
            kind: infer_column_kind(values),
        })
        .collect();
    InferredSchema { columns }
}
