use super::actor::CollectionHandle;
use super::collection::{Collection, ColumnName};
use crate::error::OrbitError;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl Op {
    fn as_sql(self) -> &'static str {
        match self {
            Op::Lt => " < ",
            Op::Le => " <= ",
            Op::Eq => " = ",
            Op::Ge => " >= ",
            Op::Gt => " > ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Real(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

/// The plain-data part of a query, shipped to the collection actor.
pub struct QuerySpec<C: Collection> {
    pub(crate) filters: Vec<(C::Field, Op, FieldValue)>,
    pub(crate) order: Option<(C::Field, Direction)>,
    pub(crate) limit: Option<u32>,
}

impl<C: Collection> Default for QuerySpec<C> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }
}

impl<C: Collection> fmt::Debug for QuerySpec<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySpec")
            .field("collection", &C::NAME)
            .field("filters", &self.filters)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .finish()
    }
}

impl<C: Collection> QuerySpec<C> {
    /// Render as `SELECT ... WHERE ... ORDER BY ... LIMIT ?`.
    ///
    /// Without an explicit order the collection's order key ascends. Ties
    /// break on `id` in the same direction so paging is stable.
    pub(crate) fn to_sql(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM {}", C::COLUMNS, C::TABLE));

        for (i, (field, op, value)) in self.filters.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            qb.push(field.column());
            qb.push(op.as_sql());
            match value.clone() {
                FieldValue::Int(v) => qb.push_bind(v),
                FieldValue::Real(v) => qb.push_bind(v),
                FieldValue::Text(v) => qb.push_bind(v),
            };
        }

        let (column, direction) = match self.order {
            Some((field, direction)) => (field.column(), direction),
            None => (C::ORDER_KEY, Direction::Asc),
        };
        qb.push(" ORDER BY ")
            .push(column)
            .push(direction.as_sql())
            .push(", id")
            .push(direction.as_sql());

        if let Some(limit) = self.limit {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }
        qb
    }
}

/// Fluent query over one collection. Nothing runs until [`execute`](Self::execute).
pub struct CollectionQuery<C: Collection> {
    handle: CollectionHandle<C>,
    spec: QuerySpec<C>,
}

impl<C: Collection> CollectionQuery<C> {
    pub(crate) fn new(handle: CollectionHandle<C>) -> Self {
        Self {
            handle,
            spec: QuerySpec::default(),
        }
    }

    pub fn filter(mut self, field: C::Field, op: Op, value: impl Into<FieldValue>) -> Self {
        self.spec.filters.push((field, op, value.into()));
        self
    }

    /// Inclusive on both ends.
    pub fn between(
        self,
        field: C::Field,
        from: impl Into<FieldValue>,
        to: impl Into<FieldValue>,
    ) -> Self {
        self.filter(field, Op::Ge, from).filter(field, Op::Le, to)
    }

    pub fn order_by(mut self, field: C::Field, direction: Direction) -> Self {
        self.spec.order = Some((field, direction));
        self
    }

    pub fn limit(mut self, n: u32) -> Self {
        self.spec.limit = Some(n);
        self
    }

    /// Never fails for "no rows"; an empty match is `Ok(vec![])`.
    pub async fn execute(self) -> Result<Vec<C::Record>, OrbitError> {
        self.handle.run_query(self.spec).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::collection::{PositionField, Positions};

    #[test]
    fn default_order_is_ascending_by_order_key() {
        let spec = QuerySpec::<Positions>::default();
        assert_eq!(
            spec.to_sql().sql(),
            "SELECT id, timestamp_seconds, latitude, longitude, altitude_km, velocity_kmh, visibility, origin FROM positions ORDER BY timestamp_seconds ASC, id ASC"
        );
    }

    #[test]
    fn filters_are_bound_and_joined() {
        let spec = QuerySpec::<Positions> {
            filters: vec![
                (PositionField::Timestamp, Op::Ge, FieldValue::Int(10)),
                (PositionField::Timestamp, Op::Le, FieldValue::Int(20)),
            ],
            order: Some((PositionField::Timestamp, Direction::Desc)),
            limit: Some(5),
        };
        let qb = spec.to_sql();
        assert!(qb.sql().ends_with(
            "FROM positions WHERE timestamp_seconds >= ? AND timestamp_seconds <= ? ORDER BY timestamp_seconds DESC, id DESC LIMIT ?"
        ));
    }
}
