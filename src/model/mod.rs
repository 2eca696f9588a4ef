//! The value types shared across the builder, planner, executor, and
//! client: [`Term`]/[`Triple`]/[`GraphRef`] (§3), the query DSL (§3), and
//! the upsert/clear request and result types (§3).

pub mod clear;
pub mod dsl;
pub mod term;
pub mod upsert;

pub use clear::{ClearCondition, ClearResult, DryRunResult, ObjectType, TriplePattern};
pub use dsl::{
    AggregateFunction, Aggregation, CursorPage, Filter, FilterOperator, FilterValue, Page,
    QueryDsl, QueryType, Sort, SortDirection, TimeWindow,
};
pub use term::{GraphRef, LiteralValue, ObjectValue, Subject, Term, Triple};
pub use upsert::{MergeStrategy, UpsertKey, UpsertPlan, UpsertRequest, UpsertStatement};
