//! Reference analysis passes over the canonical AST.
//!
//! Two read-only collectors ship as both functionality and the canonical
//! examples of writing a pass against the visitor engine:
//!
//! - [`collect_tables`] — every distinct base table referenced anywhere in a
//!   statement, in first-occurrence order.
//! - [`collect_columns`] — every column reference, tagged with the syntactic
//!   position it appears in.
//!
//! Both passes are deterministic: the same input yields the same ordered
//! sequence, because traversal follows declared child-slot order.

mod columns;
mod tables;

pub use columns::{collect_columns, ColumnSite, ColumnUse};
pub use tables::collect_tables;

use std::sync::atomic::{AtomicU64, Ordering};

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Monotonic counter of table references collected.
static SQLTREE_TABLE_REFS_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Monotonic counter of column references collected.
static SQLTREE_COLUMN_REFS_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Point-in-time snapshot of analysis metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnalyzeMetricsSnapshot {
    pub sqltree_table_refs_total: u64,
    pub sqltree_column_refs_total: u64,
}

/// Take a point-in-time snapshot of analysis metrics.
#[must_use]
pub fn analyze_metrics_snapshot() -> AnalyzeMetricsSnapshot {
    AnalyzeMetricsSnapshot {
        sqltree_table_refs_total: SQLTREE_TABLE_REFS_TOTAL.load(Ordering::Relaxed),
        sqltree_column_refs_total: SQLTREE_COLUMN_REFS_TOTAL.load(Ordering::Relaxed),
    }
}

/// Reset analysis metrics.
pub fn reset_analyze_metrics() {
    SQLTREE_TABLE_REFS_TOTAL.store(0, Ordering::Relaxed);
    SQLTREE_COLUMN_REFS_TOTAL.store(0, Ordering::Relaxed);
}

pub(crate) fn record_table_refs(count: u64) {
    if count > 0 {
        SQLTREE_TABLE_REFS_TOTAL.fetch_add(count, Ordering::Relaxed);
    }
}

pub(crate) fn record_column_refs(count: u64) {
    if count > 0 {
        SQLTREE_COLUMN_REFS_TOTAL.fetch_add(count, Ordering::Relaxed);
    }
}
