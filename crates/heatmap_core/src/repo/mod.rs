//! Data access ports and implementations.
//!
//! # Responsibility
//! - Define lookup/persistence contracts consumed by services.
//! - Isolate SQLite details from heatmap orchestration.
//!
//! # Invariants
//! - Repository reads never mutate; writes report semantic errors in
//!   addition to transport errors.

pub mod activity_repo;
pub mod progress_repo;
pub mod storage_repo;
