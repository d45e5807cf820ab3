//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod bulk_job_repo;
pub mod metric_row_repo;
pub mod rule_set_repo;

pub use bulk_job_repo::BulkJobRepo;
pub use metric_row_repo::MetricRowRepo;
pub use rule_set_repo::RuleSetRepo;
