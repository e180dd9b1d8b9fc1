pub mod backup;
pub mod core;
pub mod exams;
pub mod grade_ranges;
pub mod pricing;
pub mod revisions;
