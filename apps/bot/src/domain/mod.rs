// Domain layer module exports
// Domain is independent of infrastructure concerns

pub mod dates;
pub mod job;
pub mod repositories;
pub mod submission;
