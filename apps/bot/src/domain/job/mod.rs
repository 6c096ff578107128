// Search job domain module
// Contains the search aggregate and the service vocabulary of the consulate site

#![allow(clippy::module_inception)]

pub mod job;
pub mod value_objects;

pub use job::{SearchJob, MAX_JOBS_PER_USER};
pub use value_objects::{ChildCount, FormKind, JobStatus, ServiceOption, ServiceType};
