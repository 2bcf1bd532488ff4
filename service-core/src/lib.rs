//! service-core: shared configuration and observability plumbing.
pub mod config;
pub mod observability;
