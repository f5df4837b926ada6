//! Shared setup for the end-to-end tests in `tests/e2e`: a deployed router
//! with its modules next to reference exchanges on an in-memory chain.

pub mod setup;
