//! Request identity: stable fingerprints for reconciliation runs.

pub mod hash;

pub use hash::{RunFingerprintInput, compute_run_fingerprint, format_run_fingerprint};
