#![forbid(unsafe_code)]

pub mod fingerprint;
pub mod reconcile;
pub mod steps;

pub fn crate_bootstrapped() -> bool {
    true
}
