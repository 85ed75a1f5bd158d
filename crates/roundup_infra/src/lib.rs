#![forbid(unsafe_code)]

pub mod config;
pub mod payload;

pub fn infra_bootstrapped() -> bool {
    roundup_core::crate_bootstrapped()
}
