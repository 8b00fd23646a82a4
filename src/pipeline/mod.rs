//! The reactive conversion pipeline: directory load, debounce, rate requests.

pub mod converter;
pub mod debounce;
pub mod directory;
