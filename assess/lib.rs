#![deny(dead_code)]
#![deny(unused_imports)]

pub mod guidelines;

pub use guidelines::{Assessment, RiskLevel, assess};
