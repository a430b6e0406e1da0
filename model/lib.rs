#![deny(dead_code)]
#![deny(unused_imports)]

pub mod artifact;
pub mod capability;
pub mod locate;
