#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod align;
pub mod categorical;
pub mod driver;
pub mod features;
pub mod pipeline;
pub mod record;
pub mod schema;

#[path = "../model/lib.rs"]
pub mod model;

// Post-verdict clinical banding
#[path = "../assess/lib.rs"]
pub mod assess;
