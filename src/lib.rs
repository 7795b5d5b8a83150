#[macro_use]
extern crate tracing;

pub mod gesture;
pub mod input;
pub mod replay;
pub mod utils;
