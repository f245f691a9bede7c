pub mod error;
pub mod midi;
pub mod mixer;
pub mod note;
pub mod processor;
pub mod render;
pub mod session;
pub mod synth;
pub mod track;
mod util;
