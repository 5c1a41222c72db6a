//! Output generation

mod caddyfile;

pub use caddyfile::{matcher_name, CaddyfileEmitter, EmitterOptions, PathMatcher};
