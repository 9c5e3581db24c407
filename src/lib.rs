//! Shader portability layer.
//!
//! Re-exports [`shadeport_glsl`], which holds the vocabulary, the target profiles and the
//! expansion pass. The `shadeport` binary lives in `crates/shadeport-cli`.

pub use shadeport_glsl::*;
