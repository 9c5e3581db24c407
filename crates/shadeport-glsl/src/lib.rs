//! Portable shader vocabulary lowered to profile-specific GLSL.
//!
//! One shader source is written against a closed vocabulary (`texture_2d`, `sample_texture_array`,
//! `from_rows_3x3`, `remap_depth`, `float4`, ...) and expanded for one of three targets:
//!
//! - [`TargetProfile::MobileConstrained`]: precision qualifiers, no multisample reads, no cube
//!   arrays, no storage images, no explicit bindings
//! - [`TargetProfile::DesktopExplicitBinding`]: every declaration carries `slot + TEXTURE_OFFSET`
//! - [`TargetProfile::DesktopImplicitBinding`]: desktop features, bindings assigned at link time
//!
//! The pipeline is: [`ProfileConfig::resolve`] picks the profile once, [`vocab`] parses each call
//! into a typed [`Op`], [`lower`] maps it through the (operation, capability) table to a
//! [`Native`] form, and [`ShaderUnit`] adds the checks that span several calls. [`expand_source`]
//! drives all of this over a whole source file; [`ExpansionCache`] memoizes it.

pub mod binding_model;
mod cache;
mod config;
mod error;
mod expand;
pub mod lower;
pub mod native;
mod profile;
mod unit;
pub mod vocab;

pub use cache::{CacheStats, ExpansionCache};
pub use config::{ProfileClass, ProfileConfig, TranslationConfig};
pub use error::{ConfigError, ExpandError, TranslateError};
pub use expand::{expand_source, insert_prelude, ExpandOptions, ExpandedShader};
pub use lower::lower;
pub use native::Native;
pub use profile::{Capabilities, ClipSpaceConvention, DepthRange, TargetProfile};
pub use unit::{Approximation, DeclaredResource, ResourceKind, ShaderUnit};
pub use vocab::{Alias, Dimension, Expr, ImageAccess, ImageFormat, Op};
