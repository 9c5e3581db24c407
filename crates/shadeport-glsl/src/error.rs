use thiserror::Error;

use crate::config::ProfileClass;
use crate::profile::TargetProfile;
use crate::vocab::Dimension;

/// Contradictory or incomplete profile switches.
///
/// These are raised while resolving a [`crate::ProfileConfig`], before any vocabulary is
/// translated. The one exception is [`ConfigError::ImageBindingWithoutOffset`]: storage images
/// always carry an explicit binding, so a missing `TEXTURE_OFFSET` only becomes fatal once the
/// source actually declares one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("explicit binding points were requested, but the {class} profile class cannot express them")]
    ExplicitBindingUnsupported { class: ProfileClass },
    #[error("explicit binding points are enabled but TEXTURE_OFFSET is not defined")]
    MissingTextureOffset,
    #[error("`{operation}` needs TEXTURE_OFFSET for its binding index, but none is configured")]
    ImageBindingWithoutOffset { operation: &'static str },
}

/// A vocabulary call that cannot be translated for the active profile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("`{operation}` requires {capability}, which the {profile} profile does not support")]
    Capability {
        operation: &'static str,
        capability: &'static str,
        profile: TargetProfile,
    },
    #[error("`{operation}` expects {expected} arguments but was given {found}")]
    Arity {
        operation: &'static str,
        expected: usize,
        found: usize,
    },
    #[error(
        "`{operation}` on `{texture}` expects a {expected}-component coordinate but was given {found} components"
    )]
    CoordinateArity {
        operation: &'static str,
        texture: String,
        expected: u8,
        found: u8,
    },
    #[error("`{operation}` cannot be used with `{texture}`, which is declared as a {declared} texture")]
    DimensionMismatch {
        operation: &'static str,
        texture: String,
        declared: Dimension,
    },
    #[error("`{operation}` cannot be used with `{name}`, which is not declared as a storage image")]
    NotAnImage { operation: &'static str, name: String },
    #[error("`{operation}` cannot sample `{name}`, which is declared as a storage image")]
    NotATexture { operation: &'static str, name: String },
    #[error("`{operation}` slot `{text}` is not a non-negative integer literal")]
    InvalidSlot { operation: &'static str, text: String },
    #[error("binding index for slot {slot} overflows when TEXTURE_OFFSET {offset} is added")]
    BindingOverflow { slot: u32, offset: u32 },
    #[error("resource `{name}` is declared more than once")]
    DuplicateDeclaration { name: String },
    #[error("`remap_depth` is applied to `{target}` more than once on the same code path")]
    DepthRemappedTwice { target: String },
}

/// Failure while expanding a whole shader source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    #[error("line {line} ({profile} profile): {source}")]
    Translate {
        line: usize,
        profile: TargetProfile,
        #[source]
        source: TranslateError,
    },
    #[error("line {line}: unterminated argument list for `{operation}`")]
    UnterminatedCall { line: usize, operation: String },
    #[error("line {line}: unterminated block comment")]
    UnterminatedComment { line: usize },
}

impl ExpandError {
    /// 1-based source line the error was raised on.
    pub fn line(&self) -> usize {
        match self {
            ExpandError::Translate { line, .. }
            | ExpandError::UnterminatedCall { line, .. }
            | ExpandError::UnterminatedComment { line } => *line,
        }
    }
}
