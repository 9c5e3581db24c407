//! Profile-independent shader vocabulary, as typed data.
//!
//! Authors write calls such as `sample_texture_array(albedo, uv, layer)`; each call becomes an
//! [`Op`] before anything is rendered, so argument counts and resource kinds can be checked
//! while the call is still structured. Operands stay opaque native-dialect [`Expr`] text: this
//! layer does not type-check shader code.

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;

use crate::error::TranslateError;

/// Opaque native-dialect expression text supplied by the shader author.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expr(String);

impl Expr {
    pub fn new(text: impl Into<String>) -> Self {
        Expr(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Component count when the expression is a single `vecN(...)`/`floatN(...)`-style
    /// constructor; `None` when the shape cannot be seen from the text.
    pub fn component_count(&self) -> Option<u8> {
        let text = self.0.trim();
        let open = text.find('(')?;
        let (ctor, rest) = text.split_at(open);
        const PREFIXES: [&str; 8] = ["vec", "ivec", "uvec", "bvec", "float", "int", "uint", "half"];
        let ctor = ctor.trim_end();
        let digit = PREFIXES
            .iter()
            .find_map(|prefix| ctor.strip_prefix(prefix))
            .filter(|suffix| suffix.len() == 1)
            .and_then(|suffix| suffix.parse::<u8>().ok())?;
        if !(2..=4).contains(&digit) || !spans_whole_expression(rest) {
            return None;
        }
        Some(digit)
    }

    /// True for identifiers, member accesses and indexing (`a`, `v.xyz`, `m[1]`), which can be
    /// swizzled or assigned without parentheses.
    pub fn is_simple(&self) -> bool {
        let text = self.0.trim();
        !text.is_empty()
            && text
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'[' | b']'))
    }

    /// The expression, parenthesized unless it is [simple](Self::is_simple).
    pub fn grouped(&self) -> Cow<'_, str> {
        if self.is_simple() {
            Cow::Borrowed(self.0.trim())
        } else {
            Cow::Owned(format!("({})", self.0.trim()))
        }
    }
}

/// True when `text` starts with `(` whose matching `)` is the final character.
fn spans_whole_expression(text: &str) -> bool {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = match depth.checked_sub(1) {
                    Some(d) => d,
                    None => return false,
                };
                if depth == 0 {
                    return i + 1 == text.len();
                }
            }
            _ => {}
        }
    }
    false
}

impl From<&str> for Expr {
    fn from(text: &str) -> Self {
        Expr::new(text)
    }
}

impl From<String> for Expr {
    fn from(text: String) -> Self {
        Expr(text)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dimensionality of a sampled texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Texture2d,
    Texture3d,
    Cube,
    Texture2dArray,
    CubeArray,
    Texture2dMs,
}

impl Dimension {
    pub fn native_sampler(self) -> &'static str {
        match self {
            Dimension::Texture2d => "sampler2D",
            Dimension::Texture3d => "sampler3D",
            Dimension::Cube => "samplerCube",
            Dimension::Texture2dArray => "sampler2DArray",
            Dimension::CubeArray => "samplerCubeArray",
            Dimension::Texture2dMs => "sampler2DMS",
        }
    }

    /// Coordinate components taken by a plain `texture()` lookup, layer included.
    pub fn direct_coordinate_components(self) -> Option<u8> {
        match self {
            Dimension::Texture2d => Some(2),
            Dimension::Texture3d | Dimension::Cube | Dimension::Texture2dArray => Some(3),
            Dimension::CubeArray => Some(4),
            Dimension::Texture2dMs => None,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dimension::Texture2d => "2D",
            Dimension::Texture3d => "3D",
            Dimension::Cube => "cube",
            Dimension::Texture2dArray => "2D-array",
            Dimension::CubeArray => "cube-array",
            Dimension::Texture2dMs => "multisampled 2D",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageAccess {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Rgba8,
}

impl ImageFormat {
    pub fn native(self) -> &'static str {
        match self {
            ImageFormat::Rgba8 => "rgba8",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Texture {
        name: String,
        dimension: Dimension,
        slot: u32,
    },
    Image {
        name: String,
        access: ImageAccess,
        format: ImageFormat,
        slot: u32,
    },
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Declaration::Texture { name, .. } | Declaration::Image { name, .. } => name,
        }
    }

    pub fn vocabulary_name(&self) -> &'static str {
        match self {
            Declaration::Texture { dimension, .. } => match dimension {
                Dimension::Texture2d => "texture_2d",
                Dimension::Texture3d => "texture_3d",
                Dimension::Cube => "texture_cube",
                Dimension::Texture2dArray => "texture_2d_array",
                Dimension::CubeArray => "texture_cube_array",
                Dimension::Texture2dMs => "texture_2dms",
            },
            Declaration::Image { access, .. } => match access {
                ImageAccess::ReadOnly => "texture2d_r",
                ImageAccess::ReadWrite => "texture2d_w",
            },
        }
    }
}

/// Sampling variants. Array variants take the layer separately from the base coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleKind {
    Plain { coord: Expr },
    Level { coord: Expr, lod: Expr },
    Gradient { coord: Expr, ddx: Expr, ddy: Expr },
    Array { coord: Expr, layer: Expr },
    ArrayLevel { coord: Expr, layer: Expr, lod: Expr },
    CubeArray { coord: Expr, layer: Expr },
    CubeArrayLevel { coord: Expr, layer: Expr, lod: Expr },
    Multisample { x: Expr, y: Expr, sample: Expr },
}

impl SampleKind {
    pub fn vocabulary_name(&self) -> &'static str {
        match self {
            SampleKind::Plain { .. } => "sample_texture",
            SampleKind::Level { .. } => "sample_texture_level",
            SampleKind::Gradient { .. } => "sample_texture_grad",
            SampleKind::Array { .. } => "sample_texture_array",
            SampleKind::ArrayLevel { .. } => "sample_texture_array_level",
            SampleKind::CubeArray { .. } => "sample_texture_cube_array",
            SampleKind::CubeArrayLevel { .. } => "sample_texture_cube_array_level",
            SampleKind::Multisample { .. } => "sample_texture_2dms",
        }
    }

    /// Base coordinate, excluding any separately passed layer.
    pub fn coord(&self) -> Option<&Expr> {
        match self {
            SampleKind::Plain { coord }
            | SampleKind::Level { coord, .. }
            | SampleKind::Gradient { coord, .. }
            | SampleKind::Array { coord, .. }
            | SampleKind::ArrayLevel { coord, .. }
            | SampleKind::CubeArray { coord, .. }
            | SampleKind::CubeArrayLevel { coord, .. } => Some(coord),
            SampleKind::Multisample { .. } => None,
        }
    }

    /// Whether this variant can address a texture of `dimension` at all.
    pub fn accepts(&self, dimension: Dimension) -> bool {
        match self {
            SampleKind::Plain { .. } | SampleKind::Level { .. } | SampleKind::Gradient { .. } => {
                dimension != Dimension::Texture2dMs
            }
            SampleKind::Array { .. } | SampleKind::ArrayLevel { .. } => {
                dimension == Dimension::Texture2dArray
            }
            SampleKind::CubeArray { .. } | SampleKind::CubeArrayLevel { .. } => {
                dimension == Dimension::CubeArray
            }
            SampleKind::Multisample { .. } => dimension == Dimension::Texture2dMs,
        }
    }

    /// Components of the base coordinate (layer excluded) for a texture this variant
    /// [accepts](Self::accepts).
    pub fn base_components(&self, dimension: Dimension) -> Option<u8> {
        match self {
            SampleKind::Plain { .. } | SampleKind::Level { .. } | SampleKind::Gradient { .. } => {
                dimension.direct_coordinate_components()
            }
            SampleKind::Array { .. } | SampleKind::ArrayLevel { .. } => Some(2),
            SampleKind::CubeArray { .. } | SampleKind::CubeArrayLevel { .. } => Some(3),
            SampleKind::Multisample { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub texture: String,
    pub kind: SampleKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOp {
    Read { image: String, coord: Expr },
    Write { image: String, value: Expr, coord: Expr },
}

impl ImageOp {
    pub fn image(&self) -> &str {
        match self {
            ImageOp::Read { image, .. } | ImageOp::Write { image, .. } => image,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatrixOp {
    /// Upper-left 3x3 block of a 4x4 matrix.
    To3x3(Expr),
    FromRows3x3([Expr; 3]),
    FromColumns3x3([Expr; 3]),
    /// Assemble an instance matrix from four per-instance vertex attributes.
    UnpackInstance { target: Expr, rows: [Expr; 4] },
    ToDataMatrix(Expr),
    /// `mul(A, B)`: applies `A` to `B`.
    Mul(Expr, Expr),
    /// `mul_tbn(A, B)`: tangent-space product with the operands swapped relative to `mul`.
    MulTbn(Expr, Expr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipOp {
    RemapZClipSpace(Expr),
    /// Maps a `[-1, 1]` depth held in an lvalue to `[0, 1]`, in place.
    RemapDepth(Expr),
    RemapNdcRay(Expr),
    DepthOutput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intrinsic {
    Saturate(Expr),
    Atan2(Expr, Expr),
}

/// Object-like aliases: portable names replaced wherever they appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alias {
    Float4x4,
    Float3x3,
    Float2x2,
    Float4,
    Float3,
    Float2,
    Modf,
    Frac,
    Lerp,
    Ddx,
    Ddy,
    Unroll,
    Loop,
}

impl Alias {
    pub const ALL: [Alias; 13] = [
        Alias::Float4x4,
        Alias::Float3x3,
        Alias::Float2x2,
        Alias::Float4,
        Alias::Float3,
        Alias::Float2,
        Alias::Modf,
        Alias::Frac,
        Alias::Lerp,
        Alias::Ddx,
        Alias::Ddy,
        Alias::Unroll,
        Alias::Loop,
    ];

    pub fn from_identifier(ident: &str) -> Option<Alias> {
        Alias::ALL.into_iter().find(|alias| alias.portable() == ident)
    }

    pub fn portable(self) -> &'static str {
        match self {
            Alias::Float4x4 => "float4x4",
            Alias::Float3x3 => "float3x3",
            Alias::Float2x2 => "float2x2",
            Alias::Float4 => "float4",
            Alias::Float3 => "float3",
            Alias::Float2 => "float2",
            Alias::Modf => "modf",
            Alias::Frac => "frac",
            Alias::Lerp => "lerp",
            Alias::Ddx => "ddx",
            Alias::Ddy => "ddy",
            Alias::Unroll => "_pmfx_unroll",
            Alias::Loop => "_pmfx_loop",
        }
    }

    /// Loop hints have no native counterpart and expand to nothing.
    pub fn native(self) -> &'static str {
        match self {
            Alias::Float4x4 => "mat4",
            Alias::Float3x3 => "mat3",
            Alias::Float2x2 => "mat2",
            Alias::Float4 => "vec4",
            Alias::Float3 => "vec3",
            Alias::Float2 => "vec2",
            Alias::Modf => "mod",
            Alias::Frac => "fract",
            Alias::Lerp => "mix",
            Alias::Ddx => "dFdx",
            Alias::Ddy => "dFdy",
            Alias::Unroll | Alias::Loop => "",
        }
    }
}

/// One vocabulary call or identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Declare(Declaration),
    Sample(Sample),
    Image(ImageOp),
    Matrix(MatrixOp),
    Clip(ClipOp),
    Intrinsic(Intrinsic),
    Alias(Alias),
}

impl Op {
    pub fn vocabulary_name(&self) -> &'static str {
        match self {
            Op::Declare(decl) => decl.vocabulary_name(),
            Op::Sample(sample) => sample.kind.vocabulary_name(),
            Op::Image(ImageOp::Read { .. }) => "read_texture",
            Op::Image(ImageOp::Write { .. }) => "write_texture",
            Op::Matrix(op) => match op {
                MatrixOp::To3x3(_) => "to_3x3",
                MatrixOp::FromRows3x3(_) => "from_rows_3x3",
                MatrixOp::FromColumns3x3(_) => "from_columns_3x3",
                MatrixOp::UnpackInstance { .. } => "unpack_vb_instance_mat",
                MatrixOp::ToDataMatrix(_) => "to_data_matrix",
                MatrixOp::Mul(..) => "mul",
                MatrixOp::MulTbn(..) => "mul_tbn",
            },
            Op::Clip(op) => match op {
                ClipOp::RemapZClipSpace(_) => "remap_z_clip_space",
                ClipOp::RemapDepth(_) => "remap_depth",
                ClipOp::RemapNdcRay(_) => "remap_ndc_ray",
                ClipOp::DepthOutput => "depth_ps_output",
            },
            Op::Intrinsic(Intrinsic::Saturate(_)) => "saturate",
            Op::Intrinsic(Intrinsic::Atan2(..)) => "atan2",
            Op::Alias(alias) => alias.portable(),
        }
    }
}

/// Vocabulary that stands alone as an identifier (no argument list).
pub fn object_like(ident: &str) -> Option<Op> {
    if ident == "depth_ps_output" {
        return Some(Op::Clip(ClipOp::DepthOutput));
    }
    Alias::from_identifier(ident).map(Op::Alias)
}

const FUNCTION_LIKE: &[(&str, usize)] = &[
    ("texture_2d", 2),
    ("texture_3d", 2),
    ("texture_cube", 2),
    ("texture_2d_array", 2),
    ("texture_cube_array", 2),
    ("texture_2dms", 4),
    ("texture2d_r", 2),
    ("texture2d_w", 2),
    ("read_texture", 2),
    ("write_texture", 3),
    ("sample_texture", 2),
    ("sample_texture_level", 3),
    ("sample_texture_grad", 4),
    ("sample_texture_array", 3),
    ("sample_texture_array_level", 4),
    ("sample_texture_cube_array", 3),
    ("sample_texture_cube_array_level", 4),
    ("sample_texture_2dms", 4),
    ("to_3x3", 1),
    ("from_columns_3x3", 3),
    ("from_rows_3x3", 3),
    ("unpack_vb_instance_mat", 5),
    ("to_data_matrix", 1),
    ("mul", 2),
    ("mul_tbn", 2),
    ("remap_z_clip_space", 1),
    ("remap_depth", 1),
    ("remap_ndc_ray", 1),
    ("saturate", 1),
    ("atan2", 2),
];

/// Static name and argument count of a function-like vocabulary entry.
pub fn function_like(ident: &str) -> Option<(&'static str, usize)> {
    FUNCTION_LIKE
        .iter()
        .copied()
        .find(|(name, _)| *name == ident)
}

/// Build the typed operation for a function-like vocabulary call.
///
/// Returns `Ok(None)` when `name` is not function-like vocabulary.
pub fn parse_call(name: &str, args: Vec<Expr>) -> Result<Option<Op>, TranslateError> {
    let Some((operation, expected)) = function_like(name) else {
        return Ok(None);
    };
    if args.len() != expected {
        return Err(TranslateError::Arity {
            operation,
            expected,
            found: args.len(),
        });
    }
    let mut args = args.into_iter();
    let mut next = || args.next().unwrap_or_else(|| Expr::new(""));

    let texture = |operation, dimension, name: Expr, slot: Expr| -> Result<Op, TranslateError> {
        Ok(Op::Declare(Declaration::Texture {
            name: identifier(name),
            dimension,
            slot: parse_slot(operation, &slot)?,
        }))
    };
    let image = |operation, access, name: Expr, slot: Expr| -> Result<Op, TranslateError> {
        Ok(Op::Declare(Declaration::Image {
            name: identifier(name),
            access,
            format: ImageFormat::Rgba8,
            slot: parse_slot(operation, &slot)?,
        }))
    };
    let sample = |texture: Expr, kind| {
        Op::Sample(Sample {
            texture: identifier(texture),
            kind,
        })
    };

    let op = match operation {
        "texture_2d" => texture(operation, Dimension::Texture2d, next(), next())?,
        "texture_3d" => texture(operation, Dimension::Texture3d, next(), next())?,
        "texture_cube" => texture(operation, Dimension::Cube, next(), next())?,
        "texture_2d_array" => texture(operation, Dimension::Texture2dArray, next(), next())?,
        "texture_cube_array" => texture(operation, Dimension::CubeArray, next(), next())?,
        "texture_2dms" => {
            // Sample type and count only matter to dialects with typed multisample objects.
            let _sample_type = next();
            let _samples = next();
            texture(operation, Dimension::Texture2dMs, next(), next())?
        }
        "texture2d_r" => image(operation, ImageAccess::ReadOnly, next(), next())?,
        "texture2d_w" => image(operation, ImageAccess::ReadWrite, next(), next())?,
        "read_texture" => Op::Image(ImageOp::Read {
            image: identifier(next()),
            coord: next(),
        }),
        "write_texture" => Op::Image(ImageOp::Write {
            image: identifier(next()),
            value: next(),
            coord: next(),
        }),
        "sample_texture" => sample(next(), SampleKind::Plain { coord: next() }),
        "sample_texture_level" => sample(
            next(),
            SampleKind::Level {
                coord: next(),
                lod: next(),
            },
        ),
        "sample_texture_grad" => sample(
            next(),
            SampleKind::Gradient {
                coord: next(),
                ddx: next(),
                ddy: next(),
            },
        ),
        "sample_texture_array" => sample(
            next(),
            SampleKind::Array {
                coord: next(),
                layer: next(),
            },
        ),
        "sample_texture_array_level" => sample(
            next(),
            SampleKind::ArrayLevel {
                coord: next(),
                layer: next(),
                lod: next(),
            },
        ),
        "sample_texture_cube_array" => sample(
            next(),
            SampleKind::CubeArray {
                coord: next(),
                layer: next(),
            },
        ),
        "sample_texture_cube_array_level" => sample(
            next(),
            SampleKind::CubeArrayLevel {
                coord: next(),
                layer: next(),
                lod: next(),
            },
        ),
        "sample_texture_2dms" => sample(
            next(),
            SampleKind::Multisample {
                x: next(),
                y: next(),
                sample: next(),
            },
        ),
        "to_3x3" => Op::Matrix(MatrixOp::To3x3(next())),
        "from_columns_3x3" => Op::Matrix(MatrixOp::FromColumns3x3([next(), next(), next()])),
        "from_rows_3x3" => Op::Matrix(MatrixOp::FromRows3x3([next(), next(), next()])),
        "unpack_vb_instance_mat" => Op::Matrix(MatrixOp::UnpackInstance {
            target: next(),
            rows: [next(), next(), next(), next()],
        }),
        "to_data_matrix" => Op::Matrix(MatrixOp::ToDataMatrix(next())),
        "mul" => Op::Matrix(MatrixOp::Mul(next(), next())),
        "mul_tbn" => Op::Matrix(MatrixOp::MulTbn(next(), next())),
        "remap_z_clip_space" => Op::Clip(ClipOp::RemapZClipSpace(next())),
        "remap_depth" => Op::Clip(ClipOp::RemapDepth(next())),
        "remap_ndc_ray" => Op::Clip(ClipOp::RemapNdcRay(next())),
        "saturate" => Op::Intrinsic(Intrinsic::Saturate(next())),
        "atan2" => Op::Intrinsic(Intrinsic::Atan2(next(), next())),
        _ => return Ok(None),
    };
    Ok(Some(op))
}

fn identifier(expr: Expr) -> String {
    expr.as_str().trim().to_owned()
}

fn parse_slot(operation: &'static str, slot: &Expr) -> Result<u32, TranslateError> {
    let text = slot.as_str().trim();
    let digits = text.strip_suffix(['u', 'U']).unwrap_or(text);
    digits.parse::<u32>().map_err(|_| TranslateError::InvalidSlot {
        operation,
        text: text.to_owned(),
    })
}
