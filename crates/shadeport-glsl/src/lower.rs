//! Dispatch from vocabulary operations to native forms.
//!
//! Each category has one lowering function that matches on the operation and consults the
//! profile's capability set, so every (operation, profile) cell is a pure function and the match
//! stays exhaustive. Unsupported cells fail with [`TranslateError::Capability`]; the only cell
//! that degrades instead of failing is multisample fetch without multisample support.

use tracing::trace;

use crate::binding_model;
use crate::config::TranslationConfig;
use crate::error::TranslateError;
use crate::native::{
    Native, NativeCall, NativeClip, NativeCoord, NativeDeclaration, NativeMatrix, NativeSample,
    SampleFunction,
};
use crate::profile::{Capabilities, DepthRange};
use crate::vocab::{
    ClipOp, Declaration, Dimension, Expr, ImageAccess, ImageOp, Intrinsic, MatrixOp, Op, Sample,
    SampleKind,
};

/// Lower one operation for the configured profile.
pub fn lower(op: &Op, config: &TranslationConfig) -> Result<Native, TranslateError> {
    let native = match op {
        Op::Declare(decl) => Native::Declaration(lower_declaration(decl, config)?),
        Op::Sample(sample) => Native::Sample(lower_sample(sample, config)?),
        Op::Image(image) => Native::Call(lower_image(image, config)?),
        Op::Matrix(matrix) => Native::Matrix(lower_matrix(matrix)),
        Op::Clip(clip) => Native::Clip(lower_clip(clip, config)),
        Op::Intrinsic(intrinsic) => Native::Call(lower_intrinsic(intrinsic)),
        Op::Alias(alias) => Native::Token(alias.native()),
    };
    trace!(
        operation = op.vocabulary_name(),
        profile = %config.profile(),
        native = %native,
        "lowered vocabulary call"
    );
    Ok(native)
}

fn require(
    config: &TranslationConfig,
    capability: Capabilities,
    operation: &'static str,
) -> Result<(), TranslateError> {
    if config.supports(capability) {
        Ok(())
    } else {
        Err(TranslateError::Capability {
            operation,
            capability: capability.describe(),
            profile: config.profile(),
        })
    }
}

pub fn lower_declaration(
    decl: &Declaration,
    config: &TranslationConfig,
) -> Result<NativeDeclaration, TranslateError> {
    let operation = decl.vocabulary_name();
    match decl {
        Declaration::Texture {
            name,
            dimension,
            slot,
        } => {
            let type_name = match dimension {
                Dimension::CubeArray => {
                    require(config, Capabilities::CUBE_ARRAY_TEXTURES, operation)?;
                    dimension.native_sampler()
                }
                // Without multisample support the texture is bound as an ordinary 2D sampler and
                // read through the single-sample approximation in `lower_sample`.
                Dimension::Texture2dMs if !config.supports(Capabilities::MULTISAMPLE_TEXTURES) => {
                    Dimension::Texture2d.native_sampler()
                }
                _ => dimension.native_sampler(),
            };
            Ok(NativeDeclaration {
                binding: binding_model::texture_binding(config, *slot)?,
                format: None,
                readonly: false,
                type_name,
                name: name.clone(),
            })
        }
        Declaration::Image {
            name,
            access,
            format,
            slot,
        } => {
            require(config, Capabilities::COMPUTE_IMAGES, operation)?;
            Ok(NativeDeclaration {
                binding: Some(binding_model::image_binding(config, *slot, operation)?),
                format: Some(*format),
                readonly: *access == ImageAccess::ReadOnly,
                type_name: "image2D",
                name: name.clone(),
            })
        }
    }
}

pub fn lower_sample(
    sample: &Sample,
    config: &TranslationConfig,
) -> Result<NativeSample, TranslateError> {
    let operation = sample.kind.vocabulary_name();
    let with_layer = |components: u8, base: &Expr, layer: &Expr| {
        NativeCoord::WithLayer {
            components,
            base: base.clone(),
            layer: layer.clone(),
        }
    };

    let (function, coord, trailing) = match &sample.kind {
        SampleKind::Plain { coord } => (
            SampleFunction::Texture,
            NativeCoord::Direct(coord.clone()),
            vec![],
        ),
        SampleKind::Level { coord, lod } => (
            SampleFunction::TextureLod,
            NativeCoord::Direct(coord.clone()),
            vec![lod.clone()],
        ),
        SampleKind::Gradient { coord, ddx, ddy } => (
            SampleFunction::TextureGrad,
            NativeCoord::Direct(coord.clone()),
            vec![ddx.clone(), ddy.clone()],
        ),
        SampleKind::Array { coord, layer } => {
            (SampleFunction::Texture, with_layer(3, coord, layer), vec![])
        }
        SampleKind::ArrayLevel { coord, layer, lod } => (
            SampleFunction::TextureLod,
            with_layer(3, coord, layer),
            vec![lod.clone()],
        ),
        SampleKind::CubeArray { coord, layer } => {
            require(config, Capabilities::CUBE_ARRAY_TEXTURES, operation)?;
            (SampleFunction::Texture, with_layer(4, coord, layer), vec![])
        }
        SampleKind::CubeArrayLevel { coord, layer, lod } => {
            require(config, Capabilities::CUBE_ARRAY_TEXTURES, operation)?;
            (
                SampleFunction::TextureLod,
                with_layer(4, coord, layer),
                vec![lod.clone()],
            )
        }
        SampleKind::Multisample { x, y, sample: index } => {
            if config.supports(Capabilities::MULTISAMPLE_TEXTURES) {
                (
                    SampleFunction::TexelFetch,
                    NativeCoord::Texel {
                        x: x.clone(),
                        y: y.clone(),
                    },
                    vec![index.clone()],
                )
            } else {
                // Not a resolve: every sample index reads the same texel.
                (SampleFunction::Texture, NativeCoord::Origin, vec![])
            }
        }
    };

    Ok(NativeSample {
        function,
        texture: sample.texture.clone(),
        coord,
        trailing,
    })
}

pub fn lower_image(image: &ImageOp, config: &TranslationConfig) -> Result<NativeCall, TranslateError> {
    let (operation, function, args) = match image {
        ImageOp::Read { image, coord } => (
            "read_texture",
            "imageLoad",
            vec![image.clone(), coord.to_string()],
        ),
        ImageOp::Write {
            image,
            value,
            coord,
        } => (
            "write_texture",
            "imageStore",
            vec![image.clone(), coord.to_string(), value.to_string()],
        ),
    };
    require(config, Capabilities::COMPUTE_IMAGES, operation)?;
    Ok(NativeCall {
        function,
        args,
        grouped: false,
    })
}

pub fn lower_matrix(matrix: &MatrixOp) -> NativeMatrix {
    match matrix {
        MatrixOp::To3x3(m) => NativeMatrix::Construct {
            size: 3,
            args: vec![m.clone()],
            transpose: false,
        },
        MatrixOp::FromColumns3x3(columns) => NativeMatrix::Construct {
            size: 3,
            args: columns.to_vec(),
            transpose: false,
        },
        MatrixOp::FromRows3x3(rows) => NativeMatrix::Construct {
            size: 3,
            args: rows.to_vec(),
            transpose: true,
        },
        MatrixOp::UnpackInstance { target, rows } => NativeMatrix::ColumnAssign {
            target: target.clone(),
            columns: rows.to_vec(),
        },
        MatrixOp::ToDataMatrix(m) => NativeMatrix::Passthrough(m.clone()),
        MatrixOp::Mul(a, b) => NativeMatrix::Product {
            lhs: a.clone(),
            rhs: b.clone(),
        },
        MatrixOp::MulTbn(a, b) => NativeMatrix::Product {
            lhs: b.clone(),
            rhs: a.clone(),
        },
    }
}

pub fn lower_clip(clip: &ClipOp, config: &TranslationConfig) -> NativeClip {
    match clip {
        ClipOp::RemapZClipSpace(d) => match config.profile().clip_space().depth_range {
            DepthRange::Symmetric => NativeClip::Passthrough(d.clone()),
            DepthRange::ZeroToOne => NativeClip::AffineDepth(d.clone()),
        },
        ClipOp::RemapDepth(d) => NativeClip::AssignAffineDepth(d.clone()),
        ClipOp::RemapNdcRay(r) => NativeClip::NdcXy(r.clone()),
        ClipOp::DepthOutput => NativeClip::Builtin("gl_FragDepth"),
    }
}

pub fn lower_intrinsic(intrinsic: &Intrinsic) -> NativeCall {
    match intrinsic {
        Intrinsic::Saturate(a) => NativeCall {
            function: "clamp",
            args: vec![a.to_string(), "0.0".to_owned(), "1.0".to_owned()],
            grouped: true,
        },
        Intrinsic::Atan2(a, b) => NativeCall {
            function: "atan",
            args: vec![a.to_string(), b.to_string()],
            grouped: true,
        },
    }
}
