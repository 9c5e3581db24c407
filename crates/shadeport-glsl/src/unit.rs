//! Per-compilation-unit translation state.
//!
//! [`ShaderUnit`] wraps the pure lowering table with the bookkeeping that needs to see more than
//! one call: which resources were declared (and with what dimensionality), which depth targets
//! were already remapped on the current code path, and where the multisample approximation was
//! used.
//!
//! Depth remaps are tracked per brace block. A remap conflicts with one in the same block or an
//! enclosing block, so the bodies of an `if` and its `else` are independent paths. A block's
//! remaps are forgotten when it closes, which means a remap inside a loop body, or one following a
//! nested block that also remapped the same target, is not reported.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::TranslationConfig;
use crate::error::TranslateError;
use crate::lower::lower;
use crate::native::Native;
use crate::vocab::{ClipOp, Declaration, Dimension, ImageAccess, Op, Sample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceKind {
    Texture { dimension: Dimension },
    Image { access: ImageAccess },
}

/// A resource declared in the unit, with the binding index actually emitted for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclaredResource {
    pub name: String,
    pub kind: ResourceKind,
    pub slot: u32,
    pub binding: Option<u32>,
}

/// One use of a degraded native form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Approximation {
    pub line: usize,
    pub operation: &'static str,
    pub texture: String,
}

#[derive(Debug)]
pub struct ShaderUnit {
    config: TranslationConfig,
    line: usize,
    resources: Vec<DeclaredResource>,
    by_name: HashMap<String, usize>,
    /// Depth targets remapped in each open block, outermost first. Never empty.
    remapped_depth: Vec<HashSet<String>>,
    approximations: Vec<Approximation>,
}

impl ShaderUnit {
    pub fn new(config: TranslationConfig) -> Self {
        debug!(profile = %config.profile(), "starting shader unit");
        Self {
            config,
            line: 1,
            resources: Vec::new(),
            by_name: HashMap::new(),
            remapped_depth: vec![HashSet::new()],
            approximations: Vec::new(),
        }
    }

    pub fn config(&self) -> &TranslationConfig {
        &self.config
    }

    /// Source line attributed to subsequent calls (1-based).
    pub fn set_line(&mut self, line: usize) {
        self.line = line;
    }

    /// Validate `op` against what the unit has seen so far, lower it, and render the native text.
    pub fn translate(&mut self, op: &Op) -> Result<String, TranslateError> {
        self.validate(op)?;
        let native = lower(op, &self.config)?;

        match (op, &native) {
            (Op::Declare(decl), Native::Declaration(emitted)) => self.record(decl, emitted.binding),
            (Op::Sample(sample), native) if native.is_approximation() => {
                let operation = sample.kind.vocabulary_name();
                warn!(
                    line = self.line,
                    operation,
                    texture = %sample.texture,
                    profile = %self.config.profile(),
                    "multisample fetch reads a single fixed texel on this profile"
                );
                self.approximations.push(Approximation {
                    line: self.line,
                    operation,
                    texture: sample.texture.clone(),
                });
            }
            _ => {}
        }

        Ok(native.to_string())
    }

    /// Open a brace block nested in the current one.
    pub fn enter_block(&mut self) {
        self.remapped_depth.push(HashSet::new());
    }

    /// Close the innermost open block. Unbalanced closes leave the outermost block in place.
    pub fn exit_block(&mut self) {
        if self.remapped_depth.len() > 1 {
            self.remapped_depth.pop();
        } else if let Some(outer) = self.remapped_depth.first_mut() {
            outer.clear();
        }
    }

    pub fn resources(&self) -> &[DeclaredResource] {
        &self.resources
    }

    pub fn resource(&self, name: &str) -> Option<&DeclaredResource> {
        self.by_name.get(name).map(|&i| &self.resources[i])
    }

    pub fn approximations(&self) -> &[Approximation] {
        &self.approximations
    }

    pub fn finish(self) -> (Vec<DeclaredResource>, Vec<Approximation>) {
        debug!(
            resources = self.resources.len(),
            approximations = self.approximations.len(),
            "finished shader unit"
        );
        (self.resources, self.approximations)
    }

    fn validate(&mut self, op: &Op) -> Result<(), TranslateError> {
        match op {
            Op::Declare(decl) => {
                if self.by_name.contains_key(decl.name()) {
                    return Err(TranslateError::DuplicateDeclaration {
                        name: decl.name().to_owned(),
                    });
                }
            }
            Op::Sample(sample) => self.validate_sample(sample)?,
            Op::Image(image) => {
                if let Some(resource) = self.resource(image.image()) {
                    if !matches!(resource.kind, ResourceKind::Image { .. }) {
                        return Err(TranslateError::NotAnImage {
                            operation: op.vocabulary_name(),
                            name: resource.name.clone(),
                        });
                    }
                }
            }
            Op::Clip(ClipOp::RemapDepth(target)) => {
                let target = target.as_str().trim();
                if self.remapped_depth.iter().any(|block| block.contains(target)) {
                    return Err(TranslateError::DepthRemappedTwice {
                        target: target.to_owned(),
                    });
                }
                if let Some(block) = self.remapped_depth.last_mut() {
                    block.insert(target.to_owned());
                }
            }
            Op::Matrix(_) | Op::Clip(_) | Op::Intrinsic(_) | Op::Alias(_) => {}
        }
        Ok(())
    }

    fn validate_sample(&self, sample: &Sample) -> Result<(), TranslateError> {
        // Textures declared outside this unit (shared headers) are not checked.
        let Some(resource) = self.resource(&sample.texture) else {
            return Ok(());
        };
        let operation = sample.kind.vocabulary_name();
        let ResourceKind::Texture { dimension } = resource.kind else {
            return Err(TranslateError::NotATexture {
                operation,
                name: resource.name.clone(),
            });
        };
        if !sample.kind.accepts(dimension) {
            return Err(TranslateError::DimensionMismatch {
                operation,
                texture: sample.texture.clone(),
                declared: dimension,
            });
        }

        let expected = sample.kind.base_components(dimension);
        let found = sample.kind.coord().and_then(|coord| coord.component_count());
        if let (Some(expected), Some(found)) = (expected, found) {
            if expected != found {
                return Err(TranslateError::CoordinateArity {
                    operation,
                    texture: sample.texture.clone(),
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }

    fn record(&mut self, decl: &Declaration, binding: Option<u32>) {
        let (kind, slot) = match decl {
            Declaration::Texture {
                dimension, slot, ..
            } => (
                ResourceKind::Texture {
                    dimension: *dimension,
                },
                *slot,
            ),
            Declaration::Image { access, slot, .. } => (ResourceKind::Image { access: *access }, *slot),
        };
        self.by_name
            .insert(decl.name().to_owned(), self.resources.len());
        self.resources.push(DeclaredResource {
            name: decl.name().to_owned(),
            kind,
            slot,
            binding,
        });
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::ProfileConfig;
    use crate::vocab::{parse_call, Expr};

    fn op(name: &str, args: &[&str]) -> Op {
        parse_call(name, args.iter().copied().map(Expr::from).collect())
            .unwrap()
            .unwrap()
    }

    fn explicit_unit() -> ShaderUnit {
        ShaderUnit::new(ProfileConfig::desktop_explicit(4).resolve().unwrap())
    }

    #[test]
    fn declarations_are_recorded_with_emitted_binding() {
        let mut unit = explicit_unit();
        assert_eq!(
            unit.translate(&op("texture_2d", &["albedo", "3"])).unwrap(),
            "layout(binding = 7) uniform sampler2D albedo"
        );
        unit.translate(&op("texture2d_r", &["src", "0"])).unwrap();

        assert_eq!(
            unit.resources(),
            [
                DeclaredResource {
                    name: "albedo".to_owned(),
                    kind: ResourceKind::Texture {
                        dimension: Dimension::Texture2d
                    },
                    slot: 3,
                    binding: Some(7),
                },
                DeclaredResource {
                    name: "src".to_owned(),
                    kind: ResourceKind::Image {
                        access: ImageAccess::ReadOnly
                    },
                    slot: 0,
                    binding: Some(4),
                },
            ]
        );
    }

    #[test]
    fn redeclaring_a_name_fails() {
        let mut unit = explicit_unit();
        unit.translate(&op("texture_2d", &["albedo", "0"])).unwrap();
        assert_eq!(
            unit.translate(&op("texture_cube", &["albedo", "1"])),
            Err(TranslateError::DuplicateDeclaration {
                name: "albedo".to_owned()
            })
        );
    }

    #[test]
    fn sampling_variant_must_match_dimension() {
        let mut unit = explicit_unit();
        unit.translate(&op("texture_2d", &["albedo", "0"])).unwrap();
        unit.translate(&op("texture_2dms", &["float4", "4", "msaa", "1"]))
            .unwrap();

        assert_eq!(
            unit.translate(&op("sample_texture_array", &["albedo", "uv", "1.0"])),
            Err(TranslateError::DimensionMismatch {
                operation: "sample_texture_array",
                texture: "albedo".to_owned(),
                declared: Dimension::Texture2d,
            })
        );
        assert_eq!(
            unit.translate(&op("sample_texture", &["msaa", "uv"])),
            Err(TranslateError::DimensionMismatch {
                operation: "sample_texture",
                texture: "msaa".to_owned(),
                declared: Dimension::Texture2dMs,
            })
        );
    }

    #[test]
    fn visible_coordinate_arity_is_checked() {
        let mut unit = explicit_unit();
        unit.translate(&op("texture_2d_array", &["layers", "0"])).unwrap();

        assert_eq!(
            unit.translate(&op("sample_texture_array", &["layers", "vec3(uv, 0.0)", "1.0"])),
            Err(TranslateError::CoordinateArity {
                operation: "sample_texture_array",
                texture: "layers".to_owned(),
                expected: 2,
                found: 3,
            })
        );
        // Direct sampling of an array texture takes the layer inside the coordinate.
        assert_eq!(
            unit.translate(&op("sample_texture", &["layers", "vec3(uv, 2.0)"]))
                .unwrap(),
            "texture(layers, vec3(uv, 2.0))"
        );
        // Opaque coordinates pass through.
        assert_eq!(
            unit.translate(&op("sample_texture_array", &["layers", "uv", "1.0"]))
                .unwrap(),
            "texture(layers, vec3(uv, 1.0))"
        );
    }

    #[test]
    fn storage_image_access_requires_an_image() {
        let mut unit = explicit_unit();
        unit.translate(&op("texture_2d", &["albedo", "0"])).unwrap();
        unit.translate(&op("texture2d_w", &["dst", "1"])).unwrap();

        assert_eq!(
            unit.translate(&op("read_texture", &["albedo", "gid"])),
            Err(TranslateError::NotAnImage {
                operation: "read_texture",
                name: "albedo".to_owned(),
            })
        );
        assert_eq!(
            unit.translate(&op("sample_texture", &["dst", "uv"])),
            Err(TranslateError::NotATexture {
                operation: "sample_texture",
                name: "dst".to_owned(),
            })
        );
        assert_eq!(
            unit.translate(&op("write_texture", &["dst", "c", "gid"])).unwrap(),
            "imageStore(dst, gid, c)"
        );
    }

    #[test]
    fn depth_remap_is_allowed_once_per_path() {
        let mut unit = explicit_unit();
        unit.enter_block();
        unit.translate(&op("remap_depth", &["d"])).unwrap();
        unit.translate(&op("remap_depth", &["other"])).unwrap();
        assert_eq!(
            unit.translate(&op("remap_depth", &[" d "])),
            Err(TranslateError::DepthRemappedTwice {
                target: "d".to_owned()
            })
        );

        unit.exit_block();
        assert_eq!(
            unit.translate(&op("remap_depth", &["d"])).unwrap(),
            "(d = d * 0.5 + 0.5)"
        );
    }

    #[test]
    fn nested_block_sees_remaps_of_enclosing_blocks() {
        let mut unit = explicit_unit();
        unit.enter_block();
        unit.translate(&op("remap_depth", &["d"])).unwrap();
        unit.enter_block();
        assert_eq!(
            unit.translate(&op("remap_depth", &["d"])),
            Err(TranslateError::DepthRemappedTwice {
                target: "d".to_owned()
            })
        );
        unit.exit_block();
        unit.exit_block();

        // Sibling blocks are separate paths.
        unit.enter_block();
        unit.enter_block();
        unit.translate(&op("remap_depth", &["d"])).unwrap();
        unit.exit_block();
        unit.enter_block();
        unit.translate(&op("remap_depth", &["d"])).unwrap();
        unit.exit_block();
        unit.exit_block();
    }

    #[test]
    fn multisample_approximation_is_recorded() {
        let mut unit = ShaderUnit::new(ProfileConfig::mobile().resolve().unwrap());
        unit.translate(&op("texture_2dms", &["float4", "4", "msaa", "1"]))
            .unwrap();
        unit.set_line(12);
        assert_eq!(
            unit.translate(&op("sample_texture_2dms", &["msaa", "x", "y", "3"]))
                .unwrap(),
            "texture(msaa, vec2(0.0, 0.0))"
        );

        let (resources, approximations) = unit.finish();
        assert_eq!(resources[0].binding, None);
        assert_eq!(
            approximations,
            [Approximation {
                line: 12,
                operation: "sample_texture_2dms",
                texture: "msaa".to_owned(),
            }]
        );
    }

    #[test]
    fn failed_capability_leaves_no_resource_behind() {
        let mut unit = ShaderUnit::new(ProfileConfig::mobile().resolve().unwrap());
        assert!(unit
            .translate(&op("texture_cube_array", &["probes", "0"]))
            .is_err());
        assert!(unit.resource("probes").is_none());
    }

    #[test]
    fn resources_serialize_for_reports() {
        let resource = DeclaredResource {
            name: "src".to_owned(),
            kind: ResourceKind::Image {
                access: ImageAccess::ReadOnly,
            },
            slot: 0,
            binding: Some(4),
        };
        assert_eq!(
            serde_json::to_value(&resource).unwrap(),
            serde_json::json!({
                "name": "src",
                "kind": {"type": "image", "access": "read_only"},
                "slot": 0,
                "binding": 4
            })
        );
    }
}
