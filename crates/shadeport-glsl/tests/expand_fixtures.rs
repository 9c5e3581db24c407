use std::fs;

use pretty_assertions::assert_eq;
use shadeport_glsl::{
    expand_source, Approximation, ConfigError, DeclaredResource, Dimension, ExpandError,
    ExpandOptions, ImageAccess, ProfileConfig, ResourceKind, TargetProfile, TranslateError,
};

fn load_fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {path}: {e}"))
}

fn expand(config: ProfileConfig, fixture: &str) -> Result<shadeport_glsl::ExpandedShader, ExpandError> {
    let config = config.resolve().expect("valid profile configuration");
    expand_source(&config, &load_fixture(fixture), &ExpandOptions::default())
}

#[test]
fn forward_pass_on_mobile() {
    let out = expand(ProfileConfig::mobile(), "forward.glsl").unwrap();
    assert_eq!(out.profile, TargetProfile::MobileConstrained);
    assert!(out.approximations.is_empty());
    insta::assert_snapshot!(out.glsl, @r#"
    #version 310 es
    precision highp float;
    precision highp sampler2DArray;
    // Forward pass shared between mobile and desktop builds.
    uniform sampler2D albedo_map;
    uniform sampler2DArray shadow_cascades;

    in vec3 v_normal;
    in vec3 v_tangent;
    in vec3 v_bitangent;
    in vec2 v_uv;
    in vec4 v_clip;
    out vec4 frag_color;

    void main() {
        mat3 tbn = mat3(v_tangent, v_bitangent, v_normal);
        vec3 n = normalize(((tbn) * (vec3(0.0, 0.0, 1.0))));
        vec4 base = texture(albedo_map, v_uv);
        float shadow = textureLod(shadow_cascades, vec3(v_uv, 1.0), 0.0).r;
        float depth = v_clip.z / v_clip.w;
        (depth = depth * 0.5 + 0.5);
        gl_FragDepth = depth;
        frag_color = vec4(mix(base.rgb * 0.2, base.rgb, (clamp(dot(n, vec3(0.0, 1.0, 0.0)) * shadow, 0.0, 1.0))), base.a);
    }
    "#);
}

#[test]
fn forward_pass_with_explicit_bindings() {
    let out = expand(ProfileConfig::desktop_explicit(4), "forward.glsl").unwrap();
    assert!(!out.glsl.contains("precision"));
    assert!(out
        .glsl
        .contains("layout(binding = 4) uniform sampler2D albedo_map;\n"));
    assert!(out
        .glsl
        .contains("layout(binding = 5) uniform sampler2DArray shadow_cascades;\n"));
    assert_eq!(
        out.bindings
            .iter()
            .map(|r| (r.name.as_str(), r.binding))
            .collect::<Vec<_>>(),
        [("albedo_map", Some(4)), ("shadow_cascades", Some(5))]
    );
}

#[test]
fn forward_pass_bodies_match_across_profiles() {
    let body = |glsl: &str| glsl[glsl.find("void main()").unwrap()..].to_owned();
    let mobile = expand(ProfileConfig::mobile(), "forward.glsl").unwrap();
    let explicit = expand(ProfileConfig::desktop_explicit(4), "forward.glsl").unwrap();
    let implicit = expand(ProfileConfig::desktop(), "forward.glsl").unwrap();
    assert_eq!(body(&mobile.glsl), body(&explicit.glsl));
    assert_eq!(body(&mobile.glsl), body(&implicit.glsl));
}

#[test]
fn resolve_pass_on_desktop() {
    let out = expand(
        ProfileConfig::desktop().with_texture_offset(8),
        "resolve.glsl",
    )
    .unwrap();
    let glsl = &out.glsl;

    for expected in [
        "uniform sampler2DMS scene_color;",
        "uniform samplerCubeArray reflection_probes;",
        "layout(binding = 10, rgba8) uniform readonly image2D history;",
        "layout(binding = 11, rgba8) uniform image2D resolved;",
        "sum += texelFetch(scene_color, ivec2(px.x, px.y), s);",
        "vec4 probe = textureLod(reflection_probes, vec4(vec3(0.0, 1.0, 0.0), 0.0), 2.0);",
        "vec4 prev = imageLoad(history, px);",
        "imageStore(resolved, px, mix(prev, sum * 0.25 + probe * 0.1, 0.1));",
    ] {
        assert!(glsl.contains(expected), "missing `{expected}` in:\n{glsl}");
    }
    assert!(!glsl.contains("_pmfx_unroll"));

    assert_eq!(
        out.bindings,
        [
            DeclaredResource {
                name: "scene_color".to_owned(),
                kind: ResourceKind::Texture {
                    dimension: Dimension::Texture2dMs
                },
                slot: 0,
                binding: None,
            },
            DeclaredResource {
                name: "reflection_probes".to_owned(),
                kind: ResourceKind::Texture {
                    dimension: Dimension::CubeArray
                },
                slot: 1,
                binding: None,
            },
            DeclaredResource {
                name: "history".to_owned(),
                kind: ResourceKind::Image {
                    access: ImageAccess::ReadOnly
                },
                slot: 2,
                binding: Some(10),
            },
            DeclaredResource {
                name: "resolved".to_owned(),
                kind: ResourceKind::Image {
                    access: ImageAccess::ReadWrite
                },
                slot: 3,
                binding: Some(11),
            },
        ]
    );
}

#[test]
fn resolve_pass_fails_on_mobile_at_first_desktop_only_resource() {
    let err = expand(ProfileConfig::mobile(), "resolve.glsl").unwrap_err();
    assert_eq!(
        err,
        ExpandError::Translate {
            line: 3,
            profile: TargetProfile::MobileConstrained,
            source: TranslateError::Capability {
                operation: "texture_cube_array",
                capability: "cube-array textures",
                profile: TargetProfile::MobileConstrained,
            },
        }
    );
}

#[test]
fn storage_images_need_texture_offset() {
    let err = expand(ProfileConfig::desktop(), "resolve.glsl").unwrap_err();
    assert_eq!(
        err,
        ExpandError::Translate {
            line: 4,
            profile: TargetProfile::DesktopImplicitBinding,
            source: TranslateError::Config(ConfigError::ImageBindingWithoutOffset {
                operation: "texture2d_r"
            }),
        }
    );
}

#[test]
fn mobile_multisample_reads_are_recorded() {
    let out = expand(ProfileConfig::mobile(), "msaa_mobile.glsl").unwrap();
    assert!(out.glsl.contains("uniform sampler2D scene_color;"));
    assert!(out
        .glsl
        .contains("vec4 c0 = texture(scene_color, vec2(0.0, 0.0));"));
    assert!(out
        .glsl
        .contains("vec4 c1 = texture(scene_color, vec2(0.0, 0.0));"));
    assert_eq!(
        out.approximations,
        [
            Approximation {
                line: 6,
                operation: "sample_texture_2dms",
                texture: "scene_color".to_owned(),
            },
            Approximation {
                line: 7,
                operation: "sample_texture_2dms",
                texture: "scene_color".to_owned(),
            },
        ]
    );
}

#[test]
fn expanded_shader_serializes_as_report() {
    let out = expand(ProfileConfig::mobile(), "msaa_mobile.glsl").unwrap();
    let report = serde_json::to_value(&out).unwrap();
    assert_eq!(report["profile"], "mobile_constrained");
    assert_eq!(report["bindings"][0]["name"], "scene_color");
    assert_eq!(report["bindings"][0]["binding"], serde_json::Value::Null);
    assert_eq!(report["approximations"][1]["line"], 7);
}
