#![cfg(not(target_arch = "wasm32"))]

mod common;

use aero_glsl::ir::{Expr, Intrinsic, Program, SamplerDim, ShaderStage, Storage, Type};
use aero_glsl::GlslError;
use common::*;
use pretty_assertions::assert_eq;

fn sample(sampler: &str, dim: SamplerDim, coord: Expr) -> Expr {
    Expr::call(
        Intrinsic::Sample,
        vec![var(sampler, Type::sampler(dim)), coord],
    )
}

fn sampling_program() -> Program {
    program(
        ShaderStage::Fragment,
        vec![
            global(Storage::Uniform, "tex", Type::sampler(SamplerDim::D2)),
            global(Storage::Uniform, "rect", Type::sampler(SamplerDim::Rect)),
            global(Storage::In, "uv", Type::vec(2)),
            global(Storage::In, "uvq", Type::vec(3)),
            main(vec![
                assign(frag_color(), sample("tex", SamplerDim::D2, var("uv", Type::vec(2)))),
                assign(frag_color(), sample("tex", SamplerDim::D2, var("uvq", Type::vec(3)))),
                assign(frag_color(), sample("rect", SamplerDim::Rect, var("uv", Type::vec(2)))),
            ]),
        ],
    )
}

#[test]
fn modern_dialect_uses_overloaded_entry_points() {
    assert_eq!(
        glsl(&sampling_program(), "default"),
        "#version 400\n\
         out vec4 sk_FragColor;\n\
         uniform sampler2D tex;\n\
         uniform sampler2DRect rect;\n\
         in vec2 uv;\n\
         in vec3 uvq;\n\
         void main() {\n    \
             sk_FragColor = texture(tex, uv);\n    \
             sk_FragColor = textureProj(tex, uvq);\n    \
             sk_FragColor = texture(rect, uv);\n\
         }\n"
    );
}

#[test]
fn legacy_dialect_uses_per_dimension_entry_points() {
    assert_eq!(
        glsl(&sampling_program(), "version_110"),
        "#version 110\n\
         uniform sampler2D tex;\n\
         uniform sampler2DRect rect;\n\
         varying vec2 uv;\n\
         varying vec3 uvq;\n\
         void main() {\n    \
             gl_FragColor = texture2D(tex, uv);\n    \
             gl_FragColor = texture2DProj(tex, uvq);\n    \
             gl_FragColor = texture2DRect(rect, uv);\n\
         }\n"
    );
}

#[test]
fn sharpening_biases_mipmapped_samplers_only() {
    let out = glsl(&sampling_program(), "sharpen_mipmap_levels");
    assert!(out.contains("    sk_FragColor = texture(tex, uv, -0.5);\n"), "{out}");
    assert!(out.contains("    sk_FragColor = textureProj(tex, uvq, -0.5);\n"), "{out}");
    assert!(out.contains("    sk_FragColor = texture(rect, uv);\n"), "{out}");
}

#[test]
fn one_dimensional_sampling() {
    let program = program(
        ShaderStage::Fragment,
        vec![
            global(Storage::Uniform, "ramp", Type::sampler(SamplerDim::D1)),
            main(vec![
                assign(frag_color(), sample("ramp", SamplerDim::D1, Expr::float(0.5))),
                assign(
                    frag_color(),
                    sample(
                        "ramp",
                        SamplerDim::D1,
                        Expr::construct(Type::vec(2), vec![Expr::float(0.5), Expr::float(2.0)]),
                    ),
                ),
            ]),
        ],
    );
    let out = glsl(&program, "version_110");
    assert!(out.contains("gl_FragColor = texture1D(ramp, 0.5);"), "{out}");
    assert!(out.contains("gl_FragColor = texture1DProj(ramp, vec2(0.5, 2.0));"), "{out}");
}

#[test]
fn coordinate_arity_must_match_the_sampler() {
    let program = fragment_main(vec![assign(
        frag_color(),
        sample("tex", SamplerDim::D2, var("uvqw", Type::vec(4))),
    )]);
    assert!(matches!(
        try_generate(&program, "default", false),
        Err(GlslError::MalformedIr(_))
    ));
}
