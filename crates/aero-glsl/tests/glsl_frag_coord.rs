#![cfg(not(target_arch = "wasm32"))]

mod common;

use aero_glsl::ir::{
    BinaryOp, Builtin, Expr, Intrinsic, Program, ShaderStage, Stmt, Storage, Type,
};
use aero_glsl::ProgramInputs;
use common::*;
use pretty_assertions::assert_eq;

/// `sk_FragColor.x = gl_FragCoord.y;`
fn reads_frag_coord() -> Program {
    fragment_main(vec![assign(
        swizzle(frag_color(), "x"),
        swizzle(Expr::builtin(Builtin::FragCoord), "y"),
    )])
}

fn writes_position() -> Program {
    program(
        ShaderStage::Vertex,
        vec![
            global(Storage::In, "pos", Type::vec(4)),
            main(vec![assign(
                Expr::builtin(Builtin::Position),
                var("pos", Type::vec(4)),
            )]),
        ],
    )
}

#[test]
fn unflipped_coordinate_is_used_directly() {
    assert_eq!(
        glsl(&reads_frag_coord(), "default"),
        "#version 400\n\
         out vec4 sk_FragColor;\n\
         void main() {\n    \
             sk_FragColor.x = gl_FragCoord.y;\n\
         }\n"
    );
}

#[test]
fn flipped_coordinate_is_rebuilt_from_the_height_uniform() {
    let out = glsl_flipped(&reads_frag_coord(), "default");
    assert_eq!(
        out.glsl,
        "#version 400\n\
         out vec4 sk_FragColor;\n\
         uniform float u_skRTHeight;\n\
         void main() {\n    \
             vec4 sk_FragCoord = vec4(gl_FragCoord.x, u_skRTHeight - gl_FragCoord.y, gl_FragCoord.z, gl_FragCoord.w);\n    \
             sk_FragColor.x = sk_FragCoord.y;\n\
         }\n"
    );
    assert_eq!(
        out.inputs,
        ProgramInputs {
            render_target_height: true,
            render_target_width: false,
        }
    );
}

#[test]
fn reconstruction_happens_once_per_function() {
    let coord_y = || swizzle(Expr::builtin(Builtin::FragCoord), "y");
    let program = program(
        ShaderStage::Fragment,
        vec![
            function("height", Type::float(), vec![Stmt::Return(Some(coord_y()))]),
            main(vec![
                assign(swizzle(frag_color(), "x"), coord_y()),
                assign(
                    swizzle(frag_color(), "y"),
                    Expr::call_user("height", Vec::new(), Type::float()),
                ),
            ]),
        ],
    );
    let out = glsl_flipped(&program, "default").glsl;
    assert_eq!(out.matches("vec4 sk_FragCoord = ").count(), 2, "{out}");
    assert_eq!(out.matches("uniform float u_skRTHeight;").count(), 1, "{out}");
}

#[test]
fn modern_layout_moves_the_origin() {
    insta::assert_snapshot!(glsl_flipped(&reads_frag_coord(), "frag_coord_modern_layout").glsl, @r###"
#version 400
out vec4 sk_FragColor;
layout(origin_upper_left) in vec4 gl_FragCoord;
void main() {
    sk_FragColor.x = gl_FragCoord.y;
}
"###);
}

#[test]
fn legacy_extension_goes_directly_below_the_version() {
    let out = glsl_flipped(&reads_frag_coord(), "frag_coord_legacy_extension");
    assert_eq!(
        out.glsl,
        "#version 110\n\
         #extension GL_ARB_fragment_coord_conventions : require\n\
         layout(origin_upper_left) in vec4 gl_FragCoord;\n\
         void main() {\n    \
             gl_FragColor.x = gl_FragCoord.y;\n\
         }\n"
    );
    assert_eq!(out.inputs, ProgramInputs::default());
}

#[test]
fn workaround_reconstructs_from_the_forwarded_position() {
    assert_eq!(
        glsl(&reads_frag_coord(), "cannot_use_frag_coord"),
        "#version 400\n\
         out vec4 sk_FragColor;\n\
         in vec4 sk_FragCoord_Workaround;\n\
         void main() {\n    \
             float sk_FragCoord_InvW = 1.0 / sk_FragCoord_Workaround.w;\n    \
             vec4 sk_FragCoord_Resolved = vec4(sk_FragCoord_Workaround.xyz * sk_FragCoord_InvW, sk_FragCoord_InvW);\n    \
             sk_FragCoord_Resolved.xy = floor(sk_FragCoord_Resolved.xy) + vec2(0.5);\n    \
             sk_FragColor.x = sk_FragCoord_Resolved.y;\n\
         }\n"
    );
}

#[test]
fn workaround_vertex_stage_forwards_position_writes() {
    assert_eq!(
        glsl(&writes_position(), "cannot_use_frag_coord"),
        "#version 400\n\
         out vec4 sk_FragCoord_Workaround;\n\
         in vec4 pos;\n\
         void main() {\n    \
             sk_FragCoord_Workaround = (gl_Position = pos);\n\
         }\n"
    );
}

#[test]
fn flipped_vertex_stage_negates_clip_y() {
    assert_eq!(
        glsl_flipped(&writes_position(), "default").glsl,
        "#version 400\n\
         in vec4 pos;\n\
         void main() {\n    \
             gl_Position = pos;\n    \
             gl_Position.y = -1.0 * gl_Position.y;\n\
         }\n"
    );
}

fn vertex_main(body: Vec<Stmt>) -> Program {
    program(
        ShaderStage::Vertex,
        vec![
            global(Storage::In, "pos", Type::vec(4)),
            global(Storage::Uniform, "early", Type::bool()),
            main(body),
        ],
    )
}

fn position() -> Expr {
    Expr::builtin(Builtin::Position)
}

fn pos() -> Expr {
    var("pos", Type::vec(4))
}

const NEGATE_Y: &str = "gl_Position.y = -1.0 * gl_Position.y;";

#[test]
fn compound_position_writes_are_flipped_once() {
    let program = vertex_main(vec![
        assign(position(), pos()),
        Stmt::Expr(Expr::binary(BinaryOp::MulAssign, position(), Expr::float(2.0))),
        Stmt::Expr(Expr::binary(BinaryOp::AddAssign, position(), pos())),
    ]);
    assert_eq!(
        glsl_flipped(&program, "default").glsl,
        "#version 400\n\
         in vec4 pos;\n\
         uniform bool early;\n\
         void main() {\n    \
             gl_Position = pos;\n    \
             gl_Position *= 2.0;\n    \
             gl_Position += pos;\n    \
             gl_Position.y = -1.0 * gl_Position.y;\n\
         }\n"
    );
}

#[test]
fn component_position_writes_are_flipped() {
    let program = vertex_main(vec![
        assign(swizzle(position(), "xy"), swizzle(pos(), "xy")),
        assign(swizzle(position(), "zw"), swizzle(pos(), "zw")),
    ]);
    let out = glsl_flipped(&program, "default").glsl;
    assert_eq!(out.matches(NEGATE_Y).count(), 1, "{out}");
    assert!(
        out.ends_with(&format!("gl_Position.zw = pos.zw;\n    {NEGATE_Y}\n}}\n")),
        "{out}"
    );
}

#[test]
fn every_exit_from_main_is_flipped() {
    let program = vertex_main(vec![
        assign(position(), pos()),
        Stmt::If {
            cond: var("early", Type::bool()),
            then_branch: Box::new(Stmt::Block(vec![Stmt::Return(None)])),
            else_branch: None,
        },
        assign(swizzle(position(), "x"), Expr::float(0.0)),
    ]);
    let out = glsl_flipped(&program, "default").glsl;
    assert_eq!(out.matches(NEGATE_Y).count(), 2, "{out}");
    assert!(
        out.contains(&format!("if (early) {{\n        {NEGATE_Y}\n        return;\n")),
        "{out}"
    );
}

#[test]
fn vertex_stage_without_position_writes_is_untouched() {
    let program = vertex_main(vec![Stmt::Return(None)]);
    assert!(!glsl_flipped(&program, "default").glsl.contains(NEGATE_Y));
}

#[test]
fn flipped_fragment_stage_negates_dfdy() {
    let program = program(
        ShaderStage::Fragment,
        vec![
            global(Storage::In, "v", Type::float()),
            main(vec![assign(
                swizzle(frag_color(), "x"),
                Expr::call(Intrinsic::Dfdy, vec![var("v", Type::float())]),
            )]),
        ],
    );
    let out = glsl_flipped(&program, "default");
    assert_eq!(
        out.glsl,
        "#version 400\n\
         out vec4 sk_FragColor;\n\
         in float v;\n\
         void main() {\n    \
             sk_FragColor.x = -dFdy(v);\n\
         }\n"
    );
    assert_eq!(out.inputs, ProgramInputs::default());
}
