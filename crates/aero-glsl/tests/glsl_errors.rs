#![cfg(not(target_arch = "wasm32"))]

mod common;

use aero_glsl::ir::{
    Builtin, Decl, Expr, ProgramElement, ShaderStage, Stmt, Storage, SwizzleComponent, Type,
    UnaryOp,
};
use aero_glsl::{generate_glsl, GlslError, Profile};
use common::*;

fn is_malformed(result: Result<aero_glsl::GlslOutput, GlslError>) -> bool {
    matches!(result, Err(GlslError::MalformedIr(_)))
}

fn is_unsupported(result: Result<aero_glsl::GlslOutput, GlslError>) -> bool {
    matches!(result, Err(GlslError::UnsupportedConstruct { .. }))
}

#[test]
fn constant_selector_in_an_assignment_target() {
    let program = fragment_main(vec![assign(
        swizzle(frag_color(), "x0"),
        var("p", Type::vec(2)),
    )]);
    assert!(is_malformed(try_generate(&program, "default", false)));
}

#[test]
fn mask_longer_than_four_components() {
    use SwizzleComponent::*;
    let program = fragment_main(vec![Stmt::Expr(Expr::swizzle(
        var("v", Type::vec(4)),
        vec![X, Y, Z, W, X],
    ))]);
    assert!(is_malformed(try_generate(&program, "default", false)));
}

#[test]
fn fragment_coordinate_outside_the_fragment_stage() {
    let program = program(
        ShaderStage::Vertex,
        vec![main(vec![assign(
            Expr::builtin(Builtin::Position),
            Expr::builtin(Builtin::FragCoord),
        )])],
    );
    assert!(is_malformed(try_generate(&program, "default", false)));
}

#[test]
fn geometry_stage_on_a_target_without_it() {
    let program = program(ShaderStage::Geometry, vec![main(vec![Stmt::EmitVertex])]);
    let err = try_generate(&program, "version_110", false).unwrap_err();
    assert!(err.to_string().contains("version_110"), "{err}");
    assert!(matches!(err, GlslError::UnsupportedConstruct { .. }));
}

#[test]
fn unsigned_integers_on_a_legacy_dialect() {
    let program = fragment_main(vec![local("n", Type::uint(), Expr::uint(3))]);
    assert!(is_unsupported(try_generate(&program, "version_110", false)));
    assert!(glsl(&program, "default").contains("uint n = 3u;"));
}

#[test]
fn user_fragment_output_on_a_legacy_dialect() {
    let program = program(
        ShaderStage::Fragment,
        vec![
            global(Storage::Out, "color", Type::vec(4)),
            main(vec![assign(var("color", Type::vec(4)), var("color", Type::vec(4)))]),
        ],
    );
    assert!(is_unsupported(try_generate(&program, "version_110", false)));
}

#[test]
fn non_finite_float_literal() {
    let program = fragment_main(vec![local("x", Type::float(), Expr::float(f64::NAN))]);
    assert!(is_unsupported(try_generate(&program, "default", false)));

    let program = fragment_main(vec![local("x", Type::float(), Expr::float(f64::INFINITY))]);
    assert!(is_unsupported(try_generate(&program, "default", false)));
}

#[test]
fn runaway_nesting_is_rejected_before_rewriting() {
    let mut expr = var("x", Type::float());
    for _ in 0..600 {
        expr = Expr::unary(UnaryOp::Neg, expr);
    }
    let program = fragment_main(vec![Stmt::Expr(expr)]);
    assert!(is_malformed(try_generate(&program, "default", false)));

    let mut stmt = Stmt::Break;
    for _ in 0..600 {
        stmt = Stmt::Block(vec![stmt]);
    }
    assert!(is_malformed(try_generate(&fragment_main(vec![stmt]), "default", false)));
}

#[test]
fn for_initializer_must_be_a_declaration_or_expression() {
    let program = fragment_main(vec![Stmt::For {
        init: Some(Box::new(Stmt::Break)),
        cond: None,
        next: None,
        body: Box::new(Stmt::Block(Vec::new())),
    }]);
    assert!(is_malformed(try_generate(&program, "default", false)));
}

#[test]
fn errors_name_the_profile_that_rejected_the_program() {
    let profile = Profile {
        name: "embedded-gles2".to_owned(),
        ..Profile::preset("version_110").unwrap()
    };
    let program = program(
        ShaderStage::Fragment,
        vec![
            ProgramElement::Global(Decl::new(Storage::Uniform, "n", Type::uint())),
            main(Vec::new()),
        ],
    );
    match generate_glsl(&program, &profile) {
        Err(GlslError::UnsupportedConstruct { profile, .. }) => {
            assert_eq!(profile, "embedded-gles2")
        }
        other => panic!("expected an unsupported construct, got {other:?}"),
    }
}
