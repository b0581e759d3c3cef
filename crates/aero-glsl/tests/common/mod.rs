//! IR construction helpers shared by the integration tests.

#![allow(dead_code)]

use aero_glsl::ir::{
    parse_swizzle, Builtin, Decl, Expr, Function, Program, ProgramElement, ShaderStage, Stmt,
    Storage, Type,
};
use aero_glsl::{generate_glsl_with_options, GlslError, GlslOptions, GlslOutput, Profile};

pub fn preset(name: &str) -> Profile {
    Profile::preset(name).unwrap_or_else(|| panic!("unknown preset {name}"))
}

pub fn program(stage: ShaderStage, elements: Vec<ProgramElement>) -> Program {
    Program::new(stage, elements)
}

pub fn fragment_main(body: Vec<Stmt>) -> Program {
    Program::new(ShaderStage::Fragment, vec![main(body)])
}

pub fn main(body: Vec<Stmt>) -> ProgramElement {
    ProgramElement::Function(Function::main(body))
}

pub fn function(name: &str, return_type: Type, body: Vec<Stmt>) -> ProgramElement {
    ProgramElement::Function(Function::new(name, return_type, Vec::new(), body))
}

pub fn global(storage: Storage, name: &str, ty: Type) -> ProgramElement {
    ProgramElement::Global(Decl::new(storage, name, ty))
}

pub fn local(name: &str, ty: Type, init: Expr) -> Stmt {
    Stmt::VarDecl(Decl::local(name, ty, Some(init)))
}

pub fn var(name: &str, ty: Type) -> Expr {
    Expr::var(name, ty)
}

pub fn swizzle(base: Expr, mask: &str) -> Expr {
    let components = parse_swizzle(mask).unwrap_or_else(|| panic!("bad mask {mask}"));
    Expr::swizzle(base, components)
}

pub fn frag_color() -> Expr {
    Expr::builtin(Builtin::FragColor)
}

pub fn assign(target: Expr, value: Expr) -> Stmt {
    Stmt::assign(target, value)
}

pub fn try_generate(
    program: &Program,
    profile: &str,
    flip_y: bool,
) -> Result<GlslOutput, GlslError> {
    generate_glsl_with_options(program, &preset(profile), GlslOptions { flip_y })
}

/// Generated text for `program` under the named preset.
pub fn glsl(program: &Program, profile: &str) -> String {
    try_generate(program, profile, false)
        .unwrap_or_else(|err| panic!("generation failed for {profile}: {err}"))
        .glsl
}

pub fn glsl_flipped(program: &Program, profile: &str) -> GlslOutput {
    try_generate(program, profile, true)
        .unwrap_or_else(|err| panic!("generation failed for {profile}: {err}"))
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}
