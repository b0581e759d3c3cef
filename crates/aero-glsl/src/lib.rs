//! Retargeting GLSL code generator.
//!
//! Takes a type-checked shader [`ir::Program`] and a [`Profile`] describing the target GLSL
//! dialect and its known driver defects, and produces GLSL source text plus the list of
//! synthesized uniforms the caller has to bind ([`ProgramInputs`]).
//!
//! Generation runs in three steps:
//!
//! 1. A structural check of the IR (malformed trees are rejected before anything else runs).
//! 2. The rewrite pipeline in [`passes`], a fixed sequence of profile-gated tree rewrites.
//! 3. Emission of the rewritten tree as text.
//!
//! Each call works on its own copy of the program and its own scratch state, so calls are
//! independent and deterministic: the same program and profile always produce the same text.

#![forbid(unsafe_code)]

mod context;
mod emit;
mod error;
pub mod ir;
mod limits;
pub mod passes;
pub mod profile;
mod verify;
mod visit;

use tracing::debug;

pub use error::GlslError;
pub use profile::{FragCoordConvention, GlslGeneration, Profile, Quirks};

use context::GenContext;

/// Per-request settings that describe the render target rather than the GLSL target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlslOptions {
    /// The render target's origin is at the top, so fragment coordinates, clip-space `y` and
    /// `dFdy` have to be mirrored.
    pub flip_y: bool,
}

/// Uniforms the generated program declares on its own; the caller must supply them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgramInputs {
    /// `uniform float u_skRTHeight;` is declared.
    pub render_target_height: bool,
    /// `uniform float u_skRTWidth;` is declared.
    pub render_target_width: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlslOutput {
    pub glsl: String,
    pub inputs: ProgramInputs,
}

/// Generates GLSL for `program` with default [`GlslOptions`].
pub fn generate_glsl(program: &ir::Program, profile: &Profile) -> Result<GlslOutput, GlslError> {
    generate_glsl_with_options(program, profile, GlslOptions::default())
}

pub fn generate_glsl_with_options(
    program: &ir::Program,
    profile: &Profile,
    options: GlslOptions,
) -> Result<GlslOutput, GlslError> {
    verify::verify_program(program)?;

    let mut ctx = GenContext::new(profile, options);
    let mut program = program.clone();
    passes::run_pipeline(&mut program, &mut ctx)?;
    let glsl = emit::emit_program(&program, &ctx)?;

    debug!(
        profile = %profile.name,
        stage = ?program.stage,
        bytes = glsl.len(),
        render_target_height = ctx.inputs.render_target_height,
        render_target_width = ctx.inputs.render_target_width,
        "generated GLSL"
    );
    Ok(GlslOutput {
        glsl,
        inputs: ctx.inputs,
    })
}
