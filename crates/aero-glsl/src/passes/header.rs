//! Decides what the preamble needs: extension pragmas and the fragment output declaration.
//! The emitter writes the version line and precision block from the profile directly.

use crate::context::GenContext;
use crate::error::{unsupported, GlslError};
use crate::ir::{Builtin, Callee, ExprKind, Intrinsic, Program, ShaderStage};
use crate::visit::program_any_expr;

pub(crate) fn apply(program: &mut Program, ctx: &mut GenContext<'_>) -> Result<(), GlslError> {
    let profile = ctx.profile;

    if program.stage == ShaderStage::Geometry {
        if !profile.supports_geometry_shaders {
            return Err(unsupported(profile, "geometry shaders are not available"));
        }
        if let Some(ext) = &profile.geometry_shader_extension {
            ctx.require_extension(ext);
        }
        if program.declared_invocations() > 1 && profile.supports_native_gs_invocations {
            if let Some(ext) = &profile.gs_invocations_extension {
                ctx.require_extension(ext);
            }
        }
    }

    if let Some(ext) = &profile.standard_derivatives_extension {
        let uses_derivatives = program_any_expr(program, &mut |expr| {
            matches!(
                &expr.kind,
                ExprKind::Call {
                    callee: Callee::Intrinsic(Intrinsic::Dfdx | Intrinsic::Dfdy),
                    ..
                }
            )
        });
        if uses_derivatives {
            ctx.require_extension(ext);
        }
    }

    // Legacy dialects write the implicit `gl_FragColor` instead.
    if program.stage == ShaderStage::Fragment && !profile.generation.is_legacy() {
        ctx.declares_frag_output = program_any_expr(program, &mut |expr| {
            matches!(expr.kind, ExprKind::Builtin(Builtin::FragColor))
        });
    }
    Ok(())
}
