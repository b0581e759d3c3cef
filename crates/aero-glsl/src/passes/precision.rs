//! Forces every declared and intermediate type to full precision.
//!
//! Runs before any rule synthesizes declarations, so temporaries derived from expression types
//! inherit `highp` as well. The fragment output declaration is written by the emitter and keeps
//! its fixed `mediump` qualifier.

use crate::context::GenContext;
use crate::error::GlslError;
use crate::ir::{Precision, Program, ProgramElement, Stmt};
use crate::visit::{for_each_stmt_mut, walk_program_exprs_mut};

pub(crate) fn enabled(ctx: &GenContext<'_>, _: &Program) -> bool {
    ctx.profile.uses_precision_modifiers && ctx.profile.force_high_precision
}

pub(crate) fn apply(program: &mut Program, _: &mut GenContext<'_>) -> Result<(), GlslError> {
    for element in &mut program.elements {
        match element {
            ProgramElement::Global(decl) => decl.ty.precision = Precision::Full,
            ProgramElement::Function(function) => {
                function.return_type.precision = Precision::Full;
                for param in &mut function.params {
                    param.ty.precision = Precision::Full;
                }
                for_each_stmt_mut(&mut function.body, &mut |stmt| {
                    if let Stmt::VarDecl(decl) = stmt {
                        decl.ty.precision = Precision::Full;
                    }
                    Ok(())
                })?;
            }
            ProgramElement::Layout(_) => {}
        }
    }
    walk_program_exprs_mut(program, &mut |expr| {
        expr.ty.precision = Precision::Full;
        Ok(())
    })
}
