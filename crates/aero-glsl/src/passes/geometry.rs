//! Geometry-shader invocation emulation.
//!
//! Targets without instanced geometry shaders run the program body in a loop instead: the user
//! `main` becomes `_invoke`, every `gl_InvocationID` read becomes a global counter, and a new
//! `main` drives the loop, ending a primitive after each invocation. Output vertex capacity grows
//! by the invocation count.

use tracing::debug;

use crate::context::GenContext;
use crate::error::{malformed, GlslError};
use crate::ir::{
    BinaryOp, Builtin, Decl, Expr, ExprKind, Function, LayoutDirection, LayoutQualifier, Program,
    ProgramElement, ShaderStage, Stmt, Storage, Type, UnaryOp,
};
use crate::visit::walk_program_exprs_mut;

const INVOCATION_COUNTER: &str = "sk_InvocationID";
const INVOKE_FUNCTION: &str = "_invoke";

pub(crate) fn enabled(ctx: &GenContext<'_>, program: &Program) -> bool {
    program.stage == ShaderStage::Geometry
        && program.declared_invocations() > 1
        && !ctx.profile.supports_native_gs_invocations
}

pub(crate) fn apply(program: &mut Program, ctx: &mut GenContext<'_>) -> Result<(), GlslError> {
    let invocations = program.declared_invocations();
    debug!(invocations, "emulating geometry shader invocations");

    let main = program
        .functions_mut()
        .find(|function| function.name == "main")
        .ok_or_else(|| malformed("geometry program has no main function"))?;
    main.name = INVOKE_FUNCTION.to_owned();

    program.elements.retain_mut(|element| {
        let ProgramElement::Layout(layout) = element else {
            return true;
        };
        match layout.direction {
            LayoutDirection::In => {
                layout
                    .qualifiers
                    .retain(|q| !matches!(q, LayoutQualifier::Invocations(_)));
                !layout.qualifiers.is_empty()
            }
            LayoutDirection::Out => {
                for qualifier in &mut layout.qualifiers {
                    if let LayoutQualifier::MaxVertices(max) = qualifier {
                        *max = max.saturating_mul(invocations);
                    }
                }
                true
            }
        }
    });

    let counter = || Expr::var(INVOCATION_COUNTER, Type::int());
    walk_program_exprs_mut(program, &mut |expr| {
        if matches!(expr.kind, ExprKind::Builtin(Builtin::InvocationId)) {
            *expr = counter();
        }
        Ok(())
    })?;
    ctx.declare_global(Decl::new(Storage::Auto, INVOCATION_COUNTER, Type::int()));

    let count = Expr::int(i64::from(invocations));
    let invocation_loop = Stmt::For {
        init: Some(Box::new(Stmt::assign(counter(), Expr::int(0)))),
        cond: Some(Expr::binary(BinaryOp::Lt, counter(), count)),
        next: Some(Expr::unary(UnaryOp::PostIncrement, counter())),
        body: Box::new(Stmt::Block(vec![
            Stmt::Expr(Expr::call_user(INVOKE_FUNCTION, Vec::new(), Type::VOID)),
            Stmt::EndPrimitive,
        ])),
    };
    program
        .elements
        .push(ProgramElement::Function(Function::main(vec![invocation_loop])));
    Ok(())
}
