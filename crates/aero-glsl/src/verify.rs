//! Structural checks run before any rewrite.
//!
//! The rewrite rules assume these preconditions and never fail on their own, so anything a
//! front-end bug could produce is rejected here with [`GlslError::MalformedIr`].

use crate::error::{malformed, GlslError};
use crate::ir::{Expr, ExprKind, Program, ProgramElement, Stmt};
use crate::limits::{MAX_IR_NESTING_DEPTH, MAX_SWIZZLE_COMPONENTS};

type Result<T> = std::result::Result<T, GlslError>;

pub(crate) fn verify_program(program: &Program) -> Result<()> {
    for element in &program.elements {
        match element {
            ProgramElement::Global(decl) => {
                if let Some(init) = &decl.init {
                    verify_expr(init, 1, false)?;
                }
            }
            ProgramElement::Function(function) => {
                for stmt in &function.body {
                    verify_stmt(stmt, 1)?;
                }
            }
            ProgramElement::Layout(_) => {}
        }
    }
    Ok(())
}

fn check_depth(depth: usize) -> Result<()> {
    if depth > MAX_IR_NESTING_DEPTH {
        return Err(malformed(format!(
            "IR nesting exceeds the maximum depth of {MAX_IR_NESTING_DEPTH}"
        )));
    }
    Ok(())
}

fn verify_stmt(stmt: &Stmt, depth: usize) -> Result<()> {
    check_depth(depth)?;
    let next = depth + 1;
    match stmt {
        Stmt::Block(stmts) => {
            for stmt in stmts {
                verify_stmt(stmt, next)?;
            }
        }
        Stmt::VarDecl(decl) => {
            if let Some(init) = &decl.init {
                verify_expr(init, next, false)?;
            }
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            verify_expr(cond, next, false)?;
            verify_stmt(then_branch, next)?;
            if let Some(else_branch) = else_branch {
                verify_stmt(else_branch, next)?;
            }
        }
        Stmt::For {
            init,
            cond,
            next: step,
            body,
        } => {
            if let Some(init) = init {
                if !matches!(init.as_ref(), Stmt::VarDecl(_) | Stmt::Expr(_)) {
                    return Err(malformed(
                        "for-loop initializer must be a declaration or an expression",
                    ));
                }
                verify_stmt(init, next)?;
            }
            if let Some(cond) = cond {
                verify_expr(cond, next, false)?;
            }
            if let Some(step) = step {
                verify_expr(step, next, false)?;
            }
            verify_stmt(body, next)?;
        }
        Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
            verify_expr(cond, next, false)?;
            verify_stmt(body, next)?;
        }
        Stmt::Switch { value, cases } => {
            verify_expr(value, next, false)?;
            for case in cases {
                for stmt in &case.body {
                    verify_stmt(stmt, next)?;
                }
            }
        }
        Stmt::Expr(expr) | Stmt::Return(Some(expr)) => verify_expr(expr, next, false)?,
        Stmt::Return(None)
        | Stmt::Break
        | Stmt::Continue
        | Stmt::Discard
        | Stmt::EmitVertex
        | Stmt::EndPrimitive => {}
    }
    Ok(())
}

/// `target` is set while checking an expression that is written to.
fn verify_expr(expr: &Expr, depth: usize, target: bool) -> Result<()> {
    check_depth(depth)?;
    let next = depth + 1;
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Var(_) | ExprKind::Builtin(_) => {}
        ExprKind::Unary { op, operand } => verify_expr(operand, next, op.mutates_operand())?,
        ExprKind::Binary { op, left, right } => {
            verify_expr(left, next, op.is_assignment())?;
            verify_expr(right, next, false)?;
        }
        ExprKind::Ternary {
            cond,
            if_true,
            if_false,
        } => {
            verify_expr(cond, next, false)?;
            verify_expr(if_true, next, target)?;
            verify_expr(if_false, next, target)?;
        }
        ExprKind::Call { args, .. } | ExprKind::Construct { args } => {
            for arg in args {
                verify_expr(arg, next, false)?;
            }
        }
        ExprKind::Swizzle { base, components } => {
            if components.is_empty() || components.len() > MAX_SWIZZLE_COMPONENTS {
                return Err(malformed(format!(
                    "swizzle mask has {} components",
                    components.len()
                )));
            }
            if target && components.iter().any(|c| c.is_literal()) {
                return Err(malformed(
                    "assignment target is a swizzle containing a literal selector",
                ));
            }
            let width = base
                .ty
                .swizzle_width()
                .ok_or_else(|| malformed("swizzle applied to a non-vector expression"))?;
            if let Some(c) = components
                .iter()
                .find(|c| c.index().is_some_and(|i| i >= width))
            {
                return Err(malformed(format!(
                    "swizzle selector `{}` is out of range for a {width}-component value",
                    c.as_char()
                )));
            }
            verify_expr(base, next, target)?;
        }
        ExprKind::Index { base, index } => {
            verify_expr(base, next, target)?;
            verify_expr(index, next, false)?;
        }
        ExprKind::Group(inner) => verify_expr(inner, next, target)?,
    }
    Ok(())
}
