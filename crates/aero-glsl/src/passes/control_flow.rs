//! Loop and control-flow desugaring.

use crate::context::GenContext;
use crate::error::{unsupported, GlslError};
use crate::ir::{BinaryOp, Decl, Expr, ExprKind, Program, ProgramElement, Stmt, Type, UnaryOp};
use crate::profile::Quirks;
use crate::visit::{expand_stmts, for_each_stmt_mut, program_any_expr, walk_program_exprs_mut};

const LOOP_SEEN_ONCE: &str = "_tmpLoopSeenOnce";

fn is_ternary_target(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Binary { op, left, .. } if op.is_assignment() => {
            matches!(left.kind, ExprKind::Ternary { .. })
        }
        ExprKind::Unary { op, operand } if op.mutates_operand() => {
            matches!(operand.kind, ExprKind::Ternary { .. })
        }
        _ => false,
    }
}

/// Ternary assignment targets.
///
/// A target whose condition is a boolean literal collapses to the selected branch. On profiles
/// that cannot write through a ternary, statement-level `c ? a : b = v;` becomes an `if`/`else`
/// of single assignments; a ternary target buried inside a larger expression has no such
/// lowering and is rejected.
pub(crate) fn lower_ternary_lvalues(
    program: &mut Program,
    ctx: &mut GenContext<'_>,
) -> Result<(), GlslError> {
    walk_program_exprs_mut(program, &mut |expr| {
        let target = match &mut expr.kind {
            ExprKind::Binary { op, left, .. } if op.is_assignment() => left,
            ExprKind::Unary { op, operand } if op.mutates_operand() => operand,
            _ => return Ok(()),
        };
        while let ExprKind::Ternary {
            cond,
            if_true,
            if_false,
        } = &mut target.kind
        {
            let Some(selected) = cond.as_bool_literal() else {
                break;
            };
            let branch = if selected { if_true } else { if_false };
            let branch = branch.take();
            **target = branch;
        }
        Ok(())
    })?;

    if !ctx.profile.has_quirk(Quirks::LOWERS_TERNARY_LVALUES) {
        return Ok(());
    }

    for function in program.functions_mut() {
        expand_stmts(&mut function.body, &mut |stmt| Ok(vec![split_ternary_assignment(stmt)]))?;
    }
    if program_any_expr(program, &mut is_ternary_target) {
        return Err(unsupported(
            ctx.profile,
            "ternary assignment target inside a larger expression",
        ));
    }
    Ok(())
}

fn split_ternary_assignment(stmt: Stmt) -> Stmt {
    match stmt {
        Stmt::Expr(Expr {
            kind: ExprKind::Binary { op, left, right },
            ty,
        }) if op.is_assignment() => {
            let left_ty = left.ty;
            match left.kind {
                ExprKind::Ternary {
                    cond,
                    if_true,
                    if_false,
                } => {
                    let value = *right;
                    let assign = |target: Expr, value: Expr| {
                        Stmt::Block(vec![Stmt::Expr(Expr::binary(op, target, value))])
                    };
                    Stmt::If {
                        cond: *cond,
                        then_branch: Box::new(assign(*if_true, value.clone())),
                        else_branch: Some(Box::new(assign(*if_false, value))),
                    }
                }
                kind => Stmt::Expr(Expr::new(
                    ExprKind::Binary {
                        op,
                        left: Box::new(Expr::new(kind, left_ty)),
                        right,
                    },
                    ty,
                )),
            }
        }
        other => other,
    }
}

/// `do { body } while (c);` becomes
///
/// ```text
/// bool _tmpLoopSeenOnceN = false;
/// while (true) {
///     if (_tmpLoopSeenOnceN) {
///         if (!(c)) {
///             break;
///         }
///     }
///     _tmpLoopSeenOnceN = true;
///     { body }
/// }
/// ```
///
/// Flags are numbered outermost first. A `continue` in the body still reaches the condition
/// check because the flag is set before the body runs.
pub(crate) fn rewrite_do_while(
    program: &mut Program,
    ctx: &mut GenContext<'_>,
) -> Result<(), GlslError> {
    for function in program.functions_mut() {
        expand_stmts(&mut function.body, &mut |stmt| {
            let Stmt::DoWhile { body, cond } = stmt else {
                return Ok(vec![stmt]);
            };
            let seen_once = ctx.fresh_name(LOOP_SEEN_ONCE);
            let flag = || Expr::var(seen_once.as_str(), Type::bool());

            let exit_check = Stmt::If {
                cond: flag(),
                then_branch: Box::new(Stmt::Block(vec![Stmt::If {
                    cond: Expr::unary(UnaryOp::Not, cond),
                    then_branch: Box::new(Stmt::Block(vec![Stmt::Break])),
                    else_branch: None,
                }])),
                else_branch: None,
            };
            let body = match *body {
                block @ Stmt::Block(_) => block,
                other => Stmt::Block(vec![other]),
            };
            let loop_body = vec![exit_check, Stmt::assign(flag(), Expr::bool(true)), body];
            Ok(vec![
                Stmt::VarDecl(Decl::local(
                    seen_once.clone(),
                    Type::bool(),
                    Some(Expr::bool(false)),
                )),
                Stmt::While {
                    cond: Expr::bool(true),
                    body: Box::new(Stmt::Block(loop_body)),
                },
            ])
        })?;
    }
    Ok(())
}

/// `a && b` → `a ? b : false`, `a || b` → `a ? true : b`, innermost first.
pub(crate) fn unfold_short_circuit(
    program: &mut Program,
    _: &mut GenContext<'_>,
) -> Result<(), GlslError> {
    walk_program_exprs_mut(program, &mut |expr| {
        let ExprKind::Binary { op, left, right } = &mut expr.kind else {
            return Ok(());
        };
        let unfolded = match op {
            BinaryOp::LogicalAnd => Expr::ternary(left.take(), right.take(), Expr::bool(false)),
            BinaryOp::LogicalOr => Expr::ternary(left.take(), Expr::bool(true), right.take()),
            _ => return Ok(()),
        };
        *expr = unfolded;
        Ok(())
    })
}

/// Exit condition `c` of a loop produced by [`rewrite_do_while`], found through the
/// `if (flag) { if (!(c)) { break; } }` check that opens its body.
fn rewritten_do_while_condition(body: &mut Stmt) -> Option<&mut Expr> {
    let Stmt::Block(stmts) = body else {
        return None;
    };
    let Some(Stmt::If {
        cond: flag,
        then_branch,
        else_branch: None,
    }) = stmts.first_mut()
    else {
        return None;
    };
    if !matches!(&flag.kind, ExprKind::Var(name) if name.starts_with(LOOP_SEEN_ONCE)) {
        return None;
    }
    let Stmt::Block(check) = then_branch.as_mut() else {
        return None;
    };
    let [Stmt::If { cond, .. }] = check.as_mut_slice() else {
        return None;
    };
    match &mut cond.kind {
        ExprKind::Unary {
            op: UnaryOp::Not,
            operand,
        } => Some(operand.as_mut()),
        _ => None,
    }
}

/// Every loop condition `C` becomes `C && true`, including the exit check of a rewritten
/// do-while loop.
pub(crate) fn append_true_to_loop_conditions(
    program: &mut Program,
    _: &mut GenContext<'_>,
) -> Result<(), GlslError> {
    fn and_true(cond: &mut Expr) {
        let original = cond.take();
        *cond = Expr::binary(BinaryOp::LogicalAnd, original, Expr::bool(true));
    }

    for element in &mut program.elements {
        let ProgramElement::Function(function) = element else {
            continue;
        };
        for_each_stmt_mut(&mut function.body, &mut |stmt| {
            match stmt {
                Stmt::While { cond, body } => {
                    and_true(cond);
                    if let Some(exit) = rewritten_do_while_condition(body) {
                        and_true(exit);
                    }
                }
                Stmt::For {
                    cond: Some(cond), ..
                }
                | Stmt::DoWhile { cond, .. } => and_true(cond),
                _ => {}
            }
            Ok(())
        })?;
    }
    Ok(())
}
