//! Traversal helpers shared by the rewrite rules.
//!
//! Expression walks are post-order: children are rewritten before their parent sees them, and a
//! node the callback replaces is not walked again. Statement walks are pre-order.

use crate::error::GlslError;
use crate::ir::{Expr, ExprKind, Program, ProgramElement, Stmt};

type Result<T> = std::result::Result<T, GlslError>;

pub(crate) fn walk_expr_mut<F>(expr: &mut Expr, f: &mut F) -> Result<()>
where
    F: FnMut(&mut Expr) -> Result<()>,
{
    match &mut expr.kind {
        ExprKind::Literal(_) | ExprKind::Var(_) | ExprKind::Builtin(_) => {}
        ExprKind::Unary { operand, .. } => walk_expr_mut(operand, f)?,
        ExprKind::Binary { left, right, .. } => {
            walk_expr_mut(left, f)?;
            walk_expr_mut(right, f)?;
        }
        ExprKind::Ternary {
            cond,
            if_true,
            if_false,
        } => {
            walk_expr_mut(cond, f)?;
            walk_expr_mut(if_true, f)?;
            walk_expr_mut(if_false, f)?;
        }
        ExprKind::Call { args, .. } | ExprKind::Construct { args } => {
            for arg in args {
                walk_expr_mut(arg, f)?;
            }
        }
        ExprKind::Swizzle { base, .. } | ExprKind::Group(base) => walk_expr_mut(base, f)?,
        ExprKind::Index { base, index } => {
            walk_expr_mut(base, f)?;
            walk_expr_mut(index, f)?;
        }
    }
    f(expr)
}

/// Visits every statement in `stmts`, including nested ones, parents first.
pub(crate) fn for_each_stmt_mut<F>(stmts: &mut [Stmt], f: &mut F) -> Result<()>
where
    F: FnMut(&mut Stmt) -> Result<()>,
{
    for stmt in stmts {
        visit_stmt_mut(stmt, f)?;
    }
    Ok(())
}

fn visit_stmt_mut<F>(stmt: &mut Stmt, f: &mut F) -> Result<()>
where
    F: FnMut(&mut Stmt) -> Result<()>,
{
    f(stmt)?;
    match stmt {
        Stmt::Block(stmts) => for_each_stmt_mut(stmts, f)?,
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            visit_stmt_mut(then_branch, f)?;
            if let Some(else_branch) = else_branch {
                visit_stmt_mut(else_branch, f)?;
            }
        }
        Stmt::For { init, body, .. } => {
            if let Some(init) = init {
                visit_stmt_mut(init, f)?;
            }
            visit_stmt_mut(body, f)?;
        }
        Stmt::While { body, .. } | Stmt::DoWhile { body, .. } => visit_stmt_mut(body, f)?,
        Stmt::Switch { cases, .. } => {
            for case in cases {
                for_each_stmt_mut(&mut case.body, f)?;
            }
        }
        Stmt::VarDecl(_)
        | Stmt::Expr(_)
        | Stmt::Return(_)
        | Stmt::Break
        | Stmt::Continue
        | Stmt::Discard
        | Stmt::EmitVertex
        | Stmt::EndPrimitive => {}
    }
    Ok(())
}

/// Walks the expressions owned directly by `stmt` (not those of nested statements).
pub(crate) fn walk_own_exprs_mut<F>(stmt: &mut Stmt, f: &mut F) -> Result<()>
where
    F: FnMut(&mut Expr) -> Result<()>,
{
    match stmt {
        Stmt::VarDecl(decl) => {
            if let Some(init) = &mut decl.init {
                walk_expr_mut(init, f)?;
            }
        }
        Stmt::If { cond, .. } | Stmt::While { cond, .. } | Stmt::DoWhile { cond, .. } => {
            walk_expr_mut(cond, f)?
        }
        Stmt::For { cond, next, .. } => {
            if let Some(cond) = cond {
                walk_expr_mut(cond, f)?;
            }
            if let Some(next) = next {
                walk_expr_mut(next, f)?;
            }
        }
        Stmt::Switch { value, .. } => walk_expr_mut(value, f)?,
        Stmt::Expr(expr) | Stmt::Return(Some(expr)) => walk_expr_mut(expr, f)?,
        Stmt::Block(_)
        | Stmt::Return(None)
        | Stmt::Break
        | Stmt::Continue
        | Stmt::Discard
        | Stmt::EmitVertex
        | Stmt::EndPrimitive => {}
    }
    Ok(())
}

pub(crate) fn walk_body_exprs_mut<F>(body: &mut [Stmt], f: &mut F) -> Result<()>
where
    F: FnMut(&mut Expr) -> Result<()>,
{
    for_each_stmt_mut(body, &mut |stmt| walk_own_exprs_mut(stmt, f))
}

/// Walks every expression in the program: global initializers and function bodies.
pub(crate) fn walk_program_exprs_mut<F>(program: &mut Program, f: &mut F) -> Result<()>
where
    F: FnMut(&mut Expr) -> Result<()>,
{
    for element in &mut program.elements {
        match element {
            ProgramElement::Global(decl) => {
                if let Some(init) = &mut decl.init {
                    walk_expr_mut(init, f)?;
                }
            }
            ProgramElement::Function(function) => walk_body_exprs_mut(&mut function.body, f)?,
            ProgramElement::Layout(_) => {}
        }
    }
    Ok(())
}

/// Rewrites statement lists, letting `f` replace one statement with any number of statements.
///
/// `f` sees a statement before its children, and the children of whatever it returns are
/// visited afterwards. Where a single statement is expected (an `if` branch, a loop body) a
/// multi-statement expansion is wrapped in a block.
pub(crate) fn expand_stmts<F>(stmts: &mut Vec<Stmt>, f: &mut F) -> Result<()>
where
    F: FnMut(Stmt) -> Result<Vec<Stmt>>,
{
    let mut out = Vec::with_capacity(stmts.len());
    for stmt in stmts.drain(..) {
        for mut expanded in f(stmt)? {
            expand_children(&mut expanded, f)?;
            out.push(expanded);
        }
    }
    *stmts = out;
    Ok(())
}

fn expand_single<F>(slot: &mut Box<Stmt>, f: &mut F) -> Result<()>
where
    F: FnMut(Stmt) -> Result<Vec<Stmt>>,
{
    let stmt = std::mem::replace(slot.as_mut(), Stmt::Block(Vec::new()));
    let mut stmts = vec![stmt];
    expand_stmts(&mut stmts, f)?;
    **slot = Stmt::from_vec(stmts);
    Ok(())
}

fn expand_children<F>(stmt: &mut Stmt, f: &mut F) -> Result<()>
where
    F: FnMut(Stmt) -> Result<Vec<Stmt>>,
{
    match stmt {
        Stmt::Block(stmts) => expand_stmts(stmts, f)?,
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            expand_single(then_branch, f)?;
            if let Some(else_branch) = else_branch {
                expand_single(else_branch, f)?;
            }
        }
        // A `for` initializer has to stay a single declaration or expression.
        Stmt::For { body, .. } | Stmt::While { body, .. } | Stmt::DoWhile { body, .. } => {
            expand_single(body, f)?
        }
        Stmt::Switch { cases, .. } => {
            for case in cases {
                expand_stmts(&mut case.body, f)?;
            }
        }
        Stmt::VarDecl(_)
        | Stmt::Expr(_)
        | Stmt::Return(_)
        | Stmt::Break
        | Stmt::Continue
        | Stmt::Discard
        | Stmt::EmitVertex
        | Stmt::EndPrimitive => {}
    }
    Ok(())
}

pub(crate) fn expr_any<P>(expr: &Expr, pred: &mut P) -> bool
where
    P: FnMut(&Expr) -> bool,
{
    if pred(expr) {
        return true;
    }
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Var(_) | ExprKind::Builtin(_) => false,
        ExprKind::Unary { operand, .. } => expr_any(operand, pred),
        ExprKind::Binary { left, right, .. } => expr_any(left, pred) || expr_any(right, pred),
        ExprKind::Ternary {
            cond,
            if_true,
            if_false,
        } => expr_any(cond, pred) || expr_any(if_true, pred) || expr_any(if_false, pred),
        ExprKind::Call { args, .. } | ExprKind::Construct { args } => {
            args.iter().any(|arg| expr_any(arg, pred))
        }
        ExprKind::Swizzle { base, .. } | ExprKind::Group(base) => expr_any(base, pred),
        ExprKind::Index { base, index } => expr_any(base, pred) || expr_any(index, pred),
    }
}

pub(crate) fn stmts_any_expr<P>(stmts: &[Stmt], pred: &mut P) -> bool
where
    P: FnMut(&Expr) -> bool,
{
    stmts.iter().any(|stmt| stmt_any_expr(stmt, pred))
}

fn stmt_any_expr<P>(stmt: &Stmt, pred: &mut P) -> bool
where
    P: FnMut(&Expr) -> bool,
{
    match stmt {
        Stmt::Block(stmts) => stmts_any_expr(stmts, pred),
        Stmt::VarDecl(decl) => decl.init.as_ref().is_some_and(|init| expr_any(init, pred)),
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            expr_any(cond, pred)
                || stmt_any_expr(then_branch, pred)
                || else_branch
                    .as_ref()
                    .is_some_and(|else_branch| stmt_any_expr(else_branch, pred))
        }
        Stmt::For {
            init,
            cond,
            next,
            body,
        } => {
            init.as_ref().is_some_and(|init| stmt_any_expr(init, pred))
                || cond.as_ref().is_some_and(|cond| expr_any(cond, pred))
                || next.as_ref().is_some_and(|next| expr_any(next, pred))
                || stmt_any_expr(body, pred)
        }
        Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
            expr_any(cond, pred) || stmt_any_expr(body, pred)
        }
        Stmt::Switch { value, cases } => {
            expr_any(value, pred) || cases.iter().any(|case| stmts_any_expr(&case.body, pred))
        }
        Stmt::Expr(expr) | Stmt::Return(Some(expr)) => expr_any(expr, pred),
        Stmt::Return(None)
        | Stmt::Break
        | Stmt::Continue
        | Stmt::Discard
        | Stmt::EmitVertex
        | Stmt::EndPrimitive => false,
    }
}

pub(crate) fn program_any_expr<P>(program: &Program, pred: &mut P) -> bool
where
    P: FnMut(&Expr) -> bool,
{
    program.elements.iter().any(|element| match element {
        ProgramElement::Global(decl) => {
            decl.init.as_ref().is_some_and(|init| expr_any(init, pred))
        }
        ProgramElement::Function(function) => stmts_any_expr(&function.body, pred),
        ProgramElement::Layout(_) => false,
    })
}
