//! Swizzle algebra.
//!
//! Runs last so it also cleans up swizzles introduced by earlier rules. After it runs:
//! - no swizzle is applied directly to another swizzle;
//! - no swizzle contains a `0`/`1` selector, those become constructor arguments, with at most
//!   one permuting swizzle on top;
//! - swizzles that select nothing new (identity masks, `.x` of a scalar) are gone.
//!
//! The result is a fixed point: optimizing it again changes nothing.

use crate::context::GenContext;
use crate::error::{malformed, GlslError};
use crate::ir::{BinaryOp, Expr, ExprKind, Program, ScalarKind, SwizzleComponent, Type};
use crate::limits::MAX_SWIZZLE_COMPONENTS;
use crate::visit::{walk_expr_mut, walk_program_exprs_mut};

/// Optimizes every swizzle in `expr`, innermost first.
pub fn optimize_swizzles(mut expr: Expr) -> Result<Expr, GlslError> {
    walk_expr_mut(&mut expr, &mut optimize_node)?;
    Ok(expr)
}

pub(crate) fn apply(program: &mut Program, _: &mut GenContext<'_>) -> Result<(), GlslError> {
    walk_program_exprs_mut(program, &mut optimize_node)
}

fn optimize_node(expr: &mut Expr) -> Result<(), GlslError> {
    let ty = expr.ty;
    let ExprKind::Swizzle { base, components } = &mut expr.kind else {
        return Ok(());
    };
    let mut base = base.take();
    let mut components = std::mem::take(components);

    if let ExprKind::Swizzle {
        base: inner_base,
        components: inner,
    } = &mut base.kind
    {
        if let Some(composed) = compose(inner, &components) {
            components = composed;
            base = inner_base.take();
        }
    }

    let width = base
        .ty
        .swizzle_width()
        .ok_or_else(|| malformed("swizzle of a non-vector expression"))?;
    if components.is_empty() || components.len() > MAX_SWIZZLE_COMPONENTS {
        return Err(malformed(format!(
            "swizzle mask has {} components",
            components.len()
        )));
    }
    if let Some(bad) = components
        .iter()
        .find(|c| c.index().is_some_and(|index| index >= width))
    {
        return Err(malformed(format!(
            "swizzle selector `{}` is out of range for a {width}-component value",
            bad.as_char()
        )));
    }

    *expr = lower(base, components, ty)?;
    Ok(())
}

/// `e.inner.outer` as a single mask over `e`, or `None` if `outer` reaches past `inner`.
fn compose(
    inner: &[SwizzleComponent],
    outer: &[SwizzleComponent],
) -> Option<Vec<SwizzleComponent>> {
    outer
        .iter()
        .map(|component| match component.index() {
            Some(index) => inner.get(index).copied(),
            None => Some(*component),
        })
        .collect()
}

fn is_identity(components: &[SwizzleComponent], width: usize) -> bool {
    components.len() == width
        && components
            .iter()
            .enumerate()
            .all(|(i, component)| component.index() == Some(i))
}

/// Applies a literal-free mask, eliding it when it selects the value unchanged and splatting
/// scalars through a constructor.
fn select(base: Expr, components: Vec<SwizzleComponent>) -> Expr {
    if base.ty.is_scalar() {
        if components.len() == 1 {
            return base;
        }
        let kind = base.ty.scalar_kind().unwrap_or(ScalarKind::Float);
        let ty = Type::with_components(kind, components.len(), base.ty.precision);
        return Expr::construct(ty, vec![base]);
    }
    if base
        .ty
        .swizzle_width()
        .is_some_and(|width| is_identity(&components, width))
    {
        return base;
    }
    Expr::swizzle(base, components)
}

fn lower(base: Expr, components: Vec<SwizzleComponent>, ty: Type) -> Result<Expr, GlslError> {
    if !components.iter().any(|c| c.is_literal()) {
        return Ok(select(base, components));
    }

    let kind = base.ty.scalar_kind().unwrap_or(ScalarKind::Float);
    let (selected, literals): (Vec<_>, Vec<_>) =
        components.iter().copied().partition(|c| !c.is_literal());
    let literal_values = literals
        .iter()
        .map(|c| Expr::unit(kind, *c == SwizzleComponent::One));

    if selected.is_empty() {
        let constant = Expr::construct(ty, literal_values.collect());
        // `f().01` still calls `f`: `(f(), vec2(0.0, 1.0))`.
        if base.has_side_effects() {
            return Ok(Expr::binary(BinaryOp::Comma, base, constant));
        }
        return Ok(constant);
    }

    // Constructor slots: the selected components first, then the literals.
    let mut next_selected = 0;
    let mut next_literal = selected.len();
    let order = components
        .iter()
        .map(|c| {
            let slot = if c.is_literal() {
                &mut next_literal
            } else {
                &mut next_selected
            };
            let index = *slot;
            *slot += 1;
            SwizzleComponent::from_index(index)
        })
        .collect();

    let mut args = vec![select(base, selected)];
    args.extend(literal_values);
    let mut lowered = select(Expr::construct(ty, args), order);
    lowered.ty = ty;
    Ok(lowered)
}
