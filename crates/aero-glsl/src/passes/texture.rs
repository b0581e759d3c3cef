//! Resolves dialect-neutral sample calls to concrete texture entry points.

use crate::context::GenContext;
use crate::error::{malformed, GlslError};
use crate::ir::{BaseType, Callee, Expr, ExprKind, Intrinsic, Program, SamplerDim};
use crate::visit::walk_program_exprs_mut;

/// Mip bias appended when the profile sharpens textures.
const SHARPEN_BIAS: f64 = -0.5;

pub(crate) fn apply(program: &mut Program, ctx: &mut GenContext<'_>) -> Result<(), GlslError> {
    let legacy = ctx.profile.generation.is_legacy();
    let sharpen = ctx.profile.sharpen_mipmap_levels;
    walk_program_exprs_mut(program, &mut |expr| {
        let ExprKind::Call { callee, args } = &mut expr.kind else {
            return Ok(());
        };
        if *callee != Callee::Intrinsic(Intrinsic::Sample) {
            return Ok(());
        }
        let (dim, projective) = classify(args)?;
        *callee = Callee::Intrinsic(entry_point(dim, projective, legacy));
        // Rectangle textures have no mip chain to bias into.
        if sharpen && dim != SamplerDim::Rect && args.len() == 2 {
            args.push(Expr::float(SHARPEN_BIAS));
        }
        Ok(())
    })
}

/// Sampler dimensionality and whether the coordinate carries an extra divisor component.
fn classify(args: &[Expr]) -> Result<(SamplerDim, bool), GlslError> {
    let (Some(sampler), Some(coord)) = (args.first(), args.get(1)) else {
        return Err(malformed("sample call needs a sampler and a coordinate"));
    };
    let BaseType::Sampler(dim) = sampler.ty.base else {
        return Err(malformed("first argument of a sample call is not a sampler"));
    };
    let arity = coord.ty.swizzle_width().unwrap_or(0);
    let direct = dim.coordinate_count();
    if arity == direct {
        Ok((dim, false))
    } else if arity == direct + 1 {
        Ok((dim, true))
    } else {
        Err(malformed(format!(
            "{arity}-component coordinate cannot sample a {dim:?} sampler"
        )))
    }
}

fn entry_point(dim: SamplerDim, projective: bool, legacy: bool) -> Intrinsic {
    if !legacy {
        return if projective {
            Intrinsic::TextureProj
        } else {
            Intrinsic::Texture
        };
    }
    match (dim, projective) {
        (SamplerDim::D1, false) => Intrinsic::Texture1D,
        (SamplerDim::D1, true) => Intrinsic::Texture1DProj,
        (SamplerDim::D2, false) => Intrinsic::Texture2D,
        (SamplerDim::D2, true) => Intrinsic::Texture2DProj,
        (SamplerDim::Rect, false) => Intrinsic::Texture2DRect,
        (SamplerDim::Rect, true) => Intrinsic::Texture2DRectProj,
    }
}
