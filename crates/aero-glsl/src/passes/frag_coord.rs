//! Fragment-coordinate handling, render-target size uniforms and y-flip.
//!
//! Exactly one [`FragCoordPolicy`] applies per call. Render-target width/height references are
//! turned into uniforms under every policy, and y-flip adjustments run after the policy so they
//! see the final shape of position writes.

use tracing::debug;

use crate::context::GenContext;
use crate::error::{malformed, GlslError};
use crate::ir::{
    BinaryOp, Builtin, Callee, Decl, Expr, ExprKind, Intrinsic, Program, ProgramElement,
    ShaderStage, Stmt, Storage, SwizzleComponent, Type, UnaryOp,
};
use crate::profile::{FragCoordConvention, Profile, Quirks};
use crate::visit::{
    expand_stmts, program_any_expr, stmts_any_expr, walk_body_exprs_mut,
    walk_program_exprs_mut,
};
use crate::GlslOptions;

pub(crate) const RT_HEIGHT_UNIFORM: &str = "u_skRTHeight";
pub(crate) const RT_WIDTH_UNIFORM: &str = "u_skRTWidth";
const FLIPPED_COORD: &str = "sk_FragCoord";
const WORKAROUND_VARYING: &str = "sk_FragCoord_Workaround";
const WORKAROUND_INV_W: &str = "sk_FragCoord_InvW";
const WORKAROUND_RESOLVED: &str = "sk_FragCoord_Resolved";
const FRAG_COORD_CONVENTIONS_EXTENSION: &str = "GL_ARB_fragment_coord_conventions";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FragCoordPolicy {
    /// `gl_FragCoord` as-is, moved to the upper-left origin with a layout qualifier when needed.
    Direct { origin_upper_left: bool },
    /// Origin layout qualifier enabled through an extension pragma.
    LegacyExtension,
    /// `(x, height - y, z, w)` rebuilt from a height uniform at the top of each function.
    NormalizeViaUniform,
    /// The vertex stage forwards its clip position; the fragment stage rebuilds the coordinate.
    WorkaroundViaVarying,
}

impl FragCoordPolicy {
    pub(crate) fn select(profile: &Profile, options: GlslOptions) -> Self {
        if profile.has_quirk(Quirks::CANNOT_USE_FRAG_COORD) {
            return FragCoordPolicy::WorkaroundViaVarying;
        }
        if !options.flip_y {
            return FragCoordPolicy::Direct {
                origin_upper_left: false,
            };
        }
        match profile.frag_coord_convention {
            FragCoordConvention::None => FragCoordPolicy::NormalizeViaUniform,
            FragCoordConvention::LegacyExtension => FragCoordPolicy::LegacyExtension,
            FragCoordConvention::ModernLayout => FragCoordPolicy::Direct {
                origin_upper_left: true,
            },
        }
    }
}

fn is_frag_coord(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::Builtin(Builtin::FragCoord))
}

fn is_position_write(expr: &Expr) -> bool {
    matches!(
        &expr.kind,
        ExprKind::Binary { op, left, .. }
            if op.is_assignment() && matches!(left.kind, ExprKind::Builtin(Builtin::Position))
    )
}

pub(crate) fn apply(program: &mut Program, ctx: &mut GenContext<'_>) -> Result<(), GlslError> {
    substitute_render_target_size(program, ctx)?;

    let uses_coord = program_any_expr(program, &mut is_frag_coord);
    if uses_coord && program.stage != ShaderStage::Fragment {
        return Err(malformed(
            "fragment coordinate referenced outside the fragment stage",
        ));
    }

    let policy = FragCoordPolicy::select(ctx.profile, ctx.options);
    debug!(?policy, uses_coord, "fragment coordinate policy");
    match policy {
        FragCoordPolicy::Direct { origin_upper_left } => {
            if uses_coord && origin_upper_left {
                ctx.declare_frag_coord_origin_upper_left();
            }
        }
        FragCoordPolicy::LegacyExtension => {
            if uses_coord {
                ctx.require_extension_first(FRAG_COORD_CONVENTIONS_EXTENSION);
                ctx.declare_frag_coord_origin_upper_left();
            }
        }
        FragCoordPolicy::NormalizeViaUniform => {
            if uses_coord {
                declare_rt_height(ctx);
                reconstruct_per_function(program, ctx, FLIPPED_COORD, flipped_coord_prologue)?;
            }
        }
        FragCoordPolicy::WorkaroundViaVarying => match program.stage {
            ShaderStage::Vertex => {
                ctx.declare_global(Decl::new(Storage::Out, WORKAROUND_VARYING, Type::vec(4)));
                forward_position_writes(program)?;
            }
            ShaderStage::Fragment => {
                ctx.declare_global(Decl::new(Storage::In, WORKAROUND_VARYING, Type::vec(4)));
                if uses_coord {
                    reconstruct_per_function(
                        program,
                        ctx,
                        WORKAROUND_RESOLVED,
                        workaround_prologue,
                    )?;
                }
            }
            ShaderStage::Geometry => {}
        },
    }

    if ctx.options.flip_y {
        flip_y(program)?;
    }
    Ok(())
}

fn declare_rt_height(ctx: &mut GenContext<'_>) {
    ctx.declare_global(Decl::new(Storage::Uniform, RT_HEIGHT_UNIFORM, Type::float()));
    ctx.inputs.render_target_height = true;
}

fn declare_rt_width(ctx: &mut GenContext<'_>) {
    ctx.declare_global(Decl::new(Storage::Uniform, RT_WIDTH_UNIFORM, Type::float()));
    ctx.inputs.render_target_width = true;
}

fn substitute_render_target_size(
    program: &mut Program,
    ctx: &mut GenContext<'_>,
) -> Result<(), GlslError> {
    let mut uses_width = false;
    let mut uses_height = false;
    walk_program_exprs_mut(program, &mut |expr| {
        match expr.kind {
            ExprKind::Builtin(Builtin::Width) => {
                uses_width = true;
                *expr = Expr::var(RT_WIDTH_UNIFORM, Type::float());
            }
            ExprKind::Builtin(Builtin::Height) => {
                uses_height = true;
                *expr = Expr::var(RT_HEIGHT_UNIFORM, Type::float());
            }
            _ => {}
        }
        Ok(())
    })?;
    if uses_width {
        declare_rt_width(ctx);
    }
    if uses_height {
        declare_rt_height(ctx);
    }
    Ok(())
}

/// Rewrites coordinate references in every function that has any to `local`, and prepends the
/// statements that compute it.
fn reconstruct_per_function(
    program: &mut Program,
    ctx: &mut GenContext<'_>,
    local: &str,
    prologue: fn() -> Vec<Stmt>,
) -> Result<(), GlslError> {
    for (index, element) in program.elements.iter_mut().enumerate() {
        let ProgramElement::Function(function) = element else {
            continue;
        };
        if !stmts_any_expr(&function.body, &mut is_frag_coord) {
            continue;
        }
        if !ctx.mark_reconstructed(index) {
            continue;
        }
        walk_body_exprs_mut(&mut function.body, &mut |expr| {
            if is_frag_coord(expr) {
                *expr = Expr::var(local, Type::vec(4));
            }
            Ok(())
        })?;
        let mut body = prologue();
        body.append(&mut function.body);
        function.body = body;
    }
    Ok(())
}

fn component(base: Expr, components: &[SwizzleComponent]) -> Expr {
    Expr::swizzle(base, components.to_vec())
}

fn flipped_coord_prologue() -> Vec<Stmt> {
    use SwizzleComponent::{W, X, Y, Z};

    let coord = || Expr::builtin(Builtin::FragCoord);
    let height = Expr::var(RT_HEIGHT_UNIFORM, Type::float());
    let init = Expr::construct(
        Type::vec(4),
        vec![
            component(coord(), &[X]),
            Expr::binary(BinaryOp::Sub, height, component(coord(), &[Y])),
            component(coord(), &[Z]),
            component(coord(), &[W]),
        ],
    );
    vec![Stmt::VarDecl(Decl::local(
        FLIPPED_COORD,
        Type::vec(4),
        Some(init),
    ))]
}

fn workaround_prologue() -> Vec<Stmt> {
    use SwizzleComponent::{W, X, Y, Z};

    let varying = || Expr::var(WORKAROUND_VARYING, Type::vec(4));
    let inv_w = || Expr::var(WORKAROUND_INV_W, Type::float());
    let resolved = || Expr::var(WORKAROUND_RESOLVED, Type::vec(4));

    let inv_w_init = Expr::binary(BinaryOp::Div, Expr::float(1.0), component(varying(), &[W]));
    let resolved_init = Expr::construct(
        Type::vec(4),
        vec![
            Expr::binary(BinaryOp::Mul, component(varying(), &[X, Y, Z]), inv_w()),
            inv_w(),
        ],
    );
    // Snap to the pixel center.
    let snapped = Expr::binary(
        BinaryOp::Add,
        Expr::call(Intrinsic::Floor, vec![component(resolved(), &[X, Y])]),
        Expr::construct(Type::vec(2), vec![Expr::float(0.5)]),
    );
    vec![
        Stmt::VarDecl(Decl::local(WORKAROUND_INV_W, Type::float(), Some(inv_w_init))),
        Stmt::VarDecl(Decl::local(
            WORKAROUND_RESOLVED,
            Type::vec(4),
            Some(resolved_init),
        )),
        Stmt::assign(component(resolved(), &[X, Y]), snapped),
    ]
}

/// `p = e` becomes `sk_FragCoord_Workaround = (p = e)` wherever the clip position is written.
fn forward_position_writes(program: &mut Program) -> Result<(), GlslError> {
    walk_program_exprs_mut(program, &mut |expr| {
        if is_position_write(expr) {
            let write = expr.take();
            *expr = Expr::assign(Expr::var(WORKAROUND_VARYING, Type::vec(4)), write);
        }
        Ok(())
    })
}

/// Whether `target`, written through swizzles, indexing or ternary arms, lands in the clip
/// position.
fn targets_position(target: &Expr) -> bool {
    match &target.kind {
        ExprKind::Builtin(Builtin::Position) => true,
        ExprKind::Swizzle { base, .. } | ExprKind::Index { base, .. } => targets_position(base),
        ExprKind::Ternary {
            if_true, if_false, ..
        } => targets_position(if_true) || targets_position(if_false),
        _ => false,
    }
}

fn writes_position(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Binary { op, left, .. } => op.is_assignment() && targets_position(left),
        ExprKind::Unary { op, operand } => op.mutates_operand() && targets_position(operand),
        _ => false,
    }
}

/// Vertex programs negate clip y once on every exit from `main`; geometry programs negate it
/// right before each emitted vertex.
fn flip_y(program: &mut Program) -> Result<(), GlslError> {
    match program.stage {
        ShaderStage::Fragment => walk_program_exprs_mut(program, &mut |expr| {
            if matches!(
                &expr.kind,
                ExprKind::Call {
                    callee: Callee::Intrinsic(Intrinsic::Dfdy),
                    ..
                }
            ) {
                let derivative = expr.take();
                *expr = Expr::unary(UnaryOp::Neg, derivative);
            }
            Ok(())
        }),
        ShaderStage::Vertex => {
            if !program_any_expr(program, &mut writes_position) {
                return Ok(());
            }
            let Some(main) = program.functions_mut().find(|function| function.name == "main") else {
                return Ok(());
            };
            expand_stmts(&mut main.body, &mut |stmt| match stmt {
                Stmt::Return(_) => Ok(vec![negate_position_y(), stmt]),
                stmt => Ok(vec![stmt]),
            })?;
            if !matches!(main.body.last(), Some(Stmt::Return(_))) {
                main.body.push(negate_position_y());
            }
            Ok(())
        }
        ShaderStage::Geometry => {
            if !program_any_expr(program, &mut writes_position) {
                return Ok(());
            }
            for function in program.functions_mut() {
                expand_stmts(&mut function.body, &mut |stmt| match stmt {
                    Stmt::EmitVertex => Ok(vec![negate_position_y(), stmt]),
                    stmt => Ok(vec![stmt]),
                })?;
            }
            Ok(())
        }
    }
}

/// `gl_Position.y = -1.0 * gl_Position.y;`
fn negate_position_y() -> Stmt {
    let y = || component(Expr::builtin(Builtin::Position), &[SwizzleComponent::Y]);
    Stmt::assign(
        y(),
        Expr::binary(BinaryOp::Mul, Expr::float(-1.0), y()),
    )
}
