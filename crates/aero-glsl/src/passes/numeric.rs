//! Workarounds for drivers that miscompile numeric built-ins.

use crate::context::GenContext;
use crate::error::{malformed, unsupported, GlslError};
use crate::ir::{
    BinaryOp, Callee, Decl, Expr, ExprKind, Function, Intrinsic, Param, Precision, Program,
    ProgramElement, ScalarKind, Stmt, Storage, SwizzleComponent, Type, UnaryOp,
};
use crate::visit::{expr_any, walk_body_exprs_mut, walk_expr_mut, walk_program_exprs_mut};

const ABS_EMULATION: &str = "_absemulation";
const MIN_ABS_TEMP: &str = "minAbsHackVar";
const FRACT_TEMP: &str = "fractHackVar";
const MIN_ABS_INIT: &str = "minAbsHackInit";
const FRACT_INIT: &str = "fractHackInit";

fn intrinsic_args(expr: &mut Expr, intrinsic: Intrinsic) -> Option<&mut Vec<Expr>> {
    match &mut expr.kind {
        ExprKind::Call {
            callee: Callee::Intrinsic(called),
            args,
        } if *called == intrinsic => Some(args),
        _ => None,
    }
}

/// `pow(b, k)` with a constant `k` becomes `exp2(k * log2(b))`.
pub(crate) fn rewrite_constant_exponent_pow(
    program: &mut Program,
    _: &mut GenContext<'_>,
) -> Result<(), GlslError> {
    walk_program_exprs_mut(program, &mut |expr| {
        let ty = expr.ty;
        let Some(args) = intrinsic_args(expr, Intrinsic::Pow) else {
            return Ok(());
        };
        let arity = args.len();
        let [base, exponent] = args.as_mut_slice() else {
            return Err(malformed(format!("pow takes 2 arguments, got {arity}")));
        };
        if !exponent.is_constant() {
            return Ok(());
        }
        let log = Expr::call(Intrinsic::Log2, vec![base.take()]);
        let product = Expr::binary(BinaryOp::Mul, exponent.take(), log);
        let mut rewritten = Expr::call(Intrinsic::Exp2, vec![product]);
        rewritten.ty = ty;
        *expr = rewritten;
        Ok(())
    })
}

/// Integer `abs(x)` calls a synthesized `x * sign(x)` helper instead. One overload is emitted
/// per integer type in use.
pub(crate) fn emulate_int_abs(
    program: &mut Program,
    ctx: &mut GenContext<'_>,
) -> Result<(), GlslError> {
    walk_program_exprs_mut(program, &mut |expr| {
        if expr.ty.scalar_kind() != Some(ScalarKind::Int) {
            return Ok(());
        }
        let ty = expr.ty.with_precision(Precision::Full);
        let ExprKind::Call { callee, .. } = &mut expr.kind else {
            return Ok(());
        };
        if *callee != Callee::Intrinsic(Intrinsic::Abs) {
            return Ok(());
        }
        *callee = Callee::User(ABS_EMULATION.to_owned());
        ctx.add_helper(format!("{ABS_EMULATION}:{:?}", ty.base), || {
            let x = || Expr::var("x", ty);
            let body = Expr::binary(
                BinaryOp::Mul,
                x(),
                Expr::call(Intrinsic::Sign, vec![x()]),
            );
            Function::new(
                ABS_EMULATION,
                ty,
                vec![Param::new("x", ty)],
                vec![Stmt::Return(Some(body))],
            )
        });
        Ok(())
    })
}

fn is_min_abs(expr: &Expr) -> bool {
    let ExprKind::Call {
        callee: Callee::Intrinsic(Intrinsic::Min),
        args,
    } = &expr.kind
    else {
        return false;
    };
    match args.as_slice() {
        [abs, _] => matches!(
            abs.kind,
            ExprKind::Call {
                callee: Callee::Intrinsic(Intrinsic::Abs),
                ..
            }
        ),
        _ => false,
    }
}

/// `min(abs(x), y)` becomes `((t0 = abs(x)) < (t1 = y) ? t0 : t1)`, with `t0`/`t1` declared at
/// the top of the enclosing function. Each operand is still evaluated exactly once and in the
/// original order.
///
/// Vectors compare per component:
/// `((t0 = abs(x), t1 = y), vec2(t0.x < t1.x ? t0.x : t1.x, t0.y < t1.y ? t0.y : t1.y))`.
/// Global initializers are moved into a function first so they get temporaries too.
pub(crate) fn split_min_abs(
    program: &mut Program,
    ctx: &mut GenContext<'_>,
) -> Result<(), GlslError> {
    hoist_global_initializers(program, ctx, MIN_ABS_INIT, &mut is_min_abs)?;
    for function in program.functions_mut() {
        let mut temps = Vec::new();
        walk_body_exprs_mut(&mut function.body, &mut |expr| {
            if !is_min_abs(expr) {
                return Ok(());
            }
            let ty = expr.ty;
            let Some([abs, other]) = intrinsic_args(expr, Intrinsic::Min).map(Vec::as_mut_slice)
            else {
                return Ok(());
            };
            let (abs, other) = (abs.take(), other.take());
            let first = declare_temp(ctx, &mut temps, MIN_ABS_TEMP, abs.ty);
            let second = declare_temp(ctx, &mut temps, MIN_ABS_TEMP, other.ty);
            let first_write = Expr::assign(first.clone(), abs);
            let second_write = Expr::assign(second.clone(), other);

            *expr = if ty.is_scalar() {
                let compare = Expr::binary(BinaryOp::Lt, first_write, second_write);
                Expr::group(Expr::ternary(compare, first, second))
            } else {
                let lanes = (0..ty.component_count())
                    .map(|lane| {
                        let (a, b) = (lane_of(&first, lane), lane_of(&second, lane));
                        Expr::ternary(Expr::binary(BinaryOp::Lt, a.clone(), b.clone()), a, b)
                    })
                    .collect();
                let writes = Expr::binary(BinaryOp::Comma, first_write, second_write);
                Expr::group(Expr::binary(
                    BinaryOp::Comma,
                    writes,
                    Expr::construct(ty, lanes),
                ))
            };
            Ok(())
        })?;
        temps.append(&mut function.body);
        function.body = temps;
    }
    Ok(())
}

/// Component `lane` of `value`; scalars broadcast.
fn lane_of(value: &Expr, lane: usize) -> Expr {
    if value.ty.is_scalar() {
        return value.clone();
    }
    Expr::swizzle(value.clone(), vec![SwizzleComponent::from_index(lane)])
}

/// Replaces each global initializer containing a match for `needs_rewrite` with a call to a
/// new function that returns it, declared right before the global:
/// `float g = min(abs(a), b);` becomes `float minAbsHackInit0() { return min(abs(a), b); }`
/// followed by `float g = minAbsHackInit0();`.
fn hoist_global_initializers<P>(
    program: &mut Program,
    ctx: &mut GenContext<'_>,
    prefix: &'static str,
    needs_rewrite: &mut P,
) -> Result<(), GlslError>
where
    P: FnMut(&Expr) -> bool,
{
    let mut elements = Vec::with_capacity(program.elements.len());
    for mut element in std::mem::take(&mut program.elements) {
        if let ProgramElement::Global(decl) = &mut element {
            if let Some(init) = hoist_initializer(decl, ctx, prefix, needs_rewrite)? {
                elements.push(ProgramElement::Function(init));
            }
        }
        elements.push(element);
    }
    program.elements = elements;
    Ok(())
}

fn hoist_initializer<P>(
    decl: &mut Decl,
    ctx: &mut GenContext<'_>,
    prefix: &'static str,
    needs_rewrite: &mut P,
) -> Result<Option<Function>, GlslError>
where
    P: FnMut(&Expr) -> bool,
{
    match &decl.init {
        Some(init) if expr_any(init, needs_rewrite) => {}
        _ => return Ok(None),
    }
    // Only plain globals may call a function in their initializer.
    if decl.storage != Storage::Auto {
        return Err(unsupported(
            ctx.profile,
            format!(
                "initializer of `{}` needs a workaround that is not a constant expression",
                decl.name
            ),
        ));
    }
    let name = ctx.fresh_name(prefix);
    let init = decl
        .init
        .replace(Expr::call_user(name.clone(), Vec::new(), decl.ty));
    Ok(Some(Function::new(
        name,
        decl.ty,
        Vec::new(),
        vec![Stmt::Return(init)],
    )))
}

/// Declares an uninitialized function-local temporary and returns a reference to it.
fn declare_temp(
    ctx: &mut GenContext<'_>,
    temps: &mut Vec<Stmt>,
    prefix: &'static str,
    ty: Type,
) -> Expr {
    let name = ctx.fresh_name(prefix);
    temps.push(Stmt::VarDecl(Decl::local(name.clone(), ty, None)));
    Expr::var(name, ty)
}

fn has_side_effecting_fract(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Call {
            callee: Callee::Intrinsic(Intrinsic::Fract),
            args,
        } => expr.ty.is_float() && matches!(args.as_slice(), [x] if x.has_side_effects()),
        _ => false,
    }
}

/// Float `fract(x)` becomes `(0.5 - sign(x) * (0.5 - fract(abs(x))))`.
///
/// `x` appears twice in the replacement, so an operand with side effects is first captured in a
/// function-local temporary: `(t = x, (0.5 - sign(t) * ...))`. Global initializers with such an
/// operand are moved into a function first.
pub(crate) fn rewrite_fract(
    program: &mut Program,
    ctx: &mut GenContext<'_>,
) -> Result<(), GlslError> {
    hoist_global_initializers(program, ctx, FRACT_INIT, &mut has_side_effecting_fract)?;
    for element in &mut program.elements {
        match element {
            ProgramElement::Global(decl) => {
                if let Some(init) = &mut decl.init {
                    walk_expr_mut(init, &mut |expr| {
                        if let Some(x) = fract_operand(expr) {
                            let x = x.take();
                            *expr = fract_workaround(&x, expr.ty);
                        }
                        Ok(())
                    })?;
                }
            }
            ProgramElement::Function(function) => {
                let mut temps = Vec::new();
                walk_body_exprs_mut(&mut function.body, &mut |expr| {
                    let Some(x) = fract_operand(expr) else {
                        return Ok(());
                    };
                    let x = x.take();
                    let ty = expr.ty;
                    *expr = if x.has_side_effects() {
                        let temp = declare_temp(ctx, &mut temps, FRACT_TEMP, x.ty);
                        Expr::binary(
                            BinaryOp::Comma,
                            Expr::assign(temp.clone(), x),
                            fract_workaround(&temp, ty),
                        )
                    } else {
                        fract_workaround(&x, ty)
                    };
                    Ok(())
                })?;
                temps.append(&mut function.body);
                function.body = temps;
            }
            ProgramElement::Layout(_) => {}
        }
    }
    Ok(())
}

fn fract_operand(expr: &mut Expr) -> Option<&mut Expr> {
    if !expr.ty.is_float() {
        return None;
    }
    match intrinsic_args(expr, Intrinsic::Fract)?.as_mut_slice() {
        [x] => Some(x),
        _ => None,
    }
}

fn fract_workaround(x: &Expr, ty: Type) -> Expr {
    let sign = Expr::call(Intrinsic::Sign, vec![x.clone()]);
    let abs = Expr::call(Intrinsic::Abs, vec![x.clone()]);
    let distance = Expr::binary(
        BinaryOp::Sub,
        Expr::float(0.5),
        Expr::call(Intrinsic::Fract, vec![abs]),
    );
    let mut rewritten = Expr::binary(
        BinaryOp::Sub,
        Expr::float(0.5),
        Expr::binary(BinaryOp::Mul, sign, distance),
    );
    rewritten.ty = ty;
    Expr::group(rewritten)
}

/// `atan(y, -x)` becomes `atan(y, -1.0 * x)` for float operands.
pub(crate) fn force_negated_atan_operand(
    program: &mut Program,
    _: &mut GenContext<'_>,
) -> Result<(), GlslError> {
    walk_program_exprs_mut(program, &mut |expr| {
        let Some([_, second]) = intrinsic_args(expr, Intrinsic::Atan).map(Vec::as_mut_slice) else {
            return Ok(());
        };
        if !second.ty.is_float() {
            return Ok(());
        }
        let ExprKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } = &mut second.kind
        else {
            return Ok(());
        };
        let operand = operand.take();
        let ty = second.ty;
        let mut product = Expr::binary(BinaryOp::Mul, Expr::float(-1.0), operand);
        product.ty = ty;
        *second = product;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::ir::{Literal, ShaderStage};
    use crate::visit::stmts_any_expr;
    use crate::profile::Profile;
    use crate::GlslOptions;

    fn fragment_main(body: Vec<Stmt>) -> Program {
        Program::new(
            ShaderStage::Fragment,
            vec![ProgramElement::Function(Function::main(body))],
        )
    }

    fn main_body(program: &Program) -> &[Stmt] {
        program
            .functions()
            .next()
            .map(|f| f.body.as_slice())
            .unwrap_or_default()
    }

    /// Evaluates the float subset of the IR the pow rewrite produces.
    fn eval(expr: &Expr, vars: &HashMap<&str, f64>) -> f64 {
        match &expr.kind {
            ExprKind::Literal(Literal::Float(v)) => *v,
            ExprKind::Var(name) => vars[name.as_str()],
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand,
            } => -eval(operand, vars),
            ExprKind::Binary {
                op: BinaryOp::Mul,
                left,
                right,
            } => eval(left, vars) * eval(right, vars),
            ExprKind::Call {
                callee: Callee::Intrinsic(intrinsic),
                args,
            } => {
                let arg = |i: usize| eval(&args[i], vars);
                match intrinsic {
                    Intrinsic::Exp2 => arg(0).exp2(),
                    Intrinsic::Log2 => arg(0).log2(),
                    Intrinsic::Pow => arg(0).powf(arg(1)),
                    other => panic!("unexpected intrinsic {other:?}"),
                }
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    fn pow_of(base: Expr, exponent: Expr) -> Program {
        let z = Expr::var("z", Type::float());
        fragment_main(vec![Stmt::assign(
            z,
            Expr::call(Intrinsic::Pow, vec![base, exponent]),
        )])
    }

    fn assigned_value(program: &Program) -> &Expr {
        match main_body(program) {
            [Stmt::Expr(Expr {
                kind: ExprKind::Binary { right, .. },
                ..
            })] => right,
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn pow_with_variable_exponent_is_kept() {
        let profile = Profile::default();
        let mut ctx = GenContext::new(&profile, GlslOptions::default());
        let y = Expr::var("y", Type::float());
        let mut program = pow_of(Expr::var("x", Type::float()), y);
        let before = program.clone();
        rewrite_constant_exponent_pow(&mut program, &mut ctx).unwrap();
        assert_eq!(program, before);
    }

    #[test]
    fn int_abs_helper_is_shared_per_type() {
        let profile = Profile::default();
        let mut ctx = GenContext::new(&profile, GlslOptions::default());
        let i = Expr::var("i", Type::int());
        let f = Expr::var("f", Type::float());
        let mut program = fragment_main(vec![
            Stmt::Expr(Expr::call(Intrinsic::Abs, vec![i.clone()])),
            Stmt::Expr(Expr::call(Intrinsic::Abs, vec![i])),
            Stmt::Expr(Expr::call(Intrinsic::Abs, vec![f])),
        ]);
        emulate_int_abs(&mut program, &mut ctx).unwrap();

        assert_eq!(ctx.helpers().len(), 1);
        let callees: Vec<_> = main_body(&program)
            .iter()
            .map(|stmt| match stmt {
                Stmt::Expr(Expr {
                    kind: ExprKind::Call { callee, .. },
                    ..
                }) => callee.clone(),
                other => panic!("unexpected statement {other:?}"),
            })
            .collect();
        assert_eq!(
            callees,
            vec![
                Callee::User(ABS_EMULATION.to_owned()),
                Callee::User(ABS_EMULATION.to_owned()),
                Callee::Intrinsic(Intrinsic::Abs),
            ]
        );
    }

    #[test]
    fn min_abs_temps_are_declared_first() {
        let profile = Profile::default();
        let mut ctx = GenContext::new(&profile, GlslOptions::default());
        let x = Expr::var("x", Type::half());
        let min = Expr::call(
            Intrinsic::Min,
            vec![Expr::call(Intrinsic::Abs, vec![x]), Expr::float(6.0)],
        );
        let mut program = fragment_main(vec![Stmt::Expr(min)]);
        split_min_abs(&mut program, &mut ctx).unwrap();

        let body = main_body(&program);
        assert_eq!(body.len(), 3);
        assert_eq!(
            body[0],
            Stmt::VarDecl(Decl::local("minAbsHackVar0", Type::half(), None))
        );
        assert_eq!(
            body[1],
            Stmt::VarDecl(Decl::local("minAbsHackVar1", Type::half(), None))
        );
        let Stmt::Expr(Expr {
            kind: ExprKind::Group(split),
            ..
        }) = &body[2]
        else {
            panic!("expected a grouped expression, got {:?}", body[2]);
        };
        assert!(matches!(split.kind, ExprKind::Ternary { .. }));
    }

    #[test]
    fn vector_min_abs_compares_per_component() {
        let profile = Profile::default();
        let mut ctx = GenContext::new(&profile, GlslOptions::default());
        let v = Expr::var("v", Type::vec(2));
        let min = Expr::call(
            Intrinsic::Min,
            vec![Expr::call(Intrinsic::Abs, vec![v]), Expr::float(1.0)],
        );
        let mut program = fragment_main(vec![Stmt::Expr(min)]);
        split_min_abs(&mut program, &mut ctx).unwrap();

        let body = main_body(&program);
        assert_eq!(
            body[0],
            Stmt::VarDecl(Decl::local("minAbsHackVar0", Type::vec(2), None))
        );
        assert_eq!(
            body[1],
            Stmt::VarDecl(Decl::local("minAbsHackVar1", Type::half(), None))
        );
        let Stmt::Expr(Expr {
            kind: ExprKind::Group(split),
            ..
        }) = &body[2]
        else {
            panic!("expected a grouped expression, got {:?}", body[2]);
        };
        let ExprKind::Binary {
            op: BinaryOp::Comma,
            right,
            ..
        } = &split.kind
        else {
            panic!("expected a comma expression, got {split:?}");
        };
        let ExprKind::Construct { args } = &right.kind else {
            panic!("expected a constructor, got {right:?}");
        };
        assert_eq!(right.ty, Type::vec(2));
        assert_eq!(args.len(), 2);
        assert!(args
            .iter()
            .all(|lane| matches!(lane.kind, ExprKind::Ternary { .. }) && lane.ty.is_scalar()));
        assert!(!expr_any(split, &mut is_min_abs));
    }

    #[test]
    fn global_initializers_move_into_a_function() {
        let profile = Profile::default();
        let mut ctx = GenContext::new(&profile, GlslOptions::default());
        let min = Expr::call(
            Intrinsic::Min,
            vec![
                Expr::call(Intrinsic::Abs, vec![Expr::var("a", Type::float())]),
                Expr::float(6.0),
            ],
        );
        let mut program = Program::new(
            ShaderStage::Fragment,
            vec![
                ProgramElement::Global(Decl::local("g", Type::float(), Some(min))),
                ProgramElement::Function(Function::main(Vec::new())),
            ],
        );
        split_min_abs(&mut program, &mut ctx).unwrap();

        let [ProgramElement::Function(init), ProgramElement::Global(g), ProgramElement::Function(_)] =
            program.elements.as_slice()
        else {
            panic!("unexpected elements {:?}", program.elements);
        };
        assert_eq!(init.name, "minAbsHackInit0");
        assert_eq!(
            g.init,
            Some(Expr::call_user("minAbsHackInit0", Vec::new(), Type::float()))
        );
        assert_eq!(init.body.len(), 3);
        assert!(!stmts_any_expr(&init.body, &mut is_min_abs));
    }

    #[test]
    fn uniform_initializer_cannot_be_moved() {
        let profile = Profile::default();
        let mut ctx = GenContext::new(&profile, GlslOptions::default());
        let next = Expr::call_user("next", Vec::new(), Type::float());
        let mut program = Program::new(
            ShaderStage::Fragment,
            vec![ProgramElement::Global(
                Decl::new(Storage::Uniform, "u", Type::float())
                    .with_init(Expr::call(Intrinsic::Fract, vec![next])),
            )],
        );
        assert!(matches!(
            rewrite_fract(&mut program, &mut ctx),
            Err(GlslError::UnsupportedConstruct { .. })
        ));
    }

    #[test]
    fn fract_of_side_effecting_operand_is_captured_once() {
        let profile = Profile::default();
        let mut ctx = GenContext::new(&profile, GlslOptions::default());
        let next = Expr::call_user("next", Vec::new(), Type::float());
        let mut program = fragment_main(vec![Stmt::Expr(Expr::call(
            Intrinsic::Fract,
            vec![next],
        ))]);
        rewrite_fract(&mut program, &mut ctx).unwrap();

        let body = main_body(&program);
        assert_eq!(
            body[0],
            Stmt::VarDecl(Decl::local("fractHackVar0", Type::float(), None))
        );
        let Stmt::Expr(Expr {
            kind:
                ExprKind::Binary {
                    op: BinaryOp::Comma,
                    left,
                    right,
                },
            ..
        }) = &body[1]
        else {
            panic!("expected a comma expression, got {:?}", body[1]);
        };
        assert!(left.has_side_effects());
        assert!(!right.has_side_effects());
    }

    #[test]
    fn atan_only_rewrites_a_negated_second_operand() {
        let profile = Profile::default();
        let mut ctx = GenContext::new(&profile, GlslOptions::default());
        let x = Expr::var("x", Type::float());
        let negated = Expr::unary(UnaryOp::Neg, x.clone());
        let mut program = fragment_main(vec![
            Stmt::Expr(Expr::call(Intrinsic::Atan, vec![x.clone(), negated.clone()])),
            Stmt::Expr(Expr::call(Intrinsic::Atan, vec![negated, x.clone()])),
        ]);
        force_negated_atan_operand(&mut program, &mut ctx).unwrap();

        let expected = Expr::call(
            Intrinsic::Atan,
            vec![
                x.clone(),
                Expr::binary(BinaryOp::Mul, Expr::float(-1.0), x.clone()),
            ],
        );
        assert_eq!(main_body(&program)[0], Stmt::Expr(expected));
        assert_eq!(
            main_body(&program)[1],
            Stmt::Expr(Expr::call(
                Intrinsic::Atan,
                vec![Expr::unary(UnaryOp::Neg, x.clone()), x]
            ))
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            rng_algorithm: proptest::test_runner::RngAlgorithm::ChaCha,
            rng_seed: proptest::test_runner::RngSeed::Fixed(0x9_0E_12),
            .. ProptestConfig::default()
        })]

        #[test]
        fn exp2_log2_matches_pow(base in 0.01f64..1000.0, k in -8.0f64..8.0, negate in any::<bool>()) {
            let exponent = if negate {
                Expr::unary(UnaryOp::Neg, Expr::float(k))
            } else {
                Expr::float(k)
            };
            let original = pow_of(Expr::var("b", Type::float()), exponent);
            let mut rewritten = original.clone();
            let profile = Profile::default();
            let mut ctx = GenContext::new(&profile, GlslOptions::default());
            rewrite_constant_exponent_pow(&mut rewritten, &mut ctx).unwrap();

            let vars = HashMap::from([("b", base)]);
            let expected = eval(assigned_value(&original), &vars);
            let actual = eval(assigned_value(&rewritten), &vars);
            prop_assert!(
                matches!(
                    assigned_value(&rewritten).kind,
                    ExprKind::Call { callee: Callee::Intrinsic(Intrinsic::Exp2), .. }
                ),
                "pow survived the rewrite"
            );
            let tolerance = 1e-9 * expected.abs().max(1.0);
            prop_assert!((expected - actual).abs() <= tolerance, "{expected} vs {actual}");
        }
    }
}
