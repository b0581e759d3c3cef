//! Rewrite rules applied between verification and emission.
//!
//! Each rule is an independent rewrite gated by the profile (and, for a few, by the program
//! itself). [`PIPELINE`] fixes the order they run in; later rules rely on earlier ones, e.g. the
//! swizzle optimizer must see the swizzles the fragment-coordinate rule introduces, and
//! loop-condition augmentation must run after short-circuit unfolding so its `&& true` survives.

mod control_flow;
mod frag_coord;
mod geometry;
mod header;
mod numeric;
mod precision;
pub mod swizzle;
mod texture;

use tracing::debug;

use crate::context::GenContext;
use crate::error::GlslError;
use crate::ir::Program;
use crate::profile::Quirks;

pub(crate) struct RewriteRule {
    pub(crate) name: &'static str,
    enabled: fn(&GenContext<'_>, &Program) -> bool,
    apply: fn(&mut Program, &mut GenContext<'_>) -> Result<(), GlslError>,
}

fn always(_: &GenContext<'_>, _: &Program) -> bool {
    true
}

macro_rules! quirk_gate {
    ($name:ident, $quirk:ident) => {
        fn $name(ctx: &GenContext<'_>, _: &Program) -> bool {
            ctx.profile.has_quirk(Quirks::$quirk)
        }
    };
}

quirk_gate!(rewrites_do_while, REWRITES_DO_WHILE);
quirk_gate!(unfolds_short_circuit, UNFOLDS_SHORT_CIRCUIT);
quirk_gate!(requires_loop_condition_and_true, REQUIRES_LOOP_CONDITION_AND_TRUE);
quirk_gate!(removes_constant_exponent_pow, REMOVES_CONSTANT_EXPONENT_POW);
quirk_gate!(emulates_int_abs, EMULATES_INT_ABS);
quirk_gate!(breaks_min_abs_together, BREAKS_MIN_ABS_TOGETHER);
quirk_gate!(breaks_negative_fract, BREAKS_NEGATIVE_FRACT);
quirk_gate!(forces_negated_atan_operand, FORCES_NEGATED_ATAN_OPERAND);

pub(crate) const PIPELINE: &[RewriteRule] = &[
    RewriteRule {
        name: "header",
        enabled: always,
        apply: header::apply,
    },
    RewriteRule {
        name: "force_high_precision",
        enabled: precision::enabled,
        apply: precision::apply,
    },
    RewriteRule {
        name: "frag_coord",
        enabled: always,
        apply: frag_coord::apply,
    },
    RewriteRule {
        name: "texture_sample",
        enabled: always,
        apply: texture::apply,
    },
    RewriteRule {
        name: "gs_invocations",
        enabled: geometry::enabled,
        apply: geometry::apply,
    },
    RewriteRule {
        name: "ternary_lvalue",
        enabled: always,
        apply: control_flow::lower_ternary_lvalues,
    },
    RewriteRule {
        name: "do_while",
        enabled: rewrites_do_while,
        apply: control_flow::rewrite_do_while,
    },
    RewriteRule {
        name: "short_circuit",
        enabled: unfolds_short_circuit,
        apply: control_flow::unfold_short_circuit,
    },
    RewriteRule {
        name: "loop_condition_and_true",
        enabled: requires_loop_condition_and_true,
        apply: control_flow::append_true_to_loop_conditions,
    },
    RewriteRule {
        name: "constant_exponent_pow",
        enabled: removes_constant_exponent_pow,
        apply: numeric::rewrite_constant_exponent_pow,
    },
    RewriteRule {
        name: "int_abs",
        enabled: emulates_int_abs,
        apply: numeric::emulate_int_abs,
    },
    RewriteRule {
        name: "min_abs",
        enabled: breaks_min_abs_together,
        apply: numeric::split_min_abs,
    },
    RewriteRule {
        name: "negative_fract",
        enabled: breaks_negative_fract,
        apply: numeric::rewrite_fract,
    },
    RewriteRule {
        name: "negated_atan_operand",
        enabled: forces_negated_atan_operand,
        apply: numeric::force_negated_atan_operand,
    },
    RewriteRule {
        name: "swizzle",
        enabled: always,
        apply: swizzle::apply,
    },
];

pub(crate) fn run_pipeline(
    program: &mut Program,
    ctx: &mut GenContext<'_>,
) -> Result<(), GlslError> {
    for rule in PIPELINE {
        if !(rule.enabled)(ctx, program) {
            continue;
        }
        debug!(rule = rule.name, "applying rewrite rule");
        (rule.apply)(program, ctx)?;
    }
    Ok(())
}
