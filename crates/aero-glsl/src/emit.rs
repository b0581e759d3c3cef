//! GLSL text emission.
//!
//! Runs after the rewrite pipeline, so it only spells out what the tree already says: type
//! names, storage qualifiers for the target dialect, precision qualifiers and operator
//! parenthesization. Constructs that cannot exist after the pipeline are reported as malformed
//! rather than silently emitted.

use std::fmt::Write as _;

use crate::context::{GenContext, SynthesizedGlobal};
use crate::error::{malformed, unsupported, GlslError};
use crate::ir::{
    BaseType, BinaryOp, Builtin, Callee, Decl, Expr, ExprKind, Function, InterfaceLayout,
    LayoutDirection, LayoutQualifier, Literal, Precision, Program, ProgramElement, SamplerDim,
    ScalarKind, ShaderStage, Stmt, Storage, Type,
};
use crate::profile::Profile;

type Result<T> = std::result::Result<T, GlslError>;

const INDENT: &str = "    ";

/// Binding strength, tightest first. A child binding no tighter than its parent is
/// parenthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Postfix,
    Prefix,
    Multiplicative,
    Additive,
    Shift,
    Relational,
    Equality,
    BitwiseAnd,
    BitwiseXor,
    BitwiseOr,
    LogicalAnd,
    LogicalXor,
    LogicalOr,
    Ternary,
    Assignment,
    Sequence,
    TopLevel,
}

impl Precedence {
    fn of(op: BinaryOp) -> Self {
        match op {
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => Precedence::Multiplicative,
            BinaryOp::Add | BinaryOp::Sub => Precedence::Additive,
            BinaryOp::Shl | BinaryOp::Shr => Precedence::Shift,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => Precedence::Relational,
            BinaryOp::Eq | BinaryOp::Ne => Precedence::Equality,
            BinaryOp::BitAnd => Precedence::BitwiseAnd,
            BinaryOp::BitXor => Precedence::BitwiseXor,
            BinaryOp::BitOr => Precedence::BitwiseOr,
            BinaryOp::LogicalAnd => Precedence::LogicalAnd,
            BinaryOp::LogicalXor => Precedence::LogicalXor,
            BinaryOp::LogicalOr => Precedence::LogicalOr,
            BinaryOp::Assign
            | BinaryOp::AddAssign
            | BinaryOp::SubAssign
            | BinaryOp::MulAssign
            | BinaryOp::DivAssign => Precedence::Assignment,
            BinaryOp::Comma => Precedence::Sequence,
        }
    }
}

/// Formats a float literal in shortest round-trip form, always with a decimal point.
pub(crate) fn format_float(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    let mut s = format!("{value}");
    if !s.contains('.') {
        s.push_str(".0");
    }
    Some(s)
}

pub(crate) fn type_name(ty: &Type, profile: &Profile) -> Result<String> {
    let scalar = |kind: ScalarKind| -> Result<&'static str> {
        if kind == ScalarKind::UInt && profile.generation.is_legacy() {
            return Err(unsupported(profile, "unsigned integer types"));
        }
        Ok(match kind {
            ScalarKind::Float => "float",
            ScalarKind::Int => "int",
            ScalarKind::UInt => "uint",
            ScalarKind::Bool => "bool",
        })
    };
    Ok(match ty.base {
        BaseType::Void => "void".to_owned(),
        BaseType::Scalar(kind) => scalar(kind)?.to_owned(),
        BaseType::Vector(kind, size) => {
            let prefix = match scalar(kind)? {
                "int" => "i",
                "uint" => "u",
                "bool" => "b",
                _ => "",
            };
            format!("{prefix}vec{size}")
        }
        BaseType::Matrix { columns, rows } if columns == rows => format!("mat{columns}"),
        BaseType::Matrix { columns, rows } => format!("mat{columns}x{rows}"),
        BaseType::Sampler(SamplerDim::D1) => "sampler1D".to_owned(),
        BaseType::Sampler(SamplerDim::D2) => "sampler2D".to_owned(),
        BaseType::Sampler(SamplerDim::Rect) => "sampler2DRect".to_owned(),
    })
}

fn layout_qualifier(qualifier: LayoutQualifier) -> String {
    match qualifier {
        LayoutQualifier::Points => "points".to_owned(),
        LayoutQualifier::Lines => "lines".to_owned(),
        LayoutQualifier::LinesAdjacency => "lines_adjacency".to_owned(),
        LayoutQualifier::Triangles => "triangles".to_owned(),
        LayoutQualifier::TrianglesAdjacency => "triangles_adjacency".to_owned(),
        LayoutQualifier::LineStrip => "line_strip".to_owned(),
        LayoutQualifier::TriangleStrip => "triangle_strip".to_owned(),
        LayoutQualifier::Invocations(n) => format!("invocations = {n}"),
        LayoutQualifier::MaxVertices(n) => format!("max_vertices = {n}"),
    }
}

pub(crate) fn emit_program(program: &Program, ctx: &GenContext<'_>) -> Result<String> {
    let mut w = GlslWriter {
        out: String::new(),
        profile: ctx.profile,
        stage: program.stage,
    };
    let profile = ctx.profile;

    let _ = writeln!(w.out, "{}", profile.version_decl);
    for ext in ctx.extensions() {
        let _ = writeln!(w.out, "#extension {ext} : require");
    }
    if profile.uses_precision_modifiers {
        w.out.push_str("precision mediump float;\n");
        w.out.push_str("precision mediump sampler2D;\n");
    }
    if ctx.declares_frag_output {
        // The output keeps medium precision even when everything else is forced high.
        let precision = if profile.uses_precision_modifiers {
            "mediump "
        } else {
            ""
        };
        let _ = writeln!(w.out, "out {precision}vec4 sk_FragColor;");
    }
    for global in ctx.globals() {
        match global {
            SynthesizedGlobal::Variable(decl) => {
                w.write_decl(decl)?;
                w.out.push_str(";\n");
            }
            SynthesizedGlobal::FragCoordOriginUpperLeft => {
                w.out
                    .push_str("layout(origin_upper_left) in vec4 gl_FragCoord;\n");
            }
        }
    }
    for helper in ctx.helpers() {
        w.write_function(helper)?;
    }
    for element in &program.elements {
        match element {
            ProgramElement::Global(decl) => {
                w.write_decl(decl)?;
                w.out.push_str(";\n");
            }
            ProgramElement::Function(function) => w.write_function(function)?,
            ProgramElement::Layout(layout) => w.write_layout(layout),
        }
    }
    Ok(w.out)
}

struct GlslWriter<'a> {
    out: String,
    profile: &'a Profile,
    stage: ShaderStage,
}

impl GlslWriter<'_> {
    fn pad(&mut self, indent: usize) {
        for _ in 0..indent {
            self.out.push_str(INDENT);
        }
    }

    fn precision(&self, ty: &Type) -> &'static str {
        if !self.profile.uses_precision_modifiers || !ty.takes_precision_qualifier() {
            return "";
        }
        if self.profile.force_high_precision {
            return "highp ";
        }
        match ty.precision {
            Precision::Reduced => "mediump ",
            Precision::Full => "highp ",
        }
    }

    fn storage(&self, storage: Storage) -> Result<&'static str> {
        let legacy = self.profile.generation.is_legacy();
        Ok(match (storage, self.stage) {
            (Storage::Auto, _) => "",
            (Storage::Const, _) => "const ",
            (Storage::Uniform, _) => "uniform ",
            (Storage::In | Storage::Varying, ShaderStage::Fragment) if legacy => "varying ",
            (Storage::Out, ShaderStage::Fragment) if legacy => {
                return Err(unsupported(
                    self.profile,
                    "user-declared fragment outputs need `in`/`out` storage qualifiers",
                ));
            }
            (Storage::In, ShaderStage::Vertex) if legacy => "attribute ",
            (Storage::Out | Storage::Varying, ShaderStage::Vertex) if legacy => "varying ",
            (Storage::In, _) => "in ",
            (Storage::Out, _) => "out ",
            (Storage::Varying, ShaderStage::Fragment) => "in ",
            (Storage::Varying, _) => "out ",
        })
    }

    fn write_type(&mut self, ty: &Type) -> Result<()> {
        let name = type_name(ty, self.profile)?;
        self.out.push_str(&name);
        Ok(())
    }

    /// `{storage}{precision}{type} name[ = init]`, without the terminating `;`.
    fn write_decl(&mut self, decl: &Decl) -> Result<()> {
        let storage = self.storage(decl.storage)?;
        let precision = self.precision(&decl.ty);
        self.out.push_str(storage);
        self.out.push_str(precision);
        self.write_type(&decl.ty)?;
        let _ = write!(self.out, " {}", decl.name);
        if let Some(init) = &decl.init {
            self.out.push_str(" = ");
            self.write_expr(init, Precedence::Assignment)?;
        }
        Ok(())
    }

    fn write_function(&mut self, function: &Function) -> Result<()> {
        let precision = self.precision(&function.return_type);
        self.out.push_str(precision);
        self.write_type(&function.return_type)?;
        let _ = write!(self.out, " {}(", function.name);
        for (i, param) in function.params.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            let precision = self.precision(&param.ty);
            self.out.push_str(precision);
            self.write_type(&param.ty)?;
            let _ = write!(self.out, " {}", param.name);
        }
        self.out.push_str(") ");
        self.write_block(&function.body, 0)?;
        self.out.push('\n');
        Ok(())
    }

    fn write_layout(&mut self, layout: &InterfaceLayout) {
        let qualifiers: Vec<_> = layout
            .qualifiers
            .iter()
            .map(|q| layout_qualifier(*q))
            .collect();
        let direction = match layout.direction {
            LayoutDirection::In => "in",
            LayoutDirection::Out => "out",
        };
        let _ = writeln!(self.out, "layout({}) {direction};", qualifiers.join(", "));
    }

    /// `{`, the statements one level deeper, then `}` at `indent`.
    fn write_block(&mut self, stmts: &[Stmt], indent: usize) -> Result<()> {
        self.out.push_str("{\n");
        for stmt in stmts {
            self.pad(indent + 1);
            self.write_stmt(stmt, indent + 1)?;
            self.out.push('\n');
        }
        self.pad(indent);
        self.out.push('}');
        Ok(())
    }

    /// Writes `stmt` starting at the current position; the caller owns the leading indent and
    /// the trailing newline.
    fn write_stmt(&mut self, stmt: &Stmt, indent: usize) -> Result<()> {
        match stmt {
            Stmt::Block(stmts) => self.write_block(stmts, indent)?,
            Stmt::VarDecl(decl) => {
                self.write_decl(decl)?;
                self.out.push(';');
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.out.push_str("if (");
                self.write_expr(cond, Precedence::TopLevel)?;
                self.out.push_str(") ");
                self.write_stmt(then_branch, indent)?;
                if let Some(else_branch) = else_branch {
                    self.out.push_str(" else ");
                    self.write_stmt(else_branch, indent)?;
                }
            }
            Stmt::For {
                init,
                cond,
                next,
                body,
            } => {
                self.out.push_str("for (");
                match init.as_deref() {
                    None => {}
                    Some(Stmt::VarDecl(decl)) => self.write_decl(decl)?,
                    Some(Stmt::Expr(expr)) => self.write_expr(expr, Precedence::TopLevel)?,
                    Some(_) => {
                        return Err(malformed(
                            "for-loop initializer must be a declaration or an expression",
                        ))
                    }
                }
                self.out.push(';');
                if let Some(cond) = cond {
                    self.out.push(' ');
                    self.write_expr(cond, Precedence::TopLevel)?;
                }
                self.out.push(';');
                if let Some(next) = next {
                    self.out.push(' ');
                    self.write_expr(next, Precedence::TopLevel)?;
                }
                self.out.push_str(") ");
                self.write_stmt(body, indent)?;
            }
            Stmt::While { cond, body } => {
                self.out.push_str("while (");
                self.write_expr(cond, Precedence::TopLevel)?;
                self.out.push_str(") ");
                self.write_stmt(body, indent)?;
            }
            Stmt::DoWhile { body, cond } => {
                self.out.push_str("do ");
                self.write_stmt(body, indent)?;
                self.out.push_str(" while (");
                self.write_expr(cond, Precedence::TopLevel)?;
                self.out.push_str(");");
            }
            Stmt::Switch { value, cases } => {
                self.out.push_str("switch (");
                self.write_expr(value, Precedence::TopLevel)?;
                self.out.push_str(") {\n");
                for case in cases {
                    self.pad(indent + 1);
                    match case.value {
                        Some(value) => {
                            let _ = writeln!(self.out, "case {value}:");
                        }
                        None => self.out.push_str("default:\n"),
                    }
                    for stmt in &case.body {
                        self.pad(indent + 2);
                        self.write_stmt(stmt, indent + 2)?;
                        self.out.push('\n');
                    }
                }
                self.pad(indent);
                self.out.push('}');
            }
            Stmt::Expr(expr) => {
                self.write_expr(expr, Precedence::TopLevel)?;
                self.out.push(';');
            }
            Stmt::Return(None) => self.out.push_str("return;"),
            Stmt::Return(Some(value)) => {
                self.out.push_str("return ");
                self.write_expr(value, Precedence::TopLevel)?;
                self.out.push(';');
            }
            Stmt::Break => self.out.push_str("break;"),
            Stmt::Continue => self.out.push_str("continue;"),
            Stmt::Discard => self.out.push_str("discard;"),
            Stmt::EmitVertex => self.out.push_str("EmitVertex();"),
            Stmt::EndPrimitive => self.out.push_str("EndPrimitive();"),
        }
        Ok(())
    }

    fn open(&mut self, own: Precedence, parent: Precedence) -> bool {
        let wrap = own >= parent;
        if wrap {
            self.out.push('(');
        }
        wrap
    }

    fn close(&mut self, wrapped: bool) {
        if wrapped {
            self.out.push(')');
        }
    }

    fn write_expr(&mut self, expr: &Expr, parent: Precedence) -> Result<()> {
        match &expr.kind {
            ExprKind::Literal(literal) => self.write_literal(*literal, parent)?,
            ExprKind::Var(name) => self.out.push_str(name),
            ExprKind::Builtin(builtin) => self.write_builtin(*builtin)?,
            ExprKind::Unary { op, operand } if op.is_postfix() => {
                let wrapped = self.open(Precedence::Postfix, parent);
                self.write_expr(operand, Precedence::Postfix)?;
                self.out.push_str(op.symbol());
                self.close(wrapped);
            }
            ExprKind::Unary { op, operand } => {
                let wrapped = self.open(Precedence::Prefix, parent);
                self.out.push_str(op.symbol());
                self.write_expr(operand, Precedence::Prefix)?;
                self.close(wrapped);
            }
            ExprKind::Binary { op, left, right } => {
                let own = Precedence::of(*op);
                let wrapped = self.open(own, parent);
                // `c ? a : b = v` would parse as `c ? a : (b = v)`.
                let left_parent = if op.is_assignment() {
                    Precedence::Ternary
                } else {
                    own
                };
                self.write_expr(left, left_parent)?;
                if *op == BinaryOp::Comma {
                    self.out.push_str(", ");
                } else {
                    let _ = write!(self.out, " {} ", op.symbol());
                }
                self.write_expr(right, own)?;
                self.close(wrapped);
            }
            ExprKind::Ternary {
                cond,
                if_true,
                if_false,
            } => {
                let wrapped = self.open(Precedence::Ternary, parent);
                self.write_expr(cond, Precedence::Ternary)?;
                self.out.push_str(" ? ");
                self.write_expr(if_true, Precedence::Ternary)?;
                self.out.push_str(" : ");
                self.write_expr(if_false, Precedence::Ternary)?;
                self.close(wrapped);
            }
            ExprKind::Call { callee, args } => {
                match callee {
                    Callee::Intrinsic(intrinsic) => self.out.push_str(intrinsic.name()),
                    Callee::User(name) => self.out.push_str(name),
                }
                self.write_args(args)?;
            }
            ExprKind::Swizzle { base, components } => {
                self.write_expr(base, Precedence::Postfix)?;
                self.out.push('.');
                for component in components {
                    if component.is_literal() {
                        return Err(malformed("constant selector left in a swizzle"));
                    }
                    self.out.push(component.as_char());
                }
            }
            ExprKind::Index { base, index } => {
                self.write_expr(base, Precedence::Postfix)?;
                self.out.push('[');
                self.write_expr(index, Precedence::TopLevel)?;
                self.out.push(']');
            }
            ExprKind::Construct { args } => {
                self.write_type(&expr.ty)?;
                self.write_args(args)?;
            }
            ExprKind::Group(inner) => {
                self.out.push('(');
                self.write_expr(inner, Precedence::TopLevel)?;
                self.out.push(')');
            }
        }
        Ok(())
    }

    fn write_args(&mut self, args: &[Expr]) -> Result<()> {
        self.out.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.write_expr(arg, Precedence::Sequence)?;
        }
        self.out.push(')');
        Ok(())
    }

    fn write_literal(&mut self, literal: Literal, parent: Precedence) -> Result<()> {
        let text = match literal {
            Literal::Float(value) => format_float(value).ok_or_else(|| {
                unsupported(self.profile, format!("non-finite float literal {value}"))
            })?,
            Literal::Int(value) => value.to_string(),
            Literal::UInt(value) => {
                if self.profile.generation.is_legacy() {
                    return Err(unsupported(self.profile, "unsigned integer literals"));
                }
                format!("{value}u")
            }
            Literal::Bool(value) => value.to_string(),
        };
        // A leading minus binds like a prefix operator.
        let wrapped = text.starts_with('-') && self.open(Precedence::Prefix, parent);
        self.out.push_str(&text);
        self.close(wrapped);
        Ok(())
    }

    fn write_builtin(&mut self, builtin: Builtin) -> Result<()> {
        match builtin {
            Builtin::FragColor if self.profile.generation.is_legacy() => {
                self.out.push_str("gl_FragColor")
            }
            Builtin::FragColor => self.out.push_str("sk_FragColor"),
            Builtin::FragCoord => self.out.push_str("gl_FragCoord"),
            Builtin::Position => self.out.push_str("gl_Position"),
            Builtin::InvocationId => self.out.push_str("gl_InvocationID"),
            Builtin::InPosition(vertex) => {
                let _ = write!(self.out, "gl_in[{vertex}].gl_Position");
            }
            Builtin::Width | Builtin::Height => {
                return Err(malformed(format!(
                    "render-target size built-in {builtin:?} survived rewriting"
                )));
            }
        }
        Ok(())
    }
}
