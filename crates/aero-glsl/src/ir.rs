//! Shader IR consumed by the GLSL generator.
//!
//! The tree is produced by an upstream front-end (parser + type checker) and is treated as
//! read-only input. Every expression carries its resolved [`Type`], including the precision class
//! it originated from, so the rewrite rules and the emitter never re-run type inference. The
//! constructors on [`Expr`] derive result types (and precision) the same way the front-end does,
//! which keeps synthesized nodes consistent with the ones they replace.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
}

/// Precision class a value originated from.
///
/// Ordered so that `max` yields the precision of a combined expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Precision {
    Reduced,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Float,
    Int,
    UInt,
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerDim {
    D1,
    D2,
    Rect,
}

impl SamplerDim {
    /// Number of coordinate components a direct (non-projective) sample takes.
    pub fn coordinate_count(self) -> usize {
        match self {
            SamplerDim::D1 => 1,
            SamplerDim::D2 | SamplerDim::Rect => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Void,
    Scalar(ScalarKind),
    Vector(ScalarKind, u8),
    /// Float matrix.
    Matrix { columns: u8, rows: u8 },
    Sampler(SamplerDim),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Type {
    pub base: BaseType,
    pub precision: Precision,
}

impl Type {
    pub const VOID: Type = Type {
        base: BaseType::Void,
        precision: Precision::Full,
    };

    pub const fn scalar(kind: ScalarKind, precision: Precision) -> Self {
        Self {
            base: BaseType::Scalar(kind),
            precision,
        }
    }

    pub const fn vector(kind: ScalarKind, size: u8, precision: Precision) -> Self {
        Self {
            base: BaseType::Vector(kind, size),
            precision,
        }
    }

    pub const fn matrix(columns: u8, rows: u8, precision: Precision) -> Self {
        Self {
            base: BaseType::Matrix { columns, rows },
            precision,
        }
    }

    pub const fn sampler(dim: SamplerDim) -> Self {
        Self {
            base: BaseType::Sampler(dim),
            precision: Precision::Reduced,
        }
    }

    pub const fn float() -> Self {
        Self::scalar(ScalarKind::Float, Precision::Full)
    }

    pub const fn half() -> Self {
        Self::scalar(ScalarKind::Float, Precision::Reduced)
    }

    pub const fn int() -> Self {
        Self::scalar(ScalarKind::Int, Precision::Full)
    }

    pub const fn uint() -> Self {
        Self::scalar(ScalarKind::UInt, Precision::Full)
    }

    pub const fn bool() -> Self {
        Self::scalar(ScalarKind::Bool, Precision::Full)
    }

    pub const fn vec(size: u8) -> Self {
        Self::vector(ScalarKind::Float, size, Precision::Full)
    }

    pub const fn half_vec(size: u8) -> Self {
        Self::vector(ScalarKind::Float, size, Precision::Reduced)
    }

    /// Scalar when `count == 1`, vector otherwise.
    pub fn with_components(kind: ScalarKind, count: usize, precision: Precision) -> Self {
        if count <= 1 {
            Self::scalar(kind, precision)
        } else {
            Self::vector(kind, count as u8, precision)
        }
    }

    pub fn with_precision(self, precision: Precision) -> Self {
        Self { precision, ..self }
    }

    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self.base {
            BaseType::Scalar(kind) | BaseType::Vector(kind, _) => Some(kind),
            BaseType::Matrix { .. } => Some(ScalarKind::Float),
            BaseType::Void | BaseType::Sampler(_) => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.base, BaseType::Scalar(_))
    }

    pub fn is_float(&self) -> bool {
        self.scalar_kind() == Some(ScalarKind::Float)
    }

    /// Number of components a swizzle may address, or `None` for non-swizzlable types.
    pub fn swizzle_width(&self) -> Option<usize> {
        match self.base {
            BaseType::Scalar(_) => Some(1),
            BaseType::Vector(_, size) => Some(size as usize),
            _ => None,
        }
    }

    pub fn component_count(&self) -> usize {
        match self.base {
            BaseType::Scalar(_) => 1,
            BaseType::Vector(_, size) => size as usize,
            BaseType::Matrix { columns, rows } => columns as usize * rows as usize,
            BaseType::Void | BaseType::Sampler(_) => 0,
        }
    }

    /// Whether GLSL accepts a precision qualifier on this type. Booleans never take one.
    pub fn takes_precision_qualifier(&self) -> bool {
        match self.base {
            BaseType::Scalar(kind) | BaseType::Vector(kind, _) => kind != ScalarKind::Bool,
            BaseType::Matrix { .. } => true,
            BaseType::Void | BaseType::Sampler(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Float(f64),
    Int(i64),
    UInt(u64),
    Bool(bool),
}

/// Built-in variables with stage-specific spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    FragColor,
    FragCoord,
    Position,
    InvocationId,
    /// Render-target width in pixels.
    Width,
    /// Render-target height in pixels.
    Height,
    /// `gl_in[i].gl_Position` in a geometry program.
    InPosition(u32),
}

impl Builtin {
    pub fn ty(self) -> Type {
        match self {
            Builtin::FragColor => Type::half_vec(4),
            Builtin::FragCoord | Builtin::Position | Builtin::InPosition(_) => Type::vec(4),
            Builtin::InvocationId => Type::int(),
            Builtin::Width | Builtin::Height => Type::float(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::PreIncrement | UnaryOp::PostIncrement => "++",
            UnaryOp::PreDecrement | UnaryOp::PostDecrement => "--",
        }
    }

    pub fn is_postfix(self) -> bool {
        matches!(self, UnaryOp::PostIncrement | UnaryOp::PostDecrement)
    }

    pub fn mutates_operand(self) -> bool {
        matches!(
            self,
            UnaryOp::PreIncrement
                | UnaryOp::PreDecrement
                | UnaryOp::PostIncrement
                | UnaryOp::PostDecrement
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    LogicalAnd,
    LogicalXor,
    LogicalOr,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    Comma,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalXor => "^^",
            BinaryOp::LogicalOr => "||",
            BinaryOp::Assign => "=",
            BinaryOp::AddAssign => "+=",
            BinaryOp::SubAssign => "-=",
            BinaryOp::MulAssign => "*=",
            BinaryOp::DivAssign => "/=",
            BinaryOp::Comma => ",",
        }
    }

    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            BinaryOp::Assign
                | BinaryOp::AddAssign
                | BinaryOp::SubAssign
                | BinaryOp::MulAssign
                | BinaryOp::DivAssign
        )
    }

    fn yields_bool(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::LogicalAnd
                | BinaryOp::LogicalXor
                | BinaryOp::LogicalOr
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    Abs,
    Sign,
    Floor,
    Ceil,
    Fract,
    Min,
    Max,
    Clamp,
    Mix,
    Pow,
    Exp,
    Exp2,
    Log,
    Log2,
    Sqrt,
    InverseSqrt,
    Sin,
    Cos,
    Tan,
    Atan,
    Dot,
    Length,
    Normalize,
    Dfdx,
    Dfdy,
    /// Dialect-neutral texture sample, resolved to one of the entry points below before
    /// emission.
    Sample,
    Texture,
    TextureProj,
    Texture1D,
    Texture1DProj,
    Texture2D,
    Texture2DProj,
    Texture2DRect,
    Texture2DRectProj,
}

impl Intrinsic {
    pub fn name(self) -> &'static str {
        match self {
            Intrinsic::Abs => "abs",
            Intrinsic::Sign => "sign",
            Intrinsic::Floor => "floor",
            Intrinsic::Ceil => "ceil",
            Intrinsic::Fract => "fract",
            Intrinsic::Min => "min",
            Intrinsic::Max => "max",
            Intrinsic::Clamp => "clamp",
            Intrinsic::Mix => "mix",
            Intrinsic::Pow => "pow",
            Intrinsic::Exp => "exp",
            Intrinsic::Exp2 => "exp2",
            Intrinsic::Log => "log",
            Intrinsic::Log2 => "log2",
            Intrinsic::Sqrt => "sqrt",
            Intrinsic::InverseSqrt => "inversesqrt",
            Intrinsic::Sin => "sin",
            Intrinsic::Cos => "cos",
            Intrinsic::Tan => "tan",
            Intrinsic::Atan => "atan",
            Intrinsic::Dot => "dot",
            Intrinsic::Length => "length",
            Intrinsic::Normalize => "normalize",
            Intrinsic::Dfdx => "dFdx",
            Intrinsic::Dfdy => "dFdy",
            Intrinsic::Sample => "sample",
            Intrinsic::Texture => "texture",
            Intrinsic::TextureProj => "textureProj",
            Intrinsic::Texture1D => "texture1D",
            Intrinsic::Texture1DProj => "texture1DProj",
            Intrinsic::Texture2D => "texture2D",
            Intrinsic::Texture2DProj => "texture2DProj",
            Intrinsic::Texture2DRect => "texture2DRect",
            Intrinsic::Texture2DRectProj => "texture2DRectProj",
        }
    }

    fn is_texture_lookup(self) -> bool {
        matches!(
            self,
            Intrinsic::Sample
                | Intrinsic::Texture
                | Intrinsic::TextureProj
                | Intrinsic::Texture1D
                | Intrinsic::Texture1DProj
                | Intrinsic::Texture2D
                | Intrinsic::Texture2DProj
                | Intrinsic::Texture2DRect
                | Intrinsic::Texture2DRectProj
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    Intrinsic(Intrinsic),
    User(String),
}

/// One swizzle selector. `Zero`/`One` select a constant instead of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwizzleComponent {
    X,
    Y,
    Z,
    W,
    Zero,
    One,
}

impl SwizzleComponent {
    pub fn index(self) -> Option<usize> {
        match self {
            SwizzleComponent::X => Some(0),
            SwizzleComponent::Y => Some(1),
            SwizzleComponent::Z => Some(2),
            SwizzleComponent::W => Some(3),
            SwizzleComponent::Zero | SwizzleComponent::One => None,
        }
    }

    /// Component selector for `index`; indices past `w` clamp to `w`.
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => SwizzleComponent::X,
            1 => SwizzleComponent::Y,
            2 => SwizzleComponent::Z,
            _ => SwizzleComponent::W,
        }
    }

    pub fn is_literal(self) -> bool {
        self.index().is_none()
    }

    pub fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'x' | 'r' | 's' => SwizzleComponent::X,
            'y' | 'g' | 't' => SwizzleComponent::Y,
            'z' | 'b' | 'p' => SwizzleComponent::Z,
            'w' | 'a' | 'q' => SwizzleComponent::W,
            '0' => SwizzleComponent::Zero,
            '1' => SwizzleComponent::One,
            _ => return None,
        })
    }

    pub fn as_char(self) -> char {
        match self {
            SwizzleComponent::X => 'x',
            SwizzleComponent::Y => 'y',
            SwizzleComponent::Z => 'z',
            SwizzleComponent::W => 'w',
            SwizzleComponent::Zero => '0',
            SwizzleComponent::One => '1',
        }
    }
}

/// Parses a mask such as `"xy01"` or `"rgba"`.
pub fn parse_swizzle(mask: &str) -> Option<Vec<SwizzleComponent>> {
    mask.chars().map(SwizzleComponent::from_char).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Var(String),
    Builtin(Builtin),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },
    Call {
        callee: Callee,
        args: Vec<Expr>,
    },
    Swizzle {
        base: Box<Expr>,
        components: Vec<SwizzleComponent>,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    /// Constructor or cast; the constructed type is the expression's own type.
    Construct {
        args: Vec<Expr>,
    },
    /// Parentheses kept in the output regardless of the surrounding precedence.
    Group(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: Type) -> Self {
        Self { kind, ty }
    }

    // Literals carry reduced precision so they never raise the precision of the expression they
    // appear in.
    pub fn float(value: f64) -> Self {
        Self::new(ExprKind::Literal(Literal::Float(value)), Type::half())
    }

    pub fn int(value: i64) -> Self {
        Self::new(
            ExprKind::Literal(Literal::Int(value)),
            Type::scalar(ScalarKind::Int, Precision::Reduced),
        )
    }

    pub fn uint(value: u64) -> Self {
        Self::new(
            ExprKind::Literal(Literal::UInt(value)),
            Type::scalar(ScalarKind::UInt, Precision::Reduced),
        )
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ExprKind::Literal(Literal::Bool(value)), Type::bool())
    }

    /// `0` or `1` of the given scalar kind.
    pub fn unit(kind: ScalarKind, one: bool) -> Self {
        match kind {
            ScalarKind::Float => Self::float(if one { 1.0 } else { 0.0 }),
            ScalarKind::Int => Self::int(i64::from(one)),
            ScalarKind::UInt => Self::uint(u64::from(one)),
            ScalarKind::Bool => Self::bool(one),
        }
    }

    pub fn var(name: impl Into<String>, ty: Type) -> Self {
        Self::new(ExprKind::Var(name.into()), ty)
    }

    pub fn builtin(builtin: Builtin) -> Self {
        Self::new(ExprKind::Builtin(builtin), builtin.ty())
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        let ty = match op {
            UnaryOp::Not => Type::bool(),
            _ => operand.ty,
        };
        Self::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
        )
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        let ty = binary_result_type(op, &left.ty, &right.ty);
        Self::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
        )
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Self::binary(BinaryOp::Assign, target, value)
    }

    pub fn ternary(cond: Expr, if_true: Expr, if_false: Expr) -> Self {
        let precision = if_true.ty.precision.max(if_false.ty.precision);
        let ty = if_true.ty.with_precision(precision);
        Self::new(
            ExprKind::Ternary {
                cond: Box::new(cond),
                if_true: Box::new(if_true),
                if_false: Box::new(if_false),
            },
            ty,
        )
    }

    pub fn call(intrinsic: Intrinsic, args: Vec<Expr>) -> Self {
        let ty = intrinsic_result_type(intrinsic, &args);
        Self::new(
            ExprKind::Call {
                callee: Callee::Intrinsic(intrinsic),
                args,
            },
            ty,
        )
    }

    pub fn call_user(name: impl Into<String>, args: Vec<Expr>, return_type: Type) -> Self {
        Self::new(
            ExprKind::Call {
                callee: Callee::User(name.into()),
                args,
            },
            return_type,
        )
    }

    pub fn swizzle(base: Expr, components: Vec<SwizzleComponent>) -> Self {
        let kind = base.ty.scalar_kind().unwrap_or(ScalarKind::Float);
        let ty = Type::with_components(kind, components.len(), base.ty.precision);
        Self::new(
            ExprKind::Swizzle {
                base: Box::new(base),
                components,
            },
            ty,
        )
    }

    pub fn index(base: Expr, index: Expr) -> Self {
        let ty = match base.ty.base {
            BaseType::Vector(kind, _) => Type::scalar(kind, base.ty.precision),
            BaseType::Matrix { rows, .. } => {
                Type::vector(ScalarKind::Float, rows, base.ty.precision)
            }
            _ => base.ty,
        };
        Self::new(
            ExprKind::Index {
                base: Box::new(base),
                index: Box::new(index),
            },
            ty,
        )
    }

    pub fn construct(ty: Type, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Construct { args }, ty)
    }

    pub fn group(inner: Expr) -> Self {
        let ty = inner.ty;
        Self::new(ExprKind::Group(Box::new(inner)), ty)
    }

    /// Moves the expression out, leaving a cheap placeholder behind.
    pub(crate) fn take(&mut self) -> Expr {
        std::mem::replace(self, Expr::bool(false))
    }

    pub fn as_bool_literal(&self) -> Option<bool> {
        match self.kind {
            ExprKind::Literal(Literal::Bool(value)) => Some(value),
            _ => None,
        }
    }

    /// Whether evaluating the expression can write state: assignments, increments and calls to
    /// user functions (which are assumed impure).
    pub fn has_side_effects(&self) -> bool {
        match &self.kind {
            ExprKind::Literal(_) | ExprKind::Var(_) | ExprKind::Builtin(_) => false,
            ExprKind::Unary { op, operand } => op.mutates_operand() || operand.has_side_effects(),
            ExprKind::Binary { op, left, right } => {
                op.is_assignment() || left.has_side_effects() || right.has_side_effects()
            }
            ExprKind::Ternary {
                cond,
                if_true,
                if_false,
            } => {
                cond.has_side_effects() || if_true.has_side_effects() || if_false.has_side_effects()
            }
            ExprKind::Call { callee, args } => {
                matches!(callee, Callee::User(_)) || args.iter().any(Expr::has_side_effects)
            }
            ExprKind::Swizzle { base, .. } => base.has_side_effects(),
            ExprKind::Index { base, index } => base.has_side_effects() || index.has_side_effects(),
            ExprKind::Construct { args } => args.iter().any(Expr::has_side_effects),
            ExprKind::Group(inner) => inner.has_side_effects(),
        }
    }

    /// Compile-time constant: a literal, a negated constant, or a constructor of constants.
    pub fn is_constant(&self) -> bool {
        match &self.kind {
            ExprKind::Literal(_) => true,
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand,
            } => operand.is_constant(),
            ExprKind::Construct { args } => args.iter().all(Expr::is_constant),
            ExprKind::Group(inner) => inner.is_constant(),
            _ => false,
        }
    }
}

fn binary_result_type(op: BinaryOp, left: &Type, right: &Type) -> Type {
    if op.yields_bool() {
        return Type::bool();
    }
    if op.is_assignment() {
        return *left;
    }
    if op == BinaryOp::Comma {
        return *right;
    }
    let precision = left.precision.max(right.precision);
    let base = match (left.base, right.base) {
        (BaseType::Matrix { rows, .. }, BaseType::Vector(kind, _)) if op == BinaryOp::Mul => {
            BaseType::Vector(kind, rows)
        }
        (BaseType::Vector(kind, _), BaseType::Matrix { columns, .. }) if op == BinaryOp::Mul => {
            BaseType::Vector(kind, columns)
        }
        (BaseType::Scalar(_), other) => other,
        (base, _) => base,
    };
    Type { base, precision }
}

fn intrinsic_result_type(intrinsic: Intrinsic, args: &[Expr]) -> Type {
    let precision = args
        .iter()
        .map(|arg| arg.ty.precision)
        .max()
        .unwrap_or(Precision::Reduced);
    if intrinsic.is_texture_lookup() {
        return Type::half_vec(4);
    }
    match intrinsic {
        Intrinsic::Dot | Intrinsic::Length => {
            let kind = args
                .first()
                .and_then(|arg| arg.ty.scalar_kind())
                .unwrap_or(ScalarKind::Float);
            Type::scalar(kind, precision)
        }
        _ => args
            .iter()
            .max_by_key(|arg| arg.ty.component_count())
            .map(|arg| arg.ty.with_precision(precision))
            .unwrap_or(Type::VOID),
    }
}

/// Storage qualifier of a declaration. Legacy dialects spell `in`/`out` differently per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Storage {
    Auto,
    Const,
    Uniform,
    In,
    Out,
    Varying,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub name: String,
    pub ty: Type,
    pub storage: Storage,
    pub init: Option<Expr>,
}

impl Decl {
    pub fn new(storage: Storage, name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            storage,
            init: None,
        }
    }

    pub fn local(name: impl Into<String>, ty: Type, init: Option<Expr>) -> Self {
        Self {
            init,
            ..Self::new(Storage::Auto, name, ty)
        }
    }

    pub fn with_init(mut self, init: Expr) -> Self {
        self.init = Some(init);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// `None` for `default:`.
    pub value: Option<i64>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Vec<Stmt>),
    VarDecl(Decl),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        next: Option<Expr>,
        body: Box<Stmt>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    Switch {
        value: Expr,
        cases: Vec<SwitchCase>,
    },
    Expr(Expr),
    Return(Option<Expr>),
    Break,
    Continue,
    Discard,
    EmitVertex,
    EndPrimitive,
}

impl Stmt {
    pub fn assign(target: Expr, value: Expr) -> Self {
        Stmt::Expr(Expr::assign(target, value))
    }

    /// Wraps `stmts` in a block unless it is already a single statement.
    pub(crate) fn from_vec(mut stmts: Vec<Stmt>) -> Self {
        if stmts.len() == 1 {
            if let Some(stmt) = stmts.pop() {
                return stmt;
            }
        }
        Stmt::Block(stmts)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub return_type: Type,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

impl Function {
    pub fn new(
        name: impl Into<String>,
        return_type: Type,
        params: Vec<Param>,
        body: Vec<Stmt>,
    ) -> Self {
        Self {
            name: name.into(),
            return_type,
            params,
            body,
        }
    }

    pub fn main(body: Vec<Stmt>) -> Self {
        Self::new("main", Type::VOID, Vec::new(), body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutQualifier {
    Points,
    Lines,
    LinesAdjacency,
    Triangles,
    TrianglesAdjacency,
    LineStrip,
    TriangleStrip,
    Invocations(u32),
    MaxVertices(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutDirection {
    In,
    Out,
}

/// Geometry-stage interface layout, e.g. `layout(points, invocations = 2) in;`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceLayout {
    pub direction: LayoutDirection,
    pub qualifiers: Vec<LayoutQualifier>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgramElement {
    Global(Decl),
    Function(Function),
    Layout(InterfaceLayout),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub stage: ShaderStage,
    pub elements: Vec<ProgramElement>,
}

impl Program {
    pub fn new(stage: ShaderStage, elements: Vec<ProgramElement>) -> Self {
        Self { stage, elements }
    }

    /// Invocation count declared by the last input layout that names one; 1 when undeclared.
    pub fn declared_invocations(&self) -> u32 {
        self.elements
            .iter()
            .filter_map(|element| match element {
                ProgramElement::Layout(layout) if layout.direction == LayoutDirection::In => {
                    layout.qualifiers.iter().rev().find_map(|q| match q {
                        LayoutQualifier::Invocations(n) => Some(*n),
                        _ => None,
                    })
                }
                _ => None,
            })
            .last()
            .unwrap_or(1)
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.elements.iter().filter_map(|element| match element {
            ProgramElement::Function(function) => Some(function),
            _ => None,
        })
    }

    pub fn functions_mut(&mut self) -> impl Iterator<Item = &mut Function> {
        self.elements.iter_mut().filter_map(|element| match element {
            ProgramElement::Function(function) => Some(function),
            _ => None,
        })
    }
}
