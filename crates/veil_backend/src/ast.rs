//! The verifier-facing surface language. This is what a [`crate::bridge::Backend`]
//! consumes: a flat, name-based AST with a stable textual rendering, free of
//! borrow information and CFG structure.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Bool,
    Perm,
    Float32,
    Float64,
    BitVec(u32),
    Seq(Box<Type>),
    Ref,
    Domain(String),
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "Int"),
            Type::Bool => write!(f, "Bool"),
            Type::Perm => write!(f, "Perm"),
            Type::Float32 => write!(f, "Float32"),
            Type::Float64 => write!(f, "Float64"),
            Type::BitVec(width) => write!(f, "BV{}", width),
            Type::Seq(elem) => write!(f, "Seq[{}]", elem),
            Type::Ref => write!(f, "Ref"),
            Type::Domain(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LocalVarDecl {
    pub name: String,
    pub typ: Type,
}

impl LocalVarDecl {
    pub fn new(name: impl Into<String>, typ: Type) -> Self {
        LocalVarDecl {
            name: name.into(),
            typ,
        }
    }
}

impl fmt::Display for LocalVarDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.typ)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnOp {
    Not,
    Minus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    EqCmp,
    NeCmp,
    GtCmp,
    GeCmp,
    LtCmp,
    LeCmp,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Implies,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            BinOp::EqCmp => "==",
            BinOp::NeCmp => "!=",
            BinOp::GtCmp => ">",
            BinOp::GeCmp => ">=",
            BinOp::LtCmp => "<",
            BinOp::LeCmp => "<=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Implies => "==>",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expr {
    Local(String),
    /// `base.field`
    FieldAccess(Box<Expr>, String),
    BoolLit(bool),
    IntLit(i64),
    /// Raw bits; the width fixes the interpretation.
    FloatLit { double: bool, bits: u64 },
    BitVecLit { width: u32, value: u128 },
    /// Fractional permission literal `num/den`; `1/1` renders as `write`
    /// and `0/1` as `none`.
    PermLit(u64, u64),
    UnOp(UnOp, Box<Expr>),
    BinOp(BinOp, Box<Expr>, Box<Expr>),
    /// `old[label](e)`
    LabelledOld(String, Box<Expr>),
    MagicWand(Box<Expr>, Box<Expr>),
    /// `acc(name(args), perm)`
    PredicateAccess(String, Vec<Expr>, Box<Expr>),
    /// `acc(place, perm)`
    FieldAccessPredicate(Box<Expr>, Box<Expr>),
    Cond(Box<Expr>, Box<Expr>, Box<Expr>),
    Forall(Vec<LocalVarDecl>, Box<Expr>),
    Let(LocalVarDecl, Box<Expr>, Box<Expr>),
    FuncApp(String, Vec<Expr>),
    DomainFuncApp(String, Vec<Expr>),
    SeqIndex(Box<Expr>, Box<Expr>),
    SeqConcat(Box<Expr>, Box<Expr>),
    SeqLen(Box<Expr>),
    IntToBitVec(u32, Box<Expr>),
    BitVecToInt(u32, Box<Expr>),
    /// `unfolding acc(name(args), perm) in body`
    Unfolding(String, Vec<Expr>, Box<Expr>, Box<Expr>),
}

fn write_comma_separated(f: &mut fmt::Formatter<'_>, items: &[impl fmt::Display]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Local(name) => write!(f, "{}", name),
            Expr::FieldAccess(base, field) => write!(f, "{}.{}", base, field),
            Expr::BoolLit(value) => write!(f, "{}", value),
            Expr::IntLit(value) => write!(f, "{}", value),
            Expr::FloatLit { double: true, bits } => write!(f, "{}", f64::from_bits(*bits)),
            Expr::FloatLit { double: false, bits } => {
                write!(f, "{}", f32::from_bits(*bits as u32))
            }
            Expr::BitVecLit { width, value } => write!(f, "{}bv{}", value, width),
            Expr::PermLit(1, 1) => write!(f, "write"),
            Expr::PermLit(0, _) => write!(f, "none"),
            Expr::PermLit(num, den) => write!(f, "{}/{}", num, den),
            Expr::UnOp(UnOp::Not, e) => write!(f, "!({})", e),
            Expr::UnOp(UnOp::Minus, e) => write!(f, "-({})", e),
            Expr::BinOp(op, lhs, rhs) => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Expr::LabelledOld(label, e) => write!(f, "old[{}]({})", label, e),
            Expr::MagicWand(lhs, rhs) => write!(f, "({} --* {})", lhs, rhs),
            Expr::PredicateAccess(name, args, perm) => {
                write!(f, "acc({}(", name)?;
                write_comma_separated(f, args)?;
                write!(f, "), {})", perm)
            }
            Expr::FieldAccessPredicate(place, perm) => write!(f, "acc({}, {})", place, perm),
            Expr::Cond(guard, then, els) => write!(f, "({} ? {} : {})", guard, then, els),
            Expr::Forall(vars, body) => {
                write!(f, "(forall ")?;
                write_comma_separated(f, vars)?;
                write!(f, " :: {})", body)
            }
            Expr::Let(var, def, body) => write!(f, "(let {} == ({}) in {})", var.name, def, body),
            Expr::FuncApp(name, args) | Expr::DomainFuncApp(name, args) => {
                write!(f, "{}(", name)?;
                write_comma_separated(f, args)?;
                write!(f, ")")
            }
            Expr::SeqIndex(seq, idx) => write!(f, "{}[{}]", seq, idx),
            Expr::SeqConcat(lhs, rhs) => write!(f, "({} ++ {})", lhs, rhs),
            Expr::SeqLen(seq) => write!(f, "|{}|", seq),
            Expr::IntToBitVec(width, e) => write!(f, "int_to_bv{}({})", width, e),
            Expr::BitVecToInt(width, e) => write!(f, "bv{}_to_int({})", width, e),
            Expr::Unfolding(name, args, perm, body) => {
                write!(f, "(unfolding acc({}(", name)?;
                write_comma_separated(f, args)?;
                write!(f, "), {}) in {})", perm, body)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Comment(String),
    Label(String),
    Inhale(Expr),
    Exhale(Expr),
    Assert(Expr),
    Assign(Expr, Expr),
    MethodCall(String, Vec<Expr>, Vec<String>),
    Fold(String, Vec<Expr>, Expr),
    Unfold(String, Vec<Expr>, Expr),
    Goto(String),
    If(Expr, Vec<Stmt>, Vec<Stmt>),
}

impl Stmt {
    fn write_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);
        match self {
            Stmt::Comment(text) => writeln!(f, "{}// {}", pad, text),
            Stmt::Label(label) => writeln!(f, "{}label {}", pad, label),
            Stmt::Inhale(e) => writeln!(f, "{}inhale {}", pad, e),
            Stmt::Exhale(e) => writeln!(f, "{}exhale {}", pad, e),
            Stmt::Assert(e) => writeln!(f, "{}assert {}", pad, e),
            Stmt::Assign(target, source) => writeln!(f, "{}{} := {}", pad, target, source),
            Stmt::MethodCall(name, args, targets) => {
                write!(f, "{}", pad)?;
                for (i, target) in targets.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", target)?;
                }
                if !targets.is_empty() {
                    write!(f, " := ")?;
                }
                write!(f, "{}(", name)?;
                write_comma_separated(f, args)?;
                writeln!(f, ")")
            }
            Stmt::Fold(name, args, perm) => {
                write!(f, "{}fold acc({}(", pad, name)?;
                write_comma_separated(f, args)?;
                writeln!(f, "), {})", perm)
            }
            Stmt::Unfold(name, args, perm) => {
                write!(f, "{}unfold acc({}(", pad, name)?;
                write_comma_separated(f, args)?;
                writeln!(f, "), {})", perm)
            }
            Stmt::Goto(label) => writeln!(f, "{}goto {}", pad, label),
            Stmt::If(guard, then_stmts, else_stmts) => {
                writeln!(f, "{}if ({}) {{", pad, guard)?;
                for stmt in then_stmts {
                    stmt.write_indented(f, indent + 1)?;
                }
                if else_stmts.is_empty() {
                    writeln!(f, "{}}}", pad)
                } else {
                    writeln!(f, "{}}} else {{", pad)?;
                    for stmt in else_stmts {
                        stmt.write_indented(f, indent + 1)?;
                    }
                    writeln!(f, "{}}}", pad)
                }
            }
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub typ: Type,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub name: String,
    pub formal_args: Vec<LocalVarDecl>,
    pub body: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: String,
    pub formal_args: Vec<LocalVarDecl>,
    pub return_type: Type,
    pub pres: Vec<Expr>,
    pub posts: Vec<Expr>,
    pub body: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DomainFunc {
    pub name: String,
    pub formal_args: Vec<LocalVarDecl>,
    pub return_type: Type,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DomainAxiom {
    pub name: String,
    pub expr: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Domain {
    pub name: String,
    pub functions: Vec<DomainFunc>,
    pub axioms: Vec<DomainAxiom>,
}

/// A method declaration. `body: None` is a stub whose contract is assumed.
#[derive(Clone, Debug, PartialEq)]
pub struct Method {
    pub name: String,
    pub formal_args: Vec<LocalVarDecl>,
    pub formal_returns: Vec<LocalVarDecl>,
    pub local_vars: Vec<LocalVarDecl>,
    pub pres: Vec<Expr>,
    pub posts: Vec<Expr>,
    pub body: Option<Vec<Stmt>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub name: String,
    pub domains: Vec<Domain>,
    pub fields: Vec<Field>,
    pub functions: Vec<Function>,
    pub predicates: Vec<Predicate>,
    pub methods: Vec<Method>,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "domain {} {{", self.name)?;
        for func in &self.functions {
            write!(f, "  function {}(", func.name)?;
            write_comma_separated(f, &func.formal_args)?;
            writeln!(f, "): {}", func.return_type)?;
        }
        for axiom in &self.axioms {
            writeln!(f, "  axiom {} {{ {} }}", axiom.name, axiom.expr)?;
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function {}(", self.name)?;
        write_comma_separated(f, &self.formal_args)?;
        writeln!(f, "): {}", self.return_type)?;
        for pre in &self.pres {
            writeln!(f, "  requires {}", pre)?;
        }
        for post in &self.posts {
            writeln!(f, "  ensures {}", post)?;
        }
        match &self.body {
            Some(body) => writeln!(f, "{{ {} }}", body),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "predicate {}(", self.name)?;
        write_comma_separated(f, &self.formal_args)?;
        write!(f, ")")?;
        match &self.body {
            Some(body) => writeln!(f, " {{ {} }}", body),
            None => writeln!(f),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "method {}(", self.name)?;
        write_comma_separated(f, &self.formal_args)?;
        write!(f, ") returns (")?;
        write_comma_separated(f, &self.formal_returns)?;
        writeln!(f, ")")?;
        for pre in &self.pres {
            writeln!(f, "  requires {}", pre)?;
        }
        for post in &self.posts {
            writeln!(f, "  ensures {}", post)?;
        }
        if let Some(body) = &self.body {
            writeln!(f, "{{")?;
            for var in &self.local_vars {
                writeln!(f, "  var {}", var)?;
            }
            for stmt in body {
                stmt.write_indented(f, 1)?;
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "// program: {}", self.name)?;
        for domain in &self.domains {
            writeln!(f, "{}", domain)?;
        }
        for field in &self.fields {
            writeln!(f, "field {}: {}", field.name, field.typ)?;
        }
        for predicate in &self.predicates {
            write!(f, "{}", predicate)?;
        }
        for function in &self.functions {
            writeln!(f, "{}", function)?;
        }
        for method in &self.methods {
            writeln!(f, "{}", method)?;
        }
        Ok(())
    }
}
