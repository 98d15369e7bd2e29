//! Expression and type lowering. Total except where the surface language
//! has no encoding for a construct; those cases fail with
//! [`LoweringError::NoEncoding`] carrying the offending node and position.

use crate::ast;
use crate::error::LoweringError;
use veil_vir::ast::{
    BinOpKind, CastKind, Const, ContainerOp, Expr, Float, FloatConst, LocalVar, PermAmount,
    Position, Type, UnaryOpKind,
};

/// Bit-vector widths the surface language can express. Anything else has no
/// encoding.
pub const ENCODABLE_BITVEC_WIDTHS: &[u32] = &[8, 16, 32, 64, 128];

fn check_bitvec_width(
    width: u32,
    node: impl ToString,
    position: Position,
) -> Result<(), LoweringError> {
    if ENCODABLE_BITVEC_WIDTHS.contains(&width) {
        Ok(())
    } else {
        Err(LoweringError::NoEncoding {
            node: node.to_string(),
            position,
        })
    }
}

pub fn lower_type(typ: &Type, position: Position) -> Result<ast::Type, LoweringError> {
    Ok(match typ {
        Type::Int => ast::Type::Int,
        Type::Bool => ast::Type::Bool,
        Type::Float(Float::F32) => ast::Type::Float32,
        Type::Float(Float::F64) => ast::Type::Float64,
        Type::BitVec(width) => {
            check_bitvec_width(*width, typ, position)?;
            ast::Type::BitVec(*width)
        }
        Type::Seq(elem) => ast::Type::Seq(Box::new(lower_type(elem, position)?)),
        Type::TypedRef(_) => ast::Type::Ref,
        Type::Domain(name) => ast::Type::Domain(name.clone()),
    })
}

pub fn lower_local(var: &LocalVar, position: Position) -> Result<ast::LocalVarDecl, LoweringError> {
    Ok(ast::LocalVarDecl::new(
        var.name.clone(),
        lower_type(&var.typ, position)?,
    ))
}

pub fn lower_perm(perm: PermAmount) -> ast::Expr {
    ast::Expr::PermLit(perm.num(), perm.den())
}

fn lower_un_op(kind: UnaryOpKind) -> ast::UnOp {
    match kind {
        UnaryOpKind::Not => ast::UnOp::Not,
        UnaryOpKind::Minus => ast::UnOp::Minus,
    }
}

fn lower_bin_op(kind: BinOpKind) -> ast::BinOp {
    match kind {
        BinOpKind::EqCmp => ast::BinOp::EqCmp,
        BinOpKind::NeCmp => ast::BinOp::NeCmp,
        BinOpKind::GtCmp => ast::BinOp::GtCmp,
        BinOpKind::GeCmp => ast::BinOp::GeCmp,
        BinOpKind::LtCmp => ast::BinOp::LtCmp,
        BinOpKind::LeCmp => ast::BinOp::LeCmp,
        BinOpKind::Add => ast::BinOp::Add,
        BinOpKind::Sub => ast::BinOp::Sub,
        BinOpKind::Mul => ast::BinOp::Mul,
        BinOpKind::Div => ast::BinOp::Div,
        BinOpKind::Mod => ast::BinOp::Mod,
        BinOpKind::And => ast::BinOp::And,
        BinOpKind::Or => ast::BinOp::Or,
        BinOpKind::Implies => ast::BinOp::Implies,
    }
}

fn lower_boxed(e: &Expr) -> Result<Box<ast::Expr>, LoweringError> {
    Ok(Box::new(lower_expr(e)?))
}

fn lower_all(exprs: &[Expr]) -> Result<Vec<ast::Expr>, LoweringError> {
    exprs.iter().map(lower_expr).collect()
}

pub fn lower_expr(e: &Expr) -> Result<ast::Expr, LoweringError> {
    Ok(match e {
        Expr::Local(var, _) => ast::Expr::Local(var.name.clone()),
        Expr::Field(base, field, _) => {
            ast::Expr::FieldAccess(lower_boxed(base)?, field.name.clone())
        }
        Expr::Const(Const::Bool(value), _) => ast::Expr::BoolLit(*value),
        Expr::Const(Const::Int(value), _) => ast::Expr::IntLit(*value),
        Expr::Const(Const::Float(FloatConst::F32(bits)), _) => ast::Expr::FloatLit {
            double: false,
            bits: *bits as u64,
        },
        Expr::Const(Const::Float(FloatConst::F64(bits)), _) => ast::Expr::FloatLit {
            double: true,
            bits: *bits,
        },
        Expr::Const(Const::BitVec { width, value }, pos) => {
            check_bitvec_width(*width, e, *pos)?;
            ast::Expr::BitVecLit {
                width: *width,
                value: *value,
            }
        }
        Expr::LabelledOld(label, base, _) => {
            ast::Expr::LabelledOld(label.clone(), lower_boxed(base)?)
        }
        // The borrow tag has no meaning to the verifier; expiration already
        // turned it into statements.
        Expr::MagicWand(lhs, rhs, _, _) => {
            ast::Expr::MagicWand(lower_boxed(lhs)?, lower_boxed(rhs)?)
        }
        Expr::PredicateAccessPredicate(typ, arg, perm, _) => ast::Expr::PredicateAccess(
            typ.name().to_owned(),
            vec![lower_expr(arg)?],
            Box::new(lower_perm(*perm)),
        ),
        Expr::FieldAccessPredicate(place, perm, _) => {
            ast::Expr::FieldAccessPredicate(lower_boxed(place)?, Box::new(lower_perm(*perm)))
        }
        Expr::UnaryOp(kind, inner, _) => ast::Expr::UnOp(lower_un_op(*kind), lower_boxed(inner)?),
        Expr::BinOp(kind, lhs, rhs, _) => {
            ast::Expr::BinOp(lower_bin_op(*kind), lower_boxed(lhs)?, lower_boxed(rhs)?)
        }
        Expr::ContainerOp(ContainerOp::SeqIndex(seq, idx), _) => {
            ast::Expr::SeqIndex(lower_boxed(seq)?, lower_boxed(idx)?)
        }
        Expr::ContainerOp(ContainerOp::SeqConcat(lhs, rhs), _) => {
            ast::Expr::SeqConcat(lower_boxed(lhs)?, lower_boxed(rhs)?)
        }
        Expr::ContainerOp(ContainerOp::SeqLen(seq), _) => ast::Expr::SeqLen(lower_boxed(seq)?),
        Expr::Cond(guard, then_expr, else_expr, _) => ast::Expr::Cond(
            lower_boxed(guard)?,
            lower_boxed(then_expr)?,
            lower_boxed(else_expr)?,
        ),
        Expr::ForAll(vars, body, pos) => ast::Expr::Forall(
            vars.iter()
                .map(|var| lower_local(var, *pos))
                .collect::<Result<_, _>>()?,
            lower_boxed(body)?,
        ),
        Expr::LetExpr(var, def, body, pos) => ast::Expr::Let(
            lower_local(var, *pos)?,
            lower_boxed(def)?,
            lower_boxed(body)?,
        ),
        Expr::FuncApp(name, args, _, _, _) => ast::Expr::FuncApp(name.clone(), lower_all(args)?),
        Expr::DomainFuncApp(func, args, _) => {
            ast::Expr::DomainFuncApp(func.name.clone(), lower_all(args)?)
        }
        Expr::Cast(CastKind::IntToBitVec(width), inner, pos) => {
            check_bitvec_width(*width, e, *pos)?;
            ast::Expr::IntToBitVec(*width, lower_boxed(inner)?)
        }
        Expr::Cast(CastKind::BitVecToInt(width), inner, pos) => {
            check_bitvec_width(*width, e, *pos)?;
            ast::Expr::BitVecToInt(*width, lower_boxed(inner)?)
        }
        Expr::Unfolding(typ, args, body, perm, _, _) => ast::Expr::Unfolding(
            typ.name().to_owned(),
            lower_all(args)?,
            Box::new(lower_perm(*perm)),
            lower_boxed(body)?,
        ),
    })
}
