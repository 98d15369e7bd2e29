//! Generic traversal over expressions and statements. Every pass is written
//! against one of these shapes, overriding only the node kinds it cares
//! about; the defaults do a plain recursive descent.

use crate::ast::{
    BinOpKind, CastKind, Const, ContainerOp, DomainFunc, EnumVariantIndex, Expr, Field, LocalVar,
    PermAmount, Position, Stmt, Type, TypeId,
};
use crate::borrows::Borrow;
use rustc_hash::FxHashSet;

// IR trees coming out of the encoder can be deep enough to overflow the
// default thread stack, so the recursive defaults grow it on demand.
const STACK_RED_ZONE_BYTES: usize = 64 * 1024;
const STACK_GROW_BYTES: usize = 2 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Rewriting folder

pub trait ExprFolder: Sized {
    fn fold(&mut self, e: Expr) -> Expr {
        default_fold_expr(self, e)
    }

    fn fold_boxed(&mut self, e: Box<Expr>) -> Box<Expr> {
        Box::new(self.fold(*e))
    }

    fn fold_local(&mut self, var: LocalVar, pos: Position) -> Expr {
        Expr::Local(var, pos)
    }

    fn fold_field(&mut self, base: Box<Expr>, field: Field, pos: Position) -> Expr {
        Expr::Field(self.fold_boxed(base), field, pos)
    }

    fn fold_const(&mut self, value: Const, pos: Position) -> Expr {
        Expr::Const(value, pos)
    }

    fn fold_labelled_old(&mut self, label: String, base: Box<Expr>, pos: Position) -> Expr {
        Expr::LabelledOld(label, self.fold_boxed(base), pos)
    }

    fn fold_magic_wand(
        &mut self,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        borrow: Option<Borrow>,
        pos: Position,
    ) -> Expr {
        Expr::MagicWand(self.fold_boxed(lhs), self.fold_boxed(rhs), borrow, pos)
    }

    fn fold_predicate_access_predicate(
        &mut self,
        typ: TypeId,
        arg: Box<Expr>,
        perm: PermAmount,
        pos: Position,
    ) -> Expr {
        Expr::PredicateAccessPredicate(typ, self.fold_boxed(arg), perm, pos)
    }

    fn fold_field_access_predicate(
        &mut self,
        place: Box<Expr>,
        perm: PermAmount,
        pos: Position,
    ) -> Expr {
        Expr::FieldAccessPredicate(self.fold_boxed(place), perm, pos)
    }

    fn fold_unary_op(&mut self, kind: crate::ast::UnaryOpKind, e: Box<Expr>, pos: Position) -> Expr {
        Expr::UnaryOp(kind, self.fold_boxed(e), pos)
    }

    fn fold_bin_op(
        &mut self,
        kind: BinOpKind,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        pos: Position,
    ) -> Expr {
        Expr::BinOp(kind, self.fold_boxed(lhs), self.fold_boxed(rhs), pos)
    }

    fn fold_container_op(&mut self, op: ContainerOp, pos: Position) -> Expr {
        let op = match op {
            ContainerOp::SeqIndex(seq, idx) => {
                ContainerOp::SeqIndex(self.fold_boxed(seq), self.fold_boxed(idx))
            }
            ContainerOp::SeqConcat(lhs, rhs) => {
                ContainerOp::SeqConcat(self.fold_boxed(lhs), self.fold_boxed(rhs))
            }
            ContainerOp::SeqLen(seq) => ContainerOp::SeqLen(self.fold_boxed(seq)),
        };
        Expr::ContainerOp(op, pos)
    }

    fn fold_cond(
        &mut self,
        guard: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        pos: Position,
    ) -> Expr {
        Expr::Cond(
            self.fold_boxed(guard),
            self.fold_boxed(then_expr),
            self.fold_boxed(else_expr),
            pos,
        )
    }

    fn fold_forall(&mut self, vars: Vec<LocalVar>, body: Box<Expr>, pos: Position) -> Expr {
        Expr::ForAll(vars, self.fold_boxed(body), pos)
    }

    fn fold_let_expr(
        &mut self,
        var: LocalVar,
        def: Box<Expr>,
        body: Box<Expr>,
        pos: Position,
    ) -> Expr {
        Expr::LetExpr(var, self.fold_boxed(def), self.fold_boxed(body), pos)
    }

    fn fold_func_app(
        &mut self,
        name: String,
        args: Vec<Expr>,
        formal_args: Vec<LocalVar>,
        return_type: Type,
        pos: Position,
    ) -> Expr {
        let args = args.into_iter().map(|arg| self.fold(arg)).collect();
        Expr::FuncApp(name, args, formal_args, return_type, pos)
    }

    fn fold_domain_func_app(&mut self, func: DomainFunc, args: Vec<Expr>, pos: Position) -> Expr {
        let args = args.into_iter().map(|arg| self.fold(arg)).collect();
        Expr::DomainFuncApp(func, args, pos)
    }

    fn fold_cast(&mut self, kind: CastKind, e: Box<Expr>, pos: Position) -> Expr {
        Expr::Cast(kind, self.fold_boxed(e), pos)
    }

    fn fold_unfolding(
        &mut self,
        typ: TypeId,
        args: Vec<Expr>,
        body: Box<Expr>,
        perm: PermAmount,
        variant: Option<EnumVariantIndex>,
        pos: Position,
    ) -> Expr {
        let args = args.into_iter().map(|arg| self.fold(arg)).collect();
        Expr::Unfolding(typ, args, self.fold_boxed(body), perm, variant, pos)
    }
}

pub fn default_fold_expr<T: ExprFolder>(this: &mut T, e: Expr) -> Expr {
    stacker::maybe_grow(STACK_RED_ZONE_BYTES, STACK_GROW_BYTES, move || match e {
        Expr::Local(var, p) => this.fold_local(var, p),
        Expr::Field(base, field, p) => this.fold_field(base, field, p),
        Expr::Const(value, p) => this.fold_const(value, p),
        Expr::LabelledOld(label, base, p) => this.fold_labelled_old(label, base, p),
        Expr::MagicWand(lhs, rhs, borrow, p) => this.fold_magic_wand(lhs, rhs, borrow, p),
        Expr::PredicateAccessPredicate(typ, arg, perm, p) => {
            this.fold_predicate_access_predicate(typ, arg, perm, p)
        }
        Expr::FieldAccessPredicate(place, perm, p) => {
            this.fold_field_access_predicate(place, perm, p)
        }
        Expr::UnaryOp(kind, expr, p) => this.fold_unary_op(kind, expr, p),
        Expr::BinOp(kind, lhs, rhs, p) => this.fold_bin_op(kind, lhs, rhs, p),
        Expr::ContainerOp(op, p) => this.fold_container_op(op, p),
        Expr::Cond(guard, then_expr, else_expr, p) => this.fold_cond(guard, then_expr, else_expr, p),
        Expr::ForAll(vars, body, p) => this.fold_forall(vars, body, p),
        Expr::LetExpr(var, def, body, p) => this.fold_let_expr(var, def, body, p),
        Expr::FuncApp(name, args, formals, ret, p) => {
            this.fold_func_app(name, args, formals, ret, p)
        }
        Expr::DomainFuncApp(func, args, p) => this.fold_domain_func_app(func, args, p),
        Expr::Cast(kind, expr, p) => this.fold_cast(kind, expr, p),
        Expr::Unfolding(typ, args, body, perm, variant, p) => {
            this.fold_unfolding(typ, args, body, perm, variant, p)
        }
    })
}

// ---------------------------------------------------------------------------
// Fallible folder: aborts on the first error instead of unwinding.

pub trait FallibleExprFolder: Sized {
    type Error;

    fn fallible_fold(&mut self, e: Expr) -> Result<Expr, Self::Error> {
        default_fallible_fold_expr(self, e)
    }

    fn fallible_fold_boxed(&mut self, e: Box<Expr>) -> Result<Box<Expr>, Self::Error> {
        Ok(Box::new(self.fallible_fold(*e)?))
    }

    fn fallible_fold_local(&mut self, var: LocalVar, pos: Position) -> Result<Expr, Self::Error> {
        Ok(Expr::Local(var, pos))
    }

    fn fallible_fold_field(
        &mut self,
        base: Box<Expr>,
        field: Field,
        pos: Position,
    ) -> Result<Expr, Self::Error> {
        Ok(Expr::Field(self.fallible_fold_boxed(base)?, field, pos))
    }

    fn fallible_fold_const(&mut self, value: Const, pos: Position) -> Result<Expr, Self::Error> {
        Ok(Expr::Const(value, pos))
    }

    fn fallible_fold_labelled_old(
        &mut self,
        label: String,
        base: Box<Expr>,
        pos: Position,
    ) -> Result<Expr, Self::Error> {
        Ok(Expr::LabelledOld(label, self.fallible_fold_boxed(base)?, pos))
    }

    fn fallible_fold_magic_wand(
        &mut self,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        borrow: Option<Borrow>,
        pos: Position,
    ) -> Result<Expr, Self::Error> {
        Ok(Expr::MagicWand(
            self.fallible_fold_boxed(lhs)?,
            self.fallible_fold_boxed(rhs)?,
            borrow,
            pos,
        ))
    }

    fn fallible_fold_predicate_access_predicate(
        &mut self,
        typ: TypeId,
        arg: Box<Expr>,
        perm: PermAmount,
        pos: Position,
    ) -> Result<Expr, Self::Error> {
        Ok(Expr::PredicateAccessPredicate(
            typ,
            self.fallible_fold_boxed(arg)?,
            perm,
            pos,
        ))
    }

    fn fallible_fold_field_access_predicate(
        &mut self,
        place: Box<Expr>,
        perm: PermAmount,
        pos: Position,
    ) -> Result<Expr, Self::Error> {
        Ok(Expr::FieldAccessPredicate(
            self.fallible_fold_boxed(place)?,
            perm,
            pos,
        ))
    }

    fn fallible_fold_unary_op(
        &mut self,
        kind: crate::ast::UnaryOpKind,
        e: Box<Expr>,
        pos: Position,
    ) -> Result<Expr, Self::Error> {
        Ok(Expr::UnaryOp(kind, self.fallible_fold_boxed(e)?, pos))
    }

    fn fallible_fold_bin_op(
        &mut self,
        kind: BinOpKind,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        pos: Position,
    ) -> Result<Expr, Self::Error> {
        Ok(Expr::BinOp(
            kind,
            self.fallible_fold_boxed(lhs)?,
            self.fallible_fold_boxed(rhs)?,
            pos,
        ))
    }

    fn fallible_fold_container_op(
        &mut self,
        op: ContainerOp,
        pos: Position,
    ) -> Result<Expr, Self::Error> {
        let op = match op {
            ContainerOp::SeqIndex(seq, idx) => ContainerOp::SeqIndex(
                self.fallible_fold_boxed(seq)?,
                self.fallible_fold_boxed(idx)?,
            ),
            ContainerOp::SeqConcat(lhs, rhs) => ContainerOp::SeqConcat(
                self.fallible_fold_boxed(lhs)?,
                self.fallible_fold_boxed(rhs)?,
            ),
            ContainerOp::SeqLen(seq) => ContainerOp::SeqLen(self.fallible_fold_boxed(seq)?),
        };
        Ok(Expr::ContainerOp(op, pos))
    }

    fn fallible_fold_cond(
        &mut self,
        guard: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        pos: Position,
    ) -> Result<Expr, Self::Error> {
        Ok(Expr::Cond(
            self.fallible_fold_boxed(guard)?,
            self.fallible_fold_boxed(then_expr)?,
            self.fallible_fold_boxed(else_expr)?,
            pos,
        ))
    }

    fn fallible_fold_forall(
        &mut self,
        vars: Vec<LocalVar>,
        body: Box<Expr>,
        pos: Position,
    ) -> Result<Expr, Self::Error> {
        Ok(Expr::ForAll(vars, self.fallible_fold_boxed(body)?, pos))
    }

    fn fallible_fold_let_expr(
        &mut self,
        var: LocalVar,
        def: Box<Expr>,
        body: Box<Expr>,
        pos: Position,
    ) -> Result<Expr, Self::Error> {
        Ok(Expr::LetExpr(
            var,
            self.fallible_fold_boxed(def)?,
            self.fallible_fold_boxed(body)?,
            pos,
        ))
    }

    fn fallible_fold_func_app(
        &mut self,
        name: String,
        args: Vec<Expr>,
        formal_args: Vec<LocalVar>,
        return_type: Type,
        pos: Position,
    ) -> Result<Expr, Self::Error> {
        let args = args
            .into_iter()
            .map(|arg| self.fallible_fold(arg))
            .collect::<Result<_, _>>()?;
        Ok(Expr::FuncApp(name, args, formal_args, return_type, pos))
    }

    fn fallible_fold_domain_func_app(
        &mut self,
        func: DomainFunc,
        args: Vec<Expr>,
        pos: Position,
    ) -> Result<Expr, Self::Error> {
        let args = args
            .into_iter()
            .map(|arg| self.fallible_fold(arg))
            .collect::<Result<_, _>>()?;
        Ok(Expr::DomainFuncApp(func, args, pos))
    }

    fn fallible_fold_cast(
        &mut self,
        kind: CastKind,
        e: Box<Expr>,
        pos: Position,
    ) -> Result<Expr, Self::Error> {
        Ok(Expr::Cast(kind, self.fallible_fold_boxed(e)?, pos))
    }

    fn fallible_fold_unfolding(
        &mut self,
        typ: TypeId,
        args: Vec<Expr>,
        body: Box<Expr>,
        perm: PermAmount,
        variant: Option<EnumVariantIndex>,
        pos: Position,
    ) -> Result<Expr, Self::Error> {
        let args = args
            .into_iter()
            .map(|arg| self.fallible_fold(arg))
            .collect::<Result<_, _>>()?;
        Ok(Expr::Unfolding(
            typ,
            args,
            self.fallible_fold_boxed(body)?,
            perm,
            variant,
            pos,
        ))
    }
}

pub fn default_fallible_fold_expr<T: FallibleExprFolder>(
    this: &mut T,
    e: Expr,
) -> Result<Expr, T::Error> {
    stacker::maybe_grow(STACK_RED_ZONE_BYTES, STACK_GROW_BYTES, move || match e {
        Expr::Local(var, p) => this.fallible_fold_local(var, p),
        Expr::Field(base, field, p) => this.fallible_fold_field(base, field, p),
        Expr::Const(value, p) => this.fallible_fold_const(value, p),
        Expr::LabelledOld(label, base, p) => this.fallible_fold_labelled_old(label, base, p),
        Expr::MagicWand(lhs, rhs, borrow, p) => this.fallible_fold_magic_wand(lhs, rhs, borrow, p),
        Expr::PredicateAccessPredicate(typ, arg, perm, p) => {
            this.fallible_fold_predicate_access_predicate(typ, arg, perm, p)
        }
        Expr::FieldAccessPredicate(place, perm, p) => {
            this.fallible_fold_field_access_predicate(place, perm, p)
        }
        Expr::UnaryOp(kind, expr, p) => this.fallible_fold_unary_op(kind, expr, p),
        Expr::BinOp(kind, lhs, rhs, p) => this.fallible_fold_bin_op(kind, lhs, rhs, p),
        Expr::ContainerOp(op, p) => this.fallible_fold_container_op(op, p),
        Expr::Cond(guard, then_expr, else_expr, p) => {
            this.fallible_fold_cond(guard, then_expr, else_expr, p)
        }
        Expr::ForAll(vars, body, p) => this.fallible_fold_forall(vars, body, p),
        Expr::LetExpr(var, def, body, p) => this.fallible_fold_let_expr(var, def, body, p),
        Expr::FuncApp(name, args, formals, ret, p) => {
            this.fallible_fold_func_app(name, args, formals, ret, p)
        }
        Expr::DomainFuncApp(func, args, p) => this.fallible_fold_domain_func_app(func, args, p),
        Expr::Cast(kind, expr, p) => this.fallible_fold_cast(kind, expr, p),
        Expr::Unfolding(typ, args, body, perm, variant, p) => {
            this.fallible_fold_unfolding(typ, args, body, perm, variant, p)
        }
    })
}

// ---------------------------------------------------------------------------
// Read-only walker

pub trait ExprWalker: Sized {
    fn walk(&mut self, e: &Expr) {
        default_walk_expr(self, e)
    }

    fn walk_local_var(&mut self, _var: &LocalVar) {}

    fn walk_local(&mut self, var: &LocalVar, _pos: Position) {
        self.walk_local_var(var);
    }

    fn walk_field(&mut self, base: &Expr, _field: &Field, _pos: Position) {
        self.walk(base);
    }

    fn walk_const(&mut self, _value: &Const, _pos: Position) {}

    fn walk_labelled_old(&mut self, _label: &str, base: &Expr, _pos: Position) {
        self.walk(base);
    }

    fn walk_magic_wand(
        &mut self,
        lhs: &Expr,
        rhs: &Expr,
        _borrow: Option<Borrow>,
        _pos: Position,
    ) {
        self.walk(lhs);
        self.walk(rhs);
    }

    fn walk_predicate_access_predicate(
        &mut self,
        _typ: &TypeId,
        arg: &Expr,
        _perm: PermAmount,
        _pos: Position,
    ) {
        self.walk(arg);
    }

    fn walk_field_access_predicate(&mut self, place: &Expr, _perm: PermAmount, _pos: Position) {
        self.walk(place);
    }

    fn walk_unary_op(&mut self, _kind: crate::ast::UnaryOpKind, e: &Expr, _pos: Position) {
        self.walk(e);
    }

    fn walk_bin_op(&mut self, _kind: BinOpKind, lhs: &Expr, rhs: &Expr, _pos: Position) {
        self.walk(lhs);
        self.walk(rhs);
    }

    fn walk_container_op(&mut self, op: &ContainerOp, _pos: Position) {
        match op {
            ContainerOp::SeqIndex(seq, idx) => {
                self.walk(seq);
                self.walk(idx);
            }
            ContainerOp::SeqConcat(lhs, rhs) => {
                self.walk(lhs);
                self.walk(rhs);
            }
            ContainerOp::SeqLen(seq) => self.walk(seq),
        }
    }

    fn walk_cond(&mut self, guard: &Expr, then_expr: &Expr, else_expr: &Expr, _pos: Position) {
        self.walk(guard);
        self.walk(then_expr);
        self.walk(else_expr);
    }

    fn walk_forall(&mut self, vars: &[LocalVar], body: &Expr, _pos: Position) {
        for var in vars {
            self.walk_local_var(var);
        }
        self.walk(body);
    }

    fn walk_let_expr(&mut self, var: &LocalVar, def: &Expr, body: &Expr, _pos: Position) {
        self.walk_local_var(var);
        self.walk(def);
        self.walk(body);
    }

    fn walk_func_app(
        &mut self,
        _name: &str,
        args: &[Expr],
        _formal_args: &[LocalVar],
        _return_type: &Type,
        _pos: Position,
    ) {
        for arg in args {
            self.walk(arg);
        }
    }

    fn walk_domain_func_app(&mut self, _func: &DomainFunc, args: &[Expr], _pos: Position) {
        for arg in args {
            self.walk(arg);
        }
    }

    fn walk_cast(&mut self, _kind: CastKind, e: &Expr, _pos: Position) {
        self.walk(e);
    }

    fn walk_unfolding(
        &mut self,
        _typ: &TypeId,
        args: &[Expr],
        body: &Expr,
        _perm: PermAmount,
        _variant: Option<EnumVariantIndex>,
        _pos: Position,
    ) {
        for arg in args {
            self.walk(arg);
        }
        self.walk(body);
    }
}

pub fn default_walk_expr<T: ExprWalker>(this: &mut T, e: &Expr) {
    stacker::maybe_grow(STACK_RED_ZONE_BYTES, STACK_GROW_BYTES, move || match e {
        Expr::Local(var, p) => this.walk_local(var, *p),
        Expr::Field(base, field, p) => this.walk_field(base, field, *p),
        Expr::Const(value, p) => this.walk_const(value, *p),
        Expr::LabelledOld(label, base, p) => this.walk_labelled_old(label, base, *p),
        Expr::MagicWand(lhs, rhs, borrow, p) => this.walk_magic_wand(lhs, rhs, *borrow, *p),
        Expr::PredicateAccessPredicate(typ, arg, perm, p) => {
            this.walk_predicate_access_predicate(typ, arg, *perm, *p)
        }
        Expr::FieldAccessPredicate(place, perm, p) => {
            this.walk_field_access_predicate(place, *perm, *p)
        }
        Expr::UnaryOp(kind, expr, p) => this.walk_unary_op(*kind, expr, *p),
        Expr::BinOp(kind, lhs, rhs, p) => this.walk_bin_op(*kind, lhs, rhs, *p),
        Expr::ContainerOp(op, p) => this.walk_container_op(op, *p),
        Expr::Cond(guard, then_expr, else_expr, p) => {
            this.walk_cond(guard, then_expr, else_expr, *p)
        }
        Expr::ForAll(vars, body, p) => this.walk_forall(vars, body, *p),
        Expr::LetExpr(var, def, body, p) => this.walk_let_expr(var, def, body, *p),
        Expr::FuncApp(name, args, formals, ret, p) => {
            this.walk_func_app(name, args, formals, ret, *p)
        }
        Expr::DomainFuncApp(func, args, p) => this.walk_domain_func_app(func, args, *p),
        Expr::Cast(kind, expr, p) => this.walk_cast(*kind, expr, *p),
        Expr::Unfolding(typ, args, body, perm, variant, p) => {
            this.walk_unfolding(typ, args, body, *perm, *variant, *p)
        }
    })
}

// ---------------------------------------------------------------------------
// Statement-level shapes. Nested expressions go through `fold_expr` /
// `walk_expr`, which passes typically wire to an expression shape.

pub trait StmtFolder {
    fn fold(&mut self, stmt: Stmt) -> Stmt {
        default_fold_stmt(self, stmt)
    }

    fn fold_expr(&mut self, e: Expr) -> Expr {
        e
    }
}

pub fn default_fold_stmt<T: StmtFolder + ?Sized>(this: &mut T, stmt: Stmt) -> Stmt {
    match stmt {
        Stmt::Comment(text) => Stmt::Comment(text),
        Stmt::Label(label, p) => Stmt::Label(label, p),
        Stmt::Inhale(e, p) => Stmt::Inhale(this.fold_expr(e), p),
        Stmt::Exhale(e, p) => Stmt::Exhale(this.fold_expr(e), p),
        Stmt::Assert(e, p) => Stmt::Assert(this.fold_expr(e), p),
        Stmt::MethodCall(name, args, targets, p) => Stmt::MethodCall(
            name,
            args.into_iter().map(|arg| this.fold_expr(arg)).collect(),
            targets,
            p,
        ),
        Stmt::Assign(target, source, kind, p) => {
            Stmt::Assign(this.fold_expr(target), this.fold_expr(source), kind, p)
        }
        Stmt::Fold(typ, args, perm, variant, p) => Stmt::Fold(
            typ,
            args.into_iter().map(|arg| this.fold_expr(arg)).collect(),
            perm,
            variant,
            p,
        ),
        Stmt::Unfold(typ, args, perm, variant, p) => Stmt::Unfold(
            typ,
            args.into_iter().map(|arg| this.fold_expr(arg)).collect(),
            perm,
            variant,
            p,
        ),
        Stmt::ExpireBorrows(borrows, p) => Stmt::ExpireBorrows(borrows, p),
    }
}

pub trait FallibleStmtFolder {
    type Error;

    fn fallible_fold(&mut self, stmt: Stmt) -> Result<Stmt, Self::Error> {
        default_fallible_fold_stmt(self, stmt)
    }

    fn fallible_fold_expr(&mut self, e: Expr) -> Result<Expr, Self::Error> {
        Ok(e)
    }
}

pub fn default_fallible_fold_stmt<T: FallibleStmtFolder + ?Sized>(
    this: &mut T,
    stmt: Stmt,
) -> Result<Stmt, T::Error> {
    Ok(match stmt {
        Stmt::Comment(text) => Stmt::Comment(text),
        Stmt::Label(label, p) => Stmt::Label(label, p),
        Stmt::Inhale(e, p) => Stmt::Inhale(this.fallible_fold_expr(e)?, p),
        Stmt::Exhale(e, p) => Stmt::Exhale(this.fallible_fold_expr(e)?, p),
        Stmt::Assert(e, p) => Stmt::Assert(this.fallible_fold_expr(e)?, p),
        Stmt::MethodCall(name, args, targets, p) => Stmt::MethodCall(
            name,
            args.into_iter()
                .map(|arg| this.fallible_fold_expr(arg))
                .collect::<Result<_, _>>()?,
            targets,
            p,
        ),
        Stmt::Assign(target, source, kind, p) => Stmt::Assign(
            this.fallible_fold_expr(target)?,
            this.fallible_fold_expr(source)?,
            kind,
            p,
        ),
        Stmt::Fold(typ, args, perm, variant, p) => Stmt::Fold(
            typ,
            args.into_iter()
                .map(|arg| this.fallible_fold_expr(arg))
                .collect::<Result<_, _>>()?,
            perm,
            variant,
            p,
        ),
        Stmt::Unfold(typ, args, perm, variant, p) => Stmt::Unfold(
            typ,
            args.into_iter()
                .map(|arg| this.fallible_fold_expr(arg))
                .collect::<Result<_, _>>()?,
            perm,
            variant,
            p,
        ),
        Stmt::ExpireBorrows(borrows, p) => Stmt::ExpireBorrows(borrows, p),
    })
}

pub trait StmtWalker {
    fn walk(&mut self, stmt: &Stmt) {
        default_walk_stmt(self, stmt)
    }

    fn walk_expr(&mut self, _e: &Expr) {}
}

pub fn default_walk_stmt<T: StmtWalker + ?Sized>(this: &mut T, stmt: &Stmt) {
    match stmt {
        Stmt::Comment(_) | Stmt::Label(_, _) | Stmt::ExpireBorrows(_, _) => {}
        Stmt::Inhale(e, _) | Stmt::Exhale(e, _) | Stmt::Assert(e, _) => this.walk_expr(e),
        Stmt::MethodCall(_, args, _, _) => {
            for arg in args {
                this.walk_expr(arg);
            }
        }
        Stmt::Assign(target, source, _, _) => {
            this.walk_expr(target);
            this.walk_expr(source);
        }
        Stmt::Fold(_, args, _, _, _) | Stmt::Unfold(_, args, _, _, _) => {
            for arg in args {
                this.walk_expr(arg);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Common traversal instances

/// Folder that rebuilds the tree unchanged. Useful as a baseline and for
/// testing that the default descent reconstructs every node faithfully.
pub struct IdentityFolder;

impl ExprFolder for IdentityFolder {}

/// Capture-avoiding substitution of a local variable by an expression.
pub fn substitute_local(expr: Expr, var: &LocalVar, replacement: &Expr) -> Expr {
    struct Substitutor<'a> {
        var: &'a LocalVar,
        replacement: &'a Expr,
    }

    impl ExprFolder for Substitutor<'_> {
        fn fold_local(&mut self, var: LocalVar, pos: Position) -> Expr {
            if &var == self.var {
                self.replacement.clone()
            } else {
                Expr::Local(var, pos)
            }
        }

        fn fold_forall(&mut self, vars: Vec<LocalVar>, body: Box<Expr>, pos: Position) -> Expr {
            if vars.contains(self.var) {
                // Shadowed; leave the body alone.
                Expr::ForAll(vars, body, pos)
            } else {
                Expr::ForAll(vars, self.fold_boxed(body), pos)
            }
        }

        fn fold_let_expr(
            &mut self,
            var: LocalVar,
            def: Box<Expr>,
            body: Box<Expr>,
            pos: Position,
        ) -> Expr {
            let def = self.fold_boxed(def);
            if &var == self.var {
                Expr::LetExpr(var, def, body, pos)
            } else {
                Expr::LetExpr(var, def, self.fold_boxed(body), pos)
            }
        }
    }

    Substitutor { var, replacement }.fold(expr)
}

/// Variables occurring free in the expression.
pub fn free_variables(expr: &Expr) -> FxHashSet<LocalVar> {
    struct Collector {
        bound: Vec<LocalVar>,
        free: FxHashSet<LocalVar>,
    }

    impl ExprWalker for Collector {
        fn walk_local(&mut self, var: &LocalVar, _pos: Position) {
            if !self.bound.contains(var) {
                self.free.insert(var.clone());
            }
        }

        fn walk_forall(&mut self, vars: &[LocalVar], body: &Expr, _pos: Position) {
            let depth = self.bound.len();
            self.bound.extend(vars.iter().cloned());
            self.walk(body);
            self.bound.truncate(depth);
        }

        fn walk_let_expr(&mut self, var: &LocalVar, def: &Expr, body: &Expr, _pos: Position) {
            self.walk(def);
            self.bound.push(var.clone());
            self.walk(body);
            self.bound.pop();
        }
    }

    let mut collector = Collector {
        bound: Vec::new(),
        free: FxHashSet::default(),
    };
    collector.walk(expr);
    collector.free
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::UnaryOpKind;

    fn sample_expr() -> Expr {
        let x = LocalVar::new("x", Type::Int);
        let y = LocalVar::new("y", Type::Int);
        Expr::Cond(
            Box::new(Expr::local(x.clone()).eq_cmp(Expr::const_int(0))),
            Box::new(Expr::UnaryOp(
                UnaryOpKind::Minus,
                Box::new(Expr::local(y.clone())),
                Position::default(),
            )),
            Box::new(Expr::LetExpr(
                x.clone(),
                Box::new(Expr::const_int(1)),
                Box::new(Expr::local(x).eq_cmp(Expr::local(y))),
                Position::default(),
            )),
            Position::new(3, 7, 42),
        )
    }

    #[test]
    fn identity_fold_is_structural_identity() {
        let expr = sample_expr();
        assert_eq!(IdentityFolder.fold(expr.clone()), expr);
    }

    #[test]
    fn substitution_respects_shadowing() {
        let x = LocalVar::new("x", Type::Int);
        let expr = sample_expr();
        let substituted = substitute_local(expr, &x, &Expr::const_int(9));

        // The guard's `x` is free and must be replaced; the let-bound `x`
        // in the else branch must stay.
        match &substituted {
            Expr::Cond(guard, _, els, _) => {
                assert_eq!(guard.to_string(), "(9 == 0)");
                assert_eq!(els.to_string(), "(let x == (1) in (x == y))");
            }
            other => panic!("unexpected shape: {}", other),
        }
    }

    #[test]
    fn free_variable_collection() {
        let expr = sample_expr();
        let free = free_variables(&expr);
        let names: Vec<_> = {
            let mut names: Vec<_> = free.iter().map(|v| v.name.clone()).collect();
            names.sort();
            names
        };
        assert_eq!(names, vec!["x", "y"]);
    }
}
