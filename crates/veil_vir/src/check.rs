//! Well-formedness checks run before optimization and lowering. They only
//! enforce properties that later stages rely on; full type checking is the
//! front end's job.

use crate::ast::{BinOpKind, Expr, Position, Stmt, Type, TypeId, DISCRIMINANT_FIELD};
use crate::cfg::CfgMethod;
use crate::error::ConstructionError;
use crate::fold::ExprWalker;
use crate::program::Program;
use rustc_hash::FxHashSet;

struct ExprChecker<'a> {
    program: &'a Program,
    result: Result<(), ConstructionError>,
}

impl ExprChecker<'_> {
    fn record(&mut self, err: ConstructionError) {
        if self.result.is_ok() {
            self.result = Err(err);
        }
    }

    fn check_predicate_resolvable(&mut self, typ: &TypeId, position: Position) {
        if self.program.predicate(typ).is_none() {
            self.record(ConstructionError::UnresolvedPredicate {
                typ: typ.clone(),
                position,
            });
        }
    }

    fn check_operand(&mut self, expected: &Type, operand: &Expr, position: Position) {
        if let Some(found) = operand.get_type() {
            if &found != expected {
                self.record(ConstructionError::TypeMismatch {
                    expected: expected.clone(),
                    found,
                    position,
                });
            }
        }
    }
}

impl ExprWalker for ExprChecker<'_> {
    fn walk_bin_op(&mut self, kind: BinOpKind, lhs: &Expr, rhs: &Expr, pos: Position) {
        if kind.is_boolean() {
            self.check_operand(&Type::Bool, lhs, pos);
            self.check_operand(&Type::Bool, rhs, pos);
        } else if let Some(expected) = lhs.get_type() {
            // Comparisons and arithmetic require agreeing operand types.
            self.check_operand(&expected, rhs, pos);
        }
        self.walk(lhs);
        self.walk(rhs);
    }

    fn walk_predicate_access_predicate(
        &mut self,
        typ: &TypeId,
        arg: &Expr,
        _perm: crate::ast::PermAmount,
        pos: Position,
    ) {
        self.check_predicate_resolvable(typ, pos);
        self.walk(arg);
    }

    fn walk_unfolding(
        &mut self,
        typ: &TypeId,
        args: &[Expr],
        body: &Expr,
        _perm: crate::ast::PermAmount,
        _variant: Option<crate::ast::EnumVariantIndex>,
        pos: Position,
    ) {
        self.check_predicate_resolvable(typ, pos);
        for arg in args {
            self.walk(arg);
        }
        self.walk(body);
    }
}

fn check_expr(program: &Program, expr: &Expr) -> Result<(), ConstructionError> {
    let mut checker = ExprChecker {
        program,
        result: Ok(()),
    };
    checker.walk(expr);
    checker.result
}

fn check_stmt_exprs(program: &Program, stmt: &Stmt) -> Result<(), ConstructionError> {
    match stmt {
        Stmt::Comment(_) | Stmt::Label(_, _) | Stmt::ExpireBorrows(_, _) => Ok(()),
        Stmt::Inhale(e, _) | Stmt::Exhale(e, _) | Stmt::Assert(e, _) => check_expr(program, e),
        Stmt::MethodCall(_, args, _, _) => args.iter().try_for_each(|arg| check_expr(program, arg)),
        Stmt::Assign(target, source, _, _) => {
            check_expr(program, target)?;
            check_expr(program, source)
        }
        Stmt::Fold(typ, args, _, _, pos) | Stmt::Unfold(typ, args, _, _, pos) => {
            if program.predicate(typ).is_none() {
                return Err(ConstructionError::UnresolvedPredicate {
                    typ: typ.clone(),
                    position: *pos,
                });
            }
            args.iter().try_for_each(|arg| check_expr(program, arg))
        }
    }
}

/// Checks one method body. Unfolding an enum predicate into a variant is
/// only legal after the discriminant of that same place was read, tracked
/// per basic block: reads in one block do not license unfolds in another.
pub fn check_method(program: &Program, method: &CfgMethod) -> Result<(), ConstructionError> {
    for (_, block) in method.basic_blocks.iter() {
        let mut discriminants_read: FxHashSet<String> = FxHashSet::default();
        for stmt in &block.stmts {
            check_stmt_exprs(program, stmt)?;
            match stmt {
                Stmt::Assign(_, source, _, _) => {
                    if let Expr::Field(base, field, _) = source {
                        if field.name == DISCRIMINANT_FIELD {
                            discriminants_read.insert(base.to_string());
                        }
                    }
                }
                Stmt::Unfold(typ, args, _, Some(_), pos) => {
                    let is_enum = program.predicate(typ).is_some_and(|p| p.is_enum());
                    let place_known = args
                        .first()
                        .is_some_and(|place| discriminants_read.contains(&place.to_string()));
                    if is_enum && !place_known {
                        return Err(ConstructionError::UnfoldBeforeDiscriminant {
                            typ: typ.clone(),
                            position: *pos,
                        });
                    }
                }
                _ => {}
            }
        }
    }
    Ok(())
}

/// Checks every method of the program, collecting one error per failing
/// method. An empty result means the program is well-formed.
pub fn check_program(program: &Program) -> Vec<(String, ConstructionError)> {
    let mut errors = Vec::new();
    for method in &program.methods {
        if let Err(err) = check_method(program, method) {
            errors.push((method.name.clone(), err));
        }
    }
    for function in &program.functions {
        let exprs = function
            .pres
            .iter()
            .chain(&function.posts)
            .chain(&function.body);
        for expr in exprs {
            if let Err(err) = check_expr(program, expr) {
                errors.push((function.name.clone(), err));
                break;
            }
        }
    }
    errors
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::{
        AssignKind, EnumPredicate, Field, LocalVar, PermAmount, Predicate, StructPredicate,
    };
    use crate::cfg::Successor;

    fn enum_program() -> Program {
        let typ = TypeId::new("Option");
        let this = LocalVar::new("self", Type::typed_ref("Option"));
        let discriminant_field = Field::new(DISCRIMINANT_FIELD, Type::Int);
        let discriminant = Expr::local(this.clone()).field(discriminant_field.clone());
        let mut program = Program::new("p");
        program
            .add_predicate(Predicate::Enum(EnumPredicate {
                typ: typ.clone(),
                this: this.clone(),
                discriminant_field,
                discriminant_bounds: Expr::BinOp(
                    BinOpKind::Or,
                    Box::new(discriminant.clone().eq_cmp(Expr::const_int(0))),
                    Box::new(discriminant.eq_cmp(Expr::const_int(1))),
                    Position::default(),
                ),
                variants: vec![
                    (
                        Expr::const_bool(true),
                        "None".to_owned(),
                        StructPredicate::new(typ.clone(), this.clone(), None),
                    ),
                    (
                        Expr::const_bool(true),
                        "Some".to_owned(),
                        StructPredicate::new(typ.clone(), this, None),
                    ),
                ],
            }))
            .unwrap();
        program
    }

    fn unfold_stmt(variant: usize) -> Stmt {
        let place = Expr::local(LocalVar::new("x", Type::typed_ref("Option")));
        Stmt::Unfold(
            TypeId::new("Option"),
            vec![place],
            PermAmount::WRITE,
            Some(crate::ast::EnumVariantIndex(variant)),
            Position::new(5, 1, 0),
        )
    }

    fn discriminant_read() -> Stmt {
        let place = Expr::local(LocalVar::new("x", Type::typed_ref("Option")));
        Stmt::Assign(
            Expr::local(LocalVar::new("d", Type::Int)),
            place.field(Field::new(DISCRIMINANT_FIELD, Type::Int)),
            AssignKind::Ghost,
            Position::new(4, 1, 0),
        )
    }

    #[test]
    fn enum_unfold_requires_prior_discriminant_read() {
        let program = enum_program();

        let mut method = CfgMethod::new("m", vec![], vec![], vec![], Position::default());
        let b0 = method.add_block(vec![unfold_stmt(1)]);
        method.set_successor(b0, Successor::Return).unwrap();
        let err = check_method(&program, &method).unwrap_err();
        assert!(matches!(
            err,
            ConstructionError::UnfoldBeforeDiscriminant { .. }
        ));

        let mut method = CfgMethod::new("m", vec![], vec![], vec![], Position::default());
        let b0 = method.add_block(vec![discriminant_read(), unfold_stmt(1)]);
        method.set_successor(b0, Successor::Return).unwrap();
        check_method(&program, &method).unwrap();
    }

    #[test]
    fn discriminant_read_does_not_carry_across_blocks() {
        let program = enum_program();
        let mut method = CfgMethod::new("m", vec![], vec![], vec![], Position::default());
        let b0 = method.add_block(vec![discriminant_read()]);
        let b1 = method.add_block(vec![unfold_stmt(0)]);
        method.set_successor(b0, Successor::Goto(b1)).unwrap();
        method.set_successor(b1, Successor::Return).unwrap();
        let err = check_method(&program, &method).unwrap_err();
        assert!(matches!(
            err,
            ConstructionError::UnfoldBeforeDiscriminant { .. }
        ));
    }

    #[test]
    fn unknown_predicate_is_reported() {
        let program = Program::new("p");
        let mut method = CfgMethod::new("m", vec![], vec![], vec![], Position::default());
        let b0 = method.add_block(vec![Stmt::Inhale(
            Expr::predicate_access_predicate(
                TypeId::new("Ghost"),
                Expr::local(LocalVar::new("x", Type::typed_ref("Ghost"))),
                PermAmount::WRITE,
            ),
            Position::new(1, 1, 0),
        )]);
        method.set_successor(b0, Successor::Return).unwrap();
        let err = check_method(&program, &method).unwrap_err();
        assert_eq!(
            err,
            ConstructionError::UnresolvedPredicate {
                typ: TypeId::new("Ghost"),
                position: Position::default(),
            }
        );
    }

    #[test]
    fn mismatched_binop_operands_are_reported() {
        let program = Program::new("p");
        let mut method = CfgMethod::new("m", vec![], vec![], vec![], Position::default());
        let bad = Expr::BinOp(
            BinOpKind::Add,
            Box::new(Expr::const_int(1)),
            Box::new(Expr::const_bool(true)),
            Position::new(2, 3, 0),
        );
        let b0 = method.add_block(vec![Stmt::Assert(
            bad.eq_cmp(Expr::const_int(1)),
            Position::new(2, 3, 0),
        )]);
        method.set_successor(b0, Successor::Return).unwrap();
        let err = check_method(&program, &method).unwrap_err();
        assert_eq!(
            err,
            ConstructionError::TypeMismatch {
                expected: Type::Int,
                found: Type::Bool,
                position: Position::new(2, 3, 0),
            }
        );
    }
}
