//! Lowering from the verifier IR to the surface language. Declarations are
//! emitted dependencies-first; method bodies become label/goto sequences;
//! expiration statements are expanded against the method's reborrowing DAG.

pub mod expr;

use crate::ast;
use crate::error::LoweringError;
use expr::{lower_expr, lower_local, lower_perm, lower_type};
use id_collections::{id_type, IdVec};
use id_graph_sccs::{SccKind, Sccs};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use veil_vir::ast::{
    Domain, DomainFunc, Expr, Function, MethodStub, Position, Predicate, Stmt, Type,
};
use veil_vir::borrows::Borrow;
use veil_vir::cfg::{CfgBlockIndex, CfgMethod, Successor};
use veil_vir::error::DagError;
use veil_vir::fold::ExprWalker;
use veil_vir::program::Program;

// Block labels are synthesized as `bb{N}`; user labels pass through
// unchanged, so the front end must avoid the `bb` prefix.
fn block_label(index: CfgBlockIndex) -> String {
    format!("bb{}", index.0)
}

const END_LABEL: &str = "end_of_method";

pub fn lower_program(program: &Program) -> Result<ast::Program, LoweringError> {
    let domains = lower_domains(&program.domains)?;
    let fields = program
        .fields
        .iter()
        .map(|field| {
            Ok(ast::Field {
                name: field.name.clone(),
                typ: lower_type(&field.typ, Position::default())?,
            })
        })
        .collect::<Result<_, LoweringError>>()?;
    let functions = lower_functions(&program.functions)?;
    let predicates = program
        .sorted_predicates()
        .into_iter()
        .map(lower_predicate)
        .collect::<Result<_, _>>()?;

    let mut methods: Vec<ast::Method> = program
        .stub_methods
        .iter()
        .map(lower_stub)
        .collect::<Result<_, _>>()?;
    for method in &program.methods {
        methods.push(lower_method(method)?);
    }

    Ok(ast::Program {
        name: program.name.clone(),
        domains,
        fields,
        functions,
        predicates,
        methods,
    })
}

// ---------------------------------------------------------------------------
// Declarations

/// Function applications mentioned anywhere in an expression.
fn collect_calls<'a>(exprs: impl IntoIterator<Item = &'a Expr>, names: &mut BTreeSet<String>) {
    struct Collector<'a> {
        names: &'a mut BTreeSet<String>,
    }

    impl ExprWalker for Collector<'_> {
        fn walk_func_app(
            &mut self,
            name: &str,
            args: &[Expr],
            _formal_args: &[veil_vir::ast::LocalVar],
            _return_type: &Type,
            _pos: Position,
        ) {
            self.names.insert(name.to_owned());
            for arg in args {
                self.walk(arg);
            }
        }
    }

    let mut collector = Collector { names };
    for expr in exprs {
        collector.walk(expr);
    }
}

fn function_exprs(function: &Function) -> impl Iterator<Item = &Expr> {
    function
        .pres
        .iter()
        .chain(&function.posts)
        .chain(&function.body)
}

/// Orders functions so every callee precedes its callers. A call cycle
/// (including a self-call) has no valid order and is rejected.
fn lower_functions(functions: &[Function]) -> Result<Vec<ast::Function>, LoweringError> {
    #[id_type]
    struct FuncId(usize);
    #[id_type]
    struct SccId(usize);

    let mut by_id: IdVec<FuncId, &Function> = IdVec::new();
    let mut id_of: FxHashMap<&str, FuncId> = FxHashMap::default();
    for function in functions {
        let id = by_id.push(function);
        id_of.insert(&function.name, id);
    }

    let sccs: Sccs<SccId, _> = id_graph_sccs::find_components(by_id.count(), |id| {
        let mut called = BTreeSet::new();
        collect_calls(function_exprs(by_id[id]), &mut called);
        called
            .iter()
            .filter_map(|name| id_of.get(name.as_str()).copied())
            .collect::<BTreeSet<_>>()
    });

    let mut ordered = Vec::with_capacity(functions.len());
    for (_, component) in &sccs {
        match component.kind {
            SccKind::Acyclic => ordered.push(lower_function(by_id[component.nodes[0]])?),
            SccKind::Cyclic => {
                let mut names: Vec<String> = component
                    .nodes
                    .iter()
                    .map(|id| by_id[*id].name.clone())
                    .collect();
                names.sort();
                return Err(LoweringError::RecursiveFunctions { names });
            }
        }
    }
    Ok(ordered)
}

fn lower_function(function: &Function) -> Result<ast::Function, LoweringError> {
    Ok(ast::Function {
        name: function.name.clone(),
        formal_args: function
            .formal_args
            .iter()
            .map(|arg| lower_local(arg, function.pos))
            .collect::<Result<_, _>>()?,
        return_type: lower_type(&function.return_type, function.pos)?,
        pres: function.pres.iter().map(lower_expr).collect::<Result<_, _>>()?,
        posts: function.posts.iter().map(lower_expr).collect::<Result<_, _>>()?,
        body: function.body.as_ref().map(lower_expr).transpose()?,
    })
}

/// Orders domains dependencies-first. Mutually referring domains are legal;
/// the members of a cyclic group are emitted together in declaration order.
fn lower_domains(domains: &[Domain]) -> Result<Vec<ast::Domain>, LoweringError> {
    #[id_type]
    struct DomainId(usize);
    #[id_type]
    struct SccId(usize);

    let mut by_id: IdVec<DomainId, &Domain> = IdVec::new();
    let mut id_of: FxHashMap<&str, DomainId> = FxHashMap::default();
    for domain in domains {
        let id = by_id.push(domain);
        id_of.insert(&domain.name, id);
    }

    let sccs: Sccs<SccId, _> = id_graph_sccs::find_components(by_id.count(), |id| {
        let domain = by_id[id];
        let mut deps: BTreeSet<DomainId> = BTreeSet::new();

        struct ForeignFuncs<'a> {
            home: &'a str,
            used: &'a mut BTreeSet<String>,
        }
        impl ExprWalker for ForeignFuncs<'_> {
            fn walk_domain_func_app(&mut self, func: &DomainFunc, args: &[Expr], _pos: Position) {
                if func.domain_name != self.home {
                    self.used.insert(func.domain_name.clone());
                }
                for arg in args {
                    self.walk(arg);
                }
            }
        }

        let mut used = BTreeSet::new();
        for axiom in &domain.axioms {
            let mut walker = ForeignFuncs {
                home: &domain.name,
                used: &mut used,
            };
            walker.walk(&axiom.expr);
        }
        for func in &domain.functions {
            for typ in func.formal_args.iter().map(|arg| &arg.typ).chain([&func.return_type]) {
                if let Type::Domain(name) = typ {
                    if name != &domain.name {
                        used.insert(name.clone());
                    }
                }
            }
        }
        for name in used {
            if let Some(dep) = id_of.get(name.as_str()) {
                deps.insert(*dep);
            }
        }
        deps
    });

    let mut ordered = Vec::with_capacity(domains.len());
    for (_, component) in &sccs {
        let mut members: Vec<DomainId> = component.nodes.iter().copied().collect();
        members.sort();
        for id in members {
            ordered.push(lower_domain(by_id[id])?);
        }
    }
    Ok(ordered)
}

fn lower_domain(domain: &Domain) -> Result<ast::Domain, LoweringError> {
    Ok(ast::Domain {
        name: domain.name.clone(),
        functions: domain
            .functions
            .iter()
            .map(|func| {
                Ok(ast::DomainFunc {
                    name: func.name.clone(),
                    formal_args: func
                        .formal_args
                        .iter()
                        .map(|arg| lower_local(arg, Position::default()))
                        .collect::<Result<_, _>>()?,
                    return_type: lower_type(&func.return_type, Position::default())?,
                })
            })
            .collect::<Result<_, LoweringError>>()?,
        axioms: domain
            .axioms
            .iter()
            .map(|axiom| {
                Ok(ast::DomainAxiom {
                    name: axiom.name.clone(),
                    expr: lower_expr(&axiom.expr)?,
                })
            })
            .collect::<Result<_, LoweringError>>()?,
    })
}

/// An enum predicate body becomes the discriminant bounds conjoined with one
/// implication per variant, each guarded by its discriminant test.
fn lower_predicate(predicate: &Predicate) -> Result<ast::Predicate, LoweringError> {
    match predicate {
        Predicate::Struct(p) => Ok(ast::Predicate {
            name: p.typ.name().to_owned(),
            formal_args: vec![lower_local(&p.this, Position::default())?],
            body: p.body.as_ref().map(lower_expr).transpose()?,
        }),
        Predicate::Enum(p) => {
            let mut body = lower_expr(&p.discriminant_bounds)?;
            for (guard, _, variant) in &p.variants {
                if let Some(variant_body) = &variant.body {
                    let implication = ast::Expr::BinOp(
                        ast::BinOp::Implies,
                        Box::new(lower_expr(guard)?),
                        Box::new(lower_expr(variant_body)?),
                    );
                    body = ast::Expr::BinOp(ast::BinOp::And, Box::new(body), Box::new(implication));
                }
            }
            Ok(ast::Predicate {
                name: p.typ.name().to_owned(),
                formal_args: vec![lower_local(&p.this, Position::default())?],
                body: Some(body),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Methods

fn lower_stub(stub: &MethodStub) -> Result<ast::Method, LoweringError> {
    Ok(ast::Method {
        name: stub.name.clone(),
        formal_args: stub
            .formal_args
            .iter()
            .map(|arg| lower_local(arg, stub.pos))
            .collect::<Result<_, _>>()?,
        formal_returns: stub
            .formal_returns
            .iter()
            .map(|ret| lower_local(ret, stub.pos))
            .collect::<Result<_, _>>()?,
        local_vars: Vec::new(),
        pres: stub.pres.iter().map(lower_expr).collect::<Result<_, _>>()?,
        posts: stub.posts.iter().map(lower_expr).collect::<Result<_, _>>()?,
        body: None,
    })
}

pub fn lower_method(method: &CfgMethod) -> Result<ast::Method, LoweringError> {
    let mut body = Vec::new();
    let mut expiring = Vec::new();
    for (index, block) in method.basic_blocks.iter() {
        body.push(ast::Stmt::Label(block_label(index)));
        for stmt in &block.stmts {
            lower_stmt_into(&mut body, stmt, method, &mut expiring)?;
        }
        lower_successor_into(&mut body, &block.successor)?;
    }
    body.push(ast::Stmt::Label(END_LABEL.to_owned()));

    Ok(ast::Method {
        name: method.name.clone(),
        formal_args: method
            .formal_args
            .iter()
            .map(|arg| lower_local(arg, method.pos))
            .collect::<Result<_, _>>()?,
        formal_returns: method
            .formal_returns
            .iter()
            .map(|ret| lower_local(ret, method.pos))
            .collect::<Result<_, _>>()?,
        local_vars: method
            .local_vars
            .iter()
            .map(|var| lower_local(var, method.pos))
            .collect::<Result<_, _>>()?,
        pres: Vec::new(),
        posts: Vec::new(),
        body: Some(body),
    })
}

fn lower_successor_into(
    out: &mut Vec<ast::Stmt>,
    successor: &Successor,
) -> Result<(), LoweringError> {
    match successor {
        Successor::Return => out.push(ast::Stmt::Goto(END_LABEL.to_owned())),
        Successor::Goto(target) => out.push(ast::Stmt::Goto(block_label(*target))),
        Successor::GotoSwitch(guarded, default) => {
            let mut chain = vec![ast::Stmt::Goto(block_label(*default))];
            for (guard, target) in guarded.iter().rev() {
                chain = vec![ast::Stmt::If(
                    lower_expr(guard)?,
                    vec![ast::Stmt::Goto(block_label(*target))],
                    chain,
                )];
            }
            out.extend(chain);
        }
        Successor::Unreachable => out.push(ast::Stmt::Assert(ast::Expr::BoolLit(false))),
    }
    Ok(())
}

fn lower_stmt_into(
    out: &mut Vec<ast::Stmt>,
    stmt: &Stmt,
    method: &CfgMethod,
    expiring: &mut Vec<Borrow>,
) -> Result<(), LoweringError> {
    match stmt {
        Stmt::Comment(text) => out.push(ast::Stmt::Comment(text.clone())),
        Stmt::Label(label, _) => out.push(ast::Stmt::Label(label.clone())),
        Stmt::Inhale(e, _) => out.push(ast::Stmt::Inhale(lower_expr(e)?)),
        Stmt::Exhale(e, _) => out.push(ast::Stmt::Exhale(lower_expr(e)?)),
        Stmt::Assert(e, _) => out.push(ast::Stmt::Assert(lower_expr(e)?)),
        Stmt::MethodCall(name, args, targets, _) => out.push(ast::Stmt::MethodCall(
            name.clone(),
            args.iter().map(lower_expr).collect::<Result<_, _>>()?,
            targets.iter().map(|target| target.name.clone()).collect(),
        )),
        Stmt::Assign(target, source, _, _) => out.push(ast::Stmt::Assign(
            lower_expr(target)?,
            lower_expr(source)?,
        )),
        Stmt::Fold(typ, args, perm, _, _) => out.push(ast::Stmt::Fold(
            typ.name().to_owned(),
            args.iter().map(lower_expr).collect::<Result<_, _>>()?,
            lower_perm(*perm),
        )),
        Stmt::Unfold(typ, args, perm, _, _) => out.push(ast::Stmt::Unfold(
            typ.name().to_owned(),
            args.iter().map(lower_expr).collect::<Result<_, _>>()?,
            lower_perm(*perm),
        )),
        Stmt::ExpireBorrows(borrows, _) => lower_expiration_into(out, borrows, method, expiring)?,
    }
    Ok(())
}

/// Expands an expiration against the method's DAG: every requested borrow is
/// retired children-first, running its write-back statements and then
/// restoring the permissions it consumed. Write-backs may themselves expire
/// further borrows; a write-back that expires a borrow currently being
/// expired has no consistent order and reports a cycle.
fn lower_expiration_into(
    out: &mut Vec<ast::Stmt>,
    borrows: &[Borrow],
    method: &CfgMethod,
    expiring: &mut Vec<Borrow>,
) -> Result<(), LoweringError> {
    if borrows.is_empty() {
        return Ok(());
    }
    let dag = method
        .borrows_dag
        .as_ref()
        .ok_or_else(|| LoweringError::MissingDag {
            method: method.name.clone(),
        })?;
    for borrow in dag.expiry_order(borrows)? {
        if expiring.contains(&borrow) {
            return Err(LoweringError::Dag(DagError::Cycle {
                from: expiring.last().copied().unwrap_or(borrow),
                to: borrow,
            }));
        }
        let node = dag
            .node(borrow)
            .ok_or(LoweringError::Dag(DagError::UnknownBorrow(borrow)))?;
        out.push(ast::Stmt::Comment(format!("expire {:?}", borrow)));
        expiring.push(borrow);
        for expiry_stmt in &node.expiry_stmts {
            lower_stmt_into(out, expiry_stmt, method, expiring)?;
        }
        expiring.pop();
        for consumed in &node.consumed {
            out.push(ast::Stmt::Inhale(lower_expr(consumed)?));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use veil_vir::ast::{AssignKind, Field, LocalVar, PermAmount, TypeId};
    use veil_vir::borrows::DagBuilder;

    fn int_function(name: &str, body: Expr) -> Function {
        Function {
            name: name.to_owned(),
            formal_args: vec![],
            return_type: veil_vir::ast::Type::Int,
            pres: vec![],
            posts: vec![],
            body: Some(body),
            pos: Position::default(),
        }
    }

    fn call(name: &str) -> Expr {
        Expr::FuncApp(
            name.to_owned(),
            vec![],
            vec![],
            veil_vir::ast::Type::Int,
            Position::default(),
        )
    }

    #[test]
    fn functions_are_emitted_callees_first() {
        // f calls g, g calls h; declared in the reverse order.
        let functions = vec![
            int_function("f", call("g")),
            int_function("g", call("h")),
            int_function("h", Expr::const_int(0)),
        ];
        let lowered = lower_functions(&functions).unwrap();
        let names: Vec<_> = lowered.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["h", "g", "f"]);
    }

    #[test]
    fn function_call_cycles_are_rejected() {
        let functions = vec![
            int_function("even", call("odd")),
            int_function("odd", call("even")),
        ];
        let err = lower_functions(&functions).unwrap_err();
        assert_eq!(
            err,
            LoweringError::RecursiveFunctions {
                names: vec!["even".to_owned(), "odd".to_owned()],
            }
        );
    }

    #[test]
    fn self_call_counts_as_a_cycle() {
        let functions = vec![int_function("loop_", call("loop_"))];
        assert!(matches!(
            lower_functions(&functions).unwrap_err(),
            LoweringError::RecursiveFunctions { .. }
        ));
    }

    fn borrow_place(name: &str) -> Expr {
        Expr::predicate_access_predicate(
            TypeId::new("T"),
            Expr::local(LocalVar::new(name, veil_vir::ast::Type::typed_ref("T"))),
            PermAmount::READ,
        )
    }

    #[test]
    fn expiration_retires_reborrows_before_their_parents() {
        let mut builder = DagBuilder::new();
        builder
            .add_node(
                Borrow(0),
                vec![borrow_place("x")],
                None,
                vec![Stmt::Comment("write back x".to_owned())],
            )
            .unwrap();
        builder
            .add_node(Borrow(1), vec![borrow_place("y")], Some(Borrow(0)), vec![])
            .unwrap();

        let mut method = CfgMethod::new("m", vec![], vec![], vec![], Position::default());
        let b0 = method.add_block(vec![Stmt::ExpireBorrows(
            vec![Borrow(0), Borrow(1)],
            Position::default(),
        )]);
        method.set_successor(b0, Successor::Return).unwrap();
        method.borrows_dag = Some(builder.finalize());

        let lowered = lower_method(&method).unwrap();
        let body = lowered.body.unwrap();
        let rendered: Vec<String> = body.iter().map(|stmt| stmt.to_string()).collect();

        let child_inhale = rendered
            .iter()
            .position(|s| s.contains("inhale") && s.contains("y"))
            .unwrap();
        let parent_writeback = rendered
            .iter()
            .position(|s| s.contains("write back x"))
            .unwrap();
        let parent_inhale = rendered
            .iter()
            .position(|s| s.contains("inhale") && s.contains("x"))
            .unwrap();
        assert!(child_inhale < parent_writeback);
        assert!(parent_writeback < parent_inhale);
    }

    #[test]
    fn write_back_reexpiring_its_own_borrow_is_a_cycle() {
        let mut builder = DagBuilder::new();
        builder
            .add_node(
                Borrow(0),
                vec![borrow_place("x")],
                None,
                vec![Stmt::ExpireBorrows(vec![Borrow(0)], Position::default())],
            )
            .unwrap();

        let mut method = CfgMethod::new("m", vec![], vec![], vec![], Position::default());
        let b0 = method.add_block(vec![Stmt::ExpireBorrows(
            vec![Borrow(0)],
            Position::default(),
        )]);
        method.set_successor(b0, Successor::Return).unwrap();
        method.borrows_dag = Some(builder.finalize());

        assert_eq!(
            lower_method(&method).unwrap_err(),
            LoweringError::Dag(DagError::Cycle {
                from: Borrow(0),
                to: Borrow(0),
            })
        );
    }

    #[test]
    fn repeated_expiration_of_the_same_borrow_is_not_a_cycle() {
        // Two sequential expirations of one borrow are a front-end artifact,
        // not an ordering contradiction; only nested re-entry is.
        let mut builder = DagBuilder::new();
        builder
            .add_node(Borrow(0), vec![borrow_place("x")], None, vec![])
            .unwrap();

        let mut method = CfgMethod::new("m", vec![], vec![], vec![], Position::default());
        let b0 = method.add_block(vec![
            Stmt::ExpireBorrows(vec![Borrow(0)], Position::default()),
            Stmt::ExpireBorrows(vec![Borrow(0)], Position::default()),
        ]);
        method.set_successor(b0, Successor::Return).unwrap();
        method.borrows_dag = Some(builder.finalize());

        assert!(lower_method(&method).is_ok());
    }

    fn domain(name: &str, uses: Option<&str>) -> Domain {
        Domain {
            name: name.to_owned(),
            functions: vec![DomainFunc {
                name: format!("{}_make", name.to_lowercase()),
                formal_args: match uses {
                    Some(other) => vec![LocalVar::new(
                        "x",
                        veil_vir::ast::Type::Domain(other.to_owned()),
                    )],
                    None => vec![],
                },
                return_type: veil_vir::ast::Type::Domain(name.to_owned()),
                domain_name: name.to_owned(),
            }],
            axioms: vec![],
        }
    }

    #[test]
    fn domains_are_emitted_dependencies_first() {
        // Wrapper's constructor takes a Base, so Base must be declared first
        // even though Wrapper comes first in the program.
        let domains = vec![domain("Wrapper", Some("Base")), domain("Base", None)];
        let lowered = lower_domains(&domains).unwrap();
        let names: Vec<_> = lowered.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Base", "Wrapper"]);
    }

    #[test]
    fn expiration_without_dag_is_an_error() {
        let mut method = CfgMethod::new("m", vec![], vec![], vec![], Position::default());
        let b0 = method.add_block(vec![Stmt::ExpireBorrows(
            vec![Borrow(0)],
            Position::default(),
        )]);
        method.set_successor(b0, Successor::Return).unwrap();

        assert_eq!(
            lower_method(&method).unwrap_err(),
            LoweringError::MissingDag {
                method: "m".to_owned(),
            }
        );
    }

    #[test]
    fn switch_successor_becomes_guarded_goto_chain() {
        let mut method = CfgMethod::new("m", vec![], vec![], vec![], Position::default());
        let b0 = method.add_block(vec![]);
        let b1 = method.add_block(vec![]);
        let b2 = method.add_block(vec![]);
        let guard = Expr::local(LocalVar::new("c", veil_vir::ast::Type::Bool));
        method
            .set_successor(b0, Successor::GotoSwitch(vec![(guard, b1)], b2))
            .unwrap();
        method.set_successor(b1, Successor::Return).unwrap();
        method.set_successor(b2, Successor::Return).unwrap();

        let lowered = lower_method(&method).unwrap();
        let body = lowered.body.unwrap();
        match &body[1] {
            ast::Stmt::If(guard, then_stmts, else_stmts) => {
                assert_eq!(guard, &ast::Expr::Local("c".to_owned()));
                assert_eq!(then_stmts, &vec![ast::Stmt::Goto("bb1".to_owned())]);
                assert_eq!(else_stmts, &vec![ast::Stmt::Goto("bb2".to_owned())]);
            }
            other => panic!("expected if-chain, found {:?}", other),
        }
    }

    #[test]
    fn position_of_unencodable_node_survives_method_lowering() {
        let pos = Position::new(14, 9, 3);
        let mut method = CfgMethod::new("m", vec![], vec![], vec![], Position::default());
        let wide = Expr::Const(
            veil_vir::ast::Const::BitVec {
                width: 48,
                value: 0,
            },
            pos,
        );
        let b0 = method.add_block(vec![Stmt::Assign(
            Expr::local(LocalVar::new("x", veil_vir::ast::Type::BitVec(48))),
            wide,
            AssignKind::Copy,
            pos,
        )]);
        method.set_successor(b0, Successor::Return).unwrap();

        match lower_method(&method).unwrap_err() {
            LoweringError::NoEncoding { position, .. } => assert_eq!(position, pos),
            other => panic!("expected NoEncoding, found {}", other),
        }
    }

    #[test]
    fn struct_predicates_keep_field_layout() {
        let typ = TypeId::new("Pair");
        let this = LocalVar::new("self", veil_vir::ast::Type::typed_ref("Pair"));
        let body = Expr::field_access_predicate(
            Expr::local(this.clone()).field(Field::new("fst", veil_vir::ast::Type::Int)),
            PermAmount::WRITE,
        );
        let predicate = Predicate::Struct(veil_vir::ast::StructPredicate::new(
            typ,
            this,
            Some(body),
        ));
        let lowered = lower_predicate(&predicate).unwrap();
        assert_eq!(lowered.name, "Pair");
        assert_eq!(
            lowered.body.unwrap().to_string(),
            "acc(self.fst, write)"
        );
    }

    #[test]
    fn reference_wrappers_use_the_val_ref_field() {
        let typ = TypeId::new("BoxT");
        let this = LocalVar::new("self", veil_vir::ast::Type::typed_ref("BoxT"));
        let body = Expr::field_access_predicate(
            Expr::local(this.clone()).field(veil_vir::ast::val_ref_field("T")),
            PermAmount::WRITE,
        );
        let predicate = Predicate::Struct(veil_vir::ast::StructPredicate::new(
            typ,
            this,
            Some(body),
        ));
        let lowered = lower_predicate(&predicate).unwrap();
        assert_eq!(
            lowered.body.unwrap().to_string(),
            "acc(self.val_ref, write)"
        );
    }
}
