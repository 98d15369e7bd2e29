//! Drives a [`veil_vir::program::Program`] through checking, optimization,
//! lowering, and backend verification. Methods are verified in isolation on
//! a worker pool; one method failing to check or lower never blocks the
//! others. The single exception is a cyclic expiry dependency in the
//! reborrowing DAG, which signals an unsound upstream borrow analysis and
//! aborts the whole run.

pub mod ast;
pub mod bridge;
pub mod error;
pub mod lower;

use bridge::{Backend, Failure, VerificationResult};
use error::{BackendError, DriverError, LoweringError};
use rustc_hash::FxHashMap;
use std::io;
use veil_common::config::{ArtifactDir, DriverConfig};
use veil_common::progress_ui::{self, ProgressLogger, ProgressSession};
use veil_vir::cfg::CfgMethod;
use veil_vir::error::{ConstructionError, DagError};
use veil_vir::program::Program;
use veil_vir::{check, optimizer};

#[derive(Debug)]
pub enum MethodOutcome {
    Verified,
    Failed(Vec<Failure>),
    /// The method did not pass well-formedness checking.
    Rejected(ConstructionError),
    /// The method checked but could not be lowered.
    NotLowered(LoweringError),
    /// The backend errored out on this method (distinct from a failure
    /// verdict).
    BackendError(BackendError),
}

#[derive(Debug)]
pub struct MethodReport {
    pub method: String,
    pub outcome: MethodOutcome,
}

#[derive(Debug)]
pub struct RunReport {
    /// One report per method, in program order.
    pub reports: Vec<MethodReport>,
}

impl RunReport {
    pub fn all_verified(&self) -> bool {
        self.reports
            .iter()
            .all(|report| matches!(report.outcome, MethodOutcome::Verified))
    }
}

struct Job {
    index: usize,
    name: String,
    method: CfgMethod,
    lowered: ast::Method,
}

/// Verifies every method of the program with backends created by
/// `make_backend`, one backend instance per worker thread.
pub fn verify_program<B: Backend>(
    program: &Program,
    config: &DriverConfig,
    make_backend: impl Fn() -> B + Sync,
) -> Result<RunReport, DriverError> {
    let mut rejected: FxHashMap<String, ConstructionError> = FxHashMap::default();
    for (method, err) in check::check_program(program) {
        rejected.entry(method).or_insert(err);
    }

    let base = lower_declarations(program)?;

    let mut reports: Vec<Option<MethodReport>> = Vec::new();
    let mut jobs: Vec<Job> = Vec::new();
    for method in &program.methods {
        let index = reports.len();
        if let Some(err) = rejected.remove(&method.name) {
            reports.push(Some(MethodReport {
                method: method.name.clone(),
                outcome: MethodOutcome::Rejected(err),
            }));
            continue;
        }
        let optimized = optimizer::optimize_method(method.clone(), &config.pass_options);
        match lower::lower_method(&optimized) {
            Ok(lowered) => {
                reports.push(None);
                jobs.push(Job {
                    index,
                    name: optimized.name.clone(),
                    method: optimized,
                    lowered,
                });
            }
            Err(LoweringError::Dag(source @ DagError::Cycle { .. })) => {
                return Err(DriverError::BorrowCycle {
                    method: method.name.clone(),
                    source,
                });
            }
            Err(err) => {
                reports.push(Some(MethodReport {
                    method: method.name.clone(),
                    outcome: MethodOutcome::NotLowered(err),
                }));
            }
        }
    }

    if let Some(artifact_dir) = &config.artifact_dir {
        for job in &jobs {
            dump_artifacts(artifact_dir, &base, job)?;
        }
    }

    let worker_count = match config.num_workers {
        0 => std::thread::available_parallelism().map_or(1, |n| n.get()),
        n => n,
    };

    let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
    let (result_tx, result_rx) = crossbeam_channel::unbounded::<(usize, MethodReport)>();
    let job_count = jobs.len();
    for job in jobs {
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    let mut progress =
        progress_ui::bar(config.progress, "verifying methods").start_session(job_count);

    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let base = &base;
            let make_backend = &make_backend;
            scope.spawn(move || {
                let mut backend = make_backend();
                for job in job_rx {
                    let report = verify_one(&mut backend, base, &job);
                    if result_tx.send((job.index, report)).is_err() {
                        return;
                    }
                }
            });
        }
        drop(result_tx);

        for (index, report) in result_rx {
            reports[index] = Some(report);
            progress.update(1);
        }
    });
    progress.finish();

    let reports = reports
        .into_iter()
        .map(|report| match report {
            Some(report) => report,
            // Every slot is either filled up front or by a worker result.
            None => unreachable!("missing method report"),
        })
        .collect();
    Ok(RunReport { reports })
}

/// Lowers everything except the CFG methods; the result is the shared base
/// each per-method program is assembled from. Method stubs belong to the
/// base: their contracts must be visible when verifying callers.
fn lower_declarations(program: &Program) -> Result<ast::Program, DriverError> {
    let mut declarations = program.clone();
    declarations.methods = Vec::new();
    lower::lower_program(&declarations).map_err(DriverError::Declarations)
}

fn verify_one<B: Backend>(backend: &mut B, base: &ast::Program, job: &Job) -> MethodReport {
    let program = method_program(base, &job.lowered);
    let outcome = match backend.verify(&program) {
        Ok(VerificationResult::Success) => MethodOutcome::Verified,
        Ok(VerificationResult::Failure(failures)) => MethodOutcome::Failed(failures),
        Err(err) => MethodOutcome::BackendError(err),
    };
    MethodReport {
        method: job.name.clone(),
        outcome,
    }
}

fn method_program(base: &ast::Program, method: &ast::Method) -> ast::Program {
    let mut program = base.clone();
    program.name = format!("{}::{}", base.name, method.name);
    program.methods.push(method.clone());
    program
}

fn dump_artifacts(
    artifact_dir: &ArtifactDir,
    base: &ast::Program,
    job: &Job,
) -> Result<(), DriverError> {
    let program_path = artifact_dir.artifact_path(&format!("{}.vpr", job.name));
    let text = method_program(base, &job.lowered).to_string();
    std::fs::write(&program_path, text).map_err(|source| DriverError::ArtifactIo {
        path: program_path,
        source,
    })?;

    let cfg_path = artifact_dir.artifact_path(&format!("{}.cfg.dot", job.name));
    let mut buf = Vec::new();
    job.method
        .to_graphviz(&mut buf)
        .map_err(|err| DriverError::ArtifactIo {
            path: cfg_path.clone(),
            source: io::Error::new(io::ErrorKind::Other, err.to_string()),
        })?;
    std::fs::write(&cfg_path, buf).map_err(|source| DriverError::ArtifactIo {
        path: cfg_path,
        source,
    })?;

    if let Some(dag) = &job.method.borrows_dag {
        let dag_path = artifact_dir.artifact_path(&format!("{}.dag.dot", job.name));
        let mut buf = Vec::new();
        dag.to_graphviz(&mut buf)
            .map_err(|err| DriverError::ArtifactIo {
                path: dag_path.clone(),
                source: io::Error::new(io::ErrorKind::Other, err.to_string()),
            })?;
        std::fs::write(&dag_path, buf).map_err(|source| DriverError::ArtifactIo {
            path: dag_path,
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use bridge::DumpBackend;
    use veil_vir::ast::{Expr, LocalVar, Position, Stmt, Type};
    use veil_vir::cfg::Successor;

    fn one_block_method(name: &str, stmts: Vec<Stmt>) -> CfgMethod {
        let mut method = CfgMethod::new(name, vec![], vec![], vec![], Position::new(1, 1, 0));
        let b0 = method.add_block(stmts);
        method.set_successor(b0, Successor::Return).unwrap();
        method
    }

    #[test]
    fn every_method_gets_a_report_in_program_order() {
        let mut program = Program::new("p");
        program.methods.push(one_block_method(
            "first",
            vec![Stmt::Assert(Expr::const_bool(true), Position::new(1, 1, 0))],
        ));
        // This one fails checking: its predicate is not registered.
        program.methods.push(one_block_method(
            "second",
            vec![Stmt::Inhale(
                Expr::predicate_access_predicate(
                    veil_vir::ast::TypeId::new("Missing"),
                    Expr::local(LocalVar::new("x", Type::typed_ref("Missing"))),
                    veil_vir::ast::PermAmount::WRITE,
                ),
                Position::new(2, 1, 0),
            )],
        ));
        program.methods.push(one_block_method("third", vec![]));

        let config = DriverConfig::default();
        let report = verify_program(&program, &config, || DumpBackend::new(Vec::new())).unwrap();

        let names: Vec<_> = report.reports.iter().map(|r| r.method.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        assert!(matches!(
            report.reports[0].outcome,
            MethodOutcome::Verified
        ));
        assert!(matches!(
            report.reports[1].outcome,
            MethodOutcome::Rejected(ConstructionError::UnresolvedPredicate { .. })
        ));
        assert!(matches!(
            report.reports[2].outcome,
            MethodOutcome::Verified
        ));
        assert!(!report.all_verified());
    }

    #[test]
    fn unencodable_method_is_isolated() {
        let mut program = Program::new("p");
        let wide = Expr::Const(
            veil_vir::ast::Const::BitVec {
                width: 24,
                value: 0,
            },
            Position::new(3, 1, 0),
        );
        program.methods.push(one_block_method(
            "bad",
            vec![Stmt::Assign(
                Expr::local(LocalVar::new("x", Type::BitVec(24))),
                wide,
                veil_vir::ast::AssignKind::Copy,
                Position::new(3, 1, 0),
            )],
        ));
        program.methods.push(one_block_method("good", vec![]));

        let config = DriverConfig::default();
        let report = verify_program(&program, &config, || DumpBackend::new(Vec::new())).unwrap();
        assert!(matches!(
            report.reports[0].outcome,
            MethodOutcome::NotLowered(LoweringError::NoEncoding { .. })
        ));
        assert!(matches!(report.reports[1].outcome, MethodOutcome::Verified));
    }

    #[test]
    fn cyclic_expiry_aborts_the_whole_run() {
        use veil_vir::borrows::{Borrow, DagBuilder};

        // The borrow's write-back expires the borrow itself, so expiration
        // has no consistent order. This must not degrade into a per-method
        // failure: it means the borrow analysis upstream is broken.
        let mut builder = DagBuilder::new();
        builder
            .add_node(
                Borrow(0),
                vec![],
                None,
                vec![Stmt::ExpireBorrows(vec![Borrow(0)], Position::default())],
            )
            .unwrap();
        let mut method = one_block_method(
            "m",
            vec![Stmt::ExpireBorrows(vec![Borrow(0)], Position::new(4, 1, 0))],
        );
        method.borrows_dag = Some(builder.finalize());

        let mut program = Program::new("p");
        program.methods.push(method);
        program.methods.push(one_block_method("untouched", vec![]));

        let config = DriverConfig::default();
        let err = verify_program(&program, &config, || DumpBackend::new(Vec::new())).unwrap_err();
        match err {
            DriverError::BorrowCycle { method, source } => {
                assert_eq!(method, "m");
                assert_eq!(
                    source,
                    veil_vir::error::DagError::Cycle {
                        from: Borrow(0),
                        to: Borrow(0),
                    }
                );
            }
            other => panic!("expected a run abort, found {:?}", other),
        }
    }

    struct FailingBackend;

    impl Backend for FailingBackend {
        fn name(&self) -> &str {
            "failing"
        }

        fn verify(
            &mut self,
            program: &ast::Program,
        ) -> Result<VerificationResult, BackendError> {
            Ok(VerificationResult::Failure(vec![Failure {
                message: format!("assert might fail in {}", program.name),
                position: Position::new(7, 1, 0),
            }]))
        }
    }

    #[test]
    fn backend_failures_carry_positions() {
        let mut program = Program::new("p");
        program.methods.push(one_block_method("m", vec![]));

        let config = DriverConfig::default();
        let report = verify_program(&program, &config, || FailingBackend).unwrap();
        match &report.reports[0].outcome {
            MethodOutcome::Failed(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].position, Position::new(7, 1, 0));
            }
            other => panic!("expected failure verdict, found {:?}", other),
        }
    }
}
