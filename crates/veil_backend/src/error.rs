use std::io;
use veil_common::report_error::{report_error, Reportable};
use veil_vir::ast::Position;
use veil_vir::error::{ConstructionError, DagError};

/// Failures while lowering one method or the shared declarations. Except
/// for a DAG cycle (handled by the driver), lowering failures are isolated
/// to the method they occur in.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum LoweringError {
    #[error("no encoding for {node} (at {position})")]
    NoEncoding { node: String, position: Position },
    #[error("method {method} expires borrows but carries no reborrowing DAG")]
    MissingDag { method: String },
    #[error("function declarations form a cycle: {}", names.join(", "))]
    RecursiveFunctions { names: Vec<String> },
    #[error(transparent)]
    Dag(#[from] DagError),
    #[error(transparent)]
    Construction(#[from] ConstructionError),
}

#[derive(Debug, thiserror::Error)]
#[error("backend {backend} failed: {message}")]
pub struct BackendError {
    pub backend: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("borrow cycle in method {method}: {source}")]
    BorrowCycle { method: String, source: DagError },
    /// Lowering the shared declarations failed; no method can be verified.
    #[error("program declarations could not be lowered: {0}")]
    Declarations(LoweringError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("could not write artifact {path}: {source}")]
    ArtifactIo {
        path: std::path::PathBuf,
        source: io::Error,
    },
}

impl Reportable for LoweringError {
    fn report(&self, dest: &mut impl io::Write) -> io::Result<()> {
        report_error(dest, "lowering failed", &self.to_string())
    }
}

impl Reportable for DriverError {
    fn report(&self, dest: &mut impl io::Write) -> io::Result<()> {
        let summary = match self {
            DriverError::BorrowCycle { .. } => "verification aborted",
            DriverError::Declarations(_) => "lowering failed",
            DriverError::Backend(_) => "backend failure",
            DriverError::ArtifactIo { .. } => "artifact output failed",
        };
        report_error(dest, summary, &self.to_string())
    }

    fn exit_status(&self) -> i32 {
        match self {
            // A cyclic reborrowing DAG means the upstream borrow analysis
            // is unsound; distinguish it from ordinary failures.
            DriverError::BorrowCycle { .. } => 2,
            _ => 1,
        }
    }
}
