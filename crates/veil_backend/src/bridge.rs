//! The narrow seam between lowering and an actual verifier. Everything a
//! backend sees comes through [`crate::ast::Program`]; everything it says
//! comes back as a [`VerificationResult`].

use crate::ast;
use crate::error::BackendError;
use std::io::Write;
use veil_vir::ast::Position;

/// One reason a method did not verify. The position is the tag of the IR
/// node the failing check came from, so the front end can map it to source.
#[derive(Clone, Debug, PartialEq)]
pub struct Failure {
    pub message: String,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq)]
pub enum VerificationResult {
    Success,
    Failure(Vec<Failure>),
}

impl VerificationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, VerificationResult::Success)
    }
}

pub trait Backend {
    fn name(&self) -> &str;

    fn verify(&mut self, program: &ast::Program) -> Result<VerificationResult, BackendError>;
}

/// A backend that verifies nothing: it renders the program to the given
/// writer and reports success. Used for artifact dumps and in tests.
pub struct DumpBackend<W> {
    dest: W,
}

impl<W: Write> DumpBackend<W> {
    pub fn new(dest: W) -> Self {
        DumpBackend { dest }
    }

    pub fn into_inner(self) -> W {
        self.dest
    }
}

impl<W: Write> Backend for DumpBackend<W> {
    fn name(&self) -> &str {
        "dump"
    }

    fn verify(&mut self, program: &ast::Program) -> Result<VerificationResult, BackendError> {
        write!(self.dest, "{}", program).map_err(|err| BackendError {
            backend: self.name().to_owned(),
            message: err.to_string(),
        })?;
        Ok(VerificationResult::Success)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dump_backend_renders_the_program_and_succeeds() {
        let program = ast::Program {
            name: "unit".to_owned(),
            domains: vec![],
            fields: vec![],
            functions: vec![],
            predicates: vec![],
            methods: vec![],
        };
        let mut backend = DumpBackend::new(Vec::new());
        let result = backend.verify(&program).unwrap();
        assert!(result.is_success());

        let text = String::from_utf8(backend.into_inner()).unwrap();
        assert!(text.contains("program: unit"));
    }
}
