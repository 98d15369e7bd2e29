//! The verifier intermediate representation: a CFG-based IR with explicit
//! fractional-permission accounting, plus the reborrowing DAG tracking what
//! each borrow owes when it expires.
//!
//! The front end hands us a typed, borrow-annotated [`program::Program`];
//! `veil_backend` lowers it to the form the external verifier consumes.

pub mod ast;
pub mod borrows;
pub mod cfg;
pub mod check;
pub mod error;
pub mod fold;
pub mod optimizer;
pub mod program;
