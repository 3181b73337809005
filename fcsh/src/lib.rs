//! Persistent fcsh session driver and compiler output parsing.
//!
//! fcsh (the Flex compiler shell) keeps compiler state warm between builds
//! but speaks a free-text, prompt-terminated protocol. This crate owns that
//! conversation: [`CompilerShell`] drives the subprocess and its
//! request/response cycle, [`OutputParser`] turns one cycle's raw lines into
//! a [`CompilationOutcome`] of typed, per-file diagnostics.

pub mod parser;
pub mod problem;
pub mod report;
pub mod session;
pub mod types;

pub use parser::{CompilationOutcome, OutputParser, ParserOptions};
pub use problem::{Details, Diagnostic, Problem};
pub use report::ProblematicFile;
pub use session::{CompilerShell, PROMPT, ShellError};
pub use types::{CompileRequest, Location, Member, TypeName, Typing};
