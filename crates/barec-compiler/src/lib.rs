//! Schema compiler for BARE (Binary Application Record Encoding).
//!
//! Parses the textual schema language into an AST, validates schema-level
//! invariants, hoists anonymous composites into synthetic aliases, applies
//! generation options, and emits TypeScript or JavaScript readers/writers
//! implementing the BARE wire format (or declarations only, or a canonical
//! re-serialization of the schema).
//!
//! The pipeline is a strict sequence of pure functions over immutable trees:
//!
//! ```text
//! parse -> check -> normalize -> configure -> generate
//! ```
//!
//! [`compile`] runs the whole thing; the stage modules are public for tools
//! that want to stop midway.

pub mod ast;
pub mod check;
pub mod codegen;
pub mod config;
pub mod configure;
pub mod error;
mod lexer;
pub mod normalize;
pub mod parser;

#[cfg(test)]
mod check_tests;
#[cfg(test)]
mod configure_tests;
#[cfg(test)]
mod lexer_tests;
#[cfg(test)]
mod parser_tests;

pub use crate::config::{Config, Generator};
pub use crate::error::{CompileError, ErrorKind};

use crate::ast::Span;

/// Compile schema text to generated source text.
///
/// `config.generator` must be resolved; the caller decides it (typically from
/// the output file extension) since the compiler itself performs no I/O.
pub fn compile(source: &str, filename: &str, config: &Config) -> Result<String, CompileError> {
    let Some(generator) = config.generator else {
        return Err(CompileError::new(
            ErrorKind::Config,
            Span::point(0),
            "generator mode is not set",
            source,
            filename,
        ));
    };

    let schema = parser::parse(source, filename, config)?;
    check::check(&schema, config)?;

    if generator == Generator::Bare {
        return Ok(codegen::bare::render(&schema));
    }

    let normalized = normalize::normalize(&schema);
    let annotated = configure::configure(&normalized, config)?;
    Ok(codegen::ts::render(&annotated, config, generator))
}
