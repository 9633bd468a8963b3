#![warn(clippy::nursery, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

use ast::Ast;
use error::CompilerError;
use tracing::instrument;

pub mod ast;
pub mod ast_to_js;
pub mod error;
pub mod string_to_tokens;
pub mod to_text;
pub mod token;
pub mod tokens_to_ast;

#[cfg(test)]
mod test_utils;

/// Lexes and parses the source without generating any code.
#[instrument(level = "trace", skip(source))]
pub fn check(source: &str) -> Result<Ast, CompilerError> {
    let tokens = string_to_tokens::tokenize(source)?;
    let ast = tokens_to_ast::parse(&tokens)?;
    Ok(ast)
}

/// Compiles source code to a JavaScript program, runtime included.
#[instrument(level = "trace", skip(source))]
pub fn compile(source: &str) -> Result<String, CompilerError> {
    let ast = check(source)?;
    Ok(ast_to_js::ast_to_js(&ast))
}
