use crate::token::TokenKind;
use derive_more::{Display, From};

/// No token pattern matched at the current position.
///
/// Tokens don't carry positions, so the remaining unmatched source is all we
/// can show.
#[derive(Clone, Debug, Display, Eq, Hash, PartialEq)]
#[display(fmt = "Couldn't match token on {:?}", rest)]
pub struct LexError {
    pub rest: String,
}
impl std::error::Error for LexError {}

#[derive(Clone, Debug, Display, Eq, Hash, PartialEq)]
pub enum ParseError {
    #[display(fmt = "Expected token type `{}` but got `{}`.", expected, found)]
    UnexpectedToken {
        expected: TokenKind,
        found: TokenKind,
    },
    #[display(fmt = "Expected token type `{}` but reached the end of input.", expected)]
    UnexpectedEndOfInput { expected: TokenKind },
    #[display(fmt = "Integer literal `{}` isn't a valid 64-bit unsigned integer.", literal)]
    InvalidInteger { literal: String },
    #[display(fmt = "Expressions are nested more than {} levels deep.", limit)]
    NestingTooDeep { limit: usize },
}
impl std::error::Error for ParseError {}

#[derive(Clone, Debug, Display, Eq, Hash, PartialEq)]
pub enum GenerationError {
    #[display(fmt = "Unexpected node type: {:?}", node_type)]
    UnknownNodeType { node_type: String },
    #[display(fmt = "Malformed node: {}", message)]
    MalformedNode { message: String },
    #[display(fmt = "Expressions are nested more than {} levels deep.", limit)]
    NestingTooDeep { limit: usize },
}
impl std::error::Error for GenerationError {}

#[derive(Clone, Debug, Display, Eq, From, Hash, PartialEq)]
pub enum CompilerError {
    #[display(fmt = "Lexing failed: {}", _0)]
    Lex(LexError),
    #[display(fmt = "Parsing failed: {}", _0)]
    Parse(ParseError),
    #[display(fmt = "Generation failed: {}", _0)]
    Generation(GenerationError),
}
impl std::error::Error for CompilerError {}
