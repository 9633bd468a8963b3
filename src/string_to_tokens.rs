use crate::{
    error::LexError,
    token::{Token, TokenKind},
};
use std::iter::FusedIterator;
use tracing::{debug, instrument};

/// Returns the length of the match at the start of the given text.
type Pattern = fn(&str) -> Option<usize>;

/// Tried in order, so the keywords have to come before `identifier`.
const TOKEN_PATTERNS: [(Pattern, TokenKind); 7] = [
    (def_keyword, TokenKind::Def),
    (end_keyword, TokenKind::End),
    (identifier, TokenKind::Identifier),
    (integer, TokenKind::Integer),
    (opening_parenthesis, TokenKind::OParen),
    (closing_parenthesis, TokenKind::CParen),
    (comma, TokenKind::Comma),
];

macro_rules! define_keyword {
    ($name:ident, $keyword:expr) => {
        fn $name(text: &str) -> Option<usize> {
            text.starts_with($keyword)
                .then_some($keyword.len())
                .filter(|&length| ends_word(text, length))
        }
    };
}
macro_rules! define_literal {
    ($name:ident, $literal:expr) => {
        fn $name(text: &str) -> Option<usize> {
            text.starts_with($literal).then_some($literal.len())
        }
    };
}

define_keyword!(def_keyword, "def");
define_keyword!(end_keyword, "end");
define_literal!(opening_parenthesis, "(");
define_literal!(closing_parenthesis, ")");
define_literal!(comma, ",");

fn identifier(text: &str) -> Option<usize> {
    word(text, |c| c.is_ascii_alphabetic())
}
fn integer(text: &str) -> Option<usize> {
    word(text, |c| c.is_ascii_digit())
}

/// A non-empty run of characters matching `predicate` that isn't glued to any
/// further word character. `abc1` is therefore neither an identifier nor an
/// integer.
fn word(text: &str, predicate: impl Fn(char) -> bool) -> Option<usize> {
    let length = text.find(|c: char| !predicate(c)).unwrap_or(text.len());
    (length > 0 && ends_word(text, length)).then_some(length)
}
fn ends_word(text: &str, length: usize) -> bool {
    !text[length..].starts_with(|c: char| c.is_alphanumeric() || c == '_')
}

/// Lazily splits source code into tokens.
///
/// After the first error, the iterator doesn't yield anything anymore.
#[derive(Clone, Debug)]
pub struct Tokenizer<'s> {
    rest: &'s str,
    has_failed: bool,
}
impl<'s> Tokenizer<'s> {
    #[must_use]
    pub fn new(source: &'s str) -> Self {
        Self {
            rest: source.trim_start(),
            has_failed: false,
        }
    }

    #[must_use]
    pub const fn rest(&self) -> &'s str {
        self.rest
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let (length, kind) = TOKEN_PATTERNS
            .iter()
            .find_map(|(pattern, kind)| pattern(self.rest).map(|length| (length, *kind)))
            .ok_or_else(|| LexError {
                rest: self.rest.to_string(),
            })?;

        let (value, rest) = self.rest.split_at(length);
        self.rest = rest.trim_start();
        Ok(Token::new(kind, value))
    }
}
impl<'s> Iterator for Tokenizer<'s> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_failed || self.rest.is_empty() {
            return None;
        }

        let result = self.next_token();
        self.has_failed = result.is_err();
        Some(result)
    }
}
impl<'s> FusedIterator for Tokenizer<'s> {}

/// Whether lexing the token's value yields exactly that token again.
///
/// Tokens and names arriving from outside (e.g., as JSON) must pass this before
/// they end up in generated code.
#[must_use]
pub fn is_well_formed(token: &Token) -> bool {
    let mut tokenizer = Tokenizer::new(&token.value);
    tokenizer.rest() == token.value
        && tokenizer.next().as_ref() == Some(&Ok(token.clone()))
        && tokenizer.next().is_none()
}

#[instrument(level = "trace", skip(source))]
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let tokens = Tokenizer::new(source).collect::<Result<Vec<_>, _>>()?;
    debug!("Produced {} tokens.", tokens.len());
    Ok(tokens)
}
