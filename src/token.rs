use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use strum::{EnumIter, EnumString, IntoStaticStr};

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    EnumIter,
    EnumString,
    Eq,
    Hash,
    IntoStaticStr,
    PartialEq,
    Serialize,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TokenKind {
    Def,
    End,
    Identifier,
    Integer,
    OParen,
    CParen,
    Comma,
}

/// A lexical unit together with the exact source text it was matched from.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
}
impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
impl Display for Token {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.kind {
            TokenKind::Identifier | TokenKind::Integer => write!(f, "{}({})", self.kind, self.value),
            _ => write!(f, "{}", self.kind),
        }
    }
}
