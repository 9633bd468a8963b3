use derive_more::From;
use serde::{Deserialize, Serialize};

pub type Ast = Vec<AstNode>;

/// How deeply expressions may nest inside a top-level node. The arguments of a
/// top-level call and the body of a definition are at depth 1.
pub const MAX_NESTING_DEPTH: usize = 256;

/// On the wire, nodes are tagged with `node_type`: `def`, `call`, `var`, or
/// `int`.
#[derive(Clone, Debug, Deserialize, Eq, From, Hash, PartialEq, Serialize)]
#[serde(tag = "node_type")]
pub enum AstNode {
    #[serde(rename = "def")]
    Definition(AstDefinition),
    #[serde(rename = "call")]
    Call(AstCall),
    #[serde(rename = "var")]
    VariableReference(AstVariableReference),
    #[serde(rename = "int")]
    IntegerLiteral(AstIntegerLiteral),
}
impl AstNode {
    pub const NODE_TYPES: [&'static str; 4] = ["def", "call", "var", "int"];

    #[must_use]
    pub const fn node_type(&self) -> &'static str {
        match self {
            Self::Definition(_) => "def",
            Self::Call(_) => "call",
            Self::VariableReference(_) => "var",
            Self::IntegerLiteral(_) => "int",
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct AstDefinition {
    pub name: String,
    #[serde(rename = "arg_names")]
    pub parameter_names: Vec<String>,
    /// Always an expression, never another definition.
    pub body: Box<AstNode>,
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct AstCall {
    pub name: String,
    #[serde(rename = "arg_exprs")]
    pub arguments: Vec<AstNode>,
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct AstVariableReference {
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct AstIntegerLiteral {
    pub value: u64,
}
