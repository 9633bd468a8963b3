use crate::{
    ast::{Ast, AstCall, AstDefinition, AstNode, MAX_NESTING_DEPTH},
    error::GenerationError,
    string_to_tokens::is_well_formed,
    to_text::{TextBuilder, ToText},
    token::{Token, TokenKind},
};
use itertools::Itertools;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

/// Built-in functions every generated program can call.
pub const RUNTIME: [&str; 2] = [
    "function add(x, y) { return x + y };",
    "function print(x) { console.log(x) };",
];

#[must_use]
pub fn generate(node: &AstNode) -> String {
    node.to_text(false)
}

/// Emits the runtime followed by one line per top-level node.
#[instrument(level = "trace", skip(ast))]
#[must_use]
pub fn ast_to_js(ast: &[AstNode]) -> String {
    let mut builder = TextBuilder::default();
    for line in RUNTIME {
        builder.push_line(line);
    }
    for node in ast {
        node.build_text(&mut builder);
        if !node.ends_statement() {
            builder.push(";");
        }
        builder.push("\n");
    }
    debug!("Generated JavaScript for {} top-level nodes.", ast.len());
    builder.finish(true)
}

impl AstNode {
    const fn ends_statement(&self) -> bool {
        matches!(self, Self::Definition(_))
    }
}

impl ToText for AstNode {
    fn build_text(&self, builder: &mut TextBuilder) {
        match self {
            Self::Definition(definition) => definition.build_text(builder),
            Self::Call(call) => call.build_text(builder),
            Self::VariableReference(reference) => builder.push(&reference.name),
            Self::IntegerLiteral(literal) => builder.push(literal.value.to_string()),
        }
    }
}
impl ToText for AstDefinition {
    fn build_text(&self, builder: &mut TextBuilder) {
        builder.push(format!(
            "function {}({}) {{ return ",
            self.name,
            self.parameter_names.iter().join(","),
        ));
        self.body.build_text(builder);
        builder.push(" };");
    }
}
impl ToText for AstCall {
    fn build_text(&self, builder: &mut TextBuilder) {
        builder.push(&self.name);
        builder.push("(");
        builder.push_children(&self.arguments, ",");
        builder.push(")");
    }
}

/// Every level of expressions takes two levels of JSON (the node's object and
/// its `arg_exprs` list), plus the outer list and the innermost `arg_exprs`.
const MAX_JSON_DEPTH: usize = 2 * MAX_NESTING_DEPTH + 3;

/// Reads a program from its JSON form, as produced by the `parse` stage.
///
/// Unlike an in-memory [`Ast`], the JSON can contain anything, so this is
/// where unknown node types, misplaced nodes and invalid names are rejected.
pub fn program_from_json(json: &str) -> Result<Ast, GenerationError> {
    // Checked up front so that neither parsing nor dropping the JSON recurses
    // without bound.
    if json_depth(json) > MAX_JSON_DEPTH {
        return Err(GenerationError::NestingTooDeep {
            limit: MAX_NESTING_DEPTH,
        });
    }

    let mut deserializer = serde_json::Deserializer::from_str(json);
    deserializer.disable_recursion_limit();
    let value = Value::deserialize(&mut deserializer).map_err(malformed)?;
    deserializer.end().map_err(malformed)?;
    if let Some(node_type) = find_unknown_node_type(&value) {
        return Err(GenerationError::UnknownNodeType { node_type });
    }

    let ast: Ast = serde_json::from_value(value).map_err(malformed)?;
    for node in &ast {
        if !matches!(node, AstNode::Definition(_) | AstNode::Call(_)) {
            return Err(GenerationError::MalformedNode {
                message: format!(
                    "Top-level nodes must be definitions or calls, found `{}`.",
                    node.node_type(),
                ),
            });
        }
        check_node(node, 0)?;
    }
    Ok(ast)
}
pub fn generate_from_json(json: &str) -> Result<String, GenerationError> {
    program_from_json(json).map(|ast| ast_to_js(&ast))
}

fn malformed(error: serde_json::Error) -> GenerationError {
    GenerationError::MalformedNode {
        message: error.to_string(),
    }
}

/// The deepest nesting of lists and objects, without parsing anything else.
fn json_depth(json: &str) -> usize {
    let mut depth = 0usize;
    let mut max_depth = 0;
    let mut is_in_string = false;
    let mut is_escaped = false;
    for byte in json.bytes() {
        if is_in_string {
            match byte {
                _ if is_escaped => is_escaped = false,
                b'\\' => is_escaped = true,
                b'"' => is_in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => is_in_string = true,
            b'[' | b'{' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max_depth
}

fn find_unknown_node_type(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.iter().find_map(find_unknown_node_type),
        Value::Object(fields) => {
            if let Some(node_type) = fields.get("node_type") {
                match node_type {
                    Value::String(node_type)
                        if AstNode::NODE_TYPES.contains(&node_type.as_str()) => {}
                    Value::String(node_type) => return Some(node_type.clone()),
                    other => return Some(other.to_string()),
                }
            }
            fields.values().find_map(find_unknown_node_type)
        }
        _ => None,
    }
}

/// Definitions may only appear at the top level, expressions may only nest
/// [`MAX_NESTING_DEPTH`] levels deep, and names must be valid identifiers.
fn check_node(node: &AstNode, depth: usize) -> Result<(), GenerationError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(GenerationError::NestingTooDeep {
            limit: MAX_NESTING_DEPTH,
        });
    }

    let children: &[AstNode] = match node {
        AstNode::Definition(definition) => {
            check_name(&definition.name)?;
            for name in &definition.parameter_names {
                check_name(name)?;
            }
            std::slice::from_ref(&*definition.body)
        }
        AstNode::Call(call) => {
            check_name(&call.name)?;
            &call.arguments
        }
        AstNode::VariableReference(reference) => {
            check_name(&reference.name)?;
            &[]
        }
        AstNode::IntegerLiteral(_) => &[],
    };
    for child in children {
        if let AstNode::Definition(definition) = child {
            return Err(GenerationError::MalformedNode {
                message: format!(
                    "The definition of `{}` is nested inside an expression.",
                    definition.name,
                ),
            });
        }
        check_node(child, depth + 1)?;
    }
    Ok(())
}
fn check_name(name: &str) -> Result<(), GenerationError> {
    if is_well_formed(&Token::new(TokenKind::Identifier, name)) {
        Ok(())
    } else {
        Err(GenerationError::MalformedNode {
            message: format!("{name:?} isn't a valid identifier."),
        })
    }
}
