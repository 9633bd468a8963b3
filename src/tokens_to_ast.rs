use crate::{
    ast::{
        Ast, AstCall, AstDefinition, AstIntegerLiteral, AstNode, AstVariableReference,
        MAX_NESTING_DEPTH,
    },
    error::ParseError,
    token::{Token, TokenKind},
};
use extension_trait::extension_trait;
use tracing::{debug, instrument};

#[instrument(level = "trace", skip(tokens))]
pub fn parse(tokens: &[Token]) -> Result<Ast, ParseError> {
    let ast = Parser::new(tokens).parse()?;
    debug!("Parsed {} top-level nodes.", ast.len());
    Ok(ast)
}

/// A predictive parser: it only ever looks at the next token, except for the
/// second token of an expression to tell calls from variable references.
#[derive(Clone, Copy, Debug)]
pub struct Parser<'t> {
    tokens: &'t [Token],
    cursor: usize,
    /// Number of `parse_expression` frames currently on the stack.
    depth: usize,
}
impl<'t> Parser<'t> {
    #[must_use]
    pub const fn new(tokens: &'t [Token]) -> Self {
        Self {
            tokens,
            cursor: 0,
            depth: 0,
        }
    }

    #[must_use]
    pub const fn is_at_end(&self) -> bool {
        self.cursor >= self.tokens.len()
    }

    #[must_use]
    pub fn peek(&self, kind: TokenKind, offset: usize) -> bool {
        self.tokens
            .get(self.cursor + offset)
            .is_some_and(|token| token.kind == kind)
    }

    pub fn consume(&mut self, expected: TokenKind) -> Result<&'t Token, ParseError> {
        let token = self.tokens.get(self.cursor).expect_kind(expected)?;
        self.cursor += 1;
        Ok(token)
    }

    pub fn parse(mut self) -> Result<Ast, ParseError> {
        let mut nodes = vec![];
        while !self.is_at_end() {
            let node: AstNode = if self.peek(TokenKind::Def, 0) {
                self.parse_definition()?.into()
            } else {
                // Anything that isn't a call fails on the call's name.
                self.parse_call()?.into()
            };
            nodes.push(node);
        }
        Ok(nodes)
    }

    #[instrument(level = "trace", skip(self))]
    fn parse_definition(&mut self) -> Result<AstDefinition, ParseError> {
        self.consume(TokenKind::Def)?;
        let name = self.consume(TokenKind::Identifier)?.value.clone();
        let parameter_names = self.parse_parameter_names()?;
        let body = self.parse_expression()?;
        self.consume(TokenKind::End)?;
        Ok(AstDefinition {
            name,
            parameter_names,
            body: Box::new(body),
        })
    }

    #[instrument(level = "trace", skip(self))]
    fn parse_parameter_names(&mut self) -> Result<Vec<String>, ParseError> {
        self.consume(TokenKind::OParen)?;
        let mut names = vec![];
        if self.peek(TokenKind::Identifier, 0) {
            names.push(self.consume(TokenKind::Identifier)?.value.clone());
            while self.peek(TokenKind::Comma, 0) {
                self.consume(TokenKind::Comma)?;
                names.push(self.consume(TokenKind::Identifier)?.value.clone());
            }
        }
        self.consume(TokenKind::CParen)?;
        Ok(names)
    }

    #[instrument(level = "trace", skip(self))]
    fn parse_expression(&mut self) -> Result<AstNode, ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
            });
        }

        self.depth += 1;
        let expression = if self.peek(TokenKind::Integer, 0) {
            self.parse_integer().map(AstNode::from)
        } else if self.peek(TokenKind::Identifier, 0) && self.peek(TokenKind::OParen, 1) {
            self.parse_call().map(AstNode::from)
        } else {
            self.parse_variable_reference().map(AstNode::from)
        };
        self.depth -= 1;
        expression
    }

    #[instrument(level = "trace", skip(self))]
    fn parse_call(&mut self) -> Result<AstCall, ParseError> {
        let name = self.consume(TokenKind::Identifier)?.value.clone();
        let arguments = self.parse_arguments()?;
        Ok(AstCall { name, arguments })
    }

    #[instrument(level = "trace", skip(self))]
    fn parse_arguments(&mut self) -> Result<Vec<AstNode>, ParseError> {
        self.consume(TokenKind::OParen)?;
        let mut arguments = vec![];
        if !self.peek(TokenKind::CParen, 0) {
            arguments.push(self.parse_expression()?);
            while self.peek(TokenKind::Comma, 0) {
                self.consume(TokenKind::Comma)?;
                arguments.push(self.parse_expression()?);
            }
        }
        self.consume(TokenKind::CParen)?;
        Ok(arguments)
    }

    #[instrument(level = "trace", skip(self))]
    fn parse_integer(&mut self) -> Result<AstIntegerLiteral, ParseError> {
        let literal = &self.consume(TokenKind::Integer)?.value;
        let value = literal
            .parse()
            .map_err(|_| ParseError::InvalidInteger {
                literal: literal.clone(),
            })?;
        Ok(AstIntegerLiteral { value })
    }

    #[instrument(level = "trace", skip(self))]
    fn parse_variable_reference(&mut self) -> Result<AstVariableReference, ParseError> {
        let name = self.consume(TokenKind::Identifier)?.value.clone();
        Ok(AstVariableReference { name })
    }
}

#[extension_trait]
pub impl<'t> ExpectTokenKind<'t> for Option<&'t Token> {
    fn expect_kind(self, expected: TokenKind) -> Result<&'t Token, ParseError> {
        match self {
            Some(token) if token.kind == expected => Ok(token),
            Some(token) => Err(ParseError::UnexpectedToken {
                expected,
                found: token.kind,
            }),
            None => Err(ParseError::UnexpectedEndOfInput { expected }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        string_to_tokens::tokenize,
        test_utils::{nested_calls, with_large_stack},
    };
    use itertools::Itertools;
    use proptest::prelude::*;

    fn parse_source(source: &str) -> Result<Ast, ParseError> {
        parse(&tokenize(source).unwrap())
    }
    fn var(name: &str) -> AstNode {
        AstVariableReference {
            name: name.to_string(),
        }
        .into()
    }
    fn int(value: u64) -> AstNode {
        AstIntegerLiteral { value }.into()
    }
    fn call(name: &str, arguments: Vec<AstNode>) -> AstNode {
        AstCall {
            name: name.to_string(),
            arguments,
        }
        .into()
    }

    #[test]
    fn test_definition() {
        assert_eq!(
            parse_source("def add(x, y) add(x, y) end"),
            Ok(vec![AstDefinition {
                name: "add".to_string(),
                parameter_names: vec!["x".to_string(), "y".to_string()],
                body: Box::new(call("add", vec![var("x"), var("y")])),
            }
            .into()]),
        );
    }

    #[test]
    fn test_definition_bodies() {
        let bodies = parse_source("def a() 1 end def b(x) x end def c() c() end")
            .unwrap()
            .into_iter()
            .map(|node| match node {
                AstNode::Definition(definition) => *definition.body,
                node => panic!("Expected a definition, got {node:?}"),
            })
            .collect_vec();
        assert_eq!(bodies, [int(1), var("x"), call("c", vec![])]);
    }

    #[test]
    fn test_top_level_call() {
        assert_eq!(
            parse_source("print(add(1, 2))"),
            Ok(vec![call("print", vec![call("add", vec![int(1), int(2)])])]),
        );
        assert_eq!(
            parse_source("f() g(h(), 0)"),
            Ok(vec![
                call("f", vec![]),
                call("g", vec![call("h", vec![]), int(0)]),
            ]),
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse(&[]), Ok(vec![]));
    }

    #[test]
    fn test_missing_closing_parenthesis() {
        assert_eq!(
            parse_source("def f(x"),
            Err(ParseError::UnexpectedEndOfInput {
                expected: TokenKind::CParen,
            }),
        );
        assert_eq!(
            parse_source("def f(x)"),
            Err(ParseError::UnexpectedEndOfInput {
                expected: TokenKind::Identifier,
            }),
        );
        assert_eq!(
            parse_source("print(1"),
            Err(ParseError::UnexpectedEndOfInput {
                expected: TokenKind::CParen,
            }),
        );
    }

    #[test]
    fn test_bare_top_level_expressions_are_rejected() {
        assert_eq!(
            parse_source("42"),
            Err(ParseError::UnexpectedToken {
                expected: TokenKind::Identifier,
                found: TokenKind::Integer,
            }),
        );
        assert_eq!(
            parse_source("x"),
            Err(ParseError::UnexpectedEndOfInput {
                expected: TokenKind::OParen,
            }),
        );
        assert_eq!(
            parse_source("x y()"),
            Err(ParseError::UnexpectedToken {
                expected: TokenKind::OParen,
                found: TokenKind::Identifier,
            }),
        );
        assert_eq!(
            parse_source("end"),
            Err(ParseError::UnexpectedToken {
                expected: TokenKind::Identifier,
                found: TokenKind::End,
            }),
        );
    }

    #[test]
    fn test_malformed_lists() {
        assert_eq!(
            parse_source("def f(x,) x end"),
            Err(ParseError::UnexpectedToken {
                expected: TokenKind::Identifier,
                found: TokenKind::CParen,
            }),
        );
        assert_eq!(
            parse_source("def f(1) x end"),
            Err(ParseError::UnexpectedToken {
                expected: TokenKind::CParen,
                found: TokenKind::Integer,
            }),
        );
        assert_eq!(
            parse_source("f(1 2)"),
            Err(ParseError::UnexpectedToken {
                expected: TokenKind::CParen,
                found: TokenKind::Integer,
            }),
        );
        assert_eq!(
            parse_source("def f() 1 2 end"),
            Err(ParseError::UnexpectedToken {
                expected: TokenKind::End,
                found: TokenKind::Integer,
            }),
        );
    }

    #[test]
    fn test_nesting_depth() {
        with_large_stack(|| {
            assert!(parse_source(&nested_calls(MAX_NESTING_DEPTH)).is_ok());
            assert_eq!(
                parse_source(&nested_calls(MAX_NESTING_DEPTH + 1)),
                Err(ParseError::NestingTooDeep {
                    limit: MAX_NESTING_DEPTH,
                }),
            );
            assert_eq!(
                parse_source(&format!("def f() {} end", nested_calls(MAX_NESTING_DEPTH))),
                Err(ParseError::NestingTooDeep {
                    limit: MAX_NESTING_DEPTH,
                }),
            );
            // Fails at the limit instead of exhausting the stack.
            assert_eq!(
                parse_source(&nested_calls(100_000)),
                Err(ParseError::NestingTooDeep {
                    limit: MAX_NESTING_DEPTH,
                }),
            );
        });

        // Siblings don't add up.
        let wide = format!("f({}1)", "g(1),".repeat(2 * MAX_NESTING_DEPTH));
        assert_eq!(
            parse_source(&wide).map(|ast| ast.len()),
            Ok(1),
        );
    }

    #[test]
    fn test_integer_out_of_range() {
        assert_eq!(
            parse_source("print(18446744073709551616)"),
            Err(ParseError::InvalidInteger {
                literal: "18446744073709551616".to_string(),
            }),
        );
        assert_eq!(
            parse_source("print(007)"),
            Ok(vec![call("print", vec![int(7)])]),
        );
    }

    #[test]
    fn test_peek_and_consume() {
        let tokens = tokenize("f(x)").unwrap();
        let mut parser = Parser::new(&tokens);
        assert!(parser.peek(TokenKind::Identifier, 0));
        assert!(parser.peek(TokenKind::OParen, 1));
        assert!(!parser.peek(TokenKind::CParen, 4));
        assert_eq!(parser.consume(TokenKind::Identifier).unwrap().value, "f");
        assert_eq!(
            parser.consume(TokenKind::Comma),
            Err(ParseError::UnexpectedToken {
                expected: TokenKind::Comma,
                found: TokenKind::OParen,
            }),
        );
        // A failed `consume` doesn't move the cursor.
        assert!(parser.peek(TokenKind::OParen, 0));
    }

    fn name() -> impl Strategy<Value = String> {
        "[a-z]{1,6}".prop_filter("keywords aren't names", |it| it != "def" && it != "end")
    }
    fn expression() -> impl Strategy<Value = AstNode> {
        let leaf = prop_oneof![
            any::<u64>().prop_map(int),
            name().prop_map(|name| var(&name)),
        ];
        leaf.prop_recursive(4, 32, 4, |inner| {
            (name(), prop::collection::vec(inner, 0..4))
                .prop_map(|(name, arguments)| call(&name, arguments))
        })
    }
    fn definition() -> impl Strategy<Value = AstNode> {
        (name(), prop::collection::vec(name(), 0..4), expression()).prop_map(
            |(name, parameter_names, body)| {
                AstDefinition {
                    name,
                    parameter_names,
                    body: Box::new(body),
                }
                .into()
            },
        )
    }

    fn to_source(node: &AstNode) -> String {
        match node {
            AstNode::Definition(definition) => format!(
                "def {}({}) {} end",
                definition.name,
                definition.parameter_names.join(", "),
                to_source(&definition.body),
            ),
            AstNode::Call(call) => format!(
                "{}({})",
                call.name,
                call.arguments.iter().map(to_source).join(", "),
            ),
            AstNode::VariableReference(reference) => reference.name.clone(),
            AstNode::IntegerLiteral(literal) => literal.value.to_string(),
        }
    }
    fn comma_count(source: &str) -> usize {
        source.chars().filter(|&c| c == ',').count()
    }
    fn list_item_count(node: &AstNode) -> usize {
        match node {
            AstNode::Definition(definition) => {
                definition.parameter_names.len() + list_item_count(&definition.body)
            }
            AstNode::Call(call) => {
                call.arguments.len() + call.arguments.iter().map(list_item_count).sum::<usize>()
            }
            AstNode::VariableReference(_) | AstNode::IntegerLiteral(_) => 0,
        }
    }
    fn list_count(node: &AstNode) -> usize {
        match node {
            AstNode::Definition(definition) => 1 + list_count(&definition.body),
            AstNode::Call(call) => 1 + call.arguments.iter().map(list_count).sum::<usize>(),
            AstNode::VariableReference(_) | AstNode::IntegerLiteral(_) => 0,
        }
    }

    proptest! {
        #[test]
        fn test_parses_generated_programs(
            nodes in prop::collection::vec(
                prop_oneof![
                    definition(),
                    (name(), prop::collection::vec(expression(), 0..4))
                        .prop_map(|(name, arguments)| call(&name, arguments)),
                ],
                0..6,
            ),
        ) {
            let source = nodes.iter().map(to_source).join("\n");
            let ast = parse_source(&source).unwrap();
            prop_assert_eq!(&ast, &nodes);
        }

        #[test]
        fn test_list_arity_matches_commas(node in definition()) {
            let source = to_source(&node);
            let ast = parse_source(&source).unwrap();
            prop_assert_eq!(ast.len(), 1);
            // Every non-empty list has one comma less than items.
            let non_empty_lists = source.matches('(').count() - source.matches("()").count();
            prop_assert_eq!(list_count(&ast[0]), source.matches('(').count());
            prop_assert_eq!(
                list_item_count(&ast[0]),
                comma_count(&source) + non_empty_lists,
            );
        }
    }
}
