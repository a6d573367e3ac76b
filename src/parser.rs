//! Parser for Quill
//!
//! Lowers the token stream straight to stack-machine instructions: a
//! recursive-descent statement parser over function declarations, with a
//! shunting-yard expression lowerer feeding the same output form. There is
//! no intermediate syntax tree.

use std::collections::HashSet;

use crate::error::ParseError;
use crate::op::Op;
use crate::program::{ExternFunction, Function, Param, Program, ValueType};
use crate::token::Token;

/// The parser state
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    /// Parameters of the function being parsed, for classifying
    /// identifiers during expression lowering.
    current_params: Vec<Param>,
    /// Locals declared so far in the function being parsed.
    current_locals: HashSet<String>,
}

impl Parser {
    /// Create a new parser from tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            current_params: Vec::new(),
            current_locals: HashSet::new(),
        }
    }

    /// Parse the tokens into a program
    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::new();

        while !self.is_at_end() {
            if self.check("fun") {
                self.advance();
                let function = self.function_declaration()?;
                program.add_function(function)?;
            } else if self.check("extern") {
                self.advance();
                let function = self.extern_declaration()?;
                program.add_extern(function)?;
            } else {
                // Anything else at top level is skipped, not rejected.
                self.advance();
            }
        }

        Ok(program)
    }

    // ==================== Declarations ====================

    fn function_declaration(&mut self) -> Result<Function, ParseError> {
        let name = self.expect_identifier("function name after 'fun'")?;

        self.current_params = self.parameter_list()?;
        self.current_locals.clear();

        self.expect("->", "'->' after parameters")?;
        let return_type = self.type_annotation()?;

        self.expect("{", "'{' after return type")?;
        let ops = self.block()?;

        Ok(Function {
            name,
            params: std::mem::take(&mut self.current_params),
            return_type,
            ops,
            locals: std::mem::take(&mut self.current_locals),
        })
    }

    /// `extern "<path>" <name> ( params ) -> <type> ;`
    fn extern_declaration(&mut self) -> Result<ExternFunction, ParseError> {
        let path = self.expect_string_literal("path after 'extern'")?;
        let name = self.expect_identifier("extern function name")?;
        let params = self.parameter_list()?;

        self.expect("->", "'->' after parameters")?;
        let return_type = self.type_annotation()?;
        self.expect(";", "';' after extern declaration")?;

        Ok(ExternFunction {
            path,
            name,
            params,
            return_type,
        })
    }

    fn parameter_list(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect("(", "'(' after function name")?;

        let mut params = Vec::new();
        while !self.check(")") {
            let name = self.expect_identifier("parameter name")?;
            self.expect(":", "':' after parameter name")?;
            let ty = self.type_annotation()?;
            params.push(Param { name, ty });

            if self.check(",") {
                self.advance();
            } else if !self.check(")") {
                return Err(self.expected("',' or ')' after parameter"));
            }
        }

        self.advance(); // consume ')'
        Ok(params)
    }

    fn type_annotation(&mut self) -> Result<ValueType, ParseError> {
        let Some(token) = self.peek() else {
            return Err(self.expected("a type"));
        };
        let ty = ValueType::from_token(token.text())
            .ok_or_else(|| ParseError::InvalidType(token.text().to_string()))?;
        self.advance();
        Ok(ty)
    }

    // ==================== Statements ====================

    /// Parse statements up to and including the closing '}'
    fn block(&mut self) -> Result<Vec<Op>, ParseError> {
        let mut ops = Vec::new();

        while !self.check("}") {
            if self.is_at_end() {
                return Err(self.expected("'}' to close block"));
            }
            self.statement(&mut ops)?;
        }

        self.advance(); // consume '}'
        Ok(ops)
    }

    fn statement(&mut self, ops: &mut Vec<Op>) -> Result<(), ParseError> {
        if self.check("let") {
            self.advance();
            self.let_statement(ops)
        } else if self.check("if") {
            self.advance();
            self.if_statement(ops)
        } else if self.check("while") {
            self.advance();
            self.while_statement(ops)
        } else if self.check("for") {
            self.advance();
            self.for_statement(ops)
        } else if self.check("return") {
            self.advance();
            self.return_statement(ops)
        } else if self.peek().map_or(false, Token::is_identifier) {
            self.call_or_assignment(ops)
        } else {
            Err(ParseError::UnknownStatement(self.found()))
        }
    }

    /// `let <name> : <type> = <expr> ;`
    fn let_statement(&mut self, ops: &mut Vec<Op>) -> Result<(), ParseError> {
        let name = self.expect_identifier("variable name after 'let'")?;

        // Registered before the initializer lowers, so later statements
        // (and the rest of this one) can reference it.
        self.current_locals.insert(name.clone());

        self.expect(":", "':' after variable name")?;
        self.type_annotation()?; // declared type is not enforced at runtime

        self.expect("=", "'=' in variable declaration")?;
        self.lower_expression(ops, &[";"])?;
        ops.push(Op::StoreVar(name));

        self.expect(";", "';' after variable declaration")?;
        Ok(())
    }

    /// `if ( <expr> ) { block } [ else { block } ]`
    fn if_statement(&mut self, ops: &mut Vec<Op>) -> Result<(), ParseError> {
        self.expect("(", "'(' after 'if'")?;
        self.lower_expression(ops, &[")"])?;
        self.expect(")", "')' after condition")?;

        self.expect("{", "'{' after condition")?;
        let then_ops = self.block()?;

        let else_ops = if self.check("else") {
            self.advance();
            self.expect("{", "'{' after 'else'")?;
            self.block()?
        } else {
            Vec::new()
        };

        ops.push(Op::If { then_ops, else_ops });
        Ok(())
    }

    /// `while ( <expr> ) { block }`
    fn while_statement(&mut self, ops: &mut Vec<Op>) -> Result<(), ParseError> {
        self.expect("(", "'(' after 'while'")?;
        let mut condition = Vec::new();
        self.lower_expression(&mut condition, &[")"])?;
        self.expect(")", "')' after condition")?;

        self.expect("{", "'{' after condition")?;
        let body = self.block()?;

        ops.push(Op::Loop { condition, body });
        Ok(())
    }

    /// `for ( let ... ; <expr> ; <increment> ) { block }`
    ///
    /// Desugars to the initializer statement followed by a loop whose body
    /// ends with the increment.
    fn for_statement(&mut self, ops: &mut Vec<Op>) -> Result<(), ParseError> {
        self.expect("(", "'(' after 'for'")?;
        self.expect("let", "'let' in for initializer")?;
        self.let_statement(ops)?;

        let mut condition = Vec::new();
        self.lower_expression(&mut condition, &[";"])?;
        self.expect(";", "';' after loop condition")?;

        let mut increment = Vec::new();
        self.increment_clause(&mut increment)?;
        self.expect(")", "')' after for clauses")?;

        self.expect("{", "'{' after for clauses")?;
        let mut body = self.block()?;
        body.extend(increment);

        ops.push(Op::Loop { condition, body });
        Ok(())
    }

    /// The third clause of a `for` head: an assignment without its
    /// semicolon, or a bare expression.
    fn increment_clause(&mut self, ops: &mut Vec<Op>) -> Result<(), ParseError> {
        if self.peek().map_or(false, Token::is_identifier) && self.peek_next_is("=") {
            let name = self.expect_identifier("assignment target")?;
            if !self.is_declared(&name) {
                return Err(ParseError::UndefinedReference(name));
            }
            self.advance(); // consume '='
            self.lower_expression(ops, &[")"])?;
            ops.push(Op::StoreVar(name));
        } else {
            self.lower_expression(ops, &[")"])?;
        }
        Ok(())
    }

    /// `return <expr> ;`
    fn return_statement(&mut self, ops: &mut Vec<Op>) -> Result<(), ParseError> {
        self.lower_expression(ops, &[";"])?;
        ops.push(Op::Return);
        self.expect(";", "';' after return value")?;
        Ok(())
    }

    /// `<name> = <expr> ;` or `<name> ( args ) ;`
    fn call_or_assignment(&mut self, ops: &mut Vec<Op>) -> Result<(), ParseError> {
        if self.peek_next_is("=") {
            let name = self.expect_identifier("assignment target")?;
            if !self.is_declared(&name) {
                return Err(ParseError::UndefinedReference(name));
            }
            self.advance(); // consume '='
            self.lower_expression(ops, &[";"])?;
            ops.push(Op::StoreVar(name));
            self.expect(";", "';' after assignment")?;
        } else {
            let name = self.expect_identifier("statement")?;
            self.lower_call(name, ops)?;
            self.expect(";", "';' after call")?;
        }
        Ok(())
    }

    // ==================== Expression lowering ====================

    /// Shunting-yard: consume tokens until a terminator, emitting operands
    /// as they appear and operators in postfix order. The stream is left
    /// positioned at the terminator.
    fn lower_expression(
        &mut self,
        output: &mut Vec<Op>,
        terminators: &[&str],
    ) -> Result<(), ParseError> {
        let mut operators: Vec<String> = Vec::new();

        loop {
            let Some(token) = self.peek() else {
                break;
            };
            let text = token.text();

            // A ')' only terminates when it does not close an open '(' marker.
            if terminators.contains(&text)
                && !(text == ")" && operators.iter().any(|op| op == "("))
            {
                break;
            }

            if token.is_number() || token.is_string_literal() || token.is_bool_literal() {
                output.push(Op::Push(text.to_string()));
                self.advance();
            } else if token.is_identifier() {
                let name = text.to_string();
                if self.is_declared(&name) {
                    output.push(Op::LoadVar(name));
                    self.advance();
                } else if self.peek_next_is("(") {
                    self.advance(); // consume the callee name
                    self.lower_call(name, output)?;
                } else {
                    return Err(ParseError::UndefinedReference(name));
                }
            } else if is_operator(text) {
                let symbol = text.to_string();
                // Unary '!' binds tightest and is right-associative, so it
                // never pops; binary operators pop left-to-right on equal
                // precedence.
                if symbol != "!" {
                    while let Some(top) = operators.last().cloned() {
                        if top == "(" || precedence(&top) < precedence(&symbol) {
                            break;
                        }
                        operators.pop();
                        output.push(symbol_op(&top)?);
                    }
                }
                operators.push(symbol);
                self.advance();
            } else if text == "(" {
                operators.push("(".to_string());
                self.advance();
            } else if text == ")" {
                // Pop back to the matching marker
                loop {
                    match operators.pop() {
                        Some(top) if top == "(" => break,
                        Some(top) => output.push(symbol_op(&top)?),
                        None => return Err(ParseError::UnexpectedToken(")".to_string())),
                    }
                }
                self.advance();
            } else {
                return Err(ParseError::UnexpectedToken(text.to_string()));
            }
        }

        // Drain what's left in stack order
        while let Some(top) = operators.pop() {
            output.push(symbol_op(&top)?);
        }

        Ok(())
    }

    /// Lower a call's arguments (each one a full expression) and the
    /// trailing `call` instruction. The callee name is already consumed.
    fn lower_call(&mut self, name: String, output: &mut Vec<Op>) -> Result<(), ParseError> {
        self.expect("(", "'(' after function name")?;

        if !self.check(")") {
            loop {
                self.lower_expression(output, &[",", ")"])?;
                if self.check(",") {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        self.expect(")", "')' after arguments")?;
        output.push(Op::Call(name));
        Ok(())
    }

    fn is_declared(&self, name: &str) -> bool {
        self.current_locals.contains(name) || self.current_params.iter().any(|p| p.name == name)
    }

    // ==================== Helpers ====================

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn peek_next_is(&self, text: &str) -> bool {
        self.tokens
            .get(self.current + 1)
            .map_or(false, |t| t.text() == text)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    fn check(&self, text: &str) -> bool {
        self.peek().map_or(false, |t| t.text() == text)
    }

    fn expect(&mut self, text: &str, context: &str) -> Result<(), ParseError> {
        if self.check(text) {
            self.advance();
            Ok(())
        } else {
            Err(self.expected(context))
        }
    }

    fn expect_identifier(&mut self, context: &str) -> Result<String, ParseError> {
        match self.peek() {
            Some(token) if token.is_identifier() => {
                let name = token.text().to_string();
                self.advance();
                Ok(name)
            }
            _ => Err(self.expected(context)),
        }
    }

    fn expect_string_literal(&mut self, context: &str) -> Result<String, ParseError> {
        match self.peek() {
            Some(token) if token.is_string_literal() => {
                let text = token.text();
                let inner = text[1..text.len() - 1].to_string();
                self.advance();
                Ok(inner)
            }
            _ => Err(self.expected(context)),
        }
    }

    fn expected(&self, context: &str) -> ParseError {
        ParseError::Expected {
            expected: context.to_string(),
            found: self.found(),
        }
    }

    fn found(&self) -> String {
        self.peek()
            .map(|t| t.text().to_string())
            .unwrap_or_else(|| "end of input".to_string())
    }
}

fn is_operator(text: &str) -> bool {
    matches!(text, "+" | "-" | "*" | "/" | "==" | "!=" | "<" | ">" | "!")
}

fn precedence(op: &str) -> u8 {
    match op {
        "!" => 3,
        "*" | "/" => 2,
        "+" | "-" => 1,
        _ => 0, // comparisons
    }
}

fn symbol_op(symbol: &str) -> Result<Op, ParseError> {
    // Leftover '(' markers land here as unbalanced parentheses.
    Op::from_symbol(symbol).ok_or_else(|| ParseError::UnexpectedToken(symbol.to_string()))
}
