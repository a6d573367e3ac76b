//! Stack-machine interpreter for Quill
//!
//! One operand stack and one stack of call frames, shared across the whole
//! run. Control flow recurses into the nested instruction lists the parser
//! produced; there is no instruction pointer.

use std::collections::HashMap;
use std::io::Write;

use crate::error::RuntimeError;
use crate::externs;
use crate::op::Op;
use crate::program::Program;
use crate::value::Value;

/// Signal threaded through `run` so `return` unwinds nested blocks up to
/// the enclosing function call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Normal,
    Return,
}

/// The interpreter state
pub struct Interpreter<'a> {
    program: Program,
    /// Operand stack, shared by every frame.
    operands: Vec<Value>,
    /// One flat name->value map per active call. Frames do not chain.
    frames: Vec<HashMap<String, Value>>,
    /// Where `print` and forwarded extern output go.
    output: &'a mut dyn Write,
}

impl<'a> Interpreter<'a> {
    pub fn new(program: Program, output: &'a mut dyn Write) -> Self {
        Self {
            program,
            operands: Vec::new(),
            frames: Vec::new(),
            output,
        }
    }

    /// Run the program's `main` function.
    pub fn execute(&mut self) -> Result<(), RuntimeError> {
        let main = self
            .program
            .function("main")
            .cloned()
            .ok_or(RuntimeError::NoMain)?;

        self.frames.push(HashMap::new());
        self.run(&main.ops)?;
        Ok(())
    }

    fn run(&mut self, ops: &[Op]) -> Result<Flow, RuntimeError> {
        for op in ops {
            match op {
                Op::Push(literal) => {
                    let value = decode_literal(literal)?;
                    self.operands.push(value);
                }

                Op::LoadVar(name) => {
                    let value = self
                        .frames
                        .last()
                        .and_then(|frame| frame.get(name))
                        .cloned()
                        .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone()))?;
                    self.operands.push(value);
                }

                Op::StoreVar(name) => {
                    let value = self.pop("store_var")?;
                    // execute() and call() push a frame before running any ops
                    if let Some(frame) = self.frames.last_mut() {
                        frame.insert(name.clone(), value);
                    }
                }

                Op::Add => self.add()?,
                Op::Sub => self.arithmetic("subtract", "-", |a, b| a - b)?,
                Op::Mul => self.arithmetic("multiply", "*", |a, b| a * b)?,
                Op::Div => self.arithmetic("divide", "/", |a, b| a / b)?,

                Op::Eq => {
                    let (left, right) = self.pop_pair("==")?;
                    self.operands.push(Value::Bool(left.approx_eq(&right)));
                }
                Op::Ne => {
                    let (left, right) = self.pop_pair("!=")?;
                    self.operands.push(Value::Bool(!left.approx_eq(&right)));
                }
                Op::Lt => self.comparison("<", |a, b| a < b)?,
                Op::Gt => self.comparison(">", |a, b| a > b)?,
                Op::Le => self.comparison("<=", |a, b| a <= b)?,
                Op::Ge => self.comparison(">=", |a, b| a >= b)?,

                Op::Not => match self.pop("!")? {
                    Value::Bool(b) => self.operands.push(Value::Bool(!b)),
                    value => {
                        return Err(RuntimeError::ExpectedBool {
                            context: "!",
                            found: value.type_name(),
                        })
                    }
                },

                Op::If { then_ops, else_ops } => {
                    let branch = if self.pop_bool("if")? { then_ops } else { else_ops };
                    if self.run(branch)? == Flow::Return {
                        return Ok(Flow::Return);
                    }
                }

                Op::Loop { condition, body } => loop {
                    if self.run(condition)? == Flow::Return {
                        return Ok(Flow::Return);
                    }
                    if !self.pop_bool("loop")? {
                        break;
                    }
                    if self.run(body)? == Flow::Return {
                        return Ok(Flow::Return);
                    }
                },

                Op::Call(name) => self.call(name)?,

                Op::Return => return Ok(Flow::Return),
            }
        }

        Ok(Flow::Normal)
    }

    /// Dispatch a call: builtins first, then user functions, then externs.
    fn call(&mut self, name: &str) -> Result<(), RuntimeError> {
        match name {
            "print" => {
                let value = self.pop("print")?;
                writeln!(self.output, "{}", value)
                    .map_err(|e| RuntimeError::Output(e.to_string()))?;
            }

            "num_to_string" => match self.pop("num_to_string")? {
                Value::Number(n) => self.operands.push(Value::String(n.to_string())),
                value => return Err(RuntimeError::ExpectedNumber(value.type_name())),
            },

            _ => {
                if let Some(function) = self.program.function(name).cloned() {
                    // Arguments were pushed left-to-right, so the last
                    // parameter comes off the stack first.
                    let mut frame = HashMap::new();
                    for param in function.params.iter().rev() {
                        let value = self.pop(name)?;
                        frame.insert(param.name.clone(), value);
                    }

                    self.frames.push(frame);
                    let result = self.run(&function.ops);
                    self.frames.pop();
                    result?;
                } else if let Some(ext) = self.program.extern_function(name).cloned() {
                    let mut args = Vec::new();
                    for _ in 0..ext.params.len() {
                        args.push(self.pop(name)?);
                    }
                    args.reverse(); // back to declaration order

                    if let Some(value) = externs::invoke(&ext, args, &mut *self.output)? {
                        self.operands.push(value);
                    }
                } else {
                    return Err(RuntimeError::UnknownFunction(name.to_string()));
                }
            }
        }

        Ok(())
    }

    fn add(&mut self) -> Result<(), RuntimeError> {
        let (left, right) = self.pop_pair("+")?;
        let value = match (left, right) {
            (Value::Number(l), Value::Number(r)) => Value::Number(l + r),
            (Value::String(l), Value::String(r)) => Value::String(l + &r),
            (left, right) => {
                return Err(RuntimeError::InvalidOperands {
                    op: "add",
                    left: left.type_name(),
                    right: right.type_name(),
                })
            }
        };
        self.operands.push(value);
        Ok(())
    }

    fn arithmetic(
        &mut self,
        verb: &'static str,
        symbol: &'static str,
        apply: fn(f64, f64) -> f64,
    ) -> Result<(), RuntimeError> {
        let (left, right) = self.pop_pair(symbol)?;
        match (left, right) {
            (Value::Number(l), Value::Number(r)) => {
                self.operands.push(Value::Number(apply(l, r)));
                Ok(())
            }
            (left, right) => Err(RuntimeError::InvalidOperands {
                op: verb,
                left: left.type_name(),
                right: right.type_name(),
            }),
        }
    }

    fn comparison(
        &mut self,
        symbol: &'static str,
        apply: fn(f64, f64) -> bool,
    ) -> Result<(), RuntimeError> {
        let (left, right) = self.pop_pair(symbol)?;
        match (left, right) {
            (Value::Number(l), Value::Number(r)) => {
                self.operands.push(Value::Bool(apply(l, r)));
                Ok(())
            }
            (left, right) => Err(RuntimeError::InvalidOperands {
                op: "compare",
                left: left.type_name(),
                right: right.type_name(),
            }),
        }
    }

    fn pop(&mut self, operation: &str) -> Result<Value, RuntimeError> {
        self.operands
            .pop()
            .ok_or_else(|| RuntimeError::StackUnderflow(operation.to_string()))
    }

    /// Pop right then left: the right operand was pushed last.
    fn pop_pair(&mut self, operation: &str) -> Result<(Value, Value), RuntimeError> {
        let right = self.pop(operation)?;
        let left = self.pop(operation)?;
        Ok((left, right))
    }

    fn pop_bool(&mut self, context: &'static str) -> Result<bool, RuntimeError> {
        match self.pop(context)? {
            Value::Bool(b) => Ok(b),
            value => Err(RuntimeError::ExpectedBool {
                context,
                found: value.type_name(),
            }),
        }
    }
}

/// Decode a `push` literal by its source spelling.
fn decode_literal(literal: &str) -> Result<Value, RuntimeError> {
    if literal == "true" {
        return Ok(Value::Bool(true));
    }
    if literal == "false" {
        return Ok(Value::Bool(false));
    }
    if literal.len() >= 2 && literal.starts_with('"') && literal.ends_with('"') {
        return Ok(Value::String(literal[1..literal.len() - 1].to_string()));
    }
    literal
        .parse::<f64>()
        .map(Value::Number)
        .map_err(|_| RuntimeError::InvalidLiteral(literal.to_string()))
}
