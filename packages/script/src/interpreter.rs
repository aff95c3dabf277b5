use crate::ast::{BinaryOp, Expr, Statement, UnaryOp};
use crate::builtins::call_builtin;
use crate::parser::{parse_block, parse_expression};
use indexmap::IndexMap;
use loom_common::{Bindings, ScriptEngine, ScriptError, ScriptResult, Value};
use tracing::trace;

/// Tree-walking interpreter for the loom expression language
#[derive(Debug, Default, Clone)]
pub struct Interpreter;

impl Interpreter {
    pub fn new() -> Self {
        Self
    }

    pub fn eval(&self, expr: &Expr, env: &Bindings) -> ScriptResult<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ident(name) => env
                .get(name)
                .cloned()
                .ok_or_else(|| ScriptError::UnknownName { name: name.clone() }),
            Expr::List(items) => Ok(Value::Array(
                items
                    .iter()
                    .map(|item| self.eval(item, env))
                    .collect::<ScriptResult<_>>()?,
            )),
            Expr::Object(entries) => {
                let mut map = IndexMap::new();
                for (key, value) in entries {
                    map.insert(key.clone(), self.eval(value, env)?);
                }
                Ok(Value::Object(map))
            }
            Expr::Member { object, property } => {
                let object = self.eval(object, env)?;
                member(&object, property)
            }
            Expr::Index { object, index } => {
                let object = self.eval(object, env)?;
                let index = self.eval(index, env)?;
                index_into(&object, &index)
            }
            Expr::Call { function, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, env))
                    .collect::<ScriptResult<Vec<_>>>()?;
                call_builtin(function, args)
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand, env)?;
                match op {
                    UnaryOp::Not => Ok(Value::Boolean(!value.is_truthy())),
                    UnaryOp::Negate => match value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(ScriptError::type_error(format!(
                            "cannot negate {}",
                            other.type_name()
                        ))),
                    },
                }
            }
            Expr::Binary { left, op, right } => {
                let left = self.eval(left, env)?;
                // short-circuit before touching the right operand
                match op {
                    BinaryOp::And if !left.is_truthy() => return Ok(left),
                    BinaryOp::Or if left.is_truthy() => return Ok(left),
                    BinaryOp::And | BinaryOp::Or => return self.eval(right, env),
                    _ => {}
                }
                let right = self.eval(right, env)?;
                binary(*op, left, right)
            }
            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition, env)?.is_truthy() {
                    self.eval(then_branch, env)
                } else {
                    self.eval(else_branch, env)
                }
            }
        }
    }
}

impl ScriptEngine for Interpreter {
    fn evaluate_expression(&self, source: &str, bindings: &Bindings) -> ScriptResult<Value> {
        trace!(source, "evaluating expression");
        let expr = parse_expression(source)?;
        self.eval(&expr, bindings)
    }

    fn execute_block(&self, source: &str, bindings: &Bindings) -> ScriptResult<(Bindings, Value)> {
        trace!(source, "executing block");
        let statements = parse_block(source)?;
        let mut env = bindings.clone();
        let mut last_bound = Value::Null;
        for statement in &statements {
            match statement {
                Statement::Assign { name, value } => {
                    let value = self.eval(value, &env)?;
                    env.insert(name.clone(), value.clone());
                    last_bound = value;
                }
                Statement::Expr(expr) => {
                    self.eval(expr, &env)?;
                }
            }
        }
        Ok((env, last_bound))
    }
}

fn member(object: &Value, property: &str) -> ScriptResult<Value> {
    match (object, property) {
        (Value::Object(map), _) => Ok(map.get(property).cloned().unwrap_or(Value::Null)),
        (Value::Array(items), "length") => Ok(Value::from(items.len())),
        (Value::String(s), "length") => Ok(Value::from(s.chars().count())),
        (other, _) => Err(ScriptError::type_error(format!(
            "cannot read property '{}' of {}",
            property,
            other.type_name()
        ))),
    }
}

fn index_into(object: &Value, index: &Value) -> ScriptResult<Value> {
    match (object, index) {
        (Value::Array(items), Value::Number(n)) => Ok(position(*n, items.len())
            .and_then(|i| items.get(i).cloned())
            .unwrap_or(Value::Null)),
        (Value::String(s), Value::Number(n)) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(position(*n, chars.len())
                .and_then(|i| chars.get(i))
                .map(|c| Value::String(c.to_string()))
                .unwrap_or(Value::Null))
        }
        (Value::Object(map), Value::String(key)) => {
            Ok(map.get(key).cloned().unwrap_or(Value::Null))
        }
        (object, index) => Err(ScriptError::type_error(format!(
            "cannot index {} with {}",
            object.type_name(),
            index.type_name()
        ))),
    }
}

/// Resolve a possibly negative index against a length
fn position(n: f64, len: usize) -> Option<usize> {
    if n.fract() != 0.0 {
        return None;
    }
    let i = if n < 0.0 { len as f64 + n } else { n };
    (i >= 0.0 && i < len as f64).then_some(i as usize)
}

fn binary(op: BinaryOp, left: Value, right: Value) -> ScriptResult<Value> {
    use Value::*;

    match (op, left, right) {
        (BinaryOp::Add, Number(a), Number(b)) => Ok(Number(a + b)),
        (BinaryOp::Add, Array(mut a), Array(b)) => {
            a.extend(b);
            Ok(Array(a))
        }
        (BinaryOp::Add, String(a), b) => Ok(String(format!("{}{}", a, b))),
        (BinaryOp::Add, a, String(b)) => Ok(String(format!("{}{}", a, b))),
        (BinaryOp::Subtract, Number(a), Number(b)) => Ok(Number(a - b)),
        (BinaryOp::Multiply, Number(a), Number(b)) => Ok(Number(a * b)),
        (BinaryOp::Divide | BinaryOp::Modulo, Number(_), Number(b)) if b == 0.0 => {
            Err(ScriptError::DivisionByZero)
        }
        (BinaryOp::Divide, Number(a), Number(b)) => Ok(Number(a / b)),
        (BinaryOp::Modulo, Number(a), Number(b)) => Ok(Number(a % b)),
        (BinaryOp::Equal, a, b) => Ok(Boolean(a == b)),
        (BinaryOp::NotEqual, a, b) => Ok(Boolean(a != b)),
        (
            op @ (BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual),
            a,
            b,
        ) => {
            let ordering = match (&a, &b) {
                (Number(x), Number(y)) => x.partial_cmp(y),
                (String(x), String(y)) => Some(x.cmp(y)),
                _ => None,
            }
            .ok_or_else(|| {
                ScriptError::type_error(format!(
                    "cannot compare {} with {}",
                    a.type_name(),
                    b.type_name()
                ))
            })?;
            Ok(Boolean(match op {
                BinaryOp::Less => ordering.is_lt(),
                BinaryOp::LessEqual => ordering.is_le(),
                BinaryOp::Greater => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        (op, a, b) => Err(ScriptError::type_error(format!(
            "unsupported operands for {:?}: {} and {}",
            op,
            a.type_name(),
            b.type_name()
        ))),
    }
}
