//=====================================================
// File: interpreter/eval.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Tree-walking evaluation of GatoScript programs
// Objective: Reduce statements and expressions to objects while threading returns
//            and errors through a single control-flow channel
//=====================================================

use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::{BlockStatement, Expression, InfixOperator, PrefixOperator, Statement};

use super::builtins;
use super::environment::Environment;
use super::errors::{Flow, RuntimeError};
use super::object::{Function, HashPair, Object, ObjectKind};

const RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH: usize = 1024 * 1024;

pub(crate) type EvalResult = Result<Object, Flow>;

pub(crate) fn eval_statements(statements: &[Statement], env: &Environment) -> EvalResult {
    let mut result = Object::Null;
    for statement in statements {
        result = eval_statement(statement, env)?;
    }
    Ok(result)
}

/// Blocks share the scope they run in; only calls open a new one.
pub(crate) fn eval_block(block: &BlockStatement, env: &Environment) -> EvalResult {
    eval_statements(&block.statements, env)
}

fn eval_statement(statement: &Statement, env: &Environment) -> EvalResult {
    match statement {
        Statement::Let { name, value } => {
            let value = eval_expression(value, env)?;
            env.set(name.as_str(), value);
            Ok(Object::Null)
        }
        Statement::Return(value) => Err(Flow::Return(eval_expression(value, env)?)),
        Statement::Expression(expr) => eval_expression(expr, env),
    }
}

pub(crate) fn eval_expression(expr: &Expression, env: &Environment) -> EvalResult {
    stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || eval_expression_inner(expr, env))
}

fn eval_expression_inner(expr: &Expression, env: &Environment) -> EvalResult {
    match expr {
        Expression::Identifier(name) => Ok(resolve(name, env)?),
        Expression::Integer(value) => Ok(Object::Integer(*value)),
        Expression::String(value) => Ok(Object::from(value.as_str())),
        Expression::Boolean(value) => Ok(Object::Boolean(*value)),
        Expression::Null => Ok(Object::Null),
        Expression::Prefix { operator, right } => {
            let right = eval_expression(right, env)?;
            Ok(eval_prefix(*operator, &right)?)
        }
        Expression::Infix {
            left,
            operator,
            right,
        } => {
            let left = eval_expression(left, env)?;
            let right = eval_expression(right, env)?;
            Ok(eval_infix(*operator, &left, &right)?)
        }
        Expression::If {
            condition,
            consequence,
            alternative,
        } => {
            if eval_expression(condition, env)?.is_truthy() {
                eval_block(consequence, env)
            } else if let Some(alternative) = alternative {
                eval_block(alternative, env)
            } else {
                Ok(Object::Null)
            }
        }
        Expression::While { condition, body } => {
            while eval_expression(condition, env)?.is_truthy() {
                eval_block(body, env)?;
            }
            Ok(Object::Null)
        }
        Expression::Assign { name, value } => {
            let value = eval_expression(value, env)?;
            env.update(name, value)
                .ok_or_else(|| Flow::from(RuntimeError::IdentifierNotFound(name.clone())))
        }
        Expression::CompoundAssign {
            name,
            operator,
            value,
        } => {
            let value = eval_expression(value, env)?;
            env.update_with(name, |current| eval_infix(*operator, current, &value))?
                .ok_or_else(|| Flow::from(RuntimeError::IdentifierNotFound(name.clone())))
        }
        Expression::Function { parameters, body } => Ok(Object::Function(Arc::new(Function {
            parameters: parameters.clone(),
            body: Arc::clone(body),
            env: env.clone(),
        }))),
        Expression::Call {
            function,
            arguments,
        } => {
            let callee = eval_expression(function, env)?;
            let arguments = eval_expressions(arguments, env)?;
            Ok(super::call(&callee, arguments)?)
        }
        Expression::Array(elements) => Ok(Object::array(eval_expressions(elements, env)?)),
        Expression::Hash(pairs) => eval_hash(pairs, env),
        Expression::Index { left, index } => {
            let left = eval_expression(left, env)?;
            let index = eval_expression(index, env)?;
            Ok(eval_index(&left, &index)?)
        }
    }
}

/// Environment first, then the builtin table.
fn resolve(name: &str, env: &Environment) -> Result<Object, RuntimeError> {
    env.get(name)
        .or_else(|| builtins::lookup(name).map(Object::Builtin))
        .ok_or_else(|| RuntimeError::IdentifierNotFound(name.to_string()))
}

/// Left to right; the first failure stops evaluation.
fn eval_expressions(exprs: &[Expression], env: &Environment) -> Result<Vec<Object>, Flow> {
    exprs.iter().map(|expr| eval_expression(expr, env)).collect()
}

fn eval_hash(pairs: &[(Expression, Expression)], env: &Environment) -> EvalResult {
    let mut entries = HashMap::with_capacity(pairs.len());
    for (key_expr, value_expr) in pairs {
        let key = eval_expression(key_expr, env)?;
        let hash_key = key
            .hash_key()
            .ok_or_else(|| RuntimeError::UnusableHashKey(key.kind()))?;
        let value = eval_expression(value_expr, env)?;
        entries.insert(hash_key, HashPair { key, value });
    }
    Ok(Object::Hash(Arc::new(entries)))
}

fn eval_prefix(operator: PrefixOperator, right: &Object) -> Result<Object, RuntimeError> {
    match (operator, right) {
        (PrefixOperator::Not, value) => Ok(Object::Boolean(!value.is_truthy())),
        (PrefixOperator::Negate, Object::Integer(value)) => Ok(Object::Integer(value.wrapping_neg())),
        (PrefixOperator::Negate, other) => Err(RuntimeError::UnknownPrefixOperator {
            operator,
            right: other.kind(),
        }),
    }
}

pub(crate) fn eval_infix(
    operator: InfixOperator,
    left: &Object,
    right: &Object,
) -> Result<Object, RuntimeError> {
    match (left, right) {
        (Object::Integer(a), Object::Integer(b)) => eval_integer_infix(operator, *a, *b),
        (Object::String(a), Object::String(b)) => eval_string_infix(operator, a, b),
        _ => match operator {
            InfixOperator::Equal => Ok(Object::Boolean(left == right)),
            InfixOperator::NotEqual => Ok(Object::Boolean(left != right)),
            _ if left.kind() != right.kind() => Err(RuntimeError::TypeMismatch {
                left: left.kind(),
                operator,
                right: right.kind(),
            }),
            _ => Err(RuntimeError::UnknownInfixOperator {
                left: left.kind(),
                operator,
                right: right.kind(),
            }),
        },
    }
}

// Arithmetic wraps on overflow.
fn eval_integer_infix(operator: InfixOperator, a: i64, b: i64) -> Result<Object, RuntimeError> {
    let value = match operator {
        InfixOperator::Add => Object::Integer(a.wrapping_add(b)),
        InfixOperator::Subtract => Object::Integer(a.wrapping_sub(b)),
        InfixOperator::Multiply => Object::Integer(a.wrapping_mul(b)),
        InfixOperator::Divide | InfixOperator::Modulo if b == 0 => {
            return Err(RuntimeError::DivisionByZero);
        }
        InfixOperator::Divide => Object::Integer(a.wrapping_div(b)),
        InfixOperator::Modulo => Object::Integer(a.wrapping_rem(b)),
        InfixOperator::Equal => Object::Boolean(a == b),
        InfixOperator::NotEqual => Object::Boolean(a != b),
        InfixOperator::Less => Object::Boolean(a < b),
        InfixOperator::Greater => Object::Boolean(a > b),
        InfixOperator::LessEqual => Object::Boolean(a <= b),
        InfixOperator::GreaterEqual => Object::Boolean(a >= b),
    };
    Ok(value)
}

fn eval_string_infix(operator: InfixOperator, a: &str, b: &str) -> Result<Object, RuntimeError> {
    match operator {
        InfixOperator::Add => {
            let mut joined = String::with_capacity(a.len() + b.len());
            joined.push_str(a);
            joined.push_str(b);
            Ok(Object::from(joined))
        }
        InfixOperator::Equal => Ok(Object::Boolean(a == b)),
        InfixOperator::NotEqual => Ok(Object::Boolean(a != b)),
        _ => Err(RuntimeError::UnknownInfixOperator {
            left: ObjectKind::String,
            operator,
            right: ObjectKind::String,
        }),
    }
}

fn eval_index(left: &Object, index: &Object) -> Result<Object, RuntimeError> {
    match (left, index) {
        (Object::Array(elements), Object::Integer(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| elements.get(i))
            .cloned()
            .unwrap_or(Object::Null)),
        (Object::Hash(entries), key) => {
            let hash_key = key
                .hash_key()
                .ok_or_else(|| RuntimeError::UnusableHashKey(key.kind()))?;
            Ok(entries
                .get(&hash_key)
                .map(|pair| pair.value.clone())
                .unwrap_or(Object::Null))
        }
        (other, _) => Err(RuntimeError::IndexNotSupported(other.kind())),
    }
}
