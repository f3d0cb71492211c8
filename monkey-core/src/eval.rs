// monkey-core - Tree-walking evaluator for Monkey
// Copyright (c) 2025 The Monkey Authors. MIT licensed.

//! Tree-walking evaluator.
//!
//! The original execution model, kept alongside the bytecode pipeline:
//! it interprets the syntax tree directly against chained
//! [`Environment`]s instead of compiling it. Errors are in-band
//! [`Object::Error`] values that short-circuit evaluation of every
//! enclosing form; explicit `return` travels as an
//! [`Object::ReturnValue`] wrapper that blocks pass through untouched
//! and the program entry point unwraps.

use std::rc::Rc;

use im::OrdMap;
use monkey_parser::ast::{
    BlockStatement, Expression, FunctionLiteral, InfixOperator, PrefixOperator, Program, Statement,
};

use crate::builtins::{self, Builtin, new_error, wrong_arity};
use crate::environment::Environment;
use crate::object::{Function, HashPair, Object};

/// Evaluate a program. The result is the value of the last statement,
/// with any `return` wrapper unwrapped.
pub fn eval_program(program: &Program, env: &Environment) -> Object {
    let mut result = Object::Null;
    for stmt in &program.statements {
        result = eval_statement(stmt, env);
        match result {
            Object::ReturnValue(value) => return *value,
            Object::Error(_) => return result,
            _ => {}
        }
    }
    result
}

/// Apply a callable to already-evaluated arguments.
///
/// Exposed so host code (and the `map`/`reduce` built-ins) can re-enter
/// evaluation with a function value.
pub fn apply_function(func: &Object, args: &[Object]) -> Object {
    match func {
        Object::Function(function) => {
            let extended = function.env.enclosed();
            for (param, arg) in function.parameters.iter().zip(args) {
                extended.set(param.clone(), arg.clone());
            }
            unwrap_return(eval_block(&function.body, &extended))
        }
        Object::Builtin(builtin) => builtin.call(args).unwrap_or(Object::Null),
        other => Object::error(format!("not a function: {}", other.type_name())),
    }
}

fn eval_statement(stmt: &Statement, env: &Environment) -> Object {
    match stmt {
        Statement::Let { name, value } => {
            let value = eval_expression(value, env);
            if is_error(&value) {
                return value;
            }
            env.set(name.clone(), value.clone());
            value
        }
        Statement::Return(expr) => {
            let value = eval_expression(expr, env);
            if is_error(&value) {
                return value;
            }
            Object::ReturnValue(Box::new(value))
        }
        Statement::Expression(expr) => eval_expression(expr, env),
    }
}

fn eval_block(block: &BlockStatement, env: &Environment) -> Object {
    let mut result = Object::Null;
    for stmt in &block.statements {
        result = eval_statement(stmt, env);
        // Return wrappers and errors propagate without unwrapping so
        // they can cross nested blocks.
        if matches!(result, Object::ReturnValue(_) | Object::Error(_)) {
            return result;
        }
    }
    result
}

fn eval_expression(expr: &Expression, env: &Environment) -> Object {
    match expr {
        Expression::IntegerLiteral(value) => Object::Integer(*value),
        Expression::StringLiteral(value) => Object::string(value.as_str()),
        Expression::Boolean(value) => Object::Boolean(*value),
        Expression::Identifier(name) => eval_identifier(name, env),
        Expression::Prefix { operator, right } => {
            let right = eval_expression(right, env);
            if is_error(&right) {
                return right;
            }
            eval_prefix(*operator, right)
        }
        Expression::Infix {
            left,
            operator,
            right,
        } => {
            let left = eval_expression(left, env);
            if is_error(&left) {
                return left;
            }
            let right = eval_expression(right, env);
            if is_error(&right) {
                return right;
            }
            eval_infix(*operator, left, right)
        }
        Expression::If {
            condition,
            consequence,
            alternative,
        } => {
            let condition = eval_expression(condition, env);
            if is_error(&condition) {
                return condition;
            }
            if condition.is_truthy() {
                eval_block(consequence, env)
            } else if let Some(alternative) = alternative {
                eval_block(alternative, env)
            } else {
                Object::Null
            }
        }
        Expression::Function(FunctionLiteral {
            parameters, body, ..
        }) => Object::Function(Rc::new(Function {
            parameters: parameters.clone(),
            body: body.clone(),
            env: env.clone(),
        })),
        Expression::Call {
            function,
            arguments,
        } => {
            let function = eval_expression(function, env);
            if is_error(&function) {
                return function;
            }
            let args = match eval_expressions(arguments, env) {
                Ok(args) => args,
                Err(err) => return err,
            };
            apply_function(&function, &args)
        }
        Expression::ArrayLiteral(elements) => match eval_expressions(elements, env) {
            Ok(elements) => Object::array(elements),
            Err(err) => err,
        },
        Expression::HashLiteral(pairs) => eval_hash_literal(pairs, env),
        Expression::Index { left, index } => {
            let left = eval_expression(left, env);
            if is_error(&left) {
                return left;
            }
            let index = eval_expression(index, env);
            if is_error(&index) {
                return index;
            }
            eval_index(left, index)
        }
    }
}

fn eval_expressions(
    exprs: &[Expression],
    env: &Environment,
) -> Result<Vec<Object>, Object> {
    let mut results = Vec::with_capacity(exprs.len());
    for expr in exprs {
        let value = eval_expression(expr, env);
        if is_error(&value) {
            return Err(value);
        }
        results.push(value);
    }
    Ok(results)
}

fn eval_identifier(name: &str, env: &Environment) -> Object {
    if let Some(value) = env.get(name) {
        return value;
    }
    if let Some(builtin) = lookup_builtin(name) {
        return Object::Builtin(builtin);
    }
    Object::error(format!("identifier not found: {}", name))
}

/// Built-ins visible to the evaluator: the shared registry plus the two
/// re-entrant ones that only exist on this path.
fn lookup_builtin(name: &str) -> Option<&'static Builtin> {
    match name {
        "map" => Some(&MAP_BUILTIN),
        "reduce" => Some(&REDUCE_BUILTIN),
        _ => builtins::lookup(name),
    }
}

fn eval_prefix(operator: PrefixOperator, right: Object) -> Object {
    match operator {
        PrefixOperator::Bang => Object::Boolean(!right.is_truthy()),
        PrefixOperator::Minus => match right {
            Object::Integer(value) => Object::Integer(value.wrapping_neg()),
            other => Object::error(format!("unknown operator: -{}", other.type_name())),
        },
    }
}

fn eval_infix(operator: InfixOperator, left: Object, right: Object) -> Object {
    match (&left, &right) {
        (Object::Integer(a), Object::Integer(b)) => eval_integer_infix(operator, *a, *b),
        (Object::String(a), Object::String(b)) => match operator {
            InfixOperator::Plus => Object::string(format!("{}{}", a, b)),
            _ => Object::error(format!("unknown operator: STRING {} STRING", operator)),
        },
        _ => match operator {
            InfixOperator::Eq => Object::Boolean(singleton_eq(&left, &right)),
            InfixOperator::NotEq => Object::Boolean(!singleton_eq(&left, &right)),
            _ if left.type_name() != right.type_name() => Object::error(format!(
                "type mismatch: {} {} {}",
                left.type_name(),
                operator,
                right.type_name()
            )),
            _ => Object::error(format!(
                "unknown operator: {} {} {}",
                left.type_name(),
                operator,
                right.type_name()
            )),
        },
    }
}

fn eval_integer_infix(operator: InfixOperator, a: i64, b: i64) -> Object {
    match operator {
        InfixOperator::Plus => Object::Integer(a.wrapping_add(b)),
        InfixOperator::Minus => Object::Integer(a.wrapping_sub(b)),
        InfixOperator::Asterisk => Object::Integer(a.wrapping_mul(b)),
        InfixOperator::Slash => {
            if b == 0 {
                return Object::error("division by zero");
            }
            Object::Integer(a.wrapping_div(b))
        }
        InfixOperator::Lt => Object::Boolean(a < b),
        InfixOperator::Gt => Object::Boolean(a > b),
        InfixOperator::Eq => Object::Boolean(a == b),
        InfixOperator::NotEq => Object::Boolean(a != b),
    }
}

/// Equality for non-integer operands: the canonical singletons compare
/// by identity, everything else is unequal.
fn singleton_eq(left: &Object, right: &Object) -> bool {
    match (left, right) {
        (Object::Boolean(a), Object::Boolean(b)) => a == b,
        (Object::Null, Object::Null) => true,
        _ => false,
    }
}

fn eval_hash_literal(pairs: &[(Expression, Expression)], env: &Environment) -> Object {
    let mut hash = OrdMap::new();
    for (key_expr, value_expr) in pairs {
        let key = eval_expression(key_expr, env);
        if is_error(&key) {
            return key;
        }
        let Some(hash_key) = key.hash_key() else {
            return Object::error(format!("unusable as hash key: {}", key.type_name()));
        };
        let value = eval_expression(value_expr, env);
        if is_error(&value) {
            return value;
        }
        hash.insert(hash_key, HashPair { key, value });
    }
    Object::Hash(hash)
}

fn eval_index(left: Object, index: Object) -> Object {
    match (&left, &index) {
        (Object::Array(elements), Object::Integer(i)) => {
            if *i < 0 || *i as usize >= elements.len() {
                Object::Null
            } else {
                elements[*i as usize].clone()
            }
        }
        (Object::Hash(pairs), _) => {
            let Some(hash_key) = index.hash_key() else {
                return Object::error(format!("unusable as hash key: {}", index.type_name()));
            };
            pairs
                .get(&hash_key)
                .map(|pair| pair.value.clone())
                .unwrap_or(Object::Null)
        }
        _ => Object::error(format!(
            "index operator not supported: {}",
            left.type_name()
        )),
    }
}

fn unwrap_return(obj: Object) -> Object {
    match obj {
        Object::ReturnValue(value) => *value,
        other => other,
    }
}

fn is_error(obj: &Object) -> bool {
    matches!(obj, Object::Error(_))
}

// =============================================================================
// Evaluator-only built-ins
//
// `map` and `reduce` re-enter evaluation through `apply_function`, which
// the bytecode VM cannot do, so they are bound here and not in the
// shared registry.
// =============================================================================

static MAP_BUILTIN: Builtin = Builtin {
    name: "map",
    func: builtin_map,
};

static REDUCE_BUILTIN: Builtin = Builtin {
    name: "reduce",
    func: builtin_reduce,
};

/// `map(a, f)` - a new array of `f(element)` for each element.
fn builtin_map(args: &[Object]) -> Option<Object> {
    if args.len() != 2 {
        return wrong_arity(args.len(), 2);
    }
    let Object::Array(elements) = &args[0] else {
        return new_error(format!(
            "argument to `map` must be ARRAY, got {}",
            args[0].type_name()
        ));
    };
    if !matches!(args[1], Object::Function(_) | Object::Builtin(_)) {
        return new_error(format!(
            "second argument to `map` must be FUNCTION, got {}",
            args[1].type_name()
        ));
    }

    let mut mapped = Vec::with_capacity(elements.len());
    for element in elements {
        let result = apply_function(&args[1], &[element.clone()]);
        if is_error(&result) {
            return Some(result);
        }
        mapped.push(result);
    }
    Some(Object::array(mapped))
}

/// `reduce(a, initial, f)` - fold the array with `f(accumulator, element)`,
/// starting from `initial`. The accumulator may be any value kind.
fn builtin_reduce(args: &[Object]) -> Option<Object> {
    if args.len() != 3 {
        return wrong_arity(args.len(), 3);
    }
    let Object::Array(elements) = &args[0] else {
        return new_error(format!(
            "first argument to `reduce` must be ARRAY, got {}",
            args[0].type_name()
        ));
    };
    if !matches!(args[2], Object::Function(_) | Object::Builtin(_)) {
        return new_error(format!(
            "third argument to `reduce` must be FUNCTION, got {}",
            args[2].type_name()
        ));
    }

    let mut accumulator = args[1].clone();
    for element in elements {
        accumulator = apply_function(&args[2], &[accumulator, element.clone()]);
        if is_error(&accumulator) {
            return Some(accumulator);
        }
    }
    Some(accumulator)
}
