use orbiter_domain::Value;
use tracing::warn;

use crate::ast::{BinOp, Expr};
use crate::error::ExprError;
use crate::legacy;
use crate::parser::Parser;

/// Resolves the free variables a predicate can reference: `node.inputs.*`,
/// `variable.*`, `environment.name` (spec.md §4.2(b)). Missing paths resolve
/// to `Value::Null` rather than erroring, so `!= null` reads naturally as
/// "is set".
pub trait EvalContext {
    fn resolve_var(&self, path: &[String]) -> Value;
}

/// Controls whether an unparsable `when` clause is treated as always-true
/// (spec.md §9 open question; decision recorded in DESIGN.md). Binders that
/// must never silently admit a hook set this to `false` and propagate the
/// parse error instead.
#[derive(Debug, Clone, Copy)]
pub struct EvalOptions {
    pub permissive_fallback: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions { permissive_fallback: true }
    }
}

/// Evaluate a `when` clause against `ctx`, trying the HCL-style grammar
/// first, the legacy two-shape fallback second, and finally (if
/// `opts.permissive_fallback`) treating the clause as matching everything.
/// An empty clause always matches (spec.md §4.2(b): "an empty predicate
/// matches unconditionally").
pub fn evaluate_predicate(
    src: &str,
    ctx: &dyn EvalContext,
    opts: &EvalOptions,
) -> Result<bool, ExprError> {
    if src.trim().is_empty() {
        return Ok(true);
    }
    match Parser::parse(src) {
        Ok(expr) => return as_bool(&eval(&expr, ctx)?),
        Err(primary_err) => {
            if let Some(expr) = legacy::parse_legacy(src) {
                return as_bool(&eval(&expr, ctx)?);
            }
            if opts.permissive_fallback {
                warn!(predicate = src, error = %primary_err, "predicate unparsable, falling back to unconditional match");
                Ok(true)
            } else {
                Err(primary_err)
            }
        }
    }
}

fn as_bool(v: &Value) -> Result<bool, ExprError> {
    match v {
        Value::Bool(b) => Ok(*b),
        other => Err(ExprError::Type(format!("expected boolean, got {:?}", other))),
    }
}

/// Evaluate an already-parsed expression to a [`Value`].
pub fn eval(expr: &Expr, ctx: &dyn EvalContext) -> Result<Value, ExprError> {
    match expr {
        Expr::Null => Ok(Value::Null),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Int(i) => Ok(Value::Int(*i)),
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Var(path) => Ok(ctx.resolve_var(path)),
        Expr::Not(inner) => {
            let v = as_bool(&eval(inner, ctx)?)?;
            Ok(Value::Bool(!v))
        }
        Expr::BinOp(BinOp::Eq, lhs, rhs) => {
            Ok(Value::Bool(values_equal(&eval(lhs, ctx)?, &eval(rhs, ctx)?)))
        }
        Expr::BinOp(BinOp::Ne, lhs, rhs) => {
            Ok(Value::Bool(!values_equal(&eval(lhs, ctx)?, &eval(rhs, ctx)?)))
        }
        Expr::BinOp(BinOp::And, lhs, rhs) => {
            if !as_bool(&eval(lhs, ctx)?)? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(as_bool(&eval(rhs, ctx)?)?))
        }
        Expr::BinOp(BinOp::Or, lhs, rhs) => {
            if as_bool(&eval(lhs, ctx)?)? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(as_bool(&eval(rhs, ctx)?)?))
        }
        Expr::Call(name, args) => call(name, args, ctx),
    }
}

/// Null-equals-absent-or-nil: a missing path resolves to `Value::Null`
/// already, so plain structural equality gives the spec's `!= null` /
/// `== null` behavior for free.
fn values_equal(a: &Value, b: &Value) -> bool {
    a == b
}

fn call(name: &str, args: &[Expr], ctx: &dyn EvalContext) -> Result<Value, ExprError> {
    match name {
        "split" => {
            check_arity(name, args, 2)?;
            let sep = as_string(&eval(&args[0], ctx)?, name)?;
            let s = as_string(&eval(&args[1], ctx)?, name)?;
            let parts = s.split(sep.as_str()).map(Value::from).collect();
            Ok(Value::List(parts))
        }
        "element" => {
            check_arity(name, args, 2)?;
            let list = eval(&args[0], ctx)?;
            let idx = as_int(&eval(&args[1], ctx)?, name)?;
            match list {
                Value::List(items) => {
                    let idx = usize::try_from(idx).map_err(|_| ExprError::Type(format!("{} index out of range", name)))?;
                    Ok(items.get(idx).cloned().unwrap_or(Value::Null))
                }
                other => Err(ExprError::Type(format!("{} expects a list, got {:?}", name, other))),
            }
        }
        "try" => {
            check_arity(name, args, 2)?;
            match eval(&args[0], ctx) {
                Ok(v) => Ok(v),
                Err(_) => eval(&args[1], ctx),
            }
        }
        "coalesce" => {
            if args.is_empty() {
                return Err(ExprError::Arity { func: name.to_string(), expected: 1, got: 0 });
            }
            for a in args {
                let v = eval(a, ctx)?;
                if !v.is_null_or_empty() {
                    return Ok(v);
                }
            }
            Ok(Value::Null)
        }
        other => Err(ExprError::UnknownFunction(other.to_string())),
    }
}

fn check_arity(name: &str, args: &[Expr], expected: usize) -> Result<(), ExprError> {
    if args.len() != expected {
        return Err(ExprError::Arity { func: name.to_string(), expected, got: args.len() });
    }
    Ok(())
}

fn as_string(v: &Value, func: &str) -> Result<String, ExprError> {
    v.as_str()
        .map(str::to_string)
        .ok_or_else(|| ExprError::Type(format!("{} expects a string argument", func)))
}

fn as_int(v: &Value, func: &str) -> Result<i64, ExprError> {
    match v {
        Value::Int(i) => Ok(*i),
        other => Err(ExprError::Type(format!("{} expects an integer argument, got {:?}", func, other))),
    }
}
