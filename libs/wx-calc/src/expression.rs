//! Compiled conversion formulas
//!
//! A formula is parsed once into an evalexpr operator tree and checked against a
//! narrow grammar: numeric constants, the variable `x`, arithmetic operators,
//! parentheses and the functions in [`ALLOWED_FUNCTIONS`]. Anything else
//! (assignments, comparisons, strings, other identifiers) is rejected at
//! compile time, so evaluation can only ever produce a number.

use crate::builtin_functions::{self, ALLOWED_FUNCTIONS};
use crate::error::{CalcError, Result};
use evalexpr::{
    Context, ContextWithMutableFunctions, EvalexprError, EvalexprResult, Function,
    HashMapContext, Node, Operator, Value,
};
use std::fmt;

/// Name of the single free variable.
pub const INPUT_VARIABLE: &str = "x";

/// A validated single-variable formula.
///
/// # Example
/// ```
/// use wx_calc::ConversionExpr;
///
/// let expr = ConversionExpr::compile("(x - 32) * 5 / 9").unwrap();
/// assert_eq!(expr.eval(212.0).unwrap(), 100.0);
/// ```
#[derive(Clone)]
pub struct ConversionExpr {
    source: String,
    tree: Node,
    /// Allowed functions, registered once
    functions: HashMapContext,
}

impl ConversionExpr {
    /// Parse and validate a formula.
    pub fn compile(source: &str) -> Result<Self> {
        let tree = evalexpr::build_operator_tree(source).map_err(|e| {
            CalcError::expression(format!("Failed to parse '{}': {}", source, e))
        })?;

        for node in tree.iter() {
            check_operator(source, node.operator())?;
        }

        let mut functions = HashMapContext::new();
        register_functions(&mut functions).map_err(|e| {
            CalcError::expression(format!("Failed to set up '{}': {}", source, e))
        })?;

        Ok(Self {
            source: source.to_string(),
            tree,
            functions,
        })
    }

    /// Evaluate with `x` bound to `input`.
    pub fn eval(&self, input: f64) -> Result<f64> {
        let context = BoundInput {
            functions: &self.functions,
            input: Value::Float(input),
        };

        let value = self
            .tree
            .eval_with_context(&context)
            .map_err(|e| CalcError::evaluation(&self.source, e.to_string()))?;

        match value {
            Value::Float(f) if f.is_finite() => Ok(f),
            Value::Float(f) => Err(CalcError::evaluation(
                &self.source,
                format!("non-finite result {}", f),
            )),
            Value::Int(i) => Ok(i as f64),
            other => Err(CalcError::evaluation(
                &self.source,
                format!("expected a number, got {:?}", other),
            )),
        }
    }

    /// The formula text as written.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for ConversionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConversionExpr").field(&self.source).finish()
    }
}

impl fmt::Display for ConversionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Per-call view: the bound input plus the shared function table
struct BoundInput<'a> {
    functions: &'a HashMapContext,
    input: Value,
}

impl Context for BoundInput<'_> {
    fn get_value(&self, identifier: &str) -> Option<&Value> {
        (identifier == INPUT_VARIABLE).then_some(&self.input)
    }

    fn call_function(&self, identifier: &str, argument: &Value) -> EvalexprResult<Value> {
        self.functions.call_function(identifier, argument)
    }

    fn are_builtin_functions_disabled(&self) -> bool {
        true
    }

    fn set_builtin_functions_disabled(&mut self, _disabled: bool) -> EvalexprResult<()> {
        Err(EvalexprError::ContextNotMutable)
    }
}

fn check_operator(source: &str, operator: &Operator) -> Result<()> {
    match operator {
        Operator::RootNode
        | Operator::Add
        | Operator::Sub
        | Operator::Neg
        | Operator::Mul
        | Operator::Div
        | Operator::Mod
        | Operator::Exp
        | Operator::Tuple => Ok(()),
        Operator::Const { value } => match value {
            Value::Int(_) | Value::Float(_) => Ok(()),
            other => Err(CalcError::expression(format!(
                "Non-numeric constant {:?} in '{}'",
                other, source
            ))),
        },
        Operator::VariableIdentifierRead { identifier } => {
            if identifier == INPUT_VARIABLE {
                Ok(())
            } else {
                Err(CalcError::variable(identifier.clone()))
            }
        }
        Operator::FunctionIdentifier { identifier } => {
            if ALLOWED_FUNCTIONS.contains(&identifier.as_str()) {
                Ok(())
            } else {
                Err(CalcError::function(identifier.clone()))
            }
        }
        other => Err(CalcError::expression(format!(
            "Operator {:?} not allowed in '{}'",
            other, source
        ))),
    }
}

fn to_f64(value: &Value) -> std::result::Result<f64, EvalexprError> {
    match value {
        Value::Float(f) => Ok(*f),
        Value::Int(i) => Ok(*i as f64),
        _ => Err(EvalexprError::expected_number(value.clone())),
    }
}

fn arguments(args: &Value, expected: usize) -> std::result::Result<Vec<f64>, EvalexprError> {
    let tuple = args.as_tuple()?;
    if tuple.len() != expected {
        return Err(EvalexprError::CustomMessage(format!(
            "expected {} arguments, got {}",
            expected,
            tuple.len()
        )));
    }
    tuple.iter().map(to_f64).collect()
}

fn register_functions(context: &mut HashMapContext) -> std::result::Result<(), EvalexprError> {
    // roundTo(value, decimals)
    context.set_function(
        "roundTo".to_string(),
        Function::new(|args| {
            let a = arguments(args, 2)?;
            Ok(Value::Float(builtin_functions::round_to(a[0], a[1] as i32)))
        }),
    )?;

    // round(value, decimals)
    context.set_function(
        "round".to_string(),
        Function::new(|args| {
            let a = arguments(args, 2)?;
            Ok(Value::Float(builtin_functions::round_to(a[0], a[1] as i32)))
        }),
    )?;

    context.set_function(
        "abs".to_string(),
        Function::new(|args| Ok(Value::Float(builtin_functions::abs(to_f64(args)?)))),
    )?;

    context.set_function(
        "min".to_string(),
        Function::new(|args| {
            let a = arguments(args, 2)?;
            Ok(Value::Float(builtin_functions::min(a[0], a[1])))
        }),
    )?;

    context.set_function(
        "max".to_string(),
        Function::new(|args| {
            let a = arguments(args, 2)?;
            Ok(Value::Float(builtin_functions::max(a[0], a[1])))
        }),
    )?;

    // clamp(value, min, max)
    context.set_function(
        "clamp".to_string(),
        Function::new(|args| {
            let a = arguments(args, 3)?;
            Ok(Value::Float(builtin_functions::clamp(a[0], a[1], a[2])))
        }),
    )?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn eval(source: &str, x: f64) -> f64 {
        ConversionExpr::compile(source).unwrap().eval(x).unwrap()
    }

    #[test]
    fn test_fixed_point_scaling() {
        assert_eq!(eval("x / 10", 235.0), 23.5);
        assert_eq!(eval("x / 10", 212.0), 21.2);
        assert_eq!(eval("x / 10000", 12345.0), 1.2345);
    }

    #[test]
    fn test_integer_literals_do_not_truncate() {
        // x is always bound as a float
        assert_eq!(eval("(x - 32) * 5 / 9", 212.0), 100.0);
        assert_eq!(eval("x / 4", 3.0), 0.75);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(eval("roundTo(x * 1.609344, 1)", 10.0), 16.1);
        assert_eq!(eval("roundTo((x - 32) * 5 / 9, 1)", 70.2), 21.2);
        assert_eq!(eval("roundTo(x * 126.7, 0)", 70.0), 8869.0);
    }

    #[test]
    fn test_other_functions() {
        assert_eq!(eval("abs(x)", -3.0), 3.0);
        assert_eq!(eval("min(x, 10)", 12.0), 10.0);
        assert_eq!(eval("max(x, 10)", 12.0), 12.0);
        assert_eq!(eval("clamp(x, 0, 100)", 140.0), 100.0);
        assert_eq!(eval("round(x, 2)", 1.23456), 1.23);
    }

    #[test]
    fn test_rejects_unknown_variable() {
        let err = ConversionExpr::compile("y * 2").unwrap_err();
        assert!(matches!(err, CalcError::Variable(ref v) if v == "y"));
    }

    #[test]
    fn test_rejects_unknown_function() {
        let err = ConversionExpr::compile("floor(x)").unwrap_err();
        assert!(matches!(err, CalcError::Function(ref f) if f == "floor"));
    }

    #[test]
    fn test_rejects_non_arithmetic() {
        assert!(ConversionExpr::compile("x = 3").is_err());
        assert!(ConversionExpr::compile("x > 3").is_err());
        assert!(ConversionExpr::compile("\"text\"").is_err());
    }

    #[test]
    fn test_wrong_argument_count() {
        let expr = ConversionExpr::compile("roundTo(x)").unwrap();
        assert!(expr.eval(1.0).is_err());
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        let expr = ConversionExpr::compile("1 / (x - x)").unwrap();
        assert!(expr.eval(5.0).is_err());
    }

    #[test]
    fn test_compiled_expr_evaluates_repeatedly() {
        let expr = ConversionExpr::compile("roundTo(x * 0.0295299830714, 2)").unwrap();
        assert_eq!(expr.eval(1013.25).unwrap(), 29.92);
        assert_eq!(expr.eval(1000.0).unwrap(), 29.53);

        let copy = expr.clone();
        assert_eq!(copy.eval(1013.25).unwrap(), 29.92);
    }

    #[test]
    fn test_display_keeps_source() {
        let expr = ConversionExpr::compile("x * 9 / 5 + 32").unwrap();
        assert_eq!(expr.to_string(), "x * 9 / 5 + 32");
        assert_eq!(expr.source(), "x * 9 / 5 + 32");
    }
}
