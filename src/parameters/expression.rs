//! Algebraic expressions for constrained parameters
//!
//! A constrained parameter stores an [`Expression`] instead of a value. The
//! expression is parsed once, when the constraint is installed, and evaluated
//! against the current values of the parameters its variables are bound to.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace0},
    combinator::recognize,
    multi::many0,
    number::complete::double,
    sequence::pair,
    IResult, Parser,
};
use std::collections::HashMap;
use thiserror::Error;

/// Error that can occur during expression parsing or evaluation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Failed to parse expression: {message}")]
    ParseError { message: String },

    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("Undefined function: {name}")]
    UndefinedFunction { name: String },
}

type ExprResult<T> = Result<T, ExpressionError>;

/// Expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(f64),
    Variable(String),
    Neg(Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Function(String, Vec<Expression>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    fn apply(self, lhs: f64, rhs: f64) -> ExprResult<f64> {
        match self {
            BinaryOp::Add => Ok(lhs + rhs),
            BinaryOp::Sub => Ok(lhs - rhs),
            BinaryOp::Mul => Ok(lhs * rhs),
            BinaryOp::Div if rhs == 0.0 => Err(ExpressionError::DivisionByZero),
            BinaryOp::Div => Ok(lhs / rhs),
            BinaryOp::Pow => Ok(lhs.powf(rhs)),
        }
    }
}

/// Source of variable values during evaluation
pub trait EvaluationContext {
    fn get_variable(&self, name: &str) -> ExprResult<f64>;
}

impl EvaluationContext for HashMap<String, f64> {
    fn get_variable(&self, name: &str) -> ExprResult<f64> {
        self.get(name)
            .copied()
            .ok_or_else(|| ExpressionError::UndefinedVariable {
                name: name.to_string(),
            })
    }
}

fn unary_function(name: &str) -> Option<fn(f64) -> f64> {
    let f: fn(f64) -> f64 = match name {
        "sin" => f64::sin,
        "cos" => f64::cos,
        "tan" => f64::tan,
        "exp" => f64::exp,
        "log" | "ln" => f64::ln,
        "log10" => f64::log10,
        "sqrt" => f64::sqrt,
        "abs" => f64::abs,
        _ => return None,
    };
    Some(f)
}

impl Expression {
    /// Parse an expression from a string
    ///
    /// # Examples
    ///
    /// ```
    /// use layerfit_rs::parameters::expression::Expression;
    /// use std::collections::HashMap;
    ///
    /// let expr = Expression::parse("2 * rough + 1").unwrap();
    /// let mut values = HashMap::new();
    /// values.insert("rough".to_string(), 3.0);
    /// assert_eq!(expr.evaluate(&values).unwrap(), 7.0);
    /// ```
    pub fn parse(input: &str) -> ExprResult<Self> {
        match expr_parser(input) {
            Ok((remainder, expr)) if remainder.trim().is_empty() => Ok(expr),
            Ok((remainder, _)) => Err(ExpressionError::ParseError {
                message: format!("Unexpected trailing characters: '{}'", remainder),
            }),
            Err(e) => Err(ExpressionError::ParseError {
                message: format!("{:?}", e),
            }),
        }
    }

    /// Evaluate the expression with the given context
    pub fn evaluate<C: EvaluationContext + ?Sized>(&self, context: &C) -> ExprResult<f64> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Variable(name) => context.get_variable(name),
            Self::Neg(expr) => Ok(-expr.evaluate(context)?),
            Self::Binary(op, left, right) => {
                let lhs = left.evaluate(context)?;
                let rhs = right.evaluate(context)?;
                op.apply(lhs, rhs)
            }
            Self::Function(name, args) => {
                let values = args
                    .iter()
                    .map(|arg| arg.evaluate(context))
                    .collect::<ExprResult<Vec<f64>>>()?;

                if let Some(f) = unary_function(name) {
                    if values.len() != 1 {
                        return Err(ExpressionError::InvalidOperation {
                            message: format!("{}() requires 1 argument, got {}", name, values.len()),
                        });
                    }
                    return Ok(f(values[0]));
                }

                match name.as_str() {
                    "min" | "max" if values.len() < 2 => Err(ExpressionError::InvalidOperation {
                        message: format!(
                            "{}() requires at least 2 arguments, got {}",
                            name,
                            values.len()
                        ),
                    }),
                    "min" => Ok(values.iter().fold(f64::INFINITY, |a, &b| a.min(b))),
                    "max" => Ok(values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b))),
                    _ => Err(ExpressionError::UndefinedFunction { name: name.clone() }),
                }
            }
        }
    }

    /// Sorted, deduplicated names of the variables used in the expression
    pub fn variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort();
        vars.dedup();
        vars
    }

    fn collect_variables(&self, vars: &mut Vec<String>) {
        match self {
            Self::Number(_) => {}
            Self::Variable(name) => vars.push(name.clone()),
            Self::Neg(expr) => expr.collect_variables(vars),
            Self::Binary(_, left, right) => {
                left.collect_variables(vars);
                right.collect_variables(vars);
            }
            Self::Function(_, args) => args.iter().for_each(|arg| arg.collect_variables(vars)),
        }
    }
}

// Parser functions using nom

fn ws(input: &str) -> IResult<&str, &str> {
    multispace0(input)
}

fn symbol(input: &str, c: char) -> IResult<&str, char> {
    let (input, _) = ws(input)?;
    char(c).parse(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)
}

fn number(input: &str) -> IResult<&str, Expression> {
    let (input, value) = double::<&str, nom::error::Error<&str>>(input)?;
    Ok((input, Expression::Number(value)))
}

/// Variable or function call; identifiers are tried before numbers so that
/// names such as `inf_rough` are never read as floating point literals.
fn name_or_call(input: &str) -> IResult<&str, Expression> {
    let (input, name) = identifier(input)?;
    let Ok((mut input, _)) = symbol(input, '(') else {
        return Ok((input, Expression::Variable(name.to_string())));
    };

    let mut args = Vec::new();
    if let Ok((rest, _)) = symbol(input, ')') {
        return Ok((rest, Expression::Function(name.to_string(), args)));
    }
    loop {
        let (rest, arg) = expr_parser(input)?;
        args.push(arg);
        if let Ok((rest, _)) = symbol(rest, ',') {
            input = rest;
            continue;
        }
        let (rest, _) = symbol(rest, ')')?;
        return Ok((rest, Expression::Function(name.to_string(), args)));
    }
}

fn primary(input: &str) -> IResult<&str, Expression> {
    let (input, _) = ws(input)?;
    if let Ok((rest, _)) = symbol(input, '(') {
        let (rest, expr) = expr_parser(rest)?;
        let (rest, _) = symbol(rest, ')')?;
        return Ok((rest, expr));
    }
    if let Ok(result) = name_or_call(input) {
        return Ok(result);
    }
    number(input)
}

/// Unary minus binds looser than `^`, so `-x^2` is `-(x^2)`.
fn unary(input: &str) -> IResult<&str, Expression> {
    match symbol(input, '-') {
        Ok((rest, _)) => {
            let (rest, expr) = unary(rest)?;
            Ok((rest, Expression::Neg(Box::new(expr))))
        }
        Err(_) => power(input),
    }
}

/// Right-associative exponentiation.
fn power(input: &str) -> IResult<&str, Expression> {
    let (input, base) = primary(input)?;
    match symbol(input, '^') {
        Ok((rest, _)) => {
            let (rest, exponent) = unary(rest)?;
            Ok((
                rest,
                Expression::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)),
            ))
        }
        Err(_) => Ok((input, base)),
    }
}

/// Left fold of `operand (op operand)*`.
fn left_assoc<'a>(
    input: &'a str,
    operand: fn(&'a str) -> IResult<&'a str, Expression>,
    ops: &[(char, BinaryOp)],
) -> IResult<&'a str, Expression> {
    let (mut input, mut acc) = operand(input)?;
    'outer: loop {
        for &(c, op) in ops {
            if let Ok((rest, _)) = symbol(input, c) {
                let (rest, rhs) = operand(rest)?;
                acc = Expression::Binary(op, Box::new(acc), Box::new(rhs));
                input = rest;
                continue 'outer;
            }
        }
        return Ok((input, acc));
    }
}

fn term(input: &str) -> IResult<&str, Expression> {
    left_assoc(input, unary, &[('*', BinaryOp::Mul), ('/', BinaryOp::Div)])
}

fn expr_parser(input: &str) -> IResult<&str, Expression> {
    left_assoc(input, term, &[('+', BinaryOp::Add), ('-', BinaryOp::Sub)])
}
