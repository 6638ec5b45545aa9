//! Parses a function descriptor (`"avg(#3)"`, `"lookup(#2#5)"`,
//! `"c_avg_rate_abs(#3#1)"`) into a callable function plus its raw integer
//! argument list.
//!
//! The descriptor is split on the literal `#`. Everything before the first
//! `#` names the function; any trailing `(` on that piece is stripped, so
//! both `avg(#3)` and `avg#3)` are recognized identically (an observed
//! ambiguity in the shape the descriptors are generated in upstream).
//! Everything after the first `#`, split again on further `#`s with the
//! final `)` stripped from the last piece, becomes the argument list —
//! this matches the round-trip shape `"F(#" + args.join("#") + ")"`.

use crate::error::JudgeError;
use crate::function::{Function, LookupParams, Params, RelativeFunction};
use crate::model::Operator;

/// A parsed descriptor: the raw argument list (needed by the scheduler to
/// build the graph query — `args[0]` is always the window step, `args[1]`
/// is the relative-day shift for `c_avg_rate_abs`) plus the callable
/// function it resolves to.
#[derive(Debug, Clone)]
pub struct ParsedFunc {
    pub name: String,
    pub args: Vec<i64>,
    pub variant: FunctionVariant,
}

#[derive(Debug, Clone, Copy)]
pub enum FunctionVariant {
    Windowed(Function),
    Relative(RelativeFunction),
}

impl ParsedFunc {
    pub fn is_relative(&self) -> bool {
        matches!(self.variant, FunctionVariant::Relative(_))
    }

    /// Reconstruct the canonical textual descriptor, for round-trip tests.
    pub fn to_descriptor(&self) -> String {
        format!(
            "{}(#{})",
            self.name,
            self.args
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join("#")
        )
    }
}

/// Parse a function descriptor against a comparison operator and threshold.
pub fn parse_func(desc: &str, operator: Operator, right_value: f64) -> Result<ParsedFunc, JudgeError> {
    if desc.is_empty() {
        return Err(JudgeError::MalformedFunction("empty descriptor".to_string()));
    }

    let mut pieces = desc.split('#');
    let name_piece = pieces
        .next()
        .ok_or_else(|| JudgeError::MalformedFunction(desc.to_string()))?;
    let name = name_piece.trim_end_matches('(').trim().to_string();

    let raw_args: Vec<&str> = pieces.collect();
    if raw_args.is_empty() {
        return Err(JudgeError::MalformedFunction(desc.to_string()));
    }

    let mut args = Vec::with_capacity(raw_args.len());
    let last = raw_args.len() - 1;
    for (i, raw) in raw_args.iter().enumerate() {
        let token = if i == last {
            raw.strip_suffix(')')
                .ok_or_else(|| JudgeError::MalformedFunction(desc.to_string()))?
        } else {
            raw
        };
        let n: i64 = token
            .trim()
            .parse()
            .map_err(|_| JudgeError::MalformedFunction(desc.to_string()))?;
        args.push(n);
    }

    let variant = match name.as_str() {
        "max" => FunctionVariant::Windowed(Function::Max(single_limit_params(&args, desc, operator, right_value)?)),
        "min" => FunctionVariant::Windowed(Function::Min(single_limit_params(&args, desc, operator, right_value)?)),
        "avg" => FunctionVariant::Windowed(Function::Avg(single_limit_params(&args, desc, operator, right_value)?)),
        "sum" => FunctionVariant::Windowed(Function::Sum(single_limit_params(&args, desc, operator, right_value)?)),
        "all" => FunctionVariant::Windowed(Function::All(single_limit_params(&args, desc, operator, right_value)?)),
        "diff" => FunctionVariant::Windowed(Function::Diff(single_limit_params(&args, desc, operator, right_value)?)),
        "pdiff" => FunctionVariant::Windowed(Function::PDiff(single_limit_params(&args, desc, operator, right_value)?)),
        "lookup" => {
            if args.len() < 2 {
                return Err(JudgeError::MalformedFunction(desc.to_string()));
            }
            FunctionVariant::Windowed(Function::Lookup(LookupParams {
                num: non_negative(args[0], desc)?,
                limit: non_negative(args[1], desc)?,
                operator,
                right_value,
            }))
        }
        "c_avg_rate_abs" => {
            if args.is_empty() {
                return Err(JudgeError::MalformedFunction(desc.to_string()));
            }
            FunctionVariant::Relative(RelativeFunction {
                operator,
                right_value,
            })
        }
        other => return Err(JudgeError::UnsupportedFunction(other.to_string())),
    };

    Ok(ParsedFunc { name, args, variant })
}

fn single_limit_params(
    args: &[i64],
    desc: &str,
    operator: Operator,
    right_value: f64,
) -> Result<Params, JudgeError> {
    if args.is_empty() {
        return Err(JudgeError::MalformedFunction(desc.to_string()));
    }
    Ok(Params {
        limit: non_negative(args[0], desc)?,
        operator,
        right_value,
    })
}

fn non_negative(n: i64, desc: &str) -> Result<usize, JudgeError> {
    usize::try_from(n).map_err(|_| JudgeError::MalformedFunction(desc.to_string()))
}
