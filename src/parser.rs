use nom::{
    bytes::complete::take_till1,
    character::complete::{multispace0, multispace1},
    combinator::all_consuming,
    multi::separated_list0,
    number::complete::double,
    sequence::delimited,
    IResult,
};

use crate::rules::{BinaryRule, CountRecord, UnaryRule};

// --- Count Line Parsing ---

#[derive(Debug, Clone, PartialEq)]
pub enum LineError {
    /// The leading count field is not a finite, nonnegative number.
    InvalidCount(String),
    /// Unknown record kind or wrong number of symbols.
    Malformed,
}

fn field(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace())(input)
}

fn fields(input: &str) -> IResult<&str, Vec<&str>> {
    all_consuming(delimited(multispace0, separated_list0(multispace1, field), multispace0))(input)
}

fn parse_count(input: &str) -> Option<f64> {
    let (rest, value) = double::<_, nom::error::Error<&str>>(input).ok()?;
    (rest.is_empty() && value.is_finite() && value >= 0.0).then_some(value)
}

/// Parses `<count> <KIND> <symbols...>`. Blank lines yield `Ok(None)`.
pub fn parse_count_line(line: &str) -> Result<Option<CountRecord>, LineError> {
    let (_, parts) = fields(line).map_err(|_| LineError::Malformed)?;
    let Some((count_str, rest)) = parts.split_first() else {
        return Ok(None);
    };
    let count = parse_count(count_str).ok_or_else(|| LineError::InvalidCount(count_str.to_string()))?;

    let record = match rest {
        ["NONTERMINAL", symbol] => CountRecord::NonTerminal { symbol: symbol.to_string(), count },
        ["UNARYRULE", lhs, rhs] => CountRecord::Unary { rule: UnaryRule::new(*lhs, *rhs), count },
        ["BINARYRULE", lhs, rhs1, rhs2] => CountRecord::Binary {
            rule: BinaryRule::new(*lhs, *rhs1, *rhs2),
            count,
        },
        _ => return Err(LineError::Malformed),
    };
    Ok(Some(record))
}

/// Splits one input line into sentence tokens. No normalization happens here.
pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(String::from).collect()
}
