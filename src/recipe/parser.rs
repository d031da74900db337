//! Launch-string recipe parser using winnow.
//!
//! Parses pipeline descriptions of the familiar form:
//!
//! ```text
//! filesrc location=/path/clip.mp4 ! qtdemux ! queue ! avdec_h264 ! filesink location=/out.jpg
//! ```
//!
//! # Syntax
//!
//! - Stages are separated by `!`
//! - Properties are specified as `name=value` after the stage kind
//! - Values can be quoted strings, numbers, booleans, fractions (`1/10`),
//!   or bare identifiers
//! - Whitespace is optional around `!` and `=`
//!
//! Stage roles are derived from the kind, with a numeric suffix on repeats
//! (`queue`, `queue_2`, ...). Consecutive stages are statically linked;
//! dynamic-link rules are attached by the caller afterwards.

use crate::error::{Error, Result};
use crate::format::Fraction;
use crate::recipe::{PipelineRecipe, PropertyValue, StageSpec};
use std::collections::HashMap;
use winnow::ascii::{alpha1, digit1, multispace0};
use winnow::combinator::{alt, delimited, opt, repeat, separated};
use winnow::error::ContextError;
use winnow::token::{take_till, take_while};
use winnow::Parser;

type WResult<T> = std::result::Result<T, ContextError>;

/// A parsed stage before role assignment.
#[derive(Debug, Clone, PartialEq)]
struct ParsedStage {
    kind: String,
    properties: Vec<(String, PropertyValue)>,
}

/// Parse a launch-string description into a recipe.
///
/// # Example
///
/// ```rust
/// let recipe = stillcast::recipe::parse("probe", "filesrc ! queue ! filesink").unwrap();
/// assert_eq!(recipe.stages().len(), 3);
/// assert_eq!(recipe.links().len(), 2);
/// ```
pub fn parse(name: &str, input: &str) -> Result<PipelineRecipe> {
    let stages = chain
        .parse(input.trim())
        .map_err(|e| Error::Parse(format!("{e}")))?;

    let mut counts: HashMap<String, u32> = HashMap::new();
    let mut recipe = PipelineRecipe::new(name);
    let mut roles = Vec::with_capacity(stages.len());

    for stage in stages {
        let n = counts.entry(stage.kind.clone()).or_insert(0);
        *n += 1;
        let role = if *n == 1 {
            stage.kind.clone()
        } else {
            format!("{}_{n}", stage.kind)
        };
        let mut spec = StageSpec::new(role.as_str(), stage.kind.as_str());
        spec.properties = stage.properties;
        recipe = recipe.with_stage(spec);
        roles.push(role);
    }
    for pair in roles.windows(2) {
        recipe = recipe.with_link(pair[0].as_str(), pair[1].as_str());
    }
    recipe.validate()?;
    Ok(recipe)
}

/// Parse a complete chain of stages.
fn chain(input: &mut &str) -> WResult<Vec<ParsedStage>> {
    let stages = separated(1.., stage, link_separator).parse_next(input)?;

    // Ensure we consumed all input
    multispace0.parse_next(input)?;
    if !input.is_empty() {
        return Err(ContextError::new());
    }

    Ok(stages)
}

/// Parse a stage (kind + optional properties).
fn stage(input: &mut &str) -> WResult<ParsedStage> {
    let _ = multispace0.parse_next(input)?;
    let kind: &str = identifier.parse_next(input)?;
    let _ = multispace0.parse_next(input)?;

    let properties: Vec<(String, PropertyValue)> = repeat(0.., property).parse_next(input)?;

    Ok(ParsedStage {
        kind: kind.to_string(),
        properties,
    })
}

/// Parse the link separator `!`.
fn link_separator(input: &mut &str) -> WResult<()> {
    let _ = multispace0.parse_next(input)?;
    let _ = '!'.parse_next(input)?;
    let _ = multispace0.parse_next(input)?;
    Ok(())
}

/// Parse an identifier (stage kind or property name).
fn identifier<'a>(input: &mut &'a str) -> WResult<&'a str> {
    (
        alt((alpha1::<_, ContextError>, "_")),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_' || c == '-'),
    )
        .take()
        .parse_next(input)
}

/// Parse a property (key=value).
fn property(input: &mut &str) -> WResult<(String, PropertyValue)> {
    let _ = multispace0.parse_next(input)?;

    // Only commit once we have seen `identifier =`; backtrack otherwise so
    // the next stage kind is not swallowed.
    let checkpoint = *input;

    let key: &str = match identifier.parse_next(input) {
        Ok(k) => k,
        Err(_) => {
            *input = checkpoint;
            return Err(ContextError::new());
        }
    };

    let _ = multispace0.parse_next(input)?;

    if input.starts_with('=') {
        let _ = '='.parse_next(input)?;
    } else {
        *input = checkpoint;
        return Err(ContextError::new());
    }

    let _ = multispace0.parse_next(input)?;
    let value = property_value.parse_next(input)?;
    let _ = multispace0.parse_next(input)?;

    Ok((key.to_string(), value))
}

/// Parse a property value.
fn property_value(input: &mut &str) -> WResult<PropertyValue> {
    alt((
        quoted_string.map(PropertyValue::String),
        boolean.map(PropertyValue::Bool),
        fraction.map(PropertyValue::Fraction),
        float.map(PropertyValue::Float),
        integer.map(PropertyValue::Integer),
        bare_string.map(PropertyValue::String),
    ))
    .parse_next(input)
}

/// Parse a quoted string.
fn quoted_string(input: &mut &str) -> WResult<String> {
    alt((
        delimited('"', take_till(0.., '"'), '"'),
        delimited('\'', take_till(0.., '\''), '\''),
    ))
    .map(|s: &str| s.to_string())
    .parse_next(input)
}

/// Parse a boolean.
fn boolean(input: &mut &str) -> WResult<bool> {
    alt((
        "true".map(|_| true),
        "false".map(|_| false),
        "yes".map(|_| true),
        "no".map(|_| false),
    ))
    .parse_next(input)
}

/// Parse a fraction like `1/10`.
fn fraction(input: &mut &str) -> WResult<Fraction> {
    let num: &str = digit1.parse_next(input)?;
    let _ = '/'.parse_next(input)?;
    let den: &str = digit1.parse_next(input)?;

    let num: i32 = num.parse().map_err(|_| ContextError::new())?;
    let den: i32 = den.parse().map_err(|_| ContextError::new())?;
    Ok(Fraction::new(num, den))
}

/// Parse an integer.
fn integer(input: &mut &str) -> WResult<i64> {
    let negative = opt('-').parse_next(input)?;
    let digits: &str = digit1.parse_next(input)?;

    // Make sure this isn't a float or fraction.
    if input.starts_with('.') || input.starts_with('/') {
        return Err(ContextError::new());
    }

    let value: i64 = digits.parse().map_err(|_| ContextError::new())?;

    Ok(if negative.is_some() { -value } else { value })
}

/// Parse a float.
fn float(input: &mut &str) -> WResult<f64> {
    let negative = opt('-').parse_next(input)?;
    let int_part: &str = digit1.parse_next(input)?;
    let _ = '.'.parse_next(input)?;
    let frac_part: &str = digit1.parse_next(input)?;

    let s = format!(
        "{}{}.{}",
        if negative.is_some() { "-" } else { "" },
        int_part,
        frac_part
    );
    s.parse().map_err(|_| ContextError::new())
}

/// Parse a bare (unquoted) string value.
/// Stops at whitespace or `!`.
fn bare_string(input: &mut &str) -> WResult<String> {
    take_while(1.., |c: char| !c.is_whitespace() && c != '!' && c != '=')
        .map(|s: &str| s.to_string())
        .parse_next(input)
}
