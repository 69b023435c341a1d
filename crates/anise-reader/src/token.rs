use num_bigint::BigInt;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{Form, FormKind, Symbol};
use crate::error::ReaderError;
use crate::resolver::Resolver;

/// Whitespace for the reader includes commas.
pub fn is_ws(ch: char) -> bool {
    ch.is_whitespace() || ch == ','
}

/// A terminating character ends the current token. `'`, `%` and `#` are
/// deliberately absent: they are ordinary token constituents.
pub fn is_terminating(ch: char) -> bool {
    is_ws(ch)
        || matches!(
            ch,
            ';' | '"' | '~' | '^' | '@' | '`' | '\\' | '(' | ')' | '[' | ']' | '{' | '}'
        )
}

static INT_PAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([-+]?)(?:0[xX]([0-9A-Fa-f]+)|0([0-7]+)|([1-9][0-9]?)[rR]([0-9a-zA-Z]+)|(0)|([1-9][0-9]*)|0[0-9]+)(N)?$",
    )
    .expect("integer pattern")
});

static FLOAT_PAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([-+]?[0-9]+(?:\.[0-9]*)?(?:[eE][-+]?[0-9]+)?)(M)?$").expect("float pattern")
});

static SYMBOL_PAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(:{1,2})?(?:([^0-9/:][^/]*)/)?(/|[^0-9/][^/]*)$").expect("symbol pattern")
});

/// Turn a finished token into a value. Literals first, then numbers for
/// digit-leading tokens, then the symbol/keyword grammar.
pub fn interpret_token(token: &str, resolver: &dyn Resolver) -> Result<Form, ReaderError> {
    match token {
        "nil" => return Ok(Form::nil()),
        "true" => return Ok(Form::bool(true)),
        "false" => return Ok(Form::bool(false)),
        _ => {}
    }
    let mut chars = token.chars();
    let first = chars
        .next()
        .ok_or_else(|| ReaderError::parse("Invalid token: (empty)"))?;
    let second = chars.next();
    let numeric = first.is_ascii_digit()
        || (matches!(first, '+' | '-') && second.is_some_and(|ch| ch.is_ascii_digit()));
    if numeric {
        return match_number(token).map(Form::new);
    }
    match_symbol(token, resolver)
}

/// Number grammar shared by the token interpreter. Integer alternatives are
/// tried before the float pattern; a leading-zero run of decimal digits is a
/// rejected octal, not a decimal.
pub fn match_number(token: &str) -> Result<FormKind, ReaderError> {
    if let Some(caps) = INT_PAT.captures(token) {
        return match_integer(token, &caps);
    }
    if let Some(caps) = FLOAT_PAT.captures(token) {
        if caps.get(2).is_some() {
            return Err(ReaderError::parse(format!(
                "BigDecimal is not supported yet: {token}"
            )));
        }
        let text = &caps[1];
        let value = text
            .parse::<f64>()
            .map_err(|_| ReaderError::parse(format!("Invalid number: {token}")))?;
        return Ok(FormKind::Float(value));
    }
    Err(ReaderError::parse(format!("Invalid number: {token}")))
}

fn match_integer(token: &str, caps: &regex::Captures<'_>) -> Result<FormKind, ReaderError> {
    let negate = caps.get(1).is_some_and(|m| m.as_str() == "-");
    let big = caps.get(8).is_some();
    let (digits, radix) = if let Some(m) = caps.get(2) {
        (m.as_str(), 16)
    } else if let Some(m) = caps.get(3) {
        (m.as_str(), 8)
    } else if let Some(m) = caps.get(5) {
        let radix = caps[4]
            .parse::<u32>()
            .map_err(|_| ReaderError::parse(format!("Invalid number: {token}")))?;
        (m.as_str(), radix)
    } else if caps.get(6).is_some() {
        ("0", 10)
    } else if let Some(m) = caps.get(7) {
        (m.as_str(), 10)
    } else {
        // the 0[0-9]+ alternative: octal digits out of range
        return Err(ReaderError::parse(format!("Invalid number: {token}")));
    };
    if !(2..=36).contains(&radix) {
        return Err(ReaderError::parse(format!("Invalid number: {token}")));
    }
    if big {
        let value = parse_bigint(digits, radix, negate)
            .ok_or_else(|| ReaderError::parse(format!("Invalid number: {token}")))?;
        return Ok(FormKind::BigInt(value));
    }
    match i64::from_str_radix(digits, radix) {
        Ok(n) => Ok(FormKind::Int(if negate { -n } else { n })),
        // magnitude overflow promotes; any leftover digit error is caught by
        // the bigint parser rejecting digits outside the radix
        Err(_) => parse_bigint(digits, radix, negate)
            .map(FormKind::BigInt)
            .ok_or_else(|| ReaderError::parse(format!("Invalid number: {token}"))),
    }
}

fn parse_bigint(digits: &str, radix: u32, negate: bool) -> Option<BigInt> {
    let value = BigInt::parse_bytes(digits.as_bytes(), radix)?;
    Some(if negate { -value } else { value })
}

fn match_symbol(token: &str, resolver: &dyn Resolver) -> Result<Form, ReaderError> {
    let invalid = || ReaderError::parse(format!("Invalid token: {token}"));
    let caps = SYMBOL_PAT.captures(token).ok_or_else(invalid)?;
    let colons = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    let ns = caps.get(2).map(|m| m.as_str());
    let name = &caps[3];
    if name.ends_with(':') || ns.is_some_and(|ns| ns.ends_with(':')) {
        return Err(invalid());
    }
    let tail = token
        .char_indices()
        .nth(1)
        .map(|(idx, _)| &token[idx..])
        .unwrap_or("");
    if tail.contains("::") {
        return Err(invalid());
    }
    match colons {
        "" => Ok(Form::symbol(to_symbol(ns, name))),
        ":" => Ok(Form::keyword(to_symbol(ns, name))),
        _ => {
            // auto-resolving keyword
            let ns = match ns {
                Some(alias) => resolver
                    .resolve_alias(&Symbol::simple(alias))
                    .ok_or_else(invalid)?
                    .name,
                None => resolver.current_ns().name,
            };
            Ok(Form::keyword(Symbol::new(ns, name)))
        }
    }
}

fn to_symbol(ns: Option<&str>, name: &str) -> Symbol {
    match ns {
        Some(ns) => Symbol::new(ns, name),
        None => Symbol::simple(name),
    }
}

/// A `%`-token inside a fn literal. `%` is slot 1, `%&` the rest arg,
/// `%N` slot N.
pub enum ArgLiteral {
    Slot(u32),
    Rest,
}

pub fn parse_arg_literal(token: &str) -> Option<ArgLiteral> {
    let rest = token.strip_prefix('%')?;
    match rest {
        "" => Some(ArgLiteral::Slot(1)),
        "&" => Some(ArgLiteral::Rest),
        _ => {
            let n = rest.parse::<u32>().ok()?;
            if n == 0 {
                None
            } else {
                Some(ArgLiteral::Slot(n))
            }
        }
    }
}
