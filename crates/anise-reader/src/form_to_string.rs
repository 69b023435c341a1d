use std::fmt;

use crate::ast::{Form, FormKind};

/// Render a form back to readable syntax. Reading the result yields a
/// structurally equal form (regexes compare by pattern text).
pub fn form_to_string(form: &Form) -> String {
    form.to_string()
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(meta) = &self.meta {
            write!(f, "^{} ", meta)?;
        }
        write!(f, "{}", self.kind)
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormKind::Nil => write!(f, "nil"),
            FormKind::Bool(b) => write!(f, "{b}"),
            FormKind::Int(n) => write!(f, "{n}"),
            FormKind::BigInt(n) => write!(f, "{n}N"),
            FormKind::Float(value) => write_float(f, *value),
            FormKind::Char(c) => write_char(f, *c),
            FormKind::String(s) => write_string(f, s),
            FormKind::Regex(re) => write!(f, "#\"{}\"", re.as_str()),
            FormKind::Symbol(sym) => write!(f, "{sym}"),
            FormKind::Keyword(sym) => write!(f, ":{sym}"),
            FormKind::List(items) => write_seq(f, "(", items.iter(), ")"),
            FormKind::Vector(items) => write_seq(f, "[", items.iter(), "]"),
            FormKind::Set(items) => write_seq(f, "#{", items.iter(), "}"),
            FormKind::Map(pairs) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in pairs.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{key} {value}")?;
                }
                write!(f, "}}")
            }
            FormKind::Tagged { tag, value } => write!(f, "#{tag} {value}"),
        }
    }
}

fn write_seq<'a>(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    items: impl Iterator<Item = &'a Form>,
    close: &str,
) -> fmt::Result {
    write!(f, "{open}")?;
    for (idx, item) in items.enumerate() {
        if idx > 0 {
            write!(f, " ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "{close}")
}

fn write_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        return write!(f, "##NaN");
    }
    if value.is_infinite() {
        return write!(
            f,
            "{}",
            if value > 0.0 { "##Inf" } else { "##-Inf" }
        );
    }
    if value.fract() == 0.0 {
        write!(f, "{value:.1}")
    } else {
        write!(f, "{value}")
    }
}

fn write_char(f: &mut fmt::Formatter<'_>, c: char) -> fmt::Result {
    match c {
        '\n' => write!(f, "\\newline"),
        ' ' => write!(f, "\\space"),
        '\t' => write!(f, "\\tab"),
        '\u{8}' => write!(f, "\\backspace"),
        '\u{c}' => write!(f, "\\formfeed"),
        '\r' => write!(f, "\\return"),
        c if (c as u32) < 0x20 => write!(f, "\\u{:04x}", c as u32),
        c => write!(f, "\\{c}"),
    }
}

fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in s.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\r' => write!(f, "\\r")?,
            '\t' => write!(f, "\\t")?,
            '\u{8}' => write!(f, "\\b")?,
            '\u{c}' => write!(f, "\\f")?,
            c if (c as u32) < 0x20 => write!(f, "\\u{:04x}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    write!(f, "\"")
}
