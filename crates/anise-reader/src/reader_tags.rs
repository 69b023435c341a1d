use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{Form, FormKind, Symbol};
use crate::error::ReaderError;

/// Consumes the payload form of a `#tag` literal and produces its value.
pub type TagHandler = Arc<dyn Fn(Form) -> Result<Form, ReaderError> + Send + Sync>;

/// Fallback invoked for tags with no registered handler.
pub type DefaultTagHandler = Arc<dyn Fn(Symbol, Form) -> Result<Form, ReaderError> + Send + Sync>;

static INST_PAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\d{4}-\d{2}-\d{2}(?:[T ]\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:[Zz]|[-+]\d{2}:?\d{2})?)?$",
    )
    .expect("inst pattern")
});

static UUID_PAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("uuid pattern")
});

pub fn inst_tag_handler() -> TagHandler {
    Arc::new(|form: Form| -> Result<Form, ReaderError> {
        match &form.kind {
            FormKind::String(text) if INST_PAT.is_match(text) => Ok(Form::new(FormKind::Tagged {
                tag: Symbol::simple("inst"),
                value: Box::new(form),
            })),
            FormKind::String(text) => Err(ReaderError::parse(format!(
                "invalid #inst timestamp: {text:?}"
            ))),
            _ => Err(ReaderError::parse("#inst expects a string literal")),
        }
    })
}

pub fn uuid_tag_handler() -> TagHandler {
    Arc::new(|form: Form| -> Result<Form, ReaderError> {
        match &form.kind {
            FormKind::String(text) if UUID_PAT.is_match(text) => Ok(Form::new(FormKind::Tagged {
                tag: Symbol::simple("uuid"),
                value: Box::new(form),
            })),
            FormKind::String(text) => Err(ReaderError::parse(format!("invalid #uuid: {text:?}"))),
            _ => Err(ReaderError::parse("#uuid expects a string literal")),
        }
    })
}

pub fn builtin_tag_handlers() -> HashMap<String, TagHandler> {
    let mut map = HashMap::new();
    map.insert("inst".to_string(), inst_tag_handler());
    map.insert("uuid".to_string(), uuid_tag_handler());
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inst_accepts_dates_and_timestamps() {
        let handler = inst_tag_handler();
        assert!(handler(Form::string("2024-01-02")).is_ok());
        assert!(handler(Form::string("2024-01-02T03:04:05.006Z")).is_ok());
        assert!(handler(Form::string("yesterday")).is_err());
        assert!(handler(Form::int(7)).is_err());
    }

    #[test]
    fn uuid_requires_canonical_shape() {
        let handler = uuid_tag_handler();
        assert!(handler(Form::string("f81d4fae-7dec-11d0-a765-00a0c91e6bf6")).is_ok());
        assert!(handler(Form::string("f81d4fae")).is_err());
    }
}
