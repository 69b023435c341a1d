//! Reader for the anise syntactic data language: text in, trees of
//! structured values out.
//!
//! Two entry styles. [`read_str`] and [`read_all`] parse a complete string.
//! [`Reader`] is the incremental surface: feed chunks as they arrive with
//! [`Reader::push`], signal end of input with [`Reader::finish`], and pop
//! completed forms with [`Reader::next_form`]. A form split across chunk
//! boundaries completes on the later chunk; nesting depth lives on an
//! explicit parse stack, never on the host call stack.

pub mod ast;
pub mod error;
pub mod form_to_string;
pub mod reader;
pub mod reader_tags;
pub mod resolver;
pub mod string_escape;
mod syntax_quote;
pub mod token;

pub use ast::{Form, FormKind, Symbol};
pub use error::ReaderError;
pub use reader::{Reader, ReaderOptions};
pub use reader_tags::{DefaultTagHandler, TagHandler};
pub use resolver::{MapResolver, NullResolver, Resolver};

/// Read the first form of `source`. Characters after the first complete form
/// are left unread; an input with no forms is an EOF error.
pub fn read_str(source: &str) -> Result<Form, ReaderError> {
    read_str_with_options(source, ReaderOptions::default())
}

pub fn read_str_with_options(
    source: &str,
    options: ReaderOptions,
) -> Result<Form, ReaderError> {
    let mut reader = Reader::new_with_options(options);
    reader.drive(source, true)?;
    if let Some(form) = reader.next_form() {
        return Ok(form);
    }
    reader.finish()?;
    reader
        .next_form()
        .ok_or_else(|| ReaderError::eof("input"))
}

/// Read every form in `source`.
pub fn read_all(source: &str) -> Result<Vec<Form>, ReaderError> {
    read_all_with_options(source, ReaderOptions::default())
}

pub fn read_all_with_options(
    source: &str,
    options: ReaderOptions,
) -> Result<Vec<Form>, ReaderError> {
    let mut reader = Reader::new_with_options(options);
    reader.push(source)?;
    reader.finish()?;
    let mut forms = Vec::new();
    while let Some(form) = reader.next_form() {
        forms.push(form);
    }
    Ok(forms)
}
