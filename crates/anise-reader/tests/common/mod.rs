#![allow(dead_code)]

use anise_reader::{read_all, read_str, Form, Reader, ReaderError, ReaderOptions, Symbol};

pub fn read_one(source: &str) -> Form {
    read_str(source).unwrap_or_else(|e| panic!("failed to read {source:?}: {e}"))
}

pub fn read_forms(source: &str) -> Vec<Form> {
    read_all(source).unwrap_or_else(|e| panic!("failed to read {source:?}: {e}"))
}

pub fn read_err(source: &str) -> ReaderError {
    match read_all(source) {
        Ok(forms) => panic!("expected {source:?} to fail, got {forms:?}"),
        Err(err) => err,
    }
}

pub fn read_one_with(source: &str, options: ReaderOptions) -> Form {
    anise_reader::read_str_with_options(source, options)
        .unwrap_or_else(|e| panic!("failed to read {source:?}: {e}"))
}

/// Feed the chunks one by one, then EOF, and collect every completed form.
pub fn read_chunked(chunks: &[&str]) -> Vec<Form> {
    read_chunked_with(chunks, ReaderOptions::default())
}

pub fn read_chunked_with(chunks: &[&str], options: ReaderOptions) -> Vec<Form> {
    let mut reader = Reader::new_with_options(options);
    for chunk in chunks {
        reader
            .push(chunk)
            .unwrap_or_else(|e| panic!("failed to push {chunk:?}: {e}"));
    }
    reader
        .finish()
        .unwrap_or_else(|e| panic!("failed to finish {chunks:?}: {e}"));
    let mut forms = Vec::new();
    while let Some(form) = reader.next_form() {
        forms.push(form);
    }
    forms
}

pub fn sym(name: &str) -> Form {
    Form::symbol(Symbol::simple(name))
}

pub fn qsym(ns: &str, name: &str) -> Form {
    Form::symbol(Symbol::new(ns, name))
}

pub fn kw(name: &str) -> Form {
    Form::keyword(Symbol::simple(name))
}

pub fn qkw(ns: &str, name: &str) -> Form {
    Form::keyword(Symbol::new(ns, name))
}

pub fn assert_error_mentions(err: &ReaderError, fragment: &str) {
    let text = err.to_string();
    assert!(
        text.contains(fragment),
        "expected error mentioning {fragment:?}, got {text:?}"
    );
}
