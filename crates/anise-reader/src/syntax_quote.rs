use std::collections::HashMap;

use crate::ast::{Form, FormKind, Symbol};
use crate::error::ReaderError;
use crate::resolver::Resolver;

/// Symbols the expander quotes without namespace resolution.
const SPECIAL_FORMS: &[&str] = &[
    "def",
    "loop*",
    "recur",
    "if",
    "case*",
    "let*",
    "letfn*",
    "do",
    "fn*",
    "quote",
    "var",
    "throw",
    "try",
    "catch",
    "finally",
    "new",
    "set!",
    ".",
    "&",
];

/// One syntax-quote expansion: a template form becomes code that rebuilds
/// the quoted shape with the unquoted holes filled in. The gensym table is
/// scoped to a single `` ` `` so every `foo#` inside it names one symbol.
pub(crate) struct SyntaxQuote<'a> {
    pub gensyms: &'a mut HashMap<String, Symbol>,
    pub counter: &'a mut u64,
    pub resolver: &'a dyn Resolver,
}

impl SyntaxQuote<'_> {
    pub fn expand(&mut self, form: Form) -> Result<Form, ReaderError> {
        let meta = form.meta.clone();
        let expanded = self.expand_unmeta(form)?;
        match meta {
            None => Ok(expanded),
            Some(meta) => {
                let meta_expansion = self.expand(*meta)?;
                Ok(Form::list([
                    Form::simple_symbol("with-meta"),
                    expanded,
                    meta_expansion,
                ]))
            }
        }
    }

    fn expand_unmeta(&mut self, form: Form) -> Result<Form, ReaderError> {
        match form.kind {
            FormKind::Symbol(ref sym) => {
                let resolved = self.expand_symbol(sym)?;
                Ok(quote(Form::symbol(resolved)))
            }
            FormKind::Nil
            | FormKind::Bool(_)
            | FormKind::Int(_)
            | FormKind::BigInt(_)
            | FormKind::Float(_)
            | FormKind::Char(_)
            | FormKind::String(_)
            | FormKind::Keyword(_) => Ok(strip_meta(form)),
            FormKind::List(ref items) => {
                if let Some(inner) = unquoted(&form) {
                    return Ok(inner);
                }
                if unquote_spliced(&form).is_some() {
                    return Err(ReaderError::parse("splice not in list"));
                }
                if items.is_empty() {
                    return Ok(Form::list([Form::simple_symbol("list")]));
                }
                let elements = self.expand_elements(items.iter().cloned())?;
                Ok(seq_concat(elements))
            }
            FormKind::Vector(ref items) => {
                let elements = self.expand_elements(items.iter().cloned())?;
                Ok(apply_ctor("vector", elements))
            }
            FormKind::Set(ref items) => {
                let elements = self.expand_elements(items.iter().cloned())?;
                Ok(apply_ctor("hash-set", elements))
            }
            FormKind::Map(ref pairs) => {
                let flat = pairs
                    .iter()
                    .flat_map(|(k, v)| [k.clone(), v.clone()])
                    .collect::<Vec<_>>();
                let elements = self.expand_elements(flat)?;
                Ok(apply_ctor("hash-map", elements))
            }
            _ => Ok(quote(strip_meta(form))),
        }
    }

    fn expand_elements(
        &mut self,
        items: impl IntoIterator<Item = Form>,
    ) -> Result<Vec<Form>, ReaderError> {
        items
            .into_iter()
            .map(|item| {
                if let Some(inner) = unquoted(&item) {
                    Ok(Form::list([Form::simple_symbol("list"), inner]))
                } else if let Some(inner) = unquote_spliced(&item) {
                    Ok(inner)
                } else {
                    let expanded = self.expand(item)?;
                    Ok(Form::list([Form::simple_symbol("list"), expanded]))
                }
            })
            .collect()
    }

    fn expand_symbol(&mut self, sym: &Symbol) -> Result<Symbol, ReaderError> {
        if sym.ns.is_none() {
            if SPECIAL_FORMS.contains(&sym.name.as_str()) {
                return Ok(sym.clone());
            }
            if let Some(prefix) = sym.name.strip_suffix('#') {
                let gensym = self.gensyms.entry(sym.name.clone()).or_insert_with(|| {
                    *self.counter += 1;
                    Symbol::simple(format!("{prefix}__{}__auto__", self.counter))
                });
                return Ok(gensym.clone());
            }
            if let Some(stem) = sym.name.strip_suffix('.') {
                if !stem.is_empty() {
                    let resolved = self
                        .resolver
                        .resolve_class(&Symbol::simple(stem))
                        .unwrap_or_else(|| Symbol::simple(stem));
                    return Ok(Symbol::simple(format!("{}.", resolved.name)));
                }
            }
            if sym.name.starts_with('.') {
                return Ok(sym.clone());
            }
        }
        Ok(self.resolve(sym))
    }

    fn resolve(&self, sym: &Symbol) -> Symbol {
        match &sym.ns {
            Some(ns) => match self.resolver.resolve_alias(&Symbol::simple(ns.clone())) {
                Some(full) => Symbol::new(full.name, sym.name.clone()),
                None => sym.clone(),
            },
            None => {
                if let Some(class) = self.resolver.resolve_class(sym) {
                    return class;
                }
                if let Some(var) = self.resolver.resolve_var(sym) {
                    return var;
                }
                Symbol::new(self.resolver.current_ns().name, sym.name.clone())
            }
        }
    }
}

fn quote(form: Form) -> Form {
    Form::list([Form::simple_symbol("quote"), form])
}

fn strip_meta(mut form: Form) -> Form {
    form.meta = None;
    form
}

fn seq_concat(elements: Vec<Form>) -> Form {
    let mut concat = vec![Form::simple_symbol("concat")];
    concat.extend(elements);
    Form::list([Form::simple_symbol("seq"), Form::list(concat)])
}

fn apply_ctor(ctor: &str, elements: Vec<Form>) -> Form {
    Form::list([
        Form::simple_symbol("apply"),
        Form::simple_symbol(ctor),
        seq_concat(elements),
    ])
}

fn wrapped_by(form: &Form, word: &str) -> Option<Form> {
    let FormKind::List(items) = &form.kind else {
        return None;
    };
    if items.len() != 2 {
        return None;
    }
    match items.front().map(|head| &head.kind) {
        Some(FormKind::Symbol(sym)) if sym.ns.is_none() && sym.name == word => {
            items.get(1).cloned()
        }
        _ => None,
    }
}

fn unquoted(form: &Form) -> Option<Form> {
    wrapped_by(form, "unquote")
}

fn unquote_spliced(form: &Form) -> Option<Form> {
    wrapped_by(form, "unquote-splicing")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::NullResolver;

    fn expand_one(form: Form) -> Form {
        let mut gensyms = HashMap::new();
        let mut counter = 0;
        let mut ctx = SyntaxQuote {
            gensyms: &mut gensyms,
            counter: &mut counter,
            resolver: &NullResolver,
        };
        ctx.expand(form).unwrap()
    }

    #[test]
    fn scalars_expand_to_themselves() {
        assert_eq!(expand_one(Form::int(1)), Form::int(1));
        assert_eq!(
            expand_one(Form::keyword(Symbol::simple("k"))),
            Form::keyword(Symbol::simple("k"))
        );
    }

    #[test]
    fn special_forms_stay_unqualified() {
        let expanded = expand_one(Form::simple_symbol("if"));
        assert_eq!(
            expanded,
            Form::list([Form::simple_symbol("quote"), Form::simple_symbol("if")])
        );
    }

    #[test]
    fn bare_symbols_pick_up_the_current_namespace() {
        let expanded = expand_one(Form::simple_symbol("x"));
        assert_eq!(
            expanded,
            Form::list([
                Form::simple_symbol("quote"),
                Form::symbol(Symbol::new("user", "x")),
            ])
        );
    }

    #[test]
    fn gensyms_are_stable_within_one_template() {
        let mut gensyms = HashMap::new();
        let mut counter = 0;
        let mut ctx = SyntaxQuote {
            gensyms: &mut gensyms,
            counter: &mut counter,
            resolver: &NullResolver,
        };
        let a = ctx.expand(Form::simple_symbol("x#")).unwrap();
        let b = ctx.expand(Form::simple_symbol("x#")).unwrap();
        assert_eq!(a, b);
        let FormKind::List(items) = &a.kind else {
            panic!("expected quote wrapper, got {:?}", a);
        };
        let FormKind::Symbol(sym) = &items[1].kind else {
            panic!("expected symbol, got {:?}", items[1]);
        };
        assert!(sym.name.starts_with("x__"));
        assert!(sym.name.ends_with("__auto__"));
    }

    #[test]
    fn top_level_splice_is_rejected() {
        let splice = Form::list([Form::simple_symbol("unquote-splicing"), Form::int(1)]);
        let mut gensyms = HashMap::new();
        let mut counter = 0;
        let mut ctx = SyntaxQuote {
            gensyms: &mut gensyms,
            counter: &mut counter,
            resolver: &NullResolver,
        };
        assert!(ctx.expand(splice).is_err());
    }
}
