#[path = "common/mod.rs"]
mod common;

use std::sync::Arc;

use anise_reader::{Form, FormKind, MapResolver, ReaderOptions};
use common::{kw, qsym, read_one, read_one_with, sym};

fn quoted(form: Form) -> Form {
    Form::list([sym("quote"), form])
}

fn listed(form: Form) -> Form {
    Form::list([sym("list"), form])
}

fn seq_concat(elements: impl IntoIterator<Item = Form>) -> Form {
    let mut concat = vec![sym("concat")];
    concat.extend(elements);
    Form::list([sym("seq"), Form::list(concat)])
}

fn apply_ctor(ctor: &str, elements: impl IntoIterator<Item = Form>) -> Form {
    Form::list([sym("apply"), sym(ctor), seq_concat(elements)])
}

#[test]
fn scalars_pass_through() {
    assert_eq!(read_one("`1"), Form::int(1));
    assert_eq!(read_one("`:k"), kw("k"));
    assert_eq!(read_one("`\"s\""), Form::string("s"));
}

#[test]
fn bare_symbols_qualify_with_the_current_namespace() {
    assert_eq!(read_one("`a"), quoted(qsym("user", "a")));
}

#[test]
fn special_form_symbols_stay_bare() {
    assert_eq!(read_one("`if"), quoted(sym("if")));
    assert_eq!(read_one("`fn*"), quoted(sym("fn*")));
    assert_eq!(read_one("`def"), quoted(sym("def")));
}

#[test]
fn dot_prefixed_symbols_stay_bare() {
    assert_eq!(read_one("`.method"), quoted(sym(".method")));
}

#[test]
fn unquote_leaves_the_hole_open() {
    assert_eq!(read_one("`~b"), sym("b"));
    assert_eq!(read_one("`~(f 1)"), Form::list([sym("f"), Form::int(1)]));
}

#[test]
fn template_list_matches_the_expansion_shape() {
    // `(a ~b ~@c) => (seq (concat (list (quote user/a)) (list b) c))
    assert_eq!(
        read_one("`(a ~b ~@c)"),
        seq_concat([
            listed(quoted(qsym("user", "a"))),
            listed(sym("b")),
            sym("c"),
        ])
    );
}

#[test]
fn vectors_sets_and_maps_expand_through_their_constructors() {
    assert_eq!(
        read_one("`[1 ~@xs]"),
        apply_ctor("vector", [listed(Form::int(1)), sym("xs")])
    );
    assert_eq!(
        read_one("`#{1}"),
        apply_ctor("hash-set", [listed(Form::int(1))])
    );
    assert_eq!(
        read_one("`{:k ~v}"),
        apply_ctor("hash-map", [listed(kw("k")), listed(sym("v"))])
    );
}

#[test]
fn empty_list_expands_to_list_call() {
    assert_eq!(read_one("`()"), Form::list([sym("list")]));
}

#[test]
fn nested_collections_expand_recursively() {
    assert_eq!(
        read_one("`(f [~x])"),
        seq_concat([
            listed(quoted(qsym("user", "f"))),
            listed(apply_ctor("vector", [listed(sym("x"))])),
        ])
    );
}

#[test]
fn gensym_literals_are_stable_within_one_template() {
    let form = read_one("`(x# x#)");
    let FormKind::List(items) = &form.kind else {
        panic!("expected expansion list, got {form:?}");
    };
    let FormKind::List(concat) = &items[1].kind else {
        panic!("expected concat call, got {:?}", items[1]);
    };
    assert_eq!(concat[1], concat[2]);
    let FormKind::List(wrapped) = &concat[1].kind else {
        panic!("expected (list (quote g)), got {:?}", concat[1]);
    };
    let FormKind::List(quote_call) = &wrapped[1].kind else {
        panic!("expected quote call, got {:?}", wrapped[1]);
    };
    let FormKind::Symbol(gensym) = &quote_call[1].kind else {
        panic!("expected gensym symbol, got {:?}", quote_call[1]);
    };
    assert!(gensym.name.starts_with("x__"));
    assert!(gensym.name.ends_with("__auto__"));
}

#[test]
fn gensym_literals_differ_between_templates() {
    let first = read_one("`x#");
    let second = read_one("`x#");
    // fresh readers restart the counter; the names still differ from the raw token
    assert_eq!(first, second);
    let combined = read_one("[`x# `x#]");
    let FormKind::Vector(items) = &combined.kind else {
        panic!("expected vector, got {combined:?}");
    };
    assert_ne!(items[0], items[1]);
}

#[test]
fn qualified_symbols_resolve_aliases() {
    let resolver = MapResolver::new("app.core").with_alias("str", "app.strings");
    let options = ReaderOptions::default().with_resolver(Arc::new(resolver));
    assert_eq!(
        read_one_with("`str/trim", options.clone()),
        quoted(qsym("app.strings", "trim"))
    );
    assert_eq!(
        read_one_with("`other/name", options),
        quoted(qsym("other", "name"))
    );
}

#[test]
fn unqualified_symbols_try_classes_then_vars() {
    let resolver = MapResolver::new("app.core")
        .with_class("Widget", "gui.Widget")
        .with_var("helper", "app.util");
    let options = ReaderOptions::default().with_resolver(Arc::new(resolver));
    assert_eq!(
        read_one_with("`Widget", options.clone()),
        quoted(sym("gui.Widget"))
    );
    assert_eq!(
        read_one_with("`helper", options.clone()),
        quoted(qsym("app.util", "helper"))
    );
    assert_eq!(
        read_one_with("`unknown", options),
        quoted(qsym("app.core", "unknown"))
    );
}

#[test]
fn class_dot_symbols_resolve_the_stem() {
    let resolver = MapResolver::new("app.core").with_class("Widget", "gui.Widget");
    let options = ReaderOptions::default().with_resolver(Arc::new(resolver));
    assert_eq!(
        read_one_with("`Widget.", options),
        quoted(sym("gui.Widget."))
    );
    assert_eq!(read_one("`Other."), quoted(sym("Other.")));
}

#[test]
fn metadata_expands_through_with_meta() {
    let form = read_one("`^:m [1]");
    let FormKind::List(items) = &form.kind else {
        panic!("expected with-meta call, got {form:?}");
    };
    assert_eq!(items[0], sym("with-meta"));
    assert_eq!(items[1], apply_ctor("vector", [listed(Form::int(1))]));
    assert_eq!(
        items[2],
        apply_ctor("hash-map", [listed(kw("m")), listed(Form::bool(true))])
    );
}

#[test]
fn unquote_outside_syntax_quote_reads_as_data() {
    assert_eq!(
        read_one("~x"),
        Form::list([sym("unquote"), sym("x")])
    );
}

#[test]
fn nested_fn_literal_uses_its_own_args() {
    // % inside a syntax-quoted fn literal still resolves against the fn frame
    let form = read_one("`#(inc %)");
    let printed = form.to_string();
    assert!(printed.contains("fn*"), "expected fn* in {printed:?}");
    assert!(printed.contains("p1__"), "expected minted param in {printed:?}");
}
