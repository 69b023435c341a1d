use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::ast::{Form, FormKind, Symbol};
use crate::error::ReaderError;
use crate::reader_tags::{builtin_tag_handlers, DefaultTagHandler, TagHandler};
use crate::resolver::{NullResolver, Resolver};
use crate::string_escape::{char_from_token, unescape_string};
use crate::syntax_quote::SyntaxQuote;
use crate::token::{interpret_token, is_terminating, is_ws, parse_arg_literal, ArgLiteral};

#[derive(Clone)]
pub struct ReaderOptions {
    pub tag_handlers: HashMap<String, TagHandler>,
    pub default_tag_handler: Option<DefaultTagHandler>,
    pub resolver: Arc<dyn Resolver>,
}

impl ReaderOptions {
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_tag_handler(mut self, tag: impl Into<String>, handler: TagHandler) -> Self {
        self.tag_handlers.insert(tag.into(), handler);
        self
    }

    pub fn with_default_tag_handler(mut self, handler: DefaultTagHandler) -> Self {
        self.default_tag_handler = Some(handler);
        self
    }
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            tag_handlers: builtin_tag_handlers(),
            default_tag_handler: None,
            resolver: Arc::new(NullResolver),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CollKind {
    List,
    Vector,
    Map,
    Set,
}

impl CollKind {
    fn close(self) -> char {
        match self {
            CollKind::List => ')',
            CollKind::Vector => ']',
            CollKind::Map | CollKind::Set => '}',
        }
    }

    fn label(self) -> &'static str {
        match self {
            CollKind::List => "list",
            CollKind::Vector => "vector",
            CollKind::Map => "map",
            CollKind::Set => "set",
        }
    }
}

/// Where a finished token is delivered.
#[derive(Clone, Copy)]
enum TokenSink {
    Value,
    CharLit,
    Tag,
    SymbolicValue,
    NsMapPrefix,
}

impl TokenSink {
    fn eof_context(self) -> &'static str {
        match self {
            TokenSink::Value => "token",
            TokenSink::CharLit => "character",
            TokenSink::Tag => "tagged literal",
            TokenSink::SymbolicValue => "symbolic value",
            TokenSink::NsMapPrefix => "namespaced map",
        }
    }
}

/// One in-progress construct. The fields are exactly the partial state that
/// must survive a suspension at a chunk boundary.
enum Frame {
    Form,
    Comment,
    Token { buf: String, sink: TokenSink },
    StringLit { buf: String, escaped: bool },
    RegexLit { buf: String, escaped: bool },
    Coll { kind: CollKind, items: Vec<Form> },
    Meta { meta: Option<Form> },
    Wrap { word: &'static str },
    Unquote,
    Discard,
    Dispatch,
    Tagged { tag: Symbol },
    AnonFn { items: Vec<Form>, slots: HashMap<i64, Symbol> },
    NsMap { ns: Option<String> },
    SyntaxQuote { gensyms: HashMap<String, Symbol> },
}

enum Flow {
    Continue(usize),
    Suspend,
}

fn char_at(chunk: &str, at: usize) -> Option<char> {
    chunk[at..].chars().next()
}

fn skip_ws(chunk: &str, from: usize) -> usize {
    for (idx, ch) in chunk[from..].char_indices() {
        if !is_ws(ch) {
            return from + idx;
        }
    }
    chunk.len()
}

/// Resumable reader. Feed text with [`Reader::push`], signal end of input
/// with [`Reader::finish`], collect completed forms with
/// [`Reader::next_form`]. After any error the state is invalid and must be
/// discarded.
pub struct Reader {
    stack: Vec<Frame>,
    out: VecDeque<Form>,
    pub options: ReaderOptions,
    gensym_counter: u64,
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader {
    pub fn new() -> Self {
        Self::new_with_options(ReaderOptions::default())
    }

    pub fn new_with_options(options: ReaderOptions) -> Self {
        Self {
            stack: Vec::new(),
            out: VecDeque::new(),
            options,
            gensym_counter: 0,
        }
    }

    /// Consume a chunk of input. Forms completed inside the chunk are queued
    /// in source order; a construct split by the chunk boundary stays on the
    /// parse stack and resumes on the next call.
    pub fn push(&mut self, chunk: &str) -> Result<(), ReaderError> {
        self.drive(chunk, false)
    }

    /// End of input. Completes any token in flight; any other open construct
    /// raises the unexpected-EOF error naming it.
    pub fn finish(&mut self) -> Result<(), ReaderError> {
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Form | Frame::Comment => {}
                Frame::Token { buf, sink } => {
                    if buf.is_empty() {
                        return Err(ReaderError::eof(sink.eof_context()));
                    }
                    self.finish_token(buf, sink)?;
                }
                Frame::StringLit { .. } => return Err(ReaderError::eof("string")),
                Frame::RegexLit { .. } => return Err(ReaderError::eof("regex")),
                Frame::Coll { kind, .. } => return Err(ReaderError::eof(kind.label())),
                Frame::Meta { .. } => return Err(ReaderError::eof("metadata")),
                Frame::Wrap { word } => return Err(ReaderError::eof(word)),
                Frame::Unquote => return Err(ReaderError::eof("unquote")),
                Frame::Discard => return Err(ReaderError::eof("discarded form")),
                Frame::Dispatch => return Err(ReaderError::eof("dispatch")),
                Frame::Tagged { .. } => return Err(ReaderError::eof("tagged literal")),
                Frame::AnonFn { .. } => return Err(ReaderError::eof("function literal")),
                Frame::NsMap { .. } => return Err(ReaderError::eof("namespaced map")),
                Frame::SyntaxQuote { .. } => return Err(ReaderError::eof("syntax quote")),
            }
        }
        Ok(())
    }

    /// Pop the next completed form, in source order.
    pub fn next_form(&mut self) -> Option<Form> {
        self.out.pop_front()
    }

    /// True while a form is in progress across chunk boundaries.
    pub fn has_pending(&self) -> bool {
        !self.stack.is_empty()
    }

    pub(crate) fn drive(&mut self, chunk: &str, stop_after_form: bool) -> Result<(), ReaderError> {
        let mut from = 0;
        loop {
            if self.stack.is_empty() {
                if stop_after_form && !self.out.is_empty() {
                    return Ok(());
                }
                from = skip_ws(chunk, from);
                match char_at(chunk, from) {
                    None => return Ok(()),
                    Some(';') => self.stack.push(Frame::Comment),
                    Some(_) => self.stack.push(Frame::Form),
                }
            }
            match self.step(chunk, from)? {
                Flow::Continue(next) => from = next,
                Flow::Suspend => return Ok(()),
            }
        }
    }

    fn step(&mut self, chunk: &str, from: usize) -> Result<Flow, ReaderError> {
        let frame = self.stack.pop().expect("parse stack underflow");
        match frame {
            Frame::Form => self.step_form(chunk, from),
            Frame::Comment => self.step_comment(chunk, from),
            Frame::Token { buf, sink } => self.step_token(buf, sink, chunk, from),
            Frame::StringLit { buf, escaped } => self.step_string(buf, escaped, chunk, from),
            Frame::RegexLit { buf, escaped } => self.step_regex(buf, escaped, chunk, from),
            Frame::Coll { kind, items } => self.step_coll(kind, items, chunk, from),
            Frame::AnonFn { items, slots } => self.step_anon_fn(items, slots, chunk, from),
            Frame::Dispatch => self.step_dispatch(chunk, from),
            Frame::Unquote => self.step_unquote(chunk, from),
            Frame::NsMap { ns } => self.step_ns_map(ns, chunk, from),
            // the remaining frames wait for one child form
            frame @ (Frame::Meta { .. }
            | Frame::Wrap { .. }
            | Frame::Discard
            | Frame::Tagged { .. }
            | Frame::SyntaxQuote { .. }) => {
                self.stack.push(frame);
                self.stack.push(Frame::Form);
                Ok(Flow::Continue(from))
            }
        }
    }

    fn step_form(&mut self, chunk: &str, from: usize) -> Result<Flow, ReaderError> {
        let from = skip_ws(chunk, from);
        let Some(ch) = char_at(chunk, from) else {
            self.stack.push(Frame::Form);
            return Ok(Flow::Suspend);
        };
        let next = from + ch.len_utf8();
        match ch {
            ';' => {
                self.stack.push(Frame::Form);
                self.stack.push(Frame::Comment);
                Ok(Flow::Continue(from))
            }
            '"' => {
                self.stack.push(Frame::StringLit {
                    buf: String::new(),
                    escaped: false,
                });
                Ok(Flow::Continue(next))
            }
            '\\' => {
                self.stack.push(Frame::Token {
                    buf: String::new(),
                    sink: TokenSink::CharLit,
                });
                Ok(Flow::Continue(next))
            }
            '\'' => {
                self.stack.push(Frame::Wrap { word: "quote" });
                Ok(Flow::Continue(next))
            }
            '@' => {
                self.stack.push(Frame::Wrap { word: "deref" });
                Ok(Flow::Continue(next))
            }
            '`' => {
                self.stack.push(Frame::SyntaxQuote {
                    gensyms: HashMap::new(),
                });
                Ok(Flow::Continue(next))
            }
            '~' => {
                self.stack.push(Frame::Unquote);
                Ok(Flow::Continue(next))
            }
            '^' => {
                self.stack.push(Frame::Meta { meta: None });
                Ok(Flow::Continue(next))
            }
            '(' => {
                self.stack.push(Frame::Coll {
                    kind: CollKind::List,
                    items: Vec::new(),
                });
                Ok(Flow::Continue(next))
            }
            '[' => {
                self.stack.push(Frame::Coll {
                    kind: CollKind::Vector,
                    items: Vec::new(),
                });
                Ok(Flow::Continue(next))
            }
            '{' => {
                self.stack.push(Frame::Coll {
                    kind: CollKind::Map,
                    items: Vec::new(),
                });
                Ok(Flow::Continue(next))
            }
            ')' | ']' | '}' => Err(ReaderError::parse(format!("Unmatched delimiter: {ch}"))),
            '#' => {
                self.stack.push(Frame::Dispatch);
                Ok(Flow::Continue(next))
            }
            _ => {
                self.stack.push(Frame::Token {
                    buf: String::new(),
                    sink: TokenSink::Value,
                });
                Ok(Flow::Continue(from))
            }
        }
    }

    fn step_comment(&mut self, chunk: &str, from: usize) -> Result<Flow, ReaderError> {
        for (idx, ch) in chunk[from..].char_indices() {
            if ch == '\n' {
                return Ok(Flow::Continue(from + idx + 1));
            }
        }
        self.stack.push(Frame::Comment);
        Ok(Flow::Suspend)
    }

    fn step_token(
        &mut self,
        mut buf: String,
        sink: TokenSink,
        chunk: &str,
        mut from: usize,
    ) -> Result<Flow, ReaderError> {
        if matches!(sink, TokenSink::CharLit) && buf.is_empty() {
            // the first character after the backslash is taken verbatim,
            // terminating or not
            match char_at(chunk, from) {
                Some(ch) => {
                    buf.push(ch);
                    from += ch.len_utf8();
                }
                None => {
                    self.stack.push(Frame::Token { buf, sink });
                    return Ok(Flow::Suspend);
                }
            }
        }
        loop {
            match char_at(chunk, from) {
                None => {
                    self.stack.push(Frame::Token { buf, sink });
                    return Ok(Flow::Suspend);
                }
                Some(ch) if is_terminating(ch) => break,
                Some(ch) => {
                    buf.push(ch);
                    from += ch.len_utf8();
                }
            }
        }
        self.finish_token(buf, sink)?;
        Ok(Flow::Continue(from))
    }

    fn step_string(
        &mut self,
        mut buf: String,
        mut escaped: bool,
        chunk: &str,
        from: usize,
    ) -> Result<Flow, ReaderError> {
        for (idx, ch) in chunk[from..].char_indices() {
            if escaped {
                buf.push(ch);
                escaped = false;
                continue;
            }
            match ch {
                '\\' => {
                    buf.push(ch);
                    escaped = true;
                }
                '"' => {
                    let text = unescape_string(&buf)?;
                    self.emit(Form::string(text))?;
                    return Ok(Flow::Continue(from + idx + 1));
                }
                _ => buf.push(ch),
            }
        }
        self.stack.push(Frame::StringLit { buf, escaped });
        Ok(Flow::Suspend)
    }

    fn step_regex(
        &mut self,
        mut buf: String,
        mut escaped: bool,
        chunk: &str,
        from: usize,
    ) -> Result<Flow, ReaderError> {
        for (idx, ch) in chunk[from..].char_indices() {
            if escaped {
                buf.push(ch);
                escaped = false;
                continue;
            }
            match ch {
                '\\' => {
                    buf.push(ch);
                    escaped = true;
                }
                '"' => {
                    let pattern = regex::Regex::new(&buf)
                        .map_err(|e| ReaderError::parse(format!("Invalid regex: {e}")))?;
                    self.emit(Form::new(FormKind::Regex(pattern)))?;
                    return Ok(Flow::Continue(from + idx + 1));
                }
                _ => buf.push(ch),
            }
        }
        self.stack.push(Frame::RegexLit { buf, escaped });
        Ok(Flow::Suspend)
    }

    fn step_coll(
        &mut self,
        kind: CollKind,
        items: Vec<Form>,
        chunk: &str,
        from: usize,
    ) -> Result<Flow, ReaderError> {
        let from = skip_ws(chunk, from);
        let Some(ch) = char_at(chunk, from) else {
            self.stack.push(Frame::Coll { kind, items });
            return Ok(Flow::Suspend);
        };
        if ch == ';' {
            self.stack.push(Frame::Coll { kind, items });
            self.stack.push(Frame::Comment);
            return Ok(Flow::Continue(from));
        }
        if ch == kind.close() {
            let form = finish_coll(kind, items)?;
            self.emit(form)?;
            return Ok(Flow::Continue(from + 1));
        }
        self.stack.push(Frame::Coll { kind, items });
        self.stack.push(Frame::Form);
        Ok(Flow::Continue(from))
    }

    fn step_anon_fn(
        &mut self,
        items: Vec<Form>,
        slots: HashMap<i64, Symbol>,
        chunk: &str,
        from: usize,
    ) -> Result<Flow, ReaderError> {
        let from = skip_ws(chunk, from);
        let Some(ch) = char_at(chunk, from) else {
            self.stack.push(Frame::AnonFn { items, slots });
            return Ok(Flow::Suspend);
        };
        if ch == ';' {
            self.stack.push(Frame::AnonFn { items, slots });
            self.stack.push(Frame::Comment);
            return Ok(Flow::Continue(from));
        }
        if ch == ')' {
            let form = self.finish_anon_fn(items, slots);
            self.emit(form)?;
            return Ok(Flow::Continue(from + 1));
        }
        self.stack.push(Frame::AnonFn { items, slots });
        self.stack.push(Frame::Form);
        Ok(Flow::Continue(from))
    }

    fn step_dispatch(&mut self, chunk: &str, from: usize) -> Result<Flow, ReaderError> {
        let Some(ch) = char_at(chunk, from) else {
            self.stack.push(Frame::Dispatch);
            return Ok(Flow::Suspend);
        };
        let next = from + ch.len_utf8();
        match ch {
            '{' => {
                self.stack.push(Frame::Coll {
                    kind: CollKind::Set,
                    items: Vec::new(),
                });
                Ok(Flow::Continue(next))
            }
            '(' => {
                self.stack.push(Frame::AnonFn {
                    items: Vec::new(),
                    slots: HashMap::new(),
                });
                Ok(Flow::Continue(next))
            }
            '"' => {
                self.stack.push(Frame::RegexLit {
                    buf: String::new(),
                    escaped: false,
                });
                Ok(Flow::Continue(next))
            }
            '\'' => {
                self.stack.push(Frame::Wrap { word: "var" });
                Ok(Flow::Continue(next))
            }
            '_' => {
                self.stack.push(Frame::Discard);
                Ok(Flow::Continue(next))
            }
            '#' => {
                self.stack.push(Frame::Token {
                    buf: String::new(),
                    sink: TokenSink::SymbolicValue,
                });
                Ok(Flow::Continue(next))
            }
            ':' => {
                self.stack.push(Frame::NsMap { ns: None });
                self.stack.push(Frame::Token {
                    buf: String::new(),
                    sink: TokenSink::NsMapPrefix,
                });
                Ok(Flow::Continue(from))
            }
            '=' => Err(ReaderError::parse("read-eval is not supported: #=")),
            '?' => Err(ReaderError::parse(
                "reader conditionals are not supported: #?",
            )),
            ch if is_terminating(ch) => {
                Err(ReaderError::parse(format!("No dispatch macro for: {ch}")))
            }
            _ => {
                self.stack.push(Frame::Token {
                    buf: String::new(),
                    sink: TokenSink::Tag,
                });
                Ok(Flow::Continue(from))
            }
        }
    }

    fn step_unquote(&mut self, chunk: &str, from: usize) -> Result<Flow, ReaderError> {
        let Some(ch) = char_at(chunk, from) else {
            self.stack.push(Frame::Unquote);
            return Ok(Flow::Suspend);
        };
        if ch == '@' {
            self.stack.push(Frame::Wrap {
                word: "unquote-splicing",
            });
            Ok(Flow::Continue(from + 1))
        } else {
            self.stack.push(Frame::Wrap { word: "unquote" });
            Ok(Flow::Continue(from))
        }
    }

    fn step_ns_map(
        &mut self,
        ns: Option<String>,
        chunk: &str,
        from: usize,
    ) -> Result<Flow, ReaderError> {
        // by the time this frame steps, the prefix token has set the target
        let from = skip_ws(chunk, from);
        let Some(ch) = char_at(chunk, from) else {
            self.stack.push(Frame::NsMap { ns });
            return Ok(Flow::Suspend);
        };
        if ch != '{' {
            return Err(ReaderError::parse("Namespaced map must specify a map"));
        }
        self.stack.push(Frame::NsMap { ns });
        self.stack.push(Frame::Coll {
            kind: CollKind::Map,
            items: Vec::new(),
        });
        Ok(Flow::Continue(from + 1))
    }

    fn finish_token(&mut self, buf: String, sink: TokenSink) -> Result<(), ReaderError> {
        match sink {
            TokenSink::Value => {
                if buf.starts_with('%') {
                    if let Some(form) = self.resolve_arg_literal(&buf)? {
                        return self.emit(form);
                    }
                }
                let form = interpret_token(&buf, self.options.resolver.as_ref())?;
                self.emit(form)
            }
            TokenSink::CharLit => {
                let ch = char_from_token(&buf)?;
                self.emit(Form::char(ch))
            }
            TokenSink::Tag => {
                if buf.contains('.') {
                    return Err(ReaderError::parse(format!(
                        "Reader tag must not contain '.': {buf}"
                    )));
                }
                let form = interpret_token(&buf, self.options.resolver.as_ref())?;
                match form.kind {
                    FormKind::Symbol(tag) => {
                        self.stack.push(Frame::Tagged { tag });
                        Ok(())
                    }
                    _ => Err(ReaderError::parse(format!(
                        "Reader tag must be a symbol: {buf}"
                    ))),
                }
            }
            TokenSink::SymbolicValue => {
                let value = match buf.as_str() {
                    "Inf" => f64::INFINITY,
                    "-Inf" => f64::NEG_INFINITY,
                    "NaN" => f64::NAN,
                    _ => {
                        return Err(ReaderError::parse(format!(
                            "Unknown symbolic value: ##{buf}"
                        )))
                    }
                };
                self.emit(Form::float(value))
            }
            TokenSink::NsMapPrefix => {
                let ns = self.ns_map_target(&buf)?;
                match self.stack.last_mut() {
                    Some(Frame::NsMap { ns: slot }) => {
                        *slot = Some(ns);
                        Ok(())
                    }
                    _ => unreachable!("namespaced map prefix without its frame"),
                }
            }
        }
    }

    /// Route a completed form to the frame that was waiting for it. Runs as
    /// a loop so that arbitrarily long chains of wrapping forms cannot grow
    /// the host stack.
    fn emit(&mut self, mut form: Form) -> Result<(), ReaderError> {
        loop {
            match self.stack.pop() {
                None => {
                    self.out.push_back(form);
                    return Ok(());
                }
                Some(Frame::Coll { kind, mut items }) => {
                    items.push(form);
                    self.stack.push(Frame::Coll { kind, items });
                    return Ok(());
                }
                Some(Frame::AnonFn { mut items, slots }) => {
                    items.push(form);
                    self.stack.push(Frame::AnonFn { items, slots });
                    return Ok(());
                }
                Some(Frame::Wrap { word }) => {
                    form = Form::list([Form::simple_symbol(word), form]);
                }
                Some(Frame::Discard) => return Ok(()),
                Some(Frame::Meta { meta: None }) => {
                    let meta = meta_from_form(form)?;
                    self.stack.push(Frame::Meta { meta: Some(meta) });
                    return Ok(());
                }
                Some(Frame::Meta { meta: Some(meta) }) => {
                    form = attach_meta(form, meta)?;
                }
                Some(Frame::Tagged { tag }) => {
                    form = self.apply_tag(tag, form)?;
                }
                Some(Frame::SyntaxQuote { mut gensyms }) => {
                    let mut ctx = SyntaxQuote {
                        gensyms: &mut gensyms,
                        counter: &mut self.gensym_counter,
                        resolver: self.options.resolver.as_ref(),
                    };
                    form = ctx.expand(form)?;
                }
                Some(Frame::NsMap { ns: Some(ns) }) => {
                    form = rewrite_ns_map_keys(&ns, form);
                }
                Some(_) => unreachable!("form delivered to a frame that reads no children"),
            }
        }
    }

    fn apply_tag(&self, tag: Symbol, form: Form) -> Result<Form, ReaderError> {
        let key = tag.to_string();
        if let Some(handler) = self.options.tag_handlers.get(&key) {
            return handler(form);
        }
        if let Some(handler) = &self.options.default_tag_handler {
            return handler(tag, form);
        }
        Err(ReaderError::parse(format!(
            "No reader function for tag {key}"
        )))
    }

    fn resolve_arg_literal(&mut self, token: &str) -> Result<Option<Form>, ReaderError> {
        let Some(idx) = self
            .stack
            .iter()
            .rposition(|frame| matches!(frame, Frame::AnonFn { .. }))
        else {
            return Ok(None);
        };
        let lit = parse_arg_literal(token).ok_or_else(|| {
            ReaderError::parse(format!("arg literal must be %, %& or %integer: {token}"))
        })?;
        let key: i64 = match lit {
            ArgLiteral::Slot(n) => i64::from(n),
            ArgLiteral::Rest => -1,
        };
        let existing = match &self.stack[idx] {
            Frame::AnonFn { slots, .. } => slots.get(&key).cloned(),
            _ => unreachable!(),
        };
        let sym = match existing {
            Some(sym) => sym,
            None => {
                let prefix = if key == -1 {
                    "rest".to_string()
                } else {
                    format!("p{key}")
                };
                let sym = Symbol::simple(format!("{prefix}__{}#", self.next_gensym_id()));
                match &mut self.stack[idx] {
                    Frame::AnonFn { slots, .. } => {
                        slots.insert(key, sym.clone());
                    }
                    _ => unreachable!(),
                }
                sym
            }
        };
        Ok(Some(Form::symbol(sym)))
    }

    fn finish_anon_fn(&mut self, items: Vec<Form>, mut slots: HashMap<i64, Symbol>) -> Form {
        let max = slots.keys().copied().filter(|k| *k > 0).max().unwrap_or(0);
        let mut params = Vec::new();
        for n in 1..=max {
            let sym = slots
                .remove(&n)
                .unwrap_or_else(|| Symbol::simple(format!("p{n}__{}#", self.next_gensym_id())));
            params.push(Form::symbol(sym));
        }
        if let Some(rest) = slots.remove(&-1) {
            params.push(Form::simple_symbol("&"));
            params.push(Form::symbol(rest));
        }
        Form::list([
            Form::simple_symbol("fn*"),
            Form::vector(params),
            Form::list(items),
        ])
    }

    fn ns_map_target(&self, token: &str) -> Result<String, ReaderError> {
        let invalid = || {
            ReaderError::parse(format!(
                "Namespaced map must specify a valid namespace: #{token}"
            ))
        };
        if let Some(rest) = token.strip_prefix("::") {
            if rest.is_empty() {
                return Ok(self.options.resolver.current_ns().name);
            }
            if !valid_ns_name(rest) {
                return Err(invalid());
            }
            let resolved = self
                .options
                .resolver
                .resolve_alias(&Symbol::simple(rest))
                .ok_or_else(|| {
                    ReaderError::parse(format!("Unknown auto-resolved namespace alias: #{token}"))
                })?;
            return Ok(resolved.name);
        }
        let rest = token.strip_prefix(':').unwrap_or(token);
        if !valid_ns_name(rest) {
            return Err(invalid());
        }
        Ok(rest.to_string())
    }

    fn next_gensym_id(&mut self) -> u64 {
        self.gensym_counter += 1;
        self.gensym_counter
    }
}

/// A namespaced-map prefix names a bare namespace: no slash, no extra
/// colons, no leading digit.
fn valid_ns_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if !first.is_ascii_digit() => {}
        _ => return false,
    }
    name.chars().all(|ch| ch != '/' && ch != ':')
}

fn finish_coll(kind: CollKind, items: Vec<Form>) -> Result<Form, ReaderError> {
    match kind {
        CollKind::List => Ok(Form::list(items)),
        CollKind::Vector => Ok(Form::vector(items)),
        CollKind::Set => {
            for (idx, item) in items.iter().enumerate() {
                if items[..idx].contains(item) {
                    return Err(ReaderError::parse(format!("Duplicate set element: {item}")));
                }
            }
            Ok(Form::set(items))
        }
        CollKind::Map => {
            if items.len() % 2 != 0 {
                return Err(ReaderError::parse(
                    "Map literal must contain an even number of forms",
                ));
            }
            let mut pairs: Vec<(Form, Form)> = Vec::with_capacity(items.len() / 2);
            let mut iter = items.into_iter();
            while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
                if pairs.iter().any(|(existing, _)| *existing == key) {
                    return Err(ReaderError::parse(format!("Duplicate key: {key}")));
                }
                pairs.push((key, value));
            }
            Ok(Form::map(pairs))
        }
    }
}

fn meta_from_form(form: Form) -> Result<Form, ReaderError> {
    match form.kind {
        FormKind::Map(_) => Ok(form),
        FormKind::Keyword(_) => Ok(Form::map([(form, Form::bool(true))])),
        FormKind::Symbol(_) | FormKind::String(_) => {
            Ok(Form::map([(Form::keyword(Symbol::simple("tag")), form)]))
        }
        _ => Err(ReaderError::parse(
            "Metadata must be a symbol, keyword, string or map",
        )),
    }
}

fn attach_meta(mut target: Form, meta: Form) -> Result<Form, ReaderError> {
    if !target.supports_meta() {
        return Err(ReaderError::parse(
            "Metadata can only be applied to symbols and collections",
        ));
    }
    let merged = match target.meta.take() {
        None => meta,
        // the outer map's entries land last and win key conflicts
        Some(existing) => merge_meta(*existing, meta),
    };
    target.meta = Some(Box::new(merged));
    Ok(target)
}

fn merge_meta(base: Form, overriding: Form) -> Form {
    let (FormKind::Map(mut pairs), FormKind::Map(over)) = (base.kind, overriding.kind) else {
        unreachable!("metadata is always normalized to a map");
    };
    for (key, value) in over {
        if let Some(slot) = pairs.iter_mut().find(|(existing, _)| *existing == key) {
            slot.1 = value;
        } else {
            pairs.push_back((key, value));
        }
    }
    Form::new(FormKind::Map(pairs))
}

fn rewrite_ns_map_keys(ns: &str, form: Form) -> Form {
    let Form { kind, meta } = form;
    let FormKind::Map(pairs) = kind else {
        unreachable!("namespaced map body is always a map");
    };
    let pairs = pairs
        .into_iter()
        .map(|(key, value)| (rewrite_ns_key(ns, key), value))
        .collect();
    Form {
        kind: FormKind::Map(pairs),
        meta,
    }
}

fn rewrite_ns_key(ns: &str, key: Form) -> Form {
    fn requalify(ns: &str, sym: Symbol) -> Symbol {
        match sym.ns.as_deref() {
            None => Symbol::new(ns, sym.name),
            Some("_") => Symbol::simple(sym.name),
            Some(_) => sym,
        }
    }
    let Form { kind, meta } = key;
    let kind = match kind {
        FormKind::Keyword(sym) => FormKind::Keyword(requalify(ns, sym)),
        FormKind::Symbol(sym) => FormKind::Symbol(requalify(ns, sym)),
        other => other,
    };
    Form { kind, meta }
}
