use std::collections::HashMap;

use crate::ast::Symbol;

/// Namespace resolution consulted while interpreting auto-resolved keywords
/// and expanding syntax-quoted symbols. Answers are never cached and the
/// reader never mutates the implementation.
pub trait Resolver: Send + Sync {
    fn current_ns(&self) -> Symbol;
    fn resolve_alias(&self, alias: &Symbol) -> Option<Symbol>;
    fn resolve_class(&self, sym: &Symbol) -> Option<Symbol>;
    fn resolve_var(&self, sym: &Symbol) -> Option<Symbol>;
}

/// Placeholder resolver: current namespace `user`, nothing else resolves.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullResolver;

impl Resolver for NullResolver {
    fn current_ns(&self) -> Symbol {
        Symbol::simple("user")
    }

    fn resolve_alias(&self, _alias: &Symbol) -> Option<Symbol> {
        None
    }

    fn resolve_class(&self, _sym: &Symbol) -> Option<Symbol> {
        None
    }

    fn resolve_var(&self, _sym: &Symbol) -> Option<Symbol> {
        None
    }
}

/// Table-backed resolver for embedders and tests.
#[derive(Clone, Debug)]
pub struct MapResolver {
    current: Symbol,
    aliases: HashMap<String, Symbol>,
    classes: HashMap<String, Symbol>,
    vars: HashMap<String, Symbol>,
}

impl MapResolver {
    pub fn new(current_ns: impl Into<String>) -> Self {
        Self {
            current: Symbol::simple(current_ns),
            aliases: HashMap::new(),
            classes: HashMap::new(),
            vars: HashMap::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>, ns: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), Symbol::simple(ns));
        self
    }

    pub fn with_class(mut self, name: impl Into<String>, resolved: impl Into<String>) -> Self {
        self.classes.insert(name.into(), Symbol::simple(resolved));
        self
    }

    pub fn with_var(mut self, name: impl Into<String>, ns: impl Into<String>) -> Self {
        let ns = ns.into();
        let name = name.into();
        self.vars
            .insert(name.clone(), Symbol::new(ns, name));
        self
    }
}

impl Resolver for MapResolver {
    fn current_ns(&self) -> Symbol {
        self.current.clone()
    }

    fn resolve_alias(&self, alias: &Symbol) -> Option<Symbol> {
        if alias.ns.is_some() {
            return None;
        }
        self.aliases.get(&alias.name).cloned()
    }

    fn resolve_class(&self, sym: &Symbol) -> Option<Symbol> {
        if sym.ns.is_some() {
            return None;
        }
        self.classes.get(&sym.name).cloned()
    }

    fn resolve_var(&self, sym: &Symbol) -> Option<Symbol> {
        if sym.ns.is_some() {
            return None;
        }
        self.vars.get(&sym.name).cloned()
    }
}
