// Symbol table: a tree of nested scopes stored in one arena, addressed by
// stable indices. Symbols keep non-owning back references to the AST nodes
// that declared them.

use acorn_ast::{NodeId, TypeId};
use acorn_diagnostics::{Diagnostic, Reporter, SourceLocation};
use indexmap::IndexMap;

mod builder;
pub use builder::Builder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

/// One scope: an insertion-ordered mapping from identifier to symbol.
#[derive(Debug, Default)]
pub struct Scope {
    parent: Option<ScopeId>,
    entries: IndexMap<String, SymbolId>,
}

/// A named entity. `value` is the emitter-side handle (the name of the LLVM
/// global that materialises the symbol); `scope` is the symbol's own child
/// scope; `node` points back at the declaring AST node.
#[derive(Debug)]
pub struct Symbol {
    pub name: String,
    pub builtin: bool,
    pub ty: Option<TypeId>,
    pub value: Option<String>,
    pub scope: Option<ScopeId>,
    pub node: Option<NodeId>,
}

impl Symbol {
    pub fn new(name: &str, builtin: bool) -> Self {
        Self {
            name: name.to_string(),
            builtin,
            ty: None,
            value: None,
            scope: None,
            node: None,
        }
    }
}

/// The arena holding every scope and symbol of one compilation.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            symbols: Vec::new(),
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    /// The symbol's own scope, created on first use.
    pub fn scope_of(&mut self, id: SymbolId) -> ScopeId {
        if let Some(scope) = self.symbols[id.0 as usize].scope {
            return scope;
        }
        // a symbol inserted outside any scope has no parent to inherit
        let parent = None;
        let scope = self.new_scope(parent);
        self.symbols[id.0 as usize].scope = Some(scope);
        scope
    }

    fn new_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent,
            entries: IndexMap::new(),
        });
        id
    }

    /// Insert a symbol into a scope. A duplicate name reports RedefinedError
    /// and keeps the first binding.
    pub fn insert(
        &mut self,
        reporter: &mut Reporter,
        location: &SourceLocation,
        scope: ScopeId,
        symbol: Symbol,
    ) -> SymbolId {
        let name = symbol.name.clone();

        if let Some(existing) = self.scopes[scope.0 as usize].entries.get(&name) {
            reporter.report(Diagnostic::redefined(location.clone(), &name));
            return *existing;
        }

        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);

        let child = self.new_scope(Some(scope));
        self.symbols[id.0 as usize].scope = Some(child);

        self.scopes[scope.0 as usize].entries.insert(name, id);
        id
    }

    /// Does `name` resolve from this scope?
    pub fn has(&self, scope: ScopeId, name: &str, follow_parents: bool) -> bool {
        let entry = &self.scopes[scope.0 as usize];
        if entry.entries.contains_key(name) {
            return true;
        }
        match entry.parent {
            Some(parent) if follow_parents => self.has(parent, name, true),
            _ => false,
        }
    }

    /// Resolve a name, walking parent scopes. Returns `None` without
    /// reporting; use `lookup` for the reporting variant.
    pub fn find(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let entry = &self.scopes[scope.0 as usize];
        if let Some(id) = entry.entries.get(name) {
            return Some(*id);
        }
        entry.parent.and_then(|parent| self.find(parent, name))
    }

    /// Resolve a name; a miss reports UndefinedError with a suggestion drawn
    /// from the names visible at the lookup site.
    pub fn lookup(
        &self,
        reporter: &mut Reporter,
        location: &SourceLocation,
        scope: ScopeId,
        name: &str,
    ) -> Option<SymbolId> {
        match self.find(scope, name) {
            Some(id) => Some(id),
            None => {
                let candidates = self.visible_names(scope);
                reporter.report(Diagnostic::undefined_with_candidates(
                    location.clone(),
                    name,
                    &candidates,
                ));
                None
            }
        }
    }

    /// Find the symbol whose declaring node is `node`, searching this scope
    /// then its ancestors.
    pub fn lookup_by_node(&self, scope: ScopeId, node: NodeId) -> Option<SymbolId> {
        let entry = &self.scopes[scope.0 as usize];
        for id in entry.entries.values() {
            if self.symbols[id.0 as usize].node == Some(node) {
                return Some(*id);
            }
        }
        entry
            .parent
            .and_then(|parent| self.lookup_by_node(parent, node))
    }

    /// Move a symbol's entry to a new key within its scope. Used once per
    /// method when the checker replaces the node-derived key with the
    /// mangled name.
    pub fn rename(
        &mut self,
        reporter: &mut Reporter,
        location: &SourceLocation,
        scope: ScopeId,
        symbol: SymbolId,
        new_name: &str,
    ) {
        let old_name = self.symbols[symbol.0 as usize].name.clone();
        self.scopes[scope.0 as usize].entries.shift_remove(&old_name);

        if self.scopes[scope.0 as usize]
            .entries
            .contains_key(new_name)
        {
            reporter.report(Diagnostic::redefined(location.clone(), new_name));
            // restore under the old key so the symbol stays reachable
            self.scopes[scope.0 as usize]
                .entries
                .insert(old_name, symbol);
            return;
        }

        self.symbols[symbol.0 as usize].name = new_name.to_string();
        self.scopes[scope.0 as usize]
            .entries
            .insert(new_name.to_string(), symbol);
    }

    /// Symbols of one scope, in insertion order.
    pub fn symbols_in(&self, scope: ScopeId) -> Vec<SymbolId> {
        self.scopes[scope.0 as usize].entries.values().copied().collect()
    }

    fn visible_names(&self, scope: ScopeId) -> Vec<String> {
        let mut names = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            let entry = &self.scopes[id.0 as usize];
            names.extend(entry.entries.keys().cloned());
            current = entry.parent;
        }
        names
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks the lexical scope nesting during a walk over the AST.
#[derive(Debug, Default)]
pub struct ScopeStack {
    stack: Vec<ScopeId>,
}

impl ScopeStack {
    pub fn new(root: ScopeId) -> Self {
        Self { stack: vec![root] }
    }

    pub fn push(&mut self, scope: ScopeId) {
        self.stack.push(scope);
    }

    pub fn pop(&mut self) {
        self.stack.pop();
    }

    pub fn current(&self) -> ScopeId {
        *self.stack.last().unwrap_or(&ScopeId(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> SourceLocation {
        SourceLocation::unknown()
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut table = SymbolTable::new();
        let mut reporter = Reporter::new();
        let root = table.root();

        let id = table.insert(&mut reporter, &location(), root, Symbol::new("x", false));

        assert_eq!(table.find(root, "x"), Some(id));
        assert!(!reporter.has_errors());
    }

    #[test]
    fn test_duplicate_insert_keeps_first_binding() {
        let mut table = SymbolTable::new();
        let mut reporter = Reporter::new();
        let root = table.root();

        let first = table.insert(&mut reporter, &location(), root, Symbol::new("x", false));
        let second = table.insert(&mut reporter, &location(), root, Symbol::new("x", true));

        assert!(reporter.has_errors());
        assert_eq!(first, second);
        assert!(!table.symbol(first).builtin);
    }

    #[test]
    fn test_lookup_walks_parents() {
        let mut table = SymbolTable::new();
        let mut reporter = Reporter::new();
        let root = table.root();

        let outer = table.insert(&mut reporter, &location(), root, Symbol::new("f", false));
        let inner_scope = table.scope_of(outer);

        assert_eq!(table.find(inner_scope, "f"), Some(outer));
    }

    #[test]
    fn test_lookup_at_declaring_scope_returns_exact_symbol() {
        let mut table = SymbolTable::new();
        let mut reporter = Reporter::new();
        let root = table.root();

        let outer = table.insert(&mut reporter, &location(), root, Symbol::new("x", false));
        let outer_scope = table.scope_of(outer);
        let inner = table.insert(
            &mut reporter,
            &location(),
            outer_scope,
            Symbol::new("x", false),
        );

        assert_eq!(table.find(outer_scope, "x"), Some(inner));
        assert_eq!(table.find(root, "x"), Some(outer));
    }

    #[test]
    fn test_rename_moves_entry() {
        let mut table = SymbolTable::new();
        let mut reporter = Reporter::new();
        let root = table.root();

        let id = table.insert(&mut reporter, &location(), root, Symbol::new("140", false));
        table.rename(&mut reporter, &location(), root, id, "mi64i64");

        assert_eq!(table.find(root, "140"), None);
        assert_eq!(table.find(root, "mi64i64"), Some(id));
        assert_eq!(table.symbol(id).name, "mi64i64");
    }

    #[test]
    fn test_lookup_by_node() {
        let mut table = SymbolTable::new();
        let mut reporter = Reporter::new();
        let root = table.root();

        let mut symbol = Symbol::new("x", false);
        symbol.node = Some(NodeId(42));
        let id = table.insert(&mut reporter, &location(), root, symbol);

        assert_eq!(table.lookup_by_node(root, NodeId(42)), Some(id));
        assert_eq!(table.lookup_by_node(root, NodeId(7)), None);
    }

    #[test]
    fn test_missing_name_reports_undefined() {
        let table = SymbolTable::new();
        let mut reporter = Reporter::new();

        let result = table.lookup(&mut reporter, &location(), table.root(), "ghost");

        assert_eq!(result, None);
        assert!(reporter.has_errors());
    }
}
