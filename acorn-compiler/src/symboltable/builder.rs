// Symbol table builder: one walk over the AST installing every named entity
// into the scope it is visible from. Types are not computed here.

use acorn_ast::*;
use acorn_diagnostics::{Diagnostic, Reporter};

use super::{ScopeStack, Symbol, SymbolTable};

pub struct Builder<'t> {
    table: &'t mut SymbolTable,
    stack: ScopeStack,
    reporter: Reporter,
}

impl<'t> Builder<'t> {
    pub fn new(table: &'t mut SymbolTable) -> Self {
        let root = table.root();
        Self {
            table,
            stack: ScopeStack::new(root),
            reporter: Reporter::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.reporter.has_errors()
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.reporter.take()
    }

    pub fn build(&mut self, node: &Node) {
        match node {
            Node::Block(block) => {
                for expression in &block.expressions {
                    self.build(expression);
                }
            }
            Node::Name(_)
            | Node::TypeName(_)
            | Node::DeclName(_)
            | Node::ParamName(_)
            | Node::Int(_)
            | Node::Float(_)
            | Node::Complex(_)
            | Node::String(_)
            | Node::Import(_) => {}
            Node::Selector(selector) => self.build(&selector.operand),
            Node::VarDecl(decl) => self.build_var_decl(decl),
            Node::List(list) => {
                for element in &list.elements {
                    self.build(element);
                }
            }
            Node::Tuple(tuple) => {
                for element in &tuple.elements {
                    self.build(element);
                }
            }
            Node::Dictionary(dictionary) => {
                for key in &dictionary.keys {
                    self.build(key);
                }
                for value in &dictionary.values {
                    self.build(value);
                }
            }
            Node::Call(call) => {
                self.build(&call.operand);
                for argument in &call.positional_arguments {
                    self.build(argument);
                }
                for argument in call.keyword_arguments.values() {
                    self.build(argument);
                }
            }
            Node::CCall(ccall) => {
                for argument in &ccall.arguments {
                    self.build(argument);
                }
            }
            Node::Cast(cast) => self.build(&cast.operand),
            Node::Assignment(assignment) => {
                self.build_var_decl(&assignment.lhs);
                if let Some(rhs) = &assignment.rhs {
                    self.build(rhs);
                }
            }
            Node::While(node) => {
                self.build(&node.condition);
                self.build(&node.body);
            }
            Node::If(node) => {
                self.build(&node.condition);
                self.build(&node.true_case);
                if let Some(false_case) = &node.false_case {
                    self.build(false_case);
                }
            }
            Node::Return(node) => self.build(&node.expression),
            Node::Spawn(node) => self.build(&node.call),
            Node::Case(node) => {
                self.build(&node.condition);
                if let Some(assignment) = &node.assignment {
                    self.build(assignment);
                }
                self.build(&node.body);
            }
            Node::Switch(node) => {
                self.build(&node.expression);
                for case in &node.cases {
                    self.build(case);
                }
                if let Some(default_case) = &node.default_case {
                    self.build(default_case);
                }
            }
            Node::Let(node) => {
                self.build(&node.assignment);
                if let Some(body) = &node.body {
                    self.build(body);
                }
            }
            Node::Parameter(parameter) => self.build_parameter(parameter),
            Node::DefInstance(instance) => self.build_def_instance(instance),
            Node::Def(def) => {
                for instance in &def.instances {
                    self.build_def_instance(instance);
                }
            }
            Node::TypeDecl(decl) => self.build_type_decl(decl),
            Node::Module(module) => self.build_module(module),
            Node::SourceFile(file) => self.build_source_file(file),
        }
    }

    pub fn build_source_file(&mut self, file: &SourceFile) {
        for import in &file.imports {
            self.build_source_file(import);
        }
        self.build(&file.code);
    }

    fn build_var_decl(&mut self, decl: &VarDecl) {
        let mut symbol = Symbol::new(&decl.name.value, decl.builtin);
        symbol.node = Some(decl.id);

        let scope = self.stack.current();
        self.table
            .insert(&mut self.reporter, &decl.token.location, scope, symbol);
    }

    fn build_parameter(&mut self, parameter: &Parameter) {
        let mut symbol = Symbol::new(&parameter.name.value, false);
        symbol.node = Some(parameter.id);

        let scope = self.stack.current();
        self.table.insert(
            &mut self.reporter,
            &parameter.token.location,
            scope,
            symbol,
        );
    }

    /// Defs shadow rather than extend outer bindings: the function symbol is
    /// looked up without walking parent scopes. Each instance gets a
    /// sub-symbol keyed by its node identity until the checker renames it to
    /// the mangled name.
    fn build_def_instance(&mut self, node: &DefInstance) {
        let name = &node.name.name.value;
        let scope = self.stack.current();

        let function_symbol = if self.table.has(scope, name, false) {
            match self.table.find(scope, name) {
                Some(symbol) => symbol,
                None => return,
            }
        } else {
            self.table.insert(
                &mut self.reporter,
                &node.name.token.location,
                scope,
                Symbol::new(name, false),
            )
        };

        let function_scope = self.table.scope_of(function_symbol);
        self.stack.push(function_scope);

        let mut method_symbol = Symbol::new(&node.id.to_string(), node.builtin);
        method_symbol.node = Some(node.id);
        let method_symbol = self.table.insert(
            &mut self.reporter,
            &node.token.location,
            function_scope,
            method_symbol,
        );

        let method_scope = self.table.scope_of(method_symbol);
        self.stack.push(method_scope);

        for parameter in &node.name.parameters {
            let mut symbol = Symbol::new(&parameter.value, false);
            symbol.node = Some(parameter.id);
            self.table.insert(
                &mut self.reporter,
                &parameter.token.location,
                method_scope,
                symbol,
            );
        }

        for parameter in &node.parameters {
            self.build_parameter(parameter);
        }

        if let Some(body) = &node.body {
            self.build(body);
        }

        self.stack.pop();
        self.stack.pop();
    }

    fn build_type_decl(&mut self, node: &TypeDecl) {
        let mut symbol = Symbol::new(&node.name.name.value, node.builtin);
        symbol.node = Some(node.id);

        let scope = self.stack.current();
        let symbol = self
            .table
            .insert(&mut self.reporter, &node.token.location, scope, symbol);

        let type_scope = self.table.scope_of(symbol);
        self.stack.push(type_scope);

        for parameter in &node.name.parameters {
            let mut parameter_symbol = Symbol::new(&parameter.value, false);
            parameter_symbol.node = Some(parameter.id);
            self.table.insert(
                &mut self.reporter,
                &parameter.token.location,
                type_scope,
                parameter_symbol,
            );
        }

        if node.alias.is_none() {
            let mut constructor = Symbol::new("new", true);
            constructor.node = Some(node.id);
            self.table.insert(
                &mut self.reporter,
                &node.token.location,
                type_scope,
                constructor,
            );
        }

        self.stack.pop();
    }

    /// Modules are re-openable: a second declaration of the same name reuses
    /// the existing scope.
    fn build_module(&mut self, node: &Module) {
        let name = &node.name.name.value;
        let scope = self.stack.current();

        let symbol = if self.table.has(scope, name, true) {
            match self.table.find(scope, name) {
                Some(symbol) => symbol,
                None => return,
            }
        } else {
            let mut symbol = Symbol::new(name, false);
            symbol.node = Some(node.id);
            self.table
                .insert(&mut self.reporter, &node.token.location, scope, symbol)
        };

        let module_scope = self.table.scope_of(symbol);
        self.stack.push(module_scope);
        self.build(&node.body);
        self.stack.pop();
    }
}
