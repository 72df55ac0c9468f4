// LLVM emitter. Consumes the typed AST and the root scope.
//
// Every Function symbol materialises as a global struct with one field per
// method; each field is an array holding one function pointer per recorded
// specialisation. Calls load `function[method_index][specialisation_index]`
// and invoke indirectly; inout arguments pass the storage slot's address.

use std::collections::HashMap;

use acorn_ast::{AstNode, Node, SourceFile, TypeId};
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::types::{BasicTypeEnum, StructType};
use inkwell::values::{FunctionValue, GlobalValue, PointerValue};

use crate::driver::Compilation;
use crate::symboltable::{ScopeId, ScopeStack, SymbolId, SymbolTable};
use crate::typesystem::types::{Specialisation, TypeKind, TypeUniverse};

mod builtins;
mod expressions;
mod types;

pub use types::mangle_method;

/// Failure emitting a module. Internal lowering steps carry their own
/// messages; `HasErrors` means the front-end never produced a clean tree.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("compilation has errors; nothing to emit")]
    HasErrors,
    #[error("{0}")]
    Codegen(String),
}

/// A local variable slot: its storage address and value type. For inout
/// parameters the slot is the caller's storage rather than a local alloca.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Variable<'ctx> {
    pub ptr: PointerValue<'ctx>,
    pub ty: BasicTypeEnum<'ctx>,
}

pub struct Generator<'ctx, 'c> {
    pub(crate) context: &'ctx Context,
    pub(crate) module: Module<'ctx>,
    pub(crate) builder: Builder<'ctx>,
    pub(crate) universe: &'c mut TypeUniverse,
    pub(crate) table: &'c mut SymbolTable,
    pub(crate) stack: ScopeStack,
    // (method type, specialisation index) -> declared LLVM function
    pub(crate) methods: HashMap<(TypeId, usize), FunctionValue<'ctx>>,
    // function type -> (table global, struct shape)
    pub(crate) function_tables: HashMap<TypeId, (GlobalValue<'ctx>, StructType<'ctx>)>,
    pub(crate) variables: HashMap<SymbolId, Variable<'ctx>>,
    // active generic substitutions, innermost last
    pub(crate) replacements: Vec<Specialisation>,
}

/// Emit LLVM IR for a successful compilation and return its textual form.
pub fn emit_ir(compilation: &mut Compilation) -> Result<String, EmitError> {
    if compilation.reporter.has_errors() {
        return Err(EmitError::HasErrors);
    }

    let context = Context::create();

    let Compilation {
        name,
        file,
        table,
        universe,
        ..
    } = compilation;

    let Some(file) = file.as_ref() else {
        return Err(EmitError::HasErrors);
    };

    let mut generator = Generator::new(&context, name, universe, table);
    generator.generate(file).map_err(EmitError::Codegen)?;

    generator
        .module
        .verify()
        .map_err(|e| EmitError::Codegen(format!("module verification failed: {}", e)))?;

    Ok(generator.module.print_to_string().to_string())
}

impl<'ctx, 'c> Generator<'ctx, 'c> {
    pub fn new(
        context: &'ctx Context,
        name: &str,
        universe: &'c mut TypeUniverse,
        table: &'c mut SymbolTable,
    ) -> Self {
        let module = context.create_module(name);
        let builder = context.create_builder();
        let root = table.root();

        Self {
            context,
            module,
            builder,
            universe,
            table,
            stack: ScopeStack::new(root),
            methods: HashMap::new(),
            function_tables: HashMap::new(),
            variables: HashMap::new(),
            replacements: Vec::new(),
        }
    }

    pub fn generate(&mut self, file: &SourceFile) -> Result<(), String> {
        log::debug!("emitting module for: {}", file.name);

        let root = self.table.root();
        self.declare_scope(root)?;
        self.generate_builtin_bodies(root)?;
        self.materialise_function_tables(root)?;
        self.generate_source_file(file)?;

        Ok(())
    }

    // ==================== Declaration pass ====================

    /// Declare one LLVM function per (method, specialisation) of every
    /// function symbol reachable from this scope.
    fn declare_scope(&mut self, scope: ScopeId) -> Result<(), String> {
        for symbol_id in self.table.symbols_in(scope) {
            let Some(ty) = self.table.symbol(symbol_id).ty else {
                continue;
            };

            match self.universe.kind(ty) {
                TypeKind::Function => {
                    let name = self.table.symbol(symbol_id).name.clone();
                    self.declare_function_methods(&name, ty)?;
                }
                TypeKind::ModuleType => {
                    if let Some(child) = self.table.symbol(symbol_id).scope {
                        self.declare_scope(child)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn declare_function_methods(&mut self, name: &str, function: TypeId) -> Result<(), String> {
        for method in self.universe.function_methods(function).to_vec() {
            let specialisations = self.universe.method_specialisations(method).to_vec();
            for (index, specialisation) in specialisations.iter().enumerate() {
                if self.methods.contains_key(&(method, index)) {
                    continue;
                }

                self.replacements.push(specialisation.clone());
                let fn_type = self.llvm_method_type(method);
                self.replacements.pop();

                let fn_type = fn_type?;
                let mut link_name = mangle_method(name, self.universe, method);
                if index > 0 {
                    link_name.push_str(&format!("${}", index));
                }

                let function_value = self.module.add_function(&link_name, fn_type, None);
                self.methods.insert((method, index), function_value);
            }
        }
        Ok(())
    }

    /// Synthesize bodies for the builtin methods installed before checking
    /// (arithmetic, comparisons, pointer indexing). Builtin defs with no
    /// known body stay as external declarations.
    fn generate_builtin_bodies(&mut self, scope: ScopeId) -> Result<(), String> {
        for symbol_id in self.table.symbols_in(scope) {
            let Some(ty) = self.table.symbol(symbol_id).ty else {
                continue;
            };

            match self.universe.kind(ty) {
                TypeKind::Function => {
                    let name = self.table.symbol(symbol_id).name.clone();
                    let Some(function_scope) = self.table.symbol(symbol_id).scope else {
                        continue;
                    };

                    for method_symbol in self.table.symbols_in(function_scope) {
                        let symbol = self.table.symbol(method_symbol);
                        if !symbol.builtin {
                            continue;
                        }
                        let Some(method) = symbol.ty else { continue };
                        if !matches!(self.universe.kind(method), TypeKind::Method { .. }) {
                            continue;
                        }

                        let specialisations =
                            self.universe.method_specialisations(method).to_vec();
                        for (index, specialisation) in specialisations.iter().enumerate() {
                            let Some(function_value) =
                                self.methods.get(&(method, index)).copied()
                            else {
                                continue;
                            };
                            self.replacements.push(specialisation.clone());
                            let result =
                                self.generate_builtin_body(&name, method, function_value);
                            self.replacements.pop();
                            result?;
                        }
                    }
                }
                TypeKind::ModuleType => {
                    if let Some(child) = self.table.symbol(symbol_id).scope {
                        self.generate_builtin_bodies(child)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    // ==================== Function tables ====================

    /// One global struct per function symbol: a field per method, each an
    /// array of pointers to the method's specialisations.
    fn materialise_function_tables(&mut self, scope: ScopeId) -> Result<(), String> {
        for symbol_id in self.table.symbols_in(scope) {
            let Some(ty) = self.table.symbol(symbol_id).ty else {
                continue;
            };

            match self.universe.kind(ty) {
                TypeKind::Function => {
                    if self.function_tables.contains_key(&ty) {
                        continue;
                    }

                    let name = self.table.symbol(symbol_id).name.clone();
                    let pointer_type = self.context.ptr_type(inkwell::AddressSpace::default());

                    let mut field_types = Vec::new();
                    let mut field_values = Vec::new();

                    for method in self.universe.function_methods(ty).to_vec() {
                        let count = self.universe.method_specialisations(method).len().max(1);
                        field_types.push(pointer_type.array_type(count as u32).into());

                        let mut pointers = Vec::new();
                        for index in 0..count {
                            let pointer = match self.methods.get(&(method, index)) {
                                Some(function_value) => {
                                    function_value.as_global_value().as_pointer_value()
                                }
                                None => pointer_type.const_null(),
                            };
                            pointers.push(pointer);
                        }
                        field_values.push(pointer_type.const_array(&pointers).into());
                    }

                    let struct_type = self.context.struct_type(&field_types, false);
                    let initialiser = struct_type.const_named_struct(&field_values);

                    let global_name = format!("_A_table_{}", types::sanitise(&name));
                    let global = self.module.add_global(struct_type, None, &global_name);
                    global.set_initializer(&initialiser);

                    self.table.symbol_mut(symbol_id).value =
                        Some(global.get_name().to_string_lossy().to_string());
                    self.function_tables.insert(ty, (global, struct_type));
                }
                TypeKind::ModuleType => {
                    if let Some(child) = self.table.symbol(symbol_id).scope {
                        self.materialise_function_tables(child)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    // ==================== Program body ====================

    /// Imported files contribute their definitions; the top-level code of
    /// the root file becomes `main`.
    fn generate_source_file(&mut self, file: &SourceFile) -> Result<(), String> {
        for import in &file.imports {
            self.generate_declarations_only(&import.code)?;
        }

        let main_type = self.context.i32_type().fn_type(&[], false);
        let main = self.module.add_function("main", main_type, None);
        let entry = self.context.append_basic_block(main, "entry");
        self.builder.position_at_end(entry);

        self.visit(&file.code)?;

        if self.current_block_open() {
            self.builder
                .build_return(Some(&self.context.i32_type().const_int(0, false)))
                .map_err(|e| format!("failed to build return: {}", e))?;
        }

        Ok(())
    }

    /// Walk a block generating only declarations (imported files have no
    /// executable top level of their own).
    fn generate_declarations_only(&mut self, node: &Node) -> Result<(), String> {
        match node {
            Node::Block(block) => {
                for expression in &block.expressions {
                    self.generate_declarations_only(expression)?;
                }
                Ok(())
            }
            Node::Def(def) => {
                for instance in &def.instances {
                    self.generate_def_instance(instance)?;
                }
                Ok(())
            }
            Node::Module(module) => self.generate_module_declarations(module),
            _ => Ok(()),
        }
    }

    fn generate_module_declarations(&mut self, module: &acorn_ast::Module) -> Result<(), String> {
        let Some(symbol) = self
            .table
            .find(self.stack.current(), &module.name.name.value)
        else {
            return Ok(());
        };
        let Some(scope) = self.table.symbol(symbol).scope else {
            return Ok(());
        };

        self.stack.push(scope);
        let result = self.generate_declarations_only(&module.body);
        self.stack.pop();
        result
    }

    // ==================== Method bodies ====================

    /// Generate one body per recorded specialisation of a def instance.
    pub(crate) fn generate_def_instance(
        &mut self,
        node: &acorn_ast::DefInstance,
    ) -> Result<(), String> {
        if node.builtin {
            // declared in the builtin pass; body provided elsewhere
            return Ok(());
        }

        let Some(method) = node.type_id() else {
            return Err("def instance survived checking without a type".to_string());
        };

        let name = &node.name.name.value;
        let Some(function_symbol) = self.table.find(self.stack.current(), name) else {
            return Err(format!("function symbol {} not found", name));
        };
        let function_scope = self.table.scope_of(function_symbol);
        let Some(method_symbol) = self.table.lookup_by_node(function_scope, node.id) else {
            return Err(format!("method symbol for {} not found", name));
        };
        let method_scope = self.table.scope_of(method_symbol);

        let specialisations = self.universe.method_specialisations(method).to_vec();

        for (index, specialisation) in specialisations.iter().enumerate() {
            let Some(function_value) = self.methods.get(&(method, index)).copied() else {
                continue;
            };
            if function_value.count_basic_blocks() > 0 {
                continue;
            }

            let saved_block = self.builder.get_insert_block();
            let saved_variables = self.variables.clone();

            self.replacements.push(specialisation.clone());
            self.stack.push(function_scope);
            self.stack.push(method_scope);

            let result = self.generate_method_body(node, method, function_value);

            self.stack.pop();
            self.stack.pop();
            self.replacements.pop();
            self.variables = saved_variables;

            if let Some(block) = saved_block {
                self.builder.position_at_end(block);
            }

            result?;
        }

        // record the first specialisation as the symbol's handle
        if let Some(function_value) = self.methods.get(&(method, 0)) {
            self.table.symbol_mut(method_symbol).value = Some(
                function_value
                    .get_name()
                    .to_string_lossy()
                    .to_string(),
            );
        }

        Ok(())
    }

    fn generate_method_body(
        &mut self,
        node: &acorn_ast::DefInstance,
        method: TypeId,
        function_value: FunctionValue<'ctx>,
    ) -> Result<(), String> {
        let entry = self.context.append_basic_block(function_value, "entry");
        self.builder.position_at_end(entry);

        let parameter_types = self.universe.method_parameter_types(method);
        let inouts = self.universe.method_inouts(method);

        for (index, parameter) in node.parameters.iter().enumerate() {
            let Some(symbol) = self.table.find(self.stack.current(), &parameter.name.value)
            else {
                return Err(format!("parameter {} has no symbol", parameter.name.value));
            };

            let llvm_value = function_value
                .get_nth_param(index as u32)
                .ok_or_else(|| format!("missing parameter {}", index))?;

            let parameter_type = self.resolve(parameter_types[index]);
            let llvm_type = self.llvm_type(parameter_type)?;

            if inouts.get(index).copied().unwrap_or(false) {
                // inout: the argument is already the caller's storage slot
                self.variables.insert(
                    symbol,
                    Variable {
                        ptr: llvm_value.into_pointer_value(),
                        ty: llvm_type,
                    },
                );
            } else {
                let slot = self
                    .builder
                    .build_alloca(llvm_type, &parameter.name.value)
                    .map_err(|e| format!("failed to build alloca: {}", e))?;
                self.builder
                    .build_store(slot, llvm_value)
                    .map_err(|e| format!("failed to build store: {}", e))?;
                self.variables.insert(
                    symbol,
                    Variable {
                        ptr: slot,
                        ty: llvm_type,
                    },
                );
            }
        }

        let body_value = match &node.body {
            Some(body) => self.visit(body)?,
            None => None,
        };

        if self.current_block_open() {
            let return_type = self.resolve(self.universe.method_return_type(method));
            if matches!(self.universe.kind(return_type), TypeKind::Void) {
                self.builder
                    .build_return(None)
                    .map_err(|e| format!("failed to build return: {}", e))?;
            } else {
                match body_value {
                    Some(value) => {
                        self.builder
                            .build_return(Some(&value))
                            .map_err(|e| format!("failed to build return: {}", e))?;
                    }
                    None => {
                        return Err(format!(
                            "method {} has no value to return",
                            node.name.name.value
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    // ==================== Shared helpers ====================

    pub(crate) fn current_block_open(&self) -> bool {
        self.builder
            .get_insert_block()
            .map(|block| block.get_terminator().is_none())
            .unwrap_or(false)
    }

    /// Resolve generic parameter slots through the active replacements,
    /// innermost first.
    pub(crate) fn resolve(&self, ty: TypeId) -> TypeId {
        if let TypeKind::Parameter { constructor } = self.universe.kind(ty) {
            let slot = *constructor;
            for specialisation in self.replacements.iter().rev() {
                if let Some((_, to)) = specialisation.iter().find(|(from, _)| *from == slot) {
                    return self.resolve(*to);
                }
            }
        }
        ty
    }

    pub(crate) fn lookup_symbol(&self, name: &str) -> Option<SymbolId> {
        self.table.find(self.stack.current(), name)
    }
}
