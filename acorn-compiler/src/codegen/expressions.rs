// Lowering of the typed AST to LLVM instructions.

use acorn_ast::*;
use inkwell::types::BasicType;
use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum};
use inkwell::{AddressSpace, FloatPredicate, IntPredicate};

use crate::typesystem::types::TypeKind;

use super::{Generator, Variable};

impl<'ctx, 'c> Generator<'ctx, 'c> {
    /// Lower one expression. `None` means the expression produced no value
    /// (void results, declarations, control flow without a merge value).
    pub(crate) fn visit(&mut self, node: &Node) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        match node {
            Node::Block(block) => {
                let mut last = None;
                for expression in &block.expressions {
                    if !self.current_block_open() {
                        break;
                    }
                    last = self.visit(expression)?;
                }
                Ok(last)
            }
            Node::Int(literal) => {
                let ty = self.value_type(literal.type_id())?.into_int_type();
                let value: u64 = literal
                    .value
                    .parse()
                    .map_err(|_| format!("invalid integer literal {}", literal.value))?;
                Ok(Some(ty.const_int(value, true).into()))
            }
            Node::Float(literal) => {
                let ty = self.value_type(literal.type_id())?.into_float_type();
                let value: f64 = literal
                    .value
                    .parse()
                    .map_err(|_| format!("invalid float literal {}", literal.value))?;
                Ok(Some(ty.const_float(value).into()))
            }
            Node::String(literal) => self.visit_string(literal),
            Node::Complex(literal) => {
                Err(format!("complex literal {} is not lowered", literal.value))
            }
            Node::Name(name) => self.visit_name(&name.value, name.type_id()),
            Node::ParamName(name) => self.visit_name(&name.name.value, name.type_id()),
            Node::Selector(selector) => self.visit_selector(selector),
            Node::List(list) => self.visit_list(list),
            Node::Tuple(tuple) => self.visit_tuple(tuple),
            Node::Dictionary(_) => Err("dictionaries are not lowered".to_string()),
            Node::Call(call) => self.visit_call(call),
            Node::CCall(ccall) => self.visit_ccall(ccall),
            Node::Cast(cast) => self.visit_cast(cast),
            Node::Assignment(assignment) => self.visit_assignment(assignment),
            Node::Let(binding) => {
                let value = self.visit(&binding.assignment)?;
                if let Some(body) = &binding.body {
                    self.visit(body)?;
                }
                Ok(value)
            }
            Node::VarDecl(_) => Ok(None),
            Node::While(node) => self.visit_while(node),
            Node::If(node) => self.visit_if(node),
            Node::Return(node) => self.visit_return(node),
            Node::Spawn(node) => self.visit(&node.call),
            Node::Switch(node) => self.visit_switch(node),
            Node::Case(_) => Ok(None),
            Node::Def(def) => {
                for instance in &def.instances {
                    self.generate_def_instance(instance)?;
                }
                Ok(None)
            }
            Node::DefInstance(instance) => {
                self.generate_def_instance(instance)?;
                Ok(None)
            }
            Node::TypeDecl(_) | Node::Import(_) => Ok(None),
            Node::Module(module) => self.visit_module(module),
            Node::TypeName(_) | Node::DeclName(_) | Node::Parameter(_) | Node::SourceFile(_) => {
                Err(format!("{} is not a value expression", node.kind()))
            }
        }
    }

    fn value_type(
        &self,
        ty: Option<TypeId>,
    ) -> Result<inkwell::types::BasicTypeEnum<'ctx>, String> {
        let ty = ty.ok_or_else(|| "expression survived checking without a type".to_string())?;
        self.llvm_type(ty)
    }

    fn visit_string(
        &mut self,
        literal: &StringLiteral,
    ) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        let struct_type = self.value_type(literal.type_id())?.into_struct_type();

        let global = self
            .builder
            .build_global_string_ptr(&literal.value, "string")
            .map_err(|e| format!("failed to build string: {}", e))?;
        let length = self
            .context
            .i64_type()
            .const_int(literal.value.len() as u64, false);

        let mut aggregate = struct_type.get_undef();
        aggregate = self
            .builder
            .build_insert_value(aggregate, length, 0, "length")
            .map_err(|e| format!("failed to build string: {}", e))?
            .into_struct_value();
        aggregate = self
            .builder
            .build_insert_value(aggregate, global.as_pointer_value(), 1, "elements")
            .map_err(|e| format!("failed to build string: {}", e))?
            .into_struct_value();

        Ok(Some(aggregate.into()))
    }

    fn visit_name(
        &mut self,
        name: &str,
        ty: Option<TypeId>,
    ) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        // local or module-level slot
        if let Some(symbol) = self.lookup_symbol(name) {
            if let Some(variable) = self.variables.get(&symbol).copied() {
                let value = self
                    .builder
                    .build_load(variable.ty, variable.ptr, name)
                    .map_err(|e| format!("failed to load {}: {}", name, e))?;
                return Ok(Some(value));
            }
        }

        // builtin constants
        match name {
            "True" => return Ok(Some(self.context.bool_type().const_int(1, false).into())),
            "False" => return Ok(Some(self.context.bool_type().const_int(0, false).into())),
            "Nothing" => return Ok(None),
            _ => {}
        }

        if let Some(ty) = ty {
            let resolved = self.resolve(ty);
            if matches!(self.universe.kind(resolved), TypeKind::Function) {
                return Err(format!("{} is a function, not a value", name));
            }
        }

        Err(format!("no storage for {}", name))
    }

    fn visit_selector(
        &mut self,
        node: &Selector,
    ) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        let operand_type = node
            .operand
            .type_id()
            .map(|ty| self.resolve(ty))
            .ok_or_else(|| "selector operand has no type".to_string())?;

        match self.universe.kind(operand_type).clone() {
            TypeKind::Record { .. } => {
                let value = self
                    .visit(&node.operand)?
                    .ok_or_else(|| "selector operand has no value".to_string())?;
                let field_name = &node.field.name.value;
                let index = self
                    .universe
                    .record_field_index(operand_type, field_name)
                    .ok_or_else(|| format!("record has no field {}", field_name))?;

                let value = self
                    .builder
                    .build_extract_value(value.into_struct_value(), index as u32, field_name)
                    .map_err(|e| format!("failed to read field {}: {}", field_name, e))?;
                Ok(Some(value))
            }
            TypeKind::ModuleType => {
                let module_name = match &*node.operand {
                    Node::Name(name) => name.value.clone(),
                    Node::ParamName(name) => name.name.value.clone(),
                    _ => return Err("module selector needs a module name".to_string()),
                };
                let symbol = self
                    .lookup_symbol(&module_name)
                    .ok_or_else(|| format!("module {} not found", module_name))?;
                let scope = self
                    .table
                    .symbol(symbol)
                    .scope
                    .ok_or_else(|| format!("module {} has no scope", module_name))?;
                let field = self
                    .table
                    .find(scope, &node.field.name.value)
                    .ok_or_else(|| format!("{} not found in module", node.field.name.value))?;
                let variable = self
                    .variables
                    .get(&field)
                    .copied()
                    .ok_or_else(|| format!("no storage for {}", node.field.name.value))?;
                let value = self
                    .builder
                    .build_load(variable.ty, variable.ptr, &node.field.name.value)
                    .map_err(|e| format!("failed to load: {}", e))?;
                Ok(Some(value))
            }
            _ => Err("selector operand is not a record or module".to_string()),
        }
    }

    fn visit_list(&mut self, node: &List) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        let record_type = self.value_type(node.type_id())?.into_struct_type();

        let mut values = Vec::new();
        for element in &node.elements {
            let value = self
                .visit(element)?
                .ok_or_else(|| "list element has no value".to_string())?;
            values.push(value);
        }

        let element_type = values
            .first()
            .map(|value| value.get_type())
            .ok_or_else(|| "empty lists are not lowered".to_string())?;
        let array_type = element_type.array_type(values.len() as u32);

        let storage = self
            .builder
            .build_alloca(array_type, "list")
            .map_err(|e| format!("failed to build list: {}", e))?;

        let i32_type = self.context.i32_type();
        for (index, value) in values.iter().enumerate() {
            let slot = unsafe {
                self.builder.build_in_bounds_gep(
                    array_type,
                    storage,
                    &[
                        i32_type.const_int(0, false),
                        i32_type.const_int(index as u64, false),
                    ],
                    "element",
                )
            }
            .map_err(|e| format!("failed to build list: {}", e))?;
            self.builder
                .build_store(slot, *value)
                .map_err(|e| format!("failed to build list: {}", e))?;
        }

        let length = self
            .context
            .i64_type()
            .const_int(values.len() as u64, false);

        let mut aggregate = record_type.get_undef();
        aggregate = self
            .builder
            .build_insert_value(aggregate, length, 0, "length")
            .map_err(|e| format!("failed to build list: {}", e))?
            .into_struct_value();
        aggregate = self
            .builder
            .build_insert_value(aggregate, storage, 1, "elements")
            .map_err(|e| format!("failed to build list: {}", e))?
            .into_struct_value();

        Ok(Some(aggregate.into()))
    }

    fn visit_tuple(&mut self, node: &Tuple) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        let struct_type = self.value_type(node.type_id())?.into_struct_type();

        let mut aggregate = struct_type.get_undef();
        for (index, element) in node.elements.iter().enumerate() {
            let value = self
                .visit(element)?
                .ok_or_else(|| "tuple element has no value".to_string())?;
            aggregate = self
                .builder
                .build_insert_value(aggregate, value, index as u32, "element")
                .map_err(|e| format!("failed to build tuple: {}", e))?
                .into_struct_value();
        }

        Ok(Some(aggregate.into()))
    }

    // ==================== Calls ====================

    fn visit_call(&mut self, node: &Call) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        let operand_type = node
            .operand
            .type_id()
            .map(|ty| self.resolve(ty))
            .ok_or_else(|| "call operand has no type".to_string())?;

        // record construction: Point.new(1, 2)
        if matches!(
            self.universe.kind(operand_type),
            TypeKind::RecordType { .. } | TypeKind::AliasType { .. }
        ) {
            return self.visit_record_construction(node);
        }

        if !matches!(self.universe.kind(operand_type), TypeKind::Function) {
            return Err("call operand is not a function".to_string());
        }

        let method_index = node
            .method_index
            .ok_or_else(|| "call survived checking without a method".to_string())?;
        let specialisation_index = node.specialisation_index.unwrap_or(0);
        let method = self.universe.function_methods(operand_type)[method_index];

        // the callee's generic slots resolve through the call's inference,
        // itself resolved through the active replacements
        let mapping: Vec<(TypeId, TypeId)> = node
            .inferred_type_parameters
            .iter()
            .map(|(slot, ty)| (*slot, self.resolve(*ty)))
            .collect();

        self.replacements.push(mapping);
        let fn_type = self.llvm_method_type(method);
        self.replacements.pop();
        let fn_type = fn_type?;

        // order arguments the way the checker matched them
        let parameter_names = self.universe.method_parameter_names(method);
        let positional = node.positional_arguments.len();
        let mut ordered: Vec<&Node> = node.positional_arguments.iter().collect();
        for name in parameter_names.iter().skip(positional) {
            let argument = node
                .keyword_arguments
                .get(name)
                .ok_or_else(|| format!("missing keyword argument {}", name))?;
            ordered.push(argument);
        }

        let inouts = self.universe.method_inouts(method);
        let mut arguments: Vec<BasicMetadataValueEnum<'ctx>> = Vec::new();
        for (index, argument) in ordered.iter().enumerate() {
            if inouts.get(index).copied().unwrap_or(false) {
                let variable = self.argument_slot(argument)?;
                arguments.push(variable.ptr.into());
            } else {
                let value = self
                    .visit(argument)?
                    .ok_or_else(|| "argument has no value".to_string())?;
                arguments.push(value.into());
            }
        }

        // resolve function[method_index][specialisation_index] from the table
        let (global, struct_type) = self
            .function_tables
            .get(&operand_type)
            .copied()
            .ok_or_else(|| "function has no table".to_string())?;

        let field = self
            .builder
            .build_struct_gep(
                struct_type,
                global.as_pointer_value(),
                method_index as u32,
                "method",
            )
            .map_err(|e| format!("failed to index table: {}", e))?;

        let pointer_type = self.context.ptr_type(AddressSpace::default());
        let count = self
            .universe
            .method_specialisations(method)
            .len()
            .max(1);
        let array_type = pointer_type.array_type(count as u32);
        let i32_type = self.context.i32_type();
        let slot = unsafe {
            self.builder.build_in_bounds_gep(
                array_type,
                field,
                &[
                    i32_type.const_int(0, false),
                    i32_type.const_int(specialisation_index as u64, false),
                ],
                "specialisation",
            )
        }
        .map_err(|e| format!("failed to index table: {}", e))?;

        let target = self
            .builder
            .build_load(pointer_type, slot, "target")
            .map_err(|e| format!("failed to load table entry: {}", e))?
            .into_pointer_value();

        let call_site = self
            .builder
            .build_indirect_call(fn_type, target, &arguments, "call")
            .map_err(|e| format!("failed to build call: {}", e))?;

        Ok(call_site.try_as_basic_value().left())
    }

    fn visit_record_construction(
        &mut self,
        node: &Call,
    ) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        let struct_type = self.value_type(node.type_id())?.into_struct_type();

        let mut aggregate = struct_type.get_undef();
        for (index, argument) in node.positional_arguments.iter().enumerate() {
            let value = self
                .visit(argument)?
                .ok_or_else(|| "constructor argument has no value".to_string())?;
            aggregate = self
                .builder
                .build_insert_value(aggregate, value, index as u32, "field")
                .map_err(|e| format!("failed to build record: {}", e))?
                .into_struct_value();
        }

        Ok(Some(aggregate.into()))
    }

    /// The storage slot behind an inout argument; only named variables have
    /// one.
    fn argument_slot(&mut self, node: &Node) -> Result<Variable<'ctx>, String> {
        let name = match node {
            Node::Name(name) => &name.value,
            Node::ParamName(name) => &name.name.value,
            _ => return Err("inout argument must be a variable".to_string()),
        };
        let symbol = self
            .lookup_symbol(name)
            .ok_or_else(|| format!("no symbol for {}", name))?;
        self.variables
            .get(&symbol)
            .copied()
            .ok_or_else(|| format!("no storage for {}", name))
    }

    fn visit_ccall(&mut self, node: &CCall) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        let name = &node.name.value;

        let function = match self.module.get_function(name) {
            Some(function) => function,
            None => {
                let mut parameters = Vec::new();
                for parameter in &node.parameters {
                    let ty = parameter
                        .type_id()
                        .ok_or_else(|| "ccall parameter has no type".to_string())?;
                    parameters.push(self.llvm_type(ty)?.into());
                }
                let return_type = node
                    .type_id()
                    .ok_or_else(|| "ccall has no return type".to_string())?;
                let fn_type = if matches!(
                    self.universe.kind(self.resolve(return_type)),
                    TypeKind::Void
                ) {
                    self.context.void_type().fn_type(&parameters, false)
                } else {
                    self.llvm_type(return_type)?.fn_type(&parameters, false)
                };
                self.module.add_function(name, fn_type, None)
            }
        };

        let mut arguments: Vec<BasicMetadataValueEnum<'ctx>> = Vec::new();
        for argument in &node.arguments {
            let value = self
                .visit(argument)?
                .ok_or_else(|| "ccall argument has no value".to_string())?;
            arguments.push(value.into());
        }

        let call_site = self
            .builder
            .build_call(function, &arguments, "ccall")
            .map_err(|e| format!("failed to build ccall: {}", e))?;

        Ok(call_site.try_as_basic_value().left())
    }

    fn visit_cast(&mut self, node: &Cast) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        let value = self
            .visit(&node.operand)?
            .ok_or_else(|| "cast operand has no value".to_string())?;
        let target = self.value_type(node.type_id())?;

        let err = |e| format!("failed to build cast: {}", e);

        let cast = match (value, target) {
            (BasicValueEnum::IntValue(int), inkwell::types::BasicTypeEnum::IntType(ty)) => self
                .builder
                .build_int_cast(int, ty, "cast")
                .map_err(err)?
                .into(),
            (BasicValueEnum::IntValue(int), inkwell::types::BasicTypeEnum::PointerType(ty)) => {
                self.builder
                    .build_int_to_ptr(int, ty, "cast")
                    .map_err(err)?
                    .into()
            }
            (BasicValueEnum::PointerValue(ptr), inkwell::types::BasicTypeEnum::IntType(ty)) => {
                self.builder
                    .build_ptr_to_int(ptr, ty, "cast")
                    .map_err(err)?
                    .into()
            }
            (BasicValueEnum::FloatValue(float), inkwell::types::BasicTypeEnum::FloatType(ty)) => {
                self.builder
                    .build_float_cast(float, ty, "cast")
                    .map_err(err)?
                    .into()
            }
            (value, target) => self
                .builder
                .build_bit_cast(value, target, "cast")
                .map_err(err)?,
        };

        Ok(Some(cast))
    }

    // ==================== Bindings ====================

    fn visit_assignment(
        &mut self,
        node: &Assignment,
    ) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        let value = match &node.rhs {
            Some(rhs) => self.visit(rhs)?,
            None => None,
        };

        let symbol = self
            .lookup_symbol(&node.lhs.name.value)
            .ok_or_else(|| format!("no symbol for {}", node.lhs.name.value))?;

        if let Some(value) = value {
            let variable = match self.variables.get(&symbol).copied() {
                Some(variable) => variable,
                None => {
                    let ty = value.get_type();
                    // bindings established in main (top-level and module
                    // code) live in globals so function bodies can reach
                    // them; everything else is stack storage
                    let ptr = if self.in_main() {
                        let global = self.module.add_global(ty, None, &node.lhs.name.value);
                        global.set_initializer(&ty.const_zero());
                        global.as_pointer_value()
                    } else {
                        self.builder
                            .build_alloca(ty, &node.lhs.name.value)
                            .map_err(|e| format!("failed to build alloca: {}", e))?
                    };
                    let variable = Variable { ptr, ty };
                    self.variables.insert(symbol, variable);
                    self.table.symbol_mut(symbol).value =
                        Some(node.lhs.name.value.clone());
                    variable
                }
            };
            self.builder
                .build_store(variable.ptr, value)
                .map_err(|e| format!("failed to build store: {}", e))?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    fn in_main(&self) -> bool {
        self.builder
            .get_insert_block()
            .and_then(|block| block.get_parent())
            .map(|function| function.get_name().to_bytes() == b"main")
            .unwrap_or(false)
    }

    // ==================== Control flow ====================

    fn visit_while(&mut self, node: &While) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        let function = self
            .builder
            .get_insert_block()
            .and_then(|block| block.get_parent())
            .ok_or_else(|| "while outside a function".to_string())?;

        let condition_block = self.context.append_basic_block(function, "while_condition");
        let body_block = self.context.append_basic_block(function, "while_body");
        let after_block = self.context.append_basic_block(function, "while_after");

        self.builder
            .build_unconditional_branch(condition_block)
            .map_err(|e| format!("failed to build while: {}", e))?;

        self.builder.position_at_end(condition_block);
        let condition = self
            .visit(&node.condition)?
            .ok_or_else(|| "while condition has no value".to_string())?;
        self.builder
            .build_conditional_branch(condition.into_int_value(), body_block, after_block)
            .map_err(|e| format!("failed to build while: {}", e))?;

        self.builder.position_at_end(body_block);
        self.visit(&node.body)?;
        if self.current_block_open() {
            self.builder
                .build_unconditional_branch(condition_block)
                .map_err(|e| format!("failed to build while: {}", e))?;
        }

        self.builder.position_at_end(after_block);
        Ok(None)
    }

    fn visit_if(&mut self, node: &If) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        let function = self
            .builder
            .get_insert_block()
            .and_then(|block| block.get_parent())
            .ok_or_else(|| "if outside a function".to_string())?;

        let condition = self
            .visit(&node.condition)?
            .ok_or_else(|| "if condition has no value".to_string())?;

        let then_block = self.context.append_basic_block(function, "if_then");
        let else_block = self.context.append_basic_block(function, "if_else");
        let merge_block = self.context.append_basic_block(function, "if_merge");

        // a merge slot only when both branches can produce a value
        let result_type = node
            .type_id()
            .and_then(|ty| self.llvm_type(ty).ok())
            .filter(|_| node.false_case.is_some());
        let slot = match result_type {
            Some(ty) => Some(
                self.builder
                    .build_alloca(ty, "if_result")
                    .map_err(|e| format!("failed to build if: {}", e))?,
            ),
            None => None,
        };

        self.builder
            .build_conditional_branch(condition.into_int_value(), then_block, else_block)
            .map_err(|e| format!("failed to build if: {}", e))?;

        self.builder.position_at_end(then_block);
        let then_value = self.visit(&node.true_case)?;
        if self.current_block_open() {
            if let (Some(slot), Some(value)) = (slot, then_value) {
                self.builder
                    .build_store(slot, value)
                    .map_err(|e| format!("failed to build if: {}", e))?;
            }
            self.builder
                .build_unconditional_branch(merge_block)
                .map_err(|e| format!("failed to build if: {}", e))?;
        }

        self.builder.position_at_end(else_block);
        if let Some(false_case) = &node.false_case {
            let else_value = self.visit(false_case)?;
            if self.current_block_open() {
                if let (Some(slot), Some(value)) = (slot, else_value) {
                    self.builder
                        .build_store(slot, value)
                        .map_err(|e| format!("failed to build if: {}", e))?;
                }
            }
        }
        if self.current_block_open() {
            self.builder
                .build_unconditional_branch(merge_block)
                .map_err(|e| format!("failed to build if: {}", e))?;
        }

        self.builder.position_at_end(merge_block);
        match (slot, result_type) {
            (Some(slot), Some(ty)) => {
                let value = self
                    .builder
                    .build_load(ty, slot, "if_value")
                    .map_err(|e| format!("failed to build if: {}", e))?;
                Ok(Some(value))
            }
            _ => Ok(None),
        }
    }

    fn visit_return(&mut self, node: &Return) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        let value = self.visit(&node.expression)?;
        match value {
            Some(value) => self
                .builder
                .build_return(Some(&value))
                .map(|_| None)
                .map_err(|e| format!("failed to build return: {}", e)),
            None => self
                .builder
                .build_return(None)
                .map(|_| None)
                .map_err(|e| format!("failed to build return: {}", e)),
        }
    }

    /// A switch lowers to a chain of equality tests against the scrutinee.
    fn visit_switch(&mut self, node: &Switch) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        let function = self
            .builder
            .get_insert_block()
            .and_then(|block| block.get_parent())
            .ok_or_else(|| "switch outside a function".to_string())?;

        let scrutinee = self
            .visit(&node.expression)?
            .ok_or_else(|| "switch expression has no value".to_string())?;

        let merge_block = self.context.append_basic_block(function, "switch_after");

        for case in &node.cases {
            let Node::Case(case) = case else {
                return Err("switch contains a non-case entry".to_string());
            };

            let condition = self
                .visit(&case.condition)?
                .ok_or_else(|| "case condition has no value".to_string())?;

            let matched = match (scrutinee, condition) {
                (BasicValueEnum::IntValue(a), BasicValueEnum::IntValue(b)) => self
                    .builder
                    .build_int_compare(IntPredicate::EQ, a, b, "case_match")
                    .map_err(|e| format!("failed to build switch: {}", e))?,
                (BasicValueEnum::FloatValue(a), BasicValueEnum::FloatValue(b)) => self
                    .builder
                    .build_float_compare(FloatPredicate::OEQ, a, b, "case_match")
                    .map_err(|e| format!("failed to build switch: {}", e))?,
                _ => return Err("switch scrutinee is not comparable".to_string()),
            };

            let body_block = self.context.append_basic_block(function, "case_body");
            let next_block = self.context.append_basic_block(function, "case_next");

            self.builder
                .build_conditional_branch(matched, body_block, next_block)
                .map_err(|e| format!("failed to build switch: {}", e))?;

            self.builder.position_at_end(body_block);
            self.visit(&case.body)?;
            if self.current_block_open() {
                self.builder
                    .build_unconditional_branch(merge_block)
                    .map_err(|e| format!("failed to build switch: {}", e))?;
            }

            self.builder.position_at_end(next_block);
        }

        if let Some(default_case) = &node.default_case {
            self.visit(default_case)?;
        }
        if self.current_block_open() {
            self.builder
                .build_unconditional_branch(merge_block)
                .map_err(|e| format!("failed to build switch: {}", e))?;
        }

        self.builder.position_at_end(merge_block);
        Ok(None)
    }

    fn visit_module(&mut self, node: &Module) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        let Some(symbol) = self.lookup_symbol(&node.name.name.value) else {
            return Err(format!("module {} not found", node.name.name.value));
        };
        let Some(scope) = self.table.symbol(symbol).scope else {
            return Err(format!("module {} has no scope", node.name.name.value));
        };

        self.stack.push(scope);
        let result = self.visit(&node.body);
        self.stack.pop();
        result?;

        Ok(None)
    }
}
