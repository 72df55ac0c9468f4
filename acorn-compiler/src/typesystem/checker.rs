// Type checker and inferrer: the second walk over the AST. Assigns a type to
// every node, resolves calls to concrete methods, and records the generic
// specialisations the emitter must instantiate.
//
// Visits return early when a node already carries a type, so re-running the
// checker over a typed tree is a no-op.

use acorn_ast::*;
use acorn_diagnostics::{Diagnostic, Reporter, SourceLocation};

use crate::symboltable::{ScopeId, ScopeStack, SymbolId, SymbolTable};
use crate::typesystem::types::{TypeKind, TypeUniverse};

pub struct TypeChecker<'a> {
    table: &'a mut SymbolTable,
    universe: &'a mut TypeUniverse,
    stack: ScopeStack,
    reporter: Reporter,
    // declared return type of each enclosing def, innermost last; None when
    // the return type is inferred from the body
    function_stack: Vec<Option<TypeId>>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(table: &'a mut SymbolTable, universe: &'a mut TypeUniverse) -> Self {
        let root = table.root();
        Self {
            table,
            universe,
            stack: ScopeStack::new(root),
            reporter: Reporter::new(),
            function_stack: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.reporter.has_errors()
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.reporter.take()
    }

    pub fn check_source_file(&mut self, file: &mut SourceFile) {
        self.visit_source_file(file);
    }

    // ==================== Lookup helpers ====================

    fn current(&self) -> ScopeId {
        self.stack.current()
    }

    fn lookup(&mut self, location: &SourceLocation, name: &str) -> Option<SymbolId> {
        self.table
            .lookup(&mut self.reporter, location, self.current(), name)
    }

    /// Resolve a type name to its applied constructor, checking the
    /// parameter type names recursively.
    fn find_type_name(&mut self, node: &mut TypeName) -> Option<TypeId> {
        if let Some(existing) = node.type_id() {
            return Some(existing);
        }

        let mut parameters = Vec::new();
        for parameter in &mut node.parameters {
            let ctor = self.find_type_name(parameter)?;
            parameters.push(ctor);
        }

        let symbol = self.lookup(&node.name.token.location, &node.name.value)?;

        let constructor = match self.table.symbol(symbol).ty {
            Some(ty) if self.universe.is_constructor(ty) => ty,
            _ => {
                self.reporter.report(Diagnostic::invalid_type_constructor(
                    node.token.location.clone(),
                ));
                return None;
            }
        };

        node.name.set_type_id(constructor);

        let given = parameters.len();
        match self.universe.apply(constructor, parameters) {
            Some(applied) => {
                node.set_type_id(applied);
                Some(applied)
            }
            None => {
                self.reporter.report(Diagnostic::invalid_type_parameters(
                    node.token.location.clone(),
                    given,
                    0,
                ));
                None
            }
        }
    }

    /// Resolve a type name and instantiate it.
    fn instance_type_name(&mut self, node: &mut TypeName) -> Option<TypeId> {
        let constructor = self.find_type_name(node)?;
        self.universe
            .construct(&mut self.reporter, &node.token.location, constructor)
    }

    /// Instantiate a constructor known by name at the given location.
    fn instance_named(&mut self, location: &SourceLocation, name: &str) -> Option<TypeId> {
        let symbol = self.lookup(location, name)?;
        let constructor = match self.table.symbol(symbol).ty {
            Some(ty) if self.universe.is_constructor(ty) => ty,
            _ => {
                self.reporter
                    .report(Diagnostic::invalid_type_constructor(location.clone()));
                return None;
            }
        };
        self.universe
            .construct(&mut self.reporter, location, constructor)
    }

    /// The constructor a `type builtin` declaration names.
    fn builtin_type_from_name(&mut self, node: &DeclName) -> Option<TypeId> {
        let kind = match node.name.value.as_str() {
            "Void" => TypeKind::VoidType,
            "Bool" => TypeKind::BooleanType,
            "Int8" => TypeKind::IntegerType(8),
            "Int16" => TypeKind::IntegerType(16),
            "Int32" => TypeKind::IntegerType(32),
            "Int64" => TypeKind::IntegerType(64),
            "Int128" => TypeKind::IntegerType(128),
            "UInt8" => TypeKind::UnsignedIntegerType(8),
            "UInt16" => TypeKind::UnsignedIntegerType(16),
            "UInt32" => TypeKind::UnsignedIntegerType(32),
            "UInt64" => TypeKind::UnsignedIntegerType(64),
            "UInt128" => TypeKind::UnsignedIntegerType(128),
            "Float16" => TypeKind::FloatType(16),
            "Float32" => TypeKind::FloatType(32),
            "Float64" => TypeKind::FloatType(64),
            "Float128" => TypeKind::FloatType(128),
            "UnsafePointer" => TypeKind::UnsafePointerType,
            "Function" => TypeKind::FunctionType,
            "Method" => TypeKind::MethodType,
            "Tuple" => TypeKind::TupleType,
            "Union" => TypeKind::UnionType,
            "Type" => TypeKind::TypeDescriptionType,
            other => {
                log::error!("unknown builtin type: {}", other);
                self.reporter.report(Diagnostic::internal(
                    node.token.location.clone(),
                    &format!("Unknown builtin type {}.", other),
                ));
                return None;
            }
        };
        Some(self.universe.alloc(kind, Vec::new()))
    }

    // ==================== Dispatch ====================

    fn visit_node(&mut self, node: &mut Node) {
        if node.has_type() {
            return;
        }

        match node {
            Node::Block(inner) => self.visit_block(inner),
            Node::Name(inner) => self.visit_name(inner),
            Node::Selector(inner) => self.visit_selector(inner),
            Node::TypeName(inner) => {
                self.find_type_name(inner);
            }
            Node::DeclName(inner) => self.visit_decl_name(inner),
            Node::ParamName(inner) => self.visit_param_name(inner),
            Node::VarDecl(inner) => self.visit_var_decl(inner),
            Node::Int(inner) => {
                let location = inner.token.location.clone();
                inner.ty = self.instance_named(&location, "Int64");
            }
            Node::Float(inner) => {
                let location = inner.token.location.clone();
                inner.ty = self.instance_named(&location, "Float64");
            }
            Node::Complex(inner) => {
                let location = inner.token.location.clone();
                inner.ty = self.instance_named(&location, "Complex");
            }
            Node::String(inner) => {
                let location = inner.token.location.clone();
                inner.ty = self.instance_named(&location, "String");
            }
            Node::List(inner) => self.visit_list(inner),
            Node::Tuple(inner) => self.visit_tuple(inner),
            Node::Dictionary(inner) => {
                self.reporter
                    .report(Diagnostic::type_inference(inner.token.location.clone()));
            }
            Node::Call(inner) => self.visit_call(inner),
            Node::CCall(inner) => self.visit_ccall(inner),
            Node::Cast(inner) => self.visit_cast(inner),
            Node::Assignment(inner) => self.visit_assignment(inner),
            Node::While(inner) => self.visit_while(inner),
            Node::If(inner) => self.visit_if(inner),
            Node::Return(inner) => self.visit_return(inner),
            Node::Spawn(inner) => self.visit_spawn(inner),
            Node::Case(inner) => self.visit_case(inner),
            Node::Switch(inner) => self.visit_switch(inner),
            Node::Let(inner) => self.visit_let(inner),
            Node::Parameter(inner) => self.visit_parameter(inner),
            Node::DefInstance(inner) => self.visit_def_instance(inner),
            Node::Def(inner) => self.visit_def(inner),
            Node::TypeDecl(inner) => self.visit_type_decl(inner),
            Node::Module(inner) => self.visit_module(inner),
            Node::Import(inner) => {
                inner.ty = Some(self.universe.alloc(TypeKind::Void, Vec::new()));
            }
            Node::SourceFile(inner) => self.visit_source_file(inner),
        }

        if !node.has_type() {
            log::debug!("no type assigned to {} node", node.kind());
        }
    }

    // ==================== Expressions ====================

    fn visit_block(&mut self, node: &mut Block) {
        for expression in &mut node.expressions {
            self.visit_node(expression);
        }

        match node.expressions.last() {
            Some(last) => {
                if let Some(ty) = last.type_id() {
                    node.ty = Some(ty);
                }
            }
            None => {
                node.ty = Some(self.universe.alloc(TypeKind::Void, Vec::new()));
            }
        }
    }

    fn visit_name(&mut self, node: &mut Name) {
        let Some(symbol) = self.lookup(&node.token.location, &node.value) else {
            return;
        };
        if let Some(ty) = self.table.symbol(symbol).ty {
            node.ty = Some(ty);
        }
    }

    fn visit_decl_name(&mut self, node: &mut DeclName) {
        self.visit_name(&mut node.name);
        if let Some(ty) = node.name.type_id() {
            node.ty = Some(ty);
        }
    }

    fn visit_param_name(&mut self, node: &mut ParamName) {
        for parameter in &mut node.parameters {
            self.find_type_name(parameter);
        }
        self.visit_name(&mut node.name);
        if let Some(ty) = node.name.type_id() {
            node.ty = Some(ty);
        }
    }

    fn visit_var_decl(&mut self, node: &mut VarDecl) {
        if node.has_type() {
            return;
        }

        let Some(symbol) = self.lookup(&node.name.token.location, &node.name.value) else {
            return;
        };

        if let Some(given) = &mut node.given_type {
            let instance = self.instance_type_name(given);

            if let Some(instance) = instance {
                node.ty = Some(instance);
                node.name.set_type_id(instance);
                self.table.symbol_mut(symbol).ty = Some(instance);
            }
        }
    }

    fn visit_list(&mut self, node: &mut List) {
        for element in &mut node.elements {
            self.visit_node(element);
        }

        let mut distinct: Vec<TypeId> = Vec::new();
        for element in &node.elements {
            let Some(ty) = element.type_id() else { return };
            if !distinct
                .iter()
                .any(|existing| self.universe.is_compatible(*existing, ty))
            {
                distinct.push(ty);
            }
        }

        if distinct.len() != 1 {
            self.reporter
                .report(Diagnostic::type_inference(node.token.location.clone()));
            return;
        }

        let Some(array_symbol) = self.lookup(&node.token.location, "Array") else {
            return;
        };
        let Some(array_ctor) = self.table.symbol(array_symbol).ty else {
            return;
        };
        let Some(applied) = self.universe.apply(array_ctor, vec![distinct[0]]) else {
            self.reporter.report(Diagnostic::invalid_type_parameters(
                node.token.location.clone(),
                1,
                0,
            ));
            return;
        };
        node.ty = self
            .universe
            .construct(&mut self.reporter, &node.token.location, applied);
    }

    fn visit_tuple(&mut self, node: &mut Tuple) {
        for element in &mut node.elements {
            self.visit_node(element);
        }

        let mut element_types = Vec::new();
        for element in &node.elements {
            let Some(ty) = element.type_id() else { return };
            element_types.push(ty);
        }

        node.ty = Some(self.universe.tuple(element_types));
    }

    // ==================== Calls ====================

    fn visit_call(&mut self, node: &mut Call) {
        self.visit_node(&mut node.operand);
        for argument in &mut node.positional_arguments {
            self.visit_node(argument);
        }
        for argument in node.keyword_arguments.values_mut() {
            self.visit_node(argument);
        }

        let Some(operand_type) = node.operand.type_id() else {
            return;
        };
        for argument in &node.positional_arguments {
            if argument.type_id().is_none() {
                return;
            }
        }
        for argument in node.keyword_arguments.values() {
            if argument.type_id().is_none() {
                return;
            }
        }

        // record construction through the `new` selector
        if matches!(
            self.universe.kind(operand_type),
            TypeKind::RecordType { .. } | TypeKind::AliasType { .. }
        ) {
            self.visit_constructor_call(node, operand_type);
            return;
        }

        if !matches!(self.universe.kind(operand_type), TypeKind::Function) {
            self.reporter.report(Diagnostic::type_mismatch(
                node.operand.token().location.clone(),
                &self.universe.name(operand_type),
                "Function",
            ));
            return;
        }

        let methods = self.universe.function_methods(operand_type).to_vec();

        let mut chosen = None;
        for (index, method) in methods.iter().enumerate() {
            if let Some(ordered) = self.order_arguments(node, *method) {
                if self.universe.could_be_called_with(*method, &ordered) {
                    chosen = Some((index, *method, ordered));
                    break;
                }
            }
        }

        let Some((index, method, ordered)) = chosen else {
            let argument_types: Vec<String> = node
                .positional_arguments
                .iter()
                .chain(node.keyword_arguments.values())
                .filter_map(|argument| argument.type_id())
                .map(|ty| self.universe.name(ty))
                .collect();

            let mut message = String::from("Method not found for these types:\n");
            message.push_str(&argument_types.join(", "));
            message.push_str("\n\nAvailable methods are:\n");
            for method in &methods {
                message.push_str(&format!(" - {}\n", self.universe.name(*method)));
            }
            message.push_str(&format!("{} methods.", methods.len()));

            self.reporter.report(Diagnostic::undefined_message(
                node.token.location.clone(),
                message,
            ));
            return;
        };

        log::trace!("call resolved to method {}", index);
        node.method_index = Some(index);

        if self.universe.method_is_abstract(method) {
            let parameter_types = self.universe.method_parameter_types(method);
            if !self.infer_call_type_parameters(node, &parameter_types, &ordered) {
                return;
            }

            let mapping = node.inferred_type_parameters.clone();
            let return_type = self.universe.method_return_type(method);

            match self.universe.replace_type_parameters(return_type, &mapping) {
                Some(result) => {
                    let specialisation = self.universe.add_specialisation(method, mapping);
                    node.specialisation_index = Some(specialisation);
                    node.ty = Some(result);
                }
                None => {
                    self.reporter
                        .report(Diagnostic::type_inference(node.token.location.clone()));
                }
            }
        } else {
            node.specialisation_index = Some(0);
            node.ty = Some(self.universe.method_return_type(method));
        }
    }

    /// `Point.new(1, 2)` — the operand is a record (or alias) constructor;
    /// the call instantiates it and the arguments must match its fields.
    fn visit_constructor_call(&mut self, node: &mut Call, constructor: TypeId) {
        let Some(instance) =
            self.universe
                .construct(&mut self.reporter, &node.token.location, constructor)
        else {
            return;
        };

        let fields = self.universe.parameters(instance).to_vec();
        let arguments: Vec<TypeId> = node
            .positional_arguments
            .iter()
            .filter_map(|argument| argument.type_id())
            .collect();

        if arguments.len() != fields.len() {
            self.reporter.report(Diagnostic::type_mismatch(
                node.token.location.clone(),
                &format!("{} arguments", arguments.len()),
                &format!("{} fields", fields.len()),
            ));
            return;
        }

        for (argument, field) in arguments.iter().zip(fields.iter()) {
            if !self.universe.is_compatible(*field, *argument) {
                self.reporter.report(Diagnostic::type_mismatch(
                    node.token.location.clone(),
                    &self.universe.name(*argument),
                    &self.universe.name(*field),
                ));
                return;
            }
        }

        node.ty = Some(instance);
    }

    /// Order a call's arguments against a method's parameter list:
    /// positional arguments first, then keyword arguments matched by the
    /// method's recorded parameter names. `None` when the shapes don't line
    /// up, which simply disqualifies the method.
    fn order_arguments(&self, node: &Call, method: TypeId) -> Option<Vec<TypeId>> {
        let names = self.universe.method_parameter_names(method);
        let positional = node.positional_arguments.len();

        if positional > names.len() {
            return None;
        }

        let mut ordered = Vec::new();
        for argument in &node.positional_arguments {
            ordered.push(argument.type_id()?);
        }

        let mut keywords_used = 0;
        for name in &names[positional..] {
            let argument = node.keyword_arguments.get(name)?;
            ordered.push(argument.type_id()?);
            keywords_used += 1;
        }

        if keywords_used != node.keyword_arguments.len() {
            return None;
        }

        Some(ordered)
    }

    /// Walk parameter and argument types in parallel, binding each generic
    /// slot the first time it is seen and requiring later occurrences to
    /// agree.
    fn infer_call_type_parameters(
        &mut self,
        node: &mut Call,
        parameter_types: &[TypeId],
        argument_types: &[TypeId],
    ) -> bool {
        for (parameter, argument) in parameter_types.iter().zip(argument_types.iter()) {
            match self.universe.kind(*parameter).clone() {
                TypeKind::Parameter { constructor } => {
                    if let Some(existing) = node.inferred_type_parameter(constructor) {
                        if !self.universe.is_compatible(existing, *argument) {
                            self.reporter.report(Diagnostic::type_mismatch(
                                node.token.location.clone(),
                                &self.universe.name(*argument),
                                &self.universe.name(existing),
                            ));
                            return false;
                        }
                    } else {
                        node.add_inferred_type_parameter(constructor, *argument);
                    }
                }
                TypeKind::ParameterType => {
                    let value = if self.universe.is_constructor(*argument) {
                        match self.universe.construct(
                            &mut self.reporter,
                            &node.token.location,
                            *argument,
                        ) {
                            Some(value) => value,
                            None => return false,
                        }
                    } else {
                        *argument
                    };

                    if let Some(existing) = node.inferred_type_parameter(*parameter) {
                        if !self.universe.is_compatible(existing, value) {
                            self.reporter.report(Diagnostic::type_mismatch(
                                node.token.location.clone(),
                                &self.universe.name(value),
                                &self.universe.name(existing),
                            ));
                            return false;
                        }
                    } else {
                        node.add_inferred_type_parameter(*parameter, value);
                    }
                }
                _ => {
                    let nested_parameters = self.universe.parameters(*parameter).to_vec();
                    let nested_arguments = self.universe.parameters(*argument).to_vec();
                    if nested_parameters.len() == nested_arguments.len()
                        && !self.infer_call_type_parameters(
                            node,
                            &nested_parameters,
                            &nested_arguments,
                        )
                    {
                        return false;
                    }
                }
            }
        }

        true
    }

    fn visit_ccall(&mut self, node: &mut CCall) {
        for parameter in &mut node.parameters {
            let Some(instance) = self.instance_type_name(parameter) else {
                return;
            };
            parameter.ty = Some(instance);
        }

        for argument in &mut node.arguments {
            self.visit_node(argument);
        }

        let Some(return_type) = self.instance_type_name(&mut node.given_return_type) else {
            return;
        };
        node.given_return_type.ty = Some(return_type);
        node.ty = Some(return_type);
    }

    fn visit_cast(&mut self, node: &mut Cast) {
        self.visit_node(&mut node.operand);
        node.ty = self.instance_type_name(&mut node.new_type);
    }

    // ==================== Bindings ====================

    fn visit_assignment(&mut self, node: &mut Assignment) {
        let Some(symbol) = self.lookup(&node.lhs.name.token.location, &node.lhs.name.value)
        else {
            return;
        };

        if self.table.symbol(symbol).builtin && !node.builtin() {
            self.reporter.report(Diagnostic::constant_assignment(
                node.lhs.token.location.clone(),
            ));
            return;
        }

        if !node.builtin() {
            match &mut node.rhs {
                Some(rhs) => {
                    self.visit_node(rhs);
                    if rhs.type_id().is_none() {
                        return;
                    }
                }
                None => return,
            }
        }

        self.visit_var_decl(&mut node.lhs);

        if node.lhs.type_id().is_none() {
            if let Some(ty) = node.rhs.as_ref().and_then(|rhs| rhs.type_id()) {
                node.lhs.set_type_id(ty);
                node.lhs.name.set_type_id(ty);
            }
        }

        let Some(lhs_type) = node.lhs.type_id() else {
            return;
        };

        if !node.builtin() {
            if let Some(rhs_type) = node.rhs.as_ref().and_then(|rhs| rhs.type_id()) {
                if !self.universe.is_compatible(lhs_type, rhs_type) {
                    let location = node
                        .rhs
                        .as_ref()
                        .map(|rhs| rhs.token().location.clone())
                        .unwrap_or_else(|| node.token.location.clone());
                    self.reporter.report(Diagnostic::type_mismatch(
                        location,
                        &self.universe.name(rhs_type),
                        &self.universe.name(lhs_type),
                    ));
                    return;
                }
            }
        }

        node.ty = Some(lhs_type);
        self.table.symbol_mut(symbol).ty = Some(lhs_type);
    }

    fn visit_selector(&mut self, node: &mut Selector) {
        self.visit_node(&mut node.operand);
        let Some(operand_type) = node.operand.type_id() else {
            return;
        };

        let field_name = node.field.name.value.clone();
        let field_location = node.field.token.location.clone();

        match self.universe.kind(operand_type).clone() {
            TypeKind::ModuleType => {
                let module_name = match &*node.operand {
                    Node::Name(name) => Some(name.value.clone()),
                    Node::ParamName(name) => Some(name.name.value.clone()),
                    _ => None,
                };
                let Some(module_name) = module_name else {
                    self.reporter.report(Diagnostic::type_mismatch(
                        node.operand.token().location.clone(),
                        &self.universe.name(operand_type),
                        "module name",
                    ));
                    return;
                };

                let Some(module_symbol) =
                    self.lookup(&node.operand.token().location, &module_name)
                else {
                    return;
                };
                let Some(module_scope) = self.table.symbol(module_symbol).scope else {
                    return;
                };
                let Some(child) = self.table.find(module_scope, &field_name) else {
                    self.reporter
                        .report(Diagnostic::undefined(field_location, &field_name));
                    return;
                };
                if let Some(ty) = self.table.symbol(child).ty {
                    node.field.set_type_id(ty);
                    node.ty = Some(ty);
                }
            }
            TypeKind::RecordType { .. } => {
                if field_name == "new" {
                    node.field.set_type_id(operand_type);
                    node.ty = Some(operand_type);
                } else {
                    self.reporter
                        .report(Diagnostic::undefined(field_location, &field_name));
                }
            }
            TypeKind::Record { .. } => {
                match self.universe.record_field_type(operand_type, &field_name) {
                    Some(field_type) => {
                        node.field.set_type_id(field_type);
                        node.ty = Some(field_type);
                    }
                    None => {
                        self.reporter
                            .report(Diagnostic::undefined(field_location, &field_name));
                    }
                }
            }
            _ => {
                self.reporter.report(Diagnostic::type_mismatch(
                    node.operand.token().location.clone(),
                    &self.universe.name(operand_type),
                    "module, record type or record",
                ));
            }
        }
    }

    // ==================== Control flow ====================

    fn visit_while(&mut self, node: &mut While) {
        self.visit_node(&mut node.condition);
        self.visit_node(&mut node.body);
        if let Some(ty) = node.body.type_id() {
            node.ty = Some(ty);
        }
    }

    fn visit_if(&mut self, node: &mut If) {
        self.visit_node(&mut node.condition);
        self.visit_node(&mut node.true_case);
        if let Some(false_case) = &mut node.false_case {
            self.visit_node(false_case);
        }

        // the false branch's type is currently ignored rather than unioned
        if let Some(ty) = node.true_case.type_id() {
            node.ty = Some(ty);
        }
    }

    fn visit_return(&mut self, node: &mut Return) {
        self.visit_node(&mut node.expression);
        let Some(expression_type) = node.expression.type_id() else {
            return;
        };

        match self.function_stack.last() {
            None => {
                self.reporter.report(Diagnostic::type_mismatch(
                    node.token.location.clone(),
                    "return outside of a function",
                    "an enclosing def",
                ));
            }
            Some(None) => {
                node.ty = Some(expression_type);
            }
            Some(Some(declared)) => {
                let declared = *declared;
                if !self.universe.is_compatible(declared, expression_type) {
                    self.reporter.report(Diagnostic::type_mismatch(
                        node.expression.token().location.clone(),
                        &self.universe.name(expression_type),
                        &self.universe.name(declared),
                    ));
                    return;
                }
                node.ty = Some(expression_type);
            }
        }
    }

    fn visit_spawn(&mut self, node: &mut Spawn) {
        self.visit_node(&mut node.call);
        if let Some(ty) = node.call.type_id() {
            node.ty = Some(ty);
        }
    }

    fn visit_case(&mut self, node: &mut Case) {
        self.visit_node(&mut node.condition);
        if let Some(assignment) = &mut node.assignment {
            self.visit_node(assignment);
        }
        self.visit_node(&mut node.body);
        if let Some(ty) = node.body.type_id() {
            node.ty = Some(ty);
        }
    }

    fn visit_switch(&mut self, node: &mut Switch) {
        self.visit_node(&mut node.expression);
        for case in &mut node.cases {
            self.visit_node(case);
        }
        if let Some(default_case) = &mut node.default_case {
            self.visit_node(default_case);
        }

        // the union of the case types remains future work; the first case
        // decides
        if let Some(ty) = node.cases.first().and_then(|case| case.type_id()) {
            node.ty = Some(ty);
        }
    }

    fn visit_let(&mut self, node: &mut Let) {
        self.visit_node(&mut node.assignment);
        if let Some(body) = &mut node.body {
            self.visit_node(body);
        }
        if let Some(ty) = node.assignment.type_id() {
            node.ty = Some(ty);
        }
    }

    fn visit_parameter(&mut self, node: &mut Parameter) {
        if node.has_type() {
            return;
        }

        let Some(symbol) = self.lookup(&node.name.token.location, &node.name.value) else {
            return;
        };

        let ty = match &mut node.given_type {
            Some(given) => self.instance_type_name(given),
            None => {
                let slot = self.universe.alloc(TypeKind::ParameterType, Vec::new());
                self.universe
                    .construct(&mut self.reporter, &node.token.location, slot)
            }
        };

        if let Some(ty) = ty {
            node.ty = Some(ty);
            node.name.set_type_id(ty);
            self.table.symbol_mut(symbol).ty = Some(ty);
        }
    }

    // ==================== Declarations ====================

    fn visit_def_instance(&mut self, node: &mut DefInstance) {
        if node.has_type() {
            return;
        }

        let name_value = node.name.name.value.clone();
        let Some(function_symbol) = self.lookup(&node.name.token.location, &name_value) else {
            return;
        };

        if self.table.symbol(function_symbol).ty.is_none() {
            let function = self.universe.new_function();
            self.table.symbol_mut(function_symbol).ty = Some(function);
        }
        let Some(function_type) = self.table.symbol(function_symbol).ty else {
            return;
        };

        let function_scope = self.table.scope_of(function_symbol);
        self.stack.push(function_scope);

        let Some(method_symbol) = self.table.lookup_by_node(function_scope, node.id) else {
            self.stack.pop();
            return;
        };
        let method_scope = self.table.scope_of(method_symbol);
        self.stack.push(method_scope);

        for parameter in &mut node.name.parameters {
            let Some(symbol) = self.lookup(&parameter.token.location, &parameter.value) else {
                continue;
            };
            let slot = self.universe.alloc(TypeKind::ParameterType, Vec::new());
            self.table.symbol_mut(symbol).ty = Some(slot);
            parameter.set_type_id(slot);
        }

        let mut parameter_types = Vec::new();
        for parameter in &mut node.parameters {
            self.visit_parameter(parameter);
            match parameter.type_id() {
                Some(ty) => parameter_types.push(ty),
                None => {
                    self.stack.pop();
                    self.stack.pop();
                    return;
                }
            }
        }

        let mut declared_return = None;
        if let Some(return_type) = &mut node.return_type {
            declared_return = self.instance_type_name(return_type);
            if declared_return.is_none() {
                self.stack.pop();
                self.stack.pop();
                return;
            }
        }

        self.function_stack.push(declared_return);
        if !node.builtin {
            if let Some(body) = &mut node.body {
                self.visit_node(body);
            }
        }
        self.function_stack.pop();

        let return_type = match declared_return {
            Some(ty) => ty,
            None => match node.body.as_ref().and_then(|body| body.type_id()) {
                Some(ty) => ty,
                None => {
                    self.stack.pop();
                    self.stack.pop();
                    return;
                }
            },
        };

        let parameter_names: Vec<String> = node
            .parameters
            .iter()
            .map(|parameter| parameter.name.value.clone())
            .collect();
        let inouts: Vec<bool> = node
            .parameters
            .iter()
            .map(|parameter| parameter.inout)
            .collect();

        let method =
            self.universe
                .new_method(parameter_types, return_type, parameter_names, inouts);

        if !self.universe.method_is_abstract(method) {
            self.universe.add_empty_specialisation(method);
        }

        let mangled = self.universe.mangled_name(method);

        let duplicate = self
            .universe
            .function_methods(function_type)
            .iter()
            .any(|existing| self.universe.mangled_name(*existing) == mangled);

        self.stack.pop(); // back to the function scope

        if duplicate {
            self.reporter.report(Diagnostic::too_many_defined(
                node.name.token.location.clone(),
                &name_value,
            ));
        } else {
            self.universe.add_method(function_type, method);
            self.table.rename(
                &mut self.reporter,
                &node.token.location,
                function_scope,
                method_symbol,
                &mangled,
            );
        }

        node.ty = Some(method);
        node.name.set_type_id(method);
        self.table.symbol_mut(method_symbol).ty = Some(method);

        self.stack.pop();
    }

    fn visit_def(&mut self, node: &mut Def) {
        for instance in &mut node.instances {
            self.visit_def_instance(instance);
        }

        if let Some(first) = node.instances.first() {
            let name = first.name.name.value.clone();
            if let Some(symbol) = self.table.find(self.current(), &name) {
                if let Some(ty) = self.table.symbol(symbol).ty {
                    node.ty = Some(ty);
                }
            }
        }
    }

    fn visit_type_decl(&mut self, node: &mut TypeDecl) {
        if node.has_type() {
            return;
        }

        let name_value = node.name.name.value.clone();
        let Some(symbol) = self.lookup(&node.name.token.location, &name_value) else {
            return;
        };

        if node.builtin {
            let Some(ty) = self.builtin_type_from_name(&node.name) else {
                return;
            };
            node.ty = Some(ty);
            node.name.set_type_id(ty);
            self.table.symbol_mut(symbol).ty = Some(ty);
            return;
        }

        let type_scope = self.table.scope_of(symbol);
        self.stack.push(type_scope);

        let mut input_parameters = Vec::new();
        for parameter in &mut node.name.parameters {
            let Some(parameter_symbol) = self.lookup(&parameter.token.location, &parameter.value)
            else {
                continue;
            };
            let slot = self.universe.alloc(TypeKind::ParameterType, Vec::new());
            self.table.symbol_mut(parameter_symbol).ty = Some(slot);
            parameter.set_type_id(slot);
            input_parameters.push(slot);
        }

        let ty = if let Some(alias) = &mut node.alias {
            let target = self.find_type_name(alias);

            target.map(|alias| {
                self.universe.alloc(
                    TypeKind::AliasType {
                        alias,
                        input_parameters,
                    },
                    Vec::new(),
                )
            })
        } else {
            let mut field_names = Vec::new();
            let mut field_types = Vec::new();
            let mut complete = true;

            for index in 0..node.field_types.len() {
                field_names.push(node.field_names[index].value.clone());
                match self.find_type_name(&mut node.field_types[index]) {
                    Some(field) => field_types.push(field),
                    None => {
                        complete = false;
                        break;
                    }
                }
            }

            complete.then(|| {
                self.universe.alloc(
                    TypeKind::RecordType {
                        input_parameters,
                        field_names,
                        field_types,
                    },
                    Vec::new(),
                )
            })
        };

        self.stack.pop();

        if let Some(ty) = ty {
            node.ty = Some(ty);
            node.name.set_type_id(ty);
            self.table.symbol_mut(symbol).ty = Some(ty);
        }
    }

    fn visit_module(&mut self, node: &mut Module) {
        let name_value = node.name.name.value.clone();
        let Some(symbol) = self.lookup(&node.name.token.location, &name_value) else {
            return;
        };

        let module_scope = self.table.scope_of(symbol);
        self.stack.push(module_scope);

        let module_type = self.universe.alloc(TypeKind::ModuleType, Vec::new());

        self.visit_node(&mut node.body);

        node.ty = Some(module_type);
        node.name.set_type_id(module_type);
        self.table.symbol_mut(symbol).ty = Some(module_type);

        self.stack.pop();
    }

    fn visit_source_file(&mut self, node: &mut SourceFile) {
        for import in &mut node.imports {
            self.visit_source_file(import);
        }
        self.visit_node(&mut node.code);
        if let Some(ty) = node.code.type_id() {
            node.ty = Some(ty);
        }
    }
}
