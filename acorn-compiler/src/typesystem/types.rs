// The type universe: every type of one compilation lives in a single arena
// and refers to other types by index. One sum covers both hierarchies — the
// type constructors ("type types") and the instance types applying them
// produces. Following the original layout, each entry carries a uniform
// parameter vector: a method's return type is parameter 0 followed by its
// parameter types, a function's parameters are its methods, a record's are
// its field types.

use acorn_ast::TypeId;
use acorn_diagnostics::{Diagnostic, Reporter, SourceLocation};

/// One concrete instantiation of a generic method: an ordered mapping from
/// ParameterType slot to the inferred concrete type.
pub type Specialisation = Vec<(TypeId, TypeId)>;

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    // type constructors
    ParameterType,
    VoidType,
    BooleanType,
    IntegerType(u32),
    UnsignedIntegerType(u32),
    FloatType(u32),
    UnsafePointerType,
    FunctionType,
    MethodType,
    RecordType {
        input_parameters: Vec<TypeId>,
        field_names: Vec<String>,
        field_types: Vec<TypeId>,
    },
    UnionType,
    TupleType,
    AliasType {
        alias: TypeId,
        input_parameters: Vec<TypeId>,
    },
    ModuleType,
    TypeDescriptionType,

    // instance types
    Parameter {
        constructor: TypeId,
    },
    Void,
    Boolean,
    Integer(u32),
    UnsignedInteger(u32),
    Float(u32),
    UnsafePointer,
    Record {
        field_names: Vec<String>,
    },
    Union,
    Method {
        parameter_names: Vec<String>,
        inouts: Vec<bool>,
        specialisations: Vec<Specialisation>,
    },
    Function,
}

#[derive(Debug, Clone)]
pub struct TypeEntry {
    pub kind: TypeKind,
    pub parameters: Vec<TypeId>,
}

#[derive(Debug, Default)]
pub struct TypeUniverse {
    entries: Vec<TypeEntry>,
}

impl TypeUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: TypeKind, parameters: Vec<TypeId>) -> TypeId {
        let id = TypeId(self.entries.len() as u32);
        self.entries.push(TypeEntry { kind, parameters });
        id
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.entries[id.0 as usize].kind
    }

    pub fn parameters(&self, id: TypeId) -> &[TypeId] {
        &self.entries[id.0 as usize].parameters
    }

    pub fn is_constructor(&self, id: TypeId) -> bool {
        matches!(
            self.kind(id),
            TypeKind::ParameterType
                | TypeKind::VoidType
                | TypeKind::BooleanType
                | TypeKind::IntegerType(_)
                | TypeKind::UnsignedIntegerType(_)
                | TypeKind::FloatType(_)
                | TypeKind::UnsafePointerType
                | TypeKind::FunctionType
                | TypeKind::MethodType
                | TypeKind::RecordType { .. }
                | TypeKind::UnionType
                | TypeKind::TupleType
                | TypeKind::AliasType { .. }
                | TypeKind::ModuleType
                | TypeKind::TypeDescriptionType
        )
    }

    // ==================== Names ====================

    /// Canonical name; compatibility falls back to comparing these.
    pub fn name(&self, id: TypeId) -> String {
        let entry = &self.entries[id.0 as usize];
        match &entry.kind {
            TypeKind::ParameterType => "ParameterType".to_string(),
            TypeKind::VoidType => "VoidType".to_string(),
            TypeKind::BooleanType => "BooleanType".to_string(),
            TypeKind::IntegerType(bits) => format!("IntegerType{}", bits),
            TypeKind::UnsignedIntegerType(bits) => format!("UnsignedIntegerType{}", bits),
            TypeKind::FloatType(bits) => format!("FloatType{}", bits),
            TypeKind::UnsafePointerType => "UnsafePointerType".to_string(),
            TypeKind::FunctionType => "FunctionType".to_string(),
            TypeKind::MethodType => "MethodType".to_string(),
            TypeKind::RecordType { field_types, .. } => {
                let fields: Vec<String> = field_types.iter().map(|f| self.name(*f)).collect();
                format!("RecordType{{{}}}", fields.join(", "))
            }
            TypeKind::UnionType => "UnionType".to_string(),
            TypeKind::TupleType => "TupleType".to_string(),
            TypeKind::AliasType { alias, .. } => self.name(*alias),
            TypeKind::ModuleType => "ModuleType".to_string(),
            TypeKind::TypeDescriptionType => "TypeDescriptionType".to_string(),
            TypeKind::Parameter { .. } => "Parameter".to_string(),
            TypeKind::Void => "Void".to_string(),
            TypeKind::Boolean => "Boolean".to_string(),
            TypeKind::Integer(bits) => format!("Integer{}", bits),
            TypeKind::UnsignedInteger(bits) => format!("UnsignedInteger{}", bits),
            TypeKind::Float(bits) => format!("Float{}", bits),
            TypeKind::UnsafePointer => {
                format!("UnsafePointer{{{}}}", self.joined_parameter_names(id))
            }
            TypeKind::Record { .. } => format!("Record{{{}}}", self.joined_parameter_names(id)),
            TypeKind::Union => format!("Union{{{}}}", self.joined_parameter_names(id)),
            TypeKind::Method { .. } => format!("Method{{{}}}", self.joined_parameter_names(id)),
            TypeKind::Function => format!("Function{{{}}}", self.joined_parameter_names(id)),
        }
    }

    fn joined_parameter_names(&self, id: TypeId) -> String {
        let names: Vec<String> = self
            .parameters(id)
            .iter()
            .map(|p| self.name(*p))
            .collect();
        names.join(", ")
    }

    /// Deterministic link-time mangle. Constructors mangle as `u`; a method
    /// encodes its return type then parameter types.
    pub fn mangled_name(&self, id: TypeId) -> String {
        let entry = &self.entries[id.0 as usize];
        match &entry.kind {
            TypeKind::Parameter { .. } => "p".to_string(),
            TypeKind::Void => "v".to_string(),
            TypeKind::Boolean => "b".to_string(),
            TypeKind::Integer(bits) => format!("i{}", bits),
            TypeKind::UnsignedInteger(bits) => format!("ui{}", bits),
            TypeKind::Float(bits) => format!("f{}", bits),
            TypeKind::UnsafePointer => {
                format!("p{}", self.mangled_name(entry.parameters[0]))
            }
            TypeKind::Record { .. } => self.mangled_with_prefix(id, "r"),
            TypeKind::Union => self.mangled_with_prefix(id, "u"),
            TypeKind::Method { .. } => self.mangled_with_prefix(id, "m"),
            TypeKind::Function => self.mangled_with_prefix(id, "f"),
            _ => "u".to_string(),
        }
    }

    fn mangled_with_prefix(&self, id: TypeId, prefix: &str) -> String {
        let mut out = prefix.to_string();
        for parameter in self.parameters(id) {
            out.push_str(&self.mangled_name(*parameter));
        }
        out
    }

    // ==================== Compatibility ====================

    /// Is `other` acceptable where `this` is required? Canonical-name
    /// equality, except: a Parameter instance accepts anything, a
    /// ParameterType accepts any constructor, pointers compare element-wise,
    /// records member-wise, and unions member-wise.
    pub fn is_compatible(&self, this: TypeId, other: TypeId) -> bool {
        match self.kind(this) {
            TypeKind::Parameter { .. } => true,
            TypeKind::ParameterType => self.is_constructor(other),
            TypeKind::UnsafePointer => match self.kind(other) {
                TypeKind::UnsafePointer => {
                    self.is_compatible(self.parameters(this)[0], self.parameters(other)[0])
                }
                _ => false,
            },
            TypeKind::Record { .. } => match self.kind(other) {
                TypeKind::Record { .. } => {
                    let left = self.parameters(this);
                    let right = self.parameters(other);
                    left.len() == right.len()
                        && left
                            .iter()
                            .zip(right.iter())
                            .all(|(a, b)| self.is_compatible(*a, *b))
                }
                _ => false,
            },
            TypeKind::Union => self
                .parameters(this)
                .iter()
                .any(|member| self.is_compatible(*member, other)),
            _ => self.name(this) == self.name(other),
        }
    }

    // ==================== Application & instantiation ====================

    /// Apply a constructor to parameters, producing the applied constructor.
    /// Simple constructors accept no parameters and return themselves;
    /// parameterised ones produce a fresh applied entry.
    pub fn apply(&mut self, ctor: TypeId, parameters: Vec<TypeId>) -> Option<TypeId> {
        match self.kind(ctor).clone() {
            TypeKind::ParameterType
            | TypeKind::VoidType
            | TypeKind::BooleanType
            | TypeKind::IntegerType(_)
            | TypeKind::UnsignedIntegerType(_)
            | TypeKind::FloatType(_)
            | TypeKind::FunctionType
            | TypeKind::MethodType
            | TypeKind::ModuleType => {
                if parameters.is_empty() {
                    Some(ctor)
                } else {
                    None
                }
            }
            TypeKind::UnsafePointerType => {
                if parameters.is_empty() {
                    Some(ctor)
                } else if parameters.len() == 1 {
                    Some(self.alloc(TypeKind::UnsafePointerType, parameters))
                } else {
                    None
                }
            }
            kind @ (TypeKind::RecordType { .. }
            | TypeKind::UnionType
            | TypeKind::TupleType
            | TypeKind::AliasType { .. }) => Some(self.alloc(kind, parameters)),
            TypeKind::TypeDescriptionType => {
                if parameters.len() <= 1 {
                    Some(self.alloc(TypeKind::TypeDescriptionType, parameters))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Instantiate an applied constructor into an instance type.
    pub fn construct(
        &mut self,
        reporter: &mut Reporter,
        location: &SourceLocation,
        ctor: TypeId,
    ) -> Option<TypeId> {
        let entry = self.entries[ctor.0 as usize].clone();
        let given = entry.parameters.len();

        match entry.kind {
            TypeKind::ParameterType => {
                if given == 0 {
                    Some(self.alloc(TypeKind::Parameter { constructor: ctor }, Vec::new()))
                } else {
                    reporter.report(Diagnostic::invalid_type_constructor(location.clone()));
                    None
                }
            }
            TypeKind::VoidType => self.simple_instance(reporter, location, given, TypeKind::Void),
            TypeKind::BooleanType => {
                self.simple_instance(reporter, location, given, TypeKind::Boolean)
            }
            TypeKind::IntegerType(bits) => {
                self.simple_instance(reporter, location, given, TypeKind::Integer(bits))
            }
            TypeKind::UnsignedIntegerType(bits) => {
                self.simple_instance(reporter, location, given, TypeKind::UnsignedInteger(bits))
            }
            TypeKind::FloatType(bits) => {
                self.simple_instance(reporter, location, given, TypeKind::Float(bits))
            }
            TypeKind::UnsafePointerType => {
                if given == 1 {
                    let element =
                        self.construct_or_self(reporter, location, entry.parameters[0])?;
                    Some(self.alloc(TypeKind::UnsafePointer, vec![element]))
                } else {
                    reporter.report(Diagnostic::invalid_type_parameters(
                        location.clone(),
                        given,
                        1,
                    ));
                    None
                }
            }
            TypeKind::FunctionType => {
                self.simple_instance(reporter, location, given, TypeKind::Function)
            }
            TypeKind::MethodType | TypeKind::ModuleType => {
                reporter.report(Diagnostic::invalid_type_constructor(location.clone()));
                None
            }
            TypeKind::TypeDescriptionType => {
                if given == 1 {
                    Some(entry.parameters[0])
                } else {
                    reporter.report(Diagnostic::invalid_type_parameters(
                        location.clone(),
                        given,
                        1,
                    ));
                    None
                }
            }
            TypeKind::RecordType {
                input_parameters,
                field_names,
                field_types,
            } => {
                if given != input_parameters.len() {
                    reporter.report(Diagnostic::invalid_type_parameters(
                        location.clone(),
                        given,
                        input_parameters.len(),
                    ));
                    return None;
                }

                let mapping: Vec<(TypeId, TypeId)> = input_parameters
                    .iter()
                    .copied()
                    .zip(entry.parameters.iter().copied())
                    .collect();

                let mut fields = Vec::new();
                for field in field_types {
                    let substituted = self.substitute_constructor(field, &mapping);
                    let instance = self.construct_or_self(reporter, location, substituted)?;
                    fields.push(instance);
                }

                Some(self.alloc(TypeKind::Record { field_names }, fields))
            }
            TypeKind::UnionType => {
                let mut members = Vec::new();
                for member in entry.parameters {
                    members.push(self.construct_or_self(reporter, location, member)?);
                }
                Some(self.alloc(TypeKind::Union, members))
            }
            TypeKind::TupleType => {
                if given == 0 {
                    reporter.report(Diagnostic::invalid_type_parameters(
                        location.clone(),
                        0,
                        1,
                    ));
                    return None;
                }
                let mut elements = Vec::new();
                for element in entry.parameters {
                    elements.push(self.construct_or_self(reporter, location, element)?);
                }
                Some(self.tuple(elements))
            }
            TypeKind::AliasType {
                alias,
                input_parameters,
            } => {
                if given != input_parameters.len() {
                    reporter.report(Diagnostic::invalid_type_parameters(
                        location.clone(),
                        given,
                        input_parameters.len(),
                    ));
                    return None;
                }

                if input_parameters.is_empty() {
                    return self.construct(reporter, location, alias);
                }

                let mapping: Vec<(TypeId, TypeId)> = input_parameters
                    .iter()
                    .copied()
                    .zip(entry.parameters.iter().copied())
                    .collect();
                let substituted = self.substitute_constructor(alias, &mapping);
                self.construct_or_self(reporter, location, substituted)
            }
            _ => {
                reporter.report(Diagnostic::invalid_type_constructor(location.clone()));
                None
            }
        }
    }

    fn simple_instance(
        &mut self,
        reporter: &mut Reporter,
        location: &SourceLocation,
        given: usize,
        kind: TypeKind,
    ) -> Option<TypeId> {
        if given == 0 {
            Some(self.alloc(kind, Vec::new()))
        } else {
            reporter.report(Diagnostic::invalid_type_parameters(
                location.clone(),
                given,
                0,
            ));
            None
        }
    }

    fn construct_or_self(
        &mut self,
        reporter: &mut Reporter,
        location: &SourceLocation,
        id: TypeId,
    ) -> Option<TypeId> {
        if self.is_constructor(id) {
            self.construct(reporter, location, id)
        } else {
            Some(id)
        }
    }

    /// A tuple is a record whose fields are named by position.
    pub fn tuple(&mut self, elements: Vec<TypeId>) -> TypeId {
        let field_names = (0..elements.len()).map(|i| i.to_string()).collect();
        self.alloc(TypeKind::Record { field_names }, elements)
    }

    /// Rewrite ParameterType slots inside a constructor tree.
    pub fn substitute_constructor(
        &mut self,
        ctor: TypeId,
        mapping: &[(TypeId, TypeId)],
    ) -> TypeId {
        let mut current = ctor;
        if matches!(self.kind(ctor), TypeKind::ParameterType) {
            if let Some((_, to)) = mapping.iter().find(|(from, _)| *from == ctor) {
                current = *to;
            }
        }

        let parameters = self.parameters(current).to_vec();
        if parameters.is_empty() {
            return current;
        }

        let substituted: Vec<TypeId> = parameters
            .iter()
            .map(|p| self.substitute_constructor(*p, mapping))
            .collect();

        if substituted == parameters {
            current
        } else {
            self.apply(current, substituted).unwrap_or(current)
        }
    }

    /// Rewrite Parameter slots inside an instance tree. Returns `None` when
    /// the mapping does not cover a slot the type mentions.
    pub fn replace_type_parameters(
        &mut self,
        ty: TypeId,
        mapping: &[(TypeId, TypeId)],
    ) -> Option<TypeId> {
        let mut current = ty;
        if let TypeKind::Parameter { constructor } = self.kind(ty) {
            let slot = *constructor;
            match mapping.iter().find(|(from, _)| *from == slot) {
                Some((_, to)) => current = *to,
                None => return None,
            }
        }

        let parameters = self.parameters(current).to_vec();
        if parameters.is_empty() {
            return Some(current);
        }

        let mut replaced = Vec::new();
        for parameter in &parameters {
            replaced.push(self.replace_type_parameters(*parameter, mapping)?);
        }

        if replaced == parameters {
            Some(current)
        } else {
            let kind = self.kind(current).clone();
            Some(self.alloc(kind, replaced))
        }
    }

    // ==================== Records ====================

    pub fn record_field_type(&self, record: TypeId, field: &str) -> Option<TypeId> {
        match self.kind(record) {
            TypeKind::Record { field_names } => field_names
                .iter()
                .position(|name| name == field)
                .map(|index| self.parameters(record)[index]),
            _ => None,
        }
    }

    pub fn record_field_index(&self, record: TypeId, field: &str) -> Option<usize> {
        match self.kind(record) {
            TypeKind::Record { field_names } => {
                field_names.iter().position(|name| name == field)
            }
            _ => None,
        }
    }

    // ==================== Methods & functions ====================

    pub fn new_function(&mut self) -> TypeId {
        self.alloc(TypeKind::Function, Vec::new())
    }

    pub fn new_method(
        &mut self,
        parameter_types: Vec<TypeId>,
        return_type: TypeId,
        parameter_names: Vec<String>,
        inouts: Vec<bool>,
    ) -> TypeId {
        let mut parameters = vec![return_type];
        parameters.extend(parameter_types);
        self.alloc(
            TypeKind::Method {
                parameter_names,
                inouts,
                specialisations: Vec::new(),
            },
            parameters,
        )
    }

    pub fn add_method(&mut self, function: TypeId, method: TypeId) {
        self.entries[function.0 as usize].parameters.push(method);
    }

    pub fn function_methods(&self, function: TypeId) -> &[TypeId] {
        self.parameters(function)
    }

    pub fn method_return_type(&self, method: TypeId) -> TypeId {
        self.parameters(method)[0]
    }

    pub fn method_parameter_types(&self, method: TypeId) -> Vec<TypeId> {
        self.parameters(method)[1..].to_vec()
    }

    pub fn method_parameter_names(&self, method: TypeId) -> Vec<String> {
        match self.kind(method) {
            TypeKind::Method {
                parameter_names, ..
            } => parameter_names.clone(),
            _ => Vec::new(),
        }
    }

    pub fn method_inouts(&self, method: TypeId) -> Vec<bool> {
        match self.kind(method) {
            TypeKind::Method { inouts, .. } => inouts.clone(),
            _ => Vec::new(),
        }
    }

    /// A method is abstract when a generic parameter slot appears anywhere in
    /// its parameter or return types.
    pub fn method_is_abstract(&self, method: TypeId) -> bool {
        self.parameters(method)
            .iter()
            .any(|ty| self.mentions_parameter(*ty))
    }

    fn mentions_parameter(&self, id: TypeId) -> bool {
        match self.kind(id) {
            TypeKind::Parameter { .. } | TypeKind::ParameterType => true,
            _ => self
                .parameters(id)
                .iter()
                .any(|p| self.mentions_parameter(*p)),
        }
    }

    pub fn could_be_called_with(&self, method: TypeId, arguments: &[TypeId]) -> bool {
        let parameters = self.method_parameter_types(method);
        if parameters.len() != arguments.len() {
            return false;
        }
        parameters
            .iter()
            .zip(arguments.iter())
            .all(|(parameter, argument)| self.is_compatible(*parameter, *argument))
    }

    pub fn method_specialisations(&self, method: TypeId) -> &[Specialisation] {
        match self.kind(method) {
            TypeKind::Method {
                specialisations, ..
            } => specialisations,
            _ => &[],
        }
    }

    /// Record a specialisation; the list only ever grows.
    pub fn add_specialisation(&mut self, method: TypeId, specialisation: Specialisation) -> usize {
        match &mut self.entries[method.0 as usize].kind {
            TypeKind::Method {
                specialisations, ..
            } => {
                specialisations.push(specialisation);
                specialisations.len() - 1
            }
            _ => 0,
        }
    }

    pub fn add_empty_specialisation(&mut self, method: TypeId) {
        self.add_specialisation(method, Vec::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> SourceLocation {
        SourceLocation::unknown()
    }

    #[test]
    fn test_integer_names_and_mangles() {
        let mut universe = TypeUniverse::new();
        let mut reporter = Reporter::new();

        let ctor = universe.alloc(TypeKind::IntegerType(64), Vec::new());
        let instance = universe.construct(&mut reporter, &location(), ctor).unwrap();

        assert_eq!(universe.name(instance), "Integer64");
        assert_eq!(universe.mangled_name(instance), "i64");
        assert_eq!(universe.mangled_name(ctor), "u");
        assert!(!reporter.has_errors());
    }

    #[test]
    fn test_compatibility_is_name_based() {
        let mut universe = TypeUniverse::new();
        let mut reporter = Reporter::new();

        let int_ctor = universe.alloc(TypeKind::IntegerType(64), Vec::new());
        let a = universe
            .construct(&mut reporter, &location(), int_ctor)
            .unwrap();
        let b = universe
            .construct(&mut reporter, &location(), int_ctor)
            .unwrap();
        let float_ctor = universe.alloc(TypeKind::FloatType(64), Vec::new());
        let f = universe
            .construct(&mut reporter, &location(), float_ctor)
            .unwrap();

        assert!(universe.is_compatible(a, b));
        assert!(!universe.is_compatible(a, f));
    }

    #[test]
    fn test_parameter_instance_accepts_anything() {
        let mut universe = TypeUniverse::new();
        let mut reporter = Reporter::new();

        let slot = universe.alloc(TypeKind::ParameterType, Vec::new());
        let parameter = universe.construct(&mut reporter, &location(), slot).unwrap();
        let int_ctor = universe.alloc(TypeKind::IntegerType(64), Vec::new());
        let int = universe
            .construct(&mut reporter, &location(), int_ctor)
            .unwrap();

        assert!(universe.is_compatible(parameter, int));
        assert!(!universe.is_compatible(int, parameter));
    }

    #[test]
    fn test_pointer_compatibility_is_element_wise() {
        let mut universe = TypeUniverse::new();
        let mut reporter = Reporter::new();

        let int_ctor = universe.alloc(TypeKind::IntegerType(64), Vec::new());
        let ptr_ctor = universe.alloc(TypeKind::UnsafePointerType, Vec::new());

        let applied_a = universe.apply(ptr_ctor, vec![int_ctor]).unwrap();
        let a = universe
            .construct(&mut reporter, &location(), applied_a)
            .unwrap();
        let applied_b = universe.apply(ptr_ctor, vec![int_ctor]).unwrap();
        let b = universe
            .construct(&mut reporter, &location(), applied_b)
            .unwrap();

        let float_ctor = universe.alloc(TypeKind::FloatType(64), Vec::new());
        let applied_c = universe.apply(ptr_ctor, vec![float_ctor]).unwrap();
        let c = universe
            .construct(&mut reporter, &location(), applied_c)
            .unwrap();

        assert!(universe.is_compatible(a, b));
        assert!(!universe.is_compatible(a, c));
    }

    #[test]
    fn test_record_construction_substitutes_generic_fields() {
        let mut universe = TypeUniverse::new();
        let mut reporter = Reporter::new();

        // type Box{T} with one field of type T
        let slot = universe.alloc(TypeKind::ParameterType, Vec::new());
        let record = universe.alloc(
            TypeKind::RecordType {
                input_parameters: vec![slot],
                field_names: vec!["value".to_string()],
                field_types: vec![slot],
            },
            Vec::new(),
        );

        let int_ctor = universe.alloc(TypeKind::IntegerType(64), Vec::new());
        let applied = universe.apply(record, vec![int_ctor]).unwrap();
        let instance = universe
            .construct(&mut reporter, &location(), applied)
            .unwrap();

        assert_eq!(universe.name(instance), "Record{Integer64}");
        assert_eq!(
            universe.record_field_type(instance, "value").map(|t| universe.name(t)),
            Some("Integer64".to_string())
        );
        assert!(!reporter.has_errors());
    }

    #[test]
    fn test_record_arity_mismatch_reports() {
        let mut universe = TypeUniverse::new();
        let mut reporter = Reporter::new();

        let slot = universe.alloc(TypeKind::ParameterType, Vec::new());
        let record = universe.alloc(
            TypeKind::RecordType {
                input_parameters: vec![slot],
                field_names: vec!["value".to_string()],
                field_types: vec![slot],
            },
            Vec::new(),
        );

        assert_eq!(universe.construct(&mut reporter, &location(), record), None);
        assert!(reporter.has_errors());
    }

    #[test]
    fn test_alias_threads_substitution() {
        let mut universe = TypeUniverse::new();
        let mut reporter = Reporter::new();

        let int_ctor = universe.alloc(TypeKind::IntegerType(64), Vec::new());
        let alias = universe.alloc(
            TypeKind::AliasType {
                alias: int_ctor,
                input_parameters: Vec::new(),
            },
            Vec::new(),
        );

        let instance = universe.construct(&mut reporter, &location(), alias).unwrap();
        assert_eq!(universe.name(instance), "Integer64");
    }

    #[test]
    fn test_method_shape_and_abstractness() {
        let mut universe = TypeUniverse::new();
        let mut reporter = Reporter::new();

        let int_ctor = universe.alloc(TypeKind::IntegerType(64), Vec::new());
        let int = universe
            .construct(&mut reporter, &location(), int_ctor)
            .unwrap();

        let plain = universe.new_method(
            vec![int],
            int,
            vec!["a".to_string()],
            vec![false],
        );
        assert!(!universe.method_is_abstract(plain));
        assert_eq!(universe.mangled_name(plain), "mi64i64");
        assert_eq!(universe.method_return_type(plain), int);

        let slot = universe.alloc(TypeKind::ParameterType, Vec::new());
        let parameter = universe.construct(&mut reporter, &location(), slot).unwrap();
        let generic = universe.new_method(
            vec![parameter],
            parameter,
            vec!["x".to_string()],
            vec![false],
        );
        assert!(universe.method_is_abstract(generic));
    }

    #[test]
    fn test_replace_type_parameters_in_return_type() {
        let mut universe = TypeUniverse::new();
        let mut reporter = Reporter::new();

        let slot = universe.alloc(TypeKind::ParameterType, Vec::new());
        let parameter = universe.construct(&mut reporter, &location(), slot).unwrap();
        let int_ctor = universe.alloc(TypeKind::IntegerType(64), Vec::new());
        let int = universe
            .construct(&mut reporter, &location(), int_ctor)
            .unwrap();

        let replaced = universe
            .replace_type_parameters(parameter, &[(slot, int)])
            .unwrap();
        assert_eq!(replaced, int);

        // a slot the mapping does not cover is an inference failure
        assert_eq!(universe.replace_type_parameters(parameter, &[]), None);
    }

    #[test]
    fn test_specialisations_grow_monotonically() {
        let mut universe = TypeUniverse::new();
        let mut reporter = Reporter::new();

        let slot = universe.alloc(TypeKind::ParameterType, Vec::new());
        let parameter = universe.construct(&mut reporter, &location(), slot).unwrap();
        let method = universe.new_method(
            vec![parameter],
            parameter,
            vec!["x".to_string()],
            vec![false],
        );

        let int_ctor = universe.alloc(TypeKind::IntegerType(64), Vec::new());
        let int = universe
            .construct(&mut reporter, &location(), int_ctor)
            .unwrap();

        assert_eq!(universe.add_specialisation(method, vec![(slot, int)]), 0);
        assert_eq!(universe.add_specialisation(method, vec![(slot, int)]), 1);
        assert_eq!(universe.method_specialisations(method).len(), 2);
    }

    #[test]
    fn test_could_be_called_with() {
        let mut universe = TypeUniverse::new();
        let mut reporter = Reporter::new();

        let int_ctor = universe.alloc(TypeKind::IntegerType(64), Vec::new());
        let int = universe
            .construct(&mut reporter, &location(), int_ctor)
            .unwrap();
        let bool_ctor = universe.alloc(TypeKind::BooleanType, Vec::new());
        let boolean = universe
            .construct(&mut reporter, &location(), bool_ctor)
            .unwrap();

        let method = universe.new_method(
            vec![int, int],
            boolean,
            vec!["a".to_string(), "b".to_string()],
            vec![false, false],
        );

        assert!(universe.could_be_called_with(method, &[int, int]));
        assert!(!universe.could_be_called_with(method, &[int, boolean]));
        assert!(!universe.could_be_called_with(method, &[int]));
    }

    #[test]
    fn test_tuple_is_positionally_named_record() {
        let mut universe = TypeUniverse::new();
        let mut reporter = Reporter::new();

        let int_ctor = universe.alloc(TypeKind::IntegerType(64), Vec::new());
        let int = universe
            .construct(&mut reporter, &location(), int_ctor)
            .unwrap();
        let float_ctor = universe.alloc(TypeKind::FloatType(64), Vec::new());
        let float = universe
            .construct(&mut reporter, &location(), float_ctor)
            .unwrap();

        let tuple = universe.tuple(vec![int, float]);
        assert_eq!(universe.record_field_type(tuple, "0"), Some(int));
        assert_eq!(universe.record_field_type(tuple, "1"), Some(float));
        assert_eq!(universe.mangled_name(tuple), "ri64f64");
    }
}
