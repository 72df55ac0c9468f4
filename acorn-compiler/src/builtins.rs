// Builtin installation: the type constructors, values, and operator
// functions available in every root scope before user code is checked.

use acorn_ast::TypeId;
use acorn_diagnostics::{Reporter, SourceLocation};

use crate::symboltable::{Symbol, SymbolId, SymbolTable};
use crate::typesystem::types::{TypeKind, TypeUniverse};

struct Installer<'a> {
    table: &'a mut SymbolTable,
    universe: &'a mut TypeUniverse,
    reporter: Reporter,
    location: SourceLocation,
}

impl<'a> Installer<'a> {
    fn add_type_constructor(&mut self, name: &str, kind: TypeKind) -> TypeId {
        let constructor = self.universe.alloc(kind, Vec::new());
        let mut symbol = Symbol::new(name, true);
        symbol.ty = Some(constructor);
        let root = self.table.root();
        self.table
            .insert(&mut self.reporter, &self.location, root, symbol);
        constructor
    }

    fn add_value(&mut self, name: &str, ty: TypeId) {
        let mut symbol = Symbol::new(name, true);
        symbol.ty = Some(ty);
        let root = self.table.root();
        self.table
            .insert(&mut self.reporter, &self.location, root, symbol);
    }

    fn add_function(&mut self, name: &str) -> (SymbolId, TypeId) {
        let function = self.universe.new_function();
        let mut symbol = Symbol::new(name, true);
        symbol.ty = Some(function);
        let root = self.table.root();
        let id = self
            .table
            .insert(&mut self.reporter, &self.location, root, symbol);
        (id, function)
    }

    fn add_method(
        &mut self,
        function: (SymbolId, TypeId),
        parameter_types: Vec<TypeId>,
        return_type: TypeId,
    ) {
        let names = ["a", "b", "c", "d"];
        let parameter_names: Vec<String> = parameter_types
            .iter()
            .enumerate()
            .map(|(index, _)| names[index % names.len()].to_string())
            .collect();
        let inouts = vec![false; parameter_types.len()];

        let method = self
            .universe
            .new_method(parameter_types, return_type, parameter_names, inouts);

        if !self.universe.method_is_abstract(method) {
            self.universe.add_empty_specialisation(method);
        }

        self.universe.add_method(function.1, method);

        let scope = self.table.scope_of(function.0);
        let mut symbol = Symbol::new(&self.universe.mangled_name(method), true);
        symbol.ty = Some(method);
        self.table
            .insert(&mut self.reporter, &self.location, scope, symbol);
    }
}

/// Fill the root scope with the language's builtins. Called once per
/// compilation before the symbol builder runs.
pub fn populate(table: &mut SymbolTable, universe: &mut TypeUniverse) {
    let mut installer = Installer {
        table,
        universe,
        reporter: Reporter::new(),
        location: SourceLocation::new("<builtin>".to_string(), String::new(), 0, 0),
    };

    // type constructors
    installer.add_type_constructor("Void", TypeKind::VoidType);
    installer.add_type_constructor("Bool", TypeKind::BooleanType);
    for bits in [8u32, 16, 32, 64, 128] {
        installer.add_type_constructor(&format!("Int{}", bits), TypeKind::IntegerType(bits));
        installer.add_type_constructor(
            &format!("UInt{}", bits),
            TypeKind::UnsignedIntegerType(bits),
        );
    }
    let mut uint8_ctor = None;
    if let Some(symbol) = installer.table.find(installer.table.root(), "UInt8") {
        uint8_ctor = installer.table.symbol(symbol).ty;
    }
    let int64_ctor = match installer.table.find(installer.table.root(), "Int64") {
        Some(symbol) => installer.table.symbol(symbol).ty,
        None => None,
    };
    for bits in [16u32, 32, 64, 128] {
        installer.add_type_constructor(&format!("Float{}", bits), TypeKind::FloatType(bits));
    }
    let pointer_ctor = installer.add_type_constructor("UnsafePointer", TypeKind::UnsafePointerType);
    installer.add_type_constructor("Function", TypeKind::FunctionType);
    installer.add_type_constructor("Method", TypeKind::MethodType);
    installer.add_type_constructor("Tuple", TypeKind::TupleType);
    installer.add_type_constructor("Union", TypeKind::UnionType);
    installer.add_type_constructor("Type", TypeKind::TypeDescriptionType);

    // shared instances for the builtin signatures
    let void = installer.universe.alloc(TypeKind::Void, Vec::new());
    let boolean = installer.universe.alloc(TypeKind::Boolean, Vec::new());
    let int64 = installer.universe.alloc(TypeKind::Integer(64), Vec::new());
    let uint64 = installer
        .universe
        .alloc(TypeKind::UnsignedInteger(64), Vec::new());
    let float64 = installer.universe.alloc(TypeKind::Float(64), Vec::new());

    // values
    installer.add_value("Nothing", void);
    installer.add_value("True", boolean);
    installer.add_value("False", boolean);

    // arithmetic
    let addition = installer.add_function("+");
    installer.add_method(addition, vec![int64, int64], int64);
    installer.add_method(addition, vec![uint64, uint64], uint64);
    installer.add_method(addition, vec![float64, float64], float64);

    let subtraction = installer.add_function("-");
    installer.add_method(subtraction, vec![int64, int64], int64);
    installer.add_method(subtraction, vec![float64, float64], float64);
    installer.add_method(subtraction, vec![int64], int64);
    installer.add_method(subtraction, vec![float64], float64);

    let multiplication = installer.add_function("*");
    installer.add_method(multiplication, vec![int64, int64], int64);
    installer.add_method(multiplication, vec![float64, float64], float64);

    let division = installer.add_function("/");
    installer.add_method(division, vec![int64, int64], int64);
    installer.add_method(division, vec![float64, float64], float64);

    let modulo = installer.add_function("%");
    installer.add_method(modulo, vec![int64, int64], int64);

    // comparison
    let equality = installer.add_function("==");
    installer.add_method(equality, vec![boolean, boolean], boolean);
    installer.add_method(equality, vec![int64, int64], boolean);
    installer.add_method(equality, vec![uint64, uint64], boolean);

    let inequality = installer.add_function("!=");
    installer.add_method(inequality, vec![boolean, boolean], boolean);
    installer.add_method(inequality, vec![int64, int64], boolean);

    for name in ["<", "<=", ">", ">="] {
        let comparison = installer.add_function(name);
        installer.add_method(comparison, vec![int64, int64], boolean);
        installer.add_method(comparison, vec![float64, float64], boolean);
    }

    // logic
    let negation = installer.add_function("not");
    installer.add_method(negation, vec![boolean], boolean);

    let conjunction = installer.add_function("and");
    installer.add_method(conjunction, vec![boolean, boolean], boolean);

    let disjunction = installer.add_function("or");
    installer.add_method(disjunction, vec![boolean, boolean], boolean);

    // conversions
    let to_integer = installer.add_function("to_integer");
    installer.add_method(to_integer, vec![float64], int64);

    let to_float = installer.add_function("to_float");
    installer.add_method(to_float, vec![int64], float64);

    // pointer indexing
    let getindex = installer.add_function("getindex");
    let slot = installer
        .universe
        .alloc(TypeKind::ParameterType, Vec::new());
    let element = installer
        .universe
        .alloc(TypeKind::Parameter { constructor: slot }, Vec::new());
    let pointer = installer
        .universe
        .alloc(TypeKind::UnsafePointer, vec![element]);
    installer.add_method(getindex, vec![pointer, int64], element);

    let setindex = installer.add_function("setindex");
    let slot = installer
        .universe
        .alloc(TypeKind::ParameterType, Vec::new());
    let element = installer
        .universe
        .alloc(TypeKind::Parameter { constructor: slot }, Vec::new());
    let pointer = installer
        .universe
        .alloc(TypeKind::UnsafePointer, vec![element]);
    installer.add_method(setindex, vec![pointer, int64, element], void);

    // Array{T}: a length and a pointer to the elements
    if let Some(int64_ctor) = int64_ctor {
        let array_parameter = installer
            .universe
            .alloc(TypeKind::ParameterType, Vec::new());
        let element_pointer = installer
            .universe
            .apply(pointer_ctor, vec![array_parameter])
            .unwrap_or(pointer_ctor);
        let array = installer.universe.alloc(
            TypeKind::RecordType {
                input_parameters: vec![array_parameter],
                field_names: vec!["length".to_string(), "elements".to_string()],
                field_types: vec![int64_ctor, element_pointer],
            },
            Vec::new(),
        );
        let mut symbol = Symbol::new("Array", true);
        symbol.ty = Some(array);
        let root = installer.table.root();
        installer
            .table
            .insert(&mut installer.reporter, &installer.location, root, symbol);

        // String is a byte array
        if let Some(uint8_ctor) = uint8_ctor {
            if let Some(applied) = installer.universe.apply(array, vec![uint8_ctor]) {
                let string_alias = installer.universe.alloc(
                    TypeKind::AliasType {
                        alias: applied,
                        input_parameters: Vec::new(),
                    },
                    Vec::new(),
                );
                let mut symbol = Symbol::new("String", true);
                symbol.ty = Some(string_alias);
                let root = installer.table.root();
                installer
                    .table
                    .insert(&mut installer.reporter, &installer.location, root, symbol);
            }
        }
    }

    debug_assert!(!installer.reporter.has_errors());
}
