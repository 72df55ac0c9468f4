// End-to-end scenarios through lex -> parse -> symbols -> types.

use acorn_ast::*;
use acorn_compiler::codegen::mangle_method;
use acorn_compiler::diagnostics::DiagnosticKind;
use acorn_compiler::typesystem::TypeKind;
use acorn_compiler::Compilation;

fn compile(source: &str) -> Compilation {
    Compilation::compile_source(source, "test.acorn")
}

fn top_level(compilation: &Compilation) -> &[Node] {
    let file = compilation.file.as_ref().expect("source file");
    match &*file.code {
        Node::Block(block) => &block.expressions,
        other => panic!("expected a block, got {}", other.kind()),
    }
}

fn symbol_type_name(compilation: &Compilation, name: &str) -> String {
    let symbol = compilation
        .table
        .find(compilation.table.root(), name)
        .unwrap_or_else(|| panic!("no symbol {}", name));
    let ty = compilation
        .table
        .symbol(symbol)
        .ty
        .unwrap_or_else(|| panic!("symbol {} has no type", name));
    compilation.universe.name(ty)
}

#[test]
fn test_typed_let_binding() {
    let compilation = compile("let x as Int64 = 1");
    assert!(compilation.succeeded(), "{:?}", compilation.reporter.diagnostics());

    assert_eq!(symbol_type_name(&compilation, "x"), "Integer64");

    let expressions = top_level(&compilation);
    let Node::Let(binding) = &expressions[0] else {
        panic!("expected a let");
    };
    let Node::Assignment(assignment) = &*binding.assignment else {
        panic!("expected an assignment");
    };
    let rhs = assignment.rhs.as_deref().expect("rhs");
    let rhs_type = rhs.type_id().expect("typed rhs");
    assert_eq!(compilation.universe.name(rhs_type), "Integer64");
    assert!(binding.has_type());
}

#[test]
fn test_incompatible_assignment_reports_mismatch() {
    let compilation = compile("let x as Int64 = 1.5");
    assert!(!compilation.succeeded());
    assert!(compilation
        .reporter
        .diagnostics()
        .iter()
        .any(|d| d.kind == DiagnosticKind::TypeMismatch));
}

#[test]
fn test_function_definition_builds_method() {
    let compilation = compile("def f(a as Int64) as Int64\n    return a\nend");
    assert!(compilation.succeeded(), "{:?}", compilation.reporter.diagnostics());

    let f = compilation
        .table
        .find(compilation.table.root(), "f")
        .expect("function symbol");
    let function = compilation.table.symbol(f).ty.expect("function type");
    assert!(matches!(
        compilation.universe.kind(function),
        TypeKind::Function
    ));

    let methods = compilation.universe.function_methods(function);
    assert_eq!(methods.len(), 1);

    let method = methods[0];
    let parameters = compilation.universe.method_parameter_types(method);
    assert_eq!(parameters.len(), 1);
    assert_eq!(compilation.universe.name(parameters[0]), "Integer64");
    assert_eq!(
        compilation
            .universe
            .name(compilation.universe.method_return_type(method)),
        "Integer64"
    );

    assert_eq!(compilation.universe.mangled_name(method), "mi64i64");
    assert!(mangle_method("f", &compilation.universe, method).starts_with("_A_f_"));

    // the method symbol was renamed to its mangled key
    let function_scope = compilation.table.symbol(f).scope.expect("function scope");
    assert!(compilation.table.find(function_scope, "mi64i64").is_some());
}

#[test]
fn test_generic_method_specialisation() {
    let source = "def id{T}(x as T) as T\n    return x\nend\nlet y = id(1)";
    let compilation = compile(source);
    assert!(compilation.succeeded(), "{:?}", compilation.reporter.diagnostics());

    let id = compilation
        .table
        .find(compilation.table.root(), "id")
        .expect("function symbol");
    let function = compilation.table.symbol(id).ty.expect("function type");
    let method = compilation.universe.function_methods(function)[0];

    assert!(compilation.universe.method_is_abstract(method));
    assert_eq!(compilation.universe.method_specialisations(method).len(), 1);

    let expressions = top_level(&compilation);
    let Node::Let(binding) = &expressions[1] else {
        panic!("expected a let");
    };
    let Node::Assignment(assignment) = &*binding.assignment else {
        panic!("expected an assignment");
    };
    let Some(Node::Call(call)) = assignment.rhs.as_deref() else {
        panic!("expected a call");
    };

    assert_eq!(call.method_index, Some(0));
    assert_eq!(call.specialisation_index, Some(0));
    assert_eq!(call.inferred_type_parameters.len(), 1);

    let call_type = call.type_id().expect("typed call");
    assert_eq!(compilation.universe.name(call_type), "Integer64");
    assert_eq!(symbol_type_name(&compilation, "y"), "Integer64");

    // the specialisation records the same binding the call inferred
    let specialisation = &compilation.universe.method_specialisations(method)[0];
    assert_eq!(specialisation.len(), 1);
    assert_eq!(
        compilation.universe.name(specialisation[0].1),
        "Integer64"
    );
}

#[test]
fn test_record_constructor_call() {
    let source = "type Point\n    x as Int64\n    y as Int64\nend\nlet p = Point.new(1, 2)";
    let compilation = compile(source);
    assert!(compilation.succeeded(), "{:?}", compilation.reporter.diagnostics());

    assert_eq!(
        symbol_type_name(&compilation, "p"),
        "Record{Integer64, Integer64}"
    );

    let expressions = top_level(&compilation);
    let Node::Let(binding) = &expressions[1] else {
        panic!("expected a let");
    };
    let Node::Assignment(assignment) = &*binding.assignment else {
        panic!("expected an assignment");
    };
    let Some(Node::Call(call)) = assignment.rhs.as_deref() else {
        panic!("expected a call");
    };

    // the selector resolved to the constructor
    let operand_type = call.operand.type_id().expect("typed selector");
    assert!(matches!(
        compilation.universe.kind(operand_type),
        TypeKind::RecordType { .. }
    ));
}

#[test]
fn test_record_field_selection() {
    let source = "type Point\n    x as Int64\n    y as Int64\nend\n\
                  let p = Point.new(1, 2)\nlet x = p.x";
    let compilation = compile(source);
    assert!(compilation.succeeded(), "{:?}", compilation.reporter.diagnostics());
    assert_eq!(symbol_type_name(&compilation, "x"), "Integer64");
}

#[test]
fn test_redefinition_halts_compilation() {
    let compilation = compile("let a = 1\nlet a = 2");
    assert!(!compilation.succeeded());

    let redefinition = compilation
        .reporter
        .diagnostics()
        .iter()
        .find(|d| d.kind == DiagnosticKind::Redefined)
        .expect("redefinition diagnostic");
    assert_eq!(redefinition.location.line_number, 2);
}

#[test]
fn test_no_matching_method_lists_candidates() {
    let source = "def f(a as Int64) as Int64\n    return a\nend\nf('hi')";
    let compilation = compile(source);
    assert!(!compilation.succeeded());

    let undefined = compilation
        .reporter
        .diagnostics()
        .iter()
        .find(|d| d.kind == DiagnosticKind::Undefined)
        .expect("undefined diagnostic");
    assert!(undefined.message.contains("Available methods"));
    assert!(undefined.message.contains("1 methods."));
}

#[test]
fn test_overload_selection_is_first_match() {
    let source = "def g(a as Int64) as Int64\n    return a\nend\n\
                  def g(a as Float64) as Float64\n    return a\nend\n\
                  g(1)";
    let compilation = compile(source);
    assert!(compilation.succeeded(), "{:?}", compilation.reporter.diagnostics());

    let expressions = top_level(&compilation);
    let Node::Call(call) = &expressions[2] else {
        panic!("expected a call");
    };
    assert_eq!(call.method_index, Some(0));
}

#[test]
fn test_generic_declared_first_wins() {
    let source = "def h{T}(x as T) as T\n    return x\nend\n\
                  def h(x as Int64) as Int64\n    return x\nend\n\
                  h(1)";
    let compilation = compile(source);
    assert!(compilation.succeeded(), "{:?}", compilation.reporter.diagnostics());

    let expressions = top_level(&compilation);
    let Node::Call(call) = &expressions[2] else {
        panic!("expected a call");
    };
    // declaration order decides; the generic method is a valid first match
    assert_eq!(call.method_index, Some(0));
    assert_eq!(call.specialisation_index, Some(0));
}

#[test]
fn test_keyword_arguments_match_parameter_names() {
    let source = "def area(w as Int64, h as Int64) as Int64\n    return w\nend\n\
                  area(h: 2, w: 1)";
    let compilation = compile(source);
    assert!(compilation.succeeded(), "{:?}", compilation.reporter.diagnostics());

    let expressions = top_level(&compilation);
    let Node::Call(call) = &expressions[1] else {
        panic!("expected a call");
    };
    assert_eq!(call.method_index, Some(0));
}

#[test]
fn test_inout_parameters_recorded_on_method() {
    let source = "def bump(inout x as Int64) as Int64\n    return x\nend";
    let compilation = compile(source);
    assert!(compilation.succeeded(), "{:?}", compilation.reporter.diagnostics());

    let bump = compilation
        .table
        .find(compilation.table.root(), "bump")
        .expect("function symbol");
    let function = compilation.table.symbol(bump).ty.expect("function type");
    let method = compilation.universe.function_methods(function)[0];
    assert_eq!(compilation.universe.method_inouts(method), vec![true]);
}

#[test]
fn test_duplicate_signature_reports_too_many_defined() {
    let source = "def f(a as Int64) as Int64\n    return a\nend\n\
                  def f(a as Int64) as Int64\n    return a\nend";
    let compilation = compile(source);
    assert!(!compilation.succeeded());
    assert!(compilation
        .reporter
        .diagnostics()
        .iter()
        .any(|d| d.kind == DiagnosticKind::TooManyDefined));
}

#[test]
fn test_alias_type_declaration() {
    let source = "type Id as Int64\nlet x as Id = 1";
    let compilation = compile(source);
    assert!(compilation.succeeded(), "{:?}", compilation.reporter.diagnostics());
    assert_eq!(symbol_type_name(&compilation, "x"), "Integer64");
}

#[test]
fn test_list_literal_types_as_array() {
    let compilation = compile("let xs = [1, 2, 3]");
    assert!(compilation.succeeded(), "{:?}", compilation.reporter.diagnostics());
    // Array{Int64} is a record of a length and an element pointer
    assert_eq!(
        symbol_type_name(&compilation, "xs"),
        "Record{Integer64, UnsafePointer{Integer64}}"
    );
}

#[test]
fn test_mixed_list_reports_inference_error() {
    let compilation = compile("let xs = [1, 'two']");
    assert!(!compilation.succeeded());
    assert!(compilation
        .reporter
        .diagnostics()
        .iter()
        .any(|d| d.kind == DiagnosticKind::TypeInference));
}

#[test]
fn test_tuple_and_positional_field() {
    let source = "let pair = (1, 2.5)\nlet first = pair.0";
    let compilation = compile(source);
    assert!(compilation.succeeded(), "{:?}", compilation.reporter.diagnostics());
    assert_eq!(symbol_type_name(&compilation, "first"), "Integer64");
}

#[test]
fn test_return_type_mismatch() {
    let source = "def f(a as Int64) as Int64\n    return 1.5\nend";
    let compilation = compile(source);
    assert!(!compilation.succeeded());
    assert!(compilation
        .reporter
        .diagnostics()
        .iter()
        .any(|d| d.kind == DiagnosticKind::TypeMismatch));
}

#[test]
fn test_undefined_name_reports_with_suggestion() {
    let source = "let count = 1\nlet x = cuont";
    let compilation = compile(source);
    assert!(!compilation.succeeded());

    let undefined = compilation
        .reporter
        .diagnostics()
        .iter()
        .find(|d| d.kind == DiagnosticKind::Undefined)
        .expect("undefined diagnostic");
    assert!(undefined.message.contains("Did you mean 'count'?"));
}

#[test]
fn test_module_member_access() {
    let source = "module Math\n    let pi = 3.14\nend\nlet x = Math.pi";
    let compilation = compile(source);
    assert!(compilation.succeeded(), "{:?}", compilation.reporter.diagnostics());
    assert_eq!(symbol_type_name(&compilation, "x"), "Float64");
}

#[test]
fn test_builtin_operators_resolve() {
    let compilation = compile("let x = 1 + 2\nlet y = 1.5 + 2.5\nlet b = 1 < 2");
    assert!(compilation.succeeded(), "{:?}", compilation.reporter.diagnostics());
    assert_eq!(symbol_type_name(&compilation, "x"), "Integer64");
    assert_eq!(symbol_type_name(&compilation, "y"), "Float64");
    assert_eq!(symbol_type_name(&compilation, "b"), "Boolean");

    // + resolves to the float overload by declaration order, not the first
    let expressions = top_level(&compilation);
    let Node::Let(binding) = &expressions[1] else {
        panic!("expected a let");
    };
    let Node::Assignment(assignment) = &*binding.assignment else {
        panic!("expected an assignment");
    };
    let Some(Node::Call(call)) = assignment.rhs.as_deref() else {
        panic!("expected a call");
    };
    assert_eq!(call.method_index, Some(2));
}

#[test]
fn test_if_takes_true_branch_type() {
    let source = "def f(c as Bool) as Int64\n    return if c\n        1\n    else\n        2\n    end\nend";
    let compilation = compile(source);
    assert!(compilation.succeeded(), "{:?}", compilation.reporter.diagnostics());
}

#[test]
fn test_cast_takes_target_type() {
    let compilation = compile("let x = 1 as Float64");
    assert!(compilation.succeeded(), "{:?}", compilation.reporter.diagnostics());
    assert_eq!(symbol_type_name(&compilation, "x"), "Float64");
}

#[test]
fn test_ccall_takes_declared_return_type() {
    let source = "let r = ccall getpid() as Int32";
    let compilation = compile(source);
    assert!(compilation.succeeded(), "{:?}", compilation.reporter.diagnostics());
    assert_eq!(symbol_type_name(&compilation, "r"), "Integer32");
}

#[test]
fn test_spawn_copies_call_type() {
    let source = "def f() as Int64\n    return 1\nend\nlet x = spawn f()";
    let compilation = compile(source);
    assert!(compilation.succeeded(), "{:?}", compilation.reporter.diagnostics());
    assert_eq!(symbol_type_name(&compilation, "x"), "Integer64");
}

#[test]
fn test_find_method_is_deterministic() {
    let source = "def g(a as Int64) as Int64\n    return a\nend\n\
                  def g(a as Float64) as Float64\n    return a\nend\n\
                  g(1)";

    let first = compile(source);
    let second = compile(source);

    let index_of = |compilation: &Compilation| -> Option<usize> {
        let expressions = top_level(compilation);
        match &expressions[2] {
            Node::Call(call) => call.method_index,
            _ => None,
        }
    };

    assert_eq!(index_of(&first), index_of(&second));
}

#[test]
fn test_symbol_builder_is_deterministic() {
    use acorn_compiler::{Builder, SymbolTable};
    use acorn_lexer::Lexer;
    use acorn_parser::Parser;

    let source = "def f(a as Int64) as Int64\n    return a\nend\nlet x = 1";

    let names = |source: &str| -> Vec<String> {
        let mut ids = NodeCounter::new();
        let lexer = Lexer::new(source, "test.acorn");
        let mut parser = Parser::new(lexer, &mut ids);
        let file = parser.parse("test.acorn").expect("parse");

        let mut table = SymbolTable::new();
        let mut builder = Builder::new(&mut table);
        builder.build_source_file(&file);
        assert!(!builder.has_errors());

        table
            .symbols_in(table.root())
            .into_iter()
            .map(|id| table.symbol(id).name.clone())
            .collect()
    };

    assert_eq!(names(source), names(source));
}

#[test]
fn test_checker_is_idempotent() {
    use acorn_compiler::{builtins, Builder, SymbolTable, TypeChecker, TypeUniverse};
    use acorn_lexer::Lexer;
    use acorn_parser::Parser;

    let source = "def id{T}(x as T) as T\n    return x\nend\nlet y = id(1)";

    let mut ids = NodeCounter::new();
    let lexer = Lexer::new(source, "test.acorn");
    let mut parser = Parser::new(lexer, &mut ids);
    let mut file = parser.parse("test.acorn").expect("parse");

    let mut table = SymbolTable::new();
    let mut universe = TypeUniverse::new();
    builtins::populate(&mut table, &mut universe);

    let mut builder = Builder::new(&mut table);
    builder.build_source_file(&file);
    assert!(!builder.has_errors());

    let mut checker = TypeChecker::new(&mut table, &mut universe);
    checker.check_source_file(&mut file);
    assert!(!checker.has_errors());

    let id = table.find(table.root(), "id").expect("id symbol");
    let function = table.symbol(id).ty.expect("function type");
    let method = universe.function_methods(function)[0];
    let specialisations_before = universe.method_specialisations(method).len();

    // a second run over the already-typed tree is a no-op
    let mut second = TypeChecker::new(&mut table, &mut universe);
    second.check_source_file(&mut file);
    assert!(!second.has_errors());
    assert_eq!(
        universe.method_specialisations(method).len(),
        specialisations_before
    );
}
