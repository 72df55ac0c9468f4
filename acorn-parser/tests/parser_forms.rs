// Parser integration tests: one per concrete form of the grammar.

use acorn_ast::*;
use acorn_lexer::Lexer;
use acorn_parser::Parser;

fn parse(source: &str) -> SourceFile {
    let (file, has_errors) = try_parse(source);
    assert!(!has_errors, "unexpected parse errors for: {}", source);
    file.expect("expected a source file")
}

fn try_parse(source: &str) -> (Option<SourceFile>, bool) {
    let mut ids = NodeCounter::new();
    let lexer = Lexer::new(source, "test.acorn");
    let mut parser = Parser::new(lexer, &mut ids);
    let file = parser.parse("test.acorn");
    let has_errors = parser.has_errors();
    (file, has_errors)
}

fn top_level(source: &str) -> Vec<Node> {
    let file = parse(source);
    match *file.code {
        Node::Block(block) => block.expressions,
        other => panic!("expected a block, got {}", other.kind()),
    }
}

#[test]
fn test_let_statement() {
    let expressions = top_level("let x as Int64 = 1");
    assert_eq!(expressions.len(), 1);

    let Node::Let(binding) = &expressions[0] else {
        panic!("expected a let");
    };
    let Node::Assignment(assignment) = &*binding.assignment else {
        panic!("expected an assignment");
    };
    assert_eq!(assignment.lhs.name.value, "x");
    assert_eq!(
        assignment.lhs.given_type.as_ref().map(|t| t.name.value.as_str()),
        Some("Int64")
    );
    assert!(matches!(assignment.rhs.as_deref(), Some(Node::Int(_))));
}

#[test]
fn test_builtin_let_has_no_rhs() {
    let expressions = top_level("let builtin x as Int64");
    let Node::Let(binding) = &expressions[0] else {
        panic!("expected a let");
    };
    let Node::Assignment(assignment) = &*binding.assignment else {
        panic!("expected an assignment");
    };
    assert!(assignment.lhs.builtin);
    assert!(assignment.rhs.is_none());
}

#[test]
fn test_def_instance() {
    let expressions = top_level("def f(a as Int64) as Int64\n    return a\nend");
    let Node::Def(def) = &expressions[0] else {
        panic!("expected a def");
    };
    let instance = &def.instances[0];
    assert_eq!(instance.name.name.value, "f");
    assert!(!instance.builtin);
    assert_eq!(instance.parameters.len(), 1);
    assert_eq!(instance.parameters[0].name.value, "a");
    assert!(!instance.parameters[0].inout);
    assert!(instance.return_type.is_some());
    assert!(instance.body.is_some());
}

#[test]
fn test_generic_def_and_inout() {
    let expressions = top_level("def swap{T}(inout a as T, inout b as T) as Void\n    return a\nend");
    let Node::Def(def) = &expressions[0] else {
        panic!("expected a def");
    };
    let instance = &def.instances[0];
    assert_eq!(instance.name.parameters.len(), 1);
    assert_eq!(instance.name.parameters[0].value, "T");
    assert!(instance.parameters.iter().all(|parameter| parameter.inout));
}

#[test]
fn test_builtin_def_requires_return_type_and_no_body() {
    let expressions = top_level("def builtin alloc(n as Int64) as UnsafePointer{Int64}");
    let Node::Def(def) = &expressions[0] else {
        panic!("expected a def");
    };
    let instance = &def.instances[0];
    assert!(instance.builtin);
    assert!(instance.body.is_none());
    let return_type = instance.return_type.as_ref().expect("return type");
    assert_eq!(return_type.name.value, "UnsafePointer");
    assert_eq!(return_type.parameters.len(), 1);
}

#[test]
fn test_operator_def() {
    let expressions = top_level("def +(a as Int64, b as Int64) as Int64\n    return a\nend");
    let Node::Def(def) = &expressions[0] else {
        panic!("expected a def");
    };
    assert_eq!(def.instances[0].name.name.value, "+");
}

#[test]
fn test_type_record() {
    let expressions = top_level("type Point\n    x as Int64\n    y as Int64\nend");
    let Node::TypeDecl(decl) = &expressions[0] else {
        panic!("expected a type declaration");
    };
    assert_eq!(decl.name.name.value, "Point");
    assert!(!decl.builtin);
    assert!(decl.alias.is_none());
    let names: Vec<&str> = decl.field_names.iter().map(|n| n.value.as_str()).collect();
    assert_eq!(names, vec!["x", "y"]);
    assert_eq!(decl.field_types.len(), 2);
}

#[test]
fn test_type_alias_and_builtin() {
    let expressions = top_level("type builtin Int64\ntype Id as Int64");
    let Node::TypeDecl(builtin) = &expressions[0] else {
        panic!("expected a type declaration");
    };
    assert!(builtin.builtin);

    let Node::TypeDecl(alias) = &expressions[1] else {
        panic!("expected a type declaration");
    };
    assert_eq!(alias.alias.as_ref().map(|t| t.name.value.as_str()), Some("Int64"));
}

#[test]
fn test_generic_type_parameters() {
    let expressions = top_level("type Box{T}\n    value as T\nend");
    let Node::TypeDecl(decl) = &expressions[0] else {
        panic!("expected a type declaration");
    };
    assert_eq!(decl.name.parameters.len(), 1);
    assert_eq!(decl.name.parameters[0].value, "T");
}

#[test]
fn test_if_else_chain() {
    let source = "if a\n    1\nelse if b\n    2\nelse\n    3\nend";
    let expressions = top_level(source);
    let Node::If(node) = &expressions[0] else {
        panic!("expected an if");
    };
    assert!(matches!(&*node.true_case, Node::Block(_)));
    let Some(false_case) = &node.false_case else {
        panic!("expected an else branch");
    };
    let Node::If(nested) = &**false_case else {
        panic!("expected a nested if");
    };
    assert!(nested.false_case.is_some());
}

#[test]
fn test_if_let_condition() {
    let expressions = top_level("if let v = f()\n    v\nend");
    let Node::If(node) = &expressions[0] else {
        panic!("expected an if");
    };
    let Node::Assignment(assignment) = &*node.condition else {
        panic!("expected a binding condition");
    };
    assert_eq!(assignment.lhs.name.value, "v");
}

#[test]
fn test_while_loop() {
    let expressions = top_level("while x\n    y\nend");
    let Node::While(node) = &expressions[0] else {
        panic!("expected a while");
    };
    assert!(matches!(&*node.body, Node::Block(_)));
}

#[test]
fn test_for_desugars_to_iterator_protocol() {
    let expressions = top_level("for item in things\n    item\nend");
    let Node::Block(block) = &expressions[0] else {
        panic!("expected the desugared block");
    };
    assert_eq!(block.expressions.len(), 3);
    assert!(matches!(block.expressions[0], Node::Let(_)));
    assert!(matches!(block.expressions[1], Node::Let(_)));

    let Node::While(while_node) = &block.expressions[2] else {
        panic!("expected the loop");
    };

    // condition is not(done(iter, state))
    let Node::Call(not_call) = &*while_node.condition else {
        panic!("expected a call condition");
    };
    let Some(name) = not_call.operand.as_name() else {
        panic!("expected a named operand");
    };
    assert_eq!(name.value, "not");

    // the body rebinds the loop variable from next(iter, state)
    let Node::Block(body) = &*while_node.body else {
        panic!("expected a body block");
    };
    let Node::Let(item) = &body.expressions[0] else {
        panic!("expected the item binding");
    };
    let Node::Assignment(assignment) = &*item.assignment else {
        panic!("expected an assignment");
    };
    assert_eq!(assignment.lhs.name.value, "item");
    let Some(Node::Call(next_call)) = assignment.rhs.as_deref() else {
        panic!("expected a call");
    };
    assert_eq!(next_call.operand.as_name().map(|n| n.value.as_str()), Some("next"));
    assert_eq!(next_call.positional_arguments.len(), 2);
}

#[test]
fn test_switch_with_cases_and_default() {
    let source = "switch x\ncase 1\n    a\ncase 2\n    b\ndefault\n    c\nend";
    let expressions = top_level(source);
    let Node::Switch(node) = &expressions[0] else {
        panic!("expected a switch");
    };
    assert_eq!(node.cases.len(), 2);
    assert!(node.default_case.is_some());
}

#[test]
fn test_case_using_binding() {
    let source = "switch x\ncase 1 using let v\n    v\nend";
    let expressions = top_level(source);
    let Node::Switch(node) = &expressions[0] else {
        panic!("expected a switch");
    };
    let Node::Case(case) = &node.cases[0] else {
        panic!("expected a case");
    };
    assert!(matches!(case.assignment.as_deref(), Some(Node::VarDecl(_))));
}

#[test]
fn test_call_with_keyword_arguments() {
    let expressions = top_level("f(1, size: 2, name: 3)");
    let Node::Call(call) = &expressions[0] else {
        panic!("expected a call");
    };
    assert_eq!(call.positional_arguments.len(), 1);
    let keywords: Vec<&str> = call.keyword_arguments.keys().map(|k| k.as_str()).collect();
    assert_eq!(keywords, vec!["size", "name"]);
}

#[test]
fn test_keyword_argument_requires_name() {
    let (_, has_errors) = try_parse("f(1: 2)");
    assert!(has_errors);
}

#[test]
fn test_index_desugars_to_getindex() {
    let expressions = top_level("a[0]");
    let Node::Call(call) = &expressions[0] else {
        panic!("expected a call");
    };
    assert_eq!(call.operand.as_name().map(|n| n.value.as_str()), Some("getindex"));
    assert_eq!(call.positional_arguments.len(), 2);
}

#[test]
fn test_index_assignment_desugars_to_setindex() {
    let expressions = top_level("a[0] = 1");
    let Node::Call(call) = &expressions[0] else {
        panic!("expected a call");
    };
    assert_eq!(call.operand.as_name().map(|n| n.value.as_str()), Some("setindex"));
    assert_eq!(call.positional_arguments.len(), 3);
}

#[test]
fn test_binary_operators_build_calls() {
    let expressions = top_level("a + b");
    let Node::Call(call) = &expressions[0] else {
        panic!("expected a call");
    };
    assert_eq!(call.operand.as_name().map(|n| n.value.as_str()), Some("+"));
    assert_eq!(call.positional_arguments.len(), 2);
}

#[test]
fn test_additive_operators_bind_tighter() {
    // only + and - carry precedence; every other operator associates
    // around them
    let expressions = top_level("a - b * c");
    let Node::Call(call) = &expressions[0] else {
        panic!("expected a call");
    };
    assert_eq!(call.operand.as_name().map(|n| n.value.as_str()), Some("*"));
    let Node::Call(inner) = &call.positional_arguments[0] else {
        panic!("expected a nested call");
    };
    assert_eq!(inner.operand.as_name().map(|n| n.value.as_str()), Some("-"));
}

#[test]
fn test_unary_operator_call() {
    let expressions = top_level("-x");
    let Node::Call(call) = &expressions[0] else {
        panic!("expected a call");
    };
    assert_eq!(call.operand.as_name().map(|n| n.value.as_str()), Some("-"));
    assert_eq!(call.positional_arguments.len(), 1);
}

#[test]
fn test_not_and_or_keywords_parse_as_operators() {
    let expressions = top_level("not a and b");
    let Node::Call(call) = &expressions[0] else {
        panic!("expected a call");
    };
    assert_eq!(call.operand.as_name().map(|n| n.value.as_str()), Some("and"));
    let Node::Call(inner) = &call.positional_arguments[0] else {
        panic!("expected the negation");
    };
    assert_eq!(inner.operand.as_name().map(|n| n.value.as_str()), Some("not"));
}

#[test]
fn test_selector_chain_and_tuple_field() {
    let expressions = top_level("pair.0");
    let Node::Selector(selector) = &expressions[0] else {
        panic!("expected a selector");
    };
    assert_eq!(selector.field.name.value, "0");
}

#[test]
fn test_cast_expression() {
    let expressions = top_level("x as Float64");
    let Node::Cast(cast) = &expressions[0] else {
        panic!("expected a cast");
    };
    assert_eq!(cast.new_type.name.value, "Float64");
}

#[test]
fn test_ccall_form() {
    let expressions = top_level("ccall puts(UnsafePointer{UInt8}) as Int32 using message");
    let Node::CCall(ccall) = &expressions[0] else {
        panic!("expected a ccall");
    };
    assert_eq!(ccall.name.value, "puts");
    assert_eq!(ccall.parameters.len(), 1);
    assert_eq!(ccall.given_return_type.name.value, "Int32");
    assert_eq!(ccall.arguments.len(), 1);
}

#[test]
fn test_spawn_requires_a_call() {
    let expressions = top_level("spawn f(1)");
    assert!(matches!(&expressions[0], Node::Spawn(_)));

    let (_, has_errors) = try_parse("spawn 1");
    assert!(has_errors);
}

#[test]
fn test_literals() {
    let expressions = top_level("[1, 2, 3]");
    let Node::List(list) = &expressions[0] else {
        panic!("expected a list");
    };
    assert_eq!(list.elements.len(), 3);

    let expressions = top_level("{'a': 1, 'b': 2}");
    let Node::Dictionary(dictionary) = &expressions[0] else {
        panic!("expected a dictionary");
    };
    assert_eq!(dictionary.keys.len(), dictionary.values.len());

    let expressions = top_level("(1, 2.5)");
    let Node::Tuple(tuple) = &expressions[0] else {
        panic!("expected a tuple");
    };
    assert_eq!(tuple.elements.len(), 2);
}

#[test]
fn test_module_declaration() {
    let expressions = top_level("module Math\n    def f()\n        1\n    end\nend");
    let Node::Module(module) = &expressions[0] else {
        panic!("expected a module");
    };
    assert_eq!(module.name.name.value, "Math");
}

#[test]
fn test_node_tokens_agree_with_source_text() {
    let file = parse("let x as Int64 = 1");
    let Node::Block(block) = &*file.code else {
        panic!("expected a block");
    };
    let Node::Let(binding) = &block.expressions[0] else {
        panic!("expected a let");
    };
    assert_eq!(binding.token.lexeme, "let");
    assert_eq!(binding.token.location.line_number, 1);
    assert_eq!(binding.token.location.line, "let x as Int64 = 1");
}

#[test]
fn test_import_loads_relative_file() {
    let dir = std::env::temp_dir().join(format!("acorn_parser_test_{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let library = dir.join("library.acorn");
    std::fs::write(&library, "def helper()\n    1\nend\n").expect("write library");

    let main = dir.join("main.acorn");
    std::fs::write(&main, "import 'library'\nhelper()\n").expect("write main");
    let source = std::fs::read_to_string(&main).expect("read main");

    let mut ids = NodeCounter::new();
    let lexer = Lexer::new(&source, &main.display().to_string());
    let mut parser = Parser::new(lexer, &mut ids);
    let file = parser.parse(&main.display().to_string()).expect("parse");

    assert_eq!(file.imports.len(), 1);
    assert!(!parser.has_errors());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_missing_import_reports_file_not_found() {
    let (_, has_errors) = try_parse("import 'no/such/file'\n1");
    assert!(has_errors);
}
