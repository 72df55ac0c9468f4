// Emitter integration tests: the lowering contract observable in the IR.

use acorn_compiler::{emit_ir, Compilation};

fn emit(source: &str) -> String {
    let mut compilation = Compilation::compile_source(source, "test.acorn");
    assert!(
        compilation.succeeded(),
        "{:?}",
        compilation.reporter.diagnostics()
    );
    emit_ir(&mut compilation).expect("emission")
}

#[test]
fn test_method_uses_mangled_link_name() {
    let ir = emit("def f(a as Int64) as Int64\n    return a\nend");
    assert!(ir.contains("_A_f_mi64i64"), "ir was:\n{}", ir);
}

#[test]
fn test_function_table_global_is_materialised() {
    let ir = emit("def f(a as Int64) as Int64\n    return a\nend\nf(1)");
    assert!(ir.contains("_A_table_f"), "ir was:\n{}", ir);
    // calls resolve through the table, not by direct symbol reference
    assert!(ir.contains("call"), "ir was:\n{}", ir);
}

#[test]
fn test_generic_method_emits_one_body_per_specialisation() {
    let source = "def id{T}(x as T) as T\n    return x\nend\n\
                  let a = id(1)\nlet b = id(2.5)";
    let ir = emit(source);
    assert!(ir.contains("_A_id_mpp"), "ir was:\n{}", ir);
    assert!(ir.contains("_A_id_mpp$1"), "ir was:\n{}", ir);
}

#[test]
fn test_builtin_addition_has_synthesized_body() {
    let ir = emit("let x = 1 + 2");
    assert!(ir.contains("add"), "ir was:\n{}", ir);
}

#[test]
fn test_record_construction_lowers_to_struct() {
    let source = "type Point\n    x as Int64\n    y as Int64\nend\n\
                  let p = Point.new(1, 2)\nlet x = p.x";
    let ir = emit(source);
    assert!(ir.contains("{ i64, i64 }") || ir.contains("{i64, i64}"), "ir was:\n{}", ir);
}

#[test]
fn test_top_level_code_becomes_main() {
    let ir = emit("let x = 1");
    assert!(ir.contains("define i32 @main"), "ir was:\n{}", ir);
}

#[test]
fn test_emit_refuses_failed_compilations() {
    let mut compilation = Compilation::compile_source("let a = 1\nlet a = 2", "test.acorn");
    assert!(emit_ir(&mut compilation).is_err());
}
