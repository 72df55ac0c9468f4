// The Acorn compiler core: symbol table, type universe, type checker, the
// builtin environment, the LLVM emitter, and the driver sequencing them.

pub mod builtins;
pub mod codegen;
pub mod driver;
pub mod symboltable;
pub mod typesystem;

// Re-export diagnostics so consumers need only this crate
pub use acorn_diagnostics as diagnostics;

pub use codegen::emit_ir;
pub use driver::Compilation;
pub use symboltable::{Builder, ScopeStack, Symbol, SymbolTable};
pub use typesystem::{TypeChecker, TypeUniverse};
