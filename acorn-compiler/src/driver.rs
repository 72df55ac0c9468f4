// Phase sequencing for one compilation: lex+parse (imports included), install
// builtins, build the symbol table, type-check, and only then hand the typed
// tree to the emitter. Each phase runs only when no previous phase reported
// an error.

use std::path::Path;

use acorn_ast::{NodeCounter, SourceFile};
use acorn_diagnostics::{Diagnostic, Reporter, SourceLocation};
use acorn_lexer::Lexer;
use acorn_parser::Parser;

use crate::builtins;
use crate::symboltable::{Builder, SymbolTable};
use crate::typesystem::{TypeChecker, TypeUniverse};

/// The result of running the front-end over one input: the typed tree, the
/// symbol table and type universe backing it, and every diagnostic reported
/// along the way.
pub struct Compilation {
    pub name: String,
    pub file: Option<SourceFile>,
    pub table: SymbolTable,
    pub universe: TypeUniverse,
    pub reporter: Reporter,
}

impl Compilation {
    pub fn compile_source(source: &str, name: &str) -> Compilation {
        log::info!("compiling: {}", name);

        let mut reporter = Reporter::new();
        let mut ids = NodeCounter::new();

        let lexer = Lexer::new(source, name);
        let mut parser = Parser::new(lexer, &mut ids);
        let parsed = parser.parse(name);
        let diagnostics = parser.take_diagnostics();
        drop(parser);
        for diagnostic in diagnostics {
            reporter.report(diagnostic);
        }

        let mut table = SymbolTable::new();
        let mut universe = TypeUniverse::new();
        builtins::populate(&mut table, &mut universe);

        let mut file = parsed;
        if let Some(file) = &mut file {
            if !reporter.has_errors() {
                log::debug!("building symbol table for: {}", name);
                let mut builder = Builder::new(&mut table);
                builder.build_source_file(file);
                for diagnostic in builder.take_diagnostics() {
                    reporter.report(diagnostic);
                }
            }

            if !reporter.has_errors() {
                log::debug!("type checking: {}", name);
                let mut checker = TypeChecker::new(&mut table, &mut universe);
                checker.check_source_file(file);
                for diagnostic in checker.take_diagnostics() {
                    reporter.report(diagnostic);
                }
            }
        }

        Compilation {
            name: name.to_string(),
            file,
            table,
            universe,
            reporter,
        }
    }

    pub fn compile_file(path: &Path) -> Compilation {
        let name = path.display().to_string();
        match std::fs::read_to_string(path) {
            Ok(source) => Self::compile_source(&source, &name),
            Err(_) => {
                let mut reporter = Reporter::new();
                reporter.report(Diagnostic::file_not_found(
                    SourceLocation::new(name.clone(), String::new(), 0, 0),
                    &name,
                ));
                Compilation {
                    name,
                    file: None,
                    table: SymbolTable::new(),
                    universe: TypeUniverse::new(),
                    reporter,
                }
            }
        }
    }

    pub fn succeeded(&self) -> bool {
        self.file.is_some() && !self.reporter.has_errors()
    }
}
