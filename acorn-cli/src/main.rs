use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use acorn_compiler::Compilation;

#[derive(Parser)]
#[command(name = "acorn")]
#[command(version = "0.2.0")]
#[command(about = "Acorn Programming Language Compiler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an Acorn source file to LLVM IR
    Compile {
        /// Input .acorn file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file (defaults to the input with an .ll extension)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Print LLVM IR to stdout instead of writing a file
        #[arg(long)]
        emit_llvm: bool,

        /// Dump the typed syntax tree as JSON to stdout
        #[arg(long)]
        emit_ast: bool,
    },

    /// Check a source file without emitting code
    Check {
        /// Input .acorn file
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            input,
            output,
            emit_llvm,
            emit_ast,
        } => {
            log::info!("compiling: {:?}", input);

            let mut compilation = Compilation::compile_file(&input);
            report(&compilation);

            if !compilation.succeeded() {
                bail!(
                    "compilation failed with {} error(s)",
                    compilation.reporter.error_count()
                );
            }

            if emit_ast {
                if let Some(file) = &compilation.file {
                    println!("{}", serde_json::to_string_pretty(file)?);
                }
            }

            let ir = acorn_compiler::emit_ir(&mut compilation)?;

            if emit_llvm {
                println!("{}", ir);
            } else {
                let path = output.unwrap_or_else(|| input.with_extension("ll"));
                std::fs::write(&path, ir)?;
                log::info!("wrote: {:?}", path);
            }

            Ok(())
        }

        Commands::Check { input } => {
            let compilation = Compilation::compile_file(&input);
            report(&compilation);

            if !compilation.succeeded() {
                bail!(
                    "check failed with {} error(s)",
                    compilation.reporter.error_count()
                );
            }

            println!("{}: ok", input.display());
            Ok(())
        }
    }
}

fn report(compilation: &Compilation) {
    for diagnostic in compilation.reporter.diagnostics() {
        eprintln!("{}", diagnostic.render_colored());
    }
}
