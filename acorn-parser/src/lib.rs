// Parser for the Acorn language
//
// Recursive descent with two tokens of lookahead. Newlines are transparent at
// the token feed; block structure arrives as Indent/Deindent tokens plus the
// `end` keyword. Every read function returns `Option`: a failed read reports
// a diagnostic and propagates `None` without touching shared state.

mod parser;

pub use parser::Parser;
