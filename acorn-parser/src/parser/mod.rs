use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

use acorn_ast::*;
use acorn_diagnostics::{Diagnostic, Reporter};
use acorn_lexer::{Lexer, Token, TokenKind};

mod expressions;
mod items;
mod names;
mod statements;

/// Parser over one token stream. Imported files are parsed by nested parsers
/// sharing this parser's node-id space.
pub struct Parser<'src, 'ids> {
    lexer: Lexer<'src>,
    tokens: VecDeque<Token>,
    precedence: HashMap<String, i32>,
    pub(crate) ids: &'ids mut NodeCounter,
    reporter: Reporter,
    base_dir: PathBuf,
    end_of_file: Option<Token>,
}

impl<'src, 'ids> Parser<'src, 'ids> {
    pub fn new(lexer: Lexer<'src>, ids: &'ids mut NodeCounter) -> Self {
        let mut precedence = HashMap::new();
        precedence.insert("+".to_string(), 1);
        precedence.insert("-".to_string(), 1);

        Self {
            lexer,
            tokens: VecDeque::new(),
            precedence,
            ids,
            reporter: Reporter::new(),
            base_dir: PathBuf::new(),
            end_of_file: None,
        }
    }

    /// Parse one source file: leading imports, then expressions until
    /// end-of-file. Returns `None` when the file's top-level structure could
    /// not be parsed at all.
    pub fn parse(&mut self, name: &str) -> Option<SourceFile> {
        log::debug!("parsing: {}", name);

        self.base_dir = PathBuf::from(name)
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();

        let source_token = self.front_token();

        let mut imports = Vec::new();
        while self.is_keyword("import") {
            let import = self.read_import_expression()?;
            if let Some(imported) = self.load_import(&import) {
                imports.push(imported);
            }
        }

        let block_token = self.front_token();

        let mut expressions = Vec::new();
        while !self.is_token(TokenKind::EndOfFile) {
            let expression = self.read_expression()?;
            expressions.push(expression);
        }

        let code = Block {
            id: self.ids.next(),
            token: block_token,
            ty: None,
            expressions,
        };

        Some(SourceFile {
            id: self.ids.next(),
            token: source_token,
            ty: None,
            name: name.to_string(),
            imports,
            code: Box::new(Node::Block(code)),
        })
    }

    pub fn has_errors(&self) -> bool {
        self.reporter.has_errors() || self.lexer.has_errors()
    }

    /// Drain every diagnostic recorded by this parser and its lexer.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        let mut diagnostics = self.lexer.reporter_mut().take();
        diagnostics.extend(self.reporter.take());
        diagnostics
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        self.reporter.report(diagnostic);
    }

    // ==================== Token plumbing ====================

    /// Pull one non-newline token from the lexer into the deque. Past the end
    /// of the stream the EndOfFile token repeats so lookahead never starves.
    fn pull_non_newline_token(&mut self) {
        loop {
            match self.lexer.next_token() {
                Some(token) if token.kind == TokenKind::Newline => continue,
                Some(token) => {
                    if token.kind == TokenKind::EndOfFile {
                        self.end_of_file = Some(token.clone());
                    }
                    self.tokens.push_back(token);
                    return;
                }
                None => {
                    let eof = self.end_of_file.clone().unwrap_or_else(|| {
                        Token::new(
                            TokenKind::EndOfFile,
                            String::new(),
                            acorn_diagnostics::SourceLocation::unknown(),
                        )
                    });
                    self.tokens.push_back(eof);
                    return;
                }
            }
        }
    }

    /// A block closed and reopened on the next line arrives as Deindent
    /// followed by Indent; the pair cancels out.
    fn collapse_deindent_indent_tokens(&mut self) {
        while self.tokens.len() >= 2
            && self.tokens[0].kind == TokenKind::Deindent
            && self.tokens[1].kind == TokenKind::Indent
        {
            self.tokens.pop_front();
            self.tokens.pop_front();
        }
    }

    fn fill_tokens(&mut self) {
        while self.tokens.len() < 2 {
            self.pull_non_newline_token();
            self.pull_non_newline_token();
            self.collapse_deindent_indent_tokens();
        }
    }

    pub(crate) fn front_token(&mut self) -> Token {
        self.fill_tokens();
        self.tokens[0].clone()
    }

    fn pop_token(&mut self) -> Token {
        self.fill_tokens();
        self.tokens.pop_front().unwrap_or_else(|| {
            Token::new(
                TokenKind::EndOfFile,
                String::new(),
                acorn_diagnostics::SourceLocation::unknown(),
            )
        })
    }

    pub(crate) fn read_token(&mut self, kind: TokenKind) -> Option<Token> {
        let token = self.pop_token();
        if token.kind != kind {
            self.report(Diagnostic::syntax(
                token.location.clone(),
                &token.lexeme_string(),
                &kind.to_string(),
            ));
            return None;
        }
        Some(token)
    }

    pub(crate) fn skip_token(&mut self, kind: TokenKind) -> bool {
        self.read_token(kind).is_some()
    }

    pub(crate) fn is_token(&mut self, kind: TokenKind) -> bool {
        self.front_token().kind == kind
    }

    pub(crate) fn is_and_skip_token(&mut self, kind: TokenKind) -> bool {
        if self.is_token(kind) {
            self.pop_token();
            true
        } else {
            false
        }
    }

    pub(crate) fn read_keyword(&mut self, name: &str) -> Option<Token> {
        let token = self.read_token(TokenKind::Keyword)?;
        if token.lexeme != name {
            self.report(Diagnostic::syntax(
                token.location.clone(),
                &token.lexeme,
                name,
            ));
            return None;
        }
        Some(token)
    }

    pub(crate) fn skip_keyword(&mut self, name: &str) -> bool {
        self.read_keyword(name).is_some()
    }

    pub(crate) fn is_keyword(&mut self, name: &str) -> bool {
        let token = self.front_token();
        token.kind == TokenKind::Keyword && token.lexeme == name
    }

    pub(crate) fn is_and_skip_keyword(&mut self, name: &str) -> bool {
        if self.is_keyword(name) {
            self.pop_token();
            true
        } else {
            false
        }
    }

    pub(crate) fn skip_deindent_and_end_token(&mut self) -> bool {
        self.skip_token(TokenKind::Deindent) && self.skip_keyword("end")
    }

    pub(crate) fn precedence_of(&self, operator: &str) -> i32 {
        self.precedence.get(operator).copied().unwrap_or(0)
    }

    /// True when the front token can continue a binary expression: an
    /// operator token, or one of the operator-like keywords.
    pub(crate) fn is_binary_operator(&mut self) -> bool {
        let token = self.front_token();
        match token.kind {
            TokenKind::Operator => true,
            TokenKind::Keyword => token.lexeme == "and" || token.lexeme == "or",
            _ => false,
        }
    }

    pub(crate) fn front_precedence(&mut self) -> i32 {
        let token = self.front_token();
        self.precedence_of(&token.lexeme)
    }

    // ==================== Shared expression entry ====================

    /// Lowest level of the expression grammar: declaration forms in
    /// statement position, otherwise a unary expression possibly extended
    /// into a binary one.
    pub(crate) fn read_expression(&mut self) -> Option<Node> {
        if self.is_keyword("let") {
            self.read_let().map(Node::Let)
        } else if self.is_keyword("def") {
            self.read_def().map(Node::Def)
        } else if self.is_keyword("type") {
            self.read_type_decl().map(Node::TypeDecl)
        } else if self.is_keyword("module") {
            self.read_module().map(Node::Module)
        } else {
            let unary = self.read_unary_expression()?;
            if self.is_binary_operator() {
                self.read_binary_expression(unary, 0)
            } else {
                Some(unary)
            }
        }
    }

    /// `Indent expr* Deindent`, optionally followed by `end`.
    pub(crate) fn read_block(&mut self, read_end: bool) -> Option<Block> {
        let block_token = self.read_token(TokenKind::Indent)?;

        let mut expressions = Vec::new();
        while !self.is_token(TokenKind::Deindent) {
            let expression = self.read_expression()?;
            expressions.push(expression);
        }

        self.skip_token(TokenKind::Deindent).then_some(())?;

        if read_end {
            self.skip_keyword("end").then_some(())?;
        }

        Some(Block {
            id: self.ids.next(),
            token: block_token,
            ty: None,
            expressions,
        })
    }
}
