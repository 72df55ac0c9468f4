// Lexer for the Acorn language
//
// Two layers: a logos-generated raw tokenizer for the character-level rules,
// and an indentation layer that turns newlines into Newline/Indent/Deindent
// structure the parser consumes.

use std::collections::VecDeque;

use acorn_diagnostics::{Diagnostic, Reporter, SourceLocation};
use logos::Logos;

mod token;
pub use token::{is_keyword, Token, TokenKind, KEYWORDS};

/// Character-level tokens. Whitespace, comments and backslash line
/// continuations never leave this layer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"([ \t\f]+|#[^\n]*|\\[ \t]*\r?\n)")]
enum RawToken {
    #[regex(r"\r?\n")]
    Newline,

    #[regex(r"[0-9]+\.[0-9]+")]
    Float,

    #[regex(r"[0-9]+")]
    Int,

    #[regex(r#"'[^']*'|"[^"]*""#)]
    String,

    #[regex(r"==|!=|<=|>=|[-<>+*/%|]")]
    Operator,

    #[token("=")]
    Assignment,

    #[token("[")]
    OpenBracket,
    #[token("]")]
    CloseBracket,
    #[token("(")]
    OpenParenthesis,
    #[token(")")]
    CloseParenthesis,
    #[token("{")]
    OpenBrace,
    #[token("}")]
    CloseBrace,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,

    #[regex(r"[\p{L}_][\p{L}\p{N}_]*")]
    Name,
}

/// Streaming lexer. `next_token` produces tokens one at a time and terminates
/// with a single `EndOfFile`; errors are reported through the reporter and do
/// not stop the stream.
pub struct Lexer<'source> {
    inner: logos::Lexer<'source, RawToken>,
    source: &'source str,
    filename: String,
    line_starts: Vec<usize>,
    indentation: Vec<usize>,
    buffer: VecDeque<Token>,
    reporter: Reporter,
    at_line_start: bool,
    finished: bool,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str, filename: &str) -> Self {
        log::debug!("initialising lexer for: {}", filename);

        let mut line_starts = vec![0];
        for (offset, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }

        Self {
            inner: RawToken::lexer(source),
            source,
            filename: filename.to_string(),
            line_starts,
            indentation: vec![0],
            buffer: VecDeque::new(),
            reporter: Reporter::new(),
            at_line_start: true,
            finished: false,
        }
    }

    pub fn next_token(&mut self) -> Option<Token> {
        if self.buffer.is_empty() {
            self.refill();
        }
        self.buffer.pop_front()
    }

    pub fn has_errors(&self) -> bool {
        self.reporter.has_errors()
    }

    pub fn reporter_mut(&mut self) -> &mut Reporter {
        &mut self.reporter
    }

    fn refill(&mut self) {
        while self.buffer.is_empty() && !self.finished {
            if self.at_line_start {
                self.at_line_start = false;
                self.read_line_start(None);
                continue;
            }

            match self.inner.next() {
                None => self.flush_end_of_file(),
                Some(Err(())) => self.report_bad_character(),
                Some(Ok(RawToken::Newline)) => {
                    let newline = self.make_token(TokenKind::Newline, "\n".to_string());
                    self.read_line_start(Some(newline));
                }
                Some(Ok(raw)) => {
                    let token = self.convert(raw);
                    self.buffer.push_back(token);
                }
            }
        }
    }

    /// Skip blank and comment-only lines, then measure the indentation of the
    /// next content line and emit the matching Indent/Deindent tokens.
    fn read_line_start(&mut self, newline: Option<Token>) {
        loop {
            match self.inner.next() {
                None => {
                    if let Some(newline) = newline {
                        self.buffer.push_back(newline);
                    }
                    self.flush_end_of_file();
                    return;
                }
                Some(Err(())) => self.report_bad_character(),
                Some(Ok(RawToken::Newline)) => continue,
                Some(Ok(raw)) => {
                    let token = self.convert(raw);
                    let width = token.location.column - 1;

                    if let Some(newline) = newline {
                        self.buffer.push_back(newline);
                    }
                    self.update_indentation(width, &token.location);
                    self.buffer.push_back(token);
                    return;
                }
            }
        }
    }

    fn update_indentation(&mut self, width: usize, location: &SourceLocation) {
        let current = *self.indentation.last().unwrap_or(&0);

        if width == current {
            // same block, nothing to emit
        } else if width > current {
            self.indentation.push(width);
            self.buffer.push_back(Token::new(
                TokenKind::Indent,
                String::new(),
                location.clone(),
            ));
        } else if self.indentation.contains(&width) {
            while self.indentation.last().map_or(false, |level| *level > width) {
                self.indentation.pop();
                self.buffer.push_back(Token::new(
                    TokenKind::Deindent,
                    String::new(),
                    location.clone(),
                ));
            }
        } else {
            self.reporter.report(Diagnostic::syntax(
                location.clone(),
                &width.to_string(),
                "indentation",
            ));
        }
    }

    fn flush_end_of_file(&mut self) {
        let location = self.end_location();
        while self.indentation.len() > 1 {
            self.indentation.pop();
            self.buffer.push_back(Token::new(
                TokenKind::Deindent,
                String::new(),
                location.clone(),
            ));
        }
        self.buffer.push_back(Token::new(
            TokenKind::EndOfFile,
            String::new(),
            location,
        ));
        self.finished = true;
    }

    fn report_bad_character(&mut self) {
        let location = self.location_at(self.inner.span().start);
        let got = self.inner.slice().to_string();
        self.reporter
            .report(Diagnostic::syntax(location, &got, "valid token"));
    }

    fn convert(&self, raw: RawToken) -> Token {
        let span = self.inner.span();
        let location = self.location_at(span.start);
        let slice = self.inner.slice();

        let (kind, lexeme) = match raw {
            RawToken::Newline => (TokenKind::Newline, "\n".to_string()),
            RawToken::Float => (TokenKind::Float, slice.to_string()),
            RawToken::Int => (TokenKind::Int, slice.to_string()),
            RawToken::String => {
                let inner = &slice[1..slice.len() - 1];
                (TokenKind::String, inner.to_string())
            }
            RawToken::Operator => (TokenKind::Operator, slice.to_string()),
            RawToken::Assignment => (TokenKind::Assignment, slice.to_string()),
            RawToken::OpenBracket => (TokenKind::OpenBracket, slice.to_string()),
            RawToken::CloseBracket => (TokenKind::CloseBracket, slice.to_string()),
            RawToken::OpenParenthesis => (TokenKind::OpenParenthesis, slice.to_string()),
            RawToken::CloseParenthesis => (TokenKind::CloseParenthesis, slice.to_string()),
            RawToken::OpenBrace => (TokenKind::OpenBrace, slice.to_string()),
            RawToken::CloseBrace => (TokenKind::CloseBrace, slice.to_string()),
            RawToken::Comma => (TokenKind::Comma, slice.to_string()),
            RawToken::Dot => (TokenKind::Dot, slice.to_string()),
            RawToken::Colon => (TokenKind::Colon, slice.to_string()),
            RawToken::Semicolon => (TokenKind::Semicolon, slice.to_string()),
            RawToken::Name => {
                if is_keyword(slice) {
                    (TokenKind::Keyword, slice.to_string())
                } else {
                    (TokenKind::Name, slice.to_string())
                }
            }
        };

        Token::new(kind, lexeme, location)
    }

    fn make_token(&self, kind: TokenKind, lexeme: String) -> Token {
        Token::new(kind, lexeme, self.location_at(self.inner.span().start))
    }

    fn location_at(&self, offset: usize) -> SourceLocation {
        let line_index = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        let line_start = self.line_starts[line_index];
        let line_end = self
            .line_starts
            .get(line_index + 1)
            .map(|start| start - 1)
            .unwrap_or(self.source.len());
        let line = self.source[line_start..line_end]
            .trim_end_matches('\r')
            .to_string();
        let column = self.source[line_start..offset].chars().count() + 1;

        SourceLocation::new(self.filename.clone(), line, line_index + 1, column)
    }

    fn end_location(&self) -> SourceLocation {
        self.location_at(self.source.len())
    }
}

impl<'source> Iterator for Lexer<'source> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source, "test.acorn").map(|t| t.kind).collect()
    }

    fn lexemes(source: &str) -> Vec<String> {
        Lexer::new(source, "test.acorn").map(|t| t.lexeme).collect()
    }

    #[test]
    fn test_names_and_keywords() {
        let tokens: Vec<Token> = Lexer::new("let lettuce spawn", "test.acorn").collect();
        assert_eq!(tokens[0].kind, TokenKind::Keyword);
        assert_eq!(tokens[0].lexeme, "let");
        assert_eq!(tokens[1].kind, TokenKind::Name);
        assert_eq!(tokens[1].lexeme, "lettuce");
        assert_eq!(tokens[2].kind, TokenKind::Keyword);
        assert_eq!(tokens[3].kind, TokenKind::EndOfFile);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 3.14"),
            vec![TokenKind::Int, TokenKind::Float, TokenKind::EndOfFile]
        );
    }

    #[test]
    fn test_strings_drop_delimiters() {
        assert_eq!(
            lexemes(r#"'hello' "world""#),
            vec!["hello".to_string(), "world".to_string(), String::new()]
        );
    }

    #[test]
    fn test_operators_longest_match_first() {
        let tokens: Vec<Token> = Lexer::new("a <= b == c < d = e", "test.acorn").collect();
        let operators: Vec<(TokenKind, String)> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Operator || t.kind == TokenKind::Assignment)
            .map(|t| (t.kind, t.lexeme.clone()))
            .collect();
        assert_eq!(
            operators,
            vec![
                (TokenKind::Operator, "<=".to_string()),
                (TokenKind::Operator, "==".to_string()),
                (TokenKind::Operator, "<".to_string()),
                (TokenKind::Assignment, "=".to_string()),
            ]
        );
    }

    #[test]
    fn test_indentation_brackets_blocks() {
        let source = "if x\n    return 1\nend";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Keyword, // if
                TokenKind::Name,    // x
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Keyword, // return
                TokenKind::Int,
                TokenKind::Newline,
                TokenKind::Deindent,
                TokenKind::Keyword, // end
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn test_nested_indentation_pops_each_level() {
        let source = "a\n  b\n    c\nd";
        let kinds = kinds(source);
        let deindents = kinds
            .iter()
            .filter(|k| **k == TokenKind::Deindent)
            .count();
        let indents = kinds.iter().filter(|k| **k == TokenKind::Indent).count();
        assert_eq!(indents, 2);
        assert_eq!(deindents, 2);
    }

    #[test]
    fn test_blank_and_comment_lines_do_not_change_indentation() {
        let source = "a\n\n# comment line\n\nb";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Name,
                TokenKind::Newline,
                TokenKind::Name,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn test_line_continuation() {
        let source = "a \\\n  b";
        assert_eq!(
            kinds(source),
            vec![TokenKind::Name, TokenKind::Name, TokenKind::EndOfFile]
        );
    }

    #[test]
    fn test_deindent_flush_at_end_of_file() {
        let source = "if x\n    y";
        let kinds = kinds(source);
        assert_eq!(
            kinds.last().copied(),
            Some(TokenKind::EndOfFile),
            "stream must end with EndOfFile"
        );
        assert!(kinds.contains(&TokenKind::Deindent));
    }

    #[test]
    fn test_bad_character_reports_and_continues() {
        let mut lexer = Lexer::new("a $ b", "test.acorn");
        let tokens: Vec<Token> = (&mut lexer).collect();
        assert!(lexer.has_errors());
        let names: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Name)
            .map(|t| t.lexeme.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_inconsistent_deindent_reports_error() {
        let mut lexer = Lexer::new("a\n    b\n  c", "test.acorn");
        let _tokens: Vec<Token> = (&mut lexer).collect();
        assert!(lexer.has_errors());
    }

    #[test]
    fn test_locations_are_one_based() {
        let tokens: Vec<Token> = Lexer::new("let a\nlet b", "test.acorn").collect();
        assert_eq!(tokens[0].location.line_number, 1);
        assert_eq!(tokens[0].location.column, 1);
        assert_eq!(tokens[1].location.column, 5);
        assert_eq!(tokens[3].location.line_number, 2);
        assert_eq!(tokens[3].location.line, "let b");
    }

    #[test]
    fn test_unicode_names() {
        let tokens: Vec<Token> = Lexer::new("déjà _private x1", "test.acorn").collect();
        assert_eq!(tokens[0].lexeme, "déjà");
        assert_eq!(tokens[1].lexeme, "_private");
        assert_eq!(tokens[2].lexeme, "x1");
    }
}
