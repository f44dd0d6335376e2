//! The lexer.

use derive_more::Display;
use regex::Regex;

use crate::common::Line;
use crate::error::Error;

/// Tokens in the program.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("kind: '{kind}', part of input: '{text}'")]
pub struct Token<'src> {
    /// What token class this token belongs to.
    pub kind: TokenKind,
    /// What part of the input this token carries.
    pub text: &'src str,
    /// The source line the token starts on (1-indexed).
    pub line: Line,
}

/// Token classes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Display)]
pub enum TokenKind {
    #[display("id")]
    Pid,
    #[display("num")]
    Num,
    #[display("PROCEDURE")]
    Procedure,
    #[display("IS")]
    Is,
    #[display("IN")]
    In,
    #[display("END")]
    End,
    #[display("PROGRAM")]
    Program,
    #[display("IF")]
    If,
    #[display("THEN")]
    Then,
    #[display("ELSE")]
    Else,
    #[display("ENDIF")]
    EndIf,
    #[display("WHILE")]
    While,
    #[display("DO")]
    Do,
    #[display("ENDWHILE")]
    EndWhile,
    #[display("REPEAT")]
    Repeat,
    #[display("UNTIL")]
    Until,
    #[display("READ")]
    Read,
    #[display("WRITE")]
    Write,
    #[display("T")]
    Tab,
    #[display(":=")]
    Assign,
    #[display("=")]
    Eq,
    #[display("!=")]
    Ne,
    #[display(">")]
    Gt,
    #[display("<")]
    Lt,
    #[display(">=")]
    Ge,
    #[display("<=")]
    Le,
    #[display("+")]
    Plus,
    #[display("-")]
    Minus,
    #[display("*")]
    Star,
    #[display("/")]
    Slash,
    #[display("%")]
    Percent,
    #[display(",")]
    Comma,
    #[display(";")]
    Semicolon,
    #[display("(")]
    LParen,
    #[display(")")]
    RParen,
    #[display("[")]
    LBracket,
    #[display("]")]
    RBracket,
}

pub struct Lexer<'input> {
    input: &'input str,
    pos: usize,
    line: Line,
    whitespace: Regex,
    matchers: Vec<(Regex, TokenKind)>,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        // Keywords are tried before PID: PID is lowercase-only
        // (`[_a-z]+`) and keywords are all-uppercase, so the two classes
        // never collide. Multi-character operators are listed ahead of
        // their single-character prefixes (`>=` before `>`, etc.).
        let kw = |pat: &str, kind: TokenKind| (Regex::new(&format!(r"\A{pat}\b")).unwrap(), kind);
        let sym = |pat: &str, kind: TokenKind| (Regex::new(&format!(r"\A{pat}")).unwrap(), kind);

        use TokenKind::*;
        let matchers = vec![
            kw("PROCEDURE", Procedure),
            kw("ENDWHILE", EndWhile),
            kw("ENDIF", EndIf),
            kw("END", End),
            kw("PROGRAM", Program),
            kw("THEN", Then),
            kw("ELSE", Else),
            kw("WHILE", While),
            kw("REPEAT", Repeat),
            kw("UNTIL", Until),
            kw("READ", Read),
            kw("WRITE", Write),
            kw("IF", If),
            kw("IS", Is),
            kw("IN", In),
            kw("DO", Do),
            kw("T", Tab),
            (Regex::new(r"\A[_a-z]+").unwrap(), Pid),
            (Regex::new(r"\A\d+").unwrap(), Num),
            sym(r":=", Assign),
            sym(r">=", Ge),
            sym(r"<=", Le),
            sym(r"!=", Ne),
            sym(r"=", Eq),
            sym(r">", Gt),
            sym(r"<", Lt),
            sym(r"\+", Plus),
            sym(r"-", Minus),
            sym(r"\*", Star),
            sym(r"/", Slash),
            sym(r"%", Percent),
            sym(r",", Comma),
            sym(r";", Semicolon),
            sym(r"\(", LParen),
            sym(r"\)", RParen),
            sym(r"\[", LBracket),
            sym(r"\]", RBracket),
        ];

        Lexer {
            input,
            pos: 0,
            line: 1,
            whitespace: Regex::new(r"\A(?:[ \t\r\n\v\f]|#[^\n]*)*").unwrap(),
            matchers,
        }
    }

    /// Has the lexer reached the end of input?
    pub fn end_of_input(&self) -> bool {
        self.pos == self.input.len()
    }

    // Skip comments and whitespace, tracking line numbers as we go.
    fn skip_whitespace(&mut self) {
        if let Some(m) = self.whitespace.find(&self.input[self.pos..]) {
            self.line += m.as_str().bytes().filter(|&b| b == b'\n').count() as Line;
            self.pos += m.end();
        }
    }

    /// Get the next token if possible.
    ///
    /// The return type distinguishes between end-of-input and lexer error.
    pub fn next(&mut self) -> Result<Option<Token<'input>>, Error> {
        self.skip_whitespace();
        if self.end_of_input() {
            return Ok(None);
        }
        let rest = &self.input[self.pos..];
        for (re, kind) in &self.matchers {
            if let Some(m) = re.find(rest) {
                let text = m.as_str();
                let line = self.line;
                self.pos += text.len();
                return Ok(Some(Token { kind: *kind, text, line }));
            }
        }
        let ch = rest.chars().next().unwrap();
        Err(Error::Lexer { ch, pos: self.pos, line: self.line })
    }

    /// Lex the whole input into a token vector, plus the `program_lines`
    /// table: for every source line that carries at least one token, the
    /// kind and line number of its first token, in order.
    pub fn tokenize(input: &'input str) -> Result<(Vec<Token<'input>>, Vec<(TokenKind, Line)>), Error> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        let mut program_lines = Vec::new();
        let mut current_line = None;
        while let Some(tok) = lexer.next()? {
            if current_line != Some(tok.line) {
                current_line = Some(tok.line);
                program_lines.push((tok.kind, tok.line));
            }
            tokens.push(tok);
        }
        Ok((tokens, program_lines))
    }
}
