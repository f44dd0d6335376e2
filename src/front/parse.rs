//! The parser.
//!
//! A hand-rolled recursive-descent parser. It resolves each identifier use
//! to a scalar/array shape as it goes (mirroring the original grammar's
//! inline symbol bookkeeping) but does not assign memory offsets — that is
//! the Symbol Table's job, run during code generation (`back::symbol`).

use crate::common::{Id, Line, Map, Set};
use crate::error::Error;

use super::ast::*;
use super::lex::{Lexer, Token, TokenKind};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Shape {
    Scalar,
    Array,
}

#[derive(Default)]
struct Scope {
    shapes: Map<Id, Shape>,
}

impl Scope {
    fn declare(&mut self, name: Id, shape: Shape) {
        self.shapes.insert(name, shape);
    }

    fn shape(&self, name: Id) -> Option<Shape> {
        self.shapes.get(&name).copied()
    }
}

struct KnownProc {
    arg_count: usize,
}

pub fn parse(input: &str) -> Result<(Program, Vec<(TokenKind, Line)>), Error> {
    let (tokens, program_lines) = Lexer::tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        known_procs: Map::new(),
    };
    let program = parser.parse_program()?;
    Ok((program, program_lines))
}

struct Parser<'src> {
    tokens: Vec<Token<'src>>,
    pos: usize,
    known_procs: Map<Id, KnownProc>,
}

fn id(text: &str) -> Id {
    internment::Intern::new(text.to_string())
}

impl<'src> Parser<'src> {
    fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn current_line(&self) -> Line {
        self.peek()
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn advance(&mut self) -> Option<Token<'src>> {
        let tok = self.tokens.get(self.pos).copied();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token<'src>, Error> {
        match self.advance() {
            Some(tok) if tok.kind == kind => Ok(tok),
            Some(tok) => Err(Error::Parse {
                message: format!("expected {kind}, found {}", tok.kind),
                line: tok.line,
            }),
            None => Err(Error::Parse {
                message: format!("expected {kind}, found end of input"),
                line: self.current_line(),
            }),
        }
    }

    fn expect_pid(&mut self) -> Result<(Id, Line), Error> {
        let tok = self.expect(TokenKind::Pid)?;
        Ok((id(tok.text), tok.line))
    }

    fn expect_num(&mut self) -> Result<(u32, Line), Error> {
        let tok = self.expect(TokenKind::Num)?;
        let value: u32 = tok.text.parse().map_err(|_| Error::Parse {
            message: format!("numeric literal {} is out of range", tok.text),
            line: tok.line,
        })?;
        Ok((value, tok.line))
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    // program_all := procedures main
    fn parse_program(&mut self) -> Result<Program, Error> {
        let mut procedures = Vec::new();
        while self.at(TokenKind::Procedure) {
            procedures.push(self.parse_procedure()?);
        }
        let main = self.parse_main()?;
        Ok(Program { procedures, main })
    }

    fn parse_procedure(&mut self) -> Result<ProcDecl, Error> {
        self.expect(TokenKind::Procedure)?;
        let (name, _) = self.expect_pid()?;
        self.expect(TokenKind::LParen)?;
        let mut scope = Scope::default();
        let params = self.parse_args_decl(&mut scope)?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Is)?;
        let decls = if self.at(TokenKind::In) {
            Vec::new()
        } else {
            self.parse_declarations(&mut scope)?
        };
        let in_tok = self.expect(TokenKind::In)?;
        let body = self.parse_commands(&mut scope)?;
        self.expect(TokenKind::End)?;

        self.known_procs.insert(
            name,
            KnownProc {
                arg_count: params.len(),
            },
        );

        Ok(ProcDecl {
            name,
            params,
            decls,
            body,
            lineno: in_tok.line,
        })
    }

    fn parse_main(&mut self) -> Result<MainDecl, Error> {
        self.expect(TokenKind::Program)?;
        self.expect(TokenKind::Is)?;
        let mut scope = Scope::default();
        let decls = if self.at(TokenKind::In) {
            Vec::new()
        } else {
            self.parse_declarations(&mut scope)?
        };
        let in_tok = self.expect(TokenKind::In)?;
        let body = self.parse_commands(&mut scope)?;
        self.expect(TokenKind::End)?;
        Ok(MainDecl {
            decls,
            body,
            lineno: in_tok.line,
        })
    }

    // args_decl := (PID | T PID) ("," (PID | T PID))*
    fn parse_args_decl(&mut self, scope: &mut Scope) -> Result<Vec<Param>, Error> {
        let mut params = vec![self.parse_one_arg_decl(scope)?];
        while self.at(TokenKind::Comma) {
            self.advance();
            params.push(self.parse_one_arg_decl(scope)?);
        }
        Ok(params)
    }

    fn parse_one_arg_decl(&mut self, scope: &mut Scope) -> Result<Param, Error> {
        if self.at(TokenKind::Tab) {
            self.advance();
            let (name, _) = self.expect_pid()?;
            scope.declare(name, Shape::Array);
            Ok(Param::Array(name))
        } else {
            let (name, _) = self.expect_pid()?;
            scope.declare(name, Shape::Scalar);
            Ok(Param::Scalar(name))
        }
    }

    // declarations := decl ("," decl)*
    fn parse_declarations(&mut self, scope: &mut Scope) -> Result<Vec<Decl>, Error> {
        let mut decls = vec![self.parse_one_decl(scope)?];
        while self.at(TokenKind::Comma) {
            self.advance();
            decls.push(self.parse_one_decl(scope)?);
        }
        Ok(decls)
    }

    fn parse_one_decl(&mut self, scope: &mut Scope) -> Result<Decl, Error> {
        let (name, _) = self.expect_pid()?;
        if self.at(TokenKind::LBracket) {
            self.advance();
            let (size, line) = self.expect_num()?;
            self.expect(TokenKind::RBracket)?;
            if size == 0 {
                return Err(Error::ZeroSizedArray { name, line });
            }
            scope.declare(name, Shape::Array);
            Ok(Decl::Array(name, size))
        } else {
            scope.declare(name, Shape::Scalar);
            Ok(Decl::Scalar(name))
        }
    }

    // commands := command+
    fn parse_commands(&mut self, scope: &mut Scope) -> Result<Vec<Stmt>, Error> {
        let mut body = vec![self.parse_command(scope)?];
        while !self.at_block_terminator() {
            body.push(self.parse_command(scope)?);
        }
        Ok(body)
    }

    fn at_block_terminator(&self) -> bool {
        matches!(
            self.peek_kind(),
            None | Some(TokenKind::End)
                | Some(TokenKind::Else)
                | Some(TokenKind::EndIf)
                | Some(TokenKind::EndWhile)
                | Some(TokenKind::Until)
        )
    }

    fn parse_command(&mut self, scope: &mut Scope) -> Result<Stmt, Error> {
        match self.peek_kind() {
            Some(TokenKind::Pid) => self.parse_assign_or_call(scope),
            Some(TokenKind::If) => self.parse_if(scope),
            Some(TokenKind::While) => self.parse_while(scope),
            Some(TokenKind::Repeat) => self.parse_repeat(scope),
            Some(TokenKind::Read) => {
                self.advance();
                let target = self.parse_lvalue(scope)?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Read(target))
            }
            Some(TokenKind::Write) => {
                self.advance();
                let value = self.parse_rvalue(scope)?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Write(value))
            }
            _ => Err(Error::Parse {
                message: "expected a statement".to_string(),
                line: self.current_line(),
            }),
        }
    }

    fn parse_assign_or_call(&mut self, scope: &mut Scope) -> Result<Stmt, Error> {
        // Disambiguate `name := expr;` from `name(args);` by looking one
        // token past the identifier.
        let save = self.pos;
        let (name, line) = self.expect_pid()?;
        if self.at(TokenKind::LParen) {
            let args = self.parse_proc_call_args()?;
            self.expect(TokenKind::Semicolon)?;
            return Ok(Stmt::ProcCall { name, args, line });
        }
        self.pos = save;
        let target = self.parse_lvalue(scope)?;
        self.expect(TokenKind::Assign)?;
        let expr = self.parse_expr(scope)?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::Assign(target, expr))
    }

    fn parse_proc_call_args(&mut self) -> Result<Vec<Id>, Error> {
        let (name, line) = {
            let tok = self.tokens[self.pos - 1];
            (id(tok.text), tok.line)
        };
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) {
            let (first, _) = self.expect_pid()?;
            args.push(first);
            while self.at(TokenKind::Comma) {
                self.advance();
                let (arg, _) = self.expect_pid()?;
                args.push(arg);
            }
        }
        self.expect(TokenKind::RParen)?;

        let known = self
            .known_procs
            .get(&name)
            .ok_or(Error::UnknownProcedure { name, line })?;
        if known.arg_count != args.len() {
            return Err(Error::ArgCountMismatch {
                name,
                expected: known.arg_count,
                got: args.len(),
                line,
            });
        }
        Ok(args)
    }

    fn parse_if(&mut self, scope: &mut Scope) -> Result<Stmt, Error> {
        self.expect(TokenKind::If)?;
        let cond = self.parse_condition(scope)?;
        self.expect(TokenKind::Then)?;
        let tt = self.parse_commands(scope)?;
        if self.at(TokenKind::Else) {
            self.advance();
            let ff = self.parse_commands(scope)?;
            self.expect(TokenKind::EndIf)?;
            let mut consts = collect_write_consts(&tt);
            consts.extend(collect_write_consts(&ff));
            Ok(Stmt::IfElse { cond, tt, ff, consts })
        } else {
            self.expect(TokenKind::EndIf)?;
            let consts = collect_write_consts(&tt);
            Ok(Stmt::If { cond, body: tt, consts })
        }
    }

    fn parse_while(&mut self, scope: &mut Scope) -> Result<Stmt, Error> {
        self.expect(TokenKind::While)?;
        let cond = self.parse_condition(scope)?;
        self.expect(TokenKind::Do)?;
        let body = self.parse_commands(scope)?;
        self.expect(TokenKind::EndWhile)?;
        let consts = collect_write_consts(&body);
        Ok(Stmt::While { cond, body, consts })
    }

    fn parse_repeat(&mut self, scope: &mut Scope) -> Result<Stmt, Error> {
        self.expect(TokenKind::Repeat)?;
        let body = self.parse_commands(scope)?;
        self.expect(TokenKind::Until)?;
        let cond = self.parse_condition(scope)?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::Until { cond, body })
    }

    fn parse_condition(&mut self, scope: &mut Scope) -> Result<Cond, Error> {
        let lhs = self.parse_rvalue(scope)?;
        let rel = match self.advance().map(|t| t.kind) {
            Some(TokenKind::Eq) => RelOp::Eq,
            Some(TokenKind::Ne) => RelOp::Ne,
            Some(TokenKind::Lt) => RelOp::Lt,
            Some(TokenKind::Gt) => RelOp::Gt,
            Some(TokenKind::Le) => RelOp::Le,
            Some(TokenKind::Ge) => RelOp::Ge,
            _ => {
                return Err(Error::Parse {
                    message: "expected a relational operator".to_string(),
                    line: self.current_line(),
                })
            }
        };
        let rhs = self.parse_rvalue(scope)?;
        Ok(Cond { rel, lhs, rhs })
    }

    // expr := term (("+"|"-") term)*
    fn parse_expr(&mut self, scope: &mut Scope) -> Result<Expr, Error> {
        let mut lhs = self.parse_term(scope)?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BOp::Add,
                Some(TokenKind::Minus) => BOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_term(scope)?;
            lhs = Expr::BinOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    // term := factor (("*"|"/"|"%") factor)*
    fn parse_term(&mut self, scope: &mut Scope) -> Result<Expr, Error> {
        let mut lhs = self.parse_factor(scope)?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BOp::Mul,
                Some(TokenKind::Slash) => BOp::Div,
                Some(TokenKind::Percent) => BOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_factor(scope)?;
            lhs = Expr::BinOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_factor(&mut self, scope: &mut Scope) -> Result<Expr, Error> {
        if self.at(TokenKind::LParen) {
            self.advance();
            let inner = self.parse_expr(scope)?;
            self.expect(TokenKind::RParen)?;
            Ok(inner)
        } else {
            Ok(Expr::Leaf(self.parse_rvalue(scope)?))
        }
    }

    fn parse_rvalue(&mut self, scope: &mut Scope) -> Result<RValue, Error> {
        if self.at(TokenKind::Num) {
            let (n, _) = self.expect_num()?;
            Ok(RValue::Const(n as i64))
        } else {
            Ok(RValue::Load(self.parse_lvalue(scope)?))
        }
    }

    // identifier := PID | PID "[" NUM "]" | PID "[" PID "]"
    fn parse_lvalue(&mut self, scope: &mut Scope) -> Result<LValue, Error> {
        let (name, line) = self.expect_pid()?;
        if self.at(TokenKind::LBracket) {
            self.advance();
            match scope.shape(name) {
                Some(Shape::Array) => {}
                Some(Shape::Scalar) => return Err(Error::ShapeMismatch { name, line }),
                None => return Err(Error::UndeclaredName { name, line }),
            }
            let index = if self.at(TokenKind::Num) {
                let (n, _) = self.expect_num()?;
                Index::Const(n as i64)
            } else {
                let (idx_name, _) = self.expect_pid()?;
                match scope.shape(idx_name) {
                    Some(Shape::Scalar) => Index::Load(LValue::Name(idx_name)),
                    _ => Index::Load(LValue::Undeclared(idx_name)),
                }
            };
            self.expect(TokenKind::RBracket)?;
            Ok(LValue::ArrayElem(name, Box::new(index)))
        } else {
            match scope.shape(name) {
                Some(_) => Ok(LValue::Name(name)),
                None => Ok(LValue::Undeclared(name)),
            }
        }
    }
}

/// Literals written directly in `body` (not inside a nested `if`/`while`,
/// whose own parse already harvested theirs) need to be pre-materialized
/// on every path into the block (see `back::stmt::prepare_consts_before_block`).
fn collect_write_consts(body: &[Stmt]) -> Set<i64> {
    let mut consts = Set::new();
    for stmt in body {
        if let Stmt::Write(RValue::Const(n)) = stmt {
            consts.insert(*n);
        }
    }
    consts
}
