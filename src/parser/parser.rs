//! Recursive-descent parser for the Joos 1W grammar.
//!
//! Constructs not in Joos (switch, try, labeled statements, compound
//! assignment, ...) are tokenized and rejected here with a message naming
//! the construct, so the user sees more than a bare "unexpected token".

use crate::ast::*;
use crate::parser::error::ParseError;
use crate::parser::lexer::{unescape, LexicalToken, Lexer, Token};
use crate::parser::span::{Location, Span};

/// Allocator for statement/expression node ids, shared across all units of
/// a program so that attribute tables can be keyed globally.
#[derive(Debug, Default)]
pub struct AstIds {
    next: NodeId,
}

impl AstIds {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh(&mut self) -> NodeId {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Parse one source file into a compilation unit.
pub fn parse_unit(
    source: &str,
    file_name: &str,
    ids: &mut AstIds,
) -> Result<CompilationUnit, ParseError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser { tokens, pos: 0, ids };
    parser.compilation_unit(file_name)
}

struct Parser<'a> {
    tokens: Vec<LexicalToken>,
    pos: usize,
    ids: &'a mut AstIds,
}

type PResult<T> = Result<T, ParseError>;

impl<'a> Parser<'a> {
    // ---- token cursor -----------------------------------------------------

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|t| t.token)
    }

    fn peek_at(&self, n: usize) -> Option<Token> {
        self.tokens.get(self.pos + n).map(|t| t.token)
    }

    fn here(&self) -> Location {
        self.tokens
            .get(self.pos)
            .map(|t| t.location)
            .unwrap_or_else(|| {
                self.tokens
                    .last()
                    .map(|t| t.location)
                    .unwrap_or_else(Location::start)
            })
    }

    fn advance(&mut self) -> Option<&LexicalToken> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&mut self, token: Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> PResult<&LexicalToken> {
        if self.peek() == Some(token) {
            let t = &self.tokens[self.pos];
            self.pos += 1;
            Ok(t)
        } else {
            Err(self.err(format!("expected {what}")))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> PResult<(String, Span)> {
        if self.peek() == Some(Token::Identifier) {
            let t = &self.tokens[self.pos];
            let name = t.lexeme.clone();
            let span = Span::single(t.location);
            self.pos += 1;
            Ok((name, span))
        } else {
            Err(self.err(format!("expected {what}")))
        }
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        let mut message = message.into();
        if let Some(token) = self.tokens.get(self.pos) {
            message.push_str(&format!(", found '{}'", token.lexeme));
        } else {
            message.push_str(", found end of input");
        }
        ParseError::unexpected(message, self.here())
    }

    fn unsupported(&self, construct: &str) -> ParseError {
        ParseError::unexpected(format!("{construct} is not part of Joos"), self.here())
    }

    // ---- compilation unit -------------------------------------------------

    fn compilation_unit(&mut self, file_name: &str) -> PResult<CompilationUnit> {
        let start = self.here();

        let package = if self.check(Token::Package) {
            let (name, _) = self.qualified_name()?;
            self.expect(Token::Semicolon, "';' after package declaration")?;
            name
        } else {
            String::new()
        };

        let mut imports = Vec::new();
        while self.peek() == Some(Token::Import) {
            imports.push(self.import_decl()?);
        }

        let ty = self.type_decl()?;

        if self.pos < self.tokens.len() {
            return Err(self.err("expected end of file after type declaration"));
        }

        let end = self.tokens.last().map(|t| t.location).unwrap_or(start);
        Ok(CompilationUnit {
            file_name: file_name.to_string(),
            package,
            imports,
            ty,
            span: start.to(end),
        })
    }

    fn import_decl(&mut self) -> PResult<ImportDecl> {
        let start = self.here();
        self.expect(Token::Import, "'import'")?;
        let (first, _) = self.expect_identifier("identifier in import")?;
        let mut ids = vec![first];
        let mut on_demand = false;
        while self.check(Token::Dot) {
            if self.check(Token::Star) {
                on_demand = true;
                break;
            }
            let (id, _) = self.expect_identifier("identifier in import")?;
            ids.push(id);
        }
        let end = self.here();
        self.expect(Token::Semicolon, "';' after import")?;
        Ok(ImportDecl {
            name: ids.join("."),
            on_demand,
            span: start.to(end),
        })
    }

    fn qualified_name(&mut self) -> PResult<(String, Span)> {
        let start = self.here();
        let (first, _) = self.expect_identifier("identifier")?;
        let mut ids = vec![first];
        while self.peek() == Some(Token::Dot) && self.peek_at(1) == Some(Token::Identifier) {
            self.advance();
            let (id, _) = self.expect_identifier("identifier")?;
            ids.push(id);
        }
        Ok((ids.join("."), start.to(self.here())))
    }

    // ---- declarations -----------------------------------------------------

    fn modifiers(&mut self) -> PResult<Vec<Modifier>> {
        let mut modifiers = Vec::new();
        while let Some(token) = self.peek() {
            if !token.is_modifier() {
                break;
            }
            let modifier = match token {
                Token::Public => Modifier::Public,
                Token::Protected => Modifier::Protected,
                Token::Abstract => Modifier::Abstract,
                Token::Static => Modifier::Static,
                Token::Final => Modifier::Final,
                Token::Native => Modifier::Native,
                _ => {
                    let lexeme = self.tokens[self.pos].lexeme.clone();
                    return Err(self.unsupported(&format!("the '{lexeme}' modifier")));
                }
            };
            self.advance();
            modifiers.push(modifier);
        }
        Ok(modifiers)
    }

    fn type_decl(&mut self) -> PResult<TypeDeclNode> {
        let start = self.here();
        let modifiers = self.modifiers()?;
        match self.peek() {
            Some(Token::Class) => Ok(TypeDeclNode::Class(self.class_decl(modifiers, start)?)),
            Some(Token::Interface) => {
                Ok(TypeDeclNode::Interface(self.interface_decl(modifiers, start)?))
            }
            _ => Err(self.err("expected 'class' or 'interface'")),
        }
    }

    fn class_decl(&mut self, modifiers: Vec<Modifier>, start: Location) -> PResult<ClassDecl> {
        self.expect(Token::Class, "'class'")?;
        let (name, _) = self.expect_identifier("class name")?;

        let extends = if self.check(Token::Extends) {
            Some(self.named_type_ref()?)
        } else {
            None
        };

        let mut implements = Vec::new();
        if self.check(Token::Implements) {
            loop {
                implements.push(self.named_type_ref()?);
                if !self.check(Token::Comma) {
                    break;
                }
            }
        }

        self.expect(Token::LBrace, "'{' to open class body")?;
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        let mut constructors = Vec::new();
        while self.peek() != Some(Token::RBrace) {
            if self.peek().is_none() {
                return Err(self.err("unterminated class body"));
            }
            self.class_member(&name, &mut fields, &mut methods, &mut constructors)?;
        }
        let end = self.here();
        self.expect(Token::RBrace, "'}'")?;

        Ok(ClassDecl {
            modifiers,
            name,
            extends,
            implements,
            fields,
            methods,
            constructors,
            span: start.to(end),
        })
    }

    fn interface_decl(
        &mut self,
        modifiers: Vec<Modifier>,
        start: Location,
    ) -> PResult<InterfaceDecl> {
        self.expect(Token::Interface, "'interface'")?;
        let (name, _) = self.expect_identifier("interface name")?;

        let mut extends = Vec::new();
        if self.check(Token::Extends) {
            loop {
                extends.push(self.named_type_ref()?);
                if !self.check(Token::Comma) {
                    break;
                }
            }
        }

        self.expect(Token::LBrace, "'{' to open interface body")?;
        let mut methods = Vec::new();
        while self.peek() != Some(Token::RBrace) {
            if self.peek().is_none() {
                return Err(self.err("unterminated interface body"));
            }
            let member_start = self.here();
            let member_modifiers = self.modifiers()?;
            let return_ty = self.type_ref_or_void()?;
            let (method_name, _) = self.expect_identifier("method name")?;
            methods.push(self.method_rest(member_modifiers, return_ty, method_name, member_start)?);
        }
        let end = self.here();
        self.expect(Token::RBrace, "'}'")?;

        Ok(InterfaceDecl { modifiers, name, extends, methods, span: start.to(end) })
    }

    fn class_member(
        &mut self,
        class_name: &str,
        fields: &mut Vec<FieldDecl>,
        methods: &mut Vec<MethodDecl>,
        constructors: &mut Vec<ConstructorDecl>,
    ) -> PResult<()> {
        let start = self.here();
        let modifiers = self.modifiers()?;

        // `static { ... }` initializer blocks are not part of Joos.
        if self.peek() == Some(Token::LBrace) {
            return Err(self.unsupported("a static initializer block"));
        }

        // Constructor: class name directly followed by '('.
        if self.peek() == Some(Token::Identifier)
            && self.tokens[self.pos].lexeme == class_name
            && self.peek_at(1) == Some(Token::LParen)
        {
            let (name, _) = self.expect_identifier("constructor name")?;
            let params = self.formal_params()?;
            let throws = self.throws_clause()?;
            let body = self.block()?;
            constructors.push(ConstructorDecl {
                modifiers,
                name,
                params,
                throws,
                body,
                implicit: false,
                span: start.to(self.here()),
            });
            return Ok(());
        }

        let ty = self.type_ref_or_void()?;
        let (name, _) = self.expect_identifier("member name")?;

        if self.peek() == Some(Token::LParen) {
            methods.push(self.method_rest(modifiers, ty, name, start)?);
        } else {
            // Field declaration; Joos allows a single declarator.
            let init = if self.check(Token::Assign) {
                Some(self.expression()?)
            } else {
                None
            };
            let end = self.here();
            self.expect(Token::Semicolon, "';' after field declaration")?;
            fields.push(FieldDecl { modifiers, ty, name, init, span: start.to(end) });
        }
        Ok(())
    }

    fn method_rest(
        &mut self,
        modifiers: Vec<Modifier>,
        return_ty: TypeRef,
        name: String,
        start: Location,
    ) -> PResult<MethodDecl> {
        let params = self.formal_params()?;
        let throws = self.throws_clause()?;
        let body = if self.check(Token::Semicolon) {
            None
        } else {
            Some(self.block()?)
        };
        Ok(MethodDecl {
            modifiers,
            return_ty,
            name,
            params,
            throws,
            body,
            span: start.to(self.here()),
        })
    }

    fn formal_params(&mut self) -> PResult<Vec<Param>> {
        self.expect(Token::LParen, "'('")?;
        let mut params = Vec::new();
        if self.peek() != Some(Token::RParen) {
            loop {
                let start = self.here();
                let ty = self.type_ref()?;
                let (name, _) = self.expect_identifier("parameter name")?;
                params.push(Param { ty, name, span: start.to(self.here()) });
                if !self.check(Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::RParen, "')'")?;
        Ok(params)
    }

    fn throws_clause(&mut self) -> PResult<Vec<TypeRef>> {
        let mut throws = Vec::new();
        if self.check(Token::Throws) {
            loop {
                throws.push(self.named_type_ref()?);
                if !self.check(Token::Comma) {
                    break;
                }
            }
        }
        Ok(throws)
    }

    // ---- types ------------------------------------------------------------

    fn named_type_ref(&mut self) -> PResult<TypeRef> {
        let (name, span) = self.qualified_name()?;
        Ok(TypeRef { kind: TypeRefKind::Named(name), span })
    }

    fn type_ref(&mut self) -> PResult<TypeRef> {
        let ty = self.type_ref_or_void()?;
        if ty.kind == TypeRefKind::Void {
            return Err(self.unsupported("'void' outside a method return type"));
        }
        Ok(ty)
    }

    fn type_ref_or_void(&mut self) -> PResult<TypeRef> {
        let start = self.here();
        let base = match self.peek() {
            Some(Token::Void) => {
                self.advance();
                TypeRefKind::Void
            }
            Some(Token::Boolean) => {
                self.advance();
                TypeRefKind::Boolean
            }
            Some(Token::Byte) => {
                self.advance();
                TypeRefKind::Byte
            }
            Some(Token::Short) => {
                self.advance();
                TypeRefKind::Short
            }
            Some(Token::Int) => {
                self.advance();
                TypeRefKind::Int
            }
            Some(Token::Char) => {
                self.advance();
                TypeRefKind::Char
            }
            Some(Token::Long) | Some(Token::Float) | Some(Token::Double) => {
                return Err(self.unsupported("this primitive type"))
            }
            Some(Token::Identifier) => {
                let (name, _) = self.qualified_name()?;
                TypeRefKind::Named(name)
            }
            _ => return Err(self.err("expected a type")),
        };

        let kind = if self.peek() == Some(Token::LBracket) && self.peek_at(1) == Some(Token::RBracket)
        {
            self.advance();
            self.advance();
            if base == TypeRefKind::Void {
                return Err(self.err("'void' cannot be an array element type"));
            }
            if self.peek() == Some(Token::LBracket) {
                return Err(self.unsupported("a multidimensional array type"));
            }
            TypeRefKind::Array(Box::new(base))
        } else {
            base
        };

        Ok(TypeRef { kind, span: start.to(self.here()) })
    }

    // ---- statements -------------------------------------------------------

    fn block(&mut self) -> PResult<Block> {
        let start = self.here();
        self.expect(Token::LBrace, "'{'")?;
        let mut statements = Vec::new();
        while self.peek() != Some(Token::RBrace) {
            if self.peek().is_none() {
                return Err(self.err("unterminated block"));
            }
            statements.push(self.statement()?);
        }
        let end = self.here();
        self.expect(Token::RBrace, "'}'")?;
        Ok(Block { statements, span: start.to(end) })
    }

    fn statement(&mut self) -> PResult<Stmt> {
        let start = self.here();
        match self.peek() {
            Some(Token::LBrace) => {
                let block = self.block()?;
                Ok(self.stmt(StmtKind::Block(block), start))
            }
            Some(Token::Semicolon) => {
                self.advance();
                Ok(self.stmt(StmtKind::Empty, start))
            }
            Some(Token::If) => self.if_statement(start),
            Some(Token::While) => self.while_statement(start),
            Some(Token::For) => self.for_statement(start),
            Some(Token::Return) => {
                self.advance();
                let value = if self.peek() == Some(Token::Semicolon) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.expect(Token::Semicolon, "';' after return")?;
                Ok(self.stmt(StmtKind::Return(value), start))
            }
            Some(Token::Switch) => Err(self.unsupported("a switch statement")),
            Some(Token::Do) => Err(self.unsupported("a do-while statement")),
            Some(Token::Break) => Err(self.unsupported("a break statement")),
            Some(Token::Continue) => Err(self.unsupported("a continue statement")),
            Some(Token::Try) | Some(Token::Catch) | Some(Token::Finally) => {
                Err(self.unsupported("a try statement"))
            }
            Some(Token::Throw) => Err(self.unsupported("a throw statement")),
            Some(Token::Synchronized) => Err(self.unsupported("a synchronized statement")),
            Some(Token::Identifier)
                if self.peek_at(1) == Some(Token::Colon) =>
            {
                Err(self.unsupported("a labeled statement"))
            }
            _ => {
                if let Some(decl) = self.try_local_var_decl()? {
                    self.expect(Token::Semicolon, "';' after local variable declaration")?;
                    Ok(self.stmt(StmtKind::LocalVar(decl), start))
                } else {
                    let expr = self.expression()?;
                    self.expect(Token::Semicolon, "';' after expression statement")?;
                    Ok(self.stmt(StmtKind::Expr(expr), start))
                }
            }
        }
    }

    fn stmt(&mut self, kind: StmtKind, start: Location) -> Stmt {
        Stmt { id: self.ids.fresh(), kind, span: start.to(self.here()) }
    }

    fn if_statement(&mut self, start: Location) -> PResult<Stmt> {
        self.expect(Token::If, "'if'")?;
        self.expect(Token::LParen, "'(' after 'if'")?;
        let cond = self.expression()?;
        self.expect(Token::RParen, "')' after condition")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.check(Token::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(self.stmt(StmtKind::If { cond, then_branch, else_branch }, start))
    }

    fn while_statement(&mut self, start: Location) -> PResult<Stmt> {
        self.expect(Token::While, "'while'")?;
        self.expect(Token::LParen, "'(' after 'while'")?;
        let cond = self.expression()?;
        self.expect(Token::RParen, "')' after condition")?;
        let body = Box::new(self.statement()?);
        Ok(self.stmt(StmtKind::While { cond, body }, start))
    }

    fn for_statement(&mut self, start: Location) -> PResult<Stmt> {
        self.expect(Token::For, "'for'")?;
        self.expect(Token::LParen, "'(' after 'for'")?;

        let init = if self.peek() == Some(Token::Semicolon) {
            None
        } else if let Some(decl) = self.try_local_var_decl()? {
            Some(Box::new(ForInit::Decl(decl)))
        } else {
            Some(Box::new(ForInit::Expr(self.expression()?)))
        };
        self.expect(Token::Semicolon, "';' after for-init")?;

        let cond = if self.peek() == Some(Token::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(Token::Semicolon, "';' after for-condition")?;

        let update = if self.peek() == Some(Token::RParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(Token::RParen, "')' after for-update")?;

        let body = Box::new(self.statement()?);
        Ok(self.stmt(StmtKind::For { init, cond, update, body }, start))
    }

    /// Tentatively parse `Type Identifier [= Expr]`. Backtracks and returns
    /// `None` when the lookahead is an expression statement instead.
    fn try_local_var_decl(&mut self) -> PResult<Option<LocalVarDecl>> {
        let looks_like_decl = match self.peek() {
            Some(t) if t.is_primitive_type() => true,
            Some(Token::Identifier) => self.scan_type_then_identifier(),
            _ => false,
        };
        if !looks_like_decl {
            return Ok(None);
        }

        let start = self.here();
        let id = self.ids.fresh();
        let ty = self.type_ref()?;
        let (name, _) = self.expect_identifier("variable name")?;
        let init = if self.check(Token::Assign) {
            Some(self.expression()?)
        } else {
            None
        };
        Ok(Some(LocalVarDecl { id, ty, name, init, span: start.to(self.here()) }))
    }

    /// Lookahead: does the token stream start with a (possibly qualified,
    /// possibly array) type name followed by an identifier?
    fn scan_type_then_identifier(&self) -> bool {
        let mut i = self.pos;
        loop {
            if self.tokens.get(i).map(|t| t.token) != Some(Token::Identifier) {
                return false;
            }
            i += 1;
            if self.tokens.get(i).map(|t| t.token) == Some(Token::Dot) {
                i += 1;
                continue;
            }
            break;
        }
        if self.tokens.get(i).map(|t| t.token) == Some(Token::LBracket)
            && self.tokens.get(i + 1).map(|t| t.token) == Some(Token::RBracket)
        {
            i += 2;
        }
        self.tokens.get(i).map(|t| t.token) == Some(Token::Identifier)
    }

    // ---- expressions ------------------------------------------------------

    fn expression(&mut self) -> PResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> PResult<Expr> {
        let start = self.here();
        let lhs = self.conditional_or()?;

        match self.peek() {
            Some(Token::Assign) => {
                if !is_lvalue(&lhs.kind) {
                    return Err(self.err("left-hand side of assignment is not a variable"));
                }
                self.advance();
                let rhs = self.assignment()?;
                Ok(self.expr(
                    ExprKind::Assign { lhs: Box::new(lhs), rhs: Box::new(rhs) },
                    start,
                ))
            }
            Some(Token::AddAssign) | Some(Token::SubAssign) | Some(Token::MulAssign)
            | Some(Token::DivAssign) | Some(Token::ModAssign) => {
                Err(self.unsupported("compound assignment"))
            }
            Some(Token::Question) => Err(self.unsupported("the conditional operator")),
            _ => Ok(lhs),
        }
    }

    fn conditional_or(&mut self) -> PResult<Expr> {
        let start = self.here();
        let mut lhs = self.conditional_and()?;
        while self.check(Token::OrOr) {
            let rhs = self.conditional_and()?;
            lhs = self.binary(BinaryOp::Or, lhs, rhs, start);
        }
        Ok(lhs)
    }

    fn conditional_and(&mut self) -> PResult<Expr> {
        let start = self.here();
        let mut lhs = self.eager_or()?;
        while self.check(Token::AndAnd) {
            let rhs = self.eager_or()?;
            lhs = self.binary(BinaryOp::And, lhs, rhs, start);
        }
        Ok(lhs)
    }

    fn eager_or(&mut self) -> PResult<Expr> {
        let start = self.here();
        let mut lhs = self.eager_and()?;
        while self.peek() == Some(Token::Pipe) {
            self.advance();
            let rhs = self.eager_and()?;
            lhs = self.binary(BinaryOp::EagerOr, lhs, rhs, start);
        }
        Ok(lhs)
    }

    fn eager_and(&mut self) -> PResult<Expr> {
        let start = self.here();
        let mut lhs = self.equality()?;
        while self.peek() == Some(Token::Amp) {
            self.advance();
            let rhs = self.equality()?;
            lhs = self.binary(BinaryOp::EagerAnd, lhs, rhs, start);
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> PResult<Expr> {
        let start = self.here();
        let mut lhs = self.relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => BinaryOp::Eq,
                Some(Token::Ne) => BinaryOp::Ne,
                _ => break,
            };
            self.advance();
            let rhs = self.relational()?;
            lhs = self.binary(op, lhs, rhs, start);
        }
        Ok(lhs)
    }

    fn relational(&mut self) -> PResult<Expr> {
        let start = self.here();
        let mut lhs = self.additive()?;
        loop {
            match self.peek() {
                Some(token @ (Token::Lt | Token::Le | Token::Gt | Token::Ge)) => {
                    let op = match token {
                        Token::Lt => BinaryOp::Lt,
                        Token::Le => BinaryOp::Le,
                        Token::Gt => BinaryOp::Gt,
                        _ => BinaryOp::Ge,
                    };
                    self.advance();
                    let rhs = self.additive()?;
                    lhs = self.binary(op, lhs, rhs, start);
                }
                Some(Token::InstanceOf) => {
                    self.advance();
                    let ty = self.type_ref()?;
                    lhs = self.expr(
                        ExprKind::InstanceOf { expr: Box::new(lhs), ty },
                        start,
                    );
                }
                Some(Token::LShift) | Some(Token::RShift) | Some(Token::URShift) => {
                    return Err(self.unsupported("a shift operator"))
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> PResult<Expr> {
        let start = self.here();
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = self.binary(op, lhs, rhs, start);
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> PResult<Expr> {
        let start = self.here();
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                Some(Token::Caret) => return Err(self.unsupported("the '^' operator")),
                _ => break,
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = self.binary(op, lhs, rhs, start);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> PResult<Expr> {
        let start = self.here();
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                let operand = self.unary()?;
                Ok(self.expr(ExprKind::Unary { op: UnaryOp::Minus, operand: Box::new(operand) }, start))
            }
            Some(Token::Bang) => {
                self.advance();
                let operand = self.unary()?;
                Ok(self.expr(ExprKind::Unary { op: UnaryOp::Not, operand: Box::new(operand) }, start))
            }
            Some(Token::Tilde) => Err(self.unsupported("the '~' operator")),
            Some(Token::Inc) => Err(self.unsupported("the increment operator")),
            Some(Token::Dec) => Err(self.unsupported("the decrement operator")),
            _ => self.unary_not_plus_minus(),
        }
    }

    fn unary_not_plus_minus(&mut self) -> PResult<Expr> {
        let start = self.here();
        if self.peek() == Some(Token::LParen) {
            if let Some(cast) = self.try_cast(start)? {
                return Ok(cast);
            }
        }
        self.postfix()
    }

    /// Cast disambiguation per the JLS grammar: `(PrimitiveType) Unary` is
    /// always a cast; `(Name) UnaryNotPlusMinus` is a cast only when the
    /// parenthesized text is a bare (possibly array) name and the next token
    /// can begin an operand.
    fn try_cast(&mut self, start: Location) -> PResult<Option<Expr>> {
        let saved = self.pos;
        self.advance(); // '('

        let is_primitive = matches!(
            self.peek(),
            Some(t) if t.is_primitive_type()
        );

        let ty = match self.type_ref_checkpointed() {
            Some(ty) => ty,
            None => {
                self.pos = saved;
                return Ok(None);
            }
        };

        if self.peek() != Some(Token::RParen) {
            self.pos = saved;
            return Ok(None);
        }
        self.advance(); // ')'

        let is_array = matches!(ty.kind, TypeRefKind::Array(_));
        let operand_follows = match self.peek() {
            Some(Token::Identifier)
            | Some(Token::DecimalInteger)
            | Some(Token::LeadingZeroInteger)
            | Some(Token::StringLiteral)
            | Some(Token::CharLiteral)
            | Some(Token::True)
            | Some(Token::False)
            | Some(Token::Null)
            | Some(Token::This)
            | Some(Token::New)
            | Some(Token::LParen)
            | Some(Token::Bang) => true,
            Some(Token::Minus) => is_primitive,
            _ => false,
        };

        if !(is_primitive || is_array) && !operand_follows {
            self.pos = saved;
            return Ok(None);
        }
        if !operand_follows && !(is_primitive && self.peek() == Some(Token::Minus)) {
            return Err(self.err("expected operand after cast"));
        }

        let operand = if is_primitive {
            self.unary()?
        } else {
            self.unary_not_plus_minus()?
        };
        Ok(Some(self.expr(ExprKind::Cast { ty, expr: Box::new(operand) }, start)))
    }

    /// Like `type_ref` but returns `None` instead of an error, for use
    /// inside the cast lookahead.
    fn type_ref_checkpointed(&mut self) -> Option<TypeRef> {
        let saved = self.pos;
        match self.type_ref() {
            Ok(ty) => Some(ty),
            Err(_) => {
                self.pos = saved;
                None
            }
        }
    }

    fn postfix(&mut self) -> PResult<Expr> {
        let start = self.here();
        let mut expr = self.primary()?;

        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.advance();
                    let (name, _) = self.expect_identifier("member name after '.'")?;
                    if self.peek() == Some(Token::LParen) {
                        let args = self.arguments()?;
                        expr = self.expr(
                            ExprKind::Call { recv: Some(Box::new(expr)), name, args },
                            start,
                        );
                    } else if let ExprKind::Name(base) = &expr.kind {
                        // Extend the ambiguous dotted name in place.
                        let mut ids = base.ids.clone();
                        ids.push(name);
                        let span = base.span.merge(Span::single(self.here()));
                        expr = self.expr(ExprKind::Name(Name { ids, span }), start);
                    } else {
                        expr = self.expr(
                            ExprKind::FieldAccess { target: Box::new(expr), name },
                            start,
                        );
                    }
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index = self.expression()?;
                    self.expect(Token::RBracket, "']' after array index")?;
                    expr = self.expr(
                        ExprKind::ArrayAccess { array: Box::new(expr), index: Box::new(index) },
                        start,
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> PResult<Expr> {
        let start = self.here();
        match self.peek() {
            Some(Token::DecimalInteger) => {
                let lexeme = self.expect(Token::DecimalInteger, "an integer literal")?.lexeme.clone();
                let value: u64 = lexeme.parse().map_err(|_| {
                    ParseError::unexpected("integer literal too large to scan", start)
                })?;
                Ok(self.expr(ExprKind::Literal(Literal::Int(value)), start))
            }
            Some(Token::LeadingZeroInteger) => {
                Err(self.unsupported("an octal integer literal"))
            }
            Some(Token::True) => {
                self.advance();
                Ok(self.expr(ExprKind::Literal(Literal::Bool(true)), start))
            }
            Some(Token::False) => {
                self.advance();
                Ok(self.expr(ExprKind::Literal(Literal::Bool(false)), start))
            }
            Some(Token::Null) => {
                self.advance();
                Ok(self.expr(ExprKind::Literal(Literal::Null), start))
            }
            Some(Token::CharLiteral) => {
                let lexeme = self.expect(Token::CharLiteral, "a character literal")?.lexeme.clone();
                let body = &lexeme[1..lexeme.len() - 1];
                let chars = unescape(body)
                    .map_err(|e| ParseError::unexpected(e, start))?;
                if chars.len() != 1 {
                    return Err(ParseError::unexpected(
                        "character literal must contain exactly one character",
                        start,
                    ));
                }
                Ok(self.expr(ExprKind::Literal(Literal::Char(chars[0])), start))
            }
            Some(Token::StringLiteral) => {
                let lexeme = self.expect(Token::StringLiteral, "a string literal")?.lexeme.clone();
                let body = &lexeme[1..lexeme.len() - 1];
                let chars = unescape(body)
                    .map_err(|e| ParseError::unexpected(e, start))?;
                let value: String = chars.into_iter().collect();
                Ok(self.expr(ExprKind::Literal(Literal::Str(value)), start))
            }
            Some(Token::This) => {
                self.advance();
                Ok(self.expr(ExprKind::This, start))
            }
            Some(Token::Super) => Err(self.unsupported("a 'super' expression")),
            Some(Token::New) => self.new_expression(start),
            Some(Token::LParen) => {
                self.advance();
                let inner = self.expression()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::Identifier) => {
                // Unqualified call or ambiguous dotted name.
                if self.peek_at(1) == Some(Token::LParen) {
                    let (name, _) = self.expect_identifier("method name")?;
                    let args = self.arguments()?;
                    return Ok(self.expr(ExprKind::Call { recv: None, name, args }, start));
                }
                let mut ids = Vec::new();
                let (first, _) = self.expect_identifier("identifier")?;
                ids.push(first);
                while self.peek() == Some(Token::Dot)
                    && self.peek_at(1) == Some(Token::Identifier)
                    && self.peek_at(2) != Some(Token::LParen)
                {
                    self.advance();
                    let (id, _) = self.expect_identifier("identifier")?;
                    ids.push(id);
                }
                let span = start.to(self.here());
                Ok(self.expr(ExprKind::Name(Name { ids, span }), start))
            }
            _ => Err(self.err("expected an expression")),
        }
    }

    fn new_expression(&mut self, start: Location) -> PResult<Expr> {
        self.expect(Token::New, "'new'")?;
        let elem_start = self.here();
        let base = match self.peek() {
            Some(t) if t.is_primitive_type() => self.type_ref_scalar()?,
            Some(Token::Identifier) => {
                let (name, span) = self.qualified_name()?;
                TypeRef { kind: TypeRefKind::Named(name), span }
            }
            _ => return Err(self.err("expected a type after 'new'")),
        };

        if self.peek() == Some(Token::LBracket) {
            self.advance();
            let len = self.expression()?;
            self.expect(Token::RBracket, "']' after array length")?;
            if self.peek() == Some(Token::LBracket) {
                return Err(self.unsupported("multidimensional array creation"));
            }
            let span = elem_start.to(self.here());
            let elem = TypeRef { kind: base.kind, span };
            return Ok(self.expr(ExprKind::NewArray { elem, len: Box::new(len) }, start));
        }

        if matches!(base.kind, TypeRefKind::Named(_)) {
            let args = self.arguments()?;
            Ok(self.expr(ExprKind::New { ty: base, args }, start))
        } else {
            Err(self.err("expected '[' after primitive type in array creation"))
        }
    }

    /// A primitive scalar type, for `new int[...]`-style element types.
    fn type_ref_scalar(&mut self) -> PResult<TypeRef> {
        let start = self.here();
        let kind = match self.peek() {
            Some(Token::Boolean) => TypeRefKind::Boolean,
            Some(Token::Byte) => TypeRefKind::Byte,
            Some(Token::Short) => TypeRefKind::Short,
            Some(Token::Int) => TypeRefKind::Int,
            Some(Token::Char) => TypeRefKind::Char,
            _ => return Err(self.err("expected a primitive type")),
        };
        self.advance();
        Ok(TypeRef { kind, span: start.to(self.here()) })
    }

    fn arguments(&mut self) -> PResult<Vec<Expr>> {
        self.expect(Token::LParen, "'('")?;
        let mut args = Vec::new();
        if self.peek() != Some(Token::RParen) {
            loop {
                args.push(self.expression()?);
                if !self.check(Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::RParen, "')'")?;
        Ok(args)
    }

    fn expr(&mut self, kind: ExprKind, start: Location) -> Expr {
        Expr { id: self.ids.fresh(), kind, span: start.to(self.here()) }
    }

    fn binary(&mut self, op: BinaryOp, lhs: Expr, rhs: Expr, start: Location) -> Expr {
        self.expr(
            ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) },
            start,
        )
    }
}

fn is_lvalue(kind: &ExprKind) -> bool {
    matches!(
        kind,
        ExprKind::Name(_) | ExprKind::FieldAccess { .. } | ExprKind::ArrayAccess { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> CompilationUnit {
        let mut ids = AstIds::new();
        parse_unit(source, "Test", &mut ids).expect("parse failed")
    }

    fn parse_err(source: &str) -> ParseError {
        let mut ids = AstIds::new();
        parse_unit(source, "Test", &mut ids).expect_err("expected parse error")
    }

    #[test]
    fn simple_class() {
        let unit = parse("public class Test { public Test() {} public static int test() { return 123; } }");
        assert_eq!(unit.package, "");
        match &unit.ty {
            TypeDeclNode::Class(c) => {
                assert_eq!(c.name, "Test");
                assert_eq!(c.constructors.len(), 1);
                assert_eq!(c.methods.len(), 1);
            }
            _ => panic!("expected class"),
        }
    }

    #[test]
    fn package_and_imports() {
        let unit = parse(
            "package a.b; import java.util.Vector; import java.io.*; public class Test { public Test() {} }",
        );
        assert_eq!(unit.package, "a.b");
        assert_eq!(unit.imports.len(), 2);
        assert!(!unit.imports[0].on_demand);
        assert!(unit.imports[1].on_demand);
        assert_eq!(unit.imports[1].name, "java.io");
    }

    #[test]
    fn local_decl_vs_expression() {
        let unit = parse(
            "public class Test { public Test() {} public void f(Test a) { Test b = a; b.f(a); int[] xs = new int[3]; xs[0] = 1; } }",
        );
        let class = match &unit.ty {
            TypeDeclNode::Class(c) => c,
            _ => panic!(),
        };
        let body = class.methods[0].body.as_ref().unwrap();
        assert!(matches!(body.statements[0].kind, StmtKind::LocalVar(_)));
        assert!(matches!(body.statements[1].kind, StmtKind::Expr(_)));
        assert!(matches!(body.statements[2].kind, StmtKind::LocalVar(_)));
    }

    #[test]
    fn cast_vs_paren() {
        let unit = parse(
            "public class Test { public Test() {} public int f(Object o, int a, int b) { int x = (int) a; Object s = (Test) o; return (a) - b; } }",
        );
        let class = match &unit.ty {
            TypeDeclNode::Class(c) => c,
            _ => panic!(),
        };
        let body = class.methods[0].body.as_ref().unwrap();
        // first two are casts inside declarations
        for stmt in &body.statements[0..2] {
            match &stmt.kind {
                StmtKind::LocalVar(decl) => {
                    assert!(matches!(decl.init.as_ref().unwrap().kind, ExprKind::Cast { .. }));
                }
                _ => panic!("expected declaration"),
            }
        }
        // `(a) - b` is a subtraction, not a cast
        match &body.statements[2].kind {
            StmtKind::Return(Some(expr)) => {
                assert!(matches!(expr.kind, ExprKind::Binary { op: BinaryOp::Sub, .. }));
            }
            _ => panic!("expected return"),
        }
    }

    #[test]
    fn dotted_names_collapse() {
        let unit = parse(
            "public class Test { public Test() {} public void f() { a.b.c = a.b.m(1); } }",
        );
        let class = match &unit.ty {
            TypeDeclNode::Class(c) => c,
            _ => panic!(),
        };
        let body = class.methods[0].body.as_ref().unwrap();
        match &body.statements[0].kind {
            StmtKind::Expr(expr) => match &expr.kind {
                ExprKind::Assign { lhs, rhs } => {
                    match &lhs.kind {
                        ExprKind::Name(name) => assert_eq!(name.ids, vec!["a", "b", "c"]),
                        _ => panic!("expected name lhs"),
                    }
                    match &rhs.kind {
                        ExprKind::Call { recv: Some(recv), name, .. } => {
                            assert_eq!(name, "m");
                            assert!(matches!(&recv.kind, ExprKind::Name(n) if n.ids == vec!["a", "b"]));
                        }
                        _ => panic!("expected call rhs"),
                    }
                }
                _ => panic!("expected assignment"),
            },
            _ => panic!("expected expression statement"),
        }
    }

    #[test]
    fn rejects_non_joos_constructs() {
        assert!(parse_err("public class Test { public Test() { do {} while (true); } }")
            .to_string()
            .contains("do-while"));
        assert!(parse_err("public class Test { public Test() { int x = a ? b : c; } }")
            .to_string()
            .contains("conditional operator"));
        assert!(parse_err("public class Test { public Test() { x += 1; } }")
            .to_string()
            .contains("compound assignment"));
        assert!(parse_err("public class Test { private int x; public Test() {} }")
            .to_string()
            .contains("private"));
        assert!(parse_err("public class Test { public Test() { int[][] m = null; } }")
            .to_string()
            .contains("multidimensional"));
    }

    #[test]
    fn instanceof_parses() {
        let unit = parse(
            "public class Test { public Test() {} public boolean f(Object o) { return o instanceof Test; } }",
        );
        let class = match &unit.ty {
            TypeDeclNode::Class(c) => c,
            _ => panic!(),
        };
        let body = class.methods[0].body.as_ref().unwrap();
        match &body.statements[0].kind {
            StmtKind::Return(Some(expr)) => {
                assert!(matches!(expr.kind, ExprKind::InstanceOf { .. }));
            }
            _ => panic!(),
        }
    }

    #[test]
    fn for_statement_forms() {
        parse("public class Test { public Test() {} public void f() { for (int i = 0; i < 10; i = i + 1) { f(); } for (;;) {} } }");
    }
}
