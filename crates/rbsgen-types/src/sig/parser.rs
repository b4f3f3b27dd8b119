//! Recursive descent parser for RBS signature files.

use logos::Logos;
use smol_str::SmolStr;
use std::ops::Range;

use super::decl::*;
use super::error::SigParseError;
use super::token::SigToken;
use crate::name::{TypeName, TypeNameKind};
use crate::ty::{BaseType, Block, LiteralType, MethodType, Param, Params, Type};

type Result<T> = std::result::Result<T, SigParseError>;

/// Parse the declarations of a signature file.
pub fn parse_signature(source: &str) -> Result<Vec<Declaration>> {
    let mut parser = SigParser::new(source);
    let result = parser.parse_file();
    parser.finish(result)
}

/// Parse a single type such as `Array[String]?`.
pub fn parse_type(source: &str) -> Result<Type> {
    let mut parser = SigParser::new(source);
    let result = parser.parse_type().and_then(|ty| {
        parser.expect(SigToken::Eof, "end of type")?;
        Ok(ty)
    });
    parser.finish(result)
}

/// Parse a single method type such as `(Integer) -> String`.
pub fn parse_method_type(source: &str) -> Result<MethodType> {
    let mut parser = SigParser::new(source);
    let result = parser.parse_method_type().and_then(|method_type| {
        parser.expect(SigToken::Eof, "end of method type")?;
        Ok(method_type)
    });
    parser.finish(result)
}

fn is_operator(token: &SigToken) -> bool {
    matches!(
        token,
        SigToken::Lt
            | SigToken::Gt
            | SigToken::Eq
            | SigToken::Bang
            | SigToken::Plus
            | SigToken::Minus
            | SigToken::Star
            | SigToken::StarStar
            | SigToken::Slash
            | SigToken::Percent
            | SigToken::Tilde
            | SigToken::Caret
            | SigToken::Amp
            | SigToken::Pipe
            | SigToken::LBracket
            | SigToken::RBracket
            | SigToken::At
    )
}

struct SigParser<'source> {
    source: &'source str,
    lexer: logos::Lexer<'source, SigToken>,
    current: (SigToken, Range<usize>),
    next: (SigToken, Range<usize>),
    previous_end: usize,
    /// First lexing failure. Parsing sees end of input at that point.
    lex_error: Option<SigParseError>,
    /// Type parameters in scope, innermost last.
    type_vars: Vec<SmolStr>,
}

impl<'source> SigParser<'source> {
    fn new(source: &'source str) -> Self {
        let mut lexer = SigToken::lexer(source);
        let mut lex_error = None;
        let current = Self::fetch(&mut lexer, &mut lex_error);
        let next = Self::fetch(&mut lexer, &mut lex_error);
        Self {
            source,
            lexer,
            current,
            next,
            previous_end: 0,
            lex_error,
            type_vars: Vec::new(),
        }
    }

    fn fetch(
        lexer: &mut logos::Lexer<'source, SigToken>,
        lex_error: &mut Option<SigParseError>,
    ) -> (SigToken, Range<usize>) {
        match lexer.next() {
            Some(Ok(token)) => (token, lexer.span()),
            Some(Err(())) => {
                let span = lexer.span();
                if lex_error.is_none() {
                    *lex_error = Some(SigParseError::InvalidToken { span: span.clone() });
                }
                (SigToken::Eof, span)
            }
            None => {
                let end = lexer.source().len();
                (SigToken::Eof, end..end)
            }
        }
    }

    /// Prefer a lexing failure over the parse error it caused.
    fn finish<T>(self, result: Result<T>) -> Result<T> {
        match (result, self.lex_error) {
            (Ok(_), Some(lex)) => Err(lex),
            (Err(err), Some(lex)) if lex.span().start <= err.span().start => Err(lex),
            (result, _) => result,
        }
    }

    fn advance(&mut self) {
        let upcoming = Self::fetch(&mut self.lexer, &mut self.lex_error);
        let next = std::mem::replace(&mut self.next, upcoming);
        let current = std::mem::replace(&mut self.current, next);
        self.previous_end = current.1.end;
    }

    fn at(&self, token: &SigToken) -> bool {
        &self.current.0 == token
    }

    fn eat(&mut self, token: &SigToken) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: SigToken, expected: &str) -> Result<()> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn is_word(&self, word: &str) -> bool {
        matches!(&self.current.0, SigToken::Ident(w) if w == word)
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.is_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn ident(&mut self, expected: &str) -> Result<SmolStr> {
        match &self.current.0 {
            SigToken::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(expected)),
        }
    }

    /// Whether the current token starts right where the previous one ended.
    fn adjacent(&self) -> bool {
        self.current.1.start == self.previous_end
    }

    fn error(&self, expected: &str) -> SigParseError {
        let span = self.current.1.clone();
        match self.current.0 {
            SigToken::Eof => SigParseError::UnexpectedEof {
                expected: expected.to_string(),
                span,
            },
            _ => SigParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: self.source[span.clone()].to_string(),
                span,
            },
        }
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn parse_file(&mut self) -> Result<Vec<Declaration>> {
        let mut declarations = Vec::new();
        while !self.at(&SigToken::Eof) {
            if self.is_word("use") {
                self.skip_use()?;
            } else if let Some(declaration) = self.parse_declaration()? {
                declarations.push(declaration);
            } else if !self.skip_value_declaration()? {
                return Err(self.error("declaration"));
            }
        }
        Ok(declarations)
    }

    fn parse_declaration(&mut self) -> Result<Option<Declaration>> {
        let declaration = if self.is_word("class") {
            self.parse_class()?
        } else if self.is_word("module") {
            self.parse_module()?
        } else if self.is_word("interface") {
            self.parse_interface()?
        } else if self.is_word("type") {
            self.parse_type_alias()?
        } else {
            return Ok(None);
        };
        Ok(Some(declaration))
    }

    /// `use Foo::Bar as Baz, Foo::*`
    fn skip_use(&mut self) -> Result<()> {
        self.advance();
        loop {
            self.eat(&SigToken::ColonColon);
            self.ident("use clause")?;
            while self.eat(&SigToken::ColonColon) {
                if self.eat(&SigToken::Star) {
                    break;
                }
                self.ident("use clause")?;
            }
            if self.eat_word("as") {
                self.ident("alias name")?;
            }
            if !self.eat(&SigToken::Comma) {
                return Ok(());
            }
        }
    }

    /// `Foo::BAR: Type` and `$stdout: IO` type values, not types.
    fn skip_value_declaration(&mut self) -> Result<bool> {
        match self.current.0 {
            SigToken::GlobalVar(_) => self.advance(),
            SigToken::Ident(_) | SigToken::ColonColon => {
                self.parse_type_name()?;
            }
            _ => return Ok(false),
        }
        self.expect(SigToken::Colon, "`:`")?;
        self.parse_type()?;
        Ok(true)
    }

    fn parse_class(&mut self) -> Result<Declaration> {
        self.advance();
        let name = self.parse_type_name()?;
        if self.eat(&SigToken::Eq) {
            let old_name = self.parse_type_name()?;
            return Ok(Declaration::ClassAlias(ClassAliasDecl {
                new_name: name,
                old_name,
                is_module: false,
            }));
        }

        let mark = self.type_vars.len();
        let type_params = self.parse_type_params()?;
        let super_class = if self.eat(&SigToken::Lt) {
            Some(self.parse_parent()?)
        } else {
            None
        };
        let members = self.parse_members()?;
        self.type_vars.truncate(mark);

        Ok(Declaration::Class(ClassDecl {
            name,
            type_params,
            super_class,
            members,
        }))
    }

    fn parse_module(&mut self) -> Result<Declaration> {
        self.advance();
        let name = self.parse_type_name()?;
        if self.eat(&SigToken::Eq) {
            let old_name = self.parse_type_name()?;
            return Ok(Declaration::ClassAlias(ClassAliasDecl {
                new_name: name,
                old_name,
                is_module: true,
            }));
        }

        let mark = self.type_vars.len();
        let type_params = self.parse_type_params()?;
        let mut self_types = Vec::new();
        if self.eat(&SigToken::Colon) {
            loop {
                self_types.push(self.parse_parent()?);
                if !self.eat(&SigToken::Comma) {
                    break;
                }
            }
        }
        let members = self.parse_members()?;
        self.type_vars.truncate(mark);

        Ok(Declaration::Module(ModuleDecl {
            name,
            type_params,
            self_types,
            members,
        }))
    }

    fn parse_interface(&mut self) -> Result<Declaration> {
        self.advance();
        let name = self.parse_type_name()?;
        let mark = self.type_vars.len();
        let type_params = self.parse_type_params()?;
        let members = self.parse_members()?;
        self.type_vars.truncate(mark);

        Ok(Declaration::Interface(InterfaceDecl {
            name,
            type_params,
            members,
        }))
    }

    fn parse_type_alias(&mut self) -> Result<Declaration> {
        self.advance();
        let name = self.parse_type_name()?;
        let mark = self.type_vars.len();
        let type_params = self.parse_type_params()?;
        self.expect(SigToken::Eq, "`=`")?;
        let ty = self.parse_type()?;
        self.type_vars.truncate(mark);

        Ok(Declaration::TypeAlias(TypeAliasDecl {
            name,
            type_params,
            ty,
        }))
    }

    /// `[unchecked out Elem < Comparable, T = untyped]`. The parameters stay
    /// in scope until the caller truncates `type_vars`.
    fn parse_type_params(&mut self) -> Result<Vec<TypeParam>> {
        let mut params = Vec::new();
        if !self.eat(&SigToken::LBracket) {
            return Ok(params);
        }
        loop {
            self.eat_word("unchecked");
            if !self.eat_word("in") {
                self.eat_word("out");
            }
            let name = self.ident("type parameter")?;
            self.type_vars.push(name.clone());
            let upper_bound = if self.eat(&SigToken::Lt) {
                Some(self.parse_type()?)
            } else {
                None
            };
            if self.eat(&SigToken::Eq) {
                self.parse_type()?;
            }
            params.push(TypeParam { name, upper_bound });
            if !self.eat(&SigToken::Comma) {
                break;
            }
        }
        self.expect(SigToken::RBracket, "`]`")?;
        Ok(params)
    }

    fn parse_type_name(&mut self) -> Result<TypeName> {
        let absolute = self.eat(&SigToken::ColonColon);
        let mut namespace = Vec::new();
        let mut name = self.ident("type name")?;
        while self.at(&SigToken::ColonColon) && matches!(self.next.0, SigToken::Ident(_)) {
            self.advance();
            namespace.push(name);
            name = self.ident("type name")?;
        }
        Ok(TypeName::new(namespace, name, absolute))
    }

    fn parse_parent(&mut self) -> Result<Parent> {
        let name = self.parse_type_name()?;
        let args = self.parse_type_args()?;
        Ok(Parent { name, args })
    }

    // ========================================================================
    // Members
    // ========================================================================

    fn parse_members(&mut self) -> Result<Vec<Member>> {
        let mut members = Vec::new();
        loop {
            if self.eat_word("end") {
                return Ok(members);
            }
            if self.at(&SigToken::Eof) {
                return Err(self.error("`end`"));
            }
            if let Some(member) = self.parse_member()? {
                members.push(member);
            }
        }
    }

    fn parse_member(&mut self) -> Result<Option<Member>> {
        let word = match &self.current.0 {
            SigToken::Ident(word) => word.clone(),
            SigToken::InstanceVar(_) => {
                self.skip_instance_variable()?;
                return Ok(None);
            }
            _ => return Err(self.error("member")),
        };

        let member = match word.as_str() {
            "def" => self.parse_method()?,
            "attr_reader" | "attr_writer" | "attr_accessor" => self.parse_attribute()?,
            "alias" => self.parse_alias()?,
            "include" => {
                self.advance();
                Member::Include(self.parse_parent()?)
            }
            "prepend" => {
                self.advance();
                Member::Prepend(self.parse_parent()?)
            }
            "extend" => {
                self.advance();
                Member::Extend(self.parse_parent()?)
            }
            "public" | "private" => {
                self.advance();
                return Ok(None);
            }
            "self" if self.next.0 == SigToken::Dot => {
                self.advance();
                self.advance();
                self.skip_instance_variable()?;
                return Ok(None);
            }
            _ => match self.parse_declaration()? {
                Some(declaration) => Member::Declaration(declaration),
                None if self.skip_value_declaration()? => return Ok(None),
                None => return Err(self.error("member")),
            },
        };
        Ok(Some(member))
    }

    /// `@name: Type`
    fn skip_instance_variable(&mut self) -> Result<()> {
        match self.current.0 {
            SigToken::InstanceVar(_) => self.advance(),
            _ => return Err(self.error("instance variable")),
        }
        self.expect(SigToken::Colon, "`:`")?;
        self.parse_type()?;
        Ok(())
    }

    fn parse_member_scope(&mut self) -> Result<MemberScope> {
        if self.is_word("self") && self.next.0 == SigToken::Dot {
            self.advance();
            self.advance();
            Ok(MemberScope::Singleton)
        } else if self.is_word("self") && self.next.0 == SigToken::Question {
            self.advance();
            self.advance();
            self.expect(SigToken::Dot, "`.`")?;
            Ok(MemberScope::Both)
        } else {
            Ok(MemberScope::Instance)
        }
    }

    /// A method name: `foo`, `foo?`, `foo=`, `[]=`, `<=>`, `` `class` ``.
    fn parse_member_name(&mut self) -> Result<SmolStr> {
        let start = self.current.1.start;
        if let SigToken::Ident(name) = &self.current.0 {
            let name = name.clone();
            self.advance();
            if self.adjacent()
                && matches!(self.current.0, SigToken::Question | SigToken::Bang | SigToken::Eq)
            {
                self.advance();
                return Ok(SmolStr::from(&self.source[start..self.previous_end]));
            }
            return Ok(name);
        }

        if !is_operator(&self.current.0) {
            return Err(self.error("method name"));
        }
        self.advance();
        while self.adjacent() && is_operator(&self.current.0) {
            self.advance();
        }
        Ok(SmolStr::from(&self.source[start..self.previous_end]))
    }

    /// `def name: sig | sig | ...`
    fn parse_method(&mut self) -> Result<Member> {
        self.advance();
        let scope = self.parse_member_scope()?;
        let name = self.parse_member_name()?;
        self.expect(SigToken::Colon, "`:`")?;

        let mut overloads = Vec::new();
        let mut overloading = false;
        loop {
            if self.eat(&SigToken::Ellipsis) {
                overloading = true;
                break;
            }
            overloads.push(self.parse_method_type()?);
            if !self.eat(&SigToken::Pipe) {
                break;
            }
        }

        Ok(Member::Method {
            name,
            scope,
            overloads,
            overloading,
        })
    }

    /// `attr_reader name: Type`, `attr_accessor self.name (@ivar): Type`
    fn parse_attribute(&mut self) -> Result<Member> {
        let kind = if self.eat_word("attr_reader") {
            AttributeKind::Reader
        } else if self.eat_word("attr_writer") {
            AttributeKind::Writer
        } else {
            self.advance();
            AttributeKind::Accessor
        };
        let scope = self.parse_member_scope()?;
        let name = self.ident("attribute name")?;
        if self.eat(&SigToken::LParen) {
            if let SigToken::InstanceVar(_) = self.current.0 {
                self.advance();
            }
            self.expect(SigToken::RParen, "`)`")?;
        }
        self.expect(SigToken::Colon, "`:`")?;
        let ty = self.parse_type()?;

        Ok(Member::Attribute {
            kind,
            name,
            ty,
            scope,
        })
    }

    /// `alias new old`, `alias self.new self.old`
    fn parse_alias(&mut self) -> Result<Member> {
        self.advance();
        let scope = self.parse_member_scope()?;
        let new_name = self.parse_member_name()?;
        self.parse_member_scope()?;
        let old_name = self.parse_member_name()?;

        Ok(Member::Alias {
            new_name,
            old_name,
            scope,
        })
    }

    // ========================================================================
    // Method types
    // ========================================================================

    fn parse_method_type(&mut self) -> Result<MethodType> {
        let mark = self.type_vars.len();
        let mut type_params = Vec::new();
        if self.eat(&SigToken::LBracket) {
            loop {
                self.eat_word("unchecked");
                let name = self.ident("type parameter")?;
                self.type_vars.push(name.clone());
                if self.eat(&SigToken::Lt) {
                    self.parse_type()?;
                }
                type_params.push(name);
                if !self.eat(&SigToken::Comma) {
                    break;
                }
            }
            self.expect(SigToken::RBracket, "`]`")?;
        }

        let (params, block, return_type) = self.parse_function()?;
        self.type_vars.truncate(mark);

        Ok(MethodType {
            type_params,
            params,
            block,
            return_type,
        })
    }

    /// `(params) ?{ block } -> Return`, shared by methods and procs.
    fn parse_function(&mut self) -> Result<(Params, Option<Block>, Type)> {
        let params = if self.at(&SigToken::LParen) {
            self.parse_params()?
        } else {
            Params::default()
        };
        self.skip_self_binding()?;
        let block = self.parse_block()?;
        self.expect(SigToken::Arrow, "`->`")?;
        let return_type = self.parse_optional_type()?;
        Ok((params, block, return_type))
    }

    /// `[self: Type]`
    fn skip_self_binding(&mut self) -> Result<()> {
        if self.at(&SigToken::LBracket) && matches!(&self.next.0, SigToken::Ident(w) if w == "self")
        {
            self.advance();
            self.advance();
            self.expect(SigToken::Colon, "`:`")?;
            self.parse_type()?;
            self.expect(SigToken::RBracket, "`]`")?;
        }
        Ok(())
    }

    fn parse_block(&mut self) -> Result<Option<Block>> {
        let required = if self.at(&SigToken::Question) && self.next.0 == SigToken::LBrace {
            self.advance();
            false
        } else if self.at(&SigToken::LBrace) {
            true
        } else {
            return Ok(None);
        };
        self.expect(SigToken::LBrace, "`{`")?;

        let params = if self.at(&SigToken::LParen) {
            self.parse_params()?
        } else {
            Params::default()
        };
        self.skip_self_binding()?;
        self.expect(SigToken::Arrow, "`->`")?;
        let return_type = self.parse_optional_type()?;
        self.expect(SigToken::RBrace, "`}`")?;

        Ok(Some(Block {
            params,
            return_type,
            required,
        }))
    }

    fn parse_params(&mut self) -> Result<Params> {
        self.expect(SigToken::LParen, "`(`")?;
        let mut params = Params::default();
        while !self.at(&SigToken::RParen) {
            self.parse_param(&mut params)?;
            if !self.eat(&SigToken::Comma) {
                break;
            }
        }
        self.expect(SigToken::RParen, "`)`")?;
        Ok(params)
    }

    fn parse_param(&mut self, params: &mut Params) -> Result<()> {
        if self.eat(&SigToken::StarStar) {
            params.rest_keywords = Some(self.parse_param_type()?);
            return Ok(());
        }
        if self.eat(&SigToken::Star) {
            params.rest = Some(self.parse_param_type()?);
            return Ok(());
        }

        let optional = self.eat(&SigToken::Question);
        if let Some(keyword) = self.parse_keyword_label() {
            let param = self.parse_param_type()?;
            if optional {
                params.optional_keywords.push((keyword, param));
            } else {
                params.required_keywords.push((keyword, param));
            }
            return Ok(());
        }

        let param = self.parse_param_type()?;
        if optional {
            params.optional.push(param);
        } else if params.rest.is_some() || !params.optional.is_empty() {
            params.trailing.push(param);
        } else {
            params.required.push(param);
        }
        Ok(())
    }

    /// `name:` before a keyword parameter's type.
    fn parse_keyword_label(&mut self) -> Option<SmolStr> {
        match (&self.current.0, &self.next.0) {
            (SigToken::Ident(name), SigToken::Colon) => {
                let name = name.clone();
                self.advance();
                self.advance();
                Some(name)
            }
            _ => None,
        }
    }

    /// `Type` or `Type name`
    fn parse_param_type(&mut self) -> Result<Param> {
        let ty = self.parse_type()?;
        let name = match &self.current.0 {
            SigToken::Ident(name) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        };
        Ok(Param { ty, name })
    }

    // ========================================================================
    // Types
    // ========================================================================

    fn parse_type(&mut self) -> Result<Type> {
        let first = self.parse_intersection()?;
        if !self.at(&SigToken::Pipe) {
            return Ok(first);
        }
        let mut types = vec![first];
        while self.eat(&SigToken::Pipe) {
            types.push(self.parse_intersection()?);
        }
        Ok(Type::Union(types))
    }

    fn parse_intersection(&mut self) -> Result<Type> {
        let first = self.parse_optional_type()?;
        if !self.at(&SigToken::Amp) {
            return Ok(first);
        }
        let mut types = vec![first];
        while self.eat(&SigToken::Amp) {
            types.push(self.parse_optional_type()?);
        }
        Ok(Type::Intersection(types))
    }

    /// A primary type with an optional `?` suffix. Method return types are
    /// parsed at this level, so `|` separates overloads there.
    fn parse_optional_type(&mut self) -> Result<Type> {
        let ty = self.parse_primary_type()?;
        if self.at(&SigToken::Question) && self.next.0 != SigToken::LBrace {
            self.advance();
            return Ok(Type::Optional(Box::new(ty)));
        }
        Ok(ty)
    }

    fn parse_primary_type(&mut self) -> Result<Type> {
        match self.current.0.clone() {
            SigToken::LParen => {
                self.advance();
                let ty = self.parse_type()?;
                self.expect(SigToken::RParen, "`)`")?;
                Ok(ty)
            }
            SigToken::LBracket => self.parse_tuple(),
            SigToken::LBrace => self.parse_record(),
            SigToken::Caret => {
                self.advance();
                let (params, block, return_type) = self.parse_function()?;
                Ok(Type::Proc(Box::new(MethodType {
                    type_params: Vec::new(),
                    params,
                    block,
                    return_type,
                })))
            }
            SigToken::Int(n) => {
                self.advance();
                Ok(Type::Literal(LiteralType::Int(n)))
            }
            SigToken::Str(s) => {
                self.advance();
                Ok(Type::Literal(LiteralType::Str(s)))
            }
            SigToken::Symbol(s) => {
                self.advance();
                Ok(Type::Literal(LiteralType::Symbol(s)))
            }
            SigToken::ColonColon => self.parse_named_type(),
            SigToken::Ident(word) => {
                if self.next.0 == SigToken::ColonColon {
                    return self.parse_named_type();
                }
                match word.as_str() {
                    "untyped" => {
                        self.advance();
                        Ok(Type::Any)
                    }
                    "true" | "false" => {
                        self.advance();
                        Ok(Type::Literal(LiteralType::Bool(word.as_str() == "true")))
                    }
                    "singleton" if self.next.0 == SigToken::LParen => {
                        self.advance();
                        self.advance();
                        let name = self.parse_type_name()?;
                        self.expect(SigToken::RParen, "`)`")?;
                        Ok(Type::ClassSingleton(name))
                    }
                    _ => match BaseType::from_keyword(&word) {
                        Some(base) => {
                            self.advance();
                            Ok(Type::Base(base))
                        }
                        None => self.parse_named_type(),
                    },
                }
            }
            _ => Err(self.error("type")),
        }
    }

    fn parse_named_type(&mut self) -> Result<Type> {
        let name = self.parse_type_name()?;
        let args = self.parse_type_args()?;

        let is_variable = !name.absolute
            && name.namespace.is_empty()
            && args.is_empty()
            && self.type_vars.contains(&name.name);
        if is_variable {
            return Ok(Type::Variable(name.name));
        }

        Ok(match name.kind() {
            TypeNameKind::Class => Type::ClassInstance { name, args },
            TypeNameKind::Interface => Type::Interface { name, args },
            TypeNameKind::Alias => Type::Alias { name, args },
        })
    }

    fn parse_type_args(&mut self) -> Result<Vec<Type>> {
        let mut args = Vec::new();
        if !self.eat(&SigToken::LBracket) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_type()?);
            if !self.eat(&SigToken::Comma) {
                break;
            }
        }
        self.expect(SigToken::RBracket, "`]`")?;
        Ok(args)
    }

    fn parse_tuple(&mut self) -> Result<Type> {
        self.advance();
        let mut types = Vec::new();
        while !self.at(&SigToken::RBracket) {
            types.push(self.parse_type()?);
            if !self.eat(&SigToken::Comma) {
                break;
            }
        }
        self.expect(SigToken::RBracket, "`]`")?;
        Ok(Type::Tuple(types))
    }

    /// `{ id: Integer, :kind => Symbol, ?note: String }`
    fn parse_record(&mut self) -> Result<Type> {
        self.advance();
        let mut fields = Vec::new();
        while !self.at(&SigToken::RBrace) {
            self.eat(&SigToken::Question);
            let key = match self.parse_keyword_label() {
                Some(key) => key,
                None => {
                    let key = match self.current.0.clone() {
                        SigToken::Symbol(key) | SigToken::Str(key) => key,
                        SigToken::Int(n) => SmolStr::from(n.to_string()),
                        _ => return Err(self.error("record field")),
                    };
                    self.advance();
                    self.expect(SigToken::FatArrow, "`=>`")?;
                    key
                }
            };
            fields.push((key, self.parse_type()?));
            if !self.eat(&SigToken::Comma) {
                break;
            }
        }
        self.expect(SigToken::RBrace, "`}`")?;
        Ok(Type::Record(fields))
    }
}
