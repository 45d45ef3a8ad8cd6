//! Recursive-descent parser for the declaration subset.
//!
//! Parses package clauses, imports, and top-level type/func/var/const
//! declarations into a small AST. Function bodies are skipped by brace
//! matching; expressions are only classified far enough to type constants
//! and composite-literal initializers.

use semvet_types::ChanDir;

use crate::scanner::{Pos, ScanError, Scanner, Tok};

#[derive(Debug)]
pub struct ParseError {
    pub pos: Pos,
    pub message: String,
}

impl From<ScanError> for ParseError {
    fn from(e: ScanError) -> Self {
        ParseError {
            pos: e.pos,
            message: e.message,
        }
    }
}

type PResult<T> = Result<T, ParseError>;

#[derive(Debug)]
pub struct FileAst {
    pub package: String,
    pub imports: Vec<Import>,
    pub decls: Vec<Decl>,
}

#[derive(Debug)]
pub struct Import {
    pub alias: Option<String>,
    pub path: String,
}

#[derive(Debug)]
pub enum Decl {
    Type(TypeDecl),
    Func(FuncDecl),
    Value(ValueDecl),
}

#[derive(Debug)]
pub struct TypeDecl {
    pub name: String,
    pub type_params: Vec<ParamGroup>,
    pub alias: bool,
    pub expr: TypeExpr,
    pub pos: Pos,
}

#[derive(Debug)]
pub struct FuncDecl {
    pub name: String,
    pub receiver: Option<Receiver>,
    pub type_params: Vec<ParamGroup>,
    pub func: FuncType,
    pub pos: Pos,
}

/// Method receiver: `(r *List[T])` keeps the base type name and the names
/// of the receiver-scoped type parameters.
#[derive(Debug)]
pub struct Receiver {
    pub base: String,
    pub type_params: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Var,
    Const,
}

#[derive(Debug)]
pub struct ValueDecl {
    pub kind: ValueKind,
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub lit: Option<LitKind>,
    pub pos: Pos,
}

/// What a declaration initializer tells us about its type.
#[derive(Debug, Clone)]
pub enum LitKind {
    Int,
    Float,
    Complex,
    Rune,
    Str,
    Bool,
    /// `T{…}` or a function literal: the expression carries its type.
    Expr(TypeExpr),
    /// `&T{…}`.
    PointerExpr(TypeExpr),
}

#[derive(Debug, Clone)]
pub enum TypeExpr {
    Name {
        pkg: Option<String>,
        name: String,
        args: Vec<TypeExpr>,
        pos: Pos,
    },
    Pointer(Box<TypeExpr>),
    Slice(Box<TypeExpr>),
    Array {
        len: u64,
        elem: Box<TypeExpr>,
    },
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    Chan {
        dir: ChanDir,
        elem: Box<TypeExpr>,
    },
    Func(Box<FuncType>),
    Struct {
        fields: Vec<FieldExpr>,
    },
    Interface {
        methods: Vec<MethodExpr>,
        embeds: Vec<UnionExpr>,
    },
}

#[derive(Debug, Clone)]
pub struct FuncType {
    pub params: Vec<ParamGroup>,
    pub results: Vec<ParamGroup>,
    pub variadic: bool,
}

/// A group of parameter (or type-parameter) names sharing one type.
/// Empty `names` means an unnamed parameter.
#[derive(Debug, Clone)]
pub struct ParamGroup {
    pub names: Vec<String>,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone)]
pub struct FieldExpr {
    pub names: Vec<String>,
    pub ty: TypeExpr,
    pub tag: String,
    pub embedded: bool,
}

#[derive(Debug, Clone)]
pub struct MethodExpr {
    pub name: String,
    pub func: FuncType,
}

/// One interface element in term form: a plain embed is a single term
/// without a tilde.
#[derive(Debug, Clone)]
pub struct UnionExpr {
    pub terms: Vec<(bool, TypeExpr)>,
}

pub struct Parser<'s> {
    scanner: Scanner<'s>,
    tok: Tok,
    pos: Pos,
    lookahead: std::collections::VecDeque<(Tok, Pos)>,
}

impl<'s> Parser<'s> {
    pub fn new(src: &'s str) -> PResult<Self> {
        let mut scanner = Scanner::new(src);
        let (tok, pos) = scanner.next()?;
        Ok(Parser {
            scanner,
            tok,
            pos,
            lookahead: std::collections::VecDeque::new(),
        })
    }

    fn advance(&mut self) -> PResult<()> {
        let (tok, pos) = match self.lookahead.pop_front() {
            Some(entry) => entry,
            None => self.scanner.next()?,
        };
        self.tok = tok;
        self.pos = pos;
        Ok(())
    }

    fn peek_n(&mut self, n: usize) -> PResult<&Tok> {
        while self.lookahead.len() <= n {
            let entry = self.scanner.next()?;
            self.lookahead.push_back(entry);
        }
        Ok(&self.lookahead[n].0)
    }

    fn peek(&mut self) -> PResult<&Tok> {
        self.peek_n(0)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            pos: self.pos,
            message: message.into(),
        }
    }

    fn expect(&mut self, want: &Tok) -> PResult<()> {
        if &self.tok != want {
            return Err(self.error(format!("expected {want}, found {}", self.tok)));
        }
        self.advance()
    }

    fn expect_ident(&mut self) -> PResult<String> {
        let Tok::Ident(name) = &self.tok else {
            return Err(self.error(format!("expected identifier, found {}", self.tok)));
        };
        let name = name.clone();
        self.advance()?;
        Ok(name)
    }

    fn expect_word(&mut self, word: &str) -> PResult<()> {
        if !self.tok.is_ident(word) {
            return Err(self.error(format!("expected {word}, found {}", self.tok)));
        }
        self.advance()
    }

    fn skip_semis(&mut self) -> PResult<()> {
        while self.tok == Tok::Semi {
            self.advance()?;
        }
        Ok(())
    }

    /// End-of-statement: a semicolon, or the closer the caller stops at.
    fn expect_terminator(&mut self) -> PResult<()> {
        match self.tok {
            Tok::Semi => self.advance(),
            Tok::RBrace | Tok::RParen | Tok::Eof => Ok(()),
            _ => Err(self.error(format!("expected end of declaration, found {}", self.tok))),
        }
    }

    // ---- file structure ---------------------------------------------

    pub fn parse_file(mut self) -> PResult<FileAst> {
        self.skip_semis()?;
        self.expect_word("package")?;
        let package = self.expect_ident()?;
        self.expect_terminator()?;

        let mut imports = Vec::new();
        loop {
            self.skip_semis()?;
            if !self.tok.is_ident("import") {
                break;
            }
            self.advance()?;
            if self.tok == Tok::LParen {
                self.advance()?;
                loop {
                    self.skip_semis()?;
                    if self.tok == Tok::RParen {
                        self.advance()?;
                        break;
                    }
                    imports.push(self.parse_import_spec()?);
                }
            } else {
                imports.push(self.parse_import_spec()?);
            }
            self.expect_terminator()?;
        }

        let mut decls = Vec::new();
        loop {
            self.skip_semis()?;
            match &self.tok {
                Tok::Eof => break,
                Tok::Ident(word) if word == "type" => {
                    self.advance()?;
                    self.parse_grouped(|p| {
                        let decl = p.parse_type_spec()?;
                        decls.push(Decl::Type(decl));
                        Ok(())
                    })?;
                }
                Tok::Ident(word) if word == "func" => {
                    self.advance()?;
                    decls.push(Decl::Func(self.parse_func_decl()?));
                }
                Tok::Ident(word) if word == "var" || word == "const" => {
                    let kind = if word == "var" {
                        ValueKind::Var
                    } else {
                        ValueKind::Const
                    };
                    self.advance()?;
                    let mut carried: Option<(Option<TypeExpr>, Option<LitKind>)> = None;
                    self.parse_grouped(|p| {
                        p.parse_value_spec(kind, &mut carried, &mut decls)
                    })?;
                }
                other => {
                    return Err(self.error(format!("unexpected top-level token {other}")));
                }
            }
        }

        Ok(FileAst {
            package,
            imports,
            decls,
        })
    }

    /// Run `body` once, or repeatedly inside a parenthesized group.
    fn parse_grouped(&mut self, mut body: impl FnMut(&mut Self) -> PResult<()>) -> PResult<()> {
        if self.tok == Tok::LParen {
            self.advance()?;
            loop {
                self.skip_semis()?;
                if self.tok == Tok::RParen {
                    self.advance()?;
                    break;
                }
                body(self)?;
            }
            self.expect_terminator()?;
            return Ok(());
        }
        body(self)
    }

    fn parse_import_spec(&mut self) -> PResult<Import> {
        let mut alias = None;
        if let Tok::Ident(name) = &self.tok {
            alias = Some(name.clone());
            self.advance()?;
        } else if self.tok == Tok::Dot {
            alias = Some(".".to_owned());
            self.advance()?;
        }
        let path = match &self.tok {
            Tok::Str(path) | Tok::RawStr(path) => path.clone(),
            other => return Err(self.error(format!("expected import path, found {other}"))),
        };
        self.advance()?;
        Ok(Import { alias, path })
    }

    // ---- type declarations ------------------------------------------

    fn parse_type_spec(&mut self) -> PResult<TypeDecl> {
        let pos = self.pos;
        let name = self.expect_ident()?;

        let mut type_params = Vec::new();
        if self.tok == Tok::LBrack && self.starts_type_params()? {
            type_params = self.parse_type_param_list()?;
        }

        let alias = if self.tok == Tok::Assign {
            self.advance()?;
            true
        } else {
            false
        };

        let expr = self.parse_type()?;
        self.expect_terminator()?;
        Ok(TypeDecl {
            name,
            type_params,
            alias,
            expr,
            pos,
        })
    }

    /// After `type Name` a `[` opens either a type-parameter list or an
    /// array/slice type. `[]` and `[N]` (literal or constant) mean a type;
    /// an identifier followed by anything other than `]` means parameters.
    fn starts_type_params(&mut self) -> PResult<bool> {
        debug_assert_eq!(self.tok, Tok::LBrack);
        if !matches!(self.peek_n(0)?, Tok::Ident(_)) {
            return Ok(false);
        }
        Ok(!matches!(self.peek_n(1)?, Tok::RBrack))
    }

    fn parse_type_param_list(&mut self) -> PResult<Vec<ParamGroup>> {
        self.expect(&Tok::LBrack)?;
        let (groups, _) = self.parse_param_groups(Tok::RBrack, true)?;
        self.expect(&Tok::RBrack)?;
        Ok(groups)
    }

    // ---- functions ---------------------------------------------------

    fn parse_func_decl(&mut self) -> PResult<FuncDecl> {
        let pos = self.pos;
        let receiver = if self.tok == Tok::LParen {
            Some(self.parse_receiver()?)
        } else {
            None
        };
        let name = self.expect_ident()?;
        let mut type_params = Vec::new();
        if receiver.is_none() && self.tok == Tok::LBrack {
            type_params = self.parse_type_param_list()?;
        }
        let func = self.parse_func_type()?;
        if self.tok == Tok::LBrace {
            self.skip_braces()?;
        }
        self.expect_terminator()?;
        Ok(FuncDecl {
            name,
            receiver,
            type_params,
            func,
            pos,
        })
    }

    /// `(r *List[T])`, `(T)`, `(r T)` — keep the base name and receiver
    /// type-parameter names.
    fn parse_receiver(&mut self) -> PResult<Receiver> {
        self.expect(&Tok::LParen)?;
        let mut first = None;
        if let Tok::Ident(name) = &self.tok {
            first = Some(name.clone());
            self.advance()?;
        }
        let mut base;
        match (&first, &self.tok) {
            (Some(name), Tok::RParen | Tok::LBrack) => {
                // `(T)` or `(T[P])`: no receiver variable.
                base = name.clone();
            }
            (_, _) => {
                if self.tok == Tok::Star {
                    self.advance()?;
                }
                if let Tok::Ident(name) = &self.tok {
                    base = name.clone();
                    self.advance()?;
                } else if let Some(name) = first {
                    base = name;
                } else {
                    return Err(self.error("expected receiver type"));
                }
            }
        }
        // Qualified receiver bases do not occur; a trailing selector means
        // the first ident was the variable.
        if self.tok == Tok::Dot {
            self.advance()?;
            base = self.expect_ident()?;
        }
        let mut type_params = Vec::new();
        if self.tok == Tok::LBrack {
            self.advance()?;
            loop {
                type_params.push(self.expect_ident()?);
                if self.tok == Tok::Comma {
                    self.advance()?;
                    continue;
                }
                break;
            }
            self.expect(&Tok::RBrack)?;
        }
        self.expect(&Tok::RParen)?;
        Ok(Receiver { base, type_params })
    }

    /// `(params) results` — the caller has consumed `func` and any name.
    fn parse_func_type(&mut self) -> PResult<FuncType> {
        self.expect(&Tok::LParen)?;
        let (params, variadic) = self.parse_param_groups(Tok::RParen, false)?;
        self.expect(&Tok::RParen)?;

        let mut results = Vec::new();
        if self.tok == Tok::LParen {
            self.advance()?;
            let (groups, _) = self.parse_param_groups(Tok::RParen, false)?;
            self.expect(&Tok::RParen)?;
            results = groups;
        } else if self.starts_type() {
            results.push(ParamGroup {
                names: Vec::new(),
                ty: self.parse_type()?,
            });
        }
        Ok(FuncType {
            params,
            results,
            variadic,
        })
    }

    fn starts_type(&self) -> bool {
        match &self.tok {
            Tok::Ident(word) => !matches!(word.as_str(), "package" | "import"),
            Tok::Star | Tok::LBrack | Tok::Arrow | Tok::LParen => true,
            _ => false,
        }
    }

    /// Shared parser for parameter lists and type-parameter lists. In
    /// constraint mode the per-group type may be a `~`-union.
    fn parse_param_groups(
        &mut self,
        end: Tok,
        constraint_mode: bool,
    ) -> PResult<(Vec<ParamGroup>, bool)> {
        enum Item {
            Bare(String),
            Typed {
                names: Vec<String>,
                ty: TypeExpr,
                variadic: bool,
            },
        }

        let mut items = Vec::new();
        loop {
            if self.tok == end || self.tok == Tok::Eof {
                break;
            }
            if self.tok == Tok::Ellipsis {
                self.advance()?;
                let ty = self.parse_type()?;
                items.push(Item::Typed {
                    names: Vec::new(),
                    ty,
                    variadic: true,
                });
            } else if let Tok::Ident(word) = &self.tok {
                let is_composite_keyword = matches!(
                    word.as_str(),
                    "map" | "chan" | "func" | "struct" | "interface"
                );
                if is_composite_keyword {
                    let ty = self.parse_type()?;
                    items.push(Item::Typed {
                        names: Vec::new(),
                        ty,
                        variadic: false,
                    });
                } else {
                    let name = word.clone();
                    let name_pos = self.pos;
                    self.advance()?;
                    match &self.tok {
                        // A lone identifier: a name waiting for its type,
                        // or an unnamed parameter of a named type.
                        tok if *tok == end || *tok == Tok::Comma => {
                            items.push(Item::Bare(name));
                        }
                        // `pkg.Type`: the identifier was a package.
                        Tok::Dot => {
                            self.advance()?;
                            let tyname = self.expect_ident()?;
                            let args = self.parse_type_args()?;
                            items.push(Item::Typed {
                                names: Vec::new(),
                                ty: TypeExpr::Name {
                                    pkg: Some(name),
                                    name: tyname,
                                    args,
                                    pos: name_pos,
                                },
                                variadic: false,
                            });
                        }
                        Tok::Ellipsis => {
                            self.advance()?;
                            let ty = self.parse_type()?;
                            items.push(Item::Typed {
                                names: vec![name],
                                ty,
                                variadic: true,
                            });
                        }
                        Tok::LBrack => {
                            // `a []T` / `a [N]T` are named; `List[T]` is an
                            // unnamed instantiated type.
                            let next_is_type_open =
                                matches!(self.peek()?, Tok::RBrack | Tok::Int(_));
                            if next_is_type_open {
                                let ty = self.parse_type()?;
                                items.push(Item::Typed {
                                    names: vec![name],
                                    ty,
                                    variadic: false,
                                });
                            } else {
                                let args = self.parse_type_args()?;
                                items.push(Item::Typed {
                                    names: Vec::new(),
                                    ty: TypeExpr::Name {
                                        pkg: None,
                                        name,
                                        args,
                                        pos: name_pos,
                                    },
                                    variadic: false,
                                });
                            }
                        }
                        _ if constraint_mode => {
                            let ty = self.parse_constraint()?;
                            items.push(Item::Typed {
                                names: vec![name],
                                ty,
                                variadic: false,
                            });
                        }
                        _ if self.starts_type() || self.tok == Tok::Tilde => {
                            let ty = self.parse_type()?;
                            items.push(Item::Typed {
                                names: vec![name],
                                ty,
                                variadic: false,
                            });
                        }
                        other => {
                            return Err(
                                self.error(format!("unexpected {other} in parameter list"))
                            );
                        }
                    }
                }
            } else if constraint_mode && self.tok == Tok::Tilde {
                let ty = self.parse_constraint()?;
                items.push(Item::Typed {
                    names: Vec::new(),
                    ty,
                    variadic: false,
                });
            } else if self.starts_type() {
                let ty = self.parse_type()?;
                items.push(Item::Typed {
                    names: Vec::new(),
                    ty,
                    variadic: false,
                });
            } else {
                return Err(self.error(format!("unexpected {} in parameter list", self.tok)));
            }

            if self.tok == Tok::Comma {
                self.advance()?;
                continue;
            }
            break;
        }

        // Regroup: if any item is named, pending bare identifiers are
        // names sharing the next declared type; otherwise every bare
        // identifier is itself a type.
        let any_named = items
            .iter()
            .any(|item| matches!(item, Item::Typed { names, .. } if !names.is_empty()));
        let mut groups = Vec::new();
        let mut variadic = false;
        let mut pending: Vec<String> = Vec::new();
        for item in items {
            match item {
                Item::Bare(name) => {
                    if any_named {
                        pending.push(name);
                    } else {
                        groups.push(ParamGroup {
                            names: Vec::new(),
                            ty: TypeExpr::Name {
                                pkg: None,
                                name,
                                args: Vec::new(),
                                pos: self.pos,
                            },
                        });
                    }
                }
                Item::Typed {
                    mut names,
                    ty,
                    variadic: item_variadic,
                } => {
                    if any_named && names.is_empty() && !pending.is_empty() {
                        return Err(self.error("mixed named and unnamed parameters"));
                    }
                    let mut all = std::mem::take(&mut pending);
                    all.append(&mut names);
                    groups.push(ParamGroup { names: all, ty });
                    variadic |= item_variadic;
                }
            }
        }
        if !pending.is_empty() {
            return Err(self.error("parameter names without a type"));
        }
        Ok((groups, variadic))
    }

    fn parse_type_args(&mut self) -> PResult<Vec<TypeExpr>> {
        if self.tok != Tok::LBrack {
            return Ok(Vec::new());
        }
        self.advance()?;
        let mut args = Vec::new();
        loop {
            args.push(self.parse_type()?);
            if self.tok == Tok::Comma {
                self.advance()?;
                continue;
            }
            break;
        }
        self.expect(&Tok::RBrack)?;
        Ok(args)
    }

    // ---- types -------------------------------------------------------

    pub fn parse_type(&mut self) -> PResult<TypeExpr> {
        match self.tok.clone() {
            Tok::Star => {
                self.advance()?;
                Ok(TypeExpr::Pointer(Box::new(self.parse_type()?)))
            }
            Tok::LBrack => {
                self.advance()?;
                match self.tok.clone() {
                    Tok::RBrack => {
                        self.advance()?;
                        Ok(TypeExpr::Slice(Box::new(self.parse_type()?)))
                    }
                    Tok::Int(text) => {
                        self.advance()?;
                        self.expect(&Tok::RBrack)?;
                        let len = parse_int_literal(&text)
                            .ok_or_else(|| self.error(format!("bad array length {text}")))?;
                        Ok(TypeExpr::Array {
                            len,
                            elem: Box::new(self.parse_type()?),
                        })
                    }
                    Tok::Ident(_) => {
                        // Constant-named array length: the value is not
                        // tracked, both snapshots collapse to zero.
                        self.advance()?;
                        self.expect(&Tok::RBrack)?;
                        Ok(TypeExpr::Array {
                            len: 0,
                            elem: Box::new(self.parse_type()?),
                        })
                    }
                    other => Err(self.error(format!("unexpected {other} in array type"))),
                }
            }
            Tok::Arrow => {
                self.advance()?;
                self.expect_word("chan")?;
                Ok(TypeExpr::Chan {
                    dir: ChanDir::RecvOnly,
                    elem: Box::new(self.parse_type()?),
                })
            }
            Tok::LParen => {
                self.advance()?;
                let inner = self.parse_type()?;
                self.expect(&Tok::RParen)?;
                Ok(inner)
            }
            Tok::Ident(word) => match word.as_str() {
                "map" => {
                    self.advance()?;
                    self.expect(&Tok::LBrack)?;
                    let key = self.parse_type()?;
                    self.expect(&Tok::RBrack)?;
                    let value = self.parse_type()?;
                    Ok(TypeExpr::Map {
                        key: Box::new(key),
                        value: Box::new(value),
                    })
                }
                "chan" => {
                    self.advance()?;
                    let dir = if self.tok == Tok::Arrow {
                        self.advance()?;
                        ChanDir::SendOnly
                    } else {
                        ChanDir::SendRecv
                    };
                    Ok(TypeExpr::Chan {
                        dir,
                        elem: Box::new(self.parse_type()?),
                    })
                }
                "func" => {
                    self.advance()?;
                    Ok(TypeExpr::Func(Box::new(self.parse_func_type()?)))
                }
                "struct" => {
                    self.advance()?;
                    self.parse_struct_type()
                }
                "interface" => {
                    self.advance()?;
                    self.parse_interface_type()
                }
                _ => {
                    let pos = self.pos;
                    self.advance()?;
                    let (pkg, name) = if self.tok == Tok::Dot {
                        self.advance()?;
                        (Some(word), self.expect_ident()?)
                    } else {
                        (None, word)
                    };
                    let args = self.parse_type_args()?;
                    Ok(TypeExpr::Name {
                        pkg,
                        name,
                        args,
                        pos,
                    })
                }
            },
            other => Err(self.error(format!("expected type, found {other}"))),
        }
    }

    fn parse_struct_type(&mut self) -> PResult<TypeExpr> {
        self.expect(&Tok::LBrace)?;
        let mut fields = Vec::new();
        loop {
            self.skip_semis()?;
            if self.tok == Tok::RBrace {
                self.advance()?;
                break;
            }
            fields.push(self.parse_field()?);
        }
        Ok(TypeExpr::Struct { fields })
    }

    fn parse_field(&mut self) -> PResult<FieldExpr> {
        let mut field = if self.tok == Tok::Star {
            // Embedded pointer type.
            let pos = self.pos;
            self.advance()?;
            let ty = self.parse_embedded_name(pos)?;
            FieldExpr {
                names: Vec::new(),
                ty: TypeExpr::Pointer(Box::new(ty)),
                tag: String::new(),
                embedded: true,
            }
        } else {
            let pos = self.pos;
            let first = self.expect_ident()?;
            match &self.tok {
                // `Name` alone, `pkg.Name`: an embedded field.
                Tok::Semi | Tok::RBrace | Tok::Str(_) | Tok::RawStr(_) => FieldExpr {
                    names: Vec::new(),
                    ty: TypeExpr::Name {
                        pkg: None,
                        name: first,
                        args: Vec::new(),
                        pos,
                    },
                    embedded: true,
                    tag: String::new(),
                },
                Tok::Dot => {
                    self.advance()?;
                    let name = self.expect_ident()?;
                    FieldExpr {
                        names: Vec::new(),
                        ty: TypeExpr::Name {
                            pkg: Some(first),
                            name,
                            args: Vec::new(),
                            pos,
                        },
                        embedded: true,
                        tag: String::new(),
                    }
                }
                _ => {
                    let mut names = vec![first];
                    while self.tok == Tok::Comma {
                        self.advance()?;
                        names.push(self.expect_ident()?);
                    }
                    let ty = self.parse_type()?;
                    FieldExpr {
                        names,
                        ty,
                        tag: String::new(),
                        embedded: false,
                    }
                }
            }
        };
        match &self.tok {
            Tok::Str(tag) | Tok::RawStr(tag) => {
                field.tag = tag.clone();
                self.advance()?;
            }
            _ => {}
        }
        self.expect_terminator_in_braces()?;
        Ok(field)
    }

    fn parse_embedded_name(&mut self, pos: Pos) -> PResult<TypeExpr> {
        let first = self.expect_ident()?;
        if self.tok == Tok::Dot {
            self.advance()?;
            let name = self.expect_ident()?;
            Ok(TypeExpr::Name {
                pkg: Some(first),
                name,
                args: Vec::new(),
                pos,
            })
        } else {
            Ok(TypeExpr::Name {
                pkg: None,
                name: first,
                args: Vec::new(),
                pos,
            })
        }
    }

    fn expect_terminator_in_braces(&mut self) -> PResult<()> {
        match self.tok {
            Tok::Semi => self.advance(),
            Tok::RBrace => Ok(()),
            _ => Err(self.error(format!("expected end of field, found {}", self.tok))),
        }
    }

    fn parse_interface_type(&mut self) -> PResult<TypeExpr> {
        self.expect(&Tok::LBrace)?;
        let mut methods = Vec::new();
        let mut embeds = Vec::new();
        loop {
            self.skip_semis()?;
            if self.tok == Tok::RBrace {
                self.advance()?;
                break;
            }
            if let Tok::Ident(name) = self.tok.clone() {
                if matches!(self.peek()?, Tok::LParen) {
                    self.advance()?;
                    let func = self.parse_func_type()?;
                    methods.push(MethodExpr { name, func });
                    self.expect_terminator_in_braces()?;
                    continue;
                }
            }
            let union = self.parse_union()?;
            embeds.push(union);
            self.expect_terminator_in_braces()?;
        }
        Ok(TypeExpr::Interface { methods, embeds })
    }

    fn parse_union(&mut self) -> PResult<UnionExpr> {
        let mut terms = Vec::new();
        loop {
            let tilde = if self.tok == Tok::Tilde {
                self.advance()?;
                true
            } else {
                false
            };
            terms.push((tilde, self.parse_type()?));
            if self.tok == Tok::Pipe {
                self.advance()?;
                continue;
            }
            break;
        }
        Ok(UnionExpr { terms })
    }

    /// A constraint in a type-parameter list: a union, possibly with
    /// tildes, wrapped into an interface literal when not a single plain
    /// type.
    fn parse_constraint(&mut self) -> PResult<TypeExpr> {
        let union = self.parse_union()?;
        if union.terms.len() == 1 && !union.terms[0].0 {
            return Ok(union.terms[0].1.clone());
        }
        Ok(TypeExpr::Interface {
            methods: Vec::new(),
            embeds: vec![union],
        })
    }

    // ---- bodies and initializers ------------------------------------

    /// Skip a balanced `{ … }`; the scanner has already dealt with
    /// strings and comments.
    fn skip_braces(&mut self) -> PResult<()> {
        self.expect(&Tok::LBrace)?;
        let mut depth = 1u32;
        while depth > 0 {
            match self.tok {
                Tok::LBrace => depth += 1,
                Tok::RBrace => depth -= 1,
                Tok::Eof => return Err(self.error("unexpected end of file in function body")),
                _ => {}
            }
            self.advance()?;
        }
        Ok(())
    }

    fn parse_value_spec(
        &mut self,
        kind: ValueKind,
        carried: &mut Option<(Option<TypeExpr>, Option<LitKind>)>,
        decls: &mut Vec<Decl>,
    ) -> PResult<()> {
        let pos = self.pos;
        let mut names = vec![self.expect_ident()?];
        while self.tok == Tok::Comma {
            self.advance()?;
            names.push(self.expect_ident()?);
        }

        let ty = if self.tok != Tok::Assign
            && self.tok != Tok::Semi
            && self.tok != Tok::RParen
            && self.tok != Tok::Eof
        {
            Some(self.parse_type()?)
        } else {
            None
        };

        let mut lits = Vec::new();
        if self.tok == Tok::Assign {
            self.advance()?;
            loop {
                lits.push(self.parse_init_expr()?);
                if self.tok == Tok::Comma {
                    self.advance()?;
                    continue;
                }
                break;
            }
        }
        self.expect_terminator()?;

        // A bare constant spec repeats the previous one in its group.
        let (spec_ty, spec_lits): (Option<TypeExpr>, Vec<Option<LitKind>>) =
            if kind == ValueKind::Const && ty.is_none() && lits.is_empty() {
                let (carried_ty, carried_lit) = carried.clone().unwrap_or((None, None));
                (carried_ty, vec![carried_lit; names.len()])
            } else {
                let spec_lits = if lits.len() == names.len() {
                    lits
                } else {
                    vec![None; names.len()]
                };
                (ty, spec_lits)
            };

        if kind == ValueKind::Const {
            *carried = Some((spec_ty.clone(), spec_lits.first().cloned().flatten()));
        }

        for (name, lit) in names.into_iter().zip(spec_lits) {
            decls.push(Decl::Value(ValueDecl {
                kind,
                name,
                ty: spec_ty.clone(),
                lit,
                pos,
            }));
        }
        Ok(())
    }

    /// Classify one initializer expression and consume it. The result is
    /// the literal kind when the declaration subset can tell, and `None`
    /// otherwise (calls, plain identifiers, arithmetic on names).
    fn parse_init_expr(&mut self) -> PResult<Option<LitKind>> {
        // Unary signs do not change the kind.
        while matches!(self.tok, Tok::Other('+') | Tok::Other('-')) {
            self.advance()?;
        }

        let kind = match self.tok.clone() {
            Tok::Int(_) => {
                self.advance()?;
                Some(LitKind::Int)
            }
            Tok::Float(_) => {
                self.advance()?;
                Some(LitKind::Float)
            }
            Tok::Imag(_) => {
                self.advance()?;
                Some(LitKind::Complex)
            }
            Tok::Rune(_) => {
                self.advance()?;
                Some(LitKind::Rune)
            }
            Tok::Str(_) | Tok::RawStr(_) => {
                self.advance()?;
                Some(LitKind::Str)
            }
            Tok::Other('&') => {
                self.advance()?;
                match self.parse_composite_head()? {
                    Some(ty) => Some(LitKind::PointerExpr(ty)),
                    None => None,
                }
            }
            Tok::Ident(word) => match word.as_str() {
                "true" | "false" => {
                    self.advance()?;
                    Some(LitKind::Bool)
                }
                "iota" => {
                    self.advance()?;
                    Some(LitKind::Int)
                }
                "func" => {
                    self.advance()?;
                    let func = self.parse_func_type()?;
                    if self.tok == Tok::LBrace {
                        self.skip_braces()?;
                    }
                    Some(LitKind::Expr(TypeExpr::Func(Box::new(func))))
                }
                _ => self.parse_composite_head()?.map(LitKind::Expr),
            },
            _ => None,
        };

        self.consume_expr_rest()?;
        Ok(kind)
    }

    /// `T{…}` or `pkg.T{…}`: a composite literal whose type is evident.
    /// Anything else is consumed by the caller and classified as unknown.
    fn parse_composite_head(&mut self) -> PResult<Option<TypeExpr>> {
        let Tok::Ident(first) = self.tok.clone() else {
            return Ok(None);
        };
        let pos = self.pos;
        self.advance()?;
        let (pkg, name) = if self.tok == Tok::Dot {
            self.advance()?;
            (Some(first), self.expect_ident()?)
        } else {
            (None, first)
        };
        if self.tok != Tok::LBrace {
            return Ok(None);
        }
        self.skip_braces()?;
        Ok(Some(TypeExpr::Name {
            pkg,
            name,
            args: Vec::new(),
            pos,
        }))
    }

    /// Consume the remainder of an initializer expression up to a
    /// top-level comma or terminator.
    fn consume_expr_rest(&mut self) -> PResult<()> {
        let mut depth = 0u32;
        loop {
            match self.tok {
                Tok::Comma | Tok::Semi if depth == 0 => return Ok(()),
                Tok::RParen | Tok::RBrace | Tok::RBrack if depth == 0 => return Ok(()),
                Tok::Eof => return Ok(()),
                Tok::LParen | Tok::LBrace | Tok::LBrack => {
                    depth += 1;
                    self.advance()?;
                }
                Tok::RParen | Tok::RBrace | Tok::RBrack => {
                    depth -= 1;
                    self.advance()?;
                }
                _ => self.advance()?,
            }
        }
    }
}

fn parse_int_literal(text: &str) -> Option<u64> {
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    if let Some(hex) = cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok();
    }
    if let Some(bin) = cleaned.strip_prefix("0b").or_else(|| cleaned.strip_prefix("0B")) {
        return u64::from_str_radix(bin, 2).ok();
    }
    if let Some(oct) = cleaned.strip_prefix("0o").or_else(|| cleaned.strip_prefix("0O")) {
        return u64::from_str_radix(oct, 8).ok();
    }
    if cleaned.len() > 1 && cleaned.starts_with('0') {
        return u64::from_str_radix(&cleaned[1..], 8).ok();
    }
    cleaned.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(src: &str) -> FileAst {
        Parser::new(src)
            .and_then(Parser::parse_file)
            .unwrap_or_else(|e| panic!("{}:{}: {}", e.pos.line, e.pos.col, e.message))
    }

    #[test]
    fn parses_package_and_imports() {
        let f = file("package p\n\nimport (\n\t\"fmt\"\n\tx \"example.com/y\"\n)\n");
        assert_eq!(f.package, "p");
        assert_eq!(f.imports.len(), 2);
        assert_eq!(f.imports[0].path, "fmt");
        assert_eq!(f.imports[1].alias.as_deref(), Some("x"));
        assert_eq!(f.imports[1].path, "example.com/y");
    }

    #[test]
    fn parses_struct_decl() {
        let f = file(
            "package p\ntype S struct {\n\tA int `json:\"a\"`\n\tb string\n\tEmbedded\n\t*Ptr\n}\n",
        );
        let Decl::Type(decl) = &f.decls[0] else {
            panic!("expected type decl");
        };
        assert_eq!(decl.name, "S");
        let TypeExpr::Struct { fields } = &decl.expr else {
            panic!("expected struct");
        };
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0].names, vec!["A"]);
        assert_eq!(fields[0].tag, "json:\"a\"");
        assert!(fields[2].embedded);
        assert!(fields[3].embedded);
        assert!(matches!(fields[3].ty, TypeExpr::Pointer(_)));
    }

    #[test]
    fn parses_func_decl_with_variadic() {
        let f = file("package p\nfunc Foo(x int, opts ...Option) error { return nil }\n");
        let Decl::Func(decl) = &f.decls[0] else {
            panic!("expected func decl");
        };
        assert_eq!(decl.name, "Foo");
        assert!(decl.func.variadic);
        assert_eq!(decl.func.params.len(), 2);
        assert_eq!(decl.func.params[0].names, vec!["x"]);
        assert_eq!(decl.func.results.len(), 1);
    }

    #[test]
    fn parses_method_with_pointer_receiver() {
        let f = file("package p\nfunc (s *S) Close() error { return nil }\n");
        let Decl::Func(decl) = &f.decls[0] else {
            panic!("expected func decl");
        };
        let recv = decl.receiver.as_ref().expect("receiver");
        assert_eq!(recv.base, "S");
    }

    #[test]
    fn parses_generic_type_and_receiver() {
        let f = file(
            "package p\ntype List[T any] struct { head *T }\nfunc (l *List[T]) Push(v T) {}\n",
        );
        let Decl::Type(decl) = &f.decls[0] else {
            panic!("expected type decl");
        };
        assert_eq!(decl.type_params.len(), 1);
        assert_eq!(decl.type_params[0].names, vec!["T"]);
        let Decl::Func(m) = &f.decls[1] else {
            panic!("expected method");
        };
        assert_eq!(m.receiver.as_ref().unwrap().type_params, vec!["T"]);
    }

    #[test]
    fn array_vs_type_params() {
        let f = file("package p\ntype A [3]int\ntype B [N]int\ntype C []int\ntype D[T any] []T\n");
        let exprs: Vec<&TypeDecl> = f
            .decls
            .iter()
            .map(|d| match d {
                Decl::Type(t) => t,
                _ => panic!("expected type decl"),
            })
            .collect();
        assert!(matches!(exprs[0].expr, TypeExpr::Array { len: 3, .. }));
        assert!(matches!(exprs[1].expr, TypeExpr::Array { len: 0, .. }));
        assert!(matches!(exprs[2].expr, TypeExpr::Slice(_)));
        assert_eq!(exprs[3].type_params.len(), 1);
        assert!(matches!(exprs[3].expr, TypeExpr::Slice(_)));
    }

    #[test]
    fn parses_interface_with_union() {
        let f = file(
            "package p\ntype C interface {\n\t~int | string\n\tString() string\n\tcomparable\n}\n",
        );
        let Decl::Type(decl) = &f.decls[0] else {
            panic!("expected type decl");
        };
        let TypeExpr::Interface { methods, embeds } = &decl.expr else {
            panic!("expected interface");
        };
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].name, "String");
        assert_eq!(embeds.len(), 2);
        assert_eq!(embeds[0].terms.len(), 2);
        assert!(embeds[0].terms[0].0, "first term is a tilde term");
    }

    #[test]
    fn parses_channels_and_maps() {
        let f = file("package p\ntype T map[string]chan int\ntype U <-chan int\ntype V chan<- int\n");
        let tys: Vec<&TypeExpr> = f
            .decls
            .iter()
            .map(|d| match d {
                Decl::Type(t) => &t.expr,
                _ => panic!(),
            })
            .collect();
        assert!(matches!(tys[0], TypeExpr::Map { .. }));
        assert!(matches!(
            tys[1],
            TypeExpr::Chan {
                dir: ChanDir::RecvOnly,
                ..
            }
        ));
        assert!(matches!(
            tys[2],
            TypeExpr::Chan {
                dir: ChanDir::SendOnly,
                ..
            }
        ));
    }

    #[test]
    fn parses_const_group_with_iota() {
        let f = file("package p\nconst (\n\tA Level = iota\n\tB\n\tC\n)\n");
        let names: Vec<&str> = f
            .decls
            .iter()
            .map(|d| match d {
                Decl::Value(v) => v.name.as_str(),
                _ => panic!(),
            })
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        for d in &f.decls {
            let Decl::Value(v) = d else { panic!() };
            assert!(v.ty.is_some(), "{} inherits the group type", v.name);
        }
    }

    #[test]
    fn parses_var_with_composite_literal() {
        let f = file("package p\nvar Default = Config{Debug: true}\nvar P = &Config{}\n");
        let Decl::Value(v) = &f.decls[0] else { panic!() };
        assert!(matches!(v.lit, Some(LitKind::Expr(TypeExpr::Name { .. }))));
        let Decl::Value(p) = &f.decls[1] else { panic!() };
        assert!(matches!(p.lit, Some(LitKind::PointerExpr(_))));
    }

    #[test]
    fn skips_function_bodies() {
        let f = file(
            "package p\nfunc F() int {\n\tx := map[string]int{\"a\": 1}\n\tif x[\"a\"] > 0 { return 1 }\n\treturn 0\n}\nfunc G() {}\n",
        );
        assert_eq!(f.decls.len(), 2);
    }

    #[test]
    fn parses_type_alias() {
        let f = file("package p\ntype A = B\n");
        let Decl::Type(decl) = &f.decls[0] else { panic!() };
        assert!(decl.alias);
    }

    #[test]
    fn unnamed_parameter_lists() {
        let f = file("package p\nfunc F(int, string) (bool, error) { return false, nil }\n");
        let Decl::Func(decl) = &f.decls[0] else { panic!() };
        assert_eq!(decl.func.params.len(), 2);
        assert!(decl.func.params[0].names.is_empty());
        assert_eq!(decl.func.results.len(), 2);
    }

    #[test]
    fn reports_position_on_error() {
        let err = Parser::new("package p\ntype S struct { A }{\n")
            .and_then(Parser::parse_file)
            .unwrap_err();
        assert!(err.pos.line >= 2);
    }
}
