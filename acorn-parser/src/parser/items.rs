// Declaration forms: def, type, module, import, and ccall.

use super::*;

impl<'src, 'ids> Parser<'src, 'ids> {
    /// `def [builtin] name(params) [as Type]` with an indented body for
    /// non-builtin instances. Builtin instances must declare their return
    /// type and carry no body.
    pub(crate) fn read_def_instance(&mut self) -> Option<DefInstance> {
        let def_token = self.read_keyword("def")?;

        let builtin = self.is_and_skip_keyword("builtin");

        let name = self.read_decl_name(true)?;

        let mut parameters = Vec::new();
        if self.is_and_skip_token(TokenKind::OpenParenthesis) {
            while !self.is_token(TokenKind::CloseParenthesis) {
                let parameter = self.read_parameter()?;
                parameters.push(parameter);

                if !self.is_and_skip_token(TokenKind::Comma) {
                    break;
                }
            }
            self.skip_token(TokenKind::CloseParenthesis).then_some(())?;
        }

        let mut return_type = None;
        if builtin {
            self.skip_keyword("as").then_some(())?;
            return_type = Some(self.read_type_name()?);
        } else if self.is_and_skip_keyword("as") {
            return_type = Some(self.read_type_name()?);
        }

        let mut body = None;
        if !builtin {
            let block = self.read_block(true)?;
            body = Some(Box::new(Node::Block(block)));
        }

        Some(DefInstance {
            id: self.ids.next(),
            token: def_token,
            ty: None,
            name,
            builtin,
            parameters,
            return_type,
            body,
        })
    }

    pub(crate) fn read_def(&mut self) -> Option<Def> {
        let def_token = self.front_token();

        let instance = self.read_def_instance()?;

        Some(Def {
            id: self.ids.next(),
            token: def_token,
            ty: None,
            instances: vec![instance],
        })
    }

    /// `type [builtin] Name`, `type Name as Alias`, or a record declaration
    /// with an indented `field as Type` list.
    pub(crate) fn read_type_decl(&mut self) -> Option<TypeDecl> {
        let type_token = self.read_keyword("type")?;

        let builtin = self.is_and_skip_keyword("builtin");

        let name = self.read_decl_name(false)?;

        if builtin {
            return Some(TypeDecl {
                id: self.ids.next(),
                token: type_token,
                ty: None,
                name,
                builtin: true,
                alias: None,
                field_names: Vec::new(),
                field_types: Vec::new(),
            });
        }

        if self.is_and_skip_keyword("as") {
            let alias = self.read_type_name()?;

            return Some(TypeDecl {
                id: self.ids.next(),
                token: type_token,
                ty: None,
                name,
                builtin: false,
                alias: Some(alias),
                field_names: Vec::new(),
                field_types: Vec::new(),
            });
        }

        self.skip_token(TokenKind::Indent).then_some(())?;

        let mut field_names = Vec::new();
        let mut field_types = Vec::new();

        while !self.is_token(TokenKind::Deindent) {
            let field_name = self.read_name()?;
            field_names.push(field_name);

            self.skip_keyword("as").then_some(())?;

            let field_type = self.read_type_name()?;
            field_types.push(field_type);
        }

        self.skip_deindent_and_end_token().then_some(())?;

        Some(TypeDecl {
            id: self.ids.next(),
            token: type_token,
            ty: None,
            name,
            builtin: false,
            alias: None,
            field_names,
            field_types,
        })
    }

    pub(crate) fn read_module(&mut self) -> Option<Module> {
        let module_token = self.read_keyword("module")?;

        let name = self.read_decl_name(false)?;

        let body = self.read_block(true)?;

        Some(Module {
            id: self.ids.next(),
            token: module_token,
            ty: None,
            name,
            body: Box::new(Node::Block(body)),
        })
    }

    /// `ccall name(Type, ...) as Type [using arg, ...]`.
    pub(crate) fn read_ccall(&mut self) -> Option<CCall> {
        let ccall_token = self.read_keyword("ccall")?;

        let name = self.read_name()?;

        self.skip_token(TokenKind::OpenParenthesis).then_some(())?;

        let mut parameters = Vec::new();
        while !self.is_token(TokenKind::CloseParenthesis) {
            let parameter = self.read_type_name()?;
            parameters.push(parameter);

            if !self.is_and_skip_token(TokenKind::Comma) {
                break;
            }
        }

        self.skip_token(TokenKind::CloseParenthesis).then_some(())?;
        self.skip_keyword("as").then_some(())?;

        let given_return_type = self.read_type_name()?;

        let mut arguments = Vec::new();
        if self.is_and_skip_keyword("using") {
            loop {
                let argument = self.read_expression()?;
                arguments.push(argument);

                if !self.is_and_skip_token(TokenKind::Comma) {
                    break;
                }
            }
        }

        Some(CCall {
            id: self.ids.next(),
            token: ccall_token,
            ty: None,
            name,
            parameters,
            given_return_type,
            arguments,
        })
    }

    /// `import "relative/path"` — parses the import clause and loads the
    /// referenced file relative to the importing file's directory.
    pub(crate) fn read_import_expression(&mut self) -> Option<Import> {
        let import_token = self.read_keyword("import")?;

        let path = self.read_string()?;

        Some(Import {
            id: self.ids.next(),
            token: import_token,
            ty: None,
            path,
        })
    }

    /// Load and parse the file an import refers to. A missing file reports
    /// FileNotFound; a file that parses with errors contributes its
    /// diagnostics but no tree.
    pub(crate) fn load_import(&mut self, import: &Import) -> Option<SourceFile> {
        let file_path = self.base_dir.join(format!("{}.acorn", import.path.value));
        let display = file_path.display().to_string();

        let source = match std::fs::read_to_string(&file_path) {
            Ok(source) => source,
            Err(_) => {
                self.report(acorn_diagnostics::Diagnostic::file_not_found(
                    import.token.location.clone(),
                    &display,
                ));
                return None;
            }
        };

        let lexer = Lexer::new(&source, &display);
        let mut nested = Parser::new(lexer, &mut *self.ids);
        let parsed = nested.parse(&display);
        let failed = nested.has_errors();
        let diagnostics = nested.take_diagnostics();
        drop(nested);

        for diagnostic in diagnostics {
            self.report(diagnostic);
        }

        if failed {
            None
        } else {
            parsed
        }
    }
}
