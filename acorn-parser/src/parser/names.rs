// Name-family parsing: plain names, operator names, type names, and the
// declaration/parameter-site variants with their generic parameter lists.

use super::*;

impl<'src, 'ids> Parser<'src, 'ids> {
    pub(crate) fn read_name(&mut self) -> Option<Name> {
        let token = self.read_token(TokenKind::Name)?;
        Some(Name {
            id: self.ids.next(),
            token: token.clone(),
            ty: None,
            value: token.lexeme,
            parameters: Vec::new(),
        })
    }

    /// An operator token in name position (`+`, `==`, ...), for operator
    /// definitions and operator calls.
    pub(crate) fn read_operator(&mut self) -> Option<Name> {
        let token = self.read_token(TokenKind::Operator)?;
        Some(Name {
            id: self.ids.next(),
            token: token.clone(),
            ty: None,
            value: token.lexeme,
            parameters: Vec::new(),
        })
    }

    /// `and`/`or`/`not` act as operators while lexing as keywords.
    pub(crate) fn read_keyword_operator(&mut self) -> Option<Name> {
        let token = self.read_token(TokenKind::Keyword)?;
        Some(Name {
            id: self.ids.next(),
            token: token.clone(),
            ty: None,
            value: token.lexeme,
            parameters: Vec::new(),
        })
    }

    pub(crate) fn read_type_name(&mut self) -> Option<TypeName> {
        let name = self.read_name()?;

        let mut parameters = Vec::new();
        if self.is_and_skip_token(TokenKind::OpenBrace) {
            while !self.is_token(TokenKind::CloseBrace) {
                let parameter = self.read_type_name()?;
                parameters.push(parameter);

                if !self.is_and_skip_token(TokenKind::Comma) {
                    break;
                }
            }
            self.skip_token(TokenKind::CloseBrace).then_some(())?;
        }

        Some(TypeName {
            id: self.ids.next(),
            token: name.token.clone(),
            ty: None,
            name,
            parameters,
        })
    }

    /// Declaration-site name with declared generic parameters: `id{T}`.
    pub(crate) fn read_decl_name(&mut self, can_be_operator: bool) -> Option<DeclName> {
        let name = if can_be_operator && self.is_token(TokenKind::Operator) {
            self.read_operator()?
        } else {
            self.read_name()?
        };

        let mut parameters = Vec::new();
        if self.is_and_skip_token(TokenKind::OpenBrace) {
            while !self.is_token(TokenKind::CloseBrace) {
                let parameter = self.read_name()?;
                parameters.push(parameter);

                if !self.is_and_skip_token(TokenKind::Comma) {
                    break;
                }
            }
            self.skip_token(TokenKind::CloseBrace).then_some(())?;
        }

        Some(DeclName {
            id: self.ids.next(),
            token: name.token.clone(),
            ty: None,
            name,
            parameters,
        })
    }

    /// Use-site name with type arguments: `f{Int64}`.
    pub(crate) fn read_param_name(&mut self) -> Option<ParamName> {
        let name = self.read_name()?;
        self.finish_param_name(name)
    }

    pub(crate) fn read_param_operator(&mut self) -> Option<ParamName> {
        let name = self.read_operator()?;
        self.finish_param_name(name)
    }

    fn finish_param_name(&mut self, name: Name) -> Option<ParamName> {
        let mut parameters = Vec::new();
        if self.is_and_skip_token(TokenKind::OpenBrace) {
            while !self.is_token(TokenKind::CloseBrace) {
                let parameter = self.read_type_name()?;
                parameters.push(parameter);

                if !self.is_and_skip_token(TokenKind::Comma) {
                    break;
                }
            }
            self.skip_token(TokenKind::CloseBrace).then_some(())?;
        }

        Some(ParamName {
            id: self.ids.next(),
            token: name.token.clone(),
            ty: None,
            name,
            parameters,
        })
    }

    /// `let [builtin] Name [as TypeName]`.
    pub(crate) fn read_var_decl(&mut self) -> Option<VarDecl> {
        let let_token = self.read_keyword("let")?;

        let builtin = self.is_and_skip_keyword("builtin");

        let name = self.read_name()?;

        let mut given_type = None;
        if self.is_and_skip_keyword("as") {
            given_type = Some(self.read_type_name()?);
        }

        Some(VarDecl {
            id: self.ids.next(),
            token: let_token,
            ty: None,
            name,
            given_type,
            builtin,
        })
    }
}
