// Expression parsing: literals, primaries, postfix forms, and the
// precedence-climbing binary expression reader.

use indexmap::IndexMap;

use super::*;

impl<'src, 'ids> Parser<'src, 'ids> {
    pub(crate) fn read_int(&mut self) -> Option<IntLiteral> {
        let token = self.read_token(TokenKind::Int)?;
        Some(IntLiteral {
            id: self.ids.next(),
            token: token.clone(),
            ty: None,
            value: token.lexeme,
        })
    }

    pub(crate) fn read_float(&mut self) -> Option<FloatLiteral> {
        let token = self.read_token(TokenKind::Float)?;
        Some(FloatLiteral {
            id: self.ids.next(),
            token: token.clone(),
            ty: None,
            value: token.lexeme,
        })
    }

    pub(crate) fn read_string(&mut self) -> Option<StringLiteral> {
        let token = self.read_token(TokenKind::String)?;
        Some(StringLiteral {
            id: self.ids.next(),
            token: token.clone(),
            ty: None,
            value: token.lexeme,
        })
    }

    pub(crate) fn read_list(&mut self) -> Option<List> {
        let list_token = self.read_token(TokenKind::OpenBracket)?;

        let mut elements = Vec::new();
        while !self.is_token(TokenKind::CloseBracket) {
            let element = self.read_expression()?;
            elements.push(element);

            if !self.is_and_skip_token(TokenKind::Comma) {
                break;
            }
        }

        self.skip_token(TokenKind::CloseBracket).then_some(())?;

        Some(List {
            id: self.ids.next(),
            token: list_token,
            ty: None,
            elements,
        })
    }

    pub(crate) fn read_dictionary(&mut self) -> Option<Dictionary> {
        let dict_token = self.read_token(TokenKind::OpenBrace)?;

        let mut keys = Vec::new();
        let mut values = Vec::new();

        while !self.is_token(TokenKind::CloseBrace) {
            let key = self.read_expression()?;
            keys.push(key);

            self.skip_token(TokenKind::Colon).then_some(())?;

            let value = self.read_expression()?;
            values.push(value);

            if !self.is_and_skip_token(TokenKind::Comma) {
                break;
            }
        }

        self.skip_token(TokenKind::CloseBrace).then_some(())?;

        Some(Dictionary {
            id: self.ids.next(),
            token: dict_token,
            ty: None,
            keys,
            values,
        })
    }

    /// `( expr )` or a tuple `( expr, expr, ... )`.
    pub(crate) fn read_parenthesis_expression(&mut self) -> Option<Node> {
        let open_token = self.read_token(TokenKind::OpenParenthesis)?;

        let first = self.read_expression()?;

        if self.is_and_skip_token(TokenKind::Comma) {
            let mut elements = vec![first];
            while !self.is_token(TokenKind::CloseParenthesis) {
                let element = self.read_expression()?;
                elements.push(element);

                if !self.is_and_skip_token(TokenKind::Comma) {
                    break;
                }
            }
            self.skip_token(TokenKind::CloseParenthesis).then_some(())?;

            return Some(Node::Tuple(Tuple {
                id: self.ids.next(),
                token: open_token,
                ty: None,
                elements,
            }));
        }

        self.skip_token(TokenKind::CloseParenthesis).then_some(())?;
        Some(first)
    }

    pub(crate) fn read_primary_expression(&mut self) -> Option<Node> {
        if self.is_token(TokenKind::OpenParenthesis) {
            self.read_parenthesis_expression()
        } else if self.is_token(TokenKind::Int) {
            self.read_int().map(Node::Int)
        } else if self.is_token(TokenKind::Float) {
            self.read_float().map(Node::Float)
        } else if self.is_token(TokenKind::String) {
            self.read_string().map(Node::String)
        } else if self.is_token(TokenKind::OpenBracket) {
            self.read_list().map(Node::List)
        } else if self.is_token(TokenKind::OpenBrace) {
            self.read_dictionary().map(Node::Dictionary)
        } else if self.is_keyword("while") {
            self.read_while().map(Node::While)
        } else if self.is_keyword("for") {
            self.read_for().map(Node::Block)
        } else if self.is_keyword("if") {
            self.read_if().map(Node::If)
        } else if self.is_keyword("switch") {
            self.read_switch().map(Node::Switch)
        } else if self.is_keyword("return") {
            self.read_return().map(Node::Return)
        } else if self.is_keyword("spawn") {
            self.read_spawn().map(Node::Spawn)
        } else if self.is_keyword("ccall") {
            self.read_ccall().map(Node::CCall)
        } else if self.is_token(TokenKind::Name) {
            self.read_param_name().map(Node::ParamName)
        } else {
            let token = self.front_token();
            let lexeme = token.lexeme_string();
            self.report(acorn_diagnostics::Diagnostic::syntax(
                token.location,
                &lexeme,
                "primary expression",
            ));
            None
        }
    }

    /// Primary expression with its postfix forms: calls, indexing, casts and
    /// selectors, in any combination.
    pub(crate) fn read_operand_expression(&mut self) -> Option<Node> {
        let mut left = self.read_primary_expression()?;

        loop {
            if self.is_token(TokenKind::OpenParenthesis) {
                left = Node::Call(self.read_call(left)?);
            } else if self.is_token(TokenKind::OpenBracket) {
                left = Node::Call(self.read_index(left)?);
            } else if self.is_keyword("as") {
                left = Node::Cast(self.read_cast(left)?);
            } else if self.is_token(TokenKind::Dot) {
                left = Node::Selector(self.read_selector(left)?);
            } else {
                break;
            }
        }

        Some(left)
    }

    /// `operand(positional, ..., name: value, ...)`.
    pub(crate) fn read_call(&mut self, operand: Node) -> Option<Call> {
        let call_token = self.read_token(TokenKind::OpenParenthesis)?;

        let mut positional_arguments = Vec::new();
        let mut keyword_arguments = IndexMap::new();

        while !self.is_token(TokenKind::CloseParenthesis) {
            let saved_token = self.front_token();
            let expression = self.read_expression()?;

            if self.is_and_skip_token(TokenKind::Colon) {
                let keyword = match &expression {
                    Node::Name(name) => Some(name.value.clone()),
                    Node::ParamName(name) if name.parameters.is_empty() => {
                        Some(name.name.value.clone())
                    }
                    _ => None,
                };

                let Some(keyword) = keyword else {
                    let lexeme = saved_token.lexeme_string();
                    self.report(acorn_diagnostics::Diagnostic::syntax(
                        saved_token.location,
                        &lexeme,
                        "Name",
                    ));
                    return None;
                };

                let value = self.read_expression()?;
                keyword_arguments.insert(keyword, value);
            } else {
                positional_arguments.push(expression);
            }

            if !self.is_and_skip_token(TokenKind::Comma) {
                break;
            }
        }

        self.skip_token(TokenKind::CloseParenthesis).then_some(())?;

        Some(Call::new(
            self.ids.next(),
            call_token,
            Box::new(operand),
            positional_arguments,
            keyword_arguments,
        ))
    }

    /// `a[b]` expands to `getindex(a, b)`; `a[b] = c` to `setindex(a, b, c)`.
    pub(crate) fn read_index(&mut self, operand: Node) -> Option<Call> {
        let index_token = self.read_token(TokenKind::OpenBracket)?;

        let index = self.read_expression()?;

        self.skip_token(TokenKind::CloseBracket).then_some(())?;

        let mut arguments = vec![operand, index];

        let builtin = if self.is_and_skip_token(TokenKind::Assignment) {
            let value = self.read_expression()?;
            arguments.push(value);
            "setindex"
        } else {
            "getindex"
        };

        Some(self.make_call(index_token, builtin, arguments))
    }

    pub(crate) fn read_cast(&mut self, operand: Node) -> Option<Cast> {
        let as_token = self.read_keyword("as")?;

        let new_type = self.read_type_name()?;

        Some(Cast {
            id: self.ids.next(),
            token: as_token,
            ty: None,
            operand: Box::new(operand),
            new_type,
        })
    }

    /// `operand.field`, `operand.+` (operator methods), `pair.0` (tuples).
    pub(crate) fn read_selector(&mut self, operand: Node) -> Option<Selector> {
        let dot_token = self.read_token(TokenKind::Dot)?;

        let field = if self.is_token(TokenKind::Int) {
            let literal = self.read_int()?;
            ParamName {
                id: self.ids.next(),
                token: literal.token.clone(),
                ty: None,
                name: Name {
                    id: self.ids.next(),
                    token: literal.token.clone(),
                    ty: None,
                    value: literal.value.clone(),
                    parameters: Vec::new(),
                },
                parameters: Vec::new(),
            }
        } else if self.is_token(TokenKind::Operator) {
            self.read_param_operator()?
        } else {
            self.read_param_name()?
        };

        Some(Selector {
            id: self.ids.next(),
            token: dot_token,
            ty: None,
            operand: Box::new(operand),
            field,
        })
    }

    /// Prefix operators (`-x`, `not x`) parse as calls of the operator
    /// function with a single argument.
    pub(crate) fn read_unary_expression(&mut self) -> Option<Node> {
        if self.is_token(TokenKind::Operator) || self.is_keyword("not") {
            let operator = if self.is_token(TokenKind::Operator) {
                self.read_operator()?
            } else {
                self.read_keyword_operator()?
            };

            let argument = self.read_unary_expression()?;

            let token = operator.token.clone();
            let call = Call::new(
                self.ids.next(),
                token,
                Box::new(Node::Name(operator)),
                vec![argument],
                IndexMap::new(),
            );
            Some(Node::Call(call))
        } else {
            self.read_operand_expression()
        }
    }

    /// Precedence climbing. Only `+` and `-` carry precedence 1; every other
    /// operator (including `and`/`or`) sits at 0 and associates left.
    pub(crate) fn read_binary_expression(
        &mut self,
        mut lhs: Node,
        min_precedence: i32,
    ) -> Option<Node> {
        while self.is_binary_operator() && self.front_precedence() >= min_precedence {
            let saved_token = self.front_token();

            let operator = if self.is_token(TokenKind::Operator) {
                self.read_operator()?
            } else {
                self.read_keyword_operator()?
            };

            let mut rhs = self.read_operand_expression()?;

            while self.is_binary_operator()
                && self.front_precedence() > self.precedence_of(&operator.value)
            {
                let next_precedence = self.front_precedence();
                rhs = self.read_binary_expression(rhs, next_precedence)?;
            }

            let call = Call::new(
                self.ids.next(),
                saved_token,
                Box::new(Node::Name(operator)),
                vec![lhs, rhs],
                IndexMap::new(),
            );
            lhs = Node::Call(call);
        }

        Some(lhs)
    }

    // ==================== Synthesized nodes ====================

    pub(crate) fn make_name(&mut self, token: Token, value: &str) -> Name {
        Name {
            id: self.ids.next(),
            token,
            ty: None,
            value: value.to_string(),
            parameters: Vec::new(),
        }
    }

    /// A call of a named builtin with positional arguments, sharing the
    /// originating token of the construct that desugared to it.
    pub(crate) fn make_call(&mut self, token: Token, name: &str, arguments: Vec<Node>) -> Call {
        let operand = self.make_name(token.clone(), name);
        Call::new(
            self.ids.next(),
            token,
            Box::new(Node::Name(operand)),
            arguments,
            IndexMap::new(),
        )
    }

    pub(crate) fn make_let(&mut self, token: Token, name: &str, rhs: Node) -> Let {
        let variable = VarDecl {
            id: self.ids.next(),
            token: token.clone(),
            ty: None,
            name: self.make_name(token.clone(), name),
            given_type: None,
            builtin: false,
        };

        let assignment = Assignment {
            id: self.ids.next(),
            token: token.clone(),
            ty: None,
            lhs: variable,
            rhs: Some(Box::new(rhs)),
        };

        Let {
            id: self.ids.next(),
            token,
            ty: None,
            assignment: Box::new(Node::Assignment(assignment)),
            body: None,
        }
    }
}
