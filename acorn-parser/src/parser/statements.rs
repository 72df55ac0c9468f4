// Control-flow and binding forms: while, for (desugared), if, return, spawn,
// switch/case, and let.

use super::*;

impl<'src, 'ids> Parser<'src, 'ids> {
    pub(crate) fn read_while(&mut self) -> Option<While> {
        let while_token = self.read_keyword("while")?;

        let condition = self.read_expression()?;

        let body = self.read_block(true)?;

        Some(While {
            id: self.ids.next(),
            token: while_token,
            ty: None,
            condition: Box::new(condition),
            body: Box::new(Node::Block(body)),
        })
    }

    /// `for <var> in <iterable>` desugars to the iterator protocol:
    ///
    /// ```text
    /// let __for_iter_N = <iterable>
    /// let __for_state_N = start(__for_iter_N)
    /// while not(done(__for_iter_N, __for_state_N))
    ///     let <var> = next(__for_iter_N, __for_state_N)
    ///     <body>
    /// ```
    ///
    /// `next` advances the state through its inout parameter.
    pub(crate) fn read_for(&mut self) -> Option<Block> {
        let for_token = self.read_keyword("for")?;

        let variable = self.read_name()?;

        self.skip_keyword("in").then_some(())?;

        let iterable = self.read_expression()?;

        let loop_block = self.read_block(true)?;

        let marker = self.ids.next().0;
        let iter_name = format!("__for_iter_{}", marker);
        let state_name = format!("__for_state_{}", marker);

        let iter_let = self.make_let(for_token.clone(), &iter_name, iterable);

        let iter_ref = self.make_name(for_token.clone(), &iter_name);
        let start_call = self.make_call(for_token.clone(), "start", vec![Node::Name(iter_ref)]);
        let state_let = self.make_let(for_token.clone(), &state_name, Node::Call(start_call));

        let iter_ref = self.make_name(for_token.clone(), &iter_name);
        let state_ref = self.make_name(for_token.clone(), &state_name);
        let done_call = self.make_call(
            for_token.clone(),
            "done",
            vec![Node::Name(iter_ref), Node::Name(state_ref)],
        );
        let condition = self.make_call(for_token.clone(), "not", vec![Node::Call(done_call)]);

        let iter_ref = self.make_name(for_token.clone(), &iter_name);
        let state_ref = self.make_name(for_token.clone(), &state_name);
        let next_call = self.make_call(
            for_token.clone(),
            "next",
            vec![Node::Name(iter_ref), Node::Name(state_ref)],
        );
        let item_let = self.make_let(for_token.clone(), &variable.value, Node::Call(next_call));

        let mut body_expressions = vec![Node::Let(item_let)];
        body_expressions.extend(loop_block.expressions);

        let body = Block {
            id: self.ids.next(),
            token: loop_block.token,
            ty: None,
            expressions: body_expressions,
        };

        let while_node = While {
            id: self.ids.next(),
            token: for_token.clone(),
            ty: None,
            condition: Box::new(Node::Call(condition)),
            body: Box::new(Node::Block(body)),
        };

        Some(Block {
            id: self.ids.next(),
            token: for_token,
            ty: None,
            expressions: vec![
                Node::Let(iter_let),
                Node::Let(state_let),
                Node::While(while_node),
            ],
        })
    }

    /// `if <cond> <block> (else if ...)* (else <block>)? end`. The condition
    /// may be `let x = expr`, binding in the enclosing scope. An else-if
    /// chain shares the single closing `end`.
    pub(crate) fn read_if(&mut self) -> Option<If> {
        let if_token = self.read_keyword("if")?;

        let condition = if self.is_keyword("let") {
            let lhs = self.read_var_decl()?;

            let assignment_token = self.read_token(TokenKind::Assignment)?;

            let rhs = self.read_expression()?;

            Node::Assignment(Assignment {
                id: self.ids.next(),
                token: assignment_token,
                ty: None,
                lhs,
                rhs: Some(Box::new(rhs)),
            })
        } else {
            self.read_expression()?
        };

        let true_case = self.read_block(false)?;

        let mut false_case = None;
        if self.is_and_skip_keyword("else") {
            if self.is_keyword("if") {
                false_case = Some(Box::new(Node::If(self.read_if()?)));
            } else {
                let block = self.read_block(false)?;
                self.skip_keyword("end").then_some(())?;
                false_case = Some(Box::new(Node::Block(block)));
            }
        } else {
            self.skip_keyword("end").then_some(())?;
        }

        Some(If {
            id: self.ids.next(),
            token: if_token,
            ty: None,
            condition: Box::new(condition),
            true_case: Box::new(Node::Block(true_case)),
            false_case,
        })
    }

    pub(crate) fn read_return(&mut self) -> Option<Return> {
        let return_token = self.read_keyword("return")?;

        let expression = self.read_expression()?;

        Some(Return {
            id: self.ids.next(),
            token: return_token,
            ty: None,
            expression: Box::new(expression),
        })
    }

    /// `spawn f(...)` — the operand must be a call.
    pub(crate) fn read_spawn(&mut self) -> Option<Spawn> {
        let spawn_token = self.read_keyword("spawn")?;

        let expression = self.read_expression()?;

        if !matches!(expression, Node::Call(_)) {
            self.report(acorn_diagnostics::Diagnostic::syntax(
                expression.token().location.clone(),
                &expression.token().lexeme_string(),
                "function call",
            ));
            return None;
        }

        Some(Spawn {
            id: self.ids.next(),
            token: spawn_token,
            ty: None,
            call: Box::new(expression),
        })
    }

    /// `case <cond> [using <binding>]` followed by an indented body.
    pub(crate) fn read_case(&mut self) -> Option<Case> {
        let case_token = self.read_keyword("case")?;

        let condition = self.read_expression()?;

        let mut assignment = None;
        if self.is_and_skip_keyword("using") {
            let bound = if self.is_keyword("let") {
                Node::VarDecl(self.read_var_decl()?)
            } else {
                self.read_expression()?
            };
            assignment = Some(Box::new(bound));
        }

        let body = self.read_block(false)?;

        Some(Case {
            id: self.ids.next(),
            token: case_token,
            ty: None,
            condition: Box::new(condition),
            assignment,
            body: Box::new(Node::Block(body)),
        })
    }

    pub(crate) fn read_switch(&mut self) -> Option<Switch> {
        let switch_token = self.read_keyword("switch")?;

        let expression = self.read_expression()?;

        let mut cases = Vec::new();
        while self.is_keyword("case") {
            let case = self.read_case()?;
            cases.push(Node::Case(case));
        }

        let mut default_case = None;
        if self.is_and_skip_keyword("default") {
            let block = self.read_block(false)?;
            default_case = Some(Box::new(Node::Block(block)));
        }

        self.skip_keyword("end").then_some(())?;

        Some(Switch {
            id: self.ids.next(),
            token: switch_token,
            ty: None,
            expression: Box::new(expression),
            cases,
            default_case,
        })
    }

    pub(crate) fn read_parameter(&mut self) -> Option<Parameter> {
        let token = self.front_token();

        let inout = self.is_and_skip_keyword("inout");

        let name = self.read_name()?;

        let mut given_type = None;
        if self.is_and_skip_keyword("as") {
            given_type = Some(self.read_type_name()?);
        }

        Some(Parameter {
            id: self.ids.next(),
            token,
            ty: None,
            inout,
            name,
            given_type,
        })
    }

    /// Statement-position `let`: a var decl, an `=` and a right-hand side
    /// (absent for builtin declarations), and an optional indented body.
    pub(crate) fn read_let(&mut self) -> Option<Let> {
        let lhs = self.read_var_decl()?;

        let mut assignment_token = lhs.token.clone();
        let mut rhs = None;

        if !lhs.builtin {
            assignment_token = self.read_token(TokenKind::Assignment)?;

            let expression = self.read_expression()?;
            rhs = Some(Box::new(expression));
        }

        let mut body = None;
        if self.is_token(TokenKind::Indent) {
            let block = self.read_block(false)?;
            self.skip_keyword("end").then_some(())?;
            body = Some(Box::new(Node::Block(block)));
        }

        let let_token = lhs.token.clone();

        let assignment = Assignment {
            id: self.ids.next(),
            token: assignment_token,
            ty: None,
            lhs,
            rhs,
        };

        Some(Let {
            id: self.ids.next(),
            token: let_token,
            ty: None,
            assignment: Box::new(Node::Assignment(assignment)),
            body,
        })
    }
}
