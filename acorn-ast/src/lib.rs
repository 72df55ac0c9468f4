// Abstract syntax tree for the Acorn language
//
// One tagged sum `Node` covers every syntactic form; each variant wraps a
// struct that carries its originating token, a parser-assigned identity, and
// the type slot filled in by the type checker. Traversal is exhaustive
// pattern matching over `Node`.

use acorn_lexer::Token;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an AST node, assigned densely by the parser.
///
/// Symbols keep a `NodeId` as their non-owning back reference into the tree,
/// and method symbols are keyed by it before mangling.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into the type universe arena owned by the type checker.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TypeId(pub u32);

/// Hands out fresh node identities; owned by the parser so synthesized nodes
/// (desugared loops, index calls) share the same id space as parsed ones.
#[derive(Debug, Default)]
pub struct NodeCounter {
    next: u32,
}

impl NodeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

/// Common behaviour of every AST node struct.
pub trait AstNode {
    fn id(&self) -> NodeId;
    fn token(&self) -> &Token;
    fn type_id(&self) -> Option<TypeId>;
    fn set_type_id(&mut self, ty: TypeId);

    fn has_type(&self) -> bool {
        self.type_id().is_some()
    }

    fn copy_type_from(&mut self, other: &dyn AstNode) {
        if let Some(ty) = other.type_id() {
            self.set_type_id(ty);
        }
    }
}

macro_rules! ast_node_impl {
    ($($name:ident),* $(,)?) => {
        $(
            impl AstNode for $name {
                fn id(&self) -> NodeId {
                    self.id
                }

                fn token(&self) -> &Token {
                    &self.token
                }

                fn type_id(&self) -> Option<TypeId> {
                    self.ty
                }

                fn set_type_id(&mut self, ty: TypeId) {
                    self.ty = Some(ty);
                }
            }
        )*
    };
}

/// Ordered sequence of expressions; the type of a block is the type of its
/// last expression, or Void when empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub expressions: Vec<Node>,
}

/// Identifier at a use site, optionally with generic parameters (`id{T}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Name {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub value: String,
    pub parameters: Vec<Name>,
}

impl Name {
    pub fn has_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }
}

/// Dot access: `operand.field`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selector {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub operand: Box<Node>,
    pub field: ParamName,
}

/// A name in type position; its parameters are themselves type names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeName {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub name: Name,
    pub parameters: Vec<TypeName>,
}

impl TypeName {
    pub fn has_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }
}

/// Identifier at a declaration site; generic parameters are declared names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclName {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub name: Name,
    pub parameters: Vec<Name>,
}

impl DeclName {
    pub fn has_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }
}

/// Identifier at a parameter or field site; generic arguments are type names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamName {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub name: Name,
    pub parameters: Vec<TypeName>,
}

/// `let [builtin] name [as Type]` — the left side of an assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub name: Name,
    pub given_type: Option<TypeName>,
    pub builtin: bool,
}

/// Integer literal; the textual value is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntLiteral {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatLiteral {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexLiteral {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringLiteral {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub elements: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuple {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub elements: Vec<Node>,
}

/// Parallel key/value sequences; the invariant `keys.len() == values.len()`
/// is maintained by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dictionary {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub keys: Vec<Node>,
    pub values: Vec<Node>,
}

/// Call expression. After type checking it also records which method of the
/// resolved function was chosen, which specialisation of that method the
/// call instantiates, and the inferred generic parameter bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub operand: Box<Node>,
    pub positional_arguments: Vec<Node>,
    pub keyword_arguments: IndexMap<String, Node>,
    pub method_index: Option<usize>,
    pub specialisation_index: Option<usize>,
    pub inferred_type_parameters: Vec<(TypeId, TypeId)>,
}

impl Call {
    pub fn new(
        id: NodeId,
        token: Token,
        operand: Box<Node>,
        positional_arguments: Vec<Node>,
        keyword_arguments: IndexMap<String, Node>,
    ) -> Self {
        Self {
            id,
            token,
            ty: None,
            operand,
            positional_arguments,
            keyword_arguments,
            method_index: None,
            specialisation_index: None,
            inferred_type_parameters: Vec::new(),
        }
    }

    /// Look up an inferred binding for a generic parameter slot.
    pub fn inferred_type_parameter(&self, parameter: TypeId) -> Option<TypeId> {
        self.inferred_type_parameters
            .iter()
            .find(|(slot, _)| *slot == parameter)
            .map(|(_, ty)| *ty)
    }

    pub fn add_inferred_type_parameter(&mut self, parameter: TypeId, ty: TypeId) {
        self.inferred_type_parameters.push((parameter, ty));
    }
}

/// Foreign function call; bypasses the overload system entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CCall {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub name: Name,
    pub parameters: Vec<TypeName>,
    pub given_return_type: TypeName,
    pub arguments: Vec<Node>,
}

/// `operand as Type` — a bit cast; the operand is not constrained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cast {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub operand: Box<Node>,
    pub new_type: TypeName,
}

/// Binding assignment; a builtin assignment has no right-hand side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub lhs: VarDecl,
    pub rhs: Option<Box<Node>>,
}

impl Assignment {
    pub fn builtin(&self) -> bool {
        self.lhs.builtin
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct While {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub condition: Box<Node>,
    pub body: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct If {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub condition: Box<Node>,
    pub true_case: Box<Node>,
    pub false_case: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Return {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub expression: Box<Node>,
}

/// `spawn f(...)` — parsed and typed as its call; no further semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spawn {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub call: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub condition: Box<Node>,
    pub assignment: Option<Box<Node>>,
    pub body: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Switch {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub expression: Box<Node>,
    pub cases: Vec<Node>,
    pub default_case: Option<Box<Node>>,
}

/// `let` in statement position: an assignment with an optional body block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Let {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub assignment: Box<Node>,
    pub body: Option<Box<Node>>,
}

/// `[inout] name [as Type]` in a def's parameter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub inout: bool,
    pub name: Name,
    pub given_type: Option<TypeName>,
}

/// One concrete instance of a function definition. Builtin instances carry no
/// body but must declare a return type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefInstance {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub name: DeclName,
    pub builtin: bool,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<TypeName>,
    pub body: Option<Box<Node>>,
}

/// Grouping of def instances sharing one name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Def {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub instances: Vec<DefInstance>,
}

/// `type` declaration: a builtin primitive, an alias, or a record with
/// parallel field name/type lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub name: DeclName,
    pub builtin: bool,
    pub alias: Option<TypeName>,
    pub field_names: Vec<Name>,
    pub field_types: Vec<TypeName>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub name: DeclName,
    pub body: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub path: StringLiteral,
}

/// Root of a parsed file; imports are fully parsed source files of their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub id: NodeId,
    pub token: Token,
    pub ty: Option<TypeId>,
    pub name: String,
    pub imports: Vec<SourceFile>,
    pub code: Box<Node>,
}

ast_node_impl!(
    Block,
    Name,
    Selector,
    TypeName,
    DeclName,
    ParamName,
    VarDecl,
    IntLiteral,
    FloatLiteral,
    ComplexLiteral,
    StringLiteral,
    List,
    Tuple,
    Dictionary,
    Call,
    CCall,
    Cast,
    Assignment,
    While,
    If,
    Return,
    Spawn,
    Case,
    Switch,
    Let,
    Parameter,
    DefInstance,
    Def,
    TypeDecl,
    Module,
    Import,
    SourceFile,
);

macro_rules! node_sum {
    ($(($variant:ident, $payload:ident)),* $(,)?) => {
        /// Every syntactic form, as one tagged sum.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub enum Node {
            $($variant($payload),)*
        }

        /// The tag of a node, without its payload.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum NodeKind {
            $($variant,)*
        }

        impl Node {
            pub fn kind(&self) -> NodeKind {
                match self {
                    $(Node::$variant(_) => NodeKind::$variant,)*
                }
            }
        }

        impl AstNode for Node {
            fn id(&self) -> NodeId {
                match self {
                    $(Node::$variant(inner) => inner.id,)*
                }
            }

            fn token(&self) -> &Token {
                match self {
                    $(Node::$variant(inner) => &inner.token,)*
                }
            }

            fn type_id(&self) -> Option<TypeId> {
                match self {
                    $(Node::$variant(inner) => inner.ty,)*
                }
            }

            fn set_type_id(&mut self, ty: TypeId) {
                match self {
                    $(Node::$variant(inner) => inner.ty = Some(ty),)*
                }
            }
        }

        impl fmt::Display for NodeKind {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(NodeKind::$variant => write!(f, stringify!($variant)),)*
                }
            }
        }
    };
}

node_sum!(
    (Block, Block),
    (Name, Name),
    (Selector, Selector),
    (TypeName, TypeName),
    (DeclName, DeclName),
    (ParamName, ParamName),
    (VarDecl, VarDecl),
    (Int, IntLiteral),
    (Float, FloatLiteral),
    (Complex, ComplexLiteral),
    (String, StringLiteral),
    (List, List),
    (Tuple, Tuple),
    (Dictionary, Dictionary),
    (Call, Call),
    (CCall, CCall),
    (Cast, Cast),
    (Assignment, Assignment),
    (While, While),
    (If, If),
    (Return, Return),
    (Spawn, Spawn),
    (Case, Case),
    (Switch, Switch),
    (Let, Let),
    (Parameter, Parameter),
    (DefInstance, DefInstance),
    (Def, Def),
    (TypeDecl, TypeDecl),
    (Module, Module),
    (Import, Import),
    (SourceFile, SourceFile),
);

impl Node {
    /// The node as a name, when it is one. Used where the grammar promises a
    /// name but the tree stores a general node (call operands, keyword
    /// arguments).
    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Node::Name(name) => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acorn_diagnostics::SourceLocation;
    use acorn_lexer::TokenKind;

    fn token(lexeme: &str) -> Token {
        Token::new(
            TokenKind::Name,
            lexeme.to_string(),
            SourceLocation::unknown(),
        )
    }

    fn name(ids: &mut NodeCounter, value: &str) -> Name {
        Name {
            id: ids.next(),
            token: token(value),
            ty: None,
            value: value.to_string(),
            parameters: Vec::new(),
        }
    }

    #[test]
    fn test_kind_matches_variant() {
        let mut ids = NodeCounter::new();
        let node = Node::Name(name(&mut ids, "x"));
        assert_eq!(node.kind(), NodeKind::Name);
        assert_eq!(format!("{}", node.kind()), "Name");
    }

    #[test]
    fn test_node_ids_are_dense() {
        let mut ids = NodeCounter::new();
        assert_eq!(ids.next(), NodeId(0));
        assert_eq!(ids.next(), NodeId(1));
    }

    #[test]
    fn test_type_slot_and_copying() {
        let mut ids = NodeCounter::new();
        let mut first = Node::Name(name(&mut ids, "a"));
        let mut second = Node::Name(name(&mut ids, "b"));

        assert!(!first.has_type());
        first.set_type_id(TypeId(7));
        second.copy_type_from(&first);

        assert_eq!(second.type_id(), Some(TypeId(7)));
    }

    #[test]
    fn test_call_inferred_parameter_lookup() {
        let mut ids = NodeCounter::new();
        let operand = Node::Name(name(&mut ids, "f"));
        let mut call = Call::new(
            ids.next(),
            token("("),
            Box::new(operand),
            Vec::new(),
            IndexMap::new(),
        );

        call.add_inferred_type_parameter(TypeId(1), TypeId(9));
        assert_eq!(call.inferred_type_parameter(TypeId(1)), Some(TypeId(9)));
        assert_eq!(call.inferred_type_parameter(TypeId(2)), None);
    }

    #[test]
    fn test_nodes_serialize() {
        let mut ids = NodeCounter::new();
        let node = Node::Name(name(&mut ids, "x"));
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains("\"Name\""));
    }
}
