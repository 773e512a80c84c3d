////////////////////////////////////////////////////////////////////////////////
// This file is part of "Ad Astra", an embeddable scripting programming       //
// language platform.                                                         //
//                                                                            //
// This work is proprietary software with source-available code.              //
//                                                                            //
// To copy, use, distribute, or contribute to this work, you must agree to    //
// the terms of the General License Agreement:                                //
//                                                                            //
// https://github.com/Eliah-Lakhin/ad-astra/blob/master/EULA.md               //
//                                                                            //
// The agreement grants a Basic Commercial License, allowing you to use       //
// this work in non-commercial and limited commercial products with a total   //
// gross revenue cap. To remove this commercial limit for one of your         //
// products, you must acquire a Full Commercial License.                      //
//                                                                            //
// If you contribute to the source code, documentation, or related materials, //
// you must grant me an exclusive license to these contributions.             //
// Contributions are governed by the "Contributions" section of the General   //
// License Agreement.                                                         //
//                                                                            //
// Copying the work in parts is strictly forbidden, except as permitted       //
// under the General License Agreement.                                       //
//                                                                            //
// If you do not or cannot agree to the terms of this Agreement,              //
// do not use this work.                                                      //
//                                                                            //
// This work is provided "as is", without any warranties, express or implied, //
// except where such disclaimers are legally invalid.                         //
//                                                                            //
// Copyright (c) 2024 Ilya Lakhin (Илья Александрович Лахин).                 //
// All rights reserved.                                                       //
////////////////////////////////////////////////////////////////////////////////

use compact_str::CompactString;

use crate::{
    interpret::Language,
    runtime::{AccessModifier, MemoryRegion},
    syntax::{Operator, SourceSpan, UnaryOperator},
};

/// The `this` keyword.
pub const THIS_KEYWORD: &str = "this";

/// A node of the immutable syntax tree handed over to the code generator.
///
/// Each variant wraps a dedicated node struct. The generator dispatches on
/// this enum by pattern matching.
#[derive(Clone, Debug, PartialEq)]
pub enum AstNode {
    Identifier(IdentifierNode),
    IdentifierList(IdentifierListNode),
    FunctionCall(FunctionCallNode),
    Literal(LiteralNode),
    ExprList(ExprListNode),
    Range(RangeExprNode),
    Unary(UnaryExpressionNode),
    Binary(BinaryExpressionNode),
    Group(GroupExpressionNode),
    /// A placeholder for an omitted argument that takes the parameter's
    /// default value.
    DefaultArg(SourceSpan),
    /// A value of unknown type resolved by the runtime.
    Dynamic(SourceSpan),
    Assignment(AssignmentNode),
    Return(ReturnNode),
    If(IfNode),
    While(WhileNode),
    Break(SourceSpan),
    Continue(SourceSpan),
    LanguageBlock(LanguageBlockNode),
    FunctionDefinition(FunctionDefinitionNode),
    ClassDeclaration(ClassDeclarationNode),
    VarDeclaration(VarDeclarationNode),
}

macro_rules! impl_from_node {
    ($($variant:ident => $node:ty;)*) => {
        $(
            impl From<$node> for AstNode {
                #[inline(always)]
                fn from(node: $node) -> Self {
                    Self::$variant(node)
                }
            }
        )*
    };
}

impl_from_node! {
    Identifier => IdentifierNode;
    IdentifierList => IdentifierListNode;
    FunctionCall => FunctionCallNode;
    Literal => LiteralNode;
    ExprList => ExprListNode;
    Range => RangeExprNode;
    Unary => UnaryExpressionNode;
    Binary => BinaryExpressionNode;
    Group => GroupExpressionNode;
    Assignment => AssignmentNode;
    Return => ReturnNode;
    If => IfNode;
    While => WhileNode;
    LanguageBlock => LanguageBlockNode;
    FunctionDefinition => FunctionDefinitionNode;
    ClassDeclaration => ClassDeclarationNode;
    VarDeclaration => VarDeclarationNode;
}

impl AstNode {
    /// Builds a left-recursive dotted chain (`((a.b).c).d`) out of the
    /// segments.
    ///
    /// Returns None if the iterator is empty. A single segment is returned
    /// as is.
    pub fn dotted(segments: impl IntoIterator<Item = impl Into<AstNode>>) -> Option<Self> {
        let mut segments = segments.into_iter();

        let mut chain = segments.next()?.into();

        for segment in segments {
            chain = IdentifierListNode::new(chain, segment).into();
        }

        Some(chain)
    }

    /// Returns the source code range of this node.
    pub fn span(&self) -> SourceSpan {
        match self {
            Self::Identifier(node) => node.span,
            Self::IdentifierList(node) => node.span,
            Self::FunctionCall(node) => node.span,
            Self::Literal(node) => node.span,
            Self::ExprList(node) => node.span,
            Self::Range(node) => node.span,
            Self::Unary(node) => node.span,
            Self::Binary(node) => node.span,
            Self::Group(node) => node.span,
            Self::DefaultArg(span) => *span,
            Self::Dynamic(span) => *span,
            Self::Assignment(node) => node.span,
            Self::Return(node) => node.span,
            Self::If(node) => node.span,
            Self::While(node) => node.span,
            Self::Break(span) => *span,
            Self::Continue(span) => *span,
            Self::LanguageBlock(node) => node.span,
            Self::FunctionDefinition(node) => node.span,
            Self::ClassDeclaration(node) => node.span,
            Self::VarDeclaration(node) => node.span,
        }
    }

    /// Returns the array subscripts attached to this node, if the node kind
    /// supports subscripts.
    pub fn dims(&self) -> &[AstNode] {
        match self {
            Self::Identifier(node) => &node.dims,
            Self::FunctionCall(node) => &node.dims,
            Self::ExprList(node) => &node.dims,
            Self::Group(node) => &node.dims,
            _ => &[],
        }
    }

    /// Returns the replication guides attached to this node, if the node
    /// kind supports guides.
    pub fn guides(&self) -> &[ReplicationGuide] {
        match self {
            Self::Identifier(node) => &node.guides,
            Self::FunctionCall(node) => &node.guides,
            Self::ExprList(node) => &node.guides,
            Self::Group(node) => &node.guides,
            _ => &[],
        }
    }

    /// Replaces the subscripts and guides of this node.
    ///
    /// Returns false if the node kind does not carry subscripts.
    pub fn set_subscripts(&mut self, dims: Vec<AstNode>, guides: Vec<ReplicationGuide>) -> bool {
        match self {
            Self::Identifier(node) => {
                node.dims = dims;
                node.guides = guides;
            }

            Self::FunctionCall(node) => {
                node.dims = dims;
                node.guides = guides;
            }

            Self::ExprList(node) => {
                node.dims = dims;
                node.guides = guides;
            }

            Self::Group(node) => {
                node.dims = dims;
                node.guides = guides;
            }

            _ => return false,
        }

        true
    }

    /// Returns the identifier name if this node is a plain identifier.
    #[inline(always)]
    pub fn as_identifier(&self) -> Option<&IdentifierNode> {
        match self {
            Self::Identifier(node) => Some(node),
            _ => None,
        }
    }

    /// Returns true if this node is a string literal.
    #[inline(always)]
    pub fn is_string(&self) -> bool {
        match self {
            Self::Literal(node) => node.kind == LiteralKind::String,
            _ => false,
        }
    }

    /// Returns true if the node is a statement rather than a value-producing
    /// expression.
    pub fn is_statement(&self) -> bool {
        match self {
            Self::Assignment(..)
            | Self::Return(..)
            | Self::If(..)
            | Self::While(..)
            | Self::Break(..)
            | Self::Continue(..)
            | Self::LanguageBlock(..)
            | Self::FunctionDefinition(..)
            | Self::ClassDeclaration(..)
            | Self::VarDeclaration(..) => true,

            _ => false,
        }
    }
}

/// A replication guide (`a<1>`) controlling how an array-valued argument is
/// broadcast across a function call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReplicationGuide {
    pub value: i64,
    pub longest: bool,
}

impl ReplicationGuide {
    #[inline(always)]
    pub const fn new(value: i64) -> Self {
        Self {
            value,
            longest: false,
        }
    }
}

/// A plain identifier, possibly subscripted: `foo`, `foo[1][2]`, `foo<1>`.
#[derive(Clone, Debug, PartialEq)]
pub struct IdentifierNode {
    pub name: CompactString,
    pub dims: Vec<AstNode>,
    pub guides: Vec<ReplicationGuide>,
    pub span: SourceSpan,
}

impl IdentifierNode {
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            dims: Vec::new(),
            guides: Vec::new(),
            span: SourceSpan::nil(),
        }
    }

    /// Creates the `this` keyword identifier.
    #[inline(always)]
    pub fn this() -> Self {
        Self::new(THIS_KEYWORD)
    }

    pub fn with_dims(mut self, dims: impl IntoIterator<Item = impl Into<AstNode>>) -> Self {
        self.dims = dims.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_guides(mut self, guides: impl IntoIterator<Item = ReplicationGuide>) -> Self {
        self.guides = guides.into_iter().collect();
        self
    }

    #[inline(always)]
    pub fn at(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }

    #[inline(always)]
    pub fn is_this(&self) -> bool {
        self.name == THIS_KEYWORD
    }
}

/// A dotted chain segment pair: `left.right`.
///
/// Chains are left-recursive: `a.b.c` is `(a.b).c`.
#[derive(Clone, Debug, PartialEq)]
pub struct IdentifierListNode {
    pub left: Box<AstNode>,
    pub right: Box<AstNode>,
    pub op: Operator,

    /// Marks the final factor of a statement that was split into
    /// single-segment temporaries.
    pub is_last_ssa_factor: bool,

    pub span: SourceSpan,
}

impl IdentifierListNode {
    pub fn new(left: impl Into<AstNode>, right: impl Into<AstNode>) -> Self {
        let left = left.into();
        let right = right.into();
        let span = left.span().join(right.span());

        Self {
            left: Box::new(left),
            right: Box::new(right),
            op: Operator::Dot,
            is_last_ssa_factor: false,
            span,
        }
    }

    #[inline(always)]
    pub fn at(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }
}

/// A function or method call: `foo(a, b)`.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionCallNode {
    pub function: IdentifierNode,
    pub args: Vec<AstNode>,
    pub dims: Vec<AstNode>,
    pub guides: Vec<ReplicationGuide>,
    pub span: SourceSpan,
}

impl FunctionCallNode {
    pub fn new(
        function: impl Into<CompactString>,
        args: impl IntoIterator<Item = impl Into<AstNode>>,
    ) -> Self {
        Self {
            function: IdentifierNode::new(function),
            args: args.into_iter().map(Into::into).collect(),
            dims: Vec::new(),
            guides: Vec::new(),
            span: SourceSpan::nil(),
        }
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        self.function.name.as_str()
    }

    pub fn with_dims(mut self, dims: impl IntoIterator<Item = impl Into<AstNode>>) -> Self {
        self.dims = dims.into_iter().map(Into::into).collect();
        self
    }

    #[inline(always)]
    pub fn at(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self.function.span = span;
        self
    }
}

/// A kind of constant literal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Int,
    Double,
    Bool,
    Char,
    String,
    Null,
}

/// A constant literal. The value is kept in its source text form.
#[derive(Clone, Debug, PartialEq)]
pub struct LiteralNode {
    pub kind: LiteralKind,
    pub value: CompactString,
    pub span: SourceSpan,
}

impl LiteralNode {
    pub fn new(kind: LiteralKind, value: impl Into<CompactString>) -> Self {
        Self {
            kind,
            value: value.into(),
            span: SourceSpan::nil(),
        }
    }

    #[inline(always)]
    pub fn int(value: impl Into<CompactString>) -> Self {
        Self::new(LiteralKind::Int, value)
    }

    #[inline(always)]
    pub fn double(value: impl Into<CompactString>) -> Self {
        Self::new(LiteralKind::Double, value)
    }

    #[inline(always)]
    pub fn bool(value: bool) -> Self {
        Self::new(LiteralKind::Bool, if value { "true" } else { "false" })
    }

    #[inline(always)]
    pub fn char(value: impl Into<CompactString>) -> Self {
        Self::new(LiteralKind::Char, value)
    }

    #[inline(always)]
    pub fn string(value: impl Into<CompactString>) -> Self {
        Self::new(LiteralKind::String, value)
    }

    #[inline(always)]
    pub fn null() -> Self {
        Self::new(LiteralKind::Null, "null")
    }

    #[inline(always)]
    pub fn at(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }
}

/// An array literal: `{1, 2, 3}`.
#[derive(Clone, Debug, PartialEq)]
pub struct ExprListNode {
    pub items: Vec<AstNode>,
    pub dims: Vec<AstNode>,
    pub guides: Vec<ReplicationGuide>,
    pub span: SourceSpan,
}

impl ExprListNode {
    pub fn new(items: impl IntoIterator<Item = impl Into<AstNode>>) -> Self {
        Self {
            items: items.into_iter().map(Into::into).collect(),
            dims: Vec::new(),
            guides: Vec::new(),
            span: SourceSpan::nil(),
        }
    }

    pub fn with_dims(mut self, dims: impl IntoIterator<Item = impl Into<AstNode>>) -> Self {
        self.dims = dims.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_guides(mut self, guides: impl IntoIterator<Item = ReplicationGuide>) -> Self {
        self.guides = guides.into_iter().collect();
        self
    }

    #[inline(always)]
    pub fn at(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }
}

/// A range expression: `from..to..step`.
#[derive(Clone, Debug, PartialEq)]
pub struct RangeExprNode {
    pub from: Box<AstNode>,
    pub to: Box<AstNode>,
    pub step: Option<Box<AstNode>>,
    pub span: SourceSpan,
}

impl RangeExprNode {
    pub fn new(from: impl Into<AstNode>, to: impl Into<AstNode>) -> Self {
        Self {
            from: Box::new(from.into()),
            to: Box::new(to.into()),
            step: None,
            span: SourceSpan::nil(),
        }
    }

    pub fn with_step(mut self, step: impl Into<AstNode>) -> Self {
        self.step = Some(Box::new(step.into()));
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnaryExpressionNode {
    pub op: UnaryOperator,
    pub expr: Box<AstNode>,
    pub span: SourceSpan,
}

impl UnaryExpressionNode {
    pub fn new(op: UnaryOperator, expr: impl Into<AstNode>) -> Self {
        let expr = expr.into();
        let span = expr.span();

        Self {
            op,
            expr: Box::new(expr),
            span,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BinaryExpressionNode {
    pub left: Box<AstNode>,
    pub op: Operator,
    pub right: Box<AstNode>,
    pub span: SourceSpan,
}

impl BinaryExpressionNode {
    pub fn new(left: impl Into<AstNode>, op: Operator, right: impl Into<AstNode>) -> Self {
        let left = left.into();
        let right = right.into();
        let span = left.span().join(right.span());

        Self {
            left: Box::new(left),
            op,
            right: Box::new(right),
            span,
        }
    }
}

/// A parenthesized expression, possibly subscripted: `(a + b)[0]`.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupExpressionNode {
    pub expr: Box<AstNode>,
    pub dims: Vec<AstNode>,
    pub guides: Vec<ReplicationGuide>,
    pub span: SourceSpan,
}

impl GroupExpressionNode {
    pub fn new(expr: impl Into<AstNode>) -> Self {
        let expr = expr.into();
        let span = expr.span();

        Self {
            expr: Box::new(expr),
            dims: Vec::new(),
            guides: Vec::new(),
            span,
        }
    }

    pub fn with_dims(mut self, dims: impl IntoIterator<Item = impl Into<AstNode>>) -> Self {
        self.dims = dims.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the inner expression carrying over this group's subscripts
    /// and guides.
    ///
    /// If the inner expression cannot carry subscripts, it is returned
    /// unchanged.
    pub fn unwrapped(&self) -> AstNode {
        let mut inner = self.expr.as_ref().clone();

        if !self.dims.is_empty() || !self.guides.is_empty() {
            let _ = inner.set_subscripts(self.dims.clone(), self.guides.clone());
        }

        inner
    }
}

/// An assignment statement: `target = value;`.
#[derive(Clone, Debug, PartialEq)]
pub struct AssignmentNode {
    pub target: Box<AstNode>,
    pub value: Box<AstNode>,
    pub span: SourceSpan,
}

impl AssignmentNode {
    pub fn new(target: impl Into<AstNode>, value: impl Into<AstNode>) -> Self {
        let target = target.into();
        let value = value.into();
        let span = target.span().join(value.span());

        Self {
            target: Box::new(target),
            value: Box::new(value),
            span,
        }
    }

    #[inline(always)]
    pub fn at(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }
}

/// A return statement: `return value;`.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnNode {
    pub value: Option<Box<AstNode>>,
    pub span: SourceSpan,
}

impl ReturnNode {
    pub fn new(value: impl Into<AstNode>) -> Self {
        let value = value.into();
        let span = value.span();

        Self {
            value: Some(Box::new(value)),
            span,
        }
    }

    #[inline(always)]
    pub fn empty() -> Self {
        Self {
            value: None,
            span: SourceSpan::nil(),
        }
    }
}

/// An imperative conditional statement.
#[derive(Clone, Debug, PartialEq)]
pub struct IfNode {
    pub condition: Box<AstNode>,
    pub body: Vec<AstNode>,
    pub else_body: Vec<AstNode>,
    pub span: SourceSpan,
}

impl IfNode {
    pub fn new(
        condition: impl Into<AstNode>,
        body: impl IntoIterator<Item = impl Into<AstNode>>,
    ) -> Self {
        let condition = condition.into();
        let span = condition.span();

        Self {
            condition: Box::new(condition),
            body: body.into_iter().map(Into::into).collect(),
            else_body: Vec::new(),
            span,
        }
    }

    pub fn with_else(mut self, body: impl IntoIterator<Item = impl Into<AstNode>>) -> Self {
        self.else_body = body.into_iter().map(Into::into).collect();
        self
    }
}

/// An imperative loop statement.
#[derive(Clone, Debug, PartialEq)]
pub struct WhileNode {
    pub condition: Box<AstNode>,
    pub body: Vec<AstNode>,
    pub span: SourceSpan,
}

impl WhileNode {
    pub fn new(
        condition: impl Into<AstNode>,
        body: impl IntoIterator<Item = impl Into<AstNode>>,
    ) -> Self {
        let condition = condition.into();
        let span = condition.span();

        Self {
            condition: Box::new(condition),
            body: body.into_iter().map(Into::into).collect(),
            span,
        }
    }
}

/// A nested block written in the specified dialect:
/// `[Imperative] { ... }`.
#[derive(Clone, Debug, PartialEq)]
pub struct LanguageBlockNode {
    pub language: Language,
    pub body: Vec<AstNode>,
    pub span: SourceSpan,
}

impl LanguageBlockNode {
    pub fn new(language: Language, body: impl IntoIterator<Item = impl Into<AstNode>>) -> Self {
        Self {
            language,
            body: body.into_iter().map(Into::into).collect(),
            span: SourceSpan::nil(),
        }
    }
}

/// A declared type of a variable, parameter, or function result:
/// `int`, `double[]`, `var[]..[]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeAnnotation {
    pub name: CompactString,

    /// The array rank. A negative value denotes an array of arbitrary rank.
    pub rank: isize,
}

impl Default for TypeAnnotation {
    #[inline(always)]
    fn default() -> Self {
        Self::var()
    }
}

impl TypeAnnotation {
    pub fn new(name: impl Into<CompactString>, rank: isize) -> Self {
        Self {
            name: name.into(),
            rank,
        }
    }

    #[inline(always)]
    pub fn var() -> Self {
        Self::new("var", 0)
    }
}

/// A formal parameter of a function definition.
#[derive(Clone, Debug, PartialEq)]
pub struct ArgumentNode {
    pub name: CompactString,
    pub ty: TypeAnnotation,
    pub default: Option<Box<AstNode>>,
    pub span: SourceSpan,
}

impl ArgumentNode {
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            ty: TypeAnnotation::var(),
            default: None,
            span: SourceSpan::nil(),
        }
    }

    pub fn typed(mut self, ty: TypeAnnotation) -> Self {
        self.ty = ty;
        self
    }

    pub fn with_default(mut self, value: impl Into<AstNode>) -> Self {
        self.default = Some(Box::new(value.into()));
        self
    }
}

/// A function definition, either free-standing or a class method.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDefinitionNode {
    pub name: CompactString,
    pub args: Vec<ArgumentNode>,
    pub return_type: TypeAnnotation,
    pub body: Vec<AstNode>,
    pub attributes: Vec<FunctionCallNode>,
    pub is_static: bool,
    pub is_constructor: bool,
    pub access: AccessModifier,
    pub span: SourceSpan,
}

impl FunctionDefinitionNode {
    pub fn new(
        name: impl Into<CompactString>,
        args: impl IntoIterator<Item = ArgumentNode>,
        body: impl IntoIterator<Item = impl Into<AstNode>>,
    ) -> Self {
        Self {
            name: name.into(),
            args: args.into_iter().collect(),
            return_type: TypeAnnotation::var(),
            body: body.into_iter().map(Into::into).collect(),
            attributes: Vec::new(),
            is_static: false,
            is_constructor: false,
            access: AccessModifier::Public,
            span: SourceSpan::nil(),
        }
    }

    pub fn returns(mut self, ty: TypeAnnotation) -> Self {
        self.return_type = ty;
        self
    }

    pub fn constructor(mut self) -> Self {
        self.is_constructor = true;
        self
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn with_access(mut self, access: AccessModifier) -> Self {
        self.access = access;
        self
    }

    pub fn with_attributes(mut self, attributes: impl IntoIterator<Item = FunctionCallNode>) -> Self {
        self.attributes = attributes.into_iter().collect();
        self
    }
}

/// A class declaration with member variables and methods.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassDeclarationNode {
    pub name: CompactString,
    pub base: Option<CompactString>,
    pub members: Vec<VarDeclarationNode>,
    pub methods: Vec<FunctionDefinitionNode>,
    pub attributes: Vec<FunctionCallNode>,
    pub span: SourceSpan,
}

impl ClassDeclarationNode {
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            base: None,
            members: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
            span: SourceSpan::nil(),
        }
    }

    pub fn extends(mut self, base: impl Into<CompactString>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn member(mut self, member: VarDeclarationNode) -> Self {
        self.members.push(member);
        self
    }

    pub fn method(mut self, method: FunctionDefinitionNode) -> Self {
        self.methods.push(method);
        self
    }
}

/// An explicit variable declaration: `x : int[] = value;`.
#[derive(Clone, Debug, PartialEq)]
pub struct VarDeclarationNode {
    pub name: CompactString,
    pub ty: TypeAnnotation,
    pub value: Option<Box<AstNode>>,
    pub is_static: bool,
    pub access: AccessModifier,
    pub region: MemoryRegion,
    pub span: SourceSpan,
}

impl VarDeclarationNode {
    pub fn new(name: impl Into<CompactString>, ty: TypeAnnotation) -> Self {
        Self {
            name: name.into(),
            ty,
            value: None,
            is_static: false,
            access: AccessModifier::Public,
            region: MemoryRegion::Stack,
            span: SourceSpan::nil(),
        }
    }

    pub fn with_value(mut self, value: impl Into<AstNode>) -> Self {
        self.value = Some(Box::new(value.into()));
        self
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn with_access(mut self, access: AccessModifier) -> Self {
        self.access = access;
        self
    }

    pub fn on_heap(mut self) -> Self {
        self.region = MemoryRegion::Heap;
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::syntax::{
        AstNode,
        GroupExpressionNode,
        IdentifierNode,
        LiteralNode,
        Operator,
        SourceSpan,
    };

    #[test]
    fn test_dotted_chain_shape() {
        let chain = AstNode::dotted(["a", "b", "c"].map(IdentifierNode::new)).unwrap();

        let AstNode::IdentifierList(outer) = &chain else {
            panic!("Chain expected.");
        };

        assert_eq!(outer.op, Operator::Dot);
        assert_eq!(outer.right.as_identifier().unwrap().name, "c");

        let AstNode::IdentifierList(inner) = outer.left.as_ref() else {
            panic!("Left-recursive chain expected.");
        };

        assert_eq!(inner.left.as_identifier().unwrap().name, "a");
        assert_eq!(inner.right.as_identifier().unwrap().name, "b");

        let single = AstNode::dotted([IdentifierNode::new("x")]).unwrap();

        assert_eq!(single.as_identifier().unwrap().name, "x");
        assert!(AstNode::dotted(Vec::<AstNode>::new()).is_none());
    }

    #[test]
    fn test_group_unwrapping() {
        let group = GroupExpressionNode::new(IdentifierNode::new("a"))
            .with_dims([LiteralNode::int("0")]);

        let inner = group.unwrapped();

        assert_eq!(inner.dims().len(), 1);
        assert_eq!(inner.as_identifier().unwrap().name, "a");

        let literal = GroupExpressionNode::new(LiteralNode::int("1").at(SourceSpan::point(1, 2)))
            .with_dims([LiteralNode::int("0")])
            .unwrapped();

        assert!(literal.dims().is_empty());
        assert_eq!(literal.span(), SourceSpan::point(1, 2));
    }
}
