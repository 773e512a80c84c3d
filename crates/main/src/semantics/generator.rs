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

use std::borrow::Cow;

use compact_str::format_compact;

use crate::{
    analysis::{CompileResult, IssueCode},
    graph::{GraphNode, UpdateNodeRef},
    interpret::{Operand, Register},
    report::system_panic,
    runtime::{PrimitiveType, Type, INVALID_TYPE},
    semantics::{
        assembler::CodeGen,
        resolver::{ChainCursor, Resolver},
    },
    syntax::{AstNode, FunctionCallNode, IdentifierListNode, Operator, ReturnNode, SourceSpan},
};

/// A sub-pass of expression lowering.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub(super) enum SubCompilePass {
    /// Regular lowering.
    #[default]
    None,

    /// A dry traversal that declares the forward-referenced names of an
    /// expression. Value-producing nodes emit nothing in this pass.
    UnboundIdentifier,
}

impl SubCompilePass {
    #[inline(always)]
    pub(super) fn is_probe(self) -> bool {
        self == Self::UnboundIdentifier
    }
}

/// A dialect code generator.
///
/// The associative and the imperative dialects implement the operations of
/// this trait. The algorithms shared by both dialects (symbol allocation,
/// chain resolution, dependency tracking, literal lowering) are provided
/// by the extension traits implemented for every code generator.
pub(super) trait CodeGenerator<'s> {
    fn base(&self) -> &CodeGen<'s>;

    fn base_mut(&mut self) -> &mut CodeGen<'s>;

    /// Lowers a sequence of statements into the generator's block and
    /// terminates the block.
    fn emit(&mut self, unit: &[AstNode]) -> CompileResult<()>;

    fn emit_statement(&mut self, node: &AstNode) -> CompileResult<()>;

    /// Stores the top of the stack through the identifier list `target`.
    ///
    /// Returns the updated chain.
    fn emit_getter_setter_for_ident_list(
        &mut self,
        target: &IdentifierListNode,
        graph: Option<&mut GraphNode>,
    ) -> CompileResult<UpdateNodeRef>;

    /// Lowers a call segment of a chain whose preceding segments are
    /// described by the `cursor`.
    fn traverse_function_call(
        &mut self,
        call: &FunctionCallNode,
        cursor: &mut ChainCursor,
        graph: Option<&mut GraphNode>,
        pass: SubCompilePass,
    ) -> CompileResult<()>;

    fn emit_retb(&mut self, span: SourceSpan);

    fn emit_retcn(&mut self, span: SourceSpan);

    fn emit_return(&mut self, span: SourceSpan);

    /// Returns null from the current procedure or block.
    fn emit_return_null(&mut self, span: SourceSpan) {
        let base = self.base_mut();

        let _ = base.emit_push_null(span);
        let _ = base.emit_return_to_register(span);
    }
}

/// Lowering of the return statement and of block termination.
pub(super) trait ReturnEmitter<'s>: CodeGenerator<'s> + Sized {
    /// Lowers a return statement.
    ///
    /// A constructor may not return a value. A value that does not match the
    /// procedure's declared return type is replaced by null.
    ///
    /// If the `graph` node is specified, its update range is set to the
    /// instructions of the returned value.
    fn emit_return_statement(
        &mut self,
        node: &ReturnNode,
        mut graph: Option<&mut GraphNode>,
    ) -> CompileResult<Type> {
        let procedure = self
            .base()
            .scope
            .procedure
            .and_then(|procedure| self.base().session.procedure(procedure))
            .map(|procedure| (procedure.is_constructor, procedure.return_type, procedure.name.clone()));

        if let Some((true, _, name)) = &procedure {
            return Err(self.base_mut().session.log_semantic_error(
                IssueCode::ReturnInConstructor,
                format_compact!("Constructor '{name}' cannot return a value."),
                node.span,
            ));
        }

        let start = self.base().pc();

        let ty = match &node.value {
            Some(value) => self.emit_expression(value, graph.as_deref_mut(), SubCompilePass::None)?,

            None => {
                let _ = self.base_mut().emit_push_null(node.span);

                Type::primitive(PrimitiveType::Null)
            }
        };

        if let Some(graph) = graph {
            graph.set_update_range(start, self.base().pc().saturating_sub(1));
        }

        if let Some((_, expected, name)) = procedure {
            let base = self.base_mut();

            let mismatch = !expected.is(PrimitiveType::Var)
                && !ty.is(PrimitiveType::Var)
                && ty.uid != INVALID_TYPE
                && !base.session.classes.convertible_to(ty.uid, expected.uid);

            if mismatch {
                base.session.log_warning(
                    IssueCode::MismatchReturnType,
                    format_compact!("Function '{name}' returns {ty}, but {expected} is expected."),
                    node.span,
                );

                let _ = base.emit_pop(Operand::Register(Register::BX), None, node.span);
                let _ = base.emit_push_null(node.span);

                return self.finish_return(node.span, Type::primitive(PrimitiveType::Null));
            }
        }

        self.finish_return(node.span, ty)
    }

    #[doc(hidden)]
    fn finish_return(&mut self, span: SourceSpan, ty: Type) -> CompileResult<Type> {
        let base = self.base_mut();

        let _ = base.emit_pop(Operand::Register(Register::RX), base.scope.class_scope, span);

        match base.scope.is_function_body(base.block) {
            true => self.emit_return(SourceSpan::nil()),
            false => self.emit_retb(SourceSpan::nil()),
        }

        Ok(ty)
    }

    /// Terminates the lowered unit.
    ///
    /// A procedure body without a trailing return statement returns null,
    /// or the new instance if the procedure is a constructor. Other blocks
    /// end with `retb`.
    fn emit_block_end(&mut self, unit: &[AstNode]) {
        let base = self.base_mut();

        if !base.scope.is_function_body(base.block) {
            self.emit_retb(SourceSpan::nil());
            return;
        }

        if let Some(AstNode::Return(..)) = unit.last() {
            return;
        }

        let constructor = base
            .scope
            .procedure
            .and_then(|procedure| base.session.procedure(procedure))
            .map(|procedure| procedure.is_constructor)
            .unwrap_or(false);

        match constructor {
            true => {
                let _ = base.emit_push_this(SourceSpan::nil());
                let _ = base.emit_return_to_register(SourceSpan::nil());
            }

            false => self.emit_return_null(SourceSpan::nil()),
        }
    }
}

impl<'s, G: CodeGenerator<'s>> ReturnEmitter<'s> for G {}

/// Returns the segments of a dotted chain in source order.
///
/// Fails if the chain is joined with an operator other than `.`.
pub(super) fn flatten_chain(node: &IdentifierListNode) -> Result<Vec<&AstNode>, SourceSpan> {
    let mut segments = Vec::new();

    flatten_into(node, &mut segments)?;

    Ok(segments)
}

fn flatten_into<'a>(
    node: &'a IdentifierListNode,
    segments: &mut Vec<&'a AstNode>,
) -> Result<(), SourceSpan> {
    if node.op != Operator::Dot {
        return Err(node.span);
    }

    for side in [node.left.as_ref(), node.right.as_ref()] {
        match side {
            AstNode::IdentifierList(inner) => flatten_into(inner, segments)?,
            other => segments.push(other),
        }
    }

    Ok(())
}

/// Replaces a parenthesized identifier or call segment by its contents.
///
/// The subscripts and guides of the group are moved to the inner node.
pub(super) fn unwrap_segment(segment: &AstNode) -> Cow<'_, AstNode> {
    match segment {
        AstNode::Group(group)
            if matches!(
                group.expr.as_ref(),
                AstNode::Identifier(..) | AstNode::FunctionCall(..) | AstNode::Group(..)
            ) =>
        {
            let inner = group.unwrapped();

            Cow::Owned(unwrap_segment(&inner).into_owned())
        }

        other => Cow::Borrowed(other),
    }
}

#[inline(always)]
pub(super) fn expect_segments(len: usize) {
    if len == 0 {
        system_panic!("Empty identifier list.");
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        semantics::generator::{flatten_chain, unwrap_segment},
        syntax::{
            AstNode,
            FunctionCallNode,
            GroupExpressionNode,
            IdentifierListNode,
            IdentifierNode,
            LiteralNode,
            Operator,
        },
    };

    #[test]
    fn test_chain_flattening() {
        let Some(AstNode::IdentifierList(chain)) = AstNode::dotted([
            AstNode::from(IdentifierNode::new("a")),
            AstNode::from(IdentifierNode::new("b")),
            AstNode::from(FunctionCallNode::new("f", Vec::<AstNode>::new())),
        ]) else {
            panic!("Chain expected.");
        };

        let segments = flatten_chain(&chain).unwrap();

        assert_eq!(segments.len(), 3);
        assert!(matches!(segments[2], AstNode::FunctionCall(..)));

        let mut broken = IdentifierListNode::new(IdentifierNode::new("a"), IdentifierNode::new("b"));

        broken.op = Operator::Add;

        assert!(flatten_chain(&broken).is_err());
    }

    #[test]
    fn test_segment_unwrapping() {
        let group = AstNode::from(
            GroupExpressionNode::new(GroupExpressionNode::new(IdentifierNode::new("a")))
                .with_dims([LiteralNode::int("0")]),
        );

        let AstNode::Identifier(ident) = unwrap_segment(&group).into_owned() else {
            panic!("Identifier expected.");
        };

        assert_eq!(ident.name, "a");
        assert_eq!(ident.dims.len(), 1);

        let list = AstNode::from(GroupExpressionNode::new(LiteralNode::int("1")));

        assert!(matches!(&*unwrap_segment(&list), AstNode::Group(..)));
    }
}
