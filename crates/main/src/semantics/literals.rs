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

use std::{mem::replace, num::IntErrorKind};

use compact_str::format_compact;

use crate::{
    analysis::{CompileResult, IssueCode},
    graph::GraphNode,
    interpret::{Instruction, OpCode, Operand, Register},
    report::system_panic,
    runtime::{is_higher_rank, PrimitiveType, Type, INVALID_TYPE},
    semantics::{
        assembler::CodeGen,
        generator::{CodeGenerator, SubCompilePass},
        resolver::Resolver,
    },
    syntax::{
        AstNode,
        BinaryExpressionNode,
        ExprListNode,
        GroupExpressionNode,
        LiteralKind,
        LiteralNode,
        RangeExprNode,
        UnaryExpressionNode,
        UnaryOperator,
    },
};

impl<'s> CodeGen<'s> {
    /// Picks the type of a literal of the `literal` primitive type in a
    /// context that expects the `expected` type.
    pub(super) fn infer_literal_type(&self, literal: PrimitiveType, expected: Type) -> Type {
        let literal = Type::primitive(literal);

        match !self.session.options.enforce_type_check || is_higher_rank(literal.uid, expected.uid) {
            true => literal,
            false => Type::scalar(expected.uid),
        }
    }

    /// Parses a scalar literal.
    ///
    /// Malformed literals are reported and replaced by zero values.
    fn literal_operand(&mut self, node: &LiteralNode) -> Operand {
        let span = node.span;

        match node.kind {
            LiteralKind::Int => match node.value.parse::<i64>() {
                Ok(value) => Operand::Int(value),

                Err(error) => {
                    let code = match error.kind() {
                        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => IssueCode::IntegerOverflow,
                        _ => IssueCode::InvalidNumber,
                    };

                    self.session.log_recoverable_error(
                        code,
                        format_compact!("Integer literal '{}' cannot be represented.", node.value),
                        span,
                    );

                    Operand::Int(0)
                }
            },

            LiteralKind::Double => match node.value.parse::<f64>() {
                Ok(value) => Operand::Double(value),

                Err(_) => {
                    self.session.log_recoverable_error(
                        IssueCode::InvalidNumber,
                        format_compact!("Malformed floating-point literal '{}'.", node.value),
                        span,
                    );

                    Operand::Double(0.0)
                }
            },

            LiteralKind::Bool => match node.value.as_str() {
                "true" => Operand::Bool(true),
                "false" => Operand::Bool(false),

                other => {
                    self.session.log_recoverable_error(
                        IssueCode::InvalidNumber,
                        format_compact!("Malformed boolean literal '{other}'."),
                        span,
                    );

                    Operand::Bool(false)
                }
            },

            LiteralKind::Char => {
                let mut chars = node.value.chars();

                match (chars.next(), chars.next()) {
                    (None, _) => {
                        self.session.log_syntax_error(
                            IssueCode::EmptyCharLiteral,
                            "Empty character literal.",
                            span,
                        );

                        Operand::Char('\0')
                    }

                    (Some(character), None) => Operand::Char(character),

                    (Some(character), Some(_)) => {
                        self.session.log_syntax_error(
                            IssueCode::CharLiteralTooLong,
                            format_compact!("Character literal '{}' is too long.", node.value),
                            span,
                        );

                        Operand::Char(character)
                    }
                }
            }

            LiteralKind::Null => Operand::Null,

            LiteralKind::String => system_panic!("String literals are lowered as character arrays."),
        }
    }

    /// Pushes the characters of a string literal and combines them into a
    /// string object.
    fn emit_string(&mut self, node: &LiteralNode) {
        let mut len = 0;

        for character in node.value.chars() {
            let _ = self.emit_push(Operand::Char(character), 0, node.span);

            len += 1;
        }

        let _ = self.emit_alloca(len, true);
    }
}

/// Lowering of literals and operator expressions.
pub(super) trait LiteralEmitter<'s>: CodeGenerator<'s> + Sized {
    /// Lowers a literal in a context that expects the `expected` type.
    fn emit_literal(&mut self, node: &LiteralNode, expected: Type, pass: SubCompilePass) -> CompileResult<Type> {
        let primitive = match node.kind {
            LiteralKind::Int => PrimitiveType::Int,
            LiteralKind::Double => PrimitiveType::Double,
            LiteralKind::Bool => PrimitiveType::Bool,
            LiteralKind::Char => PrimitiveType::Char,
            LiteralKind::String => PrimitiveType::String,
            LiteralKind::Null => PrimitiveType::Null,
        };

        if pass.is_probe() {
            return Ok(Type::primitive(primitive));
        }

        let base = self.base_mut();

        let ty = match node.kind {
            LiteralKind::Null => Type::primitive(primitive),
            _ => base.infer_literal_type(primitive, expected),
        };

        if base.guide_aware() {
            let _ = base.emit_push_index(Operand::ReplicationGuide(0));
        }

        match node.kind {
            LiteralKind::String => base.emit_string(node),

            _ => {
                let operand = base.literal_operand(node);

                let _ = base.emit_push(operand, 0, node.span);
            }
        }

        Ok(ty)
    }

    /// Lowers an array literal.
    ///
    /// The items are pushed in order and combined into an array. The element
    /// type is the common type of the items, or var if the items disagree.
    fn emit_expr_list(
        &mut self,
        list: &ExprListNode,
        mut graph: Option<&mut GraphNode>,
        pass: SubCompilePass,
    ) -> CompileResult<Type> {
        if pass.is_probe() {
            for node in list.items.iter().chain(&list.dims) {
                let _ = self.emit_expression(node, None, pass)?;
            }

            return Ok(Type::default());
        }

        let guides = replace(&mut self.base_mut().emit_replication_guide, false);

        let mut common: Option<Type> = None;

        for item in &list.items {
            let ty = match item {
                AstNode::Literal(literal) => {
                    let expected = common.unwrap_or(Type::invalid());

                    self.emit_literal(literal, expected, pass)?
                }

                other => self.emit_expression(other, graph.as_deref_mut(), pass)?,
            };

            common = match common {
                None => Some(ty),
                Some(common) if common.uid == ty.uid => Some(common),
                Some(_) => Some(Type::default()),
            };
        }

        self.base_mut().emit_replication_guide = guides;

        let _ = self.base_mut().emit_alloca(list.items.len(), false);

        let (dims, _) = self.emit_dims(&list.dims, graph, pass)?;

        let base = self.base_mut();

        if dims > 0 {
            let _ = base.emit_push_index(Operand::ArrayDim(dims));
        }

        if base.guide_aware() {
            base.emit_replication_guides(&list.guides, true);
        }

        let element = match common {
            Some(common) if common.uid != INVALID_TYPE => common.uid,
            _ => PrimitiveType::Var.uid(),
        };

        Ok(Type::array(element, literal_rank(list)).subscripted(dims))
    }

    fn emit_range(
        &mut self,
        range: &RangeExprNode,
        mut graph: Option<&mut GraphNode>,
        pass: SubCompilePass,
    ) -> CompileResult<Type> {
        let _ = self.emit_expression(&range.from, graph.as_deref_mut(), pass)?;
        let _ = self.emit_expression(&range.to, graph.as_deref_mut(), pass)?;

        match &range.step {
            Some(step) => {
                let _ = self.emit_expression(step, graph, pass)?;
            }

            None if !pass.is_probe() => {
                let _ = self.base_mut().emit_push_null(range.span);
            }

            None => (),
        }

        if !pass.is_probe() {
            let _ = self.base_mut().append(Instruction::new(OpCode::Range), range.span);
        }

        Ok(Type::array(PrimitiveType::Var.uid(), 1))
    }

    fn emit_unary_expression(
        &mut self,
        node: &UnaryExpressionNode,
        graph: Option<&mut GraphNode>,
        pass: SubCompilePass,
    ) -> CompileResult<Type> {
        let ty = self.emit_expression(&node.expr, graph, pass)?;

        if pass.is_probe() {
            return Ok(ty);
        }

        let base = self.base_mut();
        let class_scope = base.scope.class_scope;
        let register = Operand::Register(Register::AX);

        let _ = base.emit_pop(register, class_scope, node.span);
        let _ = base.emit_unary(OpCode::from_unary(node.op), register, node.span);
        let _ = base.emit_push(register, 0, node.span);

        Ok(match node.op {
            UnaryOperator::Not => Type::primitive(PrimitiveType::Bool),
            _ => ty,
        })
    }

    fn emit_binary_expression(
        &mut self,
        node: &BinaryExpressionNode,
        mut graph: Option<&mut GraphNode>,
        pass: SubCompilePass,
    ) -> CompileResult<Type> {
        let Some(opcode) = OpCode::from_binary(node.op) else {
            return Err(self.base_mut().session.log_semantic_error(
                IssueCode::InvalidIndirection,
                format_compact!("Operator '{}' cannot be used in an expression.", node.op.symbol()),
                node.span,
            ));
        };

        let left = self.emit_expression(&node.left, graph.as_deref_mut(), pass)?;
        let right = self.emit_expression(&node.right, graph, pass)?;

        if pass.is_probe() {
            return Ok(Type::default());
        }

        let base = self.base_mut();
        let class_scope = base.scope.class_scope;

        let _ = base.emit_pop(Operand::Register(Register::BX), class_scope, node.span);
        let _ = base.emit_pop(Operand::Register(Register::AX), class_scope, node.span);
        let _ = base.emit_binary(
            opcode,
            Operand::Register(Register::AX),
            Operand::Register(Register::BX),
            node.span,
        );
        let _ = base.emit_push(Operand::Register(Register::AX), 0, node.span);

        Ok(binary_type(node, left, right))
    }

    /// Lowers a parenthesized expression.
    ///
    /// Subscripts of the group are moved onto the inner expression when the
    /// inner expression has none of its own.
    fn emit_group(
        &mut self,
        group: &GroupExpressionNode,
        mut graph: Option<&mut GraphNode>,
        pass: SubCompilePass,
    ) -> CompileResult<Type> {
        let inner = group.expr.as_ref();

        let movable = !group.dims.is_empty()
            && inner.dims().is_empty()
            && matches!(
                inner,
                AstNode::Identifier(..) | AstNode::FunctionCall(..) | AstNode::ExprList(..)
            );

        if movable {
            return self.emit_expression(&group.unwrapped(), graph, pass);
        }

        let ty = self.emit_expression(inner, graph.as_deref_mut(), pass)?;

        let (dims, _) = self.emit_dims(&group.dims, graph, pass)?;

        if dims > 0 && !pass.is_probe() {
            let _ = self.base_mut().emit_push_index(Operand::ArrayDim(dims));
        }

        Ok(ty.subscripted(dims))
    }
}

impl<'s, G: CodeGenerator<'s>> LiteralEmitter<'s> for G {}

/// Returns the nesting depth of an array literal.
///
/// The depth is measured along the first items. Strings count as
/// one-dimensional arrays, and an empty list has no depth.
pub(super) fn literal_rank(list: &ExprListNode) -> isize {
    let mut rank = 0;
    let mut current = list;

    loop {
        let Some(first) = current.items.first() else {
            return rank;
        };

        rank += 1;

        match first {
            AstNode::ExprList(inner) => current = inner,
            other if other.is_string() => return rank + 1,
            _ => return rank,
        }
    }
}

fn binary_type(node: &BinaryExpressionNode, left: Type, right: Type) -> Type {
    if node.op.is_boolean() {
        return Type::primitive(PrimitiveType::Bool);
    }

    if left.uid == right.uid && left.rank == right.rank {
        return left;
    }

    let numeric = |ty: Type| ty.rank == 0 && (ty.is(PrimitiveType::Int) || ty.is(PrimitiveType::Double));

    match numeric(left) && numeric(right) {
        true => Type::primitive(PrimitiveType::Double),
        false => Type::default(),
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        analysis::IssueCode,
        interpret::{BlockKind, Language, OpCode, Operand},
        runtime::{PrimitiveType, Type},
        semantics::{
            associative::AssociativeCodeGen,
            generator::SubCompilePass,
            literals::{literal_rank, LiteralEmitter},
            resolver::Resolver,
            scope::ScopeFrame,
            CompileOptions,
            CompileSession,
        },
        syntax::{
            AstNode,
            BinaryExpressionNode,
            ExprListNode,
            LiteralNode,
            Operator,
            UnaryExpressionNode,
            UnaryOperator,
        },
    };

    fn session(options: CompileOptions) -> CompileSession {
        let mut session = CompileSession::new(options);

        let _ = session.new_block(BlockKind::Global, Language::Associative, None);

        session
    }

    #[test]
    fn test_array_literal() {
        let mut session = session(CompileOptions::new());
        let mut codegen = AssociativeCodeGen::new(&mut session, 0, ScopeFrame::global());

        let list = ExprListNode::new([LiteralNode::int("1"), LiteralNode::int("2"), LiteralNode::int("3")]);

        let ty = codegen
            .emit_expression(&list.into(), None, SubCompilePass::None)
            .unwrap();

        assert!(ty.is(PrimitiveType::Int));
        assert_eq!(ty.rank, 1);

        let stream = session.block(0).unwrap().instructions();

        assert_eq!(stream.len(), 4);
        assert_eq!(stream[0].op1, Some(Operand::Int(1)));
        assert_eq!(stream[2].op1, Some(Operand::Int(3)));
        assert_eq!(stream[3].opcode, OpCode::Alloca);
    }

    #[test]
    fn test_nested_rank() {
        let mut session = session(CompileOptions::new());
        let mut codegen = AssociativeCodeGen::new(&mut session, 0, ScopeFrame::global());

        let list = ExprListNode::new([
            AstNode::from(ExprListNode::new([LiteralNode::int("1")])),
            AstNode::from(ExprListNode::new([LiteralNode::double("2.5")])),
        ]);

        let ty = codegen
            .emit_expression(&list.into(), None, SubCompilePass::None)
            .unwrap();

        assert_eq!(ty.rank, 2);
        assert!(ty.is(PrimitiveType::Var));
    }

    #[test]
    fn test_rank_follows_first_item() {
        let empty = ExprListNode::new(Vec::<AstNode>::new());

        assert_eq!(literal_rank(&empty), 0);

        let mixed = ExprListNode::new([
            AstNode::from(LiteralNode::int("1")),
            AstNode::from(ExprListNode::new([LiteralNode::int("2")])),
        ]);

        assert_eq!(literal_rank(&mixed), 1);

        let strings = ExprListNode::new([LiteralNode::string("ab"), LiteralNode::string("c")]);

        assert_eq!(literal_rank(&strings), 2);

        let mut session = session(CompileOptions::new());
        let mut codegen = AssociativeCodeGen::new(&mut session, 0, ScopeFrame::global());

        let ty = codegen
            .emit_expression(&empty.into(), None, SubCompilePass::None)
            .unwrap();

        assert_eq!(ty.rank, 0);
    }

    #[test]
    fn test_literal_errors() {
        let mut session = session(CompileOptions::new());
        let mut codegen = AssociativeCodeGen::new(&mut session, 0, ScopeFrame::global());

        for literal in [
            LiteralNode::int("99999999999999999999"),
            LiteralNode::double("1.2.3"),
            LiteralNode::char(""),
            LiteralNode::char("ab"),
        ] {
            let _ = codegen
                .emit_literal(&literal, Type::invalid(), SubCompilePass::None)
                .unwrap();
        }

        let stream = session.block(0).unwrap().instructions();

        assert_eq!(stream[0].op1, Some(Operand::Int(0)));
        assert_eq!(stream[1].op1, Some(Operand::Double(0.0)));
        assert_eq!(stream[2].op1, Some(Operand::Char('\0')));
        assert_eq!(stream[3].op1, Some(Operand::Char('a')));

        let diagnostics = session.diagnostics();

        assert!(diagnostics.contains(IssueCode::IntegerOverflow));
        assert!(diagnostics.contains(IssueCode::InvalidNumber));
        assert!(diagnostics.contains(IssueCode::EmptyCharLiteral));
        assert!(diagnostics.contains(IssueCode::CharLiteralTooLong));
    }

    #[test]
    fn test_string_literal() {
        let mut session = session(CompileOptions::new());
        let mut codegen = AssociativeCodeGen::new(&mut session, 0, ScopeFrame::global());

        let ty = codegen
            .emit_expression(&LiteralNode::string("hi").into(), None, SubCompilePass::None)
            .unwrap();

        assert!(ty.is(PrimitiveType::String));

        let stream = session.block(0).unwrap().instructions();

        assert_eq!(stream[0].op1, Some(Operand::Char('h')));
        assert_eq!(stream[1].op1, Some(Operand::Char('i')));
        assert_eq!(stream[2].opcode, OpCode::Alloca);
    }

    #[test]
    fn test_literal_type_hint() {
        let mut options = CompileOptions::new();

        options.enforce_type_check = true;

        let mut session = session(options);
        let codegen = AssociativeCodeGen::new(&mut session, 0, ScopeFrame::global());

        let double = Type::primitive(PrimitiveType::Double);
        let int = Type::primitive(PrimitiveType::Int);

        assert!(codegen.base.infer_literal_type(PrimitiveType::Int, double).is(PrimitiveType::Double));
        assert!(codegen.base.infer_literal_type(PrimitiveType::Double, int).is(PrimitiveType::Double));
        assert!(codegen
            .base
            .infer_literal_type(PrimitiveType::Int, Type::invalid())
            .is(PrimitiveType::Int));
    }

    #[test]
    fn test_string_type_hint() {
        let mut options = CompileOptions::new();

        options.enforce_type_check = true;

        let mut session = session(options);
        let mut codegen = AssociativeCodeGen::new(&mut session, 0, ScopeFrame::global());

        let text = LiteralNode::string("a");

        let ty = codegen
            .emit_literal(&text, Type::primitive(PrimitiveType::Int), SubCompilePass::None)
            .unwrap();

        assert!(ty.is(PrimitiveType::Int));

        let ty = codegen
            .emit_literal(&text, Type::primitive(PrimitiveType::Var), SubCompilePass::None)
            .unwrap();

        assert!(ty.is(PrimitiveType::String));

        let mut lenient = self::session(CompileOptions::new());
        let mut codegen = AssociativeCodeGen::new(&mut lenient, 0, ScopeFrame::global());

        let ty = codegen
            .emit_literal(&text, Type::primitive(PrimitiveType::Int), SubCompilePass::None)
            .unwrap();

        assert!(ty.is(PrimitiveType::String));
    }

    #[test]
    fn test_operators() {
        let mut session = session(CompileOptions::new());
        let mut codegen = AssociativeCodeGen::new(&mut session, 0, ScopeFrame::global());

        let sum = BinaryExpressionNode::new(LiteralNode::int("1"), Operator::Add, LiteralNode::double("2.0"));

        let ty = codegen
            .emit_expression(&sum.into(), None, SubCompilePass::None)
            .unwrap();

        assert!(ty.is(PrimitiveType::Double));

        let negation = UnaryExpressionNode::new(UnaryOperator::Not, LiteralNode::bool(true));

        let ty = codegen
            .emit_expression(&negation.into(), None, SubCompilePass::None)
            .unwrap();

        assert!(ty.is(PrimitiveType::Bool));

        let stream = session.block(0).unwrap().instructions();
        let opcodes = stream.iter().map(|instruction| instruction.opcode).collect::<Vec<_>>();

        assert_eq!(
            opcodes,
            vec![
                OpCode::Push,
                OpCode::Push,
                OpCode::Pop,
                OpCode::Pop,
                OpCode::Add,
                OpCode::Push,
                OpCode::Push,
                OpCode::Pop,
                OpCode::Not,
                OpCode::Push,
            ],
        );
    }
}
