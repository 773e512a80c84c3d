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

use compact_str::format_compact;

use crate::{
    analysis::{CompileResult, IssueCode},
    graph::{GraphNode, UpdateNodeRef},
    interpret::{BlockId, OpCode, Operand, Register, INVALID_LABEL},
    semantics::{
        assembler::CodeGen,
        backpatch::BackpatchTable,
        declarations::DeclarationEmitter,
        generator::{CodeGenerator, ReturnEmitter, SubCompilePass},
        resolver::{ChainCursor, Resolver},
        scope::ScopeFrame,
        CompileSession,
    },
    syntax::{
        AstNode,
        FunctionCallNode,
        IdentifierListNode,
        IfNode,
        SourceSpan,
        WhileNode,
    },
};

/// The pending jumps of the innermost loops.
#[derive(Default)]
struct LoopFrame {
    breaks: BackpatchTable,
    continues: BackpatchTable,
}

/// The code generator of the imperative dialect.
///
/// Statements are lowered in order without dependency tracking.
pub(super) struct ImperativeCodeGen<'s> {
    pub(super) base: CodeGen<'s>,
    loops: Vec<LoopFrame>,
}

impl<'s> ImperativeCodeGen<'s> {
    pub(super) fn new(session: &'s mut CompileSession, block: BlockId, scope: ScopeFrame) -> Self {
        Self {
            base: CodeGen::new(session, block, scope),
            loops: Vec::new(),
        }
    }

    /// Lowers the condition and leaves it in the CX register.
    fn emit_condition(&mut self, condition: &AstNode, span: SourceSpan) -> CompileResult<()> {
        let _ = self.emit_expression(condition, None, SubCompilePass::None)?;

        let class_scope = self.base.scope.class_scope;

        let _ = self.base.emit_pop(Operand::Register(Register::CX), class_scope, span);

        Ok(())
    }

    fn emit_if(&mut self, node: &IfNode) -> CompileResult<()> {
        self.emit_condition(&node.condition, node.span)?;

        if node.else_body.is_empty() {
            let branch = self.base.emit_cond_jump(
                OpCode::Jz,
                Operand::Register(Register::CX),
                INVALID_LABEL,
                node.span,
            );

            for statement in &node.body {
                self.emit_statement(statement)?;
            }

            let exit = self.base.pc();

            self.base.backpatch(branch, exit);

            return Ok(());
        }

        let then = self.base.pc() + 1;
        let branch = self.base.emit_cjmp(Operand::Register(Register::CX), then, INVALID_LABEL, node.span);

        for statement in &node.body {
            self.emit_statement(statement)?;
        }

        let skip = self.base.emit_pending_jmp(SourceSpan::nil());
        let otherwise = self.base.pc();

        self.base.backpatch(branch, otherwise);

        for statement in &node.else_body {
            self.emit_statement(statement)?;
        }

        let exit = self.base.pc();

        self.base.backpatch(skip, exit);

        Ok(())
    }

    fn emit_while(&mut self, node: &WhileNode) -> CompileResult<()> {
        let start = self.base.pc();

        self.emit_condition(&node.condition, node.span)?;

        let body = self.base.pc() + 1;
        let branch = self.base.emit_cjmp(Operand::Register(Register::CX), body, INVALID_LABEL, node.span);

        self.loops.push(LoopFrame::default());

        let result = node
            .body
            .iter()
            .try_for_each(|statement| self.emit_statement(statement));

        let mut frame = self.loops.pop().unwrap_or_default();

        result?;

        self.base.flush_backpatch(&mut frame.continues, start);

        let _ = self.base.emit_jmp(start, SourceSpan::nil());

        let exit = self.base.pc();

        self.base.backpatch(branch, exit);
        self.base.flush_backpatch(&mut frame.breaks, exit);

        Ok(())
    }

    fn emit_loop_exit(&mut self, span: SourceSpan, is_break: bool) -> CompileResult<()> {
        if self.loops.is_empty() {
            let keyword = match is_break {
                true => "break",
                false => "continue",
            };

            return Err(self.base.session.log_semantic_error(
                IssueCode::BreakOutsideLoop,
                format_compact!("'{keyword}' outside of a loop."),
                span,
            ));
        }

        let jump = self.base.emit_pending_jmp(span);

        if let Some(frame) = self.loops.last_mut() {
            match is_break {
                true => frame.breaks.append(jump),
                false => frame.continues.append(jump),
            }
        }

        Ok(())
    }
}

impl<'s> CodeGenerator<'s> for ImperativeCodeGen<'s> {
    #[inline(always)]
    fn base(&self) -> &CodeGen<'s> {
        &self.base
    }

    #[inline(always)]
    fn base_mut(&mut self) -> &mut CodeGen<'s> {
        &mut self.base
    }

    fn emit(&mut self, unit: &[AstNode]) -> CompileResult<()> {
        for statement in unit {
            self.emit_statement(statement)?;
        }

        self.emit_block_end(unit);

        Ok(())
    }

    fn emit_statement(&mut self, node: &AstNode) -> CompileResult<()> {
        match node {
            AstNode::Assignment(assignment) => {
                self.base.function_call_stack.clear();

                let ty = self.emit_expression(&assignment.value, None, SubCompilePass::None)?;

                let _ = self.emit_assignment_target(&assignment.target, ty, None)?;

                Ok(())
            }

            AstNode::Return(node) => {
                let _ = self.emit_return_statement(node, None)?;

                Ok(())
            }

            AstNode::If(node) => self.emit_if(node),
            AstNode::While(node) => self.emit_while(node),
            AstNode::Break(span) => self.emit_loop_exit(*span, true),
            AstNode::Continue(span) => self.emit_loop_exit(*span, false),
            AstNode::VarDeclaration(node) => self.emit_var_declaration(node),
            AstNode::LanguageBlock(node) => self.emit_language_block(node),

            AstNode::FunctionDefinition(node) => {
                let _ = self.emit_function_definition(node, false)?;

                Ok(())
            }

            AstNode::ClassDeclaration(node) => Err(self.base.session.log_semantic_error(
                IssueCode::ClassOutsideAssociative,
                format_compact!("Class '{}' must be declared in an associative block.", node.name),
                node.span,
            )),

            expression => {
                let span = expression.span();

                let _ = self.emit_expression(expression, None, SubCompilePass::None)?;

                let class_scope = self.base.scope.class_scope;

                let _ = self.base.emit_pop(Operand::Register(Register::BX), class_scope, span);

                Ok(())
            }
        }
    }

    #[inline(always)]
    fn emit_getter_setter_for_ident_list(
        &mut self,
        target: &IdentifierListNode,
        graph: Option<&mut GraphNode>,
    ) -> CompileResult<UpdateNodeRef> {
        self.emit_member_store(target, graph, false)
    }

    fn traverse_function_call(
        &mut self,
        call: &FunctionCallNode,
        cursor: &mut ChainCursor,
        graph: Option<&mut GraphNode>,
        pass: SubCompilePass,
    ) -> CompileResult<()> {
        self.base.emit_replication_guide = false;

        self.emit_call_segment(call, cursor, graph, pass)
    }

    #[inline(always)]
    fn emit_retb(&mut self, span: SourceSpan) {
        let _ = self.base.emit_retb_instruction(span);
    }

    #[inline(always)]
    fn emit_retcn(&mut self, span: SourceSpan) {
        let _ = self.base.emit_retcn_instruction(span);
    }

    #[inline(always)]
    fn emit_return(&mut self, span: SourceSpan) {
        let _ = self.base.emit_ret(span);
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        analysis::IssueCode,
        interpret::{Language, OpCode, Operand, Register},
        semantics::{CompileOptions, CompileSession},
        syntax::{
            AssignmentNode,
            AstNode,
            BinaryExpressionNode,
            ClassDeclarationNode,
            IdentifierNode,
            IfNode,
            LiteralNode,
            Operator,
            SourceSpan,
            WhileNode,
        },
    };

    fn assign(target: &str, value: impl Into<AstNode>) -> AstNode {
        AssignmentNode::new(IdentifierNode::new(target), value).into()
    }

    #[test]
    fn test_if_else() {
        let mut session = CompileSession::new(CompileOptions::new());

        let unit = [
            assign("a", LiteralNode::int("1")),
            AstNode::from(
                IfNode::new(IdentifierNode::new("a"), [assign("b", LiteralNode::int("2"))])
                    .with_else([assign("b", LiteralNode::int("3"))]),
            ),
        ];

        let block = session.compile(&unit, Language::Imperative).unwrap();
        let executable = session.finish();
        let block = executable.block(block).unwrap();
        let stream = block.instructions();

        assert!(block.graph().is_empty());

        let branch = stream.iter().position(|instruction| instruction.opcode == OpCode::CJmp).unwrap();
        let skip = stream.iter().position(|instruction| instruction.opcode == OpCode::Jmp).unwrap();

        assert_eq!(stream[branch].op2, Some(Operand::LabelIndex(branch + 1)));
        assert_eq!(stream[branch].op3, Some(Operand::LabelIndex(skip + 1)));
        assert_eq!(stream[skip].op1, Some(Operand::LabelIndex(stream.len() - 1)));
        assert_eq!(stream.last().unwrap().opcode, OpCode::RetB);

        assert!(stream
            .iter()
            .flat_map(|instruction| instruction.operands())
            .all(|operand| !operand.is_unpatched_label()));
    }

    #[test]
    fn test_if_without_else() {
        let mut session = CompileSession::new(CompileOptions::new());

        let unit = [
            assign("a", LiteralNode::bool(true)),
            AstNode::from(IfNode::new(IdentifierNode::new("a"), [assign("b", LiteralNode::int("2"))])),
        ];

        let block = session.compile(&unit, Language::Imperative).unwrap();
        let executable = session.finish();
        let stream = executable.block(block).unwrap().instructions();

        let branch = stream.iter().find(|instruction| instruction.opcode == OpCode::Jz).unwrap();

        assert_eq!(branch.op1, Some(Operand::Register(Register::CX)));
        assert_eq!(branch.op2, Some(Operand::LabelIndex(stream.len() - 1)));
        assert!(stream.iter().all(|instruction| instruction.opcode != OpCode::CJmp));
    }

    #[test]
    fn test_while_loop() {
        let mut session = CompileSession::new(CompileOptions::new());

        let condition = BinaryExpressionNode::new(IdentifierNode::new("i"), Operator::Lt, LiteralNode::int("10"));
        let increment = BinaryExpressionNode::new(IdentifierNode::new("i"), Operator::Add, LiteralNode::int("1"));

        let unit = [
            assign("i", LiteralNode::int("0")),
            AstNode::from(WhileNode::new(
                condition,
                [
                    assign("i", increment),
                    AstNode::Continue(SourceSpan::nil()),
                    AstNode::Break(SourceSpan::nil()),
                ],
            )),
        ];

        let block = session.compile(&unit, Language::Imperative).unwrap();
        let executable = session.finish();
        let stream = executable.block(block).unwrap().instructions();

        let start = stream.iter().position(|instruction| instruction.opcode == OpCode::Pop).unwrap() + 1;
        let exit = stream.len() - 1;

        let jumps = stream
            .iter()
            .filter(|instruction| instruction.opcode == OpCode::Jmp)
            .map(|instruction| instruction.op1)
            .collect::<Vec<_>>();

        assert_eq!(
            jumps,
            vec![
                Some(Operand::LabelIndex(start)),
                Some(Operand::LabelIndex(exit)),
                Some(Operand::LabelIndex(start)),
            ],
        );

        let branch = stream.iter().find(|instruction| instruction.opcode == OpCode::CJmp).unwrap();

        assert_eq!(branch.op3, Some(Operand::LabelIndex(exit)));
    }

    #[test]
    fn test_misplaced_statements() {
        let mut session = CompileSession::new(CompileOptions::new());

        let error = session
            .compile(&[AstNode::Break(SourceSpan::nil())], Language::Imperative)
            .unwrap_err();

        assert_eq!(error.code(), Some(IssueCode::BreakOutsideLoop));

        let error = session
            .compile(&[ClassDeclarationNode::new("Local").into()], Language::Imperative)
            .unwrap_err();

        assert_eq!(error.code(), Some(IssueCode::ClassOutsideAssociative));
    }
}
