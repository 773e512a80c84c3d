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

use crate::{
    interpret::{Instruction, Operand, Pc, INVALID_LABEL},
    report::system_panic,
    semantics::{assembler::CodeGen, ExecMode},
};

/// A forward jump waiting for its target address.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct BackpatchNode {
    /// The program counter of the jump instruction.
    pub(crate) pending: Pc,

    /// The resolved target, or [INVALID_LABEL] until the table is flushed.
    pub(crate) target: Pc,
}

/// A batch of forward jumps that resolve to the same target, such as all
/// `break` statements of one loop.
#[derive(Clone, Debug, Default)]
pub(crate) struct BackpatchTable {
    nodes: Vec<BackpatchNode>,
}

impl BackpatchTable {
    #[inline(always)]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub(crate) fn append(&mut self, pending: Pc) {
        self.nodes.push(BackpatchNode {
            pending,
            target: INVALID_LABEL,
        });
    }

    #[inline(always)]
    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<'s> CodeGen<'s> {
    /// Sets the target of the jump instruction at `pending`.
    ///
    /// The instruction must be a jump whose target is still unresolved.
    pub(super) fn backpatch(&mut self, pending: Pc, target: Pc) {
        let block = self.block;

        let stream = match self.session.exec_mode {
            ExecMode::Normal => &mut self.session.code_block_mut(block).stream,
            ExecMode::ExpressionInterpreter => &mut self.session.watch_stream,
        };

        let Some(instruction) = stream.get_mut(pending) else {
            system_panic!("Malformed backpatch position {pending} in block {block}.");
        };

        patch_instruction(instruction, target);
    }

    /// Resolves all jumps of the table to `target` and clears the table.
    pub(super) fn flush_backpatch(&mut self, table: &mut BackpatchTable, target: Pc) {
        if table.is_empty() {
            return;
        }

        for node in &mut table.nodes {
            node.target = target;
        }

        for node in table.nodes.drain(..) {
            self.backpatch(node.pending, node.target);
        }
    }
}

fn patch_instruction(instruction: &mut Instruction, target: Pc) {
    let opcode = instruction.opcode;

    let Some(slot) = instruction.jump_target_mut() else {
        system_panic!("Backpatching non-jump instruction {opcode}.");
    };

    match slot {
        Some(operand) if operand.is_unpatched_label() => *operand = Operand::LabelIndex(target),

        Some(Operand::LabelIndex(previous)) => {
            system_panic!("Jump {opcode} already targets {previous}.");
        }

        _ => system_panic!("Malformed jump target of {opcode}."),
    }

    if let Some(debug) = &mut instruction.debug {
        for step in &mut debug.next_steps {
            if *step == INVALID_LABEL {
                *step = target;
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        interpret::{BlockKind, Language, OpCode, Operand, Register, INVALID_LABEL},
        semantics::{
            assembler::CodeGen,
            backpatch::BackpatchTable,
            scope::ScopeFrame,
            CompileOptions,
            CompileSession,
        },
        syntax::SourceSpan,
    };

    fn session() -> CompileSession {
        let mut options = CompileOptions::new();

        options.emit_breakpoints = true;
        options.ide_debug_mode = true;

        let mut session = CompileSession::new(options);

        let _ = session.new_block(BlockKind::Global, Language::Imperative, None);

        session
    }

    #[test]
    fn test_table_flush() {
        let mut session = session();
        let mut codegen = CodeGen::new(&mut session, 0, ScopeFrame::global());

        let mut table = BackpatchTable::new();

        table.append(codegen.emit_pending_jmp(SourceSpan::point(1, 1)));
        let _ = codegen.emit_push_null(SourceSpan::nil());
        table.append(codegen.emit_pending_jmp(SourceSpan::point(2, 1)));
        table.append(codegen.emit_cond_jump(
            OpCode::Jz,
            Operand::Register(Register::CX),
            INVALID_LABEL,
            SourceSpan::point(3, 1),
        ));

        assert!(!table.is_empty());

        let exit = codegen.pc();

        codegen.flush_backpatch(&mut table, exit);

        assert!(table.is_empty());

        let stream = session.block(0).unwrap().instructions();

        for pc in [0, 2, 3] {
            assert_eq!(stream[pc].jump_target(), Some(&Operand::LabelIndex(exit)));
            assert_eq!(stream[pc].debug.as_ref().unwrap().next_steps, vec![exit]);
        }

        assert!(stream
            .iter()
            .flat_map(|instruction| instruction.operands())
            .all(|operand| !operand.is_unpatched_label()));
    }

    #[test]
    fn test_conditional_patch() {
        let mut session = session();
        let mut codegen = CodeGen::new(&mut session, 0, ScopeFrame::global());

        let cjmp = codegen.emit_cjmp(
            Operand::Register(Register::CX),
            1,
            INVALID_LABEL,
            SourceSpan::point(1, 1),
        );

        let _ = codegen.emit_push_null(SourceSpan::nil());

        codegen.backpatch(cjmp, 2);

        let stream = session.block(0).unwrap().instructions();

        assert_eq!(stream[cjmp].op2, Some(Operand::LabelIndex(1)));
        assert_eq!(stream[cjmp].op3, Some(Operand::LabelIndex(2)));
        assert_eq!(stream[cjmp].debug.as_ref().unwrap().next_steps, vec![1, 2]);
    }

    #[test]
    #[should_panic]
    fn test_double_patch() {
        let mut session = session();
        let mut codegen = CodeGen::new(&mut session, 0, ScopeFrame::global());

        let jump = codegen.emit_pending_jmp(SourceSpan::nil());

        codegen.backpatch(jump, 1);
        codegen.backpatch(jump, 2);
    }

    #[test]
    #[should_panic]
    fn test_non_jump_patch() {
        let mut session = session();
        let mut codegen = CodeGen::new(&mut session, 0, ScopeFrame::global());

        let push = codegen.emit_push_null(SourceSpan::nil());

        codegen.backpatch(push, 1);
    }
}
