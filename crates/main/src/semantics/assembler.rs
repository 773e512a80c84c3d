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

use ahash::AHashSet;
use compact_str::CompactString;
use log::debug;

use crate::{
    graph::{GraphNode, SsaPointerList},
    interpret::{
        BlockId,
        DebugInfo,
        Instruction,
        Language,
        OpCode,
        Operand,
        Pc,
        Register,
        INVALID_LABEL,
    },
    runtime::{ClassIndex, ProcRef, SymbolNode, Type},
    semantics::{scope::ScopeFrame, CompileSession, ExecMode, CODEGEN_LOG},
    syntax::{ReplicationGuide, SourceSpan},
};

/// The shared state of a dialect code generator.
///
/// The object emits instructions into one code block of the session (or
/// into the session's watch stream in the expression interpreter mode).
/// Nested language blocks and function bodies are emitted by separate
/// generators that reborrow the session.
pub(super) struct CodeGen<'s> {
    pub(super) session: &'s mut CompileSession,
    pub(super) block: BlockId,
    pub(super) scope: ScopeFrame,

    /// Identifier reads push their replication guides.
    pub(super) emit_replication_guide: bool,

    /// Literal subscripts are recorded as dimensions of the dependency
    /// chains.
    pub(super) associative_array_indexing: bool,

    /// The class that anchors the chain being lowered by the SSA pass.
    pub(super) resolve_static: Option<ClassIndex>,

    /// The graph nodes of the temporaries of the statement being split.
    /// The nodes are sealed together when the source statement ends.
    pub(super) ssa_graph_nodes: Vec<GraphNode>,

    pub(super) ssa_pointers: SsaPointerList,

    /// Procedures resolved by the calls of the current statement, innermost
    /// last.
    pub(super) function_call_stack: Vec<ProcRef>,

    /// Names assigned somewhere in the current associative block.
    pub(super) forward_names: AHashSet<CompactString>,
}

impl<'s> CodeGen<'s> {
    pub(super) fn new(session: &'s mut CompileSession, block: BlockId, scope: ScopeFrame) -> Self {
        Self {
            session,
            block,
            scope,
            emit_replication_guide: false,
            associative_array_indexing: false,
            resolve_static: None,
            ssa_graph_nodes: Vec::new(),
            ssa_pointers: SsaPointerList::new(),
            function_call_stack: Vec::new(),
            forward_names: AHashSet::new(),
        }
    }

    #[inline(always)]
    pub(super) fn language(&self) -> Language {
        self.session.code_block(self.block).language
    }

    /// Returns the program counter of the next emitted instruction.
    #[inline(always)]
    pub(super) fn pc(&self) -> Pc {
        match self.session.exec_mode {
            ExecMode::Normal => self.session.code_block(self.block).stream.len(),
            ExecMode::ExpressionInterpreter => self.session.watch_stream.len(),
        }
    }

    /// Returns the address of a symbol.
    pub(super) fn build_operand(symbol: &SymbolNode) -> Operand {
        match symbol.is_member_variable() {
            true if symbol.is_static => Operand::StaticMemVarIndex(symbol.symbol_table_index),
            true => Operand::MemVarIndex(symbol.symbol_table_index),
            false => Operand::VarIndex(symbol.symbol_table_index),
        }
    }

    #[inline(always)]
    fn set_entry(&mut self) {
        if self.session.exec_mode == ExecMode::ExpressionInterpreter {
            return;
        }

        let pc = self.pc();
        let block = self.session.code_block_mut(self.block);

        if block.entry.is_none() {
            block.entry = Some(pc);
        }
    }

    #[inline(always)]
    pub(super) fn append(&mut self, instruction: Instruction, span: SourceSpan) -> Pc {
        self.append_stepping(instruction, span, &[])
    }

    /// Appends an instruction without a debug record.
    #[inline(always)]
    pub(super) fn append_silent(&mut self, instruction: Instruction, span: SourceSpan) -> Pc {
        self.append_with(instruction, span, None)
    }

    /// Appends an instruction whose debug record lists the `steps` as the
    /// stepper's continuations.
    ///
    /// An empty `steps` slice denotes the next instruction.
    pub(super) fn append_stepping(
        &mut self,
        instruction: Instruction,
        span: SourceSpan,
        steps: &[Pc],
    ) -> Pc {
        let pc = self.pc();

        let debug = match self.session.options.debug_records() && span.is_valid() {
            true => Some(DebugInfo {
                span,
                next_steps: match steps.is_empty() {
                    true => vec![pc + 1],
                    false => steps.to_vec(),
                },
            }),
            false => None,
        };

        self.append_with(instruction, span, debug)
    }

    fn append_with(
        &mut self,
        mut instruction: Instruction,
        span: SourceSpan,
        debug: Option<DebugInfo>,
    ) -> Pc {
        self.set_entry();

        instruction.debug = debug;

        let pc = self.pc();

        if self.session.options.dump_byte_code {
            match self.session.exec_mode {
                ExecMode::Normal => debug!(
                    target: CODEGEN_LOG,
                    "[{}.{}.{pc}] {instruction}",
                    self.language().prefix(),
                    self.block,
                ),

                ExecMode::ExpressionInterpreter => {
                    debug!(target: CODEGEN_LOG, "[w.{pc}] {instruction}")
                }
            }
        }

        match self.session.exec_mode {
            ExecMode::Normal => {
                self.session
                    .code_block_mut(self.block)
                    .stream
                    .push(instruction);

                self.session.debug_map.record(self.block, pc, span);
            }

            ExecMode::ExpressionInterpreter => self.session.watch_stream.push(instruction),
        }

        pc
    }

    #[inline(always)]
    fn class_operand(&self) -> Operand {
        Operand::ClassIndex(self.scope.class_scope)
    }

    pub(super) fn emit_push(&mut self, operand: Operand, dims: usize, span: SourceSpan) -> Pc {
        let class = self.class_operand();

        self.append(
            Instruction::ternary(OpCode::Push, operand, class, Operand::ArrayDim(dims)),
            span,
        )
    }

    /// Pushes a chain segment.
    pub(super) fn emit_pushm(
        &mut self,
        operand: Operand,
        class_scope: Option<ClassIndex>,
        span: SourceSpan,
    ) -> Pc {
        let block = Operand::BlockIndex(self.block);

        self.append(
            Instruction::ternary(OpCode::PushM, operand, Operand::ClassIndex(class_scope), block),
            span,
        )
    }

    /// Combines the segments of a chain of `depth` segments.
    ///
    /// A chain ending with a call combines a dynamic depth.
    pub(super) fn emit_pushlist(&mut self, depth: usize, from_dot_call: bool, span: SourceSpan) -> Pc {
        let depth = match from_dot_call {
            true => Operand::Dynamic(depth),
            false => Operand::Int(i64::try_from(depth).unwrap_or(i64::MAX)),
        };

        let class = self.class_operand();
        let block = Operand::BlockIndex(self.block);

        self.append_silent(Instruction::ternary(OpCode::PushList, depth, class, block), span)
    }

    /// Pushes an array dimension count, or a replication guide count.
    #[inline(always)]
    pub(super) fn emit_push_index(&mut self, operand: Operand) -> Pc {
        self.append_silent(Instruction::unary(OpCode::PushIndex, operand), SourceSpan::nil())
    }

    /// Pushes the number of subscripts applied to the next pushed chain
    /// segment.
    pub(super) fn emit_push_dims(&mut self, dims: usize) -> Pc {
        let class = self.class_operand();

        self.append_silent(
            Instruction::binary(OpCode::Push, Operand::ArrayDim(dims), class),
            SourceSpan::nil(),
        )
    }

    pub(super) fn emit_pop(&mut self, operand: Operand, class_scope: Option<ClassIndex>, span: SourceSpan) -> Pc {
        self.append(
            Instruction::binary(OpCode::Pop, operand, Operand::ClassIndex(class_scope)),
            span,
        )
    }

    /// Stores the top of the stack into the symbol through `dims`
    /// subscripts.
    ///
    /// Stores into compiler temporaries carry no debug record unless the
    /// configuration asks for them.
    pub(super) fn emit_pop_for_symbol(&mut self, symbol: &SymbolNode, dims: usize, span: SourceSpan) -> Pc {
        let instruction = Instruction::ternary(
            OpCode::Pop,
            Self::build_operand(symbol),
            Operand::ClassIndex(symbol.class_scope),
            Operand::ArrayDim(dims),
        );

        match symbol.is_temporary() && !self.session.options.emit_pop_for_temp_breakpoint {
            true => self.append_silent(instruction, span),
            false => self.append(instruction, span),
        }
    }

    /// Stores the top of the stack into the symbol preceded by the symbol's
    /// declaration data.
    pub(super) fn emit_store(&mut self, symbol: &SymbolNode, dims: usize, span: SourceSpan) -> Pc {
        let _ = self.emit_push_var_data(symbol.runtime_table_index, dims, symbol.ty);

        self.emit_pop_for_symbol(symbol, dims, span)
    }

    /// Boxes a heap symbol.
    pub(super) fn emit_heap_allocation(&mut self, symbol: &SymbolNode) {
        let Some(heap_index) = symbol.heap_index else {
            return;
        };

        let size = i64::try_from(symbol.size).unwrap_or(i64::MAX);

        let _ = self.emit_mov(Operand::Register(Register::DX), Operand::Int(size));
        let _ = self.emit_alloc(heap_index);
    }

    /// Stores the top of the stack into a symbol of the watch context.
    pub(super) fn emit_popw(&mut self, symbol: &SymbolNode) -> Pc {
        self.append_silent(
            Instruction::binary(
                OpCode::PopW,
                Self::build_operand(symbol),
                Operand::ClassIndex(symbol.class_scope),
            ),
            SourceSpan::nil(),
        )
    }

    /// Stores the top of the stack through a chain of `depth` segments.
    pub(super) fn emit_poplist(&mut self, depth: usize, start_scope: Option<ClassIndex>, span: SourceSpan) -> Pc {
        let depth = i64::try_from(depth).unwrap_or(i64::MAX);
        let start_scope = start_scope
            .and_then(|class| i64::try_from(class).ok())
            .unwrap_or(-1);

        let block = Operand::BlockIndex(self.block);

        self.append(
            Instruction::ternary(OpCode::PopList, Operand::Int(depth), Operand::Int(start_scope), block),
            span,
        )
    }

    /// Allocates the heap box of a symbol. The box size is taken from the DX
    /// register.
    pub(super) fn emit_alloc(&mut self, heap_index: usize) -> Pc {
        self.append_silent(
            Instruction::unary(OpCode::Alloc, Operand::Pointer(heap_index)),
            SourceSpan::nil(),
        )
    }

    /// Collects the top `len` stack values into an array, or into a string
    /// if `is_string` is set.
    pub(super) fn emit_alloca(&mut self, len: usize, is_string: bool) -> Pc {
        let pointer = match is_string {
            true => Operand::StringPointer(0),
            false => Operand::ArrayPointer(0),
        };

        let len = i64::try_from(len).unwrap_or(i64::MAX);

        self.append_silent(
            Instruction::binary(OpCode::Alloca, Operand::Int(len), pointer),
            SourceSpan::nil(),
        )
    }

    pub(super) fn emit_mov(&mut self, destination: Operand, source: Operand) -> Pc {
        self.append_silent(
            Instruction::binary(OpCode::Mov, destination, source),
            SourceSpan::nil(),
        )
    }

    /// Enters the nested language `block` at its `entry` instruction.
    pub(super) fn emit_bounce(&mut self, block: BlockId, entry: Pc, span: SourceSpan) -> Pc {
        let entry = i64::try_from(entry).unwrap_or(i64::MAX);

        self.append(
            Instruction::binary(OpCode::Bounce, Operand::BlockIndex(block), Operand::Int(entry)),
            span,
        )
    }

    /// Executes the dependents of the last updated symbol.
    pub(super) fn emit_depx(&mut self) -> Pc {
        self.append_silent(Instruction::new(OpCode::DepX), SourceSpan::nil())
    }

    /// Calls a procedure directly: setters and base constructors.
    pub(super) fn emit_call(&mut self, procedure: ProcRef, depth: usize, span: SourceSpan) -> Pc {
        let depth = i64::try_from(depth).unwrap_or(i64::MAX);

        self.append(
            Instruction::ternary(
                OpCode::Call,
                Operand::FunctionIndex(Some(procedure.index)),
                Operand::ClassIndex(procedure.class_scope),
                Operand::Int(depth),
            ),
            span,
        )
    }

    /// Calls a procedure resolved at compile time through the runtime
    /// dispatcher.
    pub(super) fn emit_callr(&mut self, procedure: ProcRef, depth: usize, span: SourceSpan) -> Pc {
        let depth = i64::try_from(depth).unwrap_or(i64::MAX);

        self.append(
            Instruction::ternary(
                OpCode::CallR,
                Operand::FunctionIndex(Some(procedure.index)),
                Operand::ClassIndex(procedure.class_scope),
                Operand::Int(depth),
            ),
            span,
        )
    }

    /// Calls the procedure registered in the dynamic function table at
    /// `index`.
    pub(super) fn emit_dynamic_call(&mut self, index: usize, depth: usize, span: SourceSpan) -> Pc {
        let depth = i64::try_from(depth).unwrap_or(i64::MAX);
        let class = self.class_operand();

        self.append(
            Instruction::ternary(OpCode::CallR, Operand::Dynamic(index), class, Operand::Int(depth)),
            span,
        )
    }

    pub(super) fn emit_jmp(&mut self, target: Pc, span: SourceSpan) -> Pc {
        self.append_stepping(
            Instruction::unary(OpCode::Jmp, Operand::LabelIndex(target)),
            span,
            &[target],
        )
    }

    /// Jumps to `then` if the condition holds, or to `otherwise`.
    pub(super) fn emit_cjmp(&mut self, condition: Operand, then: Pc, otherwise: Pc, span: SourceSpan) -> Pc {
        let instruction = Instruction::ternary(
            OpCode::CJmp,
            condition,
            Operand::LabelIndex(then),
            Operand::LabelIndex(otherwise),
        );

        match self.session.options.emit_inline_conditional_breakpoint {
            true => self.append_silent(instruction, span),
            false => self.append_stepping(instruction, span, &[then, otherwise]),
        }
    }

    /// Emits one of the single-comparand conditional jumps: `jz`, `jgz`,
    /// `jlz`.
    pub(super) fn emit_cond_jump(&mut self, opcode: OpCode, operand: Operand, target: Pc, span: SourceSpan) -> Pc {
        self.append_stepping(
            Instruction::binary(opcode, operand, Operand::LabelIndex(target)),
            span,
            &[target],
        )
    }

    /// Emits a jump whose target is backpatched later.
    #[inline(always)]
    pub(super) fn emit_pending_jmp(&mut self, span: SourceSpan) -> Pc {
        self.emit_jmp(INVALID_LABEL, span)
    }

    pub(super) fn emit_ret(&mut self, span: SourceSpan) -> Pc {
        self.append(Instruction::new(OpCode::Ret), span)
    }

    pub(super) fn emit_retb_instruction(&mut self, span: SourceSpan) -> Pc {
        self.append(Instruction::new(OpCode::RetB), span)
    }

    pub(super) fn emit_retcn_instruction(&mut self, span: SourceSpan) -> Pc {
        self.append(Instruction::new(OpCode::RetCn), span)
    }

    pub(super) fn emit_unary(&mut self, opcode: OpCode, operand: Operand, span: SourceSpan) -> Pc {
        self.append(Instruction::unary(opcode, operand), span)
    }

    pub(super) fn emit_binary(&mut self, opcode: OpCode, left: Operand, right: Operand, span: SourceSpan) -> Pc {
        self.append(Instruction::binary(opcode, left, right), span)
    }

    /// Pushes a type descriptor.
    pub(super) fn emit_push_type(&mut self, ty: Type) -> Pc {
        let class = self.class_operand();

        self.append_silent(
            Instruction::binary(
                OpCode::Push,
                Operand::StaticType {
                    uid: ty.uid,
                    rank: ty.rank,
                },
                class,
            ),
            SourceSpan::nil(),
        )
    }

    /// Pushes the current class instance.
    pub(super) fn emit_push_this(&mut self, span: SourceSpan) -> Pc {
        self.emit_push(Operand::ThisPtr, 0, span)
    }

    #[inline(always)]
    pub(super) fn emit_push_null(&mut self, span: SourceSpan) -> Pc {
        self.emit_push(Operand::Null, 0, span)
    }

    /// Pushes the placeholder of an omitted argument.
    #[inline(always)]
    pub(super) fn emit_push_default_arg(&mut self, span: SourceSpan) -> Pc {
        self.emit_push(Operand::DefaultArg, 0, span)
    }

    /// Pushes a value of unknown type.
    #[inline(always)]
    pub(super) fn emit_push_dynamic(&mut self, span: SourceSpan) -> Pc {
        self.emit_push(Operand::Dynamic(0), 0, span)
    }

    /// Pushes the declaration data of a variable: the owner block, the
    /// number of dimensions, and the declared type.
    pub(super) fn emit_push_var_data(&mut self, block: BlockId, dims: usize, ty: Type) -> Pc {
        let class = self.class_operand();

        let _ = self.append_silent(
            Instruction::binary(OpCode::Push, Operand::BlockIndex(block), class),
            SourceSpan::nil(),
        );
        let _ = self.append_silent(
            Instruction::binary(OpCode::Push, Operand::ArrayDim(dims), class),
            SourceSpan::nil(),
        );

        self.emit_push_type(ty)
    }

    /// Pushes the replication guides of a value, optionally followed by
    /// their count.
    pub(super) fn emit_replication_guides(&mut self, guides: &[ReplicationGuide], emit_count: bool) {
        for guide in guides {
            let _ = self.emit_push(Operand::Int(guide.value), 0, SourceSpan::nil());
        }

        if emit_count {
            let _ = self.emit_push_index(Operand::ReplicationGuide(guides.len()));
        }
    }

    /// Stores the top of the stack into the RX register and leaves the
    /// current procedure or block.
    pub(super) fn emit_return_to_register(&mut self, span: SourceSpan) -> Pc {
        let _ = self.emit_pop(Operand::Register(Register::RX), self.scope.class_scope, span);

        match self.scope.is_function_body(self.block) {
            true => self.emit_ret(SourceSpan::nil()),
            false => self.emit_retb_instruction(SourceSpan::nil()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        interpret::{BlockKind, Language, OpCode, Operand, INVALID_LABEL},
        runtime::{PrimitiveType, SymbolNode, Type},
        semantics::{assembler::CodeGen, scope::ScopeFrame, CompileOptions, CompileSession},
        syntax::SourceSpan,
    };

    fn session(options: CompileOptions) -> CompileSession {
        let mut session = CompileSession::new(options);

        let _ = session.new_block(BlockKind::Global, Language::Associative, None);

        session
    }

    #[test]
    fn test_program_counter() {
        let mut session = session(CompileOptions::new());
        let mut codegen = CodeGen::new(&mut session, 0, ScopeFrame::global());

        assert_eq!(codegen.emit_push(Operand::Int(1), 0, SourceSpan::point(1, 1)), 0);
        assert_eq!(codegen.emit_push_null(SourceSpan::nil()), 1);
        assert_eq!(codegen.emit_pending_jmp(SourceSpan::nil()), 2);
        assert_eq!(codegen.pc(), 3);

        let block = session.block(0).unwrap();

        assert_eq!(block.entry(), Some(0));
        assert_eq!(block.instructions()[2].jump_target(), Some(&Operand::LabelIndex(INVALID_LABEL)));
        assert!(block.instructions()[0].debug.is_none());
        assert_eq!(session.debug_map.get(0, 0), Some(SourceSpan::point(1, 1)));
        assert_eq!(session.debug_map.get(0, 1), None);
    }

    #[test]
    fn test_debug_records() {
        let mut options = CompileOptions::new();

        options.emit_breakpoints = true;
        options.ide_debug_mode = true;
        options.emit_inline_conditional_breakpoint = true;

        let mut session = session(options);
        let mut codegen = CodeGen::new(&mut session, 0, ScopeFrame::global());

        let _ = codegen.emit_push(Operand::Int(1), 0, SourceSpan::point(1, 1));
        let _ = codegen.emit_jmp(7, SourceSpan::point(1, 3));
        let _ = codegen.emit_cjmp(Operand::Register(crate::interpret::Register::CX), 4, 9, SourceSpan::point(2, 1));
        let _ = codegen.emit_push(Operand::Int(2), 0, SourceSpan::nil());

        let temp = SymbolNode::new("%t0", Type::primitive(PrimitiveType::Int));

        let _ = codegen.emit_pop_for_symbol(&temp, 0, SourceSpan::point(3, 1));

        let stream = session.block(0).unwrap().instructions();

        assert_eq!(stream[0].debug.as_ref().unwrap().next_steps, vec![1]);
        assert_eq!(stream[1].debug.as_ref().unwrap().next_steps, vec![7]);
        assert!(stream[2].debug.is_none());
        assert!(stream[3].debug.is_none());
        assert_eq!(stream[4].opcode, OpCode::Pop);
        assert!(stream[4].debug.is_none());
        assert_eq!(session.debug_map.get(0, 4), Some(SourceSpan::point(3, 1)));
    }

    #[test]
    fn test_operand_addressing() {
        let local = SymbolNode::new("a", Type::default()).in_function(Some(0));
        let member = SymbolNode::new("x", Type::default()).in_class(Some(20));
        let shared = SymbolNode::new("n", Type::default())
            .in_class(Some(20))
            .with_static(true);

        assert_eq!(CodeGen::build_operand(&local), Operand::VarIndex(0));
        assert_eq!(CodeGen::build_operand(&member), Operand::MemVarIndex(0));
        assert_eq!(CodeGen::build_operand(&shared), Operand::StaticMemVarIndex(0));
    }
}
