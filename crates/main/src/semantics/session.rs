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

use ahash::AHashMap;
use compact_str::CompactString;
use log::{error, warn};

use crate::{
    analysis::{CompileError, Diagnostic, Diagnostics, IssueCode, IssueKind},
    interpret::{
        BlockId,
        BlockKind,
        CodeBlock,
        DebugMap,
        DynamicFunctionTable,
        DynamicVariableTable,
        Executable,
        Instruction,
        Language,
    },
    report::system_panic,
    runtime::{
        ClassIndex,
        ClassTable,
        ProcRef,
        ProcedureNode,
        ProcedureTable,
        SymbolNode,
        Type,
    },
    semantics::{CompileOptions, ExecMode, CODEGEN_LOG},
    syntax::SourceSpan,
};

/// A compilation session: the owner of all tables produced and consulted
/// while lowering one program.
///
/// A session may compile several units in turn (see
/// [compile](CompileSession::compile)). The first unit becomes the global
/// block zero; subsequent units become top-level language blocks nested in
/// it, so they see the globals of the previous units.
///
/// The session is consumed by [finish](CompileSession::finish), which
/// returns the read-only [Executable].
pub struct CompileSession {
    pub(super) options: CompileOptions,
    pub(super) file: Option<CompactString>,
    pub(super) classes: ClassTable,
    pub(super) procedures: ProcedureTable,
    pub(super) blocks: Vec<CodeBlock>,
    pub(super) dynamic_variables: DynamicVariableTable,
    pub(super) dynamic_functions: DynamicFunctionTable,
    pub(super) debug_map: DebugMap,
    pub(super) diagnostics: Diagnostics,
    pub(super) counters: Counters,
    pub(super) watch_stream: Vec<Instruction>,
    pub(super) graph_uid: usize,
    pub(super) exec_mode: ExecMode,
    pub(super) parsing_module: bool,
}

/// Running offsets of the allocator.
#[derive(Default)]
pub(super) struct Counters {
    pub(super) global: usize,
    pub(super) heap: usize,
    pub(super) local_base: usize,
    pub(super) watch_base: usize,
    pub(super) class_static: AHashMap<ClassIndex, usize>,
    pub(super) class_instance: AHashMap<ClassIndex, usize>,

    /// The number of compiler temporaries named so far.
    pub(super) temporaries: usize,

    /// The number of compiled units.
    pub(super) units: usize,
}

impl CompileSession {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            file: None,
            classes: ClassTable::new(),
            procedures: ProcedureTable::new(),
            blocks: Vec::new(),
            dynamic_variables: DynamicVariableTable::default(),
            dynamic_functions: DynamicFunctionTable::default(),
            debug_map: DebugMap::new(),
            diagnostics: Diagnostics::new(),
            counters: Counters::default(),
            watch_stream: Vec::new(),
            graph_uid: 0,
            exec_mode: ExecMode::Normal,
            parsing_module: false,
        }
    }

    /// Sets the source file name reported in the diagnostics.
    #[inline(always)]
    pub fn set_file(&mut self, file: impl Into<CompactString>) {
        self.file = Some(file.into());
    }

    /// Marks the following units as a standalone module being parsed.
    ///
    /// While the flag is set, identifier resolution skips the
    /// [imported](Self::import_symbol) symbols.
    #[inline(always)]
    pub fn set_parsing_module(&mut self, parsing_module: bool) {
        self.parsing_module = parsing_module;
    }

    #[inline(always)]
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Gives access to the class table for registering the classes declared
    /// outside of the compiled units.
    #[inline(always)]
    pub fn classes_mut(&mut self) -> &mut ClassTable {
        &mut self.classes
    }

    /// Gives access to the table of global procedures for registering the
    /// functions declared outside of the compiled units.
    #[inline(always)]
    pub fn procedures_mut(&mut self) -> &mut ProcedureTable {
        &mut self.procedures
    }

    #[inline(always)]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    #[inline(always)]
    pub fn block(&self, id: BlockId) -> Option<&CodeBlock> {
        self.blocks.get(id)
    }

    /// Declares a global symbol imported from the external module `lib`.
    ///
    /// Creates the global block if no unit has been compiled yet.
    pub fn import_symbol(
        &mut self,
        name: impl Into<CompactString>,
        ty: Type,
        lib: impl Into<CompactString>,
    ) -> usize {
        if self.blocks.is_empty() {
            let _ = self.new_block(BlockKind::Global, Language::Associative, None);
        }

        let mut symbol = SymbolNode::new(name, ty);

        symbol.extern_lib = Some(lib.into());
        symbol.index = self.counters.global as isize;
        symbol.runtime_table_index = 0;

        self.counters.global += symbol.size;

        self.code_block_mut(0).symbols.append(symbol)
    }

    /// Consumes the session and returns the compiled artifacts.
    pub fn finish(self) -> Executable {
        Executable {
            file: self.file,
            blocks: self.blocks,
            classes: self.classes,
            procedures: self.procedures,
            dynamic_variables: self.dynamic_variables,
            dynamic_functions: self.dynamic_functions,
            debug_map: self.debug_map,
            diagnostics: self.diagnostics,
            watch_stream: self.watch_stream,
        }
    }

    pub(super) fn new_block(
        &mut self,
        kind: BlockKind,
        language: Language,
        parent: Option<BlockId>,
    ) -> BlockId {
        let id = self.blocks.len();

        self.blocks.push(CodeBlock::new(id, kind, language, parent));

        if let Some(parent) = parent {
            self.code_block_mut(parent).children.push(id);
        }

        id
    }

    #[inline(always)]
    pub(super) fn code_block(&self, id: BlockId) -> &CodeBlock {
        let Some(block) = self.blocks.get(id) else {
            system_panic!("Code block {id} does not exist.");
        };

        block
    }

    #[inline(always)]
    pub(super) fn code_block_mut(&mut self, id: BlockId) -> &mut CodeBlock {
        let Some(block) = self.blocks.get_mut(id) else {
            system_panic!("Code block {id} does not exist.");
        };

        block
    }

    /// Returns a global procedure or a class method.
    pub(super) fn procedure(&self, proc_ref: ProcRef) -> Option<&ProcedureNode> {
        match proc_ref.class_scope {
            None => self.procedures.get(proc_ref.index),
            Some(_) => self.classes.procedure(proc_ref),
        }
    }

    pub(super) fn procedure_mut(&mut self, proc_ref: ProcRef) -> Option<&mut ProcedureNode> {
        match proc_ref.class_scope {
            None => self.procedures.get_mut(proc_ref.index),
            Some(class) => self
                .classes
                .get_mut(class)?
                .procedures
                .get_mut(proc_ref.index),
        }
    }

    #[inline(always)]
    pub(super) fn next_graph_uid(&mut self) -> usize {
        let uid = self.graph_uid;

        self.graph_uid += 1;

        uid
    }

    /// Records a semantic error and returns the halt to propagate.
    pub(super) fn log_semantic_error(
        &mut self,
        code: IssueCode,
        message: impl Into<CompactString>,
        span: SourceSpan,
    ) -> CompileError {
        let diagnostic = self.record(code, message, span);

        CompileError::Halt(diagnostic)
    }

    /// Records a semantic error that does not halt the compilation.
    #[inline(always)]
    pub(super) fn log_recoverable_error(
        &mut self,
        code: IssueCode,
        message: impl Into<CompactString>,
        span: SourceSpan,
    ) {
        let _ = self.record(code, message, span);
    }

    #[inline(always)]
    pub(super) fn log_syntax_error(
        &mut self,
        code: IssueCode,
        message: impl Into<CompactString>,
        span: SourceSpan,
    ) {
        let _ = self.record(code, message, span);
    }

    #[inline(always)]
    pub(super) fn log_warning(
        &mut self,
        code: IssueCode,
        message: impl Into<CompactString>,
        span: SourceSpan,
    ) {
        let _ = self.record(code, message, span);
    }

    fn record(
        &mut self,
        code: IssueCode,
        message: impl Into<CompactString>,
        span: SourceSpan,
    ) -> Diagnostic {
        let diagnostic = Diagnostic::new(code, message, self.file.clone(), span);

        match diagnostic.kind {
            IssueKind::Warning => warn!(target: CODEGEN_LOG, "{diagnostic}"),
            _ => error!(target: CODEGEN_LOG, "{diagnostic}"),
        }

        self.diagnostics.push(diagnostic.clone());

        diagnostic
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        analysis::{CompileError, IssueCode},
        interpret::{BlockKind, Language},
        runtime::{PrimitiveType, Type},
        semantics::{CompileOptions, CompileSession},
        syntax::SourceSpan,
    };

    #[test]
    fn test_diagnostics_recording() {
        let mut session = CompileSession::new(CompileOptions::new());

        session.set_file("main.ds");

        session.log_warning(IssueCode::UnboundIdentifier, "'x' is not defined", SourceSpan::point(1, 1));

        let halt = session.log_semantic_error(
            IssueCode::InvalidIndirection,
            "bad chain",
            SourceSpan::point(2, 4),
        );

        let CompileError::Halt(diagnostic) = halt else {
            panic!("Halt expected.");
        };

        assert_eq!(diagnostic.file.as_deref(), Some("main.ds"));
        assert_eq!(diagnostic.line, 2);
        assert_eq!(session.diagnostics().len(!0), 2);
        assert!(session.diagnostics().contains(IssueCode::UnboundIdentifier));
    }

    #[test]
    fn test_block_tree() {
        let mut session = CompileSession::new(CompileOptions::new());

        let global = session.new_block(BlockKind::Global, Language::Associative, None);
        let nested = session.new_block(BlockKind::Language, Language::Imperative, Some(global));

        assert_eq!(global, 0);
        assert_eq!(session.block(global).unwrap().children(), &[nested]);
        assert_eq!(session.block(nested).unwrap().parent(), Some(global));

        let imported = session.import_symbol("PI", Type::primitive(PrimitiveType::Double), "math");
        let imported_again =
            session.import_symbol("E", Type::primitive(PrimitiveType::Double), "math");

        let symbols = session.block(0).unwrap().symbols();

        assert_eq!(symbols.get(imported).unwrap().index, 0);
        assert_eq!(symbols.get(imported_again).unwrap().index, 1);
        assert_eq!(symbols.get(imported).unwrap().extern_lib.as_deref(), Some("math"));
    }
}
