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
use log::debug;

use crate::{
    analysis::{CompileError, CompileResult},
    interpret::{BlockId, BlockKind, Language, Pc},
    report::system_panic,
    runtime::Type,
    semantics::{
        allocator::Declaration,
        associative::AssociativeCodeGen,
        generator::{CodeGenerator, SubCompilePass},
        imperative::ImperativeCodeGen,
        resolver::Resolver,
        scope::ScopeFrame,
        CompileSession,
        ExecMode,
        CODEGEN_LOG,
    },
    syntax::{AstNode, SourceSpan},
};

impl CompileSession {
    /// Compiles a unit of top-level statements written in the `language`
    /// dialect.
    ///
    /// The first unit of the session is lowered into the global block zero.
    /// Every subsequent unit gets its own top-level block nested in the
    /// global one. Returns the block of the unit.
    ///
    /// On a semantic halt the partially emitted code stays in the session,
    /// and the halting diagnostic is recorded in
    /// [diagnostics](Self::diagnostics).
    pub fn compile(&mut self, unit: &[AstNode], language: Language) -> CompileResult<BlockId> {
        self.exec_mode = ExecMode::Normal;

        let block = match (self.counters.units, self.blocks.is_empty()) {
            (0, true) => self.new_block(BlockKind::Global, language, None),

            (0, false) => {
                self.code_block_mut(0).language = language;
                0
            }

            _ => self.new_block(BlockKind::Global, language, Some(0)),
        };

        self.counters.units += 1;

        debug!(target: CODEGEN_LOG, "unit #{} in {language} block {block}", self.counters.units);

        emit_unit(self, block, ScopeFrame::global(), language, unit, &[])?;

        Ok(block)
    }

    /// Compiles a watch expression against the scope of a compiled block.
    ///
    /// The code is appended to the watch stream: the expression value is
    /// stored into a fresh watch temporary, followed by a `retcn`
    /// instruction. Returns the watch stream position of the first emitted
    /// instruction.
    pub fn compile_watch_expression(&mut self, block: BlockId, expression: &AstNode) -> CompileResult<Pc> {
        let Some(code_block) = self.blocks.get(block) else {
            return Err(CompileError::UnknownBlock(block));
        };

        let language = code_block.language;

        let scope = match code_block.procedure {
            None => ScopeFrame::global(),

            Some(proc_ref) => {
                let function_block = self
                    .procedure(proc_ref)
                    .and_then(|procedure| procedure.block)
                    .unwrap_or(block);

                ScopeFrame {
                    class_scope: proc_ref.class_scope,
                    procedure: None,
                    function_block: None,
                }
                .in_procedure(proc_ref, function_block)
            }
        };

        self.exec_mode = ExecMode::ExpressionInterpreter;

        let result = match language {
            Language::Associative => emit_watch(&mut AssociativeCodeGen::new(self, block, scope), expression),
            Language::Imperative => emit_watch(&mut ImperativeCodeGen::new(self, block, scope), expression),
        };

        self.exec_mode = ExecMode::Normal;

        result
    }
}

/// Lowers a statement list into the `block` with the generator of the
/// `language` dialect.
///
/// The `arguments` are declared in the block before the statements.
pub(super) fn emit_unit(
    session: &mut CompileSession,
    block: BlockId,
    scope: ScopeFrame,
    language: Language,
    unit: &[AstNode],
    arguments: &[(CompactString, Type)],
) -> CompileResult<()> {
    match language {
        Language::Associative => {
            let mut generator = AssociativeCodeGen::new(session, block, scope);

            declare_arguments(&mut generator, arguments);

            generator.emit(unit)
        }

        Language::Imperative => {
            let mut generator = ImperativeCodeGen::new(session, block, scope);

            declare_arguments(&mut generator, arguments);

            generator.emit(unit)
        }
    }
}

#[inline(always)]
fn declare_arguments<'s>(generator: &mut impl CodeGenerator<'s>, arguments: &[(CompactString, Type)]) {
    for (name, ty) in arguments {
        let _ = generator
            .base_mut()
            .allocate_variable(Declaration::new(name.clone(), *ty).argument());
    }
}

fn emit_watch<'s, G: CodeGenerator<'s>>(generator: &mut G, expression: &AstNode) -> CompileResult<Pc> {
    let entry = generator.base().pc();

    let _ = generator.emit_expression(expression, None, SubCompilePass::None)?;

    let base = generator.base_mut();
    let name = base.next_temporary("%watch_");
    let symbol_ref = base.allocate_variable(Declaration::new(name, Type::default()));

    let Some(symbol) = base.symbol(symbol_ref).cloned() else {
        system_panic!("Missing watch symbol {symbol_ref:?}.");
    };

    let _ = base.emit_popw(&symbol);

    generator.emit_retcn(SourceSpan::nil());

    Ok(entry)
}

#[cfg(test)]
mod tests {
    use crate::{
        analysis::{CompileError, IssueCode},
        interpret::{BlockKind, Language, OpCode},
        semantics::{CompileOptions, CompileSession},
        syntax::{
            ArgumentNode,
            AssignmentNode,
            AstNode,
            BinaryExpressionNode,
            FunctionDefinitionNode,
            IdentifierNode,
            LanguageBlockNode,
            LiteralNode,
            Operator,
            ReturnNode,
        },
    };

    fn assign(target: &str, value: impl Into<AstNode>) -> AstNode {
        AssignmentNode::new(IdentifierNode::new(target), value).into()
    }

    #[test]
    fn test_multiple_units() {
        let mut session = CompileSession::new(CompileOptions::new());

        let first = session
            .compile(&[assign("a", LiteralNode::int("1"))], Language::Associative)
            .unwrap();

        let second = session
            .compile(&[assign("b", IdentifierNode::new("a"))], Language::Imperative)
            .unwrap();

        assert_eq!(first, 0);
        assert_eq!(second, 1);
        assert!(!session.diagnostics().contains(IssueCode::UnboundIdentifier));

        let executable = session.finish();
        let nested = executable.block(second).unwrap();

        assert_eq!(nested.parent(), Some(first));
        assert_eq!(nested.kind(), BlockKind::Global);
        assert_eq!(nested.language(), Language::Imperative);
        assert_eq!(executable.block(first).unwrap().children(), &[second]);
    }

    #[test]
    fn test_watch_expression() {
        let mut session = CompileSession::new(CompileOptions::new());

        let block = session
            .compile(&[assign("a", LiteralNode::int("1"))], Language::Associative)
            .unwrap();

        let length = session.block(block).unwrap().instructions().len();

        let expression = AstNode::from(BinaryExpressionNode::new(
            IdentifierNode::new("a"),
            Operator::Add,
            LiteralNode::int("1"),
        ));

        let entry = session.compile_watch_expression(block, &expression).unwrap();

        assert_eq!(entry, 0);

        assert_eq!(
            session.compile_watch_expression(7, &expression).unwrap_err(),
            CompileError::UnknownBlock(7),
        );

        let executable = session.finish();
        let watch = executable.watch_stream();

        assert_eq!(executable.block(block).unwrap().instructions().len(), length);
        assert!(watch.iter().any(|instruction| instruction.opcode == OpCode::PopW));
        assert_eq!(watch.last().unwrap().opcode, OpCode::RetCn);
    }

    #[test]
    fn test_language_block() {
        let mut session = CompileSession::new(CompileOptions::new());

        let unit = [
            assign("a", LiteralNode::int("1")),
            AstNode::from(LanguageBlockNode::new(
                Language::Imperative,
                [assign("b", IdentifierNode::new("a"))],
            )),
        ];

        let block = session.compile(&unit, Language::Associative).unwrap();
        let executable = session.finish();

        let global = executable.block(block).unwrap();

        assert_eq!(global.children(), &[1]);
        assert!(global
            .instructions()
            .iter()
            .any(|instruction| instruction.opcode == OpCode::Bounce));

        let nested = executable.block(1).unwrap();

        assert_eq!(nested.kind(), BlockKind::Language);
        assert_eq!(nested.language(), Language::Imperative);
        assert_eq!(nested.instructions().last().unwrap().opcode, OpCode::RetB);
    }

    #[test]
    fn test_function_arguments() {
        let mut session = CompileSession::new(CompileOptions::new());

        let function = FunctionDefinitionNode::new(
            "identity",
            [ArgumentNode::new("x")],
            [ReturnNode::new(IdentifierNode::new("x"))],
        );

        let _ = session.compile(&[function.into()], Language::Associative).unwrap();

        let executable = session.finish();
        let index = executable.procedures().find("identity", 1).unwrap();
        let procedure = executable.procedures().get(index).unwrap();
        let body = executable.block(procedure.block.unwrap()).unwrap();

        assert_eq!(body.kind(), BlockKind::Function);

        let argument = body.symbols().iter().find(|symbol| symbol.name == "x").unwrap();

        assert!(argument.is_argument);
        assert_eq!(argument.index, -13);
        assert_eq!(procedure.locals, 1);
    }
}
