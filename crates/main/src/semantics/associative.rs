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

use std::mem::{replace, take};

use compact_str::{format_compact, CompactString};
use log::trace;

use crate::{
    analysis::{CompileResult, IssueCode},
    graph::{GraphNode, UpdateNode, UpdateNodeRef},
    interpret::{BlockId, BlockKind},
    runtime::{ClassIndex, PrimitiveType},
    semantics::{
        assembler::CodeGen,
        declarations::{forward_names, DeclarationEmitter},
        generator::{flatten_chain, CodeGenerator, ReturnEmitter, SubCompilePass},
        resolver::{ChainCursor, Resolver},
        scope::{Resolution, ScopeFrame},
        CompileSession,
        CODEGEN_LOG,
    },
    syntax::{
        AstNode,
        FunctionCallNode,
        IdentifierListNode,
        IdentifierNode,
        ReturnNode,
        SourceSpan,
    },
};

/// The updated symbol of the graph nodes of return statements.
const RETURN_SYMBOL: &str = "return";

/// The code generator of the associative dialect.
///
/// Every statement becomes a node of the dependency graph that records the
/// statement's instruction range, the chain it updates, and the chains it
/// reads.
pub(super) struct AssociativeCodeGen<'s> {
    pub(super) base: CodeGen<'s>,

    /// A chain assignment is being split into single-segment factors.
    splitting: bool,
}

impl<'s> AssociativeCodeGen<'s> {
    pub(super) fn new(session: &'s mut CompileSession, block: BlockId, scope: ScopeFrame) -> Self {
        let mut base = CodeGen::new(session, block, scope);

        base.associative_array_indexing = true;

        Self {
            base,
            splitting: false,
        }
    }

    fn emit_assignment(&mut self, target: &AstNode, value: &AstNode, span: SourceSpan) -> CompileResult<()> {
        self.base.function_call_stack.clear();

        if self.base.session.options.full_ssa && !self.splitting {
            if let AstNode::IdentifierList(chain) = value {
                if !chain.is_last_ssa_factor {
                    return self.emit_ssa_assignment(target, chain, span);
                }
            }
        }

        let node = self.emit_graph_statement(target, value, span, false, false)?;

        self.commit(node);

        Ok(())
    }

    /// Lowers one assignment into a graph node.
    ///
    /// If `flush` is set, the chain reassembled from the split factors is
    /// recorded as an additional dependency.
    fn emit_graph_statement(
        &mut self,
        target: &AstNode,
        value: &AstNode,
        span: SourceSpan,
        ssa_temp: bool,
        flush: bool,
    ) -> CompileResult<GraphNode> {
        let uid = self.base.session.next_graph_uid();

        let mut node = GraphNode::new(uid, self.base.block);

        node.set_scope(self.base.scope.procedure, self.base.scope.class_scope);
        node.set_ssa_temp(ssa_temp);

        let _ = self.emit_expression(value, None, SubCompilePass::UnboundIdentifier)?;

        let start = self.base.pc();

        let mut ty = self.emit_expression(value, Some(&mut node), SubCompilePass::None)?;

        let end = self.base.pc().saturating_sub(1);

        if flush {
            let _ = self.base.flush_ssa_pointers(&mut node);
        }

        if ty.is(PrimitiveType::Var) {
            let callee = self
                .base
                .function_call_stack
                .last()
                .and_then(|callee| self.base.session.procedure(*callee));

            if let Some(callee) = callee {
                ty = callee.return_type;
            }
        }

        let updated = self.emit_assignment_target(target, ty, Some(&mut node))?;

        node.set_update_range(start, end);
        node.set_updated(updated);

        let _ = self.base.emit_depx();

        trace!(target: CODEGEN_LOG, "statement at {:?} lowered into {start}..={end}", span);

        Ok(node)
    }

    /// Seals a graph node and appends it to the block's graph.
    ///
    /// Nodes of a chain being split are collected and sealed together.
    fn commit(&mut self, mut node: GraphNode) {
        if self.splitting {
            self.base.ssa_graph_nodes.push(node);
            return;
        }

        node.seal();

        let block = node.language_block();

        self.base.session.code_block_mut(block).graph.push(node);
    }

    /// Lowers `target = a.b.c` as a sequence of single-segment assignments
    /// through temporaries:
    ///
    /// ```text
    /// %ssa_0 = a;
    /// %ssa_1 = %ssa_0.b;
    /// %ssa_2 = %ssa_1.c;
    /// target = %ssa_2;
    /// ```
    ///
    /// A chain rooted at a class name keeps the class and the next segment
    /// in the first factor.
    fn emit_ssa_assignment(
        &mut self,
        target: &AstNode,
        chain: &IdentifierListNode,
        span: SourceSpan,
    ) -> CompileResult<()> {
        let segments = match flatten_chain(chain) {
            Ok(segments) => segments.into_iter().cloned().collect::<Vec<_>>(),

            Err(span) => {
                return Err(self.base.session.log_semantic_error(
                    IssueCode::InvalidIndirection,
                    "Only the '.' operator may join the segments of an identifier list.",
                    span,
                ))
            }
        };

        self.splitting = true;
        self.base.ssa_pointers.clear();
        self.base.ssa_graph_nodes.clear();

        let result = self.emit_ssa_factors(target, &segments, span);

        self.splitting = false;
        self.base.resolve_static = None;
        self.base.ssa_pointers.clear();

        let nodes = take(&mut self.base.ssa_graph_nodes);

        result?;

        for node in nodes {
            self.commit(node);
        }

        Ok(())
    }

    #[doc(hidden)]
    fn emit_ssa_factors(&mut self, target: &AstNode, segments: &[AstNode], span: SourceSpan) -> CompileResult<()> {
        let anchor = match segments.first() {
            Some(AstNode::Identifier(root)) if segments.len() > 1 => self.static_anchor(root),
            _ => None,
        };

        let (mut factor, mut next) = match anchor {
            Some(class) => {
                self.base.resolve_static = Some(class);

                let head = AstNode::from(IdentifierListNode::new(segments[0].clone(), segments[1].clone()).at(span));

                self.base.ssa_pointers.push(segments[0].clone());
                self.base.ssa_pointers.push(segments[1].clone());

                (head, 2)
            }

            None => {
                self.base.ssa_pointers.push(segments[0].clone());

                (segments[0].clone(), 1)
            }
        };

        loop {
            let last = next >= segments.len();
            let temporary = IdentifierNode::new(self.base.next_temporary("%ssa_")).at(span);

            let node = self.emit_graph_statement(&temporary.clone().into(), &factor, span, true, last)?;

            self.commit(node);
            self.base.resolve_static = None;

            if last {
                let node = self.emit_graph_statement(target, &temporary.into(), span, false, false)?;

                self.commit(node);

                return Ok(());
            }

            self.base.ssa_pointers.push(segments[next].clone());

            let mut chain = IdentifierListNode::new(temporary, segments[next].clone()).at(span);

            chain.is_last_ssa_factor = next + 1 == segments.len();

            factor = chain.into();
            next += 1;
        }
    }

    /// Returns the class named by the root of a chain, unless a variable
    /// with that name is visible.
    fn static_anchor(&self, root: &IdentifierNode) -> Option<ClassIndex> {
        let resolution = self.base.verify_allocation(
            &root.name,
            self.base.scope.class_scope,
            self.base.scope.function_index(),
        );

        match resolution {
            Resolution::Unbound => self.base.session.classes.index_of(&root.name),
            _ => None,
        }
    }

    fn emit_return_node(&mut self, node: &ReturnNode) -> CompileResult<()> {
        let uid = self.base.session.next_graph_uid();

        let mut graph = GraphNode::new(uid, self.base.block);

        graph.set_scope(self.base.scope.procedure, self.base.scope.class_scope);

        let _ = self.emit_return_statement(node, Some(&mut graph))?;

        let mut updated = UpdateNodeRef::new();

        updated.push(UpdateNode::symbol(RETURN_SYMBOL, None, self.base.scope.class_scope));

        graph.set_updated(updated);

        self.commit(graph);

        Ok(())
    }

    fn emit_expression_statement(&mut self, node: &AstNode) -> CompileResult<()> {
        let temporary = IdentifierNode::new(self.base.next_temporary("%t")).at(node.span());

        self.emit_assignment(&temporary.into(), node, node.span())
    }

    fn may_declare_class(&self) -> bool {
        self.base.session.code_block(self.base.block).kind == BlockKind::Global
            && self.base.scope.procedure.is_none()
            && self.base.scope.class_scope.is_none()
    }
}

impl<'s> CodeGenerator<'s> for AssociativeCodeGen<'s> {
    #[inline(always)]
    fn base(&self) -> &CodeGen<'s> {
        &self.base
    }

    #[inline(always)]
    fn base_mut(&mut self) -> &mut CodeGen<'s> {
        &mut self.base
    }

    fn emit(&mut self, unit: &[AstNode]) -> CompileResult<()> {
        let names = forward_names(unit).collect::<Vec<CompactString>>();

        self.base.forward_names.extend(names);

        for statement in unit {
            self.emit_statement(statement)?;
        }

        self.emit_block_end(unit);

        Ok(())
    }

    fn emit_statement(&mut self, node: &AstNode) -> CompileResult<()> {
        match node {
            AstNode::Assignment(assignment) => {
                self.emit_assignment(&assignment.target, &assignment.value, assignment.span)
            }

            AstNode::Return(node) => self.emit_return_node(node),
            AstNode::VarDeclaration(node) => self.emit_var_declaration(node),

            AstNode::FunctionDefinition(node) => {
                let _ = self.emit_function_definition(node, false)?;

                Ok(())
            }

            AstNode::ClassDeclaration(node) if self.may_declare_class() => {
                let _ = self.emit_class_declaration(node)?;

                Ok(())
            }

            AstNode::ClassDeclaration(node) => Err(self.base.session.log_semantic_error(
                IssueCode::ClassOutsideAssociative,
                format_compact!("Class '{}' must be declared in the global block.", node.name),
                node.span,
            )),

            AstNode::LanguageBlock(node) => self.emit_language_block(node),

            AstNode::If(..) | AstNode::While(..) | AstNode::Break(..) | AstNode::Continue(..) => {
                Err(self.base.session.log_semantic_error(
                    IssueCode::ImperativeConstructInAssociative,
                    "Control flow statements require an imperative block.",
                    node.span(),
                ))
            }

            expression => self.emit_expression_statement(expression),
        }
    }

    #[inline(always)]
    fn emit_getter_setter_for_ident_list(
        &mut self,
        target: &IdentifierListNode,
        graph: Option<&mut GraphNode>,
    ) -> CompileResult<UpdateNodeRef> {
        self.emit_member_store(target, graph, true)
    }

    fn traverse_function_call(
        &mut self,
        call: &FunctionCallNode,
        cursor: &mut ChainCursor,
        graph: Option<&mut GraphNode>,
        pass: SubCompilePass,
    ) -> CompileResult<()> {
        let guides = self.base.session.options.replication_guides;
        let outer = replace(&mut self.base.emit_replication_guide, guides);

        let result = self.emit_call_segment(call, cursor, graph, pass);

        self.base.emit_replication_guide = outer;

        result
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
        interpret::{Language, OpCode, Operand},
        runtime::PrimitiveType,
        semantics::{CompileOptions, CompileSession},
        syntax::{
            ArgumentNode,
            AssignmentNode,
            AstNode,
            ClassDeclarationNode,
            FunctionCallNode,
            FunctionDefinitionNode,
            IdentifierNode,
            IfNode,
            LiteralNode,
            ReturnNode,
            TypeAnnotation,
            VarDeclarationNode,
        },
    };

    fn assign(target: impl Into<AstNode>, value: impl Into<AstNode>) -> AstNode {
        AssignmentNode::new(target, value).into()
    }

    fn chain(names: &[&str]) -> AstNode {
        AstNode::dotted(names.iter().map(|name| IdentifierNode::new(*name))).unwrap()
    }

    fn point_class() -> AstNode {
        ClassDeclarationNode::new("Point")
            .member(VarDeclarationNode::new("x", TypeAnnotation::new("int", 0)))
            .member(VarDeclarationNode::new("y", TypeAnnotation::new("int", 0)))
            .into()
    }

    #[test]
    fn test_dependency_range() {
        let mut session = CompileSession::new(CompileOptions::new());

        let unit = [
            point_class(),
            assign(IdentifierNode::new("p"), FunctionCallNode::new("Point", Vec::<AstNode>::new())),
            assign(IdentifierNode::new("x"), chain(&["p", "y"])),
        ];

        let block = session.compile(&unit, Language::Associative).unwrap();
        let executable = session.finish();
        let block = executable.block(block).unwrap();

        let node = &block.graph()[1];

        assert_eq!(node.dependencies().len(), 1);
        assert!(node.dependencies()[0].is_rooted_at("p"));
        assert!(node.depends_on_path(&["p", "y"]));
        assert!(node.is_sealed());

        let range = node.update_block();
        let stream = block.instructions();

        assert_eq!(stream[range.start_pc].opcode, OpCode::PushM);
        assert_eq!(stream[range.end_pc].opcode, OpCode::PushList);
        assert!(matches!(stream[range.end_pc + 1].op1, Some(Operand::BlockIndex(..))));

        let store = stream[range.end_pc..]
            .iter()
            .position(|instruction| instruction.opcode == OpCode::DepX)
            .unwrap();

        assert_eq!(stream[range.end_pc + store - 1].opcode, OpCode::Pop);
        assert!(node.updated().unwrap().is_rooted_at("x"));
    }

    #[test]
    fn test_forward_reference() {
        let mut session = CompileSession::new(CompileOptions::new());

        let unit = [
            assign(IdentifierNode::new("b"), IdentifierNode::new("a")),
            assign(IdentifierNode::new("a"), LiteralNode::int("1")),
        ];

        let block = session.compile(&unit, Language::Associative).unwrap();

        assert!(!session.diagnostics().contains(IssueCode::UnboundIdentifier));

        let executable = session.finish();
        let graph = executable.block(block).unwrap().graph();

        assert!(graph[0].depends_on("a"));
        assert!(graph[1].updated().unwrap().is_rooted_at("a"));
    }

    #[test]
    fn test_class_accessors() {
        let mut session = CompileSession::new(CompileOptions::new());

        let unit = [
            point_class(),
            assign(IdentifierNode::new("p"), FunctionCallNode::new("Point", Vec::<AstNode>::new())),
            assign(chain(&["p", "x"]), LiteralNode::int("3")),
        ];

        let block = session.compile(&unit, Language::Associative).unwrap();
        let executable = session.finish();

        let class = executable.classes().index_of("Point").unwrap();
        let class = executable.classes().get(class).unwrap();

        let names = class
            .procedures
            .iter()
            .map(|procedure| procedure.name.as_str())
            .collect::<Vec<_>>();

        assert_eq!(names, vec!["%get_x", "%set_x", "%get_y", "%set_y", "Point"]);
        assert!(class.procedures.iter().all(|procedure| procedure.is_auto_generated));

        let stream = executable.block(block).unwrap().instructions();

        let setter = stream
            .iter()
            .find(|instruction| instruction.opcode == OpCode::Call)
            .unwrap();

        assert_eq!(setter.op1, Some(Operand::FunctionIndex(Some(1))));
    }

    #[test]
    fn test_ssa_split() {
        let mut options = CompileOptions::new();

        options.full_ssa = true;

        let mut session = CompileSession::new(options);

        let unit = [
            point_class(),
            assign(IdentifierNode::new("p"), FunctionCallNode::new("Point", Vec::<AstNode>::new())),
            assign(IdentifierNode::new("z"), chain(&["p", "x"])),
        ];

        let block = session.compile(&unit, Language::Associative).unwrap();
        let executable = session.finish();
        let graph = executable.block(block).unwrap().graph();

        assert_eq!(graph.len(), 4);

        let factors = &graph[1..];

        assert!(factors[0].is_ssa_temp());
        assert!(factors[0].depends_on("p"));
        assert!(factors[1].is_ssa_temp());
        assert!(factors[1].depends_on_path(&["p", "x"]));
        assert!(!factors[2].is_ssa_temp());
        assert!(factors[2].updated().unwrap().is_rooted_at("z"));
    }

    #[test]
    fn test_function_return() {
        let mut session = CompileSession::new(CompileOptions::new());

        let unit = [
            AstNode::from(
                FunctionDefinitionNode::new(
                    "twice",
                    [ArgumentNode::new("v")],
                    [ReturnNode::new(IdentifierNode::new("v"))],
                )
                .returns(TypeAnnotation::new("int", 0)),
            ),
            assign(
                IdentifierNode::new("r"),
                FunctionCallNode::new("twice", [LiteralNode::int("2")]),
            ),
        ];

        let block = session.compile(&unit, Language::Associative).unwrap();

        let executable = session.finish();
        let procedure = executable.procedures().get(0).unwrap();
        let body = executable.block(procedure.block.unwrap()).unwrap();

        assert_eq!(body.instructions().last().unwrap().opcode, OpCode::Ret);
        assert_eq!(procedure.entry, Some(0));

        let range = body.graph().last().unwrap().update_block();

        assert!(range.start_pc <= range.end_pc);
        assert_eq!(body.instructions()[range.end_pc].opcode, OpCode::Push);

        let global = executable.block(block).unwrap();
        let r = global.symbols().iter().find(|symbol| symbol.name == "r").unwrap();

        assert!(r.ty.is(PrimitiveType::Int));
        assert!(global
            .instructions()
            .iter()
            .any(|instruction| instruction.opcode == OpCode::CallR));
    }

    #[test]
    fn test_imperative_construct() {
        let mut session = CompileSession::new(CompileOptions::new());

        let unit = [AstNode::from(IfNode::new(
            LiteralNode::bool(true),
            [assign(IdentifierNode::new("a"), LiteralNode::int("1"))],
        ))];

        let error = session.compile(&unit, Language::Associative).unwrap_err();

        assert_eq!(error.code(), Some(IssueCode::ImperativeConstructInAssociative));
    }
}
