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

use log::trace;

use crate::{
    graph::{GraphNode, UpdateNode, UpdateNodeRef},
    runtime::{property_name, Type},
    semantics::{
        assembler::CodeGen,
        generator::{flatten_chain, unwrap_segment},
        resolver::{CallTarget, ChainCursor, SegmentTarget},
        CODEGEN_LOG,
    },
    syntax::AstNode,
};

impl<'s> CodeGen<'s> {
    /// Resolves the statically known prefix of a chain without emitting
    /// code.
    ///
    /// Returns None if not even the root segment resolves.
    pub(super) fn build_dependency_chain(&self, node: &AstNode) -> Option<UpdateNodeRef> {
        let segments = match node {
            AstNode::IdentifierList(list) => flatten_chain(list).ok()?,
            AstNode::Identifier(..) | AstNode::FunctionCall(..) => vec![node],
            _ => return None,
        };

        let mut cursor = ChainCursor::new(segments.len() == 1);

        for segment in segments {
            match &*unwrap_segment(segment) {
                AstNode::Identifier(ident) if ident.is_this() && cursor.depth == 0 => {
                    let class_scope = self.scope.class_scope;

                    cursor.chain.push(UpdateNode::symbol(ident.name.clone(), None, class_scope));
                    cursor.ty = class_scope.map(Type::scalar).unwrap_or_default();
                }

                AstNode::Identifier(ident) => match self.resolve_segment(&ident.name, &cursor) {
                    SegmentTarget::Symbol(symbol_ref) => {
                        let symbol = self.symbol(symbol_ref)?;

                        cursor.chain.push(UpdateNode::symbol(
                            ident.name.clone(),
                            Some(symbol_ref),
                            symbol.class_scope,
                        ));
                        cursor.ty = symbol.ty.subscripted(ident.dims.len());
                        cursor.static_anchor = None;
                    }

                    SegmentTarget::ClassAnchor(class) => {
                        cursor.chain.push(UpdateNode::symbol(ident.name.clone(), None, Some(class)));
                        cursor.ty = Type::scalar(class);
                        cursor.static_anchor = Some(class);
                    }

                    SegmentTarget::Inaccessible => {
                        if let Some(node) = self.hidden_member(&ident.name, &cursor) {
                            cursor.chain.push(node);
                        }

                        break;
                    }

                    _ => break,
                },

                AstNode::FunctionCall(call) if cursor.depth > 0 && property_name(call.name()).is_some() => {
                    let Some(property) = property_name(call.name()) else {
                        break;
                    };

                    match self.resolve_segment(property, &cursor) {
                        SegmentTarget::Symbol(symbol_ref) => {
                            let symbol = self.symbol(symbol_ref)?;

                            cursor.chain.push(UpdateNode::symbol(property, Some(symbol_ref), symbol.class_scope));
                            cursor.ty = symbol.ty.subscripted(call.dims.len());
                            cursor.static_anchor = None;
                        }

                        SegmentTarget::Inaccessible => {
                            if let Some(node) = self.hidden_member(property, &cursor) {
                                cursor.chain.push(node);
                            }

                            break;
                        }

                        _ => break,
                    }
                }

                AstNode::FunctionCall(call) => match self.resolve_call(call.name(), call.args.len(), &cursor) {
                    CallTarget::Procedure(proc_ref) => {
                        let procedure = self.session.procedure(proc_ref)?;

                        let node = match (procedure.is_auto_generated, property_name(&procedure.name)) {
                            (true, Some(property)) => {
                                UpdateNode::symbol(property, None, procedure.class_scope)
                            }

                            _ => UpdateNode::method(call.name()),
                        };

                        cursor.chain.push(node);
                        cursor.ty = match procedure.is_constructor {
                            true => procedure.class_scope.map(Type::scalar).unwrap_or_default(),
                            false => procedure.return_type,
                        };
                        cursor.static_anchor = None;
                    }

                    _ => break,
                },

                _ => break,
            }

            cursor.depth += 1;
        }

        match cursor.chain.is_empty() {
            true => None,
            false => Some(cursor.chain),
        }
    }

    /// Records the chain reassembled from the split factors of a chain
    /// assignment as a dependency of the `graph` node.
    ///
    /// The pointer list is cleared. Returns true if a dependency was
    /// recorded.
    pub(super) fn flush_ssa_pointers(&mut self, graph: &mut GraphNode) -> bool {
        let chain = self
            .ssa_pointers
            .reassemble()
            .and_then(|node| self.build_dependency_chain(&node));

        self.ssa_pointers.clear();

        let Some(chain) = chain else {
            return false;
        };

        trace!(target: CODEGEN_LOG, "reassembled chain {chain}");

        graph.push_dependency(chain)
    }

    /// Copies the literal subscripts of a chain segment onto the first graph
    /// node of the chain assignment being split.
    ///
    /// Subscripts of the assignment target (`lhs`) become the node's own
    /// dimensions; other subscripts are appended to its last dependency.
    pub(super) fn mirror_ssa_dimensions(&mut self, literals: &[UpdateNode], lhs: bool) {
        if !self.session.options.full_ssa || literals.is_empty() {
            return;
        }

        let Some(node) = self.ssa_graph_nodes.first_mut() else {
            return;
        };

        for literal in literals {
            match lhs {
                true => node.push_dimension(literal.clone()),

                false => {
                    let _ = node.push_dependency_dimension(literal.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        graph::{GraphNode, UpdateNodeKind},
        interpret::{BlockKind, Language},
        runtime::{getter_name, AccessModifier, ClassNode, PrimitiveType, ProcedureNode, Type},
        semantics::{
            allocator::Declaration,
            assembler::CodeGen,
            scope::ScopeFrame,
            CompileOptions,
            CompileSession,
        },
        syntax::{AstNode, FunctionCallNode, GroupExpressionNode, IdentifierNode},
    };

    fn session() -> CompileSession {
        let mut session = CompileSession::new(CompileOptions::new());

        let _ = session.new_block(BlockKind::Global, Language::Associative, None);

        let point = session.classes.append(ClassNode::new("Point")).unwrap();

        let _ = session.classes.append_procedure(
            point,
            ProcedureNode::new("norm").returns(Type::primitive(PrimitiveType::Double)),
        );

        let mut codegen = CodeGen::new(&mut session, 0, ScopeFrame::in_class(point));

        let _ = codegen.allocate_variable(Declaration::new("x", Type::primitive(PrimitiveType::Int)));

        let mut secret = Declaration::new("secret", Type::primitive(PrimitiveType::Int));

        secret.access = AccessModifier::Private;

        let _ = codegen.allocate_variable(secret);

        codegen.scope = ScopeFrame::global();

        let _ = codegen.allocate_variable(Declaration::new("p", Type::scalar(point)));

        session
    }

    #[test]
    fn test_static_prefix() {
        let mut session = session();
        let codegen = CodeGen::new(&mut session, 0, ScopeFrame::global());

        let chain = AstNode::dotted([
            AstNode::from(IdentifierNode::new("p")),
            AstNode::from(FunctionCallNode::new("norm", Vec::<AstNode>::new())),
            AstNode::from(IdentifierNode::new("unknown")),
        ])
        .unwrap();

        let built = codegen.build_dependency_chain(&chain).unwrap();

        assert_eq!(built.len(), 2);
        assert!(built.is_rooted_at("p"));
        assert_eq!(built.nodes[1].kind, UpdateNodeKind::Method);

        assert!(codegen
            .build_dependency_chain(&IdentifierNode::new("missing").into())
            .is_none());
    }

    #[test]
    fn test_pointer_flush() {
        let mut session = session();
        let mut codegen = CodeGen::new(&mut session, 0, ScopeFrame::global());

        codegen.ssa_pointers.push(IdentifierNode::new("p").into());
        codegen.ssa_pointers.push(IdentifierNode::new("x").into());

        let mut graph = GraphNode::new(0, 0);

        assert!(codegen.flush_ssa_pointers(&mut graph));
        assert!(codegen.ssa_pointers.is_empty());
        assert!(graph.depends_on_path(&["p", "x"]));
    }

    #[test]
    fn test_accessor_dependency() {
        let mut session = session();
        let codegen = CodeGen::new(&mut session, 0, ScopeFrame::global());

        let chain = AstNode::dotted([
            AstNode::from(GroupExpressionNode::new(IdentifierNode::new("p"))),
            AstNode::from(FunctionCallNode::new(getter_name("x"), Vec::<AstNode>::new())),
        ])
        .unwrap();

        let built = codegen.build_dependency_chain(&chain).unwrap();

        assert_eq!(built.len(), 2);
        assert_eq!(built.nodes[1].name, "x");
        assert_eq!(built.nodes[1].kind, UpdateNodeKind::Symbol);
        assert!(built.nodes[1].symbol.is_some());
    }

    #[test]
    fn test_hidden_member_dependency() {
        let mut session = session();
        let codegen = CodeGen::new(&mut session, 0, ScopeFrame::global());

        let chain = AstNode::dotted([IdentifierNode::new("p"), IdentifierNode::new("secret")]).unwrap();

        let built = codegen.build_dependency_chain(&chain).unwrap();

        assert_eq!(built.len(), 2);
        assert_eq!(built.nodes[1].name, "secret");
        assert!(built.nodes[1].symbol.is_some());
    }
}
