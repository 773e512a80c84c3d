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

use std::mem::replace;

use compact_str::{format_compact, CompactString};
use log::debug;

use crate::{
    analysis::{CompileResult, IssueCode},
    interpret::BlockKind,
    report::system_panic,
    runtime::{
        getter_name,
        setter_name,
        ArgumentInfo,
        ClassIndex,
        ClassNode,
        ProcRef,
        ProcedureNode,
        Type,
        STATIC_PROPERTIES_INITIALIZER,
    },
    semantics::{
        allocator::Declaration,
        compiler::emit_unit,
        generator::CodeGenerator,
        scope::ScopeFrame,
        CODEGEN_LOG,
    },
    syntax::{
        ArgumentNode,
        AssignmentNode,
        AstNode,
        ClassDeclarationNode,
        FunctionDefinitionNode,
        IdentifierNode,
        LanguageBlockNode,
        ReturnNode,
        SourceSpan,
        TypeAnnotation,
        VarDeclarationNode,
    },
};

/// The parameter name of auto-generated property setters.
pub(super) const SETTER_ARGUMENT: &str = "%value";

/// Lowering of declarations: variables, procedures, classes, and nested
/// language blocks.
pub(super) trait DeclarationEmitter<'s>: CodeGenerator<'s> + Sized {
    fn resolve_type(&mut self, annotation: &TypeAnnotation, span: SourceSpan) -> CompileResult<Type> {
        let Some(uid) = self.base().session.classes.index_of(&annotation.name) else {
            return Err(self.base_mut().session.log_semantic_error(
                IssueCode::UnknownType,
                format_compact!("Unknown type '{}'.", annotation.name),
                span,
            ));
        };

        Ok(match annotation.rank {
            0 => Type::scalar(uid),
            rank => Type::array(uid, rank),
        })
    }

    /// Declares a variable in the current scope.
    ///
    /// Heap variables are boxed right away. An initial value is lowered as
    /// an ordinary assignment.
    fn emit_var_declaration(&mut self, node: &VarDeclarationNode) -> CompileResult<()> {
        let ty = self.resolve_type(&node.ty, node.span)?;

        let mut declaration = Declaration::new(node.name.clone(), ty);

        declaration.region = node.region;
        declaration.is_static = node.is_static;
        declaration.access = node.access;

        let base = self.base_mut();
        let symbol_ref = base.allocate_variable(declaration);

        let Some(symbol) = base.symbol(symbol_ref).cloned() else {
            system_panic!("Missing symbol {symbol_ref:?}.");
        };

        base.emit_heap_allocation(&symbol);

        if let Some(value) = &node.value {
            let assignment = AssignmentNode::new(
                IdentifierNode::new(node.name.clone()).at(node.span),
                value.as_ref().clone(),
            )
            .at(node.span);

            self.emit_statement(&assignment.into())?;
        }

        Ok(())
    }

    /// Registers a procedure and lowers its body into a new function block.
    ///
    /// Inside a class declaration the procedure becomes a method of that
    /// class; otherwise it is a global procedure.
    fn emit_function_definition(
        &mut self,
        node: &FunctionDefinitionNode,
        auto_generated: bool,
    ) -> CompileResult<ProcRef> {
        let return_type = self.resolve_type(&node.return_type, node.span)?;

        let mut args = Vec::with_capacity(node.args.len());

        for arg in &node.args {
            args.push(ArgumentInfo {
                name: arg.name.clone(),
                ty: self.resolve_type(&arg.ty, arg.span)?,
                has_default: arg.default.is_some(),
            });
        }

        let attributes = self.base_mut().populate_attributes(&node.attributes);

        let mut procedure = ProcedureNode::new(node.name.clone())
            .returns(return_type)
            .with_static(node.is_static)
            .with_access(node.access);

        if node.is_constructor {
            procedure = procedure.constructor();
        }

        if auto_generated {
            procedure = procedure.auto_generated();
        }

        procedure.args = args;
        procedure.attributes = attributes;

        let arguments = procedure
            .args
            .iter()
            .map(|arg| (arg.name.clone(), arg.ty))
            .collect::<Vec<_>>();

        let base = self.base_mut();

        let owner = match base.scope.procedure {
            None => base.scope.class_scope,
            Some(_) => None,
        };

        let proc_ref = match owner {
            Some(class) => {
                let Some(index) = base.session.classes.append_procedure(class, procedure) else {
                    system_panic!("Class {class} does not exist.");
                };

                ProcRef {
                    class_scope: Some(class),
                    index,
                }
            }

            None => ProcRef {
                class_scope: None,
                index: base.session.procedures.append(procedure),
            },
        };

        let language = base.language();
        let parent = base.block;
        let session = &mut *base.session;

        let body = session.new_block(BlockKind::Function, language, Some(parent));

        session.code_block_mut(body).procedure = Some(proc_ref);

        if let Some(procedure) = session.procedure_mut(proc_ref) {
            procedure.block = Some(body);
        }

        debug!(target: CODEGEN_LOG, "procedure '{}' in block {body}", node.name);

        let scope = ScopeFrame {
            class_scope: owner,
            procedure: None,
            function_block: None,
        }
        .in_procedure(proc_ref, body);

        let outer_locals = replace(&mut session.counters.local_base, 0);

        let result = emit_unit(session, body, scope, language, &node.body, &arguments);

        let locals = replace(&mut session.counters.local_base, outer_locals);

        result?;

        let entry = session.code_block(body).entry;

        if let Some(procedure) = session.procedure_mut(proc_ref) {
            procedure.entry = entry;
            procedure.locals = locals;
        }

        Ok(proc_ref)
    }

    /// Lowers a nested block written in another (or the same) dialect and
    /// enters it with a bounce instruction.
    fn emit_language_block(&mut self, node: &LanguageBlockNode) -> CompileResult<()> {
        let base = self.base_mut();
        let parent = base.block;
        let scope = base.scope;
        let session = &mut *base.session;

        let child = session.new_block(BlockKind::Language, node.language, Some(parent));

        session.code_block_mut(child).procedure = scope.procedure;

        emit_unit(session, child, scope, node.language, &node.body, &[])?;

        let entry = session.code_block(child).entry.unwrap_or_default();

        let _ = self.base_mut().emit_bounce(child, entry, node.span);

        Ok(())
    }

    /// Declares a class: its member variables, the property accessors, the
    /// static initializer, the constructors, and the methods.
    fn emit_class_declaration(&mut self, node: &ClassDeclarationNode) -> CompileResult<ClassIndex> {
        let base_class = match &node.base {
            None => None,

            Some(name) => match self.base().session.classes.index_of(name) {
                Some(class) => Some(class),

                None => {
                    return Err(self.base_mut().session.log_semantic_error(
                        IssueCode::UnknownType,
                        format_compact!("Unknown base class '{name}' of class '{}'.", node.name),
                        node.span,
                    ))
                }
            },
        };

        let attributes = self.base_mut().populate_attributes(&node.attributes);

        let mut class_node = ClassNode::new(node.name.clone());

        class_node.base = base_class;
        class_node.attributes = attributes;

        let Some(class) = self.base_mut().session.classes.append(class_node) else {
            return Err(self.base_mut().session.log_semantic_error(
                IssueCode::DuplicateClass,
                format_compact!("Class '{}' is already declared.", node.name),
                node.span,
            ));
        };

        debug!(target: CODEGEN_LOG, "class '{}' is #{class}", node.name);

        let outer = replace(&mut self.base_mut().scope, ScopeFrame::in_class(class));

        let result = self.emit_class_body(node);

        self.base_mut().scope = outer;

        result.map(|_| class)
    }

    #[doc(hidden)]
    fn emit_class_body(&mut self, node: &ClassDeclarationNode) -> CompileResult<()> {
        let mut instance_initializers = Vec::new();
        let mut static_initializers = Vec::new();

        for member in &node.members {
            let ty = self.resolve_type(&member.ty, member.span)?;

            let mut declaration = Declaration::new(member.name.clone(), ty);

            declaration.region = member.region;
            declaration.is_static = member.is_static;
            declaration.access = member.access;

            let _ = self.base_mut().allocate_variable(declaration);

            let Some(value) = &member.value else {
                continue;
            };

            let assignment = AstNode::from(
                AssignmentNode::new(
                    IdentifierNode::new(member.name.clone()).at(member.span),
                    value.as_ref().clone(),
                )
                .at(member.span),
            );

            match member.is_static {
                true => static_initializers.push(assignment),
                false => instance_initializers.push(assignment),
            }
        }

        for member in node.members.iter().filter(|member| !member.is_static) {
            let getter = FunctionDefinitionNode::new(
                getter_name(&member.name),
                Vec::new(),
                [ReturnNode::new(IdentifierNode::new(member.name.clone()))],
            )
            .returns(member.ty.clone())
            .with_access(member.access);

            let _ = self.emit_function_definition(&getter, true)?;

            let setter = FunctionDefinitionNode::new(
                setter_name(&member.name),
                [ArgumentNode::new(SETTER_ARGUMENT).typed(member.ty.clone())],
                [AssignmentNode::new(
                    IdentifierNode::new(member.name.clone()),
                    IdentifierNode::new(SETTER_ARGUMENT),
                )],
            )
            .with_access(member.access);

            let _ = self.emit_function_definition(&setter, true)?;
        }

        if !static_initializers.is_empty() {
            let initializer =
                FunctionDefinitionNode::new(STATIC_PROPERTIES_INITIALIZER, Vec::new(), static_initializers)
                    .static_method();

            let _ = self.emit_function_definition(&initializer, true)?;
        }

        let mut has_constructor = false;

        for method in &node.methods {
            has_constructor |= method.is_constructor;

            if method.is_constructor && !instance_initializers.is_empty() {
                let mut method = method.clone();

                let _ = method.body.splice(0..0, instance_initializers.iter().cloned());

                let _ = self.emit_function_definition(&method, false)?;

                continue;
            }

            let _ = self.emit_function_definition(method, false)?;
        }

        if !has_constructor {
            let constructor =
                FunctionDefinitionNode::new(node.name.clone(), Vec::new(), instance_initializers).constructor();

            let _ = self.emit_function_definition(&constructor, true)?;
        }

        Ok(())
    }
}

impl<'s, G: CodeGenerator<'s>> DeclarationEmitter<'s> for G {}

/// Returns the names assigned or declared at the top level of a unit.
///
/// Reads of these names before their first assignment are forward
/// references rather than unbound identifiers.
pub(super) fn forward_names(unit: &[AstNode]) -> impl Iterator<Item = CompactString> + '_ {
    unit.iter().filter_map(|node| match node {
        AstNode::Assignment(assignment) => assignment
            .target
            .as_identifier()
            .filter(|ident| !ident.is_this())
            .map(|ident| ident.name.clone()),

        AstNode::VarDeclaration(declaration) => Some(declaration.name.clone()),

        _ => None,
    })
}
