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

use compact_str::format_compact;

use crate::{
    analysis::{suggest, CompileResult, IssueCode},
    graph::{GraphNode, SymbolOwner, SymbolRef, UpdateNode, UpdateNodeRef},
    interpret::{DynamicFunctionNode, DynamicVariableNode, Operand},
    report::system_panic,
    runtime::{
        property_name,
        setter_name,
        ClassIndex,
        MemberLookup,
        PrimitiveType,
        ProcRef,
        Type,
        INVALID_TYPE,
    },
    semantics::{
        allocator::Declaration,
        assembler::CodeGen,
        generator::{expect_segments, flatten_chain, unwrap_segment, CodeGenerator, SubCompilePass},
        literals::LiteralEmitter,
        scope::Resolution,
    },
    syntax::{
        AstNode,
        FunctionCallNode,
        IdentifierListNode,
        IdentifierNode,
        LiteralKind,
        SourceSpan,
    },
};

/// The state of a chain being lowered segment by segment.
#[derive(Clone, Debug)]
pub(super) struct ChainCursor {
    /// The type of the value denoted by the segments lowered so far.
    pub(super) ty: Type,

    /// The number of chain values the lowered segments left on the stack.
    pub(super) depth: usize,

    /// The class named by the root segment of a static access.
    pub(super) static_anchor: Option<ClassIndex>,

    /// The dependency chain mirroring the resolved segments.
    pub(super) chain: UpdateNodeRef,

    /// Set once a segment is resolved by the runtime. The remaining segments
    /// do not contribute to the dependency chain.
    pub(super) late_bound: bool,

    /// The dynamic variable entry of the late-bound segments lowered last.
    pub(super) late_entry: Option<usize>,

    /// Set once the chain collapsed into a null value.
    pub(super) stopped: bool,

    /// The receiver of the next segment is a value rather than a variable
    /// path.
    pub(super) after_call: bool,

    pub(super) first_call: Option<ProcRef>,

    /// The chain consists of one segment.
    single: bool,
}

impl ChainCursor {
    pub(super) fn new(single: bool) -> Self {
        Self {
            ty: Type::invalid(),
            depth: 0,
            static_anchor: None,
            chain: UpdateNodeRef::new(),
            late_bound: false,
            late_entry: None,
            stopped: false,
            after_call: false,
            first_call: None,
            single,
        }
    }

    /// Returns the class whose members the next segment refers to.
    #[inline(always)]
    pub(super) fn receiver_class(&self) -> Option<ClassIndex> {
        if self.static_anchor.is_some() {
            return self.static_anchor;
        }

        match self.ty.is_class() && !self.ty.is_array() {
            true => Some(self.ty.uid),
            false => None,
        }
    }

    #[inline(always)]
    fn track(&mut self, node: UpdateNode) {
        if !self.late_bound {
            self.chain.push(node);
        }
    }
}

/// A compile-time target of an identifier segment.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(super) enum SegmentTarget {
    Symbol(SymbolRef),
    ClassAnchor(ClassIndex),
    Inaccessible,

    /// The receiver is an array whose element type is not tracked.
    ArrayReceiver,

    Unbound,
}

/// A compile-time target of a call segment.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(super) enum CallTarget {
    Procedure(ProcRef),

    /// An instance method called through the class name.
    NonStaticOnClass,

    Inaccessible,

    /// The receiver is an array whose element type is not tracked.
    ArrayReceiver,

    Unresolved,
}

impl<'s> CodeGen<'s> {
    /// Returns true if values are preceded by their replication guides.
    #[inline(always)]
    pub(super) fn guide_aware(&self) -> bool {
        self.emit_replication_guide && self.session.options.replication_guides
    }

    /// Resolves an identifier segment against the segments preceding it.
    pub(super) fn resolve_segment(&self, name: &str, cursor: &ChainCursor) -> SegmentTarget {
        if cursor.depth == 0 {
            if let Some(class) = self.resolve_static {
                if self.session.classes.index_of(name) == Some(class) {
                    return SegmentTarget::ClassAnchor(class);
                }
            }

            let resolution =
                self.verify_allocation(name, self.scope.class_scope, self.scope.function_index());

            return match resolution {
                Resolution::Found(symbol) => SegmentTarget::Symbol(symbol),
                Resolution::Inaccessible(..) => SegmentTarget::Inaccessible,

                Resolution::Unbound => match self.session.classes.index_of(name) {
                    Some(class) => SegmentTarget::ClassAnchor(class),
                    None => SegmentTarget::Unbound,
                },
            };
        }

        if cursor.static_anchor.is_none() && cursor.ty.is_array() {
            return SegmentTarget::ArrayReceiver;
        }

        let Some(class) = cursor.receiver_class() else {
            return SegmentTarget::Unbound;
        };

        match self.lookup_class_member(class, name) {
            Resolution::Found(symbol) => SegmentTarget::Symbol(symbol),
            Resolution::Inaccessible(..) => SegmentTarget::Inaccessible,
            Resolution::Unbound => SegmentTarget::Unbound,
        }
    }

    /// Resolves a call segment against the segments preceding it.
    ///
    /// A call at the chain root is looked up among the methods of the
    /// current class, then among the global procedures, and finally among
    /// the constructors of the class with the same name.
    pub(super) fn resolve_call(&self, name: &str, arity: usize, cursor: &ChainCursor) -> CallTarget {
        let classes = &self.session.classes;
        let context = self.scope.class_scope;

        if cursor.depth == 0 {
            if let Some(class) = context {
                if let MemberLookup::Found(member) = classes.lookup_procedure(class, name, arity, context) {
                    return CallTarget::Procedure(ProcRef {
                        class_scope: Some(member.owner),
                        index: member.index,
                    });
                }
            }

            if let Some(index) = self.session.procedures.find(name, arity) {
                return CallTarget::Procedure(ProcRef {
                    class_scope: None,
                    index,
                });
            }

            let constructor = classes.index_of(name).and_then(|class| {
                classes
                    .get(class)?
                    .procedures
                    .iter()
                    .find(|procedure| procedure.is_constructor && procedure.accepts_arity(arity))
                    .map(|procedure| ProcRef {
                        class_scope: Some(class),
                        index: procedure.index,
                    })
            });

            return match constructor {
                Some(procedure) => CallTarget::Procedure(procedure),
                None => CallTarget::Unresolved,
            };
        }

        if cursor.static_anchor.is_none() && cursor.ty.is_array() {
            return CallTarget::ArrayReceiver;
        }

        let Some(class) = cursor.receiver_class() else {
            return CallTarget::Unresolved;
        };

        match classes.lookup_procedure(class, name, arity, context) {
            MemberLookup::Found(member) => {
                let procedure = ProcRef {
                    class_scope: Some(member.owner),
                    index: member.index,
                };

                let Some(node) = classes.procedure(procedure) else {
                    return CallTarget::Unresolved;
                };

                match cursor.static_anchor.is_some() && !node.is_static && !node.is_constructor {
                    true => CallTarget::NonStaticOnClass,
                    false => CallTarget::Procedure(procedure),
                }
            }

            MemberLookup::Inaccessible(..) => CallTarget::Inaccessible,
            MemberLookup::Missing => CallTarget::Unresolved,
        }
    }

    /// Registers a late-bound chain segment and returns the table position
    /// of its entry.
    ///
    /// A segment that follows another late-bound segment extends the entry
    /// of that segment instead of registering a new one.
    pub(super) fn register_dynamic_variable(&mut self, name: &str, cursor: &mut ChainCursor) -> usize {
        if let Some(index) = cursor.late_entry {
            if let Some(entry) = self.session.dynamic_variables.get_mut(index) {
                entry.members.push(name.into());

                return index;
            }
        }

        let index = self.session.dynamic_variables.append(DynamicVariableNode {
            name: name.into(),
            members: Vec::new(),
            function: self.scope.function_index(),
            class_scope: self.scope.class_scope,
        });

        cursor.late_entry = Some(index);

        index
    }

    /// Returns the dependency segment of a member variable that the current
    /// scope cannot access.
    pub(super) fn hidden_member(&self, name: &str, cursor: &ChainCursor) -> Option<UpdateNode> {
        let class = match cursor.depth {
            0 => self.scope.class_scope,
            _ => cursor.receiver_class(),
        }?;

        let member = self.session.classes.first_visible_symbol_no_access_check(class, name)?;

        let symbol = SymbolRef {
            owner: SymbolOwner::Class(member.owner),
            index: member.index,
        };

        Some(UpdateNode::symbol(name, Some(symbol), Some(member.owner)))
    }

    /// Registers a late-bound call and returns its table position.
    pub(super) fn register_dynamic_function(&mut self, name: &str, arity: usize) -> usize {
        self.session.dynamic_functions.append(DynamicFunctionNode {
            name: name.into(),
            arity,
            function: self.scope.function_index(),
            class_scope: self.scope.class_scope,
        })
    }

    pub(super) fn warn_unbound(&mut self, name: &str, span: SourceSpan) {
        let message = match suggest(name, self.visible_names()) {
            Some(hint) => format_compact!("'{name}' is not defined. Did you mean '{hint}'?"),
            None => format_compact!("'{name}' is not defined."),
        };

        self.session.log_warning(IssueCode::UnboundIdentifier, message, span);
    }

    fn warn_function_not_found(&mut self, name: &str, arity: usize, span: SourceSpan) {
        let mut candidates = self
            .session
            .procedures
            .iter()
            .map(|procedure| procedure.name.as_str())
            .collect::<Vec<_>>();

        if let Some(class) = self.scope.class_scope.and_then(|class| self.session.classes.get(class)) {
            candidates.extend(class.procedures.iter().map(|procedure| procedure.name.as_str()));
        }

        let message = match suggest(name, candidates) {
            Some(hint) => format_compact!(
                "Function '{name}' with {arity} argument(s) is not found. Did you mean '{hint}'?",
            ),
            None => format_compact!("Function '{name}' with {arity} argument(s) is not found."),
        };

        self.session.log_warning(IssueCode::FunctionNotFound, message, span);
    }

    fn class_name(&self, class: ClassIndex) -> &str {
        match self.session.classes.get(class) {
            Some(node) => node.name.as_str(),
            None => "?",
        }
    }
}

/// Expression lowering shared by both dialects.
pub(super) trait Resolver<'s>: CodeGenerator<'s> + Sized {
    /// Lowers a value-producing expression and returns its type.
    ///
    /// The chains read by the expression are recorded in the `graph` node,
    /// if any.
    fn emit_expression(
        &mut self,
        node: &AstNode,
        graph: Option<&mut GraphNode>,
        pass: SubCompilePass,
    ) -> CompileResult<Type> {
        match node {
            AstNode::Identifier(..) | AstNode::FunctionCall(..) => {
                self.emit_chain(&[node], node.span(), graph, pass)
            }

            AstNode::IdentifierList(list) => self.emit_identifier_list(list, graph, pass),
            AstNode::Literal(literal) => self.emit_literal(literal, Type::invalid(), pass),
            AstNode::ExprList(list) => self.emit_expr_list(list, graph, pass),
            AstNode::Range(range) => self.emit_range(range, graph, pass),
            AstNode::Unary(unary) => self.emit_unary_expression(unary, graph, pass),
            AstNode::Binary(binary) => self.emit_binary_expression(binary, graph, pass),
            AstNode::Group(group) => self.emit_group(group, graph, pass),

            AstNode::DefaultArg(span) => {
                if !pass.is_probe() {
                    let _ = self.base_mut().emit_push_default_arg(*span);
                }

                Ok(Type::default())
            }

            AstNode::Dynamic(span) => {
                if !pass.is_probe() {
                    let _ = self.base_mut().emit_push_dynamic(*span);
                }

                Ok(Type::default())
            }

            statement => Err(self.base_mut().session.log_semantic_error(
                IssueCode::UnexpectedStatement,
                "A statement cannot be used as a value.",
                statement.span(),
            )),
        }
    }

    fn emit_identifier_list(
        &mut self,
        list: &IdentifierListNode,
        graph: Option<&mut GraphNode>,
        pass: SubCompilePass,
    ) -> CompileResult<Type> {
        let segments = match flatten_chain(list) {
            Ok(segments) => segments,

            Err(span) => {
                return Err(self.base_mut().session.log_semantic_error(
                    IssueCode::InvalidIndirection,
                    "Only the '.' operator may join the segments of an identifier list.",
                    span,
                ))
            }
        };

        self.emit_chain(&segments, list.span, graph, pass)
    }

    /// Lowers the segments of a chain from left to right and records the
    /// resolved chain as a dependency of the `graph` node.
    fn emit_chain(
        &mut self,
        segments: &[&AstNode],
        span: SourceSpan,
        mut graph: Option<&mut GraphNode>,
        pass: SubCompilePass,
    ) -> CompileResult<Type> {
        expect_segments(segments.len());

        let unwrapped = segments
            .iter()
            .map(|segment| unwrap_segment(segment))
            .collect::<Vec<_>>();

        let segments = unwrapped.iter().map(|segment| &**segment).collect::<Vec<&AstNode>>();

        if pass.is_probe() {
            self.probe_chain(&segments)?;
            return Ok(Type::default());
        }

        if self.base().guide_aware() {
            let guides = match segments.last() {
                Some(segment) => segment.guides(),
                None => &[],
            };

            self.base_mut().emit_replication_guides(guides, true);
        }

        let mut cursor = ChainCursor::new(segments.len() == 1);

        for (index, segment) in segments.iter().enumerate() {
            if cursor.stopped {
                break;
            }

            match *segment {
                AstNode::Identifier(ident) => {
                    self.emit_identifier_segment(ident, &mut cursor, graph.as_deref_mut())?
                }

                AstNode::FunctionCall(call) => {
                    self.traverse_function_call(call, &mut cursor, graph.as_deref_mut(), pass)?
                }

                AstNode::Group(..) | AstNode::ExprList(..) if index == 0 => {
                    self.emit_value_root(segment, &mut cursor, graph.as_deref_mut())?
                }

                other if index == 0 && other.is_string() => {
                    self.emit_value_root(segment, &mut cursor, graph.as_deref_mut())?
                }

                other => {
                    return Err(self.base_mut().session.log_semantic_error(
                        IssueCode::NonIdentifierSegment,
                        "A member access segment must be an identifier or a call.",
                        other.span(),
                    ))
                }
            }
        }

        let ChainCursor {
            ty,
            depth,
            chain,
            stopped,
            after_call,
            first_call,
            ..
        } = cursor;

        if depth > 1 {
            let _ = self.base_mut().emit_pushlist(depth, after_call, span);
        }

        if let Some(graph) = graph {
            if graph.push_dependency(chain) && first_call.is_some() && graph.first_proc_ref().is_none() {
                graph.mark_first_proc_ref();
            }
        }

        Ok(match stopped {
            true => Type::primitive(PrimitiveType::Null),
            false => ty,
        })
    }

    #[doc(hidden)]
    fn emit_value_root(
        &mut self,
        root: &AstNode,
        cursor: &mut ChainCursor,
        graph: Option<&mut GraphNode>,
    ) -> CompileResult<()> {
        cursor.ty = self.emit_expression(root, graph, SubCompilePass::None)?;
        cursor.depth = 1;
        cursor.after_call = true;
        cursor.late_bound = true;

        Ok(())
    }

    /// Replaces the rest of the chain by a null value.
    #[doc(hidden)]
    fn stop_chain(&mut self, cursor: &mut ChainCursor, span: SourceSpan) {
        let _ = self.base_mut().emit_push_null(span);

        cursor.ty = Type::primitive(PrimitiveType::Null);
        cursor.depth += 1;
        cursor.stopped = true;
    }

    #[doc(hidden)]
    fn emit_identifier_segment(
        &mut self,
        ident: &IdentifierNode,
        cursor: &mut ChainCursor,
        mut graph: Option<&mut GraphNode>,
    ) -> CompileResult<()> {
        let span = ident.span;

        if ident.is_this() && cursor.depth == 0 {
            let base = self.base_mut();
            let class_scope = base.scope.class_scope;

            let _ = match cursor.single {
                true => base.emit_push_this(span),
                false => base.emit_pushm(Operand::ThisPtr, class_scope, span),
            };

            cursor.ty = class_scope.map(Type::scalar).unwrap_or_default();
            cursor.depth += 1;
            cursor.track(UpdateNode::symbol(ident.name.clone(), None, class_scope));

            return Ok(());
        }

        match self.base().resolve_segment(&ident.name, cursor) {
            SegmentTarget::Symbol(symbol_ref) => {
                let Some(symbol) = self.base().symbol(symbol_ref).cloned() else {
                    system_panic!("Missing symbol {symbol_ref:?}.");
                };

                if let Some(class) = cursor.static_anchor {
                    if !symbol.is_static {
                        let base = self.base_mut();
                        let message = format_compact!(
                            "'{}' is not a static member of class '{}'.",
                            ident.name,
                            base.class_name(class),
                        );

                        base.session.log_warning(IssueCode::CallingNonStaticOnClass, message, span);
                        self.stop_chain(cursor, span);

                        return Ok(());
                    }
                }

                let (dims, literals) = self.emit_dims(&ident.dims, graph.as_deref_mut(), SubCompilePass::None)?;

                let base = self.base_mut();

                base.mirror_ssa_dimensions(&literals, false);

                let operand = CodeGen::build_operand(&symbol);

                let _ = match cursor.single {
                    true => base.emit_push(operand, dims, span),

                    false => {
                        if dims > 0 {
                            let _ = base.emit_push_dims(dims);
                        }

                        base.emit_pushm(operand, symbol.class_scope, span)
                    }
                };

                let mut node = UpdateNode::symbol(ident.name.clone(), Some(symbol_ref), symbol.class_scope);

                node.dimensions = literals;

                cursor.track(node);
                cursor.ty = symbol.ty.subscripted(dims);
                cursor.depth += 1;
                cursor.static_anchor = None;
            }

            SegmentTarget::ClassAnchor(class) => {
                let base = self.base_mut();

                let _ = match cursor.single {
                    true => base.emit_push(Operand::ClassIndex(Some(class)), 0, span),
                    false => base.emit_pushm(Operand::ClassIndex(Some(class)), Some(class), span),
                };

                cursor.track(UpdateNode::symbol(ident.name.clone(), None, Some(class)));
                cursor.ty = Type::scalar(class);
                cursor.depth += 1;
                cursor.static_anchor = Some(class);
            }

            SegmentTarget::Inaccessible => {
                let base = self.base_mut();

                base.session.log_warning(
                    IssueCode::PropertyInaccessible,
                    format_compact!("Property '{}' is inaccessible.", ident.name),
                    span,
                );

                if let Some(node) = base.hidden_member(&ident.name, cursor) {
                    cursor.track(node);
                }

                self.stop_chain(cursor, span);
            }

            SegmentTarget::ArrayReceiver => self.stop_chain(cursor, span),

            SegmentTarget::Unbound if cursor.depth == 0 => {
                self.base_mut().warn_unbound(&ident.name, span);
                self.stop_chain(cursor, span);
            }

            SegmentTarget::Unbound => {
                if cursor.receiver_class().is_some() {
                    self.base_mut().warn_unbound(&ident.name, span);
                }

                let index = self.base_mut().register_dynamic_variable(&ident.name, cursor);

                let (dims, _) = self.emit_dims(&ident.dims, graph.as_deref_mut(), SubCompilePass::None)?;

                let base = self.base_mut();

                if dims > 0 {
                    let _ = base.emit_push_dims(dims);
                }

                let class_scope = base.scope.class_scope;

                let _ = base.emit_pushm(Operand::Dynamic(index), class_scope, span);

                cursor.ty = Type::default();
                cursor.depth += 1;
                cursor.late_bound = true;
                cursor.static_anchor = None;
            }
        }

        Ok(())
    }

    /// Lowers a call segment: the arguments, the call instruction, and the
    /// subscripts of the result.
    fn emit_call_segment(
        &mut self,
        call: &FunctionCallNode,
        cursor: &mut ChainCursor,
        mut graph: Option<&mut GraphNode>,
        pass: SubCompilePass,
    ) -> CompileResult<()> {
        if pass.is_probe() {
            for arg in &call.args {
                let _ = self.emit_expression(arg, None, pass)?;
            }

            return Ok(());
        }

        let span = call.span;
        let name = call.name();
        let arity = call.args.len();

        if let (Some(property), 0, true) = (property_name(name), arity, cursor.depth > 0) {
            if let SegmentTarget::Symbol(..) | SegmentTarget::Inaccessible =
                self.base().resolve_segment(property, cursor)
            {
                let mut ident = IdentifierNode::new(property);

                ident.dims = call.dims.clone();
                ident.span = span;

                return self.emit_identifier_segment(&ident, cursor, graph);
            }
        }

        let resolved = match self.base().resolve_call(name, arity, cursor) {
            CallTarget::Procedure(procedure) => Some(procedure),
            CallTarget::Unresolved => None,

            CallTarget::NonStaticOnClass => {
                let base = self.base_mut();
                let classes = &base.session.classes;

                let overload = cursor
                    .static_anchor
                    .and_then(|class| classes.first_static_member_function(class, name));

                let message = match (overload, property_name(name)) {
                    (Some(..), _) => format_compact!("Method '{name}' is called with invalid arguments."),
                    (None, Some(property)) => format_compact!("Property '{property}' is inaccessible."),

                    (None, None) => {
                        let class = cursor.static_anchor.map(|class| base.class_name(class)).unwrap_or("?");

                        format_compact!("Method '{name}' of class '{class}' is not static.")
                    }
                };

                base.session.log_warning(IssueCode::CallingNonStaticOnClass, message, span);
                self.stop_chain(cursor, span);

                return Ok(());
            }

            CallTarget::Inaccessible => {
                self.base_mut().session.log_warning(
                    IssueCode::MethodInaccessible,
                    format_compact!("Method '{name}' is inaccessible."),
                    span,
                );

                self.stop_chain(cursor, span);

                return Ok(());
            }

            CallTarget::ArrayReceiver => {
                self.stop_chain(cursor, span);

                return Ok(());
            }
        };

        let previous = graph.as_deref_mut().map(|graph| graph.set_allow_dependents(true));

        for arg in &call.args {
            let _ = self.emit_expression(arg, graph.as_deref_mut(), SubCompilePass::None)?;
        }

        if let (Some(graph), Some(previous)) = (graph.as_deref_mut(), previous) {
            let _ = graph.set_allow_dependents(previous);
        }

        let (ty, mut node) = match resolved {
            Some(proc_ref) => {
                let base = self.base_mut();

                let _ = base.emit_callr(proc_ref, cursor.depth, span);

                let Some(procedure) = base.session.procedure(proc_ref) else {
                    system_panic!("Procedure {proc_ref:?} does not exist.");
                };

                let ty = match procedure.is_constructor {
                    true => procedure.class_scope.map(Type::scalar).unwrap_or_default(),
                    false => procedure.return_type,
                };

                let node = match (procedure.is_auto_generated, property_name(&procedure.name)) {
                    (true, Some(property)) => UpdateNode::symbol(property, None, procedure.class_scope),
                    _ => UpdateNode::method(name),
                };

                let tracked = !procedure.is_constructor
                    && !procedure.is_auto_generated
                    && !procedure.is_static_initializer();

                if tracked {
                    base.function_call_stack.push(proc_ref);
                }

                if cursor.first_call.is_none() {
                    cursor.first_call = Some(proc_ref);
                }

                (ty, node)
            }

            None => {
                let base = self.base_mut();

                if cursor.depth == 0 || cursor.receiver_class().is_some() {
                    base.warn_function_not_found(name, arity, span);
                }

                let index = base.register_dynamic_function(name, arity);

                let _ = base.emit_dynamic_call(index, cursor.depth, span);

                (Type::default(), UpdateNode::method(name))
            }
        };

        let (dims, literals) = self.emit_dims(&call.dims, graph.as_deref_mut(), SubCompilePass::None)?;

        if dims > 0 {
            let _ = self.base_mut().emit_push_index(Operand::ArrayDim(dims));
        }

        node.dimensions = literals;

        cursor.track(node);
        cursor.ty = ty.subscripted(dims);
        cursor.depth = 1;
        cursor.after_call = true;
        cursor.static_anchor = None;
        cursor.late_entry = None;

        Ok(())
    }

    /// Lowers array subscripts. Returns the number of subscripts and the
    /// literal subscripts to be recorded in the dependency chains.
    fn emit_dims(
        &mut self,
        dims: &[AstNode],
        mut graph: Option<&mut GraphNode>,
        pass: SubCompilePass,
    ) -> CompileResult<(usize, Vec<UpdateNode>)> {
        let mut literals = Vec::new();

        if dims.is_empty() {
            return Ok((0, literals));
        }

        let guides = replace(&mut self.base_mut().emit_replication_guide, false);

        for dim in dims {
            let _ = self.emit_expression(dim, graph.as_deref_mut(), pass)?;

            if !self.base().associative_array_indexing {
                continue;
            }

            if let AstNode::Literal(literal) = dim {
                if literal.kind == LiteralKind::Int {
                    literals.push(UpdateNode::literal(literal.value.clone()));
                }
            }
        }

        self.base_mut().emit_replication_guide = guides;

        Ok((dims.len(), literals))
    }

    /// Declares the forward-referenced names read by the chain.
    #[doc(hidden)]
    fn probe_chain(&mut self, segments: &[&AstNode]) -> CompileResult<()> {
        for segment in segments {
            match segment {
                AstNode::Identifier(ident) if segments.len() == 1 => {
                    self.probe_identifier(ident)?;
                }

                AstNode::FunctionCall(call) => {
                    for arg in &call.args {
                        let _ = self.emit_expression(arg, None, SubCompilePass::UnboundIdentifier)?;
                    }
                }

                _ => (),
            }
        }

        Ok(())
    }

    #[doc(hidden)]
    fn probe_identifier(&mut self, ident: &IdentifierNode) -> CompileResult<()> {
        for dim in &ident.dims {
            let _ = self.emit_expression(dim, None, SubCompilePass::UnboundIdentifier)?;
        }

        let base = self.base_mut();

        if ident.is_this() || !base.forward_names.contains(&ident.name) {
            return Ok(());
        }

        let resolution =
            base.verify_allocation(&ident.name, base.scope.class_scope, base.scope.function_index());

        if resolution != Resolution::Unbound || base.session.classes.index_of(&ident.name).is_some() {
            return Ok(());
        }

        let _ = base.allocate_variable(Declaration::new(ident.name.clone(), Type::default()));

        Ok(())
    }

    /// Stores the top of the stack into the assignment `target`.
    ///
    /// Returns the updated chain.
    fn emit_assignment_target(
        &mut self,
        target: &AstNode,
        value_ty: Type,
        graph: Option<&mut GraphNode>,
    ) -> CompileResult<UpdateNodeRef> {
        match target {
            AstNode::Identifier(ident) if !ident.is_this() => self.emit_identifier_store(ident, value_ty, graph),
            AstNode::IdentifierList(list) => self.emit_getter_setter_for_ident_list(list, graph),

            other => Err(self.base_mut().session.log_semantic_error(
                IssueCode::InvalidAssignmentTarget,
                "Only identifiers and member accesses can be assigned.",
                other.span(),
            )),
        }
    }

    #[doc(hidden)]
    fn emit_identifier_store(
        &mut self,
        ident: &IdentifierNode,
        value_ty: Type,
        mut graph: Option<&mut GraphNode>,
    ) -> CompileResult<UpdateNodeRef> {
        let base = self.base_mut();

        let resolution =
            base.verify_allocation(&ident.name, base.scope.class_scope, base.scope.function_index());

        let symbol_ref = match resolution {
            Resolution::Found(symbol) => symbol,

            Resolution::Inaccessible(..) | Resolution::Unbound => {
                if let Resolution::Inaccessible(..) = resolution {
                    base.session.log_warning(
                        IssueCode::PropertyInaccessible,
                        format_compact!("Property '{}' is inaccessible.", ident.name),
                        ident.span,
                    );
                }

                let ty = match value_ty.uid == INVALID_TYPE || value_ty.is(PrimitiveType::Null) {
                    true => Type::default(),
                    false => value_ty,
                };

                base.allocate_variable(Declaration::new(ident.name.clone(), ty))
            }
        };

        let Some(symbol) = base.symbol(symbol_ref).cloned() else {
            system_panic!("Missing symbol {symbol_ref:?}.");
        };

        let (dims, literals) = self.emit_dims(&ident.dims, graph.as_deref_mut(), SubCompilePass::None)?;

        if dims > 0 {
            if let Some(graph) = graph.as_deref_mut() {
                graph.set_indexing_lhs(true);

                for literal in &literals {
                    graph.push_dimension(literal.clone());
                }
            }

            self.base_mut().mirror_ssa_dimensions(&literals, true);
        }

        let _ = self.base_mut().emit_store(&symbol, dims, ident.span);

        let mut updated = UpdateNodeRef::new();

        updated.push(UpdateNode::symbol(ident.name.clone(), Some(symbol_ref), symbol.class_scope));

        Ok(updated)
    }

    /// Stores the top of the stack into the last segment of a member chain.
    ///
    /// If `use_setter` is set and the receiver class has a setter of the
    /// property, the store is collapsed into the setter call.
    fn emit_member_store(
        &mut self,
        target: &IdentifierListNode,
        mut graph: Option<&mut GraphNode>,
        use_setter: bool,
    ) -> CompileResult<UpdateNodeRef> {
        let segments = match flatten_chain(target) {
            Ok(segments) => segments,

            Err(span) => {
                return Err(self.base_mut().session.log_semantic_error(
                    IssueCode::InvalidIndirection,
                    "Only the '.' operator may join the segments of an identifier list.",
                    span,
                ))
            }
        };

        expect_segments(segments.len());

        let Some((AstNode::Identifier(property), prefix)) = segments.split_last() else {
            return Err(self.base_mut().session.log_semantic_error(
                IssueCode::InvalidAssignmentTarget,
                "The last segment of an assigned member access must be an identifier.",
                target.span,
            ));
        };

        let span = target.span;
        let mut cursor = ChainCursor::new(false);

        for segment in prefix {
            if cursor.stopped {
                break;
            }

            match &*unwrap_segment(segment) {
                AstNode::Identifier(ident) => self.emit_identifier_segment(ident, &mut cursor, None)?,

                AstNode::FunctionCall(call) => {
                    self.traverse_function_call(call, &mut cursor, None, SubCompilePass::None)?
                }

                other => {
                    return Err(self.base_mut().session.log_semantic_error(
                        IssueCode::NonIdentifierSegment,
                        "A member access segment must be an identifier or a call.",
                        other.span(),
                    ))
                }
            }
        }

        let start_scope = self.base().scope.class_scope;

        if cursor.stopped {
            let _ = self.base_mut().emit_poplist(cursor.depth, start_scope, span);

            return Ok(cursor.chain);
        }

        let class = cursor.receiver_class();

        if let (true, Some(class), true) = (use_setter, class, property.dims.is_empty()) {
            let base = self.base_mut();
            let setter = base.session.classes.lookup_procedure(
                class,
                &setter_name(&property.name),
                1,
                base.scope.class_scope,
            );

            if let MemberLookup::Found(member) = setter {
                let _ = base.emit_call(
                    ProcRef {
                        class_scope: Some(member.owner),
                        index: member.index,
                    },
                    cursor.depth,
                    span,
                );

                cursor.track(UpdateNode::symbol(property.name.clone(), None, Some(member.owner)));

                return Ok(cursor.chain);
            }
        }

        let resolution = match class {
            Some(class) => self.base().lookup_class_member(class, &property.name),
            None => Resolution::Unbound,
        };

        let (dims, literals) = self.emit_dims(&property.dims, graph.as_deref_mut(), SubCompilePass::None)?;

        if dims > 0 {
            if let Some(graph) = graph.as_deref_mut() {
                graph.set_indexing_lhs(true);

                for literal in &literals {
                    graph.push_dimension(literal.clone());
                }
            }
        }

        let base = self.base_mut();

        if dims > 0 {
            let _ = base.emit_push_dims(dims);
        }

        match resolution {
            Resolution::Found(symbol_ref) => {
                let Some(symbol) = base.symbol(symbol_ref).cloned() else {
                    system_panic!("Missing symbol {symbol_ref:?}.");
                };

                let _ = base.emit_pushm(CodeGen::build_operand(&symbol), symbol.class_scope, span);

                cursor.track(UpdateNode::symbol(property.name.clone(), Some(symbol_ref), symbol.class_scope));
            }

            Resolution::Inaccessible(..) => {
                base.session.log_warning(
                    IssueCode::PropertyInaccessible,
                    format_compact!("Property '{}' is inaccessible.", property.name),
                    property.span,
                );

                let _ = base.emit_push_null(property.span);
            }

            Resolution::Unbound => {
                if class.is_some() {
                    base.warn_unbound(&property.name, property.span);
                }

                let index = base.register_dynamic_variable(&property.name, &mut cursor);
                let class_scope = base.scope.class_scope;

                let _ = base.emit_pushm(Operand::Dynamic(index), class_scope, span);

                cursor.track(UpdateNode::symbol(property.name.clone(), None, None));
            }
        }

        let _ = base.emit_poplist(cursor.depth + 1, start_scope, span);

        Ok(cursor.chain)
    }
}

impl<'s, G: CodeGenerator<'s>> Resolver<'s> for G {}

#[cfg(test)]
mod tests {
    use crate::{
        analysis::IssueCode,
        graph::GraphNode,
        interpret::{BlockKind, Language, OpCode, Operand},
        runtime::{getter_name, ClassNode, PrimitiveType, ProcedureNode, Type},
        semantics::{
            allocator::Declaration,
            associative::AssociativeCodeGen,
            generator::{CodeGenerator, SubCompilePass},
            resolver::Resolver,
            scope::ScopeFrame,
            CompileOptions,
            CompileSession,
        },
        syntax::{AstNode, FunctionCallNode, GroupExpressionNode, IdentifierNode, LiteralNode},
    };

    fn session() -> CompileSession {
        let mut session = CompileSession::new(CompileOptions::new());

        let _ = session.new_block(BlockKind::Global, Language::Associative, None);

        session
    }

    // Declares `class A { b: B }`, `class B { c: int }`, and a global `a: A`.
    fn declare_shapes(session: &mut CompileSession) {
        let a = session.classes.append(ClassNode::new("A")).unwrap();
        let b = session.classes.append(ClassNode::new("B")).unwrap();

        let mut codegen = AssociativeCodeGen::new(session, 0, ScopeFrame::in_class(a));

        let _ = codegen.base_mut().allocate_variable(Declaration::new("b", Type::scalar(b)));

        codegen.base_mut().scope = ScopeFrame::in_class(b);

        let _ = codegen
            .base_mut()
            .allocate_variable(Declaration::new("c", Type::primitive(PrimitiveType::Int)));

        codegen.base_mut().scope = ScopeFrame::global();

        let _ = codegen.base_mut().allocate_variable(Declaration::new("a", Type::scalar(a)));
    }

    fn chain(names: &[&str]) -> AstNode {
        AstNode::dotted(names.iter().map(|name| IdentifierNode::new(*name))).unwrap()
    }

    #[test]
    fn test_static_chain() {
        let mut session = session();

        declare_shapes(&mut session);

        let mut codegen = AssociativeCodeGen::new(&mut session, 0, ScopeFrame::global());

        let ty = codegen
            .emit_expression(&chain(&["a", "b", "c"]), None, SubCompilePass::None)
            .unwrap();

        assert!(ty.is(PrimitiveType::Int));

        let stream = session.block(0).unwrap().instructions();

        assert_eq!(stream.len(), 4);
        assert!(stream[..3].iter().all(|instruction| instruction.opcode == OpCode::PushM));
        assert!(stream[..3].iter().all(|instruction| !matches!(instruction.op1, Some(Operand::Dynamic(..)))));
        assert_eq!(stream[3].opcode, OpCode::PushList);
        assert_eq!(stream[3].op1, Some(Operand::Int(3)));
        assert!(session.dynamic_variables.is_empty());
    }

    #[test]
    fn test_late_bound_segment() {
        let mut session = session();

        declare_shapes(&mut session);

        let mut codegen = AssociativeCodeGen::new(&mut session, 0, ScopeFrame::global());

        let ty = codegen
            .emit_expression(&chain(&["a", "q"]), None, SubCompilePass::None)
            .unwrap();

        assert!(ty.is(PrimitiveType::Var));

        let stream = session.block(0).unwrap().instructions();

        assert_eq!(stream[1].opcode, OpCode::PushM);
        assert_eq!(stream[1].op1, Some(Operand::Dynamic(0)));
        assert_eq!(stream[2].op1, Some(Operand::Int(2)));
        assert_eq!(session.dynamic_variables.len(), 1);
        assert_eq!(session.dynamic_variables.get(0).unwrap().name, "q");
        assert!(session.diagnostics().contains(IssueCode::UnboundIdentifier));
    }

    #[test]
    fn test_late_bound_cascade() {
        let mut session = session();

        declare_shapes(&mut session);

        let mut codegen = AssociativeCodeGen::new(&mut session, 0, ScopeFrame::global());

        let ty = codegen
            .emit_expression(&chain(&["a", "q", "c"]), None, SubCompilePass::None)
            .unwrap();

        assert!(ty.is(PrimitiveType::Var));

        let stream = session.block(0).unwrap().instructions();

        assert_eq!(stream.len(), 4);
        assert_eq!(stream[1].op1, Some(Operand::Dynamic(0)));
        assert_eq!(stream[2].op1, Some(Operand::Dynamic(0)));
        assert_eq!(stream[3].op1, Some(Operand::Int(3)));

        assert_eq!(session.dynamic_variables.len(), 1);

        let entry = session.dynamic_variables.get(0).unwrap();

        assert_eq!(entry.name, "q");
        assert_eq!(entry.members.len(), 1);
        assert_eq!(entry.members[0], "c");
        assert_eq!(session.diagnostics().count(IssueCode::UnboundIdentifier), 1);
    }

    #[test]
    fn test_grouped_segments() {
        let mut session = session();

        declare_shapes(&mut session);

        let mut codegen = AssociativeCodeGen::new(&mut session, 0, ScopeFrame::global());

        let uid = codegen.base_mut().session.next_graph_uid();
        let mut graph = GraphNode::new(uid, 0);

        let root = AstNode::dotted([
            AstNode::from(GroupExpressionNode::new(IdentifierNode::new("a"))),
            AstNode::from(IdentifierNode::new("b")),
        ])
        .unwrap();

        let _ = codegen
            .emit_expression(&root, Some(&mut graph), SubCompilePass::None)
            .unwrap();

        assert!(graph.depends_on_path(&["a", "b"]));

        let inner = AstNode::dotted([
            AstNode::from(IdentifierNode::new("a")),
            AstNode::from(GroupExpressionNode::new(IdentifierNode::new("b"))),
            AstNode::from(IdentifierNode::new("c")),
        ])
        .unwrap();

        let ty = codegen.emit_expression(&inner, None, SubCompilePass::None).unwrap();

        assert!(ty.is(PrimitiveType::Int));
        assert!(!session.diagnostics().contains(IssueCode::NonIdentifierSegment));
        assert!(session.dynamic_variables.is_empty());
    }

    #[test]
    fn test_getter_call_as_member() {
        let mut session = session();

        declare_shapes(&mut session);

        let mut codegen = AssociativeCodeGen::new(&mut session, 0, ScopeFrame::global());

        let uid = codegen.base_mut().session.next_graph_uid();
        let mut graph = GraphNode::new(uid, 0);

        let access = AstNode::dotted([
            AstNode::from(IdentifierNode::new("a")),
            AstNode::from(IdentifierNode::new("b")),
            AstNode::from(FunctionCallNode::new(getter_name("c"), Vec::<AstNode>::new())),
        ])
        .unwrap();

        let ty = codegen
            .emit_expression(&access, Some(&mut graph), SubCompilePass::None)
            .unwrap();

        assert!(ty.is(PrimitiveType::Int));
        assert!(graph.depends_on_path(&["a", "b", "c"]));
        assert!(session.dynamic_functions.is_empty());
        assert!(!session.diagnostics().contains(IssueCode::FunctionNotFound));
    }

    #[test]
    fn test_instance_method_on_class() {
        let mut session = session();

        declare_shapes(&mut session);

        let class = session.classes.index_of("A").unwrap();

        let _ = session.classes.append_procedure(class, ProcedureNode::new("make"));

        let _ = session.classes.append_procedure(
            class,
            ProcedureNode::new("make").with_arg("x", Type::default()).with_static(true),
        );

        let mut codegen = AssociativeCodeGen::new(&mut session, 0, ScopeFrame::global());

        let call = AstNode::dotted([
            AstNode::from(IdentifierNode::new("A")),
            AstNode::from(FunctionCallNode::new("make", Vec::<AstNode>::new())),
        ])
        .unwrap();

        let ty = codegen.emit_expression(&call, None, SubCompilePass::None).unwrap();

        assert!(ty.is(PrimitiveType::Null));

        let warning = session
            .diagnostics()
            .iter()
            .find(|diagnostic| diagnostic.code == IssueCode::CallingNonStaticOnClass)
            .unwrap();

        assert_eq!(warning.message, "Method 'make' is called with invalid arguments.");
    }

    #[test]
    fn test_unbound_root() {
        let mut session = session();
        let mut codegen = AssociativeCodeGen::new(&mut session, 0, ScopeFrame::global());

        for _ in 0..2 {
            let ty = codegen
                .emit_expression(&IdentifierNode::new("ghost").into(), None, SubCompilePass::None)
                .unwrap();

            assert!(ty.is(PrimitiveType::Null));
        }

        let stream = session.block(0).unwrap().instructions();

        assert_eq!(stream.len(), 2);
        assert!(stream.iter().all(|instruction| instruction.op1 == Some(Operand::Null)));
        assert_eq!(session.diagnostics().count(IssueCode::UnboundIdentifier), 2);
        assert!(session.dynamic_variables.is_empty());
    }

    #[test]
    fn test_subscripted_read() {
        let mut session = session();
        let mut codegen = AssociativeCodeGen::new(&mut session, 0, ScopeFrame::global());

        let _ = codegen.base_mut().allocate_variable(Declaration::new(
            "a",
            Type::array(PrimitiveType::Int.uid(), 2),
        ));

        let node = IdentifierNode::new("a").with_dims([LiteralNode::int("1"), LiteralNode::int("2")]);

        let uid = codegen.base_mut().session.next_graph_uid();
        let mut graph = GraphNode::new(uid, 0);

        let ty = codegen
            .emit_expression(&node.into(), Some(&mut graph), SubCompilePass::None)
            .unwrap();

        assert_eq!(ty.rank, 0);
        assert!(ty.is(PrimitiveType::Int));

        let stream = session.block(0).unwrap().instructions();

        assert_eq!(stream[0].op1, Some(Operand::Int(1)));
        assert_eq!(stream[1].op1, Some(Operand::Int(2)));
        assert_eq!(stream[2].opcode, OpCode::Push);
        assert_eq!(stream[2].op3, Some(Operand::ArrayDim(2)));

        let dependency = &graph.dependencies()[0];

        assert!(dependency.is_rooted_at("a"));
        assert_eq!(dependency.nodes[0].dimensions.len(), 2);
    }

    #[test]
    fn test_array_receiver() {
        let mut session = session();

        declare_shapes(&mut session);

        let mut codegen = AssociativeCodeGen::new(&mut session, 0, ScopeFrame::global());

        let _ = codegen.base_mut().allocate_variable(Declaration::new(
            "points",
            Type::array(PrimitiveType::Var.uid(), 1),
        ));

        let uid = codegen.base_mut().session.next_graph_uid();
        let mut graph = GraphNode::new(uid, 0);

        let ty = codegen
            .emit_expression(&chain(&["points", "x"]), Some(&mut graph), SubCompilePass::None)
            .unwrap();

        assert!(ty.is(PrimitiveType::Null));
        assert_eq!(graph.dependencies()[0].len(), 1);

        let stream = session.block(0).unwrap().instructions();

        assert_eq!(stream[1].op1, Some(Operand::Null));
        assert!(session.dynamic_variables.is_empty());
    }

    #[test]
    fn test_unexpected_statement() {
        let mut session = session();
        let mut codegen = AssociativeCodeGen::new(&mut session, 0, ScopeFrame::global());

        let error = codegen
            .emit_expression(&AstNode::Break(Default::default()), None, SubCompilePass::None)
            .unwrap_err();

        assert_eq!(error.code(), Some(IssueCode::UnexpectedStatement));
    }
}
