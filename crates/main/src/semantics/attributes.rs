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
    analysis::IssueCode,
    runtime::AttributeEntry,
    semantics::assembler::CodeGen,
    syntax::{AstNode, FunctionCallNode, LiteralKind},
};

/// The suffix of the class names implementing attributes.
pub(super) const ATTRIBUTE_SUFFIX: &str = "Attribute";

impl<'s> CodeGen<'s> {
    /// Resolves the attribute list of a class or a procedure.
    ///
    /// Malformed attributes are reported and left out of the list.
    pub(super) fn populate_attributes(&mut self, attributes: &[FunctionCallNode]) -> Vec<AttributeEntry> {
        attributes
            .iter()
            .filter_map(|attribute| self.populate_attribute(attribute))
            .collect()
    }

    /// Resolves one attribute `[Name(args)]` to the class `NameAttribute`.
    ///
    /// The arguments must be constant and must match one of the class
    /// constructors.
    fn populate_attribute(&mut self, attribute: &FunctionCallNode) -> Option<AttributeEntry> {
        let name = attribute.name();
        let class_name = format_compact!("{name}{ATTRIBUTE_SUFFIX}");

        let Some(class) = self.session.classes.index_of(&class_name) else {
            self.session.log_recoverable_error(
                IssueCode::UnknownAttribute,
                format_compact!("Unknown attribute '{name}'."),
                attribute.span,
            );

            return None;
        };

        if let Some(arg) = attribute.args.iter().find(|arg| !is_constant_expression(arg)) {
            self.session.log_recoverable_error(
                IssueCode::NonConstantAttributeArgument,
                format_compact!("Arguments of attribute '{name}' must be constant."),
                arg.span(),
            );

            return None;
        }

        let arity = attribute.args.len();

        let matched = self.session.classes.get(class).map_or(false, |node| {
            node.procedures
                .iter()
                .any(|procedure| procedure.is_constructor && procedure.accepts_arity(arity))
        });

        if !matched {
            self.session.log_recoverable_error(
                IssueCode::AttributeArityMismatch,
                format_compact!("No constructor of attribute '{name}' takes {arity} argument(s)."),
                attribute.span,
            );

            return None;
        }

        Some(AttributeEntry {
            class_index: class,
            args: attribute.args.clone(),
        })
    }
}

/// Returns true if the expression consists of literals only.
///
/// Character literals are not constant.
pub(super) fn is_constant_expression(node: &AstNode) -> bool {
    match node {
        AstNode::Literal(literal) => literal.kind != LiteralKind::Char,
        AstNode::ExprList(list) => list.dims.is_empty() && list.items.iter().all(is_constant_expression),
        AstNode::Group(group) => group.dims.is_empty() && is_constant_expression(&group.expr),
        AstNode::Unary(unary) => is_constant_expression(&unary.expr),

        AstNode::Binary(binary) => {
            is_constant_expression(&binary.left) && is_constant_expression(&binary.right)
        }

        AstNode::Range(range) => {
            is_constant_expression(&range.from)
                && is_constant_expression(&range.to)
                && range.step.as_deref().map_or(true, is_constant_expression)
        }

        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        analysis::IssueCode,
        interpret::{BlockKind, Language},
        runtime::{ClassNode, ProcedureNode, Type},
        semantics::{
            assembler::CodeGen,
            attributes::is_constant_expression,
            scope::ScopeFrame,
            CompileOptions,
            CompileSession,
        },
        syntax::{
            AstNode,
            BinaryExpressionNode,
            ExprListNode,
            FunctionCallNode,
            IdentifierNode,
            LiteralNode,
            Operator,
            RangeExprNode,
            UnaryExpressionNode,
            UnaryOperator,
        },
    };

    fn session() -> CompileSession {
        let mut session = CompileSession::new(CompileOptions::new());

        let _ = session.new_block(BlockKind::Global, Language::Associative, None);

        let class = session.classes.append(ClassNode::new("CategoryAttribute")).unwrap();

        let _ = session.classes.append_procedure(
            class,
            ProcedureNode::new("CategoryAttribute")
                .with_arg("name", Type::default())
                .constructor(),
        );

        let class = session.classes.append(ClassNode::new("HiddenAttribute")).unwrap();

        let _ = session
            .classes
            .append_procedure(class, ProcedureNode::new("HiddenAttribute").constructor());

        let _ = session.classes.append(ClassNode::new("MarkerAttribute")).unwrap();

        session
    }

    #[test]
    fn test_attribute_resolution() {
        let mut session = session();
        let mut codegen = CodeGen::new(&mut session, 0, ScopeFrame::global());

        let entries = codegen.populate_attributes(&[
            FunctionCallNode::new("Category", [LiteralNode::string("geometry")]),
            FunctionCallNode::new("Hidden", Vec::<AstNode>::new()),
        ]);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].args.len(), 1);
        assert!(session.diagnostics().is_empty());
    }

    #[test]
    fn test_malformed_attributes() {
        let mut session = session();
        let mut codegen = CodeGen::new(&mut session, 0, ScopeFrame::global());

        let entries = codegen.populate_attributes(&[
            FunctionCallNode::new("Missing", Vec::<AstNode>::new()),
            FunctionCallNode::new("Hidden", [LiteralNode::int("1")]),
            FunctionCallNode::new("Marker", Vec::<AstNode>::new()),
            FunctionCallNode::new("Category", [LiteralNode::string("kept")]),
        ]);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].args.len(), 1);

        let diagnostics = session.diagnostics();

        assert!(diagnostics.contains(IssueCode::UnknownAttribute));
        assert_eq!(diagnostics.count(IssueCode::AttributeArityMismatch), 2);
    }

    #[test]
    fn test_non_constant_argument() {
        let mut session = session();
        let mut codegen = CodeGen::new(&mut session, 0, ScopeFrame::global());

        let nested = ExprListNode::new([
            AstNode::from(LiteralNode::int("1")),
            AstNode::from(IdentifierNode::new("x")),
        ]);

        assert!(!is_constant_expression(&nested.clone().into()));
        assert!(!is_constant_expression(&LiteralNode::char("c").into()));

        let range = RangeExprNode::new(LiteralNode::int("1"), LiteralNode::int("10"))
            .with_step(UnaryExpressionNode::new(UnaryOperator::Neg, LiteralNode::int("2")));

        assert!(is_constant_expression(&range.into()));
        assert!(is_constant_expression(
            &BinaryExpressionNode::new(LiteralNode::int("1"), Operator::Add, LiteralNode::int("2")).into(),
        ));

        let entries = codegen.populate_attributes(&[
            FunctionCallNode::new("Category", [nested]),
            FunctionCallNode::new("Category", [LiteralNode::char("c")]),
        ]);

        assert!(entries.is_empty());
        assert_eq!(session.diagnostics().count(IssueCode::NonConstantAttributeArgument), 2);
    }
}
