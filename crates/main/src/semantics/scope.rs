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
    graph::{SymbolOwner, SymbolRef},
    interpret::BlockId,
    runtime::{ClassIndex, MemberLookup, PrimitiveType, ProcIndex, ProcRef, SymbolNode},
    semantics::{assembler::CodeGen, ExecMode},
};

/// The lexical context of the code being lowered.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub(super) struct ScopeFrame {
    /// The class whose members are being lowered.
    pub(super) class_scope: Option<ClassIndex>,

    /// The procedure whose body (or a nested block of it) is being lowered.
    pub(super) procedure: Option<ProcRef>,

    /// The code block of that procedure's body.
    pub(super) function_block: Option<BlockId>,
}

impl ScopeFrame {
    #[inline(always)]
    pub(super) fn global() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub(super) fn in_class(class_scope: ClassIndex) -> Self {
        Self {
            class_scope: Some(class_scope),
            procedure: None,
            function_block: None,
        }
    }

    #[inline(always)]
    pub(super) fn in_procedure(self, procedure: ProcRef, function_block: BlockId) -> Self {
        Self {
            class_scope: self.class_scope,
            procedure: Some(procedure),
            function_block: Some(function_block),
        }
    }

    #[inline(always)]
    pub(super) fn function_index(&self) -> Option<ProcIndex> {
        self.procedure.map(|procedure| procedure.index)
    }

    /// Returns true if `block` is the body of the frame's procedure.
    #[inline(always)]
    pub(super) fn is_function_body(&self, block: BlockId) -> bool {
        self.function_block == Some(block)
    }
}

/// A result of a symbol lookup.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(super) enum Resolution {
    Found(SymbolRef),

    /// The member is declared, but its access modifier hides it.
    Inaccessible(SymbolRef),

    Unbound,
}

impl<'s> CodeGen<'s> {
    #[inline(always)]
    pub(super) fn inside_function(&self) -> bool {
        self.scope.procedure.is_some()
    }

    /// Returns true if the current block is a language block nested in a
    /// procedure body.
    pub(super) fn is_in_language_block_defined_in_function(&self) -> bool {
        self.inside_function() && !self.scope.is_function_body(self.block)
    }

    pub(super) fn symbol(&self, symbol: SymbolRef) -> Option<&SymbolNode> {
        match symbol.owner {
            SymbolOwner::Block(block) => self.session.block(block)?.symbols().get(symbol.index),
            SymbolOwner::Class(class) => self.session.classes.get(class)?.symbols.get(symbol.index),
        }
    }

    /// Looks up a symbol visible from the current block.
    ///
    /// The lookup order is:
    ///
    /// 1. The own table of a language block nested in a procedure.
    /// 2. The procedure's locals, in the expression interpreter mode.
    /// 3. The members of `class_scope` and its base classes.
    /// 4. The procedure's locals.
    /// 5. The tables of the current block and its ancestors.
    pub(super) fn verify_allocation(
        &self,
        name: &str,
        class_scope: Option<ClassIndex>,
        function: Option<ProcIndex>,
    ) -> Resolution {
        if self.is_in_language_block_defined_in_function() {
            if let Some(index) = self.find_in_block(self.block, name, function) {
                return Resolution::Found(SymbolRef {
                    owner: SymbolOwner::Block(self.block),
                    index,
                });
            }
        }

        if class_scope == Some(PrimitiveType::Void.uid()) {
            return Resolution::Unbound;
        }

        if self.session.exec_mode == ExecMode::ExpressionInterpreter {
            if let Some(found) = self.find_in_function(name, function) {
                return Resolution::Found(found);
            }
        }

        if let Some(class) = class_scope {
            let resolution = self.lookup_class_member(class, name);

            if resolution != Resolution::Unbound {
                return resolution;
            }
        }

        if let Some(found) = self.find_in_function(name, function) {
            return Resolution::Found(found);
        }

        let mut current = Some(self.block);

        while let Some(block) = current {
            if let Some(index) = self.find_in_block(block, name, function) {
                return Resolution::Found(SymbolRef {
                    owner: SymbolOwner::Block(block),
                    index,
                });
            }

            current = self.session.code_block(block).parent;
        }

        Resolution::Unbound
    }

    /// Looks up a member variable of `class` visible from the current class
    /// scope.
    ///
    /// Static members are redirected to their mirrors in the global block.
    pub(super) fn lookup_class_member(&self, class: ClassIndex, name: &str) -> Resolution {
        let member = match self.session.classes.lookup_member(class, name, self.scope.class_scope) {
            MemberLookup::Missing => return Resolution::Unbound,

            MemberLookup::Inaccessible(member) => {
                return Resolution::Inaccessible(SymbolRef {
                    owner: SymbolOwner::Class(member.owner),
                    index: member.index,
                })
            }

            MemberLookup::Found(member) => member,
        };

        let is_static = self
            .session
            .classes
            .get(member.owner)
            .and_then(|class| class.symbols.get(member.index))
            .map(|symbol| symbol.is_static)
            .unwrap_or(false);

        if is_static {
            if let Some(index) = self.static_mirror(member.owner, name) {
                return Resolution::Found(SymbolRef {
                    owner: SymbolOwner::Block(0),
                    index,
                });
            }
        }

        Resolution::Found(SymbolRef {
            owner: SymbolOwner::Class(member.owner),
            index: member.index,
        })
    }

    /// Returns the global block's entry of a static member of `class`.
    pub(super) fn static_mirror(&self, class: ClassIndex, name: &str) -> Option<usize> {
        let symbols = self.session.block(0)?.symbols();

        symbols.indices_of(name).iter().copied().find(|index| {
            symbols
                .get(*index)
                .map(|symbol| symbol.is_static && symbol.class_scope == Some(class))
                .unwrap_or(false)
        })
    }

    fn find_in_function(&self, name: &str, function: Option<ProcIndex>) -> Option<SymbolRef> {
        let function = function?;
        let block = self.scope.function_block?;

        let index = self
            .session
            .code_block(block)
            .symbols
            .index_of_in_function(name, Some(function))?;

        Some(SymbolRef {
            owner: SymbolOwner::Block(block),
            index,
        })
    }

    fn find_in_block(&self, block: BlockId, name: &str, function: Option<ProcIndex>) -> Option<usize> {
        let symbols = &self.session.code_block(block).symbols;

        symbols.indices_of(name).iter().copied().find(|index| {
            let Some(symbol) = symbols.get(*index) else {
                return false;
            };

            if symbol.is_member_variable() {
                return false;
            }

            if self.session.parsing_module && symbol.extern_lib.is_some() {
                return false;
            }

            symbol.function_index.is_none() || symbol.function_index == function
        })
    }

    /// Returns the names of the symbols visible from the current block.
    pub(super) fn visible_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut current = Some(self.block);

        while let Some(block) = current {
            let block = self.session.code_block(block);

            for symbol in block.symbols.iter() {
                if symbol.is_member_variable() || symbol.is_temporary() {
                    continue;
                }

                names.push(symbol.name.as_str());
            }

            current = block.parent;
        }

        if let Some(class) = self.scope.class_scope.and_then(|class| self.session.classes.get(class)) {
            names.extend(class.symbols.iter().map(|symbol| symbol.name.as_str()));
        }

        names
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        graph::{SymbolOwner, SymbolRef},
        interpret::{BlockKind, Language},
        runtime::{AccessModifier, ClassNode, PrimitiveType, ProcRef, SymbolNode, Type},
        semantics::{
            assembler::CodeGen,
            scope::{Resolution, ScopeFrame},
            CompileOptions,
            CompileSession,
        },
    };

    #[test]
    fn test_lookup_order() {
        let mut session = CompileSession::new(CompileOptions::new());

        let global = session.new_block(BlockKind::Global, Language::Associative, None);
        let body = session.new_block(BlockKind::Function, Language::Associative, Some(global));
        let nested = session.new_block(BlockKind::Language, Language::Imperative, Some(body));

        let _ = session
            .code_block_mut(global)
            .symbols
            .append(SymbolNode::new("a", Type::default()));
        let _ = session
            .code_block_mut(body)
            .symbols
            .append(SymbolNode::new("a", Type::default()).in_function(Some(0)));
        let _ = session
            .code_block_mut(nested)
            .symbols
            .append(SymbolNode::new("b", Type::default()).in_function(Some(0)));
        let _ = session
            .code_block_mut(global)
            .symbols
            .append(SymbolNode::new("lib", Type::default()));

        session.code_block_mut(global).symbols.get_mut(1).unwrap().extern_lib = Some("geometry".into());

        let frame = ScopeFrame::global().in_procedure(
            ProcRef {
                class_scope: None,
                index: 0,
            },
            body,
        );

        let mut codegen = CodeGen::new(&mut session, nested, frame);

        assert!(codegen.is_in_language_block_defined_in_function());

        assert_eq!(
            codegen.verify_allocation("b", None, Some(0)),
            Resolution::Found(SymbolRef {
                owner: SymbolOwner::Block(nested),
                index: 0,
            }),
        );

        assert_eq!(
            codegen.verify_allocation("a", None, Some(0)),
            Resolution::Found(SymbolRef {
                owner: SymbolOwner::Block(body),
                index: 0,
            }),
        );

        assert_eq!(
            codegen.verify_allocation("a", None, None),
            Resolution::Found(SymbolRef {
                owner: SymbolOwner::Block(global),
                index: 0,
            }),
        );

        assert!(matches!(codegen.verify_allocation("lib", None, None), Resolution::Found(..)));
        assert_eq!(codegen.verify_allocation("c", None, Some(0)), Resolution::Unbound);

        codegen.session.set_parsing_module(true);

        assert_eq!(codegen.verify_allocation("lib", None, None), Resolution::Unbound);
    }

    #[test]
    fn test_class_members() {
        let mut session = CompileSession::new(CompileOptions::new());

        let global = session.new_block(BlockKind::Global, Language::Associative, None);

        let class = session.classes.len();
        let mut node = ClassNode::new("Counter");

        let _ = node.symbols.append(
            SymbolNode::new("value", Type::primitive(PrimitiveType::Int))
                .in_class(Some(class))
                .with_access(AccessModifier::Private),
        );
        let _ = node.symbols.append(
            SymbolNode::new("total", Type::default())
                .in_class(Some(class))
                .with_static(true),
        );

        assert_eq!(session.classes.append(node), Some(class));

        let _ = session.code_block_mut(global).symbols.append(
            SymbolNode::new("total", Type::default())
                .in_class(Some(class))
                .with_static(true),
        );

        let outside = CodeGen::new(&mut session, global, ScopeFrame::global());

        assert!(matches!(
            outside.lookup_class_member(class, "value"),
            Resolution::Inaccessible(..),
        ));

        assert_eq!(
            outside.lookup_class_member(class, "total"),
            Resolution::Found(SymbolRef {
                owner: SymbolOwner::Block(global),
                index: 0,
            }),
        );

        let inside = CodeGen::new(&mut session, global, ScopeFrame::in_class(class));

        assert_eq!(
            inside.verify_allocation("value", Some(class), None),
            Resolution::Found(SymbolRef {
                owner: SymbolOwner::Class(class),
                index: 0,
            }),
        );

        assert_eq!(
            inside.verify_allocation("value", Some(PrimitiveType::Void.uid()), None),
            Resolution::Unbound,
        );
    }
}
