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

use compact_str::{format_compact, CompactString};

use crate::{
    graph::{SymbolOwner, SymbolRef},
    report::system_panic,
    runtime::{AccessModifier, ClassIndex, MemoryRegion, SymbolNode, Type, POINTER_SIZE},
    semantics::{assembler::CodeGen, ExecMode},
};

/// The number of stack slots occupied by a call frame header.
///
/// Procedure locals are addressed below the header.
pub(super) const STACK_FRAME_SIZE: usize = 12;

/// A declaration request passed to the allocator.
#[derive(Clone, Debug)]
pub(super) struct Declaration {
    pub(super) name: CompactString,
    pub(super) ty: Type,
    pub(super) region: MemoryRegion,
    pub(super) is_static: bool,
    pub(super) access: AccessModifier,
    pub(super) is_argument: bool,
}

impl Declaration {
    pub(super) fn new(name: impl Into<CompactString>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            region: MemoryRegion::Stack,
            is_static: false,
            access: AccessModifier::Public,
            is_argument: false,
        }
    }

    #[inline(always)]
    pub(super) fn argument(mut self) -> Self {
        self.is_argument = true;
        self
    }
}

/// The allocation bucket of a symbol.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Bucket {
    Watch,
    Local,
    ClassStatic(ClassIndex),
    ClassInstance(ClassIndex),
    Global,
}

impl<'s> CodeGen<'s> {
    /// Declares a new symbol in the current scope and assigns its address.
    ///
    /// Member variables are declared in the class table (static members are
    /// mirrored in the global block), all other symbols in the current
    /// block's table.
    pub(super) fn allocate_variable(&mut self, declaration: Declaration) -> SymbolRef {
        let class_scope = self.scope.class_scope;
        let function_index = self.scope.function_index();

        let mut symbol = SymbolNode::new(declaration.name, declaration.ty)
            .in_class(class_scope)
            .in_function(function_index)
            .with_region(declaration.region)
            .with_static(declaration.is_static)
            .with_access(declaration.access);

        symbol.is_argument = declaration.is_argument;
        symbol.runtime_table_index = self.block;

        if symbol.region == MemoryRegion::Heap {
            symbol.heap_index = Some(self.session.counters.heap);
            symbol.size = POINTER_SIZE;

            self.session.counters.heap += 1;
        }

        let bucket = match (self.session.exec_mode, class_scope, function_index) {
            (ExecMode::ExpressionInterpreter, _, _) => Bucket::Watch,
            (_, _, Some(_)) => Bucket::Local,
            (_, Some(class), None) if symbol.is_static => Bucket::ClassStatic(class),
            (_, Some(class), None) => Bucket::ClassInstance(class),
            (_, None, None) => Bucket::Global,
        };

        symbol.index = self.next_offset(bucket, symbol.size);

        match bucket {
            Bucket::ClassStatic(class) | Bucket::ClassInstance(class) => {
                self.append_member(class, symbol)
            }

            _ => SymbolRef {
                owner: SymbolOwner::Block(self.block),
                index: self.session.code_block_mut(self.block).symbols.append(symbol),
            },
        }
    }

    /// Returns a fresh compiler temporary name with the `prefix`.
    ///
    /// Temporary names start with `%`, so they never clash with user names.
    pub(super) fn next_temporary(&mut self, prefix: &str) -> CompactString {
        let index = self.session.counters.temporaries;

        self.session.counters.temporaries += 1;

        format_compact!("{prefix}{index}")
    }

    fn next_offset(&mut self, bucket: Bucket, size: usize) -> isize {
        if let Bucket::ClassInstance(class) = bucket {
            if !self.session.counters.class_instance.contains_key(&class) {
                let inherited = self
                    .session
                    .classes
                    .get(class)
                    .and_then(|node| node.base)
                    .and_then(|base| self.session.counters.class_instance.get(&base))
                    .copied()
                    .unwrap_or_default();

                let _ = self.session.counters.class_instance.insert(class, inherited);
            }
        }

        let counters = &mut self.session.counters;

        let counter = match bucket {
            Bucket::Watch => &mut counters.watch_base,
            Bucket::Local => &mut counters.local_base,
            Bucket::ClassStatic(class) => counters.class_static.entry(class).or_default(),
            Bucket::ClassInstance(class) => counters.class_instance.entry(class).or_default(),
            Bucket::Global => &mut counters.global,
        };

        let offset = *counter;

        *counter += size;

        match bucket {
            Bucket::Local => -((1 + STACK_FRAME_SIZE + offset) as isize),
            _ => offset as isize,
        }
    }

    fn append_member(&mut self, class: ClassIndex, symbol: SymbolNode) -> SymbolRef {
        let mirror = match symbol.is_static {
            true => Some(symbol.clone()),
            false => None,
        };

        let Some(class_node) = self.session.classes.get_mut(class) else {
            system_panic!("Class {class} does not exist.");
        };

        let index = class_node.symbols.append(symbol);

        if let Some(mut mirror) = mirror {
            mirror.runtime_table_index = 0;

            let _ = self.session.code_block_mut(0).symbols.append(mirror);
        }

        SymbolRef {
            owner: SymbolOwner::Class(class),
            index,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        graph::SymbolOwner,
        interpret::{BlockKind, Language},
        runtime::{ClassNode, MemoryRegion, PrimitiveType, ProcRef, Type},
        semantics::{
            allocator::{Declaration, STACK_FRAME_SIZE},
            assembler::CodeGen,
            scope::ScopeFrame,
            CompileOptions,
            CompileSession,
        },
    };

    fn int() -> Type {
        Type::primitive(PrimitiveType::Int)
    }

    #[test]
    fn test_local_offsets() {
        let mut session = CompileSession::new(CompileOptions::new());

        let global = session.new_block(BlockKind::Global, Language::Associative, None);
        let body = session.new_block(BlockKind::Function, Language::Imperative, Some(global));

        let frame = ScopeFrame::global().in_procedure(
            ProcRef {
                class_scope: None,
                index: 0,
            },
            body,
        );

        let mut codegen = CodeGen::new(&mut session, body, frame);

        let mut previous = 0;

        for name in ["a", "b", "c", "d"] {
            let symbol = codegen.allocate_variable(Declaration::new(name, int()));
            let offset = codegen.symbol(symbol).unwrap().index;

            assert!(offset < previous);

            previous = offset;
        }

        let first = codegen.session.code_block(body).symbols.get(0).unwrap().index;

        assert_eq!(first, -(1 + STACK_FRAME_SIZE as isize));
        assert_eq!(previous, first - 3);
    }

    #[test]
    fn test_buckets() {
        let mut session = CompileSession::new(CompileOptions::new());

        let global = session.new_block(BlockKind::Global, Language::Associative, None);

        let base = session.classes.append(ClassNode::new("Base")).unwrap();
        let mut derived = ClassNode::new("Derived");

        derived.base = Some(base);

        let derived = session.classes.append(derived).unwrap();

        let mut codegen = CodeGen::new(&mut session, global, ScopeFrame::global());

        let x = codegen.allocate_variable(Declaration::new("x", int()));
        let y = codegen.allocate_variable(Declaration::new("y", int()));

        let mut boxed = Declaration::new("z", int());

        boxed.region = MemoryRegion::Heap;

        let z = codegen.allocate_variable(boxed);

        assert_eq!(codegen.symbol(x).unwrap().index, 0);
        assert_eq!(codegen.symbol(y).unwrap().index, 1);
        assert_eq!(codegen.symbol(z).unwrap().index, 2);
        assert_eq!(codegen.symbol(z).unwrap().heap_index, Some(0));

        codegen.scope = ScopeFrame::in_class(base);

        let _ = codegen.allocate_variable(Declaration::new("u", int()));
        let _ = codegen.allocate_variable(Declaration::new("v", int()));

        let mut shared = Declaration::new("count", int());

        shared.is_static = true;

        let count = codegen.allocate_variable(shared);

        assert_eq!(count.owner, SymbolOwner::Class(base));
        assert_eq!(codegen.symbol(count).unwrap().index, 0);
        assert!(codegen.static_mirror(base, "count").is_some());

        codegen.scope = ScopeFrame::in_class(derived);

        let w = codegen.allocate_variable(Declaration::new("w", int()));

        assert_eq!(codegen.symbol(w).unwrap().index, 2);
        assert_eq!(codegen.session.counters.global, 3);
    }
}
