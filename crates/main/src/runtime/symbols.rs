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

use std::fmt::{Display, Formatter};

use ahash::AHashMap;
use compact_str::CompactString;

use crate::{
    interpret::BlockId,
    runtime::{ClassIndex, ProcIndex, Type},
};

/// A memory area where the value of a symbol lives at run time.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MemoryRegion {
    /// The value occupies a slot of the stack frame (or of the global stack
    /// area).
    #[default]
    Stack,

    /// The value is boxed on the heap, and the symbol occupies one
    /// pointer-sized stack slot that refers to the box.
    Heap,

    /// The value belongs to the class rather than to its instances.
    Static,
}

/// A visibility of a class member.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AccessModifier {
    #[default]
    Public,
    Protected,
    Private,
}

impl Display for AccessModifier {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
        })
    }
}

/// A size of one stack slot.
pub const POINTER_SIZE: usize = 1;

/// A declared variable, function parameter, or class member.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SymbolNode {
    pub name: CompactString,
    pub ty: Type,
    pub region: MemoryRegion,

    /// The class that declares this symbol, if the symbol is a class member
    /// or a local of a member function.
    pub class_scope: Option<ClassIndex>,

    /// The function that declares this symbol. None for globals and class
    /// member variables.
    pub function_index: Option<ProcIndex>,

    /// The stack offset assigned by the allocator. Negative offsets address
    /// function locals below the frame header.
    pub index: isize,

    /// The heap slot of a [heap-boxed](MemoryRegion::Heap) symbol.
    pub heap_index: Option<usize>,

    /// The number of stack slots occupied by the symbol.
    pub size: usize,

    pub is_static: bool,
    pub access: AccessModifier,

    /// The code block whose symbol table owns this symbol.
    pub runtime_table_index: BlockId,

    /// The position of this symbol within its owner symbol table.
    pub symbol_table_index: usize,

    /// For static class members, the position of the mirror symbol in the
    /// global block's table.
    pub global_index: Option<usize>,

    /// The name of the external module that imported this symbol.
    pub extern_lib: Option<CompactString>,

    /// True if the symbol is a function argument.
    pub is_argument: bool,
}

impl SymbolNode {
    /// Creates a public stack symbol of the specified type.
    ///
    /// The storage offsets are assigned later by the allocator.
    pub fn new(name: impl Into<CompactString>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            region: MemoryRegion::Stack,
            class_scope: None,
            function_index: None,
            index: 0,
            heap_index: None,
            size: POINTER_SIZE,
            is_static: false,
            access: AccessModifier::Public,
            runtime_table_index: 0,
            symbol_table_index: 0,
            global_index: None,
            extern_lib: None,
            is_argument: false,
        }
    }

    #[inline(always)]
    pub fn in_class(mut self, class_scope: Option<ClassIndex>) -> Self {
        self.class_scope = class_scope;
        self
    }

    #[inline(always)]
    pub fn in_function(mut self, function_index: Option<ProcIndex>) -> Self {
        self.function_index = function_index;
        self
    }

    #[inline(always)]
    pub fn with_region(mut self, region: MemoryRegion) -> Self {
        self.region = region;
        self
    }

    #[inline(always)]
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    #[inline(always)]
    pub fn with_access(mut self, access: AccessModifier) -> Self {
        self.access = access;
        self
    }

    /// Returns true if the symbol is a member variable of a class (not a
    /// local of a member function).
    #[inline(always)]
    pub fn is_member_variable(&self) -> bool {
        self.class_scope.is_some() && self.function_index.is_none()
    }

    /// Returns true if the name of the symbol was introduced by the compiler
    /// rather than written by the programmer.
    #[inline(always)]
    pub fn is_temporary(&self) -> bool {
        self.name.starts_with('%')
    }
}

/// An ordered collection of symbols owned by a code block or by a class.
///
/// Symbols are appended and never removed. Several symbols may share a name
/// if they belong to different function scopes.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<SymbolNode>,
    by_name: AHashMap<CompactString, Vec<usize>>,
}

impl SymbolTable {
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a symbol to this table and returns its position.
    ///
    /// The symbol's [symbol_table_index](SymbolNode::symbol_table_index) is
    /// updated accordingly.
    pub fn append(&mut self, mut symbol: SymbolNode) -> usize {
        let index = self.symbols.len();

        symbol.symbol_table_index = index;

        self.by_name
            .entry(symbol.name.clone())
            .or_default()
            .push(index);

        self.symbols.push(symbol);

        index
    }

    /// Looks up a symbol by name within the exact class and function scope.
    pub fn index_of(
        &self,
        name: &str,
        class_scope: Option<ClassIndex>,
        function_index: Option<ProcIndex>,
    ) -> Option<usize> {
        let candidates = self.by_name.get(name)?;

        candidates.iter().copied().find(|index| {
            let symbol = &self.symbols[*index];

            symbol.class_scope == class_scope && symbol.function_index == function_index
        })
    }

    /// Looks up a symbol by name within the specified function scope
    /// regardless of the class scope.
    pub fn index_of_in_function(&self, name: &str, function_index: Option<ProcIndex>) -> Option<usize> {
        let candidates = self.by_name.get(name)?;

        candidates
            .iter()
            .copied()
            .find(|index| self.symbols[*index].function_index == function_index)
    }

    /// Returns all positions of the symbols named `name`.
    pub fn indices_of(&self, name: &str) -> &[usize] {
        match self.by_name.get(name) {
            Some(indices) => indices.as_slice(),
            None => &[],
        }
    }

    #[inline(always)]
    pub fn get(&self, index: usize) -> Option<&SymbolNode> {
        self.symbols.get(index)
    }

    #[inline(always)]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut SymbolNode> {
        self.symbols.get_mut(index)
    }

    #[inline(always)]
    pub fn iter(&self) -> impl Iterator<Item = &SymbolNode> + '_ {
        self.symbols.iter()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{PrimitiveType, SymbolNode, SymbolTable, Type};

    #[test]
    fn test_symbol_scopes() {
        let mut table = SymbolTable::new();

        let global = table.append(SymbolNode::new("a", Type::primitive(PrimitiveType::Int)));
        let local = table.append(
            SymbolNode::new("a", Type::primitive(PrimitiveType::Double)).in_function(Some(3)),
        );
        let member = table.append(SymbolNode::new("a", Type::default()).in_class(Some(14)));

        assert_eq!(table.len(), 3);
        assert_eq!(table.index_of("a", None, None), Some(global));
        assert_eq!(table.index_of("a", None, Some(3)), Some(local));
        assert_eq!(table.index_of("a", Some(14), None), Some(member));
        assert_eq!(table.index_of("a", Some(14), Some(3)), None);
        assert_eq!(table.index_of("b", None, None), None);
        assert_eq!(table.get(local).unwrap().symbol_table_index, local);
        assert_eq!(table.indices_of("a").len(), 3);
        assert!(table.get(member).unwrap().is_member_variable());
    }
}
