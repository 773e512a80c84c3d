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

use compact_str::CompactString;

use crate::{
    interpret::BlockId,
    runtime::ClassIndex,
};

/// A kind of a dependency chain segment.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UpdateNodeKind {
    /// A variable, a property, or a class used as a static anchor.
    Symbol,

    /// A constant array subscript.
    Literal,

    /// A method call.
    Method,
}

/// A location of a resolved symbol.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SymbolOwner {
    /// The symbol table of a code block.
    Block(BlockId),

    /// The member table of a class.
    Class(ClassIndex),
}

/// A reference to a symbol table entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SymbolRef {
    pub owner: SymbolOwner,
    pub index: usize,
}

/// One segment of a dependency chain.
///
/// A segment either refers to a resolved symbol, names an unresolved
/// symbol or method, or carries a literal array subscript.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UpdateNode {
    pub kind: UpdateNodeKind,

    /// The name of the symbol or method, or the text of the literal.
    pub name: CompactString,

    /// The resolved symbol. None for methods, literals, and unresolved
    /// names.
    pub symbol: Option<SymbolRef>,

    /// The class that declares the symbol, or the class itself when the
    /// segment is a static anchor.
    pub class_scope: Option<ClassIndex>,

    /// Literal subscripts applied to this segment.
    pub dimensions: Vec<UpdateNode>,
}

impl Display for UpdateNode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            UpdateNodeKind::Symbol => formatter.write_str(&self.name)?,
            UpdateNodeKind::Literal => formatter.write_fmt(format_args!("#{}", self.name))?,
            UpdateNodeKind::Method => formatter.write_fmt(format_args!("{}()", self.name))?,
        }

        for dimension in &self.dimensions {
            formatter.write_fmt(format_args!("[{dimension}]"))?;
        }

        Ok(())
    }
}

impl UpdateNode {
    /// Creates a segment referring to a symbol.
    pub fn symbol(
        name: impl Into<CompactString>,
        symbol: Option<SymbolRef>,
        class_scope: Option<ClassIndex>,
    ) -> Self {
        Self {
            kind: UpdateNodeKind::Symbol,
            name: name.into(),
            symbol,
            class_scope,
            dimensions: Vec::new(),
        }
    }

    /// Creates a segment referring to a method by name.
    pub fn method(name: impl Into<CompactString>) -> Self {
        Self {
            kind: UpdateNodeKind::Method,
            name: name.into(),
            symbol: None,
            class_scope: None,
            dimensions: Vec::new(),
        }
    }

    /// Creates a literal subscript segment.
    pub fn literal(value: impl Into<CompactString>) -> Self {
        Self {
            kind: UpdateNodeKind::Literal,
            name: value.into(),
            symbol: None,
            class_scope: None,
            dimensions: Vec::new(),
        }
    }
}

/// A dependency chain: an ordered list of segments denoting one
/// identifier, property, or method path (`p.x.f()`).
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UpdateNodeRef {
    pub nodes: Vec<UpdateNode>,
}

impl Display for UpdateNodeRef {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;

        for node in &self.nodes {
            if !first {
                formatter.write_str(".")?;
            }

            first = false;

            Display::fmt(node, formatter)?;
        }

        Ok(())
    }
}

impl UpdateNodeRef {
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn push(&mut self, node: UpdateNode) {
        self.nodes.push(node);
    }

    /// Returns the first segment of the chain.
    #[inline(always)]
    pub fn root(&self) -> Option<&UpdateNode> {
        self.nodes.first()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns true if the chain starts with a segment named `name`.
    #[inline(always)]
    pub fn is_rooted_at(&self, name: &str) -> bool {
        self.root().map(|node| node.name == name).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::{UpdateNode, UpdateNodeRef};

    #[test]
    fn test_chain_display() {
        let mut chain = UpdateNodeRef::new();

        let mut root = UpdateNode::symbol("p", None, None);

        root.dimensions.push(UpdateNode::literal("0"));

        chain.push(root);
        chain.push(UpdateNode::symbol("x", None, None));
        chain.push(UpdateNode::method("norm"));

        assert_eq!(chain.to_string(), "p[#0].x.norm()");
        assert!(chain.is_rooted_at("p"));
        assert!(!chain.is_rooted_at("x"));
        assert_eq!(chain.len(), 3);
    }
}
