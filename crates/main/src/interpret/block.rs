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

use std::fmt::{Arguments, Debug, Display, Formatter};

use crate::{
    graph::GraphNode,
    interpret::Instruction,
    runtime::{ProcRef, SymbolTable},
};

/// An identifier of a code block within its compilation session.
///
/// The global block of the first compiled unit has identifier zero.
pub type BlockId = usize;

/// A program counter: an index of an instruction within a block's stream.
pub type Pc = usize;

/// A dialect of the source language.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Language {
    /// The reactive dialect: assignments establish live dependencies.
    Associative,

    /// The sequential dialect without automatic dependency tracking.
    Imperative,
}

impl Display for Language {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(match self {
            Self::Associative => "Associative",
            Self::Imperative => "Imperative",
        })
    }
}

impl Language {
    /// Returns the one-letter prefix of the block listings.
    #[inline(always)]
    pub fn prefix(self) -> char {
        match self {
            Self::Associative => 'a',
            Self::Imperative => 'i',
        }
    }
}

/// A kind of scope introduced by a code block.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlockKind {
    /// The outermost block of a compilation unit.
    Global,

    /// A function or method body.
    Function,

    /// A nested block written in a (possibly different) dialect.
    Language,
}

/// A scope unit with its own symbol table and instruction stream.
///
/// Blocks form a tree: symbol lookups that fail in a block continue in its
/// parent chain.
#[derive(Clone)]
pub struct CodeBlock {
    pub(crate) id: BlockId,
    pub(crate) kind: BlockKind,
    pub(crate) language: Language,
    pub(crate) parent: Option<BlockId>,
    pub(crate) children: Vec<BlockId>,
    pub(crate) symbols: SymbolTable,
    pub(crate) stream: Vec<Instruction>,
    pub(crate) graph: Vec<GraphNode>,
    pub(crate) procedure: Option<ProcRef>,
    pub(crate) entry: Option<Pc>,
}

impl Debug for CodeBlock {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        self.listing(formatter, 0)
    }
}

impl CodeBlock {
    pub(crate) fn new(
        id: BlockId,
        kind: BlockKind,
        language: Language,
        parent: Option<BlockId>,
    ) -> Self {
        Self {
            id,
            kind,
            language,
            parent,
            children: Vec::new(),
            symbols: SymbolTable::new(),
            stream: Vec::new(),
            graph: Vec::new(),
            procedure: None,
            entry: None,
        }
    }

    #[inline(always)]
    pub fn id(&self) -> BlockId {
        self.id
    }

    #[inline(always)]
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    #[inline(always)]
    pub fn language(&self) -> Language {
        self.language
    }

    #[inline(always)]
    pub fn parent(&self) -> Option<BlockId> {
        self.parent
    }

    #[inline(always)]
    pub fn children(&self) -> &[BlockId] {
        &self.children
    }

    #[inline(always)]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Returns the instruction stream of this block.
    #[inline(always)]
    pub fn instructions(&self) -> &[Instruction] {
        &self.stream
    }

    /// Returns the associative dependency graph nodes of this block in the
    /// order of their statements.
    #[inline(always)]
    pub fn graph(&self) -> &[GraphNode] {
        &self.graph
    }

    /// Returns the procedure whose body this block is.
    #[inline(always)]
    pub fn procedure(&self) -> Option<ProcRef> {
        self.procedure
    }

    /// Returns the program counter of the first emitted instruction.
    #[inline(always)]
    pub fn entry(&self) -> Option<Pc> {
        self.entry
    }

    pub(crate) fn listing(&self, formatter: &mut Formatter<'_>, mut indent: usize) -> std::fmt::Result {
        formatter.write_fmt(format_args!(
            "{} block{} {{\n",
            self.language, self.id,
        ))?;

        indent += 1;

        println(formatter, indent, format_args!("kind: {:?}", self.kind))?;

        if let Some(parent) = self.parent {
            println(formatter, indent, format_args!("parent: block{parent}"))?;
        }

        if let Some(entry) = self.entry {
            println(formatter, indent, format_args!("entry: {entry}"))?;
        }

        if !self.symbols.is_empty() {
            println(formatter, indent, format_args!("symbols:"))?;

            indent += 1;

            for symbol in self.symbols.iter() {
                println(
                    formatter,
                    indent,
                    format_args!(
                        "{}: {} {} @{}",
                        symbol.symbol_table_index, symbol.name, symbol.ty, symbol.index,
                    ),
                )?;
            }

            indent -= 1;
        }

        if !self.stream.is_empty() {
            println(formatter, indent, format_args!("instructions:"))?;

            indent += 1;

            let prefix = self.language.prefix();

            for (pc, instruction) in self.stream.iter().enumerate() {
                println(
                    formatter,
                    indent,
                    format_args!("[{prefix}.{}.{pc}] {instruction}", self.id),
                )?;
            }

            indent -= 1;
        }

        if !self.graph.is_empty() {
            println(formatter, indent, format_args!("graph:"))?;

            indent += 1;

            for node in &self.graph {
                println(formatter, indent, format_args!("{node}"))?;
            }

            indent -= 1;
        }

        indent -= 1;

        println(formatter, indent, format_args!("}}"))?;

        Ok(())
    }
}

pub(super) fn println(
    formatter: &mut Formatter<'_>,
    indent: usize,
    fmt: Arguments,
) -> std::fmt::Result {
    formatter.write_str(&"    ".repeat(indent))?;
    formatter.write_fmt(fmt)?;
    formatter.write_str("\n")?;

    Ok(())
}
