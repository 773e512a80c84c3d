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

use std::fmt::{Debug, Formatter};

use compact_str::CompactString;

use crate::{
    analysis::Diagnostics,
    graph::GraphNode,
    interpret::{
        block::println,
        BlockId,
        CodeBlock,
        DebugMap,
        DynamicFunctionTable,
        DynamicVariableTable,
        Instruction,
        Pc,
    },
    runtime::{ClassTable, ProcedureTable},
    syntax::SourceSpan,
};

/// A read-only result of a [compilation session](crate::semantics::CompileSession).
///
/// The object owns everything the virtual machine and the reactive engine
/// need: the code blocks with their instruction streams and dependency
/// graphs, the class and procedure tables, the late-bound symbol tables,
/// and the program counter to source location map.
///
/// The [Debug] implementation prints an assembler listing of all blocks.
pub struct Executable {
    pub(crate) file: Option<CompactString>,
    pub(crate) blocks: Vec<CodeBlock>,
    pub(crate) classes: ClassTable,
    pub(crate) procedures: ProcedureTable,
    pub(crate) dynamic_variables: DynamicVariableTable,
    pub(crate) dynamic_functions: DynamicFunctionTable,
    pub(crate) debug_map: DebugMap,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) watch_stream: Vec<Instruction>,
}

impl Debug for Executable {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("Executable {\n")?;

        let indent = 1;

        if let Some(file) = &self.file {
            println(formatter, indent, format_args!("file: {file:?}"))?;
        }

        for block in &self.blocks {
            formatter.write_str(&"    ".repeat(indent))?;
            block.listing(formatter, indent)?;
        }

        if !self.dynamic_variables.is_empty() {
            println(formatter, indent, format_args!("dynamic variables:"))?;

            for (index, entry) in self.dynamic_variables.iter().enumerate() {
                let mut path = entry.name.clone();

                for member in &entry.members {
                    path.push('.');
                    path.push_str(member);
                }

                println(formatter, indent + 1, format_args!("dyn{index}: {path}"))?;
            }
        }

        if !self.dynamic_functions.is_empty() {
            println(formatter, indent, format_args!("dynamic functions:"))?;

            for (index, entry) in self.dynamic_functions.iter().enumerate() {
                println(
                    formatter,
                    indent + 1,
                    format_args!("dyn{index}: {}/{}", entry.name, entry.arity),
                )?;
            }
        }

        if !self.watch_stream.is_empty() {
            println(formatter, indent, format_args!("watch:"))?;

            for (pc, instruction) in self.watch_stream.iter().enumerate() {
                println(formatter, indent + 1, format_args!("[w.{pc}] {instruction}"))?;
            }
        }

        formatter.write_str("}\n")
    }
}

impl Executable {
    /// Returns the name of the source file of the compiled units.
    #[inline(always)]
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    #[inline(always)]
    pub fn block(&self, id: BlockId) -> Option<&CodeBlock> {
        self.blocks.get(id)
    }

    #[inline(always)]
    pub fn blocks(&self) -> &[CodeBlock] {
        &self.blocks
    }

    #[inline(always)]
    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    /// Returns the table of global (non-member) procedures.
    #[inline(always)]
    pub fn procedures(&self) -> &ProcedureTable {
        &self.procedures
    }

    #[inline(always)]
    pub fn dynamic_variables(&self) -> &DynamicVariableTable {
        &self.dynamic_variables
    }

    #[inline(always)]
    pub fn dynamic_functions(&self) -> &DynamicFunctionTable {
        &self.dynamic_functions
    }

    #[inline(always)]
    pub fn debug_map(&self) -> &DebugMap {
        &self.debug_map
    }

    #[inline(always)]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Returns the instructions compiled for watch expressions.
    #[inline(always)]
    pub fn watch_stream(&self) -> &[Instruction] {
        &self.watch_stream
    }

    /// Iterates over the dependency graph nodes of all blocks.
    pub fn graph_nodes(&self) -> impl Iterator<Item = &GraphNode> + '_ {
        self.blocks.iter().flat_map(|block| block.graph.iter())
    }

    /// See [DebugMap::location_by_pc].
    #[inline(always)]
    pub fn location_by_pc(&self, block: BlockId, pc: Pc) -> Option<SourceSpan> {
        self.debug_map.location_by_pc(block, pc)
    }

    /// See [DebugMap::location_by_graph_node].
    #[inline(always)]
    pub fn location_by_graph_node(&self, node: &GraphNode) -> Option<SourceSpan> {
        self.debug_map.location_by_graph_node(node)
    }

    /// See [DebugMap::audit_code_location].
    #[inline(always)]
    pub fn audit_code_location(
        &self,
        block: BlockId,
        pc: Pc,
        executing: Option<&GraphNode>,
        delta_execution: bool,
    ) -> Option<SourceSpan> {
        self.debug_map
            .audit_code_location(block, pc, executing, delta_execution)
    }

    /// Serializes the instruction streams, dependency graphs, late-bound
    /// tables, and diagnostics into a JSON document.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        use serde_json::{json, to_value, Value};

        let mut blocks = Vec::with_capacity(self.blocks.len());

        for block in &self.blocks {
            blocks.push(json!({
                "id": block.id,
                "kind": to_value(block.kind)?,
                "language": to_value(block.language)?,
                "parent": block.parent,
                "entry": block.entry,
                "symbols": block.symbols.iter().map(to_value).collect::<Result<Vec<Value>, _>>()?,
                "instructions": to_value(&block.stream)?,
                "graph": to_value(&block.graph)?,
            }));
        }

        let debug_map = self
            .debug_map
            .iter()
            .map(|(block, pc, span)| Ok(json!({ "block": block, "pc": pc, "span": to_value(span)? })))
            .collect::<serde_json::Result<Vec<Value>>>()?;

        Ok(json!({
            "file": self.file.as_deref(),
            "blocks": blocks,
            "dynamic_variables": to_value(&self.dynamic_variables)?,
            "dynamic_functions": to_value(&self.dynamic_functions)?,
            "debug_map": debug_map,
            "diagnostics": to_value(self.diagnostics.iter().collect::<Vec<_>>())?,
            "watch": to_value(&self.watch_stream)?,
        }))
    }
}
