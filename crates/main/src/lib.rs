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

//! # Dualscript Code Generator
//!
//! This crate lowers the syntax tree of a dual-paradigm scripting language
//! into linear bytecode for a stack-based virtual machine.
//!
//! The language mixes two dialects:
//!
//! - The **associative** dialect, where every assignment establishes a live
//!   dependency. When an upstream value changes, the runtime re-executes only
//!   the statements that depend on it.
//! - The **imperative** dialect, which is a conventional sequential language
//!   with loops, branches, and no automatic dependency tracking.
//!
//! While emitting bytecode for associative statements, the generator
//! simultaneously builds the dependency graph consumed by the reactive
//! engine: every statement becomes a [GraphNode](graph::GraphNode) that
//! records the instruction range it corresponds to and the identifier chains
//! its evaluation reads.
//!
//! ## Entry Point
//!
//! The compilation entry point is the [CompileSession](semantics::CompileSession)
//! object. The session owns all process-wide tables of one compilation unit:
//! the class and procedure tables, the code blocks with their instruction
//! streams, the late-bound (dynamic) symbol tables, the program counter to
//! source location map, and the accumulated diagnostics.
//!
//! ```rust
//! use dualscript::{
//!     interpret::Language,
//!     semantics::{CompileOptions, CompileSession},
//!     syntax::{AssignmentNode, AstNode, IdentifierNode, LiteralNode},
//! };
//!
//! let mut session = CompileSession::new(CompileOptions::new());
//!
//! let unit = vec![
//!     AstNode::from(AssignmentNode::new(
//!         IdentifierNode::new("a"),
//!         LiteralNode::int("10"),
//!     )),
//!     AstNode::from(AssignmentNode::new(
//!         IdentifierNode::new("b"),
//!         IdentifierNode::new("a"),
//!     )),
//! ];
//!
//! let block = session.compile(&unit, Language::Associative).unwrap();
//! let executable = session.finish();
//!
//! let graph = executable.block(block).unwrap().graph();
//!
//! assert_eq!(graph.len(), 2);
//! assert!(graph[1].depends_on("a"));
//! ```
//!
//! ## Crate Structure
//!
//! - [syntax] is the input syntax tree model handed over by a parser.
//! - [runtime] describes the static data stores: the type system, symbol
//!   tables, class tables, and procedure tables.
//! - [interpret] is the output model: operands, instructions, code blocks,
//!   dynamic tables, and the debug map.
//! - [graph] is the associative dependency graph model.
//! - [analysis] contains diagnostics and compilation errors.
//! - [semantics] is the code generator itself.

#![allow(clippy::too_many_arguments)]
#![allow(clippy::module_inception)]

mod report;

pub mod analysis;
pub mod graph;
pub mod interpret;
pub mod runtime;
pub mod semantics;
pub mod syntax;
