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

//! The code generator.
//!
//! A [CompileSession] lowers units of syntax tree statements into the code
//! blocks of the session. Each unit is written in one of the two dialects
//! ([Language](crate::interpret::Language)), and each dialect has its own
//! generator:
//!
//! - The associative generator wraps every statement into a dependency
//!   graph node, splits chain assignments into static single assignment
//!   factors when [full_ssa](CompileOptions::full_ssa) is enabled, and emits
//!   the dependency markers the reactive engine uses to re-execute
//!   statements.
//! - The imperative generator lowers statements in order, with branches and
//!   loops resolved through backpatched jumps.
//!
//! Both generators share symbol allocation, scope resolution, identifier
//! chain lowering, literal lowering, and declaration lowering. Nested
//! language blocks may switch the dialect at any depth.
//!
//! Once all units are compiled, [CompileSession::finish] returns the
//! [Executable](crate::interpret::Executable) with the blocks, the class and
//! procedure tables, the dynamic tables, the debug map, and the diagnostics.

mod allocator;
mod assembler;
mod associative;
mod attributes;
mod backpatch;
mod compiler;
mod declarations;
mod dependency;
mod generator;
mod imperative;
mod literals;
mod options;
mod resolver;
mod scope;
mod session;

pub use crate::semantics::{
    options::{CompileOptions, ExecMode},
    session::CompileSession,
};

pub(crate) static CODEGEN_LOG: &'static str = "dualscript::$codegen";
