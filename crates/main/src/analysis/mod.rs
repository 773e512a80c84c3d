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

//! Diagnostics and errors of the code generator.
//!
//! The generator distinguishes three kinds of issues (see [IssueKind]):
//!
//! - Syntax errors are recorded, and lowering continues with a best-effort
//!   value.
//! - Semantic errors abort the compilation of the current unit with a
//!   [CompileError::Halt].
//! - Warnings are recorded, and lowering substitutes a safe fallback (a null
//!   value or a relaxed type), so the bytecode remains well-formed.
//!
//! All issues of a session are accumulated in its [Diagnostics].

mod closeness;
mod diagnostics;
mod error;
mod issues;

pub use crate::analysis::{
    closeness::{suggest, Closeness, StringEstimation},
    diagnostics::{Diagnostic, Diagnostics},
    error::{CompileError, CompileResult, CompileResultEx},
    issues::{IssueCode, IssueKind, IssueSeverity},
};
