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

use std::{
    error::Error,
    fmt::{Display, Formatter},
};

use crate::{
    analysis::{Diagnostic, IssueCode},
    interpret::BlockId,
};

/// An alias type for compilation results.
pub type CompileResult<T> = Result<T, CompileError>;

/// An error that aborts the compilation of a unit.
///
/// Recoverable issues (syntax errors, warnings, malformed numeric literals)
/// never produce this error; they are accumulated in the session's
/// [Diagnostics](crate::analysis::Diagnostics) instead.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum CompileError {
    /// A semantic error that makes further lowering of the unit
    /// meaningless.
    ///
    /// The carried diagnostic is also recorded in the session's
    /// diagnostics.
    Halt(Diagnostic),

    /// The referred code block does not exist in the session.
    UnknownBlock(BlockId),
}

impl Error for CompileError {}

impl Display for CompileError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Halt(diagnostic) => formatter.write_fmt(format_args!(
                "Compilation halted. {diagnostic}",
            )),

            Self::UnknownBlock(id) => {
                formatter.write_fmt(format_args!("Code block {id} does not exist."))
            }
        }
    }
}

impl CompileError {
    /// Returns the issue code of the semantic halt.
    #[inline(always)]
    pub fn code(&self) -> Option<IssueCode> {
        match self {
            Self::Halt(diagnostic) => Some(diagnostic.code),
            _ => None,
        }
    }
}

/// Conveniences for inspecting compilation results.
pub trait CompileResultEx<T>: Sized {
    /// Returns the successful result, or panics with the error's
    /// description.
    fn unwrap_compiled(self) -> T;

    /// Returns the issue code if the result is a semantic halt.
    fn halted(self) -> Option<IssueCode>;
}

impl<T> CompileResultEx<T> for CompileResult<T> {
    #[track_caller]
    #[inline(always)]
    fn unwrap_compiled(self) -> T {
        match self {
            Ok(ok) => ok,
            Err(error) => panic!("{error}"),
        }
    }

    #[inline(always)]
    fn halted(self) -> Option<IssueCode> {
        match self {
            Ok(_) => None,
            Err(error) => error.code(),
        }
    }
}
