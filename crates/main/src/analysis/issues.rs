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

/// A classification of the code generator diagnostics.
///
/// The numeric representation is in the XYY decimal digits format, where X
/// is the issue's [kind](IssueKind) (1 for syntax errors, 2 for semantic
/// errors, and 3 for warnings), and YY is the issue's sub-code within that
/// kind.
///
/// The Display implementation prints a short description of the issue.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
#[non_exhaustive]
pub enum IssueCode {
    /// Syntax Error.
    ///
    /// A character literal contains more than one character. The generator
    /// proceeds with the first character.
    CharLiteralTooLong = 101,
    /// Syntax Error.
    ///
    /// A character literal is empty. The generator proceeds with the NUL
    /// character.
    EmptyCharLiteral = 102,

    /// Semantics Error.
    ///
    /// An identifier list is joined with an operator other than `.`.
    InvalidIndirection = 201,
    /// Semantics Error.
    ///
    /// A segment of an identifier list is neither an identifier, nor a
    /// function call, nor an identifier list.
    NonIdentifierSegment = 202,
    /// Semantics Error.
    ///
    /// An integer literal does not fit into 64 bits. The generator proceeds
    /// with a zero value.
    IntegerOverflow = 203,
    /// Semantics Error.
    ///
    /// A numeric literal is malformed. The generator proceeds with a zero
    /// value.
    InvalidNumber = 204,
    /// Semantics Error.
    ///
    /// The attribute's `<Name>Attribute` class is not declared.
    UnknownAttribute = 205,
    /// Semantics Error.
    ///
    /// An attribute argument is not a constant expression.
    NonConstantAttributeArgument = 206,
    /// Semantics Error.
    ///
    /// The attribute class has no constructor accepting the provided number
    /// of arguments.
    AttributeArityMismatch = 207,
    /// Semantics Error.
    ///
    /// A constructor body contains a return statement.
    ReturnInConstructor = 208,
    /// Semantics Error.
    ///
    /// A type annotation refers to an undeclared class.
    UnknownType = 209,
    /// Semantics Error.
    ///
    /// An imperative-only construct (`if`, `while`, `break`, `continue`) is
    /// used in an associative block.
    ImperativeConstructInAssociative = 210,
    /// Semantics Error.
    ///
    /// A class is declared outside of the outermost associative block.
    ClassOutsideAssociative = 211,
    /// Semantics Error.
    ///
    /// The `break` or `continue` statement is used outside of a loop.
    BreakOutsideLoop = 212,
    /// Semantics Error.
    ///
    /// A class with the same name has already been declared.
    DuplicateClass = 213,
    /// Semantics Error.
    ///
    /// The left side of an assignment is neither an identifier nor an
    /// identifier list.
    InvalidAssignmentTarget = 214,
    /// Semantics Error.
    ///
    /// A statement appears where an expression is expected.
    UnexpectedStatement = 215,

    /// Semantics Warning.
    ///
    /// An identifier does not refer to any visible symbol. The generator
    /// proceeds with a null value.
    UnboundIdentifier = 301,
    /// Semantics Warning.
    ///
    /// The property is declared, but its access modifier hides it from the
    /// current scope. The generator proceeds with a null value.
    PropertyInaccessible = 302,
    /// Semantics Warning.
    ///
    /// The method is declared, but its access modifier hides it from the
    /// current scope.
    MethodInaccessible = 303,
    /// Semantics Warning.
    ///
    /// An instance member is accessed through the class name. The generator
    /// proceeds with a null value.
    CallingNonStaticOnClass = 304,
    /// Semantics Warning.
    ///
    /// The returned value's type is not convertible to the declared return
    /// type. The generator returns null instead.
    MismatchReturnType = 305,
    /// Semantics Warning.
    ///
    /// The called function cannot be resolved at compile time. The call is
    /// resolved by the runtime.
    FunctionNotFound = 306,
}

impl Display for IssueCode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::CharLiteralTooLong => "Character literal contains more than one character.",
            Self::EmptyCharLiteral => "Empty character literal.",

            Self::InvalidIndirection => "Only the '.' operator may join identifier list segments.",
            Self::NonIdentifierSegment => "The left side of operator '.' must be an identifier.",
            Self::IntegerOverflow => "Integer literal overflow.",
            Self::InvalidNumber => "Invalid numeric literal.",
            Self::UnknownAttribute => "Unknown attribute.",
            Self::NonConstantAttributeArgument => "Attribute argument is not a constant.",
            Self::AttributeArityMismatch => "Attribute arity mismatch.",
            Self::ReturnInConstructor => "Return statement inside a constructor.",
            Self::UnknownType => "Unknown type.",
            Self::ImperativeConstructInAssociative => "Imperative construct in associative block.",
            Self::ClassOutsideAssociative => "Class declaration outside of the global block.",
            Self::BreakOutsideLoop => "Break outside of a loop.",
            Self::DuplicateClass => "Duplicate class declaration.",
            Self::InvalidAssignmentTarget => "Invalid assignment target.",
            Self::UnexpectedStatement => "Statement in expression position.",

            Self::UnboundIdentifier => "Unbound identifier.",
            Self::PropertyInaccessible => "Inaccessible property.",
            Self::MethodInaccessible => "Inaccessible method.",
            Self::CallingNonStaticOnClass => "Non-static member accessed through the class.",
            Self::MismatchReturnType => "Return type mismatch.",
            Self::FunctionNotFound => "Unresolved function.",
        };

        formatter.write_str(message)
    }
}

impl IssueCode {
    /// Returns the issue's [severity](IssueSeverity), which is either an
    /// error or a warning.
    #[inline(always)]
    pub fn severity(self) -> IssueSeverity {
        match self {
            Self::CharLiteralTooLong => IssueSeverity::Error,
            Self::EmptyCharLiteral => IssueSeverity::Error,

            Self::InvalidIndirection => IssueSeverity::Error,
            Self::NonIdentifierSegment => IssueSeverity::Error,
            Self::IntegerOverflow => IssueSeverity::Error,
            Self::InvalidNumber => IssueSeverity::Error,
            Self::UnknownAttribute => IssueSeverity::Error,
            Self::NonConstantAttributeArgument => IssueSeverity::Error,
            Self::AttributeArityMismatch => IssueSeverity::Error,
            Self::ReturnInConstructor => IssueSeverity::Error,
            Self::UnknownType => IssueSeverity::Error,
            Self::ImperativeConstructInAssociative => IssueSeverity::Error,
            Self::ClassOutsideAssociative => IssueSeverity::Error,
            Self::BreakOutsideLoop => IssueSeverity::Error,
            Self::DuplicateClass => IssueSeverity::Error,
            Self::InvalidAssignmentTarget => IssueSeverity::Error,
            Self::UnexpectedStatement => IssueSeverity::Error,

            Self::UnboundIdentifier => IssueSeverity::Warning,
            Self::PropertyInaccessible => IssueSeverity::Warning,
            Self::MethodInaccessible => IssueSeverity::Warning,
            Self::CallingNonStaticOnClass => IssueSeverity::Warning,
            Self::MismatchReturnType => IssueSeverity::Warning,
            Self::FunctionNotFound => IssueSeverity::Warning,
        }
    }

    /// Returns the diagnostic kind encoded in the first digit of the issue's
    /// numeric code.
    #[inline(always)]
    pub fn kind(self) -> IssueKind {
        match self as u16 / 100 {
            1 => IssueKind::Syntax,
            2 => IssueKind::Semantic,
            _ => IssueKind::Warning,
        }
    }
}

/// The severity level of a diagnostic.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum IssueSeverity {
    /// The generated code does not reflect the source code.
    Error = 1 << 0,

    /// The generated code is well-formed, but it substitutes a fallback
    /// value for the problematic construct.
    Warning = 1 << 1,
}

impl Display for IssueSeverity {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueSeverity::Error => formatter.write_str("error"),
            IssueSeverity::Warning => formatter.write_str("warning"),
        }
    }
}

/// The diagnostic category that determines how the generator proceeds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IssueKind {
    /// Recorded, and lowering continues with a best-effort value.
    Syntax,

    /// Aborts the compilation of the current unit, except for the numeric
    /// literal issues that are recorded only.
    Semantic,

    /// Recorded, and lowering continues with a safe fallback.
    Warning,
}

impl Display for IssueKind {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueKind::Syntax => formatter.write_str("syntax error"),
            IssueKind::Semantic => formatter.write_str("semantic error"),
            IssueKind::Warning => formatter.write_str("warning"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::analysis::{IssueCode, IssueKind, IssueSeverity};

    #[test]
    fn test_issue_classification() {
        assert_eq!(IssueCode::CharLiteralTooLong.kind(), IssueKind::Syntax);
        assert_eq!(IssueCode::InvalidIndirection.kind(), IssueKind::Semantic);
        assert_eq!(IssueCode::UnboundIdentifier.kind(), IssueKind::Warning);
        assert_eq!(IssueCode::UnboundIdentifier.severity(), IssueSeverity::Warning);
        assert_eq!(IssueCode::IntegerOverflow.severity(), IssueSeverity::Error);
        assert_eq!(IssueCode::FunctionNotFound as u16, 306);
    }
}
