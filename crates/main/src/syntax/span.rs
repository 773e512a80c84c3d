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

/// A one-based line number in the source code text.
pub type Line = usize;

/// A one-based column number in the source code text.
pub type Column = usize;

/// A range of the source code text covered by a syntax tree node.
///
/// Lines and columns are one-based. A zero line or column denotes an unknown
/// position: the generator neither attaches debug information nor records
/// debug map entries for such spans.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceSpan {
    /// The line of the first character.
    pub line: Line,

    /// The column of the first character.
    pub column: Column,

    /// The line of the last character.
    pub end_line: Line,

    /// The column after the last character.
    pub end_column: Column,
}

impl Display for SourceSpan {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        if !self.is_valid() {
            return formatter.write_str("?");
        }

        formatter.write_fmt(format_args!(
            "{}:{}..{}:{}",
            self.line, self.column, self.end_line, self.end_column,
        ))
    }
}

impl SourceSpan {
    /// Returns a span that does not point to any source code location.
    #[inline(always)]
    pub const fn nil() -> Self {
        Self {
            line: 0,
            column: 0,
            end_line: 0,
            end_column: 0,
        }
    }

    #[inline(always)]
    pub const fn new(line: Line, column: Column, end_line: Line, end_column: Column) -> Self {
        Self {
            line,
            column,
            end_line,
            end_column,
        }
    }

    /// Creates a span that starts and ends at the same position.
    #[inline(always)]
    pub const fn point(line: Line, column: Column) -> Self {
        Self::new(line, column, line, column)
    }

    /// Returns true if both the starting line and column are known.
    #[inline(always)]
    pub const fn is_valid(&self) -> bool {
        self.line > 0 && self.column > 0
    }

    /// Returns true if this span was created with [SourceSpan::nil].
    #[inline(always)]
    pub const fn is_nil(&self) -> bool {
        self.line == 0 && self.column == 0 && self.end_line == 0 && self.end_column == 0
    }

    /// Returns a span that covers both `self` and `other`.
    ///
    /// Unknown spans are ignored.
    pub fn join(self, other: Self) -> Self {
        if !self.is_valid() {
            return other;
        }

        if !other.is_valid() {
            return self;
        }

        let (line, column) = (self.line, self.column).min((other.line, other.column));
        let (end_line, end_column) =
            (self.end_line, self.end_column).max((other.end_line, other.end_column));

        Self::new(line, column, end_line, end_column)
    }
}

#[cfg(test)]
mod tests {
    use crate::syntax::SourceSpan;

    #[test]
    fn test_span_validity() {
        assert!(!SourceSpan::nil().is_valid());
        assert!(SourceSpan::nil().is_nil());
        assert!(!SourceSpan::point(3, 0).is_valid());
        assert!(SourceSpan::point(3, 1).is_valid());
        assert_eq!(SourceSpan::nil().to_string(), "?");
        assert_eq!(SourceSpan::new(1, 2, 1, 7).to_string(), "1:2..1:7");
    }

    #[test]
    fn test_span_join() {
        let first = SourceSpan::new(2, 5, 2, 9);
        let second = SourceSpan::new(1, 3, 2, 4);

        assert_eq!(first.join(second), SourceSpan::new(1, 3, 2, 9));
        assert_eq!(first.join(SourceSpan::nil()), first);
        assert_eq!(SourceSpan::nil().join(second), second);
    }
}
