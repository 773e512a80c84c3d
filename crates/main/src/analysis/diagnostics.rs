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
    analysis::{IssueCode, IssueKind, IssueSeverity},
    syntax::{Column, Line, SourceSpan},
};

/// A single issue found by the code generator.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostic {
    pub code: IssueCode,
    pub kind: IssueKind,
    pub message: CompactString,

    /// The source file of the compiled unit, if known.
    pub file: Option<CompactString>,

    /// The one-based line of the issue, or zero if unknown.
    pub line: Line,

    /// The one-based column of the issue, or zero if unknown.
    pub column: Column,
}

impl Display for Diagnostic {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_fmt(format_args!("{}[{}]", self.kind, self.code as u16))?;

        if let Some(file) = &self.file {
            formatter.write_fmt(format_args!(" {file}"))?;
        }

        if self.line > 0 && self.column > 0 {
            formatter.write_fmt(format_args!(" {}:{}", self.line, self.column))?;
        }

        formatter.write_fmt(format_args!(": {}", self.message))
    }
}

impl Diagnostic {
    pub fn new(
        code: IssueCode,
        message: impl Into<CompactString>,
        file: Option<CompactString>,
        span: SourceSpan,
    ) -> Self {
        Self {
            code,
            kind: code.kind(),
            message: message.into(),
            file,
            line: span.line,
            column: span.column,
        }
    }

    #[inline(always)]
    pub fn severity(&self) -> IssueSeverity {
        self.code.severity()
    }
}

/// An ordered collection of the issues accumulated by a compilation
/// session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    issues: Vec<Diagnostic>,
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    #[inline(always)]
    fn into_iter(self) -> Self::IntoIter {
        self.issues.iter()
    }
}

impl Diagnostics {
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub(crate) fn push(&mut self, diagnostic: Diagnostic) {
        self.issues.push(diagnostic);
    }

    /// Returns the number of issues that match the severity mask.
    ///
    /// For example, `len(IssueSeverity::Error as u8)` returns the number of
    /// errors, while `len(!0)` returns the total number of issues.
    pub fn len(&self, severity_mask: u8) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity() as u8 & severity_mask > 0)
            .count()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    #[inline(always)]
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.issues.iter()
    }

    /// Iterates over the issues of the specified kind.
    #[inline(always)]
    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.issues.iter().filter(move |issue| issue.kind == kind)
    }

    /// Returns the number of issues with the specified code.
    #[inline(always)]
    pub fn count(&self, code: IssueCode) -> usize {
        self.issues.iter().filter(|issue| issue.code == code).count()
    }

    #[inline(always)]
    pub fn contains(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        analysis::{Diagnostic, Diagnostics, IssueCode, IssueSeverity},
        syntax::SourceSpan,
    };

    #[test]
    fn test_severity_mask() {
        let mut diagnostics = Diagnostics::new();

        diagnostics.push(Diagnostic::new(
            IssueCode::UnboundIdentifier,
            "'x' is not defined",
            None,
            SourceSpan::point(3, 5),
        ));
        diagnostics.push(Diagnostic::new(
            IssueCode::IntegerOverflow,
            "overflow",
            Some("main.ds".into()),
            SourceSpan::nil(),
        ));

        assert_eq!(diagnostics.len(!0), 2);
        assert_eq!(diagnostics.len(IssueSeverity::Warning as u8), 1);
        assert_eq!(diagnostics.len(IssueSeverity::Error as u8), 1);
        assert_eq!(diagnostics.count(IssueCode::UnboundIdentifier), 1);

        let printed = diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>();

        assert_eq!(printed[0], "warning[301] 3:5: 'x' is not defined");
        assert_eq!(printed[1], "semantic error[203] main.ds: overflow");
    }
}
