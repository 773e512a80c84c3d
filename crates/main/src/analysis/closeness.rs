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
    cmp::Ordering,
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
};

use compact_str::CompactString;
use strsim::normalized_damerau_levenshtein;

const EPSILON: f32 = 0.0001;

/// A similarity score of two names in percents.
///
/// "100%" means the names are equal, "0%" means they have nothing in
/// common. The Debug and Display implementations round the score to the
/// nearest integer percent.
#[repr(transparent)]
#[derive(Clone, Copy)]
pub struct Closeness(f32);

impl Debug for Closeness {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, formatter)
    }
}

impl Display for Closeness {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_fmt(format_args!("{}%", self.percents()))
    }
}

impl PartialEq for Closeness {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.normalized().eq(&other.normalized())
    }
}

impl Eq for Closeness {}

impl PartialOrd for Closeness {
    #[inline(always)]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Closeness {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized().cmp(&other.normalized())
    }
}

impl Hash for Closeness {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state)
    }
}

impl Default for Closeness {
    #[inline(always)]
    fn default() -> Self {
        Self::zero()
    }
}

impl Closeness {
    #[inline(always)]
    pub const fn zero() -> Self {
        Self(0.0)
    }

    #[inline(always)]
    pub const fn half() -> Self {
        Self(0.5)
    }

    #[inline(always)]
    pub const fn one() -> Self {
        Self(1.0)
    }

    /// Returns the score rounded to the nearest integer percent.
    #[inline(always)]
    pub fn percents(self) -> u16 {
        ((self.0 * 1000.0).round() / 10.0) as u16
    }

    #[inline(always)]
    fn normalized(self) -> u32 {
        (self.0 / EPSILON) as u32
    }
}

/// An extension trait that scores the similarity of two strings.
pub trait StringEstimation {
    /// Scores the similarity of this string to the `pattern`.
    ///
    /// ```rust
    /// use dualscript::analysis::{Closeness, StringEstimation};
    ///
    /// assert_eq!("radius".estimate("radius"), Closeness::one());
    /// assert_eq!("abc".estimate("xyz"), Closeness::zero());
    /// assert!("raduis".estimate("radius") > Closeness::half());
    /// ```
    fn estimate(&self, pattern: impl AsRef<str>) -> Closeness;
}

impl<S: AsRef<str>> StringEstimation for S {
    fn estimate(&self, pattern: impl AsRef<str>) -> Closeness {
        let this = self.as_ref();
        let pattern = pattern.as_ref();

        let closeness = normalized_damerau_levenshtein(pattern, this);

        Closeness((closeness as f32 / EPSILON) as usize as f32 * EPSILON)
    }
}

/// Picks the candidate name most similar to `name` for a "did you mean"
/// hint.
///
/// Candidates scoring below [Closeness::half], compiler-generated names
/// (starting with `%`), and the name itself are never suggested.
pub fn suggest<'a>(
    name: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<CompactString> {
    let mut best: Option<(Closeness, &str)> = None;

    for candidate in candidates {
        if candidate == name || candidate.starts_with('%') {
            continue;
        }

        let closeness = candidate.estimate(name);

        if closeness < Closeness::half() {
            continue;
        }

        match &best {
            Some((score, _)) if *score >= closeness => (),
            _ => best = Some((closeness, candidate)),
        }
    }

    best.map(|(_, candidate)| CompactString::from(candidate))
}

#[cfg(test)]
mod tests {
    use crate::analysis::suggest;

    #[test]
    fn test_suggestions() {
        let candidates = ["radius", "center", "%t1", "radii"];

        assert_eq!(suggest("raduis", candidates).as_deref(), Some("radius"));
        assert_eq!(suggest("centre", candidates).as_deref(), Some("center"));
        assert_eq!(suggest("zzz", candidates), None);
        assert_eq!(suggest("%t", candidates), None);
        assert_eq!(suggest("radius", ["radius"]), None);
    }
}
