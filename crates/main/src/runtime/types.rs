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

/// A unique identifier of a type registered in the
/// [ClassTable](crate::runtime::ClassTable).
///
/// The first [MAX_PRIMITIVES] identifiers denote the built-in
/// [PrimitiveType]s. User-defined classes follow them.
pub type TypeUid = usize;

/// An identifier of a type that has not been resolved.
pub const INVALID_TYPE: TypeUid = TypeUid::MAX;

/// The number of built-in primitive types.
pub const MAX_PRIMITIVES: TypeUid = 12;

/// An array rank denoting an array of arbitrary dimensions (`var[]..[]`).
pub const ARBITRARY_RANK: isize = -1;

/// A built-in type of the language.
///
/// The discriminant of each variant is the [TypeUid] under which the type is
/// registered in every class table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(usize)]
pub enum PrimitiveType {
    Double = 0,
    Int,
    Bool,
    Char,
    String,
    Var,
    Void,
    Null,
    Array,
    Pointer,
    FunctionPointer,
    Return,
}

impl Display for PrimitiveType {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.name())
    }
}

impl PrimitiveType {
    /// All primitive types in the order of their identifiers.
    pub const ALL: [Self; MAX_PRIMITIVES] = [
        Self::Double,
        Self::Int,
        Self::Bool,
        Self::Char,
        Self::String,
        Self::Var,
        Self::Void,
        Self::Null,
        Self::Array,
        Self::Pointer,
        Self::FunctionPointer,
        Self::Return,
    ];

    /// Returns the name under which the type is visible in the source code.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Char => "char",
            Self::String => "string",
            Self::Var => "var",
            Self::Void => "void",
            Self::Null => "null",
            Self::Array => "array",
            Self::Pointer => "pointer",
            Self::FunctionPointer => "function_pointer",
            Self::Return => "return_reserved",
        }
    }

    #[inline(always)]
    pub const fn uid(self) -> TypeUid {
        self as TypeUid
    }

    /// Returns the primitive type with the specified identifier, or None if
    /// the identifier denotes a user-defined class.
    #[inline(always)]
    pub fn from_uid(uid: TypeUid) -> Option<Self> {
        Self::ALL.get(uid).copied()
    }
}

/// A type of a symbol, a literal, or an expression.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Type {
    /// The identifier of the element type.
    pub uid: TypeUid,

    /// The number of array dimensions. Zero for scalars,
    /// [ARBITRARY_RANK] for arrays of unknown dimensionality.
    pub rank: isize,

    /// True if values of this type can be subscripted.
    pub is_indexable: bool,
}

impl Default for Type {
    #[inline(always)]
    fn default() -> Self {
        Self::primitive(PrimitiveType::Var)
    }
}

impl Display for Type {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match PrimitiveType::from_uid(self.uid) {
            Some(primitive) => formatter.write_str(primitive.name())?,
            None if self.uid == INVALID_TYPE => formatter.write_str("?")?,
            None => formatter.write_fmt(format_args!("class#{}", self.uid))?,
        }

        match self.rank {
            0 => Ok(()),
            rank if rank < 0 => formatter.write_str("[]..[]"),
            rank => {
                for _ in 0..rank {
                    formatter.write_str("[]")?;
                }

                Ok(())
            }
        }
    }
}

impl From<PrimitiveType> for Type {
    #[inline(always)]
    fn from(value: PrimitiveType) -> Self {
        Self::primitive(value)
    }
}

impl Type {
    /// Returns a scalar type of the specified primitive.
    #[inline(always)]
    pub const fn primitive(primitive: PrimitiveType) -> Self {
        Self {
            uid: primitive.uid(),
            rank: 0,
            is_indexable: false,
        }
    }

    /// Returns a scalar type with the specified identifier.
    #[inline(always)]
    pub const fn scalar(uid: TypeUid) -> Self {
        Self {
            uid,
            rank: 0,
            is_indexable: false,
        }
    }

    /// Returns an array type with the specified element type and rank.
    #[inline(always)]
    pub const fn array(uid: TypeUid, rank: isize) -> Self {
        Self {
            uid,
            rank,
            is_indexable: rank != 0,
        }
    }

    /// Returns the type that has not been resolved yet.
    #[inline(always)]
    pub const fn invalid() -> Self {
        Self::scalar(INVALID_TYPE)
    }

    #[inline(always)]
    pub fn is(&self, primitive: PrimitiveType) -> bool {
        self.uid == primitive.uid()
    }

    /// Returns true if this type is an array (of known or arbitrary rank).
    #[inline(always)]
    pub fn is_array(&self) -> bool {
        self.rank != 0
    }

    /// Returns true if this type identifier denotes a user-defined class.
    #[inline(always)]
    pub fn is_class(&self) -> bool {
        self.uid >= MAX_PRIMITIVES && self.uid != INVALID_TYPE
    }

    /// Returns this type with `dims` dimensions removed.
    ///
    /// Subscripting an array of arbitrary rank keeps it arbitrary.
    pub fn subscripted(mut self, dims: usize) -> Self {
        if self.rank < 0 {
            return self;
        }

        let dims = isize::try_from(dims).unwrap_or(isize::MAX);

        self.rank = (self.rank - dims).max(0);
        self.is_indexable = self.rank != 0;

        self
    }
}

/// Returns true if type `t1` is allowed to be inferred in place of `t2`.
///
/// The query is used to pick the inferred type of literals: an unresolved or
/// a user-defined class type on either side always allows inference;
/// otherwise, the primitive type with the lower identifier is considered
/// higher-ranked.
pub fn is_higher_rank(t1: TypeUid, t2: TypeUid) -> bool {
    if t1 == INVALID_TYPE || t2 == INVALID_TYPE {
        return true;
    }

    if t1 >= MAX_PRIMITIVES || t2 >= MAX_PRIMITIVES {
        return true;
    }

    t1 <= t2
}

#[cfg(test)]
mod tests {
    use crate::runtime::{
        is_higher_rank,
        PrimitiveType,
        Type,
        ARBITRARY_RANK,
        INVALID_TYPE,
        MAX_PRIMITIVES,
    };

    #[test]
    fn test_primitive_uids() {
        for (index, primitive) in PrimitiveType::ALL.iter().enumerate() {
            assert_eq!(primitive.uid(), index);
            assert_eq!(PrimitiveType::from_uid(index), Some(*primitive));
        }

        assert_eq!(PrimitiveType::from_uid(MAX_PRIMITIVES), None);
    }

    #[test]
    fn test_higher_rank() {
        let double = PrimitiveType::Double.uid();
        let int = PrimitiveType::Int.uid();
        let var = PrimitiveType::Var.uid();

        assert!(is_higher_rank(double, int));
        assert!(!is_higher_rank(var, int));
        assert!(is_higher_rank(int, int));
        assert!(is_higher_rank(INVALID_TYPE, int));
        assert!(is_higher_rank(var, MAX_PRIMITIVES + 3));
    }

    #[test]
    fn test_subscripting() {
        let array = Type::array(PrimitiveType::Int.uid(), 2);

        assert_eq!(array.subscripted(1).rank, 1);
        assert_eq!(array.subscripted(2).rank, 0);
        assert!(!array.subscripted(2).is_indexable);
        assert_eq!(array.subscripted(5).rank, 0);

        let arbitrary = Type::array(PrimitiveType::Var.uid(), ARBITRARY_RANK);

        assert_eq!(arbitrary.subscripted(3).rank, ARBITRARY_RANK);
        assert_eq!(array.to_string(), "int[][]");
        assert_eq!(arbitrary.to_string(), "var[]..[]");
    }
}
