//! Value types carried by discrete fields.
//!
//! One generic algorithm serves every value type; what differs per type is
//! captured by [`FieldValue`]: its tag, how it changes under face reversal,
//! and how two values are blended.

use num_traits::Float;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type Scalar = f64;
pub type Vector = [f64; 3];
/// Symmetric tensor components `xx, xy, xz, yy, yz, zz`.
pub type SymmTensor = [f64; 6];
/// Full tensor components in row-major order.
pub type Tensor = [f64; 9];
pub type Label = i64;

/// Tag naming a field's value type on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    Scalar,
    Vector,
    SymmTensor,
    Tensor,
    Label,
}

impl ValueType {
    pub const ALL: [ValueType; 5] = [
        ValueType::Scalar,
        ValueType::Vector,
        ValueType::SymmTensor,
        ValueType::Tensor,
        ValueType::Label,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Scalar => "scalar",
            ValueType::Vector => "vector",
            ValueType::SymmTensor => "symmTensor",
            ValueType::Tensor => "tensor",
            ValueType::Label => "label",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value stored per cell, face, point, or particle.
pub trait FieldValue:
    Clone + fmt::Debug + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static
{
    const VALUE_TYPE: ValueType;

    /// The value as seen from the other side of a reversed face.
    fn flipped(&self) -> Self;

    /// `self * (1 - weight) + other * weight`.
    fn blend(&self, other: &Self, weight: f64) -> Self;
}

fn lerp<F: Float>(a: F, b: F, weight: F) -> F {
    a + (b - a) * weight
}

impl FieldValue for Scalar {
    const VALUE_TYPE: ValueType = ValueType::Scalar;

    fn flipped(&self) -> Self {
        -*self
    }

    fn blend(&self, other: &Self, weight: f64) -> Self {
        lerp(*self, *other, weight)
    }
}

impl FieldValue for Label {
    const VALUE_TYPE: ValueType = ValueType::Label;

    fn flipped(&self) -> Self {
        -*self
    }

    fn blend(&self, other: &Self, weight: f64) -> Self {
        lerp(*self as f64, *other as f64, weight).round() as Label
    }
}

macro_rules! impl_component_value {
    ($($t:ty => $tag:ident),* $(,)?) => {
        $(
            impl FieldValue for $t {
                const VALUE_TYPE: ValueType = ValueType::$tag;

                fn flipped(&self) -> Self {
                    self.map(|c| -c)
                }

                fn blend(&self, other: &Self, weight: f64) -> Self {
                    let mut out = *self;
                    for (o, &b) in out.iter_mut().zip(other.iter()) {
                        *o = lerp(*o, b, weight);
                    }
                    out
                }
            }
        )*
    };
}

impl_component_value!(
    Vector => Vector,
    SymmTensor => SymmTensor,
    Tensor => Tensor,
);

/// Run `$body` with the type alias `$t` bound to the Rust type of a runtime
/// [`ValueType`] tag.
///
/// ```
/// use mesh_decompose::field::ValueType;
/// use mesh_decompose::with_value_type;
///
/// fn width(vt: ValueType) -> usize {
///     with_value_type!(vt, T => std::mem::size_of::<T>() / 8)
/// }
/// assert_eq!(width(ValueType::Tensor), 9);
/// ```
#[macro_export]
macro_rules! with_value_type {
    ($value_type:expr, $t:ident => $body:expr) => {
        match $value_type {
            $crate::field::ValueType::Scalar => {
                type $t = $crate::field::Scalar;
                $body
            }
            $crate::field::ValueType::Vector => {
                type $t = $crate::field::Vector;
                $body
            }
            $crate::field::ValueType::SymmTensor => {
                type $t = $crate::field::SymmTensor;
                $body
            }
            $crate::field::ValueType::Tensor => {
                type $t = $crate::field::Tensor;
                $body
            }
            $crate::field::ValueType::Label => {
                type $t = $crate::field::Label;
                $body
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn flipping_negates_every_component() {
        assert_eq!(2.5f64.flipped(), -2.5);
        assert_eq!([1.0f64, -2.0, 0.0].flipped(), [-1.0, 2.0, -0.0]);
        assert_eq!(7i64.flipped(), -7);
    }

    #[test]
    fn blend_is_linear() {
        assert_relative_eq!(1.0f64.blend(&3.0, 0.5), 2.0);
        let v = [0.0f64, 2.0, 4.0].blend(&[2.0, 2.0, 0.0], 0.25);
        assert_relative_eq!(v[0], 0.5);
        assert_relative_eq!(v[1], 2.0);
        assert_relative_eq!(v[2], 3.0);
        assert_eq!(1i64.blend(&4, 0.5), 3);
    }

    #[test]
    fn value_type_tags_match_names() {
        for vt in ValueType::ALL {
            let json = serde_json::to_string(&vt).unwrap();
            assert_eq!(json, format!("\"{}\"", vt.as_str()));
            let matched = with_value_type!(vt, T => <T as FieldValue>::VALUE_TYPE);
            assert_eq!(matched, vt);
        }
    }
}
