//! Sign-encoded face indices.
//!
//! A local face maps to global face `g` either with matching orientation,
//! stored as `+(g+1)`, or seen from the other side, stored as `-(g+1)`.
//! The offset by one keeps global face 0 representable in both senses.

use crate::mesh_error::MeshError;
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "i64", into = "i64")]
#[repr(transparent)]
pub struct SignedFace(i64);

impl SignedFace {
    /// Encode global face `global`, `flipped` when the local owner is the global neighbour.
    #[inline]
    pub fn new(global: usize, flipped: bool) -> Self {
        let magnitude = global as i64 + 1;
        SignedFace(if flipped { -magnitude } else { magnitude })
    }

    /// Decode a raw `±(g+1)` value.
    pub fn from_raw(raw: i64) -> Result<Self, MeshError> {
        if raw == 0 {
            return Err(MeshError::InvalidSignedFace(raw));
        }
        Ok(SignedFace(raw))
    }

    /// Raw encoded value.
    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Global face index.
    #[inline]
    pub fn index(self) -> usize {
        (self.0.unsigned_abs() - 1) as usize
    }

    /// Whether the local owner/neighbour sense is reversed w.r.t. the global face.
    #[inline]
    pub const fn is_flipped(self) -> bool {
        self.0 < 0
    }

    /// `+1.0` or `-1.0`.
    #[inline]
    pub fn sign(self) -> f64 {
        if self.is_flipped() { -1.0 } else { 1.0 }
    }
}

impl TryFrom<i64> for SignedFace {
    type Error = MeshError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        SignedFace::from_raw(raw)
    }
}

impl From<SignedFace> for i64 {
    fn from(face: SignedFace) -> i64 {
        face.0
    }
}

impl fmt::Debug for SignedFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SignedFace").field(&self.0).finish()
    }
}

impl fmt::Display for SignedFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_zero_is_representable_both_ways() {
        let fwd = SignedFace::new(0, false);
        let rev = SignedFace::new(0, true);
        assert_eq!(fwd.raw(), 1);
        assert_eq!(rev.raw(), -1);
        assert_eq!(fwd.index(), 0);
        assert_eq!(rev.index(), 0);
        assert!(!fwd.is_flipped());
        assert!(rev.is_flipped());
        assert_eq!(rev.sign(), -1.0);
    }

    #[test]
    fn zero_raw_is_rejected() {
        assert_eq!(SignedFace::from_raw(0), Err(MeshError::InvalidSignedFace(0)));
    }

    #[test]
    fn serializes_as_plain_integer() {
        let json = serde_json::to_string(&vec![SignedFace::new(4, false), SignedFace::new(7, true)])
            .unwrap();
        assert_eq!(json, "[5,-8]");
        let back: Vec<SignedFace> = serde_json::from_str("[5,-8]").unwrap();
        assert_eq!(back[1].index(), 7);
        assert!(serde_json::from_str::<Vec<SignedFace>>("[0]").is_err());
    }

    #[test]
    fn display_shows_sign() {
        assert_eq!(SignedFace::new(2, false).to_string(), "+3");
        assert_eq!(SignedFace::new(2, true).to_string(), "-3");
    }
}
