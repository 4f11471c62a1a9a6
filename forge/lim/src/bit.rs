//! The per-bit lattice used to size operators and drive constant
//! propagation.
use crate::common::{BitIdx, BusIdx};
use forge_idx::{
    IndexRef,
    maps::{IndexedMap, SecondaryMap},
};
use forge_utils::{Error, ForgeResult};

/// Classification of a single bit of a [`Value`](crate::Value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bit {
    /// Constant logic zero.
    Zero,
    /// Constant logic one.
    One,
    /// A bit whose value matters but is not known statically.
    Care,
    /// A bit whose value never matters.
    DontCare,
    /// A bit produced by a bus. See [`BitTable`].
    Owned(BitIdx),
}

impl Bit {
    /// Everything except [`Bit::DontCare`] is a care bit.
    pub fn is_care(&self) -> bool {
        !matches!(self, Bit::DontCare)
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Bit::Zero | Bit::One)
    }

    /// True for the four process-wide constants.
    pub fn is_global(&self) -> bool {
        !matches!(self, Bit::Owned(_))
    }

    pub fn is_on(&self) -> bool {
        matches!(self, Bit::One)
    }

    pub fn is_off(&self) -> bool {
        matches!(self, Bit::Zero)
    }

    /// The constant this bit represents, if any.
    pub fn constant(&self) -> Option<bool> {
        match self {
            Bit::Zero => Some(false),
            Bit::One => Some(true),
            _ => None,
        }
    }

    pub fn from_constant(on: bool) -> Self {
        if on { Bit::One } else { Bit::Zero }
    }
}

impl std::fmt::Display for Bit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bit::Zero => write!(f, "0"),
            Bit::One => write!(f, "1"),
            Bit::Care => write!(f, "c"),
            Bit::DontCare => write!(f, "x"),
            Bit::Owned(idx) => write!(f, "b{}", idx.index()),
        }
    }
}

/// Where a bus-owned bit comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitData {
    /// The bus that produces this bit. Never changes after allocation.
    pub owner: BusIdx,
    /// Ordinal position among the owner's bits.
    pub position: u32,
}

/// Storage for every bus-owned bit of a design. Logical inversion is recorded
/// in a side table instead of rewriting ownership.
#[derive(Debug, Default, Clone)]
pub struct BitTable {
    bits: IndexedMap<BitIdx, BitData>,
    inverted: SecondaryMap<BitIdx, Option<BitIdx>>,
}

impl BitTable {
    pub(crate) fn alloc(&mut self, owner: BusIdx, position: u32) -> BitIdx {
        self.bits.push(BitData { owner, position })
    }

    pub fn data(&self, bit: BitIdx) -> BitData {
        self.bits[bit]
    }

    pub fn owner(&self, bit: BitIdx) -> BusIdx {
        self.bits[bit].owner
    }

    pub fn position(&self, bit: BitIdx) -> u32 {
        self.bits[bit].position
    }

    /// Record that `bit` is the logical inverse of `inverse` (and vice
    /// versa). A bit may only be unified with one inverse.
    pub fn set_inverted(
        &mut self,
        bit: BitIdx,
        inverse: BitIdx,
    ) -> ForgeResult<()> {
        if bit == inverse {
            return Err(Error::malformed_structure(format!(
                "bit b{} cannot be its own inverse",
                bit.index()
            )));
        }
        for (a, b) in [(bit, inverse), (inverse, bit)] {
            match self.inverted[a] {
                Some(existing) if existing != b => {
                    return Err(Error::malformed_structure(format!(
                        "bit b{} is already the inverse of b{}",
                        a.index(),
                        existing.index()
                    )));
                }
                _ => {}
            }
        }
        self.inverted.insert(bit, Some(inverse));
        self.inverted.insert(inverse, Some(bit));
        Ok(())
    }

    /// The bit this one was unified with as its logical inverse.
    pub fn inverted(&self, bit: BitIdx) -> Option<BitIdx> {
        self.inverted[bit]
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Bit, BitTable};
    use crate::common::BusIdx;

    #[test]
    fn global_bit_classification() {
        assert!(Bit::Zero.is_constant() && Bit::One.is_constant());
        assert!(!Bit::Care.is_constant());
        assert!(Bit::Care.is_care());
        assert!(!Bit::DontCare.is_care());
        assert_eq!(Bit::One.constant(), Some(true));
        assert_eq!(Bit::DontCare.constant(), None);
    }

    #[test]
    fn inversion_is_a_side_mapping() {
        let mut table = BitTable::default();
        let a = table.alloc(BusIdx::from(0_u32), 0);
        let b = table.alloc(BusIdx::from(1_u32), 0);
        let c = table.alloc(BusIdx::from(1_u32), 1);

        table.set_inverted(a, b).unwrap();
        assert_eq!(table.inverted(a), Some(b));
        assert_eq!(table.inverted(b), Some(a));
        // Ownership is untouched by inversion.
        assert_eq!(table.owner(a), BusIdx::from(0_u32));
        assert_eq!(table.owner(b), BusIdx::from(1_u32));
        // Re-stating the same pair is fine, a second partner is not.
        assert!(table.set_inverted(b, a).is_ok());
        assert!(table.set_inverted(a, c).is_err());
        assert!(table.set_inverted(c, c).is_err());
        assert!(!Bit::Owned(c).is_global());
    }
}
