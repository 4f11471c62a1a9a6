use crate::Bit;
use forge_utils::{Error, ForgeResult};
use smallvec::SmallVec;

/// The logical content of a bus or port as an ordered sequence of [`Bit`]s,
/// least significant bit first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Value {
    bits: SmallVec<[Bit; 16]>,
    signed: bool,
}

impl Value {
    /// A value of `size` generic care bits.
    pub fn new(size: usize, signed: bool) -> Self {
        Self {
            bits: SmallVec::from_elem(Bit::Care, size),
            signed,
        }
    }

    pub fn from_bits<I>(bits: I, signed: bool) -> Self
    where
        I: IntoIterator<Item = Bit>,
    {
        Self {
            bits: bits.into_iter().collect(),
            signed,
        }
    }

    /// A fully constant value holding `constant`, at least `min_size` bits
    /// wide. Padding bits repeat the sign bit for signed values.
    pub fn constant(constant: i64, min_size: usize, signed: bool) -> Self {
        let size = if constant >= 0 {
            64 - constant.leading_zeros() as usize
        } else {
            65 - (!constant).leading_zeros() as usize
        };
        let mut value = Value::from_bits(
            (0..size).map(|i| Bit::from_constant((constant >> i) & 1 == 1)),
            signed,
        );
        let pad = if signed && size > 0 {
            value.bits[size - 1]
        } else {
            Bit::Zero
        };
        let width = size.max(min_size).max(1);
        value.bits.resize(width, pad);
        value
    }

    /// Parses a sequence of `1`, `0`, `c` and `x`, most significant bit
    /// first.
    pub fn parse(token: &str) -> ForgeResult<Self> {
        let bits = token
            .chars()
            .rev()
            .map(|ch| match ch.to_ascii_lowercase() {
                '1' => Ok(Bit::One),
                '0' => Ok(Bit::Zero),
                'c' => Ok(Bit::Care),
                'x' => Ok(Bit::DontCare),
                _ => Err(Error::unknown_type(format!(
                    "invalid bit specifier `{ch}` in `{token}`"
                ))),
            })
            .collect::<ForgeResult<SmallVec<_>>>()?;
        Ok(Self {
            bits,
            signed: false,
        })
    }

    /// A generic value sized for a numeric type of the source language.
    pub fn for_source_type(type_name: &str) -> ForgeResult<Self> {
        let (size, signed) = match type_name {
            "boolean" => (1, false),
            "byte" => (8, true),
            "char" => (16, false),
            "short" => (16, true),
            "int" => (32, true),
            "long" => (64, true),
            other => {
                return Err(Error::unknown_type(format!(
                    "cannot size a value for source type `{other}`"
                )));
            }
        };
        Ok(Self::new(size, signed))
    }

    pub fn size(&self) -> usize {
        self.bits.len()
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn bit(&self, position: usize) -> Bit {
        self.bits[position]
    }

    pub fn bits(&self) -> &[Bit] {
        &self.bits
    }

    pub fn set_bit(&mut self, position: usize, bit: Bit) {
        self.bits[position] = bit;
    }

    /// True if every care bit is a constant.
    pub fn is_constant(&self) -> bool {
        self.bits.iter().all(|b| !b.is_care() || b.is_constant())
    }

    /// True if no bit is a care bit.
    pub fn is_dont_care(&self) -> bool {
        self.bits.iter().all(|b| !b.is_care())
    }

    pub fn care_mask(&self) -> u64 {
        self.mask(Bit::is_care)
    }

    pub fn constant_mask(&self) -> u64 {
        self.mask(Bit::is_constant)
    }

    /// The on/off state of every bit, sign extended to 64 bits for signed
    /// values.
    pub fn value_mask(&self) -> u64 {
        let mut mask = self.mask(Bit::is_on);
        let size = self.size();
        if self.signed && size > 0 && size < 64 && self.bits[size - 1].is_on() {
            mask |= u64::MAX << size;
        }
        mask
    }

    fn mask(&self, pred: fn(&Bit) -> bool) -> u64 {
        self.bits
            .iter()
            .take(64)
            .enumerate()
            .filter(|(_, b)| pred(b))
            .fold(0, |mask, (i, _)| mask | (1_u64 << i))
    }

    /// Merge two values of the same shape. Bits that agree are kept, bits
    /// that differ become generic care bits.
    pub fn union(&self, other: &Value) -> ForgeResult<Value> {
        if self.size() != other.size() || self.signed != other.signed {
            return Err(Error::malformed_structure(format!(
                "cannot union values of shape {}{} and {}{}",
                self.size(),
                if self.signed { "s" } else { "u" },
                other.size(),
                if other.signed { "s" } else { "u" },
            )));
        }
        Ok(Value::from_bits(
            self.bits.iter().zip(&other.bits).map(
                |(a, b)| {
                    if a == b { *a } else { Bit::Care }
                },
            ),
            self.signed,
        ))
    }

    /// The minimum number of bits that carry information for constant
    /// propagation. Redundant copies of the most significant bit are
    /// dropped.
    pub fn compacted_size(&self) -> usize {
        let size = self.size();
        if size == 0 {
            return 1;
        }
        let mut compacted = size;
        let mut msb = size - 1;
        let top = self.bits[msb];
        if !self.signed && top.is_care() && !top.is_off() {
            return compacted;
        }
        for i in (0..size - 1).rev() {
            let top = self.bits[msb];
            let differs = top != self.bits[i];
            if top == Bit::Care
                || (!top.is_global() && differs)
                || (top.is_care() && differs)
            {
                break;
            }
            compacted -= 1;
            msb = i;
        }
        compacted.max(1)
    }

    /// The number represented by this value. Don't-care bits read as zero;
    /// any bit that is not a global constant is an error.
    pub fn to_number(&self) -> ForgeResult<i64> {
        if self.size() > 64 {
            return Err(Error::unknown_type(format!(
                "a {}-bit value does not fit a 64-bit number",
                self.size()
            )));
        }
        let non_constant = |b: &Bit| matches!(b, Bit::Care | Bit::Owned(_));
        if let Some(pos) = self.bits.iter().position(non_constant) {
            return Err(Error::malformed_structure(format!(
                "non constant bit at index {pos} of {self}"
            )));
        }
        Ok(self.value_mask() as i64)
    }

    /// A copy of this value with every bus-owned bit replaced by a generic
    /// care bit.
    pub fn generic(&self) -> Value {
        Value::from_bits(
            self.bits.iter().map(|b| match b {
                Bit::Owned(_) => Bit::Care,
                other => *other,
            }),
            self.signed,
        )
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for bit in self.bits.iter().rev() {
            match bit {
                Bit::Owned(_) => write!(f, "p")?,
                global => write!(f, "{global}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Value;
    use crate::Bit;
    use forge_utils::ErrorKind;

    #[test]
    fn parse_is_msb_first() {
        let v = Value::parse("10cx").unwrap();
        assert_eq!(v.size(), 4);
        assert_eq!(v.bit(0), Bit::DontCare);
        assert_eq!(v.bit(1), Bit::Care);
        assert_eq!(v.bit(2), Bit::Zero);
        assert_eq!(v.bit(3), Bit::One);
        assert_eq!(v.to_string(), "10cx");
        assert_eq!(v.care_mask(), 0b1110);
        assert_eq!(v.constant_mask(), 0b1100);
        assert!(!v.is_constant());
    }

    #[test]
    fn parse_rejects_unknown_specifiers() {
        let err = Value::parse("10z1").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnknownType(_)));
    }

    #[test]
    fn source_types_are_sized() {
        let int = Value::for_source_type("int").unwrap();
        assert_eq!(int.size(), 32);
        assert!(int.is_signed());
        assert_eq!(Value::for_source_type("char").unwrap().size(), 16);
        let err = Value::for_source_type("double").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnknownType(_)));
    }

    #[test]
    fn constants_are_sign_extended() {
        let five = Value::constant(5, 8, false);
        assert_eq!(five.to_string(), "00000101");
        assert_eq!(five.to_number().unwrap(), 5);

        let minus_two = Value::constant(-2, 4, true);
        assert_eq!(minus_two.to_string(), "1110");
        assert_eq!(minus_two.to_number().unwrap(), -2);
        assert_eq!(minus_two.compacted_size(), 2);

        assert_eq!(Value::constant(0, 0, false).size(), 1);
    }

    #[test]
    fn union_keeps_agreeing_bits() {
        let a = Value::parse("1100").unwrap();
        let b = Value::parse("1010").unwrap();
        let u = a.union(&b).unwrap();
        assert_eq!(u.to_string(), "1cc0");
        assert!(a.union(&Value::parse("10").unwrap()).is_err());
    }

    #[test]
    fn owned_bits_are_not_numbers() {
        let mut v = Value::parse("0000").unwrap();
        v.set_bit(1, Bit::Owned(0_u32.into()));
        assert!(v.to_number().is_err());
        assert_eq!(v.to_string(), "00p0");
        assert_eq!(v.generic().to_string(), "00c0");
        assert!(Value::parse("1x0x").unwrap().is_constant());
        assert!(Value::parse("xxxx").unwrap().is_dont_care());
    }
}
