const RNA_BITMASK_A: u8 = 1;
const RNA_BITMASK_C: u8 = 2;
const RNA_BITMASK_G: u8 = 4;
const RNA_BITMASK_U: u8 = 8;
const RNA_BITMASK_N: u8 = RNA_BITMASK_A | RNA_BITMASK_C | RNA_BITMASK_G | RNA_BITMASK_U;

/// A bitmasked IUPAC code for RNA bases, eg RNA_BITMASK_A|RNA_BITMASK_C.
/// `T` is treated as `U` throughout.
#[derive(Debug, Copy, Clone, PartialEq, Hash)]
pub struct IupacCode(u8);

impl IupacCode {
    pub fn new(bitmask: u8) -> Self {
        Self(bitmask)
    }

    #[inline(always)]
    pub fn from_letter(letter: u8) -> Self {
        match letter.to_ascii_uppercase() {
            b'A' => Self(RNA_BITMASK_A),
            b'C' => Self(RNA_BITMASK_C),
            b'G' => Self(RNA_BITMASK_G),
            b'T' => Self(RNA_BITMASK_U),
            b'U' => Self(RNA_BITMASK_U),
            b'W' => Self(RNA_BITMASK_A | RNA_BITMASK_U),
            b'S' => Self(RNA_BITMASK_C | RNA_BITMASK_G),
            b'M' => Self(RNA_BITMASK_A | RNA_BITMASK_C),
            b'K' => Self(RNA_BITMASK_G | RNA_BITMASK_U),
            b'R' => Self(RNA_BITMASK_A | RNA_BITMASK_G),
            b'Y' => Self(RNA_BITMASK_C | RNA_BITMASK_U),
            b'B' => Self(RNA_BITMASK_C | RNA_BITMASK_G | RNA_BITMASK_U),
            b'D' => Self(RNA_BITMASK_A | RNA_BITMASK_G | RNA_BITMASK_U),
            b'H' => Self(RNA_BITMASK_A | RNA_BITMASK_C | RNA_BITMASK_U),
            b'V' => Self(RNA_BITMASK_A | RNA_BITMASK_C | RNA_BITMASK_G),
            b'N' => Self(RNA_BITMASK_N),
            _ => Self(0),
        }
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    pub fn subset(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Swaps A<->U and C<->G while keeping degenerate combinations intact.
    #[inline(always)]
    pub fn complement(self) -> Self {
        let mut ret = 0;
        if self.0 & RNA_BITMASK_A != 0 {
            ret |= RNA_BITMASK_U;
        }
        if self.0 & RNA_BITMASK_U != 0 {
            ret |= RNA_BITMASK_A;
        }
        if self.0 & RNA_BITMASK_C != 0 {
            ret |= RNA_BITMASK_G;
        }
        if self.0 & RNA_BITMASK_G != 0 {
            ret |= RNA_BITMASK_C;
        }
        Self(ret)
    }

    #[inline(always)]
    pub fn is_valid_letter(letter: u8) -> bool {
        !Self::from_letter(letter).is_empty()
    }

    #[inline(always)]
    pub fn letter_complement(letter: u8) -> u8 {
        match letter.to_ascii_uppercase() {
            b'A' => b'U',
            b'C' => b'G',
            b'G' => b'C',
            b'T' => b'A',
            b'U' => b'A',
            b'W' => b'W',
            b'S' => b'S',
            b'M' => b'K',
            b'K' => b'M',
            b'R' => b'Y',
            b'Y' => b'R',
            b'B' => b'V',
            b'D' => b'H',
            b'H' => b'D',
            b'V' => b'B',
            _ => b'N',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_letter() {
        assert_eq!(IupacCode::from_letter(b'a'), IupacCode::from_letter(b'A'));
        assert_eq!(IupacCode::from_letter(b'T'), IupacCode::from_letter(b'U'));
        assert!(IupacCode::from_letter(b'X').is_empty());
    }

    #[test]
    fn test_subset() {
        assert!(
            !IupacCode::from_letter(b'V')
                .subset(IupacCode::from_letter(b'G'))
                .is_empty()
        );
        assert!(
            IupacCode::from_letter(b'H')
                .subset(IupacCode::from_letter(b'G'))
                .is_empty()
        );
        assert!(
            !IupacCode::from_letter(b'N')
                .subset(IupacCode::from_letter(b'U'))
                .is_empty()
        );
    }

    #[test]
    fn test_complement() {
        assert_eq!(
            IupacCode::from_letter(b'A').complement(),
            IupacCode::from_letter(b'U')
        );
        assert_eq!(
            IupacCode::from_letter(b'R').complement(),
            IupacCode::from_letter(b'Y')
        );
        assert_eq!(
            IupacCode::from_letter(b'N').complement(),
            IupacCode::from_letter(b'N')
        );
    }

    #[test]
    fn test_letter_complement() {
        assert_eq!(IupacCode::letter_complement(b'A'), b'U');
        assert_eq!(IupacCode::letter_complement(b'U'), b'A');
        assert_eq!(IupacCode::letter_complement(b'G'), b'C');
        assert_eq!(IupacCode::letter_complement(b'K'), b'M');
        assert_eq!(IupacCode::letter_complement(b'X'), b'N');
    }
}
