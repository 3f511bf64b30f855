use num_integer::div_ceil;
use unwrap::unwrap;

/// Returns the index and mask necessary to access the bit at `index` in a ```&[u64]```.
///
/// # Example
///
/// ```
/// # use nandsim::data_structures::word_mask_64;
/// let word_slice = [0u64, 1u64];
/// let bit_index = 64;
///
/// let (word_index, mask) = word_mask_64(bit_index);
/// let bit_set = (word_slice[word_index] & mask) != 0;
///
/// assert_eq!(bit_set, true);
/// ```
#[inline(always)]
pub fn word_mask_64(index: usize) -> (usize, u64) {
    (index / 64, 1 << (index % 64))
}

/// Position of a single signal inside a [TraceWord], precomputed so the hot loop
/// never has to divide.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Bit {
    pub(crate) word: usize,
    pub(crate) mask: u64,
}

impl Bit {
    /// Returns the [Bit] at position `index`.
    pub fn new(index: usize) -> Self {
        let (word, mask) = word_mask_64(index);
        Bit { word, mask }
    }

    /// Returns the position of the bit in its [TraceWord].
    pub fn index(&self) -> usize {
        self.word * 64 + self.mask.trailing_zeros() as usize
    }
}

/// The live value of every signal of a synthesized circuit, packed into words.
///
/// [TraceWord] allocates bits in multiples of 64.
/// # Example
/// ```
/// # use nandsim::data_structures::{Bit, TraceWord};
/// let mut t = TraceWord::new(70);
///
/// assert_eq!(t.len(), 128);
///
/// t.set(Bit::new(65), true);
/// assert_eq!(t.get(Bit::new(65)), true);
/// assert_eq!(t.get(Bit::new(64)), false);
/// ```
///
/// # Panics
///
/// Panics if you try to read or write a bit >= [TraceWord::len()]
///
/// ```should_panic
/// # use nandsim::data_structures::{Bit, TraceWord};
/// let t = TraceWord::new(2);
///
/// t.get(Bit::new(64));
/// ```
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct TraceWord {
    words: Vec<u64>,
}

impl TraceWord {
    /// Returns a new [TraceWord] with `n` bits all of which are initialized to `false`.
    pub fn new(n: usize) -> Self {
        TraceWord {
            words: vec![0; div_ceil(n, 64)],
        }
    }

    /// Returns true if `bit` is set.
    ///
    /// # Panics
    ///
    /// Panics if `bit` >= [TraceWord::len()]
    #[inline(always)]
    pub fn get(&self, bit: Bit) -> bool {
        let word = unwrap!(
            self.words.get(bit.word),
            "Tried to access index out of bounds:{}, size:{}",
            bit.index(),
            self.len(),
        );
        word & bit.mask != 0
    }

    /// Sets `bit` to `value`.
    ///
    /// # Panics
    ///
    /// Panics if `bit` >= [TraceWord::len()]
    #[inline(always)]
    pub fn set(&mut self, bit: Bit, value: bool) {
        let word = &mut self.words[bit.word];
        if value {
            *word |= bit.mask;
        } else {
            *word &= !bit.mask;
        }
    }

    /// Returns the number of bits in the [TraceWord].
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.words.len() * 64
    }

    /// Overwrites `self` with the bits of `other`, reusing the allocation.
    ///
    /// # Panics
    ///
    /// Panics if the lengths differ.
    pub fn copy_from(&mut self, other: &TraceWord) {
        self.words.copy_from_slice(&other.words)
    }

    /// Returns true if `self` and `other` differ in any bit that is not set in `ignore`.
    pub fn differs_outside(&self, other: &TraceWord, ignore: &TraceWord) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .zip(&ignore.words)
            .any(|((a, b), ignore)| (a ^ b) & !ignore != 0)
    }

    // The dark corner.

    /// Unsafe version of [TraceWord::get].
    ///
    /// # Safety
    /// This function is safe if `bit` < [TraceWord::len()].
    /// Will panic in debug mode if the invariant is broken.
    #[inline(always)]
    pub unsafe fn get_very_unsafely(&self, bit: Bit) -> bool {
        debug_assert!(
            bit.word < self.words.len(),
            "Tried to access index:{} >= TraceWord::len():{}",
            bit.index(),
            self.len()
        );
        self.words.get_unchecked(bit.word) & bit.mask != 0
    }

    /// Unsafe version of [TraceWord::set].
    ///
    /// # Safety
    /// This function is safe if `bit` < [TraceWord::len()].
    /// Will panic in debug mode if the invariant is broken.
    #[inline(always)]
    pub unsafe fn set_very_unsafely(&mut self, bit: Bit, value: bool) {
        debug_assert!(
            bit.word < self.words.len(),
            "Tried to write to index:{} >= TraceWord::len():{}",
            bit.index(),
            self.len()
        );
        let word = self.words.get_unchecked_mut(bit.word);
        if value {
            *word |= bit.mask;
        } else {
            *word &= !bit.mask;
        }
    }
}
