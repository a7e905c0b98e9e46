// SPDX-License-Identifier: LGPL-3.0-or-later

//! Counter-based pseudo-random generator (Philox 4x32, 10 rounds).
//!
//! The output stream is a pure function of a key and a 128-bit counter:
//! word `k` of the stream is word `k % 4` of the block transform applied to
//! counter `k / 4`. This makes [`Philox4x32::discard`] an O(1) big-integer
//! addition instead of a replay, which is what lets the noise streams seek to
//! arbitrary sample positions.
//!
//! The round function follows the layout of the plugin this crate replaces,
//! not the published P2075 test vectors: the 10000th output of a
//! default-seeded generator is `1026757194` here, not `1955073260`. Existing
//! renders depend on this sequence, so it is kept as is.

/// Number of 32-bit words produced per block transform.
pub const WORD_COUNT: usize = 4;

/// Number of mixing rounds per block.
pub const ROUND_COUNT: u32 = 10;

/// Seed used by [`Philox4x32::default`].
pub const DEFAULT_SEED: u32 = 20_111_115;

const MULTIPLIERS: [u32; WORD_COUNT / 2] = [0xD251_1F53, 0xCD9E_8D57];
const ROUND_CONSTS: [u32; WORD_COUNT / 2] = [0x9E37_79B9, 0xBB67_AE85];

/// Philox 4x32 generator with a buffered output block.
///
/// # Examples
/// ```
/// use spectral_noise_lib::rng::Philox4x32;
///
/// let mut a = Philox4x32::new(7);
/// let mut b = Philox4x32::new(7);
///
/// for _ in 0..1000 {
///     a.next_u32();
/// }
/// b.discard(1000);
/// assert_eq!(a.next_u32(), b.next_u32());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Philox4x32 {
    key: [u32; WORD_COUNT / 2],
    /// Little-endian words of the 128-bit counter of the *next* block.
    counter: [u32; WORD_COUNT],
    block: [u32; WORD_COUNT],
    /// Index of the most recently returned word in `block`.
    cursor: usize,
}

impl Default for Philox4x32 {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl Philox4x32 {
    /// Create a generator keyed by `seed`, positioned at the start of the stream.
    pub fn new(seed: u32) -> Self {
        Self {
            key: [seed, 0],
            counter: [0; WORD_COUNT],
            block: [0; WORD_COUNT],
            cursor: WORD_COUNT - 1,
        }
    }

    /// Return the next 32-bit word of the stream.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.cursor += 1;
        if self.cursor == WORD_COUNT {
            self.generate();
            self.increment_counter();
            self.cursor = 0;
        }
        self.block[self.cursor]
    }

    /// Skip `n` words of the stream.
    ///
    /// Runs in constant time regardless of `n`: the counter is advanced by
    /// `n / 4` blocks with carry propagation and at most one block is
    /// regenerated.
    pub fn discard(&mut self, n: u64) {
        let z = n as u128 + self.cursor as u128;
        if z < WORD_COUNT as u128 {
            self.cursor = z as usize;
            return;
        }

        self.cursor = (z % WORD_COUNT as u128) as usize;
        let mut blocks = z / WORD_COUNT as u128;

        // `next_u32` generates a block *before* incrementing the counter, so a
        // partially consumed block must be generated from the preceding counter.
        let partial = self.cursor != WORD_COUNT - 1;
        if partial {
            blocks -= 1;
        }

        self.add_to_counter(blocks);

        if partial {
            self.generate();
            self.increment_counter();
        }
    }

    /// Current 128-bit counter value of the next block.
    pub fn counter(&self) -> u128 {
        self.counter
            .iter()
            .rev()
            .fold(0u128, |acc, &w| (acc << 32) | w as u128)
    }

    fn add_to_counter(&mut self, mut z: u128) {
        for word in self.counter.iter_mut() {
            if z == 0 {
                break;
            }
            let z0 = z as u32;
            z >>= 32;
            let (sum, carry) = word.overflowing_add(z0);
            *word = sum;
            if carry {
                z += 1;
            }
        }
    }

    #[inline]
    fn increment_counter(&mut self) {
        for word in self.counter.iter_mut() {
            *word = word.wrapping_add(1);
            if *word != 0 {
                break;
            }
        }
    }

    fn generate(&mut self) {
        let mut y = self.counter;
        for q in 0..ROUND_COUNT {
            let v = [y[0], y[3], y[2], y[1]];
            for k in 0..WORD_COUNT / 2 {
                let product = v[2 * k + 1] as u64 * MULTIPLIERS[k] as u64;
                let round_key = self.key[k].wrapping_add(q.wrapping_mul(ROUND_CONSTS[k]));
                y[2 * k] = product as u32;
                y[2 * k + 1] = (product >> 32) as u32 ^ round_key ^ v[2 * k];
            }
        }
        self.block = y;
    }
}
