//! Integer hashers and bucket index computation.
//!
//! Keys are hashed to a `u64` and reduced modulo the directory length with
//! unsigned arithmetic, so every key, negative ones included, maps into
//! `[0, capacity)`.

use std::hash::{BuildHasher, Hash, Hasher};

/// Hashes `key` with a fresh hasher from `state`.
pub fn hash_key<K, S>(state: &S, key: &K) -> u64
where
    K: Hash + ?Sized,
    S: BuildHasher,
{
    let mut hasher = state.build_hasher();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Position of a hash in a directory of `capacity` buckets.
///
/// `capacity` must be non-zero.
#[inline]
pub fn index(hash: u64, capacity: usize) -> usize {
    debug_assert!(capacity > 0);
    (hash % capacity as u64) as usize
}

/// The splitmix64 finaliser. Every input bit affects every output bit.
#[inline]
pub fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

// Signed integers are sign-extended so that `-1i32` and `-1i64` agree.
macro_rules! int_writes {
    ($($method:ident: $ty:ty as $via:ty),* $(,)?) => {
        $(
            #[inline]
            #[allow(clippy::unnecessary_cast)]
            fn $method(&mut self, n: $ty) {
                self.push(n as $via as u64);
            }
        )*
    };
}

macro_rules! word_hasher {
    ($name:ident) => {
        impl Hasher for $name {
            fn finish(&self) -> u64 {
                self.finish_word()
            }

            fn write(&mut self, bytes: &[u8]) {
                for chunk in bytes.chunks(8) {
                    let mut word = [0u8; 8];
                    word[..chunk.len()].copy_from_slice(chunk);
                    self.push(u64::from_le_bytes(word));
                }
            }

            int_writes! {
                write_u8: u8 as u64,
                write_u16: u16 as u64,
                write_u32: u32 as u64,
                write_u64: u64 as u64,
                write_usize: usize as u64,
                write_i8: i8 as i64,
                write_i16: i16 as i64,
                write_i32: i32 as i64,
                write_i64: i64 as i64,
                write_isize: isize as i64,
            }
        }
    };
}

/// Hasher whose output is the key's own integer bits.
///
/// Cheap, but keys that share their low bits land in the same bucket.
#[derive(Debug, Default, Clone)]
pub struct IdentityHasher {
    state: u64,
    words: u32,
}

impl IdentityHasher {
    #[inline]
    fn push(&mut self, word: u64) {
        // A single integer key hashes to itself; compound keys fold.
        self.state = if self.words == 0 {
            word
        } else {
            self.state.rotate_left(23) ^ word
        };
        self.words += 1;
    }

    #[inline]
    fn finish_word(&self) -> u64 {
        self.state
    }
}

word_hasher!(IdentityHasher);

/// Hasher that runs the folded key bits through [`mix64`].
#[derive(Debug, Default, Clone)]
pub struct MixHasher {
    inner: IdentityHasher,
}

impl MixHasher {
    #[inline]
    fn push(&mut self, word: u64) {
        self.inner.push(word);
    }

    #[inline]
    fn finish_word(&self) -> u64 {
        mix64(self.inner.finish_word())
    }
}

word_hasher!(MixHasher);

/// [`BuildHasher`] for [`IdentityHasher`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IdentityState;

impl BuildHasher for IdentityState {
    type Hasher = IdentityHasher;

    fn build_hasher(&self) -> Self::Hasher {
        IdentityHasher::default()
    }
}

/// [`BuildHasher`] for [`MixHasher`]. This is the tables' default.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MixState;

impl BuildHasher for MixState {
    type Hasher = MixHasher;

    fn build_hasher(&self) -> Self::Hasher {
        MixHasher::default()
    }
}
