//! # adler
//!
//! Streaming Adler-32, bit-exact with the classical definition: two sums `a`
//! and `b` kept modulo 65521, finalized as `(b << 16) | a`.
//!
//! The state can be fed any number of times before finishing, so large inputs
//! never need to be buffered whole:
//!
//! ```
//! use adler::Adler32;
//!
//! let mut sum = Adler32::new();
//! sum.update(b"ab");
//! sum.update(b"cde");
//! assert_eq!(sum.finish(), adler::adler32(b"abcde"));
//! ```

/// Largest prime below 2^16.
pub const MODULUS: u32 = 65521;

/// Largest number of bytes that can be summed before `b` may overflow a `u32`,
/// assuming both sums start below [`MODULUS`].
const NMAX: usize = 5552;

/// Incremental Adler-32 state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Adler32 {
    /// Fresh state for a new input.
    pub const fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    /// Resumes from a previously finished checksum.
    pub const fn from_checksum(sum: u32) -> Self {
        Self {
            a: (sum & 0xffff) % MODULUS,
            b: (sum >> 16) % MODULUS,
        }
    }

    /// Feeds `bytes` into the running sums.
    ///
    /// Reduction is deferred to the end of each [`NMAX`]-sized block, which
    /// yields exactly the per-byte result.
    pub fn update(&mut self, bytes: &[u8]) {
        let mut a = self.a;
        let mut b = self.b;

        for block in bytes.chunks(NMAX) {
            for &x in block {
                a += u32::from(x);
                b += a;
            }
            a %= MODULUS;
            b %= MODULUS;
        }

        self.a = a;
        self.b = b;
    }

    /// Returns `(b << 16) | a`. The state is left untouched, so more input
    /// may follow.
    pub const fn finish(&self) -> u32 {
        (self.b << 16) | self.a
    }

    /// Restarts the state as if newly created.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

impl std::io::Write for Adler32 {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// One-shot checksum of `bytes`.
pub fn adler32(bytes: &[u8]) -> u32 {
    let mut sum = Adler32::new();
    sum.update(bytes);
    sum.finish()
}

#[cfg(test)]
mod tests;
