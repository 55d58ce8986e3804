//! Rotor cipher - the container format's proprietary stream cipher.
//!
//! A six-rotor substitution cipher over a 256-symbol alphabet, keyed by a
//! Wichmann-Hill-style linear congruential PRNG. It decrypts `rot`-typed
//! blobs (payloads the sniffer recognizes by their `28 B5`/`1D 04`/`15 23`
//! prefix) before a zlib inflate and the reverse-128 transform finish
//! unwrapping the entry; see `crate::pipeline`.
//!
//! ## Key schedule
//!
//! The key schedule is a fixed-point variant of the classic "RANDU-style"
//! three-generator PRNG (Wichmann & Hill, 1982): three 16-bit registers
//! `x, y, z` are folded from the ASCII key bytes via rotate-and-mix, then
//! rescaled into the conventional Wichmann-Hill moduli (30269, 30307,
//! 30323). [`rand`] draws a value in `[0, n)` from the weighted sum of the
//! three generators' fractional states, exactly reproducing the reference
//! tool's floating-point arithmetic - this is not a cryptographically
//! meaningful PRNG, just the specific one this format happens to use.
//!
//! ## Rotor construction
//!
//! Each of the six rotors is an independent Fisher-Yates shuffle of
//! `0..256` driven by [`rand`], plus an odd `increment` drawn the same
//! way. The inverse permutation is built alongside the forward one so
//! encrypt and decrypt never need to search.
//!
//! ## Stream cipher
//!
//! Encryption threads a byte through all six rotors in order (each rotor
//! XORs its current position into the byte before permuting);
//! decryption threads it through in reverse, permuting first and XORing
//! position out. Positions advance by each rotor's increment, with carry
//! propagating between rotors, after every byte - independently for the
//! encrypt and decrypt directions, so interleaving the two on one
//! [`Rotor`] does not desynchronize either side.

use crate::{Error, Result};

const SIZE: usize = 256;
const N_ROTORS: usize = 6;

/// Wichmann-Hill-style PRNG derived from the cipher's ASCII key.
///
/// Each call to [`next`](Prng::next) both returns a draw in `[0, n)` and
/// advances the internal state - callers must draw in the exact order the
/// format expects (positions first, then each rotor's increment and
/// shuffle) since the stream is not randomly addressable.
struct Prng {
    x: i64,
    y: i64,
    z: i64,
}

impl Prng {
    fn from_key(key: &[u8]) -> Self {
        const MASK: i64 = 0xFFFF;
        let (mut x, mut y, mut z) = (995i64, 576i64, 767i64);

        for &c in key {
            let c = c as i64;
            x = ((x << 3 | x >> 13) + c) & MASK;
            y = ((y << 3 | y >> 13) ^ c) & MASK;
            z = ((z << 3 | z >> 13) - c) & MASK;
        }

        let max_pos = MASK >> 1;
        if x > max_pos {
            x -= MASK + 1;
        }
        if y > max_pos {
            y -= MASK + 1;
        }
        if z > max_pos {
            z -= MASK + 1;
        }

        y |= 1;

        x = 171 * x.rem_euclid(177) - 2 * x.div_euclid(177);
        y = 172 * y.rem_euclid(176) - 35 * y.div_euclid(176);
        z = 170 * z.rem_euclid(178) - 63 * z.div_euclid(178);

        if x < 0 {
            x += 30269;
        }
        if y < 0 {
            y += 30307;
        }
        if z < 0 {
            z += 30323;
        }

        Prng { x, y, z }
    }

    /// Draw a value in `[0, n)`, matching the reference's modular-fraction
    /// floating point arithmetic exactly (the exact bit pattern of the
    /// division is observable in the resulting permutations, so this must
    /// stay `f64`, not fixed-point).
    fn next(&mut self, n: u32) -> u32 {
        let frac = self.x as f64 / 30269.0 + self.y as f64 / 30307.0 + self.z as f64 / 30323.0;
        let draw = (frac * n as f64).rem_euclid(n as f64);

        self.x = (171 * self.x) % 30269;
        self.y = (172 * self.y) % 30307;
        self.z = (170 * self.z) % 30323;

        draw as u32
    }
}

/// One rotor: forward permutation, inverse permutation, and odd
/// increment used to advance this rotor's position each byte.
#[derive(Clone)]
struct RotorStage {
    forward: [u8; SIZE],
    inverse: [u8; SIZE],
    increment: u8,
}

impl RotorStage {
    fn build(prng: &mut Prng) -> Self {
        let increment = (1 + 2 * prng.next((SIZE / 2) as u32)) as u8;

        let mut forward: [u8; SIZE] = std::array::from_fn(|i| i as u8);
        let mut inverse: [u8; SIZE] = std::array::from_fn(|i| i as u8);

        for i in (1..SIZE).rev() {
            let r = prng.next((i + 1) as u32) as usize;
            forward.swap(r, i);
            inverse[forward[i] as usize] = i as u8;
        }
        inverse[forward[0] as usize] = 0;

        RotorStage {
            forward,
            inverse,
            increment,
        }
    }
}

/// A direction-specific session: its own position vector, advanced
/// independently of any other session built from the same [`Rotor`].
struct Session {
    positions: [u8; N_ROTORS],
}

impl Session {
    fn advance(&mut self, stages: &[RotorStage; N_ROTORS]) {
        let mut carry: u16 = 0;
        for i in 0..N_ROTORS {
            let new = self.positions[i] as u16 + stages[i].increment as u16 + carry;
            self.positions[i] = (new % SIZE as u16) as u8;
            carry = if new >= SIZE as u16 { 1 } else { 0 };
        }
    }
}

/// A fully keyed rotor cipher: six rotor stages plus the initial position
/// seeds drawn from the key schedule, built once and reused read-only
/// across many encrypt/decrypt sessions.
pub struct Rotor {
    stages: [RotorStage; N_ROTORS],
    initial_positions: [u8; N_ROTORS],
}

impl Rotor {
    /// Build a rotor cipher from an ASCII key.
    ///
    /// Draw order matters: all `n_rotors` initial positions are drawn
    /// first, then each rotor's increment and shuffle, in that order -
    /// reordering these draws desynchronizes the PRNG from the reference
    /// implementation.
    pub fn new(key: &[u8]) -> Result<Self> {
        let mut prng = Prng::from_key(key);

        let mut initial_positions = [0u8; N_ROTORS];
        for slot in &mut initial_positions {
            *slot = prng.next(SIZE as u32) as u8;
        }

        let mut stages: Vec<RotorStage> = Vec::with_capacity(N_ROTORS);
        for _ in 0..N_ROTORS {
            stages.push(RotorStage::build(&mut prng));
        }

        let stages: [RotorStage; N_ROTORS] = stages
            .try_into()
            .map_err(|_| Error::RotorKeyFailure)?;

        Ok(Rotor {
            stages,
            initial_positions,
        })
    }

    /// Build the cipher used for the `rot` pipeline stage (the fixed key
    /// baked into the container format itself).
    pub fn fixed() -> Result<Self> {
        Self::new(fixed_key().as_bytes())
    }

    fn session(&self) -> Session {
        Session {
            positions: self.initial_positions,
        }
    }

    /// Encrypt `buffer`, using a fresh position vector for this call.
    pub fn encrypt(&self, buffer: &[u8]) -> Vec<u8> {
        let mut session = self.session();
        let mut out = Vec::with_capacity(buffer.len());
        for &byte in buffer {
            let mut c = byte;
            for (i, stage) in self.stages.iter().enumerate() {
                c = stage.forward[(c ^ session.positions[i]) as usize];
            }
            out.push(c);
            session.advance(&self.stages);
        }
        out
    }

    /// Decrypt `buffer`, using a fresh position vector for this call.
    pub fn decrypt(&self, buffer: &[u8]) -> Vec<u8> {
        let mut session = self.session();
        let mut out = Vec::with_capacity(buffer.len());
        for &byte in buffer {
            let mut c = byte;
            for i in (0..N_ROTORS).rev() {
                c = session.positions[i] ^ self.stages[i].inverse[c as usize];
            }
            out.push(c);
            session.advance(&self.stages);
        }
        out
    }
}

/// The `rot` pipeline's baked-in key: `dn*4 + (dt+dn+df)*5 + "!" + "#" +
/// dt*7 + df*2 + "*" + "&" + "'"`.
fn fixed_key() -> String {
    const DN: &str = "j2h56ogodh3se";
    const DT: &str = "=dziaq.";
    const DF: &str = "|os=5v7!\"-234";

    format!(
        "{}{}!#{}{}*&'",
        DN.repeat(4),
        (DT.to_string() + DN + DF).repeat(5),
        DT.repeat(7),
        DF.repeat(2),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_key_has_expected_length() {
        // dn*4 (52) + (dt+dn+df)*5 (165) + "!#" (2) + dt*7 (49) + df*2 (26) + "*&'" (3)
        assert_eq!(fixed_key().len(), 52 + 165 + 2 + 49 + 26 + 3);
    }

    #[test]
    fn roundtrip_various_sizes() {
        for len in [0usize, 1, 16, 17, 4096] {
            let rotor = Rotor::new(b"test-key-material").unwrap();
            let data: Vec<u8> = (0..len).map(|i| (i % 256) as u8).collect();
            let encrypted = rotor.encrypt(&data);
            let decrypted = rotor.decrypt(&encrypted);
            assert_eq!(decrypted, data, "len={len}");
        }
    }

    #[test]
    fn fixed_key_roundtrip() {
        let rotor = Rotor::fixed().unwrap();
        let data = b"some rot-wrapped payload bytes".to_vec();
        let encrypted = rotor.encrypt(&data);
        assert_eq!(rotor.decrypt(&encrypted), data);
    }

    #[test]
    fn sessions_do_not_interfere() {
        let rotor = Rotor::new(b"abc").unwrap();
        let a = rotor.encrypt(b"hello world");
        let b = rotor.encrypt(b"hello world");
        assert_eq!(a, b, "fresh session per call must be deterministic");
    }

    proptest::proptest! {
        #[test]
        fn roundtrip_arbitrary(data: Vec<u8>) {
            let rotor = Rotor::new(b"proptest-key").unwrap();
            let encrypted = rotor.encrypt(&data);
            prop_assert_eq!(rotor.decrypt(&encrypted), data);
        }
    }
}
