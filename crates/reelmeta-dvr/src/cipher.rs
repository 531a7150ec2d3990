//! Position-addressable stream cipher for the details payload.
//!
//! A 17-word LFSR with a keyed byte-substitution filter and
//! pseudo-Hadamard mixing, producing the keystream in 20-byte rounds.
//! Encryption and decryption are the same XOR operation. The cipher can be
//! seeked to an arbitrary byte offset, which the container decoder uses to
//! start decryption at the absolute position of the details payload rather
//! than at byte zero.

/// Register length in 32-bit words.
const LFSR_LEN: usize = 17;

/// Keystream bytes produced per round.
const ROUND_LEN: usize = 20;

/// Fixed byte-substitution table: an affine map with nibble feedback and a
/// final rotation, bijective on bytes.
const QBOX: [u8; 256] = {
    let mut q = [0u8; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut b = (i as u8).wrapping_mul(167).wrapping_add(41);
        b ^= b >> 4;
        q[i] = b.rotate_left(3);
        i += 1;
    }
    q
};

/// Double a byte in GF(2^8) with the reduction polynomial 0x4d.
const fn gf_double(b: u8) -> u8 {
    (b << 1) ^ if b & 0x80 != 0 { 0x4d } else { 0 }
}

/// Expand the feedback byte into a 32-bit mixing column.
fn mix(b: u8) -> u32 {
    let d = gf_double(b);
    u32::from_be_bytes([d, b ^ d, b, d ^ gf_double(d)])
}

/// Substitute every byte of a word through the fixed table.
fn sub_word(w: u32) -> u32 {
    u32::from_be_bytes(w.to_be_bytes().map(|b| QBOX[b as usize]))
}

/// Keyed nonlinear word filter: substitute the high byte, rotate it in,
/// and fold a rotated key word back into the result.
fn keyed_sub(key: &[u32; 5], mut w: u32) -> u32 {
    for &k in key {
        let b = QBOX[(((w >> 24) as u8) ^ ((k >> 24) as u8)) as usize];
        w = (w << 8) | b as u32;
        w ^= k.rotate_left((b & 31) as u32);
    }
    w
}

/// Pseudo-Hadamard mix across the five extracted words.
fn pht(w: &mut [u32; 5]) {
    w[4] = w[4]
        .wrapping_add(w[0])
        .wrapping_add(w[1])
        .wrapping_add(w[2])
        .wrapping_add(w[3]);
    for i in 0..4 {
        w[i] = w[i].wrapping_add(w[4]);
    }
}

fn load_words(bytes: &[u8; 20]) -> [u32; 5] {
    let mut words = [0u32; 5];
    for (i, chunk) in bytes.chunks_exact(4).enumerate() {
        words[i] = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    words
}

/// The stream cipher state.
pub struct StreamCipher {
    key: [u32; 5],
    initial: [u32; LFSR_LEN],
    lfsr: [u32; LFSR_LEN],
    buf: [u8; ROUND_LEN],
    used: usize,
}

impl StreamCipher {
    /// Initialize from the derived 20-byte key and IV.
    pub fn new(key: &[u8; 20], iv: &[u8; 20]) -> Self {
        let mut mixed = load_words(key);
        for w in &mut mixed {
            *w = sub_word(*w);
        }
        pht(&mut mixed);

        let iv_words = load_words(iv);
        let mut lfsr = [0u32; LFSR_LEN];
        for i in 0..5 {
            lfsr[i] = sub_word(iv_words[i]);
            lfsr[5 + i] = mixed[i];
        }
        // Length word: key and IV sizes in bytes.
        lfsr[10] = ((key.len() as u32) << 8) | iv.len() as u32;
        for i in 11..LFSR_LEN {
            lfsr[i] = keyed_sub(&mixed, lfsr[i - 11].wrapping_add(lfsr[i - 6]));
        }
        for _ in 0..LFSR_LEN {
            step(&mut lfsr);
        }

        Self {
            key: mixed,
            initial: lfsr,
            lfsr,
            buf: [0u8; ROUND_LEN],
            used: ROUND_LEN,
        }
    }

    /// Generate the next 20-byte keystream round.
    fn next_round(&mut self) -> [u8; ROUND_LEN] {
        step(&mut self.lfsr);
        let r = &self.lfsr;
        let mut w = [r[16], r[13], r[6], r[1], r[0]];
        pht(&mut w);
        for x in &mut w {
            *x = keyed_sub(&self.key, *x);
        }
        pht(&mut w);

        step(&mut self.lfsr);
        step(&mut self.lfsr);
        step(&mut self.lfsr);
        let r = &self.lfsr;
        w[0] = w[0].wrapping_add(r[14]);
        w[1] = w[1].wrapping_add(r[12]);
        w[2] = w[2].wrapping_add(r[8]);
        w[3] = w[3].wrapping_add(r[2]);
        w[4] = w[4].wrapping_add(r[0]);
        step(&mut self.lfsr);

        let mut out = [0u8; ROUND_LEN];
        for (i, word) in w.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&word.to_be_bytes());
        }
        out
    }

    fn refill(&mut self) {
        self.buf = self.next_round();
        self.used = 0;
    }

    /// Seek the keystream to an absolute byte offset, counted from the
    /// start of the stream the cipher was initialized for.
    pub fn seek(&mut self, offset: u64) {
        self.lfsr = self.initial;
        self.used = ROUND_LEN;
        for _ in 0..offset / ROUND_LEN as u64 {
            let _ = self.next_round();
        }
        let rem = (offset % ROUND_LEN as u64) as usize;
        if rem > 0 {
            self.refill();
            self.used = rem;
        }
    }

    /// XOR the keystream into `data`, advancing the stream position.
    pub fn apply_keystream(&mut self, data: &mut [u8]) {
        for byte in data {
            if self.used == ROUND_LEN {
                self.refill();
            }
            *byte ^= self.buf[self.used];
            self.used += 1;
        }
    }
}

fn step(r: &mut [u32; LFSR_LEN]) {
    let t = r[15] ^ r[4] ^ (r[0] << 8) ^ mix((r[0] >> 24) as u8);
    for i in 0..LFSR_LEN - 1 {
        r[i] = r[i + 1];
    }
    r[16] = t;
}
