//! SRP-6a with SHA-256 over the RFC 5054 2048-bit group (g = 2).
//!
//! ```text
//! x     = H(s | H(lower(I) ":" P))
//! v     = g^x
//! k     = H(pad(N) | pad(g))
//! B     = k*v + g^b
//! u     = H(pad(A) | pad(B))
//! S     = (A * v^u)^b              server
//!       = (B - k*g^x)^(a + u*x)    client
//! K     = H(S)
//! M     = H(H(N) xor H(g) | H(I) | s | A | B | K)
//! H_AMK = H(A | M | K)
//! ```
//!
//! Numbers are hashed as minimal big-endian byte strings unless padded to the
//! length of N.

use num_bigint::BigUint;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::CryptoError;

/// Length of the session key, of M and of H_AMK.
pub const SESSION_KEY_LEN: usize = 32;

const SALT_LEN: usize = 16;
const SECRET_LEN: usize = 32;

/// The 2048-bit safe prime N.
const N_2048: [u8; 256] = [
    0xac, 0x6b, 0xdb, 0x41, 0x32, 0x4a, 0x9a, 0x9b, 0xf1, 0x66, 0xde, 0x5e,
    0x13, 0x89, 0x58, 0x2f, 0xaf, 0x72, 0xb6, 0x65, 0x19, 0x87, 0xee, 0x07,
    0xfc, 0x31, 0x92, 0x94, 0x3d, 0xb5, 0x60, 0x50, 0xa3, 0x73, 0x29, 0xcb,
    0xb4, 0xa0, 0x99, 0xed, 0x81, 0x93, 0xe0, 0x75, 0x77, 0x67, 0xa1, 0x3d,
    0xd5, 0x23, 0x12, 0xab, 0x4b, 0x03, 0x31, 0x0d, 0xcd, 0x7f, 0x48, 0xa9,
    0xda, 0x04, 0xfd, 0x50, 0xe8, 0x08, 0x39, 0x69, 0xed, 0xb7, 0x67, 0xb0,
    0xcf, 0x60, 0x95, 0x17, 0x9a, 0x16, 0x3a, 0xb3, 0x66, 0x1a, 0x05, 0xfb,
    0xd5, 0xfa, 0xaa, 0xe8, 0x29, 0x18, 0xa9, 0x96, 0x2f, 0x0b, 0x93, 0xb8,
    0x55, 0xf9, 0x79, 0x93, 0xec, 0x97, 0x5e, 0xea, 0xa8, 0x0d, 0x74, 0x0a,
    0xdb, 0xf4, 0xff, 0x74, 0x73, 0x59, 0xd0, 0x41, 0xd5, 0xc3, 0x3e, 0xa7,
    0x1d, 0x28, 0x1e, 0x44, 0x6b, 0x14, 0x77, 0x3b, 0xca, 0x97, 0xb4, 0x3a,
    0x23, 0xfb, 0x80, 0x16, 0x76, 0xbd, 0x20, 0x7a, 0x43, 0x6c, 0x64, 0x81,
    0xf1, 0xd2, 0xb9, 0x07, 0x87, 0x17, 0x46, 0x1a, 0x5b, 0x9d, 0x32, 0xe6,
    0x88, 0xf8, 0x77, 0x48, 0x54, 0x45, 0x23, 0xb5, 0x24, 0xb0, 0xd5, 0x7d,
    0x5e, 0xa7, 0x7a, 0x27, 0x75, 0xd2, 0xec, 0xfa, 0x03, 0x2c, 0xfb, 0xdb,
    0xf5, 0x2f, 0xb3, 0x78, 0x61, 0x60, 0x27, 0x90, 0x04, 0xe5, 0x7a, 0xe6,
    0xaf, 0x87, 0x4e, 0x73, 0x03, 0xce, 0x53, 0x29, 0x9c, 0xcc, 0x04, 0x1c,
    0x7b, 0xc3, 0x08, 0xd8, 0x2a, 0x56, 0x98, 0xf3, 0xa8, 0xd0, 0xc3, 0x82,
    0x71, 0xae, 0x35, 0xf8, 0xe9, 0xdb, 0xfb, 0xb6, 0x94, 0xb5, 0xc8, 0x03,
    0xd8, 0x9f, 0x7a, 0xe4, 0x35, 0xde, 0x23, 0x6d, 0x52, 0x5f, 0x54, 0x75,
    0x9b, 0x65, 0xe3, 0x72, 0xfc, 0xd6, 0x8e, 0xf2, 0x0f, 0xa7, 0x11, 0x1f,
    0x9e, 0x4a, 0xff, 0x73,
];

struct Group {
    n: BigUint,
    g: BigUint,
    len_n: usize,
}

impl Group {
    fn ng2048() -> Self {
        Self {
            n: BigUint::from_bytes_be(&N_2048),
            g: BigUint::from(2u32),
            len_n: N_2048.len(),
        }
    }

    /// H(pad(n1) | pad(n2)); both inputs must fit in the width of N.
    fn h_nn(&self, n1: &BigUint, n2: &BigUint) -> Result<BigUint, CryptoError> {
        let b1 = n1.to_bytes_be();
        let b2 = n2.to_bytes_be();
        if b1.len() > self.len_n || b2.len() > self.len_n {
            return Err(CryptoError::ValueTooLarge);
        }
        let mut bin = vec![0u8; self.len_n * 2];
        bin[self.len_n - b1.len()..self.len_n].copy_from_slice(&b1);
        bin[self.len_n * 2 - b2.len()..].copy_from_slice(&b2);
        Ok(BigUint::from_bytes_be(&Sha256::digest(&bin)))
    }

    fn k(&self) -> Result<BigUint, CryptoError> {
        self.h_nn(&self.n, &self.g)
    }

    fn calculate_m(
        &self,
        username: &str,
        salt: &[u8],
        a: &BigUint,
        b: &BigUint,
        key: &[u8; SESSION_KEY_LEN],
    ) -> [u8; SESSION_KEY_LEN] {
        let h_n = hash_num(&self.n);
        let h_g = hash_num(&self.g);
        let h_i = Sha256::digest(username.as_bytes());
        let mut h_xor = [0u8; SESSION_KEY_LEN];
        for (i, out) in h_xor.iter_mut().enumerate() {
            *out = h_n[i] ^ h_g[i];
        }
        let mut hasher = Sha256::new();
        hasher.update(h_xor);
        hasher.update(h_i);
        hasher.update(salt);
        hasher.update(a.to_bytes_be());
        hasher.update(b.to_bytes_be());
        hasher.update(key);
        hasher.finalize().into()
    }
}

fn hash_num(n: &BigUint) -> [u8; SESSION_KEY_LEN] {
    Sha256::digest(n.to_bytes_be()).into()
}

fn calculate_h_amk(
    a: &BigUint,
    m: &[u8; SESSION_KEY_LEN],
    key: &[u8; SESSION_KEY_LEN],
) -> [u8; SESSION_KEY_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(a.to_bytes_be());
    hasher.update(m);
    hasher.update(key);
    hasher.finalize().into()
}

/// x = H(s | H(I ":" P))
fn calculate_x(salt: &[u8], username: &str, password: &[u8]) -> BigUint {
    let mut inner = Sha256::new();
    inner.update(username.as_bytes());
    inner.update(b":");
    inner.update(password);
    let ucp_hash = inner.finalize();

    let mut outer = Sha256::new();
    outer.update(salt);
    outer.update(ucp_hash);
    BigUint::from_bytes_be(&outer.finalize())
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut out);
    out
}

/// Compute a verifier for `password`, generating a fresh 16-byte salt unless one is given.
///
/// Returns `(salt, verifier)`.
pub fn create_salted_verification_key(
    username_for_verifier: &str,
    password: &[u8],
    salt: Option<&[u8]>,
) -> (Vec<u8>, Vec<u8>) {
    let ng = Group::ng2048();
    let salt = salt.map_or_else(|| random_bytes(SALT_LEN), <[u8]>::to_vec);
    let x = calculate_x(&salt, username_for_verifier, password);
    let v = ng.g.modpow(&x, &ng.n);
    (salt, v.to_bytes_be())
}

/// Server half of one SRP handshake.
///
/// Lives on the session between SRP_BYTES_A and SRP_BYTES_M.
pub struct SrpVerifier {
    username: String,
    authenticated: bool,
    bytes_b: Vec<u8>,
    m: [u8; SESSION_KEY_LEN],
    h_amk: [u8; SESSION_KEY_LEN],
    session_key: [u8; SESSION_KEY_LEN],
}

impl SrpVerifier {
    /// Start the server side of a handshake. Returns the verifier and the bytes of B.
    pub fn new(
        username: &str,
        salt: &[u8],
        verifier: &[u8],
        bytes_a: &[u8],
    ) -> Result<Self, CryptoError> {
        Self::with_secret(username, salt, verifier, bytes_a, &random_bytes(SECRET_LEN))
    }

    /// Like [`SrpVerifier::new`] with a caller-provided secret `b`.
    pub fn with_secret(
        username: &str,
        salt: &[u8],
        verifier: &[u8],
        bytes_a: &[u8],
        bytes_b_secret: &[u8],
    ) -> Result<Self, CryptoError> {
        let ng = Group::ng2048();
        let v = BigUint::from_bytes_be(verifier);
        let a = BigUint::from_bytes_be(bytes_a);

        if (&a % &ng.n).bits() == 0 {
            return Err(CryptoError::SafetyCheck);
        }

        let b = BigUint::from_bytes_be(bytes_b_secret);
        let k = ng.k()?;

        // B = kv + g^b
        let big_b = ((&k * &v) % &ng.n + ng.g.modpow(&b, &ng.n)) % &ng.n;
        let u = ng.h_nn(&a, &big_b)?;

        // S = (A * v^u)^b
        let s = ((&a * v.modpow(&u, &ng.n)) % &ng.n).modpow(&b, &ng.n);
        let session_key = hash_num(&s);
        let m = ng.calculate_m(username, salt, &a, &big_b, &session_key);
        let h_amk = calculate_h_amk(&a, &m, &session_key);

        Ok(Self {
            username: username.to_string(),
            authenticated: false,
            bytes_b: big_b.to_bytes_be(),
            m,
            h_amk,
            session_key,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The server's public value B.
    pub fn bytes_b(&self) -> &[u8] {
        &self.bytes_b
    }

    pub fn session_key_len(&self) -> usize {
        SESSION_KEY_LEN
    }

    /// Check the client's proof. Returns H_AMK on success.
    pub fn verify_session(&mut self, user_m: &[u8]) -> Option<[u8; SESSION_KEY_LEN]> {
        if ct_eq(user_m, &self.m) {
            self.authenticated = true;
            Some(self.h_amk)
        } else {
            None
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn session_key(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.session_key
    }
}

/// Equality whose running time depends only on the lengths.
fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl std::fmt::Debug for SrpVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SrpVerifier")
            .field("username", &self.username)
            .field("authenticated", &self.authenticated)
            .finish_non_exhaustive()
    }
}

/// Client half of an SRP handshake.
pub struct SrpUser {
    username: String,
    username_for_verifier: String,
    password: Vec<u8>,
    a: BigUint,
    big_a: BigUint,
    h_amk: [u8; SESSION_KEY_LEN],
    authenticated: bool,
}

impl SrpUser {
    pub fn new(username: &str, username_for_verifier: &str, password: &[u8]) -> Self {
        Self {
            username: username.to_string(),
            username_for_verifier: username_for_verifier.to_string(),
            password: password.to_vec(),
            a: BigUint::from(0u32),
            big_a: BigUint::from(0u32),
            h_amk: [0u8; SESSION_KEY_LEN],
            authenticated: false,
        }
    }

    /// Pick the secret `a` and return the bytes of A = g^a.
    pub fn start_authentication(&mut self) -> Vec<u8> {
        let ng = Group::ng2048();
        self.a = BigUint::from_bytes_be(&random_bytes(SECRET_LEN));
        self.big_a = ng.g.modpow(&self.a, &ng.n);
        self.big_a.to_bytes_be()
    }

    /// Answer the server challenge with the proof M.
    pub fn process_challenge(
        &mut self,
        salt: &[u8],
        bytes_b: &[u8],
    ) -> Result<[u8; SESSION_KEY_LEN], CryptoError> {
        let ng = Group::ng2048();
        let big_b = BigUint::from_bytes_be(bytes_b);
        let u = ng.h_nn(&self.big_a, &big_b)?;
        let x = calculate_x(salt, &self.username_for_verifier, &self.password);
        let k = ng.k()?;

        if big_b.bits() == 0 || u.bits() == 0 {
            return Err(CryptoError::SafetyCheck);
        }

        // S = (B - k*g^x)^(a + ux)
        let exp = &self.a + &u * &x;
        let kgx = (&k * ng.g.modpow(&x, &ng.n)) % &ng.n;
        let base = ((&big_b % &ng.n) + &ng.n - kgx) % &ng.n;
        let s = base.modpow(&exp, &ng.n);

        let session_key = hash_num(&s);
        let m = ng.calculate_m(&self.username, salt, &self.big_a, &big_b, &session_key);
        self.h_amk = calculate_h_amk(&self.big_a, &m, &session_key);
        Ok(m)
    }

    pub fn verify_session(&mut self, bytes_h_amk: &[u8]) -> bool {
        if ct_eq(bytes_h_amk, &self.h_amk) {
            self.authenticated = true;
        }
        self.authenticated
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}
