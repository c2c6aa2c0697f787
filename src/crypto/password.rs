use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

pub const PBKDF2_ITERATIONS: u32 = 600_000;
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;

const SCHEME: &str = "pbkdf2-sha256";

/// One-way password hashing used when accounts are provisioned.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> String;

    /// `false` for a wrong password and for a hash this hasher cannot read.
    fn verify(&self, plaintext: &str, hash: &str) -> bool;
}

/// PBKDF2-HMAC-SHA256 with a random salt per password.
///
/// Encoded as `pbkdf2-sha256$<iterations>$<salt>$<hash>` with unpadded
/// base64, so the iteration count can be raised without invalidating
/// stored hashes.
#[derive(Debug, Clone)]
pub struct Pbkdf2Hasher {
    iterations: u32,
}

impl Pbkdf2Hasher {
    /// A zero iteration count is raised to 1.
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }
}

impl Default for Pbkdf2Hasher {
    fn default() -> Self {
        Self::new(PBKDF2_ITERATIONS)
    }
}

impl PasswordHasher for Pbkdf2Hasher {
    fn hash(&self, plaintext: &str) -> String {
        let salt = generate_salt();
        let derived = derive(plaintext, &salt, self.iterations);
        format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(derived.as_slice()),
        )
    }

    fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let mut parts = hash.split('$');
        let (Some(SCHEME), Some(iterations), Some(salt), Some(expected), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return false;
        };
        let Ok(iterations) = iterations.parse::<u32>() else {
            return false;
        };
        if iterations == 0 {
            return false;
        }
        let (Ok(salt), Ok(expected)) = (STANDARD_NO_PAD.decode(salt), STANDARD_NO_PAD.decode(expected))
        else {
            return false;
        };
        if expected.len() != HASH_LENGTH {
            return false;
        }

        let derived = derive(plaintext, &salt, iterations);
        derived.as_slice().ct_eq(&expected).into()
    }
}

fn derive(plaintext: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; HASH_LENGTH]> {
    let mut out = Zeroizing::new([0u8; HASH_LENGTH]);
    pbkdf2_hmac::<Sha256>(plaintext.as_bytes(), salt, iterations, out.as_mut_slice());
    out
}

fn generate_salt() -> [u8; SALT_LENGTH] {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> Pbkdf2Hasher {
        Pbkdf2Hasher::new(1_000)
    }

    #[test]
    fn hash_verifies_with_same_password() {
        let hasher = fast();
        let hash = hasher.hash("Xy7kP2mQ9a");
        assert!(hash.starts_with("pbkdf2-sha256$1000$"));
        assert!(hasher.verify("Xy7kP2mQ9a", &hash));
        assert!(!hasher.verify("xy7kP2mQ9a", &hash));
    }

    #[test]
    fn same_password_gets_different_salts() {
        let hasher = fast();
        let a = hasher.hash("password");
        let b = hasher.hash("password");
        assert_ne!(a, b);
        assert!(hasher.verify("password", &a));
        assert!(hasher.verify("password", &b));
    }

    #[test]
    fn iteration_count_is_read_from_the_hash() {
        let old = Pbkdf2Hasher::new(500).hash("secret");
        assert!(fast().verify("secret", &old));
    }

    #[test]
    fn malformed_hashes_never_verify() {
        let hasher = fast();
        for bad in [
            "",
            "plaintext",
            "bcrypt$10$abc$def",
            "pbkdf2-sha256$abc$c2FsdA$aGFzaA",
            "pbkdf2-sha256$0$c2FsdA$aGFzaA",
            "pbkdf2-sha256$1000$!!!$aGFzaA",
            "pbkdf2-sha256$1000$c2FsdA$aGFzaA",
            "pbkdf2-sha256$1000$c2FsdA$aGFzaA$extra",
        ] {
            assert!(!hasher.verify("secret", bad), "{bad}");
        }
    }

    #[test]
    fn zero_iterations_are_clamped() {
        let hash = Pbkdf2Hasher::new(0).hash("secret");
        assert!(hash.starts_with("pbkdf2-sha256$1$"));
        assert!(fast().verify("secret", &hash));
    }
}
