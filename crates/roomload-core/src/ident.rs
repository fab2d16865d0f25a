use rand::Rng;

const PREFIX_LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const PREFIX_LEN: usize = 5;
const ROOM_SUFFIX_RANGE: u32 = 1000;

/// Source of per-run room names and identity prefixes.
pub trait IdentityGenerator: Send + Sync {
    /// Room used when the caller did not name one.
    fn room_name(&self) -> String;
    /// Prefix prepended to every participant identity in one run.
    fn identity_prefix(&self) -> String;
}

/// Random names, regenerated on every call so repeated runs never collide.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdentity;

impl IdentityGenerator for RandomIdentity {
    fn room_name(&self) -> String {
        format!("testroom{}", rand::thread_rng().gen_range(0..ROOM_SUFFIX_RANGE))
    }

    fn identity_prefix(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..PREFIX_LEN)
            .map(|_| PREFIX_LETTERS[rng.gen_range(0..PREFIX_LETTERS.len())] as char)
            .collect()
    }
}

/// Deterministic names for tests and reproducible runs.
#[derive(Debug, Clone)]
pub struct FixedIdentity {
    pub room: String,
    pub prefix: String,
}

impl FixedIdentity {
    pub fn new(room: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            prefix: prefix.into(),
        }
    }
}

impl IdentityGenerator for FixedIdentity {
    fn room_name(&self) -> String {
        self.room.clone()
    }

    fn identity_prefix(&self) -> String {
        self.prefix.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{FixedIdentity, IdentityGenerator, RandomIdentity};

    #[test]
    fn random_prefix_is_five_ascii_letters() {
        let prefix = RandomIdentity.identity_prefix();
        assert_eq!(prefix.len(), 5);
        assert!(prefix.chars().all(|c| c.is_ascii_alphabetic()));
    }

    #[test]
    fn random_room_uses_testroom_prefix() {
        let room = RandomIdentity.room_name();
        let suffix = room
            .strip_prefix("testroom")
            .expect("room should start with testroom");
        let n: u32 = suffix.parse().expect("suffix should be numeric");
        assert!(n < 1000);
    }

    #[test]
    fn fixed_identity_is_stable() {
        let ident = FixedIdentity::new("room-a", "abcde");
        assert_eq!(ident.room_name(), "room-a");
        assert_eq!(ident.identity_prefix(), "abcde");
        assert_eq!(ident.identity_prefix(), "abcde");
    }
}
