//! Privilege detection

use nix::unistd::Uid;

/// Whether this process already runs with an effective UID of root
pub fn is_privileged() -> bool {
    Uid::effective().is_root()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_privileged_matches_euid() {
        assert_eq!(is_privileged(), nix::unistd::geteuid().as_raw() == 0);
    }
}
