//! Admin allow-list.

use crate::phone::PhoneNormalizer;
use std::collections::HashSet;

/// Decides who may issue administrative commands.
#[derive(Debug, Clone)]
pub struct PermissionGate {
    normalizer: PhoneNormalizer,
    admins: HashSet<String>,
}

impl PermissionGate {
    /// Build a gate from configured admin identifiers in any dialling style.
    pub fn new<I, S>(normalizer: PhoneNormalizer, admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let admins = admins
            .into_iter()
            .map(|a| a.as_ref().trim().to_string())
            .filter(|a| !a.is_empty())
            .map(|a| normalizer.normalize(&a))
            .collect();
        Self { normalizer, admins }
    }

    /// Whether `source` is on the allow-list once both sides are normalized.
    pub fn is_admin(&self, source: &str) -> bool {
        self.admins.contains(&self.normalizer.normalize(source))
    }

    /// Number of distinct admins.
    pub fn len(&self) -> usize {
        self.admins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> PermissionGate {
        PermissionGate::new(PhoneNormalizer::new("49"), ["0170111", "+49170222", " "])
    }

    #[test]
    fn test_matches_across_dialling_styles() {
        let gate = gate();
        assert!(gate.is_admin("+49170111"));
        assert!(gate.is_admin("0170111"));
        assert!(gate.is_admin("0170222"));
        assert!(gate.is_admin("+49170222"));
    }

    #[test]
    fn test_rejects_unknown_sender() {
        let gate = gate();
        assert!(!gate.is_admin("+49170333"));
        assert!(!gate.is_admin(""));
    }

    #[test]
    fn test_blank_entries_ignored() {
        let gate = gate();
        assert_eq!(gate.len(), 2);
    }

    #[test]
    fn test_empty_allow_list_admits_nobody() {
        let gate = PermissionGate::new(PhoneNormalizer::new("49"), Vec::<String>::new());
        assert!(gate.is_empty());
        assert!(!gate.is_admin("+49170111"));
    }
}
