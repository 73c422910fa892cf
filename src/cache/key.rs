//! Composite Key Module
//!
//! Builds the composite record key from a provider key, a dynamic key and a
//! dynamic key group, and matches keys against provider or dynamic-key
//! families.
//!
//! Layout: `provider + DYNAMIC_KEY_SEPARATOR + dynamic + GROUP_SEPARATOR + group`.
//! Unused parts are empty strings, so every composite key carries both
//! separators exactly once at the end of the provider and dynamic parts.

/// Separates the provider key from the dynamic key.
pub const DYNAMIC_KEY_SEPARATOR: &str = "$d$d$d$";

/// Separates the dynamic key from the dynamic key group.
pub const GROUP_SEPARATOR: &str = "$g$g$g$";

// == Compose ==
/// Builds the composite key for one record.
pub fn compose(provider_key: &str, dynamic_key: &str, dynamic_key_group: &str) -> String {
    let mut key = String::with_capacity(
        provider_key.len()
            + dynamic_key.len()
            + dynamic_key_group.len()
            + DYNAMIC_KEY_SEPARATOR.len()
            + GROUP_SEPARATOR.len(),
    );
    key.push_str(provider_key);
    key.push_str(DYNAMIC_KEY_SEPARATOR);
    key.push_str(dynamic_key);
    key.push_str(GROUP_SEPARATOR);
    key.push_str(dynamic_key_group);
    key
}

// == Family Matchers ==
/// Matches every composite key belonging to one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFamily {
    provider_key: String,
}

/// Matches every composite key sharing a provider and a dynamic key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicKeyFamily {
    prefix: String,
}

/// Returns the matcher for all dynamic keys and groups under `provider_key`.
pub fn family_by_provider(provider_key: &str) -> ProviderFamily {
    ProviderFamily {
        provider_key: provider_key.to_string(),
    }
}

/// Returns the matcher for all groups under `(provider_key, dynamic_key)`.
pub fn family_by_provider_and_dynamic_key(
    provider_key: &str,
    dynamic_key: &str,
) -> DynamicKeyFamily {
    let mut prefix = String::with_capacity(
        provider_key.len() + DYNAMIC_KEY_SEPARATOR.len() + dynamic_key.len(),
    );
    prefix.push_str(provider_key);
    prefix.push_str(DYNAMIC_KEY_SEPARATOR);
    prefix.push_str(dynamic_key);
    DynamicKeyFamily { prefix }
}

impl ProviderFamily {
    /// True when the provider part of `composite` (everything before the
    /// first dynamic key separator) equals this family's provider key.
    pub fn matches(&self, composite: &str) -> bool {
        composite
            .split_once(DYNAMIC_KEY_SEPARATOR)
            .is_some_and(|(provider, _)| provider == self.provider_key)
    }
}

impl DynamicKeyFamily {
    /// True when everything before the group separator equals
    /// `provider + DYNAMIC_KEY_SEPARATOR + dynamic`.
    pub fn matches(&self, composite: &str) -> bool {
        composite
            .rsplit_once(GROUP_SEPARATOR)
            .is_some_and(|(head, _)| head == self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_compose_layout() {
        assert_eq!(compose("mocks", "1", "2"), "mocks$d$d$d$1$g$g$g$2");
        assert_eq!(compose("mocks", "", ""), "mocks$d$d$d$$g$g$g$");
    }

    #[test]
    fn test_provider_family_does_not_match_prefix_sharing_provider() {
        let family = family_by_provider("mock");
        assert!(family.matches(&compose("mock", "1", "")));
        assert!(!family.matches(&compose("mocks", "1", "")));
        assert!(!family.matches("not a composite key"));
    }

    #[test]
    fn test_dynamic_key_family_is_exact_on_dynamic_key() {
        let family = family_by_provider_and_dynamic_key("mocks", "1");
        assert!(family.matches(&compose("mocks", "1", "")));
        assert!(family.matches(&compose("mocks", "1", "filter")));
        assert!(!family.matches(&compose("mocks", "10", "")));
        assert!(!family.matches(&compose("mocks", "2", "1")));
    }

    fn part() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_ ]{0,16}"
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        // Every composed key falls into its own provider and dynamic-key families.
        #[test]
        fn prop_composed_key_in_own_families(p in part(), d in part(), g in part()) {
            let key = compose(&p, &d, &g);
            prop_assert!(family_by_provider(&p).matches(&key));
            prop_assert!(family_by_provider_and_dynamic_key(&p, &d).matches(&key));
        }

        // Distinct components never produce the same composite key.
        #[test]
        fn prop_compose_is_injective(
            a in (part(), part(), part()),
            b in (part(), part(), part())
        ) {
            prop_assume!(a != b);
            prop_assert_ne!(compose(&a.0, &a.1, &a.2), compose(&b.0, &b.1, &b.2));
        }

        // A different provider never matches the provider family.
        #[test]
        fn prop_other_provider_excluded(p in part(), q in part(), d in part(), g in part()) {
            prop_assume!(p != q);
            prop_assert!(!family_by_provider(&p).matches(&compose(&q, &d, &g)));
        }
    }
}
