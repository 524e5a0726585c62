//! Access-check evaluation and the shared policy snapshot.

use std::sync::{Arc, RwLock};

use kunai_core::util::path;

use crate::access::Access;
use crate::error::AuthzResult;
use crate::policy::{Policy, RuleSet};

impl Policy {
    /// ## Summary
    /// Answers whether `user` may perform an operation needing
    /// `requested` access on `path` within `repository`.
    ///
    /// Rule-set selection falls back from the named repository to the
    /// global rules; with neither configured the request is denied.
    /// Starting at the exact path, rule sets are evaluated walking up
    /// one segment at a time until one determines the requested bits;
    /// reaching the root undetermined denies. A request carrying
    /// `RECURSIVE` additionally requires that no rule nested under the
    /// target denies the bits without simultaneously allowing them.
    #[must_use]
    #[tracing::instrument(skip(self))]
    pub fn check_access(
        &self,
        repository: &str,
        path: &str,
        user: Option<&str>,
        requested: Access,
    ) -> bool {
        let needed = requested.rw();
        if needed.is_empty() {
            return true;
        }

        let Some(rules) = self
            .repos
            .get(repository)
            .or_else(|| self.repos.get(""))
        else {
            tracing::debug!(repository, "no rules for repository, denying");
            return false;
        };

        let target = path::standardize(path);
        let mut current = target.clone();
        let granted = loop {
            if let Some(set) = rules.get(&current) {
                let (allow, deny) = set.masks(self, user);
                if determines(allow, deny, needed) {
                    break grants(allow, deny, needed);
                }
            }
            if current == "/" {
                // Undetermined all the way up.
                break false;
            }
            current = path::parent(&current).to_string();
        };
        if !granted {
            return false;
        }

        if requested.contains(Access::RECURSIVE) {
            return self.check_subtree(rules, &target, user, needed);
        }
        true
    }

    /// A subtree operation is revoked by any nested rule that denies
    /// the needed bits without allowing them.
    fn check_subtree(
        &self,
        rules: &std::collections::BTreeMap<String, RuleSet>,
        target: &str,
        user: Option<&str>,
        needed: Access,
    ) -> bool {
        for (rule_path, set) in rules {
            if rule_path == target || !path::is_ancestor(target, rule_path) {
                continue;
            }
            let (allow, deny) = set.masks(self, user);
            if !(needed & deny & !allow).is_empty() {
                tracing::debug!(rule_path, "nested rule denies recursive request");
                return false;
            }
        }
        true
    }
}

/// Whether the rule set decided every needed bit, one way or the other.
fn determines(allow: Access, deny: Access, needed: Access) -> bool {
    (allow | deny).contains(needed)
}

/// A bit is granted when it is not denied, or when an explicit allow
/// rescues it.
fn grants(allow: Access, deny: Access, needed: Access) -> bool {
    (needed & deny & !allow).is_empty()
}

/// Shared holder for the active policy.
///
/// Readers take an [`Arc`] snapshot for the duration of one request;
/// reload builds a complete new policy and swaps it in atomically. A
/// reload that fails to parse leaves the active snapshot untouched.
#[derive(Debug)]
pub struct PolicyStore {
    inner: RwLock<Arc<Policy>>,
}

impl PolicyStore {
    #[must_use]
    pub fn new(policy: Policy) -> Self {
        Self {
            inner: RwLock::new(Arc::new(policy)),
        }
    }

    /// The current snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<Policy> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// ## Summary
    /// Parses `text` and installs it as the active policy.
    ///
    /// ## Errors
    /// On any load error the previous policy remains in force.
    pub fn reload(&self, text: &str) -> AuthzResult<()> {
        let policy = Arc::new(Policy::parse(text)?);
        match self.inner.write() {
            Ok(mut guard) => *guard = policy,
            Err(poisoned) => *poisoned.into_inner() = policy,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(text: &str) -> Policy {
        Policy::parse(text).expect("policy parses")
    }

    #[test]
    fn deny_by_omission_with_explicit_allow() {
        let p = policy(
            "[repo:/secret]\n\
             * =\n\
             alice = rw\n",
        );
        assert!(p.check_access("repo", "/secret", Some("alice"), Access::WRITE));
        assert!(!p.check_access("repo", "/secret", Some("bob"), Access::READ));
    }

    #[test]
    fn no_rules_at_all_denies() {
        let p = Policy::default();
        assert!(!p.check_access("repo", "/", Some("alice"), Access::READ));
    }

    #[test]
    fn global_rules_apply_when_repository_has_none() {
        let p = policy("[/]\n* = r\n");
        assert!(p.check_access("any-repo", "/trunk", Some("alice"), Access::READ));
        assert!(!p.check_access("any-repo", "/trunk", Some("alice"), Access::WRITE));
    }

    #[test]
    fn repository_rules_shadow_global_rules() {
        let p = policy(
            "[/]\n\
             * = rw\n\
             [repo:/]\n\
             * = r\n",
        );
        // The repo has its own rule set; the global one is not merged in.
        assert!(!p.check_access("repo", "/trunk", Some("alice"), Access::WRITE));
        assert!(p.check_access("other", "/trunk", Some("alice"), Access::WRITE));
    }

    #[test]
    fn access_inherits_from_the_nearest_determining_ancestor() {
        let p = policy(
            "[repo:/]\n\
             * = r\n\
             [repo:/trunk]\n\
             alice = rw\n",
        );
        // bob at /trunk/deep: /trunk determines nothing for bob, / does.
        assert!(p.check_access("repo", "/trunk/deep/file", Some("bob"), Access::READ));
        assert!(!p.check_access("repo", "/trunk/deep/file", Some("bob"), Access::WRITE));
        assert!(p.check_access("repo", "/trunk/deep/file", Some("alice"), Access::WRITE));
    }

    #[test]
    fn exact_rule_overrides_ancestor_regardless_of_order() {
        let p = policy(
            "[repo:/private]\n\
             * =\n\
             [repo:/]\n\
             * = rw\n",
        );
        assert!(!p.check_access("repo", "/private", Some("alice"), Access::READ));
        assert!(p.check_access("repo", "/public", Some("alice"), Access::WRITE));
    }

    #[test]
    fn undetermined_rule_set_keeps_walking() {
        // /trunk has rules, but none that match alice; her access is
        // decided at /.
        let p = policy(
            "[repo:/]\n\
             alice = rw\n\
             [repo:/trunk]\n\
             bob = r\n",
        );
        assert!(p.check_access(
            "repo",
            "/trunk",
            Some("alice"),
            Access::READ | Access::WRITE
        ));
        assert!(p.check_access("repo", "/trunk", Some("bob"), Access::READ));
        assert!(!p.check_access("repo", "/trunk", Some("bob"), Access::WRITE));
        // Nothing ever matches mallory: undetermined at the root denies.
        assert!(!p.check_access("repo", "/trunk", Some("mallory"), Access::READ));
    }

    #[test]
    fn anonymous_rules() {
        let p = policy(
            "[/]\n\
             $anonymous = r\n\
             $authenticated = rw\n",
        );
        assert!(p.check_access("repo", "/x", None, Access::READ));
        assert!(!p.check_access("repo", "/x", None, Access::WRITE));
        assert!(p.check_access("repo", "/x", Some("alice"), Access::WRITE));
    }

    #[test]
    fn groups_and_aliases_resolve_in_rules() {
        let p = policy(
            "[groups]\n\
             devs = alice, @ops\n\
             ops = bob\n\
             [aliases]\n\
             boss = carol\n\
             [/]\n\
             @devs = rw\n\
             &boss = r\n",
        );
        for user in ["alice", "bob"] {
            assert!(p.check_access("repo", "/x", Some(user), Access::WRITE), "{user}");
        }
        assert!(p.check_access("repo", "/x", Some("carol"), Access::READ));
        assert!(!p.check_access("repo", "/x", Some("carol"), Access::WRITE));
        assert!(!p.check_access("repo", "/x", Some("mallory"), Access::READ));
    }

    #[test]
    fn recursive_request_is_revoked_by_nested_denial() {
        let p = policy(
            "[repo:/]\n\
             * = rw\n\
             [repo:/trunk/secret]\n\
             * =\n",
        );
        // Plain write to /trunk is fine.
        assert!(p.check_access("repo", "/trunk", Some("alice"), Access::WRITE));
        // Deleting /trunk would sweep /trunk/secret along.
        assert!(!p.check_access(
            "repo",
            "/trunk",
            Some("alice"),
            Access::WRITE | Access::RECURSIVE
        ));
        // A subtree with no nested denial is fine.
        assert!(p.check_access(
            "repo",
            "/branches",
            Some("alice"),
            Access::WRITE | Access::RECURSIVE
        ));
    }

    #[test]
    fn recursive_denial_is_rescued_by_matching_allow() {
        let p = policy(
            "[repo:/]\n\
             * = rw\n\
             [repo:/trunk/secret]\n\
             * =\n\
             alice = rw\n",
        );
        assert!(p.check_access(
            "repo",
            "/trunk",
            Some("alice"),
            Access::WRITE | Access::RECURSIVE
        ));
        assert!(!p.check_access(
            "repo",
            "/trunk",
            Some("bob"),
            Access::WRITE | Access::RECURSIVE
        ));
    }

    #[test]
    fn recursive_scan_ignores_sibling_paths() {
        let p = policy(
            "[repo:/]\n\
             * = rw\n\
             [repo:/trunk-adjacent]\n\
             * =\n",
        );
        // /trunk-adjacent is not under /trunk.
        assert!(p.check_access(
            "repo",
            "/trunk",
            Some("alice"),
            Access::WRITE | Access::RECURSIVE
        ));
    }

    #[test]
    fn store_swaps_snapshots_atomically() {
        let store = PolicyStore::new(Policy::parse("[/]\n* = r\n").expect("parses"));
        let before = store.current();
        assert!(before.check_access("r", "/x", None, Access::READ));

        store.reload("[/]\n* =\n").expect("reloads");
        let after = store.current();
        assert!(!after.check_access("r", "/x", None, Access::READ));
        // The old snapshot is unchanged for readers still holding it.
        assert!(before.check_access("r", "/x", None, Access::READ));
    }

    #[test]
    fn failed_reload_keeps_the_active_policy() {
        let store = PolicyStore::new(Policy::parse("[/]\n* = r\n").expect("parses"));
        store.reload("[broken\n").expect_err("must fail");
        assert!(store.current().check_access("r", "/x", None, Access::READ));
    }
}
