//! The loaded authorization policy.
//!
//! A [`Policy`] is parsed from configuration text in one pass and
//! validated before use: every `@group` and `&alias` reference must
//! resolve, and group membership must be acyclic. Once built it is
//! immutable; reloading produces a new instance.

use std::collections::{BTreeMap, HashMap, HashSet};

use kunai_core::util::path;

use crate::access::Access;
use crate::error::{AuthzError, AuthzResult};
use crate::parse::parse_ini;

/// Reserved section names.
const GROUPS_SECTION: &str = "groups";
const ALIASES_SECTION: &str = "aliases";

/// A rule's match expression: who the rule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchExpr {
    /// `*`: everyone, authenticated or not.
    Everyone,
    /// `$anonymous`: only requests with no user.
    Anonymous,
    /// `$authenticated`: only requests with a user.
    Authenticated,
    /// `@name`: members of a group.
    Group(String),
    /// `&name`: the principal behind an alias.
    Alias(String),
    /// A literal user name. Never matches the null user.
    User(String),
    /// `~expr`: everyone the inner expression does not match.
    Not(Box<MatchExpr>),
}

/// One member of a `[groups]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    User(String),
    Group(String),
    Alias(String),
}

/// The ordered rules configured at one path.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub rules: Vec<(MatchExpr, Access)>,
}

impl RuleSet {
    /// ## Summary
    /// Computes the allow/deny masks this rule set derives for a user.
    ///
    /// Every matching expression contributes independently for read and
    /// write: a letter present adds the bit to `allow`, a letter absent
    /// adds it to `deny`. Rule order carries no priority.
    #[must_use]
    pub fn masks(&self, policy: &Policy, user: Option<&str>) -> (Access, Access) {
        let mut allow = Access::empty();
        let mut deny = Access::empty();
        for (expr, perms) in &self.rules {
            if !policy.applies(expr, user) {
                continue;
            }
            for bit in [Access::READ, Access::WRITE] {
                if perms.contains(bit) {
                    allow |= bit;
                } else {
                    deny |= bit;
                }
            }
        }
        (allow, deny)
    }
}

/// A validated, immutable access-control policy.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    pub(crate) groups: HashMap<String, Vec<Member>>,
    pub(crate) aliases: HashMap<String, String>,
    /// Per-repository path rules; the empty repository name holds the
    /// rules that apply to all repositories.
    pub(crate) repos: HashMap<String, BTreeMap<String, RuleSet>>,
}

impl Policy {
    /// ## Summary
    /// Parses and validates authorization configuration text.
    ///
    /// ## Errors
    /// Any syntax error, invalid match token, invalid access letters,
    /// unresolved group/alias reference, or group membership cycle
    /// rejects the whole policy.
    #[tracing::instrument(skip(text), fields(len = text.len()))]
    pub fn parse(text: &str) -> AuthzResult<Self> {
        let mut policy = Self::default();

        for section in parse_ini(text)? {
            match section.name.as_str() {
                GROUPS_SECTION => {
                    for entry in &section.options {
                        let members = parse_members(&entry.value, entry.line)?;
                        policy.groups.insert(entry.name.clone(), members);
                    }
                }
                ALIASES_SECTION => {
                    for entry in &section.options {
                        if entry.value.is_empty() {
                            return Err(AuthzError::syntax(
                                entry.line,
                                format!("alias '{}' has no principal", entry.name),
                            ));
                        }
                        policy.aliases.insert(entry.name.clone(), entry.value.clone());
                    }
                }
                name => {
                    let (repo, rule_path) = match name.split_once(':') {
                        Some((repo, rule_path)) => (repo.trim(), rule_path.trim()),
                        None => ("", name),
                    };
                    if !rule_path.starts_with('/') {
                        return Err(AuthzError::syntax(
                            section.line,
                            format!("rule path '{rule_path}' must start with '/'"),
                        ));
                    }
                    let rules = policy
                        .repos
                        .entry(repo.to_string())
                        .or_default()
                        .entry(path::standardize(rule_path))
                        .or_default();
                    for entry in &section.options {
                        let expr = parse_match_expr(&entry.name, entry.line)?;
                        let Some(perms) = Access::from_letters(&entry.value) else {
                            return Err(AuthzError::syntax(
                                entry.line,
                                format!("invalid access letters '{}'", entry.value),
                            ));
                        };
                        rules.rules.push((expr, perms));
                    }
                }
            }
        }

        policy.validate_references()?;
        policy.detect_group_cycles()?;
        tracing::debug!(
            groups = policy.groups.len(),
            repos = policy.repos.len(),
            "loaded authorization policy"
        );
        Ok(policy)
    }

    /// ## Summary
    /// Loads and parses a policy file.
    ///
    /// ## Errors
    /// I/O failures and every parse-time error.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> AuthzResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Whether a match expression applies to the given user. `~`
    /// negation inverts the inner match.
    #[must_use]
    pub(crate) fn applies(&self, expr: &MatchExpr, user: Option<&str>) -> bool {
        match expr {
            MatchExpr::Everyone => true,
            MatchExpr::Anonymous => user.is_none(),
            MatchExpr::Authenticated => user.is_some(),
            MatchExpr::User(name) => user == Some(name.as_str()),
            MatchExpr::Alias(name) => {
                user.is_some() && self.aliases.get(name).map(String::as_str) == user
            }
            MatchExpr::Group(name) => {
                user.is_some_and(|user| self.group_contains(name, user))
            }
            MatchExpr::Not(inner) => !self.applies(inner, user),
        }
    }

    fn group_contains(&self, group: &str, user: &str) -> bool {
        self.groups.get(group).is_some_and(|members| {
            members.iter().any(|member| match member {
                Member::User(name) => name == user,
                Member::Group(name) => self.group_contains(name, user),
                Member::Alias(name) => {
                    self.aliases.get(name).map(String::as_str) == Some(user)
                }
            })
        })
    }

    /// Every `@group`/`&alias` mention, in rules and in group member
    /// lists, must resolve.
    fn validate_references(&self) -> AuthzResult<()> {
        for members in self.groups.values() {
            for member in members {
                match member {
                    Member::Group(name) if !self.groups.contains_key(name) => {
                        return Err(AuthzError::UnknownGroup(name.clone()));
                    }
                    Member::Alias(name) if !self.aliases.contains_key(name) => {
                        return Err(AuthzError::UnknownAlias(name.clone()));
                    }
                    _ => {}
                }
            }
        }
        for rules in self.repos.values() {
            for set in rules.values() {
                for (expr, _) in &set.rules {
                    self.validate_expr(expr)?;
                }
            }
        }
        Ok(())
    }

    fn validate_expr(&self, expr: &MatchExpr) -> AuthzResult<()> {
        match expr {
            MatchExpr::Group(name) if !self.groups.contains_key(name) => {
                Err(AuthzError::UnknownGroup(name.clone()))
            }
            MatchExpr::Alias(name) if !self.aliases.contains_key(name) => {
                Err(AuthzError::UnknownAlias(name.clone()))
            }
            MatchExpr::Not(inner) => self.validate_expr(inner),
            _ => Ok(()),
        }
    }

    /// Depth-first walk over group membership; revisiting a group that
    /// is still on the walk stack is a cycle.
    fn detect_group_cycles(&self) -> AuthzResult<()> {
        let mut finished: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = Vec::new();
        for name in self.groups.keys() {
            self.visit_group(name, &mut stack, &mut finished)?;
        }
        Ok(())
    }

    fn visit_group<'a>(
        &'a self,
        name: &'a str,
        stack: &mut Vec<&'a str>,
        finished: &mut HashSet<&'a str>,
    ) -> AuthzResult<()> {
        if finished.contains(name) {
            return Ok(());
        }
        if stack.contains(&name) {
            return Err(AuthzError::CircularGroup(name.to_string()));
        }
        stack.push(name);
        if let Some(members) = self.groups.get(name) {
            for member in members {
                if let Member::Group(inner) = member {
                    self.visit_group(inner, stack, finished)?;
                }
            }
        }
        stack.pop();
        finished.insert(name);
        Ok(())
    }
}

fn parse_members(value: &str, line: usize) -> AuthzResult<Vec<Member>> {
    let mut members = Vec::new();
    for raw in value.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AuthzError::syntax(line, "empty group member"));
        }
        let member = if let Some(name) = raw.strip_prefix('@') {
            Member::Group(require_name(name, line, "group")?)
        } else if let Some(name) = raw.strip_prefix('&') {
            Member::Alias(require_name(name, line, "alias")?)
        } else {
            Member::User(raw.to_string())
        };
        members.push(member);
    }
    Ok(members)
}

fn parse_match_expr(token: &str, line: usize) -> AuthzResult<MatchExpr> {
    if let Some(inner) = token.strip_prefix('~') {
        if inner.starts_with('~') {
            return Err(AuthzError::syntax(line, "double negation in rule"));
        }
        if inner == "*" {
            return Err(AuthzError::syntax(line, "'~*' matches nothing"));
        }
        return Ok(MatchExpr::Not(Box::new(parse_match_expr(inner, line)?)));
    }
    match token {
        "*" => Ok(MatchExpr::Everyone),
        "$anonymous" => Ok(MatchExpr::Anonymous),
        "$authenticated" => Ok(MatchExpr::Authenticated),
        _ => {
            if let Some(name) = token.strip_prefix('@') {
                Ok(MatchExpr::Group(require_name(name, line, "group")?))
            } else if let Some(name) = token.strip_prefix('&') {
                Ok(MatchExpr::Alias(require_name(name, line, "alias")?))
            } else if token.starts_with('$') {
                Err(AuthzError::syntax(
                    line,
                    format!("invalid match token '{token}'"),
                ))
            } else if token.is_empty() {
                Err(AuthzError::syntax(line, "empty match token"))
            } else {
                Ok(MatchExpr::User(token.to_string()))
            }
        }
    }
}

fn require_name(name: &str, line: usize, what: &str) -> AuthzResult<String> {
    if name.is_empty() {
        return Err(AuthzError::syntax(line, format!("{what} reference without a name")));
    }
    Ok(name.to_string())
}
