//! Conditional-request (`If:`) header parsing.
//!
//! Implements the RFC 2518 `If` production subset used by DeltaV
//! clients: one or more parenthesized condition lists, optionally
//! preceded by a `<URI>` tag naming the resource the following lists
//! apply to. Conditions within a list are ANDed by the caller; lists
//! are alternatives. This module only parses; evaluation against held
//! locks and etags is the method handler's concern.

use crate::error::{DavError, DavResult};

/// What a condition state token names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateTokenKind {
    /// `[...]`: an entity tag.
    Etag,
    /// `<...>`: an opaque lock token.
    OpaqueLock,
}

/// One condition inside a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfState {
    /// Negated by a preceding `Not`.
    pub negated: bool,
    pub kind: StateTokenKind,
    pub value: String,
}

/// One parenthesized condition list, with the tag URI it applies to
/// (untagged lists share the request URI as implicit context).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IfList {
    pub uri: Option<String>,
    pub states: Vec<IfState>,
}

/// ## Summary
/// Parses an `If:` header value into its ordered condition lists.
///
/// Scanning is single-pass and character-driven. Tagged and untagged
/// lists cannot mix within one header; `Not` negates exactly the next
/// condition and cannot repeat.
///
/// ## Errors
/// Returns 400 naming the offending character or production for any
/// input outside the grammar.
#[tracing::instrument]
pub fn parse_if_header(value: &str) -> DavResult<Vec<IfList>> {
    let mut lists: Vec<IfList> = Vec::new();
    let mut tagged: Option<bool> = None;
    let mut current_uri: Option<String> = None;

    let mut chars = value.char_indices().peekable();
    while let Some(&(offset, ch)) = chars.peek() {
        match ch {
            c if c.is_ascii_whitespace() => {
                chars.next();
            }
            '<' => {
                if tagged == Some(false) {
                    return Err(DavError::bad_request(
                        "unexpected tagged-list production in untagged If: header",
                    ));
                }
                tagged = Some(true);
                chars.next();
                current_uri = Some(scan_until(&mut chars, '>', "resource tag")?);
            }
            '(' => {
                if tagged.is_none() {
                    tagged = Some(false);
                }
                chars.next();
                lists.push(parse_list(&mut chars, current_uri.clone())?);
            }
            other => {
                return Err(DavError::bad_request(format!(
                    "invalid character '{other}' at offset {offset} in If: header"
                )));
            }
        }
    }

    if lists.is_empty() {
        return Err(DavError::bad_request("If: header carries no condition list"));
    }
    Ok(lists)
}

/// Parses the interior of one `(...)` group; the opening parenthesis
/// has already been consumed.
fn parse_list(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    uri: Option<String>,
) -> DavResult<IfList> {
    let mut list = IfList {
        uri,
        states: Vec::new(),
    };
    let mut negated = false;

    while let Some(&(offset, ch)) = chars.peek() {
        match ch {
            c if c.is_ascii_whitespace() => {
                chars.next();
            }
            ')' => {
                chars.next();
                if negated {
                    return Err(DavError::bad_request(
                        "expected a condition after 'Not' in If: header",
                    ));
                }
                if list.states.is_empty() {
                    return Err(DavError::bad_request("empty condition list in If: header"));
                }
                return Ok(list);
            }
            '<' => {
                chars.next();
                let value = scan_until(chars, '>', "lock token")?;
                list.states.push(IfState {
                    negated,
                    kind: StateTokenKind::OpaqueLock,
                    value,
                });
                negated = false;
            }
            '[' => {
                chars.next();
                let value = scan_until(chars, ']', "entity tag")?;
                list.states.push(IfState {
                    negated,
                    kind: StateTokenKind::Etag,
                    value,
                });
                negated = false;
            }
            'N' | 'n' => {
                if negated {
                    return Err(DavError::bad_request(
                        "'Not' may negate at most one condition in If: header",
                    ));
                }
                expect_keyword(chars, "Not")?;
                negated = true;
            }
            other => {
                return Err(DavError::bad_request(format!(
                    "invalid character '{other}' at offset {offset} in If: header"
                )));
            }
        }
    }

    Err(DavError::bad_request("unterminated condition list in If: header"))
}

/// Consumes up to (and including) `close`, returning the enclosed text.
fn scan_until(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    close: char,
    what: &str,
) -> DavResult<String> {
    let mut value = String::new();
    for (_, ch) in chars.by_ref() {
        if ch == close {
            return Ok(value);
        }
        value.push(ch);
    }
    Err(DavError::bad_request(format!(
        "unterminated {what} in If: header"
    )))
}

/// Consumes `keyword` case-insensitively.
fn expect_keyword(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    keyword: &str,
) -> DavResult<()> {
    for expected in keyword.chars() {
        let matched = chars
            .next()
            .is_some_and(|(_, ch)| ch.eq_ignore_ascii_case(&expected));
        if !matched {
            return Err(DavError::bad_request(format!(
                "expected '{keyword}' keyword in If: header"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_single_lock_token() {
        let lists = parse_if_header("(<urn:lock1>)").expect("parses");
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].uri, None);
        assert_eq!(
            lists[0].states,
            vec![IfState {
                negated: false,
                kind: StateTokenKind::OpaqueLock,
                value: "urn:lock1".to_string(),
            }]
        );
    }

    #[test]
    fn tagged_lists_share_their_uri() {
        let lists =
            parse_if_header("<urn:lock1> (<urn:lock1>) (Not <urn:lock2>)").expect("parses");
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0].uri.as_deref(), Some("urn:lock1"));
        assert_eq!(lists[1].uri.as_deref(), Some("urn:lock1"));
        assert!(!lists[0].states[0].negated);
        assert!(lists[1].states[0].negated);
        assert_eq!(lists[1].states[0].kind, StateTokenKind::OpaqueLock);
    }

    #[test]
    fn retagging_switches_context() {
        let lists = parse_if_header("</a> (<urn:l1>) </b> (<urn:l2>)").expect("parses");
        assert_eq!(lists[0].uri.as_deref(), Some("/a"));
        assert_eq!(lists[1].uri.as_deref(), Some("/b"));
    }

    #[test]
    fn etags_and_lock_tokens_mix_within_a_list() {
        let lists = parse_if_header("(<urn:lock1> [\"etag-1\"] Not [W/\"weak\"])").expect("parses");
        let states = &lists[0].states;
        assert_eq!(states.len(), 3);
        assert_eq!(states[0].kind, StateTokenKind::OpaqueLock);
        assert_eq!(states[1].kind, StateTokenKind::Etag);
        assert_eq!(states[1].value, "\"etag-1\"");
        assert!(states[2].negated);
    }

    #[test]
    fn tagged_after_untagged_is_an_error() {
        let err = parse_if_header("(<urn:l1>) </a> (<urn:l2>)").expect_err("fails");
        assert_eq!(err.status, 400);
        assert!(err.message.contains("tagged-list"));
    }

    #[test]
    fn double_not_is_an_error() {
        let err = parse_if_header("(Not Not <urn:l1>)").expect_err("fails");
        assert_eq!(err.status, 400);
    }

    #[test]
    fn dangling_not_is_an_error() {
        assert!(parse_if_header("(<urn:l1> Not)").is_err());
    }

    #[test]
    fn stray_character_is_reported() {
        let err = parse_if_header("(<urn:l1> %)").expect_err("fails");
        assert!(err.message.contains('%'), "message was {}", err.message);
    }

    #[test]
    fn unterminated_productions_fail() {
        assert!(parse_if_header("(<urn:l1>").is_err());
        assert!(parse_if_header("(<urn:l1)").is_err());
        assert!(parse_if_header("<urn:l1").is_err());
        assert!(parse_if_header("([\"etag\")").is_err());
    }

    #[test]
    fn empty_header_and_empty_list_fail() {
        assert!(parse_if_header("").is_err());
        assert!(parse_if_header("   ").is_err());
        assert!(parse_if_header("()").is_err());
    }

    #[test]
    fn not_is_case_insensitive() {
        let lists = parse_if_header("(not <urn:l1>)").expect("parses");
        assert!(lists[0].states[0].negated);
    }
}
