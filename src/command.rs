//! Command classification.
//!
//! Commands are plain text of the shape
//! `bot <keyword> [groupname] [free text...]`, matched case-insensitively with
//! surrounding whitespace ignored. The group name is a single alphanumeric
//! token, which is what lets the free-text remainder contain spaces.

/// Everything addressed to the bot starts with this word.
const BOT_PREFIX: &str = "bot";

/// Which grammar a keyword belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    /// Self-service commands anyone may send.
    Basic,
    /// Operator commands gated by the admin allow-list.
    Administrative,
}

/// The command keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Help,
    Subscribe,
    Unsubscribe,
    ListGroups,
    AddGroup,
    RemoveGroup,
    List,
    Add,
    Remove,
    Send,
}

impl CommandKind {
    /// Look up a keyword (already lowercased) within one grammar.
    fn from_keyword(grammar: Grammar, keyword: &str) -> Option<Self> {
        let kind = match (grammar, keyword) {
            (Grammar::Basic, "help") => CommandKind::Help,
            (Grammar::Basic, "subscribe") => CommandKind::Subscribe,
            (Grammar::Basic, "unsubscribe") => CommandKind::Unsubscribe,
            (Grammar::Administrative, "listgroups") => CommandKind::ListGroups,
            (Grammar::Administrative, "addgroup") => CommandKind::AddGroup,
            (Grammar::Administrative, "removegroup") => CommandKind::RemoveGroup,
            (Grammar::Administrative, "list") => CommandKind::List,
            (Grammar::Administrative, "add") => CommandKind::Add,
            (Grammar::Administrative, "remove") => CommandKind::Remove,
            (Grammar::Administrative, "send") => CommandKind::Send,
            _ => return None,
        };
        Some(kind)
    }

    /// The grammar this keyword belongs to.
    pub fn grammar(self) -> Grammar {
        match self {
            CommandKind::Help | CommandKind::Subscribe | CommandKind::Unsubscribe => Grammar::Basic,
            _ => Grammar::Administrative,
        }
    }

    /// Keyword as written in commands.
    pub fn keyword(self) -> &'static str {
        match self {
            CommandKind::Help => "help",
            CommandKind::Subscribe => "subscribe",
            CommandKind::Unsubscribe => "unsubscribe",
            CommandKind::ListGroups => "listgroups",
            CommandKind::AddGroup => "addgroup",
            CommandKind::RemoveGroup => "removegroup",
            CommandKind::List => "list",
            CommandKind::Add => "add",
            CommandKind::Remove => "remove",
            CommandKind::Send => "send",
        }
    }
}

/// A classified command: keyword plus positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub kind: CommandKind,
    /// Group name token, if one followed the keyword.
    pub group: Option<String>,
    /// Free text after the group name, with inner whitespace preserved.
    pub remainder: Option<String>,
}

impl Grammar {
    /// Match `text` against this grammar.
    pub fn parse(self, text: &str) -> Option<Route> {
        let (prefix, rest) = split_token(text.trim());
        if !prefix.eq_ignore_ascii_case(BOT_PREFIX) {
            return None;
        }

        let (keyword, rest) = split_token(rest);
        let kind = CommandKind::from_keyword(self, &keyword.to_ascii_lowercase())?;

        let (group, rest) = split_token(rest);
        if !group.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }

        Some(Route {
            kind,
            group: non_empty(group),
            remainder: non_empty(rest),
        })
    }
}

/// Classify `text` against both grammars, administrative first.
///
/// Callers that know the sender should use [`classify`] instead, which only
/// honours the administrative grammar for admins.
pub fn route(text: &str) -> Option<Route> {
    Grammar::Administrative
        .parse(text)
        .or_else(|| Grammar::Basic.parse(text))
}

/// Classify `text` for a sender.
///
/// The administrative grammar is tried first but only counts when the sender
/// is an admin; otherwise the basic grammar decides.
pub fn classify(text: &str, is_admin: bool) -> Option<Route> {
    Grammar::Administrative
        .parse(text)
        .filter(|_| is_admin)
        .or_else(|| Grammar::Basic.parse(text))
}

/// Split off the first whitespace-delimited token.
///
/// Returns the token and the rest with its leading whitespace removed.
fn split_token(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(idx) => (&text[..idx], text[idx..].trim_start()),
        None => (text, ""),
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_help() {
        let parsed = Grammar::Basic.parse("bot help").unwrap();
        assert_eq!(parsed.kind, CommandKind::Help);
        assert!(parsed.group.is_none());
        assert!(parsed.remainder.is_none());
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let parsed = Grammar::Basic.parse("   BOT   SubScribe  Choir   Jane Doe  ").unwrap();
        assert_eq!(parsed.kind, CommandKind::Subscribe);
        assert_eq!(parsed.group.as_deref(), Some("Choir"));
        assert_eq!(parsed.remainder.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_remainder_keeps_inner_spacing_and_newlines() {
        let parsed = Grammar::Administrative
            .parse("bot send Choir Rehearsal moved\nto  Friday!")
            .unwrap();
        assert_eq!(parsed.kind, CommandKind::Send);
        assert_eq!(parsed.group.as_deref(), Some("Choir"));
        assert_eq!(parsed.remainder.as_deref(), Some("Rehearsal moved\nto  Friday!"));
    }

    #[test]
    fn test_grammars_are_disjoint() {
        assert!(Grammar::Basic.parse("bot addgroup Choir").is_none());
        assert!(Grammar::Administrative.parse("bot subscribe Choir Jane").is_none());
    }

    #[test]
    fn test_list_is_not_a_prefix_of_listgroups() {
        let parsed = Grammar::Administrative.parse("bot listgroups").unwrap();
        assert_eq!(parsed.kind, CommandKind::ListGroups);

        let parsed = Grammar::Administrative.parse("bot list Choir").unwrap();
        assert_eq!(parsed.kind, CommandKind::List);
    }

    #[test]
    fn test_keyword_must_stand_alone() {
        assert!(Grammar::Basic.parse("bot helpme").is_none());
        assert!(Grammar::Basic.parse("bot help?").is_none());
        assert!(Grammar::Basic.parse("robot help").is_none());
        assert!(Grammar::Basic.parse("bothelp").is_none());
    }

    #[test]
    fn test_group_must_be_alphanumeric() {
        assert!(Grammar::Basic.parse("bot subscribe my-group Jane").is_none());
        assert!(Grammar::Basic.parse("bot subscribe Grüne Jane").is_none());
        assert!(Grammar::Basic.parse("bot subscribe Group2 Jane").is_some());
    }

    #[test]
    fn test_missing_group_still_matches() {
        let parsed = Grammar::Basic.parse("bot subscribe").unwrap();
        assert_eq!(parsed.kind, CommandKind::Subscribe);
        assert!(parsed.group.is_none());
    }

    #[test]
    fn test_unrelated_text() {
        assert!(route("hello there").is_none());
        assert!(route("").is_none());
        assert!(route("bot").is_none());
        assert!(route("bot dance").is_none());
    }

    #[test]
    fn test_route_tries_both_grammars() {
        assert_eq!(route("bot help").unwrap().kind, CommandKind::Help);
        assert_eq!(route("bot addgroup X").unwrap().kind, CommandKind::AddGroup);
    }

    #[test]
    fn test_classify_hides_admin_commands_from_others() {
        assert!(classify("bot addgroup Choir", false).is_none());
        assert_eq!(
            classify("bot addgroup Choir", true).unwrap().kind,
            CommandKind::AddGroup
        );
        assert_eq!(classify("bot help", false).unwrap().kind, CommandKind::Help);
        assert_eq!(classify("bot help", true).unwrap().kind, CommandKind::Help);
    }

    #[test]
    fn test_kind_grammar_and_keyword() {
        assert_eq!(CommandKind::Unsubscribe.grammar(), Grammar::Basic);
        assert_eq!(CommandKind::Send.grammar(), Grammar::Administrative);
        assert_eq!(CommandKind::RemoveGroup.keyword(), "removegroup");
    }
}
