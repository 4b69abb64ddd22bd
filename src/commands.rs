//! Line commands for plain (`--no-tui`) mode
//!
//! - `a <msg>` / `b <msg>` / `both <msg>` = send a message
//! - `/xxx` = lab commands

use crate::lab::VariantId;

/// Where a message goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    One(VariantId),
    Both,
}

impl Target {
    pub fn variants(&self) -> Vec<VariantId> {
        match self {
            Target::One(id) => vec![*id],
            Target::Both => VariantId::ALL.to_vec(),
        }
    }
}

/// A parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabCommand {
    Send(Target, String),
    Items(VariantId),
    History(VariantId),
    Compare,
    Name(String),
    Minutes(u32),
    Summaries(String),
    Template(VariantId, String),
    ShowTemplate(VariantId),
    Reset,
    Help,
    Quit,
    /// Something we could not make sense of; carries a hint for the user
    Invalid(String),
}

pub const HELP: &str = "\
Commands:
  a <message>            send to Prompt-A
  b <message>            send to Prompt-B
  both <message>         send to both, then compare
  /items a|b             show latest action items
  /history a|b           show the conversation
  /compare               latest replies and action items side by side
  /name <text>           set user name
  /minutes <n>           set session length (1-120)
  /summaries <text>      set previous session summaries (\\n for newline)
  /template a|b [text]   show or replace a template (\\n for newline)
  /reset                 discard both conversations
  /help                  this text
  /quit                  exit";

/// Turn literal `\n` sequences typed on one line into newlines
pub fn unescape_newlines(s: &str) -> String {
    s.replace("\\n", "\n")
}

fn split_first(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim_start()),
        None => (s, ""),
    }
}

fn variant_arg(cmd: &str, arg: &str) -> std::result::Result<VariantId, LabCommand> {
    VariantId::parse(arg).ok_or_else(|| LabCommand::Invalid(format!("usage: /{cmd} a|b")))
}

/// Parse one input line. Blank lines give `None`.
pub fn parse_command(input: &str) -> Option<LabCommand> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Some(rest) = input.strip_prefix('/') {
        let (cmd_name, args) = split_first(rest);
        let cmd = match cmd_name.to_ascii_lowercase().as_str() {
            "items" => variant_arg("items", args).map(LabCommand::Items),
            "history" => variant_arg("history", args).map(LabCommand::History),
            "compare" => Ok(LabCommand::Compare),
            "name" if !args.is_empty() => Ok(LabCommand::Name(args.to_string())),
            "name" => Err(LabCommand::Invalid("usage: /name <text>".into())),
            "minutes" => args
                .parse::<u32>()
                .map(LabCommand::Minutes)
                .map_err(|_| LabCommand::Invalid("usage: /minutes <1-120>".into())),
            "summaries" => Ok(LabCommand::Summaries(unescape_newlines(args))),
            "template" => {
                let (which, text) = split_first(args);
                variant_arg("template", which).map(|id| {
                    if text.is_empty() {
                        LabCommand::ShowTemplate(id)
                    } else {
                        LabCommand::Template(id, unescape_newlines(text))
                    }
                })
            }
            "reset" => Ok(LabCommand::Reset),
            "help" | "?" => Ok(LabCommand::Help),
            "quit" | "exit" | "q" => Ok(LabCommand::Quit),
            other => Err(LabCommand::Invalid(format!("unknown command /{other}, try /help"))),
        };
        return Some(cmd.unwrap_or_else(|invalid| invalid));
    }

    let (head, message) = split_first(input);
    let target = match head.to_ascii_lowercase().as_str() {
        "both" => Some(Target::Both),
        other => VariantId::parse(other).map(Target::One),
    };

    Some(match target {
        Some(_) if message.is_empty() => LabCommand::Invalid("message is empty".into()),
        Some(target) => LabCommand::Send(target, message.to_string()),
        None => LabCommand::Invalid("start with a, b or both, or /help".into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_send() {
        assert_eq!(
            parse_command("a How do I sleep better?"),
            Some(LabCommand::Send(
                Target::One(VariantId::A),
                "How do I sleep better?".into()
            ))
        );
        assert_eq!(
            parse_command("BOTH  hi"),
            Some(LabCommand::Send(Target::Both, "hi".into()))
        );
        assert!(matches!(parse_command("b"), Some(LabCommand::Invalid(_))));
        assert!(matches!(parse_command("hello"), Some(LabCommand::Invalid(_))));
        assert_eq!(parse_command("   "), None);
    }

    #[test]
    fn test_parse_lab_commands() {
        assert_eq!(parse_command("/items b"), Some(LabCommand::Items(VariantId::B)));
        assert_eq!(parse_command("/compare"), Some(LabCommand::Compare));
        assert_eq!(parse_command("/minutes 30"), Some(LabCommand::Minutes(30)));
        assert!(matches!(parse_command("/minutes lots"), Some(LabCommand::Invalid(_))));
        assert!(matches!(parse_command("/items"), Some(LabCommand::Invalid(_))));
        assert_eq!(parse_command("/quit"), Some(LabCommand::Quit));
        assert!(matches!(parse_command("/bogus"), Some(LabCommand::Invalid(_))));
    }

    #[test]
    fn test_parse_with_escapes() {
        assert_eq!(
            parse_command(r"/template a <>Userinfo</>\n\nBe terse."),
            Some(LabCommand::Template(
                VariantId::A,
                "<>Userinfo</>\n\nBe terse.".into()
            ))
        );
        assert_eq!(
            parse_command("/template b"),
            Some(LabCommand::ShowTemplate(VariantId::B))
        );
        assert_eq!(
            parse_command(r"/summaries Week 2: sleep\nWeek 1: diet"),
            Some(LabCommand::Summaries("Week 2: sleep\nWeek 1: diet".into()))
        );
        assert_eq!(parse_command("/summaries"), Some(LabCommand::Summaries(String::new())));
    }

    #[test]
    fn test_target_variants() {
        assert_eq!(Target::Both.variants(), vec![VariantId::A, VariantId::B]);
        assert_eq!(Target::One(VariantId::B).variants(), vec![VariantId::B]);
    }
}
