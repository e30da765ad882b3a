//! RFC 2812 line parsing and serialization.
//!
//! Only the subset the connector needs: optional source prefix, command,
//! middle parameters, trailing parameter. IRCv3 tags are not consumed from
//! the servers hircd talks to and are not modeled.

use std::fmt;
use thiserror::Error;

/// A single IRC protocol line, without its `\r\n` terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Source prefix: a server name or `nick!user@host`.
    pub source: Option<String>,
    /// Command or three-digit numeric, as sent.
    pub command: String,
    pub params: Vec<String>,
}

/// Line-level parse failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty line")]
    Empty,
    #[error("source prefix without a command")]
    MissingCommand,
}

impl Line {
    /// Build a line from a command and middle/trailing parameters.
    pub fn cmd<I, S>(command: &str, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source: None,
            command: command.to_string(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    pub fn privmsg(target: &str, text: &str) -> Self {
        Self::cmd("PRIVMSG", [target, text])
    }

    /// Parse one line (trailing `\r\n` tolerated).
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let input = input.trim_end_matches(['\r', '\n']);
        if input.is_empty() {
            return Err(ParseError::Empty);
        }

        let (source, rest) = match input.strip_prefix(':') {
            Some(prefixed) => {
                let (source, rest) = prefixed
                    .split_once(' ')
                    .ok_or(ParseError::MissingCommand)?;
                (Some(source.to_string()), rest)
            }
            None => (None, input),
        };

        let (command, mut rest) = match rest.split_once(' ') {
            Some((command, rest)) => (command, rest),
            None => (rest, ""),
        };
        if command.is_empty() {
            return Err(ParseError::MissingCommand);
        }

        let mut params = Vec::new();
        while !rest.is_empty() {
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match rest.split_once(' ') {
                Some((param, tail)) => {
                    params.push(param.to_string());
                    rest = tail;
                }
                None => {
                    params.push(rest.to_string());
                    break;
                }
            }
        }

        Ok(Self {
            source,
            command: command.to_string(),
            params,
        })
    }

    /// The nick part of the source prefix, if the source is a user.
    pub fn source_nick(&self) -> Option<&str> {
        let source = self.source.as_deref()?;
        Some(source.split('!').next().unwrap_or(source))
    }

    /// Serialize to wire format, without `\r\n`. The last parameter is
    /// always written as trailing, which is valid for every command we emit.
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        if let Some(source) = &self.source {
            out.push(':');
            out.push_str(source);
            out.push(' ');
        }
        out.push_str(&self.command);
        if let Some((last, middle)) = self.params.split_last() {
            for param in middle {
                out.push(' ');
                out.push_str(param);
            }
            out.push_str(" :");
            out.push_str(last);
        }
        out
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bare_command() {
        let line = Line::parse("QUIT").unwrap();
        assert_eq!(line.source, None);
        assert_eq!(line.command, "QUIT");
        assert!(line.params.is_empty());
    }

    #[test]
    fn parse_privmsg_with_trailing() {
        let line = Line::parse(":alice!a@host PRIVMSG #a :hello there").unwrap();
        assert_eq!(line.source_nick(), Some("alice"));
        assert_eq!(line.command, "PRIVMSG");
        assert_eq!(line.params, vec!["#a", "hello there"]);
    }

    #[test]
    fn parse_numeric_names_reply() {
        let line = Line::parse(":irc.example 353 me = #a :@alice +bob carol").unwrap();
        assert_eq!(line.command, "353");
        assert_eq!(line.params, vec!["me", "=", "#a", "@alice +bob carol"]);
    }

    #[test]
    fn parse_server_source_has_no_nick_split() {
        let line = Line::parse(":irc.example PING :token").unwrap();
        assert_eq!(line.source_nick(), Some("irc.example"));
    }

    #[test]
    fn parse_trailing_with_colon_inside() {
        let line = Line::parse("PRIVMSG #a ::-)").unwrap();
        assert_eq!(line.params, vec!["#a", ":-)"]);
    }

    #[test]
    fn parse_tolerates_crlf() {
        let line = Line::parse("PING :irc.example\r\n").unwrap();
        assert_eq!(line.command, "PING");
        assert_eq!(line.params, vec!["irc.example"]);
    }

    #[test]
    fn parse_rejects_empty_and_prefix_only() {
        assert_eq!(Line::parse(""), Err(ParseError::Empty));
        assert_eq!(Line::parse(":irc.example"), Err(ParseError::MissingCommand));
    }

    #[test]
    fn wire_form_roundtrips_semantically() {
        let original = Line::parse(":alice!a@h PRIVMSG #a :hi all").unwrap();
        let reparsed = Line::parse(&original.to_wire()).unwrap();
        assert_eq!(original, reparsed);
    }

    #[test]
    fn cmd_builder_serializes_with_trailing_colon() {
        let line = Line::cmd("USER", ["wren", "0", "*", "wren"]);
        assert_eq!(line.to_wire(), "USER wren 0 * :wren");
    }
}
