//! Short-form token expansion.
//!
//! Callers describe layouts as a tree of loosely-typed [`Token`]s: integers
//! are keypad moves, strings are writes, style fragments style the text that
//! follows and nested sequences flatten. [`Script::commit`] turns the tree
//! into canonical [`Command`]s.
//!
//! Keypad directions (rows grow downward):
//!
//! ```text
//! 7 8 9
//! 4 5 6
//! 1 2 3
//! ```

use celldsl_core::Style;

use crate::command::{Command, RichRun, RichWrite, Write};
use crate::error::BuilderError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Seq(Vec<Token>),
    /// Keypad digits, each one a unit step.
    Move(i64),
    Text(String),
    Style(Style),
    Command(Command),
    Empty,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Seq(_) => "a nested sequence".to_string(),
            Token::Move(n) => format!("move {n}"),
            Token::Text(t) => format!("text {t:?}"),
            Token::Style(s) => format!("style {s}"),
            Token::Command(c) => format!("command {}", c.name()),
            Token::Empty => "an empty marker".to_string(),
        }
    }
}

impl From<i64> for Token {
    fn from(n: i64) -> Self {
        Token::Move(n)
    }
}

impl From<i32> for Token {
    fn from(n: i32) -> Self {
        Token::Move(i64::from(n))
    }
}

impl From<u32> for Token {
    fn from(n: u32) -> Self {
        Token::Move(i64::from(n))
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Token::Text(s.to_string())
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Token::Text(s)
    }
}

impl From<Style> for Token {
    fn from(s: Style) -> Self {
        Token::Style(s)
    }
}

impl From<Command> for Token {
    fn from(c: Command) -> Self {
        Token::Command(c)
    }
}

impl From<Write> for Token {
    fn from(w: Write) -> Self {
        Token::Command(w.into())
    }
}

impl From<RichWrite> for Token {
    fn from(w: RichWrite) -> Self {
        Token::Command(w.into())
    }
}

impl From<crate::command::MergeWrite> for Token {
    fn from(w: crate::command::MergeWrite) -> Self {
        Token::Command(w.into())
    }
}

impl From<()> for Token {
    fn from(_: ()) -> Self {
        Token::Empty
    }
}

impl<T: Into<Token>> From<Vec<T>> for Token {
    fn from(items: Vec<T>) -> Self {
        Token::Seq(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Token>> From<Option<T>> for Token {
    fn from(item: Option<T>) -> Self {
        item.map_or(Token::Empty, Into::into)
    }
}

/// Tokens read from JSON: integers move, strings write, objects are style
/// fragments, arrays nest and `null` is the empty marker.
impl TryFrom<serde_json::Value> for Token {
    type Error = BuilderError;

    fn try_from(value: serde_json::Value) -> Result<Self, BuilderError> {
        use serde_json::Value;
        match value {
            Value::Null => Ok(Token::Empty),
            Value::String(s) => Ok(Token::Text(s)),
            Value::Number(n) => n.as_i64().map(Token::Move).ok_or(BuilderError::UnsupportedToken {
                type_name: "number",
                value: n.to_string(),
            }),
            Value::Array(items) => items
                .into_iter()
                .map(Token::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Token::Seq),
            Value::Object(map) => {
                let raw = Value::Object(map);
                let text = raw.to_string();
                serde_json::from_value::<Style>(raw)
                    .map(Token::Style)
                    .map_err(|_| BuilderError::UnsupportedToken {
                        type_name: "object",
                        value: text,
                    })
            }
            Value::Bool(b) => Err(BuilderError::UnsupportedToken {
                type_name: "bool",
                value: b.to_string(),
            }),
        }
    }
}

/// Build a [`Token::Seq`] from heterogeneous items.
#[macro_export]
macro_rules! tokens {
    ($($item:expr),* $(,)?) => {
        $crate::builder::Token::Seq(vec![$($crate::builder::Token::from($item)),*])
    };
}

/// Sum keypad digits into one relative move.
pub fn keypad_move(n: i64) -> Command {
    let (mut rows, mut cols) = (0i64, 0i64);
    for digit in n.unsigned_abs().to_string().chars() {
        let (dr, dc) = match digit {
            '1' => (1, -1),
            '2' => (1, 0),
            '3' => (1, 1),
            '4' => (0, -1),
            '6' => (0, 1),
            '7' => (-1, -1),
            '8' => (-1, 0),
            '9' => (-1, 1),
            _ => (0, 0),
        };
        rows += dr;
        cols += dc;
    }
    Command::move_by(rows, cols)
}

/// Accumulates canonical commands.
#[derive(Debug, Clone, Default)]
pub struct Script {
    commands: Vec<Command>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Expand a token tree and append the resulting commands.
    ///
    /// On error nothing is appended.
    pub fn commit(&mut self, tokens: impl Into<Token>) -> Result<&mut Self, BuilderError> {
        let mut out = Vec::new();
        expand(tokens.into(), &mut out)?;
        self.commands.extend(out);
        Ok(self)
    }
}

/// Expand one token tree into commands.
pub fn expand_tokens(tokens: impl Into<Token>) -> Result<Vec<Command>, BuilderError> {
    let mut out = Vec::new();
    expand(tokens.into(), &mut out)?;
    Ok(out)
}

fn expand(token: Token, out: &mut Vec<Command>) -> Result<(), BuilderError> {
    let items = match token {
        Token::Seq(items) => items,
        other => vec![other],
    };

    let mut pending: Option<Style> = None;
    let mut texts: Vec<RichRun> = Vec::new();

    for item in items.into_iter().map(Some).chain(std::iter::once(None)) {
        match item {
            Some(Token::Text(text)) => {
                texts.push(RichRun {
                    text,
                    style: pending.take(),
                });
                continue;
            }
            Some(Token::Style(style)) => {
                pending = Some(match pending.take() {
                    Some(p) => p | style,
                    None => style,
                });
                continue;
            }
            _ => {}
        }

        if let Some(style) = pending.take() {
            if texts.len() < 2 {
                return Err(BuilderError::DanglingStyle {
                    pending: style,
                    found: item.as_ref().map_or("end of sequence".to_string(), Token::describe),
                });
            }
            pending = Some(style);
        }
        flush(&mut texts, pending.take(), out);

        match item {
            None | Some(Token::Empty) => {}
            Some(Token::Move(n)) => out.push(keypad_move(n)),
            Some(Token::Command(c)) => out.push(c),
            Some(nested @ Token::Seq(_)) => expand(nested, out)?,
            Some(Token::Text(_)) | Some(Token::Style(_)) => {}
        }
    }
    Ok(())
}

fn flush(texts: &mut Vec<RichRun>, cell_style: Option<Style>, out: &mut Vec<Command>) {
    match texts.len() {
        0 => {}
        1 => {
            let run = texts.remove(0);
            out.push(Command::Write(Write {
                data: run.text.into(),
                style: run.style,
                ..Write::default()
            }));
        }
        _ => out.push(Command::RichWrite(RichWrite {
            runs: std::mem::take(texts),
            cell_style,
            ..RichWrite::default()
        })),
    }
}
