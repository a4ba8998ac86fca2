//! Helpers for laying out repeated items.

use crate::builder::Token;
use crate::command::{Command, RichWrite};

/// Options for [`row_chain`] and [`col_chain`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChainOptions {
    /// Bookmark saved on the first item.
    pub initial_bookmark: Option<String>,
    /// Bookmark saved on the last item.
    pub final_bookmark: Option<String>,
    /// Named range covering the items.
    pub range_name: Option<String>,
    /// Forward reference covering the items.
    pub forward_ref: Option<String>,
    /// Cells advanced between consecutive items.
    pub step: usize,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            initial_bookmark: None,
            final_bookmark: None,
            range_name: None,
            forward_ref: None,
            step: 1,
        }
    }
}

impl ChainOptions {
    pub fn step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    pub fn initial_bookmark(mut self, name: impl Into<String>) -> Self {
        self.initial_bookmark = Some(name.into());
        self
    }

    pub fn final_bookmark(mut self, name: impl Into<String>) -> Self {
        self.final_bookmark = Some(name.into());
        self
    }

    pub fn range_name(mut self, name: impl Into<String>) -> Self {
        self.range_name = Some(name.into());
        self
    }

    pub fn forward_ref(mut self, name: impl Into<String>) -> Self {
        self.forward_ref = Some(name.into());
        self
    }
}

fn chain<I, T>(items: I, options: &ChainOptions, advance: Command) -> Token
where
    I: IntoIterator<Item = T>,
    T: Into<Token>,
{
    let mut out = vec![Token::Command(Command::StackPush)];
    if let Some(name) = &options.initial_bookmark {
        out.push(Command::bookmark(name.clone()).into());
    }

    let mut body = Vec::new();
    for item in items {
        if !body.is_empty() {
            body.extend(std::iter::repeat(Token::Command(advance.clone())).take(options.step));
        }
        body.push(item.into());
    }
    out.push(Token::Seq(body));

    // -1 is the top of the position stack, where the chain started.
    if let Some(name) = &options.range_name {
        out.push(Command::named_range(name.clone(), -1, 0).into());
    }
    if let Some(name) = &options.forward_ref {
        out.push(Command::forward_ref(name.clone(), -1, 0).into());
    }
    if let Some(name) = &options.final_bookmark {
        out.push(Command::bookmark(name.clone()).into());
    }
    out.push(Command::StackPop.into());
    Token::Seq(out)
}

/// Lay items out left to right, returning the cursor to where it started.
pub fn row_chain<I, T>(items: I, options: &ChainOptions) -> Token
where
    I: IntoIterator<Item = T>,
    T: Into<Token>,
{
    chain(items, options, Command::next_col())
}

/// Lay items out top to bottom, returning the cursor to where it started.
pub fn col_chain<I, T>(items: I, options: &ChainOptions) -> Token
where
    I: IntoIterator<Item = T>,
    T: Into<Token>,
{
    chain(items, options, Command::next_row())
}

/// Wrap tokens in a named section.
pub fn segment(name: impl Into<String>, tokens: impl Into<Token>) -> Token {
    Token::Seq(vec![
        Command::section(name).into(),
        tokens.into(),
        Command::SectionEnd.into(),
    ])
}

/// Concatenate rich writes; `None` if there are none.
pub fn chain_rich<I: IntoIterator<Item = RichWrite>>(writes: I) -> Option<RichWrite> {
    writes.into_iter().reduce(RichWrite::chain)
}
