//! Sessions tie the passes together.
//!
//! A [`Session`] accumulates commands, then resolves them in five passes:
//! movement, range corners, forward-reference substitution, structural
//! expansion and conflict resolution. The resulting row-major pairs are
//! executed against a [`Binding`]. Nothing reaches the surface unless every
//! resolution pass succeeds.

use celldsl_core::{presets, Coord, Style};

use crate::builder::{expand_tokens, Token};
use crate::command::Command;
use crate::conflicts::resolve_conflicts;
use crate::error::{Error, ErrorContext, Result};
use crate::execute::{execute, ExecOptions, PageBreaks};
use crate::expand::expand_structures;
use crate::movement::{resolve_movement, Bookmarks, Placed};
use crate::recording::RecordingSurface;
use crate::references::{resolve_references, substitute_forward_refs, ForwardRefs};
use crate::stats::SessionStats;
use crate::surface::{Binding, OutputSurface};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Where the cursor starts.
    pub start: Coord,
    /// Allow different content commands to target the same cell.
    pub overwrites_ok: bool,
    /// Base style every content style is layered on.
    pub default_style: Style,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            start: Coord::ORIGIN,
            overwrites_ok: false,
            default_style: presets::default_font(),
        }
    }
}

/// Fully resolved session, ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub pairs: Vec<(Coord, Placed)>,
    pub bookmarks: Bookmarks,
    pub forward_refs: ForwardRefs,
    pub warnings: Vec<String>,
}

/// Run every resolution pass over `commands`.
pub fn resolve(commands: &[Command], start: Coord) -> Result<Resolution> {
    let traversal = resolve_movement(commands, start)?;
    let bookmarks = traversal.bookmarks;
    // Every later pass runs with the bookmark table known.
    let located = |e: Error| e.with_bookmarks(&bookmarks);
    let mut refs = resolve_references(traversal.cells, &bookmarks).map_err(located)?;
    substitute_forward_refs(&mut refs.cells, &refs.forward_refs).map_err(located)?;
    let expansion = expand_structures(refs.cells).map_err(located)?;
    let pairs = resolve_conflicts(expansion.cells).map_err(located)?;
    Ok(Resolution {
        pairs,
        bookmarks,
        forward_refs: refs.forward_refs,
        warnings: expansion.warnings,
    })
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    options: SessionOptions,
    commands: Vec<Command>,
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            commands: Vec::new(),
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Expand short-form tokens and append them. Nothing is appended on error.
    pub fn commit(&mut self, tokens: impl Into<Token>) -> Result<&mut Self> {
        let expanded = expand_tokens(tokens).map_err(|e| {
            let context = ErrorContext {
                index: Some(self.commands.len()),
                ..ErrorContext::default()
            };
            Error::new(e, context)
        })?;
        self.commands.extend(expanded);
        Ok(self)
    }

    /// Append one canonical command.
    pub fn push(&mut self, command: impl Into<Command>) -> &mut Self {
        self.commands.push(command.into());
        self
    }

    pub fn resolve(&self) -> Result<Resolution> {
        resolve(&self.commands, self.options.start)
    }

    /// Resolve and execute against `binding`.
    pub fn execute<S: OutputSurface>(
        &self,
        binding: &mut Binding<S>,
        breaks: &mut PageBreaks,
    ) -> Result<SessionStats> {
        let resolution = self.resolve()?;
        let options = ExecOptions {
            default_style: &self.options.default_style,
            overwrites_ok: self.options.overwrites_ok,
            bookmarks: &resolution.bookmarks,
        };
        let mut warnings = resolution.warnings;
        warnings.extend(execute(&resolution.pairs, binding, breaks, &options)?);

        tracing::debug!(
            target: "celldsl.session",
            sheet = binding.surface().sheet_name(),
            commands = self.commands.len(),
            pairs = resolution.pairs.len(),
            warnings = warnings.len(),
            "session executed"
        );

        Ok(SessionStats {
            start: self.options.start,
            pairs: resolution
                .pairs
                .into_iter()
                .map(|(at, placed)| (at, placed.command))
                .collect(),
            bookmarks: resolution.bookmarks,
            forward_refs: resolution.forward_refs,
            warnings,
        })
    }

    /// Execute against a throwaway in-memory surface, for statistics only.
    pub fn dry_run(&self) -> Result<SessionStats> {
        let mut binding = Binding::new(RecordingSurface::new("DryRun"));
        self.execute(&mut binding, &mut PageBreaks::new())
    }
}
