//! The output surface the execution engine writes to.
//!
//! A surface is a grid-addressed document. Styles are registered once and
//! referred to through an opaque handle; [`Binding`] pairs a surface with the
//! cache that guarantees one registration per distinct style.

use std::collections::HashMap;

use celldsl_core::{Coord, Style};

use crate::chart::ChartDef;
use crate::command::{CellData, Comment, ConditionalRule, DataKind, Image};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SurfaceError {
    #[error("content length exceeded: {0}")]
    ContentLengthExceeded(String),

    #[error("reference count exceeded: {0}")]
    ReferenceCountExceeded(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

pub type SurfaceResult<T> = std::result::Result<T, SurfaceError>;

pub trait OutputSurface {
    /// Opaque reference to a registered style.
    type Handle: Clone;

    /// Name of the sheet being written, used to qualify range formulas.
    fn sheet_name(&self) -> &str;

    fn register_style(&mut self, style: &Style) -> SurfaceResult<Self::Handle>;

    fn write(
        &mut self,
        at: Coord,
        data: &CellData,
        kind: Option<DataKind>,
        style: &Self::Handle,
    ) -> SurfaceResult<()>;

    fn merge_write(
        &mut self,
        first: Coord,
        last: Coord,
        data: &CellData,
        kind: Option<DataKind>,
        style: &Self::Handle,
    ) -> SurfaceResult<()>;

    /// Write runs of styled text into one cell. `runs` has at least two entries.
    fn write_rich(
        &mut self,
        at: Coord,
        runs: &[(Self::Handle, String)],
        cell_style: Option<&Self::Handle>,
    ) -> SurfaceResult<()>;

    fn define_name(&mut self, name: &str, first: Coord, last: Coord) -> SurfaceResult<()>;

    fn set_print_area(&mut self, first: Coord, last: Coord) -> SurfaceResult<()>;

    fn add_conditional_format(
        &mut self,
        first: Coord,
        last: Coord,
        rule: &ConditionalRule,
        style: Option<&Self::Handle>,
    ) -> SurfaceResult<()>;

    fn insert_image(&mut self, at: Coord, image: &Image) -> SurfaceResult<()>;

    /// Insert a chart whose forward references are already resolved.
    fn insert_chart(&mut self, at: Coord, chart: &ChartDef) -> SurfaceResult<()>;

    fn add_comment(&mut self, at: Coord, comment: &Comment) -> SurfaceResult<()>;

    fn set_row_size(&mut self, row: u32, size: f64) -> SurfaceResult<()>;

    fn set_col_size(&mut self, col: u16, size: f64) -> SurfaceResult<()>;

    fn set_page_breaks(&mut self, rows: &[u32], cols: &[u16]) -> SurfaceResult<()>;
}

/// Deduplicating style registration.
#[derive(Debug)]
pub struct StyleCache<H> {
    handles: HashMap<Style, H>,
}

impl<H: Clone> StyleCache<H> {
    pub fn new() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }

    /// Handle for `style`, registering it with `surface` on first sight.
    pub fn resolve<S>(&mut self, surface: &mut S, style: &Style) -> SurfaceResult<H>
    where
        S: OutputSurface<Handle = H> + ?Sized,
    {
        if let Some(handle) = self.handles.get(style) {
            return Ok(handle.clone());
        }
        let handle = surface.register_style(style)?;
        self.handles.insert(style.clone(), handle.clone());
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl<H: Clone> Default for StyleCache<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// A surface together with its style cache.
///
/// Sessions executed against the same binding share registrations.
pub struct Binding<S: OutputSurface> {
    surface: S,
    styles: StyleCache<S::Handle>,
}

impl<S: OutputSurface> Binding<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            styles: StyleCache::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn styles(&self) -> &StyleCache<S::Handle> {
        &self.styles
    }

    pub fn register(&mut self, style: &Style) -> SurfaceResult<S::Handle> {
        self.styles.resolve(&mut self.surface, style)
    }
}
