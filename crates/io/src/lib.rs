// Output surfaces backed by real document formats.

pub mod xlsx;
pub mod xlsx_chart;
pub mod xlsx_styles;

pub use xlsx::XlsxSurface;
