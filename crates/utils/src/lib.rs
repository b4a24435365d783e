//! Presentation helpers: number formatting, data transforms, client-side
//! table sort/filter and CLI output rendering.

pub mod format;
pub mod output;
pub mod table;
pub mod transform;
