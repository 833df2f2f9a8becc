//! Data models for series-fetcher

pub mod rows;
pub mod series;

pub use rows::{AllAsinRow, FirstAsinRow};
pub use series::{Book, BookMetadata, LibraryRef, Media, Series, SeriesPage};
