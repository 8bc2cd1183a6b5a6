//! Template substitution for generated coin sources.
//!
//! Templates are byte streams (usually tar archives of a coin's source tree)
//! containing substitution markers of the form `__._<index>-`. This crate
//! provides:
//! - A resumable streaming [`Filter`] that replaces markers from a [`FilterMap`]
//! - Runners that apply the filter to plain streams or tar archives
//! - The closed registry of field [`ValueType`]s producing substitution values
//! - Resolution of template [`Metadata`] and user values into a filter map
//! - A persisted form of filter maps for replaying a generation

pub mod filter;
pub mod map;
pub mod resolve;
pub mod runner;
pub mod types;

pub use filter::{Filter, FilterError, FilterMap, State, DEFAULT_BUFFER_SIZE, LEAD_MARKER, MAX_MARK_DIGITS, TAIL_MARKER};
pub use map::{decode_filter_map, encode_filter_map, MapCodecError};
pub use resolve::{build_filter_map, generate, Input, Metadata, ResolveError, Substitution};
pub use runner::{Compression, RunError, Runner};
pub use types::{ProduceError, ValueType};
