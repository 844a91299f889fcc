//! Streaming byte-source primitives
//!
//! Building blocks for moving large or unbounded payloads in bounded pieces:
//! - [`BufferedReader`] / [`AsyncBufferedReader`]: look-ahead with `peek`
//! - [`LimitedReader`] / [`AsyncLimitedReader`]: hard byte windows
//! - [`PartSplitter`] / [`AsyncPartSplitter`]: sequential bounded parts
//!
//! Every primitive comes as a blocking variant over [`std::io::Read`] and a
//! cooperative variant over [`tokio::io::AsyncRead`]. The cursor and window
//! arithmetic lives in shared types so both variants behave identically.
//! None of these types is meant for concurrent use by more than one caller.

mod buffered;
mod limited;
mod parts;
mod peek;

pub use buffered::{AsyncBufferedReader, BufferedReader};
pub use limited::{AsyncLimitedReader, LimitedReader};
pub use parts::{AsyncPart, AsyncPartSplitter, Part, PartSplitter};

/// Default size of a single pull against the underlying source.
pub const DEFAULT_PULL_SIZE: usize = 64 * 1024;
