//! Interaction core of the image gallery: records and collections, the
//! viewport transform, gesture interpretation, the viewer session, and
//! the gallery and carousel state machines. Nothing here depends on a
//! windowing system; the `ivgal` binary supplies the host.

pub mod carousel;
pub mod collection;
pub mod download;
pub mod error;
pub mod gallery;
pub mod gesture;
pub mod input;
pub mod overlay;
pub mod session;
pub mod settings;
pub mod viewport;
