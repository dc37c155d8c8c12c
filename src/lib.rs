//! Streaming path-collapse engine for a positional de Bruijn assembly graph.
//!
//! Path-nodes arrive in non-decreasing `first_start` order via
//! [`Simplifier::push`], get provisionally buffered, and become collapse
//! candidates once their neighbourhood is fully settled (see
//! [`simplifier`] for the scheduling). Similar paths — sequencing-error
//! bubbles and leaf branches — are folded together by [`collapse`], which
//! performs the underlying node surgery through [`node`] and [`arena`].
//! Settled nodes drain out through [`Simplifier::try_emit`] in the same
//! order they arrived.

pub mod arena;
pub mod buffers;
pub mod collapse;
pub mod config;
pub mod cursor;
pub mod error;
pub mod kmer;
pub mod node;
pub mod simplifier;
pub mod subnode;

pub use arena::{Arena, NodeId};
pub use buffers::{Buffers, Location, OrderedBuffer};
pub use config::SimplifierConfig;
pub use cursor::PathTreeCursor;
pub use error::{Result, SimplifierError};
pub use node::PathNode;
pub use simplifier::{CollapseSummary, Simplifier};
pub use subnode::PathSubnode;
