//! Step graph: registration, validation and the compiled form.
//!
//! A [`GraphBuilder`] collects steps and edges and validates them in
//! [`GraphBuilder::compile`]; nothing executes until a graph compiles.

mod builder;
mod compiled;
mod edge;
mod router;

pub use builder::GraphBuilder;
pub use compiled::{ConditionalExit, Exit, Graph, Route};
pub use edge::{ConditionalEdge, Edge};
pub use router::{FnRouter, ModerationRouter, Router};
