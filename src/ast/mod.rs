//! Abstract syntax tree for Joos 1W.
//!
//! Nodes are plain structs with public fields and a source span. Statements
//! and expressions additionally carry a `NodeId` assigned at parse time;
//! later passes attach their results to ids in parallel attribute tables
//! instead of rewriting the tree.

mod nodes;
mod printer;

pub use nodes::*;
pub use printer::AstPrinter;
