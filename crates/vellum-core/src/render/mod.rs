//! Interchange document rendering.

mod document;
mod relation;

pub use document::DocumentNode;
pub use relation::{ChangesetOwnerCache, DisplayName, DisplayNameCache, RelationRenderer};

/// Version of the interchange format written by [`render_document`].
pub const API_VERSION: &str = "0.6";

/// Wrap rendered elements in an `osm` root element.
pub fn render_document(nodes: impl IntoIterator<Item = DocumentNode>) -> DocumentNode {
    let mut root = DocumentNode::new("osm")
        .attr("version", API_VERSION)
        .attr("generator", concat!("vellum ", env!("CARGO_PKG_VERSION")));
    for node in nodes {
        root.push(node);
    }
    root
}
