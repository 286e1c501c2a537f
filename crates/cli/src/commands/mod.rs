pub mod edges;
pub mod graph;
