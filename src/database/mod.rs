// Database module
// Embedding storage and similarity search, delegated to an embedded LanceDB

pub mod lancedb;
