pub mod indexer;
pub mod logging;
pub mod metadata;
pub mod node_session;
pub mod scale_decoder;
