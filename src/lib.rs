pub mod aggregate;
pub mod compustat;
pub mod dictionary;
pub mod export;
pub mod ingest;
pub mod matching;
pub mod models;
pub mod normalize;
pub mod tiering;
pub mod utils;
