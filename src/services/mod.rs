pub mod archive;
pub mod gallery_table;
pub mod generation;
pub mod metadata;
pub mod migrator;
pub mod prompt;
pub mod publisher;
pub mod retry;
pub mod storage;
