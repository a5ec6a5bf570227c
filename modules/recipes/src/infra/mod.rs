pub mod loaders;
pub mod media;
pub mod storage;
