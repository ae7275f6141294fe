pub mod aspect;
pub mod assets;
pub mod staging;
pub mod uploader;
pub mod video_store;
