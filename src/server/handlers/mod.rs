// API 处理器模块

pub mod file;

pub use file::{list_files, upload_file};
