pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod output;
pub mod patcher;
pub mod progress;
pub mod seed;
pub mod storage;
pub mod uploader;
