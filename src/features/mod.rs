pub mod auth;
pub mod map;
pub mod misc_screens;
pub mod storage;
pub mod zones;
