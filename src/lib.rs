pub mod config;
pub mod navigation;
pub mod session;
pub mod synchronizer;
pub mod transaction;
pub mod utils;
pub mod wallet;
