pub mod config;
pub mod delivery;
pub mod lists;
pub mod shared;
