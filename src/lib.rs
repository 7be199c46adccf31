pub mod capture;
pub mod commands;
pub mod config;
pub mod error;
pub mod fs_utils;
pub mod logging;
pub mod login;
pub mod paths;
pub mod poller;
pub mod profiles;
pub mod switch;
pub mod ui;

#[cfg(test)]
pub mod test_utils;
