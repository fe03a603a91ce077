pub mod applicator;
pub mod auth;
pub mod browser;
pub mod cli;
pub mod clock;
pub mod config;
pub mod discovery;
pub mod form;
pub mod model;
pub mod observer;
pub mod posted;
pub mod report;
pub mod resume;
pub mod runner;
pub mod util;
