// Library for tests to access modules

pub mod collector;
pub mod config;
pub mod history;
pub mod models;
pub mod routes;
pub mod worker;
