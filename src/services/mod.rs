pub mod agent;
pub mod chat;
pub mod database;
pub mod sql;
