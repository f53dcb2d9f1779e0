pub mod app;
pub mod session;
pub mod update;
