mod app;
mod commands;
mod design;
mod dispatch;
mod env;
mod output;
mod research;
mod run;
mod runtime;
mod serve;

pub use app::run;
