pub mod app;
pub mod render;

pub use app::{App, AskOptions, Target};
