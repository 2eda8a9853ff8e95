pub mod upstream;
pub mod ws;
