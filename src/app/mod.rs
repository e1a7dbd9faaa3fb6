pub mod dto;
pub mod pipe;
pub mod server;
