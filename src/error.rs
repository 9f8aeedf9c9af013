use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Address resolution error: {0}")]
    Resolve(String),

    #[error("Bind error: {0}")]
    Bind(String),

    #[error("Listen error: {0}")]
    Listen(#[source] io::Error),

    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Socket configuration error: {0}")]
    SocketConfig(#[source] io::Error),

    #[error("Network read error: {0}")]
    NetworkRead(#[source] io::Error),

    #[error("Network write error: {0}")]
    NetworkWrite(#[source] io::Error),

    #[error("Accept error: {0}")]
    Accept(#[source] io::Error),

    #[error("Poll error: {0}")]
    Poll(#[source] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
