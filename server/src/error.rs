use crate::connection::ConnectionId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Protocol(#[from] shared::ProtocolError),
    #[error("writer for connection {0} has shut down")]
    WriterClosed(ConnectionId),
}
