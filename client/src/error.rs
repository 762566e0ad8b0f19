use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Protocol(#[from] shared::ProtocolError),
    #[error("lost connection to the server")]
    ConnectionLost,
    #[error("scene has no object named '{0}'")]
    MissingSceneObject(String),
}
