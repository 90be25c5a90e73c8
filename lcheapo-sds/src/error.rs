pub type SdsResult<T> = Result<T, SdsError>;

#[derive(Debug)]
pub enum SdsError {
    Io(std::io::Error),
    Lcheapo(lcheapo_types::error::LcheapoError),
    Config(String),
}

impl std::fmt::Display for SdsError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            SdsError::Io(e) => write!(f, "I/O error: {e}"),
            SdsError::Lcheapo(e) => write!(f, "LCHEAPO error: {e}"),
            SdsError::Config(s) => write!(f, "Config error: {s}"),
        }
    }
}

impl std::error::Error for SdsError {}

impl From<std::io::Error> for SdsError {
    fn from(e: std::io::Error) -> Self {
        SdsError::Io(e)
    }
}

impl From<lcheapo_types::error::LcheapoError> for SdsError {
    fn from(e: lcheapo_types::error::LcheapoError) -> Self {
        SdsError::Lcheapo(e)
    }
}
