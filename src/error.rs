pub type SimvizResult<T> = Result<T, SimvizError>;

#[derive(thiserror::Error, Debug)]
pub enum SimvizError {
    #[error("payload error: {0}")]
    Payload(String),

    #[error("document error: {0}")]
    Document(String),

    #[error("evaluation error: {0}")]
    Evaluation(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SimvizError {
    pub fn payload(msg: impl Into<String>) -> Self {
        Self::Payload(msg.into())
    }

    pub fn document(msg: impl Into<String>) -> Self {
        Self::Document(msg.into())
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            SimvizError::payload("x")
                .to_string()
                .contains("payload error:")
        );
        assert!(
            SimvizError::document("x")
                .to_string()
                .contains("document error:")
        );
        assert!(
            SimvizError::evaluation("x")
                .to_string()
                .contains("evaluation error:")
        );
        assert!(SimvizError::serde("x").to_string().contains("serialization error:"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = SimvizError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
