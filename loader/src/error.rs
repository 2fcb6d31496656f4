use etl::error::EtlError;
use std::error::Error;
use thiserror::Error;

/// Result type for loader operations.
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Error type of the loader binary.
///
/// Wraps [`EtlError`] for load failures and adds the failures that happen around a run.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The load run failed.
    #[error(transparent)]
    Etl(#[from] EtlError),
    /// The configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(#[source] Box<dyn Error + Send + Sync>),
    /// The runtime could not be started.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoaderError {
    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        LoaderError::Config(Box::new(err))
    }

    /// Returns a short category label for this error.
    pub fn category(&self) -> &'static str {
        match self {
            LoaderError::Etl(_) => "load error",
            LoaderError::Config(_) => "configuration error",
            LoaderError::Io(_) => "i/o error",
        }
    }

    /// Returns the one-line failure summary printed at the end of a run.
    pub fn summary_line(&self) -> String {
        match self {
            LoaderError::Etl(err) => {
                format!("load failed: [{:?}] {}", err.kind(), err.description())
            }
            other => format!("load failed: {other}"),
        }
    }

    /// Returns a multi-line report listing the error and its causes.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("category: {}\n", self.category()));
        out.push_str(&format!("error: {self}\n"));

        let mut source = self.source();
        let mut index = 1usize;
        while let Some(err) = source {
            out.push_str(&format!("cause {index}: {err}\n"));
            source = err.source();
            index += 1;
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etl::error::ErrorKind;

    #[test]
    fn report_lists_the_causes() {
        let io = std::io::Error::other("disk unplugged");
        let err = LoaderError::from(EtlError::from(io));

        let report = err.render_report();

        assert!(report.starts_with("category: load error\n"));
        assert!(report.contains("disk unplugged"));
        assert_eq!(
            err.summary_line(),
            "load failed: [IoError] I/O operation failed"
        );
    }

    #[test]
    fn config_errors_keep_their_source() {
        let err = LoaderError::config(std::io::Error::other("missing base.yaml"));

        assert_eq!(err.category(), "configuration error");
        assert_eq!(err.to_string(), "configuration error: missing base.yaml");
        assert!(matches!(
            LoaderError::from(EtlError::from((ErrorKind::ConfigError, "bad"))),
            LoaderError::Etl(_)
        ));
    }
}
