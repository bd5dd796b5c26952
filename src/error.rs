use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The selector you are trying to scrape for is invalid. Selector: {0}")]
    ParseMissingSelector(String),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),

    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("The source page answered with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("Sqlite Error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Stored timestamp couldn't be parsed: {0}")]
    InvalidTimestamp(String),
    #[error("The store lock was poisoned by a panicking writer")]
    StorePoisoned,

    #[error("Csv Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid value for {name}: {value}")]
    InvalidOption { name: &'static str, value: String },
}
