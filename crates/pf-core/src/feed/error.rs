use thiserror::Error;

use super::model::PageNumber;

/// Failure of one page fetch.
///
/// 单页请求失败。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with an error status.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The response could not be turned into a page.
    #[error("invalid page response: {0}")]
    Decode(String),
}

impl FetchError {
    /// Message shown in place of the loading indicator.
    pub fn user_message(&self) -> String {
        match self {
            Self::Server { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginatorError {
    #[error("page number must start at 1")]
    PageZero,

    #[error("total_pages must be at least 1")]
    NoPages,

    #[error("page {page} is beyond total_pages {total_pages}")]
    PageOutOfRange {
        page: PageNumber,
        total_pages: u32,
    },

    #[error("empty collection reports {0} pages")]
    EmptyCollectionSpansPages(u32),

    #[error("has_previous does not match page {page}")]
    PreviousFlagMismatch { page: PageNumber },

    #[error("has_next does not match page {page} of {total_pages}")]
    NextFlagMismatch {
        page: PageNumber,
        total_pages: u32,
    },
}

impl From<PaginatorError> for FetchError {
    fn from(err: PaginatorError) -> Self {
        Self::Decode(err.to_string())
    }
}
