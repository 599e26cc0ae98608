use pf_core::feed::{FetchError, PageNumber, PageResult, Paginator};
use serde::Deserialize;

/// Paginator as sent by the poll API.
#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct PaginatorDto {
    pub page: PageNumber,
    pub total_items: u64,
    pub total_pages: u32,
    pub has_previous: bool,
    pub has_next: bool,
}

impl From<PaginatorDto> for Paginator {
    fn from(dto: PaginatorDto) -> Self {
        Self {
            page: dto.page,
            total_items: dto.total_items,
            total_pages: dto.total_pages,
            has_previous: dto.has_previous,
            has_next: dto.has_next,
        }
    }
}

/// `{items, paginator, message?}` page body.
///
/// The API answers an empty collection with a bare `{message}`; that body
/// decodes to an empty first page.
#[derive(Debug, Deserialize)]
pub(crate) struct PageResponseDto<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub paginator: Option<PaginatorDto>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> PageResponseDto<T> {
    pub fn into_page_result(self, page_size: u32) -> Result<PageResult<T>, FetchError> {
        let paginator = match self.paginator {
            Some(dto) => Paginator::from(dto),
            None if self.items.is_empty() => Paginator::for_page(1, 0, page_size),
            None => return Err(FetchError::Decode("page body without paginator".into())),
        };
        paginator.validate()?;

        Ok(PageResult {
            items: self.items,
            paginator,
            message: self.message,
        })
    }
}

/// Error body of a non-2xx response.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBodyDto {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl ErrorBodyDto {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error).or(self.detail)
    }
}
