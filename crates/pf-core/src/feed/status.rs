use serde::Serialize;

/// Icon kind accompanying a terminal `Ready` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusIcon {
    /// Collection has no items.
    Empty,
    /// Last page has been reached.
    End,
}

/// Combined loading / empty / end-of-list state of a feed.
///
/// Derived from the settled page outcomes, never stored independently of them.
///
/// 列表的综合状态（加载中 / 空 / 到底 / 出错）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedStatus {
    Loading,
    Ready {
        message: Option<String>,
        icon: Option<StatusIcon>,
    },
    Error {
        message: String,
    },
}

impl FeedStatus {
    /// Mid-list state: nothing pending, nothing to announce.
    pub fn ready() -> Self {
        Self::Ready {
            message: None,
            icon: None,
        }
    }

    pub fn empty(message: impl Into<String>) -> Self {
        Self::Ready {
            message: Some(message.into()),
            icon: Some(StatusIcon::Empty),
        }
    }

    pub fn end(message: impl Into<String>) -> Self {
        Self::Ready {
            message: Some(message.into()),
            icon: Some(StatusIcon::End),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// True when scrolling further cannot change the status on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Ready { icon: Some(_), .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Loading => None,
            Self::Ready { message, .. } => message.as_deref(),
            Self::Error { message } => Some(message),
        }
    }

    pub fn icon(&self) -> Option<StatusIcon> {
        match self {
            Self::Ready { icon, .. } => *icon,
            _ => None,
        }
    }
}
