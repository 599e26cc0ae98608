//! Poll list feeds.
//!
//! The client pages six poll collections. Each one is a collection path plus
//! the filter keys that select it; the pagination engine only ever sees the
//! resulting [`FilterParams`].

use serde::{Deserialize, Serialize};

use crate::feed::FilterParams;

/// Page size the poll API paginates with.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Poll collections that can be scrolled.
///
/// 可滚动的投票列表。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PollFeed {
    /// Polls created by a user.
    UserPolls { user_id: String },
    /// Polls a user voted in.
    UserVotedPolls { user_id: String },
    /// Polls a user shared.
    UserSharedPolls { user_id: String },
    /// Polls a user bookmarked.
    UserBookmarkedPolls { user_id: String },
    /// Polls in one category.
    Category { category: String },
    /// Keyword search.
    Search { keyword: String },
}

impl PollFeed {
    /// Collection path relative to the poll API root.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::UserPolls { .. } => "user/polls",
            Self::UserVotedPolls { .. } => "user/voted-polls",
            Self::UserSharedPolls { .. } => "user/shared-polls",
            Self::UserBookmarkedPolls { .. } => "user/bookmarked-polls",
            Self::Category { .. } => "category/polls",
            Self::Search { .. } => "search",
        }
    }

    pub fn filter(&self) -> FilterParams {
        match self {
            Self::UserPolls { user_id }
            | Self::UserVotedPolls { user_id }
            | Self::UserSharedPolls { user_id }
            | Self::UserBookmarkedPolls { user_id } => FilterParams::new().with("id", user_id),
            Self::Category { category } => FilterParams::new().with("category", category),
            Self::Search { keyword } => FilterParams::new().with("keyword", keyword),
        }
    }
}

/// Poll as listed in a feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollSummary {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub total_votes: u64,
    /// Owner profile and any other fields the API adds.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Actions the signed-in user already took on a poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActions {
    #[serde(default)]
    pub has_voted: bool,
    #[serde(default)]
    pub has_shared: bool,
    #[serde(default)]
    pub has_bookmarked: bool,
}

/// One item of a poll feed page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollListItem {
    pub poll: PollSummary,
    /// Empty for anonymous requests.
    #[serde(default)]
    pub authenticated_user_actions: UserActions,
}
