use std::io::Write;
use std::sync::{Mutex, PoisonError};

use anyhow::Context;
use pf_core::feed::{FeedStatus, PageNumber, StatusIcon};
use pf_core::poll::PollListItem;
use pf_core::ports::ItemRendererPort;

/// Line-oriented renderer for poll feeds.
///
/// 终端投票列表渲染器。
pub struct ConsoleRenderer {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleRenderer {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    fn write_line(&self, line: &str) -> anyhow::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{line}").context("write to console failed")?;
        out.flush().context("flush console failed")
    }
}

fn format_item(page: PageNumber, index: usize, item: &PollListItem) -> String {
    let poll = &item.poll;
    let mut line = format!("[p{page} #{:02}] {}", index + 1, poll.title);
    match &poll.category {
        Some(category) => line.push_str(&format!("  ({category}, {} votes)", poll.total_votes)),
        None => line.push_str(&format!("  ({} votes)", poll.total_votes)),
    }

    let actions = &item.authenticated_user_actions;
    let marks: Vec<&str> = [
        (actions.has_voted, "voted"),
        (actions.has_shared, "shared"),
        (actions.has_bookmarked, "bookmarked"),
    ]
    .into_iter()
    .filter_map(|(taken, mark)| taken.then_some(mark))
    .collect();
    if !marks.is_empty() {
        line.push_str(&format!(" [{}]", marks.join(", ")));
    }
    line
}

fn format_status(status: &FeedStatus) -> Option<String> {
    match status {
        FeedStatus::Loading => Some("   ... loading".to_string()),
        FeedStatus::Ready { message, icon } => {
            let symbol = match icon {
                Some(StatusIcon::Empty) => "(empty)",
                Some(StatusIcon::End) => "(end)",
                None => return message.as_ref().map(|m| format!("   {m}")),
            };
            Some(format!(
                "   {symbol} {}",
                message.as_deref().unwrap_or_default()
            ))
        }
        FeedStatus::Error { message } => Some(format!("   (error) {message}")),
    }
}

impl ItemRendererPort<PollListItem> for ConsoleRenderer {
    fn render_item(
        &self,
        page: PageNumber,
        index: usize,
        item: &PollListItem,
    ) -> anyhow::Result<()> {
        self.write_line(&format_item(page, index, item))
    }

    fn render_status(&self, status: &FeedStatus) -> anyhow::Result<()> {
        match format_status(status) {
            Some(line) => self.write_line(&line),
            None => Ok(()),
        }
    }

    fn clear(&self) -> anyhow::Result<()> {
        self.write_line("---- feed reset ----")
    }
}
