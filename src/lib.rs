//! PollFeed
//!
//! 无限滚动投票列表客户端：配置、依赖注入与终端前端。

pub mod bootstrap;
pub mod console;
