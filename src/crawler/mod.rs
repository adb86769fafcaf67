//! Crawler module for keyword crawls
//!
//! This module contains the core crawling logic, including:
//! - Cursor pagination over search results and comment trees
//! - Request throttling between pages
//! - Phase scheduling of per-note work
//! - Platform spiders tying login, client and scheduler together

mod pagination;
mod report;
mod scheduler;
mod spider;
mod throttle;

pub use pagination::{CommentSource, CursorChain, PaginationEngine, SearchSource};
pub use report::CrawlReport;
pub use scheduler::{CrawlScheduler, NoteApi, ReplyPlan};
pub use spider::{Platform, PlatformSpider, Spider, XhsSpider};
pub use throttle::Throttle;
