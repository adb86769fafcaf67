//! Platform API access
//!
//! [`ApiClient`] signs and sends requests and classifies the responses;
//! [`XhsClient`] maps the individual endpoints onto typed records.

mod api;
mod field;
mod signing;
mod xhs;

pub use api::{
    build_http_client, build_query_path, classify_response, serialize_body, ApiClient,
    ApiEnvelope, AUTH_EXPIRED_CODE, IP_BLOCKED_CODE, NOTE_ABNORMAL_CODE,
};
pub use field::{new_search_id, new_trace_id, random_user_agent, SearchNoteType, SearchSortType};
pub use signing::{encode_common_header, BrowserSigningOracle, SignedHeaders, SigningOracle};
pub use xhs::{
    XhsClient, COMMENT_PAGE_PATH, COMMENT_POST_PATH, NOTE_FEED_PATH, SEARCH_NOTES_PATH,
    SUB_COMMENT_PAGE_PATH,
};
