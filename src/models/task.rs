use std::fmt;

/// Operation the scheduler runs for a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Detail,
    Reply,
    Comments,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Detail => "detail",
            Self::Reply => "reply",
            Self::Comments => "comments",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of scheduled work; it runs once and is never retried
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrawlTask {
    pub note_id: String,
    pub kind: OperationKind,
}

impl CrawlTask {
    pub fn new(note_id: impl Into<String>, kind: OperationKind) -> Self {
        Self {
            note_id: note_id.into(),
            kind,
        }
    }
}
