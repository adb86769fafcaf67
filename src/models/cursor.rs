use std::fmt;

/// The chain a cursor belongs to: a note's top-level comments, or the replies
/// under one top-level comment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CursorScope {
    note_id: String,
    root_comment_id: Option<String>,
}

impl CursorScope {
    /// Scope of a note's top-level comment pages
    pub fn comments(note_id: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            root_comment_id: None,
        }
    }

    /// Scope of the reply pages under one top-level comment
    pub fn replies(note_id: impl Into<String>, root_comment_id: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            root_comment_id: Some(root_comment_id.into()),
        }
    }

    pub fn note_id(&self) -> &str {
        &self.note_id
    }

    pub fn root_comment_id(&self) -> Option<&str> {
        self.root_comment_id.as_deref()
    }

    pub fn is_replies(&self) -> bool {
        self.root_comment_id.is_some()
    }
}

impl fmt::Display for CursorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root_comment_id {
            Some(root) => write!(f, "{}/{}", self.note_id, root),
            None => write!(f, "{}", self.note_id),
        }
    }
}

/// Opaque pagination token bound to the scope it was issued for
///
/// A cursor can only be created at the start of a scope or derived from a
/// cursor of the same scope, so tokens never cross between chains.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor {
    scope: CursorScope,
    token: String,
}

impl Cursor {
    /// First cursor of a chain (empty token)
    pub fn start(scope: CursorScope) -> Self {
        Self {
            scope,
            token: String::new(),
        }
    }

    /// Cursor for the next page of the same chain
    pub fn follow(&self, token: impl Into<String>) -> Self {
        Self {
            scope: self.scope.clone(),
            token: token.into(),
        }
    }

    pub fn scope(&self) -> &CursorScope {
        &self.scope
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}
