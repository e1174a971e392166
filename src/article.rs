//! Article references handed to sessions by the job model

use std::fmt;

use crate::protocol::commands;
use crate::types::MessageId;

/// One article to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub message_id: MessageId,
    /// Only check that the article exists (or fetch its headers)
    pub precheck: bool,
}

impl Article {
    #[must_use]
    pub fn new(message_id: MessageId) -> Self {
        Self {
            message_id,
            precheck: false,
        }
    }

    #[must_use]
    pub fn precheck(message_id: MessageId) -> Self {
        Self {
            message_id,
            precheck: true,
        }
    }
}

impl fmt::Display for Article {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message_id)
    }
}

/// Retrieval command used for an article
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleVerb {
    Stat,
    Head,
    Body,
    Article,
}

impl ArticleVerb {
    /// Pick the command for a request
    ///
    /// A precheck uses STAT, or HEAD on servers without STAT. A download
    /// uses BODY, or ARTICLE on servers without BODY.
    #[must_use]
    pub const fn select(precheck: bool, supports_stat: bool, supports_body: bool) -> Self {
        match (precheck, supports_stat, supports_body) {
            (true, true, _) => Self::Stat,
            (true, false, _) => Self::Head,
            (false, _, true) => Self::Body,
            (false, _, false) => Self::Article,
        }
    }

    /// Wire command for `msgid`, CRLF included
    #[must_use]
    pub fn command(self, msgid: &MessageId) -> String {
        match self {
            Self::Stat => commands::stat_by_msgid(msgid),
            Self::Head => commands::head_by_msgid(msgid),
            Self::Body => commands::body_by_msgid(msgid),
            Self::Article => commands::article_by_msgid(msgid),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stat => "STAT",
            Self::Head => "HEAD",
            Self::Body => "BODY",
            Self::Article => "ARTICLE",
        }
    }
}

impl fmt::Display for ArticleVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
