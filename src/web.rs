use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
}

/// One-shot user message attached to a redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }
}

/// 303 to `location` with the flash as body.
#[derive(Debug)]
pub struct FlashRedirect {
    pub location: String,
    pub flash: Flash,
}

impl FlashRedirect {
    pub fn new(location: impl Into<String>, flash: Flash) -> Self {
        Self {
            location: location.into(),
            flash,
        }
    }
}

impl IntoResponse for FlashRedirect {
    fn into_response(self) -> Response {
        (
            StatusCode::SEE_OTHER,
            [(header::LOCATION, self.location)],
            Json(self.flash),
        )
            .into_response()
    }
}

/// Body of create/update responses.
#[derive(Debug, Serialize)]
pub struct Saved<T> {
    pub message: &'static str,
    pub record: T,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

impl Pagination {
    pub fn clamped(&self) -> (i64, i64) {
        (self.limit.clamp(1, 100), self.offset.max(0))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

impl SearchQuery {
    pub fn term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// `ILIKE` pattern for the search term, if there is one.
    pub fn pattern(&self) -> Option<String> {
        self.term().map(like_pattern)
    }
}

/// Substring `ILIKE` pattern with wildcards in `term` escaped.
pub fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

pub fn generate_slug() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

const DELETE_FAILED: &str = "The record could not be removed, please try again.";

/// Messages shown after a delete attempt.
pub struct DeleteMessages {
    pub deleted: &'static str,
    pub blocked: &'static str,
}

/// Turn a delete result into a redirect to the list route.
///
/// Failures never surface as 500: a row still referenced elsewhere, or any
/// other storage error, comes back as an error flash and the row stays.
pub fn delete_outcome(
    result: Result<bool, sqlx::Error>,
    location: &str,
    messages: DeleteMessages,
) -> Result<FlashRedirect, (StatusCode, String)> {
    match result {
        Ok(true) => Ok(FlashRedirect::new(location, Flash::success(messages.deleted))),
        Ok(false) => Err((StatusCode::NOT_FOUND, "Record not found".into())),
        Err(e) if is_foreign_key_violation(&e) => {
            warn!(error = %e, "delete blocked by dependent records");
            Ok(FlashRedirect::new(location, Flash::error(messages.blocked)))
        }
        Err(e) => {
            error!(error = %e, "delete failed");
            Ok(FlashRedirect::new(location, Flash::error(DELETE_FAILED)))
        }
    }
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|d| d.code())
        .map_or(false, |code| code == "23503")
}

pub fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rice"), "%rice%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b\\c"), "%a\\_b\\\\c%");
    }

    #[test]
    fn blank_search_term_is_none() {
        assert_eq!(SearchQuery { q: None }.term(), None);
        assert_eq!(SearchQuery { q: Some("   ".into()) }.term(), None);
        assert_eq!(SearchQuery { q: Some(" Insulin ".into()) }.term(), Some("Insulin"));
        assert_eq!(
            SearchQuery { q: Some("arroz".into()) }.pattern().as_deref(),
            Some("%arroz%")
        );
    }

    #[test]
    fn pagination_is_clamped() {
        let p = Pagination { limit: 1000, offset: -5 };
        assert_eq!(p.clamped(), (100, 0));
        let p = Pagination { limit: 0, offset: 10 };
        assert_eq!(p.clamped(), (1, 10));
    }

    #[test]
    fn slugs_are_random_alphanumeric() {
        let a = generate_slug();
        let b = generate_slug();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn flash_redirect_is_see_other_with_location() {
        let res = FlashRedirect::new("/api/v1/meals", Flash::error("blocked")).into_response();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[header::LOCATION], "/api/v1/meals");
    }

    const MSGS: DeleteMessages = DeleteMessages {
        deleted: "gone",
        blocked: "in use",
    };

    #[test]
    fn delete_outcome_success_redirects_with_success_flash() {
        let r = delete_outcome(Ok(true), "/api/v1/activities", MSGS).unwrap();
        assert_eq!(r.location, "/api/v1/activities");
        assert_eq!(r.flash, Flash::success("gone"));
    }

    #[test]
    fn delete_outcome_missing_row_is_not_found() {
        let err = delete_outcome(Ok(false), "/x", MSGS).unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn delete_outcome_failure_never_errors() {
        let r = delete_outcome(Err(sqlx::Error::PoolTimedOut), "/x", MSGS).unwrap();
        assert_eq!(r.flash, Flash::error(DELETE_FAILED));
        assert!(!is_foreign_key_violation(&sqlx::Error::RowNotFound));
    }

    #[derive(Debug)]
    struct ForeignKeyError;

    impl std::fmt::Display for ForeignKeyError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("update or delete violates foreign key constraint")
        }
    }

    impl std::error::Error for ForeignKeyError {}

    impl sqlx::error::DatabaseError for ForeignKeyError {
        fn message(&self) -> &str {
            "update or delete violates foreign key constraint"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some("23503".into())
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::ForeignKeyViolation
        }
    }

    #[test]
    fn delete_outcome_referenced_row_is_blocked() {
        let err = sqlx::Error::Database(Box::new(ForeignKeyError));
        assert!(is_foreign_key_violation(&err));

        let r = delete_outcome(Err(err), "/api/v1/clinical-records", MSGS).unwrap();
        assert_eq!(r.location, "/api/v1/clinical-records");
        assert_eq!(r.flash, Flash::error("in use"));

        let res = r.into_response();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[header::LOCATION], "/api/v1/clinical-records");
    }

    #[test]
    fn flash_serializes_level_lowercase() {
        let json = serde_json::to_value(Flash::success("done")).unwrap();
        assert_eq!(json["level"], "success");
        assert_eq!(json["message"], "done");
    }
}
