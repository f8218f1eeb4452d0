//! HTTP mapping of [`crate::Error`].

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use minijinja::HtmlEscape;
use tracing::error;

use crate::error::Error;

/// A handler failure rendered as an HTML error page.
#[derive(Debug)]
pub struct WebError {
    status: StatusCode,
    message: String,
}

impl WebError {
    /// Status code sent with the page.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Human-readable failure description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<Error> for WebError {
    fn from(err: Error) -> Self {
        let status = if err.is_invalid_table_name() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        error!("Request failed ({}): {}", self.status, self.message);
        let body = format!(
            "<!DOCTYPE html>\n<html lang=\"fr\">\n<head><meta charset=\"utf-8\"><title>Erreur {code}</title></head>\n\
             <body>\n<h1>Erreur {code}</h1>\n<p>{message}</p>\n<p><a href=\"/\">Retour à l'accueil</a></p>\n</body>\n</html>\n",
            code = self.status.as_u16(),
            message = HtmlEscape(&self.message),
        );
        (self.status, Html(body)).into_response()
    }
}
