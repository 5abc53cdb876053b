//! Rendering of pages and redirects.
//!
//! A rendered page is a JSON document naming the view, the flash messages
//! to show, and the view's context. Pages drain the flash cookie; redirects
//! write it.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Serialize;

use crate::flash::{Flash, FlashMessage, Level};

/// A page ready to be rendered.
#[derive(Debug)]
pub struct Page<T> {
    view: &'static str,
    status: StatusCode,
    messages: Vec<FlashMessage>,
    context: T,
}

#[derive(Serialize)]
struct PageBody<'a, T> {
    view: &'static str,
    messages: Vec<FlashMessage>,
    #[serde(flatten)]
    context: &'a T,
}

impl<T: Serialize> Page<T> {
    pub fn new(view: &'static str, context: T) -> Self {
        Self {
            view,
            status: StatusCode::OK,
            messages: Vec::new(),
            context,
        }
    }

    /// Re-render after a failed form submission.
    pub fn invalid(view: &'static str, context: T, message: &str) -> Self {
        Self::new(view, context)
            .with_status(StatusCode::UNPROCESSABLE_ENTITY)
            .with_message(Level::Error, message)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Show a message on this page without going through the cookie.
    pub fn with_message(mut self, level: Level, message: impl Into<String>) -> Self {
        self.messages.push(FlashMessage::new(level, message));
        self
    }

    /// Render, prepending any messages queued by a previous redirect.
    pub fn render(self, flash: Flash) -> Response {
        let (flash, mut messages) = flash.drain();
        messages.extend(self.messages);

        let body = PageBody {
            view: self.view,
            messages,
            context: &self.context,
        };

        (self.status, flash, Json(body)).into_response()
    }
}

/// Redirect with 303 See Other, writing any queued flash messages.
pub fn redirect(flash: Flash, to: &str) -> Response {
    (flash, Redirect::to(to)).into_response()
}

/// URL builders for the project routes.
pub mod urls {
    pub fn gallery() -> String {
        "/projects".to_string()
    }

    pub fn create() -> String {
        "/projects/create".to_string()
    }

    pub fn show(slug: &str) -> String {
        format!("/projects/{}", slug)
    }

    pub fn edit(slug: &str) -> String {
        format!("/projects/{}/edit", slug)
    }

    pub fn edit_image(slug: &str) -> String {
        format!("/projects/{}/edit/image", slug)
    }

    pub fn edit_links(slug: &str) -> String {
        format!("/projects/{}/edit/links", slug)
    }

    pub fn delete_link(slug: &str, link_id: &str) -> String {
        format!("/projects/{}/edit/links/{}/delete", slug, link_id)
    }

    pub fn edit_followers(slug: &str) -> String {
        format!("/projects/{}/edit/followers", slug)
    }

    pub fn edit_status(slug: &str) -> String {
        format!("/projects/{}/edit/status", slug)
    }

    pub fn contact(slug: &str) -> String {
        format!("/projects/{}/contact", slug)
    }
}
