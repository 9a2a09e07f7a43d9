//! Built-in plugins for the formweave engine.
//!
//! Elements:
//! - `text`, `textarea`, `email`, `integer`, `boolean`, `hidden` ([`InputElement`])
//! - `select` ([`SelectElement`])
//! - `slider` ([`SliderElement`])
//! - `file` ([`FileElement`]), storing uploads under the media root
//!
//! Handlers:
//! - `db_store` ([`DbStoreHandler`]), single use, for forms and wizards
//! - `mail` ([`MailHandler`]), for forms and wizards
//! - `http_repost` ([`HttpRepostHandler`]), forms only
//!
//! [`register_builtins`] adds all of them to a [`CatalogBuilder`](formweave_engine::CatalogBuilder).

pub mod catalog;
pub mod elements;
pub mod handlers;

pub use catalog::{Builtins, default_catalog, register_builtins};
pub use elements::{FileElement, InputElement, InputKind, SelectElement, SliderElement};
pub use handlers::{
    DbStoreHandler, EmailMessage, HttpRepostHandler, LogMailer, MailError, MailHandler, Mailer,
    MemoryOutbox,
};
