// src/consent/cookies.rs
//! Cookies: [`CookieJar`], [`CookieStore`], their backends and the
//! [`DocumentCookies`] adapter used by the consent code.

mod cookies;
mod cookie_jar;
mod document;
mod store;
mod persistent_cookie_jar;

pub use cookies::Cookie;
pub use cookies::CookieJarHandle;
pub use cookies::CookieStoreHandle;
pub use cookies::{format_http_date, parse_http_date};

pub use cookie_jar::CookieJar;
pub use cookie_jar::DefaultCookieJar;
pub use persistent_cookie_jar::PersistentCookieJar;

pub use document::{encode_value, CookieWriteOptions, DocumentCookies};

pub use store::CookieStore;
pub use store::InMemoryCookieStore;
pub use store::JsonCookieStore;
