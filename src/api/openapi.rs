use utoipa::openapi::{Contact, Info, InfoBuilder, License};
use utoipa::OpenApi;

use super::handlers::auth::{login, oauth, session, types};
use super::handlers::health;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        login::login,
        session::logout,
        session::status,
        oauth::start,
        oauth::callback,
    ),
    components(schemas(
        health::Health,
        types::LoginRequest,
        types::SessionResponse,
        types::AuthStatusResponse,
        types::ErrorResponse,
    )),
    tags(
        (name = "health", description = "Liveness and build information"),
        (name = "auth", description = "Access-key login and session management"),
        (name = "oauth", description = "Google OAuth redirect flow"),
    )
)]
struct ApiDoc;

/// The document served at `/openapi.json`, with info taken from Cargo metadata.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info = cargo_info();
    doc
}

fn cargo_info() -> Info {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(non_empty(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = env!("CARGO_PKG_AUTHORS")
        .split(';')
        .next()
        .and_then(|author| {
            let (name, email) = split_author(author);
            if name.is_none() && email.is_none() {
                return None;
            }
            let mut contact = Contact::new();
            contact.name = name.map(str::to_string);
            contact.email = email.map(str::to_string);
            Some(contact)
        });

    info.license = non_empty(env!("CARGO_PKG_LICENSE")).map(|identifier| {
        let mut license = License::new(identifier);
        license.identifier = Some(identifier.to_string());
        license
    });

    info
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|value| !value.is_empty())
}

// "Name <email>" as written in Cargo `authors`.
fn split_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, rest)) => (non_empty(name), non_empty(rest.trim_end_matches('>'))),
        None => (non_empty(author), None),
    }
}
