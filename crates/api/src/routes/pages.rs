//! Server-rendered HTML pages for browser users

use crate::AppState;
use axum::{
    extract::State,
    http::{header::LOCATION, StatusCode},
    response::{Html, IntoResponse, Response},
    Extension,
};
use services::auth::{SessionKey, UserIdentity};
use translation_providers::TargetLanguage;

/// `302 Found` to `location`
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>
        body {{ font-family: sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; }}
        textarea {{ width: 100%; min-height: 8rem; }}
        .error {{ color: #a00; }}
        section {{ margin-bottom: 2rem; }}
    </style>
</head>
<body>
    <h1>Translator Portal</h1>
{body}
</body>
</html>"#,
        title = escape_html(title),
        body = body
    ))
}

fn language_options() -> String {
    TargetLanguage::all()
        .iter()
        .map(|lang| {
            format!(
                r#"<option value="{}">{}</option>"#,
                lang.code(),
                escape_html(lang.display_name())
            )
        })
        .collect::<Vec<_>>()
        .join("")
}

fn signed_in_body(identity: &UserIdentity) -> String {
    let options = language_options();
    format!(
        r#"    <p>Welcome, {name}!</p>
    <form action="/auth/logout" method="post"><button type="submit">Log out</button></form>
    <section>
        <h2>Translate text</h2>
        <form id="text-form">
            <textarea name="text" placeholder="Enter text to translate"></textarea>
            <select name="target_language">{options}</select>
            <button type="submit">Translate</button>
        </form>
        <p id="text-result"></p>
    </section>
    <section>
        <h2>Translate documents</h2>
        <form id="document-form" action="/v1/translate/document" method="post" enctype="multipart/form-data">
            <input type="file" name="file" multiple accept=".pdf,.docx,.pptx,.xlsx,.txt,.html,.htm">
            <select name="target_language">{options}</select>
            <button type="submit">Translate and download</button>
        </form>
        <ul id="document-results"></ul>
    </section>
    <script>
    document.getElementById('text-form').addEventListener('submit', async (event) => {{
        event.preventDefault();
        const form = new FormData(event.target);
        const output = document.getElementById('text-result');
        const response = await fetch('/v1/translate/text', {{
            method: 'POST',
            headers: {{ 'Content-Type': 'application/json' }},
            body: JSON.stringify({{
                text: form.get('text'),
                target_language: form.get('target_language')
            }})
        }});
        const body = await response.json();
        output.className = response.ok ? '' : 'error';
        output.textContent = response.ok ? body.translated_text : body.error.message;
    }});

    // One request per selected file, one after another
    document.getElementById('document-form').addEventListener('submit', async (event) => {{
        event.preventDefault();
        const form = event.target;
        const target = form.elements['target_language'].value;
        const results = document.getElementById('document-results');
        results.replaceChildren();
        for (const file of form.elements['file'].files) {{
            const item = document.createElement('li');
            item.textContent = file.name + ': translating...';
            results.appendChild(item);

            const body = new FormData();
            body.append('target_language', target);
            body.append('file', file);
            const response = await fetch('/v1/translate/document', {{ method: 'POST', body }});
            if (!response.ok) {{
                const error = await response.json();
                item.className = 'error';
                item.textContent = file.name + ': ' + error.error.message;
                continue;
            }}
            const disposition = response.headers.get('Content-Disposition') || '';
            const match = disposition.match(/filename="([^"]+)"/);
            const link = document.createElement('a');
            link.href = URL.createObjectURL(await response.blob());
            link.download = match ? match[1] : file.name;
            link.textContent = link.download;
            item.replaceChildren(link);
            link.click();
        }}
    }});
    </script>"#,
        name = escape_html(identity.name()),
        options = options
    )
}

/// Home page
///
/// Shows the translation forms to signed-in users, a login link to anyone
/// else, and the configuration problem instead when sign-in is unavailable.
pub async fn home(
    State(state): State<AppState>,
    Extension(key): Extension<SessionKey>,
) -> Html<String> {
    if let Some(reason) = state.auth.configuration_error() {
        return layout(
            "Translator Portal",
            &format!(
                r#"    <p class="error">Sign-in is unavailable: {}</p>"#,
                escape_html(reason)
            ),
        );
    }

    match state.auth.get_identity(&key).await {
        Some(identity) => layout("Translator Portal", &signed_in_body(&identity)),
        None => layout(
            "Translator Portal",
            r#"    <p>Please log in with your corporate account to use the translator.</p>
    <p><a href="/auth/login">Log in</a></p>"#,
        ),
    }
}

/// Shown when the identity provider refused the sign-in
pub fn login_again_page(description: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        layout(
            "Sign-in failed",
            &format!(
                r#"    <p class="error">Sign-in failed: {}</p>
    <p>Please log in again. <a href="/auth/login">Log in</a></p>"#,
                escape_html(description)
            ),
        ),
    )
        .into_response()
}

/// Shown when single sign-on is not configured
pub fn unavailable_page(reason: &str) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        layout(
            "Sign-in unavailable",
            &format!(
                r#"    <p class="error">Sign-in is unavailable: {}</p>"#,
                escape_html(reason)
            ),
        ),
    )
        .into_response()
}

pub fn error_page(status: StatusCode, message: &str) -> Response {
    (
        status,
        layout(
            "Something went wrong",
            &format!(
                r#"    <p class="error">{}</p>
    <p><a href="/">Back to the portal</a></p>"#,
                escape_html(message)
            ),
        ),
    )
        .into_response()
}
