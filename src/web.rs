use crate::config::{ConfigError, DEFAULT_ORIGIN, SourceConfig};
use crate::form::{COPY_FEEDBACK_DELAY, Entry, FEEDBACK_FORM_URL, ISSUE_TRACKER_URL, LookupForm, LookupView};
use crate::share::ShareLink;
use crate::source::DictionarySource;
use crate::term::Term;
use crate::BundledDictionary;
use askama::Template;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn};

type SharedState = Arc<AppState>;

pub struct AppState {
    pub source: Arc<dyn DictionarySource>,
    pub origin: String,
    pub feedback_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    /// Public origin used in share links and the sitemap.
    pub origin: String,
    pub source: SourceConfig,
    pub feedback_delay: Duration,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            origin: DEFAULT_ORIGIN.to_string(),
            source: SourceConfig::default(),
            feedback_delay: COPY_FEEDBACK_DELAY,
        }
    }
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let source = config.source.open()?;
    info!(
        %config.addr,
        origin = %config.origin,
        source = %source.describe(),
        "Binding HTTP listener"
    );
    let state = Arc::new(AppState {
        source,
        origin: config.origin,
        feedback_delay: config.feedback_delay,
    });
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(lookup_page))
        .route("/api/lookup", get(api_lookup))
        .route("/server/db/:file", get(dictionary_resource))
        .route("/healthz", get(health))
        .route("/sitemap.xml", get(sitemap_xml))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// `share` comes from a copied link, `term` from the form's own submit.
#[derive(Debug, Default, Deserialize)]
struct LookupParams {
    share: Option<String>,
    term: Option<String>,
}

/// Runs one page load: a `share` deep link wins, otherwise a submitted `term`.
async fn drive_form(source: &dyn DictionarySource, params: &LookupParams) -> LookupForm {
    let mut form = LookupForm::new();
    if form.open(params.share.as_deref(), source).await.is_some() {
        return form;
    }
    if let Some(term) = &params.term {
        form.edit(term);
        form.submit(source).await;
    }
    form
}

async fn lookup_page(
    State(state): State<SharedState>,
    Query(params): Query<LookupParams>,
) -> impl IntoResponse {
    let form = drive_form(state.source.as_ref(), &params).await;
    let template = LookupTemplate {
        view: form.view(&state.origin),
        submitted: form
            .last_submitted()
            .map(|term| term.to_string())
            .unwrap_or_default(),
        has_submitted: form.last_submitted().is_some(),
        feedback_ms: state.feedback_delay.as_millis() as u64,
        issue_tracker_url: ISSUE_TRACKER_URL,
        feedback_form_url: FEEDBACK_FORM_URL,
    };
    Html(
        template
            .render()
            .unwrap_or_else(|err| render_error_page(err.to_string())),
    )
}

async fn api_lookup(
    State(state): State<SharedState>,
    Query(params): Query<LookupParams>,
) -> Result<Json<LookupView>, ApiError> {
    if params.share.is_none() && params.term.is_none() {
        return Err(ApiError::bad_request(
            "Provide either `term` or `share` query parameters.",
        ));
    }
    let form = drive_form(state.source.as_ref(), &params).await;
    Ok(Json(form.view(&state.origin)))
}

/// `<base-path>/<term>.json` for whatever source the server was started with.
async fn dictionary_resource(
    State(state): State<SharedState>,
    Path(file): Path<String>,
) -> Result<Json<Entry>, ApiError> {
    let term = Term::from_resource_name(&file)
        .ok_or_else(|| ApiError::not_found(format!("No resource named {file:?}")))?;
    match state.source.fetch(&term).await {
        Ok(Some(entry)) => Ok(Json(entry)),
        Ok(None) => Err(ApiError::not_found(format!(
            "No entry found for {:?}",
            term.as_str()
        ))),
        Err(err) => {
            warn!(term = %term, error = %err, "dictionary read failed");
            Err(ApiError::bad_gateway("Dictionary unavailable"))
        }
    }
}

async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "abbreve-web",
        "source": state.source.describe(),
    }))
}

async fn sitemap_xml(State(state): State<SharedState>) -> impl IntoResponse {
    let mut body = String::with_capacity(1024);
    body.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    body.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
    let mut push_url = |loc: &str, priority: &str| {
        body.push_str("<url><loc>");
        body.push_str(&xml_escape(loc));
        body.push_str("</loc><changefreq>weekly</changefreq><priority>");
        body.push_str(priority);
        body.push_str("</priority></url>");
    };
    push_url(&format!("{}/", state.origin.trim_end_matches('/')), "0.8");
    for term in BundledDictionary::all_terms() {
        let link = ShareLink::new(&state.origin, &Term::normalize(term));
        push_url(link.as_str(), "0.5");
    }
    body.push_str("</urlset>");
    ([(header::CONTENT_TYPE, mime::TEXT_XML.to_string())], body)
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn render_error_page(message: impl Into<String>) -> String {
    let message = xml_escape(&message.into());
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <title>Abbreve • Error</title>
  </head>
  <body>
    <main>
      <h1>Something went wrong</h1>
      <p>{message}</p>
      <a href="/">Back to search</a>
    </main>
  </body>
</html>"#
    )
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Abbreve • Slang dictionary</title>
  </head>
  <body>
    <main>
      <h2>Start by entering a slang, and our dictionary will spit out an abbreviation.</h2>
      <p>*For now, abbreviations are one-way. For example, idk can only translate to 'I don't know', and not the other way round.</p>
      <form id="lookup-form" method="get" action="/">
        <input type="text" name="term" value="{{ view.term }}" placeholder="Search slang full meaning..." autocomplete="off"{% if has_submitted %} data-submitted="{{ submitted }}"{% endif %} />
        <button type="submit"{% if !view.submit_enabled %} disabled{% endif %}>{% if view.state == "loading" %}<span class="spinner" aria-label="Loading"></span>{% else %}Search{% endif %}</button>
      </form>

      {% if view.state == "loaded" %}
      <section id="result" class="lookup-region" role="region" aria-live="assertive">
        {% match view.definition %}{% when Some with (definition) %}<p class="definition">{{ definition }}</p>{% when None %}{% endmatch %}
        {% match view.share_link %}{% when Some with (link) %}<button type="button" id="copy-link" data-share-link="{{ link }}">Copy link</button>{% when None %}{% endmatch %}
        {% match view.alternatives %}{% when Some with (alternatives) %}<p class="alternatives">{{ alternatives }}</p>{% when None %}{% endmatch %}
      </section>
      {% endif %}

      {% if view.state == "transport_error" %}
      <section id="transport-error" class="lookup-region">
        {% match view.message %}{% when Some with (message) %}<p>{{ message }}</p>{% when None %}{% endmatch %}
      </section>
      {% endif %}

      {% if view.state == "blank_input" %}
      <section id="blank-input" class="lookup-region">
        {% match view.message %}{% when Some with (message) %}<p>{{ message }}</p>{% when None %}{% endmatch %}
      </section>
      {% endif %}

      {% if view.state == "not_found" %}
      <section id="not-found" class="lookup-region">
        {% match view.message %}{% when Some with (message) %}<p>{{ message }}</p>{% when None %}{% endmatch %}
        <p>1. You can help us add this by creating a <a href="{{ issue_tracker_url }}">github issue</a></p>
        <p>2. Or, you could fill out this <a href="{{ feedback_form_url }}">feedback form</a> and we will address the issue</p>
      </section>
      {% endif %}
    </main>
    <script>
      (() => {
        const input = document.querySelector('#lookup-form input[name="term"]');
        const submit = document.querySelector('#lookup-form button[type="submit"]');
        input.addEventListener('input', () => {
          input.value = input.value.toLowerCase();
          document.querySelectorAll('.lookup-region').forEach((region) => region.remove());
          submit.disabled = input.dataset.submitted !== undefined && input.value === input.dataset.submitted;
        });
        const copy = document.getElementById('copy-link');
        if (!copy) return;
        let resetTimer;
        copy.addEventListener('click', () => {
          navigator.clipboard.writeText(copy.dataset.shareLink).then(() => {
            copy.textContent = 'Copied';
            clearTimeout(resetTimer);
            resetTimer = setTimeout(() => copy.textContent = 'Copy link', {{ feedback_ms }});
          }).catch((err) => console.error('Could not copy text: ', err));
        });
      })();
    </script>
  </body>
</html>"#,
    ext = "html"
)]
struct LookupTemplate {
    view: LookupView,
    submitted: String,
    has_submitted: bool,
    feedback_ms: u64,
    issue_tracker_url: &'static str,
    feedback_form_url: &'static str,
}
