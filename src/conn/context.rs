//! One request/response exchange.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;

use crate::conn::env::ConnEnv;
use crate::conn::error::Error;
use crate::conn::files::resolve_file;
use crate::conn::state::{PipelineControl, WriteState};
use crate::conn::template::escape_html;
use crate::params::{decode, ParamValue, Params, PathSpec};
use crate::parser::{HeaderMap, HttpRequest, HttpVersion, Method};
use crate::server::{HttpResponse, StatusCode};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// The state of a single request as it moves through the router.
///
/// Request data is fixed at construction (query parameters are decoded
/// immediately); path parameters are installed by the router after a
/// match. The response is built up in place and committed by exactly one
/// successful [`write_resp`](Conn::write_resp).
pub struct Conn {
    method: Method,
    uri: String,
    version: HttpVersion,
    headers: HeaderMap,
    path: PathSpec,
    body: Option<String>,

    /// Captured route parameters, percent-decoded.
    pub path_params: HashMap<String, String>,
    /// Parameters decoded from the query string.
    pub query_params: Params,
    /// Parameters decoded from a form-encoded body.
    pub body_params: Params,

    response: HttpResponse,
    committed: Option<HttpResponse>,
    write_state: WriteState,
    control: PipelineControl,
    pending_file: Option<PathBuf>,
    env: Arc<ConnEnv>,
}

impl Conn {
    /// Create a context for a request head. The request body, if any, is
    /// ignored; see [`Conn::from_request`].
    pub fn new(method: Method, uri: impl Into<String>, version: HttpVersion, headers: HeaderMap, env: Arc<ConnEnv>) -> Self {
        let uri = uri.into();
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (uri.as_str(), None),
        };

        let path = PathSpec::parse(path, false);
        let query_params = query.map(decode).unwrap_or_default();

        Self {
            method,
            uri,
            version,
            headers,
            path,
            body: None,
            path_params: HashMap::new(),
            query_params,
            body_params: Params::new(),
            response: HttpResponse::new(StatusCode::Ok),
            committed: None,
            write_state: WriteState::Idle,
            control: PipelineControl::Continue,
            pending_file: None,
            env,
        }
    }

    /// Create a context for a fully read request, body included.
    pub fn from_request(request: HttpRequest, env: Arc<ConnEnv>) -> Self {
        let HttpRequest { method, uri, version, headers, body } = request;
        let mut conn = Self::new(method, uri, version, headers, env);
        if !body.is_empty() {
            conn.set_body(body);
        }
        conn
    }

    /// Store the request body.
    ///
    /// Only takes effect when the request carries exactly one `Content-Type`
    /// value and the body is UTF-8. Form-encoded bodies are also decoded
    /// into [`body_params`](Conn::body_params).
    pub fn set_body(&mut self, body: Vec<u8>) {
        let content_types = self.headers.get_all("Content-Type");
        let [content_type] = content_types.as_slice() else {
            debug!("Ignoring body for {}: {} Content-Type values", self.uri, content_types.len());
            return;
        };
        let is_form = *content_type == FORM_CONTENT_TYPE;

        let Ok(body) = String::from_utf8(body) else {
            debug!("Ignoring non UTF-8 body for {}", self.uri);
            return;
        };

        if is_form {
            self.body_params = decode(&body);
        }
        self.body = Some(body);
    }

    /// The effective method.
    ///
    /// A POST whose form body sets `_method` to `PATCH`, `PUT` or `DELETE`
    /// reports that method instead.
    pub fn method(&self) -> Method {
        if self.method != Method::POST {
            return self.method;
        }

        self.body_params
            .get("_method")
            .and_then(ParamValue::as_str)
            .and_then(Method::from_override)
            .unwrap_or(Method::POST)
    }

    /// The method as sent by the client.
    pub fn request_method(&self) -> Method {
        self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    pub fn request_headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn path(&self) -> &PathSpec {
        &self.path
    }

    /// The raw request body, if one was accepted.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Path, body and query parameters merged into one map.
    ///
    /// Path parameters always win. For GET only query parameters are merged
    /// beneath them; other methods layer body parameters over query
    /// parameters. Built fresh on every call.
    pub fn params(&self) -> Params {
        let mut params = self.query_params.clone();

        if self.method() != Method::GET {
            params.extend(self.body_params.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        params.extend(
            self.path_params
                .iter()
                .map(|(k, v)| (k.clone(), ParamValue::from(v.as_str()))),
        );

        params
    }

    /// Stop the remaining pipeline steps for this request.
    pub fn halt(&mut self) {
        self.control = PipelineControl::Halted;
    }

    pub fn is_halted(&self) -> bool {
        self.control == PipelineControl::Halted
    }

    pub fn pipeline_control(&self) -> PipelineControl {
        self.control
    }

    pub fn write_state(&self) -> WriteState {
        self.write_state
    }

    pub fn env(&self) -> &ConnEnv {
        &self.env
    }

    /// Point the context at the settings of the router handling it.
    pub(crate) fn set_env(&mut self, env: Arc<ConnEnv>) {
        self.env = env;
    }

    /// The response being built, or the committed one after a write.
    pub fn response(&self) -> &HttpResponse {
        self.committed.as_ref().unwrap_or(&self.response)
    }

    pub fn status(&self) -> StatusCode {
        self.response().status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.response.status = status;
    }

    /// Set a response header, replacing any previous values.
    ///
    /// Names must be ASCII without `:`, CR or LF; values must not contain CR
    /// or LF.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<(), Error> {
        if name.is_empty() || !name.is_ascii() {
            return Err(Error::MalformedHeader(format!("name {name:?} must be non-empty ASCII")));
        }
        if name.contains([':', '\r', '\n']) {
            return Err(Error::MalformedHeader(format!(
                "name {name:?} must not contain ':', '\\r', or '\\n'"
            )));
        }
        if value.contains(['\r', '\n']) {
            return Err(Error::MalformedHeader(format!(
                "value for {name} must not contain '\\r' or '\\n'"
            )));
        }

        self.response.headers.replace_or_add(name, value);
        Ok(())
    }

    /// Respond with plain text.
    pub fn text(&mut self, status: StatusCode, text: impl Into<String>) {
        self.respond(status, "text/plain; charset=utf-8", text.into().into_bytes());
    }

    /// Respond with HTML.
    pub fn html(&mut self, status: StatusCode, html: impl Into<String>) {
        self.respond(status, "text/html; charset=utf-8", html.into().into_bytes());
    }

    /// Respond with `value` serialized as JSON.
    pub fn json<T: Serialize>(&mut self, status: StatusCode, value: &T) -> Result<(), Error> {
        let body = serde_json::to_vec(value)?;
        self.respond(status, "application/json", body);
        Ok(())
    }

    /// Render `template` with HTML-escaped `vars` and respond with the
    /// result. A missing renderer or template produces the server-error
    /// response.
    pub fn render(&mut self, template: &str, vars: &HashMap<String, String>) {
        let escaped: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.clone(), escape_html(v)))
            .collect();

        let rendered = self
            .env
            .renderer
            .as_ref()
            .and_then(|renderer| renderer.render(template, &escaped));

        match rendered {
            Some(html) => self.html(StatusCode::Ok, html),
            None => {
                warn!("Template {template:?} could not be rendered");
                self.server_error();
            }
        }
    }

    /// Respond with the contents of a file.
    ///
    /// The context becomes busy until the transport completes the write with
    /// [`finish_file`](Conn::finish_file) or [`fail_file`](Conn::fail_file).
    /// With `safe` set, paths escaping the public directory get the
    /// not-found response immediately.
    pub fn send_file(&mut self, status: StatusCode, path: impl AsRef<Path>, safe: bool) {
        self.write_state = WriteState::Busy;

        let path = path.as_ref();
        match resolve_file(&self.env.public_dir, path, safe) {
            Some(resolved) => {
                self.response.status = status;
                self.pending_file = Some(resolved);
            }
            None => {
                warn!("Refusing to serve {} for {}", path.display(), self.uri);
                self.not_found();
                self.write_resp(true);
            }
        }
    }

    /// The file waiting to be opened by the transport.
    pub fn pending_file(&self) -> Option<&Path> {
        self.pending_file.as_deref()
    }

    /// Complete a pending file response with its contents.
    pub fn finish_file(&mut self, contents: Vec<u8>) {
        if self.pending_file.take().is_none() {
            warn!("No file response pending for {}", self.uri);
            return;
        }
        self.response.set_body(contents);
        self.write_resp(true);
    }

    /// Abandon a pending file response that could not be opened.
    pub fn fail_file(&mut self) {
        self.pending_file = None;
        self.not_found();
        self.write_resp(true);
    }

    /// Run the configured not-found responder.
    pub fn not_found(&mut self) {
        let responder = self.env.responders.not_found.clone();
        responder(self);
    }

    /// Run the configured server-error responder.
    pub fn server_error(&mut self) {
        let responder = self.env.responders.server_error.clone();
        responder(self);
    }

    /// Commit the response.
    ///
    /// Refused while a deferred write is in flight unless `force` is set,
    /// and after the response has already been written. A response without
    /// a body is replaced by the server-error response first. Returns
    /// whether the response was committed.
    pub fn write_resp(&mut self, force: bool) -> bool {
        self.write(force, true)
    }

    fn write(&mut self, force: bool, retry: bool) -> bool {
        match self.write_state {
            WriteState::Closed => {
                warn!("Response for {} already written", self.uri);
                return false;
            }
            WriteState::Busy if !force => {
                debug!("Deferring response for {}", self.uri);
                return false;
            }
            _ => {}
        }

        if self.response.body.is_none() {
            if retry {
                self.server_error();
                return self.write(force, false);
            }
            self.response.set_body(Vec::new());
        }

        self.write_state = WriteState::Closed;
        self.pending_file = None;
        self.committed = Some(std::mem::replace(
            &mut self.response,
            HttpResponse::new(StatusCode::Ok),
        ));
        true
    }

    /// Hand the committed response to the transport. Yields it only once.
    pub fn take_response(&mut self) -> Option<HttpResponse> {
        self.committed.take()
    }

    fn respond(&mut self, status: StatusCode, content_type: &str, body: Vec<u8>) {
        self.response.status = status;
        self.response.headers.replace_or_add("Content-Type", content_type);
        self.response.set_body(body);
    }
}
