//! Static file service under the configured web root.
//!
//! Safety comes first: the decoded path must stay inside the character
//! policy and must not contain `..` — both checks run before any
//! filesystem access. Resolution then follows the dashboard-version
//! fallback matrix, directories fall back to their `index.html`, and a
//! directory reached without a trailing slash answers with a relative
//! 301 so the browser fixes its base path itself.

use std::fs::{self, File, Metadata};
use std::path::{Path, PathBuf};

use vigil_http::{ContentType, PathFlags, RequestMode, StatusCode};

use crate::api::Capability;
use crate::engine::WebEngine;
use crate::slot::ClientState;

/// Auto-redirect page for the relative 301.
const REDIRECT_BODY: &str = "<!DOCTYPE html><html>\
<body onload=\"window.location.href = window.location.origin + window.location.pathname + '/' + window.location.search + window.location.hash\">\
Redirecting. In case your browser does not support redirection, please click \
<a onclick=\"window.location.href = window.location.origin + window.location.pathname + '/' + window.location.search + window.location.hash\">here</a>.\
</body></html>";

/// Serve `filename` (the decoded URL path) from the web root.
///
/// On success the slot is switched to FILECOPY: the file is open
/// non-blocking in `state.file_in`, `rlen` carries its size, and the
/// wait flags are armed for the file producer.
pub(crate) fn serve_path(
    engine: &WebEngine,
    state: &mut ClientState,
    filename: &str,
) -> StatusCode {
    if !engine.access.allows(Capability::Dashboard, state) {
        return state.permission_denied();
    }

    let filename = filename.trim_start_matches('/');

    // character policy, checked before any filesystem access
    if !filename
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b'.' | b'-' | b'_'))
    {
        state.response.data.content_type = ContentType::Html;
        state.response.data.reset();
        state
            .response
            .data
            .push_str("Filename contains invalid characters: ");
        state.response.data.push_html_escaped(filename);
        state.response.code = StatusCode::BAD_REQUEST;
        return StatusCode::BAD_REQUEST;
    }

    if filename.contains("..") {
        state.response.data.content_type = ContentType::Html;
        state.response.data.reset();
        state
            .response
            .data
            .push_str("Relative filenames are not supported: ");
        state.response.data.push_html_escaped(filename);
        state.response.code = StatusCode::BAD_REQUEST;
        return StatusCode::BAD_REQUEST;
    }

    let (resolved, metadata, reached_directory) = match find_filename_to_serve(
        &engine.config.web_root,
        filename,
        &mut state.path_flags,
    ) {
        Ok(found) => found,
        Err(tried) => {
            state.response.data.content_type = ContentType::Html;
            state.response.data.reset();
            state
                .response
                .data
                .push_str("File does not exist, or is not accessible: ");
            state.response.data.push_html_escaped(&tried.to_string_lossy());
            state.response.code = StatusCode::NOT_FOUND;
            return StatusCode::NOT_FOUND;
        }
    };

    if reached_directory && !state.path_flags.trailing_slash {
        return append_slash_to_url_and_redirect(state);
    }

    let file = match open_nonblocking(&resolved) {
        Ok(file) => file,
        Err(e) => {
            let busy = matches!(e.raw_os_error(), Some(libc::EBUSY) | Some(libc::EAGAIN));
            if busy {
                log::error!(
                    "{}: file '{}' is busy, sending 307 to force a retry",
                    state.id,
                    resolved.display()
                );
                state.response.data.content_type = ContentType::Html;
                state.response.header.push_str("Location: /");
                state.response.header.push_str(filename);
                state.response.header.push_str("\r\n");
                state.response.data.reset();
                state
                    .response
                    .data
                    .push_str("File is currently busy, please try again later: ");
                state
                    .response
                    .data
                    .push_html_escaped(&resolved.to_string_lossy());
                state.response.code = StatusCode::TEMPORARY_REDIRECT;
                return StatusCode::TEMPORARY_REDIRECT;
            }

            log::error!("{}: cannot open file '{}': {e}", state.id, resolved.display());
            state.response.data.content_type = ContentType::Html;
            state.response.data.reset();
            state.response.data.push_str("Cannot open file: ");
            state
                .response
                .data
                .push_html_escaped(&resolved.to_string_lossy());
            state.response.code = StatusCode::NOT_FOUND;
            return StatusCode::NOT_FOUND;
        }
    };

    let size = metadata.len() as usize;

    state.response.data.content_type =
        ContentType::for_filename(&resolved.to_string_lossy());
    state.mode = RequestMode::FileCopy;
    state.wait.receive = true;
    state.wait.send = false;
    state.response.data.reset();
    state.response.data.need_bytes(size);
    state.response.rlen = size;
    state.response.data.date = metadata.modified().ok();
    state.response.data.cacheable();
    state.file_in = Some(file);

    state.response.code = StatusCode::OK;
    StatusCode::OK
}

/// Resolve a URL path to a file under the web root.
///
/// The fallback matrix (version = dashboard version prefix,
/// ext = the path has a file extension):
///
/// | ext | version | primary             | fallback                  |
/// |-----|---------|---------------------|---------------------------|
/// | yes | none    | `root/path`         | none                      |
/// | yes | vN      | `root/vN/path`      | `root/path`               |
/// | no  | vN      | `root/path`         | `root/vN` (mark slash)    |
/// | no  | vN, ""  | `root/vN`           | none                      |
/// | no  | none    | `root/path`         | `root` (mark slash)       |
///
/// A resolved directory retries with `index.html` appended; the caller
/// still sees `reached_directory = true` so it can redirect when the
/// URL lacked its trailing slash. On failure the path last tried is
/// returned for the error body.
fn find_filename_to_serve(
    root: &Path,
    filename: &str,
    flags: &mut PathFlags,
) -> Result<(PathBuf, Metadata, bool), PathBuf> {
    enum Fallback {
        None,
        PlainPath,
        VersionDir,
        Root,
    }

    let (mut candidate, fallback) = match (flags.file_extension, flags.version) {
        (true, None) => (root.join(filename), Fallback::None),
        (true, Some(v)) => (root.join(v.as_segment()).join(filename), Fallback::PlainPath),
        (false, Some(v)) => {
            if filename.is_empty() {
                (root.join(v.as_segment()), Fallback::None)
            } else {
                (root.join(filename), Fallback::VersionDir)
            }
        }
        (false, None) => (root.join(filename), Fallback::Root),
    };

    let mut metadata = fs::metadata(&candidate);
    if metadata.is_err() {
        match fallback {
            Fallback::None => return Err(candidate),
            Fallback::PlainPath => {
                candidate = root.join(filename);
            }
            Fallback::VersionDir => {
                if !filename.is_empty() {
                    flags.trailing_slash = true;
                }
                let Some(v) = flags.version else {
                    return Err(candidate);
                };
                candidate = root.join(v.as_segment());
            }
            Fallback::Root => {
                if !filename.is_empty() {
                    flags.trailing_slash = true;
                }
                candidate = root.to_path_buf();
            }
        }
        metadata = fs::metadata(&candidate);
    }

    let Ok(mut metadata) = metadata else {
        return Err(candidate);
    };

    let mut reached_directory = false;
    if metadata.is_dir() {
        candidate.push("index.html");
        metadata = fs::metadata(&candidate).map_err(|_| candidate.clone())?;
        reached_directory = true;
    }

    Ok((candidate, metadata, reached_directory))
}

#[cfg(unix)]
fn open_nonblocking(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
}

#[cfg(not(unix))]
fn open_nonblocking(path: &Path) -> std::io::Result<File> {
    fs::OpenOptions::new().read(true).open(path)
}

/// Relative 301 for a directory reached without its trailing slash.
///
/// The Location walks back to the last path segment and re-emits it
/// with a `/` appended (query string preserved); the browser already
/// knows the base path, so a relative target is enough.
pub(crate) fn append_slash_to_url_and_redirect(state: &mut ClientState) -> StatusCode {
    let url = state.url_as_received.as_str_lossy().into_owned();

    state.response.header.push_str("Location: ");
    match url.find('?').filter(|&q| q > 0) {
        Some(q) => {
            let (path, query) = url.split_at(q);
            let segment = path.rsplit('/').next().unwrap_or(path);
            state.response.header.push_str(segment);
            state.response.header.push_str("/");
            state.response.header.push_str(query);
        }
        None => {
            let segment = url.rsplit('/').next().unwrap_or(&url);
            state.response.header.push_str(segment);
            state.response.header.push_str("/");
        }
    }
    state.response.header.push_str("\r\n");

    state.response.data.content_type = ContentType::Html;
    state.response.data.reset();
    state.response.data.push_str(REDIRECT_BODY);
    state.response.code = StatusCode::MOVED_PERMANENTLY;
    StatusCode::MOVED_PERMANENTLY
}
