//! Address construction for resources on the artifact host.

use crate::error::{Result, UpdaterError};
use reqwest::Url;

/// Join `segments` onto the path of `base`.
///
/// Scheme, host, port, query and fragment of the base are preserved. The
/// joined path is normalized the way a POSIX path join would: empty and `.`
/// components are dropped and `..` removes the previous component without
/// ever escaping the root.
pub fn resolve(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|err| UpdaterError::InvalidAddress {
        address: base.to_string(),
        reason: err.to_string(),
    })?;

    if url.cannot_be_a_base() {
        return Err(UpdaterError::InvalidAddress {
            address: base.to_string(),
            reason: "address cannot carry a path".into(),
        });
    }

    let joined = std::iter::once(url.path())
        .chain(segments.iter().copied())
        .collect::<Vec<_>>()
        .join("/");
    url.set_path(&normalize(&joined));
    Ok(url)
}

fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}
