//! Deep-link parameters
//!
//! A link like `https://viewer.example/?host=prod:5005&file=app.log#L120`
//! selects the initial host and pre-fills the filename. The fragment is
//! appended to the filename so an anchor inside the file survives.

use url::Url;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LaunchParams {
    pub host: Option<String>,
    pub file: Option<String>,
}

#[derive(Debug)]
pub struct LaunchError {
    pub link: String,
    pub reason: url::ParseError,
}

impl std::fmt::Display for LaunchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid link '{}': {}", self.link, self.reason)
    }
}

impl std::error::Error for LaunchError {}

impl LaunchParams {
    /// Parse a full URL or a bare `?host=..&file=..` query string
    pub fn parse(link: &str) -> Result<Self, LaunchError> {
        let trimmed = link.trim();
        let parsed = if trimmed.contains("://") {
            Url::parse(trimmed)
        } else {
            let query = trimmed.trim_start_matches('?');
            Url::parse(&format!("logtail://link/?{}", query))
        }
        .map_err(|reason| LaunchError {
            link: link.to_string(),
            reason,
        })?;

        let mut params = LaunchParams::default();
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "host" if !value.is_empty() => params.host = Some(value.into_owned()),
                "file" => params.file = Some(value.into_owned()),
                _ => {}
            }
        }

        if let (Some(file), Some(fragment)) = (params.file.as_mut(), parsed.fragment()) {
            if !fragment.is_empty() {
                file.push('#');
                file.push_str(fragment);
            }
        }

        Ok(params)
    }

    /// Explicit values win over the ones carried by the link
    pub fn merge(self, host: Option<String>, file: Option<String>) -> Self {
        Self {
            host: host.or(self.host),
            file: file.or(self.file),
        }
    }
}
