use std::{
    fmt, fs,
    io::{self, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

use confique::Config as _;
use serde::Deserialize;
use url::Url;

use crate::prelude::*;


/// The locations where Minaret will look for a configuration file. The first
/// existing file in this list is used.
const DEFAULT_PATHS: &[&str] = &[
    // For better DX, we include this special path here, but just in debug mode.
    #[cfg(debug_assertions)]
    "util/dev-config/config.toml",

    "config.toml",
    "/etc/minaret/config.toml",
];

const MINARET_CONFIG_PATH_ENV: &str = "MINARET_CONFIG_PATH";

/// Configuration for Minaret.
///
/// All relative paths are relative to the location of this configuration file.
#[derive(Debug, confique::Config)]
pub(crate) struct Config {
    #[config(nested)]
    pub(crate) pocketbase: crate::pb::PocketBaseConfig,

    #[config(nested)]
    pub(crate) log: crate::logger::LogConfig,
}

impl Config {
    /// Tries to find a config file by checking `MINARET_CONFIG_PATH` and a
    /// list of default config file locations. The first config file found is
    /// loaded via [`Self::load_from`]. If there is none, environment
    /// variables alone have to provide all required values. Returns the
    /// loaded config and the path that it was loaded from, if any.
    pub(crate) fn from_env_or_default_locations() -> Result<(Self, Option<PathBuf>)> {
        let path = if let Some(path) = std::env::var_os(MINARET_CONFIG_PATH_ENV) {
            Some(PathBuf::from(path))
        } else {
            DEFAULT_PATHS.iter()
                .map(PathBuf::from)
                .find(|p| p.exists())
        };

        match path {
            Some(path) => {
                let config = Self::load_from(&path)
                    .context(format!("failed to load configuration from '{}'", path.display()))?;
                Ok((config, Some(path)))
            }
            None => {
                let config = Self::builder().env().load().context(format!(
                    "no configuration file found (checked: {}) and the environment \
                        variables alone don't configure everything required",
                    DEFAULT_PATHS.join(", "),
                ))?;
                Ok((config, None))
            }
        }
    }

    /// Loads the configuration from a specific TOML file. Environment
    /// variables still take precedence over values from the file.
    pub(crate) fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Config::builder()
            .env()
            .file(path)
            .load()
            .context(format!("failed to read config file '{}'", path.display()))?;

        config.fix_paths(path)?;

        Ok(config)
    }

    /// Goes through all paths in the configuration and changes relative paths
    /// to be absolute based on the path of the configuration file itself.
    fn fix_paths(&mut self, config_path: &Path) -> Result<()> {
        let absolute_config_path = config_path.canonicalize()
            .context("failed to canonicalize config path")?;
        let base = absolute_config_path.parent()
            .expect("config file path has no parent");

        if let Some(p) = &mut self.log.file {
            if p.is_relative() {
                *p = base.join(&p);
            }
        }

        Ok(())
    }
}

/// Writes the generated TOML config template file to the given destination or
/// stdout.
pub(crate) fn write_template(path: Option<&PathBuf>) -> Result<()> {
    use confique::toml::FormatOptions;

    info!(
        "Writing configuration template to '{}'",
        path.map(|p| p.display().to_string()).unwrap_or("<stdout>".into()),
    );

    let mut options = FormatOptions::default();
    options.general.nested_field_gap = 2;
    let template = confique::toml::template::<Config>(options);
    match path {
        Some(path) => fs::write(path, template)?,
        None => io::stdout().write_all(template.as_bytes())?,
    }

    Ok(())
}


/// The base URL of an HTTP service: http(s) scheme and authority, no path,
/// query or userinfo.
///
/// Plain `http` is only accepted for loopback hosts, unless the safe word
/// `#allow-insecure` is appended. This is just to catch human errors, not to
/// defend against attackers.
#[derive(Clone, Deserialize)]
#[serde(try_from = "String")]
pub(crate) struct HttpHost(Url);

impl HttpHost {
    /// Returns a full URL by combining `self` with the given absolute path.
    /// Panics if `path` is malformed!
    pub(crate) fn with_path(&self, path: &str) -> Url {
        self.0.join(path).expect("bug: invalid URL path")
    }
}

impl fmt::Display for HttpHost {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}://{}", self.0.scheme(), self.0.authority())
    }
}

impl fmt::Debug for HttpHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for HttpHost {
    type Err = anyhow::Error;
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        const SAFE_WORD: &str = "allow-insecure";

        let mut url: Url = src.parse().map_err(|e| anyhow!("invalid URL: {e}"))?;

        anyhow::ensure!(["http", "https"].contains(&url.scheme()),
            "URL scheme must be 'http' or 'https'");
        anyhow::ensure!(url.query().is_none(), "URL must not contain a query part");
        anyhow::ensure!(!url.fragment().is_some_and(|f| f != SAFE_WORD),
            "URL must not have a fragment part, except for optionally '#{SAFE_WORD}'");
        anyhow::ensure!(url.username().is_empty() && url.password().is_none(),
            "URL must not contain a userinfo part");
        anyhow::ensure!(url.path() == "/" || url.path().is_empty(),
            "URL must not contain a path");

        let host = url.host_str().ok_or(anyhow!("URL must have a host"))?;
        let is_local = match url.host() {
            Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
            Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
            // Sure, "localhost" could resolve to anything. But this check is
            // for catching human errors, so it doesn't need to be bulletproof.
            Some(url::Host::Domain(domain)) => domain == "localhost",
            None => false,
        };

        if url.scheme() != "https" && !(is_local || url.fragment() == Some(SAFE_WORD)) {
            bail!("if you really want to use unencrypted HTTP for the non-local host \
                '{host}', confirm by appending '#{SAFE_WORD}' to the URL");
        }

        url.set_fragment(None);
        url.set_path("/");

        Ok(Self(url))
    }
}

impl TryFrom<String> for HttpHost {
    type Error = <Self as FromStr>::Err;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}


#[cfg(test)]
mod tests {
    use super::HttpHost;

    fn parse_http_host(s: &str) -> HttpHost {
        s.parse::<HttpHost>().expect(&format!("could not parse '{s}' as HttpHost"))
    }

    const LOCAL_HOSTS: &[&str] = &[
        "localhost",
        "localhost:1234",
        "127.0.0.1",
        "127.0.0.1:4321",
        "127.1.2.3",
        "127.1.2.3:4321",
        "[::1]",
        "[::1]:4321",
    ];

    const NON_LOCAL_HOSTS: &[&str] = &[
        "1.1.1.1",
        "1.1.1.1:3456",
        "[2606:4700:4700::1111]",
        "[2606:4700:4700::1111]:3456",
        "github.com",
        "github.com:3456",
    ];

    #[test]
    fn http_host_parse_https() {
        for host in LOCAL_HOSTS.iter().chain(NON_LOCAL_HOSTS) {
            parse_http_host(&format!("https://{host}"));
        }
    }

    #[test]
    fn http_host_parse_http_local() {
        for host in LOCAL_HOSTS {
            parse_http_host(&format!("http://{host}"));
        }
    }

    #[test]
    fn http_host_parse_http_non_local_safeword() {
        for host in NON_LOCAL_HOSTS {
            parse_http_host(&format!("http://{host}#allow-insecure"));
        }
    }

    #[test]
    fn http_host_parse_http_non_local_error() {
        for host in NON_LOCAL_HOSTS {
            format!("http://{host}").parse::<HttpHost>().unwrap_err();
        }
    }

    #[test]
    fn http_host_rejects_garbage() {
        for src in [
            "ftp://localhost",
            "https://localhost/api",
            "https://localhost?x=1",
            "https://user:pw@localhost",
            "https://localhost#something",
        ] {
            src.parse::<HttpHost>().unwrap_err();
        }
    }
}
