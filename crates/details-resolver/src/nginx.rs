//! Parses a helper-generated text file describing the on-host nginx/kong
//! build: version, configure options, and extra compiler options.

use serde::{Deserialize, Serialize};

/// On-host reverse-proxy build description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyBuildInfo {
    /// e.g. `nginx/1.25.3` or `kong/3.4.2`.
    pub version: Option<String>,
    /// `--with-*`/`--without-*` flags from `nginx -V`'s `configure arguments:` line.
    pub configure_options: Vec<String>,
    /// Extra compiler flags reported alongside the build (e.g. `-DNGX_LUA_...`).
    pub extra_compiler_options: Vec<String>,
}

/// Parse the helper script's output. Expected shape:
///
/// ```text
/// version: nginx/1.25.3
/// configure arguments: --with-http_ssl_module --with-stream
/// extra compiler options: -DNGX_LUA_USE_ASSERT -O2
/// ```
///
/// Any missing line leaves the corresponding field at its default; the
/// parser never fails outright, matching the "unknown, never blocks" probe
/// contract.
pub fn parse_proxy_build_info(text: &str) -> ProxyBuildInfo {
    let mut info = ProxyBuildInfo::default();

    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "version" => info.version = Some(value.to_string()),
            "configure arguments" => {
                info.configure_options = value.split_whitespace().map(str::to_string).collect();
            }
            "extra compiler options" => {
                info.extra_compiler_options =
                    value.split_whitespace().map(str::to_string).collect();
            }
            _ => {}
        }
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_build_info() {
        let text = "version: nginx/1.25.3\n\
                    configure arguments: --with-http_ssl_module --with-stream\n\
                    extra compiler options: -O2\n";
        let info = parse_proxy_build_info(text);
        assert_eq!(info.version.as_deref(), Some("nginx/1.25.3"));
        assert_eq!(
            info.configure_options,
            vec!["--with-http_ssl_module", "--with-stream"]
        );
        assert_eq!(info.extra_compiler_options, vec!["-O2"]);
    }

    #[test]
    fn missing_lines_leave_defaults() {
        let info = parse_proxy_build_info("version: kong/3.4.2\n");
        assert_eq!(info.version.as_deref(), Some("kong/3.4.2"));
        assert!(info.configure_options.is_empty());
    }

    #[test]
    fn garbage_input_does_not_panic() {
        let info = parse_proxy_build_info("not a key value file at all");
        assert_eq!(info, ProxyBuildInfo::default());
    }
}
