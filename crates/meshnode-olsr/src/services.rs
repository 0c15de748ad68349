//! Service advertisement file parser
//!
//! olsrd publishes mesh services as one `url|protocol|name` line each.
//! Malformed lines are diagnostics, not failures; the file keeps being
//! useful even when a remote node advertises garbage.

use std::fmt;
use std::path::Path;

use tracing::warn;
use url::Url;

use crate::config::OlsrConfig;
use crate::error::OlsrError;

/// A service advertised on the mesh
#[derive(Debug, Clone, PartialEq)]
pub struct MeshService {
    pub url: Url,
    pub protocol: String,
    pub name: String,
    /// Whether the service has a real endpoint worth hyperlinking;
    /// advertisements with the sentinel port `0` only announce a name
    pub should_link: bool,
}

impl fmt::Display for MeshService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:\n\t", self.name)?;
        if self.should_link {
            write!(f, "{}\t{}", self.protocol, self.url)
        } else {
            write!(
                f,
                "{}\t{}",
                self.protocol,
                self.url.host_str().unwrap_or_default()
            )
        }
    }
}

/// Parses the services file and holds the latest good result
#[derive(Default)]
pub struct ServicesParser {
    config: OlsrConfig,
    current: Vec<MeshService>,
}

impl ServicesParser {
    pub fn new(config: OlsrConfig) -> Self {
        Self {
            config,
            current: Vec::new(),
        }
    }

    /// Re-read the services file, replacing the current set on success
    pub fn parse(&mut self) -> Result<(), OlsrError> {
        self.current = parse_services(&self.config.services_file)?;
        Ok(())
    }

    /// Services from the most recent successful parse
    pub fn services(&self) -> &[MeshService] {
        &self.current
    }
}

fn parse_services(path: &Path) -> Result<Vec<MeshService>, OlsrError> {
    let contents = std::fs::read_to_string(path)?;
    let mut services = Vec::new();

    for raw in contents.lines() {
        // Strip full-line and trailing comments
        let line = raw.split_once('#').map_or(raw, |(head, _)| head).trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() != 3 {
            warn!(line, "skipping malformed services line");
            continue;
        }
        let (url, protocol, name) = (fields[0], fields[1], fields[2]);

        let url = match Url::parse(url) {
            Ok(url) => url,
            Err(err) => {
                warn!(url, error = %err, "skipping service with invalid URL");
                continue;
            }
        };

        services.push(MeshService {
            should_link: url.port() != Some(0),
            url,
            protocol: protocol.to_string(),
            name: name.to_string(),
        });
    }

    Ok(services)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parser_for(contents: &str) -> (tempfile::TempDir, ServicesParser) {
        let dir = tempfile::tempdir().unwrap();
        let services_file = dir.path().join("services_olsr");
        let mut file = std::fs::File::create(&services_file).unwrap();
        file.write_all(contents.as_bytes()).unwrap();

        let parser = ServicesParser::new(OlsrConfig {
            services_file,
            ..OlsrConfig::default()
        });
        (dir, parser)
    }

    #[test]
    fn test_parses_well_formed_lines_and_skips_garbage() {
        let (_dir, mut parser) = parser_for(
            "http://host:8080|http|svc1\n\
             # a full-line comment\n\
             badline\n\
             http://host:0|http|svc2\n",
        );
        parser.parse().unwrap();

        let services = parser.services();
        assert_eq!(services.len(), 2);

        assert_eq!(services[0].name, "svc1");
        assert_eq!(services[0].protocol, "http");
        assert!(services[0].should_link);

        assert_eq!(services[1].name, "svc2");
        assert!(!services[1].should_link);
    }

    #[test]
    fn test_inline_comments_and_blank_lines() {
        let (_dir, mut parser) = parser_for(
            "\n\
             http://host:8080|http|svc1 # inline note\n\
             \n",
        );
        parser.parse().unwrap();

        assert_eq!(parser.services().len(), 1);
        assert_eq!(parser.services()[0].name, "svc1");
    }

    #[test]
    fn test_wrong_field_count_is_skipped() {
        let (_dir, mut parser) = parser_for(
            "http://host:8080|http\n\
             http://host:8080|http|svc|extra\n",
        );
        parser.parse().unwrap();
        assert!(parser.services().is_empty());
    }

    #[test]
    fn test_invalid_url_is_skipped() {
        let (_dir, mut parser) = parser_for("not a url|http|svc1\n");
        parser.parse().unwrap();
        assert!(parser.services().is_empty());
    }

    #[test]
    fn test_absent_port_is_linkable() {
        let (_dir, mut parser) = parser_for("http://host/path|http|svc1\n");
        parser.parse().unwrap();
        assert!(parser.services()[0].should_link);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut parser = ServicesParser::new(OlsrConfig {
            services_file: dir.path().join("missing"),
            ..OlsrConfig::default()
        });

        let err = parser.parse().unwrap_err();
        assert!(matches!(err, OlsrError::Io(_)));
    }

    #[test]
    fn test_failed_parse_keeps_previous_services() {
        let dir = tempfile::tempdir().unwrap();
        let services_file = dir.path().join("services_olsr");
        std::fs::write(&services_file, "http://host:8080|http|svc1\n").unwrap();

        let mut parser = ServicesParser::new(OlsrConfig {
            services_file: services_file.clone(),
            ..OlsrConfig::default()
        });
        parser.parse().unwrap();
        assert_eq!(parser.services().len(), 1);

        std::fs::remove_file(&services_file).unwrap();
        assert!(parser.parse().is_err());
        // Last good result survives the failed refresh
        assert_eq!(parser.services().len(), 1);
    }

    #[test]
    fn test_display_links_only_real_endpoints() {
        let (_dir, mut parser) = parser_for(
            "http://alpha.mesh:8080/app|http|dashboard\n\
             http://bravo.mesh:0|http|announce-only\n",
        );
        parser.parse().unwrap();

        let linked = parser.services()[0].to_string();
        assert!(linked.contains("http://alpha.mesh:8080/app"));

        let unlinked = parser.services()[1].to_string();
        assert!(unlinked.contains("bravo.mesh"));
        assert!(!unlinked.contains("http://"));
    }
}
