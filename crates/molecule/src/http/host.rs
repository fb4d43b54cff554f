/// The host name and optional port of a `Host` header, IPv6 literals included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    name: String,
    port: Option<u16>,
}

impl Host {
    pub fn parse(header: &str) -> Self {
        let header = header.trim();
        if let Some(rest) = header.strip_prefix('[')
            && let Some((name, after)) = rest.split_once(']')
        {
            let port = after.strip_prefix(':').and_then(|p| p.parse().ok());
            return Self { name: name.to_string(), port };
        }

        match header.split_once(':') {
            Some((name, port)) => Self { name: name.to_string(), port: port.parse().ok() },
            None => Self { name: header.to_string(), port: None },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn port_or(&self, default_port: u16) -> u16 {
        self.port.unwrap_or(default_port)
    }
}

#[cfg(test)]
mod tests {
    use super::Host;

    #[test]
    fn parses_name_and_port() {
        let host = Host::parse("example.com:8080");

        assert_eq!(host.name(), "example.com");
        assert_eq!(host.port(), Some(8080));
        assert_eq!(Host::parse("example.com").port_or(80), 80);
    }

    #[test]
    fn parses_ipv6_literals() {
        let host = Host::parse("[::1]:8443");

        assert_eq!(host.name(), "::1");
        assert_eq!(host.port(), Some(8443));
        assert_eq!(Host::parse("[fe80::1]").port(), None);
    }
}
