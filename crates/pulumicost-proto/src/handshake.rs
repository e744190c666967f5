use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("handshake line did not parse as a port number: {0:?}")]
    MalformedPortLine(String),

    #[error("handshake timed out waiting for a port line")]
    Timeout,

    #[error("io error during handshake: {0}")]
    Io(#[from] std::io::Error),
}

/// Render the single stdout line a child process must print before
/// accepting connections (§6 "Subprocess handshake", step 2): exactly the
/// chosen port, followed by `\n`, and nothing else on stdout.
pub fn write_port_line(port: u16) -> String {
    format!("{}\n", port)
}

/// Parse a single line read from a child's stdout into the port it
/// announced. Any leading/trailing whitespace is trimmed; anything that
/// isn't a bare `u16` is a contract violation.
pub fn read_port_line(line: &str) -> Result<u16, HandshakeError> {
    line.trim()
        .parse::<u16>()
        .map_err(|_| HandshakeError::MalformedPortLine(line.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let line = write_port_line(47513);
        assert_eq!(read_port_line(line.trim()).unwrap(), 47513);
    }

    #[test]
    fn read_rejects_non_numeric_line() {
        assert!(read_port_line("not a port").is_err());
    }

    #[test]
    fn read_tolerates_surrounding_whitespace() {
        assert_eq!(read_port_line("  8080  \n").unwrap(), 8080);
    }
}
