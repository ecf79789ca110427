//! Value parsers for numeric flags.

/// Parses `--parallel`: a positive session count.
pub fn parse_parallelism(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a whole number"))?;
    if n == 0 {
        return Err("Parallelism must be at least 1".to_string());
    }
    Ok(n)
}

/// Parses a timeout in milliseconds; zero is rejected.
pub fn parse_timeout_ms(s: &str) -> Result<u64, String> {
    let ms: u64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a number of milliseconds"))?;
    if ms == 0 {
        return Err("Timeout must be greater than zero".to_string());
    }
    Ok(ms)
}
