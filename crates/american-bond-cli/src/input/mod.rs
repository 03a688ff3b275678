pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Load a typed input from `--input <file>` or, failing that, piped stdin.
pub fn read_input<T: DeserializeOwned>(
    path: Option<&str>,
    command: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return file::read_json(path);
    }
    match stdin::read_stdin::<T>()? {
        Some(parsed) => Ok(parsed),
        None => Err(format!("--input <file.json> or stdin required for {command}").into()),
    }
}

/// Where the input came from, for log lines.
pub fn source_name(path: Option<&str>) -> &str {
    path.unwrap_or("stdin")
}
