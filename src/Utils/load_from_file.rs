use log::{error, info, warn};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Input file made of sections: an all-uppercase header line (e.g. `BIOFILM`,
/// `SIMULATION`) followed by a JSON document that runs up to the next header.
pub struct LoadData {
    pub file_name: String,
}

impl LoadData {
    pub fn new(file_name: String) -> Self {
        LoadData { file_name }
    }
    /// whole file as a single JSON document
    pub fn load<T: DeserializeOwned>(&self) -> Result<T, String> {
        let lines = read_lines(&self.file_name)?;
        parse_with_location(&lines, 0, lines.len(), &self.file_name, "document")
    }
    /// the section under the first of `headers` present in the file
    pub fn load_section<T: DeserializeOwned>(&self, headers: &[&str]) -> Result<T, String> {
        load_section_from_file(&self.file_name, headers)
    }
    pub fn has_section(&self, headers: &[&str]) -> Result<bool, String> {
        let lines = read_lines(&self.file_name)?;
        Ok(find_section(&lines, headers).is_some())
    }
}

fn read_lines(file_name: &str) -> Result<Vec<String>, String> {
    let path = Path::new(file_name);
    if !path.exists() {
        return Err(format!("File '{}' does not exist", file_name));
    }

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => return Err(format!("Failed to open file '{}': {}", file_name, e)),
    };

    let reader = BufReader::new(file);
    Ok(reader.lines().map_while(Result::ok).collect())
}

fn is_header(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_uppercase() || c == '_' || c == ' ')
}

/// (first line of the section body, line after its last line)
fn find_section(lines: &[String], headers: &[&str]) -> Option<(usize, usize)> {
    let start_index = lines
        .iter()
        .position(|line| headers.iter().any(|h| line.trim().to_uppercase() == *h))?
        + 1;
    let end_index = (start_index..lines.len())
        .find(|&i| is_header(&lines[i]))
        .unwrap_or(lines.len());
    Some((start_index, end_index))
}

/// Parses the JSON section under one of `headers`; reports the failing line on error.
pub fn load_section_from_file<T: DeserializeOwned>(file_name: &str, headers: &[&str]) -> Result<T, String> {
    let lines = read_lines(file_name)?;
    let (start_index, end_index) = match find_section(&lines, headers) {
        Some(range) => range,
        None => {
            return Err(format!(
                "No '{}' header found in file '{}'",
                headers.join("' or '"),
                file_name
            ));
        }
    };
    if start_index == end_index {
        warn!("Section '{}' in file '{}' is empty", headers.join("/"), file_name);
    }
    parse_with_location(&lines, start_index, end_index, file_name, &headers.join("/"))
}

fn parse_with_location<T: DeserializeOwned>(
    lines: &[String],
    start_index: usize,
    end_index: usize,
    file_name: &str,
    what: &str,
) -> Result<T, String> {
    let section = lines[start_index..end_index].join("\n");
    match serde_json::from_str::<T>(&section) {
        Ok(data) => {
            info!("Successfully parsed {} data from file '{}'", what, file_name);
            Ok(data)
        }
        Err(e) => {
            let error_line = e.line();
            let error_column = e.column();
            // serde counts from 1 inside the section
            let actual_line = start_index + error_line.max(1) - 1;

            let error_msg = format!(
                "Error parsing {} data at line {}, column {} (line {} in file): {}",
                what,
                error_line,
                error_column,
                actual_line + 1,
                e
            );
            error!("{}", error_msg);

            if actual_line < lines.len() {
                let problem_line = &lines[actual_line];
                error!("Problematic line: {}", problem_line);
                if error_column >= 1 && error_column <= problem_line.len() {
                    let pointer = " ".repeat(error_column - 1) + "^";
                    error!("{}", pointer);
                }
            }

            Err(error_msg)
        }
    }
}
