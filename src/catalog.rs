//! Catalog ingestion.
//!
//! The catalog is a plain `name,price,weight` file, one item per line.
//! Fields may be wrapped in double quotes, which allows commas inside a name;
//! a doubled quote inside a quoted field stands for one quote character.
//! Records that cannot describe a shippable item are skipped with a warning.

use std::fs;
use std::path::Path;

use log::{debug, warn};
use thiserror::Error;

use crate::model::ItemSpec;
use crate::types::{Grams, Money};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Could not read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Reads the catalog file at `path`.
pub fn read_catalog(path: &Path) -> Result<Vec<ItemSpec>, CatalogError> {
    let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_catalog(&raw))
}

/// Parses catalog records from text.
pub fn parse_catalog(raw: &str) -> Vec<ItemSpec> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(idx, line)| match parse_record(line) {
            Ok(spec) => Some(spec),
            Err(reason) => {
                // A header row is the usual culprit on the first line.
                if idx == 0 {
                    debug!("Skipping catalog line 1 ('{}'): {}", line, reason);
                } else {
                    warn!("⚠️ Skipping catalog line {} ('{}'): {}", idx + 1, line, reason);
                }
                None
            }
        })
        .collect()
}

/// Splits one record into trimmed fields, honouring double quotes.
fn split_fields(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut field).trim().to_string()),
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(field.trim().to_string());
    Ok(fields)
}

fn parse_record(line: &str) -> Result<ItemSpec, String> {
    let fields = split_fields(line)?;
    let mut fields = fields.iter().map(String::as_str);
    let name = fields.next().unwrap_or_default();
    if name.is_empty() {
        return Err("empty name".to_string());
    }

    let price_raw = fields.next().ok_or("missing price")?;
    let price = price_raw
        .parse::<Money>()
        .map_err(|err| format!("price '{}': {}", price_raw, err))?;
    if !price.is_finite() || price < 0.0 {
        return Err(format!("price '{}' is negative or not finite", price_raw));
    }

    let weight_raw = fields.next().ok_or("missing weight")?;
    let weight = weight_raw
        .parse::<Grams>()
        .map_err(|err| format!("weight '{}': {}", weight_raw, err))?;

    Ok(ItemSpec::new(name, price, weight))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_records_in_order() {
        let items = parse_catalog("Item 1,10,200\nItem 2,100.5,20\n");
        assert_eq!(
            items,
            vec![
                ItemSpec::new("Item 1", 10.0, 200),
                ItemSpec::new("Item 2", 100.5, 20),
            ]
        );
    }

    #[test]
    fn skips_header_and_malformed_rows() {
        let raw = "name,price,weight\n\
                   Good,1,1\n\
                   ,5,5\n\
                   Negative,-1,10\n\
                   Heavy,1,-10\n\
                   Short,3\n\
                   \n\
                   \"Quoted\", 2.5 , 30\n";
        let items = parse_catalog(raw);
        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Good", "Quoted"]);
        assert_eq!(items[1].weight, 30);
    }

    #[test]
    fn quoted_names_may_contain_commas() {
        let raw = "\"Bolts, M8\",4.5,120\n\
                   \"The \"\"Big\"\" One\",9,900\n\
                   \"Open quote,1,1\n";
        let items = parse_catalog(raw);
        assert_eq!(
            items,
            vec![
                ItemSpec::new("Bolts, M8", 4.5, 120),
                ItemSpec::new("The \"Big\" One", 9.0, 900),
            ]
        );
    }

    #[test]
    fn split_fields_trims_around_quotes() {
        assert_eq!(
            split_fields(" \"a, b\" , 1 ,2").unwrap(),
            ["a, b", "1", "2"]
        );
        assert!(split_fields("\"never closed").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read_catalog(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.csv"));
    }
}
