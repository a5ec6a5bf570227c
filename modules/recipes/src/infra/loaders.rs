//! Catalogue files for the bulk loaders: ingredients as CSV
//! (`name,measurement_unit` with a header row) or JSON, tags as JSON.

use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;

use crate::contract::model::{NewIngredient, NewTag};

#[derive(Debug, Deserialize)]
struct IngredientRecord {
    name: String,
    measurement_unit: String,
}

#[derive(Debug, Deserialize)]
struct TagRecord {
    name: String,
    color: String,
    slug: String,
}

/// Read ingredients from a `.csv` or `.json` file.
pub fn read_ingredients(path: &Path) -> anyhow::Result<Vec<NewIngredient>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    match extension(path).as_deref() {
        Some("csv") => parse_ingredients_csv(&raw),
        Some("json") => parse_ingredients_json(&raw),
        _ => bail!(
            "unsupported ingredients file '{}': expected .csv or .json",
            path.display()
        ),
    }
    .with_context(|| format!("failed to parse {}", path.display()))
}

/// Read tags from a `.json` file.
pub fn read_tags(path: &Path) -> anyhow::Result<Vec<NewTag>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let records: Vec<TagRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(records
        .into_iter()
        .map(|r| NewTag {
            name: r.name,
            color: r.color,
            slug: r.slug,
        })
        .collect())
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

fn parse_ingredients_json(raw: &str) -> anyhow::Result<Vec<NewIngredient>> {
    let records: Vec<IngredientRecord> = serde_json::from_str(raw)?;
    Ok(records
        .into_iter()
        .map(|r| NewIngredient {
            name: r.name,
            measurement_unit: r.measurement_unit,
        })
        .collect())
}

fn parse_ingredients_csv(raw: &str) -> anyhow::Result<Vec<NewIngredient>> {
    let mut out = Vec::new();
    // first line is the header
    for (idx, line) in raw.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_csv_line(line).with_context(|| format!("line {}", idx + 1))?;
        match fields.as_slice() {
            [name, unit] => out.push(NewIngredient {
                name: name.trim().to_string(),
                measurement_unit: unit.trim().to_string(),
            }),
            _ => bail!("line {}: expected 2 fields, got {}", idx + 1, fields.len()),
        }
    }
    Ok(out)
}

/// Split one CSV record, honouring double-quoted fields with `""` escapes.
fn split_csv_line(line: &str) -> anyhow::Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if field.is_empty() => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    if in_quotes {
        bail!("unterminated quoted field");
    }
    fields.push(field);
    Ok(fields)
}
