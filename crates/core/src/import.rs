//! Bulk task import from CSV.
//!
//! The first record is a header row. Column names are matched
//! case-insensitively; only `name` is required. Rows that fail validation are
//! reported and skipped so one bad line does not sink the whole file.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::task::{DESCRIPTION_MAX, NAME_MAX, Priority, TaskStatus};
use crate::time::parse_date;
use crate::CoreError;

/// Upper bound on data rows accepted in one import.
pub const MAX_IMPORT_ROWS: usize = 1000;

/// A validated row ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedTask {
    /// 1-based line number in the file (the header is line 1).
    pub row: usize,
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub assignee_email: Option<String>,
    pub estimated_hours: Option<f64>,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct ParsedImport {
    pub tasks: Vec<ImportedTask>,
    pub errors: Vec<RowError>,
}

#[derive(Debug, Default)]
struct Columns {
    name: usize,
    description: Option<usize>,
    status: Option<usize>,
    priority: Option<usize>,
    due_date: Option<usize>,
    assignee_email: Option<usize>,
    estimated_hours: Option<usize>,
    labels: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, CoreError> {
        let find = |aliases: &[&str]| {
            headers.iter().position(|h| {
                let h = h.trim().to_ascii_lowercase().replace([' ', '-'], "_");
                aliases.contains(&h.as_str())
            })
        };
        Ok(Self {
            name: find(&["name", "title", "task", "task_name"])
                .ok_or(CoreError::MissingColumn("name"))?,
            description: find(&["description", "details"]),
            status: find(&["status"]),
            priority: find(&["priority"]),
            due_date: find(&["due_date", "due"]),
            assignee_email: find(&["assignee_email", "assignee"]),
            estimated_hours: find(&["estimated_hours", "estimate", "hours"]),
            labels: find(&["labels", "tags"]),
        })
    }
}

fn cell(record: &csv::StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_row(
    record: &csv::StringRecord,
    cols: &Columns,
    row: usize,
) -> Result<ImportedTask, String> {
    let name = cell(record, Some(cols.name)).ok_or("name is required")?;
    if name.chars().count() > NAME_MAX {
        return Err(format!("name must be at most {NAME_MAX} characters"));
    }
    let description = cell(record, cols.description);
    if description.is_some_and(|d| d.chars().count() > DESCRIPTION_MAX) {
        return Err(format!("description must be at most {DESCRIPTION_MAX} characters"));
    }

    let status = cell(record, cols.status)
        .map(str::parse::<TaskStatus>)
        .transpose()
        .map_err(|e| e.to_string())?
        .unwrap_or_default();
    let priority = cell(record, cols.priority)
        .map(str::parse::<Priority>)
        .transpose()
        .map_err(|e| e.to_string())?
        .unwrap_or_default();
    let due_date = cell(record, cols.due_date)
        .map(parse_date)
        .transpose()
        .map_err(|e| e.to_string())?;

    let estimated_hours = match cell(record, cols.estimated_hours) {
        Some(raw) => {
            let hours: f64 = raw
                .parse()
                .map_err(|_| format!("invalid estimated_hours '{raw}'"))?;
            if !hours.is_finite() || hours < 0.0 {
                return Err(format!("invalid estimated_hours '{raw}'"));
            }
            Some(hours)
        }
        None => None,
    };

    let labels = cell(record, cols.labels)
        .map(|raw| {
            raw.split([',', ';'])
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Ok(ImportedTask {
        row,
        name: name.to_string(),
        description: description.map(String::from),
        status,
        priority,
        due_date,
        assignee_email: cell(record, cols.assignee_email).map(|e| e.to_lowercase()),
        estimated_hours,
        labels,
    })
}

/// Parse a CSV document into importable tasks and per-row errors.
///
/// Fails as a whole only when the header is unusable, the CSV is malformed,
/// or the file exceeds [`MAX_IMPORT_ROWS`].
pub fn parse_tasks_csv(input: &str) -> Result<ParsedImport, CoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input.trim_start_matches('\u{feff}').as_bytes());

    let cols = Columns::from_headers(reader.headers()?)?;

    let records: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;
    let records: Vec<(usize, csv::StringRecord)> = records
        .into_iter()
        .enumerate()
        .map(|(i, r)| (i + 2, r))
        .filter(|(_, r)| r.iter().any(|c| !c.trim().is_empty()))
        .collect();

    if records.len() > MAX_IMPORT_ROWS {
        return Err(CoreError::TooManyRows {
            count: records.len(),
            max: MAX_IMPORT_ROWS,
        });
    }

    let mut parsed = ParsedImport::default();
    for (row, record) in &records {
        match parse_row(record, &cols, *row) {
            Ok(task) => parsed.tasks.push(task),
            Err(error) => parsed.errors.push(RowError { row: *row, error }),
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_file() {
        let parsed = parse_tasks_csv("name\nWrite docs\nShip release\n").unwrap();
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.tasks.len(), 2);
        assert_eq!(parsed.tasks[0].row, 2);
        assert_eq!(parsed.tasks[0].status, TaskStatus::Todo);
        assert_eq!(parsed.tasks[0].priority, Priority::Medium);
        assert_eq!(parsed.tasks[1].name, "Ship release");
    }

    #[test]
    fn test_parse_full_row_with_display_labels() {
        let csv = "Name,Status,Priority,Due Date,Assignee Email,Estimated Hours,Labels\n\
                   \"Fix login, again\",In Progress,high,2024-06-01,Ann@Example.com,2.5,\"auth; backend\"\n";
        let parsed = parse_tasks_csv(csv).unwrap();
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let t = &parsed.tasks[0];
        assert_eq!(t.name, "Fix login, again");
        assert_eq!(t.status, TaskStatus::InProgress);
        assert_eq!(t.priority, Priority::High);
        assert_eq!(t.due_date, NaiveDate::from_ymd_opt(2024, 6, 1));
        assert_eq!(t.assignee_email.as_deref(), Some("ann@example.com"));
        assert_eq!(t.estimated_hours, Some(2.5));
        assert_eq!(t.labels, vec!["auth".to_string(), "backend".to_string()]);
    }

    #[test]
    fn test_bad_rows_are_reported_and_skipped() {
        let csv = "name,status,due_date,estimated_hours\n\
                   ok,todo,,\n\
                   ,todo,,\n\
                   bad status,blocked,,\n\
                   bad date,todo,tomorrow,\n\
                   bad hours,todo,,-1\n";
        let parsed = parse_tasks_csv(csv).unwrap();
        assert_eq!(parsed.tasks.len(), 1);
        let rows: Vec<usize> = parsed.errors.iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![3, 4, 5, 6]);
        assert_eq!(parsed.errors[0].error, "name is required");
    }

    #[test]
    fn test_length_limits_match_task_creation() {
        let csv = format!(
            "name,description\n{},\n{},\nshort,{}\n",
            "a".repeat(NAME_MAX),
            "b".repeat(NAME_MAX + 1),
            "c".repeat(DESCRIPTION_MAX + 1),
        );
        let parsed = parse_tasks_csv(&csv).unwrap();
        assert_eq!(parsed.tasks.len(), 1);
        assert_eq!(parsed.tasks[0].row, 2);
        assert_eq!(parsed.errors[0].row, 3);
        assert_eq!(parsed.errors[0].error, "name must be at most 200 characters");
        assert_eq!(parsed.errors[1].row, 4);
        assert_eq!(
            parsed.errors[1].error,
            "description must be at most 5000 characters"
        );
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let parsed = parse_tasks_csv("name,status\nfirst,todo\n,\nsecond,done\n").unwrap();
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.tasks.len(), 2);
        assert_eq!(parsed.tasks[1].row, 4);
    }

    #[test]
    fn test_missing_name_column_fails() {
        let err = parse_tasks_csv("status,priority\ntodo,low\n").unwrap_err();
        assert_eq!(err, CoreError::MissingColumn("name"));
    }

    #[test]
    fn test_row_limit() {
        let mut csv = String::from("name\n");
        for i in 0..=MAX_IMPORT_ROWS {
            csv.push_str(&format!("task {i}\n"));
        }
        assert!(matches!(
            parse_tasks_csv(&csv),
            Err(CoreError::TooManyRows { .. })
        ));
    }
}
