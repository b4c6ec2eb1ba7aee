use std::collections::HashMap;

use crate::types::{normalize_email, Member};

/// Column layout A..F of the members tab.
pub const MEMBER_HEADERS: [&str; 6] = ["NAME", "LAW FIRM", "E-MAIL", "PHONE", "COUNTRY", "GROUP"];
pub const GROUP_HEADERS: [&str; 1] = ["GROUP"];

/// First data row (1-based, below the header).
pub const FIRST_DATA_ROW: usize = 2;

pub type Row = Vec<String>;

/// True when the first cells of `row` spell out `expected`, ignoring case and
/// surrounding whitespace.
pub fn header_matches(row: &[String], expected: &[&str]) -> bool {
    expected.iter().enumerate().all(|(i, h)| {
        row.get(i)
            .map(|cell| cell.trim().eq_ignore_ascii_case(h))
            .unwrap_or(false)
    })
}

pub fn split_groups(cell: &str) -> Vec<String> {
    cell.split([',', ';'])
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_groups(groups: &[String]) -> String {
    groups
        .iter()
        .map(|g| g.trim())
        .filter(|g| !g.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn member_to_row(member: &Member) -> Row {
    vec![
        member.name.trim().to_string(),
        member.law_firm.trim().to_string(),
        normalize_email(&member.email),
        member.phone.as_deref().unwrap_or_default().trim().to_string(),
        member.country.trim().to_string(),
        join_groups(&member.groups),
    ]
}

pub fn row_to_member(row: &[String]) -> Member {
    let cell = |i: usize| row.get(i).map(|c| c.trim().to_string()).unwrap_or_default();
    let phone = cell(3);
    Member {
        name: cell(0),
        law_firm: cell(1),
        email: normalize_email(&cell(2)),
        phone: if phone.is_empty() { None } else { Some(phone) },
        country: cell(4),
        groups: split_groups(&cell(5)),
    }
}

pub fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

/// Map normalized email -> sheet row number, scanning top to bottom.
///
/// `column` holds the email cells starting at `FIRST_DATA_ROW`. When an email
/// appears more than once the first row wins; later rows are never addressed.
pub fn email_row_index(column: &[Row]) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (i, row) in column.iter().enumerate() {
        let email = normalize_email(row.first().map(String::as_str).unwrap_or_default());
        if email.is_empty() {
            continue;
        }
        index.entry(email).or_insert(i + FIRST_DATA_ROW);
    }
    index
}

/// Rows that repeat an email already seen higher up, as (email, row number).
pub fn duplicate_email_rows(column: &[Row]) -> Vec<(String, usize)> {
    let index = email_row_index(column);
    column
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let email = normalize_email(row.first().map(String::as_str).unwrap_or_default());
            let row_number = i + FIRST_DATA_ROW;
            match index.get(&email) {
                Some(&first) if first != row_number => Some((email, row_number)),
                _ => None,
            }
        })
        .collect()
}
