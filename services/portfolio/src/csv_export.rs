//! CSV exports of members and their portfolios

use chrono::{DateTime, Utc};

use crate::models::{Portfolio, User};

pub const USERS_HEADER: [&str; 6] = ["ID", "Username", "Email", "Phone", "Date Joined", "Last Login"];

pub const PORTFOLIOS_HEADER: [&str; 14] = [
    "User ID",
    "Username",
    "Full Name",
    "Company Name",
    "Job Title",
    "Email",
    "Phone",
    "Skills",
    "LinkedIn URL",
    "GitHub URL",
    "Twitter URL",
    "Project 1",
    "Project 2",
    "Project 3",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Quote a field when it contains a delimiter, quote or line break
pub fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn push_row<S: AsRef<str>>(out: &mut String, cells: &[S]) {
    let row: Vec<String> = cells.iter().map(|c| csv_escape(c.as_ref())).collect();
    out.push_str(&row.join(","));
    out.push_str("\r\n");
}

/// Attachment name for an export taken at `now`
pub fn export_filename(kind: &str, now: DateTime<Utc>) -> String {
    format!("{}_export_{}.csv", kind, now.format("%Y%m%d_%H%M%S"))
}

pub fn users_csv(users: &[User]) -> String {
    let mut out = String::new();
    push_row(&mut out, &USERS_HEADER);

    for user in users {
        push_row(
            &mut out,
            &[
                user.id.to_string(),
                user.username.clone(),
                user.email.clone(),
                user.phone
                    .clone()
                    .filter(|p| !p.is_empty())
                    .unwrap_or_else(|| "Not provided".to_string()),
                user.created_at.format(TIMESTAMP_FORMAT).to_string(),
                user.last_login
                    .map(|at| at.format(TIMESTAMP_FORMAT).to_string())
                    .unwrap_or_else(|| "Never".to_string()),
            ],
        );
    }

    out
}

/// Skills as a comma separated list, or the raw stored value when it is not
/// an encoded list
fn skills_cell(portfolio: &Portfolio) -> String {
    match serde_json::from_str::<Vec<String>>(&portfolio.skills) {
        Ok(skills) => skills.join(", "),
        Err(_) => portfolio.skills.clone(),
    }
}

pub fn portfolios_csv(rows: &[(User, Portfolio)]) -> String {
    let mut out = String::new();
    push_row(&mut out, &PORTFOLIOS_HEADER);

    for (user, portfolio) in rows {
        let mut cells = vec![
            user.id.to_string(),
            user.username.clone(),
            portfolio.full_name.clone(),
            portfolio.company_name.clone(),
            portfolio.job_title.clone(),
            portfolio.email.clone(),
            portfolio.phone.clone(),
            skills_cell(portfolio),
            portfolio.linkedin_url.clone(),
            portfolio.github_url.clone(),
            portfolio.twitter_url.clone(),
        ];
        cells.extend(
            portfolio
                .projects()
                .iter()
                .map(|p| format!("{}: {}", p.title, p.desc)),
        );
        push_row(&mut out, &cells);
    }

    out
}
