//! Column types of the Postgres schema

const INITIAL_SCHEMA: &str = include_str!("../migrations/20250101000000_initial_schema.sql");

#[test]
fn text_columns_are_unbounded() {
    // Any value validation accepts must fit its column.
    let schema = INITIAL_SCHEMA.to_ascii_uppercase();
    assert!(!schema.contains("VARCHAR"));
    assert!(!schema.contains("CHARACTER VARYING"));
    assert!(!schema.contains("CHAR("));
}

#[test]
fn user_and_portfolio_contact_columns_are_text() {
    for column in ["email TEXT", "phone TEXT", "username TEXT", "full_name TEXT", "profile_pic TEXT"] {
        assert!(INITIAL_SCHEMA.contains(column), "{}", column);
    }
}
