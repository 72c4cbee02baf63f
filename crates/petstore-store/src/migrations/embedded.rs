//! Migrations embedded with include_str!

pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// All migrations, in the order they must be applied
pub fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_initial_schema",
        sql: include_str!("../../migrations/001_initial_schema.sql"),
    }]
}
