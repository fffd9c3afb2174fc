mod read;
mod types;
mod write;

use super::PostgresRepositories;

/// Columns selected for a [`crate::domain::entities::PostRecord`], with `p`
/// aliasing `posts` and `c` aliasing `categories`.
const POST_COLUMNS: &str = "p.id, p.title, p.body, p.category_id, c.name AS category_name, \
     p.created_at, p.updated_at";

impl PostgresRepositories {
    /// `SELECT` over `source` aliased as `p`, joined to its category.
    fn posts_select_from(source: &str) -> String {
        format!(
            "SELECT {POST_COLUMNS} FROM {source} p \
             INNER JOIN categories c ON c.id = p.category_id"
        )
    }

    fn posts_select_prefix() -> String {
        Self::posts_select_from("posts")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_and_writes_select_the_same_columns() {
        let read = PostgresRepositories::posts_select_prefix();
        let written = PostgresRepositories::posts_select_from("written");

        assert_eq!(
            read.replacen("FROM posts p", "FROM written p", 1),
            written
        );
        assert!(written.starts_with(&format!("SELECT {POST_COLUMNS} FROM written p")));
    }
}
