/// Database row types — these map directly to SQLite rows.
/// Distinct from lightbox-types models so the password hash never leaves this layer by accident.
use lightbox_types::models::User;

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub hashed_password: String,
    pub created_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
        }
    }
}
