//! User rows

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{from_millis, from_millis_opt, to_millis};
use crate::error::Result;
use crate::model::{NewUser, User};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, password_hash, \
     is_active, date_joined, last_login, last_username_change";

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        password_hash: row.get(5)?,
        is_active: row.get(6)?,
        date_joined: from_millis(row.get(7)?)?,
        last_login: from_millis_opt(row.get(8)?)?,
        last_username_change: from_millis_opt(row.get(9)?)?,
    })
}

pub fn insert_user(conn: &Connection, new: &NewUser, now: DateTime<Utc>) -> Result<User> {
    conn.execute(
        "INSERT INTO users (username, email, first_name, last_name, password_hash, date_joined)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            new.username,
            new.email,
            new.first_name,
            new.last_name,
            new.password_hash,
            to_millis(now)
        ],
    )?;
    let id = conn.last_insert_rowid();
    Ok(User {
        id,
        username: new.username.clone(),
        email: new.email.clone(),
        first_name: new.first_name.clone(),
        last_name: new.last_name.clone(),
        password_hash: new.password_hash.clone(),
        is_active: true,
        date_joined: from_millis(to_millis(now))?,
        last_login: None,
        last_username_change: None,
    })
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
    Ok(conn.query_row(&sql, params![id], row_to_user).optional()?)
}

pub fn find_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS);
    Ok(conn
        .query_row(&sql, params![username], row_to_user)
        .optional()?)
}

/// Is `username` held by anyone other than `except_id`?
pub fn username_taken(conn: &Connection, username: &str, except_id: Option<i64>) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE username = ?1 AND id != ?2",
        params![username, except_id.unwrap_or(-1)],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Is `email` held by anyone other than `except_id`?
pub fn email_taken(conn: &Connection, email: &str, except_id: Option<i64>) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE email = ?1 AND id != ?2",
        params![email, except_id.unwrap_or(-1)],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn touch_last_login(conn: &Connection, id: i64, now: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE users SET last_login = ?1 WHERE id = ?2",
        params![to_millis(now), id],
    )?;
    Ok(())
}

pub fn set_active(conn: &Connection, id: i64, active: bool) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE users SET is_active = ?1 WHERE id = ?2",
        params![active, id],
    )?;
    Ok(changed > 0)
}

/// Write back every mutable profile column of `user`.
pub fn save_profile(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "UPDATE users
         SET username = ?1, email = ?2, first_name = ?3, last_name = ?4,
             last_username_change = ?5
         WHERE id = ?6",
        params![
            user.username,
            user.email,
            user.first_name,
            user.last_name,
            user.last_username_change.map(to_millis),
            user.id
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{lock, open_in_memory};

    fn new_user(username: &str, email: Option<&str>) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.map(str::to_string),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password_hash: "$argon2id$stub".to_string(),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = open_in_memory().unwrap();
        let conn = lock(&db).unwrap();
        let now = Utc::now();

        let user = insert_user(&conn, &new_user("ada", Some("ada@example.com")), now).unwrap();
        assert!(user.is_active);

        let by_id = find_by_id(&conn, user.id).unwrap().unwrap();
        assert_eq!(by_id, user);
        let by_name = find_by_username(&conn, "ada").unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert!(find_by_username(&conn, "grace").unwrap().is_none());
    }

    #[test]
    fn test_uniqueness_checks_exclude_self() {
        let db = open_in_memory().unwrap();
        let conn = lock(&db).unwrap();
        let ada = insert_user(&conn, &new_user("ada", Some("ada@example.com")), Utc::now()).unwrap();

        assert!(username_taken(&conn, "ada", None).unwrap());
        assert!(!username_taken(&conn, "ada", Some(ada.id)).unwrap());
        assert!(email_taken(&conn, "ada@example.com", None).unwrap());
        assert!(!email_taken(&conn, "ada@example.com", Some(ada.id)).unwrap());
        assert!(!email_taken(&conn, "grace@example.com", None).unwrap());
    }

    #[test]
    fn test_users_without_email_do_not_collide() {
        let db = open_in_memory().unwrap();
        let conn = lock(&db).unwrap();
        insert_user(&conn, &new_user("ada", None), Utc::now()).unwrap();
        insert_user(&conn, &new_user("grace", None), Utc::now()).unwrap();
    }

    #[test]
    fn test_save_profile_and_deactivate() {
        let db = open_in_memory().unwrap();
        let conn = lock(&db).unwrap();
        let now = Utc::now();
        let mut user = insert_user(&conn, &new_user("ada", None), now).unwrap();

        user.username = "ada_l".to_string();
        user.last_username_change = Some(from_millis(to_millis(now)).unwrap());
        save_profile(&conn, &user).unwrap();
        assert!(set_active(&conn, user.id, false).unwrap());

        let stored = find_by_id(&conn, user.id).unwrap().unwrap();
        assert_eq!(stored.username, "ada_l");
        assert_eq!(stored.last_username_change, user.last_username_change);
        assert!(!stored.is_active);
    }
}
