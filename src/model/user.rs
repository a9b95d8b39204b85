use chrono::{DateTime, Duration, Utc};

/// A registered account
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub last_username_change: Option<DateTime<Utc>>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Whole days left before the username may change again (0 = now).
    pub fn days_until_username_change(&self, now: DateTime<Utc>, cooldown_days: u32) -> i64 {
        let Some(last) = self.last_username_change else {
            return 0;
        };
        let cooldown = Duration::days(i64::from(cooldown_days));
        let Some(allowed_at) = last.checked_add_signed(cooldown) else {
            return i64::from(cooldown_days);
        };
        let remaining = allowed_at - now;
        if remaining <= Duration::zero() {
            return 0;
        }
        // round partial days up: 13d 1h left reads as 14
        let whole = remaining.num_days();
        if remaining > Duration::days(whole) {
            whole + 1
        } else {
            whole
        }
    }

    pub fn can_change_username(&self, now: DateTime<Utc>, cooldown_days: u32) -> bool {
        self.days_until_username_change(now, cooldown_days) == 0
    }
}

/// Insert payload; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

/// Partial profile update. `email: Some(None)` clears the address.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub username: Option<String>,
    pub email: Option<Option<String>>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}
