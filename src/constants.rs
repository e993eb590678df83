pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const USER_COUNT_PER_PAGE: i64 = 10;
pub const SUBSCRIPTION_COUNT_PER_PAGE: i64 = 10;

/// Usernames that collide with routed sub-paths of the user resource.
pub const RESERVED_USERNAMES: &[&str] = &["me", "set_password", "subscriptions", "subscribe"];

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const NAME_MAX_LENGTH: usize = 150;
pub const RECIPE_NAME_MAX_LENGTH: usize = 200;
pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const PASSWORD_MAX_LENGTH: usize = 128;

pub const SHOPPING_LIST_TITLE: &str = "Shopping ingredient list";
pub const REPORT_LINES_PER_PAGE: usize = 40;
