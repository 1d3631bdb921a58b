mod login_db;

pub use login_db::LoginDb;
