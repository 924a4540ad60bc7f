use std::sync::OnceLock;

use chrono::{DateTime, Utc};

macro_rules! env_config {
    ($name:ident, $env_key:expr, $default:expr) => {
        paste::paste! {
            pub static [<CLEANUP_ $name>]: ::std::sync::LazyLock<&'static str> = ::std::sync::LazyLock::new(|| {
                ::std::boxed::Box::leak(
                    ::std::env::var($env_key)
                        .unwrap_or_else(|_| $default.to_string())
                        .into_boxed_str()
                )
            });
        }
    };
    ($name:ident, $default:expr) => {
        paste::paste! {
            env_config!($name, stringify!([<CLEANUP_ $name>]), $default);
        }
    };
}

env_config!(HOST, "localhost");
env_config!(PORT, "8080");
env_config!(API_KEY, "");
env_config!(DATABASE_URL, "sqlite://exports.db?mode=rwc");
env_config!(BLOBSTORE_URL, "file:///var/lib/exports");
env_config!(EXPORT_TIMEOUT, "5m");
env_config!(EXPORT_TTL, "336h");
env_config!(EXPORT_WORKERS, "4");
// 留空则不启用进程内定时清理
env_config!(SCHEDULE, "");

pub static STARTED_AT: OnceLock<DateTime<Utc>> = OnceLock::new();

pub fn init_started_at() {
    let _ = STARTED_AT.set(Utc::now());
}
