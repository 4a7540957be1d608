use std::env;

fn main() {
    dotenvy::dotenv().ok();
    println!("cargo:rerun-if-changed=.env");

    ["SQLX_OFFLINE", "ORBITCACHE_FALLBACK_TLE_LINE1", "ORBITCACHE_FALLBACK_TLE_LINE2"]
        .into_iter()
        .for_each(|key| {
            println!("cargo:rerun-if-env-changed={}", key);
            if let Ok(val) = env::var(key) {
                println!("cargo:rustc-env={}={}", key, val);
            }
        });
}
