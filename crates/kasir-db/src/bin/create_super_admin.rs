//! # Create Super Admin
//!
//! Creates the first `super-admin` account, or reports the existing one.
//!
//! ## Usage
//! ```bash
//! # Defaults: "Super Admin" / superadmin / password
//! cargo run -p kasir-db --bin create-super-admin
//!
//! # Custom account
//! cargo run -p kasir-db --bin create-super-admin -- \
//!     --name "Pemilik Toko" --username owner --password rahasia123
//!
//! # Database path (default: $KASIR_DATABASE_PATH or ./kasir.db)
//! cargo run -p kasir-db --bin create-super-admin -- --db ./data/kasir.db
//! ```

use std::env;

use anyhow::{bail, Context};
use kasir_core::{NewUser, UserRole};
use kasir_db::{Database, DbConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

struct Args {
    name: String,
    username: String,
    password: String,
    db_path: String,
}

fn parse_args() -> anyhow::Result<Option<Args>> {
    let mut args = Args {
        name: "Super Admin".to_string(),
        username: "superadmin".to_string(),
        password: "password".to_string(),
        db_path: env::var("KASIR_DATABASE_PATH").unwrap_or_else(|_| "./kasir.db".to_string()),
    };

    let mut iter = env::args().skip(1);
    while let Some(flag) = iter.next() {
        let slot = match flag.as_str() {
            "--name" | "-n" => &mut args.name,
            "--username" | "-u" => &mut args.username,
            "--password" | "-p" => &mut args.password,
            "--db" | "-d" => &mut args.db_path,
            "--help" | "-h" => {
                println!("Kasir POS - Create Super Admin");
                println!();
                println!("Usage: create-super-admin [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --name <NAME>          Display name (default: Super Admin)");
                println!("  -u, --username <USERNAME>  Login name (default: superadmin)");
                println!("  -p, --password <PASSWORD>  Password (default: password)");
                println!("  -d, --db <PATH>            Database file (default: ./kasir.db)");
                println!("  -h, --help                 Show this help message");
                return Ok(None);
            }
            other => bail!("Unknown option: {}", other),
        };
        *slot = iter
            .next()
            .with_context(|| format!("Missing value for {}", flag))?;
    }

    Ok(Some(args))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let Some(args) = parse_args()? else {
        return Ok(());
    };

    let db = Database::new(DbConfig::new(&args.db_path))
        .await
        .with_context(|| format!("Failed to open database at {}", args.db_path))?;

    if let Some(existing) = db.users().find_by_username(&args.username).await? {
        info!(
            username = %existing.username,
            role = existing.role.as_str(),
            "User already exists, nothing to do"
        );
        db.close().await;
        return Ok(());
    }

    let user = db
        .users()
        .create(&NewUser {
            name: args.name,
            username: args.username,
            password: args.password,
            role: UserRole::SuperAdmin,
        })
        .await
        .context("Failed to create super admin")?;

    info!(id = %user.id, username = %user.username, "Super admin created");
    db.close().await;
    Ok(())
}
