// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PiplMesh auth operator tool.
//!
//! Runs the authentication backends against the configured user store
//! from the command line: provision guests, check password logins, look
//! up users and manage passwords.

use clap::{Parser, Subcommand};
use piplmesh_auth::{
    backends::{BackendKind, Credentials},
    config::Config,
    db::UserStore,
    models::User,
    request::RequestContext,
    AppState,
};

#[derive(Parser, Debug)]
#[command(name = "piplmesh-auth", about = "Manage PiplMesh users and test logins.")]
struct Cli {
    /// Host used to build OAuth callback URIs
    #[arg(long, default_value = "localhost:8000")]
    host: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a guest user
    Guest,
    /// Check a username/password pair
    Login { username: String, password: String },
    /// Create a user with a password
    CreateUser { username: String, password: String },
    /// Set the password of an existing user
    SetPassword { username: String, password: String },
    /// Look up a user by ID through a backend
    GetUser {
        id: String,
        #[arg(long, default_value = "password", value_parser = parse_backend)]
        backend: BackendKind,
    },
}

fn parse_backend(s: &str) -> Result<BackendKind, String> {
    serde_json::from_value(serde_json::Value::String(s.to_lowercase()))
        .map_err(|_| format!("Unknown backend '{}'", s))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    piplmesh_auth::logging::init();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    let state = AppState::from_config(config).await?;
    let request = RequestContext::new("http", cli.host.clone());

    match cli.command {
        Commands::Guest => {
            let resolved = state
                .authenticator
                .authenticate(&Credentials::Guest, &request)
                .await?;
            match resolved {
                Some(auth) => print_user(&auth.user)?,
                None => eprintln!("Guest backend not configured"),
            }
        }
        Commands::Login { username, password } => {
            let credentials = Credentials::Password { username, password };
            match state.authenticator.authenticate(&credentials, &request).await? {
                Some(auth) => print_user(&auth.user)?,
                None => {
                    eprintln!("Authentication failed");
                    std::process::exit(1);
                }
            }
        }
        Commands::CreateUser { username, password } => {
            let mut user = User::new(username);
            user.set_password(&password)?;
            state.store.create_user(&user).await?;
            print_user(&user)?;
        }
        Commands::SetPassword { username, password } => {
            let Some(mut user) = state.store.find_by_username(&username).await? else {
                eprintln!("No such user: {}", username);
                std::process::exit(1);
            };
            user.set_password(&password)?;
            state.store.save_user(&user).await?;
            tracing::info!(user_id = %user.id, "Password updated");
        }
        Commands::GetUser { id, backend } => {
            match state.authenticator.get_user(backend, &id).await? {
                Some(user) => print_user(&user)?,
                None => {
                    eprintln!("No such user: {}", id);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

/// Print a user as JSON, without the password hash.
fn print_user(user: &User) -> Result<(), serde_json::Error> {
    let mut shown = user.clone();
    shown.password = None;
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}
