//! Moments CLI - Command-line interface
//!
//! Usage:
//!   moments login --email <email> [--admin]
//!   moments register --name <name> --email <email> [--role author]
//!   moments whoami | status | logout
//!   moments blogs list [--mine]
//!   moments blogs toggle <id>
//!   moments dashboard

use anyhow::Context;
use clap::{Parser, Subcommand};
use moments_client::{ApiClient, FileStorage, Session};
use moments_core::Role;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "moments")]
#[command(about = "Moments blog platform CLI")]
#[command(version)]
struct Cli {
    /// API base URL
    #[arg(long, env = "MOMENTS_API_URL", default_value = "http://localhost:5000")]
    api_url: String,

    /// File holding the persisted session
    #[arg(long, env = "MOMENTS_SESSION_FILE", default_value = ".moments-session.json")]
    session_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "MOMENTS_PASSWORD", hide_env_values = true)]
        password: String,
        /// Use the administrator login
        #[arg(long)]
        admin: bool,
    },
    /// Create an account and sign in with it
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "MOMENTS_PASSWORD", hide_env_values = true)]
        password: String,
        /// reader (default) or author
        #[arg(long)]
        role: Option<Role>,
    },
    /// Forget the stored session
    Logout,
    /// Show the stored session without contacting the server
    Whoami,
    /// Check the session against the server
    Status,
    /// Blog posts
    Blogs {
        #[command(subcommand)]
        action: BlogAction,
    },
    /// Admin dashboard counts
    Dashboard,
}

#[derive(Subcommand)]
enum BlogAction {
    /// List published posts, or your own with --mine
    List {
        #[arg(long)]
        mine: bool,
    },
    /// Publish or unpublish a post
    Toggle { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let storage = Arc::new(FileStorage::new(&cli.session_file));
    let session = Session::hydrate(storage)
        .await
        .with_context(|| format!("Failed to read session from {}", cli.session_file.display()))?;
    let client = ApiClient::new(&cli.api_url, Arc::new(session));

    let result = run(&client, cli.command).await;

    for notice in client.session().take_notices().await {
        eprintln!("{notice}");
    }

    result
}

async fn run(client: &ApiClient, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Login {
            email,
            password,
            admin,
        } => {
            let profile = if admin {
                client.admin_login(&email, &password).await?
            } else {
                client.login(&email, &password).await?
            };
            println!("Signed in as {} ({})", profile.email, profile.role);
        }
        Commands::Register {
            name,
            email,
            password,
            role,
        } => {
            let profile = client.register(&name, &email, &password, role).await?;
            println!("Registered {} ({})", profile.email, profile.role);
        }
        Commands::Logout => {
            client.logout().await?;
            println!("Signed out");
        }
        Commands::Whoami => match client.session().profile().await {
            Some(profile) => println!("{} <{}> ({})", profile.name, profile.email, profile.role),
            None if client.session().is_authenticated().await => {
                println!("Signed in (profile not cached)")
            }
            None => println!("Not signed in"),
        },
        Commands::Status => {
            let profile = client.refresh_profile().await?;
            println!("Session valid for {} ({})", profile.email, profile.role);
        }
        Commands::Blogs { action } => match action {
            BlogAction::List { mine } => {
                let blogs = if mine {
                    client.my_blogs().await?
                } else {
                    client.published_blogs().await?
                };
                for blog in blogs {
                    let state = if blog.is_published { "published" } else { "draft" };
                    println!("{}  [{}]  {}  by {}", blog.id, state, blog.title, blog.author);
                }
            }
            BlogAction::Toggle { id } => {
                let blog = client.toggle_publish(&id).await?;
                let state = if blog.is_published { "published" } else { "draft" };
                println!("{} is now {}", blog.title, state);
            }
        },
        Commands::Dashboard => {
            let dashboard = client.dashboard().await?;
            println!("Blogs:    {}", dashboard.blogs);
            println!("Comments: {}", dashboard.comments);
            println!("Drafts:   {}", dashboard.drafts);
            for blog in dashboard.recent_blogs {
                println!("  {}  {}", blog.id, blog.title);
            }
        }
    }

    Ok(())
}
