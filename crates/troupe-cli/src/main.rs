mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    claude_md::ClaudeMdSubcommand, config::ConfigSubcommand, mcp::McpSubcommand,
    project::ProjectSubcommand, scene::SceneSubcommand, skill::SkillSubcommand,
    trash::TrashSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "troupe",
    about = "Catalogue Claude skills, MCP servers and CLAUDE.md files; bundle them into scenes and launch projects with them",
    version,
    propagate_version = true
)]
struct Cli {
    /// Registry root (default: ~/.troupe)
    #[arg(long, global = true, env = "TROUPE_HOME")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan Claude Code's configuration for importable skills and MCP servers
    Detect,

    /// Copy detected items into the registry (sources are never modified)
    Import {
        /// Import everything detected
        #[arg(long)]
        all: bool,

        /// Import a detected skill by name (repeatable)
        #[arg(long = "skill")]
        skills: Vec<String>,

        /// Import a detected MCP server by name (repeatable)
        #[arg(long = "mcp")]
        mcps: Vec<String>,
    },

    /// Manage skills
    Skill {
        #[command(subcommand)]
        subcommand: SkillSubcommand,
    },

    /// Manage MCP servers
    Mcp {
        #[command(subcommand)]
        subcommand: McpSubcommand,
    },

    /// Manage CLAUDE.md files
    ClaudeMd {
        #[command(subcommand)]
        subcommand: ClaudeMdSubcommand,
    },

    /// Manage scenes (bundles of skills, MCP servers and CLAUDE.md files)
    Scene {
        #[command(subcommand)]
        subcommand: SceneSubcommand,
    },

    /// Manage projects (directories bound to scenes)
    Project {
        #[command(subcommand)]
        subcommand: ProjectSubcommand,
    },

    /// Sync a folder's bound scene and open claude in a terminal there
    Launch {
        /// Folder to launch in
        path: String,

        /// Scene (id or name) to bind first if the folder has none
        #[arg(long)]
        scene: Option<String>,

        /// On a permission denial, open the accessibility settings pane
        #[arg(long)]
        open_settings: bool,
    },

    /// List and restore soft-deleted items
    Trash {
        #[command(subcommand)]
        subcommand: TrashSubcommand,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();
}

fn main() {
    // `troupe --launch <path>` is the re-entrant trigger used by second
    // instances and OS integrations; it bypasses the subcommand tree.
    let raw: Vec<String> = std::env::args().skip(1).collect();
    if let Some(path) = claude_launcher::launch_path_from_args(raw.iter().map(String::as_str)) {
        init_tracing();
        let result = root::resolve_root(None).and_then(|registry_root| {
            cmd::launch::run(
                &registry_root,
                &path.display().to_string(),
                None,
                false,
                false,
            )
        });
        if let Err(e) = result {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
        return;
    }

    let cli = Cli::parse();
    init_tracing();

    let result = root::resolve_root(cli.root.as_deref()).and_then(|root| match cli.command {
        Commands::Detect => cmd::detect::run(&root, cli.json),
        Commands::Import { all, skills, mcps } => {
            cmd::import::run(&root, all, &skills, &mcps, cli.json)
        }
        Commands::Skill { subcommand } => cmd::skill::run(&root, subcommand, cli.json),
        Commands::Mcp { subcommand } => cmd::mcp::run(&root, subcommand, cli.json),
        Commands::ClaudeMd { subcommand } => cmd::claude_md::run(&root, subcommand, cli.json),
        Commands::Scene { subcommand } => cmd::scene::run(&root, subcommand, cli.json),
        Commands::Project { subcommand } => cmd::project::run(&root, subcommand, cli.json),
        Commands::Launch {
            path,
            scene,
            open_settings,
        } => cmd::launch::run(&root, &path, scene.as_deref(), open_settings, cli.json),
        Commands::Trash { subcommand } => cmd::trash::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    });

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
