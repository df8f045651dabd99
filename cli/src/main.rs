use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use videotube::api::{FileUpload, RegisterForm, UploadForm, Video};
use videotube::config::ConfigError;
use videotube::views::{self, DashboardView, LoginView, RegisterView, UploadView, VideoView};
use videotube::{ApiClient, ApiError, ClientConfig, FileSessionStore, GuardDecision, Route, RouteGuard, SessionError, SessionStore};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("session storage failed: {0}")]
    Session(#[from] SessionError),
    #[error("not logged in; run `videotube login` first")]
    NotLoggedIn,
    #[error("you do not own video {0}; pass --force to ask the server anyway")]
    NotOwner(String),
    #[error("{0}")]
    Action(String),
    #[error("failed to read input: {0}")]
    Input(#[from] io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "videotube", about = "VideoTube command-line client")]
struct Cli {
    /// Server origin. Overrides VIDEOTUBE_API_BASE_URL.
    #[arg(long)]
    base_url: Option<String>,

    /// Session directory. Overrides VIDEOTUBE_SESSION_DIR.
    #[arg(long)]
    session_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login(LoginArgs),
    Register(RegisterArgs),
    Logout,
    Whoami,
    /// List the video feed.
    Videos {
        /// Print raw JSON instead of one line per video.
        #[arg(long)]
        json: bool,
    },
    Video(VideoCommand),
    Upload(UploadArgs),
    /// Show where navigating to PATH would land.
    Route {
        path: String,
    },
}

#[derive(Args, Debug)]
struct LoginArgs {
    /// Email or username.
    identifier: String,

    #[arg(long, env = "VIDEOTUBE_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    full_name: String,

    #[arg(long)]
    username: String,

    #[arg(long)]
    email: String,

    #[arg(long, env = "VIDEOTUBE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(long)]
    avatar: Option<PathBuf>,

    #[arg(long)]
    cover_image: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct VideoCommand {
    #[command(subcommand)]
    command: VideoSubcommand,
}

#[derive(Subcommand, Debug)]
enum VideoSubcommand {
    Show {
        video_id: String,

        #[arg(long)]
        json: bool,
    },
    Like {
        video_id: String,
    },
    Delete {
        video_id: String,

        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,

        /// Skip the ownership check and let the server decide.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct UploadArgs {
    #[arg(long)]
    title: String,

    #[arg(long, default_value = "")]
    description: String,

    #[arg(long)]
    file: PathBuf,

    #[arg(long)]
    thumbnail: Option<PathBuf>,
}

struct CliContext {
    api: Arc<ApiClient>,
    store: Arc<dyn SessionStore>,
    guard: RouteGuard,
}

impl CliContext {
    fn build(base_url: Option<&str>, session_dir: Option<PathBuf>) -> Result<Self, CliError> {
        let mut config = ClientConfig::from_env()?;
        if let Some(base_url) = base_url {
            config.base_url = ClientConfig::new(base_url)?.base_url;
        }
        if session_dir.is_some() {
            config.session_dir = session_dir;
        }

        let dir = config.session_dir.clone().unwrap_or_else(FileSessionStore::default_dir);
        tracing::debug!(base_url = %config.base_url, dir = %dir.display(), "client configured");

        let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(dir));
        let api = Arc::new(ApiClient::new(config, store.clone())?);
        Ok(Self { guard: RouteGuard::new(store.clone()), api, store })
    }

    /// Run the route guard before a command that needs a session.
    fn enter(&self, route: Route) -> Result<(), CliError> {
        match self.guard.check(route) {
            GuardDecision::Render(_) => Ok(()),
            GuardDecision::Redirect(_) => Err(CliError::NotLoggedIn),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = CliContext::build(cli.base_url.as_deref(), cli.session_dir)?;

    match cli.command {
        Command::Login(args) => run_login(&ctx, args).await,
        Command::Register(args) => run_register(&ctx, args).await,
        Command::Logout => run_logout(&ctx).await,
        Command::Whoami => run_whoami(&ctx),
        Command::Videos { json } => run_videos(&ctx, json).await,
        Command::Video(video) => run_video(&ctx, video).await,
        Command::Upload(args) => run_upload(&ctx, args).await,
        Command::Route { path } => {
            match ctx.guard.check(Route::parse(&path)) {
                GuardDecision::Render(route) => println!("render {route}"),
                GuardDecision::Redirect(route) => println!("redirect {route}"),
            }
            Ok(())
        }
    }
}

async fn run_login(ctx: &CliContext, args: LoginArgs) -> Result<(), CliError> {
    let mut view = LoginView::new(ctx.api.clone());
    cancel_on_ctrl_c(view.context().cancel_token().clone());
    view.identifier = args.identifier;
    view.password = match args.password {
        Some(password) => password,
        None => prompt_line("Password: ")?,
    };

    let next = view.submit().await;
    arrived(next, view.error)?;
    if let Some(session) = ctx.store.load()? {
        eprintln!("logged in as {}", session.user.username);
    }
    Ok(())
}

async fn run_register(ctx: &CliContext, args: RegisterArgs) -> Result<(), CliError> {
    let avatar = match &args.avatar {
        Some(path) => Some(FileUpload::from_path(path).await?),
        None => None,
    };
    let cover_image = match &args.cover_image {
        Some(path) => Some(FileUpload::from_path(path).await?),
        None => None,
    };
    let password = match args.password {
        Some(password) => password,
        None => prompt_line("Password: ")?,
    };

    let mut view = RegisterView::new(ctx.api.clone());
    cancel_on_ctrl_c(view.context().cancel_token().clone());
    view.form = RegisterForm {
        full_name: args.full_name,
        username: args.username,
        email: args.email,
        password,
        avatar,
        cover_image,
    };

    let next = view.submit().await;
    arrived(next, view.error)?;
    eprintln!("registered; log in with `videotube login {}`", view.form.username);
    Ok(())
}

async fn run_logout(ctx: &CliContext) -> Result<(), CliError> {
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());
    views::logout(&ctx.api, &cancel).await;
    eprintln!("logged out");
    Ok(())
}

fn run_whoami(ctx: &CliContext) -> Result<(), CliError> {
    let session = ctx.store.load()?.ok_or(CliError::NotLoggedIn)?;
    print_json(&serde_json::to_value(&session.user)?)
}

async fn run_videos(ctx: &CliContext, json: bool) -> Result<(), CliError> {
    ctx.enter(Route::Dashboard)?;
    let mut view = DashboardView::new(ctx.api.clone());
    cancel_on_ctrl_c(view.context().cancel_token().clone());

    view.load().await;
    if let Some(message) = view.error {
        return Err(CliError::Action(message));
    }
    if view.is_empty() {
        eprintln!("No videos yet.");
        return Ok(());
    }
    if json {
        return print_json(&serde_json::to_value(&view.videos)?);
    }
    for video in &view.videos {
        println!("{}", video_line(video));
    }
    Ok(())
}

async fn run_video(ctx: &CliContext, video: VideoCommand) -> Result<(), CliError> {
    match video.command {
        VideoSubcommand::Show { video_id, json } => {
            let view = load_video(ctx, video_id).await?;
            match (&view.video, json) {
                (Some(video), false) => println!("{}", video_details(video)),
                (video, _) => print_json(&serde_json::to_value(video)?)?,
            }
            Ok(())
        }
        VideoSubcommand::Like { video_id } => {
            let mut view = load_video(ctx, video_id).await?;
            view.toggle_like().await;
            if let Some(message) = view.error {
                return Err(CliError::Action(message));
            }
            if let Some(video) = &view.video {
                let state = if video.is_liked { "liked" } else { "unliked" };
                println!("{state} {} ({} likes)", video.id, video.like_count);
            }
            Ok(())
        }
        VideoSubcommand::Delete { video_id, yes, force } => {
            let mut view = if force {
                ctx.enter(Route::Video(video_id.clone()))?;
                let view = VideoView::new(ctx.api.clone(), video_id.clone());
                cancel_on_ctrl_c(view.context().cancel_token().clone());
                view
            } else {
                let view = load_video(ctx, video_id.clone()).await?;
                let user = ctx.store.load()?.map(|session| session.user);
                if !view.can_delete(user.as_ref()) {
                    return Err(CliError::NotOwner(video_id));
                }
                view
            };

            let confirm = |prompt: &str| yes || confirm_on_stdin(prompt);
            match view.delete(&confirm).await {
                Some(_) => {
                    eprintln!("deleted {video_id}");
                    Ok(())
                }
                None => match view.error {
                    Some(message) => Err(CliError::Action(message)),
                    None => {
                        eprintln!("delete cancelled");
                        Ok(())
                    }
                },
            }
        }
    }
}

async fn run_upload(ctx: &CliContext, args: UploadArgs) -> Result<(), CliError> {
    ctx.enter(Route::UploadVideo)?;
    let video_file = FileUpload::from_path(&args.file).await?;
    let thumbnail = match &args.thumbnail {
        Some(path) => Some(FileUpload::from_path(path).await?),
        None => None,
    };

    let mut view = UploadView::new(ctx.api.clone());
    cancel_on_ctrl_c(view.context().cancel_token().clone());
    view.form = UploadForm { title: args.title, description: args.description, video_file: Some(video_file), thumbnail };

    let next = view.submit().await;
    arrived(next, view.error)?;
    eprintln!("uploaded");
    Ok(())
}

/// Guard, then load a video view, failing with the view's error message.
async fn load_video(ctx: &CliContext, video_id: String) -> Result<VideoView, CliError> {
    ctx.enter(Route::Video(video_id.clone()))?;
    let mut view = VideoView::new(ctx.api.clone(), video_id);
    cancel_on_ctrl_c(view.context().cancel_token().clone());

    view.load().await;
    match view.error.take() {
        Some(message) => Err(CliError::Action(message)),
        None => Ok(view),
    }
}

/// Map a controller result to the CLI: a navigation is success, anything else
/// carries the controller's error text.
fn arrived(next: Option<Route>, error: Option<String>) -> Result<Route, CliError> {
    match (next, error) {
        (Some(route), _) => {
            tracing::debug!(%route, "navigated");
            Ok(route)
        }
        (None, Some(message)) => Err(CliError::Action(message)),
        (None, None) => Err(CliError::Action("no result".to_owned())),
    }
}

fn video_line(video: &Video) -> String {
    format!("{}  {}  by {}  ({} likes)", video.id, video.title, video.owner_name(), video.like_count)
}

fn video_details(video: &Video) -> String {
    let thumbnail = match (video.thumbnail(), video.title_initial()) {
        (Some(url), _) => url.to_owned(),
        (None, Some(initial)) => format!("none, placeholder [{initial}]"),
        (None, None) => "none".to_owned(),
    };
    let liked = if video.is_liked { ", liked by you" } else { "" };
    let mut out = format!(
        "{}\n  id: {}\n  by: {}\n  likes: {}{liked}\n  file: {}\n  thumbnail: {thumbnail}",
        video.title,
        video.id,
        video.owner_name(),
        video.like_count,
        video.video_file_url,
    );
    if !video.description.trim().is_empty() {
        out.push_str("\n\n");
        out.push_str(video.description.trim());
    }
    out
}

fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted; cancelling request");
            token.cancel();
        }
    });
}

fn prompt_line(prompt: &str) -> Result<String, CliError> {
    eprint!("{prompt}");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

fn confirm_on_stdin(prompt: &str) -> bool {
    match prompt_line(&format!("{prompt} [y/N] ")) {
        Ok(answer) => is_affirmative(&answer),
        Err(e) => {
            tracing::warn!(error = %e, "could not read confirmation");
            false
        }
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
