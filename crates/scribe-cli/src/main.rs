//! scribe - ブログのコマンドラインクライアント
//!
//! session は `X-Fallback-Cookies` の値をファイルに保存して引き継ぎます。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use scribe_core::app::{App, AppBuilder, Feed, ImageState, PageLoad, PostForm, PostPage};
use scribe_core::config::BackendConfig;
use scribe_core::domain::{AssetUpload, Credentials, NewAccount, PostId, PostStatus, Query};
use scribe_core::impls::HttpBackend;

#[derive(Parser, Debug)]
#[command(name = "scribe")]
#[command(about = "Write and read posts on a hosted blog backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Where the session is stored between runs
    #[arg(long, env = "SCRIBE_SESSION_FILE", default_value = ".scribe-session")]
    session_file: PathBuf,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Create an account and sign in
    Signup {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        creds: CredentialArgs,
    },
    /// Sign in with email and password
    Login {
        #[command(flatten)]
        creds: CredentialArgs,
    },
    /// Sign out of every session
    Logout,
    /// Show the signed-in account
    Whoami,
    /// List posts (active ones unless --all)
    List {
        #[arg(long)]
        all: bool,
    },
    /// Show one post
    Show { slug: String },
    /// Create a post
    Create {
        #[command(flatten)]
        post: PostArgs,
    },
    /// Edit an existing post
    Edit {
        #[arg(id = "edit_slug", value_name = "SLUG")]
        slug: String,
        #[command(flatten)]
        post: PostArgs,
    },
    /// Delete a post and its featured image
    Delete { slug: String },
}

#[derive(clap::Args, Debug)]
struct CredentialArgs {
    #[arg(long)]
    email: String,
    #[arg(long, env = "SCRIBE_PASSWORD", hide_env_values = true)]
    password: String,
}

impl From<CredentialArgs> for Credentials {
    fn from(args: CredentialArgs) -> Self {
        Credentials::new(args.email, args.password)
    }
}

#[derive(clap::Args, Debug, Default)]
struct PostArgs {
    #[arg(long)]
    title: Option<String>,
    /// Overrides the slug derived from the title
    #[arg(long)]
    slug: Option<String>,
    #[arg(long)]
    content: Option<String>,
    /// active | inactive
    #[arg(long)]
    status: Option<PostStatus>,
    /// png, jpg, jpeg or gif
    #[arg(long, value_name = "PATH")]
    image: Option<PathBuf>,
}

impl PostArgs {
    async fn apply(self, form: &mut PostForm) -> Result<()> {
        if let Some(title) = self.title {
            form.set_title(title);
        }
        if let Some(slug) = self.slug {
            form.set_slug(&slug);
        }
        if let Some(content) = self.content {
            form.set_content(content);
        }
        if let Some(status) = self.status {
            form.set_status(status);
        }
        if let Some(path) = self.image {
            let upload = AssetUpload::from_path(&path).await?;
            form.attach_image(upload);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(e) = run(Cli::parse()).await {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = BackendConfig::from_env().context("load backend configuration")?;
    let backend = Arc::new(HttpBackend::new(&config).context("create backend client")?);
    if let Some(cookies) = load_session(&cli.session_file).await? {
        backend.restore_session(cookies);
    }
    let mut app = AppBuilder::new()
        .backend(backend.clone())
        .config(config)
        .build()?;

    match cli.command {
        Commands::Signup { name, creds } => {
            let account = NewAccount {
                name,
                credentials: creds.into(),
            };
            app.auth.create_account(&account).await.context("sign up")?;
            save_session(&cli.session_file, backend.session_cookies()).await?;
            print_identity(&mut app).await;
        }
        Commands::Login { creds } => {
            app.auth.login(&creds.into()).await.context("log in")?;
            save_session(&cli.session_file, backend.session_cookies()).await?;
            print_identity(&mut app).await;
        }
        Commands::Logout => {
            app.logout().await;
            save_session(&cli.session_file, None).await?;
            println!("signed out");
        }
        Commands::Whoami => print_identity(&mut app).await,
        Commands::List { all } => {
            let queries = if all {
                Vec::new()
            } else {
                vec![Query::equal("status", PostStatus::Active.as_str())]
            };
            let feed = Feed::load(&app.posts, &mut app.state, &queries).await;
            if let Some(error) = &app.state.posts().error {
                bail!("list posts: {error}");
            }
            if feed.is_empty() {
                println!("no posts");
            }
            for card in &feed.cards {
                println!("{}\t{}\t{}", card.path(), card.title, describe(card.image().state()));
            }
        }
        Commands::Show { slug } => {
            let page = load_page(&app, &slug).await?;
            let post = page.post();
            println!("{}", post.title);
            println!("status: {}", post.status);
            println!("image:  {}", describe(page.image().state()));
            println!();
            println!("{}", post.content);
        }
        Commands::Create { post } => {
            let user = app.refresh_session().await.cloned();
            let mut form = PostForm::new();
            post.apply(&mut form).await?;
            let route = form.submit(&app.posts, user.as_ref()).await?;
            println!("{route}");
        }
        Commands::Edit { slug, post: args } => {
            let user = app.refresh_session().await.cloned();
            let existing = app
                .posts
                .get_post(&PostId::new(slug.as_str()))
                .await
                .with_context(|| format!("load post '{slug}'"))?;
            if !user.as_ref().is_some_and(|u| existing.is_owned_by(&u.id)) {
                bail!("only the author can edit '{slug}'");
            }
            let mut form = PostForm::edit(&existing);
            args.apply(&mut form).await?;
            let route = form.submit(&app.posts, user.as_ref()).await?;
            println!("{route}");
        }
        Commands::Delete { slug } => {
            let user = app.refresh_session().await.cloned();
            let page = load_page(&app, &slug).await?;
            match page.delete(&app.posts, user.as_ref()).await {
                Some(route) => println!("deleted '{slug}', back to {route}"),
                None => bail!("could not delete '{slug}'"),
            }
        }
    }
    Ok(())
}

async fn load_page(app: &App, slug: &str) -> Result<PostPage> {
    match PostPage::load(&app.posts, slug).await {
        PageLoad::Ready(page) => Ok(page),
        PageLoad::Redirect(_) => bail!("post '{slug}' not found"),
    }
}

async fn print_identity(app: &mut App) {
    match app.refresh_session().await {
        Some(user) => println!("{} <{}> ({})", user.name, user.email, user.id),
        None => println!("not signed in"),
    }
}

fn describe(state: &ImageState) -> &str {
    match state {
        ImageState::Loading => "loading",
        ImageState::Resolved(url) => url.as_str(),
        ImageState::Unavailable => "no image",
    }
}

async fn load_session(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => {
            debug!(path = %path.display(), "session restored");
            Ok(Some(raw.trim().to_string()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("read session file {}", path.display())),
    }
}

async fn save_session(path: &Path, cookies: Option<String>) -> Result<()> {
    match cookies {
        Some(cookies) => tokio::fs::write(path, cookies)
            .await
            .with_context(|| format!("write session file {}", path.display())),
        None => match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove session file {}", path.display())),
        },
    }
}
